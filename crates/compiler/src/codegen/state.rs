//! CodeGen state and low-level emission helpers

use crate::ast::Stmt;
use crate::typechecker::SemaResult;
use std::collections::HashMap;
use std::fmt::Write as _;

/// A value produced by expression emission: the SSA name holding a
/// `%Value`, and whether the current frame owns a reference to it.
///
/// Owned values must be released exactly once on every path that does not
/// hand them onward; borrowed values (plain loads of locals) must be
/// retained before they outlive the statement that produced them.
#[derive(Debug, Clone)]
pub(super) struct EmittedValue {
    pub ssa: String,
    pub owned: bool,
}

impl EmittedValue {
    pub fn owned(ssa: String) -> Self {
        EmittedValue { ssa, owned: true }
    }

    pub fn borrowed(ssa: String) -> Self {
        EmittedValue { ssa, owned: false }
    }
}

/// An entry of the cleanup stack: what `return`/`break`/`continue` must
/// unwind through before transferring control.
#[derive(Debug, Clone)]
pub(super) enum CleanupFrame {
    /// An active `try`. `needs_exit` is true while emitting the protected
    /// body (the handler has already balanced the try depth).
    Try { finalbody: Vec<Stmt>, needs_exit: bool },
    /// A loop, recording its continue and break targets.
    Loop { continue_label: String, break_label: String },
}

pub struct CodeGen<'a> {
    pub(super) sema: &'a SemaResult,
    /// Function bodies accumulate here.
    pub(super) out: String,
    /// Interned string/bytes constants.
    pub(super) string_globals: String,
    pub(super) string_constants: HashMap<Vec<u8>, String>,
    pub(super) string_counter: usize,
    pub(super) temp_counter: usize,
    pub(super) block_counter: usize,
    /// Local name -> alloca SSA name for the function being emitted.
    pub(super) locals: HashMap<String, String>,
    /// Label of the block currently receiving instructions (phi sources).
    pub(super) current_block: String,
    /// Where a pending runtime error sends control: the innermost handler
    /// entry, or the function's error-exit block.
    pub(super) err_target: String,
    pub(super) cleanup_stack: Vec<CleanupFrame>,
}

impl<'a> CodeGen<'a> {
    pub fn new(sema: &'a SemaResult) -> Self {
        CodeGen {
            sema,
            out: String::new(),
            string_globals: String::new(),
            string_constants: HashMap::new(),
            string_counter: 0,
            temp_counter: 0,
            block_counter: 0,
            locals: HashMap::new(),
            current_block: String::new(),
            err_target: String::new(),
            cleanup_stack: Vec::new(),
        }
    }

    pub(super) fn temp(&mut self) -> String {
        self.temp_counter += 1;
        format!("%t{}", self.temp_counter)
    }

    pub(super) fn block(&mut self, hint: &str) -> String {
        self.block_counter += 1;
        format!("{}{}", hint, self.block_counter)
    }

    pub(super) fn line(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(&mut self.out, "  {}", text.as_ref());
    }

    /// Start a new basic block and make it current.
    pub(super) fn start_block(&mut self, label: &str) {
        let _ = writeln!(&mut self.out, "{}:", label);
        self.current_block = label.to_string();
    }

    /// The canonical None constant usable as an operand.
    pub(super) fn none_const() -> &'static str {
        "zeroinitializer"
    }

    /// Wrap an i64 payload into a `%Value` with the given tag.
    pub(super) fn wrap_payload(&mut self, tag: i64, payload: &str) -> String {
        let t = self.temp();
        self.line(format!(
            "{} = insertvalue %Value {{ i64 {}, i64 0, i64 0 }}, i64 {}, 1",
            t, tag, payload
        ));
        t
    }

    /// Extract the payload word of a `%Value`.
    pub(super) fn extract_payload(&mut self, value: &str) -> String {
        let t = self.temp();
        self.line(format!("{} = extractvalue %Value {}, 1", t, value));
        t
    }

    /// Extract a double from a Float-tagged `%Value`.
    pub(super) fn extract_float(&mut self, value: &str) -> String {
        let bits = self.extract_payload(value);
        let t = self.temp();
        self.line(format!("{} = bitcast i64 {} to double", t, bits));
        t
    }

    /// Wrap a double into a Float-tagged `%Value`.
    pub(super) fn wrap_float(&mut self, double_ssa: &str) -> String {
        let bits = self.temp();
        self.line(format!("{} = bitcast double {} to i64", bits, double_ssa));
        self.wrap_payload(2, &bits)
    }

    /// Wrap an i1 into a Bool-tagged `%Value`.
    pub(super) fn wrap_bool(&mut self, i1_ssa: &str) -> String {
        let z = self.temp();
        self.line(format!("{} = zext i1 {} to i64", z, i1_ssa));
        self.wrap_payload(3, &z)
    }

    pub(super) fn release(&mut self, value: &EmittedValue) {
        if value.owned {
            self.line(format!("call void @pycc_rt_release(%Value {})", value.ssa));
        }
    }

    /// Make sure the frame owns a reference (retain borrowed values).
    pub(super) fn ensure_owned(&mut self, value: EmittedValue) -> EmittedValue {
        if value.owned {
            return value;
        }
        let t = self.temp();
        self.line(format!("{} = call %Value @pycc_rt_retain(%Value {})", t, value.ssa));
        EmittedValue::owned(t)
    }
}
