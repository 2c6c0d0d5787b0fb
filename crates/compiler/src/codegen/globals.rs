//! String and bytes literal globals
//!
//! Literal payloads are deduplicated into private constants. They are not
//! NUL-terminated — the runtime constructors take an explicit length, so
//! embedded NUL bytes in bytes literals survive.

use super::state::CodeGen;
use std::fmt::Write as _;

impl CodeGen<'_> {
    /// Escape raw bytes for an LLVM `c"..."` constant.
    pub(super) fn escape_llvm_bytes(data: &[u8]) -> String {
        let mut out = String::with_capacity(data.len());
        for b in data {
            match b {
                b' '..=b'!' | b'#'..=b'[' | b']'..=b'~' => out.push(*b as char),
                _ => {
                    let _ = write!(&mut out, "\\{:02X}", b);
                }
            }
        }
        out
    }

    /// Get or create a global constant for the given bytes, returning its
    /// name. Shared between str and bytes literals.
    pub(super) fn get_data_global(&mut self, data: &[u8]) -> String {
        if let Some(name) = self.string_constants.get(data) {
            return name.clone();
        }
        let name = format!("@.str.{}", self.string_counter);
        self.string_counter += 1;
        let escaped = Self::escape_llvm_bytes(data);
        let _ = writeln!(
            &mut self.string_globals,
            "{} = private unnamed_addr constant [{} x i8] c\"{}\"",
            name,
            data.len().max(1),
            if data.is_empty() { "\\00".to_string() } else { escaped }
        );
        self.string_constants.insert(data.to_vec(), name.clone());
        name
    }

    /// Emit the `%Value` for a str literal.
    pub(super) fn emit_str_literal(&mut self, text: &str) -> String {
        let global = self.get_data_global(text.as_bytes());
        let t = self.temp();
        self.line(format!(
            "{} = call %Value @pycc_rt_str_lit(ptr {}, i64 {})",
            t,
            global,
            text.len()
        ));
        t
    }

    /// Emit the `%Value` for a bytes literal.
    pub(super) fn emit_bytes_literal(&mut self, data: &[u8]) -> String {
        let global = self.get_data_global(data);
        let t = self.temp();
        self.line(format!(
            "{} = call %Value @pycc_rt_bytes_lit(ptr {}, i64 {})",
            t,
            global,
            data.len()
        ));
        t
    }
}
