//! Statement and function lowering
//!
//! Every user function becomes `define %Value @py_<name>(...)` with one
//! alloca per local. Control flow maps to labeled blocks; `return`,
//! `break` and `continue` unwind the cleanup stack (active `try` frames)
//! before transferring control. After every statement that can raise, the
//! generated code polls the runtime error slot and branches to the
//! innermost handler — or to the function's error-exit block, which
//! releases the frame and propagates by returning None with the error
//! still pending.

use super::error::CodeGenError;
use super::state::{CleanupFrame, CodeGen, EmittedValue};
use crate::ast::*;

impl CodeGen<'_> {
    pub(super) fn emit_function(&mut self, f: &FunctionDef) -> Result<(), CodeGenError> {
        self.locals.clear();
        self.cleanup_stack.clear();

        let params: Vec<String> =
            f.params.iter().map(|p| format!("%Value %p_{}", p.name)).collect();
        let _ = std::fmt::Write::write_fmt(
            &mut self.out,
            format_args!("define %Value @py_{}({}) {{\n", f.name, params.join(", ")),
        );
        self.start_block("entry");
        self.err_target = "err_exit".to_string();

        // Profiling hook; compiles to a no-op unless the runtime is built
        // with the profiling feature.
        let mut name_bytes = f.name.clone().into_bytes();
        name_bytes.push(0);
        let name_global = self.get_data_global(&name_bytes);
        self.line(format!("call void @pycc_rt_prof_hit(ptr {})", name_global));

        // One slot per local, all initialized to None; parameters move
        // their (caller-owned) argument in.
        let mut local_names = Vec::new();
        collect_locals(f, &mut local_names);
        for name in &local_names {
            let slot = format!("%v_{}", name);
            self.line(format!("{} = alloca %Value, align 8", slot));
            self.locals.insert(name.clone(), slot);
        }
        for name in &local_names {
            let slot = self.locals[name].clone();
            if f.params.iter().any(|p| &p.name == name) {
                self.line(format!("store %Value %p_{}, ptr {}", name, slot));
            } else {
                self.line(format!("store %Value zeroinitializer, ptr {}", slot));
            }
        }

        let body_b = self.block("body");
        self.line(format!("br label %{}", body_b));
        self.start_block(&body_b);
        let terminated = self.emit_block(&f.body)?;
        if !terminated {
            // Fall off the end: implicit `return None`.
            self.emit_frame_release();
            self.line("ret %Value zeroinitializer");
        }

        // Error propagation: drop every local and return None with the
        // error left pending for the caller's next poll.
        self.start_block("err_exit");
        self.emit_frame_release();
        self.line("ret %Value zeroinitializer");
        self.out.push_str("}\n\n");
        Ok(())
    }

    /// Release every local slot of the current frame.
    fn emit_frame_release(&mut self) {
        let slots: Vec<String> = {
            let mut s: Vec<_> = self.locals.values().cloned().collect();
            s.sort();
            s
        };
        for slot in slots {
            let v = self.temp();
            self.line(format!("{} = load %Value, ptr {}", v, slot));
            self.line(format!("call void @pycc_rt_release(%Value {})", v));
        }
    }

    /// Emit a body; returns true when the current block ended in a
    /// terminator (so the caller must not fall through).
    pub(super) fn emit_block(&mut self, body: &[Stmt]) -> Result<bool, CodeGenError> {
        for stmt in body {
            if self.emit_stmt(stmt)? {
                return Ok(true);
            }
            if stmt_can_raise(stmt) {
                self.emit_pending_check();
            }
        }
        Ok(false)
    }

    /// Poll the error slot and branch to the active error target.
    fn emit_pending_check(&mut self) {
        let p = self.temp();
        self.line(format!("{} = call i64 @pycc_rt_err_pending()", p));
        let c = self.temp();
        self.line(format!("{} = icmp ne i64 {}, 0", c, p));
        let cont = self.block("ok");
        let target = self.err_target.clone();
        self.line(format!("br i1 {}, label %{}, label %{}", c, target, cont));
        self.start_block(&cont);
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<bool, CodeGenError> {
        match stmt {
            Stmt::FunctionDef(_) => Err(CodeGenError::Unsupported("nested function".into())),
            Stmt::Import { .. } | Stmt::ImportFrom { .. } | Stmt::Pass { .. } => Ok(false),
            Stmt::ExprStmt { value, .. } => {
                let v = self.emit_expr(value)?;
                self.release(&v);
                Ok(false)
            }
            Stmt::Assign { target, value, .. } => {
                match target {
                    AssignTarget::Name(name, _) => {
                        let v = self.emit_expr(value)?;
                        let v = self.ensure_owned(v);
                        self.store_local(name, &v)?;
                    }
                    AssignTarget::Subscript { value: base, index, .. } => {
                        let b = self.emit_expr(base)?;
                        let i = self.emit_expr(index)?;
                        let v = self.emit_expr(value)?;
                        self.line(format!(
                            "call void @pycc_rt_index_set(%Value {}, %Value {}, %Value {})",
                            b.ssa, i.ssa, v.ssa
                        ));
                        self.release(&v);
                        self.release(&i);
                        self.release(&b);
                    }
                }
                Ok(false)
            }
            Stmt::AugAssign { target, op, value, .. } => {
                // `x op= v` reads, combines through the generic runtime
                // operator, and stores back.
                let code = match op {
                    BinOpKind::Add => 0,
                    BinOpKind::Sub => 1,
                    BinOpKind::Mul => 2,
                    BinOpKind::Div => 3,
                    BinOpKind::FloorDiv => 4,
                    BinOpKind::Mod => 5,
                    BinOpKind::Pow => 6,
                };
                match target {
                    AssignTarget::Name(name, _) => {
                        let slot = self.local_slot(name)?;
                        let old = self.temp();
                        self.line(format!("{} = load %Value, ptr {}", old, slot));
                        let v = self.emit_expr(value)?;
                        let combined = self.temp();
                        self.line(format!(
                            "{} = call %Value @pycc_rt_value_binop(i64 {}, %Value {}, %Value {})",
                            combined, code, old, v.ssa
                        ));
                        self.release(&v);
                        self.line(format!("call void @pycc_rt_release(%Value {})", old));
                        self.line(format!("store %Value {}, ptr {}", combined, slot));
                    }
                    AssignTarget::Subscript { value: base, index, .. } => {
                        let b = self.emit_expr(base)?;
                        let i = self.emit_expr(index)?;
                        let old = self.temp();
                        self.line(format!(
                            "{} = call %Value @pycc_rt_index(%Value {}, %Value {})",
                            old, b.ssa, i.ssa
                        ));
                        let v = self.emit_expr(value)?;
                        let combined = self.temp();
                        self.line(format!(
                            "{} = call %Value @pycc_rt_value_binop(i64 {}, %Value {}, %Value {})",
                            combined, code, old, v.ssa
                        ));
                        self.line(format!(
                            "call void @pycc_rt_index_set(%Value {}, %Value {}, %Value {})",
                            b.ssa, i.ssa, combined
                        ));
                        self.line(format!("call void @pycc_rt_release(%Value {})", combined));
                        self.line(format!("call void @pycc_rt_release(%Value {})", old));
                        self.release(&v);
                        self.release(&i);
                        self.release(&b);
                    }
                }
                Ok(false)
            }
            Stmt::If { branches, orelse, .. } => self.emit_if(branches, orelse),
            Stmt::While { test, body, .. } => self.emit_while(test, body),
            Stmt::For { var, iter, body, .. } => self.emit_for(var, iter, body),
            Stmt::Try { body, handler, orelse, finalbody, .. } => {
                self.emit_try(body, handler, orelse, finalbody)
            }
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(e) => {
                        let v = self.emit_expr(e)?;
                        self.ensure_owned(v)
                    }
                    None => EmittedValue::owned(CodeGen::none_const().to_string()),
                };
                self.emit_unwind_all()?;
                self.emit_frame_release();
                self.line(format!("ret %Value {}", v.ssa));
                Ok(true)
            }
            Stmt::Break { .. } => self.emit_loop_exit(true),
            Stmt::Continue { .. } => self.emit_loop_exit(false),
        }
    }

    fn store_local(&mut self, name: &str, v: &EmittedValue) -> Result<(), CodeGenError> {
        let slot = self.local_slot(name)?;
        let old = self.temp();
        self.line(format!("{} = load %Value, ptr {}", old, slot));
        self.line(format!("call void @pycc_rt_release(%Value {})", old));
        self.line(format!("store %Value {}, ptr {}", v.ssa, slot));
        Ok(())
    }

    fn local_slot(&self, name: &str) -> Result<String, CodeGenError> {
        self.locals
            .get(name)
            .cloned()
            .ok_or_else(|| CodeGenError::MissingSemaInfo(format!("local slot for '{}'", name)))
    }

    fn emit_if(
        &mut self,
        branches: &[(Expr, Vec<Stmt>)],
        orelse: &[Stmt],
    ) -> Result<bool, CodeGenError> {
        let end_b = self.block("if_end");
        let mut all_terminated = true;

        for (test, body) in branches {
            let flag = self.emit_condition(test)?;
            self.emit_pending_check();
            let then_b = self.block("if_then");
            let next_b = self.block("if_next");
            self.line(format!("br i1 {}, label %{}, label %{}", flag, then_b, next_b));
            self.start_block(&then_b);
            let terminated = self.emit_block(body)?;
            if !terminated {
                self.line(format!("br label %{}", end_b));
                all_terminated = false;
            }
            self.start_block(&next_b);
        }

        let else_terminated = self.emit_block(orelse)?;
        if !else_terminated {
            self.line(format!("br label %{}", end_b));
            all_terminated = false;
        }

        // end_b is unreachable when every arm terminated, but emitting it
        // keeps the block structure uniform.
        self.start_block(&end_b);
        if all_terminated {
            self.line("unreachable");
            return Ok(true);
        }
        Ok(false)
    }

    fn emit_while(&mut self, test: &Expr, body: &[Stmt]) -> Result<bool, CodeGenError> {
        let cond_b = self.block("while_cond");
        let body_b = self.block("while_body");
        let end_b = self.block("while_end");

        self.line(format!("br label %{}", cond_b));
        self.start_block(&cond_b);
        let flag = self.emit_condition(test)?;
        self.emit_pending_check();
        self.line(format!("br i1 {}, label %{}, label %{}", flag, body_b, end_b));

        self.start_block(&body_b);
        self.cleanup_stack.push(CleanupFrame::Loop {
            continue_label: cond_b.clone(),
            break_label: end_b.clone(),
        });
        let terminated = self.emit_block(body)?;
        self.cleanup_stack.pop();
        if !terminated {
            self.line(format!("br label %{}", cond_b));
        }

        self.start_block(&end_b);
        Ok(false)
    }

    fn emit_for(&mut self, var: &str, iter: &Expr, body: &[Stmt]) -> Result<bool, CodeGenError> {
        let it = self.emit_expr(iter)?;
        self.emit_pending_check();
        let len = self.temp();
        self.line(format!("{} = call i64 @pycc_rt_iter_len(%Value {})", len, it.ssa));

        let cond_b = self.block("for_cond");
        let body_b = self.block("for_body");
        let inc_b = self.block("for_inc");
        let end_b = self.block("for_end");
        let pre_block = self.current_block.clone();

        self.line(format!("br label %{}", cond_b));
        self.start_block(&cond_b);
        let idx = self.temp();
        self.line(format!(
            "{} = phi i64 [ 0, %{} ], [ {}.next, %{} ]",
            idx, pre_block, idx, inc_b
        ));
        let more = self.temp();
        self.line(format!("{} = icmp slt i64 {}, {}", more, idx, len));
        self.line(format!("br i1 {}, label %{}, label %{}", more, body_b, end_b));

        self.start_block(&body_b);
        let elem = self.temp();
        self.line(format!(
            "{} = call %Value @pycc_rt_iter_get(%Value {}, i64 {})",
            elem, it.ssa, idx
        ));
        let elem_val = EmittedValue::owned(elem);
        self.store_local(var, &elem_val)?;

        self.cleanup_stack.push(CleanupFrame::Loop {
            continue_label: inc_b.clone(),
            break_label: end_b.clone(),
        });
        let terminated = self.emit_block(body)?;
        self.cleanup_stack.pop();
        if !terminated {
            self.line(format!("br label %{}", inc_b));
        }

        self.start_block(&inc_b);
        self.line(format!("{}.next = add i64 {}, 1", idx, idx));
        self.line(format!("br label %{}", cond_b));

        self.start_block(&end_b);
        self.release(&it);
        Ok(false)
    }

    fn emit_try(
        &mut self,
        body: &[Stmt],
        handler: &Handler,
        orelse: &[Stmt],
        finalbody: &[Stmt],
    ) -> Result<bool, CodeGenError> {
        let handler_b = self.block("try_handler");
        let finally_b = self.block("try_finally");
        let err_finally_b = self.block("try_err_finally");
        let after_b = self.block("try_after");
        let outer_target = self.err_target.clone();

        self.line("call void @pycc_rt_try_enter()");
        self.cleanup_stack.push(CleanupFrame::Try {
            finalbody: finalbody.to_vec(),
            needs_exit: true,
        });
        self.err_target = handler_b.clone();

        let body_terminated = self.emit_block(body)?;
        if !body_terminated {
            self.line("call void @pycc_rt_try_exit()");
            self.set_try_frame_exited();
            // `else` runs only after a clean body; its errors (and the
            // handler's) still owe the finally block a visit.
            self.err_target = err_finally_b.clone();
            let else_terminated = self.emit_block(orelse)?;
            if !else_terminated {
                self.line(format!("br label %{}", finally_b));
            }
        } else {
            self.set_try_frame_exited();
        }

        self.start_block(&handler_b);
        self.line("call void @pycc_rt_try_exit()");
        let msg = self.temp();
        self.line(format!("{} = call %Value @pycc_rt_err_take()", msg));
        match &handler.bind_name {
            Some(name) => {
                let v = EmittedValue::owned(msg);
                self.store_local(name, &v)?;
            }
            None => {
                self.line(format!("call void @pycc_rt_release(%Value {})", msg));
            }
        }
        self.err_target = err_finally_b.clone();
        let handler_terminated = self.emit_block(&handler.body)?;
        if !handler_terminated {
            self.line(format!("br label %{}", finally_b));
        }

        // Normal path: finally then fall through.
        self.start_block(&finally_b);
        self.err_target = outer_target.clone();
        self.cleanup_stack.pop();
        let finally_terminated = self.emit_block(finalbody)?;
        if !finally_terminated {
            self.line(format!("br label %{}", after_b));
        }

        // Error path out of the handler/else: run finally, then keep
        // propagating to the enclosing target.
        self.start_block(&err_finally_b);
        let err_finally_terminated = self.emit_block(finalbody)?;
        if !err_finally_terminated {
            self.line(format!("br label %{}", outer_target));
        }

        self.start_block(&after_b);
        Ok(false)
    }

    fn set_try_frame_exited(&mut self) {
        if let Some(CleanupFrame::Try { needs_exit, .. }) = self.cleanup_stack.last_mut() {
            *needs_exit = false;
        }
    }

    /// Unwind every cleanup frame (for `return`).
    fn emit_unwind_all(&mut self) -> Result<(), CodeGenError> {
        let saved = self.cleanup_stack.clone();
        while let Some(frame) = self.cleanup_stack.pop() {
            if let CleanupFrame::Try { finalbody, needs_exit } = frame {
                if needs_exit {
                    self.line("call void @pycc_rt_try_exit()");
                }
                if self.emit_block(&finalbody)? {
                    break;
                }
            }
        }
        self.cleanup_stack = saved;
        Ok(())
    }

    /// Unwind up to the innermost loop and jump to its break or continue
    /// label.
    fn emit_loop_exit(&mut self, is_break: bool) -> Result<bool, CodeGenError> {
        let saved = self.cleanup_stack.clone();
        loop {
            match self.cleanup_stack.pop() {
                Some(CleanupFrame::Try { finalbody, needs_exit }) => {
                    if needs_exit {
                        self.line("call void @pycc_rt_try_exit()");
                    }
                    if self.emit_block(&finalbody)? {
                        break;
                    }
                }
                Some(CleanupFrame::Loop { continue_label, break_label }) => {
                    let target = if is_break { break_label } else { continue_label };
                    self.line(format!("br label %{}", target));
                    break;
                }
                None => {
                    return Err(CodeGenError::Unsupported(
                        "'break'/'continue' outside a loop".into(),
                    ))
                }
            }
        }
        self.cleanup_stack = saved;
        Ok(true)
    }
}

fn stmt_can_raise(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Assign { .. } | Stmt::AugAssign { .. } | Stmt::ExprStmt { .. }
    )
}

/// Collect every name that needs a stack slot: parameters, assignment
/// targets, loop variables, comprehension variables and exception
/// bindings.
pub(super) fn collect_locals(f: &FunctionDef, out: &mut Vec<String>) {
    fn add(out: &mut Vec<String>, name: &str) {
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }

    fn walk_expr(expr: &Expr, out: &mut Vec<String>) {
        match &expr.kind {
            ExprKind::ListComp { elt, var, iter, cond } | ExprKind::SetComp { elt, var, iter, cond } => {
                add(out, var);
                walk_expr(elt, out);
                walk_expr(iter, out);
                if let Some(c) = cond {
                    walk_expr(c, out);
                }
            }
            ExprKind::DictComp { key, value, var, iter, cond } => {
                add(out, var);
                walk_expr(key, out);
                walk_expr(value, out);
                walk_expr(iter, out);
                if let Some(c) = cond {
                    walk_expr(c, out);
                }
            }
            ExprKind::BinOp { left, right, .. }
            | ExprKind::BoolOp { left, right, .. }
            | ExprKind::Compare { left, right, .. } => {
                walk_expr(left, out);
                walk_expr(right, out);
            }
            ExprKind::UnaryOp { operand, .. } => walk_expr(operand, out),
            ExprKind::IfExp { test, body, orelse } => {
                walk_expr(test, out);
                walk_expr(body, out);
                walk_expr(orelse, out);
            }
            ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
                for e in items {
                    walk_expr(e, out);
                }
            }
            ExprKind::Dict(items) => {
                for (k, v) in items {
                    walk_expr(k, out);
                    walk_expr(v, out);
                }
            }
            ExprKind::Call { func, args } => {
                walk_expr(func, out);
                for a in args {
                    walk_expr(a, out);
                }
            }
            ExprKind::Attribute { value, .. } => walk_expr(value, out),
            ExprKind::Subscript { value, index } => {
                walk_expr(value, out);
                match index {
                    Index::Single(e) => walk_expr(e, out),
                    Index::Slice { lo, hi, step } => {
                        for e in [lo, hi, step].iter().filter_map(|o| o.as_deref()) {
                            walk_expr(e, out);
                        }
                    }
                }
            }
            ExprKind::FString(parts) => {
                for p in parts {
                    if let FStringPart::Expr(e) = p {
                        walk_expr(e, out);
                    }
                }
            }
            _ => {}
        }
    }

    fn walk_stmt(stmt: &Stmt, out: &mut Vec<String>) {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                if let AssignTarget::Name(name, _) = target {
                    add(out, name);
                }
                if let AssignTarget::Subscript { value: base, index, .. } = target {
                    walk_expr(base, out);
                    walk_expr(index, out);
                }
                walk_expr(value, out);
            }
            Stmt::AugAssign { target, value, .. } => {
                if let AssignTarget::Name(name, _) = target {
                    add(out, name);
                }
                walk_expr(value, out);
            }
            Stmt::If { branches, orelse, .. } => {
                for (test, body) in branches {
                    walk_expr(test, out);
                    for s in body {
                        walk_stmt(s, out);
                    }
                }
                for s in orelse {
                    walk_stmt(s, out);
                }
            }
            Stmt::While { test, body, .. } => {
                walk_expr(test, out);
                for s in body {
                    walk_stmt(s, out);
                }
            }
            Stmt::For { var, iter, body, .. } => {
                add(out, var);
                walk_expr(iter, out);
                for s in body {
                    walk_stmt(s, out);
                }
            }
            Stmt::Try { body, handler, orelse, finalbody, .. } => {
                if let Some(name) = &handler.bind_name {
                    add(out, name);
                }
                for s in body.iter().chain(&handler.body).chain(orelse).chain(finalbody) {
                    walk_stmt(s, out);
                }
            }
            Stmt::Return { value: Some(v), .. } => walk_expr(v, out),
            Stmt::ExprStmt { value, .. } => walk_expr(value, out),
            _ => {}
        }
    }

    for p in &f.params {
        add(out, &p.name);
    }
    for stmt in &f.body {
        walk_stmt(stmt, out);
    }
}
