//! Expression lowering
//!
//! Every expression produces an SSA name holding a `%Value`. Typed fast
//! paths keep Int/Float/Bool arithmetic in native instructions; anything
//! dynamically typed goes through the generic runtime entry points.
//! Intermediate owned references are released as they are consumed, so no
//! temporary outlives its statement.

use super::error::CodeGenError;
use super::state::{CodeGen, EmittedValue};
use crate::ast::*;
use crate::typechecker::{Binding, Builtin};
use crate::types::Type;

fn binop_code(op: BinOpKind) -> i64 {
    match op {
        BinOpKind::Add => 0,
        BinOpKind::Sub => 1,
        BinOpKind::Mul => 2,
        BinOpKind::Div => 3,
        BinOpKind::FloorDiv => 4,
        BinOpKind::Mod => 5,
        BinOpKind::Pow => 6,
    }
}

impl CodeGen<'_> {
    pub(super) fn expr_type(&self, expr: &Expr) -> Result<Type, CodeGenError> {
        self.sema
            .expr_types
            .get(&expr.id)
            .cloned()
            .ok_or_else(|| CodeGenError::MissingSemaInfo(format!("expression at line {}", expr.loc.line + 1)))
    }

    fn binding(&self, expr: &Expr) -> Option<&Binding> {
        self.sema.bindings.get(&expr.id)
    }

    /// Lower an expression to an i1 truthiness flag. The value itself is
    /// released here when owned.
    pub(super) fn emit_condition(&mut self, expr: &Expr) -> Result<String, CodeGenError> {
        let ty = self.expr_type(expr)?;
        let v = self.emit_expr(expr)?;
        let flag = self.emit_truthy(&v.ssa, &ty);
        self.release(&v);
        Ok(flag)
    }

    pub(super) fn emit_truthy(&mut self, ssa: &str, ty: &Type) -> String {
        match ty {
            Type::Int | Type::Bool => {
                let p = self.extract_payload(ssa);
                let c = self.temp();
                self.line(format!("{} = icmp ne i64 {}, 0", c, p));
                c
            }
            Type::Float => {
                let f = self.extract_float(ssa);
                let c = self.temp();
                self.line(format!("{} = fcmp one double {}, 0.000000e+00", c, f));
                c
            }
            _ => {
                let t = self.temp();
                self.line(format!("{} = call i64 @pycc_rt_truthy(%Value {})", t, ssa));
                let c = self.temp();
                self.line(format!("{} = icmp ne i64 {}, 0", c, t));
                c
            }
        }
    }

    pub(super) fn emit_expr(&mut self, expr: &Expr) -> Result<EmittedValue, CodeGenError> {
        match &expr.kind {
            ExprKind::Int(n) => {
                let t = self.wrap_payload(1, &n.to_string());
                Ok(EmittedValue::owned(t))
            }
            ExprKind::Float(f) => {
                let bits = f.to_bits();
                let t = self.wrap_payload(2, &(bits as i64).to_string());
                Ok(EmittedValue::owned(t))
            }
            ExprKind::Bool(b) => {
                let t = self.wrap_payload(3, if *b { "1" } else { "0" });
                Ok(EmittedValue::owned(t))
            }
            ExprKind::NoneLit => {
                // None is the all-zero constant; it can stand directly as
                // an operand without an instruction.
                Ok(EmittedValue::owned(CodeGen::none_const().to_string()))
            }
            ExprKind::Str(s) => {
                let t = self.emit_str_literal(s);
                Ok(EmittedValue::owned(t))
            }
            ExprKind::Bytes(b) => {
                let t = self.emit_bytes_literal(b);
                Ok(EmittedValue::owned(t))
            }
            ExprKind::Name(name) => {
                let slot = self.locals.get(name).cloned().ok_or_else(|| {
                    CodeGenError::MissingSemaInfo(format!("local slot for '{}'", name))
                })?;
                let t = self.temp();
                self.line(format!("{} = load %Value, ptr {}", t, slot));
                Ok(EmittedValue::borrowed(t))
            }
            ExprKind::FString(parts) => self.emit_fstring(parts),
            ExprKind::List(items) => self.emit_sequence_literal("pycc_rt_list_new", items),
            ExprKind::Tuple(items) => self.emit_sequence_literal("pycc_rt_tuple_new", items),
            ExprKind::Set(items) => {
                let set = self.temp();
                self.line(format!("{} = call %Value @pycc_rt_set_new()", set));
                for item in items {
                    let v = self.emit_expr(item)?;
                    self.line(format!(
                        "call void @pycc_rt_set_add(%Value {}, %Value {})",
                        set, v.ssa
                    ));
                    self.release(&v);
                }
                Ok(EmittedValue::owned(set))
            }
            ExprKind::Dict(items) => {
                let dict = self.temp();
                self.line(format!("{} = call %Value @pycc_rt_dict_new()", dict));
                for (k, v) in items {
                    let kv = self.emit_expr(k)?;
                    let vv = self.emit_expr(v)?;
                    self.line(format!(
                        "call void @pycc_rt_dict_set(%Value {}, %Value {}, %Value {})",
                        dict, kv.ssa, vv.ssa
                    ));
                    self.release(&kv);
                    self.release(&vv);
                }
                Ok(EmittedValue::owned(dict))
            }
            ExprKind::ListComp { elt, var, iter, cond } => {
                self.emit_comprehension("pycc_rt_list_new", var, iter, cond, |me, out| {
                    let v = me.emit_expr(elt)?;
                    me.line(format!("call void @pycc_rt_list_push(%Value {}, %Value {})", out, v.ssa));
                    me.release(&v);
                    Ok(())
                })
            }
            ExprKind::SetComp { elt, var, iter, cond } => {
                self.emit_comprehension("pycc_rt_set_new", var, iter, cond, |me, out| {
                    let v = me.emit_expr(elt)?;
                    me.line(format!("call void @pycc_rt_set_add(%Value {}, %Value {})", out, v.ssa));
                    me.release(&v);
                    Ok(())
                })
            }
            ExprKind::DictComp { key, value, var, iter, cond } => {
                self.emit_comprehension("pycc_rt_dict_new", var, iter, cond, |me, out| {
                    let kv = me.emit_expr(key)?;
                    let vv = me.emit_expr(value)?;
                    me.line(format!(
                        "call void @pycc_rt_dict_set(%Value {}, %Value {}, %Value {})",
                        out, kv.ssa, vv.ssa
                    ));
                    me.release(&kv);
                    me.release(&vv);
                    Ok(())
                })
            }
            ExprKind::BinOp { op, left, right } => self.emit_binop(*op, left, right),
            ExprKind::UnaryOp { op, operand } => self.emit_unaryop(*op, operand),
            ExprKind::BoolOp { op, left, right } => self.emit_boolop(*op, left, right),
            ExprKind::Compare { op, left, right } => self.emit_compare(*op, left, right),
            ExprKind::IfExp { test, body, orelse } => self.emit_ifexp(test, body, orelse),
            ExprKind::Subscript { value, index } => self.emit_subscript(value, index),
            ExprKind::Attribute { value, attr } => {
                let binding = self.binding(expr).cloned();
                match binding {
                    Some(Binding::NamespaceAttr) => {
                        let base = self.emit_expr(value)?;
                        let name = self.emit_str_literal(attr);
                        let t = self.temp();
                        self.line(format!(
                            "{} = call %Value @pycc_types_getattr(%Value {}, %Value {})",
                            t, base.ssa, name
                        ));
                        self.release(&base);
                        self.line(format!("call void @pycc_rt_release(%Value {})", name));
                        Ok(EmittedValue::owned(t))
                    }
                    _ => Err(CodeGenError::MissingSemaInfo(format!(
                        "attribute binding at line {}",
                        expr.loc.line + 1
                    ))),
                }
            }
            ExprKind::Call { func, args } => self.emit_call(expr, func, args),
        }
    }

    fn emit_sequence_literal(
        &mut self,
        ctor: &str,
        items: &[Expr],
    ) -> Result<EmittedValue, CodeGenError> {
        let seq = self.temp();
        self.line(format!("{} = call %Value @{}()", seq, ctor));
        for item in items {
            let v = self.emit_expr(item)?;
            self.line(format!("call void @pycc_rt_list_push(%Value {}, %Value {})", seq, v.ssa));
            self.release(&v);
        }
        Ok(EmittedValue::owned(seq))
    }

    fn emit_fstring(&mut self, parts: &[FStringPart]) -> Result<EmittedValue, CodeGenError> {
        let mut acc: Option<String> = None;
        for part in parts {
            let piece = match part {
                FStringPart::Text(text) => self.emit_str_literal(text),
                FStringPart::Expr(e) => {
                    let ty = self.expr_type(e)?;
                    let v = self.emit_expr(e)?;
                    if ty == Type::Str {
                        let owned = self.ensure_owned(v);
                        owned.ssa
                    } else {
                        let t = self.temp();
                        self.line(format!("{} = call %Value @pycc_rt_value_str(%Value {})", t, v.ssa));
                        self.release(&v);
                        t
                    }
                }
            };
            acc = Some(match acc {
                None => piece,
                Some(prev) => {
                    let joined = self.temp();
                    self.line(format!(
                        "{} = call %Value @pycc_rt_str_concat(%Value {}, %Value {})",
                        joined, prev, piece
                    ));
                    self.line(format!("call void @pycc_rt_release(%Value {})", prev));
                    self.line(format!("call void @pycc_rt_release(%Value {})", piece));
                    joined
                }
            });
        }
        Ok(EmittedValue::owned(match acc {
            Some(ssa) => ssa,
            None => self.emit_str_literal(""),
        }))
    }

    fn emit_comprehension(
        &mut self,
        ctor: &str,
        var: &str,
        iter: &Expr,
        cond: &Option<Box<Expr>>,
        emit_insert: impl FnOnce(&mut Self, &str) -> Result<(), CodeGenError>,
    ) -> Result<EmittedValue, CodeGenError> {
        let out = self.temp();
        self.line(format!("{} = call %Value @{}()", out, ctor));

        let it = self.emit_expr(iter)?;
        let len = self.temp();
        self.line(format!("{} = call i64 @pycc_rt_iter_len(%Value {})", len, it.ssa));

        let cond_b = self.block("comp_cond");
        let body_b = self.block("comp_body");
        let push_b = self.block("comp_push");
        let inc_b = self.block("comp_inc");
        let end_b = self.block("comp_end");
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
        self.line(format!("{} = call %Value @pycc_rt_iter_get(%Value {}, i64 {})", elem, it.ssa, idx));
        let slot = self.locals.get(var).cloned().ok_or_else(|| {
            CodeGenError::MissingSemaInfo(format!("comprehension slot for '{}'", var))
        })?;
        let old = self.temp();
        self.line(format!("{} = load %Value, ptr {}", old, slot));
        self.line(format!("call void @pycc_rt_release(%Value {})", old));
        self.line(format!("store %Value {}, ptr {}", elem, slot));
        match cond {
            Some(c) => {
                let flag = self.emit_condition(c)?;
                self.line(format!("br i1 {}, label %{}, label %{}", flag, push_b, inc_b));
            }
            None => self.line(format!("br label %{}", push_b)),
        }

        self.start_block(&push_b);
        emit_insert(self, &out)?;
        self.line(format!("br label %{}", inc_b));

        self.start_block(&inc_b);
        self.line(format!("{}.next = add i64 {}, 1", idx, idx));
        self.line(format!("br label %{}", cond_b));

        self.start_block(&end_b);
        self.release(&it);
        Ok(EmittedValue::owned(out))
    }

    fn emit_binop(
        &mut self,
        op: BinOpKind,
        left: &Expr,
        right: &Expr,
    ) -> Result<EmittedValue, CodeGenError> {
        let lt = self.expr_type(left)?;
        let rt = self.expr_type(right)?;
        let l = self.emit_expr(left)?;
        let r = self.emit_expr(right)?;

        let int_like = |t: &Type| matches!(t, Type::Int | Type::Bool);
        let result = if int_like(&lt) && int_like(&rt) {
            let lp = self.extract_payload(&l.ssa);
            let rp = self.extract_payload(&r.ssa);
            match op {
                BinOpKind::Add | BinOpKind::Sub | BinOpKind::Mul => {
                    let instr = match op {
                        BinOpKind::Add => "add",
                        BinOpKind::Sub => "sub",
                        _ => "mul",
                    };
                    let t = self.temp();
                    self.line(format!("{} = {} i64 {}, {}", t, instr, lp, rp));
                    self.wrap_payload(1, &t)
                }
                BinOpKind::Div => {
                    let t = self.temp();
                    self.line(format!("{} = call double @pycc_rt_int_truediv(i64 {}, i64 {})", t, lp, rp));
                    self.wrap_float(&t)
                }
                BinOpKind::FloorDiv => {
                    let t = self.temp();
                    self.line(format!("{} = call i64 @pycc_rt_int_floordiv(i64 {}, i64 {})", t, lp, rp));
                    self.wrap_payload(1, &t)
                }
                BinOpKind::Mod => {
                    let t = self.temp();
                    self.line(format!("{} = call i64 @pycc_rt_int_mod(i64 {}, i64 {})", t, lp, rp));
                    self.wrap_payload(1, &t)
                }
                BinOpKind::Pow => {
                    let t = self.temp();
                    self.line(format!("{} = call i64 @pycc_rt_int_pow(i64 {}, i64 {})", t, lp, rp));
                    self.wrap_payload(1, &t)
                }
            }
        } else if lt.is_numeric() && rt.is_numeric() && lt != Type::Any && rt != Type::Any {
            let lf = self.to_double(&l.ssa, &lt);
            let rf = self.to_double(&r.ssa, &rt);
            match op {
                BinOpKind::Add | BinOpKind::Sub | BinOpKind::Mul => {
                    let instr = match op {
                        BinOpKind::Add => "fadd",
                        BinOpKind::Sub => "fsub",
                        _ => "fmul",
                    };
                    let t = self.temp();
                    self.line(format!("{} = {} double {}, {}", t, instr, lf, rf));
                    self.wrap_float(&t)
                }
                BinOpKind::Div => self.call_float2("pycc_rt_float_div", &lf, &rf),
                BinOpKind::FloorDiv => self.call_float2("pycc_rt_float_floordiv", &lf, &rf),
                BinOpKind::Mod => self.call_float2("pycc_rt_float_mod", &lf, &rf),
                BinOpKind::Pow => self.call_float2("pycc_rt_float_pow", &lf, &rf),
            }
        } else if lt == Type::Str && rt == Type::Str && op == BinOpKind::Add {
            let t = self.temp();
            self.line(format!(
                "{} = call %Value @pycc_rt_str_concat(%Value {}, %Value {})",
                t, l.ssa, r.ssa
            ));
            t
        } else if lt == Type::Bytes && rt == Type::Bytes && op == BinOpKind::Add {
            let t = self.temp();
            self.line(format!(
                "{} = call %Value @pycc_rt_bytes_concat(%Value {}, %Value {})",
                t, l.ssa, r.ssa
            ));
            t
        } else if matches!(lt, Type::List(_)) && matches!(rt, Type::List(_)) && op == BinOpKind::Add {
            let t = self.temp();
            self.line(format!(
                "{} = call %Value @pycc_rt_list_concat(%Value {}, %Value {})",
                t, l.ssa, r.ssa
            ));
            t
        } else {
            let t = self.temp();
            self.line(format!(
                "{} = call %Value @pycc_rt_value_binop(i64 {}, %Value {}, %Value {})",
                t,
                binop_code(op),
                l.ssa,
                r.ssa
            ));
            t
        };

        self.release(&l);
        self.release(&r);
        Ok(EmittedValue::owned(result))
    }

    fn to_double(&mut self, ssa: &str, ty: &Type) -> String {
        match ty {
            Type::Float => self.extract_float(ssa),
            _ => {
                let p = self.extract_payload(ssa);
                let t = self.temp();
                self.line(format!("{} = sitofp i64 {} to double", t, p));
                t
            }
        }
    }

    fn call_float2(&mut self, symbol: &str, lf: &str, rf: &str) -> String {
        let t = self.temp();
        self.line(format!("{} = call double @{}(double {}, double {})", t, symbol, lf, rf));
        self.wrap_float(&t)
    }

    fn emit_unaryop(&mut self, op: UnaryOpKind, operand: &Expr) -> Result<EmittedValue, CodeGenError> {
        let ty = self.expr_type(operand)?;
        match op {
            UnaryOpKind::Not => {
                let flag = self.emit_condition(operand)?;
                let inv = self.temp();
                self.line(format!("{} = xor i1 {}, true", inv, flag));
                let t = self.wrap_bool(&inv);
                Ok(EmittedValue::owned(t))
            }
            UnaryOpKind::Neg => {
                let v = self.emit_expr(operand)?;
                let result = match ty {
                    Type::Int | Type::Bool => {
                        let p = self.extract_payload(&v.ssa);
                        let t = self.temp();
                        self.line(format!("{} = sub i64 0, {}", t, p));
                        self.wrap_payload(1, &t)
                    }
                    Type::Float => {
                        let f = self.extract_float(&v.ssa);
                        let t = self.temp();
                        self.line(format!("{} = fneg double {}", t, f));
                        self.wrap_float(&t)
                    }
                    _ => {
                        let zero = self.wrap_payload(1, "0");
                        let t = self.temp();
                        self.line(format!(
                            "{} = call %Value @pycc_rt_value_binop(i64 {}, %Value {}, %Value {})",
                            t,
                            binop_code(BinOpKind::Sub),
                            zero,
                            v.ssa
                        ));
                        t
                    }
                };
                self.release(&v);
                Ok(EmittedValue::owned(result))
            }
        }
    }

    fn emit_boolop(
        &mut self,
        op: BoolOpKind,
        left: &Expr,
        right: &Expr,
    ) -> Result<EmittedValue, CodeGenError> {
        let lt = self.expr_type(left)?;
        let l = self.emit_expr(left)?;
        let l = self.ensure_owned(l);
        let flag = self.emit_truthy(&l.ssa, &lt);

        let rhs_b = self.block("bool_rhs");
        let end_b = self.block("bool_end");
        let short_block = self.current_block.clone();
        match op {
            BoolOpKind::And => {
                self.line(format!("br i1 {}, label %{}, label %{}", flag, rhs_b, end_b))
            }
            BoolOpKind::Or => {
                self.line(format!("br i1 {}, label %{}, label %{}", flag, end_b, rhs_b))
            }
        }

        self.start_block(&rhs_b);
        self.line(format!("call void @pycc_rt_release(%Value {})", l.ssa));
        let r = self.emit_expr(right)?;
        let r = self.ensure_owned(r);
        let rhs_exit = self.current_block.clone();
        self.line(format!("br label %{}", end_b));

        self.start_block(&end_b);
        let res = self.temp();
        self.line(format!(
            "{} = phi %Value [ {}, %{} ], [ {}, %{} ]",
            res, l.ssa, short_block, r.ssa, rhs_exit
        ));
        Ok(EmittedValue::owned(res))
    }

    fn emit_compare(
        &mut self,
        op: CmpOpKind,
        left: &Expr,
        right: &Expr,
    ) -> Result<EmittedValue, CodeGenError> {
        let lt = self.expr_type(left)?;
        let rt = self.expr_type(right)?;
        let l = self.emit_expr(left)?;
        let r = self.emit_expr(right)?;

        let int_like = |t: &Type| matches!(t, Type::Int | Type::Bool);
        let numeric = lt.is_numeric() && rt.is_numeric() && lt != Type::Any && rt != Type::Any;

        let flag = match op {
            CmpOpKind::In | CmpOpKind::NotIn => {
                let t = self.temp();
                self.line(format!(
                    "{} = call i64 @pycc_rt_contains(%Value {}, %Value {})",
                    t, r.ssa, l.ssa
                ));
                let c = self.temp();
                let pred = if op == CmpOpKind::In { "ne" } else { "eq" };
                self.line(format!("{} = icmp {} i64 {}, 0", c, pred, t));
                c
            }
            CmpOpKind::Is | CmpOpKind::IsNot => {
                let t = self.temp();
                self.line(format!(
                    "{} = call i64 @pycc_rt_value_is(%Value {}, %Value {})",
                    t, l.ssa, r.ssa
                ));
                let c = self.temp();
                let pred = if op == CmpOpKind::Is { "ne" } else { "eq" };
                self.line(format!("{} = icmp {} i64 {}, 0", c, pred, t));
                c
            }
            CmpOpKind::Eq | CmpOpKind::NotEq if !numeric => {
                let t = self.temp();
                self.line(format!(
                    "{} = call i64 @pycc_rt_value_eq(%Value {}, %Value {})",
                    t, l.ssa, r.ssa
                ));
                let c = self.temp();
                let pred = if op == CmpOpKind::Eq { "ne" } else { "eq" };
                self.line(format!("{} = icmp {} i64 {}, 0", c, pred, t));
                c
            }
            _ if numeric && int_like(&lt) && int_like(&rt) => {
                let lp = self.extract_payload(&l.ssa);
                let rp = self.extract_payload(&r.ssa);
                let pred = match op {
                    CmpOpKind::Eq => "eq",
                    CmpOpKind::NotEq => "ne",
                    CmpOpKind::Lt => "slt",
                    CmpOpKind::LtE => "sle",
                    CmpOpKind::Gt => "sgt",
                    CmpOpKind::GtE => "sge",
                    _ => unreachable!(),
                };
                let c = self.temp();
                self.line(format!("{} = icmp {} i64 {}, {}", c, pred, lp, rp));
                c
            }
            _ if numeric => {
                let lf = self.to_double(&l.ssa, &lt);
                let rf = self.to_double(&r.ssa, &rt);
                let pred = match op {
                    CmpOpKind::Eq => "oeq",
                    CmpOpKind::NotEq => "one",
                    CmpOpKind::Lt => "olt",
                    CmpOpKind::LtE => "ole",
                    CmpOpKind::Gt => "ogt",
                    CmpOpKind::GtE => "oge",
                    _ => unreachable!(),
                };
                let c = self.temp();
                self.line(format!("{} = fcmp {} double {}, {}", c, pred, lf, rf));
                c
            }
            _ => {
                // Ordered comparison over strings/sequences/Any.
                let t = self.temp();
                self.line(format!(
                    "{} = call i64 @pycc_rt_value_cmp(%Value {}, %Value {})",
                    t, l.ssa, r.ssa
                ));
                let pred = match op {
                    CmpOpKind::Lt => "slt",
                    CmpOpKind::LtE => "sle",
                    CmpOpKind::Gt => "sgt",
                    CmpOpKind::GtE => "sge",
                    _ => unreachable!(),
                };
                let c = self.temp();
                self.line(format!("{} = icmp {} i64 {}, 0", c, pred, t));
                c
            }
        };

        self.release(&l);
        self.release(&r);
        let t = self.wrap_bool(&flag);
        Ok(EmittedValue::owned(t))
    }

    fn emit_ifexp(
        &mut self,
        test: &Expr,
        body: &Expr,
        orelse: &Expr,
    ) -> Result<EmittedValue, CodeGenError> {
        let flag = self.emit_condition(test)?;
        let then_b = self.block("ife_then");
        let else_b = self.block("ife_else");
        let end_b = self.block("ife_end");
        self.line(format!("br i1 {}, label %{}, label %{}", flag, then_b, else_b));

        self.start_block(&then_b);
        let b = self.emit_expr(body)?;
        let b = self.ensure_owned(b);
        let then_exit = self.current_block.clone();
        self.line(format!("br label %{}", end_b));

        self.start_block(&else_b);
        let o = self.emit_expr(orelse)?;
        let o = self.ensure_owned(o);
        let else_exit = self.current_block.clone();
        self.line(format!("br label %{}", end_b));

        self.start_block(&end_b);
        let res = self.temp();
        self.line(format!(
            "{} = phi %Value [ {}, %{} ], [ {}, %{} ]",
            res, b.ssa, then_exit, o.ssa, else_exit
        ));
        Ok(EmittedValue::owned(res))
    }

    fn emit_subscript(&mut self, value: &Expr, index: &Index) -> Result<EmittedValue, CodeGenError> {
        let base = self.emit_expr(value)?;
        let result = match index {
            Index::Single(index) => {
                let idx = self.emit_expr(index)?;
                let t = self.temp();
                self.line(format!(
                    "{} = call %Value @pycc_rt_index(%Value {}, %Value {})",
                    t, base.ssa, idx.ssa
                ));
                self.release(&idx);
                t
            }
            Index::Slice { lo, hi, step } => {
                let mut bounds = Vec::new();
                for bound in [lo, hi, step] {
                    match bound {
                        Some(e) => bounds.push(Some(self.emit_expr(e)?)),
                        None => bounds.push(None),
                    }
                }
                let operands: Vec<String> = bounds
                    .iter()
                    .map(|b| match b {
                        Some(v) => v.ssa.clone(),
                        None => CodeGen::none_const().to_string(),
                    })
                    .collect();
                let t = self.temp();
                self.line(format!(
                    "{} = call %Value @pycc_rt_slice(%Value {}, %Value {}, %Value {}, %Value {})",
                    t, base.ssa, operands[0], operands[1], operands[2]
                ));
                for b in bounds.iter().flatten() {
                    self.release(b);
                }
                t
            }
        };
        self.release(&base);
        Ok(EmittedValue::owned(result))
    }

    pub(super) fn emit_call(
        &mut self,
        call: &Expr,
        func: &Expr,
        args: &[Expr],
    ) -> Result<EmittedValue, CodeGenError> {
        let binding = self
            .binding(call)
            .cloned()
            .ok_or_else(|| CodeGenError::MissingSemaInfo(format!("call at line {}", call.loc.line + 1)))?;

        match binding {
            Binding::Shim(shim) => {
                let mut values = Vec::new();
                for arg in args {
                    values.push(self.emit_expr(arg)?);
                }
                let mut operands: Vec<String> = values.iter().map(|v| v.ssa.clone()).collect();
                while operands.len() < shim.params.len() {
                    operands.push(CodeGen::none_const().to_string());
                }
                let operand_list: Vec<String> =
                    operands.iter().map(|o| format!("%Value {}", o)).collect();
                let t = self.temp();
                self.line(format!("{} = call %Value @{}({})", t, shim.symbol, operand_list.join(", ")));
                for v in &values {
                    self.release(v);
                }
                Ok(EmittedValue::owned(t))
            }
            Binding::UserFunc(name) => {
                // Callee takes ownership of its arguments.
                let mut values = Vec::new();
                for arg in args {
                    let v = self.emit_expr(arg)?;
                    values.push(self.ensure_owned(v));
                }
                let operand_list: Vec<String> =
                    values.iter().map(|v| format!("%Value {}", v.ssa)).collect();
                let t = self.temp();
                self.line(format!("{} = call %Value @py_{}({})", t, name, operand_list.join(", ")));
                Ok(EmittedValue::owned(t))
            }
            Binding::Builtin(builtin) => {
                let v = self.emit_expr(&args[0])?;
                let result = match builtin {
                    Builtin::Len => {
                        let n = self.temp();
                        self.line(format!("{} = call i64 @pycc_rt_len(%Value {})", n, v.ssa));
                        self.wrap_payload(1, &n)
                    }
                    Builtin::Str => {
                        let t = self.temp();
                        self.line(format!("{} = call %Value @pycc_rt_value_str(%Value {})", t, v.ssa));
                        t
                    }
                    Builtin::Bool => {
                        let arg_ty = self.expr_type(&args[0])?;
                        let flag = self.emit_truthy(&v.ssa, &arg_ty);
                        self.wrap_bool(&flag)
                    }
                    Builtin::Int => {
                        let t = self.temp();
                        self.line(format!("{} = call %Value @pycc_rt_to_int(%Value {})", t, v.ssa));
                        t
                    }
                    Builtin::Float => {
                        let t = self.temp();
                        self.line(format!("{} = call %Value @pycc_rt_to_float(%Value {})", t, v.ssa));
                        t
                    }
                };
                self.release(&v);
                Ok(EmittedValue::owned(result))
            }
            Binding::Isinstance(code) => {
                // The type-name operand never evaluates.
                let v = self.emit_expr(&args[0])?;
                let t = self.temp();
                self.line(format!("{} = call i64 @pycc_rt_isinstance(%Value {}, i64 {})", t, v.ssa, code));
                self.release(&v);
                let c = self.temp();
                self.line(format!("{} = icmp ne i64 {}, 0", c, t));
                let b = self.wrap_bool(&c);
                Ok(EmittedValue::owned(b))
            }
            Binding::ListAppend => {
                let ExprKind::Attribute { value, .. } = &func.kind else {
                    return Err(CodeGenError::Unsupported("append on a non-attribute".into()));
                };
                let list = self.emit_expr(value)?;
                let item = self.emit_expr(&args[0])?;
                self.line(format!(
                    "call void @pycc_rt_list_push(%Value {}, %Value {})",
                    list.ssa, item.ssa
                ));
                self.release(&item);
                self.release(&list);
                Ok(EmittedValue::owned(CodeGen::none_const().to_string()))
            }
            Binding::BytesDecode => {
                let ExprKind::Attribute { value, .. } = &func.kind else {
                    return Err(CodeGenError::Unsupported("decode on a non-attribute".into()));
                };
                let receiver = self.emit_expr(value)?;
                let mut values = Vec::new();
                for arg in args {
                    values.push(self.emit_expr(arg)?);
                }
                let mut operands: Vec<String> = values.iter().map(|v| v.ssa.clone()).collect();
                while operands.len() < 2 {
                    operands.push(CodeGen::none_const().to_string());
                }
                let t = self.temp();
                self.line(format!(
                    "{} = call %Value @pycc_rt_bytes_decode(%Value {}, %Value {}, %Value {})",
                    t, receiver.ssa, operands[0], operands[1]
                ));
                for v in &values {
                    self.release(v);
                }
                self.release(&receiver);
                Ok(EmittedValue::owned(t))
            }
            Binding::FutureFeature(feature) => {
                let name = self.emit_str_literal(&feature);
                let t = self.temp();
                self.line(format!("{} = call %Value @pycc_future_feature(%Value {})", t, name));
                self.line(format!("call void @pycc_rt_release(%Value {})", name));
                Ok(EmittedValue::owned(t))
            }
            Binding::NamespaceAttr => Err(CodeGenError::Unsupported(
                "calling a namespace attribute".into(),
            )),
        }
    }
}
