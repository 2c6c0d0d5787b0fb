//! Typed-AST optimization passes
//!
//! `-O1` folds constant arithmetic, boolean and comparison expressions
//! before semantic analysis (folding is purely syntactic, so the checker
//! sees the simplified tree). `-O2` additionally prunes branches with
//! literal conditions and drops functions unreachable from `main` after
//! sema. Clang applies the matching IR-level optimization on top.

use crate::ast::*;
use crate::config::OptimizationLevel;
use std::collections::HashSet;

/// Fold constants in place. Safe before sema: only literal operands are
/// touched, and operations that could raise at runtime (division by zero)
/// are left for the runtime to report.
pub fn fold_module(module: &mut Module, level: OptimizationLevel) {
    if level == OptimizationLevel::O0 {
        return;
    }
    for stmt in &mut module.body {
        fold_stmt(stmt);
    }
}

fn fold_stmt(stmt: &mut Stmt) {
    match stmt {
        Stmt::FunctionDef(f) => {
            for s in &mut f.body {
                fold_stmt(s);
            }
        }
        Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } | Stmt::ExprStmt { value, .. } => {
            fold_expr(value)
        }
        Stmt::If { branches, orelse, .. } => {
            for (test, body) in branches.iter_mut() {
                fold_expr(test);
                for s in body {
                    fold_stmt(s);
                }
            }
            for s in orelse {
                fold_stmt(s);
            }
        }
        Stmt::While { test, body, .. } => {
            fold_expr(test);
            for s in body {
                fold_stmt(s);
            }
        }
        Stmt::For { iter, body, .. } => {
            fold_expr(iter);
            for s in body {
                fold_stmt(s);
            }
        }
        Stmt::Try { body, handler, orelse, finalbody, .. } => {
            for s in body.iter_mut().chain(&mut handler.body).chain(orelse).chain(finalbody) {
                fold_stmt(s);
            }
        }
        Stmt::Return { value: Some(v), .. } => fold_expr(v),
        _ => {}
    }
}

fn fold_expr(expr: &mut Expr) {
    // Fold children first, then try to collapse this node.
    match &mut expr.kind {
        ExprKind::BinOp { left, right, .. }
        | ExprKind::BoolOp { left, right, .. }
        | ExprKind::Compare { left, right, .. } => {
            fold_expr(left);
            fold_expr(right);
        }
        ExprKind::UnaryOp { operand, .. } => fold_expr(operand),
        ExprKind::IfExp { test, body, orelse } => {
            fold_expr(test);
            fold_expr(body);
            fold_expr(orelse);
        }
        ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
            for e in items {
                fold_expr(e);
            }
        }
        ExprKind::Dict(items) => {
            for (k, v) in items {
                fold_expr(k);
                fold_expr(v);
            }
        }
        ExprKind::Call { func, args } => {
            fold_expr(func);
            for a in args {
                fold_expr(a);
            }
        }
        ExprKind::Attribute { value, .. } => fold_expr(value),
        ExprKind::Subscript { value, index } => {
            fold_expr(value);
            match index {
                Index::Single(e) => fold_expr(e),
                Index::Slice { lo, hi, step } => {
                    for e in [lo, hi, step].into_iter().flatten() {
                        fold_expr(e);
                    }
                }
            }
        }
        ExprKind::FString(parts) => {
            for p in parts {
                if let FStringPart::Expr(e) = p {
                    fold_expr(e);
                }
            }
        }
        ExprKind::ListComp { elt, iter, cond, .. } | ExprKind::SetComp { elt, iter, cond, .. } => {
            fold_expr(elt);
            fold_expr(iter);
            if let Some(c) = cond {
                fold_expr(c);
            }
        }
        ExprKind::DictComp { key, value, iter, cond, .. } => {
            fold_expr(key);
            fold_expr(value);
            fold_expr(iter);
            if let Some(c) = cond {
                fold_expr(c);
            }
        }
        _ => {}
    }

    if let Some(folded) = try_fold(expr) {
        expr.kind = folded;
    }
}

fn try_fold(expr: &Expr) -> Option<ExprKind> {
    match &expr.kind {
        ExprKind::BinOp { op, left, right } => fold_binop(*op, left, right),
        ExprKind::UnaryOp { op, operand } => match (op, &operand.kind) {
            (UnaryOpKind::Neg, ExprKind::Int(n)) => Some(ExprKind::Int(n.checked_neg()?)),
            (UnaryOpKind::Neg, ExprKind::Float(f)) => Some(ExprKind::Float(-f)),
            (UnaryOpKind::Not, ExprKind::Bool(b)) => Some(ExprKind::Bool(!b)),
            _ => None,
        },
        ExprKind::BoolOp { op, left, right } => match (&left.kind, op) {
            (ExprKind::Bool(true), BoolOpKind::And) | (ExprKind::Bool(false), BoolOpKind::Or) => {
                Some(right.kind.clone())
            }
            (ExprKind::Bool(false), BoolOpKind::And) => Some(ExprKind::Bool(false)),
            (ExprKind::Bool(true), BoolOpKind::Or) => Some(ExprKind::Bool(true)),
            _ => None,
        },
        ExprKind::Compare { op, left, right } => fold_compare(*op, left, right),
        ExprKind::IfExp { test, body, orelse } => match &test.kind {
            ExprKind::Bool(true) => Some(body.kind.clone()),
            ExprKind::Bool(false) => Some(orelse.kind.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn fold_binop(op: BinOpKind, left: &Expr, right: &Expr) -> Option<ExprKind> {
    match (&left.kind, &right.kind) {
        (ExprKind::Int(a), ExprKind::Int(b)) => match op {
            BinOpKind::Add => Some(ExprKind::Int(a.checked_add(*b)?)),
            BinOpKind::Sub => Some(ExprKind::Int(a.checked_sub(*b)?)),
            BinOpKind::Mul => Some(ExprKind::Int(a.checked_mul(*b)?)),
            // Division folds are left to the runtime so a zero divisor
            // raises at the right place with the right message.
            BinOpKind::Div | BinOpKind::FloorDiv | BinOpKind::Mod => None,
            BinOpKind::Pow => {
                if *b >= 0 && *b < 63 {
                    Some(ExprKind::Int(a.checked_pow(*b as u32)?))
                } else {
                    None
                }
            }
        },
        (ExprKind::Float(a), ExprKind::Float(b)) => match op {
            BinOpKind::Add => Some(ExprKind::Float(a + b)),
            BinOpKind::Sub => Some(ExprKind::Float(a - b)),
            BinOpKind::Mul => Some(ExprKind::Float(a * b)),
            _ => None,
        },
        (ExprKind::Str(a), ExprKind::Str(b)) if op == BinOpKind::Add => {
            Some(ExprKind::Str(format!("{}{}", a, b)))
        }
        _ => None,
    }
}

fn fold_compare(op: CmpOpKind, left: &Expr, right: &Expr) -> Option<ExprKind> {
    let (a, b) = match (&left.kind, &right.kind) {
        (ExprKind::Int(a), ExprKind::Int(b)) => (*a, *b),
        _ => return None,
    };
    let result = match op {
        CmpOpKind::Eq => a == b,
        CmpOpKind::NotEq => a != b,
        CmpOpKind::Lt => a < b,
        CmpOpKind::LtE => a <= b,
        CmpOpKind::Gt => a > b,
        CmpOpKind::GtE => a >= b,
        _ => return None,
    };
    Some(ExprKind::Bool(result))
}

/// `-O2`: remove branches with literal conditions and functions that
/// `main` can never reach. Runs after sema, so every surviving node keeps
/// its recorded type.
pub fn prune_module(module: &mut Module, level: OptimizationLevel) {
    if level != OptimizationLevel::O2 {
        return;
    }
    for stmt in &mut module.body {
        if let Stmt::FunctionDef(f) = stmt {
            prune_block(&mut f.body);
        }
    }

    let mut reachable = HashSet::new();
    let mut queue = vec!["main".to_string()];
    while let Some(name) = queue.pop() {
        if !reachable.insert(name.clone()) {
            continue;
        }
        if let Some(f) = module.find_function(&name) {
            let mut callees = Vec::new();
            for stmt in &f.body {
                collect_calls_stmt(stmt, &mut callees);
            }
            queue.extend(callees);
        }
    }
    module.body.retain(|s| match s {
        Stmt::FunctionDef(f) => reachable.contains(&f.name),
        _ => true,
    });
}

fn prune_block(body: &mut Vec<Stmt>) {
    for stmt in body.iter_mut() {
        match stmt {
            Stmt::If { branches, orelse, .. } => {
                for (_, b) in branches.iter_mut() {
                    prune_block(b);
                }
                prune_block(orelse);
                // Literal-false branches disappear; a literal-true branch
                // makes later branches and the else arm dead. The true
                // branch itself keeps its (typed) test expression.
                branches.retain(|(test, _)| !matches!(test.kind, ExprKind::Bool(false)));
                if let Some(pos) =
                    branches.iter().position(|(test, _)| matches!(test.kind, ExprKind::Bool(true)))
                {
                    branches.truncate(pos + 1);
                    orelse.clear();
                }
            }
            Stmt::While { body, .. } | Stmt::For { body, .. } => prune_block(body),
            Stmt::Try { body, handler, orelse, finalbody, .. } => {
                prune_block(body);
                prune_block(&mut handler.body);
                prune_block(orelse);
                prune_block(finalbody);
            }
            _ => {}
        }
    }
}

fn collect_calls_stmt(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } | Stmt::ExprStmt { value, .. } => {
            collect_calls_expr(value, out)
        }
        Stmt::If { branches, orelse, .. } => {
            for (test, body) in branches {
                collect_calls_expr(test, out);
                for s in body {
                    collect_calls_stmt(s, out);
                }
            }
            for s in orelse {
                collect_calls_stmt(s, out);
            }
        }
        Stmt::While { test, body, .. } => {
            collect_calls_expr(test, out);
            for s in body {
                collect_calls_stmt(s, out);
            }
        }
        Stmt::For { iter, body, .. } => {
            collect_calls_expr(iter, out);
            for s in body {
                collect_calls_stmt(s, out);
            }
        }
        Stmt::Try { body, handler, orelse, finalbody, .. } => {
            for s in body.iter().chain(&handler.body).chain(orelse).chain(finalbody) {
                collect_calls_stmt(s, out);
            }
        }
        Stmt::Return { value: Some(v), .. } => collect_calls_expr(v, out),
        _ => {}
    }
}

fn collect_calls_expr(expr: &Expr, out: &mut Vec<String>) {
    match &expr.kind {
        ExprKind::Call { func, args } => {
            if let ExprKind::Name(name) = &func.kind {
                out.push(name.clone());
            }
            collect_calls_expr(func, out);
            for a in args {
                collect_calls_expr(a, out);
            }
        }
        ExprKind::BinOp { left, right, .. }
        | ExprKind::BoolOp { left, right, .. }
        | ExprKind::Compare { left, right, .. } => {
            collect_calls_expr(left, out);
            collect_calls_expr(right, out);
        }
        ExprKind::UnaryOp { operand, .. } => collect_calls_expr(operand, out),
        ExprKind::IfExp { test, body, orelse } => {
            collect_calls_expr(test, out);
            collect_calls_expr(body, out);
            collect_calls_expr(orelse, out);
        }
        ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
            for e in items {
                collect_calls_expr(e, out);
            }
        }
        ExprKind::Dict(items) => {
            for (k, v) in items {
                collect_calls_expr(k, out);
                collect_calls_expr(v, out);
            }
        }
        ExprKind::Attribute { value, .. } => collect_calls_expr(value, out),
        ExprKind::Subscript { value, index } => {
            collect_calls_expr(value, out);
            match index {
                Index::Single(e) => collect_calls_expr(e, out),
                Index::Slice { lo, hi, step } => {
                    for e in [lo, hi, step].iter().filter_map(|o| o.as_deref()) {
                        collect_calls_expr(e, out);
                    }
                }
            }
        }
        ExprKind::FString(parts) => {
            for p in parts {
                if let FStringPart::Expr(e) = p {
                    collect_calls_expr(e, out);
                }
            }
        }
        ExprKind::ListComp { elt, iter, cond, .. } | ExprKind::SetComp { elt, iter, cond, .. } => {
            collect_calls_expr(elt, out);
            collect_calls_expr(iter, out);
            if let Some(c) = cond {
                collect_calls_expr(c, out);
            }
        }
        ExprKind::DictComp { key, value, iter, cond, .. } => {
            collect_calls_expr(key, out);
            collect_calls_expr(value, out);
            collect_calls_expr(iter, out);
            if let Some(c) = cond {
                collect_calls_expr(c, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::PathBuf;

    fn folded(source: &str) -> Module {
        let mut m = parse(source, &PathBuf::from("test.py")).unwrap();
        fold_module(&mut m, OptimizationLevel::O1);
        m
    }

    #[test]
    fn folds_int_arithmetic() {
        let m = folded("def main() -> int:\n    return 2 + 3 * 4\n");
        let f = m.find_function("main").unwrap();
        let Stmt::Return { value: Some(v), .. } = &f.body[0] else { panic!() };
        assert_eq!(v.kind, ExprKind::Int(14));
    }

    #[test]
    fn folds_string_concat_and_comparisons() {
        let m = folded("def main() -> int:\n    s = 'a' + 'b'\n    ok = 1 < 2\n    return 0\n");
        let f = m.find_function("main").unwrap();
        let Stmt::Assign { value, .. } = &f.body[0] else { panic!() };
        assert_eq!(value.kind, ExprKind::Str("ab".into()));
        let Stmt::Assign { value, .. } = &f.body[1] else { panic!() };
        assert_eq!(value.kind, ExprKind::Bool(true));
    }

    #[test]
    fn division_is_not_folded() {
        let m = folded("def main() -> int:\n    return 4 // 0\n");
        let f = m.find_function("main").unwrap();
        let Stmt::Return { value: Some(v), .. } = &f.body[0] else { panic!() };
        assert!(matches!(v.kind, ExprKind::BinOp { .. }));
    }

    #[test]
    fn o0_leaves_the_tree_alone() {
        let mut m = parse("def main() -> int:\n    return 1 + 1\n", &PathBuf::from("t.py")).unwrap();
        fold_module(&mut m, OptimizationLevel::O0);
        let f = m.find_function("main").unwrap();
        let Stmt::Return { value: Some(v), .. } = &f.body[0] else { panic!() };
        assert!(matches!(v.kind, ExprKind::BinOp { .. }));
    }

    #[test]
    fn unreachable_functions_are_pruned() {
        let mut m = parse(
            "def used() -> int:\n    return 1\ndef unused() -> int:\n    return 2\ndef main() -> int:\n    return used()\n",
            &PathBuf::from("t.py"),
        )
        .unwrap();
        prune_module(&mut m, OptimizationLevel::O2);
        assert!(m.find_function("used").is_some());
        assert!(m.find_function("unused").is_none());
        assert!(m.find_function("main").is_some());
    }

    #[test]
    fn literal_false_branches_disappear() {
        let mut m = folded("def main() -> int:\n    if 1 > 2:\n        return 1\n    return 0\n");
        prune_module(&mut m, OptimizationLevel::O2);
        let f = m.find_function("main").unwrap();
        let Stmt::If { branches, .. } = &f.body[0] else {
            // The whole statement may remain with zero branches; either
            // shape is fine as long as the dead body is gone.
            return;
        };
        assert!(branches.is_empty());
    }
}
