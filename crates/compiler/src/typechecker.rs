//! Type inference and subset checking (sema pass 3)
//!
//! Bottom-up inference over each function body. Locals are typed at their
//! first assignment and widened by joins on later ones; a join that loses
//! all structure (two unrelated concrete types) is an error rather than a
//! silent fall-back to Any — Any only enters through module boundaries.
//!
//! The checker fills two side tables keyed by expression id: the inferred
//! type of every expression, and the binding of every call/attribute/name
//! that codegen must resolve statically.

use crate::ast::*;
use crate::diagnostics::{CompileError, Diagnostic, Loc};
use crate::modules::{ModuleRegistry, ShimFn};
use crate::resolver::ResolveResult;
use crate::types::{HandleKind, Type};
use std::collections::{HashMap, HashSet};

/// Runtime tag codes for `isinstance` checks; must match the value
/// representation in pycc-runtime.
pub const TAG_CODES: &[(&str, i64)] = &[
    ("int", 1),
    ("float", 2),
    ("bool", 3),
    ("str", 4),
    ("bytes", 5),
    ("list", 6),
    ("tuple", 7),
    ("dict", 8),
    ("set", 9),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Str,
    Bool,
    Int,
    Float,
}

#[derive(Debug, Clone)]
pub enum Binding {
    /// Call of a registered module shim.
    Shim(&'static ShimFn),
    /// Call of a builtin conversion.
    Builtin(Builtin),
    /// `isinstance(x, T)` with the resolved runtime tag code.
    Isinstance(i64),
    /// Call of a user-defined function.
    UserFunc(String),
    /// `list.append(x)` method call.
    ListAppend,
    /// `bytes.decode(...)` method call.
    BytesDecode,
    /// Attribute read on a SimpleNamespace handle.
    NamespaceAttr,
    /// `__future__.<feature>()` call.
    FutureFeature(String),
}

#[derive(Debug, Clone)]
pub struct FnSig {
    pub params: Vec<Type>,
    pub ret: Type,
}

#[derive(Debug, Default)]
pub struct SemaResult {
    pub expr_types: HashMap<ExprId, Type>,
    pub bindings: HashMap<ExprId, Binding>,
    pub fn_sigs: HashMap<String, FnSig>,
}

pub struct TypeChecker<'a> {
    module: &'a Module,
    registry: &'static ModuleRegistry,
    resolve: &'a ResolveResult,
    result: SemaResult,
}

struct Scope<'a> {
    locals: HashMap<String, Type>,
    visible_modules: &'a HashSet<String>,
    /// Bare names bound by `from m import name`.
    from_shims: HashMap<String, &'static ShimFn>,
    return_type: Type,
    fn_name: String,
}

impl<'a> TypeChecker<'a> {
    pub fn new(module: &'a Module, resolve: &'a ResolveResult) -> Self {
        TypeChecker {
            module,
            registry: ModuleRegistry::global(),
            resolve,
            result: SemaResult::default(),
        }
    }

    pub fn check(mut self) -> Result<SemaResult, CompileError> {
        // Signatures first, so calls between user functions check in any
        // definition order.
        for f in self.module.functions() {
            let mut params = Vec::new();
            for p in &f.params {
                params.push(match &p.ann {
                    Some(ann) => self.ann_to_type(ann, p.loc)?,
                    None => Type::Any,
                });
            }
            let ret = match &f.return_ann {
                Some(ann) => self.ann_to_type(ann, f.loc)?,
                None => Type::Any,
            };
            self.result.fn_sigs.insert(f.name.clone(), FnSig { params, ret });
        }

        if let Some(main) = self.result.fn_sigs.get("main") {
            if !main.params.is_empty() {
                let loc = self.module.find_function("main").unwrap().loc;
                return Err(self.err("'main' takes no parameters", loc, None));
            }
            if main.ret != Type::Int {
                let loc = self.module.find_function("main").unwrap().loc;
                return Err(self.err(
                    "'main' must be annotated to return int (the process exit status)",
                    loc,
                    None,
                ));
            }
        }

        for f in self.module.functions() {
            self.check_function(f)?;
        }
        Ok(self.result)
    }

    fn check_function(&mut self, f: &FunctionDef) -> Result<(), CompileError> {
        let sig = self.result.fn_sigs[&f.name].clone();
        let mut scope = Scope {
            locals: HashMap::new(),
            visible_modules: &self.resolve.visible_modules[&f.name],
            from_shims: HashMap::new(),
            return_type: sig.ret.clone(),
            fn_name: f.name.clone(),
        };
        for (p, t) in f.params.iter().zip(&sig.params) {
            scope.locals.insert(p.name.clone(), t.clone());
        }
        self.check_block(&f.body, &mut scope)
    }

    fn check_block(&mut self, body: &[Stmt], scope: &mut Scope) -> Result<(), CompileError> {
        for stmt in body {
            self.check_stmt(stmt, scope)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt, scope: &mut Scope) -> Result<(), CompileError> {
        match stmt {
            Stmt::FunctionDef(f) => {
                Err(self.err(format!("nested function '{}' is not supported", f.name), f.loc, None))
            }
            Stmt::Import { .. } => Ok(()), // validated by the resolver
            Stmt::ImportFrom { module, names, .. } => {
                if module == "__future__" {
                    return Ok(());
                }
                // The registry reference is 'static, so shim borrows are too.
                let registry = self.registry;
                let descriptor = registry.module(module).expect("resolver checked");
                for name in names {
                    let shim = descriptor.find(name).expect("resolver checked");
                    scope.from_shims.insert(name.clone(), shim);
                }
                Ok(())
            }
            Stmt::Assign { target, value, loc } => {
                let value_ty = self.infer(value, scope)?;
                match target {
                    AssignTarget::Name(name, _) => self.bind_local(scope, name, value_ty, *loc),
                    AssignTarget::Subscript { value: base, index, loc } => {
                        let base_ty = self.infer(base, scope)?;
                        let index_ty = self.infer(index, scope)?;
                        self.check_index_store(&base_ty, &index_ty, &value_ty, *loc)
                    }
                }
            }
            Stmt::AugAssign { target, op, value, loc } => {
                let value_ty = self.infer(value, scope)?;
                let target_ty = match target {
                    AssignTarget::Name(name, loc) => scope
                        .locals
                        .get(name)
                        .cloned()
                        .ok_or_else(|| self.err(format!("unresolved name '{}'", name), *loc, None))?,
                    AssignTarget::Subscript { value: base, index, .. } => {
                        let base_ty = self.infer(base, scope)?;
                        let index_ty = self.infer(index, scope)?;
                        self.index_result(&base_ty, &index_ty, *loc)?
                    }
                };
                let result = self.binop_result(*op, &target_ty, &value_ty, *loc)?;
                if !result.compatible_with(&target_ty) {
                    return Err(self.err(
                        format!(
                            "augmented assignment changes the type of the target from {} to {}",
                            target_ty, result
                        ),
                        *loc,
                        None,
                    ));
                }
                Ok(())
            }
            Stmt::If { branches, orelse, .. } => {
                for (test, body) in branches {
                    self.infer(test, scope)?;
                    self.check_block(body, scope)?;
                }
                self.check_block(orelse, scope)
            }
            Stmt::While { test, body, .. } => {
                self.infer(test, scope)?;
                self.check_block(body, scope)
            }
            Stmt::For { var, iter, body, loc } => {
                let iter_ty = self.infer(iter, scope)?;
                let elem = self.element_type(&iter_ty, *loc)?;
                self.bind_local(scope, var, elem, *loc)?;
                self.check_block(body, scope)
            }
            Stmt::Try { body, handler, orelse, finalbody, .. } => {
                self.check_block(body, scope)?;
                if let Some(name) = &handler.bind_name {
                    self.bind_local(scope, name, Type::Str, handler.loc)?;
                }
                self.check_block(&handler.body, scope)?;
                self.check_block(orelse, scope)?;
                self.check_block(finalbody, scope)
            }
            Stmt::Return { value, loc } => {
                let actual = match value {
                    Some(v) => self.infer(v, scope)?,
                    None => Type::NoneType,
                };
                if !actual.compatible_with(&scope.return_type) {
                    return Err(self.err(
                        format!(
                            "'{}' returns {} but is declared to return {}",
                            scope.fn_name, actual, scope.return_type
                        ),
                        *loc,
                        None,
                    ));
                }
                Ok(())
            }
            Stmt::ExprStmt { value, .. } => {
                self.infer(value, scope)?;
                Ok(())
            }
            Stmt::Pass { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => Ok(()),
        }
    }

    fn bind_local(
        &mut self,
        scope: &mut Scope,
        name: &str,
        ty: Type,
        loc: Loc,
    ) -> Result<(), CompileError> {
        if let Some(old) = scope.locals.get(name) {
            let joined = old.join(&ty);
            if joined == Type::Any && *old != Type::Any && ty != Type::Any {
                return Err(self.err(
                    format!("variable '{}' was {} and is reassigned as {}", name, old, ty),
                    loc,
                    Some("the static subset keeps each variable at one type".to_string()),
                ));
            }
            scope.locals.insert(name.to_string(), joined);
        } else {
            scope.locals.insert(name.to_string(), ty);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // expression inference

    fn record(&mut self, expr: &Expr, ty: Type) -> Type {
        self.result.expr_types.insert(expr.id, ty.clone());
        ty
    }

    fn infer(&mut self, expr: &Expr, scope: &mut Scope) -> Result<Type, CompileError> {
        let ty = self.infer_kind(expr, scope)?;
        Ok(self.record(expr, ty))
    }

    fn infer_kind(&mut self, expr: &Expr, scope: &mut Scope) -> Result<Type, CompileError> {
        let loc = expr.loc;
        match &expr.kind {
            ExprKind::Int(_) => Ok(Type::Int),
            ExprKind::Float(_) => Ok(Type::Float),
            ExprKind::Str(_) => Ok(Type::Str),
            ExprKind::Bytes(_) => Ok(Type::Bytes),
            ExprKind::Bool(_) => Ok(Type::Bool),
            ExprKind::NoneLit => Ok(Type::NoneType),
            ExprKind::FString(parts) => {
                for part in parts {
                    if let FStringPart::Expr(e) = part {
                        self.infer(e, scope)?;
                    }
                }
                Ok(Type::Str)
            }
            ExprKind::Name(name) => {
                if let Some(t) = scope.locals.get(name) {
                    return Ok(t.clone());
                }
                if scope.from_shims.contains_key(name) {
                    // Only meaningful in call position; Call handles it.
                    return Ok(Type::Func(name.clone()));
                }
                if scope.visible_modules.contains(name) {
                    return Ok(Type::Module(name.clone()));
                }
                if self.result.fn_sigs.contains_key(name) {
                    return Ok(Type::Func(name.clone()));
                }
                Err(self.err(format!("unresolved name '{}'", name), loc, None))
            }
            ExprKind::List(items) => {
                let mut elem: Option<Type> = None;
                for item in items {
                    let t = self.infer(item, scope)?;
                    elem = Some(match elem {
                        None => t,
                        Some(prev) => prev.join(&t),
                    });
                }
                Ok(Type::list_of(elem.unwrap_or(Type::Any)))
            }
            ExprKind::Tuple(items) => {
                let mut types = Vec::new();
                for item in items {
                    types.push(self.infer(item, scope)?);
                }
                Ok(Type::Tuple(types))
            }
            ExprKind::Set(items) => {
                let mut elem: Option<Type> = None;
                for item in items {
                    let t = self.infer(item, scope)?;
                    self.require_hashable(&t, item.loc)?;
                    elem = Some(match elem {
                        None => t,
                        Some(prev) => prev.join(&t),
                    });
                }
                Ok(Type::set_of(elem.unwrap_or(Type::Any)))
            }
            ExprKind::Dict(items) => {
                let mut key_ty: Option<Type> = None;
                let mut val_ty: Option<Type> = None;
                for (k, v) in items {
                    let kt = self.infer(k, scope)?;
                    self.require_hashable(&kt, k.loc)?;
                    let vt = self.infer(v, scope)?;
                    key_ty = Some(match key_ty {
                        None => kt,
                        Some(prev) => prev.join(&kt),
                    });
                    val_ty = Some(match val_ty {
                        None => vt,
                        Some(prev) => prev.join(&vt),
                    });
                }
                Ok(Type::dict_of(key_ty.unwrap_or(Type::Any), val_ty.unwrap_or(Type::Any)))
            }
            ExprKind::ListComp { elt, var, iter, cond } => {
                let elem = self.check_comp(var, iter, cond, scope, |me, sc| me.infer(elt, sc))?;
                Ok(Type::list_of(elem))
            }
            ExprKind::SetComp { elt, var, iter, cond } => {
                let elem = self.check_comp(var, iter, cond, scope, |me, sc| me.infer(elt, sc))?;
                self.require_hashable(&elem, elt.loc)?;
                Ok(Type::set_of(elem))
            }
            ExprKind::DictComp { key, value, var, iter, cond } => {
                let (kt, vt) = self.check_comp(var, iter, cond, scope, |me, sc| {
                    let kt = me.infer(key, sc)?;
                    let vt = me.infer(value, sc)?;
                    Ok((kt, vt))
                })?;
                self.require_hashable(&kt, key.loc)?;
                Ok(Type::dict_of(kt, vt))
            }
            ExprKind::BinOp { op, left, right } => {
                let lt = self.infer(left, scope)?;
                let rt = self.infer(right, scope)?;
                self.binop_result(*op, &lt, &rt, loc)
            }
            ExprKind::UnaryOp { op, operand } => {
                let t = self.infer(operand, scope)?;
                match op {
                    UnaryOpKind::Not => Ok(Type::Bool),
                    UnaryOpKind::Neg => {
                        if t.is_numeric() {
                            Ok(if t == Type::Bool { Type::Int } else { t })
                        } else {
                            Err(self.err(format!("cannot negate {}", t), loc, None))
                        }
                    }
                }
            }
            ExprKind::BoolOp { left, right, .. } => {
                let lt = self.infer(left, scope)?;
                let rt = self.infer(right, scope)?;
                Ok(lt.join(&rt))
            }
            ExprKind::Compare { op, left, right } => {
                let lt = self.infer(left, scope)?;
                let rt = self.infer(right, scope)?;
                self.compare_check(*op, &lt, &rt, loc)?;
                Ok(Type::Bool)
            }
            ExprKind::IfExp { test, body, orelse } => {
                self.infer(test, scope)?;
                let bt = self.infer(body, scope)?;
                let ot = self.infer(orelse, scope)?;
                Ok(bt.join(&ot))
            }
            ExprKind::Subscript { value, index } => {
                let base = self.infer(value, scope)?;
                match index {
                    Index::Single(index) => {
                        let it = self.infer(index, scope)?;
                        self.index_result(&base, &it, loc)
                    }
                    Index::Slice { lo, hi, step } => {
                        for bound in [lo, hi, step].into_iter().flatten() {
                            let t = self.infer(bound, scope)?;
                            if !matches!(t, Type::Int | Type::Any) {
                                return Err(self.err(
                                    format!("slice bounds must be int, got {}", t),
                                    bound.loc,
                                    None,
                                ));
                            }
                        }
                        match &base {
                            Type::List(t) => Ok(Type::list_of((**t).clone())),
                            Type::Tuple(ts) => {
                                let joined =
                                    ts.iter().fold(Type::Any, |acc, t| if acc == Type::Any { t.clone() } else { acc.join(t) });
                                Ok(Type::list_of(joined))
                            }
                            Type::Str => Ok(Type::Str),
                            Type::Bytes => Ok(Type::Bytes),
                            Type::Any => Ok(Type::Any),
                            other => {
                                Err(self.err(format!("{} is not sliceable", other), loc, None))
                            }
                        }
                    }
                }
            }
            ExprKind::Attribute { value, attr } => {
                let base = self.infer(value, scope)?;
                match base {
                    Type::Handle(HandleKind::Namespace) => {
                        self.result.bindings.insert(expr.id, Binding::NamespaceAttr);
                        Ok(Type::Any)
                    }
                    Type::Module(_) => Err(self.err(
                        format!("module attribute '{}' must be called", attr),
                        loc,
                        Some("module members are functions in this subset".to_string()),
                    )),
                    other => Err(self.err(
                        format!("{} has no readable attribute '{}'", other, attr),
                        loc,
                        None,
                    )),
                }
            }
            ExprKind::Call { func, args } => self.check_call(expr.id, func, args, scope, loc),
        }
    }

    fn check_comp<T>(
        &mut self,
        var: &str,
        iter: &Expr,
        cond: &Option<Box<Expr>>,
        scope: &mut Scope,
        body: impl FnOnce(&mut Self, &mut Scope) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        let iter_ty = self.infer(iter, scope)?;
        let elem = self.element_type(&iter_ty, iter.loc)?;
        let shadowed = scope.locals.insert(var.to_string(), elem);
        if let Some(cond) = cond {
            self.infer(cond, scope)?;
        }
        let out = body(self, scope)?;
        match shadowed {
            Some(prev) => {
                scope.locals.insert(var.to_string(), prev);
            }
            None => {
                scope.locals.remove(var);
            }
        }
        Ok(out)
    }

    fn check_call(
        &mut self,
        call_id: ExprId,
        func: &Expr,
        args: &[Expr],
        scope: &mut Scope,
        loc: Loc,
    ) -> Result<Type, CompileError> {
        // Builtins and user functions: a bare name in call position.
        if let ExprKind::Name(name) = &func.kind {
            if !scope.locals.contains_key(name) {
                if let Some(t) = self.check_builtin_call(call_id, name, args, scope, loc)? {
                    return Ok(t);
                }
                if let Some(shim) = scope.from_shims.get(name).copied() {
                    return self.check_shim_call(call_id, shim, args, scope, loc);
                }
                if let Some(sig) = self.result.fn_sigs.get(name).cloned() {
                    if args.len() != sig.params.len() {
                        return Err(self.err(
                            format!(
                                "'{}' takes {} argument(s), got {}",
                                name,
                                sig.params.len(),
                                args.len()
                            ),
                            loc,
                            None,
                        ));
                    }
                    for (arg, param) in args.iter().zip(&sig.params) {
                        let at = self.infer(arg, scope)?;
                        if !at.compatible_with(param) {
                            return Err(self.err(
                                format!("argument to '{}' has type {}, expected {}", name, at, param),
                                arg.loc,
                                None,
                            ));
                        }
                    }
                    self.result.bindings.insert(call_id, Binding::UserFunc(name.clone()));
                    return Ok(sig.ret);
                }
            }
        }

        // module.attr(...) and method calls.
        if let ExprKind::Attribute { value, attr } = &func.kind {
            // Resolve the base without treating `module.attr` as an error.
            if let ExprKind::Name(base_name) = &value.kind {
                if !scope.locals.contains_key(base_name) {
                    if base_name == "__future__" && scope.visible_modules.contains("__future__") {
                        if !args.is_empty() {
                            return Err(self.err(
                                "__future__ feature probes take no arguments",
                                loc,
                                None,
                            ));
                        }
                        self.result
                            .bindings
                            .insert(call_id, Binding::FutureFeature(attr.clone()));
                        self.record(value, Type::Module(base_name.clone()));
                        return Ok(Type::Bool);
                    }
                    if scope.visible_modules.contains(base_name.as_str()) {
                        let registry = self.registry;
                        let descriptor = registry.module(base_name).ok_or_else(|| {
                            self.err(format!("unknown module '{}'", base_name), loc, None)
                        })?;
                        let shim = descriptor.find(attr).ok_or_else(|| {
                            self.err(
                                format!("module '{}' has no attribute '{}'", base_name, attr),
                                loc,
                                None,
                            )
                        })?;
                        self.record(value, Type::Module(base_name.clone()));
                        return self.check_shim_call(call_id, shim, args, scope, loc);
                    }
                }
            }

            // Value methods on a typed receiver.
            let base_ty = self.infer(value, scope)?;
            match (&base_ty, attr.as_str()) {
                (Type::List(elem), "append") => {
                    if args.len() != 1 {
                        return Err(self.err("append takes exactly one argument", loc, None));
                    }
                    let at = self.infer(&args[0], scope)?;
                    if !at.compatible_with(elem) {
                        return Err(self.err(
                            format!("cannot append {} to list[{}]", at, elem),
                            args[0].loc,
                            None,
                        ));
                    }
                    self.result.bindings.insert(call_id, Binding::ListAppend);
                    return Ok(Type::NoneType);
                }
                (Type::Bytes, "decode") => {
                    if args.len() > 2 {
                        return Err(self.err("decode takes at most two arguments", loc, None));
                    }
                    for arg in args {
                        let at = self.infer(arg, scope)?;
                        if !at.compatible_with(&Type::Str) {
                            return Err(self.err(
                                format!("decode arguments must be str, got {}", at),
                                arg.loc,
                                None,
                            ));
                        }
                    }
                    self.result.bindings.insert(call_id, Binding::BytesDecode);
                    return Ok(Type::Str);
                }
                _ => {
                    return Err(self.err(
                        format!("{} has no method '{}'", base_ty, attr),
                        loc,
                        None,
                    ))
                }
            }
        }

        let fty = self.infer(func, scope)?;
        Err(self.err(format!("{} is not callable", fty), loc, None))
    }

    fn check_builtin_call(
        &mut self,
        call_id: ExprId,
        name: &str,
        args: &[Expr],
        scope: &mut Scope,
        loc: Loc,
    ) -> Result<Option<Type>, CompileError> {
        let builtin = match name {
            "len" => Some((Builtin::Len, Type::Int)),
            "str" => Some((Builtin::Str, Type::Str)),
            "bool" => Some((Builtin::Bool, Type::Bool)),
            "int" => Some((Builtin::Int, Type::Int)),
            "float" => Some((Builtin::Float, Type::Float)),
            _ => None,
        };
        if let Some((builtin, ret)) = builtin {
            if args.len() != 1 {
                return Err(self.err(format!("{}() takes exactly one argument", name), loc, None));
            }
            let at = self.infer(&args[0], scope)?;
            if builtin == Builtin::Len && !at.is_sized() {
                return Err(self.err(format!("{} has no length", at), args[0].loc, None));
            }
            self.result.bindings.insert(call_id, Binding::Builtin(builtin));
            return Ok(Some(ret));
        }
        if name == "isinstance" {
            if args.len() != 2 {
                return Err(self.err("isinstance() takes exactly two arguments", loc, None));
            }
            self.infer(&args[0], scope)?;
            let ExprKind::Name(type_name) = &args[1].kind else {
                return Err(self.err(
                    "the second argument of isinstance() must be a builtin type name",
                    args[1].loc,
                    None,
                ));
            };
            let Some((_, code)) = TAG_CODES.iter().find(|(n, _)| n == type_name) else {
                return Err(self.err(
                    format!("unknown type name '{}' in isinstance()", type_name),
                    args[1].loc,
                    None,
                ));
            };
            // The type-name operand is consumed here; it is not a value.
            self.record(&args[1], Type::Any);
            self.result.bindings.insert(call_id, Binding::Isinstance(*code));
            return Ok(Some(Type::Bool));
        }
        Ok(None)
    }

    fn check_shim_call(
        &mut self,
        call_id: ExprId,
        shim: &'static ShimFn,
        args: &[Expr],
        scope: &mut Scope,
        loc: Loc,
    ) -> Result<Type, CompileError> {
        if args.len() < shim.min_args || args.len() > shim.params.len() {
            let expected = if shim.min_args == shim.params.len() {
                format!("{}", shim.params.len())
            } else {
                format!("{}..{}", shim.min_args, shim.params.len())
            };
            return Err(self.err(
                format!("'{}' takes {} argument(s), got {}", shim.name, expected, args.len()),
                loc,
                None,
            ));
        }
        for (arg, param) in args.iter().zip(&shim.params) {
            let at = self.infer(arg, scope)?;
            if !at.compatible_with(param) {
                return Err(self.err(
                    format!("argument to '{}' has type {}, expected {}", shim.name, at, param),
                    arg.loc,
                    None,
                ));
            }
        }
        self.result.bindings.insert(call_id, Binding::Shim(shim));
        Ok(shim.ret.clone())
    }

    // ------------------------------------------------------------------
    // type rules

    fn binop_result(
        &self,
        op: BinOpKind,
        lt: &Type,
        rt: &Type,
        loc: Loc,
    ) -> Result<Type, CompileError> {
        if *lt == Type::Any || *rt == Type::Any {
            return Ok(Type::Any);
        }
        let numeric = lt.is_numeric() && rt.is_numeric();
        match op {
            BinOpKind::Add => {
                if numeric {
                    return Ok(self.numeric_join(lt, rt));
                }
                match (lt, rt) {
                    (Type::Str, Type::Str) => Ok(Type::Str),
                    (Type::Bytes, Type::Bytes) => Ok(Type::Bytes),
                    (Type::List(a), Type::List(b)) => Ok(Type::list_of(a.join(b))),
                    _ => Err(self.err(format!("cannot add {} and {}", lt, rt), loc, None)),
                }
            }
            BinOpKind::Div => {
                if numeric {
                    Ok(Type::Float)
                } else {
                    Err(self.err(format!("cannot divide {} by {}", lt, rt), loc, None))
                }
            }
            BinOpKind::FloorDiv => {
                if numeric {
                    Ok(self.numeric_join(lt, rt))
                } else {
                    Err(self.err(format!("cannot floor-divide {} by {}", lt, rt), loc, None))
                }
            }
            BinOpKind::Sub | BinOpKind::Mul | BinOpKind::Mod | BinOpKind::Pow => {
                if numeric {
                    Ok(self.numeric_join(lt, rt))
                } else {
                    Err(self.err(
                        format!("operator '{}' needs numeric operands, got {} and {}", op.symbol(), lt, rt),
                        loc,
                        None,
                    ))
                }
            }
        }
    }

    fn numeric_join(&self, lt: &Type, rt: &Type) -> Type {
        if *lt == Type::Float || *rt == Type::Float {
            Type::Float
        } else {
            Type::Int
        }
    }

    fn compare_check(
        &self,
        op: CmpOpKind,
        lt: &Type,
        rt: &Type,
        loc: Loc,
    ) -> Result<(), CompileError> {
        match op {
            CmpOpKind::Eq | CmpOpKind::NotEq | CmpOpKind::Is | CmpOpKind::IsNot => Ok(()),
            CmpOpKind::In | CmpOpKind::NotIn => {
                if rt.is_sized() {
                    Ok(())
                } else {
                    Err(self.err(format!("'in' needs a container, got {}", rt), loc, None))
                }
            }
            _ => {
                let ok = (lt.is_numeric() && rt.is_numeric())
                    || *lt == Type::Any
                    || *rt == Type::Any
                    || (lt == rt
                        && matches!(lt, Type::Str | Type::Bytes | Type::List(_) | Type::Tuple(_)));
                if ok {
                    Ok(())
                } else {
                    Err(self.err(format!("cannot order {} and {}", lt, rt), loc, None))
                }
            }
        }
    }

    fn index_result(&self, base: &Type, index: &Type, loc: Loc) -> Result<Type, CompileError> {
        match base {
            Type::List(t) => {
                self.require_int_index(index, loc)?;
                Ok((**t).clone())
            }
            Type::Tuple(ts) => {
                self.require_int_index(index, loc)?;
                Ok(ts.iter().fold(Type::Any, |acc, t| if acc == Type::Any { t.clone() } else { acc.join(t) }))
            }
            Type::Str => {
                self.require_int_index(index, loc)?;
                Ok(Type::Str)
            }
            Type::Bytes => {
                self.require_int_index(index, loc)?;
                Ok(Type::Int)
            }
            Type::Dict(k, v) => {
                if !index.compatible_with(k) {
                    return Err(self.err(
                        format!("dict key has type {}, expected {}", index, k),
                        loc,
                        None,
                    ));
                }
                Ok((**v).clone())
            }
            Type::Any => Ok(Type::Any),
            other => Err(self.err(format!("{} is not subscriptable", other), loc, None)),
        }
    }

    fn require_int_index(&self, index: &Type, loc: Loc) -> Result<(), CompileError> {
        if matches!(index, Type::Int | Type::Bool | Type::Any) {
            Ok(())
        } else {
            Err(self.err(format!("sequence index must be int, got {}", index), loc, None))
        }
    }

    fn check_index_store(
        &self,
        base: &Type,
        index: &Type,
        value: &Type,
        loc: Loc,
    ) -> Result<(), CompileError> {
        match base {
            Type::List(t) => {
                self.require_int_index(index, loc)?;
                if !value.compatible_with(t) {
                    return Err(self.err(
                        format!("cannot store {} into list[{}]", value, t),
                        loc,
                        None,
                    ));
                }
                Ok(())
            }
            Type::Dict(k, v) => {
                if !index.compatible_with(k) {
                    return Err(self.err(
                        format!("dict key has type {}, expected {}", index, k),
                        loc,
                        None,
                    ));
                }
                if !value.compatible_with(v) {
                    return Err(self.err(
                        format!("cannot store {} into dict[{}, {}]", value, k, v),
                        loc,
                        None,
                    ));
                }
                Ok(())
            }
            Type::Any => Ok(()),
            other => Err(self.err(format!("{} does not support item assignment", other), loc, None)),
        }
    }

    fn element_type(&self, iter: &Type, loc: Loc) -> Result<Type, CompileError> {
        match iter {
            Type::List(t) | Type::Set(t) => Ok((**t).clone()),
            Type::Tuple(ts) => {
                Ok(ts.iter().fold(Type::Any, |acc, t| if acc == Type::Any { t.clone() } else { acc.join(t) }))
            }
            Type::Str => Ok(Type::Str),
            Type::Dict(k, _) => Ok((**k).clone()),
            Type::Any => Ok(Type::Any),
            other => Err(self.err(format!("{} is not iterable", other), loc, None)),
        }
    }

    fn require_hashable(&self, t: &Type, loc: Loc) -> Result<(), CompileError> {
        match t {
            Type::Int | Type::Bool | Type::Str | Type::Any => Ok(()),
            other => Err(self.err(
                format!("{} is not hashable (keys must be int, bool or str)", other),
                loc,
                None,
            )),
        }
    }

    fn ann_to_type(&self, ann: &TypeAnn, loc: Loc) -> Result<Type, CompileError> {
        match ann {
            TypeAnn::Name(name) => match name.as_str() {
                "int" => Ok(Type::Int),
                "float" => Ok(Type::Float),
                "bool" => Ok(Type::Bool),
                "str" => Ok(Type::Str),
                "bytes" => Ok(Type::Bytes),
                "None" => Ok(Type::NoneType),
                "Any" => Ok(Type::Any),
                other => Err(self.err(format!("unknown type annotation '{}'", other), loc, None)),
            },
            TypeAnn::Generic(name, args) => match (name.as_str(), args.len()) {
                ("list", 1) => Ok(Type::list_of(self.ann_to_type(&args[0], loc)?)),
                ("set", 1) => Ok(Type::set_of(self.ann_to_type(&args[0], loc)?)),
                ("dict", 2) => Ok(Type::dict_of(
                    self.ann_to_type(&args[0], loc)?,
                    self.ann_to_type(&args[1], loc)?,
                )),
                ("tuple", _) => {
                    let mut ts = Vec::new();
                    for a in args {
                        ts.push(self.ann_to_type(a, loc)?);
                    }
                    Ok(Type::Tuple(ts))
                }
                _ => Err(self.err(format!("unknown type annotation '{}'", name), loc, None)),
            },
        }
    }

    fn err(&self, message: impl Into<String>, loc: Loc, note: Option<String>) -> CompileError {
        let mut d = Diagnostic::error("sema", message, &self.module.file, loc);
        if let Some(note) = note {
            d = d.with_note(note);
        }
        CompileError::Sema(d)
    }
}

/// Run resolution and type checking on a parsed module.
pub fn analyze(module: &Module) -> Result<SemaResult, CompileError> {
    let resolve = crate::resolver::Resolver::new(module).resolve()?;
    TypeChecker::new(module, &resolve).check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::PathBuf;

    fn analyze_src(source: &str) -> Result<SemaResult, CompileError> {
        let module = parse(source, &PathBuf::from("test.py")).unwrap();
        analyze(&module)
    }

    fn sema_err(source: &str) -> String {
        match analyze_src(source) {
            Err(CompileError::Sema(d)) => d.message,
            other => panic!("expected sema error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn arithmetic_rules() {
        let src = "def main() -> int:\n    a = 1 + 2\n    b = 1 / 2\n    c = 7 // 2\n    d = 1.5 + 1\n    return a\n";
        let r = analyze_src(src).unwrap();
        let types: Vec<&Type> = r.expr_types.values().collect();
        assert!(types.contains(&&Type::Float));
        assert!(types.contains(&&Type::Int));
    }

    #[test]
    fn int_division_yields_float() {
        let msg = sema_err("def main() -> int:\n    return 1 / 2\n");
        assert!(msg.contains("returns float"));
    }

    #[test]
    fn module_calls_bind_shims() {
        let src = "def main() -> int:\n    import hashlib, io\n    h = hashlib.sha256('x')\n    io.write_stdout(h)\n    return 0\n";
        let r = analyze_src(src).unwrap();
        let shims: Vec<&str> = r
            .bindings
            .values()
            .filter_map(|b| match b {
                Binding::Shim(s) => Some(s.symbol),
                _ => None,
            })
            .collect();
        assert!(shims.contains(&"pycc_hashlib_sha256"));
        assert!(shims.contains(&"pycc_io_write_stdout"));
    }

    #[test]
    fn unknown_module_attribute() {
        let msg = sema_err("def main() -> int:\n    import json\n    json.missing('x')\n    return 0\n");
        assert!(msg.contains("no attribute 'missing'"));
    }

    #[test]
    fn arity_is_checked() {
        let msg = sema_err("def main() -> int:\n    import hashlib\n    hashlib.sha256('a', 'b')\n    return 0\n");
        assert!(msg.contains("argument"));
    }

    #[test]
    fn argument_types_are_checked() {
        let msg = sema_err("def main() -> int:\n    import textwrap\n    textwrap.fill('x', 'wide')\n    return 0\n");
        assert!(msg.contains("expected int"));
    }

    #[test]
    fn optional_shim_arguments() {
        let src = "def main() -> int:\n    import html\n    a = html.escape('<&>')\n    b = html.escape('q', 1)\n    return len(a) + len(b) - len(a) - len(b)\n";
        analyze_src(src).unwrap();
    }

    #[test]
    fn conflicting_reassignment_is_rejected() {
        let msg = sema_err("def main() -> int:\n    x = 'a'\n    x = 1\n    return 0\n");
        assert!(msg.contains("reassigned"));
    }

    #[test]
    fn any_narrows_through_reassignment() {
        let src = "def main() -> int:\n    import json\n    x = json.loads('1')\n    x = json.loads('2')\n    return 0\n";
        analyze_src(src).unwrap();
    }

    #[test]
    fn empty_list_then_heap_ops() {
        let src = "def main() -> int:\n    import heapq\n    a = []\n    heapq.heappush(a, 3)\n    x = heapq.heappop(a)\n    return 0\n";
        analyze_src(src).unwrap();
    }

    #[test]
    fn list_append_method() {
        let src = "def main() -> int:\n    xs = [1]\n    xs.append(2)\n    return len(xs)\n";
        let r = analyze_src(src).unwrap();
        assert!(r.bindings.values().any(|b| matches!(b, Binding::ListAppend)));
    }

    #[test]
    fn append_wrong_type_rejected() {
        let msg = sema_err("def main() -> int:\n    xs = [1]\n    xs.append('x')\n    return 0\n");
        assert!(msg.contains("append"));
    }

    #[test]
    fn bytes_decode_method() {
        let src = "def main() -> int:\n    import base64\n    d = base64.b64decode('aGk=')\n    s = d.decode('ascii', 'strict')\n    return len(s)\n";
        let r = analyze_src(src).unwrap();
        assert!(r.bindings.values().any(|b| matches!(b, Binding::BytesDecode)));
    }

    #[test]
    fn isinstance_resolves_tag() {
        let src = "def main() -> int:\n    import calendar\n    mr = calendar.monthrange(2024, 2)\n    ok = isinstance(mr, list)\n    return 0\n";
        let r = analyze_src(src).unwrap();
        assert!(r.bindings.values().any(|b| matches!(b, Binding::Isinstance(6))));
    }

    #[test]
    fn match_compares_against_none() {
        let src = "def main() -> int:\n    import re\n    ok = (re.search('a', 'abc') != None)\n    return 0 if ok else 1\n";
        analyze_src(src).unwrap();
    }

    #[test]
    fn future_feature_probe() {
        let src = "def main() -> int:\n    import __future__\n    a = __future__.annotations()\n    return 0 if a else 1\n";
        let r = analyze_src(src).unwrap();
        assert!(r
            .bindings
            .values()
            .any(|b| matches!(b, Binding::FutureFeature(f) if f == "annotations")));
    }

    #[test]
    fn namespace_attribute_reads() {
        let src = "def main() -> int:\n    import types\n    ns = types.SimpleNamespace([['name', 'bob']])\n    n = ns.name\n    return 0\n";
        let r = analyze_src(src).unwrap();
        assert!(r.bindings.values().any(|b| matches!(b, Binding::NamespaceAttr)));
    }

    #[test]
    fn ordering_unrelated_types_rejected() {
        let msg = sema_err("def main() -> int:\n    ok = 'a' < 1\n    return 0\n");
        assert!(msg.contains("cannot order"));
    }

    #[test]
    fn user_function_calls_check_arity() {
        let msg = sema_err(
            "def helper(x: int) -> int:\n    return x\ndef main() -> int:\n    return helper(1, 2)\n",
        );
        assert!(msg.contains("takes 1 argument"));
    }

    #[test]
    fn main_must_return_int() {
        let msg = sema_err("def main() -> str:\n    return 'x'\n");
        assert!(msg.contains("main"));
    }

    #[test]
    fn for_loop_elements_are_typed() {
        let src = "def main() -> int:\n    total = 0\n    for x in [1, 2, 3]:\n        total = total + x\n    return total\n";
        analyze_src(src).unwrap();
    }

    #[test]
    fn dict_subscript_types() {
        let src = "def main() -> int:\n    d = {'a': 1, 'b': 2}\n    return d['a']\n";
        analyze_src(src).unwrap();
    }

    #[test]
    fn heterogeneous_dict_values_join_to_any() {
        let src = "def main() -> int:\n    import json\n    obj = {'a': 1, 'b': [2, 3]}\n    s = json.dumps(obj)\n    return len(s) - len(s)\n";
        analyze_src(src).unwrap();
    }

    #[test]
    fn except_binding_is_str() {
        let src = "def main() -> int:\n    x = 0\n    try:\n        x = 1\n    except Exception as e:\n        x = len(e)\n    return x\n";
        analyze_src(src).unwrap();
    }
}
