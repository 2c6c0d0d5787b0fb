//! Name and import resolution (sema passes 1 and 2)
//!
//! Pass 1 collects top-level functions and rejects anything else at module
//! scope except imports. Pass 2 validates every import against the module
//! registry and records, per function, which module names are in scope.
//! Type inference (pass 3) lives in `typechecker.rs`.

use crate::ast::{Module, Stmt};
use crate::diagnostics::{CompileError, Diagnostic};
use crate::modules::ModuleRegistry;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct ResolveResult {
    /// User-defined function names, in definition order.
    pub functions: Vec<String>,
    /// Module names visible inside each function (module-level imports
    /// plus the function's own import statements).
    pub visible_modules: HashMap<String, HashSet<String>>,
}

pub struct Resolver<'a> {
    registry: &'static ModuleRegistry,
    module: &'a Module,
}

impl<'a> Resolver<'a> {
    pub fn new(module: &'a Module) -> Self {
        Resolver { registry: ModuleRegistry::global(), module }
    }

    pub fn resolve(&self) -> Result<ResolveResult, CompileError> {
        let mut result = ResolveResult::default();
        let mut module_imports: HashSet<String> = HashSet::new();
        let mut seen: HashMap<String, crate::diagnostics::Loc> = HashMap::new();

        for stmt in &self.module.body {
            match stmt {
                Stmt::FunctionDef(f) => {
                    if let Some(prev) = seen.get(&f.name) {
                        return Err(self.err(
                            format!("function '{}' is defined twice", f.name),
                            f.loc,
                            Some(format!("previous definition at line {}", prev.line + 1)),
                        ));
                    }
                    seen.insert(f.name.clone(), f.loc);
                    result.functions.push(f.name.clone());
                }
                Stmt::Import { names, loc } => {
                    for name in names {
                        self.check_module(name, *loc)?;
                        module_imports.insert(name.clone());
                    }
                }
                Stmt::ImportFrom { module, names, loc } => {
                    self.check_module(module, *loc)?;
                    self.check_from_names(module, names, *loc)?;
                    module_imports.insert(module.clone());
                }
                other => {
                    return Err(self.err(
                        "only imports and function definitions are allowed at module level",
                        other.loc(),
                        None,
                    ))
                }
            }
        }

        if !seen.contains_key("main") {
            return Err(self.err(
                "no 'main' function defined",
                crate::diagnostics::Loc::default(),
                Some("every program needs 'def main() -> int:'".to_string()),
            ));
        }

        for f in self.module.functions() {
            let mut visible = module_imports.clone();
            self.collect_function_imports(&f.body, &mut visible)?;
            result.visible_modules.insert(f.name.clone(), visible);
        }

        Ok(result)
    }

    fn collect_function_imports(
        &self,
        body: &[Stmt],
        visible: &mut HashSet<String>,
    ) -> Result<(), CompileError> {
        for stmt in body {
            match stmt {
                Stmt::Import { names, loc } => {
                    for name in names {
                        self.check_module(name, *loc)?;
                        visible.insert(name.clone());
                    }
                }
                Stmt::ImportFrom { module, names, loc } => {
                    self.check_module(module, *loc)?;
                    self.check_from_names(module, names, *loc)?;
                    visible.insert(module.clone());
                }
                Stmt::If { branches, orelse, .. } => {
                    for (_, body) in branches {
                        self.collect_function_imports(body, visible)?;
                    }
                    self.collect_function_imports(orelse, visible)?;
                }
                Stmt::While { body, .. } | Stmt::For { body, .. } => {
                    self.collect_function_imports(body, visible)?;
                }
                Stmt::Try { body, handler, orelse, finalbody, .. } => {
                    self.collect_function_imports(body, visible)?;
                    self.collect_function_imports(&handler.body, visible)?;
                    self.collect_function_imports(orelse, visible)?;
                    self.collect_function_imports(finalbody, visible)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_module(&self, name: &str, loc: crate::diagnostics::Loc) -> Result<(), CompileError> {
        if self.registry.is_module(name) {
            Ok(())
        } else {
            Err(self.err(
                format!("unknown module '{}'", name),
                loc,
                Some("the module registry lists every importable module".to_string()),
            ))
        }
    }

    fn check_from_names(
        &self,
        module: &str,
        names: &[String],
        loc: crate::diagnostics::Loc,
    ) -> Result<(), CompileError> {
        if module == "__future__" {
            return Ok(());
        }
        let descriptor = self.registry.module(module).expect("checked by check_module");
        for name in names {
            if descriptor.find(name).is_none() {
                return Err(self.err(
                    format!("module '{}' has no attribute '{}'", module, name),
                    loc,
                    None,
                ));
            }
        }
        Ok(())
    }

    fn err(
        &self,
        message: impl Into<String>,
        loc: crate::diagnostics::Loc,
        note: Option<String>,
    ) -> CompileError {
        let mut d = Diagnostic::error("sema", message, &self.module.file, loc);
        if let Some(note) = note {
            d = d.with_note(note);
        }
        CompileError::Sema(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::PathBuf;

    fn resolve(source: &str) -> Result<ResolveResult, CompileError> {
        let module = parse(source, &PathBuf::from("test.py")).unwrap();
        Resolver::new(&module).resolve()
    }

    #[test]
    fn collects_functions_and_imports() {
        let r = resolve("import json\ndef helper() -> int:\n    return 1\ndef main() -> int:\n    import io\n    return 0\n")
            .unwrap();
        assert_eq!(r.functions, vec!["helper".to_string(), "main".to_string()]);
        let main_mods = &r.visible_modules["main"];
        assert!(main_mods.contains("json"));
        assert!(main_mods.contains("io"));
        let helper_mods = &r.visible_modules["helper"];
        assert!(helper_mods.contains("json"));
        assert!(!helper_mods.contains("io"));
    }

    #[test]
    fn unknown_module_is_rejected() {
        let err = resolve("def main() -> int:\n    import socket\n    return 0\n").unwrap_err();
        let CompileError::Sema(d) = err else { panic!("expected sema error") };
        assert!(d.message.contains("unknown module 'socket'"));
    }

    #[test]
    fn missing_main_is_rejected() {
        let err = resolve("def helper() -> int:\n    return 1\n").unwrap_err();
        let CompileError::Sema(d) = err else { panic!("expected sema error") };
        assert!(d.message.contains("no 'main'"));
    }

    #[test]
    fn duplicate_function_is_rejected() {
        let err =
            resolve("def main() -> int:\n    return 0\ndef main() -> int:\n    return 1\n").unwrap_err();
        let CompileError::Sema(d) = err else { panic!("expected sema error") };
        assert!(d.message.contains("defined twice"));
    }

    #[test]
    fn top_level_statements_are_rejected() {
        let err = resolve("x = 1\ndef main() -> int:\n    return 0\n").unwrap_err();
        let CompileError::Sema(d) = err else { panic!("expected sema error") };
        assert!(d.message.contains("module level"));
    }

    #[test]
    fn from_import_checks_names() {
        let err = resolve("from json import nope\ndef main() -> int:\n    return 0\n").unwrap_err();
        let CompileError::Sema(d) = err else { panic!("expected sema error") };
        assert!(d.message.contains("no attribute 'nope'"));
    }
}
