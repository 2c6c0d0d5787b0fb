//! pycc compiler library
//!
//! Compiles a statically-typeable Python subset to native executables:
//! lex -> parse -> resolve -> type check -> LLVM IR text -> clang.
//! The runtime library is embedded in this binary at build time and
//! extracted next to the generated IR at link time.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod modules;
pub mod optimize;
pub mod parser;
pub mod resolver;
pub mod typechecker;
pub mod types;

pub use ast::Module;
pub use codegen::CodeGen;
pub use config::{CompilerConfig, EmitKind, OptimizationLevel};
pub use diagnostics::{CompileError, Diagnostic, Loc, Severity};
pub use modules::ModuleRegistry;
pub use parser::Parser;
pub use resolver::Resolver;
pub use typechecker::TypeChecker;

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

/// Embedded runtime library (built by build.rs).
/// On docs.rs this is an empty slice since the runtime isn't available.
#[cfg(not(docsrs))]
static RUNTIME_LIB: &[u8] = include_bytes!(env!("PYCC_RUNTIME_LIB_PATH"));

#[cfg(docsrs)]
static RUNTIME_LIB: &[u8] = &[];

/// Minimum clang/LLVM version required.
/// The generated IR uses opaque pointers (`ptr`), which needs LLVM 15+.
const MIN_CLANG_VERSION: u32 = 15;

static CLANG_VERSION_CHECKED: OnceLock<Result<u32, String>> = OnceLock::new();

/// Check that clang is available and recent enough. Cached per process.
fn check_clang_version() -> Result<u32, String> {
    CLANG_VERSION_CHECKED
        .get_or_init(|| {
            let output = Command::new("clang").arg("--version").output().map_err(|e| {
                format!(
                    "Failed to run clang: {}. Please install clang {} or later.",
                    e, MIN_CLANG_VERSION
                )
            })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(format!(
                    "clang --version failed with exit code {:?}: {}",
                    output.status.code(),
                    stderr
                ));
            }

            let version_str = String::from_utf8_lossy(&output.stdout);
            let version = parse_clang_version(&version_str).ok_or_else(|| {
                format!(
                    "Could not parse clang version from: {}\n\
                     pycc requires clang {} or later (for opaque pointer support).",
                    version_str.lines().next().unwrap_or(&version_str),
                    MIN_CLANG_VERSION
                )
            })?;

            // Apple clang numbers differently; Apple clang 14 is LLVM 15 based.
            let is_apple = version_str.contains("Apple clang");
            let effective_min = if is_apple { 14 } else { MIN_CLANG_VERSION };

            if version < effective_min {
                return Err(format!(
                    "clang version {} detected, but pycc requires {} {} or later.\n\
                     The generated LLVM IR uses opaque pointers (requires LLVM 15+).",
                    version,
                    if is_apple { "Apple clang" } else { "clang" },
                    effective_min
                ));
            }

            Ok(version)
        })
        .clone()
}

/// Parse the major version number from clang --version output.
fn parse_clang_version(output: &str) -> Option<u32> {
    for line in output.lines() {
        if !line.contains("clang version") {
            continue;
        }
        if let Some(idx) = line.find("version ") {
            let after = &line[idx + 8..];
            let major: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !major.is_empty() {
                return major.parse().ok();
            }
        }
    }
    None
}

/// Compile source text to LLVM IR (no toolchain involved).
pub fn compile_to_ir(source: &str, file: &Path, config: &CompilerConfig) -> Result<String, CompileError> {
    let mut module = parser::parse(source, file)?;
    optimize::fold_module(&mut module, config.optimization_level);
    let sema = typechecker::analyze(&module)?;
    optimize::prune_module(&mut module, config.optimization_level);
    codegen::codegen(&module, &sema)
        .map_err(|e| CompileError::Internal(format!("code generation failed: {}", e)))
}

/// Compile a source file to the configured artifact.
pub fn compile_file(
    input: &Path,
    output: &Path,
    config: &CompilerConfig,
) -> Result<(), CompileError> {
    let source = fs::read_to_string(input)
        .map_err(|e| CompileError::Internal(format!("failed to read {}: {}", input.display(), e)))?;

    let ir = compile_to_ir(&source, input, config)?;

    let ir_path = if config.emit == EmitKind::Ir {
        output.to_path_buf()
    } else {
        output.with_extension("ll")
    };
    fs::write(&ir_path, &ir)
        .map_err(|e| CompileError::Internal(format!("failed to write IR file: {}", e)))?;

    if config.emit == EmitKind::Ir {
        return Ok(());
    }

    check_clang_version().map_err(CompileError::Internal)?;

    // Extract the embedded runtime archive for the linker.
    let runtime_path = std::env::temp_dir().join("libpycc_runtime.a");
    {
        let mut file = fs::File::create(&runtime_path)
            .map_err(|e| CompileError::Internal(format!("failed to create runtime lib: {}", e)))?;
        file.write_all(RUNTIME_LIB)
            .map_err(|e| CompileError::Internal(format!("failed to write runtime lib: {}", e)))?;
    }

    let mut clang = Command::new("clang");
    clang.arg(config.optimization_level.clang_flag()).arg(&ir_path);
    match config.emit {
        EmitKind::Obj => {
            clang.arg("-c");
        }
        EmitKind::Asm => {
            clang.arg("-S");
        }
        EmitKind::Exe => {
            clang
                .arg("-L")
                .arg(runtime_path.parent().unwrap())
                .arg("-lpycc_runtime")
                .arg("-lm");
            for lib_path in &config.library_paths {
                clang.arg("-L").arg(lib_path);
            }
            for lib in &config.libraries {
                clang.arg("-l").arg(lib);
            }
        }
        EmitKind::Ir => unreachable!(),
    }
    clang.arg("-o").arg(output);

    let result = clang
        .output()
        .map_err(|e| CompileError::Internal(format!("failed to run clang: {}", e)));

    fs::remove_file(&runtime_path).ok();

    let output_status = result?;
    if !output_status.status.success() {
        let stderr = String::from_utf8_lossy(&output_status.stderr);
        return Err(CompileError::Internal(format!("clang failed:\n{}", stderr)));
    }

    if !config.keep_ir {
        fs::remove_file(&ir_path).ok();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_clang_version_standard() {
        let output = "clang version 15.0.0 (https://github.com/llvm/llvm-project)\nTarget: x86_64";
        assert_eq!(parse_clang_version(output), Some(15));
    }

    #[test]
    fn test_parse_clang_version_apple() {
        let output = "Apple clang version 14.0.3 (clang-1403.0.22.14.1)\nTarget: arm64-apple-darwin";
        assert_eq!(parse_clang_version(output), Some(14));
    }

    #[test]
    fn test_parse_clang_version_homebrew() {
        let output = "Homebrew clang version 17.0.6\nTarget: arm64-apple-darwin23.0.0";
        assert_eq!(parse_clang_version(output), Some(17));
    }

    #[test]
    fn test_parse_clang_version_invalid() {
        assert_eq!(parse_clang_version("no version here"), None);
        assert_eq!(parse_clang_version("version "), None);
    }

    #[test]
    fn compile_to_ir_end_to_end() {
        let source = "def main() -> int:\n    import io\n    io.write_stdout('ok\\n')\n    return 0\n";
        let ir = compile_to_ir(source, &PathBuf::from("demo.py"), &CompilerConfig::default()).unwrap();
        assert!(ir.contains("@py_main"));
        assert!(ir.contains("pycc_io_write_stdout"));
    }

    #[test]
    fn compile_error_reports_position() {
        let source = "def main() -> int:\n    return 'oops\n";
        let err = compile_to_ir(source, &PathBuf::from("demo.py"), &CompilerConfig::default())
            .unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("demo.py:2:"), "got: {}", text);
        assert!(text.contains("error:"));
        assert_eq!(err.exit_code(), 1);
    }
}
