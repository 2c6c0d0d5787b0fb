//! End-to-end front-end coverage: every demo program compiles to IR.
//!
//! The demos exercise the whole module registry and language surface, so
//! a regression in the lexer, parser, checker or code generator usually
//! shows up here first. Linking and running the produced binaries is
//! covered by the runtime's own tests plus CI.

use pycc::{compile_to_ir, CompilerConfig, OptimizationLevel};
use std::path::{Path, PathBuf};

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn compile_demo(name: &str, config: &CompilerConfig) -> String {
    let path = demos_dir().join(name);
    let source = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e));
    compile_to_ir(&source, &path, config)
        .unwrap_or_else(|e| panic!("{} failed to compile: {}", name, e))
}

#[test]
fn every_demo_compiles_to_ir() {
    let config = CompilerConfig::default();
    let mut compiled = 0;
    for entry in std::fs::read_dir(demos_dir()).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".py") {
            continue;
        }
        let ir = compile_demo(&name, &config);
        assert!(ir.contains("define %Value @py_main()"), "{} lacks py_main", name);
        assert!(ir.contains("define i32 @main"), "{} lacks the C entry point", name);
        compiled += 1;
    }
    assert!(compiled >= 20, "expected the full demo corpus, compiled {}", compiled);
}

#[test]
fn demos_compile_at_every_optimization_level() {
    for level in [OptimizationLevel::O0, OptimizationLevel::O1, OptimizationLevel::O2] {
        let config = CompilerConfig::new().with_optimization(level);
        compile_demo("language_basics.py", &config);
        compile_demo("copy_semantics.py", &config);
    }
}

#[test]
fn digest_demo_binds_the_expected_shims() {
    let ir = compile_demo("digests.py", &CompilerConfig::default());
    for symbol in [
        "pycc_hashlib_sha256",
        "pycc_hashlib_md5",
        "pycc_hmac_digest",
        "pycc_binascii_hexlify",
        "pycc_rt_bytes_decode",
    ] {
        assert!(ir.contains(symbol), "missing {}", symbol);
    }
}

#[test]
fn try_demo_uses_the_error_protocol() {
    let ir = compile_demo("language_basics.py", &CompilerConfig::default());
    assert!(ir.contains("pycc_rt_try_enter"));
    assert!(ir.contains("pycc_rt_err_take"));
}

#[test]
fn system_demo_lowers_sys_exit() {
    let ir = compile_demo("system_info.py", &CompilerConfig::default());
    assert!(ir.contains("call %Value @pycc_sys_exit(%Value"));
}
