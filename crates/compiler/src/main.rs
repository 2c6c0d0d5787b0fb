//! pycc CLI
//!
//! `pycc <source.py> [-o OUT] [-O{0,1,2}] [--emit {exe,ir,obj,asm}]`
//!
//! Exit codes: 0 success, 1 compile error, 2 internal error. Diagnostics
//! go to stderr as `<file>:<line>:<col>: <severity>: <message>`.

use clap::{Parser as ClapParser, ValueEnum};
use pycc::{CompileError, CompilerConfig, EmitKind, OptimizationLevel};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmitArg {
    Exe,
    Ir,
    Obj,
    Asm,
}

#[derive(ClapParser)]
#[command(name = "pycc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ahead-of-time compiler for a statically-typeable Python subset", long_about = None)]
struct Cli {
    /// Input source file
    input: PathBuf,

    /// Output path (defaults to the input filename without its extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optimization level
    #[arg(short = 'O', value_parser = clap::value_parser!(u8).range(0..=2), default_value_t = 1)]
    opt_level: u8,

    /// Artifact to produce
    #[arg(long, value_enum, default_value_t = EmitArg::Exe)]
    emit: EmitArg,

    /// Keep the intermediate LLVM IR file (.ll)
    #[arg(long)]
    keep_ir: bool,
}

fn main() {
    let cli = Cli::parse();

    let emit = match cli.emit {
        EmitArg::Exe => EmitKind::Exe,
        EmitArg::Ir => EmitKind::Ir,
        EmitArg::Obj => EmitKind::Obj,
        EmitArg::Asm => EmitKind::Asm,
    };
    let output = cli.output.unwrap_or_else(|| default_output(&cli.input, emit));

    let mut config = CompilerConfig::new()
        .with_optimization(match cli.opt_level {
            0 => OptimizationLevel::O0,
            2 => OptimizationLevel::O2,
            _ => OptimizationLevel::O1,
        })
        .with_emit(emit);
    config.keep_ir = cli.keep_ir;

    match pycc::compile_file(&cli.input, &output, &config) {
        Ok(()) => {
            println!("Compiled {} -> {}", cli.input.display(), output.display());
            if config.keep_ir && emit != EmitKind::Ir {
                let ir_path = output.with_extension("ll");
                if ir_path.exists() {
                    println!("IR saved to {}", ir_path.display());
                }
            }
        }
        Err(e) => {
            report(&e);
            process::exit(e.exit_code());
        }
    }
}

fn default_output(input: &std::path::Path, emit: EmitKind) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let base = PathBuf::from(stem);
    match emit {
        EmitKind::Exe => base,
        EmitKind::Ir => base.with_extension("ll"),
        EmitKind::Obj => base.with_extension("o"),
        EmitKind::Asm => base.with_extension("s"),
    }
}

fn report(e: &CompileError) {
    match e {
        CompileError::Internal(msg) => eprintln!("pycc: internal error: {}", msg),
        other => eprintln!("{}", other),
    }
}
