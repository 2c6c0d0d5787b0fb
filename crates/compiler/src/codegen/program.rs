//! Whole-module assembly
//!
//! Produces the final `.ll` text: header and `%Value` type, interned
//! literal globals, one definition per user function, the C `main`
//! wrapper, then the runtime declarations.

use super::error::CodeGenError;
use super::platform::get_target_triple;
use super::runtime::emit_runtime_decls;
use super::state::CodeGen;
use crate::ast::Module;
use std::fmt::Write as _;

impl CodeGen<'_> {
    pub fn codegen_module(&mut self, module: &Module) -> Result<String, CodeGenError> {
        for f in module.functions() {
            self.emit_function(f)?;
        }
        self.emit_main_wrapper();

        let mut ir = String::new();
        writeln!(ir, "; ModuleID = '{}'", module.file.display())?;
        writeln!(ir, "source_filename = \"{}\"", module.file.display())?;
        writeln!(ir, "target triple = \"{}\"", get_target_triple())?;
        writeln!(ir)?;
        writeln!(ir, "%Value = type {{ i64, i64, i64 }}")?;
        writeln!(ir)?;
        if !self.string_globals.is_empty() {
            ir.push_str(&self.string_globals);
            writeln!(ir)?;
        }
        ir.push_str(&self.out);
        emit_runtime_decls(&mut ir);
        Ok(ir)
    }

    /// The C entry point: initialize the runtime, run `py_main`, shut the
    /// runtime down and surface the Int result as the exit status.
    fn emit_main_wrapper(&mut self) {
        let _ = writeln!(&mut self.out, "define i32 @main(i32 %argc, ptr %argv) {{");
        let _ = writeln!(&mut self.out, "entry:");
        let _ = writeln!(&mut self.out, "  call void @pycc_rt_init(i32 %argc, ptr %argv)");
        let _ = writeln!(&mut self.out, "  %r = call %Value @py_main()");
        let _ = writeln!(&mut self.out, "  %code64 = extractvalue %Value %r, 1");
        let _ = writeln!(&mut self.out, "  %code = trunc i64 %code64 to i32");
        let _ = writeln!(&mut self.out, "  call void @pycc_rt_shutdown()");
        let _ = writeln!(&mut self.out, "  ret i32 %code");
        let _ = writeln!(&mut self.out, "}}");
        let _ = writeln!(&mut self.out);
    }
}
