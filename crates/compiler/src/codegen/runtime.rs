//! Runtime function declarations
//!
//! Every generated module declares the full runtime surface: the core
//! value/container/error protocol plus every registered module shim.
//! Unreferenced declarations cost nothing after linking.

use crate::modules::ModuleRegistry;
use std::fmt::Write as _;

/// Core runtime entry points that codegen calls directly (everything that
/// is not a module shim). Kept as explicit IR text so the ABI is visible
/// in one place.
pub const RUNTIME_DECLARATIONS: &[&str] = &[
    "declare void @pycc_rt_init(i32, ptr)",
    "declare void @pycc_rt_shutdown()",
    "declare %Value @pycc_rt_retain(%Value)",
    "declare void @pycc_rt_release(%Value)",
    "declare i64 @pycc_rt_truthy(%Value)",
    "declare i64 @pycc_rt_value_eq(%Value, %Value)",
    "declare i64 @pycc_rt_value_cmp(%Value, %Value)",
    "declare i64 @pycc_rt_value_is(%Value, %Value)",
    "declare i64 @pycc_rt_isinstance(%Value, i64)",
    "declare %Value @pycc_rt_str_lit(ptr, i64)",
    "declare %Value @pycc_rt_bytes_lit(ptr, i64)",
    "declare %Value @pycc_rt_str_concat(%Value, %Value)",
    "declare %Value @pycc_rt_bytes_concat(%Value, %Value)",
    "declare %Value @pycc_rt_value_str(%Value)",
    "declare %Value @pycc_rt_bytes_decode(%Value, %Value, %Value)",
    "declare %Value @pycc_rt_to_int(%Value)",
    "declare %Value @pycc_rt_to_float(%Value)",
    "declare i64 @pycc_rt_len(%Value)",
    "declare %Value @pycc_rt_index(%Value, %Value)",
    "declare void @pycc_rt_index_set(%Value, %Value, %Value)",
    "declare %Value @pycc_rt_slice(%Value, %Value, %Value, %Value)",
    "declare i64 @pycc_rt_contains(%Value, %Value)",
    "declare i64 @pycc_rt_iter_len(%Value)",
    "declare %Value @pycc_rt_iter_get(%Value, i64)",
    "declare %Value @pycc_rt_list_new()",
    "declare %Value @pycc_rt_tuple_new()",
    "declare void @pycc_rt_list_push(%Value, %Value)",
    "declare %Value @pycc_rt_list_concat(%Value, %Value)",
    "declare %Value @pycc_rt_dict_new()",
    "declare void @pycc_rt_dict_set(%Value, %Value, %Value)",
    "declare %Value @pycc_rt_set_new()",
    "declare void @pycc_rt_set_add(%Value, %Value)",
    "declare i64 @pycc_rt_int_floordiv(i64, i64)",
    "declare i64 @pycc_rt_int_mod(i64, i64)",
    "declare double @pycc_rt_int_truediv(i64, i64)",
    "declare double @pycc_rt_float_div(double, double)",
    "declare double @pycc_rt_float_floordiv(double, double)",
    "declare double @pycc_rt_float_mod(double, double)",
    "declare i64 @pycc_rt_int_pow(i64, i64)",
    "declare double @pycc_rt_float_pow(double, double)",
    "declare %Value @pycc_rt_value_binop(i64, %Value, %Value)",
    "declare void @pycc_rt_try_enter()",
    "declare void @pycc_rt_try_exit()",
    "declare i64 @pycc_rt_err_pending()",
    "declare %Value @pycc_rt_err_take()",
    "declare %Value @pycc_types_getattr(%Value, %Value)",
    "declare %Value @pycc_future_feature(%Value)",
    "declare void @pycc_rt_prof_hit(ptr)",
];

/// Emit core declarations plus one per registered shim symbol.
pub fn emit_runtime_decls(ir: &mut String) {
    for decl in RUNTIME_DECLARATIONS {
        let _ = writeln!(ir, "{}", decl);
    }
    for shim in ModuleRegistry::global().all_shims() {
        // Shims exchange `%Value` uniformly; arity comes from the
        // registry signature.
        let params = vec!["%Value"; shim.params.len()].join(", ");
        let _ = writeln!(ir, "declare %Value @{}({})", shim.symbol, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_cover_core_and_shims() {
        let mut ir = String::new();
        emit_runtime_decls(&mut ir);
        assert!(ir.contains("declare void @pycc_rt_init(i32, ptr)"));
        assert!(ir.contains("declare %Value @pycc_io_write_stdout(%Value)"));
        assert!(ir.contains("declare %Value @pycc_struct_pack(%Value, %Value)"));
        // One declaration per line, no duplicates.
        let mut lines: Vec<&str> = ir.lines().collect();
        let before = lines.len();
        lines.sort_unstable();
        lines.dedup();
        assert_eq!(lines.len(), before);
    }
}
