//! Arithmetic helpers with error checking
//!
//! Plain int/float add/sub/mul compile to inline IR; the operations that can
//! fail (division, modulo) or need bit-exact dialect semantics (floor
//! division, exponentiation) route through these shims. Dynamically typed
//! operands go through `pycc_rt_value_binop`, which dispatches on tags.

use crate::error::raise;
use crate::value::{Value, TAG_BOOL, TAG_BYTES, TAG_FLOAT, TAG_INT, TAG_LIST, TAG_STR};

/// Int floor division (`//`), rounding toward negative infinity.
///
/// # Safety
/// Always safe to call; raises on division by zero.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_int_floordiv(a: i64, b: i64) -> i64 {
    if b == 0 {
        raise("integer division or modulo by zero");
        return 0;
    }
    a.div_euclid(b)
}

/// Int modulo (`%`), result takes the sign of the divisor.
///
/// # Safety
/// Always safe to call; raises on division by zero.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_int_mod(a: i64, b: i64) -> i64 {
    if b == 0 {
        raise("integer division or modulo by zero");
        return 0;
    }
    a.rem_euclid(b) * if b < 0 { -1 } else { 1 }
}

/// Int true division (`/`) — always produces a float.
///
/// # Safety
/// Always safe to call; raises on division by zero.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_int_truediv(a: i64, b: i64) -> f64 {
    if b == 0 {
        raise("division by zero");
        return 0.0;
    }
    a as f64 / b as f64
}

/// Float division with zero check (the dialect raises rather than
/// producing inf).
///
/// # Safety
/// Always safe to call; raises on division by zero.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_float_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        raise("float division by zero");
        return 0.0;
    }
    a / b
}

/// Float floor division.
///
/// # Safety
/// Always safe to call; raises on division by zero.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_float_floordiv(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        raise("float floor division by zero");
        return 0.0;
    }
    (a / b).floor()
}

/// Float modulo, result takes the sign of the divisor.
///
/// # Safety
/// Always safe to call; raises on division by zero.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_float_mod(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        raise("float modulo by zero");
        return 0.0;
    }
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }
}

/// Int exponentiation (`**`). Negative exponents are a type error in the
/// static subset (they would change the result type), so they raise here.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_int_pow(a: i64, b: i64) -> i64 {
    if b < 0 {
        raise("integer pow with negative exponent");
        return 0;
    }
    let mut acc: i64 = 1;
    let mut base = a;
    let mut exp = b;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    acc
}

/// Float exponentiation (`**`).
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_float_pow(a: f64, b: f64) -> f64 {
    a.powf(b)
}

/// Operator codes shared with codegen: add, sub, mul, truediv, floordiv,
/// mod, pow.
const OP_ADD: i64 = 0;
const OP_SUB: i64 = 1;
const OP_MUL: i64 = 2;
const OP_DIV: i64 = 3;
const OP_FLOORDIV: i64 = 4;
const OP_MOD: i64 = 5;
const OP_POW: i64 = 6;

fn int_like(v: Value) -> Option<i64> {
    match v.tag {
        TAG_INT | TAG_BOOL => Some(v.a),
        _ => None,
    }
}

/// Generic binary operator for dynamically typed operands: numeric
/// arithmetic across Int/Float, `+` concatenation for str/bytes/list.
///
/// # Safety
/// Heap payloads must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_value_binop(op: i64, a: Value, b: Value) -> Value {
    if let (Some(x), Some(y)) = (int_like(a), int_like(b)) {
        return unsafe {
            match op {
                OP_ADD => Value::int(x.wrapping_add(y)),
                OP_SUB => Value::int(x.wrapping_sub(y)),
                OP_MUL => Value::int(x.wrapping_mul(y)),
                OP_DIV => Value::float(pycc_rt_int_truediv(x, y)),
                OP_FLOORDIV => Value::int(pycc_rt_int_floordiv(x, y)),
                OP_MOD => Value::int(pycc_rt_int_mod(x, y)),
                OP_POW => Value::int(pycc_rt_int_pow(x, y)),
                _ => raise("invalid operator code"),
            }
        };
    }
    if a.tag == TAG_FLOAT || b.tag == TAG_FLOAT {
        let (Some(x), Some(y)) = (a.as_number(), b.as_number()) else {
            return raise("unsupported operand types");
        };
        return unsafe {
            match op {
                OP_ADD => Value::float(x + y),
                OP_SUB => Value::float(x - y),
                OP_MUL => Value::float(x * y),
                OP_DIV => Value::float(pycc_rt_float_div(x, y)),
                OP_FLOORDIV => Value::float(pycc_rt_float_floordiv(x, y)),
                OP_MOD => Value::float(pycc_rt_float_mod(x, y)),
                OP_POW => Value::float(x.powf(y)),
                _ => raise("invalid operator code"),
            }
        };
    }
    if op == OP_ADD {
        return unsafe {
            match (a.tag, b.tag) {
                (TAG_STR, TAG_STR) => crate::strings::pycc_rt_str_concat(a, b),
                (TAG_BYTES, TAG_BYTES) => crate::strings::pycc_rt_bytes_concat(a, b),
                (TAG_LIST, TAG_LIST) => crate::lists::pycc_rt_list_concat(a, b),
                _ => raise("unsupported operand types for +"),
            }
        };
    }
    raise("unsupported operand types")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_division_rounds_down() {
        unsafe {
            assert_eq!(pycc_rt_int_floordiv(7, 2), 3);
            assert_eq!(pycc_rt_int_floordiv(-7, 2), -4);
            assert_eq!(pycc_rt_int_mod(-7, 2), 1);
            assert_eq!(pycc_rt_int_mod(7, -2), -1);
        }
    }

    #[test]
    fn true_division_produces_float() {
        unsafe {
            assert_eq!(pycc_rt_int_truediv(1, 2), 0.5);
        }
    }

    #[test]
    fn pow_small_cases() {
        unsafe {
            assert_eq!(pycc_rt_int_pow(2, 10), 1024);
            assert_eq!(pycc_rt_int_pow(5, 0), 1);
            assert_eq!(pycc_rt_float_pow(2.0, -1.0), 0.5);
        }
    }

    #[test]
    fn zero_division_parks_error() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            pycc_rt_int_floordiv(1, 0);
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
        }
    }

    #[test]
    fn generic_binop_dispatches_on_tags() {
        unsafe {
            let n = pycc_rt_value_binop(OP_ADD, Value::int(2), Value::int(3));
            assert_eq!(n.a, 5);

            let f = pycc_rt_value_binop(OP_MUL, Value::float(1.5), Value::int(2));
            assert_eq!(f.as_f64(), 3.0);

            let a = Value::str("ab".into());
            let b = Value::str("cd".into());
            let s = pycc_rt_value_binop(OP_ADD, a, b);
            assert_eq!(s.str_ref(), "abcd");
            crate::value::pycc_rt_release(a);
            crate::value::pycc_rt_release(b);
            crate::value::pycc_rt_release(s);
        }
    }
}
