//! String and bytes primitives
//!
//! Literal construction, concatenation and the `str()` conversion used by
//! f-strings. Strings are immutable UTF-8 buffers; every operation that
//! "modifies" one returns a fresh value.

use crate::error::raise;
use crate::pprint::repr_value;
use crate::value::{Value, TAG_BOOL, TAG_BYTES, TAG_FLOAT, TAG_INT, TAG_NONE, TAG_STR};

/// Format a float the way the source dialect prints it: integral values
/// keep a trailing `.0`, everything else uses the shortest round-trip form.
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f == f.trunc() && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// `str(x)` semantics: strings pass through unquoted, scalars print their
/// canonical form, containers fall back to their repr.
pub fn display_value(v: Value) -> String {
    unsafe {
        match v.tag {
            TAG_NONE => "None".to_string(),
            TAG_INT => v.a.to_string(),
            TAG_FLOAT => format_float(v.as_f64()),
            TAG_BOOL => if v.a != 0 { "True" } else { "False" }.to_string(),
            TAG_STR => v.str_ref().to_string(),
            _ => repr_value(v),
        }
    }
}

/// Construct a Str from a compiler-emitted global constant.
///
/// # Safety
/// `ptr` must point to `len` bytes of valid UTF-8 (guaranteed by the
/// compiler, which only emits literals that lexed as UTF-8).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_str_lit(ptr: *const u8, len: i64) -> Value {
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len as usize) };
    let s = std::str::from_utf8(bytes).unwrap_or_default();
    Value::str(s.to_string())
}

/// Construct a Bytes value from a compiler-emitted global constant.
///
/// # Safety
/// `ptr` must point to `len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_bytes_lit(ptr: *const u8, len: i64) -> Value {
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len as usize) };
    Value::bytes(bytes.to_vec())
}

/// `a + b` on strings (also used for f-string assembly).
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_str_concat(a: Value, b: Value) -> Value {
    if a.tag != TAG_STR || b.tag != TAG_STR {
        return raise("string concatenation expects str operands");
    }
    let mut s = String::with_capacity(unsafe { a.str_ref() }.len() + unsafe { b.str_ref() }.len());
    s.push_str(unsafe { a.str_ref() });
    s.push_str(unsafe { b.str_ref() });
    Value::str(s)
}

/// `bytes + bytes`.
///
/// # Safety
/// Both arguments must be live Bytes values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_bytes_concat(a: Value, b: Value) -> Value {
    if a.tag != TAG_BYTES || b.tag != TAG_BYTES {
        return raise("bytes concatenation expects bytes operands");
    }
    let mut out = unsafe { a.bytes_ref() }.to_vec();
    out.extend_from_slice(unsafe { b.bytes_ref() });
    Value::bytes(out)
}

/// `str(x)` / f-string segment conversion.
///
/// # Safety
/// Heap payloads must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_value_str(v: Value) -> Value {
    Value::str(display_value(v))
}

/// `b.decode(encoding[, errors])`. Only ASCII/UTF-8 decodes are observed;
/// `errors == 'strict'` raises on invalid input, anything else replaces.
///
/// # Safety
/// `b` must be a live Bytes value; `encoding`/`errors` live Str values
/// (or None for the defaults).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_bytes_decode(b: Value, encoding: Value, errors: Value) -> Value {
    if b.tag != TAG_BYTES {
        return raise("decode: expected bytes receiver");
    }
    let enc = if encoding.tag == TAG_STR { unsafe { encoding.str_ref() } } else { "utf-8" };
    match enc {
        "ascii" | "utf-8" | "utf8" => {}
        other => return raise(format!("decode: unsupported encoding '{}'", other)),
    }
    let strict = if errors.tag == TAG_STR { (unsafe { errors.str_ref() }) == "strict" } else { true };
    let data = unsafe { b.bytes_ref() };
    match std::str::from_utf8(data) {
        Ok(s) => Value::str(s.to_string()),
        Err(_) if strict => raise("decode: invalid byte sequence"),
        Err(_) => Value::str(String::from_utf8_lossy(data).into_owned()),
    }
}

/// `int(x)` builtin over Int/Float/Bool/Str.
///
/// # Safety
/// Heap payloads must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_to_int(v: Value) -> Value {
    match v.tag {
        TAG_INT | TAG_BOOL => Value::int(v.a),
        TAG_FLOAT => Value::int(v.as_f64().trunc() as i64),
        TAG_STR => match unsafe { v.str_ref() }.trim().parse::<i64>() {
            Ok(n) => Value::int(n),
            Err(_) => raise(format!("int: invalid literal '{}'", unsafe { v.str_ref() })),
        },
        _ => raise("int: unsupported operand"),
    }
}

/// `float(x)` builtin over Int/Float/Bool/Str.
///
/// # Safety
/// Heap payloads must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_to_float(v: Value) -> Value {
    match v.tag {
        TAG_INT | TAG_BOOL => Value::float(v.a as f64),
        TAG_FLOAT => v,
        TAG_STR => match unsafe { v.str_ref() }.trim().parse::<f64>() {
            Ok(f) => Value::float(f),
            Err(_) => raise(format!("float: invalid literal '{}'", unsafe { v.str_ref() })),
        },
        _ => raise("float: unsupported operand"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn concat() {
        unsafe {
            let a = Value::str("foo".into());
            let b = Value::str("bar".into());
            let c = pycc_rt_str_concat(a, b);
            assert_eq!(c.str_ref(), "foobar");
            pycc_rt_release(a);
            pycc_rt_release(b);
            pycc_rt_release(c);
        }
    }

    #[test]
    fn display_forms() {
        unsafe {
            assert_eq!(display_value(Value::int(7)), "7");
            assert_eq!(display_value(Value::bool_val(true)), "True");
            assert_eq!(display_value(Value::float(2.0)), "2.0");
            assert_eq!(display_value(Value::float(2.5)), "2.5");
            assert_eq!(display_value(Value::none()), "None");
            let s = Value::str("raw".into());
            assert_eq!(display_value(s), "raw");
            pycc_rt_release(s);
        }
    }

    #[test]
    fn decode_strict_and_replace() {
        unsafe {
            let good = Value::bytes(b"Hi".to_vec());
            let enc = Value::str("ascii".into());
            let strict = Value::str("strict".into());
            let s = pycc_rt_bytes_decode(good, enc, strict);
            assert_eq!(s.str_ref(), "Hi");
            pycc_rt_release(s);

            crate::error::pycc_rt_try_enter();
            let bad = Value::bytes(vec![0xff, 0xfe]);
            let r = pycc_rt_bytes_decode(bad, enc, strict);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();

            pycc_rt_release(good);
            pycc_rt_release(bad);
            pycc_rt_release(enc);
            pycc_rt_release(strict);
        }
    }

    #[test]
    fn int_parse() {
        unsafe {
            let s = Value::str(" 42 ".into());
            let n = pycc_rt_to_int(s);
            assert_eq!(n.a, 42);
            pycc_rt_release(s);
        }
    }
}
