//! pprint / reprlib shims
//!
//! Canonical single-line forms: lists `[1, 2, 3]`, tuples `(1, 2)`, dicts
//! `{'k': v, ...}` in insertion order, strings single-quoted with `\\`,
//! `\'` and `\n` escapes. `reprlib.repr` is identical except string reprs
//! are capped at 60 characters including both quotes.

use crate::strings::format_float;
use crate::value::{
    Value, TAG_BOOL, TAG_BYTES, TAG_DICT, TAG_FLOAT, TAG_INT, TAG_LIST, TAG_NONE, TAG_SET,
    TAG_STR, TAG_TUPLE,
};

/// Maximum length of a string repr produced by `reprlib.repr`, counting
/// both quotes.
const REPR_STR_MAX: usize = 60;

pub fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn repr_into(v: Value, out: &mut String, truncate_strings: bool) {
    unsafe {
        match v.tag {
            TAG_NONE => out.push_str("None"),
            TAG_INT => out.push_str(&v.a.to_string()),
            TAG_FLOAT => out.push_str(&format_float(v.as_f64())),
            TAG_BOOL => out.push_str(if v.a != 0 { "True" } else { "False" }),
            TAG_STR => {
                let q = quote_str(v.str_ref());
                if truncate_strings && q.len() > REPR_STR_MAX {
                    // prefix + "..." + closing quote, exactly REPR_STR_MAX chars
                    let keep = REPR_STR_MAX - 4;
                    let prefix: String = q.chars().take(keep).collect();
                    out.push_str(&prefix);
                    out.push_str("...'");
                } else {
                    out.push_str(&q);
                }
            }
            TAG_BYTES => {
                out.push_str("b'");
                for byte in v.bytes_ref() {
                    match byte {
                        b'\\' => out.push_str("\\\\"),
                        b'\'' => out.push_str("\\'"),
                        b'\n' => out.push_str("\\n"),
                        0x20..=0x7e => out.push(*byte as char),
                        _ => out.push_str(&format!("\\x{:02x}", byte)),
                    }
                }
                out.push('\'');
            }
            TAG_LIST | TAG_TUPLE => {
                let (open, close) = if v.tag == TAG_LIST { ('[', ']') } else { ('(', ')') };
                out.push(open);
                let items = v.list_obj().items.borrow();
                for (i, x) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    repr_into(*x, out, truncate_strings);
                }
                if v.tag == TAG_TUPLE && items.len() == 1 {
                    out.push(',');
                }
                out.push(close);
            }
            TAG_DICT => {
                out.push('{');
                for (i, (k, x)) in v.dict_obj().map.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let kv = k.to_value();
                    repr_into(kv, out, truncate_strings);
                    crate::value::pycc_rt_release(kv);
                    out.push_str(": ");
                    repr_into(*x, out, truncate_strings);
                }
                out.push('}');
            }
            TAG_SET => {
                let set = v.set_obj().set.borrow();
                if set.is_empty() {
                    out.push_str("set()");
                } else {
                    out.push('{');
                    for (i, k) in set.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        let kv = k.to_value();
                        repr_into(kv, out, truncate_strings);
                        crate::value::pycc_rt_release(kv);
                    }
                    out.push('}');
                }
            }
            _ => out.push_str("<handle>"),
        }
    }
}

/// Full (untruncated) repr, shared with `str()` for containers.
pub fn repr_value(v: Value) -> String {
    let mut out = String::new();
    repr_into(v, &mut out, false);
    out
}

/// pprint.pformat(x) -> str
///
/// # Safety
/// `v` must be a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_pprint_pformat(v: Value) -> Value {
    Value::str(repr_value(v))
}

/// pprint.pprint(x) -> None — pformat plus a newline on stdout.
///
/// # Safety
/// `v` must be a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_pprint_pprint(v: Value) -> Value {
    let line = Value::str(format!("{}\n", repr_value(v)));
    unsafe {
        crate::io::pycc_io_write_stdout(line);
        crate::value::pycc_rt_release(line);
    }
    Value::none()
}

/// reprlib.repr(x) -> str — pformat with the 60-char string cap.
///
/// # Safety
/// `v` must be a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_reprlib_repr(v: Value) -> Value {
    let mut out = String::new();
    repr_into(v, &mut out, true);
    Value::str(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn list_form() {
        unsafe {
            let l = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
            let s = pycc_pprint_pformat(l);
            assert_eq!(s.str_ref(), "[1, 2, 3]");
            pycc_rt_release(s);
            pycc_rt_release(l);
        }
    }

    #[test]
    fn string_escapes() {
        unsafe {
            let v = Value::str("a'b\n".into());
            let s = pycc_pprint_pformat(v);
            assert_eq!(s.str_ref(), "'a\\'b\\n'");
            pycc_rt_release(s);
            pycc_rt_release(v);
        }
    }

    #[test]
    fn dict_insertion_order() {
        unsafe {
            let d = crate::dicts::pycc_rt_dict_new();
            let ka = Value::str("a".into());
            let kb = Value::str("b".into());
            let la = Value::list(vec![Value::int(1), Value::int(2)]);
            let lb = Value::list(vec![Value::int(3)]);
            crate::dicts::pycc_rt_dict_set(d, ka, la);
            crate::dicts::pycc_rt_dict_set(d, kb, lb);
            let s = pycc_pprint_pformat(d);
            assert_eq!(s.str_ref(), "{'a': [1, 2], 'b': [3]}");
            for v in [s, ka, kb, la, lb, d] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn floats_keep_point_zero() {
        unsafe {
            let l = Value::list(vec![Value::float(0.0), Value::float(1.0), Value::float(1.0)]);
            let s = pycc_pprint_pformat(l);
            assert_eq!(s.str_ref(), "[0.0, 1.0, 1.0]");
            pycc_rt_release(s);
            pycc_rt_release(l);
        }
    }

    #[test]
    fn tuple_forms() {
        unsafe {
            let t = Value::tuple(vec![Value::int(1), Value::int(2)]);
            let s = pycc_pprint_pformat(t);
            assert_eq!(s.str_ref(), "(1, 2)");
            pycc_rt_release(s);
            pycc_rt_release(t);

            let one = Value::tuple(vec![Value::int(1)]);
            let s = pycc_pprint_pformat(one);
            assert_eq!(s.str_ref(), "(1,)");
            pycc_rt_release(s);
            pycc_rt_release(one);
        }
    }

    #[test]
    fn reprlib_caps_long_strings_at_60() {
        unsafe {
            let long: String = "abcdefghijklmnopqrstuvwxyz0123456789".repeat(2);
            assert_eq!(long.len(), 72);
            let v = Value::str(long);
            let s = pycc_reprlib_repr(v);
            assert_eq!(s.str_ref().len(), 60);
            assert!(s.str_ref().ends_with("...'"));
            pycc_rt_release(s);

            let short = Value::str("abc".into());
            let s = pycc_reprlib_repr(short);
            assert_eq!(s.str_ref(), "'abc'");
            pycc_rt_release(s);
            pycc_rt_release(short);
            pycc_rt_release(v);
        }
    }

    #[test]
    fn pformat_of_pformat_is_quoted() {
        unsafe {
            let l = Value::list(vec![Value::int(1)]);
            let once = pycc_pprint_pformat(l);
            let twice = pycc_pprint_pformat(once);
            assert_eq!(twice.str_ref(), "'[1]'");
            pycc_rt_release(twice);
            pycc_rt_release(once);
            pycc_rt_release(l);
        }
    }
}
