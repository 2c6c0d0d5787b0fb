//! List/tuple operations and the generic sequence protocol
//!
//! Container literals and comprehensions build through `new`/`push`;
//! subscripting, slicing, `len`, membership and `for` iteration are shared
//! across every sized container and dispatch on the value tag.

use crate::error::raise;
use crate::value::{
    eq_values, pycc_rt_release, pycc_rt_retain, Key, Value, TAG_BYTES, TAG_DICT, TAG_INT,
    TAG_LIST, TAG_NONE, TAG_SET, TAG_STR, TAG_TUPLE,
};

/// Allocate an empty list.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_list_new() -> Value {
    Value::list(Vec::new())
}

/// Allocate an empty tuple under construction (same layout as a list;
/// the compiler never mutates one after the literal is built).
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_tuple_new() -> Value {
    Value::tuple(Vec::new())
}

/// Append `x`, retaining it on behalf of the container. Backs both list
/// literals and the `append` method (which returns None at the call site).
///
/// # Safety
/// `seq` must be a live List/Tuple value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_list_push(seq: Value, x: Value) {
    if seq.tag != TAG_LIST && seq.tag != TAG_TUPLE {
        raise("append: expected list");
        return;
    }
    unsafe {
        pycc_rt_retain(x);
        seq.list_obj().items.borrow_mut().push(x);
    }
}

/// `len(x)` over every sized value.
///
/// # Safety
/// Heap payloads must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_len(v: Value) -> i64 {
    unsafe {
        match v.tag {
            TAG_STR => v.str_ref().chars().count() as i64,
            TAG_BYTES => v.bytes_ref().len() as i64,
            TAG_LIST | TAG_TUPLE => v.list_obj().items.borrow().len() as i64,
            TAG_DICT => v.dict_obj().map.borrow().len() as i64,
            TAG_SET => v.set_obj().set.borrow().len() as i64,
            _ => {
                raise("len: object has no length");
                0
            }
        }
    }
}

fn normalize_index(i: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let idx = if i < 0 { i + len } else { i };
    if idx < 0 || idx >= len {
        None
    } else {
        Some(idx as usize)
    }
}

/// Subscript read: `seq[i]`, `d[k]`, `s[i]`, `b[i]`. Returns an owned value.
///
/// # Safety
/// `v` and `index` must be live values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_index(v: Value, index: Value) -> Value {
    unsafe {
        match v.tag {
            TAG_LIST | TAG_TUPLE => {
                if index.tag != TAG_INT {
                    return raise("list indices must be integers");
                }
                let items = v.list_obj().items.borrow();
                match normalize_index(index.a, items.len()) {
                    Some(i) => pycc_rt_retain(items[i]),
                    None => raise("list index out of range"),
                }
            }
            TAG_STR => {
                if index.tag != TAG_INT {
                    return raise("string indices must be integers");
                }
                let s = v.str_ref();
                let n = s.chars().count();
                match normalize_index(index.a, n) {
                    Some(i) => Value::str(s.chars().nth(i).unwrap().to_string()),
                    None => raise("string index out of range"),
                }
            }
            TAG_BYTES => {
                if index.tag != TAG_INT {
                    return raise("bytes indices must be integers");
                }
                let b = v.bytes_ref();
                match normalize_index(index.a, b.len()) {
                    Some(i) => Value::int(b[i] as i64),
                    None => raise("bytes index out of range"),
                }
            }
            TAG_DICT => {
                let key = match Key::from_value(index) {
                    Some(k) => k,
                    None => return raise("unhashable dict key"),
                };
                match v.dict_obj().map.borrow().get(&key) {
                    Some(x) => pycc_rt_retain(*x),
                    None => raise(format!("KeyError: {}", crate::strings::display_value(index))),
                }
            }
            _ => raise("value is not subscriptable"),
        }
    }
}

/// Subscript write: `seq[i] = x`, `d[k] = x`. Retains `x`, releases the
/// previous occupant.
///
/// # Safety
/// All arguments must be live values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_index_set(v: Value, index: Value, x: Value) {
    unsafe {
        match v.tag {
            TAG_LIST => {
                if index.tag != TAG_INT {
                    raise("list indices must be integers");
                    return;
                }
                let items = v.list_obj();
                let len = items.items.borrow().len();
                match normalize_index(index.a, len) {
                    Some(i) => {
                        pycc_rt_retain(x);
                        let old = std::mem::replace(&mut items.items.borrow_mut()[i], x);
                        pycc_rt_release(old);
                    }
                    None => {
                        raise("list assignment index out of range");
                    }
                }
            }
            TAG_DICT => {
                let key = match Key::from_value(index) {
                    Some(k) => k,
                    None => {
                        raise("unhashable dict key");
                        return;
                    }
                };
                pycc_rt_retain(x);
                if let Some(old) = v.dict_obj().map.borrow_mut().insert(key, x) {
                    pycc_rt_release(old);
                }
            }
            _ => {
                raise("value does not support item assignment");
            }
        }
    }
}

fn slice_bounds(lo: Value, hi: Value, len: i64) -> (i64, i64) {
    let clamp = |i: i64| -> i64 {
        let i = if i < 0 { i + len } else { i };
        i.clamp(0, len)
    };
    let start = if lo.tag == TAG_NONE { 0 } else { clamp(lo.a) };
    let stop = if hi.tag == TAG_NONE { len } else { clamp(hi.a) };
    (start, stop.max(start))
}

/// Slice read: `seq[a:b]` / `seq[a:b:c]`. Absent bounds arrive as None.
/// Steps other than 1 are only meaningful for lists and strings.
///
/// # Safety
/// All arguments must be live values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_slice(v: Value, lo: Value, hi: Value, step: Value) -> Value {
    let stride = if step.tag == TAG_NONE { 1 } else { step.a };
    if stride == 0 {
        return raise("slice step cannot be zero");
    }
    if stride < 0 {
        return raise("negative slice steps are not supported");
    }
    unsafe {
        match v.tag {
            TAG_LIST | TAG_TUPLE => {
                let items = v.list_obj().items.borrow();
                let (start, stop) = slice_bounds(lo, hi, items.len() as i64);
                let mut out = Vec::new();
                let mut i = start;
                while i < stop {
                    out.push(pycc_rt_retain(items[i as usize]));
                    i += stride;
                }
                if v.tag == TAG_TUPLE { Value::tuple(out) } else { Value::list(out) }
            }
            TAG_STR => {
                let chars: Vec<char> = v.str_ref().chars().collect();
                let (start, stop) = slice_bounds(lo, hi, chars.len() as i64);
                let mut out = String::new();
                let mut i = start;
                while i < stop {
                    out.push(chars[i as usize]);
                    i += stride;
                }
                Value::str(out)
            }
            TAG_BYTES => {
                let data = v.bytes_ref();
                let (start, stop) = slice_bounds(lo, hi, data.len() as i64);
                let mut out = Vec::new();
                let mut i = start;
                while i < stop {
                    out.push(data[i as usize]);
                    i += stride;
                }
                Value::bytes(out)
            }
            _ => raise("value is not sliceable"),
        }
    }
}

/// Membership: `item in container`. Substring test for strings, key test
/// for dicts/sets, linear scan for sequences.
///
/// # Safety
/// Both arguments must be live values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_contains(container: Value, item: Value) -> i64 {
    unsafe {
        match container.tag {
            TAG_STR => {
                if item.tag != TAG_STR {
                    raise("'in <string>' requires string operand");
                    return 0;
                }
                container.str_ref().contains(item.str_ref()) as i64
            }
            TAG_LIST | TAG_TUPLE => {
                let items = container.list_obj().items.borrow();
                items.iter().any(|x| eq_values(*x, item)) as i64
            }
            TAG_DICT => match Key::from_value(item) {
                Some(k) => container.dict_obj().map.borrow().contains_key(&k) as i64,
                None => 0,
            },
            TAG_SET => match Key::from_value(item) {
                Some(k) => container.set_obj().set.borrow().contains(&k) as i64,
                None => 0,
            },
            _ => {
                raise("argument is not a container");
                0
            }
        }
    }
}

/// Number of iterations a `for` loop over `v` performs.
///
/// # Safety
/// Heap payloads must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_iter_len(v: Value) -> i64 {
    unsafe { pycc_rt_len(v) }
}

/// The `idx`-th iteration value: element for sequences, one-char string for
/// strings, key for dicts, member for sets. Returns an owned value.
///
/// # Safety
/// Heap payloads must be live; `idx` must be in `0..pycc_rt_iter_len(v)`
/// and the container must not have shrunk since the length was read.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_iter_get(v: Value, idx: i64) -> Value {
    unsafe {
        match v.tag {
            TAG_LIST | TAG_TUPLE => {
                let items = v.list_obj().items.borrow();
                match items.get(idx as usize) {
                    Some(x) => pycc_rt_retain(*x),
                    None => raise("iteration index out of range"),
                }
            }
            TAG_STR => match v.str_ref().chars().nth(idx as usize) {
                Some(c) => Value::str(c.to_string()),
                None => raise("iteration index out of range"),
            },
            TAG_DICT => match v.dict_obj().map.borrow().get_index(idx as usize) {
                Some((k, _)) => k.to_value(),
                None => raise("iteration index out of range"),
            },
            TAG_SET => match v.set_obj().set.borrow().get_index(idx as usize) {
                Some(k) => k.to_value(),
                None => raise("iteration index out of range"),
            },
            _ => raise("value is not iterable"),
        }
    }
}

/// `list + list` concatenation.
///
/// # Safety
/// Both arguments must be live List values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_list_concat(a: Value, b: Value) -> Value {
    if a.tag != TAG_LIST || b.tag != TAG_LIST {
        return raise("list concatenation expects list operands");
    }
    unsafe {
        let mut out = Vec::new();
        for x in a.list_obj().items.borrow().iter() {
            out.push(pycc_rt_retain(*x));
        }
        for x in b.list_obj().items.borrow().iter() {
            out.push(pycc_rt_retain(*x));
        }
        Value::list(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_list(xs: &[i64]) -> Value {
        Value::list(xs.iter().map(|n| Value::int(*n)).collect())
    }

    #[test]
    fn push_and_index() {
        unsafe {
            let l = pycc_rt_list_new();
            pycc_rt_list_push(l, Value::int(10));
            pycc_rt_list_push(l, Value::int(20));
            assert_eq!(pycc_rt_len(l), 2);
            let x = pycc_rt_index(l, Value::int(-1));
            assert_eq!(x.a, 20);
            pycc_rt_release(l);
        }
    }

    #[test]
    fn index_out_of_range_raises() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let l = int_list(&[1]);
            let r = pycc_rt_index(l, Value::int(5));
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(l);
        }
    }

    #[test]
    fn slicing() {
        unsafe {
            let l = int_list(&[1, 2, 3, 4, 5]);
            let s = pycc_rt_slice(l, Value::int(1), Value::int(4), Value::none());
            assert_eq!(pycc_rt_len(s), 3);
            let first = pycc_rt_index(s, Value::int(0));
            assert_eq!(first.a, 2);
            pycc_rt_release(s);

            let stepped = pycc_rt_slice(l, Value::none(), Value::none(), Value::int(2));
            assert_eq!(pycc_rt_len(stepped), 3);
            pycc_rt_release(stepped);
            pycc_rt_release(l);
        }
    }

    #[test]
    fn membership() {
        unsafe {
            let l = int_list(&[1, 2, 3]);
            assert_eq!(pycc_rt_contains(l, Value::int(2)), 1);
            assert_eq!(pycc_rt_contains(l, Value::int(9)), 0);
            pycc_rt_release(l);

            let h = Value::str("hello world".into());
            let n = Value::str("lo w".into());
            assert_eq!(pycc_rt_contains(h, n), 1);
            pycc_rt_release(h);
            pycc_rt_release(n);
        }
    }

    #[test]
    fn string_iteration() {
        unsafe {
            let s = Value::str("ab".into());
            assert_eq!(pycc_rt_iter_len(s), 2);
            let c = pycc_rt_iter_get(s, 1);
            assert_eq!(c.str_ref(), "b");
            pycc_rt_release(c);
            pycc_rt_release(s);
        }
    }
}
