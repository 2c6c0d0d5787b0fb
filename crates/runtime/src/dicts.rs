//! Dict and set construction
//!
//! Both are insertion-ordered: iteration and `pprint` output follow the
//! order keys were first inserted, which the formatting demos rely on.
//! Subscript read/write and membership live in `lists.rs` with the rest of
//! the generic container protocol.

use crate::error::raise;
use crate::value::{pycc_rt_release, pycc_rt_retain, Key, Value, TAG_DICT, TAG_SET};
use indexmap::{IndexMap, IndexSet};

/// Allocate an empty dict.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_dict_new() -> Value {
    Value::dict(IndexMap::new())
}

/// Insert `k -> v` (dict literals, dict comprehensions). Retains `v`;
/// replacing an existing key keeps its original position and releases the
/// old value.
///
/// # Safety
/// All arguments must be live values; `d` must be a Dict.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_dict_set(d: Value, k: Value, v: Value) {
    if d.tag != TAG_DICT {
        raise("dict insert on non-dict value");
        return;
    }
    let key = match Key::from_value(k) {
        Some(key) => key,
        None => {
            raise("unhashable dict key");
            return;
        }
    };
    unsafe {
        pycc_rt_retain(v);
        if let Some(old) = d.dict_obj().map.borrow_mut().insert(key, v) {
            pycc_rt_release(old);
        }
    }
}

/// Allocate an empty set.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_set_new() -> Value {
    Value::set(IndexSet::new())
}

/// Add an element (set literals, set comprehensions). Duplicates keep the
/// first insertion position.
///
/// # Safety
/// Both arguments must be live values; `s` must be a Set.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_set_add(s: Value, x: Value) {
    if s.tag != TAG_SET {
        raise("set insert on non-set value");
        return;
    }
    let key = match Key::from_value(x) {
        Some(key) => key,
        None => {
            raise("unhashable set element");
            return;
        }
    };
    unsafe {
        s.set_obj().set.borrow_mut().insert(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lists::{pycc_rt_contains, pycc_rt_index, pycc_rt_iter_get, pycc_rt_len};

    #[test]
    fn insertion_order_is_preserved() {
        unsafe {
            let d = pycc_rt_dict_new();
            let kb = Value::str("b".into());
            let ka = Value::str("a".into());
            pycc_rt_dict_set(d, kb, Value::int(1));
            pycc_rt_dict_set(d, ka, Value::int(2));

            let first = pycc_rt_iter_get(d, 0);
            assert_eq!(first.str_ref(), "b");
            pycc_rt_release(first);

            // Overwriting keeps position.
            pycc_rt_dict_set(d, kb, Value::int(9));
            let first = pycc_rt_iter_get(d, 0);
            assert_eq!(first.str_ref(), "b");
            let v = pycc_rt_index(d, kb);
            assert_eq!(v.a, 9);

            pycc_rt_release(first);
            pycc_rt_release(ka);
            pycc_rt_release(kb);
            pycc_rt_release(d);
        }
    }

    #[test]
    fn set_dedup() {
        unsafe {
            let s = pycc_rt_set_new();
            pycc_rt_set_add(s, Value::int(1));
            pycc_rt_set_add(s, Value::int(2));
            pycc_rt_set_add(s, Value::int(1));
            assert_eq!(pycc_rt_len(s), 2);
            assert_eq!(pycc_rt_contains(s, Value::int(2)), 1);
            pycc_rt_release(s);
        }
    }
}
