//! collections shims: Counter, OrderedDict, defaultdict
//!
//! Counter and OrderedDict produce ordinary dicts (the base dict already
//! preserves insertion order). defaultdict is an opaque handle with
//! explicit accessors — the static subset forbids implicit default
//! construction on subscript, so reads go through `defaultdict_get`.

use crate::error::raise;
use crate::value::{
    pycc_rt_release, pycc_rt_retain, HandleData, Key, Value, HANDLE_DEFAULTDICT, TAG_HANDLE,
    TAG_LIST, TAG_TUPLE,
};
use indexmap::IndexMap;
use std::cell::RefCell;

/// collections.Counter(seq) -> dict of element -> count, keyed in first-seen
/// order.
///
/// # Safety
/// `seq` must be a live List/Tuple value of hashable elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_collections_counter(seq: Value) -> Value {
    if seq.tag != TAG_LIST && seq.tag != TAG_TUPLE {
        return raise("Counter: expected list");
    }
    let mut map: IndexMap<Key, Value> = IndexMap::new();
    for x in unsafe { seq.list_obj() }.items.borrow().iter() {
        let Some(key) = Key::from_value(*x) else {
            return raise("Counter: unhashable element");
        };
        let next = map.get(&key).map_or(1, |v| v.a + 1);
        map.insert(key, Value::int(next));
    }
    Value::dict(map)
}

/// collections.OrderedDict(pairs) -> dict built from [key, value] pairs.
///
/// # Safety
/// `pairs` must be a live List of two-element lists.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_collections_ordereddict(pairs: Value) -> Value {
    if pairs.tag != TAG_LIST && pairs.tag != TAG_TUPLE {
        return raise("OrderedDict: expected list of pairs");
    }
    let mut map: IndexMap<Key, Value> = IndexMap::new();
    for pair in unsafe { pairs.list_obj() }.items.borrow().iter() {
        if pair.tag != TAG_LIST && pair.tag != TAG_TUPLE {
            return raise("OrderedDict: each entry must be a [key, value] pair");
        }
        let items = unsafe { pair.list_obj() }.items.borrow();
        if items.len() != 2 {
            return raise("OrderedDict: each entry must be a [key, value] pair");
        }
        let Some(key) = Key::from_value(items[0]) else {
            return raise("OrderedDict: unhashable key");
        };
        unsafe {
            pycc_rt_retain(items[1]);
            if let Some(old) = map.insert(key, items[1]) {
                pycc_rt_release(old);
            }
        }
    }
    Value::dict(map)
}

/// collections.defaultdict(default) -> handle.
///
/// # Safety
/// `default` must be a live value; it is retained by the handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_collections_defaultdict(default: Value) -> Value {
    unsafe { pycc_rt_retain(default) };
    Value::handle(
        HANDLE_DEFAULTDICT,
        HandleData::DefaultDict { default, map: RefCell::new(IndexMap::new()) },
    )
}

/// collections.defaultdict_get(dd, key) -> stored value, or the default
/// when the key is missing (the default is NOT inserted).
///
/// # Safety
/// `dd` must be a live defaultdict handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_collections_defaultdict_get(dd: Value, key: Value) -> Value {
    if dd.tag != TAG_HANDLE {
        return raise("defaultdict_get: expected defaultdict handle");
    }
    let HandleData::DefaultDict { default, map } = &unsafe { dd.handle_obj() }.data else {
        return raise("defaultdict_get: expected defaultdict handle");
    };
    let Some(k) = Key::from_value(key) else {
        return raise("defaultdict_get: unhashable key");
    };
    match map.borrow().get(&k) {
        Some(v) => unsafe { pycc_rt_retain(*v) },
        None => unsafe { pycc_rt_retain(*default) },
    }
}

/// collections.defaultdict_set(dd, key, value) -> None.
///
/// # Safety
/// `dd` must be a live defaultdict handle; `value` is retained.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_collections_defaultdict_set(dd: Value, key: Value, value: Value) -> Value {
    if dd.tag != TAG_HANDLE {
        return raise("defaultdict_set: expected defaultdict handle");
    }
    let HandleData::DefaultDict { map, .. } = &unsafe { dd.handle_obj() }.data else {
        return raise("defaultdict_set: expected defaultdict handle");
    };
    let Some(k) = Key::from_value(key) else {
        return raise("defaultdict_set: unhashable key");
    };
    unsafe {
        pycc_rt_retain(value);
        if let Some(old) = map.borrow_mut().insert(k, value) {
            pycc_rt_release(old);
        }
    }
    Value::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lists::pycc_rt_index;

    #[test]
    fn counter_counts_in_first_seen_order() {
        unsafe {
            let a = Value::str("a".into());
            let b = Value::str("b".into());
            let data = Value::list(vec![
                pycc_rt_retain(a),
                pycc_rt_retain(b),
                pycc_rt_retain(a),
            ]);
            let cnt = pycc_collections_counter(data);
            assert_eq!(pycc_rt_index(cnt, a).a, 2);
            assert_eq!(pycc_rt_index(cnt, b).a, 1);
            let s = crate::pprint::pycc_pprint_pformat(cnt);
            assert_eq!(s.str_ref(), "{'a': 2, 'b': 1}");
            for v in [s, cnt, data, a, b] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn ordereddict_from_pairs() {
        unsafe {
            let kx = Value::str("x".into());
            let v1 = Value::str("1".into());
            let ky = Value::str("y".into());
            let v2 = Value::str("2".into());
            let pairs = Value::list(vec![
                Value::list(vec![pycc_rt_retain(kx), pycc_rt_retain(v1)]),
                Value::list(vec![pycc_rt_retain(ky), pycc_rt_retain(v2)]),
            ]);
            let od = pycc_collections_ordereddict(pairs);
            let got = pycc_rt_index(od, kx);
            assert_eq!(got.str_ref(), "1");
            for v in [got, od, pairs, kx, ky, v1, v2] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn defaultdict_get_does_not_insert() {
        unsafe {
            let default = Value::str("x".into());
            let dd = pycc_collections_defaultdict(default);
            let missing = Value::str("missing".into());

            let d0 = pycc_collections_defaultdict_get(dd, missing);
            assert_eq!(d0.str_ref(), "x");
            pycc_rt_release(d0);

            let y = Value::str("y".into());
            pycc_collections_defaultdict_set(dd, missing, y);
            let d1 = pycc_collections_defaultdict_get(dd, missing);
            assert_eq!(d1.str_ref(), "y");

            for v in [d1, y, missing, dd, default] {
                pycc_rt_release(v);
            }
        }
    }
}
