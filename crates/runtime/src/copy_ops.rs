//! copy shims
//!
//! `copy` duplicates only the outermost container — children are shared by
//! reference, so mutating a nested list through the original is visible in
//! the copy. `deepcopy` recurses through every container level.

use crate::error::raise;
use crate::value::{
    pycc_rt_retain, Key, Value, TAG_DICT, TAG_LIST, TAG_SET, TAG_TUPLE,
};
use indexmap::IndexMap;

fn deep(v: Value) -> Value {
    unsafe {
        match v.tag {
            TAG_LIST | TAG_TUPLE => {
                let items: Vec<Value> = v.list_obj().items.borrow().iter().map(|x| deep(*x)).collect();
                if v.tag == TAG_TUPLE { Value::tuple(items) } else { Value::list(items) }
            }
            TAG_DICT => {
                let mut map: IndexMap<Key, Value> = IndexMap::new();
                for (k, x) in v.dict_obj().map.borrow().iter() {
                    map.insert(k.clone(), deep(*x));
                }
                Value::dict(map)
            }
            TAG_SET => Value::set(v.set_obj().set.borrow().clone()),
            // Scalars and strings are immutable; sharing is indistinguishable
            // from copying.
            _ => pycc_rt_retain(v),
        }
    }
}

/// copy.copy(x) -> shallow copy.
///
/// # Safety
/// `v` must be a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_copy_copy(v: Value) -> Value {
    unsafe {
        match v.tag {
            TAG_LIST | TAG_TUPLE => {
                let items: Vec<Value> =
                    v.list_obj().items.borrow().iter().map(|x| pycc_rt_retain(*x)).collect();
                if v.tag == TAG_TUPLE { Value::tuple(items) } else { Value::list(items) }
            }
            TAG_DICT => {
                let mut map: IndexMap<Key, Value> = IndexMap::new();
                for (k, x) in v.dict_obj().map.borrow().iter() {
                    map.insert(k.clone(), pycc_rt_retain(*x));
                }
                Value::dict(map)
            }
            TAG_SET => Value::set(v.set_obj().set.borrow().clone()),
            _ => pycc_rt_retain(v),
        }
    }
}

/// copy.deepcopy(x) -> fully independent copy.
///
/// # Safety
/// `v` must be a live value. Cycles cannot form in the compiled subset, so
/// recursion terminates.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_copy_deepcopy(v: Value) -> Value {
    if v.tag == crate::value::TAG_HANDLE {
        return raise("deepcopy: handles are not copyable");
    }
    deep(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lists::pycc_rt_list_push;
    use crate::pprint::pycc_pprint_pformat;
    use crate::value::pycc_rt_release;

    #[test]
    fn shallow_shares_children_deep_does_not() {
        unsafe {
            let inner = Value::list(vec![Value::int(2)]);
            let orig = Value::list(vec![
                Value::int(1),
                pycc_rt_retain(inner),
                Value::int(3),
            ]);
            let a = pycc_copy_copy(orig);
            let b = pycc_copy_deepcopy(orig);

            pycc_rt_list_push(inner, Value::int(99));

            let s_orig = pycc_pprint_pformat(orig);
            let s_a = pycc_pprint_pformat(a);
            let s_b = pycc_pprint_pformat(b);
            assert_eq!(s_orig.str_ref(), "[1, [2, 99], 3]");
            assert_eq!(s_a.str_ref(), "[1, [2, 99], 3]");
            assert_eq!(s_b.str_ref(), "[1, [2], 3]");

            for v in [s_orig, s_a, s_b, a, b, orig, inner] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn scalars_copy_to_themselves() {
        unsafe {
            let n = pycc_copy_copy(Value::int(5));
            assert_eq!(n.a, 5);
            let d = pycc_copy_deepcopy(Value::float(1.5));
            assert_eq!(d.as_f64(), 1.5);
        }
    }
}
