//! types shims — SimpleNamespace
//!
//! A namespace is an opaque handle whose attribute reads compile to
//! `pycc_types_getattr` calls (the static subset has no dynamic attribute
//! syntax beyond this handle kind).

use crate::error::raise;
use crate::value::{
    pycc_rt_retain, HandleData, Value, HANDLE_NAMESPACE, TAG_HANDLE, TAG_LIST, TAG_STR,
    TAG_TUPLE,
};
use indexmap::IndexMap;
use std::cell::RefCell;

/// types.SimpleNamespace(pairs) -> handle. `pairs` is a list of
/// [name, value] lists; an empty list gives an empty namespace.
///
/// # Safety
/// `pairs` must be a live List value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_types_simplenamespace(pairs: Value) -> Value {
    // The initializer is optional; an omitted argument arrives as None.
    if pairs.tag == crate::value::TAG_NONE {
        return Value::handle(
            HANDLE_NAMESPACE,
            HandleData::Namespace { attrs: RefCell::new(IndexMap::new()) },
        );
    }
    if pairs.tag != TAG_LIST && pairs.tag != TAG_TUPLE {
        return raise("SimpleNamespace: expected list of pairs");
    }
    let mut attrs: IndexMap<String, Value> = IndexMap::new();
    for pair in unsafe { pairs.list_obj() }.items.borrow().iter() {
        if pair.tag != TAG_LIST && pair.tag != TAG_TUPLE {
            return raise("SimpleNamespace: each entry must be a [name, value] pair");
        }
        let items = unsafe { pair.list_obj() }.items.borrow();
        if items.len() != 2 || items[0].tag != TAG_STR {
            return raise("SimpleNamespace: each entry must be a [name, value] pair");
        }
        let name = unsafe { items[0].str_ref() }.to_string();
        unsafe { pycc_rt_retain(items[1]) };
        attrs.insert(name, items[1]);
    }
    Value::handle(HANDLE_NAMESPACE, HandleData::Namespace { attrs: RefCell::new(attrs) })
}

/// Attribute read on a namespace handle (`ns.name`). Returns an owned
/// value; missing attributes raise.
///
/// # Safety
/// `ns` must be a live namespace handle; `name` a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_types_getattr(ns: Value, name: Value) -> Value {
    if ns.tag != TAG_HANDLE || name.tag != TAG_STR {
        return raise("getattr: expected (namespace, str)");
    }
    let HandleData::Namespace { attrs } = &unsafe { ns.handle_obj() }.data else {
        return raise("getattr: not a namespace handle");
    };
    match attrs.borrow().get(unsafe { name.str_ref() }) {
        Some(v) => unsafe { pycc_rt_retain(*v) },
        None => raise(format!("namespace has no attribute '{}'", unsafe { name.str_ref() })),
    }
}

/// Attribute write on a namespace handle.
///
/// # Safety
/// `ns` must be a live namespace handle; `name` a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_types_setattr(ns: Value, name: Value, value: Value) -> Value {
    if ns.tag != TAG_HANDLE || name.tag != TAG_STR {
        return raise("setattr: expected (namespace, str, value)");
    }
    let HandleData::Namespace { attrs } = &unsafe { ns.handle_obj() }.data else {
        return raise("setattr: not a namespace handle");
    };
    unsafe {
        pycc_rt_retain(value);
        if let Some(old) = attrs.borrow_mut().insert(name.str_ref().to_string(), value) {
            crate::value::pycc_rt_release(old);
        }
    }
    Value::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn build_and_read() {
        unsafe {
            let pairs = Value::list(vec![
                Value::list(vec![Value::str("name".into()), Value::str("bob".into())]),
                Value::list(vec![Value::str("age".into()), Value::int(3)]),
            ]);
            let ns = pycc_types_simplenamespace(pairs);

            let key = Value::str("name".into());
            let name = pycc_types_getattr(ns, key);
            assert_eq!(name.str_ref(), "bob");
            pycc_rt_release(name);
            pycc_rt_release(key);

            let key = Value::str("age".into());
            let age = pycc_types_getattr(ns, key);
            assert_eq!(age.a, 3);
            pycc_rt_release(key);
            pycc_rt_release(ns);
            pycc_rt_release(pairs);
        }
    }

    #[test]
    fn missing_attribute_raises() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let ns = pycc_types_simplenamespace(Value::list(vec![]));
            let key = Value::str("ghost".into());
            let r = pycc_types_getattr(ns, key);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(ns);
            pycc_rt_release(key);
        }
    }

    #[test]
    fn setattr_overwrites() {
        unsafe {
            let ns = pycc_types_simplenamespace(Value::list(vec![]));
            let key = Value::str("x".into());
            pycc_types_setattr(ns, key, Value::int(1));
            pycc_types_setattr(ns, key, Value::int(2));
            assert_eq!(pycc_types_getattr(ns, key).a, 2);
            pycc_rt_release(key);
            pycc_rt_release(ns);
        }
    }
}
