//! array shims
//!
//! Typed integer arrays behind an opaque handle; the supported typecodes
//! are the signed integer family. `tolist` converts back to an ordinary
//! list.

use crate::error::raise;
use crate::value::{HandleData, Value, HANDLE_ARRAY, TAG_HANDLE, TAG_INT, TAG_LIST, TAG_STR};
use std::cell::RefCell;

/// array.array(typecode, init) -> array handle.
///
/// # Safety
/// `typecode` must be a live Str value; `init` a live List of Ints.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_array_array(typecode: Value, init: Value) -> Value {
    if typecode.tag != TAG_STR || init.tag != TAG_LIST {
        return raise("array: expected (str, list)");
    }
    let code = unsafe { typecode.str_ref() };
    let code_char = match code {
        "b" | "h" | "i" | "l" | "q" => code.chars().next().unwrap(),
        other => return raise(format!("array: unsupported typecode '{}'", other)),
    };
    let mut items = Vec::new();
    for v in unsafe { init.list_obj() }.items.borrow().iter() {
        if v.tag != TAG_INT {
            return raise("array: initializer must contain ints");
        }
        items.push(v.a);
    }
    Value::handle(
        HANDLE_ARRAY,
        HandleData::Array { typecode: code_char, items: RefCell::new(items) },
    )
}

fn array_items(a: Value, what: &str) -> Result<&'static RefCell<Vec<i64>>, Value> {
    if a.tag != TAG_HANDLE {
        return Err(raise(format!("{}: expected array handle", what)));
    }
    // The handle object outlives the shim call; reborrow through the raw
    // pointer to decouple the lifetime from the local `a`.
    let obj: &'static crate::value::HandleObj =
        unsafe { &*(a.a as *const crate::value::HandleObj) };
    match &obj.data {
        HandleData::Array { items, .. } => Ok(items),
        _ => Err(raise(format!("{}: expected array handle", what))),
    }
}

/// array.append(a, x) -> None.
///
/// # Safety
/// `a` must be a live array handle; `x` a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_array_append(a: Value, x: Value) -> Value {
    let items = match array_items(a, "append") {
        Ok(i) => i,
        Err(e) => return e,
    };
    if x.tag != TAG_INT {
        return raise("append: expected int");
    }
    items.borrow_mut().push(x.a);
    Value::none()
}

/// array.pop(a) -> int — removes and returns the last element.
///
/// # Safety
/// `a` must be a live, non-empty array handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_array_pop(a: Value) -> Value {
    let items = match array_items(a, "pop") {
        Ok(i) => i,
        Err(e) => return e,
    };
    match items.borrow_mut().pop() {
        Some(n) => Value::int(n),
        None => raise("pop: empty array"),
    }
}

/// array.tolist(a) -> list of ints.
///
/// # Safety
/// `a` must be a live array handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_array_tolist(a: Value) -> Value {
    let items = match array_items(a, "tolist") {
        Ok(i) => i,
        Err(e) => return e,
    };
    let out: Vec<Value> = items.borrow().iter().map(|n| Value::int(*n)).collect();
    Value::list(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pprint::pycc_pprint_pformat;
    use crate::value::pycc_rt_release;

    #[test]
    fn append_pop_tolist() {
        unsafe {
            let code = Value::str("i".into());
            let init = Value::list(vec![Value::int(1), Value::int(2)]);
            let a = pycc_array_array(code, init);

            pycc_array_append(a, Value::int(3));
            assert_eq!(pycc_array_pop(a).a, 3);

            let l = pycc_array_tolist(a);
            let s = pycc_pprint_pformat(l);
            assert_eq!(s.str_ref(), "[1, 2]");
            for v in [s, l, a, code, init] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn bad_typecode_raises() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let code = Value::str("f".into());
            let init = Value::list(vec![]);
            let r = pycc_array_array(code, init);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(code);
            pycc_rt_release(init);
        }
    }
}
