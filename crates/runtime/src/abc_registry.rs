//! _abc shims
//!
//! An identity-keyed registry of (type, virtual subclass) pairs with a
//! monotonic cache token. Identity here means string content — the subset
//! registers interned name strings, and two equal literals are the same
//! registration key.

use crate::error::raise;
use crate::value::{Value, TAG_STR};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

thread_local! {
    static REGISTRY: RefCell<HashSet<(String, String)>> = RefCell::new(HashSet::new());
    static CACHE_TOKEN: Cell<i64> = const { Cell::new(0) };
}

fn pair(a: Value, b: Value, what: &str) -> Result<(String, String), Value> {
    if a.tag != TAG_STR || b.tag != TAG_STR {
        return Err(raise(format!("{}: expected (str, str)", what)));
    }
    Ok(unsafe { (a.str_ref().to_string(), b.str_ref().to_string()) })
}

/// _abc.register(cls, subclass) -> bool — True only on first insertion.
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_abc_register(cls: Value, subclass: Value) -> Value {
    let key = match pair(cls, subclass, "register") {
        Ok(k) => k,
        Err(e) => return e,
    };
    Value::bool_val(REGISTRY.with(|r| r.borrow_mut().insert(key)))
}

/// _abc.is_registered(cls, subclass) -> bool.
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_abc_is_registered(cls: Value, subclass: Value) -> Value {
    let key = match pair(cls, subclass, "is_registered") {
        Ok(k) => k,
        Err(e) => return e,
    };
    Value::bool_val(REGISTRY.with(|r| r.borrow().contains(&key)))
}

/// _abc.get_cache_token() -> int.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_abc_get_cache_token() -> Value {
    Value::int(CACHE_TOKEN.with(|t| t.get()))
}

/// _abc.invalidate_cache() -> None — strictly increases the token.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_abc_invalidate_cache() -> Value {
    CACHE_TOKEN.with(|t| t.set(t.get() + 1));
    Value::none()
}

/// _abc.reset() -> None — clears the registry and zeroes the token.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_abc_reset() -> Value {
    REGISTRY.with(|r| r.borrow_mut().clear());
    CACHE_TOKEN.with(|t| t.set(0));
    Value::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn register_once_semantics() {
        unsafe {
            pycc_abc_reset();
            let a = Value::str("A".into());
            let b = Value::str("B".into());
            assert_eq!(pycc_abc_register(a, b).a, 1);
            assert_eq!(pycc_abc_register(a, b).a, 0);
            assert_eq!(pycc_abc_is_registered(a, b).a, 1);
            pycc_abc_reset();
            assert_eq!(pycc_abc_is_registered(a, b).a, 0);
            pycc_rt_release(a);
            pycc_rt_release(b);
        }
    }

    #[test]
    fn token_is_monotonic_and_resets_to_zero() {
        unsafe {
            pycc_abc_reset();
            let t0 = pycc_abc_get_cache_token().a;
            assert_eq!(t0, 0);
            pycc_abc_invalidate_cache();
            let t1 = pycc_abc_get_cache_token().a;
            assert!(t1 > t0);
            pycc_abc_invalidate_cache();
            assert!(pycc_abc_get_cache_token().a > t1);
            pycc_abc_reset();
            assert_eq!(pycc_abc_get_cache_token().a, 0);
        }
    }
}
