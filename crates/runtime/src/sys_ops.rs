//! sys shims
//!
//! `sys.exit` is the subtle one: at the top level of a generated program
//! it must terminate immediately, but test harnesses drive compiled demos
//! in-process and need control back. With `PYCC_HARNESS=1` in the
//! environment the exit code is recorded and execution continues;
//! otherwise the process `_exit`s on the spot.

use crate::error::raise;
use crate::value::{Value, TAG_INT};
use std::cell::Cell;

thread_local! {
    static DEFERRED_EXIT: Cell<Option<i64>> = const { Cell::new(None) };
}

fn harness_active() -> bool {
    std::env::var("PYCC_HARNESS").map(|v| v == "1").unwrap_or(false)
}

/// The exit code recorded by a deferred `sys.exit`, if any.
pub fn deferred_exit_code() -> Option<i64> {
    DEFERRED_EXIT.with(|c| c.get())
}

/// sys.exit(n) -> None (deferred) or never returns.
///
/// # Safety
/// `code` must be a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_sys_exit(code: Value) -> Value {
    if code.tag != TAG_INT {
        return raise("exit: expected int");
    }
    if harness_active() {
        DEFERRED_EXIT.with(|c| c.set(Some(code.a)));
        return Value::none();
    }
    crate::io::flush_stdout();
    unsafe { libc::_exit(code.a as i32) }
}

/// sys.platform() -> str ('linux', 'darwin', ...).
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_sys_platform() -> Value {
    let p = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    Value::str(p.to_string())
}

/// sys.version() -> str identifying the toolchain.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_sys_version() -> Value {
    Value::str(format!("pycc {}", env!("CARGO_PKG_VERSION")))
}

/// sys.maxsize() -> int.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_sys_maxsize() -> Value {
    Value::int(i64::MAX)
}

/// sys.argv() -> list of str, as captured at startup.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_sys_argv() -> Value {
    Value::list(crate::process::argv().into_iter().map(Value::str).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;
    use serial_test::serial;

    #[test]
    #[serial]
    fn exit_is_deferred_under_harness() {
        unsafe {
            std::env::set_var("PYCC_HARNESS", "1");
            let r = pycc_sys_exit(Value::int(3));
            assert!(r.is_none());
            assert_eq!(deferred_exit_code(), Some(3));
            DEFERRED_EXIT.with(|c| c.set(None));
            std::env::remove_var("PYCC_HARNESS");
        }
    }

    #[test]
    fn platform_and_version_shapes() {
        unsafe {
            let p = pycc_sys_platform();
            assert!(!p.str_ref().is_empty());
            pycc_rt_release(p);
            let v = pycc_sys_version();
            assert!(v.str_ref().starts_with("pycc "));
            pycc_rt_release(v);
            assert!(pycc_sys_maxsize().a > 0);
        }
    }
}
