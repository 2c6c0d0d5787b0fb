//! Single-channel runtime errors
//!
//! The source dialect's exception hierarchy is collapsed into one error
//! value: a message plus an optional errno-style code. Raising stores the
//! error in a thread-local slot; `try` blocks in generated code bracket
//! their body with `pycc_rt_try_enter`/`pycc_rt_try_exit` and poll
//! `pycc_rt_err_pending` after each statement. When no handler is active,
//! raising prints one line to stderr and terminates with exit code 1.

use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::ffi::CStr;
use std::os::raw::c_char;

#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub code: i64,
}

thread_local! {
    static PENDING: RefCell<Option<RuntimeError>> = const { RefCell::new(None) };
    static TRY_DEPTH: Cell<i64> = const { Cell::new(0) };
}

/// Raise a runtime error from shim code.
///
/// Inside a `try` the error is parked for the generated code to observe;
/// outside, the program terminates immediately with exit code 1.
pub fn raise(message: impl Into<String>) -> Value {
    raise_with_code(message, 0)
}

pub fn raise_with_code(message: impl Into<String>, code: i64) -> Value {
    let message = message.into();
    if TRY_DEPTH.with(|d| d.get()) == 0 {
        eprintln!("RuntimeError: {}", message);
        crate::io::flush_stdout();
        unsafe { libc::_exit(1) };
    }
    PENDING.with(|p| *p.borrow_mut() = Some(RuntimeError { message, code }));
    Value::none()
}

/// Clear any parked error (used by tests and by `except` entry).
pub fn clear() {
    PENDING.with(|p| *p.borrow_mut() = None);
}

pub fn take() -> Option<RuntimeError> {
    PENDING.with(|p| p.borrow_mut().take())
}

pub fn pending() -> bool {
    PENDING.with(|p| p.borrow().is_some())
}

/// Enter a `try` block.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_try_enter() {
    TRY_DEPTH.with(|d| d.set(d.get() + 1));
}

/// Leave a `try` block (emitted on every exit edge, including the handler).
///
/// # Safety
/// Must pair with a previous `pycc_rt_try_enter`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_try_exit() {
    TRY_DEPTH.with(|d| d.set(d.get() - 1));
}

/// Poll for a parked error. Returns 1 when an error is waiting.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_err_pending() -> i64 {
    pending() as i64
}

/// Consume the parked error, returning its message as a Str value.
/// Returns an empty string if nothing was pending (generated code only
/// calls this after a positive `pycc_rt_err_pending`).
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_err_take() -> Value {
    match take() {
        Some(e) => Value::str(e.message),
        None => Value::str(String::new()),
    }
}

/// Raise from generated code with a static message (bounds errors, etc.).
///
/// # Safety
/// `msg` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_raise(msg: *const c_char) {
    let text = unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
    raise(text);
}
