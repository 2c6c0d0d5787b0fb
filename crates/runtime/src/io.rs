//! I/O shims
//!
//! Backing for the `io` module: stdout writing plus whole-file text
//! read/write. Stdout is line-buffered — complete lines are written
//! immediately, a trailing partial line is held until the next newline or
//! process shutdown.
//!
//! # Safety Contract
//!
//! These functions are called only by compiler-generated code. The type
//! checker guarantees argument tags; shims still verify them and raise
//! through the error channel on mismatch rather than trusting blindly.

use crate::error::raise;
use crate::value::{Value, TAG_STR};
use std::cell::RefCell;
use std::fs;
use std::io::Write;

thread_local! {
    static STDOUT_BUF: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Drain the stdout buffer completely (process shutdown, error exit).
pub fn flush_stdout() {
    STDOUT_BUF.with(|b| {
        let mut buf = b.borrow_mut();
        if !buf.is_empty() {
            let mut out = std::io::stdout();
            let _ = out.write_all(buf.as_bytes());
            let _ = out.flush();
            buf.clear();
        }
    });
}

fn write_buffered(s: &str) {
    STDOUT_BUF.with(|b| {
        let mut buf = b.borrow_mut();
        buf.push_str(s);
        if let Some(pos) = buf.rfind('\n') {
            let mut out = std::io::stdout();
            let _ = out.write_all(buf[..=pos].as_bytes());
            let _ = out.flush();
            buf.drain(..=pos);
        }
    });
}

/// io.write_stdout(s) -> None
///
/// # Safety
/// `s` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_io_write_stdout(s: Value) -> Value {
    if s.tag != TAG_STR {
        return raise("write_stdout: expected str");
    }
    write_buffered(unsafe { s.str_ref() });
    Value::none()
}

/// io.write_file(path, text) -> bool
///
/// Creates or truncates `path` and writes `text` as UTF-8. Returns False
/// instead of raising on OS errors, matching the boolean discipline the
/// source programs rely on.
///
/// # Safety
/// `path` and `text` must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_io_write_file(path: Value, text: Value) -> Value {
    if path.tag != TAG_STR || text.tag != TAG_STR {
        return raise("write_file: expected (str, str)");
    }
    let ok = fs::write(unsafe { path.str_ref() }, unsafe { text.str_ref() }).is_ok();
    Value::bool_val(ok)
}

/// io.read_file(path) -> str
///
/// Raises when the file cannot be read or is not valid UTF-8.
///
/// # Safety
/// `path` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_io_read_file(path: Value) -> Value {
    if path.tag != TAG_STR {
        return raise("read_file: expected str");
    }
    let p = unsafe { path.str_ref() };
    match fs::read_to_string(p) {
        Ok(text) => Value::str(text),
        Err(e) => raise_with_errno(format!("read_file: {}: {}", p, e), &e),
    }
}

fn raise_with_errno(msg: String, e: &std::io::Error) -> Value {
    crate::error::raise_with_code(msg, e.raw_os_error().unwrap_or(0) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn file_round_trip() {
        unsafe {
            let dir = tempfile::tempdir().unwrap();
            let p = dir.path().join("t.txt");
            let path = Value::str(p.to_string_lossy().into_owned());
            let text = Value::str("Hello IO!".to_string());

            let ok = pycc_io_write_file(path, text);
            assert_eq!(ok.a, 1);

            let back = pycc_io_read_file(path);
            assert_eq!(back.str_ref(), "Hello IO!");

            pycc_rt_release(back);
            pycc_rt_release(path);
            pycc_rt_release(text);
        }
    }

    #[test]
    fn write_file_reports_failure() {
        unsafe {
            let path = Value::str("/nonexistent-dir/px/t.txt".to_string());
            let text = Value::str("x".to_string());
            let ok = pycc_io_write_file(path, text);
            assert_eq!(ok.a, 0);
            pycc_rt_release(path);
            pycc_rt_release(text);
        }
    }

    #[test]
    fn read_missing_file_parks_error_inside_try() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let path = Value::str("/definitely/not/here.txt".to_string());
            let r = pycc_io_read_file(path);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(path);
        }
    }
}
