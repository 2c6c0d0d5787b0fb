//! Process lifecycle
//!
//! Generated `main` calls `pycc_rt_init` before user code and
//! `pycc_rt_shutdown` after it. Init captures argv for `sys.argv`;
//! shutdown drains the stdout buffer and, when built with the `profiling`
//! feature, writes the profile buffer.

use std::cell::RefCell;
use std::ffi::CStr;
use std::os::raw::c_char;

thread_local! {
    static ARGV: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

pub fn argv() -> Vec<String> {
    ARGV.with(|a| a.borrow().clone())
}

/// Capture command-line arguments and prepare the runtime.
///
/// # Safety
/// `argv` must point to `argc` valid NUL-terminated strings (the C `main`
/// contract).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_init(argc: i32, argv: *const *const c_char) {
    let mut args = Vec::with_capacity(argc.max(0) as usize);
    for i in 0..argc {
        let p = unsafe { *argv.offset(i as isize) };
        if p.is_null() {
            break;
        }
        args.push(unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned());
    }
    ARGV.with(|a| *a.borrow_mut() = args);
}

/// Flush buffered output and finalize profiling, then return to `main`.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_shutdown() {
    crate::io::flush_stdout();
    crate::profile::write_profraw();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn init_captures_argv() {
        let a0 = CString::new("prog").unwrap();
        let a1 = CString::new("--flag").unwrap();
        let ptrs = [a0.as_ptr(), a1.as_ptr()];
        unsafe { pycc_rt_init(2, ptrs.as_ptr()) };
        assert_eq!(argv(), vec!["prog".to_string(), "--flag".to_string()]);
    }
}
