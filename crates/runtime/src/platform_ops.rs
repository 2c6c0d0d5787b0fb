//! platform shims — uname-backed system identification.

use crate::value::Value;
use std::ffi::CStr;

fn uname_field(pick: fn(&libc::utsname) -> &[libc::c_char]) -> String {
    let mut info: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut info) } != 0 {
        return String::new();
    }
    let field = pick(&info);
    unsafe { CStr::from_ptr(field.as_ptr()) }.to_string_lossy().into_owned()
}

/// platform.system() -> str, e.g. 'Linux' or 'Darwin'.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_platform_system() -> Value {
    Value::str(uname_field(|u| &u.sysname))
}

/// platform.machine() -> str, e.g. 'x86_64' or 'arm64'.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_platform_machine() -> Value {
    Value::str(uname_field(|u| &u.machine))
}

/// platform.release() -> kernel release string.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_platform_release() -> Value {
    Value::str(uname_field(|u| &u.release))
}

/// platform.version() -> kernel version string.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_platform_version() -> Value {
    Value::str(uname_field(|u| &u.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn all_fields_nonempty() {
        unsafe {
            for v in [
                pycc_platform_system(),
                pycc_platform_machine(),
                pycc_platform_release(),
                pycc_platform_version(),
            ] {
                assert!(!v.str_ref().is_empty());
                pycc_rt_release(v);
            }
        }
    }
}
