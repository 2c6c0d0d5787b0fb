//! os shims
//!
//! Directory creation/removal and environment access. `remove` handles
//! both files and empty directories, matching how the source programs use
//! it for cleanup.

use crate::error::raise;
use crate::value::{Value, TAG_STR};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// os.mkdir(path) -> None. Created with mode 0755. Raises if the path
/// already exists or the parent is missing.
///
/// # Safety
/// `path` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_os_mkdir(path: Value) -> Value {
    if path.tag != TAG_STR {
        return raise("mkdir: expected str");
    }
    let p = unsafe { path.str_ref() };
    if let Err(e) = fs::create_dir(p) {
        return crate::error::raise_with_code(
            format!("mkdir: {}: {}", p, e),
            e.raw_os_error().unwrap_or(0) as i64,
        );
    }
    #[cfg(unix)]
    let _ = fs::set_permissions(p, fs::Permissions::from_mode(0o755));
    Value::none()
}

/// os.remove(path) -> None. Removes a file, or an empty directory.
///
/// # Safety
/// `path` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_os_remove(path: Value) -> Value {
    if path.tag != TAG_STR {
        return raise("remove: expected str");
    }
    let p = unsafe { path.str_ref() };
    let meta = match fs::symlink_metadata(p) {
        Ok(m) => m,
        Err(e) => {
            return crate::error::raise_with_code(
                format!("remove: {}: {}", p, e),
                e.raw_os_error().unwrap_or(0) as i64,
            )
        }
    };
    let result = if meta.is_dir() { fs::remove_dir(p) } else { fs::remove_file(p) };
    match result {
        Ok(()) => Value::none(),
        Err(e) => crate::error::raise_with_code(
            format!("remove: {}: {}", p, e),
            e.raw_os_error().unwrap_or(0) as i64,
        ),
    }
}

/// os.getcwd() -> str.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_os_getcwd() -> Value {
    match std::env::current_dir() {
        Ok(p) => Value::str(p.to_string_lossy().into_owned()),
        Err(e) => raise(format!("getcwd: {}", e)),
    }
}

/// os.getenv(name) -> str. Missing variables yield the empty string.
///
/// # Safety
/// `name` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_os_getenv(name: Value) -> Value {
    if name.tag != TAG_STR {
        return raise("getenv: expected str");
    }
    Value::str(std::env::var(unsafe { name.str_ref() }).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn mkdir_then_remove() {
        unsafe {
            let base = tempfile::tempdir().unwrap();
            let p = base.path().join("sub");
            let path = Value::str(p.to_string_lossy().into_owned());
            pycc_os_mkdir(path);
            assert!(p.is_dir());
            pycc_os_remove(path);
            assert!(!p.exists());
            pycc_rt_release(path);
        }
    }

    #[test]
    fn remove_works_on_files_too() {
        unsafe {
            let base = tempfile::tempdir().unwrap();
            let p = base.path().join("f.txt");
            std::fs::write(&p, "x").unwrap();
            let path = Value::str(p.to_string_lossy().into_owned());
            pycc_os_remove(path);
            assert!(!p.exists());
            pycc_rt_release(path);
        }
    }

    #[test]
    fn remove_missing_raises() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let path = Value::str("/no/such/path/at/all".into());
            let r = pycc_os_remove(path);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(path);
        }
    }
}
