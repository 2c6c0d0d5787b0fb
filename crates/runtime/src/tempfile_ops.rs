//! tempfile shims
//!
//! `mkdtemp` and `mkstemp` generate names from OS randomness and create
//! the entry before returning, so returned paths are unique and already
//! exist. Cleanup is the caller's responsibility.

use crate::error::raise;
use crate::value::Value;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fs;

fn tempdir() -> String {
    std::env::var("TMPDIR").unwrap_or_else(|_| "/tmp".to_string())
}

fn random_suffix() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut out = String::with_capacity(8);
    for _ in 0..8 {
        out.push(ALPHABET[(OsRng.next_u32() as usize) % ALPHABET.len()] as char);
    }
    out
}

/// tempfile.gettempdir() -> str.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_tempfile_gettempdir() -> Value {
    Value::str(tempdir())
}

/// tempfile.mkdtemp() -> str — a freshly created private directory.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_tempfile_mkdtemp() -> Value {
    let base = tempdir();
    for _ in 0..32 {
        let candidate = format!("{}/tmp{}", base, random_suffix());
        if fs::create_dir(&candidate).is_ok() {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = fs::set_permissions(&candidate, fs::Permissions::from_mode(0o700));
            }
            return Value::str(candidate);
        }
    }
    raise("mkdtemp: could not create a unique directory")
}

/// tempfile.mkstemp() -> [fd, path] — a freshly created private file.
/// The fd is open for writing; the subset closes it implicitly at exit.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_tempfile_mkstemp() -> Value {
    let base = tempdir();
    for _ in 0..32 {
        let candidate = format!("{}/tmp{}", base, random_suffix());
        let cpath = match std::ffi::CString::new(candidate.clone()) {
            Ok(c) => c,
            Err(_) => continue,
        };
        let fd = unsafe {
            libc::open(
                cpath.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                0o600,
            )
        };
        if fd >= 0 {
            return Value::list(vec![Value::int(fd as i64), Value::str(candidate)]);
        }
    }
    raise("mkstemp: could not create a unique file")
}
