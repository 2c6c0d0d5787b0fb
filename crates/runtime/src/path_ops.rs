//! Path manipulation shims
//!
//! One implementation backs `os.path`, `posixpath` and `pathlib` — all
//! three module names resolve here, with POSIX separator rules regardless
//! of host (the compiler targets POSIX systems).

use crate::error::raise;
use crate::value::{Value, TAG_STR};

fn str_arg<'a>(v: Value, what: &str) -> Result<&'a str, Value> {
    if v.tag != TAG_STR {
        return Err(raise(format!("{}: expected str", what)));
    }
    Ok(unsafe { v.str_ref() })
}

/// join(a, b) -> str. An absolute second component replaces the first.
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_path_join(a: Value, b: Value) -> Value {
    let (a, b) = match (str_arg(a, "join"), str_arg(b, "join")) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    if b.starts_with('/') || a.is_empty() {
        return Value::str(b.to_string());
    }
    if a.ends_with('/') {
        Value::str(format!("{}{}", a, b))
    } else {
        Value::str(format!("{}/{}", a, b))
    }
}

/// dirname(p) -> str: everything before the final slash ('' if none).
///
/// # Safety
/// `p` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_path_dirname(p: Value) -> Value {
    let p = match str_arg(p, "dirname") {
        Ok(p) => p,
        Err(e) => return e,
    };
    match p.rfind('/') {
        Some(0) => Value::str("/".to_string()),
        Some(i) => Value::str(p[..i].to_string()),
        None => Value::str(String::new()),
    }
}

/// basename(p) -> str: everything after the final slash.
///
/// # Safety
/// `p` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_path_basename(p: Value) -> Value {
    let p = match str_arg(p, "basename") {
        Ok(p) => p,
        Err(e) => return e,
    };
    match p.rfind('/') {
        Some(i) => Value::str(p[i + 1..].to_string()),
        None => Value::str(p.to_string()),
    }
}

/// splitext(p) -> [root, ext]. The extension includes the dot; leading
/// dots of hidden files do not start an extension.
///
/// # Safety
/// `p` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_path_splitext(p: Value) -> Value {
    let p = match str_arg(p, "splitext") {
        Ok(p) => p,
        Err(e) => return e,
    };
    let base_start = p.rfind('/').map_or(0, |i| i + 1);
    let base = &p[base_start..];
    match base.rfind('.') {
        Some(i) if i > 0 => {
            let split = base_start + i;
            Value::list(vec![
                Value::str(p[..split].to_string()),
                Value::str(p[split..].to_string()),
            ])
        }
        _ => Value::list(vec![Value::str(p.to_string()), Value::str(String::new())]),
    }
}

/// suffix(p) -> str: the extension alone ('' if none). pathlib-style.
///
/// # Safety
/// `p` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_path_suffix(p: Value) -> Value {
    let parts = unsafe { pycc_path_splitext(p) };
    if parts.is_none() {
        return parts;
    }
    let ext = unsafe {
        let items = parts.list_obj().items.borrow();
        crate::value::pycc_rt_retain(items[1])
    };
    unsafe { crate::value::pycc_rt_release(parts) };
    ext
}

/// abspath(p) -> str: absolute, with '.' and '..' segments resolved
/// lexically against the current directory.
///
/// # Safety
/// `p` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_path_abspath(p: Value) -> Value {
    let p = match str_arg(p, "abspath") {
        Ok(p) => p,
        Err(e) => return e,
    };
    let mut full = if p.starts_with('/') {
        String::new()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.to_string_lossy().into_owned(),
            Err(e) => return raise(format!("abspath: {}", e)),
        }
    };
    full.push('/');
    full.push_str(p);

    let mut parts: Vec<&str> = Vec::new();
    for seg in full.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    Value::str(format!("/{}", parts.join("/")))
}

/// home() -> str: the user's home directory ($HOME, '/' fallback).
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_path_home() -> Value {
    Value::str(std::env::var("HOME").unwrap_or_else(|_| "/".to_string()))
}

/// exists(p) -> bool.
///
/// # Safety
/// `p` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_path_exists(p: Value) -> Value {
    let p = match str_arg(p, "exists") {
        Ok(p) => p,
        Err(e) => return e,
    };
    Value::bool_val(std::path::Path::new(p).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    fn s(text: &str) -> Value {
        Value::str(text.to_string())
    }

    #[test]
    fn join_cases() {
        unsafe {
            let cases = [
                ("a", "b", "a/b"),
                ("a/", "b", "a/b"),
                ("a", "/b", "/b"),
                ("", "b", "b"),
            ];
            for (a, b, want) in cases {
                let (av, bv) = (s(a), s(b));
                let j = pycc_path_join(av, bv);
                assert_eq!(j.str_ref(), want);
                pycc_rt_release(j);
                pycc_rt_release(av);
                pycc_rt_release(bv);
            }
        }
    }

    #[test]
    fn dirname_basename() {
        unsafe {
            let p = s("/tmp/x");
            let d = pycc_path_dirname(p);
            let b = pycc_path_basename(p);
            assert_eq!(d.str_ref(), "/tmp");
            assert_eq!(b.str_ref(), "x");
            for v in [d, b, p] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn splitext_and_suffix() {
        unsafe {
            let p = s("/tmp/x.txt");
            let parts = pycc_path_splitext(p);
            let items = parts.list_obj().items.borrow();
            assert_eq!(items[0].str_ref(), "/tmp/x");
            assert_eq!(items[1].str_ref(), ".txt");
            drop(items);
            pycc_rt_release(parts);
            pycc_rt_release(p);

            let m = s("src/main.py");
            let ext = pycc_path_suffix(m);
            assert_eq!(ext.str_ref(), ".py");
            pycc_rt_release(ext);
            pycc_rt_release(m);

            let hidden = s(".bashrc");
            let parts = pycc_path_splitext(hidden);
            let items = parts.list_obj().items.borrow();
            assert_eq!(items[0].str_ref(), ".bashrc");
            assert_eq!(items[1].str_ref(), "");
            drop(items);
            pycc_rt_release(parts);
            pycc_rt_release(hidden);
        }
    }

    #[test]
    fn abspath_resolves_dots() {
        unsafe {
            let p = s("/a/b/../c/./d");
            let a = pycc_path_abspath(p);
            assert_eq!(a.str_ref(), "/a/c/d");
            pycc_rt_release(a);
            pycc_rt_release(p);

            let rel = s(".");
            let a = pycc_path_abspath(rel);
            assert!(a.str_ref().starts_with('/'));
            pycc_rt_release(a);
            pycc_rt_release(rel);
        }
    }

    #[test]
    fn home_is_nonempty() {
        unsafe {
            let h = pycc_path_home();
            assert!(!h.str_ref().is_empty());
            pycc_rt_release(h);
        }
    }
}
