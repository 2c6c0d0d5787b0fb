//! Small single-function module shims: getpass, __future__, unicodedata,
//! stat.

use crate::error::raise;
use crate::value::{Value, TAG_INT, TAG_STR};

/// getpass.getuser() -> str from $USER/$LOGNAME, 'unknown' fallback.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_getpass_getuser() -> Value {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    Value::str(user)
}

/// getpass.getpass(prompt) -> str. Non-interactive builds have no TTY
/// handling; the prompt is ignored and the empty string returned.
///
/// # Safety
/// `_prompt` may be any live value (a Str at observed call sites).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_getpass_getpass(_prompt: Value) -> Value {
    Value::str(String::new())
}

/// __future__.feature(name) -> bool — True for features this compiler
/// always provides, False for anything unknown.
///
/// # Safety
/// `name` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_future_feature(name: Value) -> Value {
    if name.tag != TAG_STR {
        return raise("__future__: expected str");
    }
    let enabled = matches!(unsafe { name.str_ref() }, "annotations" | "division");
    Value::bool_val(enabled)
}

/// unicodedata.normalize(form, s) -> str. All four forms are the identity
/// in this subset (no ICU tables); unknown forms raise.
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_unicodedata_normalize(form: Value, s: Value) -> Value {
    if form.tag != TAG_STR || s.tag != TAG_STR {
        return raise("normalize: expected (str, str)");
    }
    match unsafe { form.str_ref() } {
        "NFC" | "NFD" | "NFKC" | "NFKD" => Value::str(unsafe { s.str_ref() }.to_string()),
        other => raise(format!("normalize: invalid form '{}'", other)),
    }
}

/// stat.S_ISDIR(mode) -> bool.
///
/// # Safety
/// `mode` must be a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_stat_s_isdir(mode: Value) -> Value {
    if mode.tag != TAG_INT {
        return raise("S_ISDIR: expected int");
    }
    Value::bool_val((mode.a as libc::mode_t) & libc::S_IFMT == libc::S_IFDIR)
}

/// stat.S_ISREG(mode) -> bool.
///
/// # Safety
/// `mode` must be a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_stat_s_isreg(mode: Value) -> Value {
    if mode.tag != TAG_INT {
        return raise("S_ISREG: expected int");
    }
    Value::bool_val((mode.a as libc::mode_t) & libc::S_IFMT == libc::S_IFREG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn stat_predicates() {
        unsafe {
            let dir_mode = Value::int(0o040755);
            let reg_mode = Value::int(0o100644);
            assert_eq!(pycc_stat_s_isdir(dir_mode).a, 1);
            assert_eq!(pycc_stat_s_isreg(dir_mode).a, 0);
            assert_eq!(pycc_stat_s_isreg(reg_mode).a, 1);
            assert_eq!(pycc_stat_s_isdir(reg_mode).a, 0);
        }
    }

    #[test]
    fn normalize_is_identity_on_ascii() {
        unsafe {
            for form in ["NFC", "NFD", "NFKC", "NFKD"] {
                let f = Value::str(form.into());
                let s = Value::str("cafe".into());
                let out = pycc_unicodedata_normalize(f, s);
                assert_eq!(out.str_ref(), "cafe");
                for v in [out, f, s] {
                    pycc_rt_release(v);
                }
            }
        }
    }

    #[test]
    fn future_features() {
        unsafe {
            let yes = Value::str("annotations".into());
            let no = Value::str("unicode_literals".into());
            assert_eq!(pycc_future_feature(yes).a, 1);
            assert_eq!(pycc_future_feature(no).a, 0);
            pycc_rt_release(yes);
            pycc_rt_release(no);
        }
    }

    #[test]
    fn getpass_is_empty_and_user_is_not() {
        unsafe {
            let u = pycc_getpass_getuser();
            assert!(!u.str_ref().is_empty());
            pycc_rt_release(u);
            let p = pycc_getpass_getpass(Value::none());
            assert_eq!(p.str_ref(), "");
            pycc_rt_release(p);
        }
    }
}
