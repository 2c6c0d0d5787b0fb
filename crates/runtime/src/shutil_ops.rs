//! shutil shims
//!
//! Both copy operations follow the boolean-success discipline: False on a
//! missing source or failed write, never a raise.

use crate::error::raise;
use crate::value::{Value, TAG_STR};
use std::fs;

fn copy_impl(src: Value, dst: Value, what: &str) -> Value {
    if src.tag != TAG_STR || dst.tag != TAG_STR {
        return raise(format!("{}: expected (str, str)", what));
    }
    let ok = fs::copy(unsafe { src.str_ref() }, unsafe { dst.str_ref() }).is_ok();
    Value::bool_val(ok)
}

/// shutil.copyfile(src, dst) -> bool.
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_shutil_copyfile(src: Value, dst: Value) -> Value {
    copy_impl(src, dst, "copyfile")
}

/// shutil.copy(src, dst) -> bool. Same as copyfile in this subset (no
/// directory-destination form is observed).
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_shutil_copy(src: Value, dst: Value) -> Value {
    copy_impl(src, dst, "copy")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn copy_round_trip_and_missing_source() {
        unsafe {
            let dir = tempfile::tempdir().unwrap();
            let src_path = dir.path().join("src.txt");
            fs::write(&src_path, "Hello Shutil!").unwrap();

            let src = Value::str(src_path.to_string_lossy().into_owned());
            let dst = Value::str(dir.path().join("dst.txt").to_string_lossy().into_owned());
            let ok = pycc_shutil_copyfile(src, dst);
            assert_eq!(ok.a, 1);
            assert_eq!(fs::read_to_string(dir.path().join("dst.txt")).unwrap(), "Hello Shutil!");

            let missing = Value::str(dir.path().join("missing.txt").to_string_lossy().into_owned());
            let nowhere = Value::str(dir.path().join("nowhere.txt").to_string_lossy().into_owned());
            let bad = pycc_shutil_copy(missing, nowhere);
            assert_eq!(bad.a, 0);

            for v in [src, dst, missing, nowhere] {
                pycc_rt_release(v);
            }
        }
    }
}
