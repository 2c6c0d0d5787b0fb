//! errno shims — accessor functions for the canonical error codes.

use crate::value::Value;

macro_rules! errno_accessor {
    ($(#[$doc:meta])* $name:ident, $code:expr) => {
        $(#[$doc])*
        /// # Safety
        /// Always safe to call.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name() -> Value {
            Value::int($code as i64)
        }
    };
}

errno_accessor!(
    /// errno.EPERM() -> int.
    pycc_errno_eperm,
    libc::EPERM
);
errno_accessor!(
    /// errno.ENOENT() -> int.
    pycc_errno_enoent,
    libc::ENOENT
);
errno_accessor!(
    /// errno.EEXIST() -> int.
    pycc_errno_eexist,
    libc::EEXIST
);
errno_accessor!(
    /// errno.EISDIR() -> int.
    pycc_errno_eisdir,
    libc::EISDIR
);
errno_accessor!(
    /// errno.ENOTDIR() -> int.
    pycc_errno_enotdir,
    libc::ENOTDIR
);
errno_accessor!(
    /// errno.EACCES() -> int.
    pycc_errno_eacces,
    libc::EACCES
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_positive_and_distinct() {
        unsafe {
            let codes = [
                pycc_errno_eperm().a,
                pycc_errno_enoent().a,
                pycc_errno_eexist().a,
                pycc_errno_eisdir().a,
                pycc_errno_enotdir().a,
                pycc_errno_eacces().a,
            ];
            for c in codes {
                assert!(c > 0);
            }
            let mut sorted = codes.to_vec();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), codes.len());
        }
    }
}
