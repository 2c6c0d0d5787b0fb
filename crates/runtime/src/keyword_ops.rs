//! keyword shims

use crate::error::raise;
use crate::value::{Value, TAG_STR};

/// The source dialect's reserved words.
pub const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// keyword.iskeyword(s) -> bool.
///
/// # Safety
/// `s` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_keyword_iskeyword(s: Value) -> Value {
    if s.tag != TAG_STR {
        return raise("iskeyword: expected str");
    }
    Value::bool_val(KEYWORDS.contains(&unsafe { s.str_ref() }))
}

/// keyword.kwlist() -> list of keywords, alphabetical.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_keyword_kwlist() -> Value {
    Value::list(KEYWORDS.iter().map(|k| Value::str((*k).to_string())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn known_keywords() {
        unsafe {
            let yes = Value::str("for".into());
            let no = Value::str("spam".into());
            assert_eq!(pycc_keyword_iskeyword(yes).a, 1);
            assert_eq!(pycc_keyword_iskeyword(no).a, 0);
            pycc_rt_release(yes);
            pycc_rt_release(no);
        }
    }

    #[test]
    fn kwlist_is_sorted() {
        let mut sorted = KEYWORDS.to_vec();
        sorted.sort();
        assert_eq!(sorted, KEYWORDS);
    }
}
