//! textwrap shims

use crate::error::raise;
use crate::value::{Value, TAG_INT, TAG_STR};

/// Greedy word wrap. Words longer than the width get a line of their own.
pub fn fill(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.len() + 1 + word.len() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

/// textwrap.fill(s, width) -> str. No line carries leading or trailing
/// spaces.
///
/// # Safety
/// `s` must be a live Str value; `width` a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_textwrap_fill(s: Value, width: Value) -> Value {
    if s.tag != TAG_STR || width.tag != TAG_INT {
        return raise("fill: expected (str, int)");
    }
    if width.a < 1 {
        return raise("fill: width must be >= 1");
    }
    Value::str(fill(unsafe { s.str_ref() }, width.a as usize))
}

/// textwrap.wrap(s, width) -> list of lines.
///
/// # Safety
/// `s` must be a live Str value; `width` a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_textwrap_wrap(s: Value, width: Value) -> Value {
    if s.tag != TAG_STR || width.tag != TAG_INT {
        return raise("wrap: expected (str, int)");
    }
    if width.a < 1 {
        return raise("wrap: width must be >= 1");
    }
    let filled = fill(unsafe { s.str_ref() }, width.a as usize);
    if filled.is_empty() {
        return Value::list(vec![]);
    }
    Value::list(filled.lines().map(|l| Value::str(l.to_string())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn wraps_greedily_without_edge_spaces() {
        let out = fill("This is a test of wrap", 6);
        for line in out.lines() {
            assert!(!line.starts_with(' '));
            assert!(!line.ends_with(' '));
            assert!(line.len() <= 6 || !line.contains(' '));
        }
        assert_eq!(out, "This\nis a\ntest\nof\nwrap");
    }

    #[test]
    fn long_word_gets_own_line() {
        assert_eq!(fill("hi extraordinary yes", 5), "hi\nextraordinary\nyes");
    }

    #[test]
    fn shim_round_trip() {
        unsafe {
            let s = Value::str("a b c".into());
            let out = pycc_textwrap_fill(s, Value::int(3));
            assert_eq!(out.str_ref(), "a b\nc");
            pycc_rt_release(out);
            pycc_rt_release(s);
        }
    }
}
