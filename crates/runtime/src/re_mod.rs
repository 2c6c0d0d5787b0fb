//! re shims
//!
//! A POSIX-ERE-flavored subset backed by the `regex` crate: anchors,
//! character classes, alternation and the `* + ? {n,m}` quantifiers —
//! enough for the patterns the source programs use. `search` and `match`
//! return an opaque match handle, or None on no match (callers compare
//! against None).

use crate::error::raise;
use crate::value::{HandleData, Value, HANDLE_MATCH, TAG_STR};
use regex::Regex;

fn compile(pattern: &str) -> Result<Regex, Value> {
    Regex::new(pattern).map_err(|e| raise(format!("re: invalid pattern: {}", e)))
}

fn match_handle(text: &str, start: usize, end: usize) -> Value {
    Value::handle(
        HANDLE_MATCH,
        HandleData::Match {
            text: text[start..end].to_string(),
            start: start as i64,
            end: end as i64,
        },
    )
}

/// re.search(pattern, s) -> match | None. Scans the whole string.
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_re_search(pattern: Value, s: Value) -> Value {
    if pattern.tag != TAG_STR || s.tag != TAG_STR {
        return raise("search: expected (str, str)");
    }
    let re = match compile(unsafe { pattern.str_ref() }) {
        Ok(re) => re,
        Err(v) => return v,
    };
    let text = unsafe { s.str_ref() };
    match re.find(text) {
        Some(m) => match_handle(text, m.start(), m.end()),
        None => Value::none(),
    }
}

/// re.match(pattern, s) -> match | None. Anchored at the start.
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_re_match(pattern: Value, s: Value) -> Value {
    if pattern.tag != TAG_STR || s.tag != TAG_STR {
        return raise("match: expected (str, str)");
    }
    let re = match compile(unsafe { pattern.str_ref() }) {
        Ok(re) => re,
        Err(v) => return v,
    };
    let text = unsafe { s.str_ref() };
    match re.find(text) {
        Some(m) if m.start() == 0 => match_handle(text, m.start(), m.end()),
        _ => Value::none(),
    }
}

/// re.sub(pattern, repl, s) -> str with every match replaced.
///
/// # Safety
/// All arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_re_sub(pattern: Value, repl: Value, s: Value) -> Value {
    if pattern.tag != TAG_STR || repl.tag != TAG_STR || s.tag != TAG_STR {
        return raise("sub: expected (str, str, str)");
    }
    let re = match compile(unsafe { pattern.str_ref() }) {
        Ok(re) => re,
        Err(v) => return v,
    };
    let replaced = re.replace_all(unsafe { s.str_ref() }, regex::NoExpand(unsafe { repl.str_ref() }));
    Value::str(replaced.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn search_hit_and_miss() {
        unsafe {
            let pat = Value::str("world".into());
            let hay = Value::str("hello world".into());
            let m = pycc_re_search(pat, hay);
            assert!(!m.is_none());
            pycc_rt_release(m);

            let miss = Value::str("xyz".into());
            let m = pycc_re_search(miss, hay);
            assert!(m.is_none());
            for v in [pat, hay, miss] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn match_is_anchored() {
        unsafe {
            let pat = Value::str("world".into());
            let hay = Value::str("hello world".into());
            let m = pycc_re_match(pat, hay);
            assert!(m.is_none());
            pycc_rt_release(pat);
            pycc_rt_release(hay);
        }
    }

    #[test]
    fn sub_replaces_all_runs() {
        unsafe {
            let pat = Value::str("a+".into());
            let repl = Value::str("b".into());
            let hay = Value::str("caa".into());
            let out = pycc_re_sub(pat, repl, hay);
            assert_eq!(out.str_ref(), "cb");
            for v in [pat, repl, hay, out] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn class_quantifier_anchors() {
        unsafe {
            let pat = Value::str("^[A-Za-z0-9_-]+$".into());
            let ok = Value::str("ab_C-9".into());
            let bad = Value::str("no spaces".into());
            let m = pycc_re_search(pat, ok);
            assert!(!m.is_none());
            pycc_rt_release(m);
            let m = pycc_re_search(pat, bad);
            assert!(m.is_none());
            for v in [pat, ok, bad] {
                pycc_rt_release(v);
            }
        }
    }
}
