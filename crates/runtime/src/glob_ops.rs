//! glob / fnmatch shims
//!
//! Shell-style patterns (`*`, `?`, `[...]`) are translated to anchored
//! regexes. `glob.glob` matches within a single directory component — the
//! observed programs never use `**` or multi-level patterns beyond
//! `dir/*.ext`.

use crate::error::raise;
use crate::value::{Value, TAG_LIST, TAG_STR};
use regex::Regex;

/// Translate a shell pattern into an anchored regex.
pub fn translate(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                let mut class = String::from("[");
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    class.push(inner);
                }
                class.push(']');
                out.push_str(&class);
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

fn matches(name: &str, pattern: &str) -> bool {
    Regex::new(&translate(pattern)).map(|re| re.is_match(name)).unwrap_or(false)
}

/// fnmatch.fnmatch(name, pattern) -> bool (case-sensitive here; the
/// compiler targets POSIX filesystems).
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_fnmatch_fnmatch(name: Value, pattern: Value) -> Value {
    if name.tag != TAG_STR || pattern.tag != TAG_STR {
        return raise("fnmatch: expected (str, str)");
    }
    Value::bool_val(matches(unsafe { name.str_ref() }, unsafe { pattern.str_ref() }))
}

/// fnmatch.fnmatchcase(name, pattern) -> bool.
///
/// # Safety
/// Both arguments must be live Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_fnmatch_fnmatchcase(name: Value, pattern: Value) -> Value {
    unsafe { pycc_fnmatch_fnmatch(name, pattern) }
}

/// fnmatch.filter(names, pattern) -> list of matching names, order kept.
///
/// # Safety
/// `names` must be a live List of Str values; `pattern` a live Str.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_fnmatch_filter(names: Value, pattern: Value) -> Value {
    if names.tag != TAG_LIST || pattern.tag != TAG_STR {
        return raise("filter: expected (list, str)");
    }
    let pat = unsafe { pattern.str_ref() };
    let mut out = Vec::new();
    for v in unsafe { names.list_obj() }.items.borrow().iter() {
        if v.tag == TAG_STR && matches(unsafe { v.str_ref() }, pat) {
            out.push(unsafe { crate::value::pycc_rt_retain(*v) });
        }
    }
    Value::list(out)
}

/// glob.glob(pattern) -> sorted list of matching paths. The pattern's
/// directory part is listed and the final component matched.
///
/// # Safety
/// `pattern` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_glob_glob(pattern: Value) -> Value {
    if pattern.tag != TAG_STR {
        return raise("glob: expected str");
    }
    let pat = unsafe { pattern.str_ref() };
    let (dir, file_pat) = match pat.rfind('/') {
        Some(i) => (&pat[..i], &pat[i + 1..]),
        None => (".", pat),
    };
    let mut out: Vec<String> = Vec::new();
    if let Ok(entries) = std::fs::read_dir(if dir.is_empty() { "/" } else { dir }) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if matches(&name, file_pat) {
                if dir == "." && !pat.starts_with("./") {
                    out.push(name);
                } else {
                    out.push(format!("{}/{}", dir, name));
                }
            }
        }
    }
    out.sort();
    Value::list(out.into_iter().map(Value::str).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    fn s(text: &str) -> Value {
        Value::str(text.to_string())
    }

    #[test]
    fn fnmatch_basics() {
        unsafe {
            let cases = [
                ("file.txt", "file*.txt", true),
                ("a.c", "a.?", true),
                ("a.py", "*.txt", false),
                ("data1", "data[0-9]", true),
            ];
            for (name, pat, want) in cases {
                let (n, p) = (s(name), s(pat));
                assert_eq!(pycc_fnmatch_fnmatch(n, p).a, want as i64, "{} vs {}", name, pat);
                pycc_rt_release(n);
                pycc_rt_release(p);
            }
        }
    }

    #[test]
    fn filter_keeps_order() {
        unsafe {
            let names = Value::list(vec![s("a.py"), s("b.txt"), s("c.py")]);
            let pat = s("*.py");
            let m = pycc_fnmatch_filter(names, pat);
            let items = m.list_obj().items.borrow();
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].str_ref(), "a.py");
            assert_eq!(items[1].str_ref(), "c.py");
            drop(items);
            for v in [m, names, pat] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn glob_in_directory() {
        unsafe {
            let dir = tempfile::tempdir().unwrap();
            for name in ["a.py", "b.txt", "c.py"] {
                std::fs::write(dir.path().join(name), "x").unwrap();
            }
            let pat = s(&format!("{}/*.py", dir.path().to_string_lossy()));
            let m = pycc_glob_glob(pat);
            assert_eq!(m.list_obj().items.borrow().len(), 2);
            pycc_rt_release(m);
            pycc_rt_release(pat);
        }
    }
}
