//! shlex shims
//!
//! POSIX-style splitting and joining. `join` quotes any token containing
//! whitespace or shell metacharacters with single quotes, escaping embedded
//! single quotes as `'"'"'`.

use crate::error::raise;
use crate::value::{Value, TAG_LIST, TAG_STR};

pub fn split(s: &str) -> Result<Vec<String>, String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                has_token = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => return Err("no closing quotation".to_string()),
                    }
                }
            }
            '"' => {
                has_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(e @ ('"' | '\\' | '$' | '`')) => current.push(e),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err("no closing quotation".to_string()),
                        },
                        Some(inner) => current.push(inner),
                        None => return Err("no closing quotation".to_string()),
                    }
                }
            }
            '\\' => match chars.next() {
                Some(e) => {
                    has_token = true;
                    current.push(e);
                }
                None => return Err("trailing backslash".to_string()),
            },
            c if c.is_whitespace() => {
                if has_token {
                    out.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            other => {
                has_token = true;
                current.push(other);
            }
        }
    }
    if has_token {
        out.push(current);
    }
    Ok(out)
}

fn needs_quoting(token: &str) -> bool {
    token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || "'\"\\$`!*?[](){}<>|&;#~".contains(c))
}

pub fn quote(token: &str) -> String {
    if !needs_quoting(token) {
        return token.to_string();
    }
    format!("'{}'", token.replace('\'', "'\"'\"'"))
}

/// shlex.split(s) -> list of tokens.
///
/// # Safety
/// `s` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_shlex_split(s: Value) -> Value {
    if s.tag != TAG_STR {
        return raise("split: expected str");
    }
    match split(unsafe { s.str_ref() }) {
        Ok(tokens) => Value::list(tokens.into_iter().map(Value::str).collect()),
        Err(msg) => raise(format!("split: {}", msg)),
    }
}

/// shlex.join(tokens) -> str that splits back to the same tokens.
///
/// # Safety
/// `tokens` must be a live List of Str values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_shlex_join(tokens: Value) -> Value {
    if tokens.tag != TAG_LIST {
        return raise("join: expected list");
    }
    let items = unsafe { tokens.list_obj() }.items.borrow();
    let mut parts = Vec::with_capacity(items.len());
    for v in items.iter() {
        if v.tag != TAG_STR {
            return raise("join: expected list of str");
        }
        parts.push(quote(unsafe { v.str_ref() }));
    }
    Value::str(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn split_respects_quotes() {
        assert_eq!(split("a 'b c'").unwrap(), vec!["a", "b c"]);
        assert_eq!(split("x \"y z\" w").unwrap(), vec!["x", "y z", "w"]);
        assert_eq!(split("  padded   ").unwrap(), vec!["padded"]);
    }

    #[test]
    fn join_round_trips() {
        unsafe {
            let tokens = Value::list(vec![
                Value::str("a".into()),
                Value::str("b c".into()),
            ]);
            let joined = pycc_shlex_join(tokens);
            assert_eq!(joined.str_ref(), "a 'b c'");
            let back = pycc_shlex_split(joined);
            let items = back.list_obj().items.borrow();
            assert_eq!(items.len(), 2);
            assert_eq!(items[1].str_ref(), "b c");
            drop(items);
            for v in [back, joined, tokens] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(split("'open").is_err());
    }
}
