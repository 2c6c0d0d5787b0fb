//! html shims

use crate::error::raise;
use crate::value::{truthy, Value, TAG_STR};

/// html.escape(s, quote) -> str. `& < >` are always escaped; both quote
/// characters are escaped when the flag is truthy (the flag defaults to
/// false at the call site when omitted).
///
/// # Safety
/// `s` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_html_escape(s: Value, quote: Value) -> Value {
    if s.tag != TAG_STR {
        return raise("escape: expected str");
    }
    let quote = truthy(quote);
    let mut out = String::new();
    for c in unsafe { s.str_ref() }.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quote => out.push_str("&quot;"),
            '\'' if quote => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    Value::str(out)
}

/// html.unescape(s) -> str for the five entities `escape` can produce.
///
/// # Safety
/// `s` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_html_unescape(s: Value) -> Value {
    if s.tag != TAG_STR {
        return raise("unescape: expected str");
    }
    let out = unsafe { s.str_ref() }
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&");
    Value::str(out)
}
