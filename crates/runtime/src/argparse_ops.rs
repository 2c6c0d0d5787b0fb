//! argparse shims
//!
//! A deliberately flat surface: `ArgumentParser()` yields a handle,
//! `add_argument(parser, '--flag', action)` declares options, and
//! `parse_args(parser, argv)` returns a plain dict keyed by the flag name
//! minus leading dashes. Supported actions: `store` (string value),
//! `store_int` (parsed int value), `store_true` (presence flag).

use crate::error::raise;
use crate::value::{
    HandleData, Key, Value, HANDLE_ARGPARSER, TAG_HANDLE, TAG_LIST, TAG_STR,
};
use indexmap::IndexMap;
use std::cell::RefCell;

fn strip_dashes(flag: &str) -> &str {
    flag.trim_start_matches('-')
}

/// argparse.ArgumentParser() -> parser handle.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_argparse_argumentparser() -> Value {
    Value::handle(HANDLE_ARGPARSER, HandleData::ArgParser { specs: RefCell::new(Vec::new()) })
}

/// argparse.add_argument(parser, flag, action) -> None.
///
/// # Safety
/// `parser` must be a live parser handle; `flag` and `action` live Strs.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_argparse_add_argument(parser: Value, flag: Value, action: Value) -> Value {
    if parser.tag != TAG_HANDLE || flag.tag != TAG_STR || action.tag != TAG_STR {
        return raise("add_argument: expected (parser, str, str)");
    }
    let HandleData::ArgParser { specs } = &unsafe { parser.handle_obj() }.data else {
        return raise("add_argument: not a parser handle");
    };
    let action_name = unsafe { action.str_ref() };
    match action_name {
        "store" | "store_true" | "store_int" => {}
        other => return raise(format!("add_argument: unknown action '{}'", other)),
    }
    specs
        .borrow_mut()
        .push((unsafe { flag.str_ref() }.to_string(), action_name.to_string()));
    Value::none()
}

/// argparse.parse_args(parser, argv) -> dict. Declared flags default to
/// False (`store_true`), 0 (`store_int`) or '' (`store`); unknown argv
/// entries raise.
///
/// # Safety
/// `parser` must be a live parser handle; `argv` a live List of Strs.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_argparse_parse_args(parser: Value, argv: Value) -> Value {
    if parser.tag != TAG_HANDLE || argv.tag != TAG_LIST {
        return raise("parse_args: expected (parser, list)");
    }
    let HandleData::ArgParser { specs } = &unsafe { parser.handle_obj() }.data else {
        return raise("parse_args: not a parser handle");
    };
    let specs = specs.borrow();

    let mut out: IndexMap<Key, Value> = IndexMap::new();
    for (flag, action) in specs.iter() {
        let default = match action.as_str() {
            "store_true" => Value::bool_val(false),
            "store_int" => Value::int(0),
            _ => Value::str(String::new()),
        };
        out.insert(Key::Str(strip_dashes(flag).to_string()), default);
    }

    let args = unsafe { argv.list_obj() }.items.borrow();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i];
        if arg.tag != TAG_STR {
            return raise("parse_args: argv entries must be str");
        }
        let text = unsafe { arg.str_ref() };
        let Some((flag, action)) = specs.iter().find(|(f, _)| f == text) else {
            return raise(format!("parse_args: unrecognized argument '{}'", text));
        };
        let key = Key::Str(strip_dashes(flag).to_string());
        match action.as_str() {
            "store_true" => {
                out.insert(key, Value::bool_val(true));
            }
            "store_int" => {
                i += 1;
                let Some(v) = args.get(i) else {
                    return raise(format!("parse_args: '{}' expects a value", text));
                };
                if v.tag != TAG_STR {
                    return raise("parse_args: argv entries must be str");
                }
                match unsafe { v.str_ref() }.parse::<i64>() {
                    Ok(n) => {
                        out.insert(key, Value::int(n));
                    }
                    Err(_) => {
                        return raise(format!(
                            "parse_args: invalid int value for '{}': '{}'",
                            text,
                            unsafe { v.str_ref() }
                        ))
                    }
                }
            }
            _ => {
                i += 1;
                let Some(v) = args.get(i) else {
                    return raise(format!("parse_args: '{}' expects a value", text));
                };
                if v.tag != TAG_STR {
                    return raise("parse_args: argv entries must be str");
                }
                out.insert(key, Value::str(unsafe { v.str_ref() }.to_string()));
            }
        }
        i += 1;
    }
    Value::dict(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lists::pycc_rt_index;
    use crate::value::pycc_rt_release;

    fn s(text: &str) -> Value {
        Value::str(text.to_string())
    }

    #[test]
    fn parse_mixed_actions() {
        unsafe {
            let p = pycc_argparse_argumentparser();
            for (flag, action) in [("--verbose", "store_true"), ("--count", "store_int"), ("--name", "store")] {
                let (f, a) = (s(flag), s(action));
                pycc_argparse_add_argument(p, f, a);
                pycc_rt_release(f);
                pycc_rt_release(a);
            }
            let argv = Value::list(vec![s("--verbose"), s("--count"), s("3"), s("--name"), s("bob")]);
            let d = pycc_argparse_parse_args(p, argv);

            let kv = s("verbose");
            let kc = s("count");
            let kn = s("name");
            assert_eq!(pycc_rt_index(d, kv).a, 1);
            assert_eq!(pycc_rt_index(d, kc).a, 3);
            let name = pycc_rt_index(d, kn);
            assert_eq!(name.str_ref(), "bob");
            for v in [name, kv, kc, kn, d, argv, p] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn absent_flags_get_defaults() {
        unsafe {
            let p = pycc_argparse_argumentparser();
            let f = s("--verbose");
            let a = s("store_true");
            pycc_argparse_add_argument(p, f, a);
            let argv = Value::list(vec![]);
            let d = pycc_argparse_parse_args(p, argv);
            let k = s("verbose");
            assert_eq!(pycc_rt_index(d, k).a, 0);
            for v in [k, d, argv, f, a, p] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn unknown_argument_raises() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let p = pycc_argparse_argumentparser();
            let argv = Value::list(vec![s("--mystery")]);
            let r = pycc_argparse_parse_args(p, argv);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(p);
            pycc_rt_release(argv);
        }
    }
}
