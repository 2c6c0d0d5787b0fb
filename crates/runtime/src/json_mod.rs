//! json shims
//!
//! `dumps` emits compact RFC 8259 text; `loads` produces a dynamically
//! tagged value tree (surfaced to the type checker as Any). Object key
//! order is preserved in both directions.

use crate::error::raise;
use crate::value::{
    Key, Value, TAG_BOOL, TAG_DICT, TAG_FLOAT, TAG_INT, TAG_LIST, TAG_NONE, TAG_STR, TAG_TUPLE,
};
use indexmap::IndexMap;

fn to_json(v: Value) -> Result<serde_json::Value, String> {
    unsafe {
        match v.tag {
            TAG_NONE => Ok(serde_json::Value::Null),
            TAG_INT => Ok(serde_json::Value::from(v.a)),
            TAG_FLOAT => serde_json::Number::from_f64(v.as_f64())
                .map(serde_json::Value::Number)
                .ok_or_else(|| "dumps: float value out of range".to_string()),
            TAG_BOOL => Ok(serde_json::Value::Bool(v.a != 0)),
            TAG_STR => Ok(serde_json::Value::String(v.str_ref().to_string())),
            TAG_LIST | TAG_TUPLE => {
                let items = v.list_obj().items.borrow();
                let mut arr = Vec::with_capacity(items.len());
                for x in items.iter() {
                    arr.push(to_json(*x)?);
                }
                Ok(serde_json::Value::Array(arr))
            }
            TAG_DICT => {
                let mut obj = serde_json::Map::new();
                for (k, x) in v.dict_obj().map.borrow().iter() {
                    let name = match k {
                        Key::Str(s) => s.clone(),
                        Key::Int(n) => n.to_string(),
                        Key::Bool(b) => if *b { "true" } else { "false" }.to_string(),
                    };
                    obj.insert(name, to_json(*x)?);
                }
                Ok(serde_json::Value::Object(obj))
            }
            _ => Err("dumps: value is not JSON serializable".to_string()),
        }
    }
}

fn from_json(j: &serde_json::Value) -> Value {
    match j {
        serde_json::Value::Null => Value::none(),
        serde_json::Value::Bool(b) => Value::bool_val(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::int(i)
            } else {
                Value::float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::str(s.clone()),
        serde_json::Value::Array(items) => Value::list(items.iter().map(from_json).collect()),
        serde_json::Value::Object(obj) => {
            let mut map = IndexMap::new();
            for (k, x) in obj {
                map.insert(Key::Str(k.clone()), from_json(x));
            }
            Value::dict(map)
        }
    }
}

/// json.dumps(x) -> str.
///
/// # Safety
/// `v` must be a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_json_dumps(v: Value) -> Value {
    match to_json(v) {
        Ok(j) => Value::str(serde_json::to_string(&j).unwrap_or_default()),
        Err(msg) => raise(msg),
    }
}

/// json.loads(s) -> Any.
///
/// # Safety
/// `s` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_json_loads(s: Value) -> Value {
    if s.tag != TAG_STR {
        return raise("loads: expected str");
    }
    match serde_json::from_str::<serde_json::Value>(unsafe { s.str_ref() }) {
        Ok(j) => from_json(&j),
        Err(e) => raise(format!("loads: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{eq_values, pycc_rt_release};

    #[test]
    fn round_trip_preserves_structure() {
        unsafe {
            let d = crate::dicts::pycc_rt_dict_new();
            let ka = Value::str("a".into());
            let kb = Value::str("b".into());
            let lb = Value::list(vec![Value::int(2), Value::int(3)]);
            crate::dicts::pycc_rt_dict_set(d, ka, Value::int(1));
            crate::dicts::pycc_rt_dict_set(d, kb, lb);

            let text = pycc_json_dumps(d);
            let back = pycc_json_loads(text);
            assert!(eq_values(d, back));

            let text2 = pycc_json_dumps(back);
            assert_eq!(text.str_ref(), text2.str_ref());

            for v in [text, text2, back, ka, kb, lb, d] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn dumps_is_compact() {
        unsafe {
            let l = Value::list(vec![Value::int(1), Value::none(), Value::bool_val(true)]);
            let s = pycc_json_dumps(l);
            assert_eq!(s.str_ref(), "[1,null,true]");
            pycc_rt_release(s);
            pycc_rt_release(l);
        }
    }

    #[test]
    fn loads_bad_input_raises() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let s = Value::str("{broken".into());
            let r = pycc_json_loads(s);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(s);
        }
    }
}
