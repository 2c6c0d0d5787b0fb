//! datetime shims
//!
//! The subset represents datetimes as ISO-8601 strings with second
//! resolution (`YYYY-MM-DDTHH:MM:SS`). Local-time results depend on the
//! host timezone; only the UTC variants have bit-exact expected values.

use crate::error::raise;
use crate::value::{Value, TAG_FLOAT, TAG_INT};
use chrono::{DateTime, Local, TimeZone, Utc};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn timestamp_arg(t: Value) -> Option<i64> {
    match t.tag {
        TAG_INT => Some(t.a),
        TAG_FLOAT => Some(t.as_f64().trunc() as i64),
        _ => None,
    }
}

/// datetime.now() -> local time ISO string.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_datetime_now() -> Value {
    Value::str(Local::now().format(ISO_FORMAT).to_string())
}

/// datetime.utcnow() -> UTC ISO string.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_datetime_utcnow() -> Value {
    Value::str(Utc::now().format(ISO_FORMAT).to_string())
}

/// datetime.fromtimestamp(t) -> local time ISO string.
///
/// # Safety
/// `t` must be a live Int or Float value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_datetime_fromtimestamp(t: Value) -> Value {
    let Some(secs) = timestamp_arg(t) else {
        return raise("fromtimestamp: expected number");
    };
    match Local.timestamp_opt(secs, 0).single() {
        Some(dt) => Value::str(dt.format(ISO_FORMAT).to_string()),
        None => raise("fromtimestamp: timestamp out of range"),
    }
}

/// datetime.utcfromtimestamp(t) -> UTC ISO string.
///
/// # Safety
/// `t` must be a live Int or Float value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_datetime_utcfromtimestamp(t: Value) -> Value {
    let Some(secs) = timestamp_arg(t) else {
        return raise("utcfromtimestamp: expected number");
    };
    match Utc.timestamp_opt(secs, 0).single() {
        Some(dt) => Value::str(dt.format(ISO_FORMAT).to_string()),
        None => raise("utcfromtimestamp: timestamp out of range"),
    }
}

#[allow(dead_code)]
fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, ISO_FORMAT)
        .ok()
        .map(|n| Utc.from_utc_datetime(&n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn epoch_utc_is_exact() {
        unsafe {
            let s = pycc_datetime_utcfromtimestamp(Value::int(0));
            assert_eq!(s.str_ref(), "1970-01-01T00:00:00");
            pycc_rt_release(s);
        }
    }

    #[test]
    fn iso_shape() {
        unsafe {
            for v in [pycc_datetime_now(), pycc_datetime_utcnow(), pycc_datetime_fromtimestamp(Value::int(0))] {
                let s = v.str_ref();
                assert_eq!(s.len(), 19, "unexpected shape: {}", s);
                assert_eq!(s.as_bytes()[4], b'-');
                assert_eq!(s.as_bytes()[10], b'T');
                assert_eq!(s.as_bytes()[13], b':');
                assert!(parse_iso(s).is_some());
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn known_timestamp() {
        unsafe {
            // 2024-02-29T12:00:00 UTC (leap day)
            let s = pycc_datetime_utcfromtimestamp(Value::int(1709208000));
            assert_eq!(s.str_ref(), "2024-02-29T12:00:00");
            pycc_rt_release(s);
        }
    }
}
