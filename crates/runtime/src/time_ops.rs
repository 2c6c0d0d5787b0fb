//! time shims
//!
//! Wall-clock and monotonic readings plus `sleep`, the only blocking
//! operation in generated programs.

use crate::error::raise;
use crate::value::{Value, TAG_FLOAT, TAG_INT};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

thread_local! {
    static CLOCK_BASE: Instant = Instant::now();
}

/// time.time() -> float seconds since the Unix epoch.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_time_time() -> Value {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Value::float(secs)
}

/// time.time_ns() -> int nanoseconds since the Unix epoch.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_time_time_ns() -> Value {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos().min(i64::MAX as u128) as i64)
        .unwrap_or(0);
    Value::int(nanos)
}

/// time.monotonic() -> float seconds from an arbitrary fixed origin.
/// Successive readings never decrease.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_time_monotonic() -> Value {
    Value::float(CLOCK_BASE.with(|base| base.elapsed().as_secs_f64()))
}

/// time.perf_counter() -> float; same clock as monotonic at this
/// resolution.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_time_perf_counter() -> Value {
    Value::float(CLOCK_BASE.with(|base| base.elapsed().as_secs_f64()))
}

/// time.sleep(seconds) -> None. Blocks the process.
///
/// # Safety
/// `secs` must be a live Int or Float value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_time_sleep(secs: Value) -> Value {
    let s = match secs.tag {
        TAG_INT => secs.a as f64,
        TAG_FLOAT => secs.as_f64(),
        _ => return raise("sleep: expected number"),
    };
    if s < 0.0 {
        return raise("sleep: negative duration");
    }
    std::thread::sleep(Duration::from_secs_f64(s));
    Value::none()
}
