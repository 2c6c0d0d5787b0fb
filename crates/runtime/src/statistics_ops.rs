//! statistics shims
//!
//! All functions accept a list of numbers and return a float (except
//! `median` on odd-length int input, which the dialect still surfaces as a
//! float when averaging is involved — the observed programs compare
//! against float literals).

use crate::error::raise;
use crate::value::{Value, TAG_LIST, TAG_TUPLE};

fn numbers(data: Value, what: &str) -> Result<Vec<f64>, Value> {
    if data.tag != TAG_LIST && data.tag != TAG_TUPLE {
        return Err(raise(format!("{}: expected list", what)));
    }
    let items = unsafe { data.list_obj() }.items.borrow();
    let mut out = Vec::with_capacity(items.len());
    for v in items.iter() {
        match v.as_number() {
            Some(n) => out.push(n),
            None => return Err(raise(format!("{}: non-numeric data", what))),
        }
    }
    Ok(out)
}

fn mean_of(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn sum_sq_dev(xs: &[f64]) -> f64 {
    let m = mean_of(xs);
    xs.iter().map(|x| (x - m) * (x - m)).sum()
}

/// statistics.mean(data) -> float.
///
/// # Safety
/// `data` must be a live List of numbers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_statistics_mean(data: Value) -> Value {
    let xs = match numbers(data, "mean") {
        Ok(xs) => xs,
        Err(e) => return e,
    };
    if xs.is_empty() {
        return raise("mean: empty data");
    }
    Value::float(mean_of(&xs))
}

/// statistics.median(data) -> float. Averages the middle pair for even
/// lengths.
///
/// # Safety
/// `data` must be a live List of numbers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_statistics_median(data: Value) -> Value {
    let mut xs = match numbers(data, "median") {
        Ok(xs) => xs,
        Err(e) => return e,
    };
    if xs.is_empty() {
        return raise("median: empty data");
    }
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = xs.len();
    let m = if n % 2 == 1 { xs[n / 2] } else { (xs[n / 2 - 1] + xs[n / 2]) / 2.0 };
    Value::float(m)
}

/// statistics.variance(data) -> sample variance (n - 1 divisor).
///
/// # Safety
/// `data` must be a live List of at least two numbers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_statistics_variance(data: Value) -> Value {
    let xs = match numbers(data, "variance") {
        Ok(xs) => xs,
        Err(e) => return e,
    };
    if xs.len() < 2 {
        return raise("variance: at least two data points required");
    }
    Value::float(sum_sq_dev(&xs) / (xs.len() - 1) as f64)
}

/// statistics.pvariance(data) -> population variance (n divisor).
///
/// # Safety
/// `data` must be a live non-empty List of numbers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_statistics_pvariance(data: Value) -> Value {
    let xs = match numbers(data, "pvariance") {
        Ok(xs) => xs,
        Err(e) => return e,
    };
    if xs.is_empty() {
        return raise("pvariance: empty data");
    }
    Value::float(sum_sq_dev(&xs) / xs.len() as f64)
}

/// statistics.stdev(data) -> sample standard deviation.
///
/// # Safety
/// `data` must be a live List of at least two numbers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_statistics_stdev(data: Value) -> Value {
    let v = unsafe { pycc_statistics_variance(data) };
    if v.is_none() {
        return v;
    }
    Value::float(v.as_f64().sqrt())
}

/// statistics.pstdev(data) -> population standard deviation.
///
/// # Safety
/// `data` must be a live non-empty List of numbers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_statistics_pstdev(data: Value) -> Value {
    let v = unsafe { pycc_statistics_pvariance(data) };
    if v.is_none() {
        return v;
    }
    Value::float(v.as_f64().sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    fn int_list(xs: &[i64]) -> Value {
        Value::list(xs.iter().map(|n| Value::int(*n)).collect())
    }

    #[test]
    fn known_values() {
        unsafe {
            let d = int_list(&[1, 2, 3]);
            assert_eq!(pycc_statistics_mean(d).as_f64(), 2.0);
            assert_eq!(pycc_statistics_stdev(d).as_f64(), 1.0);
            let pv = pycc_statistics_pvariance(d).as_f64();
            assert!((pv - 2.0 / 3.0).abs() < 1e-9);
            pycc_rt_release(d);

            let even = int_list(&[1, 2, 3, 4]);
            assert_eq!(pycc_statistics_median(even).as_f64(), 2.5);
            pycc_rt_release(even);

            let odd = int_list(&[3, 1, 2]);
            assert_eq!(pycc_statistics_median(odd).as_f64(), 2.0);
            pycc_rt_release(odd);
        }
    }

    #[test]
    fn variance_needs_two_points() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let d = int_list(&[1]);
            let r = pycc_statistics_variance(d);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(d);
        }
    }
}
