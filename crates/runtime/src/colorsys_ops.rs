//! colorsys shims
//!
//! RGB/HSV conversions over unit-interval floats, returned as 3-element
//! lists.

use crate::error::raise;
use crate::value::{Value, TAG_FLOAT, TAG_INT};

fn float_arg(v: Value) -> Option<f64> {
    match v.tag {
        TAG_FLOAT => Some(v.as_f64()),
        TAG_INT => Some(v.a as f64),
        _ => None,
    }
}

pub fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let maxc = r.max(g).max(b);
    let minc = r.min(g).min(b);
    let v = maxc;
    if maxc == minc {
        return (0.0, 0.0, v);
    }
    let s = (maxc - minc) / maxc;
    let rc = (maxc - r) / (maxc - minc);
    let gc = (maxc - g) / (maxc - minc);
    let bc = (maxc - b) / (maxc - minc);
    let h = if r == maxc {
        bc - gc
    } else if g == maxc {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((h / 6.0).rem_euclid(1.0), s, v)
}

pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let i = (h * 6.0).floor() as i64;
    let f = h * 6.0 - i as f64;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i.rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

fn triple(a: f64, b: f64, c: f64) -> Value {
    Value::list(vec![Value::float(a), Value::float(b), Value::float(c)])
}

/// colorsys.rgb_to_hsv(r, g, b) -> [h, s, v].
///
/// # Safety
/// All arguments must be live number values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_colorsys_rgb_to_hsv(r: Value, g: Value, b: Value) -> Value {
    let (Some(r), Some(g), Some(b)) = (float_arg(r), float_arg(g), float_arg(b)) else {
        return raise("rgb_to_hsv: expected three numbers");
    };
    let (h, s, v) = rgb_to_hsv(r, g, b);
    triple(h, s, v)
}

/// colorsys.hsv_to_rgb(h, s, v) -> [r, g, b].
///
/// # Safety
/// All arguments must be live number values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_colorsys_hsv_to_rgb(h: Value, s: Value, v: Value) -> Value {
    let (Some(h), Some(s), Some(v)) = (float_arg(h), float_arg(s), float_arg(v)) else {
        return raise("hsv_to_rgb: expected three numbers");
    };
    let (r, g, b) = hsv_to_rgb(h, s, v);
    triple(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pprint::pycc_pprint_pformat;
    use crate::value::pycc_rt_release;

    #[test]
    fn red_round_trip() {
        unsafe {
            let hsv = pycc_colorsys_rgb_to_hsv(Value::float(1.0), Value::float(0.0), Value::float(0.0));
            let s = pycc_pprint_pformat(hsv);
            assert_eq!(s.str_ref(), "[0.0, 1.0, 1.0]");
            pycc_rt_release(s);
            pycc_rt_release(hsv);

            let rgb = pycc_colorsys_hsv_to_rgb(Value::float(0.0), Value::float(1.0), Value::float(1.0));
            let s = pycc_pprint_pformat(rgb);
            assert_eq!(s.str_ref(), "[1.0, 0.0, 0.0]");
            pycc_rt_release(s);
            pycc_rt_release(rgb);
        }
    }

    #[test]
    fn gray_has_zero_saturation() {
        let (h, s, v) = rgb_to_hsv(0.5, 0.5, 0.5);
        assert_eq!((h, s, v), (0.0, 0.0, 0.5));
    }
}
