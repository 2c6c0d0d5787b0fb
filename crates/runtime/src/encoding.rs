//! Encoding shims: base64, binascii
//!
//! All four operations accept text or bytes and return bytes, matching the
//! source dialect. Invalid input raises through the error channel.

use crate::error::raise;
use crate::value::{Value, TAG_BYTES, TAG_STR};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

fn input_bytes<'a>(v: Value) -> Option<&'a [u8]> {
    unsafe {
        match v.tag {
            TAG_STR => Some(v.str_ref().as_bytes()),
            TAG_BYTES => Some(v.bytes_ref()),
            _ => None,
        }
    }
}

/// base64.b64encode(x) -> bytes.
///
/// # Safety
/// `v` must be a live Str or Bytes value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_base64_b64encode(v: Value) -> Value {
    let Some(data) = input_bytes(v) else {
        return raise("b64encode: expected str or bytes");
    };
    Value::bytes(STANDARD.encode(data).into_bytes())
}

/// base64.b64decode(x) -> bytes.
///
/// # Safety
/// `v` must be a live Str or Bytes value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_base64_b64decode(v: Value) -> Value {
    let Some(data) = input_bytes(v) else {
        return raise("b64decode: expected str or bytes");
    };
    match STANDARD.decode(data) {
        Ok(bytes) => Value::bytes(bytes),
        Err(_) => raise("b64decode: invalid base64 input"),
    }
}

/// binascii.hexlify(x) -> bytes of lowercase hex digits.
///
/// # Safety
/// `v` must be a live Str or Bytes value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_binascii_hexlify(v: Value) -> Value {
    let Some(data) = input_bytes(v) else {
        return raise("hexlify: expected str or bytes");
    };
    Value::bytes(hex::encode(data).into_bytes())
}

/// binascii.unhexlify(x) -> bytes.
///
/// # Safety
/// `v` must be a live Str or Bytes value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_binascii_unhexlify(v: Value) -> Value {
    let Some(data) = input_bytes(v) else {
        return raise("unhexlify: expected str or bytes");
    };
    match hex::decode(data) {
        Ok(bytes) => Value::bytes(bytes),
        Err(_) => raise("unhexlify: non-hexadecimal digit found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn base64_round_trip() {
        unsafe {
            let v = Value::bytes(b"Hello, World!".to_vec());
            let enc = pycc_base64_b64encode(v);
            assert_eq!(enc.bytes_ref(), b"SGVsbG8sIFdvcmxkIQ==");
            let dec = pycc_base64_b64decode(enc);
            assert_eq!(dec.bytes_ref(), b"Hello, World!");
            for x in [v, enc, dec] {
                pycc_rt_release(x);
            }
        }
    }

    #[test]
    fn hexlify_round_trip() {
        unsafe {
            let v = Value::bytes(b"Hi".to_vec());
            let h = pycc_binascii_hexlify(v);
            assert_eq!(h.bytes_ref(), b"4869");
            let back = pycc_binascii_unhexlify(h);
            assert_eq!(back.bytes_ref(), b"Hi");
            for x in [v, h, back] {
                pycc_rt_release(x);
            }
        }
    }

    #[test]
    fn unhexlify_rejects_bad_digits() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let v = Value::str("zz".into());
            let r = pycc_binascii_unhexlify(v);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(v);
        }
    }
}
