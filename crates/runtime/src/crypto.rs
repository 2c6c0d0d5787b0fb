//! Digest and token shims: hashlib, hmac, secrets, uuid
//!
//! Digest functions accept text or bytes and return lowercase hex strings;
//! `hmac.digest` returns raw bytes. Token generators draw from the OS RNG.

use crate::error::raise;
use crate::value::{Value, TAG_BYTES, TAG_INT, TAG_STR};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use md5::Md5;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

fn input_bytes<'a>(v: Value) -> Option<&'a [u8]> {
    unsafe {
        match v.tag {
            TAG_STR => Some(v.str_ref().as_bytes()),
            TAG_BYTES => Some(v.bytes_ref()),
            _ => None,
        }
    }
}

/// hashlib.sha256(x) -> str — 64 lowercase hex characters.
///
/// # Safety
/// `v` must be a live Str or Bytes value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_hashlib_sha256(v: Value) -> Value {
    let Some(data) = input_bytes(v) else {
        return raise("sha256: expected str or bytes");
    };
    let mut hasher = Sha256::new();
    hasher.update(data);
    Value::str(hex::encode(hasher.finalize()))
}

/// hashlib.md5(x) -> str — 32 lowercase hex characters.
///
/// # Safety
/// `v` must be a live Str or Bytes value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_hashlib_md5(v: Value) -> Value {
    let Some(data) = input_bytes(v) else {
        return raise("md5: expected str or bytes");
    };
    let mut hasher = Md5::new();
    hasher.update(data);
    Value::str(hex::encode(hasher.finalize()))
}

/// hmac.digest(key, msg, 'sha256') -> bytes of length 32.
///
/// # Safety
/// `key` and `msg` must be live Str or Bytes values; `alg` a live Str.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_hmac_digest(key: Value, msg: Value, alg: Value) -> Value {
    let (Some(key), Some(msg)) = (input_bytes(key), input_bytes(msg)) else {
        return raise("hmac.digest: expected str or bytes key and message");
    };
    if alg.tag != TAG_STR || unsafe { alg.str_ref() } != "sha256" {
        return raise("hmac.digest: only 'sha256' is supported");
    }
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(msg);
    Value::bytes(mac.finalize().into_bytes().to_vec())
}

fn os_random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// secrets.token_bytes(n) -> bytes.
///
/// # Safety
/// `n` must be a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_secrets_token_bytes(n: Value) -> Value {
    if n.tag != TAG_INT || n.a < 0 {
        return raise("token_bytes: expected non-negative int");
    }
    Value::bytes(os_random_bytes(n.a as usize))
}

/// secrets.token_hex(n) -> str of 2n hex characters.
///
/// # Safety
/// `n` must be a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_secrets_token_hex(n: Value) -> Value {
    if n.tag != TAG_INT || n.a < 0 {
        return raise("token_hex: expected non-negative int");
    }
    Value::str(hex::encode(os_random_bytes(n.a as usize)))
}

/// secrets.token_urlsafe(n) -> base64url string without padding.
///
/// # Safety
/// `n` must be a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_secrets_token_urlsafe(n: Value) -> Value {
    if n.tag != TAG_INT || n.a < 0 {
        return raise("token_urlsafe: expected non-negative int");
    }
    Value::str(URL_SAFE_NO_PAD.encode(os_random_bytes(n.a as usize)))
}

/// uuid.uuid4() -> str in canonical 8-4-4-4-12 form.
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_uuid_uuid4() -> Value {
    Value::str(Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn sha256_known_vector() {
        unsafe {
            let v = Value::str("hello".into());
            let h = pycc_hashlib_sha256(v);
            assert_eq!(
                h.str_ref(),
                "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
            );
            pycc_rt_release(h);
            pycc_rt_release(v);
        }
    }

    #[test]
    fn md5_known_vector() {
        unsafe {
            let v = Value::bytes(b"hello".to_vec());
            let h = pycc_hashlib_md5(v);
            assert_eq!(h.str_ref(), "5d41402abc4b2a76b9719d911017c592");
            assert_eq!(h.str_ref().len(), 32);
            pycc_rt_release(h);
            pycc_rt_release(v);
        }
    }

    #[test]
    fn hmac_digest_length() {
        unsafe {
            let key = Value::str("key".into());
            let msg = Value::str("msg".into());
            let alg = Value::str("sha256".into());
            let d = pycc_hmac_digest(key, msg, alg);
            assert_eq!(d.bytes_ref().len(), 32);
            for v in [d, key, msg, alg] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn token_shapes() {
        unsafe {
            let b = pycc_secrets_token_bytes(Value::int(16));
            assert_eq!(b.bytes_ref().len(), 16);
            pycc_rt_release(b);

            let h = pycc_secrets_token_hex(Value::int(8));
            assert_eq!(h.str_ref().len(), 16);
            assert!(h.str_ref().chars().all(|c| c.is_ascii_hexdigit()));
            pycc_rt_release(h);

            let u = pycc_secrets_token_urlsafe(Value::int(8));
            assert!(!u.str_ref().is_empty());
            assert!(!u.str_ref().contains('='));
            assert!(u
                .str_ref()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            pycc_rt_release(u);
        }
    }

    #[test]
    fn uuid4_shape() {
        unsafe {
            let u = pycc_uuid_uuid4();
            let s = u.str_ref();
            assert_eq!(s.len(), 36);
            let parts: Vec<&str> = s.split('-').collect();
            assert_eq!(
                parts.iter().map(|p| p.len()).collect::<Vec<_>>(),
                vec![8, 4, 4, 4, 12]
            );
            assert!(parts[2].starts_with('4'));
            assert!(matches!(parts[3].chars().next(), Some('8' | '9' | 'a' | 'b')));
            pycc_rt_release(u);
        }
    }
}
