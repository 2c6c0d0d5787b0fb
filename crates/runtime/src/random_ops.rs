//! random shims
//!
//! A single global generator, reseedable with `random.seed(n)`. Backed by
//! ChaCha rather than the OS RNG so a fixed seed replays the same stream
//! across runs and platforms. Unseeded use starts from OS entropy.

use crate::error::raise;
use crate::value::{Value, TAG_INT};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;

thread_local! {
    static RNG: RefCell<ChaCha8Rng> = RefCell::new(ChaCha8Rng::from_entropy());
}

/// random.seed(n) -> None — reset the stream deterministically.
///
/// # Safety
/// `n` must be a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_random_seed(n: Value) -> Value {
    if n.tag != TAG_INT {
        return raise("seed: expected int");
    }
    RNG.with(|r| *r.borrow_mut() = ChaCha8Rng::seed_from_u64(n.a as u64));
    Value::none()
}

/// random.random() -> float in [0, 1).
///
/// # Safety
/// Always safe to call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_random_random() -> Value {
    Value::float(RNG.with(|r| r.borrow_mut().gen::<f64>()))
}

/// random.randint(a, b) -> int in [a, b], both ends inclusive.
///
/// # Safety
/// `a` and `b` must be live Int values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_random_randint(a: Value, b: Value) -> Value {
    if a.tag != TAG_INT || b.tag != TAG_INT {
        return raise("randint: expected (int, int)");
    }
    if a.a > b.a {
        return raise("randint: empty range");
    }
    Value::int(RNG.with(|r| r.borrow_mut().gen_range(a.a..=b.a)))
}

/// random.randrange(n) -> int in [0, n).
///
/// # Safety
/// `n` must be a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_random_randrange(n: Value) -> Value {
    if n.tag != TAG_INT || n.a <= 0 {
        return raise("randrange: expected positive int");
    }
    Value::int(RNG.with(|r| r.borrow_mut().gen_range(0..n.a)))
}

/// random.getrandbits(k) -> int with k random low bits (k <= 63).
///
/// # Safety
/// `k` must be a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_random_getrandbits(k: Value) -> Value {
    if k.tag != TAG_INT || !(0..=63).contains(&k.a) {
        return raise("getrandbits: bit count must be in 0..=63");
    }
    if k.a == 0 {
        return Value::int(0);
    }
    let bits = RNG.with(|r| r.borrow_mut().next_u64()) >> (64 - k.a as u32);
    Value::int(bits as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_unit_interval() {
        unsafe {
            pycc_random_seed(Value::int(12345));
            for _ in 0..100 {
                let r = pycc_random_random().as_f64();
                assert!((0.0..1.0).contains(&r));
            }
        }
    }

    #[test]
    fn randint_inclusive_bounds() {
        unsafe {
            pycc_random_seed(Value::int(7));
            let mut seen_lo = false;
            let mut seen_hi = false;
            for _ in 0..500 {
                let n = pycc_random_randint(Value::int(1), Value::int(3)).a;
                assert!((1..=3).contains(&n));
                seen_lo |= n == 1;
                seen_hi |= n == 3;
            }
            assert!(seen_lo && seen_hi);
        }
    }

    #[test]
    fn seeding_replays_the_stream() {
        unsafe {
            pycc_random_seed(Value::int(42));
            let a1 = pycc_random_random().as_f64();
            let a2 = pycc_random_random().as_f64();
            pycc_random_seed(Value::int(42));
            assert_eq!(a1, pycc_random_random().as_f64());
            assert_eq!(a2, pycc_random_random().as_f64());
        }
    }
}
