//! itertools shims
//!
//! Combinations and permutations are materialized eagerly as lists of
//! lists — the static subset has no lazy iterators.

use crate::error::raise;
use crate::value::{pycc_rt_retain, Value, TAG_INT, TAG_LIST, TAG_TUPLE};

fn snapshot(seq: Value) -> Vec<Value> {
    unsafe { seq.list_obj().items.borrow().clone() }
}

/// itertools.combinations(seq, r) -> list of r-element lists, in
/// lexicographic index order. Length is C(n, r).
///
/// # Safety
/// `seq` must be a live List/Tuple value; `r` a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_itertools_combinations(seq: Value, r: Value) -> Value {
    if (seq.tag != TAG_LIST && seq.tag != TAG_TUPLE) || r.tag != TAG_INT || r.a < 0 {
        return raise("combinations: expected (list, non-negative int)");
    }
    let items = snapshot(seq);
    let n = items.len();
    let r = r.a as usize;
    let mut out: Vec<Value> = Vec::new();
    if r <= n {
        let mut idx: Vec<usize> = (0..r).collect();
        loop {
            let combo: Vec<Value> =
                idx.iter().map(|&i| unsafe { pycc_rt_retain(items[i]) }).collect();
            out.push(Value::list(combo));
            // Advance the rightmost index that can still move.
            let mut i = r;
            loop {
                if i == 0 {
                    return Value::list(out);
                }
                i -= 1;
                if idx[i] != i + n - r {
                    break;
                }
            }
            idx[i] += 1;
            for j in i + 1..r {
                idx[j] = idx[j - 1] + 1;
            }
        }
    }
    Value::list(out)
}

/// itertools.permutations(seq, r) -> list of r-element lists. Length is
/// P(n, r) = n! / (n-r)!.
///
/// # Safety
/// `seq` must be a live List/Tuple value; `r` a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_itertools_permutations(seq: Value, r: Value) -> Value {
    if (seq.tag != TAG_LIST && seq.tag != TAG_TUPLE) || r.tag != TAG_INT || r.a < 0 {
        return raise("permutations: expected (list, non-negative int)");
    }
    let items = snapshot(seq);
    let n = items.len();
    let r = r.a as usize;
    let mut out: Vec<Value> = Vec::new();
    if r <= n {
        let mut current: Vec<usize> = Vec::with_capacity(r);
        let mut used = vec![false; n];
        permute(&items, n, r, &mut current, &mut used, &mut out);
    }
    Value::list(out)
}

fn permute(
    items: &[Value],
    n: usize,
    r: usize,
    current: &mut Vec<usize>,
    used: &mut [bool],
    out: &mut Vec<Value>,
) {
    if current.len() == r {
        let perm: Vec<Value> =
            current.iter().map(|&i| unsafe { pycc_rt_retain(items[i]) }).collect();
        out.push(Value::list(perm));
        return;
    }
    for i in 0..n {
        if !used[i] {
            used[i] = true;
            current.push(i);
            permute(items, n, r, current, used, out);
            current.pop();
            used[i] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    fn int_list(xs: &[i64]) -> Value {
        Value::list(xs.iter().map(|n| Value::int(*n)).collect())
    }

    #[test]
    fn combination_counts() {
        unsafe {
            let xs = int_list(&[1, 2, 3]);
            let c2 = pycc_itertools_combinations(xs, Value::int(2));
            assert_eq!(c2.list_obj().items.borrow().len(), 3);
            pycc_rt_release(c2);

            let c0 = pycc_itertools_combinations(xs, Value::int(0));
            assert_eq!(c0.list_obj().items.borrow().len(), 1);
            pycc_rt_release(c0);

            let c4 = pycc_itertools_combinations(xs, Value::int(4));
            assert_eq!(c4.list_obj().items.borrow().len(), 0);
            pycc_rt_release(c4);
            pycc_rt_release(xs);
        }
    }

    #[test]
    fn combination_order() {
        unsafe {
            let xs = int_list(&[1, 2, 3]);
            let c = pycc_itertools_combinations(xs, Value::int(2));
            let s = crate::pprint::pycc_pprint_pformat(c);
            assert_eq!(s.str_ref(), "[[1, 2], [1, 3], [2, 3]]");
            pycc_rt_release(s);
            pycc_rt_release(c);
            pycc_rt_release(xs);
        }
    }

    #[test]
    fn permutation_counts() {
        unsafe {
            let xs = int_list(&[1, 2]);
            let p2 = pycc_itertools_permutations(xs, Value::int(2));
            assert_eq!(p2.list_obj().items.borrow().len(), 2);
            pycc_rt_release(p2);
            pycc_rt_release(xs);

            let ys = int_list(&[1, 2, 3]);
            let p2 = pycc_itertools_permutations(ys, Value::int(2));
            assert_eq!(p2.list_obj().items.borrow().len(), 6);
            pycc_rt_release(p2);
            pycc_rt_release(ys);
        }
    }
}
