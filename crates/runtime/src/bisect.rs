//! bisect shims
//!
//! Binary search over a sorted list. `bisect` is an alias for
//! `bisect_right`, as in the source dialect. The insort variants mutate the
//! list in place and keep it sorted.

use crate::error::raise;
use crate::value::{cmp_values, pycc_rt_retain, Value, TAG_LIST};
use std::cmp::Ordering;

fn search(list: Value, x: Value, left: bool) -> i64 {
    let items = unsafe { list.list_obj() }.items.borrow();
    let mut lo = 0usize;
    let mut hi = items.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        let ord = cmp_values(items[mid], x);
        let go_right = if left { ord == Ordering::Less } else { ord != Ordering::Greater };
        if go_right {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo as i64
}

/// bisect.bisect_left(a, x) -> int.
///
/// # Safety
/// `list` must be a live List value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_bisect_bisect_left(list: Value, x: Value) -> Value {
    if list.tag != TAG_LIST {
        return raise("bisect_left: expected list");
    }
    Value::int(search(list, x, true))
}

/// bisect.bisect_right(a, x) -> int (also exported as `bisect`).
///
/// # Safety
/// `list` must be a live List value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_bisect_bisect_right(list: Value, x: Value) -> Value {
    if list.tag != TAG_LIST {
        return raise("bisect_right: expected list");
    }
    Value::int(search(list, x, false))
}

/// bisect.insort(a, x) — insert keeping sort order (right variant).
///
/// # Safety
/// `list` must be a live List value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_bisect_insort(list: Value, x: Value) -> Value {
    if list.tag != TAG_LIST {
        return raise("insort: expected list");
    }
    let pos = search(list, x, false) as usize;
    unsafe {
        pycc_rt_retain(x);
        list.list_obj().items.borrow_mut().insert(pos, x);
    }
    Value::none()
}

/// bisect.insort_left(a, x).
///
/// # Safety
/// `list` must be a live List value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_bisect_insort_left(list: Value, x: Value) -> Value {
    if list.tag != TAG_LIST {
        return raise("insort_left: expected list");
    }
    let pos = search(list, x, true) as usize;
    unsafe {
        pycc_rt_retain(x);
        list.list_obj().items.borrow_mut().insert(pos, x);
    }
    Value::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    fn int_list(xs: &[i64]) -> Value {
        Value::list(xs.iter().map(|n| Value::int(*n)).collect())
    }

    #[test]
    fn left_right_delimit_equal_run() {
        unsafe {
            let l = int_list(&[1, 2, 2, 3]);
            assert_eq!(pycc_bisect_bisect_left(l, Value::int(2)).a, 1);
            assert_eq!(pycc_bisect_bisect_right(l, Value::int(2)).a, 3);
            assert_eq!(pycc_bisect_bisect_left(l, Value::int(3)).a, 3);
            pycc_rt_release(l);
        }
    }

    #[test]
    fn insort_keeps_order() {
        unsafe {
            let l = int_list(&[1, 3, 5]);
            pycc_bisect_insort(l, Value::int(4));
            pycc_bisect_insort_left(l, Value::int(0));
            pycc_bisect_insort(l, Value::int(6));
            let items = l.list_obj().items.borrow();
            let got: Vec<i64> = items.iter().map(|v| v.a).collect();
            assert_eq!(got, vec![0, 1, 3, 4, 5, 6]);
            drop(items);
            pycc_rt_release(l);
        }
    }

    #[test]
    fn insort_is_additive() {
        unsafe {
            let l = int_list(&[2]);
            pycc_bisect_insort(l, Value::int(2));
            pycc_bisect_insort(l, Value::int(2));
            assert_eq!(l.list_obj().items.borrow().len(), 3);
            pycc_rt_release(l);
        }
    }
}
