//! heapq shims
//!
//! Binary min-heap maintained inside an ordinary list, so user code can mix
//! heap operations with plain list access the way the source dialect allows.

use crate::error::raise;
use crate::value::{cmp_values, pycc_rt_retain, Value, TAG_LIST};
use std::cmp::Ordering;

fn sift_up(items: &mut [Value], mut pos: usize) {
    while pos > 0 {
        let parent = (pos - 1) / 2;
        if cmp_values(items[pos], items[parent]) == Ordering::Less {
            items.swap(pos, parent);
            pos = parent;
        } else {
            break;
        }
    }
}

fn sift_down(items: &mut [Value], mut pos: usize) {
    let len = items.len();
    loop {
        let left = 2 * pos + 1;
        if left >= len {
            break;
        }
        let right = left + 1;
        let mut smallest = left;
        if right < len && cmp_values(items[right], items[left]) == Ordering::Less {
            smallest = right;
        }
        if cmp_values(items[smallest], items[pos]) == Ordering::Less {
            items.swap(pos, smallest);
            pos = smallest;
        } else {
            break;
        }
    }
}

/// heapq.heappush(heap, x) -> None.
///
/// # Safety
/// `heap` must be a live List value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_heapq_heappush(heap: Value, x: Value) -> Value {
    if heap.tag != TAG_LIST {
        return raise("heappush: expected list");
    }
    unsafe {
        pycc_rt_retain(x);
        let mut items = heap.list_obj().items.borrow_mut();
        items.push(x);
        let n = items.len();
        sift_up(&mut items, n - 1);
    }
    Value::none()
}

/// heapq.heappop(heap) -> smallest element. Raises on an empty heap.
///
/// # Safety
/// `heap` must be a live List value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_heapq_heappop(heap: Value) -> Value {
    if heap.tag != TAG_LIST {
        return raise("heappop: expected list");
    }
    unsafe {
        let mut items = heap.list_obj().items.borrow_mut();
        if items.is_empty() {
            drop(items);
            return raise("heappop: empty heap");
        }
        let last = items.len() - 1;
        items.swap(0, last);
        let top = items.pop().unwrap();
        sift_down(&mut items, 0);
        // Ownership of `top` (the container's reference) moves to the caller.
        top
    }
}

/// heapq.heapify(list) -> None — in-place transform to heap order.
///
/// # Safety
/// `heap` must be a live List value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_heapq_heapify(heap: Value) -> Value {
    if heap.tag != TAG_LIST {
        return raise("heapify: expected list");
    }
    unsafe {
        let mut items = heap.list_obj().items.borrow_mut();
        let n = items.len();
        for i in (0..n / 2).rev() {
            sift_down(&mut items, i);
        }
    }
    Value::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn push_pop_sorted_order() {
        unsafe {
            let h = Value::list(vec![]);
            for n in [3, 1, 2] {
                pycc_heapq_heappush(h, Value::int(n));
            }
            let mut out = Vec::new();
            for _ in 0..3 {
                out.push(pycc_heapq_heappop(h).a);
            }
            assert_eq!(out, vec![1, 2, 3]);
            pycc_rt_release(h);
        }
    }

    #[test]
    fn many_elements_emerge_non_decreasing() {
        unsafe {
            let h = Value::list(vec![]);
            for n in [9, 4, 7, 1, 8, 2, 6, 3, 5, 0] {
                pycc_heapq_heappush(h, Value::int(n));
            }
            let mut prev = i64::MIN;
            for _ in 0..10 {
                let x = pycc_heapq_heappop(h).a;
                assert!(x >= prev);
                prev = x;
            }
            pycc_rt_release(h);
        }
    }

    #[test]
    fn heapify_then_pop() {
        unsafe {
            let h = Value::list(vec![Value::int(5), Value::int(1), Value::int(4)]);
            pycc_heapq_heapify(h);
            assert_eq!(pycc_heapq_heappop(h).a, 1);
            pycc_rt_release(h);
        }
    }

    #[test]
    fn pop_empty_raises() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let h = Value::list(vec![]);
            let r = pycc_heapq_heappop(h);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(h);
        }
    }
}
