//! calendar shims

use crate::error::raise;
use crate::value::{Value, TAG_INT};

pub fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Weekday of the first day of a month, Monday = 0 (Zeller-style
/// congruence rebased to the Monday convention).
fn first_weekday(year: i64, month: i64) -> i64 {
    let (y, m) = if month < 3 { (year - 1, month + 12) } else { (year, month) };
    let k = y % 100;
    let j = y / 100;
    // Zeller: 0 = Saturday
    let h = (1 + (13 * (m + 1)) / 5 + k + k / 4 + j / 4 + 5 * j) % 7;
    (h + 5) % 7
}

/// calendar.isleap(year) -> bool.
///
/// # Safety
/// `year` must be a live Int value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_calendar_isleap(year: Value) -> Value {
    if year.tag != TAG_INT {
        return raise("isleap: expected int");
    }
    Value::bool_val(is_leap(year.a))
}

/// calendar.monthrange(year, month) -> [first_weekday, days_in_month].
///
/// # Safety
/// Both arguments must be live Int values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_calendar_monthrange(year: Value, month: Value) -> Value {
    if year.tag != TAG_INT || month.tag != TAG_INT {
        return raise("monthrange: expected (int, int)");
    }
    if !(1..=12).contains(&month.a) {
        return raise("monthrange: month must be in 1..12");
    }
    Value::list(vec![
        Value::int(first_weekday(year.a, month.a)),
        Value::int(days_in_month(year.a, month.a)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn leap_rules() {
        unsafe {
            assert_eq!(pycc_calendar_isleap(Value::int(2000)).a, 1);
            assert_eq!(pycc_calendar_isleap(Value::int(1900)).a, 0);
            assert_eq!(pycc_calendar_isleap(Value::int(2024)).a, 1);
            assert_eq!(pycc_calendar_isleap(Value::int(2023)).a, 0);
        }
    }

    #[test]
    fn monthrange_feb_2024() {
        unsafe {
            let mr = pycc_calendar_monthrange(Value::int(2024), Value::int(2));
            let items = mr.list_obj().items.borrow();
            assert_eq!(items.len(), 2);
            // 2024-02-01 was a Thursday (weekday 3, Monday = 0).
            assert_eq!(items[0].a, 3);
            assert_eq!(items[1].a, 29);
            drop(items);
            pycc_rt_release(mr);
        }
    }
}
