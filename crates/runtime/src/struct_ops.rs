//! struct shims
//!
//! Little-endian integer packing: formats of the form `<` followed by one
//! or more of `b h i q` (1/2/4/8-byte signed ints). `pack` takes a list of
//! ints, `unpack` returns one; sizes are exact.

use crate::error::raise;
use crate::value::{Value, TAG_BYTES, TAG_LIST, TAG_STR, TAG_TUPLE};

fn field_sizes(fmt: &str) -> Result<Vec<usize>, String> {
    let mut chars = fmt.chars();
    if chars.next() != Some('<') {
        return Err(format!("struct: format must be little-endian ('<...'), got '{}'", fmt));
    }
    let mut sizes = Vec::new();
    for c in chars {
        let size = match c {
            'b' => 1,
            'h' => 2,
            'i' => 4,
            'q' => 8,
            other => return Err(format!("struct: unsupported format char '{}'", other)),
        };
        sizes.push(size);
    }
    if sizes.is_empty() {
        return Err("struct: empty format".to_string());
    }
    Ok(sizes)
}

fn fits(n: i64, size: usize) -> bool {
    match size {
        1 => (i8::MIN as i64..=i8::MAX as i64).contains(&n),
        2 => (i16::MIN as i64..=i16::MAX as i64).contains(&n),
        4 => (i32::MIN as i64..=i32::MAX as i64).contains(&n),
        _ => true,
    }
}

/// struct.pack(fmt, values) -> bytes.
///
/// # Safety
/// `fmt` must be a live Str value; `values` a live List of Ints.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_struct_pack(fmt: Value, values: Value) -> Value {
    if fmt.tag != TAG_STR || (values.tag != TAG_LIST && values.tag != TAG_TUPLE) {
        return raise("pack: expected (str, list)");
    }
    let sizes = match field_sizes(unsafe { fmt.str_ref() }) {
        Ok(s) => s,
        Err(msg) => return raise(msg),
    };
    let items = unsafe { values.list_obj() }.items.borrow();
    if items.len() != sizes.len() {
        return raise(format!(
            "pack: format takes {} values, got {}",
            sizes.len(),
            items.len()
        ));
    }
    let mut out = Vec::with_capacity(sizes.iter().sum());
    for (v, size) in items.iter().zip(&sizes) {
        if v.tag != crate::value::TAG_INT {
            return raise("pack: values must be ints");
        }
        let n = v.a;
        if !fits(n, *size) {
            return raise(format!("pack: value {} out of range for {}-byte field", n, size));
        }
        out.extend_from_slice(&n.to_le_bytes()[..*size]);
    }
    Value::bytes(out)
}

/// struct.unpack(fmt, data) -> list of ints. Raises when the byte length
/// does not match the format exactly.
///
/// # Safety
/// `fmt` must be a live Str value; `data` a live Bytes value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_struct_unpack(fmt: Value, data: Value) -> Value {
    if fmt.tag != TAG_STR || data.tag != TAG_BYTES {
        return raise("unpack: expected (str, bytes)");
    }
    let sizes = match field_sizes(unsafe { fmt.str_ref() }) {
        Ok(s) => s,
        Err(msg) => return raise(msg),
    };
    let bytes = unsafe { data.bytes_ref() };
    let total: usize = sizes.iter().sum();
    if bytes.len() != total {
        return raise(format!("unpack: requires {} bytes, got {}", total, bytes.len()));
    }
    let mut out = Vec::with_capacity(sizes.len());
    let mut offset = 0;
    for size in sizes {
        let chunk = &bytes[offset..offset + size];
        // Sign-extend from the field width.
        let mut buf = if chunk[size - 1] & 0x80 != 0 { [0xffu8; 8] } else { [0u8; 8] };
        buf[..size].copy_from_slice(chunk);
        out.push(Value::int(i64::from_le_bytes(buf)));
        offset += size;
    }
    Value::list(out)
}

/// struct.calcsize(fmt) -> int.
///
/// # Safety
/// `fmt` must be a live Str value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_struct_calcsize(fmt: Value) -> Value {
    if fmt.tag != TAG_STR {
        return raise("calcsize: expected str");
    }
    match field_sizes(unsafe { fmt.str_ref() }) {
        Ok(sizes) => Value::int(sizes.iter().sum::<usize>() as i64),
        Err(msg) => raise(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pycc_rt_release;

    #[test]
    fn pack_sizes() {
        unsafe {
            let fmt = Value::str("<i".into());
            let vals = Value::list(vec![Value::int(123)]);
            let b = pycc_struct_pack(fmt, vals);
            assert_eq!(b.bytes_ref().len(), 4);
            assert_eq!(b.bytes_ref(), &[123, 0, 0, 0]);
            for v in [b, fmt, vals] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn pack_unpack_round_trip() {
        unsafe {
            let fmt = Value::str("<ii".into());
            let vals = Value::list(vec![Value::int(1), Value::int(-2)]);
            let b = pycc_struct_pack(fmt, vals);
            assert_eq!(b.bytes_ref().len(), 8);
            let back = pycc_struct_unpack(fmt, b);
            let items = back.list_obj().items.borrow();
            assert_eq!(items[0].a, 1);
            assert_eq!(items[1].a, -2);
            drop(items);
            let again = pycc_struct_pack(fmt, back);
            assert_eq!(again.bytes_ref(), b.bytes_ref());
            for v in [again, back, b, fmt, vals] {
                pycc_rt_release(v);
            }
        }
    }

    #[test]
    fn calcsize() {
        unsafe {
            let fmt = Value::str("<ii".into());
            assert_eq!(pycc_struct_calcsize(fmt).a, 8);
            pycc_rt_release(fmt);

            let mixed = Value::str("<bhq".into());
            assert_eq!(pycc_struct_calcsize(mixed).a, 11);
            pycc_rt_release(mixed);
        }
    }

    #[test]
    fn out_of_range_value_raises() {
        unsafe {
            crate::error::pycc_rt_try_enter();
            let fmt = Value::str("<b".into());
            let vals = Value::list(vec![Value::int(1000)]);
            let r = pycc_struct_pack(fmt, vals);
            assert!(r.is_none());
            assert!(crate::error::pending());
            crate::error::clear();
            crate::error::pycc_rt_try_exit();
            pycc_rt_release(fmt);
            pycc_rt_release(vals);
        }
    }
}
