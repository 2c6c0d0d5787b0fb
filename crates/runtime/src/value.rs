//! Runtime value representation
//!
//! Every value crossing the generated-code/runtime boundary is a `Value`:
//! a 24-byte `#[repr(C)]` struct passed by value. The compiler declares the
//! matching LLVM type `%Value = type { i64, i64, i64 }` and constructs
//! scalar values (None, Int, Float, Bool) inline with `insertvalue`, so
//! scalars never touch the heap. Heap kinds (Str, Bytes, List, Tuple, Dict,
//! Set, Handle) carry a pointer to a reference-counted object in `a`.
//!
//! # Ownership Contract
//!
//! - Runtime functions that produce a value return an owned reference
//!   (already retained). The generated code is responsible for releasing it
//!   when the owning local goes out of scope.
//! - Runtime functions borrow their arguments. A shim that stores an
//!   argument into a longer-lived structure retains it internally.
//! - `pycc_rt_retain` / `pycc_rt_release` are no-ops for scalar tags.
//!
//! Generated programs are single-threaded, so refcounts are plain `Cell`s
//! and interior mutability uses `RefCell`.

use indexmap::{IndexMap, IndexSet};
use std::cell::{Cell, RefCell};

pub const TAG_NONE: i64 = 0;
pub const TAG_INT: i64 = 1;
pub const TAG_FLOAT: i64 = 2;
pub const TAG_BOOL: i64 = 3;
pub const TAG_STR: i64 = 4;
pub const TAG_BYTES: i64 = 5;
pub const TAG_LIST: i64 = 6;
pub const TAG_TUPLE: i64 = 7;
pub const TAG_DICT: i64 = 8;
pub const TAG_SET: i64 = 9;
pub const TAG_HANDLE: i64 = 10;

/// Handle sub-kinds (stored in `Value::b` for TAG_HANDLE).
pub const HANDLE_MATCH: i64 = 1;
pub const HANDLE_ARGPARSER: i64 = 2;
pub const HANDLE_DEFAULTDICT: i64 = 3;
pub const HANDLE_NAMESPACE: i64 = 4;
pub const HANDLE_ARRAY: i64 = 5;

/// The universal ABI value: tag + two payload words.
///
/// Layout must stay in sync with the `%Value` type emitted by codegen.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct Value {
    pub tag: i64,
    pub a: i64,
    pub b: i64,
}

/// Hashable key subset for dicts and sets.
///
/// Float is excluded (NaN breaks the Eq contract), matching the source
/// dialect programs this compiler accepts: every observed key is an int,
/// bool or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl Key {
    /// Convert a Value to a Key, or None for unhashable tags.
    pub fn from_value(v: Value) -> Option<Key> {
        match v.tag {
            TAG_INT => Some(Key::Int(v.a)),
            TAG_BOOL => Some(Key::Bool(v.a != 0)),
            TAG_STR => Some(Key::Str(unsafe { v.str_ref() }.to_owned())),
            _ => None,
        }
    }

    /// Materialize the key back into an owned Value.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Int(n) => Value::int(*n),
            Key::Bool(b) => Value::bool_val(*b),
            Key::Str(s) => Value::str(s.clone()),
        }
    }
}

pub struct StrObj {
    pub refs: Cell<usize>,
    pub data: String,
}

pub struct BytesObj {
    pub refs: Cell<usize>,
    pub data: Vec<u8>,
}

pub struct ListObj {
    pub refs: Cell<usize>,
    pub items: RefCell<Vec<Value>>,
}

pub struct DictObj {
    pub refs: Cell<usize>,
    pub map: RefCell<IndexMap<Key, Value>>,
}

pub struct SetObj {
    pub refs: Cell<usize>,
    pub set: RefCell<IndexSet<Key>>,
}

/// Opaque module handles (regex matches, argument parsers, ...).
pub enum HandleData {
    /// A successful `re.search`/`re.match`: the matched text and span.
    Match { text: String, start: i64, end: i64 },
    /// argparse.ArgumentParser: declared (flag, action) pairs.
    ArgParser { specs: RefCell<Vec<(String, String)>> },
    /// collections.defaultdict: default value plus backing map.
    DefaultDict {
        default: Value,
        map: RefCell<IndexMap<Key, Value>>,
    },
    /// types.SimpleNamespace: attribute name -> value.
    Namespace { attrs: RefCell<IndexMap<String, Value>> },
    /// array.array with an integer typecode.
    Array {
        typecode: char,
        items: RefCell<Vec<i64>>,
    },
}

pub struct HandleObj {
    pub refs: Cell<usize>,
    pub data: HandleData,
}

fn box_ptr<T>(obj: T) -> i64 {
    Box::into_raw(Box::new(obj)) as i64
}

impl Value {
    pub fn none() -> Value {
        Value { tag: TAG_NONE, a: 0, b: 0 }
    }

    pub fn int(n: i64) -> Value {
        Value { tag: TAG_INT, a: n, b: 0 }
    }

    pub fn float(f: f64) -> Value {
        Value { tag: TAG_FLOAT, a: f.to_bits() as i64, b: 0 }
    }

    pub fn bool_val(b: bool) -> Value {
        Value { tag: TAG_BOOL, a: b as i64, b: 0 }
    }

    pub fn str(s: String) -> Value {
        Value {
            tag: TAG_STR,
            a: box_ptr(StrObj { refs: Cell::new(1), data: s }),
            b: 0,
        }
    }

    pub fn bytes(data: Vec<u8>) -> Value {
        Value {
            tag: TAG_BYTES,
            a: box_ptr(BytesObj { refs: Cell::new(1), data }),
            b: 0,
        }
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value {
            tag: TAG_LIST,
            a: box_ptr(ListObj { refs: Cell::new(1), items: RefCell::new(items) }),
            b: 0,
        }
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        let mut v = Value::list(items);
        v.tag = TAG_TUPLE;
        v
    }

    pub fn dict(map: IndexMap<Key, Value>) -> Value {
        Value {
            tag: TAG_DICT,
            a: box_ptr(DictObj { refs: Cell::new(1), map: RefCell::new(map) }),
            b: 0,
        }
    }

    pub fn set(set: IndexSet<Key>) -> Value {
        Value {
            tag: TAG_SET,
            a: box_ptr(SetObj { refs: Cell::new(1), set: RefCell::new(set) }),
            b: 0,
        }
    }

    pub fn handle(kind: i64, data: HandleData) -> Value {
        Value {
            tag: TAG_HANDLE,
            a: box_ptr(HandleObj { refs: Cell::new(1), data }),
            b: kind,
        }
    }

    pub fn is_none(self) -> bool {
        self.tag == TAG_NONE
    }

    pub fn as_f64(self) -> f64 {
        debug_assert_eq!(self.tag, TAG_FLOAT);
        f64::from_bits(self.a as u64)
    }

    /// Numeric value of an Int, Float or Bool, for mixed arithmetic and
    /// comparison.
    pub fn as_number(self) -> Option<f64> {
        match self.tag {
            TAG_INT => Some(self.a as f64),
            TAG_FLOAT => Some(self.as_f64()),
            TAG_BOOL => Some(self.a as f64),
            _ => None,
        }
    }

    /// # Safety
    /// Tag must be TAG_STR and the pointer must be live.
    pub unsafe fn str_ref<'a>(self) -> &'a str {
        unsafe { &(*(self.a as *const StrObj)).data }
    }

    /// # Safety
    /// Tag must be TAG_BYTES and the pointer must be live.
    pub unsafe fn bytes_ref<'a>(self) -> &'a [u8] {
        unsafe { &(*(self.a as *const BytesObj)).data }
    }

    /// # Safety
    /// Tag must be TAG_LIST or TAG_TUPLE and the pointer must be live.
    pub unsafe fn list_obj<'a>(self) -> &'a ListObj {
        unsafe { &*(self.a as *const ListObj) }
    }

    /// # Safety
    /// Tag must be TAG_DICT and the pointer must be live.
    pub unsafe fn dict_obj<'a>(self) -> &'a DictObj {
        unsafe { &*(self.a as *const DictObj) }
    }

    /// # Safety
    /// Tag must be TAG_SET and the pointer must be live.
    pub unsafe fn set_obj<'a>(self) -> &'a SetObj {
        unsafe { &*(self.a as *const SetObj) }
    }

    /// # Safety
    /// Tag must be TAG_HANDLE and the pointer must be live.
    pub unsafe fn handle_obj<'a>(self) -> &'a HandleObj {
        unsafe { &*(self.a as *const HandleObj) }
    }
}

/// Truthiness per the source dialect: zero numerics, empty containers,
/// empty strings, False and None are falsy; everything else is truthy.
pub fn truthy(v: Value) -> bool {
    unsafe {
        match v.tag {
            TAG_NONE => false,
            TAG_INT | TAG_BOOL => v.a != 0,
            TAG_FLOAT => v.as_f64() != 0.0,
            TAG_STR => !v.str_ref().is_empty(),
            TAG_BYTES => !v.bytes_ref().is_empty(),
            TAG_LIST | TAG_TUPLE => !v.list_obj().items.borrow().is_empty(),
            TAG_DICT => !v.dict_obj().map.borrow().is_empty(),
            TAG_SET => !v.set_obj().set.borrow().is_empty(),
            _ => true,
        }
    }
}

/// Structural equality. Numeric tags compare by value across Int/Float/Bool;
/// containers compare element-wise; handles compare by identity.
pub fn eq_values(a: Value, b: Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return x == y;
    }
    if a.tag != b.tag {
        // None only equals None; a match handle never equals None.
        return false;
    }
    unsafe {
        match a.tag {
            TAG_NONE => true,
            TAG_STR => a.str_ref() == b.str_ref(),
            TAG_BYTES => a.bytes_ref() == b.bytes_ref(),
            TAG_LIST | TAG_TUPLE => {
                let xs = a.list_obj().items.borrow();
                let ys = b.list_obj().items.borrow();
                xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| eq_values(*x, *y))
            }
            TAG_DICT => {
                let xs = a.dict_obj().map.borrow();
                let ys = b.dict_obj().map.borrow();
                xs.len() == ys.len()
                    && xs.iter().all(|(k, v)| ys.get(k).is_some_and(|w| eq_values(*v, *w)))
            }
            TAG_SET => {
                let xs = a.set_obj().set.borrow();
                let ys = b.set_obj().set.borrow();
                xs.len() == ys.len() && xs.iter().all(|k| ys.contains(k))
            }
            TAG_HANDLE => a.a == b.a,
            _ => false,
        }
    }
}

/// Total order over the comparable subset (numbers, strings, bytes, lists).
/// Used by sorting, bisect and heapq. Incomparable tags fall back to tag
/// order so internal sorts stay total; the shim layer rejects them earlier.
pub fn cmp_values(a: Value, b: Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    unsafe {
        match (a.tag, b.tag) {
            (TAG_STR, TAG_STR) => a.str_ref().cmp(b.str_ref()),
            (TAG_BYTES, TAG_BYTES) => a.bytes_ref().cmp(b.bytes_ref()),
            (TAG_LIST, TAG_LIST) | (TAG_TUPLE, TAG_TUPLE) => {
                let xs = a.list_obj().items.borrow();
                let ys = b.list_obj().items.borrow();
                for (x, y) in xs.iter().zip(ys.iter()) {
                    let o = cmp_values(*x, *y);
                    if o != Ordering::Equal {
                        return o;
                    }
                }
                xs.len().cmp(&ys.len())
            }
            _ => a.tag.cmp(&b.tag),
        }
    }
}

/// Increment the refcount of a heap value. No-op for scalars.
///
/// # Safety
/// For heap tags the pointer must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_retain(v: Value) -> Value {
    unsafe {
        match v.tag {
            TAG_STR => {
                let o = &*(v.a as *const StrObj);
                o.refs.set(o.refs.get() + 1);
            }
            TAG_BYTES => {
                let o = &*(v.a as *const BytesObj);
                o.refs.set(o.refs.get() + 1);
            }
            TAG_LIST | TAG_TUPLE => {
                let o = &*(v.a as *const ListObj);
                o.refs.set(o.refs.get() + 1);
            }
            TAG_DICT => {
                let o = &*(v.a as *const DictObj);
                o.refs.set(o.refs.get() + 1);
            }
            TAG_SET => {
                let o = &*(v.a as *const SetObj);
                o.refs.set(o.refs.get() + 1);
            }
            TAG_HANDLE => {
                let o = &*(v.a as *const HandleObj);
                o.refs.set(o.refs.get() + 1);
            }
            _ => {}
        }
    }
    v
}

/// Decrement the refcount of a heap value, freeing it (and releasing its
/// children) when the count reaches zero. No-op for scalars.
///
/// # Safety
/// For heap tags the pointer must be live and the caller must not use the
/// value again unless it holds another reference.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_release(v: Value) {
    unsafe {
        match v.tag {
            TAG_STR => {
                let o = &*(v.a as *const StrObj);
                if o.refs.get() == 1 {
                    drop(Box::from_raw(v.a as *mut StrObj));
                } else {
                    o.refs.set(o.refs.get() - 1);
                }
            }
            TAG_BYTES => {
                let o = &*(v.a as *const BytesObj);
                if o.refs.get() == 1 {
                    drop(Box::from_raw(v.a as *mut BytesObj));
                } else {
                    o.refs.set(o.refs.get() - 1);
                }
            }
            TAG_LIST | TAG_TUPLE => {
                let o = &*(v.a as *const ListObj);
                if o.refs.get() == 1 {
                    for child in o.items.borrow().iter() {
                        pycc_rt_release(*child);
                    }
                    drop(Box::from_raw(v.a as *mut ListObj));
                } else {
                    o.refs.set(o.refs.get() - 1);
                }
            }
            TAG_DICT => {
                let o = &*(v.a as *const DictObj);
                if o.refs.get() == 1 {
                    for (_, child) in o.map.borrow().iter() {
                        pycc_rt_release(*child);
                    }
                    drop(Box::from_raw(v.a as *mut DictObj));
                } else {
                    o.refs.set(o.refs.get() - 1);
                }
            }
            TAG_SET => {
                let o = &*(v.a as *const SetObj);
                if o.refs.get() == 1 {
                    drop(Box::from_raw(v.a as *mut SetObj));
                } else {
                    o.refs.set(o.refs.get() - 1);
                }
            }
            TAG_HANDLE => {
                let o = &*(v.a as *const HandleObj);
                if o.refs.get() == 1 {
                    match &o.data {
                        HandleData::DefaultDict { default, map } => {
                            pycc_rt_release(*default);
                            for (_, child) in map.borrow().iter() {
                                pycc_rt_release(*child);
                            }
                        }
                        HandleData::Namespace { attrs } => {
                            for (_, child) in attrs.borrow().iter() {
                                pycc_rt_release(*child);
                            }
                        }
                        _ => {}
                    }
                    drop(Box::from_raw(v.a as *mut HandleObj));
                } else {
                    o.refs.set(o.refs.get() - 1);
                }
            }
            _ => {}
        }
    }
}

/// Truthiness test exposed to generated code.
///
/// # Safety
/// Heap payloads must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_truthy(v: Value) -> i64 {
    truthy(v) as i64
}

/// Structural equality exposed to generated code (`==`, `!=` on non-scalars
/// and on Any).
///
/// # Safety
/// Heap payloads must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_value_eq(a: Value, b: Value) -> i64 {
    eq_values(a, b) as i64
}

/// Ordered comparison for `<  <=  >  >=` on strings and sequences.
/// Returns -1, 0 or 1.
///
/// # Safety
/// Heap payloads must be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_value_cmp(a: Value, b: Value) -> i64 {
    match cmp_values(a, b) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

/// Identity test backing `is` / `is not`. Scalars compare by value, heap
/// values by pointer, None by tag.
///
/// # Safety
/// Always safe; payloads are not dereferenced.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_value_is(a: Value, b: Value) -> i64 {
    (a.tag == b.tag && a.a == b.a) as i64
}

/// Tag test backing `isinstance(x, <builtin type>)`. Kind codes match the
/// TAG_* constants; TAG_LIST also accepts tuples, mirroring how the source
/// programs use the check (sequence shape, not exact class).
///
/// # Safety
/// Always safe; payloads are not dereferenced.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pycc_rt_isinstance(v: Value, kind: i64) -> i64 {
    let hit = v.tag == kind || (kind == TAG_LIST && v.tag == TAG_TUPLE);
    hit as i64
}
