//! Profiling counters
//!
//! With the `profiling` cargo feature, generated code calls
//! `pycc_rt_prof_hit` at every function entry and the accumulated counters
//! are written to `default.profraw` at shutdown (path overridable with
//! `PYCC_PROFILE_FILE`). Without the feature the entry point compiles to a
//! no-op and shutdown writes nothing.

#[cfg(feature = "profiling")]
mod imp {
    use std::cell::RefCell;
    use std::ffi::CStr;
    use std::io::Write;
    use std::os::raw::c_char;

    thread_local! {
        static COUNTERS: RefCell<indexmap::IndexMap<String, u64>> =
            RefCell::new(indexmap::IndexMap::new());
    }

    /// Record one entry into the named function.
    ///
    /// # Safety
    /// `name` must be a valid NUL-terminated string.
    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn pycc_rt_prof_hit(name: *const c_char) {
        let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
        COUNTERS.with(|c| *c.borrow_mut().entry(name).or_insert(0) += 1);
    }

    /// Serialize the counter block. Header: magic, version, entry count;
    /// then length-prefixed names with little-endian u64 counts.
    pub fn write_profraw() {
        let path =
            std::env::var("PYCC_PROFILE_FILE").unwrap_or_else(|_| "default.profraw".to_string());
        COUNTERS.with(|c| {
            let counters = c.borrow();
            let Ok(mut f) = std::fs::File::create(&path) else {
                return;
            };
            let _ = f.write_all(b"PYCCPROF");
            let _ = f.write_all(&1u32.to_le_bytes());
            let _ = f.write_all(&(counters.len() as u32).to_le_bytes());
            for (name, count) in counters.iter() {
                let _ = f.write_all(&(name.len() as u32).to_le_bytes());
                let _ = f.write_all(name.as_bytes());
                let _ = f.write_all(&count.to_le_bytes());
            }
        });
    }

    #[cfg(test)]
    pub fn counter(name: &str) -> u64 {
        COUNTERS.with(|c| c.borrow().get(name).copied().unwrap_or(0))
    }
}

#[cfg(not(feature = "profiling"))]
mod imp {
    use std::os::raw::c_char;

    /// No-op without the `profiling` feature.
    ///
    /// # Safety
    /// Always safe to call.
    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn pycc_rt_prof_hit(_name: *const c_char) {}

    pub fn write_profraw() {}
}

pub use imp::write_profraw;

#[cfg(all(test, feature = "profiling"))]
mod tests {
    use super::imp;
    use std::ffi::CString;

    #[test]
    fn hits_accumulate() {
        let name = CString::new("py_main").unwrap();
        unsafe {
            imp::pycc_rt_prof_hit(name.as_ptr());
            imp::pycc_rt_prof_hit(name.as_ptr());
        }
        assert!(imp::counter("py_main") >= 2);
    }
}
