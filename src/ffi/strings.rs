//! FFI functions for scalars and strings.
//!
//! Memory handed out here comes from the C allocator and must come back
//! through [`clib_string_free`]; no other allocator may release it.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::sync::atomic::{AtomicI32, Ordering};

/// The phrase every call to [`clib_string_alloc`] duplicates.
pub const NATIVE_PHRASE: &str = "I was written in C";

const NATIVE_PHRASE_NUL: &[u8] = b"I was written in C\0";

static COUNTER: AtomicI32 = AtomicI32::new(0);

/// Return the next value of a process-wide counter, starting at 1.
#[no_mangle]
pub extern "C" fn clib_counter_next() -> c_int {
    COUNTER.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
}

/// Add one to every byte of a NUL-terminated string, in place.
///
/// A byte that wraps to zero becomes the new terminator.
///
/// # Safety
/// `input` must be null or point to a writable NUL-terminated buffer.
#[no_mangle]
pub unsafe extern "C" fn clib_string_add_one(input: *mut c_char) {
    if input.is_null() {
        return;
    }

    let len = CStr::from_ptr(input).to_bytes().len();
    let bytes = std::slice::from_raw_parts_mut(input as *mut u8, len);
    for b in bytes.iter_mut() {
        *b = b.wrapping_add(1);
        if *b == 0 {
            break;
        }
    }
}

/// Allocate a copy of [`NATIVE_PHRASE`] with the C allocator.
///
/// Returns null if the allocator is exhausted. The caller owns the result and
/// must pass it, unchanged, to [`clib_string_free`].
#[no_mangle]
pub extern "C" fn clib_string_alloc() -> *mut c_char {
    // SAFETY: the source is a static NUL-terminated string.
    let phrase = unsafe { libc::strdup(NATIVE_PHRASE_NUL.as_ptr() as *const c_char) };
    if phrase.is_null() {
        log::error!("C allocator returned null for string");
    } else {
        log::debug!("native side allocated {:p}: {}", phrase, NATIVE_PHRASE);
    }
    phrase
}

/// Free a string produced by [`clib_string_alloc`].
///
/// # Safety
/// `ptr` must be null or a pointer returned by `clib_string_alloc` that has
/// not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn clib_string_free(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    log::debug!(
        "native side freeing {:p}: {}",
        ptr,
        CStr::from_ptr(ptr).to_string_lossy()
    );
    libc::free(ptr as *mut c_void);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_increases() {
        let a = clib_counter_next();
        let b = clib_counter_next();
        assert!(a >= 1);
        assert!(b > a);
    }

    #[test]
    fn test_add_one_in_place() {
        let mut buf = *b"HAL\0";
        unsafe { clib_string_add_one(buf.as_mut_ptr() as *mut c_char) };
        assert_eq!(&buf, b"IBM\0");
    }

    #[test]
    fn test_add_one_stops_at_wrapped_byte() {
        let mut buf = [b'a', 0xFF, b'a', 0];
        unsafe { clib_string_add_one(buf.as_mut_ptr() as *mut c_char) };
        assert_eq!(buf, [b'b', 0, b'a', 0]);
    }

    #[test]
    fn test_add_one_null_is_ignored() {
        unsafe { clib_string_add_one(std::ptr::null_mut()) };
    }

    #[test]
    fn test_alloc_and_free() {
        let ptr = clib_string_alloc();
        assert!(!ptr.is_null());
        let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned();
        assert_eq!(text, NATIVE_PHRASE);
        unsafe { clib_string_free(ptr) };
    }

    #[test]
    fn test_allocations_are_distinct() {
        let a = clib_string_alloc();
        let b = clib_string_alloc();
        assert_ne!(a, b);
        unsafe {
            clib_string_free(a);
            clib_string_free(b);
        }
    }
}
