//! Scoped owners for native allocations.
//!
//! Each owner borrows its [`Clib`], so the library cannot be closed while the
//! allocation is alive, and releases the allocation exactly once: explicitly
//! through `release`, or on drop along any other exit path.

use super::context::Clib;
use super::ledger::RawHandle;
use crate::error::{BridgeError, Result};
use crate::ffi::Point;
use std::ffi::{c_char, CStr};
use std::fmt;

/// A NUL-terminated string allocated by the native side.
pub struct ForeignString<'lib> {
    clib: &'lib Clib,
    handle: RawHandle,
    released: bool,
}

impl<'lib> ForeignString<'lib> {
    /// Allocate a string through `clib_string_alloc`.
    pub fn allocate(clib: &'lib Clib) -> Result<Self> {
        let handle = clib.allocate_string()?;
        Ok(Self {
            clib,
            handle,
            released: false,
        })
    }

    /// View the native bytes in place (without the NUL).
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the handle stays live for as long as `self`.
        unsafe { CStr::from_ptr(self.handle.as_ptr::<c_char>()) }.to_bytes()
    }

    /// Mutable view of the native bytes (without the NUL).
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.as_bytes().len();
        // SAFETY: live allocation of at least `len + 1` bytes, borrowed
        // exclusively through `self`.
        unsafe { std::slice::from_raw_parts_mut(self.handle.as_ptr::<u8>(), len) }
    }

    /// The native bytes as UTF-8.
    pub fn to_str(&self) -> Result<&str> {
        std::str::from_utf8(self.as_bytes()).map_err(|_| BridgeError::InvalidUtf8)
    }

    /// Snapshot copy that stays valid after release.
    pub fn read(&self) -> Vec<u8> {
        self.clib.read_string(self.handle)
    }

    /// Run the native "add one" mutation on the foreign buffer itself.
    pub fn add_one(&mut self) -> Result<()> {
        let len = self.as_bytes().len();
        // SAFETY: the allocation is len + 1 bytes with a trailing NUL.
        let buf = unsafe { std::slice::from_raw_parts_mut(self.handle.as_ptr::<u8>(), len + 1) };
        self.clib.add_one_in_place(buf)
    }

    /// Release the allocation now.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.clib.release_string(self.handle);
        }
    }
}

impl Drop for ForeignString<'_> {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for ForeignString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignString")
            .field("handle", &self.handle)
            .field("value", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

/// A `Point` allocated on the native heap.
pub struct ForeignPoint<'lib> {
    clib: &'lib Clib,
    handle: RawHandle,
    released: bool,
}

impl<'lib> ForeignPoint<'lib> {
    /// Allocate a point through `clib_point_alloc`.
    pub fn allocate(clib: &'lib Clib) -> Result<Self> {
        let handle = clib.allocate_point()?;
        Ok(Self {
            clib,
            handle,
            released: false,
        })
    }

    /// Copy of the current value.
    pub fn get(&self) -> Point {
        self.clib.read_point(self.handle)
    }

    pub fn set(&mut self, point: Point) {
        self.clib.write_point(self.handle, point);
    }

    /// Let native code move the point in place.
    pub fn move_in_place(&mut self) {
        self.clib.move_foreign_point(self.handle);
    }

    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.clib.release_point(self.handle);
        }
    }
}

impl Drop for ForeignPoint<'_> {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for ForeignPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignPoint")
            .field("handle", &self.handle)
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::NATIVE_PHRASE;

    #[test]
    fn test_read_survives_release() {
        let clib = Clib::linked().unwrap();
        let s = ForeignString::allocate(&clib).unwrap();
        assert_eq!(s.to_str().unwrap(), NATIVE_PHRASE);

        let copy = s.read();
        s.release();

        assert_eq!(copy, NATIVE_PHRASE.as_bytes());
        assert_eq!(clib.live_handles(), 0);
        assert_eq!(clib.released_handles(), 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let clib = Clib::linked().unwrap();
        {
            let _s = ForeignString::allocate(&clib).unwrap();
            let _p = ForeignPoint::allocate(&clib).unwrap();
            assert_eq!(clib.live_handles(), 2);
        }
        assert_eq!(clib.live_handles(), 0);
        assert_eq!(clib.released_handles(), 2);
    }

    #[test]
    fn test_early_error_path_releases() {
        fn fails_midway(clib: &Clib) -> Result<usize> {
            let s = ForeignString::allocate(clib)?;
            let len = s.as_bytes().len();
            Err(BridgeError::MissingNul { len })
        }

        let clib = Clib::linked().unwrap();
        assert!(fails_midway(&clib).is_err());
        assert_eq!(clib.live_handles(), 0);
    }

    #[test]
    fn test_panic_path_releases() {
        let clib = Clib::linked().unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _s = ForeignString::allocate(&clib).unwrap();
            panic!("caller failed");
        }));
        assert!(result.is_err());
        assert_eq!(clib.live_handles(), 0);
        assert_eq!(clib.released_handles(), 1);
    }

    #[test]
    fn test_mutate_foreign_bytes() {
        let clib = Clib::linked().unwrap();
        let mut s = ForeignString::allocate(&clib).unwrap();
        s.as_bytes_mut()[0] = b'W';
        assert!(s.to_str().unwrap().starts_with("W was"));

        s.add_one().unwrap();
        assert!(s.to_str().unwrap().starts_with("X!xbt"));
    }

    #[test]
    fn test_foreign_point() {
        let clib = Clib::linked().unwrap();
        let mut p = ForeignPoint::allocate(&clib).unwrap();
        p.set(Point::new(1, 2));
        p.move_in_place();
        assert_eq!(p.get(), Point::new(2, 3));
        p.release();
        assert_eq!(clib.live_handles(), 0);
    }
}
