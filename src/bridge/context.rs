//! The library context: one opened library, passed to every call.

use super::api::NativeApi;
use super::ledger::{HandleKind, HandleLedger, RawHandle};
use crate::config::{platform_lib_name, BridgeConfig, LibrarySource};
use crate::error::{BridgeError, Result};
use crate::ffi::{ClibLayout, ClibStatus, Line, Point};
use libloading::Library;
use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::path::Path;
use std::ptr::NonNull;

/// Name reported for the in-process symbols.
pub const LINKED_NAME: &str = "<linked>";

const FORMAT_BUF_LEN: usize = 64;

/// Panic on an ownership contract violation. Continuing is unsafe.
fn enforce<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{}", err),
    }
}

/// An opened native library.
///
/// Opened once with [`Clib::open`] or [`Clib::linked`], closed once with
/// [`Clib::close`] or on drop. Foreign allocations made through a context are
/// tracked by it and can only be read or released through it.
pub struct Clib {
    api: NativeApi,
    ledger: RefCell<HandleLedger>,
    name: String,
    closed: bool,
    /// Keeps the symbols in `api` mapped. `None` for linked symbols.
    library: Option<Library>,
}

impl Clib {
    /// Bind to the symbols linked into this binary.
    pub fn linked() -> Result<Self> {
        Self::from_api(NativeApi::linked(), LINKED_NAME.to_string(), None, true)
    }

    /// Open the library described by `config`.
    pub fn open(config: &BridgeConfig) -> Result<Self> {
        match &config.source {
            LibrarySource::Linked => Self::from_api(
                NativeApi::linked(),
                LINKED_NAME.to_string(),
                None,
                config.verify_layout,
            ),
            LibrarySource::Path(path) => Self::load(path, config.verify_layout),
            LibrarySource::Name(name) => match config.resolve_name(name) {
                Some(path) => Self::load(&path, config.verify_layout),
                // Fall back to the system loader's own search.
                None => Self::load(Path::new(&platform_lib_name(name)), config.verify_layout),
            },
        }
    }

    fn load(path: &Path, verify_layout: bool) -> Result<Self> {
        let label = path.display().to_string();
        log::debug!("loading native library {}", label);

        // SAFETY: loading runs the library's initialisers; the library is
        // trusted by configuration.
        let library = unsafe { Library::new(path) }.map_err(|e| BridgeError::LibraryLoad {
            library: label.clone(),
            reason: e.to_string(),
        })?;

        // SAFETY: signatures come from the generated header; `library` is
        // stored alongside the table and outlives it.
        let api = unsafe { NativeApi::resolve(&library, &label)? };
        Self::from_api(api, label, Some(library), verify_layout)
    }

    pub(crate) fn from_api(
        api: NativeApi,
        name: String,
        library: Option<Library>,
        verify_layout: bool,
    ) -> Result<Self> {
        let clib = Self {
            api,
            ledger: RefCell::new(HandleLedger::new()),
            name,
            closed: false,
            library,
        };
        if verify_layout {
            clib.verify_layout()?;
        }
        log::debug!("opened native library {}", clib.name);
        Ok(clib)
    }

    /// Compare the library's reported struct layouts with ours.
    pub fn verify_layout(&self) -> Result<()> {
        let checks: [(&'static str, _, ClibLayout); 2] = [
            ("Point", self.api.layout_point, ClibLayout::point()),
            ("Line", self.api.layout_line, ClibLayout::line()),
        ];

        for (type_name, report, expected) in checks {
            let mut actual = ClibLayout::default();
            // SAFETY: `actual` is a valid, writable ClibLayout.
            let status = unsafe { report(&mut actual) };
            if status != ClibStatus::Ok || actual != expected {
                return Err(BridgeError::LayoutMismatch {
                    type_name,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Library path, or [`LINKED_NAME`].
    pub fn name(&self) -> &str {
        &self.name
    }

    // ------------------------------------------------------------------
    // Scalars and strings
    // ------------------------------------------------------------------

    /// Next value of the native counter.
    pub fn counter_next(&self) -> i32 {
        // SAFETY: no arguments.
        unsafe { (self.api.counter_next)() }
    }

    /// Run the native "add one" mutation on a copy of `input`.
    ///
    /// `input` itself is never handed to native code and stays unchanged.
    pub fn add_one(&self, input: &CStr) -> CString {
        let mut buf = input.to_bytes_with_nul().to_vec();
        // SAFETY: `buf` is writable and NUL-terminated.
        unsafe { (self.api.string_add_one)(buf.as_mut_ptr() as *mut c_char) };
        CStr::from_bytes_until_nul(&buf)
            .map(CStr::to_owned)
            .unwrap_or_default()
    }

    /// Run the native "add one" mutation directly on a caller buffer.
    ///
    /// The buffer must contain a NUL; bytes after the first NUL are left alone.
    pub fn add_one_in_place(&self, buf: &mut [u8]) -> Result<()> {
        if !buf.contains(&0) {
            return Err(BridgeError::MissingNul { len: buf.len() });
        }
        // SAFETY: writable and NUL-terminated within its bounds.
        unsafe { (self.api.string_add_one)(buf.as_mut_ptr() as *mut c_char) };
        Ok(())
    }

    // ------------------------------------------------------------------
    // Struct marshalling
    // ------------------------------------------------------------------

    pub fn show_point(&self, point: Point) {
        // SAFETY: Point is passed by value with its C layout.
        unsafe { (self.api.point_show)(point) }
    }

    pub fn show_point_ref(&self, point: &Point) {
        // SAFETY: valid for reads for the duration of the call.
        unsafe { (self.api.point_show_ref)(point) }
    }

    pub fn show_line(&self, line: Line) {
        // SAFETY: Line is passed by value with its C layout.
        unsafe { (self.api.line_show)(line) }
    }

    /// Pass a copy; native mutation does not come back.
    pub fn move_point(&self, point: Point) {
        // SAFETY: by value.
        unsafe { (self.api.point_move)(point) }
    }

    /// Pass our own memory; native mutation is visible afterwards.
    pub fn move_point_ref(&self, point: &mut Point) {
        // SAFETY: exclusive, valid for reads and writes during the call.
        unsafe { (self.api.point_move_ref)(point) }
    }

    pub fn move_line_ref(&self, line: &mut Line) {
        // SAFETY: exclusive, valid for reads and writes during the call.
        unsafe { (self.api.line_move_ref)(line) }
    }

    pub fn get_point(&self) -> Point {
        // SAFETY: returns by value.
        unsafe { (self.api.point_get)() }
    }

    /// A point built by the native constructor.
    pub fn new_point(&self, x: i32, y: i32) -> Point {
        // SAFETY: scalars in, Point by value out.
        unsafe { (self.api.point_new)(x, y) }
    }

    /// The next native default point.
    pub fn default_point(&self) -> Point {
        // SAFETY: returns by value.
        unsafe { (self.api.point_default)() }
    }

    /// Display lines written to stdout by this library so far.
    pub fn display_count(&self) -> usize {
        // SAFETY: no arguments.
        unsafe { (self.api.display_count)() }
    }

    pub fn get_line(&self) -> Line {
        // SAFETY: returns by value.
        unsafe { (self.api.line_get)() }
    }

    pub fn echo_point(&self, point: Point) -> Point {
        // SAFETY: by value both ways.
        unsafe { (self.api.point_echo)(point) }
    }

    pub fn echo_line(&self, line: Line) -> Line {
        // SAFETY: by value both ways.
        unsafe { (self.api.line_echo)(line) }
    }

    /// The native display text of a point.
    pub fn format_point(&self, point: Point) -> Result<String> {
        // SAFETY: `format_native` hands a buffer of exactly `len` bytes.
        format_native(|buf, len| unsafe { (self.api.point_format)(point, buf, len) })
    }

    /// The native display text of a line, e.g. `(1, 2)->(3, 4)`.
    pub fn format_line(&self, line: Line) -> Result<String> {
        // SAFETY: `format_native` hands a buffer of exactly `len` bytes.
        format_native(|buf, len| unsafe { (self.api.line_format)(line, buf, len) })
    }

    // ------------------------------------------------------------------
    // Foreign ownership
    // ------------------------------------------------------------------

    /// Ask the native side for a new string. The returned handle must be
    /// released exactly once with [`Clib::release_string`].
    pub fn allocate_string(&self) -> Result<RawHandle> {
        // SAFETY: no arguments; ownership of the result passes to us.
        let ptr = unsafe { (self.api.string_alloc)() };
        let addr = NonNull::new(ptr).ok_or(BridgeError::AllocationFailure {
            function: "clib_string_alloc",
        })?;
        self.admit(RawHandle::new(addr, HandleKind::String))
    }

    /// Snapshot the bytes of a live string handle (without the NUL).
    ///
    /// # Panics
    /// If `handle` is not a live string handle of this context.
    pub fn read_string(&self, handle: RawHandle) -> Vec<u8> {
        enforce(self.ledger.borrow().check(handle, HandleKind::String));
        // SAFETY: live, NUL-terminated string from clib_string_alloc.
        unsafe { CStr::from_ptr(handle.as_ptr::<c_char>()) }
            .to_bytes()
            .to_vec()
    }

    /// Return a string handle to the native deallocator.
    ///
    /// # Panics
    /// If `handle` was already released, belongs to another context, or is
    /// not a string handle. Native code is not called in that case.
    pub fn release_string(&self, handle: RawHandle) {
        enforce(self.ledger.borrow_mut().retire(handle, HandleKind::String));
        log::debug!("releasing {:?}", handle);
        // SAFETY: retired exactly once from the ledger; address untouched.
        unsafe { (self.api.string_free)(handle.as_ptr()) }
    }

    /// Ask the native side for a heap-allocated point.
    pub fn allocate_point(&self) -> Result<RawHandle> {
        // SAFETY: no arguments; ownership of the result passes to us.
        let ptr = unsafe { (self.api.point_alloc)() };
        let addr = NonNull::new(ptr).ok_or(BridgeError::AllocationFailure {
            function: "clib_point_alloc",
        })?;
        self.admit(RawHandle::new(addr, HandleKind::Point))
    }

    /// Copy the point behind a live point handle.
    ///
    /// # Panics
    /// If `handle` is not a live point handle of this context.
    pub fn read_point(&self, handle: RawHandle) -> Point {
        enforce(self.ledger.borrow().check(handle, HandleKind::Point));
        // SAFETY: live, initialised Point from clib_point_alloc.
        unsafe { handle.as_ptr::<Point>().read() }
    }

    /// Overwrite the point behind a live point handle.
    ///
    /// # Panics
    /// If `handle` is not a live point handle of this context.
    pub fn write_point(&self, handle: RawHandle, point: Point) {
        enforce(self.ledger.borrow().check(handle, HandleKind::Point));
        // SAFETY: live Point from clib_point_alloc.
        unsafe { handle.as_ptr::<Point>().write(point) }
    }

    /// Move the point behind a live point handle in native code.
    ///
    /// # Panics
    /// If `handle` is not a live point handle of this context.
    pub fn move_foreign_point(&self, handle: RawHandle) {
        enforce(self.ledger.borrow().check(handle, HandleKind::Point));
        // SAFETY: live Point from clib_point_alloc.
        unsafe { (self.api.point_move_ref)(handle.as_ptr()) }
    }

    /// Return a point handle to the native deallocator.
    ///
    /// # Panics
    /// If `handle` was already released, belongs to another context, or is
    /// not a point handle. Native code is not called in that case.
    pub fn release_point(&self, handle: RawHandle) {
        enforce(self.ledger.borrow_mut().retire(handle, HandleKind::Point));
        log::debug!("releasing {:?}", handle);
        // SAFETY: retired exactly once from the ledger; address untouched.
        unsafe { (self.api.point_free)(handle.as_ptr()) }
    }

    /// Admission only fails when the allocator hands back an address that is
    /// already live here. That address belongs to the earlier handle, so it
    /// is not freed on the error path.
    fn admit(&self, handle: RawHandle) -> Result<RawHandle> {
        self.ledger.borrow_mut().admit(handle)?;
        Ok(handle)
    }

    /// Number of foreign allocations not yet released.
    pub fn live_handles(&self) -> usize {
        self.ledger.borrow().live_count()
    }

    /// Number of handles passed to a native deallocator so far.
    pub fn released_handles(&self) -> u64 {
        self.ledger.borrow().retired()
    }

    /// Close the library. Any allocation still live is released first.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let leaked = self.ledger.get_mut().drain();
        if !leaked.is_empty() {
            log::warn!(
                "closing {} with {} live foreign allocation(s); releasing them",
                self.name,
                leaked.len()
            );
        }
        for handle in leaked {
            // SAFETY: drained from the ledger, so each is released once.
            unsafe {
                match handle.kind() {
                    HandleKind::String => (self.api.string_free)(handle.as_ptr()),
                    HandleKind::Point => (self.api.point_free)(handle.as_ptr()),
                }
            }
        }

        if let Some(library) = self.library.take() {
            if let Err(e) = library.close() {
                log::warn!("failed to unload {}: {}", self.name, e);
            }
        }
        log::debug!("closed native library {}", self.name);
    }
}

impl Drop for Clib {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Clib {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clib")
            .field("name", &self.name)
            .field("live_handles", &self.live_handles())
            .finish()
    }
}

/// Call an snprintf-style native formatter, growing the buffer once if needed.
fn format_native(mut call: impl FnMut(*mut c_char, usize) -> usize) -> Result<String> {
    let mut buf = vec![0u8; FORMAT_BUF_LEN];
    let needed = call(buf.as_mut_ptr() as *mut c_char, buf.len());
    if needed >= buf.len() {
        buf = vec![0u8; needed + 1];
        call(buf.as_mut_ptr() as *mut c_char, buf.len());
    }
    buf.truncate(needed);
    String::from_utf8(buf).map_err(|_| BridgeError::InvalidUtf8)
}
