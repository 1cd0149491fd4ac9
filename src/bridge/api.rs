//! Typed table of the native entry points.

use crate::error::{BridgeError, Result};
use crate::ffi::{self, ClibLayout, ClibStatus, Line, Point};
use libloading::{Library, Symbol};
use std::ffi::{c_char, c_int};

pub type CounterFn = unsafe extern "C" fn() -> c_int;
pub type StringMutFn = unsafe extern "C" fn(*mut c_char);
pub type StringAllocFn = unsafe extern "C" fn() -> *mut c_char;
pub type StringFreeFn = unsafe extern "C" fn(*mut c_char);
pub type PointFn = unsafe extern "C" fn(Point);
pub type PointRefFn = unsafe extern "C" fn(*const Point);
pub type PointMutFn = unsafe extern "C" fn(*mut Point);
pub type LineFn = unsafe extern "C" fn(Line);
pub type LineMutFn = unsafe extern "C" fn(*mut Line);
pub type PointGetFn = unsafe extern "C" fn() -> Point;
pub type PointNewFn = unsafe extern "C" fn(c_int, c_int) -> Point;
pub type DisplayCountFn = unsafe extern "C" fn() -> usize;
pub type LineGetFn = unsafe extern "C" fn() -> Line;
pub type PointEchoFn = unsafe extern "C" fn(Point) -> Point;
pub type LineEchoFn = unsafe extern "C" fn(Line) -> Line;
pub type PointAllocFn = unsafe extern "C" fn() -> *mut Point;
pub type PointFreeFn = unsafe extern "C" fn(*mut Point);
pub type PointFormatFn = unsafe extern "C" fn(Point, *mut c_char, usize) -> usize;
pub type LineFormatFn = unsafe extern "C" fn(Line, *mut c_char, usize) -> usize;
pub type LayoutFn = unsafe extern "C" fn(*mut ClibLayout) -> ClibStatus;

/// Function pointers for every symbol the bridge calls.
///
/// Resolved once when a [`crate::bridge::Clib`] is opened; signatures are
/// declared here and nowhere else.
#[derive(Clone, Copy)]
pub struct NativeApi {
    pub(crate) counter_next: CounterFn,
    pub(crate) string_add_one: StringMutFn,
    pub(crate) string_alloc: StringAllocFn,
    pub(crate) string_free: StringFreeFn,
    pub(crate) point_show: PointFn,
    pub(crate) point_show_ref: PointRefFn,
    pub(crate) line_show: LineFn,
    pub(crate) point_move: PointFn,
    pub(crate) point_move_ref: PointMutFn,
    pub(crate) line_move_ref: LineMutFn,
    pub(crate) point_get: PointGetFn,
    pub(crate) point_new: PointNewFn,
    pub(crate) point_default: PointGetFn,
    pub(crate) line_get: LineGetFn,
    pub(crate) point_echo: PointEchoFn,
    pub(crate) line_echo: LineEchoFn,
    pub(crate) point_alloc: PointAllocFn,
    pub(crate) point_free: PointFreeFn,
    pub(crate) point_format: PointFormatFn,
    pub(crate) line_format: LineFormatFn,
    pub(crate) layout_point: LayoutFn,
    pub(crate) layout_line: LayoutFn,
    pub(crate) display_count: DisplayCountFn,
}

/// Copy a function pointer out of the library.
///
/// # Safety
/// `T` must match the symbol's real signature, and the pointer must not be
/// called after `library` is unloaded.
unsafe fn symbol<T: Copy>(library: &Library, label: &str, name: &'static str) -> Result<T> {
    let sym: Symbol<'_, T> = library.get(name.as_bytes()).map_err(|e| BridgeError::SymbolNotFound {
        library: label.to_string(),
        symbol: name.trim_end_matches('\0').to_string(),
        reason: e.to_string(),
    })?;
    Ok(*sym)
}

impl NativeApi {
    /// Entry points linked into this binary.
    pub fn linked() -> Self {
        Self {
            counter_next: ffi::clib_counter_next,
            string_add_one: ffi::clib_string_add_one,
            string_alloc: ffi::clib_string_alloc,
            string_free: ffi::clib_string_free,
            point_show: ffi::clib_point_show,
            point_show_ref: ffi::clib_point_show_ref,
            line_show: ffi::clib_line_show,
            point_move: ffi::clib_point_move,
            point_move_ref: ffi::clib_point_move_ref,
            line_move_ref: ffi::clib_line_move_ref,
            point_get: ffi::clib_point_get,
            point_new: ffi::clib_point_new,
            point_default: ffi::clib_point_default,
            line_get: ffi::clib_line_get,
            point_echo: ffi::clib_point_echo,
            line_echo: ffi::clib_line_echo,
            point_alloc: ffi::clib_point_alloc,
            point_free: ffi::clib_point_free,
            point_format: ffi::clib_point_format,
            line_format: ffi::clib_line_format,
            layout_point: ffi::clib_layout_point,
            layout_line: ffi::clib_layout_line,
            display_count: ffi::clib_display_count,
        }
    }

    /// Entry points looked up in a loaded shared object.
    ///
    /// # Safety
    /// The library must export these symbols with the signatures declared in
    /// `clibrs.h`, and the returned table must not outlive `library`.
    pub unsafe fn resolve(library: &Library, label: &str) -> Result<Self> {
        Ok(Self {
            counter_next: symbol(library, label, "clib_counter_next\0")?,
            string_add_one: symbol(library, label, "clib_string_add_one\0")?,
            string_alloc: symbol(library, label, "clib_string_alloc\0")?,
            string_free: symbol(library, label, "clib_string_free\0")?,
            point_show: symbol(library, label, "clib_point_show\0")?,
            point_show_ref: symbol(library, label, "clib_point_show_ref\0")?,
            line_show: symbol(library, label, "clib_line_show\0")?,
            point_move: symbol(library, label, "clib_point_move\0")?,
            point_move_ref: symbol(library, label, "clib_point_move_ref\0")?,
            line_move_ref: symbol(library, label, "clib_line_move_ref\0")?,
            point_get: symbol(library, label, "clib_point_get\0")?,
            point_new: symbol(library, label, "clib_point_new\0")?,
            point_default: symbol(library, label, "clib_point_default\0")?,
            line_get: symbol(library, label, "clib_line_get\0")?,
            point_echo: symbol(library, label, "clib_point_echo\0")?,
            line_echo: symbol(library, label, "clib_line_echo\0")?,
            point_alloc: symbol(library, label, "clib_point_alloc\0")?,
            point_free: symbol(library, label, "clib_point_free\0")?,
            point_format: symbol(library, label, "clib_point_format\0")?,
            line_format: symbol(library, label, "clib_line_format\0")?,
            layout_point: symbol(library, label, "clib_layout_point\0")?,
            layout_line: symbol(library, label, "clib_layout_line\0")?,
            display_count: symbol(library, label, "clib_display_count\0")?,
        })
    }
}
