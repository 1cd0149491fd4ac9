//! FFI functions exchanging `Point` and `Line` by value and by reference.

use super::types::{ClibLayout, ClibStatus, Line, Point};
use std::ffi::{c_char, c_int, c_void};
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

/// Seed for points handed out by [`clib_point_get`] and [`clib_point_alloc`].
static POINT_COUNTER: AtomicI32 = AtomicI32::new(0);

/// Steps taken by [`clib_point_default`].
static DEFAULT_COUNTER: AtomicI32 = AtomicI32::new(0);

/// Lines this copy of the library has written to stdout.
static DISPLAYED: AtomicUsize = AtomicUsize::new(0);

/// Write one display line to the process stdout, the way the C demos'
/// `printf` did. Goes straight to the stream, independent of any logger the
/// host process installed.
fn display(args: fmt::Arguments<'_>) {
    let mut out = std::io::stdout().lock();
    if let Err(e) = writeln!(out, "{}", args) {
        log::warn!("native display failed: {}", e);
        return;
    }
    DISPLAYED.fetch_add(1, Ordering::SeqCst);
    log::debug!("displayed: {}", args);
}

fn next_point() -> Point {
    let base = POINT_COUNTER.fetch_add(2, Ordering::SeqCst);
    Point::new(base, base.wrapping_add(1))
}

/// Copy `text` into a caller buffer, snprintf-style.
///
/// Writes at most `len - 1` bytes plus a NUL and returns the full length of
/// `text`, so a return value `>= len` means the output was truncated.
unsafe fn write_text(text: &str, buf: *mut c_char, len: usize) -> usize {
    let bytes = text.as_bytes();
    if !buf.is_null() && len > 0 {
        let n = bytes.len().min(len - 1);
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf as *mut u8, n);
        *buf.add(n) = 0;
    }
    bytes.len()
}

/// Display a point passed by value.
#[no_mangle]
pub extern "C" fn clib_point_show(point: Point) {
    display(format_args!("Point in native code is {}", point));
}

/// Display a point passed by reference.
///
/// # Safety
/// `point` must be null or valid for reads.
#[no_mangle]
pub unsafe extern "C" fn clib_point_show_ref(point: *const Point) {
    if let Some(p) = point.as_ref() {
        clib_point_show(*p);
    }
}

/// Display a line passed by value.
#[no_mangle]
pub extern "C" fn clib_line_show(line: Line) {
    display(format_args!("Line in native code is {}", line));
}

/// Increment a point received by value. The caller's copy is untouched.
#[no_mangle]
pub extern "C" fn clib_point_move(mut point: Point) {
    clib_point_show(point);
    point.step();
    clib_point_show(point);
}

/// Increment a point in place.
///
/// # Safety
/// `point` must be null or valid for reads and writes.
#[no_mangle]
pub unsafe extern "C" fn clib_point_move_ref(point: *mut Point) {
    if let Some(p) = point.as_mut() {
        clib_point_show(*p);
        p.step();
        clib_point_show(*p);
    }
}

/// Increment both endpoints of a line in place.
///
/// # Safety
/// `line` must be null or valid for reads and writes.
#[no_mangle]
pub unsafe extern "C" fn clib_line_move_ref(line: *mut Line) {
    if let Some(l) = line.as_mut() {
        clib_line_show(*l);
        clib_point_move_ref(&mut l.start);
        clib_point_move_ref(&mut l.end);
        clib_line_show(*l);
    }
}

/// Return a fresh point by value: `(n, n + 1)` with `n` advancing by two.
#[no_mangle]
pub extern "C" fn clib_point_get() -> Point {
    let point = next_point();
    display(format_args!("Returning Point {}", point));
    point
}

/// Build a point from native-side coordinates.
#[no_mangle]
pub extern "C" fn clib_point_new(x: c_int, y: c_int) -> Point {
    let point = Point::new(x, y);
    display(format_args!("Returning Point {}", point));
    point
}

/// Return the next default point: `x` counts up from 1 while `y` counts down
/// from 99.
#[no_mangle]
pub extern "C" fn clib_point_default() -> Point {
    let step = DEFAULT_COUNTER.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
    clib_point_new(step, 100i32.wrapping_sub(step))
}

/// Number of display lines written by this copy of the library.
#[no_mangle]
pub extern "C" fn clib_display_count() -> usize {
    DISPLAYED.load(Ordering::SeqCst)
}

/// Return a line made of two fresh points.
#[no_mangle]
pub extern "C" fn clib_line_get() -> Line {
    let start = clib_point_get();
    let end = clib_point_get();
    Line::new(start, end)
}

/// Return a point by value without touching it.
#[no_mangle]
pub extern "C" fn clib_point_echo(point: Point) -> Point {
    point
}

/// Return a line by value without touching it.
#[no_mangle]
pub extern "C" fn clib_line_echo(line: Line) -> Line {
    line
}

/// Allocate a fresh point with the C allocator.
///
/// Returns null if the allocator is exhausted. The result must be released
/// with [`clib_point_free`].
#[no_mangle]
pub extern "C" fn clib_point_alloc() -> *mut Point {
    // SAFETY: plain malloc of a POD struct; initialised below before use.
    let ptr = unsafe { libc::malloc(std::mem::size_of::<Point>()) } as *mut Point;
    if ptr.is_null() {
        log::error!("C allocator returned null for point");
        return ptr;
    }

    let point = next_point();
    unsafe { ptr.write(point) };
    log::debug!("native side allocated point {:p}: {}", ptr, point);
    ptr
}

/// Free a point produced by [`clib_point_alloc`].
///
/// # Safety
/// `point` must be null or a live pointer returned by `clib_point_alloc`.
#[no_mangle]
pub unsafe extern "C" fn clib_point_free(point: *mut Point) {
    if point.is_null() {
        return;
    }
    log::debug!("native side freeing point {:p}: {}", point, *point);
    libc::free(point as *mut c_void);
}

/// Write the display text of a point into `buf`.
///
/// # Safety
/// `buf` must be null or valid for `len` bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn clib_point_format(point: Point, buf: *mut c_char, len: usize) -> usize {
    write_text(&point.to_string(), buf, len)
}

/// Write the display text of a line into `buf`.
///
/// # Safety
/// `buf` must be null or valid for `len` bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn clib_line_format(line: Line, buf: *mut c_char, len: usize) -> usize {
    write_text(&line.to_string(), buf, len)
}

/// Report the layout of `Point` as compiled into this library.
///
/// # Safety
/// `out` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn clib_layout_point(out: *mut ClibLayout) -> ClibStatus {
    if out.is_null() {
        return ClibStatus::NullPointer;
    }
    *out = ClibLayout::point();
    ClibStatus::Ok
}

/// Report the layout of `Line` as compiled into this library.
///
/// # Safety
/// `out` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn clib_layout_line(out: *mut ClibLayout) -> ClibStatus {
    if out.is_null() {
        return ClibStatus::NullPointer;
    }
    *out = ClibLayout::line();
    ClibStatus::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_point_get_is_consecutive() {
        let p = clib_point_get();
        assert_eq!(p.y, p.x + 1);
        assert_eq!(p.x % 2, 0);
    }

    #[test]
    fn test_point_new_keeps_coordinates() {
        assert_eq!(clib_point_new(-4, 9), Point::new(-4, 9));
    }

    #[test]
    fn test_point_default_counts_towards_each_other() {
        let a = clib_point_default();
        let b = clib_point_default();
        assert_eq!(a.x + a.y, 100);
        assert_eq!(b.x + b.y, 100);
        assert!(a.x >= 1);
        assert!(b.x > a.x);
        assert!(b.y < a.y);
    }

    #[test]
    fn test_show_writes_display_line() {
        let before = clib_display_count();
        clib_line_show(Line::new(Point::new(1, 2), Point::new(3, 4)));
        assert!(clib_display_count() > before);
    }

    #[test]
    fn test_move_by_value_leaves_caller_copy() {
        let p = Point::new(5, 6);
        clib_point_move(p);
        assert_eq!(p, Point::new(5, 6));
    }

    #[test]
    fn test_move_by_ref_mutates() {
        let mut p = Point::new(5, 6);
        unsafe { clib_point_move_ref(&mut p) };
        assert_eq!(p, Point::new(6, 7));
    }

    #[test]
    fn test_line_move_ref_moves_both_ends() {
        let mut l = Line::new(Point::new(1, 2), Point::new(3, 4));
        unsafe { clib_line_move_ref(&mut l) };
        assert_eq!(l, Line::new(Point::new(2, 3), Point::new(4, 5)));
    }

    #[test]
    fn test_null_refs_are_ignored() {
        unsafe {
            clib_point_show_ref(std::ptr::null());
            clib_point_move_ref(std::ptr::null_mut());
            clib_line_move_ref(std::ptr::null_mut());
            clib_point_free(std::ptr::null_mut());
        }
    }

    #[test]
    fn test_line_format() {
        let mut buf = [0 as c_char; 32];
        let line = Line::new(Point::new(1, 2), Point::new(3, 4));
        let n = unsafe { clib_line_format(line, buf.as_mut_ptr(), buf.len()) };
        let text = unsafe { CStr::from_ptr(buf.as_ptr()) };
        assert_eq!(n, 14);
        assert_eq!(text.to_str().unwrap(), "(1, 2)->(3, 4)");
    }

    #[test]
    fn test_format_truncates() {
        let mut buf = [0 as c_char; 4];
        let n = unsafe { clib_point_format(Point::new(10, 20), buf.as_mut_ptr(), buf.len()) };
        let text = unsafe { CStr::from_ptr(buf.as_ptr()) };
        assert_eq!(n, 8);
        assert_eq!(text.to_str().unwrap(), "(10");
    }

    #[test]
    fn test_point_alloc_roundtrip() {
        let ptr = clib_point_alloc();
        assert!(!ptr.is_null());
        let p = unsafe { *ptr };
        assert_eq!(p.y, p.x + 1);
        unsafe { clib_point_free(ptr) };
    }

    #[test]
    fn test_layout_report() {
        let mut layout = ClibLayout::default();
        let status = unsafe { clib_layout_point(&mut layout) };
        assert_eq!(status, ClibStatus::Ok);
        assert_eq!(layout, ClibLayout::point());

        let status = unsafe { clib_layout_line(std::ptr::null_mut()) };
        assert_eq!(status, ClibStatus::NullPointer);
    }
}
