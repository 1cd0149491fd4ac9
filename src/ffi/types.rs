//! C-compatible type definitions shared by both sides of the boundary.

use std::ffi::c_int;
use std::fmt;
use std::mem::{align_of, offset_of, size_of};

/// Result status codes for FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClibStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer was passed.
    NullPointer = 1,
}

/// A point with two native integer coordinates.
///
/// Matches `typedef struct { int x; int y; } Point;` field for field.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: c_int,
    pub y: c_int,
}

impl Point {
    pub const fn new(x: c_int, y: c_int) -> Self {
        Self { x, y }
    }

    /// Move both coordinates by one, the way the native move functions do.
    #[inline]
    pub fn step(&mut self) {
        self.x = self.x.wrapping_add(1);
        self.y = self.y.wrapping_add(1);
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A line segment made of two points. No invariant ties `start` to `end`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.start, self.end)
    }
}

/// Layout report for a struct: total size, alignment and the byte offset of
/// each field in declaration order.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClibLayout {
    pub size: usize,
    pub align: usize,
    pub field_count: usize,
    pub offsets: [usize; 4],
}

impl ClibLayout {
    /// Layout of [`Point`] as compiled into this crate.
    pub const fn point() -> Self {
        Self {
            size: size_of::<Point>(),
            align: align_of::<Point>(),
            field_count: 2,
            offsets: [offset_of!(Point, x), offset_of!(Point, y), 0, 0],
        }
    }

    /// Layout of [`Line`] flattened to its four integer fields.
    pub const fn line() -> Self {
        let end = offset_of!(Line, end);
        Self {
            size: size_of::<Line>(),
            align: align_of::<Line>(),
            field_count: 4,
            offsets: [
                offset_of!(Line, start) + offset_of!(Point, x),
                offset_of!(Line, start) + offset_of!(Point, y),
                end + offset_of!(Point, x),
                end + offset_of!(Point, y),
            ],
        }
    }
}

// Two consecutive native ints, no padding.
const _: () = assert!(size_of::<Point>() == 2 * size_of::<c_int>());
const _: () = assert!(offset_of!(Point, x) == 0);
const _: () = assert!(offset_of!(Point, y) == size_of::<c_int>());
const _: () = assert!(size_of::<Line>() == 2 * size_of::<Point>());
const _: () = assert!(offset_of!(Line, end) == size_of::<Point>());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_display() {
        assert_eq!(Point::new(1, 2).to_string(), "(1, 2)");
        assert_eq!(Point::new(-3, 0).to_string(), "(-3, 0)");
    }

    #[test]
    fn test_line_display() {
        let line = Line::new(Point::new(1, 2), Point::new(3, 4));
        assert_eq!(line.to_string(), "(1, 2)->(3, 4)");
    }

    #[test]
    fn test_point_step_wraps() {
        let mut p = Point::new(c_int::MAX, 5);
        p.step();
        assert_eq!(p, Point::new(c_int::MIN, 6));
    }

    #[test]
    fn test_line_layout_offsets() {
        let layout = ClibLayout::line();
        let int = size_of::<c_int>();
        assert_eq!(layout.field_count, 4);
        assert_eq!(layout.offsets, [0, int, 2 * int, 3 * int]);
        assert_eq!(layout.size, 4 * int);
    }
}
