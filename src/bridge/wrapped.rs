//! A point value that carries its library, so each native operation is a
//! method instead of a free call on the context.

use super::context::Clib;
use crate::error::Result;
use crate::ffi::Point;
use std::fmt;

/// A `Point` paired with the library that built and displays it.
///
/// The point lives in Rust memory. By-value calls leave it unchanged and
/// by-reference calls update it in place.
#[derive(Clone, Copy)]
pub struct WrappedPoint<'lib> {
    clib: &'lib Clib,
    point: Point,
}

impl<'lib> WrappedPoint<'lib> {
    /// Build through the native constructor.
    pub fn new(clib: &'lib Clib, x: i32, y: i32) -> Self {
        Self {
            clib,
            point: clib.new_point(x, y),
        }
    }

    /// Take the next native default point.
    pub fn from_native(clib: &'lib Clib) -> Self {
        Self {
            clib,
            point: clib.default_point(),
        }
    }

    pub fn point(&self) -> Point {
        self.point
    }

    pub fn show(&self) {
        self.clib.show_point(self.point);
    }

    /// Native move on a copy. `self` is unchanged afterwards.
    pub fn move_by_value(&self) {
        self.clib.move_point(self.point);
    }

    /// Native move on our own point.
    pub fn move_by_ref(&mut self) {
        self.clib.move_point_ref(&mut self.point);
    }

    /// Text as the native formatter writes it.
    pub fn native_text(&self) -> Result<String> {
        self.clib.format_point(self.point)
    }
}

impl fmt::Display for WrappedPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.point, f)
    }
}

impl fmt::Debug for WrappedPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedPoint")
            .field("library", &self.clib.name())
            .field("point", &self.point)
            .finish()
    }
}
