//! Native library interop through a C ABI.
//!
//! This crate is both sides of a foreign-function boundary:
//!
//! - a native library (`cdylib`) exporting counters, string mutation,
//!   C-allocated strings and `Point`/`Line` functions by value and by
//!   reference;
//! - a caller-side bridge that loads those symbols, marshals structs with an
//!   exact C layout, and tracks native allocations so each is released once,
//!   by the allocator that produced it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Bridge (caller side)         │
//! │  ┌───────────┐  ┌───────────────┐  │
//! │  │   Clib    │  │ ForeignString │  │
//! │  │ (context) │  │ ForeignPoint  │  │
//! │  └───────────┘  └───────────────┘  │
//! │  ┌───────────┐  ┌───────────────┐  │
//! │  │ NativeApi │  │ HandleLedger  │  │
//! │  └───────────┘  └───────────────┘  │
//! └─────────────────────────────────────┘
//!                   │ linked or libloading
//!                   ▼
//! ┌─────────────────────────────────────┐
//! │     Native library (clibrs.h)       │
//! │  C-compatible functions & types     │
//! └─────────────────────────────────────┘
//! ```
//!
//! # C Usage
//!
//! ```c
//! char *s = clib_string_alloc();
//! if (s) {
//!     puts(s);
//!     clib_string_free(s);
//! }
//!
//! Point p = { 5, 6 };
//! clib_point_move_ref(&p);   /* p is now (6, 7) */
//! ```
//!
//! # Rust Usage
//!
//! ```
//! use clibrs::{Clib, ForeignString, Line, Point};
//!
//! let clib = Clib::linked().unwrap();
//! let line = Line::new(Point::new(1, 2), Point::new(3, 4));
//! assert_eq!(clib.format_line(line).unwrap(), "(1, 2)->(3, 4)");
//!
//! let phrase = ForeignString::allocate(&clib).unwrap();
//! let copy = phrase.read();
//! phrase.release();
//! assert_eq!(copy, b"I was written in C");
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod ffi;

// Re-export commonly used items
pub use bridge::{
    Clib, ForeignPoint, ForeignString, HandleKind, NativeApi, RawHandle, WrappedPoint,
};
pub use config::{BridgeConfig, LibrarySource};
pub use error::{BridgeError, Result};

// Re-export FFI types for cbindgen
pub use ffi::types::*;
pub use ffi::geometry::*;
pub use ffi::strings::*;
