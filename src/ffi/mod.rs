//! The native library: C-compatible functions exported with `#[no_mangle]`.
//!
//! Built as the `cdylib` artifact, these are the symbols any foreign caller
//! (including [`crate::bridge`]) resolves. `build.rs` generates `clibrs.h`
//! from them.

pub mod geometry;
pub mod strings;
pub mod types;

pub use geometry::*;
pub use strings::*;
pub use types::*;
