//! Caller side of the boundary: safe, typed access to the native library.
//!
//! - [`Clib`] owns one opened library and is passed to every call.
//! - [`NativeApi`] holds the resolved entry points.
//! - [`RawHandle`] and [`HandleLedger`] implement single-owner,
//!   single-release tracking of native allocations.
//! - [`ForeignString`] and [`ForeignPoint`] scope an allocation to a value.
//! - [`WrappedPoint`] pairs a Rust-side point with its library.

pub mod api;
pub mod context;
pub mod foreign;
pub mod ledger;
pub mod wrapped;

pub use api::NativeApi;
pub use context::{Clib, LINKED_NAME};
pub use foreign::{ForeignPoint, ForeignString};
pub use ledger::{HandleKind, HandleLedger, RawHandle};
pub use wrapped::WrappedPoint;
