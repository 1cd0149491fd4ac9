//! Opaque handles to native-owned memory and the ledger that tracks them.
//!
//! Every address the native allocator hands out is admitted here before the
//! caller sees it, and retired here before it goes back to the native
//! deallocator. A retire that does not match a live admission never reaches
//! native code.

use crate::error::{BridgeError, Result};
use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

/// Serials are unique across every ledger in the process, so a handle from
/// one context, or a stale copy of a reused address, never matches.
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Which native allocator produced a handle, and therefore which native
/// deallocator must consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// `clib_string_alloc` / `clib_string_free`.
    String,
    /// `clib_point_alloc` / `clib_point_free`.
    Point,
}

impl HandleKind {
    pub fn name(&self) -> &'static str {
        match self {
            HandleKind::String => "string",
            HandleKind::Point => "point",
        }
    }
}

/// Opaque reference to memory owned by the native side.
///
/// The address is kept exactly as the allocator returned it. No arithmetic
/// or conversion is offered; the only operations are through the owning
/// [`crate::bridge::Clib`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle {
    addr: NonNull<c_void>,
    kind: HandleKind,
    serial: u64,
}

impl RawHandle {
    /// Wrap a freshly allocated, non-null address.
    pub(crate) fn new<T>(addr: NonNull<T>, kind: HandleKind) -> Self {
        Self {
            addr: addr.cast(),
            kind,
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The untouched address, for passing back across the boundary.
    pub(crate) fn as_ptr<T>(&self) -> *mut T {
        self.addr.as_ptr() as *mut T
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({} {:p} #{})", self.kind.name(), self.addr, self.serial)
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    kind: HandleKind,
    serial: u64,
}

/// Record of the handles a context currently owns.
#[derive(Debug, Default)]
pub struct HandleLedger {
    live: HashMap<NonNull<c_void>, Entry>,
    admitted: u64,
    retired: u64,
}

impl HandleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a handle fresh from the native allocator.
    pub fn admit(&mut self, handle: RawHandle) -> Result<()> {
        if let Some(existing) = self.live.get(&handle.addr) {
            return Err(BridgeError::ContractViolation(format!(
                "allocator returned {:?} while #{} at the same address is still live",
                handle, existing.serial
            )));
        }

        self.live.insert(
            handle.addr,
            Entry {
                kind: handle.kind,
                serial: handle.serial,
            },
        );
        self.admitted += 1;
        log::trace!("admitted {:?}", handle);
        Ok(())
    }

    /// Check that a handle is live and of the expected kind.
    pub fn check(&self, handle: RawHandle, kind: HandleKind) -> Result<()> {
        match self.live.get(&handle.addr) {
            Some(entry) if entry.serial == handle.serial => {
                if entry.kind == kind && handle.kind == kind {
                    Ok(())
                } else {
                    Err(BridgeError::ContractViolation(format!(
                        "{:?} used as a {} handle",
                        handle,
                        kind.name()
                    )))
                }
            }
            _ => Err(BridgeError::ContractViolation(format!(
                "{:?} is not live in this context (already released or never allocated here)",
                handle
            ))),
        }
    }

    /// Remove a handle so it can be passed to its native deallocator.
    ///
    /// Succeeds at most once per admitted handle.
    pub fn retire(&mut self, handle: RawHandle, kind: HandleKind) -> Result<()> {
        self.check(handle, kind)?;
        self.live.remove(&handle.addr);
        self.retired += 1;
        log::trace!("retired {:?}", handle);
        Ok(())
    }

    /// Take every live handle out of the ledger.
    pub fn drain(&mut self) -> Vec<RawHandle> {
        let handles: Vec<RawHandle> = self
            .live
            .drain()
            .map(|(addr, entry)| RawHandle {
                addr,
                kind: entry.kind,
                serial: entry.serial,
            })
            .collect();
        self.retired += handles.len() as u64;
        handles
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    pub fn retired(&self) -> u64 {
        self.retired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_at(slot: &mut u64, kind: HandleKind) -> RawHandle {
        RawHandle::new(NonNull::from(slot), kind)
    }

    #[test]
    fn test_admit_then_retire_once() {
        let mut slot = 0u64;
        let mut ledger = HandleLedger::new();
        let handle = handle_at(&mut slot, HandleKind::String);

        ledger.admit(handle).unwrap();
        assert_eq!(ledger.live_count(), 1);

        ledger.retire(handle, HandleKind::String).unwrap();
        assert_eq!(ledger.live_count(), 0);

        let second = ledger.retire(handle, HandleKind::String);
        assert!(matches!(second, Err(BridgeError::ContractViolation(_))));
        assert_eq!(ledger.admitted(), 1);
        assert_eq!(ledger.retired(), 1);
    }

    #[test]
    fn test_retire_unknown_handle() {
        let mut slot = 0u64;
        let mut ledger = HandleLedger::new();
        let handle = handle_at(&mut slot, HandleKind::Point);

        assert!(matches!(
            ledger.retire(handle, HandleKind::Point),
            Err(BridgeError::ContractViolation(_))
        ));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let mut slot = 0u64;
        let mut ledger = HandleLedger::new();
        let handle = handle_at(&mut slot, HandleKind::String);
        ledger.admit(handle).unwrap();

        assert!(ledger.retire(handle, HandleKind::Point).is_err());
        // Still live: the rejected attempt changed nothing.
        assert_eq!(ledger.live_count(), 1);
        ledger.retire(handle, HandleKind::String).unwrap();
    }

    #[test]
    fn test_stale_copy_of_reused_address() {
        let mut slot = 0u64;
        let mut ledger = HandleLedger::new();
        let first = handle_at(&mut slot, HandleKind::String);
        ledger.admit(first).unwrap();
        ledger.retire(first, HandleKind::String).unwrap();

        // Same address handed out again by the allocator.
        let second = handle_at(&mut slot, HandleKind::String);
        ledger.admit(second).unwrap();

        assert!(ledger.retire(first, HandleKind::String).is_err());
        ledger.retire(second, HandleKind::String).unwrap();
    }

    #[test]
    fn test_duplicate_admission() {
        let mut slot = 0u64;
        let mut ledger = HandleLedger::new();
        let a = handle_at(&mut slot, HandleKind::String);
        let b = handle_at(&mut slot, HandleKind::String);
        ledger.admit(a).unwrap();
        assert!(ledger.admit(b).is_err());
    }

    #[test]
    fn test_drain() {
        let mut a = 0u64;
        let mut b = 0u64;
        let mut ledger = HandleLedger::new();
        ledger.admit(handle_at(&mut a, HandleKind::String)).unwrap();
        ledger.admit(handle_at(&mut b, HandleKind::Point)).unwrap();

        let drained = ledger.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(ledger.live_count(), 0);
        assert_eq!(ledger.retired(), 2);
    }

    #[test]
    fn test_debug_shows_kind() {
        let mut slot = 0u64;
        let handle = handle_at(&mut slot, HandleKind::Point);
        assert!(format!("{:?}", handle).starts_with("RawHandle(point 0x"));
    }
}
