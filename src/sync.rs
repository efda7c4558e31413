//! Synchronization primitives, switchable between `std` and `loom`.
//!
//! All mutexes and atomics that participate in cross-thread protocols are
//! imported through this module so the same code can run under loom's model
//! checker (`--features loom`). Metrics counters use `std` atomics directly;
//! they are observational and not part of any protocol.

#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
#[cfg(feature = "loom")]
pub(crate) use loom::sync::{Mutex, MutexGuard};

/// Acquire a mutex, ignoring poisoning.
///
/// A panicking holder leaves the protected structures in a consistent state
/// (all mutations complete before the guard drops on unwind paths we allow),
/// so poisoning carries no information here.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
