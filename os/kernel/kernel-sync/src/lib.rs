//! # Kernel synchronization primitives
//!
//! A busy-waiting [`SpinLock`] for short critical sections shared between
//! cores. Locks carry a name for diagnostics, and offer an explicit
//! [`SpinLock::get_unchecked`] escape hatch for single-core early boot.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;

pub use spin_lock::{SpinLock, SpinLockGuard};
