//! # Per-frame reference counts
//!
//! One signed counter per physical frame number in `[0, FRAMES)`, used to
//! share frames between address spaces (copy-on-write). The table is sized at
//! compile time from the physical memory limit, not from the memory actually
//! present; slots for absent frames simply stay at zero.
//!
//! Counts are **not** range-checked. Decrementing a zero count yields `-1`,
//! and incrementing past `i32::MAX` wraps. Callers owe the table balanced
//! increment/decrement pairs per shared frame, and a count reaching zero is
//! their cue to give the frame back to the pool.

use core::sync::atomic::{AtomicBool, Ordering};
use kernel_memory_addresses::{PhysicalAddress, Size4K};
use kernel_sync::{SpinLock, SpinLockGuard};
use log::info;

/// The raw counters. Only reachable through the [`RefTable`] lock guard (or
/// the pool's bootstrap path), so holding a `&mut RefCounts` means the table
/// lock is held or locking is off. Outside this crate the table is only
/// touched through [`RefTable`]'s self-contained operations.
pub(crate) struct RefCounts<const FRAMES: usize> {
    counts: [i32; FRAMES],
}

impl<const FRAMES: usize> RefCounts<FRAMES> {
    const fn zeroed() -> Self {
        Self { counts: [0; FRAMES] }
    }

    fn slot(pa: PhysicalAddress) -> usize {
        match usize::try_from(pa.frame_number::<Size4K>()) {
            Ok(i) if i < FRAMES => i,
            _ => panic!("rtable: {pa} is beyond the reference table ({FRAMES} frames)"),
        }
    }

    #[must_use]
    pub(crate) fn get(&self, pa: PhysicalAddress) -> i32 {
        self.counts[Self::slot(pa)]
    }

    /// Overwrite the count of the frame holding `pa`.
    ///
    /// Never takes the table lock; the `&mut self` receiver already proves
    /// exclusive access.
    pub(crate) fn set(&mut self, pa: PhysicalAddress, value: i32) {
        self.counts[Self::slot(pa)] = value;
    }

    fn increment(&mut self, pa: PhysicalAddress) {
        let c = &mut self.counts[Self::slot(pa)];
        *c = c.wrapping_add(1);
    }

    fn decrement(&mut self, pa: PhysicalAddress) {
        let c = &mut self.counts[Self::slot(pa)];
        *c = c.wrapping_sub(1);
    }

    fn clear(&mut self) {
        self.counts.fill(0);
    }
}

/// Lock-protected reference count table.
///
/// Must be [`init`](Self::init)ialized once before first use; every other
/// operation panics on an uninitialized table.
pub struct RefTable<const FRAMES: usize> {
    counts: SpinLock<RefCounts<FRAMES>>,
    ready: AtomicBool,
}

impl<const FRAMES: usize> Default for RefTable<FRAMES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const FRAMES: usize> RefTable<FRAMES> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counts: SpinLock::named("rtable", RefCounts::zeroed()),
            ready: AtomicBool::new(false),
        }
    }

    /// Zero every counter and mark the table usable.
    pub fn init(&self) {
        self.counts.lock().clear();
        self.ready.store(true, Ordering::Release);
        info!("rtable: {FRAMES} frame reference counts cleared");
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    #[inline]
    fn assert_ready(&self) {
        assert!(self.is_ready(), "rtable: used before init");
    }

    pub fn increment(&self, pa: PhysicalAddress) {
        self.lock().increment(pa);
    }

    pub fn decrement(&self, pa: PhysicalAddress) {
        self.lock().decrement(pa);
    }

    #[must_use]
    pub fn get(&self, pa: PhysicalAddress) -> i32 {
        self.lock().get(pa)
    }

    /// Acquire the table lock, e.g. to [`set`](RefCounts::set) a count as part
    /// of a larger critical section.
    ///
    /// Crate-internal: the pool lock must already be held when both are
    /// needed, and no caller may hold this guard across a pool operation.
    pub(crate) fn lock(&self) -> SpinLockGuard<'_, RefCounts<FRAMES>> {
        self.assert_ready();
        self.counts.lock()
    }

    /// The counters without taking the lock.
    ///
    /// # Safety
    /// Same contract as [`SpinLock::get_unchecked`]: no other access to the
    /// table, locked or not, may overlap the returned borrow.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn counts_unchecked(&self) -> &mut RefCounts<FRAMES> {
        self.assert_ready();
        unsafe { self.counts.get_unchecked() }
    }
}
