//! # Frame pool
//!
//! The free list of 4 KiB frames, its length, and the reference table, kept
//! consistent with each other across cores.
//!
//! ## Phases
//!
//! ```text
//! Uninitialized ──init_bootstrap──▶ Bootstrap ──enable_locking──▶ Locked
//!                                   (no locks)                    (pool lock, then rtable lock)
//! ```
//!
//! The kernel seeds the pool in two passes. The first runs on the boot core
//! while only the early page table is live, and frames the memory that table
//! maps. Locking is off: no other core runs yet. The second pass frees the
//! rest of RAM once the full direct map is installed, then switches locking
//! on for good. Phase changes are checked at runtime; going backwards or
//! skipping a phase panics.
//!
//! ## Transitions of a frame
//!
//! A frame entering the pool gets reference count 0; a frame leaving it gets
//! count 1. Both the list update and the count update happen inside one
//! critical section holding the pool lock and the table lock together, so no
//! core ever observes one without the other.

use core::fmt;
use core::ptr;
use core::sync::atomic::{AtomicU8, Ordering};
use kernel_info::memory::{FREED_PAGE_JUNK, HHDM_BASE, NFRAMES, PAGE_SIZE};
use kernel_memory_addresses::{PhysicalAddress, Size4K, VirtualAddress};
use kernel_sync::SpinLock;
use log::{info, trace, warn};

use crate::error::{FrameAllocError, FreeFrameError, InvariantViolation};
use crate::free_list::FreeList;
use crate::layout::MemoryLayout;
use crate::phys_mapper::{HhdmPhysMapper, PhysMapper};
use crate::refcount::{RefCounts, RefTable};

#[allow(clippy::cast_possible_truncation)]
const PAGE_BYTES: usize = PAGE_SIZE as usize;

/// The kernel's pool: HHDM-mapped frames below `PHYSTOP`.
pub type KernelFramePool = FramePool<HhdmPhysMapper, NFRAMES>;

const _: () = assert!(
    MemoryLayout::kernel(VirtualAddress::new(HHDM_BASE)).frame_slots() <= NFRAMES as u64,
    "NFRAMES must cover PHYSTOP"
);

/// Initialization phase of a [`FramePool`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolPhase {
    /// Constructed, never seeded. Allocating or freeing is a bug.
    Uninitialized = 0,
    /// Seeded by the boot core; locking disabled.
    Bootstrap = 1,
    /// Terminal; every list access takes the locks.
    Locked = 2,
}

impl PoolPhase {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Uninitialized,
            1 => Self::Bootstrap,
            _ => Self::Locked,
        }
    }
}

/// Physical frame allocator with per-frame reference counts.
///
/// `FRAMES` is the number of reference table slots; it must cover the
/// layout's physical limit.
pub struct FramePool<M, const FRAMES: usize> {
    layout: MemoryLayout,
    mapper: M,
    phase: AtomicU8,
    free: SpinLock<FreeList>,
    refs: RefTable<FRAMES>,
}

impl<M: PhysMapper, const FRAMES: usize> FramePool<M, FRAMES> {
    /// An empty, uninitialized pool.
    ///
    /// # Panics
    /// If `FRAMES` table slots do not cover `layout.phys_top()`.
    #[must_use]
    pub const fn new(layout: MemoryLayout, mapper: M) -> Self {
        assert!(
            layout.frame_slots() <= FRAMES as u64,
            "kmem: reference table does not cover the physical memory limit"
        );
        Self {
            layout,
            mapper,
            phase: AtomicU8::new(PoolPhase::Uninitialized as u8),
            free: SpinLock::named("kmem", FreeList::new()),
            refs: RefTable::new(),
        }
    }

    #[inline]
    pub fn phase(&self) -> PoolPhase {
        PoolPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub const fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    /// The reference table, for callers sharing frames between owners.
    pub const fn refs(&self) -> &RefTable<FRAMES> {
        &self.refs
    }

    /// First initialization pass: enter bootstrap mode and free `[start, end)`.
    ///
    /// Returns the number of frames added.
    ///
    /// # Safety
    /// - Until [`enable_locking`](Self::enable_locking) returns, only the calling
    ///   core may use this pool; nothing here takes a lock.
    /// - Every full page in `[start, end)` must be unused RAM that the pool may
    ///   overwrite and keep.
    ///
    /// # Panics
    /// If the reference table was not initialized, or the pool already left
    /// [`PoolPhase::Uninitialized`].
    pub unsafe fn init_bootstrap(&self, start: VirtualAddress, end: VirtualAddress) -> usize {
        assert!(self.refs.is_ready(), "kinit1: reference table used before init");
        self.advance(PoolPhase::Uninitialized, PoolPhase::Bootstrap);
        let added = unsafe { self.free_range(start, end) };
        info!(
            "kinit1: {added} frames from {start} to {end}, {} free, locking disabled",
            self.free_page_count()
        );
        added
    }

    /// Second initialization pass: free `[start, end)` and switch locking on.
    ///
    /// Returns the number of frames added.
    ///
    /// # Safety
    /// Same as [`init_bootstrap`](Self::init_bootstrap); the single-core
    /// guarantee may end once this returns.
    ///
    /// # Panics
    /// Unless the pool is in [`PoolPhase::Bootstrap`].
    pub unsafe fn enable_locking(&self, start: VirtualAddress, end: VirtualAddress) -> usize {
        let phase = self.phase();
        assert!(
            phase == PoolPhase::Bootstrap,
            "kinit2: pool must be in bootstrap mode, found {phase:?}"
        );
        let added = unsafe { self.free_range(start, end) };
        self.advance(PoolPhase::Bootstrap, PoolPhase::Locked);
        info!(
            "kinit2: {added} frames from {start} to {end}, {} free, locking enabled",
            self.free_page_count()
        );
        added
    }

    fn advance(&self, from: PoolPhase, to: PoolPhase) {
        // Release publishes everything the boot core wrote while unlocked.
        if let Err(actual) =
            self.phase
                .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
        {
            panic!(
                "kmem: cannot enter {to:?} from {:?}",
                PoolPhase::from_u8(actual)
            );
        }
    }

    /// Free every full page in `[start, end)`, rounding `start` up to a page
    /// boundary. Returns the number of frames freed. Only the two
    /// initialization passes seed ranges.
    ///
    /// # Safety
    /// Each of those pages must satisfy the contract of [`free_frame`](Self::free_frame).
    unsafe fn free_range(&self, start: VirtualAddress, end: VirtualAddress) -> usize {
        let Some(mut frame) = start.checked_align_up::<Size4K>() else {
            return 0;
        };
        let mut added = 0;
        while let Some(next) = frame.checked_add(PAGE_SIZE) {
            if next > end {
                break;
            }
            unsafe { self.free_frame(frame) };
            added += 1;
            frame = next;
        }
        trace!("kmem: freed {added} frames in {start}..{end}");
        added
    }

    /// Check that `frame` may be handed to [`free_frame`](Self::free_frame)
    /// and return its physical address.
    ///
    /// # Errors
    /// The first violated precondition: alignment, kernel image bound, or
    /// physical limit, in that order.
    pub fn validate_frame(&self, frame: VirtualAddress) -> Result<PhysicalAddress, FreeFrameError> {
        if !frame.is_aligned::<Size4K>() {
            return Err(FreeFrameError::Misaligned(frame));
        }
        let kernel_end = self.layout.kernel_end();
        if frame < kernel_end {
            return Err(FreeFrameError::BelowKernelImage { frame, kernel_end });
        }
        let phys = self.mapper.virt_to_phys(frame);
        let phys_top = self.layout.phys_top();
        if phys >= phys_top {
            return Err(FreeFrameError::AbovePhysTop {
                frame,
                phys,
                phys_top,
            });
        }
        Ok(phys)
    }

    /// Return a frame to the pool.
    ///
    /// The frame is filled with junk, linked in at the head of the free list
    /// and its reference count reset to 0.
    ///
    /// # Safety
    /// `frame` must be a frame obtained from [`allocate_frame`](Self::allocate_frame)
    /// (or unused RAM during initialization) that is not already free, and no
    /// references into it may be used afterwards.
    ///
    /// # Panics
    /// If [`validate_frame`](Self::validate_frame) rejects `frame`, or the pool
    /// is uninitialized. Nothing is modified in either case.
    pub unsafe fn free_frame(&self, frame: VirtualAddress) {
        let phys = match self.validate_frame(frame) {
            Ok(phys) => phys,
            Err(e) => panic!("kfree: {e}"),
        };
        let phase = self.expect_initialized("kfree");

        // Fill with junk to catch dangling refs.
        unsafe {
            ptr::write_bytes(frame.as_mut_ptr::<u8>(), FREED_PAGE_JUNK, PAGE_BYTES);
        }

        unsafe {
            self.with_both(phase, |list, counts| {
                list.push(frame);
                counts.set(phys, 0);
            });
        }
    }

    /// Take one frame out of the pool. Its reference count becomes 1.
    ///
    /// # Errors
    /// [`FrameAllocError::OutOfMemory`] if the pool is empty.
    ///
    /// # Panics
    /// If the pool is uninitialized.
    pub fn allocate_frame(&self) -> Result<VirtualAddress, FrameAllocError> {
        let phase = self.expect_initialized("kalloc");
        let frame = unsafe {
            self.with_both(phase, |list, counts| -> Option<VirtualAddress> {
                let frame = list.pop()?;
                counts.set(self.mapper.virt_to_phys(frame), 1);
                Some(frame)
            })
        };
        frame.ok_or_else(|| {
            warn!("kalloc: out of physical frames");
            FrameAllocError::OutOfMemory
        })
    }

    /// Number of frames on the free list.
    pub fn free_page_count(&self) -> usize {
        match self.phase() {
            PoolPhase::Uninitialized => 0,
            // SAFETY: bootstrap contract; only the boot core is running.
            PoolPhase::Bootstrap => unsafe { self.free.get_unchecked() }.len(),
            PoolPhase::Locked => self.free.lock().len(),
        }
    }

    /// Walk the free list and verify that its length matches the free count
    /// and that every listed frame is valid with reference count 0.
    ///
    /// Returns the number of free frames. Holds both locks for the whole walk.
    ///
    /// # Errors
    /// The first [`InvariantViolation`] encountered.
    pub fn check_invariants(&self) -> Result<usize, InvariantViolation> {
        let phase = self.phase();
        if phase == PoolPhase::Uninitialized {
            return Ok(0);
        }
        unsafe {
            self.with_both(phase, |list, counts| -> Result<usize, InvariantViolation> {
                let recorded = list.len();
                let mut reachable = 0;
                // A cycle shows up as one entry more than recorded.
                for frame in list.iter().take(recorded + 1) {
                    reachable += 1;
                    let phys = self.validate_frame(frame)?;
                    let count = counts.get(phys);
                    if count != 0 {
                        return Err(InvariantViolation::NonZeroRefCount { frame, count });
                    }
                }
                if reachable == recorded {
                    Ok(recorded)
                } else {
                    Err(InvariantViolation::CountMismatch {
                        recorded,
                        reachable,
                    })
                }
            })
        }
    }

    fn expect_initialized(&self, op: &str) -> PoolPhase {
        let phase = self.phase();
        assert!(
            phase != PoolPhase::Uninitialized,
            "{op}: frame pool used before kinit1"
        );
        phase
    }

    /// Run `f` with the free list and the counters, locked according to `phase`.
    ///
    /// # Safety
    /// `phase` must be the current phase and not [`PoolPhase::Uninitialized`].
    unsafe fn with_both<R>(
        &self,
        phase: PoolPhase,
        f: impl FnOnce(&mut FreeList, &mut RefCounts<FRAMES>) -> R,
    ) -> R {
        if phase == PoolPhase::Locked {
            // Pool lock first, then the table lock.
            let mut list = self.free.lock();
            let mut counts = self.refs.lock();
            f(&mut *list, &mut *counts)
        } else {
            // SAFETY: bootstrap contract; no other core touches the pool.
            let list = unsafe { self.free.get_unchecked() };
            let counts = unsafe { self.refs.counts_unchecked() };
            f(list, counts)
        }
    }
}

impl<M: fmt::Debug, const FRAMES: usize> fmt::Debug for FramePool<M, FRAMES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePool")
            .field("phase", &PoolPhase::from_u8(self.phase.load(Ordering::Relaxed)))
            .field("layout", &self.layout)
            .field("mapper", &self.mapper)
            .field("frames", &FRAMES)
            .finish_non_exhaustive()
    }
}
