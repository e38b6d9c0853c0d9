//! Heap-backed stand-in for physical RAM.
//!
//! An [`Arena`] is a page-aligned heap allocation that plays the role of the
//! direct-mapped RAM window starting at physical address [`PHYS_BASE`]. The
//! first `image_pages` pages of the arena play the kernel image.

#![allow(dead_code)]

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::ptr::NonNull;
use std::sync::Once;

use kernel_info::memory::PHYS_LOAD;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_pmm::phys_mapper::OffsetPhysMapper;
use kernel_pmm::{FramePool, MemoryLayout};
use log::LevelFilter;

pub const PAGE: u64 = 4096;

/// Physical address the arena's first page stands for: the kernel load address.
pub const PHYS_BASE: u64 = PHYS_LOAD;

/// Reference table slots for test pools; covers `PHYS_BASE` plus 256 pages.
pub const FRAMES: usize = 512;

pub type TestPool = FramePool<OffsetPhysMapper, FRAMES>;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Trace)
            .try_init();
    });
}

pub struct Arena {
    base: NonNull<u8>,
    pages: usize,
}

// The arena is plain memory; pools hand out addresses into it across threads.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    pub fn new(pages: usize) -> Self {
        assert!(pages > 0 && pages <= 256);
        let base = unsafe { alloc_zeroed(Self::layout_for(pages)) };
        Self {
            base: NonNull::new(base).expect("arena allocation failed"),
            pages,
        }
    }

    fn layout_for(pages: usize) -> Layout {
        Layout::from_size_align(pages * PAGE as usize, PAGE as usize).unwrap()
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Virtual address of page `n`.
    pub fn va(&self, n: usize) -> VirtualAddress {
        VirtualAddress::from_nonnull(self.base) + n as u64 * PAGE
    }

    /// Physical address page `n` stands for.
    pub fn pa(&self, n: usize) -> PhysicalAddress {
        PhysicalAddress::new(PHYS_BASE + n as u64 * PAGE)
    }

    pub fn end(&self) -> VirtualAddress {
        self.va(self.pages)
    }

    pub fn mapper(&self) -> OffsetPhysMapper {
        OffsetPhysMapper::for_region(self.va(0), PhysicalAddress::new(PHYS_BASE))
    }

    /// Layout with the first `image_pages` pages as kernel image and the
    /// physical limit at the arena's end.
    pub fn layout(&self, image_pages: usize) -> MemoryLayout {
        MemoryLayout::new(self.va(image_pages), self.pa(self.pages))
    }

    /// Index of the page holding `va`.
    pub fn page_of(&self, va: VirtualAddress) -> usize {
        ((va.as_u64() - self.va(0).as_u64()) / PAGE) as usize
    }

    pub fn bytes(&self, n: usize) -> &[u8] {
        assert!(n < self.pages);
        unsafe { std::slice::from_raw_parts(self.va(n).as_ptr::<u8>(), PAGE as usize) }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { dealloc(self.base.as_ptr(), Self::layout_for(self.pages)) }
    }
}

/// A pool over `arena` with an initialized reference table, not yet seeded.
pub fn pool(arena: &Arena, image_pages: usize) -> TestPool {
    init_logger();
    let pool = FramePool::new(arena.layout(image_pages), arena.mapper());
    pool.refs().init();
    pool
}

/// A pool with every arena page after the image seeded, in `Locked` mode.
///
/// The first half goes in during bootstrap, the rest when locking is enabled.
pub fn seeded_pool(arena: &Arena, image_pages: usize) -> TestPool {
    let pool = pool(arena, image_pages);
    let mid = image_pages + (arena.pages() - image_pages) / 2;
    unsafe {
        pool.init_bootstrap(arena.va(image_pages), arena.va(mid));
        pool.enable_locking(arena.va(mid), arena.end());
    }
    pool
}
