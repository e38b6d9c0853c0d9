//! # Memory Layout

use kernel_memory_addresses::{PageSize, PhysicalAddress, Size4K};

/// Size of one physical page frame in bytes.
pub const PAGE_SIZE: u64 = Size4K::SIZE;

/// Upper bound of supported physical memory (224 MiB).
///
/// Frames at or above this address are never handed to the allocator. The
/// per-frame reference table is sized from this value, whether or not the
/// machine actually has that much RAM.
pub const PHYSTOP: u64 = 0x0E00_0000;

/// [`PHYSTOP`] as a typed address.
pub const PHYSTOP_ADDRESS: PhysicalAddress = PhysicalAddress::new(PHYSTOP);

/// Number of frame slots in the reference table (`PHYSTOP / PAGE_SIZE`).
#[allow(clippy::cast_possible_truncation)]
pub const NFRAMES: usize = (PHYSTOP / PAGE_SIZE) as usize;

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything you map at [`HHDM_BASE`] + `pa` lets the kernel
/// access physical memory via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Where the kernel image is placed in *physical* memory (LMA) before paging.
/// Usable RAM handed to the allocator starts above the image.
pub const PHYS_LOAD: u64 = 0x0010_0000; // 1 MiB

/// Byte written over every frame as it is returned to the free list, so that
/// stale references to freed memory read obvious garbage.
pub const FREED_PAGE_JUNK: u8 = 0x01;

const _: () = {
    assert!(PHYSTOP.is_multiple_of(PAGE_SIZE));
    assert!(PHYS_LOAD < PHYSTOP);
    assert!(PHYS_LOAD.is_multiple_of(PAGE_SIZE));
    assert!(HHDM_BASE.checked_add(PHYSTOP).is_some());
};
