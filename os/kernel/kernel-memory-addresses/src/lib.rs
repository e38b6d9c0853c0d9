//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw memory addresses used by the physical
//! memory manager and the code that consumes its frames.
//!
//! ## Overview
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`MemoryAddress`] | A raw 64-bit address, either physical or virtual. |
//! | [`VirtualAddress`] | Kernel-visible (page-table translated) address, e.g. a direct-map pointer to a frame. |
//! | [`PhysicalAddress`] | Physical RAM address; keys per-frame bookkeeping via [`PhysicalAddress::frame_number`]. |
//!
//! Page granularity is carried by marker types implementing [`PageSize`]. The
//! frame allocator only deals in [`Size4K`] frames.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let end_of_image = VirtualAddress::new(0xFFFF_8880_0011_2345);
//! let first_frame = end_of_image.checked_align_up::<Size4K>().unwrap();
//! assert!(first_frame.is_aligned::<Size4K>());
//! assert_eq!(first_frame.as_u64(), 0xFFFF_8880_0011_3000);
//!
//! let pa = PhysicalAddress::new(0x0011_3000);
//! assert_eq!(pa.frame_number::<Size4K>(), 0x113);
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord`, and
//!   `Hash`.
//! - Alignment helpers are `const fn`; rounding up is checked so that an address
//!   near the top of the address space never silently wraps to zero.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

mod memory_address;
mod page_size;
mod physical_address;
mod virtual_address;

pub use memory_address::MemoryAddress;
pub use page_size::{PageSize, Size4K};
pub use physical_address::PhysicalAddress;
pub use virtual_address::VirtualAddress;
