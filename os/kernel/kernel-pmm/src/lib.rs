//! # Physical Memory Manager
//!
//! Hands out 4 KiB physical frames for page tables, kernel stacks and pipe
//! buffers, and tracks how many owners each frame has so that address spaces
//! can share frames copy-on-write.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │           Virtual memory / fork (consumer)          │
//! │    • allocate_frame / free_frame                    │
//! │    • refs().increment / decrement when sharing      │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                 FramePool                           │
//! │    • intrusive free list + free count ("kmem" lock) │
//! │    • two-phase bootstrap (locking off, then on)     │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ pool lock, then table lock
//! ┌─────────────────▼───────────────────────────────────┐
//! │                 RefTable                            │
//! │    • one i32 per frame below PHYSTOP ("rtable")     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error model
//!
//! Running out of frames is ordinary and comes back as
//! [`FrameAllocError::OutOfMemory`]. Freeing a bad pointer (misaligned, inside
//! the kernel image, beyond the physical limit) is a kernel bug and panics
//! before any state changes. Reference counts are deliberately unchecked.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
//! use kernel_pmm::{FramePool, MemoryLayout, phys_mapper::OffsetPhysMapper};
//!
//! #[repr(C, align(4096))]
//! struct Ram([u8; 4 * 4096]);
//! let mut ram = Box::new(Ram([0; 4 * 4096]));
//!
//! let base = VirtualAddress::from_ptr(ram.0.as_mut_ptr());
//! let end = base + 4 * 4096;
//! let phys_base = PhysicalAddress::new(0x0010_0000);
//! let layout = MemoryLayout::new(base, phys_base + 4 * 4096);
//! let pool: FramePool<_, 512> = FramePool::new(layout, OffsetPhysMapper::for_region(base, phys_base));
//!
//! pool.refs().init();
//! unsafe {
//!     pool.init_bootstrap(base, base + 2 * 4096);
//!     pool.enable_locking(base + 2 * 4096, end);
//! }
//! assert_eq!(pool.free_page_count(), 4);
//!
//! let frame = pool.allocate_frame().unwrap();
//! let phys = pool.validate_frame(frame).unwrap();
//! assert_eq!(pool.refs().get(phys), 1);
//! unsafe { pool.free_frame(frame) };
//! assert_eq!(pool.refs().get(phys), 0);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod error;
mod free_list;
pub mod layout;
pub mod phys_mapper;
pub mod pool;
pub mod refcount;

pub use error::{FrameAllocError, FreeFrameError, InvariantViolation};
pub use layout::MemoryLayout;
pub use pool::{FramePool, KernelFramePool, PoolPhase};
pub use refcount::RefTable;
