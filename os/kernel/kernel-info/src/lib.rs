//! # Kernel Configuration
//!
//! Compile-time memory layout constants shared by the kernel and its memory
//! management crates. Nothing here is configurable at runtime: the physical
//! memory limit, the page size and the direct-map base are fixed when the
//! kernel is built, and the layout is validated by `const` assertions.
//!
//! ```text
//! Physical Memory Layout:
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Low Memory (< 1MiB)         │
//! PHYS_LOAD   ├─────────────────────────────────┤ 0x0010_0000 (1 MiB)
//!             │       Kernel Image              │
//! end         ├─────────────────────────────────┤ (linker symbol)
//!             │    Available RAM                │
//!             │  (managed by kernel-pmm)        │
//! PHYSTOP     └─────────────────────────────────┘ 0x0E00_0000 (224 MiB)
//! ```
//!
//! The kernel reaches every frame below [`PHYSTOP`](memory::PHYSTOP) through the
//! higher-half direct map at [`HHDM_BASE`](memory::HHDM_BASE).

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
