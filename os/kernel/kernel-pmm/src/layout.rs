//! # Memory layout seen by the frame pool

use kernel_info::memory::{PAGE_SIZE, PHYSTOP_ADDRESS};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// The two boundaries every freed frame is checked against.
///
/// - `kernel_end`: first virtual address after the loaded kernel image (the
///   linker's `end` symbol). Frames below it belong to the image.
/// - `phys_top`: physical memory limit; frames at or above it are never managed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryLayout {
    kernel_end: VirtualAddress,
    phys_top: PhysicalAddress,
}

impl MemoryLayout {
    #[must_use]
    pub const fn new(kernel_end: VirtualAddress, phys_top: PhysicalAddress) -> Self {
        Self {
            kernel_end,
            phys_top,
        }
    }

    /// The kernel's layout: the given image end and the build-time `PHYSTOP`.
    #[must_use]
    pub const fn kernel(kernel_end: VirtualAddress) -> Self {
        Self::new(kernel_end, PHYSTOP_ADDRESS)
    }

    #[must_use]
    pub const fn kernel_end(&self) -> VirtualAddress {
        self.kernel_end
    }

    #[must_use]
    pub const fn phys_top(&self) -> PhysicalAddress {
        self.phys_top
    }

    /// Number of frame slots a reference table needs to cover `phys_top`.
    #[must_use]
    pub const fn frame_slots(&self) -> u64 {
        self.phys_top.as_u64().div_ceil(PAGE_SIZE)
    }
}
