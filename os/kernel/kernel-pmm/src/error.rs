use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// The only ordinary failure of the allocator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameAllocError {
    #[error("out of physical memory")]
    OutOfMemory,
}

/// Why a pointer cannot be returned to the frame pool.
///
/// Freeing such a pointer is a caller bug; [`FramePool::free_frame`](crate::FramePool::free_frame)
/// panics with this error as the message before touching any state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FreeFrameError {
    #[error("frame {0} is not page aligned")]
    Misaligned(VirtualAddress),
    #[error("frame {frame} lies below the end of the kernel image at {kernel_end}")]
    BelowKernelImage {
        frame: VirtualAddress,
        kernel_end: VirtualAddress,
    },
    #[error("frame {frame} maps to {phys}, at or above the physical limit {phys_top}")]
    AbovePhysTop {
        frame: VirtualAddress,
        phys: PhysicalAddress,
        phys_top: PhysicalAddress,
    },
}

/// A broken free-list invariant found by [`FramePool::check_invariants`](crate::FramePool::check_invariants).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("free count is {recorded} but {reachable} frames are reachable from the list head")]
    CountMismatch { recorded: usize, reachable: usize },
    #[error("free list holds an invalid frame: {0}")]
    InvalidFrame(#[from] FreeFrameError),
    #[error("free frame {frame} has reference count {count}, expected 0")]
    NonZeroRefCount { frame: VirtualAddress, count: i32 },
}
