use crate::{MemoryAddress, PageSize};
use core::fmt;
use core::ops::Add;

/// Physical memory address.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **physical** addresses
/// (host RAM / MMIO). Like [`VirtualAddress`](super::VirtualAddress), this type carries intent and
/// prevents accidental VA/PA mix-ups.
///
/// ### Semantics
/// - [`PhysicalAddress::frame_number`] yields the index of the page frame
///   holding the address, which is how per-frame tables (e.g. reference
///   counts) are keyed.
/// - [`PhysicalAddress::from_frame_number`] is its inverse for frame bases.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x0010_2042);
/// assert_eq!(pa.frame_number::<Size4K>(), 0x102);
/// assert_eq!(pa.align_down::<Size4K>().as_u64(), 0x0010_2000);
/// assert_eq!(PhysicalAddress::from_frame_number::<Size4K>(0x102), pa.align_down::<Size4K>());
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(pub(crate) MemoryAddress);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    /// Base address of frame number `n`.
    #[inline]
    #[must_use]
    pub const fn from_frame_number<S: PageSize>(n: u64) -> Self {
        Self::new(n << S::SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn is_aligned<S: PageSize>(self) -> bool {
        self.0.is_aligned::<S>()
    }

    #[inline]
    #[must_use]
    pub const fn frame_number<S: PageSize>(self) -> u64 {
        self.0.page_number::<S>()
    }

    #[inline]
    #[must_use]
    pub const fn align_down<S: PageSize>(self) -> Self {
        Self(self.0.align_down::<S>())
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}
