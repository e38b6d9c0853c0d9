use crate::{MemoryAddress, PageSize};
use core::fmt;
use core::ops::Add;
use core::ptr::NonNull;

/// Virtual memory address.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **virtual** addresses.
/// It does not validate canonicality at runtime; it only carries the *kind* of
/// address at the type level so you don't accidentally mix virtual and physical
/// values.
///
/// Kernel code reaches physical frames through a direct map, so a frame handed
/// out by the physical allocator is a `VirtualAddress` that can be turned into
/// a pointer with [`as_mut_ptr`](Self::as_mut_ptr).
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let va = VirtualAddress::new(0xFFFF_FFFF_8000_1234);
/// assert!(!va.is_aligned::<Size4K>());
/// assert_eq!(va.checked_align_up::<Size4K>(), Some(VirtualAddress::new(0xFFFF_FFFF_8000_2000)));
/// assert_eq!(va.checked_add(0xDCC), Some(VirtualAddress::new(0xFFFF_FFFF_8000_2000)));
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(pub(crate) MemoryAddress);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub fn from_nonnull<T>(ptr: NonNull<T>) -> Self {
        Self::from_ptr(ptr.as_ptr())
    }

    #[inline]
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(MemoryAddress::from_ptr(ptr))
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    /// Reinterpret the address as a raw pointer.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn as_ptr<T>(self) -> *const T {
        self.as_u64() as usize as *const T
    }

    /// Reinterpret the address as a mutable raw pointer.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn as_mut_ptr<T>(self) -> *mut T {
        self.as_u64() as usize as *mut T
    }

    #[inline]
    #[must_use]
    pub const fn is_aligned<S: PageSize>(self) -> bool {
        self.0.is_aligned::<S>()
    }

    #[inline]
    #[must_use]
    pub const fn checked_align_up<S: PageSize>(self) -> Option<Self> {
        match self.0.checked_align_up::<S>() {
            Some(a) => Some(Self(a)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u64) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(a) => Some(Self(a)),
            None => None,
        }
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl Add<u64> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}
