use crate::PageSize;
use core::fmt;
use core::ops::Add;

/// Principal raw memory address ([virtual](super::VirtualAddress) or [physical](super::PhysicalAddress)).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryAddress(u64);

impl MemoryAddress {
    #[inline]
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        const _: () = assert!(
            size_of::<*const ()>() == size_of::<u64>(),
            "pointer size mismatch"
        );
        Self::new(ptr.expose_provenance() as u64)
    }

    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether the address sits exactly on an `S` boundary.
    #[inline]
    #[must_use]
    pub const fn is_aligned<S: PageSize>(self) -> bool {
        self.0 & S::MASK == 0
    }

    /// Number of the `S` page containing this address (`addr >> S::SHIFT`).
    #[inline]
    #[must_use]
    pub const fn page_number<S: PageSize>(self) -> u64 {
        self.0 >> S::SHIFT
    }

    /// Align down to page boundary `S`.
    #[inline]
    #[must_use]
    pub const fn align_down<S: PageSize>(self) -> Self {
        Self(self.0 & !S::MASK)
    }

    /// Align up to page boundary `S`, or `None` if that would wrap the
    /// address space.
    #[inline]
    #[must_use]
    pub const fn checked_align_up<S: PageSize>(self) -> Option<Self> {
        match self.0.checked_add(S::MASK) {
            Some(v) => Some(Self(v & !S::MASK)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u64) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Debug for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 0xHHHH_HHHH_HHHH_HHHH style
        write!(f, "MemoryAddress(0x{:016X})", self.0)
    }
}

impl fmt::Display for MemoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl Add<u64> for MemoryAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}
