//! # Physical/virtual translation for the frame pool
//!
//! The frame pool hands out and takes back frames as kernel virtual pointers
//! (the kernel can only dereference virtual addresses), but keys the
//! reference table and the `PHYSTOP` check by physical address. A
//! [`PhysMapper`] supplies both directions of that translation.
//!
//! - [`HhdmPhysMapper`]: the kernel's higher-half direct map, `va = HHDM_BASE + pa`.
//! - [`OffsetPhysMapper`]: any direct map with a constant offset, such as an
//!   identity map or a heap-backed region standing in for RAM.
//!
//! ## Example
//! ```rust
//! use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
//! use kernel_pmm::phys_mapper::{HhdmPhysMapper, PhysMapper};
//! use kernel_info::memory::HHDM_BASE;
//!
//! let pa = PhysicalAddress::new(0x0020_3000);
//! let va = HhdmPhysMapper.phys_to_virt(pa);
//! assert_eq!(va.as_u64(), HHDM_BASE + 0x0020_3000);
//! assert_eq!(HhdmPhysMapper.virt_to_phys(va), pa);
//! ```

use kernel_info::memory::HHDM_BASE;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Translation between kernel virtual pointers to RAM and physical addresses.
///
/// Implementations are pure arithmetic: they never touch page tables and
/// never fail. An address outside the mapped window translates to some
/// out-of-range value that the caller's bounds checks reject.
pub trait PhysMapper {
    fn virt_to_phys(&self, va: VirtualAddress) -> PhysicalAddress;
    fn phys_to_virt(&self, pa: PhysicalAddress) -> VirtualAddress;
}

/// [`PhysMapper`] implementation for kernels with a higher-half direct map (HHDM).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct HhdmPhysMapper;

impl PhysMapper for HhdmPhysMapper {
    #[inline]
    fn virt_to_phys(&self, va: VirtualAddress) -> PhysicalAddress {
        PhysicalAddress::new(va.as_u64().wrapping_sub(HHDM_BASE))
    }

    #[inline]
    fn phys_to_virt(&self, pa: PhysicalAddress) -> VirtualAddress {
        VirtualAddress::new(pa.as_u64().wrapping_add(HHDM_BASE))
    }
}

/// Direct map with an arbitrary constant offset: `va = pa + offset` (mod 2^64).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OffsetPhysMapper {
    offset: u64,
}

impl OffsetPhysMapper {
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }

    /// Mapper under which `virt_base` is the virtual alias of `phys_base`.
    #[must_use]
    pub const fn for_region(virt_base: VirtualAddress, phys_base: PhysicalAddress) -> Self {
        Self::new(virt_base.as_u64().wrapping_sub(phys_base.as_u64()))
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

impl PhysMapper for OffsetPhysMapper {
    #[inline]
    fn virt_to_phys(&self, va: VirtualAddress) -> PhysicalAddress {
        PhysicalAddress::new(va.as_u64().wrapping_sub(self.offset))
    }

    #[inline]
    fn phys_to_virt(&self, pa: PhysicalAddress) -> VirtualAddress {
        VirtualAddress::new(pa.as_u64().wrapping_add(self.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_map_is_zero_offset() {
        let m = OffsetPhysMapper::new(0);
        let pa = PhysicalAddress::new(0x5000);
        assert_eq!(m.phys_to_virt(pa).as_u64(), 0x5000);
        assert_eq!(m.virt_to_phys(VirtualAddress::new(0x5000)), pa);
    }

    #[test]
    fn region_mapper_round_trips() {
        let m = OffsetPhysMapper::for_region(
            VirtualAddress::new(0x7f00_0000_0000),
            PhysicalAddress::new(0x0010_0000),
        );
        let va = VirtualAddress::new(0x7f00_0000_3000);
        let pa = m.virt_to_phys(va);
        assert_eq!(pa.as_u64(), 0x0010_3000);
        assert_eq!(m.phys_to_virt(pa), va);
    }

    #[test]
    fn region_mapper_handles_virt_below_phys() {
        // A mapping whose virtual window sits below its physical window
        // needs a wrapping offset.
        let m = OffsetPhysMapper::for_region(VirtualAddress::new(0x1000), PhysicalAddress::new(0x9000));
        assert_eq!(m.virt_to_phys(VirtualAddress::new(0x2000)).as_u64(), 0xA000);
        assert_eq!(m.phys_to_virt(PhysicalAddress::new(0xA000)).as_u64(), 0x2000);
    }

    #[test]
    fn addresses_below_hhdm_translate_out_of_range() {
        let pa = HhdmPhysMapper.virt_to_phys(VirtualAddress::new(0x1000));
        assert!(pa.as_u64() > kernel_info::memory::PHYSTOP);
    }
}
