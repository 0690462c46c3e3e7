// SPDX-FileCopyrightText: 2026 espresso contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Region table: ownership and lifecycle of all guest memory regions.
//!
//! The table is built once from the fixed layout and lives for the process.
//! Containment lookup runs on every guest memory access, so regions are
//! kept sorted by base address and searched with `partition_point`.
//! Mapping and unmapping happen only at title-load boundaries and may
//! iterate freely.

use memmap2::MmapMut;

use espresso_common::{is_page_aligned, EAddr};

use crate::error::{MemoryError, MemoryResult};
use crate::layout::{MemoryArea, Region};

/// Owns all regions of one guest address space, sorted by base address.
///
/// Callers must serialize map/unmap/resize against all concurrent access;
/// the table itself performs no locking. Holding `&mut RegionTable` is the
/// Rust spelling of "all cores paused".
pub struct RegionTable {
    regions: Vec<Region>,
}

impl RegionTable {
    /// Build a table from a region set, validating alignment and pairwise
    /// disjointness. Violations are configuration defects and fatal.
    pub fn new(mut regions: Vec<Region>) -> MemoryResult<Self> {
        for r in &regions {
            if !is_page_aligned(r.base()) {
                return Err(MemoryError::MisalignedAddress(r.base()));
            }
            if r.size() == 0 || !is_page_aligned(r.size()) {
                return Err(MemoryError::MisalignedSize(r.size()));
            }
        }

        regions.sort_by_key(|r| r.base());

        for pair in regions.windows(2) {
            if pair[0].end() > pair[1].base() as u64 {
                return Err(MemoryError::RegionOverlap {
                    base: pair[1].base(),
                    other: pair[0].base(),
                });
            }
        }

        Ok(Self { regions })
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Commit host backing for a region.
    pub fn map(&mut self, area: MemoryArea) -> MemoryResult<()> {
        let region = self.region_by_area_mut(area)?;
        if region.is_mapped() {
            return Err(MemoryError::AlreadyMapped(area));
        }

        let backing = MmapMut::map_anon(region.size() as usize)
            .map_err(|source| MemoryError::AllocationFailed { area, source })?;
        region.set_backing(Some(backing));

        log::debug!(
            "mapped {} [0x{:08X}..0x{:X})",
            region.name(),
            region.base(),
            region.end(),
        );
        Ok(())
    }

    /// Release a region's backing. Double-unmap is a loader bug and is
    /// surfaced rather than ignored.
    pub fn unmap(&mut self, area: MemoryArea) -> MemoryResult<()> {
        let region = self.region_by_area_mut(area)?;
        if !region.is_mapped() {
            return Err(MemoryError::NotMapped(area));
        }
        region.set_backing(None);

        log::debug!(
            "unmapped {} [0x{:08X}..0x{:X})",
            region.name(),
            region.base(),
            region.end(),
        );
        Ok(())
    }

    /// Adjust a region's size. Only legal while unmapped, and the new end
    /// must not collide with the next region.
    pub fn set_size(&mut self, area: MemoryArea, new_size: u32) -> MemoryResult<()> {
        let idx = self.index_by_area(area)?;
        if self.regions[idx].is_mapped() {
            return Err(MemoryError::InvalidState(area));
        }
        if new_size == 0 || !is_page_aligned(new_size) {
            return Err(MemoryError::MisalignedSize(new_size));
        }

        let new_end = self.regions[idx].base() as u64 + new_size as u64;
        if let Some(next) = self.regions.get(idx + 1) {
            if new_end > next.base() as u64 {
                return Err(MemoryError::RegionOverlap {
                    base: self.regions[idx].base(),
                    other: next.base(),
                });
            }
        }
        if new_end > u32::MAX as u64 + 1 {
            return Err(MemoryError::MisalignedSize(new_size));
        }

        self.regions[idx].set_size(new_size);
        Ok(())
    }

    /// Restore a region's size to its as-shipped value.
    pub fn reset_size(&mut self, area: MemoryArea) -> MemoryResult<()> {
        let region = self.region_by_area_mut(area)?;
        if region.is_mapped() {
            return Err(MemoryError::InvalidState(area));
        }
        let init = region.init_size();
        region.set_size(init);
        Ok(())
    }

    // -- Lookup -------------------------------------------------------------

    /// Region containing `addr`, mapped or not.
    #[inline]
    pub fn region_containing(&self, addr: EAddr) -> Option<&Region> {
        self.region_index(addr).map(|i| &self.regions[i])
    }

    /// Region with the given area kind.
    pub fn region(&self, area: MemoryArea) -> MemoryResult<&Region> {
        self.index_by_area(area).map(|i| &self.regions[i])
    }

    /// Resolve `[addr, addr + len)` to the backing bytes.
    ///
    /// This is the hottest path in the subsystem. Fails with
    /// `UnmappedAccess` if the range is outside every region, inside an
    /// unmapped region, or crosses the containing region's end (the guest
    /// ABI leaves boundary-crossing single accesses undefined; faulting is
    /// the safe reading).
    #[inline]
    pub fn resolve(&self, addr: EAddr, len: u32) -> MemoryResult<&[u8]> {
        let region = self
            .region_index(addr)
            .map(|i| &self.regions[i])
            .ok_or(MemoryError::UnmappedAccess(addr))?;
        if addr as u64 + len as u64 > region.end() {
            return Err(MemoryError::UnmappedAccess(addr));
        }
        let backing = region
            .backing()
            .ok_or(MemoryError::UnmappedAccess(addr))?;
        let offset = (addr - region.base()) as usize;
        Ok(&backing[offset..offset + len as usize])
    }

    /// Mutable variant of [`resolve`](Self::resolve).
    #[inline]
    pub fn resolve_mut(&mut self, addr: EAddr, len: u32) -> MemoryResult<&mut [u8]> {
        let idx = self
            .region_index(addr)
            .ok_or(MemoryError::UnmappedAccess(addr))?;
        let region = &mut self.regions[idx];
        if addr as u64 + len as u64 > region.end() {
            return Err(MemoryError::UnmappedAccess(addr));
        }
        let base = region.base();
        let backing = region
            .backing_mut()
            .ok_or(MemoryError::UnmappedAccess(addr))?;
        let offset = (addr - base) as usize;
        Ok(&mut backing[offset..offset + len as usize])
    }

    /// True iff every byte of `[addr, addr + len)` is backed by mapped
    /// memory. Contiguous mapped regions coalesce; any gap fails the whole
    /// range even when both endpoints resolve.
    pub fn is_range_accessible(&self, addr: EAddr, len: u32) -> bool {
        let end = addr as u64 + len as u64;
        let mut cursor = addr as u64;

        while cursor < end {
            if cursor > u32::MAX as u64 {
                return false;
            }
            match self.region_containing(cursor as EAddr) {
                Some(region) if region.is_mapped() => cursor = region.end(),
                _ => return false,
            }
        }
        true
    }

    /// All regions in address order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Area kinds present in this table, in address order. Used by batch
    /// lifecycle operations that need to call `map`/`unmap` per region.
    pub(crate) fn areas(&self) -> Vec<MemoryArea> {
        self.regions.iter().map(|r| r.area()).collect()
    }

    // -- Internal helpers ---------------------------------------------------

    #[inline]
    fn region_index(&self, addr: EAddr) -> Option<usize> {
        let idx = self.regions.partition_point(|r| r.base() <= addr);
        if idx == 0 {
            return None;
        }
        let candidate = idx - 1;
        if (addr as u64) < self.regions[candidate].end() {
            Some(candidate)
        } else {
            None
        }
    }

    fn index_by_area(&self, area: MemoryArea) -> MemoryResult<usize> {
        self.regions
            .iter()
            .position(|r| r.area() == area)
            .ok_or(MemoryError::UnknownArea(area))
    }

    fn region_by_area_mut(&mut self, area: MemoryArea) -> MemoryResult<&mut Region> {
        let idx = self.index_by_area(area)?;
        Ok(&mut self.regions[idx])
    }
}
