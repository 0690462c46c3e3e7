// SPDX-FileCopyrightText: 2026 espresso contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Virtual ↔ physical guest address translation.
//!
//! Most regions are identity-mapped and translation is the identity
//! function. Two windows are not:
//!
//! - the **mappable window** relocates by a fixed delta
//!   (`0x70000000 ↔ 0x80000000`);
//! - the **overlay window** aliases a floating physical target that the
//!   title-management layer establishes and retargets at runtime.
//!
//! When a physical address has more than one live virtual alias (the
//! overlay target can cover identity-mapped memory), the most-recently
//! established alias wins: a runtime overlay target over the structural
//! window and identity mappings.

use espresso_common::{is_page_aligned, EAddr, PAddr};

use crate::error::{MemoryError, MemoryResult};
use crate::layout::{
    MemoryArea, MAPPABLE_PHYS_BASE, MAPPABLE_SIZE, MAPPABLE_VIRT_BASE, OVERLAY_BASE, OVERLAY_SIZE,
};
use crate::region::RegionTable;

/// Translation state. The only mutable piece is the overlay alias target;
/// updating it is a `&mut` operation, serialized with core execution by the
/// owning context's borrow contract.
#[derive(Debug, Default)]
pub struct Translator {
    overlay_target: Option<PAddr>,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the overlay window at a new physical target.
    pub fn set_overlay_target(&mut self, target: PAddr) -> MemoryResult<()> {
        if !is_page_aligned(target) {
            return Err(MemoryError::MisalignedAddress(target));
        }
        if target as u64 + OVERLAY_SIZE as u64 > u32::MAX as u64 + 1 {
            return Err(MemoryError::OverlayTargetOutOfRange(target));
        }
        log::debug!("overlay target -> 0x{:08X}", target);
        self.overlay_target = Some(target);
        Ok(())
    }

    /// Drop the overlay alias; overlay translation fails until a new target
    /// is established.
    pub fn clear_overlay_target(&mut self) {
        log::debug!("overlay target cleared");
        self.overlay_target = None;
    }

    pub fn overlay_target(&self) -> Option<PAddr> {
        self.overlay_target
    }

    /// Translate a guest virtual address to its physical counterpart.
    ///
    /// Identity for ordinary regions; window formula for the mappable
    /// window; alias-target lookup for the overlay window.
    pub fn virtual_to_physical(&self, table: &RegionTable, addr: EAddr) -> MemoryResult<PAddr> {
        let region = table
            .region_containing(addr)
            .ok_or(MemoryError::UnmappedAccess(addr))?;

        match region.area() {
            MemoryArea::MappableWindow => Ok(addr - MAPPABLE_VIRT_BASE + MAPPABLE_PHYS_BASE),
            MemoryArea::Overlay => match self.overlay_target {
                Some(target) => Ok(target + (addr - OVERLAY_BASE)),
                None => Err(MemoryError::NoPhysicalMapping(addr)),
            },
            _ => Ok(addr),
        }
    }

    /// Translate a physical guest address back to a virtual address,
    /// preferring the most-recently-established alias.
    pub fn physical_to_virtual(&self, table: &RegionTable, paddr: PAddr) -> MemoryResult<EAddr> {
        if let Some(target) = self.overlay_target {
            if paddr >= target && (paddr as u64) < target as u64 + OVERLAY_SIZE as u64 {
                log::trace!("p2v 0x{:08X}: overlay alias wins", paddr);
                return Ok(OVERLAY_BASE + (paddr - target));
            }
        }

        if paddr >= MAPPABLE_PHYS_BASE
            && (paddr as u64) < MAPPABLE_PHYS_BASE as u64 + MAPPABLE_SIZE as u64
        {
            return Ok(paddr - MAPPABLE_PHYS_BASE + MAPPABLE_VIRT_BASE);
        }

        match table.region_containing(paddr) {
            // Window regions have no identity physical presence: their
            // virtual ranges exist only through the translations above.
            Some(region)
                if region.area() != MemoryArea::Overlay
                    && region.area() != MemoryArea::MappableWindow =>
            {
                Ok(paddr)
            }
            _ => Err(MemoryError::UnmappedAccess(paddr)),
        }
    }
}
