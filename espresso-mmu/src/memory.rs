// SPDX-FileCopyrightText: 2026 espresso contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! The owning memory context and the typed access layer.
//!
//! [`Memory`] ties together the region table, the translator, and the MMIO
//! registry, and exposes the typed read/write operations the CPU core
//! issues on every memory instruction. Guest values are big-endian in the
//! backing store; every multi-byte access swaps to and from host order.
//!
//! Reads take `&self`, writes and all lifecycle mutation take `&mut self`.
//! That borrow contract is the whole concurrency story: mapping changes
//! require exclusive access, exactly as the hardware requires all cores
//! paused. A multi-core host wraps the context in a lock of its choosing.

use std::sync::atomic::{AtomicU32, Ordering};

use byteorder::{BigEndian, ByteOrder};

use espresso_common::{EAddr, PAddr, Settings, UnmappedPolicy};

use crate::error::{MemoryError, MemoryResult};
use crate::layout::{console_layout, MemoryArea, Region};
use crate::mmio::{is_mmio_address, MmioRegistry};
use crate::region::RegionTable;
use crate::translate::Translator;

/// Unmapped-access diagnostics stop after this many reports.
const UNMAPPED_REPORT_LIMIT: u32 = 32;

/// One guest address space: region table, translation state, MMIO
/// registry, and access policy.
///
/// Contexts are explicitly constructed and owned; any number can coexist
/// in one process.
pub struct Memory {
    regions: RegionTable,
    translator: Translator,
    mmio: MmioRegistry,
    settings: Settings,
    unmapped_reports: AtomicU32,
}

impl Memory {
    /// Build a context over the console's fixed layout with default
    /// settings. `MAP_EARLY` regions are committed immediately.
    pub fn new() -> MemoryResult<Self> {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> MemoryResult<Self> {
        Self::with_regions(console_layout(), settings)
    }

    /// Build a context over an explicit region set. Tests use this to run
    /// several independent address spaces in one process.
    pub fn with_regions(regions: Vec<Region>, settings: Settings) -> MemoryResult<Self> {
        let mut memory = Self {
            regions: RegionTable::new(regions)?,
            translator: Translator::new(),
            mmio: MmioRegistry::new(),
            settings,
            unmapped_reports: AtomicU32::new(0),
        };

        for area in memory.regions.areas() {
            let region = memory.regions.region(area)?;
            if region.is_map_early() && !region.is_mapped() {
                memory.regions.map(area)?;
            }
        }
        Ok(memory)
    }

    // -- Title lifecycle ----------------------------------------------------

    /// Commit every regular region for the incoming title. Already-mapped
    /// regions (the early set) are left alone; OPTIONAL regions are
    /// included only when the settings say so.
    pub fn map_for_title(&mut self) -> MemoryResult<()> {
        for area in self.regions.areas() {
            let region = self.regions.region(area)?;
            if region.is_mapped() {
                continue;
            }
            if region.is_optional() && !self.settings.map_optional_regions {
                continue;
            }
            self.regions.map(area)?;
        }
        Ok(())
    }

    /// Release every title-owned region and restore as-shipped sizes.
    /// `MAP_EARLY` regions survive; the overlay alias is dropped.
    pub fn unload_title(&mut self) -> MemoryResult<()> {
        for area in self.regions.areas() {
            let region = self.regions.region(area)?;
            if region.is_map_early() {
                continue;
            }
            if region.is_mapped() {
                self.regions.unmap(area)?;
            }
            if self.regions.region(area)?.size() != self.regions.region(area)?.init_size() {
                self.regions.reset_size(area)?;
            }
        }
        self.translator.clear_overlay_target();
        Ok(())
    }

    /// Commit the overlay window and point it at `target`.
    pub fn enable_overlay_arena(&mut self, target: PAddr) -> MemoryResult<()> {
        if !self.regions.region(MemoryArea::Overlay)?.is_mapped() {
            self.regions.map(MemoryArea::Overlay)?;
        }
        self.translator.set_overlay_target(target)
    }

    pub fn map_region(&mut self, area: MemoryArea) -> MemoryResult<()> {
        self.regions.map(area)
    }

    pub fn unmap_region(&mut self, area: MemoryArea) -> MemoryResult<()> {
        self.regions.unmap(area)
    }

    pub fn set_region_size(&mut self, area: MemoryArea, size: u32) -> MemoryResult<()> {
        self.regions.set_size(area, size)
    }

    pub fn reset_region_size(&mut self, area: MemoryArea) -> MemoryResult<()> {
        self.regions.reset_size(area)
    }

    // -- Lookup and translation ---------------------------------------------

    #[inline]
    pub fn region_containing(&self, addr: EAddr) -> Option<&Region> {
        self.regions.region_containing(addr)
    }

    pub fn region(&self, area: MemoryArea) -> MemoryResult<&Region> {
        self.regions.region(area)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.regions()
    }

    pub fn is_range_accessible(&self, addr: EAddr, len: u32) -> bool {
        self.regions.is_range_accessible(addr, len)
    }

    pub fn virtual_to_physical(&self, addr: EAddr) -> MemoryResult<PAddr> {
        self.translator.virtual_to_physical(&self.regions, addr)
    }

    pub fn physical_to_virtual(&self, paddr: PAddr) -> MemoryResult<EAddr> {
        self.translator.physical_to_virtual(&self.regions, paddr)
    }

    pub fn set_overlay_target(&mut self, target: PAddr) -> MemoryResult<()> {
        self.translator.set_overlay_target(target)
    }

    pub fn clear_overlay_target(&mut self) {
        self.translator.clear_overlay_target();
    }

    pub fn overlay_target(&self) -> Option<PAddr> {
        self.translator.overlay_target()
    }

    /// The MMIO registry, for dispatch-side consumers.
    pub fn mmio(&self) -> &MmioRegistry {
        &self.mmio
    }

    /// Mutable registry access, for device-model registration at startup.
    pub fn mmio_mut(&mut self) -> &mut MmioRegistry {
        &mut self.mmio
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // -- Typed reads --------------------------------------------------------

    #[inline]
    pub fn read_u8(&self, addr: EAddr) -> MemoryResult<u8> {
        match self.regions.resolve(addr, 1) {
            Ok(bytes) => Ok(bytes[0]),
            Err(err) => self.tolerate_read(addr, err),
        }
    }

    /// 16-bit read. Addresses inside the register banks dispatch to the
    /// MMIO registry instead of memory.
    #[inline]
    pub fn read_u16(&self, addr: EAddr) -> MemoryResult<u16> {
        if is_mmio_address(addr) {
            return Ok(self.mmio.dispatch_read16(addr));
        }
        match self.regions.resolve(addr, 2) {
            Ok(bytes) => Ok(BigEndian::read_u16(bytes)),
            Err(err) => self.tolerate_read(addr, err),
        }
    }

    /// 32-bit read. Addresses inside the register banks dispatch to the
    /// MMIO registry instead of memory.
    #[inline]
    pub fn read_u32(&self, addr: EAddr) -> MemoryResult<u32> {
        if is_mmio_address(addr) {
            return Ok(self.mmio.dispatch_read32(addr));
        }
        match self.regions.resolve(addr, 4) {
            Ok(bytes) => Ok(BigEndian::read_u32(bytes)),
            Err(err) => self.tolerate_read(addr, err),
        }
    }

    /// 64-bit read. Never dispatches MMIO; the register banks are 16/32-bit
    /// spaces.
    #[inline]
    pub fn read_u64(&self, addr: EAddr) -> MemoryResult<u64> {
        match self.regions.resolve(addr, 8) {
            Ok(bytes) => Ok(BigEndian::read_u64(bytes)),
            Err(err) => self.tolerate_read(addr, err),
        }
    }

    #[inline]
    pub fn read_f32(&self, addr: EAddr) -> MemoryResult<f32> {
        Ok(f32::from_bits(self.read_u32(addr)?))
    }

    #[inline]
    pub fn read_f64(&self, addr: EAddr) -> MemoryResult<f64> {
        Ok(f64::from_bits(self.read_u64(addr)?))
    }

    /// 32-bit read that skips the MMIO-window check. For callers that have
    /// already established the address is ordinary memory; on a register
    /// address this reads the shadowed backing bytes instead of the device.
    #[inline]
    pub fn read_u32_direct(&self, addr: EAddr) -> MemoryResult<u32> {
        match self.regions.resolve(addr, 4) {
            Ok(bytes) => Ok(BigEndian::read_u32(bytes)),
            Err(err) => self.tolerate_read(addr, err),
        }
    }

    // -- Typed writes -------------------------------------------------------

    #[inline]
    pub fn write_u8(&mut self, addr: EAddr, value: u8) -> MemoryResult<()> {
        match self.regions.resolve_mut(addr, 1) {
            Ok(bytes) => {
                bytes[0] = value;
                Ok(())
            }
            Err(err) => self.tolerate_write(addr, err),
        }
    }

    #[inline]
    pub fn write_u16(&mut self, addr: EAddr, value: u16) -> MemoryResult<()> {
        if is_mmio_address(addr) {
            self.mmio.dispatch_write16(addr, value);
            return Ok(());
        }
        match self.regions.resolve_mut(addr, 2) {
            Ok(bytes) => {
                BigEndian::write_u16(bytes, value);
                Ok(())
            }
            Err(err) => self.tolerate_write(addr, err),
        }
    }

    #[inline]
    pub fn write_u32(&mut self, addr: EAddr, value: u32) -> MemoryResult<()> {
        if is_mmio_address(addr) {
            self.mmio.dispatch_write32(addr, value);
            return Ok(());
        }
        match self.regions.resolve_mut(addr, 4) {
            Ok(bytes) => {
                BigEndian::write_u32(bytes, value);
                Ok(())
            }
            Err(err) => self.tolerate_write(addr, err),
        }
    }

    #[inline]
    pub fn write_u64(&mut self, addr: EAddr, value: u64) -> MemoryResult<()> {
        match self.regions.resolve_mut(addr, 8) {
            Ok(bytes) => {
                BigEndian::write_u64(bytes, value);
                Ok(())
            }
            Err(err) => self.tolerate_write(addr, err),
        }
    }

    #[inline]
    pub fn write_f32(&mut self, addr: EAddr, value: f32) -> MemoryResult<()> {
        self.write_u32(addr, value.to_bits())
    }

    #[inline]
    pub fn write_f64(&mut self, addr: EAddr, value: f64) -> MemoryResult<()> {
        self.write_u64(addr, value.to_bits())
    }

    /// 32-bit write that skips the MMIO-window check. Must never be used on
    /// an address that could alias a register bank: it would corrupt the
    /// shadowed backing bytes instead of reaching the device model.
    #[inline]
    pub fn write_u32_direct(&mut self, addr: EAddr, value: u32) -> MemoryResult<()> {
        match self.regions.resolve_mut(addr, 4) {
            Ok(bytes) => {
                BigEndian::write_u32(bytes, value);
                Ok(())
            }
            Err(err) => self.tolerate_write(addr, err),
        }
    }

    // -- Bulk access --------------------------------------------------------

    /// Read `len` bytes starting at `addr`, spanning contiguous mapped
    /// regions. The whole range is validated first, so a failure copies
    /// nothing. Bulk access never dispatches MMIO.
    pub fn read_bytes(&self, addr: EAddr, len: u32) -> MemoryResult<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        if !self.regions.is_range_accessible(addr, len) {
            return Err(MemoryError::UnmappedAccess(addr));
        }

        let mut out = Vec::with_capacity(len as usize);
        let mut cursor = addr;
        let mut remaining = len;

        while remaining > 0 {
            let region_end = self
                .regions
                .region_containing(cursor)
                .expect("validated range")
                .end();
            let chunk = remaining.min((region_end - cursor as u64) as u32);
            out.extend_from_slice(self.regions.resolve(cursor, chunk)?);
            cursor = cursor.wrapping_add(chunk);
            remaining -= chunk;
        }
        Ok(out)
    }

    /// Write a byte slice starting at `addr`, spanning contiguous mapped
    /// regions. The whole range is validated first, so a failure writes
    /// nothing. Bulk access never dispatches MMIO.
    pub fn write_bytes(&mut self, addr: EAddr, data: &[u8]) -> MemoryResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let len = u32::try_from(data.len()).map_err(|_| MemoryError::UnmappedAccess(addr))?;
        if !self.regions.is_range_accessible(addr, len) {
            return Err(MemoryError::UnmappedAccess(addr));
        }

        let mut cursor = addr;
        let mut offset = 0usize;

        while offset < data.len() {
            let region_end = self
                .regions
                .region_containing(cursor)
                .expect("validated range")
                .end();
            let chunk = (data.len() - offset).min((region_end - cursor as u64) as usize);
            self.regions
                .resolve_mut(cursor, chunk as u32)?
                .copy_from_slice(&data[offset..offset + chunk]);
            cursor = cursor.wrapping_add(chunk as u32);
            offset += chunk;
        }
        Ok(())
    }

    // -- Internal helpers ---------------------------------------------------

    fn tolerate_read<T: Default>(&self, addr: EAddr, err: MemoryError) -> MemoryResult<T> {
        match (&err, self.settings.unmapped_policy) {
            (MemoryError::UnmappedAccess(_), UnmappedPolicy::Tolerant) => {
                self.report_unmapped(addr, "read");
                Ok(T::default())
            }
            _ => Err(err),
        }
    }

    fn tolerate_write(&self, addr: EAddr, err: MemoryError) -> MemoryResult<()> {
        match (&err, self.settings.unmapped_policy) {
            (MemoryError::UnmappedAccess(_), UnmappedPolicy::Tolerant) => {
                self.report_unmapped(addr, "write");
                Ok(())
            }
            _ => Err(err),
        }
    }

    fn report_unmapped(&self, addr: EAddr, direction: &str) {
        let n = self.unmapped_reports.fetch_add(1, Ordering::Relaxed);
        if n < UNMAPPED_REPORT_LIMIT {
            log::warn!("tolerated guest {} of unmapped address 0x{:08X}", direction, addr);
            if n + 1 == UNMAPPED_REPORT_LIMIT {
                log::warn!("unmapped-access diagnostics suppressed from here on");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{
        LOADER_WORK_BASE, MAIN_DATA_BASE, PRIMARY_RAM_BASE, SHARED_DATA_BASE,
    };
    use crate::mmio::MmioBank;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn make_memory() -> Memory {
        let mut memory = Memory::new().expect("context should build");
        memory.map_for_title().expect("title map should succeed");
        memory
    }

    fn strict_memory() -> Memory {
        let mut memory = Memory::with_settings(Settings {
            unmapped_policy: UnmappedPolicy::Strict,
            ..Settings::default()
        })
        .expect("context should build");
        memory.map_for_title().expect("title map should succeed");
        memory
    }

    // -- Endianness ---------------------------------------------------------

    #[test]
    fn test_endian_contract() {
        let mut memory = make_memory();
        memory.write_u32(MAIN_DATA_BASE, 0x0102_0304).unwrap();
        assert_eq!(
            memory.read_bytes(MAIN_DATA_BASE, 4).unwrap(),
            vec![0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn test_endian_contract_u16() {
        let mut memory = make_memory();
        memory.write_u16(MAIN_DATA_BASE, 0xA1B2).unwrap();
        assert_eq!(memory.read_bytes(MAIN_DATA_BASE, 2).unwrap(), vec![0xA1, 0xB2]);
    }

    // -- Round trips --------------------------------------------------------

    #[test]
    fn test_round_trip_all_widths() {
        let mut memory = make_memory();
        let base = MAIN_DATA_BASE + 0x100;

        memory.write_u8(base, 0xAB).unwrap();
        assert_eq!(memory.read_u8(base).unwrap(), 0xAB);

        memory.write_u16(base + 0x10, 0xBEEF).unwrap();
        assert_eq!(memory.read_u16(base + 0x10).unwrap(), 0xBEEF);

        memory.write_u32(base + 0x20, 0xDEAD_BEEF).unwrap();
        assert_eq!(memory.read_u32(base + 0x20).unwrap(), 0xDEAD_BEEF);

        memory.write_u64(base + 0x30, 0x0123_4567_89AB_CDEF).unwrap();
        assert_eq!(memory.read_u64(base + 0x30).unwrap(), 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn test_round_trip_unaligned() {
        let mut memory = make_memory();
        let addr = MAIN_DATA_BASE + 0x101;

        memory.write_u32(addr, 0xCAFE_BABE).unwrap();
        assert_eq!(memory.read_u32(addr).unwrap(), 0xCAFE_BABE);

        memory.write_u64(addr + 5, 0x1122_3344_5566_7788).unwrap();
        assert_eq!(memory.read_u64(addr + 5).unwrap(), 0x1122_3344_5566_7788);
    }

    #[test]
    fn test_round_trip_floats() {
        let mut memory = make_memory();
        let addr = MAIN_DATA_BASE + 0x200;

        memory.write_f32(addr, 1.5).unwrap();
        assert_eq!(memory.read_f32(addr).unwrap(), 1.5);

        memory.write_f64(addr + 8, -2.25e10).unwrap();
        assert_eq!(memory.read_f64(addr + 8).unwrap(), -2.25e10);

        // Bit-exactness survives a NaN payload.
        memory.write_f64(addr + 0x10, f64::from_bits(0x7FF8_0000_DEAD_BEEF)).unwrap();
        assert_eq!(
            memory.read_f64(addr + 0x10).unwrap().to_bits(),
            0x7FF8_0000_DEAD_BEEF
        );
    }

    // -- MMIO via accessors -------------------------------------------------

    #[test]
    fn test_read_u32_dispatches_mmio() {
        let mut memory = make_memory();
        memory
            .mmio_mut()
            .register_read32(MmioBank::Bank0C, 0x10, |_| 0x5555_AAAA);
        assert_eq!(memory.read_u32(0x0C00_0010).unwrap(), 0x5555_AAAA);
    }

    #[test]
    fn test_write_u32_dispatches_mmio() {
        let mut memory = make_memory();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        memory
            .mmio_mut()
            .register_write32(MmioBank::Bank0D, 0x40, move |addr, value| {
                *sink.lock() = Some((addr, value));
            });

        memory.write_u32(0x0D00_0040, 0x1234_5678).unwrap();
        assert_eq!(*seen.lock(), Some((0x0D00_0040, 0x1234_5678)));
    }

    #[test]
    fn test_unregistered_mmio_read_is_zero() {
        let memory = make_memory();
        assert_eq!(memory.read_u32(0x0C00_0444).unwrap(), 0);
        assert_eq!(memory.read_u16(0x0D00_0006).unwrap(), 0);
    }

    #[test]
    fn test_direct_access_skips_mmio() {
        let mut memory = make_memory();
        memory
            .mmio_mut()
            .register_read32(MmioBank::Bank0C, 0x10, |_| 0xFFFF_FFFF);

        // The register bank is shadowed inside the main code region, so the
        // direct variant reaches the backing bytes underneath the device.
        memory.write_u32_direct(0x0C00_0010, 0x0BAD_F00D).unwrap();
        assert_eq!(memory.read_u32_direct(0x0C00_0010).unwrap(), 0x0BAD_F00D);
        assert_eq!(memory.read_u32(0x0C00_0010).unwrap(), 0xFFFF_FFFF);
    }

    // -- Unmapped policy ----------------------------------------------------

    #[test]
    fn test_tolerant_unmapped_reads_zero() {
        let memory = make_memory();
        // Below the first region.
        assert_eq!(memory.read_u32(0x0000_1000).unwrap(), 0);
        assert_eq!(memory.read_u8(0x0000_1000).unwrap(), 0);
    }

    #[test]
    fn test_tolerant_unmapped_write_ignored() {
        let mut memory = make_memory();
        memory.write_u32(0x0000_1000, 0x1234_5678).unwrap();
        assert_eq!(memory.read_u32(0x0000_1000).unwrap(), 0);
    }

    #[test]
    fn test_strict_unmapped_access_fails() {
        let mut memory = strict_memory();
        assert!(matches!(
            memory.read_u32(0x0000_1000),
            Err(MemoryError::UnmappedAccess(0x0000_1000))
        ));
        assert!(matches!(
            memory.write_u32(0x0000_1000, 0),
            Err(MemoryError::UnmappedAccess(0x0000_1000))
        ));
    }

    #[test]
    fn test_boundary_cross_faults_in_strict_mode() {
        let memory = strict_memory();
        // 4-byte read starting 2 bytes before the end of the shared data
        // region; the next region is not adjacent.
        let addr = SHARED_DATA_BASE + 0x0200_0000 - 2;
        assert!(matches!(
            memory.read_u32(addr),
            Err(MemoryError::UnmappedAccess(_))
        ));
    }

    // -- Bulk access --------------------------------------------------------

    #[test]
    fn test_bulk_round_trip() {
        let mut memory = make_memory();
        let data: Vec<u8> = (0..=255).collect();
        memory.write_bytes(MAIN_DATA_BASE + 0x1000, &data).unwrap();
        assert_eq!(memory.read_bytes(MAIN_DATA_BASE + 0x1000, 256).unwrap(), data);
    }

    #[test]
    fn test_bulk_spans_adjacent_regions() {
        let mut memory = make_memory();
        // Primary RAM runs straight into the loader workspace.
        let addr = LOADER_WORK_BASE - 8;
        assert!(addr > PRIMARY_RAM_BASE);

        let data: Vec<u8> = (0..16u8).collect();
        memory.write_bytes(addr, &data).unwrap();
        assert_eq!(memory.read_bytes(addr, 16).unwrap(), data);
    }

    #[test]
    fn test_bulk_across_gap_fails_without_partial_write() {
        let mut memory = make_memory();
        // Shared data is the last mapped region before a hole.
        let addr = SHARED_DATA_BASE + 0x0200_0000 - 8;
        let data = [0xFFu8; 16];

        assert!(matches!(
            memory.write_bytes(addr, &data),
            Err(MemoryError::UnmappedAccess(_))
        ));
        // The in-range half must be untouched.
        assert_eq!(memory.read_bytes(addr, 8).unwrap(), vec![0u8; 8]);
    }

    // -- Lifecycle ----------------------------------------------------------

    #[test]
    fn test_map_for_title_skips_optional() {
        let memory = make_memory();
        assert!(memory.region(MemoryArea::CodeMain).unwrap().is_mapped());
        assert!(memory.region(MemoryArea::MainData).unwrap().is_mapped());
        assert!(!memory.region(MemoryArea::Overlay).unwrap().is_mapped());
        assert!(!memory.region(MemoryArea::CodeCave).unwrap().is_mapped());
    }

    #[test]
    fn test_map_early_region_mapped_at_construction() {
        let memory = Memory::new().unwrap();
        assert!(memory.region(MemoryArea::EmulatorPrivate).unwrap().is_mapped());
        assert!(!memory.region(MemoryArea::CodeMain).unwrap().is_mapped());
    }

    #[test]
    fn test_unload_title_keeps_early_regions() {
        let mut memory = make_memory();
        memory.unload_title().unwrap();

        assert!(!memory.region(MemoryArea::CodeMain).unwrap().is_mapped());
        assert!(memory.region(MemoryArea::EmulatorPrivate).unwrap().is_mapped());
    }

    #[test]
    fn test_unload_title_resets_sizes_and_overlay() {
        let mut memory = Memory::new().unwrap();
        memory.set_region_size(MemoryArea::MainData, 0x1000_0000).unwrap();
        memory.map_for_title().unwrap();
        memory.enable_overlay_arena(MAIN_DATA_BASE).unwrap();

        memory.unload_title().unwrap();
        assert_eq!(memory.region(MemoryArea::MainData).unwrap().size(), 0x4000_0000);
        assert!(memory.overlay_target().is_none());
    }

    #[test]
    fn test_enable_overlay_arena() {
        let mut memory = make_memory();
        memory.enable_overlay_arena(MAIN_DATA_BASE).unwrap();

        assert!(memory.region(MemoryArea::Overlay).unwrap().is_mapped());
        assert_eq!(memory.overlay_target(), Some(MAIN_DATA_BASE));
        assert_eq!(
            memory.virtual_to_physical(0xA000_0010).unwrap(),
            MAIN_DATA_BASE + 0x10
        );
    }

    #[test]
    fn test_mappable_window_translation_via_context() {
        let memory = make_memory();
        assert_eq!(memory.virtual_to_physical(0x7000_0010).unwrap(), 0x8000_0010);
        assert_eq!(memory.physical_to_virtual(0x8000_0010).unwrap(), 0x7000_0010);
    }

    // -- Independence -------------------------------------------------------

    #[test]
    fn test_contexts_are_independent() {
        let mut a = make_memory();
        let b = make_memory();

        a.write_u32(MAIN_DATA_BASE, 0x1111_2222).unwrap();
        assert_eq!(a.read_u32(MAIN_DATA_BASE).unwrap(), 0x1111_2222);
        assert_eq!(b.read_u32(MAIN_DATA_BASE).unwrap(), 0);
    }

    #[test]
    fn test_range_accessibility_via_context() {
        let memory = make_memory();
        assert!(memory.is_range_accessible(MAIN_DATA_BASE, 0x1000));
        // From low code across the hole before the trampoline area.
        assert!(!memory.is_range_accessible(0x000F_0000, 0x2_0000));
    }
}
