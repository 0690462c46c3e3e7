// SPDX-FileCopyrightText: 2026 espresso contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Region descriptors and the fixed guest address layout.
//!
//! The layout is a structural constant of the emulated console: loaded
//! titles assume these exact base addresses and sizes as ABI, so the
//! values here must never change.

use bitflags::bitflags;
use memmap2::MmapMut;

use espresso_common::{EAddr, PAddr};

// ---------------------------------------------------------------------------
// Fixed address layout
// ---------------------------------------------------------------------------

pub const CODE_LOW_BASE: EAddr = 0x0001_0000;
pub const CODE_LOW_SIZE: u32 = 0x000F_0000;

/// Trampolines and import stubs live here.
pub const CODE_TRAMPOLINE_BASE: EAddr = 0x00E0_0000;
pub const CODE_TRAMPOLINE_SIZE: u32 = 0x0020_0000;

pub const CODE_CAVE_BASE: EAddr = 0x0180_0000;
pub const CODE_CAVE_SIZE: u32 = 0x0040_0000;

pub const CODE_MAIN_BASE: EAddr = 0x0200_0000;
pub const CODE_MAIN_SIZE: u32 = 0x0E00_0000;

pub const MAIN_DATA_BASE: EAddr = 0x1000_0000;
pub const MAIN_DATA_SIZE: u32 = 0x4000_0000;

/// Virtual side of the mappable window. Accesses here relocate to the
/// physical side rather than mapping identity.
pub const MAPPABLE_VIRT_BASE: EAddr = 0x7000_0000;
/// Physical side of the mappable window (translation target, not a region).
pub const MAPPABLE_PHYS_BASE: PAddr = 0x8000_0000;
pub const MAPPABLE_SIZE: u32 = 0x0200_0000;

/// Emulator-internal allocations, invisible to title allocators. Kept below
/// 0x80000000 because some titles treat pointers as signed.
pub const EMULATOR_PRIVATE_BASE: EAddr = 0x7E00_0000;
pub const EMULATOR_PRIVATE_SIZE: u32 = 0x0200_0000;

/// The overlay window aliases a floating physical target (448 MiB).
pub const OVERLAY_BASE: EAddr = 0xA000_0000;
pub const OVERLAY_SIZE: u32 = 448 * 1024 * 1024;

pub const FG_BUCKET_BASE: EAddr = 0xE000_0000;
pub const FG_BUCKET_SIZE: u32 = 0x0400_0000;

pub const TILING_APERTURE_BASE: EAddr = 0xE800_0000;
pub const TILING_APERTURE_SIZE: u32 = 0x0200_0000;

pub const PRIMARY_RAM_BASE: EAddr = 0xF400_0000;
pub const PRIMARY_RAM_SIZE: u32 = 0x0200_0000;

pub const LOADER_WORK_BASE: EAddr = 0xF600_0000;
pub const LOADER_WORK_SIZE: u32 = 0x0200_0000;

pub const SHARED_DATA_BASE: EAddr = 0xF800_0000;
pub const SHARED_DATA_SIZE: u32 = 0x0200_0000;

/// Per-core locked cache windows, 128 KiB each.
pub const LOCKED_CACHE0_BASE: EAddr = 0xFFC0_0000;
pub const LOCKED_CACHE1_BASE: EAddr = 0xFFC4_0000;
pub const LOCKED_CACHE2_BASE: EAddr = 0xFFC8_0000;
pub const LOCKED_CACHE_SIZE: u32 = 0x0002_0000;

// ---------------------------------------------------------------------------
// Area kinds
// ---------------------------------------------------------------------------

/// Identifies which part of the guest address space a region covers.
/// Exactly one region per kind exists in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryArea {
    CodeLow,
    CodeTrampoline,
    CodeCave,
    CodeMain,
    MainData,
    MappableWindow,
    EmulatorPrivate,
    Overlay,
    FgBucket,
    TilingAperture,
    PrimaryRam,
    LoaderWork,
    SharedData,
    LockedCache0,
    LockedCache1,
    LockedCache2,
}

impl std::fmt::Display for MemoryArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CodeLow => write!(f, "CodeLow"),
            Self::CodeTrampoline => write!(f, "CodeTrampoline"),
            Self::CodeCave => write!(f, "CodeCave"),
            Self::CodeMain => write!(f, "CodeMain"),
            Self::MainData => write!(f, "MainData"),
            Self::MappableWindow => write!(f, "MappableWindow"),
            Self::EmulatorPrivate => write!(f, "EmulatorPrivate"),
            Self::Overlay => write!(f, "Overlay"),
            Self::FgBucket => write!(f, "FgBucket"),
            Self::TilingAperture => write!(f, "TilingAperture"),
            Self::PrimaryRam => write!(f, "PrimaryRam"),
            Self::LoaderWork => write!(f, "LoaderWork"),
            Self::SharedData => write!(f, "SharedData"),
            Self::LockedCache0 => write!(f, "LockedCache0"),
            Self::LockedCache1 => write!(f, "LockedCache1"),
            Self::LockedCache2 => write!(f, "LockedCache2"),
        }
    }
}

// ---------------------------------------------------------------------------
// Region flags
// ---------------------------------------------------------------------------

bitflags! {
    /// Mapping behavior flags for a region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegionFlags: u32 {
        /// Backing is committed only on explicit request, not at title load.
        const OPTIONAL = 1 << 0;
        /// Backing is committed when the memory context is constructed,
        /// before any title is loaded.
        const MAP_EARLY = 1 << 1;
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// One named range of the guest virtual address space, together with its
/// host backing once mapped.
///
/// `base` and `init_size` are fixed at construction. `size` may be adjusted
/// by the loader, but only while the region is unmapped.
pub struct Region {
    base: EAddr,
    init_size: u32,
    size: u32,
    area: MemoryArea,
    flags: RegionFlags,
    name: &'static str,
    backing: Option<MmapMut>,
}

impl Region {
    pub fn new(
        base: EAddr,
        size: u32,
        area: MemoryArea,
        name: &'static str,
        flags: RegionFlags,
    ) -> Self {
        Self {
            base,
            init_size: size,
            size,
            area,
            flags,
            name,
            backing: None,
        }
    }

    #[inline]
    pub fn base(&self) -> EAddr {
        self.base
    }

    /// Offset of the last byte + 1. Kept as `u64` so a region ending at the
    /// top of the address space does not wrap.
    #[inline]
    pub fn end(&self) -> u64 {
        self.base as u64 + self.size as u64
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn init_size(&self) -> u32 {
        self.init_size
    }

    #[inline]
    pub fn area(&self) -> MemoryArea {
        self.area
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn flags(&self) -> RegionFlags {
        self.flags
    }

    #[inline]
    pub fn contains(&self, addr: EAddr) -> bool {
        addr >= self.base && (addr as u64) < self.end()
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.backing.is_some()
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.flags.contains(RegionFlags::OPTIONAL)
    }

    #[inline]
    pub fn is_map_early(&self) -> bool {
        self.flags.contains(RegionFlags::MAP_EARLY)
    }

    pub(crate) fn backing(&self) -> Option<&MmapMut> {
        self.backing.as_ref()
    }

    pub(crate) fn backing_mut(&mut self) -> Option<&mut MmapMut> {
        self.backing.as_mut()
    }

    pub(crate) fn set_backing(&mut self, backing: Option<MmapMut>) {
        self.backing = backing;
    }

    pub(crate) fn set_size(&mut self, size: u32) {
        self.size = size;
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("base", &format_args!("0x{:08X}", self.base))
            .field("size", &format_args!("0x{:X}", self.size))
            .field("area", &self.area)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Console layout
// ---------------------------------------------------------------------------

/// Build the console's fixed region set, in address order, all unmapped.
pub fn console_layout() -> Vec<Region> {
    use MemoryArea::*;
    use RegionFlags as F;

    vec![
        Region::new(CODE_LOW_BASE, CODE_LOW_SIZE, CodeLow, "code.low", F::empty()),
        Region::new(
            CODE_TRAMPOLINE_BASE,
            CODE_TRAMPOLINE_SIZE,
            CodeTrampoline,
            "code.trampoline",
            F::empty(),
        ),
        Region::new(CODE_CAVE_BASE, CODE_CAVE_SIZE, CodeCave, "code.cave", F::OPTIONAL),
        Region::new(CODE_MAIN_BASE, CODE_MAIN_SIZE, CodeMain, "code.main", F::empty()),
        Region::new(MAIN_DATA_BASE, MAIN_DATA_SIZE, MainData, "data.main", F::empty()),
        Region::new(
            MAPPABLE_VIRT_BASE,
            MAPPABLE_SIZE,
            MappableWindow,
            "window.mappable",
            F::OPTIONAL,
        ),
        Region::new(
            EMULATOR_PRIVATE_BASE,
            EMULATOR_PRIVATE_SIZE,
            EmulatorPrivate,
            "emulator.private",
            F::MAP_EARLY,
        ),
        Region::new(OVERLAY_BASE, OVERLAY_SIZE, Overlay, "window.overlay", F::OPTIONAL),
        Region::new(FG_BUCKET_BASE, FG_BUCKET_SIZE, FgBucket, "data.fg_bucket", F::empty()),
        Region::new(
            TILING_APERTURE_BASE,
            TILING_APERTURE_SIZE,
            TilingAperture,
            "gpu.tiling_aperture",
            F::empty(),
        ),
        Region::new(PRIMARY_RAM_BASE, PRIMARY_RAM_SIZE, PrimaryRam, "ram.primary", F::empty()),
        Region::new(LOADER_WORK_BASE, LOADER_WORK_SIZE, LoaderWork, "loader.work", F::empty()),
        Region::new(SHARED_DATA_BASE, SHARED_DATA_SIZE, SharedData, "data.shared", F::empty()),
        Region::new(
            LOCKED_CACHE0_BASE,
            LOCKED_CACHE_SIZE,
            LockedCache0,
            "core0.lc",
            F::OPTIONAL,
        ),
        Region::new(
            LOCKED_CACHE1_BASE,
            LOCKED_CACHE_SIZE,
            LockedCache1,
            "core1.lc",
            F::OPTIONAL,
        ),
        Region::new(
            LOCKED_CACHE2_BASE,
            LOCKED_CACHE_SIZE,
            LockedCache2,
            "core2.lc",
            F::OPTIONAL,
        ),
    ]
}
