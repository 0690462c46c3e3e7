// SPDX-FileCopyrightText: 2026 espresso contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

use espresso_common::{EAddr, PAddr};

use crate::layout::MemoryArea;

/// Errors returned by the memory subsystem.
///
/// Lifecycle variants (`AlreadyMapped`, `NotMapped`, `InvalidState`,
/// `UnknownArea`) indicate broken loader logic and should be surfaced
/// loudly. Access and translation variants are recoverable at the call
/// site: the CPU core decides whether to fault, substitute a default, or
/// abort emulation.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("region base 0x{0:08X} is not page-aligned")]
    MisalignedAddress(EAddr),

    #[error("region size 0x{0:X} is not a non-zero multiple of the page size")]
    MisalignedSize(u32),

    #[error("region at 0x{base:08X} overlaps the region at 0x{other:08X}")]
    RegionOverlap { base: EAddr, other: EAddr },

    #[error("region {0} is already mapped")]
    AlreadyMapped(MemoryArea),

    #[error("region {0} is not mapped")]
    NotMapped(MemoryArea),

    #[error("region {0} cannot be resized while mapped")]
    InvalidState(MemoryArea),

    #[error("no {0} region in this table")]
    UnknownArea(MemoryArea),

    #[error("failed to allocate backing for region {area}: {source}")]
    AllocationFailed {
        area: MemoryArea,
        #[source]
        source: std::io::Error,
    },

    #[error("access to unmapped guest address 0x{0:08X}")]
    UnmappedAccess(EAddr),

    #[error("overlay address 0x{0:08X} has no live alias target")]
    NoPhysicalMapping(EAddr),

    #[error("physical address 0x{0:08X} has multiple live virtual aliases")]
    AmbiguousMapping(PAddr),

    #[error("overlay target 0x{0:08X} leaves no room for the overlay window")]
    OverlayTargetOutOfRange(PAddr),
}

/// Result alias for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
