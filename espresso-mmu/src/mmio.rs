// SPDX-FileCopyrightText: 2026 espresso contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Hardware register dispatch.
//!
//! Two fixed physical windows are reserved for device registers instead of
//! backing memory. Device models register per-offset handlers once at
//! startup; dispatch afterwards is a read-only lookup and safe from every
//! core. Unhandled offsets read as zero and ignore writes, with a
//! once-per-offset diagnostic, so partially-implemented hardware models
//! degrade instead of crashing the title.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use espresso_common::PAddr;

/// Span of each register bank (16 MiB).
pub const MMIO_BANK_SPAN: u32 = 0x0100_0000;

/// The two physical register banks, named by their base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MmioBank {
    Bank0C,
    Bank0D,
}

impl MmioBank {
    #[inline]
    pub const fn base(self) -> PAddr {
        match self {
            Self::Bank0C => 0x0C00_0000,
            Self::Bank0D => 0x0D00_0000,
        }
    }

    /// Split a physical address into `(bank, offset-within-bank)`.
    #[inline]
    pub fn from_physical(paddr: PAddr) -> Option<(Self, u32)> {
        match paddr >> 24 {
            0x0C => Some((Self::Bank0C, paddr & (MMIO_BANK_SPAN - 1))),
            0x0D => Some((Self::Bank0D, paddr & (MMIO_BANK_SPAN - 1))),
            _ => None,
        }
    }
}

/// True if `addr` falls inside either register bank.
#[inline]
pub fn is_mmio_address(addr: PAddr) -> bool {
    matches!(addr >> 24, 0x0C | 0x0D)
}

type ReadHandler16 = Box<dyn Fn(PAddr) -> u16 + Send + Sync>;
type ReadHandler32 = Box<dyn Fn(PAddr) -> u32 + Send + Sync>;
type WriteHandler16 = Box<dyn Fn(PAddr, u16) + Send + Sync>;
type WriteHandler32 = Box<dyn Fn(PAddr, u32) + Send + Sync>;

/// A hardware register with a defined raw 32-bit encoding.
///
/// Lets device models work with structured register values while the
/// dispatch table stays uniform on raw words; see
/// [`MmioRegistry::register_reg32`].
pub trait Register32: Sized {
    fn from_raw(raw: u32) -> Self;
    fn to_raw(&self) -> u32;
}

/// Per-offset handler registry for both register banks.
///
/// Registration happens once at startup (`&mut`); dispatch is `&self` over
/// an effectively-immutable table.
#[derive(Default)]
pub struct MmioRegistry {
    read16: HashMap<(MmioBank, u32), ReadHandler16>,
    read32: HashMap<(MmioBank, u32), ReadHandler32>,
    write16: HashMap<(MmioBank, u32), WriteHandler16>,
    write32: HashMap<(MmioBank, u32), WriteHandler32>,
    /// Offsets already reported as unhandled, to keep the log readable.
    unhandled_seen: Mutex<HashSet<(MmioBank, u32)>>,
}

impl MmioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Registration -------------------------------------------------------

    pub fn register_read16<F>(&mut self, bank: MmioBank, offset: u32, handler: F)
    where
        F: Fn(PAddr) -> u16 + Send + Sync + 'static,
    {
        if self.read16.insert((bank, offset), Box::new(handler)).is_some() {
            log::warn!("replacing read16 handler at {:?}+0x{:X}", bank, offset);
        }
    }

    pub fn register_read32<F>(&mut self, bank: MmioBank, offset: u32, handler: F)
    where
        F: Fn(PAddr) -> u32 + Send + Sync + 'static,
    {
        if self.read32.insert((bank, offset), Box::new(handler)).is_some() {
            log::warn!("replacing read32 handler at {:?}+0x{:X}", bank, offset);
        }
    }

    pub fn register_write16<F>(&mut self, bank: MmioBank, offset: u32, handler: F)
    where
        F: Fn(PAddr, u16) + Send + Sync + 'static,
    {
        if self.write16.insert((bank, offset), Box::new(handler)).is_some() {
            log::warn!("replacing write16 handler at {:?}+0x{:X}", bank, offset);
        }
    }

    pub fn register_write32<F>(&mut self, bank: MmioBank, offset: u32, handler: F)
    where
        F: Fn(PAddr, u32) + Send + Sync + 'static,
    {
        if self.write32.insert((bank, offset), Box::new(handler)).is_some() {
            log::warn!("replacing write32 handler at {:?}+0x{:X}", bank, offset);
        }
    }

    /// Register a 32-bit register with typed decode/encode: the write path
    /// decodes the raw word before forwarding to the model, the read path
    /// encodes the model's value back to raw form.
    pub fn register_reg32<R, Rd, Wr>(&mut self, bank: MmioBank, offset: u32, read: Rd, write: Wr)
    where
        R: Register32 + 'static,
        Rd: Fn(PAddr) -> R + Send + Sync + 'static,
        Wr: Fn(PAddr, R) + Send + Sync + 'static,
    {
        self.register_read32(bank, offset, move |addr| read(addr).to_raw());
        self.register_write32(bank, offset, move |addr, raw| write(addr, R::from_raw(raw)));
    }

    // -- Dispatch -----------------------------------------------------------

    pub fn dispatch_read16(&self, paddr: PAddr) -> u16 {
        match MmioBank::from_physical(paddr) {
            Some(key) => match self.read16.get(&key) {
                Some(handler) => handler(paddr),
                None => {
                    self.report_unhandled(key, "read16");
                    0
                }
            },
            None => {
                log::warn!("MMIO read16 outside register banks: 0x{:08X}", paddr);
                0
            }
        }
    }

    pub fn dispatch_read32(&self, paddr: PAddr) -> u32 {
        match MmioBank::from_physical(paddr) {
            Some(key) => match self.read32.get(&key) {
                Some(handler) => handler(paddr),
                None => {
                    self.report_unhandled(key, "read32");
                    0
                }
            },
            None => {
                log::warn!("MMIO read32 outside register banks: 0x{:08X}", paddr);
                0
            }
        }
    }

    pub fn dispatch_write16(&self, paddr: PAddr, value: u16) {
        match MmioBank::from_physical(paddr) {
            Some(key) => match self.write16.get(&key) {
                Some(handler) => handler(paddr, value),
                None => self.report_unhandled(key, "write16"),
            },
            None => log::warn!("MMIO write16 outside register banks: 0x{:08X}", paddr),
        }
    }

    pub fn dispatch_write32(&self, paddr: PAddr, value: u32) {
        match MmioBank::from_physical(paddr) {
            Some(key) => match self.write32.get(&key) {
                Some(handler) => handler(paddr, value),
                None => self.report_unhandled(key, "write32"),
            },
            None => log::warn!("MMIO write32 outside register banks: 0x{:08X}", paddr),
        }
    }

    /// Number of registered handlers across all kinds.
    pub fn len(&self) -> usize {
        self.read16.len() + self.read32.len() + self.write16.len() + self.write32.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn report_unhandled(&self, key: (MmioBank, u32), kind: &str) {
        if self.unhandled_seen.lock().insert(key) {
            log::warn!(
                "unhandled MMIO {} at {:?}+0x{:X} (reads as zero, writes ignored)",
                kind,
                key.0,
                key.1
            );
        }
    }
}
