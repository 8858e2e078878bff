use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum Segment {
    #[strum(serialize = ".text")]
    Text,
    #[strum(serialize = ".data")]
    Data,
    #[strum(serialize = ".ktext")]
    KText,
    #[strum(serialize = ".kdata")]
    KData,
}

impl Segment {
    pub fn is_data(self) -> bool {
        matches!(self, Segment::Data | Segment::KData)
    }
}

/// Segment boundaries and named base addresses.
///
/// Limits are inclusive. The extern area sits at the bottom of the data
/// segment, below `data_base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLayout {
    pub text_base: u32,
    pub text_limit: u32,
    pub extern_base: u32,
    pub extern_limit: u32,
    pub data_segment_base: u32,
    pub data_base: u32,
    pub data_limit: u32,
    pub global_pointer: u32,
    pub ktext_base: u32,
    pub ktext_limit: u32,
    pub kdata_base: u32,
    pub kdata_limit: u32,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            text_base: 0x0040_0000,
            text_limit: 0x0fff_fffc,
            extern_base: 0x1000_0000,
            extern_limit: 0x1000_ffff,
            data_segment_base: 0x1000_0000,
            data_base: 0x1001_0000,
            data_limit: 0x7fff_ffff,
            global_pointer: 0x1000_8000,
            ktext_base: 0x8000_0000,
            ktext_limit: 0x8fff_fffc,
            kdata_base: 0x9000_0000,
            kdata_limit: 0xfffe_ffff,
        }
    }
}

impl MemoryLayout {
    /// Address the segment's cursor starts at.
    pub fn base(&self, seg: Segment) -> u32 {
        match seg {
            Segment::Text => self.text_base,
            Segment::Data => self.data_base,
            Segment::KText => self.ktext_base,
            Segment::KData => self.kdata_base,
        }
    }

    pub fn contains(&self, seg: Segment, addr: u32) -> bool {
        let (lo, hi) = match seg {
            Segment::Text => (self.text_base, self.text_limit),
            Segment::Data => (self.data_segment_base, self.data_limit),
            Segment::KText => (self.ktext_base, self.ktext_limit),
            Segment::KData => (self.kdata_base, self.kdata_limit),
        };
        lo <= addr && addr <= hi
    }

    pub fn in_extern(&self, addr: u32) -> bool {
        self.extern_base <= addr && addr <= self.extern_limit
    }

    pub fn segment_of(&self, addr: u32) -> Option<Segment> {
        Segment::iter().find(|seg| self.contains(*seg, addr))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemError {
    #[error("address 0x{0:08x} is outside every segment")]
    OutOfSegment(u32),

    #[error("write of {1} bytes at 0x{0:08x} runs past the end of its segment")]
    Overrun(u32, usize),

    #[error("word address 0x{0:08x} is not aligned on a word boundary")]
    Unaligned(u32),
}

/// Target of the assembler's final writes.
pub trait Memory {
    fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), MemError>;

    /// Stores `word` little-endian at a word-aligned address.
    fn write_word(&mut self, addr: u32, word: u32) -> Result<(), MemError> {
        if addr % 4 != 0 {
            return Err(MemError::Unaligned(addr));
        }
        self.write_bytes(addr, &word.to_le_bytes())
    }
}

/// Sparse byte-addressed memory bounded by a [`MemoryLayout`].
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    layout: MemoryLayout,
    bytes: BTreeMap<u32, u8>,
}

impl MemoryImage {
    pub fn new(layout: MemoryLayout) -> Self {
        Self {
            layout,
            bytes: BTreeMap::new(),
        }
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Unwritten bytes read as zero.
    pub fn read_bytes(&self, addr: u32, len: usize) -> Vec<u8> {
        (0..len as u32)
            .map(|i| {
                self.bytes
                    .get(&addr.wrapping_add(i))
                    .copied()
                    .unwrap_or(0)
            })
            .collect()
    }

    pub fn read_word(&self, addr: u32) -> u32 {
        let b = self.read_bytes(addr, 4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

impl Memory for MemoryImage {
    fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), MemError> {
        let seg = self
            .layout
            .segment_of(addr)
            .ok_or(MemError::OutOfSegment(addr))?;
        if let Some(last) = (bytes.len() as u32).checked_sub(1) {
            let end = addr
                .checked_add(last)
                .ok_or(MemError::Overrun(addr, bytes.len()))?;
            if !self.layout.contains(seg, end) {
                return Err(MemError::Overrun(addr, bytes.len()));
            }
        }
        for (i, byte) in bytes.iter().enumerate() {
            self.bytes.insert(addr + i as u32, *byte);
        }
        Ok(())
    }
}
