// FAT table lookups for the three entry widths
// The variant is chosen once when the image is opened

use byteorder::{ByteOrder, LittleEndian};
use fatscope_core::FatResult;
use log::trace;

use super::constants::FAT32_ENTRY_MASK;
use super::image_reader::ImageReader;
use super::{FatType, FatVariant};

/// 12-bit entries, two packed into every 3 bytes
pub struct Fat12;

/// 16-bit little-endian entries
pub struct Fat16;

/// 32-bit little-endian entries, top 4 bits reserved
pub struct Fat32;

impl FatVariant for Fat12 {
    fn fat_type(&self) -> FatType {
        FatType::Fat12
    }

    fn slot(&self, cluster: u32) -> (u64, usize) {
        ((cluster / 2) as u64 * 3, 3)
    }

    fn decode(&self, cluster: u32, bytes: &[u8]) -> u32 {
        let (b0, b1, b2) = (bytes[0] as u32, bytes[1] as u32, bytes[2] as u32);
        if cluster % 2 == 0 {
            (b0 | (b1 << 8)) & 0xFFF
        } else {
            ((b1 >> 4) | (b2 << 4)) & 0xFFF
        }
    }
}

impl FatVariant for Fat16 {
    fn fat_type(&self) -> FatType {
        FatType::Fat16
    }

    fn slot(&self, cluster: u32) -> (u64, usize) {
        (cluster as u64 * 2, 2)
    }

    fn decode(&self, _cluster: u32, bytes: &[u8]) -> u32 {
        LittleEndian::read_u16(bytes) as u32
    }
}

impl FatVariant for Fat32 {
    fn fat_type(&self) -> FatType {
        FatType::Fat32
    }

    fn slot(&self, cluster: u32) -> (u64, usize) {
        (cluster as u64 * 4, 4)
    }

    fn decode(&self, _cluster: u32, bytes: &[u8]) -> u32 {
        LittleEndian::read_u32(bytes) & FAT32_ENTRY_MASK
    }
}

/// Follows cluster chains through the first FAT
pub struct ChainWalker {
    variant: Box<dyn FatVariant>,
    fat_offset: u64,
    lookups: u64,
}

impl ChainWalker {
    pub fn new(fat_type: FatType, fat_offset: u64) -> Self {
        Self {
            variant: fat_type.variant(),
            fat_offset,
            lookups: 0,
        }
    }

    /// Number of FAT lookups performed so far
    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    /// Read the FAT entry for `cluster`, i.e. the next cluster of its chain
    pub fn next_cluster(&mut self, reader: &mut ImageReader, cluster: u32) -> FatResult<u32> {
        let (relative, len) = self.variant.slot(cluster);
        let mut bytes = [0u8; 4];
        reader.read_exact_at(self.fat_offset + relative, &mut bytes[..len])?;
        self.lookups += 1;

        let next = self.variant.decode(cluster, &bytes[..len]);
        trace!("{} chain: {} -> {:#x}", self.variant.fat_type(), cluster, next);
        Ok(next)
    }
}
