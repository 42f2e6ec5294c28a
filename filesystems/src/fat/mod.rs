// FAT12/16/32 image interpretation
// Geometry, cluster chains, directory decoding, path resolution and file reads

pub mod boot_sector;
pub mod constants;
pub mod directory;
pub mod fat_table;
pub mod file_ops;
pub mod handles;
pub mod image;
pub mod image_reader;
pub mod long_names;
pub mod path_resolver;
pub mod timestamps;

pub use boot_sector::Geometry;
pub use directory::{Entry, FileAttributes};
pub use fat_table::{ChainWalker, Fat12, Fat16, Fat32};
pub use file_ops::FileStream;
pub use handles::{EntryHandle, FileHandle};
pub use image::{ClosedHandles, Image};
pub use timestamps::FatDateTime;

use serde::Serialize;
use std::fmt;

use constants::*;

/// FAT width, chosen from the data cluster count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FatType {
    Fat12,
    Fat16,
    Fat32,
}

impl FatType {
    pub fn from_cluster_count(data_clusters: u32) -> Self {
        if data_clusters < FAT12_16_BORDER {
            FatType::Fat12
        } else if data_clusters < FAT16_32_BORDER {
            FatType::Fat16
        } else {
            FatType::Fat32
        }
    }

    pub fn fat_bits(&self) -> u8 {
        match self {
            FatType::Fat12 => 12,
            FatType::Fat16 => 16,
            FatType::Fat32 => 32,
        }
    }

    /// Values above this threshold never continue a chain
    pub fn cluster_end(&self) -> u32 {
        match self {
            FatType::Fat12 => FAT12_CLUSTER_END,
            FatType::Fat16 => FAT16_CLUSTER_END,
            FatType::Fat32 => FAT32_CLUSTER_END,
        }
    }

    /// The table decoder for this width
    pub fn variant(&self) -> Box<dyn FatVariant> {
        match self {
            FatType::Fat12 => Box::new(Fat12),
            FatType::Fat16 => Box::new(Fat16),
            FatType::Fat32 => Box::new(Fat32),
        }
    }
}

impl fmt::Display for FatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FAT{}", self.fat_bits())
    }
}

/// Trait for FAT table variants
pub trait FatVariant: Send + Sync {
    fn fat_type(&self) -> FatType;

    /// Byte position of the table slot holding `cluster`, relative to the FAT start,
    /// and the number of bytes to read for it.
    fn slot(&self, cluster: u32) -> (u64, usize);

    /// Decode the next-cluster value from the bytes read at `slot(cluster)`.
    fn decode(&self, cluster: u32, bytes: &[u8]) -> u32;
}
