// Boot sector parsing: derives the volume geometry and selects the FAT width

use byteorder::{ByteOrder, LittleEndian};
use fatscope_core::{FatError, FatResult};
use log::debug;
use serde::Serialize;

use super::constants::*;
use super::FatType;

/// Volume layout derived from the boot sector. Immutable after open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub sector_size: u16,
    /// Bytes per cluster
    pub cluster_size: u32,
    /// Byte offset of the first FAT
    pub fat_offset: u64,
    /// Byte offset of the root directory (fixed area on FAT12/16, root cluster on FAT32)
    pub root_offset: u64,
    /// Byte offset of the first data cluster (cluster 2)
    pub data_offset: u64,
    /// First cluster of the root directory, 0 on FAT12/16
    pub root_cluster: u32,
    pub max_root_entries: u32,
    pub max_cluster_entries: u32,
    pub fat_type: FatType,
    /// Highest cluster value that still continues a chain
    pub cluster_end: u32,

    pub fat_count: u8,
    pub fat_sectors: u32,
    pub total_sectors: u32,
    pub data_clusters: u32,
}

impl Geometry {
    /// Derive the geometry from the first bytes of the image.
    pub fn parse(boot: &[u8]) -> FatResult<Self> {
        if boot.len() < BOOT_SECTOR_PREFIX {
            return Err(FatError::StorageIo(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("boot sector needs {} bytes, got {}", BOOT_SECTOR_PREFIX, boot.len()),
            )));
        }

        let bytes_per_sector = LittleEndian::read_u16(&boot[BPB_BYTES_PER_SEC..]);
        let sectors_per_cluster = boot[BPB_SEC_PER_CLUS];
        if bytes_per_sector == 0 || sectors_per_cluster == 0 {
            return Err(FatError::InvalidGeometry(format!(
                "bytes per sector {}, sectors per cluster {}",
                bytes_per_sector, sectors_per_cluster
            )));
        }

        let reserved_sectors = LittleEndian::read_u16(&boot[BPB_RSVD_SEC_CNT..]) as u64;
        let fat_count = boot[BPB_NUM_FATS];
        let root_entries = LittleEndian::read_u16(&boot[BPB_ROOT_ENT_CNT..]) as u32;

        let sector_size = bytes_per_sector as u64;
        let cluster_size = bytes_per_sector as u32 * sectors_per_cluster as u32;
        let fat_offset = sector_size * reserved_sectors;

        let mut fat_sectors = LittleEndian::read_u16(&boot[BPB_FAT_SZ16..]) as u32;
        let mut root_offset = fat_offset + sector_size * fat_sectors as u64 * fat_count as u64;
        let mut data_offset = root_offset + (DIR_ENTRY_SIZE as u64) * root_entries as u64;

        let total_sectors = match LittleEndian::read_u16(&boot[BPB_TOT_SEC16..]) {
            0 => LittleEndian::read_u32(&boot[BPB_TOT_SEC32..]),
            n => n as u32,
        };

        let data_sectors = (total_sectors as u64).saturating_sub(data_offset / sector_size);
        let mut data_clusters = (data_sectors / sectors_per_cluster as u64) as u32;
        let fat_type = FatType::from_cluster_count(data_clusters);

        let mut root_cluster = 0;
        let mut max_root_entries = root_entries;
        let max_cluster_entries = cluster_size / DIR_ENTRY_SIZE as u32;

        if fat_type == FatType::Fat32 {
            fat_sectors = LittleEndian::read_u32(&boot[BPB_FAT_SZ32..]);
            data_offset = fat_offset + sector_size * fat_sectors as u64 * fat_count as u64;
            root_cluster = LittleEndian::read_u32(&boot[BPB_ROOT_CLUS..]);
            root_offset = data_offset
                + cluster_size as u64 * (root_cluster as u64).saturating_sub(CLUSTER_START as u64);
            max_root_entries = max_cluster_entries;

            // The width stays as selected; only the reported count follows the real layout
            let data_sectors = (total_sectors as u64).saturating_sub(data_offset / sector_size);
            data_clusters = (data_sectors / sectors_per_cluster as u64) as u32;
        }

        let geometry = Self {
            sector_size: bytes_per_sector,
            cluster_size,
            fat_offset,
            root_offset,
            data_offset,
            root_cluster,
            max_root_entries,
            max_cluster_entries,
            fat_type,
            cluster_end: fat_type.cluster_end(),
            fat_count,
            fat_sectors,
            total_sectors,
            data_clusters,
        };

        debug!(
            "{} volume: {} data clusters of {} bytes, FAT at {:#x}, root at {:#x}, data at {:#x}",
            fat_type, data_clusters, cluster_size, fat_offset, root_offset, data_offset
        );

        Ok(geometry)
    }

    /// Byte offset of a data cluster. Only meaningful for clusters >= 2.
    pub fn cluster_offset(&self, cluster: u32) -> u64 {
        let index = (cluster as u64).saturating_sub(CLUSTER_START as u64);
        self.data_offset + index * self.cluster_size as u64
    }

    /// Whether `cluster` addresses a data cluster that may be read and chain-walked.
    pub fn is_data_cluster(&self, cluster: u32) -> bool {
        (CLUSTER_START..=self.cluster_end).contains(&cluster)
    }

    /// Whether a directory starting at `cluster` is the root directory.
    ///
    /// `..` records of first-level directories carry cluster 0 on every FAT width.
    pub fn is_root_cluster(&self, cluster: u32) -> bool {
        cluster == self.root_cluster || cluster == 0
    }
}
