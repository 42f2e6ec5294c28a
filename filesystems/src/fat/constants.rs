// FAT on-disk constants: boot sector offsets, directory record layout, markers

// Boot sector offsets
pub const BPB_BYTES_PER_SEC: usize = 0x0B;
pub const BPB_SEC_PER_CLUS: usize = 0x0D;
pub const BPB_RSVD_SEC_CNT: usize = 0x0E;
pub const BPB_NUM_FATS: usize = 0x10;
pub const BPB_ROOT_ENT_CNT: usize = 0x11;
pub const BPB_TOT_SEC16: usize = 0x13;
pub const BPB_FAT_SZ16: usize = 0x16;
pub const BPB_TOT_SEC32: usize = 0x20;

// FAT32-specific offsets (start at 36)
pub const BPB_FAT_SZ32: usize = 0x24;
pub const BPB_ROOT_CLUS: usize = 0x2C;

/// Bytes of the boot sector needed to derive the geometry
pub const BOOT_SECTOR_PREFIX: usize = 64;

// Cluster count thresholds (data cluster count strictly below the border)
pub const FAT12_16_BORDER: u32 = 4086;
pub const FAT16_32_BORDER: u32 = 65526;

// First data cluster and per-variant end-of-chain thresholds
pub const CLUSTER_START: u32 = 2;
pub const FAT12_CLUSTER_END: u32 = 0xFF6;
pub const FAT16_CLUSTER_END: u32 = 0xFFF6;
pub const FAT32_CLUSTER_END: u32 = 0x0FFF_FFF6;

/// FAT32 entries only use the low 28 bits
pub const FAT32_ENTRY_MASK: u32 = 0x0FFF_FFFF;

// Directory records
pub const DIR_ENTRY_SIZE: usize = 32;

pub const DIR_NAME: usize = 0;
pub const DIR_ATTR: usize = 11;
pub const DIR_CRT_TIME_TENTH: usize = 13;
pub const DIR_CRT_TIME: usize = 14;
pub const DIR_CRT_DATE: usize = 16;
pub const DIR_LST_ACC_DATE: usize = 18;
pub const DIR_FST_CLUS_HI: usize = 20;
pub const DIR_WRT_TIME: usize = 22;
pub const DIR_WRT_DATE: usize = 24;
pub const DIR_FST_CLUS_LO: usize = 26;
pub const DIR_FILE_SIZE: usize = 28;

// First byte markers
pub const ENTRY_END: u8 = 0x00;
pub const ENTRY_DELETED: u8 = 0xE5;
pub const ENTRY_ESCAPE_DELETED: u8 = 0x05;

// Attribute bits
pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

// Long name records
pub const LFN_LAST_FRAGMENT: u8 = 0x40;
pub const LFN_UNITS_PER_RECORD: usize = 13;
pub const LFN_NAME1: usize = 1; // 5 units
pub const LFN_NAME2: usize = 14; // 6 units
pub const LFN_NAME3: usize = 28; // 2 units

/// Separator used by path resolution
pub const PATH_DELIMITER: char = '/';
