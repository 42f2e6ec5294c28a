// Test helpers: synthesize small FAT12/16/32 images in memory

use byteorder::{ByteOrder, LittleEndian};
use std::io::Cursor;

use crate::fat::constants::*;
use crate::fat::{FatType, Image};

const SECTOR_SIZE: usize = 512;
const CLUSTER_SIZE: usize = SECTOR_SIZE;
const FAT_COUNT: usize = 2;

// 2024-01-15 14:30:10
const STAMP_DATE: u16 = ((2024 - 1980) << 9) | (1 << 5) | 15;
const STAMP_TIME: u16 = (14 << 11) | (30 << 5) | 5;

/// Short name checksum stored in every long name record
pub fn short_name_checksum(short: &[u8; 11]) -> u8 {
    short
        .iter()
        .fold(0u8, |sum, &c| ((sum & 1) << 7).wrapping_add(sum >> 1).wrapping_add(c))
}

/// A short directory record with fixed timestamps
pub fn short_record(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut rec = [0u8; 32];
    rec[DIR_NAME..DIR_NAME + 11].copy_from_slice(name);
    rec[DIR_ATTR] = attr;
    LittleEndian::write_u16(&mut rec[DIR_CRT_TIME..], STAMP_TIME);
    LittleEndian::write_u16(&mut rec[DIR_CRT_DATE..], STAMP_DATE);
    LittleEndian::write_u16(&mut rec[DIR_LST_ACC_DATE..], STAMP_DATE);
    LittleEndian::write_u16(&mut rec[DIR_FST_CLUS_HI..], (cluster >> 16) as u16);
    LittleEndian::write_u16(&mut rec[DIR_WRT_TIME..], STAMP_TIME);
    LittleEndian::write_u16(&mut rec[DIR_WRT_DATE..], STAMP_DATE);
    LittleEndian::write_u16(&mut rec[DIR_FST_CLUS_LO..], cluster as u16);
    LittleEndian::write_u32(&mut rec[DIR_FILE_SIZE..], size);
    rec
}

/// Long name records for `long`, in on-disk order (last fragment first)
pub fn lfn_records(long: &str, short: &[u8; 11]) -> Vec<[u8; 32]> {
    let units: Vec<u16> = long.encode_utf16().collect();
    let count = units.len().div_ceil(LFN_UNITS_PER_RECORD).max(1);
    let checksum = short_name_checksum(short);

    let offsets: Vec<usize> = (0..5)
        .map(|j| LFN_NAME1 + j * 2)
        .chain((0..6).map(|j| LFN_NAME2 + j * 2))
        .chain((0..2).map(|j| LFN_NAME3 + j * 2))
        .collect();

    let mut records = Vec::with_capacity(count);
    for index in (0..count).rev() {
        let start = index * LFN_UNITS_PER_RECORD;
        let mut slot = [0xFFFFu16; LFN_UNITS_PER_RECORD];
        for (k, unit) in slot.iter_mut().enumerate() {
            match units.get(start + k) {
                Some(&u) => *unit = u,
                None if start + k == units.len() => *unit = 0x0000,
                None => {}
            }
        }

        let mut rec = [0u8; 32];
        rec[0] = (index + 1) as u8;
        if index == count - 1 {
            rec[0] |= LFN_LAST_FRAGMENT;
        }
        rec[DIR_ATTR] = ATTR_LONG_NAME;
        rec[13] = checksum;
        for (unit, &offset) in slot.iter().zip(&offsets) {
            LittleEndian::write_u16(&mut rec[offset..], *unit);
        }
        records.push(rec);
    }
    records
}

fn is_short_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || "$%'-_@~`!(){}^#&".contains(c)
}

/// The 8.3 form of `name`, if it has one
fn as_short_name(name: &str, directory: bool) -> Option<[u8; 11]> {
    let (base, ext) = match name.rsplit_once('.') {
        Some(_) if directory => return None,
        Some((base, ext)) => (base, ext),
        None => (name, ""),
    };
    if base.is_empty() || base.len() > 8 || ext.len() > 3 {
        return None;
    }
    if !base.chars().chain(ext.chars()).all(is_short_char) {
        return None;
    }

    let mut short = [b' '; 11];
    short[..base.len()].copy_from_slice(base.as_bytes());
    short[8..8 + ext.len()].copy_from_slice(ext.as_bytes());
    Some(short)
}

/// A numbered alias such as `LONGFI~1TXT`
fn alias_short_name(name: &str, serial: u32) -> [u8; 11] {
    let (base, ext) = name.rsplit_once('.').unwrap_or((name, ""));
    let clean = |s: &str| -> Vec<u8> {
        s.chars()
            .map(|c| c.to_ascii_uppercase())
            .filter(|&c| is_short_char(c) && c != '~')
            .map(|c| c as u8)
            .collect()
    };

    let tail = format!("~{}", serial);
    let mut stem = clean(base);
    stem.truncate(8 - tail.len());
    stem.extend_from_slice(tail.as_bytes());
    let mut ext = clean(ext);
    ext.truncate(3);

    let mut short = [b' '; 11];
    short[..stem.len()].copy_from_slice(&stem);
    short[8..8 + ext.len()].copy_from_slice(&ext);
    short
}

/// A directory node of an [`ImageBuilder`]
pub type DirRef = usize;

enum NodeKind {
    Dir { children: Vec<usize> },
    File { data: Vec<u8> },
}

struct Node {
    name: String,
    parent: usize,
    short: [u8; 11],
    long: bool,
    kind: NodeKind,
}

#[derive(Clone, Copy)]
struct Layout {
    fat_type: FatType,
    reserved_sectors: usize,
    fat_sectors: usize,
    root_entries: usize,
    total_sectors: u32,
}

/// Builds a FAT image with one sector per cluster and contiguous chains
pub struct ImageBuilder {
    layout: Layout,
    nodes: Vec<Node>,
    aliases: u32,
    truncated: Vec<usize>,
    looped: Vec<usize>,
    end_markers: Vec<(usize, usize)>,
}

impl ImageBuilder {
    pub const ROOT: DirRef = 0;

    fn new(layout: Layout) -> Self {
        Self {
            layout,
            nodes: vec![Node {
                name: String::new(),
                parent: Self::ROOT,
                short: [b' '; 11],
                long: false,
                kind: NodeKind::Dir { children: Vec::new() },
            }],
            aliases: 0,
            truncated: Vec::new(),
            looped: Vec::new(),
            end_markers: Vec::new(),
        }
    }

    /// 1.44MB floppy layout
    pub fn fat12() -> Self {
        Self::new(Layout {
            fat_type: FatType::Fat12,
            reserved_sectors: 1,
            fat_sectors: 9,
            root_entries: 224,
            total_sectors: 2880,
        })
    }

    /// 4200 data clusters
    pub fn fat16() -> Self {
        Self::new(Layout {
            fat_type: FatType::Fat16,
            reserved_sectors: 4,
            fat_sectors: 32,
            root_entries: 512,
            total_sectors: 4300,
        })
    }

    /// 65530 data clusters, root directory at cluster 2
    pub fn fat32() -> Self {
        Self::new(Layout {
            fat_type: FatType::Fat32,
            reserved_sectors: 32,
            fat_sectors: 512,
            root_entries: 0,
            total_sectors: 32 + 1024 + 65530,
        })
    }

    fn add(&mut self, parent: DirRef, name: &str, kind: NodeKind) -> usize {
        let directory = matches!(kind, NodeKind::Dir { .. });
        let (short, long) = match as_short_name(name, directory) {
            Some(short) => (short, false),
            None => {
                self.aliases += 1;
                (alias_short_name(name, self.aliases), true)
            }
        };

        let index = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            short,
            long,
            kind,
        });
        match &mut self.nodes[parent].kind {
            NodeKind::Dir { children } => children.push(index),
            NodeKind::File { .. } => panic!("parent of '{}' is a file", name),
        }
        index
    }

    /// Add a file; names that are not valid 8.3 names get long name records
    pub fn add_file(&mut self, parent: DirRef, name: &str, data: &[u8]) -> usize {
        self.add(parent, name, NodeKind::File { data: data.to_vec() })
    }

    pub fn add_dir(&mut self, parent: DirRef, name: &str) -> DirRef {
        self.add(parent, name, NodeKind::Dir { children: Vec::new() })
    }

    fn node_index(&self, name: &str) -> usize {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .unwrap_or_else(|| panic!("no node named '{}'", name))
    }

    /// End the chain of the named file after its first cluster
    pub fn truncate_chain(&mut self, name: &str) {
        let index = self.node_index(name);
        self.truncated.push(index);
    }

    /// Link the last cluster of the named node back to its first
    pub fn loop_chain(&mut self, name: &str) {
        let index = self.node_index(name);
        self.looped.push(index);
    }

    /// Zero the first byte of the `record`-th record of the named directory
    pub fn end_marker_at(&mut self, name: &str, record: usize) {
        let index = self.node_index(name);
        self.end_markers.push((index, record));
    }

    fn has_root_area(&self) -> bool {
        self.layout.fat_type != FatType::Fat32
    }

    fn record_count(&self, index: usize) -> usize {
        let NodeKind::Dir { children } = &self.nodes[index].kind else {
            return 0;
        };
        let dots = if index == Self::ROOT { 0 } else { 2 };
        dots + children
            .iter()
            .map(|&c| {
                let node = &self.nodes[c];
                let fragments = if node.long {
                    node.name.encode_utf16().count().div_ceil(LFN_UNITS_PER_RECORD)
                } else {
                    0
                };
                fragments + 1
            })
            .sum::<usize>()
    }

    fn cluster_count(&self, index: usize) -> usize {
        match &self.nodes[index].kind {
            NodeKind::Dir { .. } if index == Self::ROOT && self.has_root_area() => 0,
            NodeKind::Dir { .. } => {
                (self.record_count(index) * DIR_ENTRY_SIZE).div_ceil(CLUSTER_SIZE).max(1)
            }
            NodeKind::File { data } => data.len().div_ceil(CLUSTER_SIZE),
        }
    }

    fn end_of_chain(&self) -> u32 {
        match self.layout.fat_type {
            FatType::Fat12 => 0xFFF,
            FatType::Fat16 => 0xFFFF,
            FatType::Fat32 => 0x0FFF_FFFF,
        }
    }

    fn set_fat(&self, fat: &mut [u8], cluster: u32, value: u32) {
        let c = cluster as usize;
        match self.layout.fat_type {
            FatType::Fat12 => {
                let offset = c + c / 2;
                let old = LittleEndian::read_u16(&fat[offset..]);
                let new = if c % 2 == 0 {
                    (old & 0xF000) | (value as u16 & 0x0FFF)
                } else {
                    (old & 0x000F) | ((value as u16 & 0x0FFF) << 4)
                };
                LittleEndian::write_u16(&mut fat[offset..], new);
            }
            FatType::Fat16 => LittleEndian::write_u16(&mut fat[c * 2..], value as u16),
            FatType::Fat32 => LittleEndian::write_u32(&mut fat[c * 4..], value),
        }
    }

    fn boot_sector(&self) -> [u8; SECTOR_SIZE] {
        let layout = &self.layout;
        let mut boot = [0u8; SECTOR_SIZE];
        boot[..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        boot[3..11].copy_from_slice(b"FATSCOPE");
        LittleEndian::write_u16(&mut boot[BPB_BYTES_PER_SEC..], SECTOR_SIZE as u16);
        boot[BPB_SEC_PER_CLUS] = (CLUSTER_SIZE / SECTOR_SIZE) as u8;
        LittleEndian::write_u16(&mut boot[BPB_RSVD_SEC_CNT..], layout.reserved_sectors as u16);
        boot[BPB_NUM_FATS] = FAT_COUNT as u8;
        LittleEndian::write_u16(&mut boot[BPB_ROOT_ENT_CNT..], layout.root_entries as u16);
        boot[0x15] = 0xF8;

        if layout.fat_type == FatType::Fat32 {
            LittleEndian::write_u32(&mut boot[BPB_TOT_SEC32..], layout.total_sectors);
            LittleEndian::write_u32(&mut boot[BPB_FAT_SZ32..], layout.fat_sectors as u32);
            LittleEndian::write_u32(&mut boot[BPB_ROOT_CLUS..], CLUSTER_START);
        } else {
            LittleEndian::write_u16(&mut boot[BPB_TOT_SEC16..], layout.total_sectors as u16);
            LittleEndian::write_u16(&mut boot[BPB_FAT_SZ16..], layout.fat_sectors as u16);
        }
        boot[0x1FE] = 0x55;
        boot[0x1FF] = 0xAA;
        boot
    }

    /// Lay out the image. Only the used part of the data region is materialized.
    pub fn build(&self) -> Vec<u8> {
        let layout = self.layout;
        let fat_offset = layout.reserved_sectors * SECTOR_SIZE;
        let fat_len = layout.fat_sectors * SECTOR_SIZE;
        let root_offset = fat_offset + fat_len * FAT_COUNT;
        let data_offset = root_offset + layout.root_entries * DIR_ENTRY_SIZE;
        let cluster_offset = |cluster: u32| data_offset + (cluster as usize - 2) * CLUSTER_SIZE;

        // First cluster and cluster count of every node, allocated in insertion order
        let mut next = CLUSTER_START;
        let mut allocation = Vec::with_capacity(self.nodes.len());
        for index in 0..self.nodes.len() {
            let count = self.cluster_count(index) as u32;
            allocation.push((if count == 0 { 0 } else { next }, count));
            next += count;
        }

        let mut image = vec![0u8; data_offset + (next - CLUSTER_START) as usize * CLUSTER_SIZE];
        image[..SECTOR_SIZE].copy_from_slice(&self.boot_sector());

        let mut fat = vec![0u8; fat_len];
        self.set_fat(&mut fat, 0, 0x0FFF_FFF8 & self.end_of_chain());
        self.set_fat(&mut fat, 1, self.end_of_chain());
        for (index, &(first, count)) in allocation.iter().enumerate() {
            for k in 0..count {
                let value = if k + 1 < count { first + k + 1 } else { self.end_of_chain() };
                self.set_fat(&mut fat, first + k, value);
            }
            if self.truncated.contains(&index) && count > 0 {
                self.set_fat(&mut fat, first, self.end_of_chain());
            }
            if self.looped.contains(&index) && count > 0 {
                self.set_fat(&mut fat, first + count - 1, first);
            }
        }
        for copy in 0..FAT_COUNT {
            let start = fat_offset + copy * fat_len;
            image[start..start + fat_len].copy_from_slice(&fat);
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let (first, _) = allocation[index];
            match &node.kind {
                NodeKind::File { data } => {
                    if first != 0 {
                        let start = cluster_offset(first);
                        image[start..start + data.len()].copy_from_slice(data);
                    }
                }
                NodeKind::Dir { children } => {
                    let mut records = Vec::new();
                    if index != Self::ROOT {
                        let parent = match node.parent {
                            Self::ROOT => 0,
                            p => allocation[p].0,
                        };
                        records.push(short_record(b".          ", ATTR_DIRECTORY, first, 0));
                        records.push(short_record(b"..         ", ATTR_DIRECTORY, parent, 0));
                    }
                    for &c in children {
                        let child = &self.nodes[c];
                        if child.long {
                            records.extend(lfn_records(&child.name, &child.short));
                        }
                        let (attr, size) = match &child.kind {
                            NodeKind::Dir { .. } => (ATTR_DIRECTORY, 0),
                            NodeKind::File { data } => (ATTR_ARCHIVE, data.len() as u32),
                        };
                        records.push(short_record(&child.short, attr, allocation[c].0, size));
                    }

                    let start = if first == 0 {
                        assert!(records.len() <= layout.root_entries, "root directory full");
                        root_offset
                    } else {
                        cluster_offset(first)
                    };
                    for (i, rec) in records.iter().enumerate() {
                        let at = start + i * DIR_ENTRY_SIZE;
                        image[at..at + DIR_ENTRY_SIZE].copy_from_slice(rec);
                    }
                    for &(_, record) in self.end_markers.iter().filter(|(n, _)| *n == index) {
                        image[start + record * DIR_ENTRY_SIZE] = 0;
                    }
                }
            }
        }

        image
    }

    pub fn open(&self) -> Image {
        Image::from_reader(Cursor::new(self.build())).expect("builder image opens")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_names() {
        assert_eq!(as_short_name("HELLO.TXT", false), Some(*b"HELLO   TXT"));
        assert_eq!(as_short_name("DOCS", true), Some(*b"DOCS       "));
        assert_eq!(as_short_name("hello.txt", false), None);
        assert_eq!(as_short_name("A.B", true), None);
        assert_eq!(&alias_short_name("longfilename.txt", 1), b"LONGFI~1TXT");
    }

    #[test]
    fn test_lfn_record_layout() {
        let records = lfn_records("longfilename.txt", b"LONGFI~1TXT");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0][0], 0x42);
        assert_eq!(records[1][0], 0x01);
        assert_eq!(records[0][13], short_name_checksum(b"LONGFI~1TXT"));
    }

    #[test]
    fn test_builder_geometry_types() {
        assert_eq!(ImageBuilder::fat12().open().geometry().fat_type, FatType::Fat12);
        assert_eq!(ImageBuilder::fat16().open().geometry().fat_type, FatType::Fat16);
        let fat32 = ImageBuilder::fat32().open();
        assert_eq!(fat32.geometry().fat_type, FatType::Fat32);
        assert_eq!(fat32.geometry().root_cluster, 2);
    }
}
