// Directory record decoding and directory scanning
// Handles 8.3 names, VFAT long names and cluster-chained directories

use byteorder::{ByteOrder, LittleEndian};
use fatscope_core::{FatError, FatResult};
use log::{debug, trace};
use serde::Serialize;
use std::collections::HashSet;

use super::constants::*;
use super::handles::EntryHandle;
use super::image::Image;
use super::long_names::{parse_fragment, LongNameAssembler};
use super::timestamps::FatDateTime;

/// Attribute bits of a directory record, one flag each
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileAttributes {
    pub read_only: bool,
    pub hidden: bool,
    pub system: bool,
    pub volume: bool,
    pub directory: bool,
    /// Archive bit; entries carrying it can be opened as files
    pub file: bool,
}

impl FileAttributes {
    pub fn from_byte(attr: u8) -> Self {
        Self {
            read_only: attr & ATTR_READ_ONLY != 0,
            hidden: attr & ATTR_HIDDEN != 0,
            system: attr & ATTR_SYSTEM != 0,
            volume: attr & ATTR_VOLUME_ID != 0,
            directory: attr & ATTR_DIRECTORY != 0,
            file: attr & ATTR_ARCHIVE != 0,
        }
    }

    /// Names of the set flags, in bit order
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.read_only, "Readonly"),
            (self.hidden, "Hidden"),
            (self.system, "System"),
            (self.volume, "Volume"),
            (self.directory, "Directory"),
            (self.file, "File"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

/// A decoded directory record. Values are snapshots; copies are independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    pub attributes: FileAttributes,
    pub created: FatDateTime,
    pub modified: FatDateTime,
    pub accessed: FatDateTime,
    pub size: u32,
    pub cluster: u32,
}

impl Entry {
    /// Build an entry from a short name record and its resolved name
    pub fn from_record(name: String, record: &[u8]) -> Self {
        let hi = LittleEndian::read_u16(&record[DIR_FST_CLUS_HI..]) as u32;
        let lo = LittleEndian::read_u16(&record[DIR_FST_CLUS_LO..]) as u32;

        Self {
            name,
            attributes: FileAttributes::from_byte(record[DIR_ATTR]),
            created: FatDateTime::decode(
                LittleEndian::read_u16(&record[DIR_CRT_DATE..]),
                LittleEndian::read_u16(&record[DIR_CRT_TIME..]),
                record[DIR_CRT_TIME_TENTH],
            ),
            modified: FatDateTime::decode(
                LittleEndian::read_u16(&record[DIR_WRT_DATE..]),
                LittleEndian::read_u16(&record[DIR_WRT_TIME..]),
                0,
            ),
            accessed: FatDateTime::decode(LittleEndian::read_u16(&record[DIR_LST_ACC_DATE..]), 0, 0),
            size: LittleEndian::read_u32(&record[DIR_FILE_SIZE..]),
            cluster: (hi << 16) | lo,
        }
    }

    /// The synthetic root directory entry
    pub fn root(root_cluster: u32) -> Self {
        let mut record = [0u8; DIR_ENTRY_SIZE];
        record[DIR_ATTR] = ATTR_DIRECTORY;
        LittleEndian::write_u16(&mut record[DIR_FST_CLUS_HI..], (root_cluster >> 16) as u16);
        LittleEndian::write_u16(&mut record[DIR_FST_CLUS_LO..], root_cluster as u16);
        Self::from_record(String::new(), &record)
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.directory
    }

    pub fn is_file(&self) -> bool {
        self.attributes.file
    }

    /// Name for messages; the root has an empty name
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "/"
        } else {
            &self.name
        }
    }
}

/// Decode the 8.3 name of a short record.
///
/// The extension is only joined for archive entries; for any other record the
/// extension bytes are ignored.
pub fn decode_short_name(record: &[u8]) -> String {
    let base = latin1(&record[DIR_NAME..DIR_NAME + 8]);

    let mut name = String::with_capacity(12);
    name.push_str(base.trim_end_matches(' '));
    if record[DIR_ATTR] & ATTR_ARCHIVE != 0 {
        let extension = latin1(&record[DIR_NAME + 8..DIR_NAME + 11]);
        name.push('.');
        name.push_str(extension.trim_end_matches(' '));
    }
    name
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Turns raw directory areas into entries, carrying long name state across areas
#[derive(Debug, Default)]
pub struct DirectoryDecoder {
    long_name: LongNameAssembler,
    entries: Vec<Entry>,
}

impl DirectoryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the records of one area. Returns true when the end marker stopped the scan.
    pub fn feed(&mut self, area: &[u8]) -> bool {
        for chunk in area.chunks_exact(DIR_ENTRY_SIZE) {
            match chunk[0] {
                ENTRY_END => return true,
                ENTRY_DELETED => continue,
                _ => {}
            }

            if chunk[DIR_ATTR] == ATTR_LONG_NAME {
                let (units, is_tail) = parse_fragment(chunk);
                self.long_name.push(units, is_tail);
                continue;
            }

            let mut record = [0u8; DIR_ENTRY_SIZE];
            record.copy_from_slice(chunk);
            if record[0] == ENTRY_ESCAPE_DELETED {
                record[0] = ENTRY_DELETED;
            }

            let name = if self.long_name.is_empty() {
                decode_short_name(&record)
            } else {
                self.long_name.finish()
            };
            trace!("Decoded directory record '{}'", name);
            self.entries.push(Entry::from_record(name, &record));
        }
        false
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

impl Image {
    /// Open every immediate child of a directory entry, in directory order
    pub fn list_children(&mut self, directory: EntryHandle) -> FatResult<Vec<EntryHandle>> {
        let parent = self.entry(directory)?;
        if !parent.is_directory() {
            return Err(FatError::NotDirectory(parent.display_name().to_string()));
        }

        let start = parent.cluster;

        let entries = self.scan_directory(start)?;
        Ok(entries.into_iter().map(|entry| self.register(entry)).collect())
    }

    fn scan_directory(&mut self, start: u32) -> FatResult<Vec<Entry>> {
        let (mut cluster, offset, max_entries) = if self.geometry.is_root_cluster(start) {
            (
                self.geometry.root_cluster,
                self.geometry.root_offset,
                self.geometry.max_root_entries,
            )
        } else {
            (
                start,
                self.geometry.cluster_offset(start),
                self.geometry.max_cluster_entries,
            )
        };
        let cluster_area = self.geometry.max_cluster_entries as usize * DIR_ENTRY_SIZE;

        debug!("Scanning directory at cluster {} (offset {:#x})", cluster, offset);

        let mut decoder = DirectoryDecoder::new();
        let mut visited = HashSet::from([cluster]);
        let mut area = self.reader.read_at(offset, max_entries as usize * DIR_ENTRY_SIZE)?;

        loop {
            if decoder.feed(&area) {
                trace!("End marker in directory area of cluster {}", cluster);
            }

            if !self.geometry.is_data_cluster(cluster) {
                break;
            }
            let next = self.chain.next_cluster(&mut self.reader, cluster)?;
            if !self.geometry.is_data_cluster(next) {
                break;
            }
            if !visited.insert(next) {
                debug!("Directory chain loops back to cluster {}, stopping", next);
                break;
            }

            cluster = next;
            area = self.reader.read_at(self.geometry.cluster_offset(cluster), cluster_area)?;
        }

        Ok(decoder.into_entries())
    }
}
