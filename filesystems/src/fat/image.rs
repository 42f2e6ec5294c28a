// FAT image: geometry, shared storage cursor and the registry of open entries

use fatscope_core::{FatError, FatResult};
use log::debug;
use std::fs::File;
use std::path::Path;

use super::boot_sector::Geometry;
use super::constants::BOOT_SECTOR_PREFIX;
use super::directory::Entry;
use super::fat_table::ChainWalker;
use super::file_ops::FileCursor;
use super::handles::{EntryHandle, HandleRegistry};
use super::image_reader::{ImageReader, ImageSource};
use super::FatType;

/// An open entry and the files opened on it
pub(crate) struct EntryRecord {
    pub(crate) entry: Entry,
    pub(crate) files: HandleRegistry<FileCursor>,
}

/// Handles released when an image was closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosedHandles {
    pub entries: usize,
    pub files: usize,
}

/// An opened FAT volume
pub struct Image {
    pub(crate) reader: ImageReader,
    pub(crate) geometry: Geometry,
    pub(crate) chain: ChainWalker,
    pub(crate) entries: HandleRegistry<EntryRecord>,
}

impl Image {
    /// Open an image file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> FatResult<Self> {
        let path = path.as_ref();
        debug!("Opening FAT image {}", path.display());

        let file = File::open(path).map_err(|source| FatError::StorageOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Interpret any seekable byte source as a FAT image
    pub fn from_reader<S: ImageSource + 'static>(source: S) -> FatResult<Self> {
        let mut reader = ImageReader::new(source);
        let boot = reader.read_at(0, BOOT_SECTOR_PREFIX)?;
        let geometry = Geometry::parse(&boot)?;
        let chain = ChainWalker::new(geometry.fat_type, geometry.fat_offset);

        Ok(Self {
            reader,
            geometry,
            chain,
            entries: HandleRegistry::new(),
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn fat_type(&self) -> FatType {
        self.geometry.fat_type
    }

    /// FAT lookups performed since the image was opened
    pub fn chain_lookups(&self) -> u64 {
        self.chain.lookups()
    }

    pub fn open_entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Files open across every entry
    pub fn open_file_count(&self) -> usize {
        self.entries.values().map(|record| record.files.len()).sum()
    }

    pub(crate) fn register(&mut self, entry: Entry) -> EntryHandle {
        let handle = EntryHandle(self.entries.insert(EntryRecord {
            entry,
            files: HandleRegistry::new(),
        }));
        debug!("Opened {}", handle);
        handle
    }

    pub(crate) fn record(&self, handle: EntryHandle) -> FatResult<&EntryRecord> {
        self.entries
            .get(handle.0)
            .ok_or_else(|| FatError::StaleHandle(handle.to_string()))
    }

    pub(crate) fn record_mut(&mut self, handle: EntryHandle) -> FatResult<&mut EntryRecord> {
        self.entries
            .get_mut(handle.0)
            .ok_or_else(|| FatError::StaleHandle(handle.to_string()))
    }

    /// Synthesize and open the root directory entry
    pub fn root_entry(&mut self) -> EntryHandle {
        let root = Entry::root(self.geometry.root_cluster);
        self.register(root)
    }

    /// The decoded record behind an open handle
    pub fn entry(&self, handle: EntryHandle) -> FatResult<&Entry> {
        Ok(&self.record(handle)?.entry)
    }

    /// Open an independent copy of an entry
    pub fn duplicate_entry(&mut self, handle: EntryHandle) -> FatResult<EntryHandle> {
        let copy = self.entry(handle)?.clone();
        Ok(self.register(copy))
    }

    /// Close an entry and every file opened on it
    pub fn close_entry(&mut self, handle: EntryHandle) -> FatResult<()> {
        let record = self
            .entries
            .remove(handle.0)
            .ok_or_else(|| FatError::StaleHandle(handle.to_string()))?;

        debug!(
            "Closed {} ('{}') and {} file(s)",
            handle,
            record.entry.name,
            record.files.len()
        );
        Ok(())
    }

    /// Close the image, closing every entry still open and their files
    pub fn close(mut self) -> ClosedHandles {
        let mut closed = ClosedHandles::default();
        for (id, record) in self.entries.drain() {
            closed.entries += 1;
            closed.files += record.files.len();
            debug!("Closing {} ('{}') with image", EntryHandle(id), record.entry.name);
        }

        debug!(
            "Closed image: {} entr(ies), {} file(s) released",
            closed.entries, closed.files
        );
        closed
    }
}
