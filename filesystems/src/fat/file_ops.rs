// File reads across cluster boundaries

use fatscope_core::{FatError, FatResult};
use log::{debug, trace};
use std::io::{self, Read};

use super::handles::{EntryHandle, FileHandle};
use super::image::Image;

/// Read cursor of an open file
#[derive(Debug, Clone, Copy)]
pub(crate) struct FileCursor {
    pub(crate) position: u32,
    /// Cluster holding the byte at `position`
    pub(crate) cluster: u32,
}

fn chain_ended(cluster: u32) -> FatError {
    FatError::StorageIo(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("cluster chain ended at {:#x} before end of file", cluster),
    ))
}

impl Image {
    /// Open a read cursor at the start of a file entry
    pub fn open_file(&mut self, entry: EntryHandle) -> FatResult<FileHandle> {
        let record = self.record_mut(entry)?;
        if !record.entry.is_file() {
            return Err(FatError::NotFile(record.entry.display_name().to_string()));
        }

        let id = record.files.insert(FileCursor {
            position: 0,
            cluster: record.entry.cluster,
        });
        let file = FileHandle { entry, id };
        debug!("Opened {} on '{}'", file, record.entry.name);
        Ok(file)
    }

    pub fn close_file(&mut self, file: FileHandle) -> FatResult<()> {
        self.record_mut(file.entry)?
            .files
            .remove(file.id)
            .map(|_| debug!("Closed {}", file))
            .ok_or_else(|| FatError::StaleHandle(file.to_string()))
    }

    fn cursor(&self, file: FileHandle) -> FatResult<FileCursor> {
        self.record(file.entry)?
            .files
            .get(file.id)
            .copied()
            .ok_or_else(|| FatError::StaleHandle(file.to_string()))
    }

    /// Current byte offset of a file
    pub fn file_position(&self, file: FileHandle) -> FatResult<u32> {
        Ok(self.cursor(file)?.position)
    }

    /// Read up to `max_len` bytes from the file's position.
    ///
    /// Returns an empty buffer at end of file.
    pub fn read_file(&mut self, file: FileHandle, max_len: usize) -> FatResult<Vec<u8>> {
        let mut cursor = self.cursor(file)?;
        let size = self.record(file.entry)?.entry.size;

        if max_len == 0 || cursor.position >= size {
            return Ok(Vec::new());
        }

        let cluster_size = self.geometry.cluster_size;
        let len = max_len.min((size - cursor.position) as usize);
        let mut out = Vec::new();
        out.try_reserve(len)
            .map_err(|e| FatError::AllocationFailure(format!("{} bytes: {}", len, e)))?;

        let mut in_cluster = cursor.position % cluster_size;
        let mut remaining = len;
        loop {
            if !self.geometry.is_data_cluster(cursor.cluster) {
                return Err(chain_ended(cursor.cluster));
            }

            let chunk = remaining.min((cluster_size - in_cluster) as usize);
            let offset = self.geometry.cluster_offset(cursor.cluster) + in_cluster as u64;
            self.reader.append_at(offset, chunk, &mut out)?;
            remaining -= chunk;
            if remaining == 0 {
                break;
            }

            cursor.cluster = self.chain.next_cluster(&mut self.reader, cursor.cluster)?;
            in_cluster = 0;
        }

        cursor.position += len as u32;
        if cursor.position % cluster_size == 0 && cursor.position < size {
            cursor.cluster = self.chain.next_cluster(&mut self.reader, cursor.cluster)?;
        }

        trace!("Read {} bytes from {}, now at {}", len, file, cursor.position);
        if let Some(slot) = self.record_mut(file.entry)?.files.get_mut(file.id) {
            *slot = cursor;
        }
        Ok(out)
    }

    /// Borrow an open file as an `io::Read`
    pub fn stream(&mut self, file: FileHandle) -> FatResult<FileStream<'_>> {
        self.cursor(file)?;
        Ok(FileStream { image: self, file })
    }
}

/// `io::Read` over an open file
pub struct FileStream<'a> {
    image: &'a mut Image,
    file: FileHandle,
}

impl Read for FileStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.image.read_file(self.file, buf.len())?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}
