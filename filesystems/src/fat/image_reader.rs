// Image storage with a single shared read cursor
// Directory scans, chain walks and file reads interleave on the same cursor,
// so every read names its absolute offset and seeks only when the cursor is elsewhere.

use fatscope_core::{FatError, FatResult};
use log::trace;
use std::io::{Read, Seek, SeekFrom};

/// Anything an image can be read from
pub trait ImageSource: Read + Seek {}

impl<T: Read + Seek> ImageSource for T {}

pub struct ImageReader {
    source: Box<dyn ImageSource>,
    /// Known cursor position, `None` after a failed operation
    cursor: Option<u64>,
    seeks: u64,
}

impl ImageReader {
    pub fn new<S: ImageSource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
            cursor: None,
            seeks: 0,
        }
    }

    /// Number of seeks actually issued to the source
    pub fn seek_count(&self) -> u64 {
        self.seeks
    }

    /// Move the cursor to `offset` unless it is already there
    pub fn seek_to(&mut self, offset: u64) -> FatResult<()> {
        if self.cursor == Some(offset) {
            return Ok(());
        }

        trace!("Seeking image cursor to {:#x}", offset);
        self.seeks += 1;
        match self.source.seek(SeekFrom::Start(offset)) {
            Ok(pos) => {
                self.cursor = Some(pos);
                Ok(())
            }
            Err(e) => {
                self.cursor = None;
                Err(FatError::StorageIo(e))
            }
        }
    }

    /// Fill `buf` from `offset`
    pub fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> FatResult<()> {
        self.seek_to(offset)?;
        match self.source.read_exact(buf) {
            Ok(()) => {
                self.cursor = Some(offset + buf.len() as u64);
                Ok(())
            }
            Err(e) => {
                self.cursor = None;
                Err(FatError::StorageIo(e))
            }
        }
    }

    /// Read `len` bytes from `offset` into a new buffer
    pub fn read_at(&mut self, offset: u64, len: usize) -> FatResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.append_at(offset, len, &mut buf)?;
        Ok(buf)
    }

    /// Append `len` bytes read from `offset` to `out`
    pub fn append_at(&mut self, offset: u64, len: usize, out: &mut Vec<u8>) -> FatResult<()> {
        let start = out.len();
        out.try_reserve(len)
            .map_err(|e| FatError::AllocationFailure(format!("{} bytes: {}", len, e)))?;
        out.resize(start + len, 0);
        let result = self.read_exact_at(offset, &mut out[start..]);
        if result.is_err() {
            out.truncate(start);
        }
        result
    }
}
