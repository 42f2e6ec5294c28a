// Read-only FAT12/16/32 image interpretation
pub mod fat;

#[cfg(test)]
pub mod test_helpers;

pub use fat::{
    ClosedHandles, Entry, EntryHandle, FatDateTime, FatType, FileAttributes, FileHandle,
    FileStream, Geometry, Image,
};
pub use fatscope_core::{FatError, FatResult};
