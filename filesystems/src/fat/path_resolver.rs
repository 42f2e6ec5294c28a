// Path resolution
// Walks slash separated paths one directory level at a time, closing every
// entry that is not on the way to the target.

use fatscope_core::{FatError, FatResult};
use log::debug;

use super::constants::PATH_DELIMITER;
use super::handles::EntryHandle;
use super::image::Image;

impl Image {
    /// Open the child of `parent` named exactly `name`.
    ///
    /// The first match wins; every other child opened by the scan is closed again.
    pub fn resolve_child(&mut self, parent: EntryHandle, name: &str) -> FatResult<EntryHandle> {
        let children = self.list_children(parent)?;

        let mut found = None;
        for child in children {
            if found.is_none() && self.entry(child)?.name == name {
                found = Some(child);
            } else {
                self.close_entry(child)?;
            }
        }

        found.ok_or_else(|| FatError::NotFound(name.to_string()))
    }

    /// Open the entry at `path` below `base`. Empty segments are ignored, so
    /// `"a//b/"` is the same as `"a/b"` and `""` yields a copy of `base`.
    pub fn resolve_descendant(&mut self, base: EntryHandle, path: &str) -> FatResult<EntryHandle> {
        let mut current = self.duplicate_entry(base)?;

        for segment in path.split(PATH_DELIMITER).filter(|s| !s.is_empty()) {
            let next = match self.resolve_child(current, segment) {
                Ok(next) => next,
                Err(e) => {
                    self.close_entry(current)?;
                    return Err(e);
                }
            };
            self.close_entry(current)?;
            current = next;
        }

        Ok(current)
    }

    /// Open the entry at an absolute path
    pub fn open_entry(&mut self, path: &str) -> FatResult<EntryHandle> {
        debug!("Resolving '{}'", path);
        let root = self.root_entry();
        let result = self.resolve_descendant(root, path);
        self.close_entry(root)?;
        result
    }

    /// Open `path`, absolute when it starts with `/`, otherwise relative to `base`
    pub fn resolve(&mut self, base: EntryHandle, path: &str) -> FatResult<EntryHandle> {
        if path.starts_with(PATH_DELIMITER) {
            self.open_entry(path)
        } else {
            self.resolve_descendant(base, path)
        }
    }
}
