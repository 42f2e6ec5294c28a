// Open handle tracking
// Images own a registry of open entries, entries own a registry of open files.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unordered map from a stable id to the record it owns
#[derive(Debug)]
pub struct HandleRegistry<T> {
    items: HashMap<HandleId, T>,
    next_id: u64,
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<T> HandleRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record under a fresh id. Ids are never reused.
    pub fn insert(&mut self, item: T) -> HandleId {
        let id = HandleId(self.next_id);
        self.next_id += 1;
        self.items.insert(id, item);
        id
    }

    pub fn get(&self, id: HandleId) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: HandleId) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    pub fn remove(&mut self, id: HandleId) -> Option<T> {
        self.items.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// Remove every record, leaving the registry empty
    pub fn drain(&mut self) -> Vec<(HandleId, T)> {
        self.items.drain().collect()
    }
}

/// An open entry of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(pub(crate) HandleId);

impl fmt::Display for EntryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry {}", self.0)
    }
}

/// An open read cursor on an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle {
    pub(crate) entry: EntryHandle,
    pub(crate) id: HandleId,
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file {} of {}", self.id, self.entry)
    }
}
