use crate::error::Result;
use crate::Song;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Ids the create handler treats as taken.
///
/// Filled from the seed documents at startup and extended by every
/// successful create. Entries live for the whole process: updates and
/// deletes through the store never remove them, so the set can name ids the
/// store no longer holds.
#[derive(Clone, Default)]
pub struct KnownIds {
    ids: Arc<Mutex<HashSet<i64>>>,
}

impl KnownIds {
    /// Collect the ids of the given seed documents.
    pub fn from_seed(songs: &[Song]) -> KnownIds {
        let ids = songs.iter().filter_map(Song::id).collect();
        KnownIds {
            ids: Arc::new(Mutex::new(ids)),
        }
    }

    /// Claim `id`. Returns false when it was already known.
    ///
    /// Check and insert happen under one lock, two concurrent claims of the
    /// same id never both succeed.
    pub fn claim(&self, id: i64) -> Result<bool> {
        Ok(self.ids.lock()?.insert(id))
    }

    /// Give back an id claimed by a create that failed to reach the store.
    pub fn release(&self, id: i64) -> Result<()> {
        self.ids.lock()?.remove(&id);
        Ok(())
    }

    #[cfg(test)]
    fn contains(&self, id: i64) -> Result<bool> {
        Ok(self.ids.lock()?.contains(&id))
    }

    /// Number of known ids.
    pub fn len(&self) -> Result<usize> {
        Ok(self.ids.lock()?.len())
    }
}
