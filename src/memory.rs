use crate::error::Result;
use crate::{Fields, Song, StoreGateway, UpdateOutcome};
use std::sync::{Arc, RwLock};

/// MemoryGateway keeps the collection in process memory.
///
/// # Example
///
/// ``` rust
/// use songs::{MemoryGateway, Song, StoreGateway};
///
/// let store = MemoryGateway::new();
/// let song: Song = serde_json::from_str(r#"{"id": 1, "title": "A"}"#).unwrap();
///
/// store.insert(song.clone()).unwrap();
///
/// assert_eq!(store.count().unwrap(), 1);
/// assert_eq!(store.find_by_id(1).unwrap(), Some(song));
/// assert_eq!(store.find_by_id(2).unwrap(), None);
/// ```
///
#[derive(Clone, Default)]
pub struct MemoryGateway {
    songs: Arc<RwLock<Vec<Song>>>,
}

impl MemoryGateway {
    /// Create an empty collection.
    pub fn new() -> MemoryGateway {
        MemoryGateway::default()
    }
}

impl StoreGateway for MemoryGateway {
    fn seed(&self, songs: Vec<Song>) -> Result<()> {
        *self.songs.write()? = songs;
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.songs.read()?.len())
    }

    fn list_all(&self) -> Result<Vec<Song>> {
        Ok(self.songs.read()?.clone())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Song>> {
        Ok(self
            .songs
            .read()?
            .iter()
            .find(|s| s.id() == Some(id))
            .cloned())
    }

    fn insert(&self, song: Song) -> Result<()> {
        self.songs.write()?.push(song);
        Ok(())
    }

    fn update_fields(&self, id: i64, fields: &Fields) -> Result<UpdateOutcome> {
        let mut songs = self.songs.write()?;

        match songs.iter_mut().find(|s| s.id() == Some(id)) {
            Some(song) => Ok(UpdateOutcome {
                matched: true,
                modified: song.merge(fields),
            }),
            None => Ok(UpdateOutcome {
                matched: false,
                modified: false,
            }),
        }
    }

    fn delete_by_id(&self, id: i64) -> Result<bool> {
        let mut songs = self.songs.write()?;

        match songs.iter().position(|s| s.id() == Some(id)) {
            Some(pos) => {
                songs.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
