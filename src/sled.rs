use crate::config::ConnectionUrl;
use crate::error::{Result, SongStoreError};
use crate::{Fields, Song, StoreGateway, UpdateOutcome};
use log::{debug, info};
use sled::{Batch, Db, IVec, Tree};

const SONGS_TREE: &str = "songs";
const META_TREE: &str = "meta";
const CREDENTIALS_KEY: &str = "credentials";

/// Url scheme selecting this gateway.
pub const SCHEME: &str = "sled";

/// Adapter storing song documents in a sled database.
///
/// Documents are JSON encoded under store generated `u64` keys. Keys are
/// stored big-endian, so iteration order is insertion order and the "first"
/// document for an id is the oldest one.
#[derive(Clone)]
pub struct SledGateway {
    db: Db,
    songs: Tree,
}

impl SledGateway {
    /// Open a sled database on the given path returning the SledGateway
    /// adapter.
    pub fn open(path: &std::path::Path) -> Result<SledGateway> {
        let db = sled::open(path)?;
        let songs = db.open_tree(SONGS_TREE)?;

        Ok(SledGateway { db, songs })
    }

    /// Open the database named by `url` and check its credentials.
    ///
    /// The first connection supplying credentials records them; every later
    /// connection has to present the same pair.
    pub fn connect(url: &ConnectionUrl) -> Result<SledGateway> {
        if url.scheme != SCHEME {
            return Err(SongStoreError::UnknownEngine {
                engine: url.scheme.clone(),
            });
        }

        let gateway = SledGateway::open(std::path::Path::new(&url.host))?;
        gateway.authenticate(url.credentials.as_ref())?;

        Ok(gateway)
    }

    fn authenticate(&self, credentials: Option<&(String, String)>) -> Result<()> {
        let meta = self.db.open_tree(META_TREE)?;
        let recorded = match meta.get(CREDENTIALS_KEY)? {
            Some(raw) => Some(
                serde_json::from_slice::<(String, String)>(&raw)
                    .map_err(|c| SongStoreError::DeserializationFailure { c })?,
            ),
            None => None,
        };

        match (recorded, credentials) {
            (None, None) => Ok(()),
            (None, Some(given)) => {
                info!("recording credentials for user '{}'", given.0);
                let raw = serde_json::to_vec(given)
                    .map_err(|c| SongStoreError::SerializationFailure { c })?;
                meta.insert(CREDENTIALS_KEY, raw)?;
                meta.flush()?;
                Ok(())
            }
            (Some(ref recorded), Some(given)) if recorded == given => Ok(()),
            (Some(_), given) => Err(SongStoreError::AuthenticationFailure {
                user: given.map(|(u, _)| u.clone()).unwrap_or_default(),
            }),
        }
    }

    fn new_key(&self) -> Result<[u8; 8]> {
        Ok(self.db.generate_id()?.to_be_bytes())
    }

    /// First entry whose document carries `id`, with its key and raw bytes.
    fn find_entry(&self, id: i64) -> Result<Option<(IVec, IVec, Song)>> {
        for entry in self.songs.iter() {
            let (key, raw) = entry?;
            let song = decode(&raw)?;
            if song.id() == Some(id) {
                return Ok(Some((key, raw, song)));
            }
        }

        Ok(None)
    }
}

fn encode(song: &Song) -> Result<Vec<u8>> {
    serde_json::to_vec(song).map_err(|c| SongStoreError::SerializationFailure { c })
}

fn decode(raw: &[u8]) -> Result<Song> {
    serde_json::from_slice(raw).map_err(|c| SongStoreError::DeserializationFailure { c })
}

impl StoreGateway for SledGateway {
    fn seed(&self, songs: Vec<Song>) -> Result<()> {
        let mut batch = Batch::default();

        for key in self.songs.iter().keys() {
            batch.remove(key?);
        }
        for song in &songs {
            let key = self.new_key()?;
            batch.insert(&key[..], encode(song)?);
        }

        self.songs.apply_batch(batch)?;
        self.songs.flush()?;

        debug!("replaced collection with {} documents", songs.len());
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.songs.len())
    }

    fn list_all(&self) -> Result<Vec<Song>> {
        self.songs
            .iter()
            .values()
            .map(|raw| decode(&raw?))
            .collect()
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Song>> {
        Ok(self.find_entry(id)?.map(|(_, _, song)| song))
    }

    fn insert(&self, song: Song) -> Result<()> {
        let key = self.new_key()?;
        self.songs.insert(key, encode(&song)?)?;
        // TODO: Batch flushes instead of flushing on every write.
        self.songs.flush()?;
        Ok(())
    }

    fn update_fields(&self, id: i64, fields: &Fields) -> Result<UpdateOutcome> {
        loop {
            let (key, raw, mut song) = match self.find_entry(id)? {
                Some(entry) => entry,
                None => {
                    return Ok(UpdateOutcome {
                        matched: false,
                        modified: false,
                    })
                }
            };

            if !song.merge(fields) {
                return Ok(UpdateOutcome {
                    matched: true,
                    modified: false,
                });
            }

            // Only swap in the merge if nobody wrote the document since we
            // read it.
            match self.songs.compare_and_swap(&key, Some(&raw), Some(encode(&song)?))? {
                Ok(()) => {
                    self.songs.flush()?;
                    return Ok(UpdateOutcome {
                        matched: true,
                        modified: true,
                    });
                }
                Err(_) => debug!("song {} changed during update, merging again", id),
            }
        }
    }

    fn delete_by_id(&self, id: i64) -> Result<bool> {
        let key = match self.find_entry(id)? {
            Some((key, _, _)) => key,
            None => return Ok(false),
        };

        let removed = self.songs.remove(key)?.is_some();
        self.songs.flush()?;
        Ok(removed)
    }
}
