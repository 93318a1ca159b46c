use crate::error::{Result, SongStoreError};
use crate::Song;
use serde_json::Value;
use std::path::Path;

/// Read the seed file: a JSON array of song objects, each with an integer
/// `id`.
pub fn load(path: &Path) -> Result<Vec<Song>> {
    let file = std::fs::File::open(path).map_err(|c| SongStoreError::OpenSeedFailure {
        c,
        name: path.display().to_string(),
    })?;

    let value: Value = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|c| SongStoreError::DeserializationFailure { c })?;

    parse(value)
}

/// Validate an already decoded seed data set.
pub fn parse(value: Value) -> Result<Vec<Song>> {
    let items = match value {
        Value::Array(items) => items,
        _ => {
            return Err(SongStoreError::InvalidSeedDocument {
                position: 0,
                reason: "seed data must be a list of songs".to_string(),
            })
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| match item {
            Value::Object(fields) => {
                let song = Song::new(fields);
                if song.id().is_none() {
                    return Err(SongStoreError::InvalidSeedDocument {
                        position,
                        reason: "missing integer id".to_string(),
                    });
                }
                Ok(song)
            }
            _ => Err(SongStoreError::InvalidSeedDocument {
                position,
                reason: "not an object".to_string(),
            }),
        })
        .collect()
}
