use crate::Song;
use serde::{Deserialize, Serialize};

/// Body of `GET /health`.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Health {
    /// Always "OK".
    pub status: String,
}

/// Body of `GET /count`.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Count {
    /// Number of stored songs.
    pub count: usize,
}

/// Body of `GET /song`.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct SongList {
    /// Every stored song.
    pub songs: Vec<Song>,
}

/// Plain message sent with 200, 201, 400 and 404 responses.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    /// Human readable outcome.
    pub message: String,
}

impl Message {
    /// Build a message body.
    pub fn new(message: impl Into<String>) -> Message {
        Message {
            message: message.into(),
        }
    }
}

/// Body of a create request rejected as a duplicate.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Conflict {
    /// Human readable outcome. Capitalized for compatibility with existing
    /// clients.
    #[serde(rename = "Message")]
    pub message: String,
}

/// Failure response sent when the store could not be reached.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Error {
    /// What the server was trying to do.
    pub error: String,
    /// Error reported by the store.
    pub message: String,
}
