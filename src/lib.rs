#![deny(missing_docs)]

//! # Songs
//! `songs` serves a collection of song documents over HTTP. Documents live
//! behind a `StoreGateway`, either an embedded sled database or an in-memory
//! collection.

pub use config::{Config, ConnectionUrl, DuplicateCheck};
pub use document::{Fields, Song};
pub use error::{Result, SongStoreError};
pub use handlers::Handlers;
pub use known_ids::KnownIds;
pub use memory::MemoryGateway;
pub use server::Server;

#[macro_use]
extern crate failure_derive;

/// Errors thrown by the songs library.
pub mod error;

/// Startup configuration.
pub mod config;

/// The song document type.
pub mod document;

/// Request handlers, one per endpoint.
pub mod handlers;

/// Cache of song ids used for duplicate detection on create.
pub mod known_ids;

mod memory;

/// Response bodies exchanged with http clients.
pub mod network;

/// Reading the seed data set.
pub mod seed;

mod server;

/// Bindings for sled database.
pub mod sled;

/// Outcome of `StoreGateway::update_fields`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// A document with the requested id exists.
    pub matched: bool,
    /// At least one field value changed.
    pub modified: bool,
}

/// StoreGateway is the only component touching the song collection.
///
/// Every method is a single store operation; concurrent callers rely on the
/// store's per-document atomicity.
pub trait StoreGateway: Clone + Send + Sync + 'static {
    /// Replace the whole collection with the given documents.
    fn seed(&self, songs: Vec<Song>) -> Result<()>;
    /// Number of stored documents.
    fn count(&self) -> Result<usize>;
    /// Every stored document, in store order.
    fn list_all(&self) -> Result<Vec<Song>>;
    /// First document whose `id` field equals `id`.
    fn find_by_id(&self, id: i64) -> Result<Option<Song>>;
    /// Store the document as-is.
    fn insert(&self, song: Song) -> Result<()>;
    /// Merge `fields` into the first document matching `id`.
    fn update_fields(&self, id: i64, fields: &Fields) -> Result<UpdateOutcome>;
    /// Remove the first document matching `id`, returning whether one was
    /// removed.
    fn delete_by_id(&self, id: i64) -> Result<bool>;
}
