/// Result type returned by the songs library.
pub type Result<T> = std::result::Result<T, SongStoreError>;

/// Error returned by the songs library.
#[derive(Debug, Fail)]
pub enum SongStoreError {
    /// No store service was configured.
    #[fail(display = "missing store service, set SONGS_STORE_SERVICE")]
    MissingStoreService,

    /// Connection string could not be parsed.
    #[fail(display = "invalid connection url '{}'", url)]
    InvalidConnectionUrl {
        /// The offending url, password masked.
        url: String,
    },

    /// Connection string names an engine we do not have.
    #[fail(display = "unknown store engine '{}'", engine)]
    UnknownEngine {
        /// Requested engine / url scheme.
        engine: String,
    },

    /// Credentials did not match the ones recorded by the store.
    #[fail(display = "authentication failed for user '{}'", user)]
    AuthenticationFailure {
        /// User that attempted to connect, empty when none was given.
        user: String,
    },

    /// Failure when opening the seed file.
    #[fail(display = "failed to open seed file {}", name)]
    OpenSeedFailure {
        /// Underlying io Error.
        #[cause]
        c: std::io::Error,
        /// Name of the file.
        name: String,
    },

    /// Seed file holds something other than a list of song objects.
    #[fail(display = "invalid seed document at position {}: {}", position, reason)]
    InvalidSeedDocument {
        /// Index of the document within the seed file.
        position: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Failure inside the sled database.
    #[fail(display = "store access failure: {}", c)]
    Store {
        /// Underlying sled Error.
        #[cause]
        c: sled::Error,
    },

    /// Failure when serializing a document.
    #[fail(display = "failed to serialize document")]
    SerializationFailure {
        /// Underlying serde_json Error.
        #[cause]
        c: serde_json::error::Error,
    },

    /// Failure when deserializing a document.
    #[fail(display = "failed to deserialize document")]
    DeserializationFailure {
        /// Underlying serde_json Error.
        #[cause]
        c: serde_json::error::Error,
    },

    /// A thread panicked while holding a store lock.
    #[fail(display = "store lock poisoned")]
    LockPoisoned,

    /// Failure binding the http listener.
    #[fail(display = "failed to listen on {}: {}", addr, reason)]
    BindFailure {
        /// Requested listen address.
        addr: String,
        /// Reason reported by the http server.
        reason: String,
    },
}

impl From<sled::Error> for SongStoreError {
    fn from(c: sled::Error) -> SongStoreError {
        SongStoreError::Store { c }
    }
}

impl<T> From<std::sync::PoisonError<T>> for SongStoreError {
    fn from(_: std::sync::PoisonError<T>) -> SongStoreError {
        SongStoreError::LockPoisoned
    }
}
