use thiserror::Error;

use crate::fingerprint::HashAlgorithm;

#[derive(Error, Debug)]
pub enum PhotomatchError {
    #[error("Undecodable image: {0}")]
    UndecodableImage(String),

    #[error("Fingerprints are not comparable: {left} vs {right}")]
    IncomparableFingerprints {
        left: HashAlgorithm,
        right: HashAlgorithm,
    },

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "network")]
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PhotomatchError>;
