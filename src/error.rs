use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Tag check failed: wrong passphrase, wrong salt or a tampered envelope.
    #[error("authentication failed: wrong passphrase or corrupted vault")]
    Authentication,

    #[error("AES-256-GCM encryption failed")]
    Encryption,

    #[error("vault storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed vault: {0}")]
    MalformedVault(String),

    #[error("malformed import: {0}")]
    MalformedImport(String),

    #[error("entry {0} not found")]
    EntryNotFound(String),

    #[error("entry {0} already exists")]
    DuplicateEntry(String),

    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    #[error("no OTP secret configured for this entry")]
    OtpNotConfigured,

    #[error("invalid OTP secret (base32): {0}")]
    InvalidOtpSecret(String),

    #[error("invalid password generator configuration: {0}")]
    InvalidConfiguration(String),
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::StorageUnavailable {
            path: path.into(),
            source,
        }
    }
}
