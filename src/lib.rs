//! Encrypted credential wallet.
//!
//! Entries (login, password, TOTP seed, comment) are kept in one vault file
//! per wallet, sealed with AES-256-GCM under a PBKDF2-HMAC-SHA1 key derived
//! from the user's passphrase.

pub mod config;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod password;
pub mod store;
pub mod wallet;

pub use config::Config;
pub use entry::Entry;
pub use error::{Error, Result};
pub use password::random_string;
pub use wallet::Wallet;
