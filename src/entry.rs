use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use totp_rs::{Algorithm, Secret, TOTP};
use uuid::Uuid;
use zeroize::Zeroize;

/// TOTP time step in seconds.
pub const OTP_PERIOD: u64 = 30;
pub const OTP_DIGITS: usize = 6;

/// One credential record.
///
/// The JSON shape (`id`, `name`, `group`, `uri`, `user`, `password`, `otp`,
/// `comment`) is shared by the encrypted payload and by import/export
/// documents. Missing fields deserialize as empty strings, which lets an
/// import omit `id`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
#[serde(default)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub group: String,
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Base32 TOTP seed. Empty string means OTP is disabled.
    #[serde(rename = "otp")]
    pub otp_secret: String,
    pub comment: String,
}

impl Entry {
    /// Empty entry with a fresh id.
    pub fn new() -> Self {
        let mut entry = Self::default();
        entry.generate_id();
        entry
    }

    /// Assigns a new random 128-bit identifier.
    pub fn generate_id(&mut self) {
        self.id = Uuid::new_v4().simple().to_string();
    }

    pub fn has_otp(&self) -> bool {
        !self.otp_secret.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidEntry("id is empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidEntry(format!("entry {} has no name", self.id)));
        }
        if self.has_otp() {
            decode_otp_secret(&self.otp_secret)?;
        }
        Ok(())
    }

    /// Current RFC 6238 code (HMAC-SHA1, 6 digits, 30 s step) and the number
    /// of seconds it stays valid.
    ///
    /// Instants before the Unix epoch are clamped to the epoch.
    pub fn otp_code(&self, now: OffsetDateTime) -> Result<(String, u64)> {
        if !self.has_otp() {
            return Err(Error::OtpNotConfigured);
        }
        let secret = decode_otp_secret(&self.otp_secret)?;

        // unchecked: real-world seeds are often 80 bits, below the 128 bit minimum of TOTP::new
        let totp = TOTP::new_unchecked(Algorithm::SHA1, OTP_DIGITS, 1, OTP_PERIOD, secret);

        let secs = u64::try_from(now.unix_timestamp()).unwrap_or(0);
        let code = totp.generate(secs);
        Ok((code, OTP_PERIOD - secs % OTP_PERIOD))
    }

    /// Case-insensitive substring match on name, uri, user and comment.
    /// `pattern` must already be lowercase.
    pub(crate) fn matches(&self, pattern: &str) -> bool {
        [&self.name, &self.uri, &self.user, &self.comment]
            .iter()
            .any(|field| field.to_lowercase().contains(pattern))
    }
}

// пароль и OTP-секрет в логи и panic-сообщения не попадают
impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("group", &self.group)
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"***")
            .field("otp", &if self.has_otp() { "***" } else { "" })
            .field("comment", &self.comment)
            .finish()
    }
}

/// Decodes a base32 seed, tolerating spaces, lowercase and `=` padding.
pub fn decode_otp_secret(secret: &str) -> Result<Vec<u8>> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let bytes = Secret::Encoded(normalized)
        .to_bytes()
        .map_err(|e| Error::InvalidOtpSecret(format!("{e:?}")))?;

    if bytes.is_empty() {
        return Err(Error::InvalidOtpSecret(
            "secret decoded to empty byte string".to_string(),
        ));
    }
    Ok(bytes)
}
