use crate::error::{Error, Result};
use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use sha1::Sha1;
use zeroize::Zeroizing;

/// Число итераций PBKDF2-HMAC-SHA1.
pub const KDF_ITERATIONS: u32 = 4096;
pub const KEY_LEN: usize = 32;
/// AES-GCM nonce, 96 бит.
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const SALT_LEN: usize = 16;

/// Ключ AES-256-GCM, выведенный из пароля и соли.
///
/// Ключ выводится один раз в `new`, затем `seal`/`open` работают с
/// конвертами `base64(nonce || ciphertext || tag)`.
pub struct Cipher {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl Cipher {
    pub fn new(passphrase: &str, salt: &str) -> Self {
        Self {
            key: derive_key(passphrase, salt),
        }
    }

    /// Шифрует данные со свежим случайным nonce на каждый вызов.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String> {
        let raw = self.seal_raw(plaintext)?;
        Ok(general_purpose::STANDARD.encode(raw))
    }

    /// Расшифровывает конверт. Любая порча конверта даёт `Error::Authentication`.
    pub fn open(&self, envelope: &str) -> Result<Zeroizing<Vec<u8>>> {
        let raw = general_purpose::STANDARD
            .decode(envelope.trim())
            .map_err(|_| Error::Authentication)?;
        self.open_raw(&raw)
    }

    pub(crate) fn seal_raw(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.as_slice()));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| Error::Encryption)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub(crate) fn open_raw(&self, raw: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::Authentication);
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.as_slice()));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::Authentication)?;

        Ok(Zeroizing::new(plaintext))
    }
}

/// Шифрование с выводом ключа из пароля и соли.
pub fn encrypt(plaintext: &[u8], passphrase: &str, salt: &str) -> Result<String> {
    Cipher::new(passphrase, salt).seal(plaintext)
}

/// Дешифрование конверта, полученного из [`encrypt`].
pub fn decrypt(envelope: &str, passphrase: &str, salt: &str) -> Result<Zeroizing<Vec<u8>>> {
    Cipher::new(passphrase, salt).open(envelope)
}

/// Случайная соль для нового хранилища (base64 от 16 байт).
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    general_purpose::STANDARD.encode(salt)
}

fn derive_key(passphrase: &str, salt: &str) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha1>(
        passphrase.as_bytes(),
        salt.as_bytes(),
        KDF_ITERATIONS,
        key.as_mut_slice(),
    );
    key
}
