use crate::error::{Error, Result};
use rand::Rng;
use rand::rngs::OsRng;

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SPECIAL: &[u8] = b"!@#$%^&*()-_=+[]{};:,.<>?/";

/// Случайная строка длины `length` из включённых классов символов.
///
/// Каждый символ выбирается независимо и равномерно через `OsRng`;
/// `gen_range` использует выборку с отклонением, поэтому смещения по модулю нет.
pub fn random_string(
    length: usize,
    use_letters: bool,
    use_digits: bool,
    use_special: bool,
) -> Result<String> {
    if length == 0 {
        return Err(Error::InvalidConfiguration(
            "length must be greater than zero".to_string(),
        ));
    }

    let mut charset: Vec<u8> = Vec::new();
    if use_letters {
        charset.extend_from_slice(LETTERS);
    }
    if use_digits {
        charset.extend_from_slice(DIGITS);
    }
    if use_special {
        charset.extend_from_slice(SPECIAL);
    }
    if charset.is_empty() {
        return Err(Error::InvalidConfiguration(
            "at least one character class must be enabled".to_string(),
        ));
    }

    let mut rng = OsRng;
    let out = (0..length)
        .map(|_| char::from(charset[rng.gen_range(0..charset.len())]))
        .collect();
    Ok(out)
}
