//! RFC 6238 appendix B, SHA1 column, truncated to 6 digits.

use pm_wallet::{Entry, Error};
use time::OffsetDateTime;

// base32("12345678901234567890")
const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

const VECTORS: &[(i64, &str)] = &[
    (59, "287082"),
    (1_111_111_109, "081804"),
    (1_111_111_111, "050471"),
    (1_234_567_890, "005924"),
    (2_000_000_000, "279037"),
];

fn otp_entry(secret: &str) -> Entry {
    Entry {
        name: "rfc".into(),
        otp_secret: secret.into(),
        ..Entry::new()
    }
}

#[test]
fn rfc6238_sha1_vectors() {
    let entry = otp_entry(RFC_SECRET);
    for &(unix, expected) in VECTORS {
        let now = OffsetDateTime::from_unix_timestamp(unix).unwrap();
        let (code, remaining) = entry.otp_code(now).unwrap();
        assert_eq!(code, expected, "t = {unix}");
        assert_eq!(remaining, 30 - (unix as u64 % 30), "t = {unix}");
    }
}

#[test]
fn code_is_constant_within_a_step() {
    let entry = otp_entry(RFC_SECRET);
    let start = OffsetDateTime::from_unix_timestamp(1_111_111_110).unwrap();
    let (first, remaining) = entry.otp_code(start).unwrap();
    assert_eq!(remaining, 30);
    for offset in 1..30 {
        let (code, left) = entry
            .otp_code(start + time::Duration::seconds(offset))
            .unwrap();
        assert_eq!(code, first);
        assert_eq!(left, 30 - offset as u64);
    }
    let (next, _) = entry
        .otp_code(start + time::Duration::seconds(30))
        .unwrap();
    assert_ne!(next, first);
}

#[test]
fn disabled_and_broken_secrets() {
    let now = OffsetDateTime::from_unix_timestamp(59).unwrap();
    assert!(matches!(
        otp_entry("").otp_code(now),
        Err(Error::OtpNotConfigured)
    ));
    assert!(matches!(
        otp_entry("0189").otp_code(now),
        Err(Error::InvalidOtpSecret(_))
    ));
}
