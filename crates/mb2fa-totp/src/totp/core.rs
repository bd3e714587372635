//! Core OTP generation — base-32 secret decoding and RFC 6238 TOTP.
//!
//! HMAC-SHA1 over the big-endian 8-byte time-step counter, dynamic
//! truncation per RFC 4226 §5.3, zero-padded to the requested digit count.
//! Everything here is a pure function of its inputs.

use crate::totp::types::*;
use hmac::{Hmac, Mac};
use sha1::Sha1;

/// Default code length.
pub const DEFAULT_DIGITS: u8 = 6;
/// Default window length in seconds.
pub const DEFAULT_PERIOD: u32 = 30;
/// Longest code a 31-bit truncated value can fill.
pub const MAX_DIGITS: u8 = 9;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Base-32 codec (RFC 4648)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a base-32 secret (with or without spaces/dashes/padding,
/// case-insensitive).
pub fn decode_secret(b32: &str) -> Result<Vec<u8>, TotpError> {
    let cleaned = normalise_secret(b32);
    let body = cleaned.trim_end_matches('=');
    let padding = cleaned.len() - body.len();
    if !body.chars().all(|c| matches!(c, 'A'..='Z' | '2'..='7')) {
        return Err(TotpError::new(
            TotpErrorKind::InvalidSecret,
            "Secret contains characters outside the base-32 alphabet",
        ));
    }
    // 1, 3 and 6 trailing characters cannot come from whole bytes.
    if matches!(body.len() % 8, 1 | 3 | 6) {
        return Err(TotpError::new(
            TotpErrorKind::InvalidSecret,
            "Invalid base-32 secret length",
        )
        .with_detail(format!("{} characters", body.len())));
    }
    // Padding is optional, but when present it must complete the last block.
    if padding > 0 && padding != expected_padding(body.len()) {
        return Err(TotpError::new(
            TotpErrorKind::InvalidSecret,
            "Invalid base-32 padding",
        )
        .with_detail(format!("{} '=' after {} characters", padding, body.len())));
    }
    base32::decode(base32::Alphabet::Rfc4648 { padding: true }, &pad_base32(body))
        .ok_or_else(|| TotpError::new(TotpErrorKind::InvalidSecret, "Invalid base-32 secret"))
}

/// Encode raw bytes to base-32 (no padding, uppercase).
pub fn encode_secret(bytes: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, bytes)
}

/// Uppercase and strip the separators people paste in from QR setup pages.
pub fn normalise_secret(b32: &str) -> String {
    b32.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

/// Check if a string looks like a valid, non-empty base-32 secret.
pub fn is_valid_base32(s: &str) -> bool {
    matches!(decode_secret(s), Ok(bytes) if !bytes.is_empty())
}

/// Number of '=' that complete a body of `len` characters to a whole block.
fn expected_padding(len: usize) -> usize {
    match len % 8 {
        0 => 0,
        rem => 8 - rem,
    }
}

/// Pad an unpadded base-32 string to a multiple of 8 with '='.
fn pad_base32(s: &str) -> String {
    format!("{}{}", s, "=".repeat(expected_padding(s.len())))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw HMAC-OTP (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute an HOTP code for the given raw key bytes and counter.
pub fn hotp_raw(key: &[u8], counter: u64, digits: u8) -> Result<String, TotpError> {
    check_digits(digits)?;
    if key.is_empty() {
        return Err(TotpError::new(
            TotpErrorKind::GenerationFailed,
            "Secret decodes to an empty key",
        ));
    }
    let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|e| {
        TotpError::new(TotpErrorKind::GenerationFailed, "HMAC key rejected")
            .with_detail(e.to_string())
    })?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(truncate(&digest, digits))
}

fn check_digits(digits: u8) -> Result<(), TotpError> {
    if digits == 0 || digits > MAX_DIGITS {
        return Err(TotpError::new(
            TotpErrorKind::InvalidDigits,
            format!("Unsupported digit count: {}", digits),
        ));
    }
    Ok(())
}

/// Dynamic truncation per RFC 4226 §5.3.
fn truncate(hmac_result: &[u8], digits: u8) -> String {
    let offset = (hmac_result[hmac_result.len() - 1] & 0x0f) as usize;
    let binary = ((hmac_result[offset] as u32 & 0x7f) << 24)
        | ((hmac_result[offset + 1] as u32) << 16)
        | ((hmac_result[offset + 2] as u32) << 8)
        | (hmac_result[offset + 3] as u32);
    let modulus = 10u32.pow(digits as u32);
    let code = binary % modulus;
    format!("{:0>width$}", code, width = digits as usize)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP (time-based, RFC 6238)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Time-step counter for a given unix timestamp.
pub fn time_step_at(unix_seconds: u64, period: u32) -> u64 {
    unix_seconds / period as u64
}

/// Seconds remaining in the window containing `unix_seconds`, in `1..=period`.
/// `period` means the window just rolled over.
pub fn seconds_remaining_at(unix_seconds: u64, period: u32) -> u32 {
    let p = period as u64;
    (p - (unix_seconds % p)) as u32
}

/// Generate a TOTP code from raw key bytes at an explicit unix timestamp.
pub fn generate(key: &[u8], unix_seconds: u64, digits: u8, period: u32) -> Result<String, TotpError> {
    if period == 0 {
        return Err(TotpError::new(
            TotpErrorKind::InvalidPeriod,
            "Period must be at least one second",
        ));
    }
    hotp_raw(key, time_step_at(unix_seconds, period), digits)
}

/// Decode a base-32 secret and generate its code at `unix_seconds`.
pub fn generate_from_secret(
    secret_b32: &str,
    unix_seconds: u64,
    digits: u8,
    period: u32,
) -> Result<String, TotpError> {
    let key = decode_secret(secret_b32)?;
    generate(&key, unix_seconds, digits, period)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Secret: "12345678901234567890" (ASCII) → base32: GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
    const RFC_KEY: &[u8] = b"12345678901234567890";

    // ── RFC 4226 Appendix D ──────────────────────────────────────

    #[test]
    fn rfc4226_hotp_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314",
            "254676", "287922", "162583", "399871", "520489",
        ];
        for (counter, exp) in expected.iter().enumerate() {
            let code = hotp_raw(RFC_KEY, counter as u64, 6).unwrap();
            assert_eq!(&code, exp, "HOTP mismatch at counter {}", counter);
        }
    }

    // ── RFC 6238 Appendix B (SHA-1) ──────────────────────────────

    #[test]
    fn rfc6238_eight_digit_vectors() {
        let vectors = [
            (59u64, "94287082"),
            (1111111109, "07081804"),
            (1111111111, "14050471"),
            (1234567890, "89005924"),
            (2000000000, "69279037"),
            (20000000000, "65353130"),
        ];
        for (t, exp) in vectors {
            assert_eq!(generate(RFC_KEY, t, 8, 30).unwrap(), exp, "T={}", t);
        }
    }

    #[test]
    fn rfc6238_six_digit_reduction() {
        // Same HMAC as the 8-digit vector, reduced mod 10^6.
        let code = generate_from_secret(RFC_SECRET, 59, 6, 30).unwrap();
        assert_eq!(code, "287082");
        assert_eq!(&"94287082"[2..], code);
    }

    #[test]
    fn leading_zeros_are_kept() {
        let code = generate(RFC_KEY, 1111111109, 8, 30).unwrap();
        assert!(code.starts_with('0'));
        assert_eq!(code.len(), 8);
    }

    // ── Window behaviour ─────────────────────────────────────────

    #[test]
    fn same_code_within_window() {
        let a = generate(RFC_KEY, 60, 6, 30).unwrap();
        for t in 61..90 {
            assert_eq!(generate(RFC_KEY, t, 6, 30).unwrap(), a);
        }
        assert_ne!(generate(RFC_KEY, 90, 6, 30).unwrap(), a);
    }

    #[test]
    fn time_step_calculation() {
        assert_eq!(time_step_at(0, 30), 0);
        assert_eq!(time_step_at(29, 30), 0);
        assert_eq!(time_step_at(30, 30), 1);
        assert_eq!(time_step_at(59, 30), 1);
        assert_eq!(time_step_at(60, 30), 2);
    }

    #[test]
    fn seconds_remaining_calculation() {
        assert_eq!(seconds_remaining_at(0, 30), 30);
        assert_eq!(seconds_remaining_at(1, 30), 29);
        assert_eq!(seconds_remaining_at(29, 30), 1);
        assert_eq!(seconds_remaining_at(30, 30), 30);
    }

    // ── Failure modes ────────────────────────────────────────────

    #[test]
    fn empty_key_is_generation_error() {
        let err = generate(&[], 59, 6, 30).unwrap_err();
        assert_eq!(err.kind, TotpErrorKind::GenerationFailed);
        let err = generate_from_secret("", 59, 6, 30).unwrap_err();
        assert_eq!(err.kind, TotpErrorKind::GenerationFailed);
    }

    #[test]
    fn bad_alphabet_is_decode_error() {
        assert_eq!(
            decode_secret("!!!").unwrap_err().kind,
            TotpErrorKind::InvalidSecret
        );
        assert_eq!(
            decode_secret("JBSWY3DP1").unwrap_err().kind,
            TotpErrorKind::InvalidSecret
        );
        assert_eq!(
            generate_from_secret("not*base32", 59, 6, 30).unwrap_err().kind,
            TotpErrorKind::InvalidSecret
        );
        // Padding only at the end, and only after a whole number of bytes.
        assert!(decode_secret("JBSW=Y3DP").is_err());
        assert!(decode_secret("JBSWY3DPE").is_err());
    }

    #[test]
    fn padding_must_complete_the_block() {
        for bad in ["MZXW6=", "MZXW6YQ========", "NBSWY3DP=", "MZXW6YQ==", "MZ====="] {
            assert_eq!(
                decode_secret(bad).unwrap_err().kind,
                TotpErrorKind::InvalidSecret,
                "{:?} should be rejected",
                bad
            );
        }
        assert_eq!(decode_secret("MZXW6===").unwrap(), b"foo");
        assert_eq!(decode_secret("MZXW6YQ=").unwrap(), b"foob");
        assert_eq!(decode_secret("MZXQ====").unwrap(), b"fo");
        assert_eq!(decode_secret("MY======").unwrap(), b"f");
    }

    #[test]
    fn unusable_parameters_are_errors() {
        assert_eq!(
            generate(RFC_KEY, 59, 6, 0).unwrap_err().kind,
            TotpErrorKind::InvalidPeriod
        );
        assert_eq!(
            generate(RFC_KEY, 59, 10, 30).unwrap_err().kind,
            TotpErrorKind::InvalidDigits
        );
        assert_eq!(
            hotp_raw(RFC_KEY, 0, 0).unwrap_err().kind,
            TotpErrorKind::InvalidDigits
        );
        assert_eq!(hotp_raw(RFC_KEY, 0, 9).unwrap().len(), 9);
    }

    // ── Codec ────────────────────────────────────────────────────

    #[test]
    fn decode_known_secret() {
        assert_eq!(decode_secret(RFC_SECRET).unwrap(), RFC_KEY);
    }

    #[test]
    fn decode_with_padding_spaces_dashes() {
        let clean = decode_secret("JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(decode_secret("JBSW Y3DP EHPK 3PXP").unwrap(), clean);
        assert_eq!(decode_secret("JBSW-Y3DP-EHPK-3PXP").unwrap(), clean);
        assert_eq!(decode_secret("jbswy3dpehpk3pxp").unwrap(), clean);

        let short = encode_secret(b"foo");
        assert_eq!(decode_secret(&short).unwrap(), b"foo");
        assert_eq!(decode_secret(&format!("{}===", short)).unwrap(), b"foo");
    }

    #[test]
    fn is_valid_base32_check() {
        assert!(is_valid_base32("JBSWY3DPEHPK3PXP"));
        assert!(is_valid_base32("jbsw y3dp ehpk 3pxp"));
        assert!(!is_valid_base32(""));
        assert!(!is_valid_base32("!!!"));
    }
}
