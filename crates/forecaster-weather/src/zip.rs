//! US ZIP code extraction and validation.
//!
//! Extraction finds the first `\b\d{5}(-\d{4})?\b` substring of an address;
//! validation requires a whole string to be exactly `^\d{5}(-\d{4})?$`. The two
//! are separate steps: callers extract, then validate what they extracted.

use std::fmt;

use forecaster_core::ForecastError;
use serde::{Deserialize, Serialize};

/// A validated ZIP or ZIP+4 code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZipCode(String);

impl ZipCode {
    /// Validate a bare ZIP code.
    ///
    /// # Errors
    /// Returns `ForecastError::InvalidZipCode` unless `candidate` is exactly
    /// five digits, optionally followed by a hyphen and four digits.
    pub fn parse(candidate: &str) -> Result<Self, ForecastError> {
        if is_valid_zip(candidate) {
            Ok(Self(candidate.to_string()))
        } else {
            Err(ForecastError::InvalidZipCode)
        }
    }

    /// Pull the ZIP code out of a free-text address.
    ///
    /// # Errors
    /// `MissingAddress` for a blank address, `InvalidZipCode` when no valid
    /// ZIP can be found in it.
    pub fn from_address(address: &str) -> Result<Self, ForecastError> {
        if address.trim().is_empty() {
            return Err(ForecastError::MissingAddress);
        }

        let candidate = extract_zip(address).ok_or(ForecastError::InvalidZipCode)?;
        Self::parse(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ASCII word characters only, so accented letters count as boundaries.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Find the first ZIP-shaped substring of `address`.
///
/// Digits must sit on word boundaries. A `-dddd` suffix is included only when
/// it also ends on a boundary; otherwise the bare five digits match.
pub fn extract_zip(address: &str) -> Option<&str> {
    let chars: Vec<(usize, char)> = address.char_indices().collect();

    let offset = |i: usize| chars.get(i).map_or(address.len(), |&(pos, _)| pos);
    let is_digit = |i: usize| chars.get(i).is_some_and(|&(_, c)| c.is_ascii_digit());
    // Only ever called right after a digit, so a boundary means "no word char next".
    let ends_word = |i: usize| chars.get(i).map_or(true, |&(_, c)| !is_word_char(c));

    for start in 0..chars.len() {
        if start > 0 && is_word_char(chars[start - 1].1) {
            continue;
        }
        if !(start..start + 5).all(is_digit) {
            continue;
        }

        let five = start + 5;
        let plus_four = chars.get(five).is_some_and(|&(_, c)| c == '-')
            && (five + 1..five + 5).all(is_digit)
            && ends_word(five + 5);

        if plus_four {
            return Some(&address[offset(start)..offset(five + 5)]);
        }
        if ends_word(five) {
            return Some(&address[offset(start)..offset(five)]);
        }
    }

    None
}

/// Whether `candidate` is exactly a ZIP or ZIP+4 code, nothing more.
pub fn is_valid_zip(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    match bytes.len() {
        5 => bytes.iter().all(u8::is_ascii_digit),
        10 => {
            bytes[..5].iter().all(u8::is_ascii_digit)
                && bytes[5] == b'-'
                && bytes[6..].iter().all(u8::is_ascii_digit)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_extract_five_digit() {
        assert_eq!(
            extract_zip("123 Main St, Beverly Hills, CA 90210"),
            Some("90210")
        );
    }

    #[test]
    fn test_extract_plus_four() {
        assert_eq!(
            extract_zip("1600 Pennsylvania Ave NW, Washington, DC 20500-0003"),
            Some("20500-0003")
        );
    }

    #[test]
    fn test_extract_returns_first_match() {
        assert_eq!(extract_zip("10001 or 90210"), Some("10001"));
    }

    #[test]
    fn test_extract_none_without_zip() {
        assert_eq!(extract_zip("Invalid Address Without ZIP"), None);
        assert_eq!(extract_zip(""), None);
    }

    #[test]
    fn test_extract_rejects_short_and_long_runs() {
        assert_eq!(extract_zip("Springfield 1234"), None);
        assert_eq!(extract_zip("Order 123456 shipped"), None);
    }

    #[test]
    fn test_extract_requires_leading_boundary() {
        assert_eq!(extract_zip("Suite A12345"), None);
        assert_eq!(extract_zip("x_90210"), None);
        assert_eq!(extract_zip("CA,90210"), Some("90210"));
    }

    #[test]
    fn test_extract_falls_back_when_suffix_runs_on() {
        // "-67890" is too long to be a +4 suffix, but the hyphen still ends the word
        assert_eq!(extract_zip("12345-67890"), Some("12345"));
        assert_eq!(extract_zip("12345-678"), Some("12345"));
        assert_eq!(extract_zip("12345-"), Some("12345"));
    }

    #[test]
    fn test_extract_handles_multibyte_text() {
        assert_eq!(extract_zip("Café Olé, Miami FL 33101 ☀"), Some("33101"));
        assert_eq!(extract_zip("é90210"), Some("90210"));
        assert_eq!(extract_zip("Zürich 8001 ü90210ß"), Some("90210"));
        assert_eq!(extract_zip("a90210"), None);
    }

    #[test]
    fn test_extract_skips_earlier_non_matching_runs() {
        assert_eq!(extract_zip("Apt 1234567, NY 10001"), Some("10001"));
    }

    #[test]
    fn test_valid_zip() {
        assert!(is_valid_zip("90210"));
        assert!(is_valid_zip("90210-1234"));
    }

    #[test]
    fn test_invalid_zip() {
        assert!(!is_valid_zip("1234"));
        assert!(!is_valid_zip("123456"));
        assert!(!is_valid_zip(" 90210"));
        assert!(!is_valid_zip("90210 "));
        assert!(!is_valid_zip("90210-123"));
        assert!(!is_valid_zip("90210_1234"));
        assert!(!is_valid_zip("9021a"));
        assert!(!is_valid_zip(""));
    }

    #[test]
    fn test_zip_code_from_address() {
        let zip = ZipCode::from_address("123 Main St, Beverly Hills, CA 90210").unwrap();
        assert_eq!(zip.as_str(), "90210");
    }

    #[test]
    fn test_zip_code_from_address_plus_four() {
        let zip = ZipCode::from_address("Washington, DC 20500-0003").unwrap();
        assert_eq!(zip.as_str(), "20500-0003");
    }

    #[test]
    fn test_zip_code_blank_address() {
        assert!(matches!(
            ZipCode::from_address("   "),
            Err(ForecastError::MissingAddress)
        ));
        assert!(matches!(
            ZipCode::from_address(""),
            Err(ForecastError::MissingAddress)
        ));
    }

    #[test]
    fn test_zip_code_no_zip() {
        assert!(matches!(
            ZipCode::from_address("Invalid Address Without ZIP"),
            Err(ForecastError::InvalidZipCode)
        ));
    }

    #[test]
    fn test_zip_code_parse() {
        assert!(ZipCode::parse("02134").is_ok());
        assert!(matches!(
            ZipCode::parse("2134"),
            Err(ForecastError::InvalidZipCode)
        ));
    }
}
