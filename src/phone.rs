//! Normalization of Brazilian phone numbers.
//!
//! The canonical form is 12 digits: the country code `55`, a two digit area
//! code and an eight digit subscriber number. The ninth digit that mobile
//! numbers gained in 2012 is dropped.

use crate::Error;

/// The length of a phone number in canonical form.
pub const CANONICAL_LENGTH: usize = 12;

const COUNTRY_CODE: &str = "55";
const DEFAULT_AREA_CODE: &str = "11";
const DEFAULT_AREA_CODE_PREFIX: &str = "1";
const MOBILE_DIGIT: char = '9';

/// Rewrite `input` into the canonical `55AANNNNNNNN` form.
///
/// Non-digit characters are ignored. The rules are keyed by the number of digits:
/// - 13 digits starting with `55` with a mobile digit after the area code: the mobile digit is dropped.
/// - 12 digits: returned as digits.
/// - 11 digits with a mobile digit after the area code: the country code is added and the mobile digit dropped.
/// - 10 digits: the country code is added.
/// - 9 digits: the area code is assumed to start with `1`.
/// - 8 digits: the area code is assumed to be `11`.
///
/// Any other input is returned unchanged, so callers must check the length of
/// the result (see [validate_phone]).
pub fn normalize_phone(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        13 if digits.starts_with(COUNTRY_CODE) && digits[4..].starts_with(MOBILE_DIGIT) => {
            format!("{}{}", &digits[..4], &digits[5..])
        }
        12 => digits,
        11 if digits[2..].starts_with(MOBILE_DIGIT) => {
            format!("{COUNTRY_CODE}{}{}", &digits[..2], &digits[3..])
        }
        10 => format!("{COUNTRY_CODE}{digits}"),
        9 => format!("{COUNTRY_CODE}{DEFAULT_AREA_CODE_PREFIX}{digits}"),
        8 => format!("{COUNTRY_CODE}{DEFAULT_AREA_CODE}{digits}"),
        _ => input.to_owned(),
    }
}

/// Normalize `input` and check that the result is in canonical form.
///
/// # Errors
/// Returns [Error::InvalidPhoneNumber] if the number cannot be normalized.
pub fn validate_phone(input: &str) -> Result<String, Error> {
    let normalized = normalize_phone(input);

    if normalized.len() == CANONICAL_LENGTH && normalized.chars().all(|c| c.is_ascii_digit()) {
        Ok(normalized)
    } else {
        Err(Error::InvalidPhoneNumber(input.to_owned()))
    }
}

#[cfg(test)]
mod normalize_phone_tests {
    use super::normalize_phone;

    #[test]
    fn drops_mobile_digit_from_eleven_digits() {
        assert_eq!(normalize_phone("11987654321"), "551187654321");
    }

    #[test]
    fn adds_country_code_to_ten_digits() {
        assert_eq!(normalize_phone("1187654321"), "551187654321");
    }

    #[test]
    fn canonical_input_is_unchanged() {
        assert_eq!(normalize_phone("551187654321"), "551187654321");
    }

    #[test]
    fn drops_mobile_digit_from_full_international_number() {
        assert_eq!(normalize_phone("+55 (11) 98765-4321"), "551187654321");
    }

    #[test]
    fn ignores_formatting() {
        assert_eq!(normalize_phone("(11) 8765-4321"), "551187654321");
    }

    #[test]
    fn assumes_area_code_prefix_for_nine_digits() {
        assert_eq!(normalize_phone("187654321"), "551187654321");
    }

    #[test]
    fn assumes_default_area_code_for_eight_digits() {
        assert_eq!(normalize_phone("87654321"), "551187654321");
    }

    #[test]
    fn returns_unknown_lengths_as_is() {
        assert_eq!(normalize_phone("12345"), "12345");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn eleven_digits_without_mobile_digit_are_returned_as_is() {
        assert_eq!(normalize_phone("11887654321"), "11887654321");
    }
}
