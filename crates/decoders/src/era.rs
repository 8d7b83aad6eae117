//! Calendar era conversion
//!
//! Taiwan cards store dates in the Minguo (Republic of China) calendar as
//! `YYYMMDD`, Thai cards in the Buddhist calendar as `YYYYMMDD`.

use crate::{error::DecodeError, record::CardDate};

/// Years between the Minguo era and the Gregorian calendar
pub const MINGUO_OFFSET: i32 = 1911;

/// Years between the Buddhist era and the Gregorian calendar
pub const BUDDHIST_OFFSET: i32 = 543;

/// Gregorian year of a Minguo year
pub const fn minguo_to_gregorian(year: i32) -> i32 {
    year + MINGUO_OFFSET
}

/// Gregorian year of a Buddhist era year
pub const fn buddhist_to_gregorian(year: i32) -> i32 {
    year - BUDDHIST_OFFSET
}

/// Parse a Minguo `YYYMMDD` date
pub fn parse_minguo(field: &'static str, raw: &[u8]) -> Result<CardDate, DecodeError> {
    parse_with(field, raw, 3, minguo_to_gregorian)
}

/// Parse a Buddhist era `YYYYMMDD` date
pub fn parse_buddhist(field: &'static str, raw: &[u8]) -> Result<CardDate, DecodeError> {
    parse_with(field, raw, 4, buddhist_to_gregorian)
}

/// Parse a Gregorian `YYYYMMDD` date
pub fn parse_gregorian(field: &'static str, raw: &[u8]) -> Result<CardDate, DecodeError> {
    parse_with(field, raw, 4, |year| year)
}

fn parse_with(
    field: &'static str,
    raw: &[u8],
    year_digits: usize,
    to_gregorian: impl Fn(i32) -> i32,
) -> Result<CardDate, DecodeError> {
    let malformed = || DecodeError::MalformedField {
        field,
        value: String::from_utf8_lossy(raw).into_owned(),
    };

    if raw.len() != year_digits + 4 || !raw.iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }

    // All ASCII digits, so every slice below is valid UTF-8
    let text = std::str::from_utf8(raw).map_err(|_| malformed())?;
    let (year, rest) = text.split_at(year_digits);
    let year: i32 = year.parse().map_err(|_| malformed())?;

    Ok(CardDate::new(
        format!("{:04}", to_gregorian(year)),
        &rest[..2],
        &rest[2..],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minguo() {
        assert_eq!(minguo_to_gregorian(75), 1986);
        assert_eq!(
            parse_minguo("birth", b"0750312").unwrap(),
            CardDate::new("1986", "03", "12")
        );
        assert_eq!(
            parse_minguo("issued", b"1120101").unwrap(),
            CardDate::new("2023", "01", "01")
        );
    }

    #[test]
    fn test_buddhist() {
        assert_eq!(buddhist_to_gregorian(2530), 1987);
        assert_eq!(
            parse_buddhist("birth", b"25300615").unwrap(),
            CardDate::new("1987", "06", "15")
        );
    }

    #[test]
    fn test_malformed_dates() {
        assert!(matches!(
            parse_minguo("birth", b"07503"),
            Err(DecodeError::MalformedField { field: "birth", .. })
        ));
        assert!(matches!(
            parse_buddhist("expired", b"2530 615"),
            Err(DecodeError::MalformedField { field: "expired", .. })
        ));
    }
}
