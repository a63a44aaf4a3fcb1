//! Finnish personal identity code (henkilötunnus) check.
//!
//! Format `DDMMYYCZZZQ`: birth date, century sign, individual number and a
//! check character indexed by `DDMMYYZZZ mod 31`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

const CHECK_CHARS: &[u8; 31] = b"0123456789ABCDEFHJKLMNPRSTUVWXY";

static HETU_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})(\d{2})(\d{2})([-+A-FU-Y])(\d{3})([0-9A-Y])$").expect("valid hetu regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HetuError {
    /// Not of the `DDMMYYCZZZQ` shape.
    Format,
    /// Date part is not a calendar date.
    Date,
    /// Check character does not match.
    Checksum { expected: char, found: char },
}

impl Display for HetuError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format => write!(f, "identity code has invalid format"),
            Self::Date => write!(f, "identity code has invalid birth date"),
            Self::Checksum { expected, found } => write!(
                f,
                "identity code check character is `{found}`, expected `{expected}`"
            ),
        }
    }
}

impl Error for HetuError {}

/// Validates an identity code, ignoring surrounding whitespace and case.
pub fn validate_hetu(code: &str) -> Result<(), HetuError> {
    let normalized = code.trim().to_ascii_uppercase();
    let captures = HETU_RE.captures(&normalized).ok_or(HetuError::Format)?;

    let day: u32 = captures[1].parse().map_err(|_| HetuError::Format)?;
    let month: u32 = captures[2].parse().map_err(|_| HetuError::Format)?;
    let year_of_century: u32 = captures[3].parse().map_err(|_| HetuError::Format)?;
    let century = match captures[4].as_bytes()[0] {
        b'+' => 1800,
        b'-' | b'U'..=b'Y' => 1900,
        _ => 2000,
    };
    if month == 0 || month > 12 || day == 0 || day > days_in_month(century + year_of_century, month)
    {
        return Err(HetuError::Date);
    }

    let digits = format!("{}{}{}{}", &captures[1], &captures[2], &captures[3], &captures[5]);
    let number: u64 = digits.parse().map_err(|_| HetuError::Format)?;
    let expected = char::from(CHECK_CHARS[(number % 31) as usize]);
    let found = captures[6].chars().next().ok_or(HetuError::Format)?;
    if expected != found {
        return Err(HetuError::Checksum { expected, found });
    }
    Ok(())
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_hetu, HetuError};

    #[test]
    fn accepts_valid_codes() {
        assert_eq!(validate_hetu("131052-308T"), Ok(()));
        assert_eq!(validate_hetu(" 131052a308t "), Ok(()));
    }

    #[test]
    fn rejects_wrong_check_character() {
        assert_eq!(
            validate_hetu("131052-308U"),
            Err(HetuError::Checksum {
                expected: 'T',
                found: 'U'
            })
        );
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(validate_hetu("310252-308T"), Err(HetuError::Date));
        assert_eq!(validate_hetu("001352-308T"), Err(HetuError::Date));
    }

    #[test]
    fn rejects_malformed_codes() {
        assert_eq!(validate_hetu("131052308T"), Err(HetuError::Format));
        assert_eq!(validate_hetu(""), Err(HetuError::Format));
    }
}
