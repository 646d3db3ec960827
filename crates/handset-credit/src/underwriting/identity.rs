use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const IDENTITY_LENGTH: usize = 13;
/// Two-digit years at or below this value belong to the 2000s, everything else to the 1900s.
const CENTURY_CUTOFF: u32 = 20;

/// Format and checksum failures raised while parsing a national identity number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("ID number must be exactly 13 digits")]
    Length { found: usize },
    #[error("ID number must contain only digits")]
    NonDigit,
    #[error("Invalid date of birth in ID number")]
    InvalidBirthDate,
    #[error("Invalid citizenship digit")]
    Citizenship { digit: u8 },
    #[error("Invalid check digit (expected {expected}, got {actual})")]
    Checksum { expected: u8, actual: u8 },
}

impl IdentityError {
    /// Everything except a check digit mismatch is a format problem.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, IdentityError::Checksum { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Citizenship {
    Citizen,
    PermanentResident,
}

/// Facts decoded from a checksum-valid identity number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityDetails {
    pub number: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub citizenship: Citizenship,
}

/// Drop every whitespace character, so `900101 5800088` and `9001015800088` are one number.
pub fn normalize_identity_number(raw: &str) -> String {
    raw.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// Parse a `YYMMDDGSSSCAZ` identity number.
///
/// Validation order is length, digits, calendar date, citizenship digit and finally the check
/// digit, so malformed input never surfaces as a checksum mismatch.
pub fn parse_identity_number(raw: &str) -> Result<IdentityDetails, IdentityError> {
    let number = normalize_identity_number(raw);

    let found = number.chars().count();
    if found != IDENTITY_LENGTH {
        return Err(IdentityError::Length { found });
    }
    if !number.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(IdentityError::NonDigit);
    }

    let digits: Vec<u8> = number.bytes().map(|byte| byte - b'0').collect();
    let pair = |start: usize| u32::from(digits[start]) * 10 + u32::from(digits[start + 1]);

    let year_of_century = pair(0);
    let year = if year_of_century <= CENTURY_CUTOFF {
        2000 + year_of_century
    } else {
        1900 + year_of_century
    };
    let date_of_birth = NaiveDate::from_ymd_opt(year as i32, pair(2), pair(4))
        .ok_or(IdentityError::InvalidBirthDate)?;

    let citizenship = match digits[10] {
        0 => Citizenship::Citizen,
        1 => Citizenship::PermanentResident,
        digit => return Err(IdentityError::Citizenship { digit }),
    };

    let expected = check_digit(&digits[..12]);
    let actual = digits[12];
    if expected != actual {
        return Err(IdentityError::Checksum { expected, actual });
    }

    let gender = if digits[6] < 5 {
        Gender::Female
    } else {
        Gender::Male
    };

    Ok(IdentityDetails {
        number,
        date_of_birth,
        gender,
        citizenship,
    })
}

/// Luhn-style check digit: double every odd index (folding values above nine), then take the
/// distance of the sum to the next multiple of ten.
pub fn check_digit(payload: &[u8]) -> u8 {
    let sum: u32 = payload
        .iter()
        .enumerate()
        .map(|(index, &digit)| {
            let digit = u32::from(digit);
            if index % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();

    ((10 - (sum % 10)) % 10) as u8
}

/// Mask all but the trailing three characters so logs never carry a full identity number.
pub fn masked(number: &str) -> String {
    let trimmed = number.trim();
    let visible = trimmed.chars().count().saturating_sub(3);
    trimmed
        .chars()
        .enumerate()
        .map(|(index, ch)| if index < visible { '*' } else { ch })
        .collect()
}
