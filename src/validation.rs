//! Client-side form validation
//!
//! Synchronous checks run before any request leaves the client. Each rule
//! maps to one [`ValidationError`] whose `Display` is the message shown to
//! the user. The server remains the authority on every field.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Minimum age for registration and profile edits
pub const MINIMUM_AGE: i32 = 18;

/// Minimum password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// A failed validation rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Teléfono inválido (10 dígitos, empieza con 3)")]
    InvalidPhone,

    #[error("El formato de la fecha de nacimiento es inválido.")]
    InvalidBirthDate,

    #[error("La fecha de nacimiento no puede ser en el futuro.")]
    BirthDateInFuture,

    #[error("Debes ser mayor de 18 años para registrarte.")]
    Underage,

    #[error("La contraseña debe tener al menos 6 caracteres.")]
    PasswordTooShort,

    #[error("Las contraseñas no coinciden.")]
    PasswordMismatch,

    #[error("Para registrarte como lanchero, el mensaje y la foto de la lancha son obligatorios.")]
    CollectorFieldsMissing,
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^3[0-9]{9}$").expect("phone pattern is valid"))
}

/// Colombian mobile number: exactly 10 ASCII digits starting with 3
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone_pattern().is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

/// Age in whole years on `today`
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Parse an HTML date input value (`YYYY-MM-DD`)
pub fn parse_birth_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidBirthDate)
}

/// Birth date must not be in the future and must give an age of at least 18
pub fn validate_birth_date(birth: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if birth > today {
        return Err(ValidationError::BirthDateInFuture);
    }
    if age_on(birth, today) < MINIMUM_AGE {
        return Err(ValidationError::Underage);
    }
    Ok(())
}

/// Validate an optional birth date field. Blank input is accepted.
pub fn validate_optional_birth_date(
    value: &str,
    today: NaiveDate,
) -> Result<Option<NaiveDate>, ValidationError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    let birth = parse_birth_date(value)?;
    validate_birth_date(birth, today)?;
    Ok(Some(birth))
}

/// Length is counted in UTF-16 code units, as browsers count form input
pub fn validate_password_length(password: &str) -> Result<(), ValidationError> {
    if password.encode_utf16().count() < MIN_PASSWORD_LEN {
        Err(ValidationError::PasswordTooShort)
    } else {
        Ok(())
    }
}

/// Length first, then confirmation
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    validate_password_length(password)?;
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_phone_examples() {
        assert_eq!(validate_phone("2991234567"), Err(ValidationError::InvalidPhone));
        assert_eq!(validate_phone("3991234567"), Ok(()));
    }

    #[test]
    fn test_phone_rejects_wrong_length_symbols_and_non_ascii_digits() {
        let rejected = [
            "",
            "3",
            "399123456",
            "39912345678",
            "399-123-4567",
            " 3991234567",
            "3a91234567",
            "3１２３４５６７８９",
            "3٠١٢٣٤٥٦٧٨",
            "3९९१२३४५६७",
        ];
        for phone in rejected {
            assert!(validate_phone(phone).is_err(), "{phone:?} should be rejected");
        }
    }

    #[test]
    fn test_phone_message() {
        assert_eq!(
            ValidationError::InvalidPhone.to_string(),
            "Teléfono inválido (10 dígitos, empieza con 3)"
        );
    }

    #[test]
    fn test_exactly_eighteen_passes() {
        let today = date(2024, 6, 15);
        assert_eq!(validate_birth_date(date(2006, 6, 15), today), Ok(()));
    }

    #[test]
    fn test_one_day_short_of_eighteen_fails() {
        let today = date(2024, 6, 15);
        assert_eq!(
            validate_birth_date(date(2006, 6, 16), today),
            Err(ValidationError::Underage)
        );
    }

    #[test]
    fn test_future_birth_date_fails_before_age() {
        let today = date(2024, 6, 15);
        assert_eq!(
            validate_birth_date(date(2024, 6, 16), today),
            Err(ValidationError::BirthDateInFuture)
        );
    }

    #[test]
    fn test_age_counts_pending_birthday() {
        assert_eq!(age_on(date(2000, 12, 31), date(2024, 12, 30)), 23);
        assert_eq!(age_on(date(2000, 12, 31), date(2024, 12, 31)), 24);
        assert_eq!(age_on(date(2000, 2, 29), date(2018, 2, 28)), 17);
        assert_eq!(age_on(date(2000, 2, 29), date(2018, 3, 1)), 18);
    }

    #[test]
    fn test_optional_birth_date() {
        let today = date(2024, 6, 15);
        assert_eq!(validate_optional_birth_date("  ", today), Ok(None));
        assert_eq!(
            validate_optional_birth_date("15/06/2000", today),
            Err(ValidationError::InvalidBirthDate)
        );
        assert_eq!(
            validate_optional_birth_date("2000-06-15", today),
            Ok(Some(date(2000, 6, 15)))
        );
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(validate_new_password("abc", "abc"), Err(ValidationError::PasswordTooShort));
        assert_eq!(
            validate_new_password("secreto1", "secreto2"),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(validate_new_password("secreto1", "secreto1"), Ok(()));
        assert_eq!(
            ValidationError::PasswordMismatch.to_string(),
            "Las contraseñas no coinciden."
        );
    }

    #[test]
    fn test_password_length_counts_utf16_units() {
        assert_eq!(validate_password_length("ñandú!"), Ok(()));
        assert_eq!(validate_password_length("ñandú"), Err(ValidationError::PasswordTooShort));
        assert_eq!(validate_password_length("😀😀😀"), Ok(()));
        assert_eq!(validate_password_length("😀😀"), Err(ValidationError::PasswordTooShort));
    }
}
