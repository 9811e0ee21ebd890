//! Field validators for contact submissions

use lazy_static::lazy_static;
use pilot999_shared::messages;
use regex::Regex;
use thiserror::Error;

/// Maximum accepted length of an email address, in characters
pub const MAX_EMAIL_CHARS: usize = 320;

lazy_static! {
    /// `local@domain.tld` with no whitespace and a single `@`
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Why a submission was rejected. The display text is returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{}", messages::MISSING_FIELDS)]
    MissingFields,
    #[error("{}", messages::INVALID_EMAIL)]
    InvalidEmail,
}

/// Every field must be non-empty
pub fn validate_required(fields: &[&str]) -> Result<(), ValidationError> {
    if fields.iter().any(|field| field.is_empty()) {
        return Err(ValidationError::MissingFields);
    }
    Ok(())
}

/// Validate email shape and length
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let trimmed = email.trim();

    if trimmed.chars().count() > MAX_EMAIL_CHARS {
        return Err(ValidationError::InvalidEmail);
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}
