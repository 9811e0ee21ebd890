//! Validation of contact form submissions

use serde_json::Value;

use super::extractors::Validatable;
use super::sanitizers::sanitize_field;
use super::validators::{validate_email, validate_required, ValidationError};

/// A sanitized contact form submission. Lives for one request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactSubmission {
    pub fn subject(&self) -> String {
        format!("pilot999: new message from {}", self.name)
    }

    pub fn body(&self) -> String {
        format!(
            "Name: {}\nEmail: {}\n\n{}\n",
            self.name, self.email, self.message
        )
    }
}

impl Validatable for ContactSubmission {
    fn from_payload(payload: &Value) -> Self {
        Self {
            name: sanitize_field(payload, "name"),
            email: sanitize_field(payload, "email"),
            message: sanitize_field(payload, "message"),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        // Presence is checked before shape so an empty email reports missing fields
        validate_required(&[self.name.as_str(), self.email.as_str(), self.message.as_str()])?;
        validate_email(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission(payload: Value) -> ContactSubmission {
        ContactSubmission::from_payload(&payload)
    }

    #[test]
    fn test_sanitizes_each_field() {
        let s = submission(json!({
            "name": "  Ada Lovelace \r",
            "email": " ada@example.com ",
            "message": "Hello\r\nthere\r\n"
        }));

        assert_eq!(s.name, "Ada Lovelace");
        assert_eq!(s.email, "ada@example.com");
        assert_eq!(s.message, "Hello\nthere");
    }

    #[test]
    fn test_missing_any_field_is_rejected() {
        let base = json!({"name": "A", "email": "a@b.com", "message": "hi"});

        for field in ["name", "email", "message"] {
            let mut payload = base.clone();
            payload[field] = json!("   ");
            assert_eq!(
                submission(payload).validate(),
                Err(ValidationError::MissingFields),
                "blank {field} should be reported as missing"
            );
        }
    }

    #[test]
    fn test_invalid_email_is_rejected() {
        let s = submission(json!({"name": "A", "email": "not-an-email", "message": "hi"}));
        assert_eq!(s.validate(), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn test_valid_submission_passes() {
        let s = submission(json!({"name": "A", "email": "a@b.co", "message": "hi"}));
        assert_eq!(s.validate(), Ok(()));
    }

    #[test]
    fn test_subject_and_body() {
        let s = ContactSubmission {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            message: "Hello".to_string(),
        };

        assert_eq!(s.subject(), "pilot999: new message from Ada");
        assert_eq!(s.body(), "Name: Ada\nEmail: ada@example.com\n\nHello\n");
    }
}
