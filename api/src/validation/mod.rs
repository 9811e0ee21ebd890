//! Input Validation Module
//!
//! Contact submissions pass through three stages before they reach a handler:
//!
//! 1. **Sanitizers** - strip carriage returns, trim and cap every field
//! 2. **Validators** - check presence and email shape
//! 3. **Extractors** - `ValidatedJson<T>` runs both on the request body
//!
//! # Usage
//!
//! ```ignore
//! use crate::validation::{ContactSubmission, ValidatedJson};
//!
//! pub async fn submit_contact(
//!     ValidatedJson(submission): ValidatedJson<ContactSubmission>,
//! ) -> impl IntoResponse {
//!     // submission is sanitized and validated
//! }
//! ```
//!
//! # Validation Error Response
//!
//! A failed check returns 400 with the specific reason:
//!
//! ```json
//! { "ok": false, "error": "Invalid email." }
//! ```

pub mod extractors;
pub mod requests;
pub mod sanitizers;
pub mod validators;

pub use extractors::{Validatable, ValidatedJson};
pub use requests::ContactSubmission;
pub use sanitizers::{sanitize_field, sanitize_text, MAX_FIELD_CHARS};
pub use validators::{validate_email, validate_required, ValidationError, MAX_EMAIL_CHARS};
