//! User-facing messages returned by the contact API.
//!
//! The form client renders these verbatim, so they are part of the wire
//! contract and must stay stable.

pub const MISSING_FIELDS: &str = "Missing fields.";
pub const INVALID_EMAIL: &str = "Invalid email.";
pub const NOT_CONFIGURED: &str = "Server email not configured.";
pub const SEND_FAILED: &str = "Email send failed.";
pub const INVALID_BODY: &str = "Invalid request body.";
pub const PAYLOAD_TOO_LARGE: &str = "Request body too large.";
pub const RATE_LIMITED: &str = "Too many requests, please try again later.";
pub const NOT_FOUND: &str = "Not found.";
