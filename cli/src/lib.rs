//! Form client for the pilot999 contact relay.

pub mod api;
pub mod api_base;
pub mod form;
pub mod toast;

pub use api::{ApiResponse, ClientError, ContactApi, HttpContactApi};
pub use api_base::ApiBase;
pub use form::{ContactForm, FormClient, SubmitControl, SubmitOutcome};
pub use toast::Toast;
