//! The contact form's submit flow.
//!
//! `FormClient::submit` checks the fields locally, disables the submit
//! control while the request is in flight, and reports the result through a
//! status note and a toast. The control is re-enabled on every path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use pilot999_shared::ContactRequest;

use crate::api::ContactApi;
use crate::toast::Toast;

pub const NOTE_INCOMPLETE: &str = "Please fill in all fields.";
pub const NOTE_SENDING: &str = "Sending…";
pub const NOTE_SENT: &str = "Message sent. Thank you!";
pub const NOTE_FAILED: &str = "Failed to send. Please try again later.";
pub const NOTE_NETWORK_ERROR: &str = "Network error. Please try again.";
pub const TOAST_SENT: &str = "Message sent.";
pub const TOAST_NETWORK_ERROR: &str = "Network error";

/// Current field values of the form
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactForm {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    /// Trimmed request body, or `None` when any field is blank.
    /// The email shape is left to the server.
    pub fn to_request(&self) -> Option<ContactRequest> {
        let name = self.name.trim();
        let email = self.email.trim();
        let message = self.message.trim();

        if name.is_empty() || email.is_empty() || message.is_empty() {
            return None;
        }

        Some(ContactRequest {
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The form's submit button. Disabled while a submission is in flight.
#[derive(Debug, Clone, Default)]
pub struct SubmitControl {
    disabled: Arc<AtomicBool>,
}

impl SubmitControl {
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    /// Disable the control until the returned guard drops. `None` if it is
    /// already disabled.
    fn disable(&self) -> Option<SubmitGuard> {
        self.disabled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SubmitGuard {
                disabled: Arc::clone(&self.disabled),
            })
    }
}

struct SubmitGuard {
    disabled: Arc<AtomicBool>,
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.disabled.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A field was blank; nothing was sent
    Incomplete,
    /// The control was disabled by a submission already in flight
    Busy,
    Sent,
    /// The server answered but did not accept the message
    Rejected(String),
    NetworkError,
}

pub struct FormClient<A> {
    api: A,
    control: SubmitControl,
    toast: Toast,
    note: Mutex<String>,
}

impl<A: ContactApi> FormClient<A> {
    pub fn new(api: A, control: SubmitControl, toast: Toast) -> Self {
        Self {
            api,
            control,
            toast,
            note: Mutex::new(String::new()),
        }
    }

    pub fn note(&self) -> String {
        self.note.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn toast(&self) -> &Toast {
        &self.toast
    }

    pub fn control(&self) -> &SubmitControl {
        &self.control
    }

    fn set_note(&self, text: &str) {
        *self.note.lock().unwrap_or_else(PoisonError::into_inner) = text.to_string();
    }

    pub async fn submit(&self, form: &mut ContactForm) -> SubmitOutcome {
        let Some(request) = form.to_request() else {
            self.set_note(NOTE_INCOMPLETE);
            return SubmitOutcome::Incomplete;
        };

        let Some(_enabled_on_drop) = self.control.disable() else {
            return SubmitOutcome::Busy;
        };

        self.set_note(NOTE_SENDING);

        match self.api.submit(&request).await {
            Ok(response) if response.is_success() => {
                form.reset();
                self.set_note(NOTE_SENT);
                self.toast.show(TOAST_SENT);
                SubmitOutcome::Sent
            }
            Ok(response) => {
                let message = response.error_message().unwrap_or(NOTE_FAILED).to_string();
                tracing::info!(status = response.status, reason = %message, "submission rejected");
                self.set_note(&message);
                self.toast.show(message.clone());
                SubmitOutcome::Rejected(message)
            }
            Err(err) => {
                tracing::warn!(error = %err, "contact request failed");
                self.set_note(NOTE_NETWORK_ERROR);
                self.toast.show(TOAST_NETWORK_ERROR);
                SubmitOutcome::NetworkError
            }
        }
    }
}
