use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// How long a toast stays up
pub const TOAST_DURATION: Duration = Duration::from_millis(1600);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ToastState {
    text: String,
    visible: bool,
}

/// A transient notice that hides itself after a fixed delay.
///
/// Showing a new message cancels the pending hide and starts a fresh one, so
/// only the latest message decides when the toast disappears. Must be used
/// inside a tokio runtime.
pub struct Toast {
    state: Arc<Mutex<ToastState>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    hide_after: Duration,
}

impl Default for Toast {
    fn default() -> Self {
        Self::new(TOAST_DURATION)
    }
}

impl Toast {
    pub fn new(hide_after: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ToastState::default())),
            timer: Mutex::new(None),
            hide_after,
        }
    }

    pub fn show(&self, message: impl Into<String>) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.text = message.into();
            state.visible = true;
        }

        let state = Arc::clone(&self.state);
        let hide_after = self.hide_after;
        let hide = tokio::spawn(async move {
            tokio::time::sleep(hide_after).await;
            state.lock().unwrap_or_else(PoisonError::into_inner).visible = false;
        });

        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.replace(hide) {
            previous.abort();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).visible
    }

    /// Last message shown, whether or not it is still visible
    pub fn text(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .text
            .clone()
    }
}

impl Drop for Toast {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = timer.take() {
            pending.abort();
        }
    }
}
