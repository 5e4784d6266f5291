//! User-visible status line.

use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSeverity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub severity: StatusSeverity,
    pub text: String,
}

impl StatusMessage {
    pub fn is_error(&self) -> bool {
        self.severity == StatusSeverity::Error
    }
}

pub trait StatusReporter {
    /// Replaces whatever is currently displayed.
    fn report(&mut self, message: &str, is_error: bool);
}

/// Keeps only the most recent message.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    current: Option<StatusMessage>,
}

impl StatusLine {
    pub fn current(&self) -> Option<&StatusMessage> {
        self.current.as_ref()
    }
}

impl StatusReporter for StatusLine {
    fn report(&mut self, message: &str, is_error: bool) {
        if is_error {
            error!(status = message, "status updated");
        } else {
            info!(status = message, "status updated");
        }
        self.current = Some(StatusMessage {
            severity: if is_error {
                StatusSeverity::Error
            } else {
                StatusSeverity::Info
            },
            text: message.to_string(),
        });
    }
}
