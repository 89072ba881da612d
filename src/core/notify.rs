use crate::models::error::SError;
use tracing::{error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorOptions {
    /// Whether the user is offered to report this as a bug.
    pub allow_report: bool,
}

impl Default for ErrorOptions {
    fn default() -> Self {
        Self { allow_report: true }
    }
}

pub trait Notifier: Send + Sync {
    fn show_error_notification(&self, title: &str, details: &str, options: ErrorOptions);
}

/// Writes notifications to the log.
#[derive(Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show_error_notification(&self, title: &str, details: &str, options: ErrorOptions) {
        if options.allow_report {
            error!("{title}: {details}");
        } else {
            warn!("{title}: {details}");
        }
    }
}

/// Presents `err` under `message`. Expected environment errors are not
/// offered for reporting.
pub fn show_error(notifier: &dyn Notifier, message: &str, err: &SError) {
    notifier.show_error_notification(
        message,
        &err.to_string(),
        ErrorOptions {
            allow_report: err.is_reportable(),
        },
    );
}
