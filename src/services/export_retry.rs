use crate::errors::PdfError;

pub const MAX_EXPORT_ATTEMPTS: u32 = 3;

pub const MULTIPLE_ATTEMPTS_FAILED: &str =
    "Multiple attempts failed. Please refresh the page and try again later.";
pub const UNSUPPORTED_BROWSER_MESSAGE: &str =
    "Your browser does not support PDF downloads. Please use a recent version of Chrome, Firefox, Safari or Edge.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { attempt: u32, message: String },
    GiveUp { attempt: u32, message: String },
}

impl RetryDecision {
    pub fn message(&self) -> &str {
        match self {
            RetryDecision::Retry { message, .. } | RetryDecision::GiveUp { message, .. } => message,
        }
    }

    pub fn should_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }
}

/// Counts failed export attempts and decides whether another one is allowed.
#[derive(Debug, Clone, Default)]
pub struct ExportAttempts {
    failures: u32,
    exhausted: bool,
}

impl ExportAttempts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.failures
    }

    pub fn can_retry(&self) -> bool {
        !self.exhausted && self.failures < MAX_EXPORT_ATTEMPTS
    }

    pub fn record_failure(&mut self, error: &PdfError) -> RetryDecision {
        self.failures = (self.failures + 1).min(MAX_EXPORT_ATTEMPTS);
        let attempt = self.failures;

        if !error.is_retryable() {
            self.exhausted = true;
            return RetryDecision::GiveUp {
                attempt,
                message: UNSUPPORTED_BROWSER_MESSAGE.to_string(),
            };
        }

        if self.exhausted || attempt >= MAX_EXPORT_ATTEMPTS {
            self.exhausted = true;
            return RetryDecision::GiveUp {
                attempt,
                message: MULTIPLE_ATTEMPTS_FAILED.to_string(),
            };
        }

        let reason = match error {
            PdfError::Download(_) => "Failed to download PDF",
            _ => "Failed to generate PDF",
        };
        RetryDecision::Retry {
            attempt,
            message: format!(
                "{}. Please try again (attempt {} of {}).",
                reason, attempt, MAX_EXPORT_ATTEMPTS
            ),
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.exhausted = false;
    }
}
