use std::error::Error;
use std::fmt;

/// Credentials missing or rejected by the portal. Fatal for the run.
#[derive(Debug)]
pub struct AuthError {
    details: String,
}

impl AuthError {
    pub fn new(details: impl Into<String>) -> Self {
        AuthError {
            details: details.into(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthError: {}", self.details)
    }
}

impl Error for AuthError {}

/// The reshaper was handed zero records. Fatal: an empty matrix must never
/// overwrite a destination.
#[derive(Debug)]
pub struct EmptyInputError;

impl fmt::Display for EmptyInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmptyInputError: no input records to reshape")
    }
}

impl Error for EmptyInputError {}

/// A scrape produced zero tables/records for a period. A warning, not a
/// failure: the run continues with an empty contribution for that period.
#[derive(Debug)]
pub struct ExtractionDegraded {
    period: String,
}

impl ExtractionDegraded {
    pub fn new(period: impl Into<String>) -> Self {
        ExtractionDegraded {
            period: period.into(),
        }
    }
}

impl fmt::Display for ExtractionDegraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExtractionDegraded: no records extracted for period {} (either no data, or the extraction failed)",
            self.period
        )
    }
}

impl Error for ExtractionDegraded {}

/// A sink call failed on every configured endpoint candidate.
#[derive(Debug)]
pub struct SinkUnavailable {
    operation: String,
    attempts: usize,
    detail: String,
}

impl SinkUnavailable {
    pub fn new(operation: impl Into<String>, attempts: usize, detail: impl Into<String>) -> Self {
        SinkUnavailable {
            operation: operation.into(),
            attempts,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SinkUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SinkUnavailable: {} failed after {} endpoint(s): {}",
            self.operation, self.attempts, self.detail
        )
    }
}

impl Error for SinkUnavailable {}
