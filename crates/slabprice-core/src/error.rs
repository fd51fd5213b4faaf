use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Validation errors for caller-supplied input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("card name cannot be empty")]
    EmptyCardName,
    #[error("source url cannot be empty")]
    EmptySourceUrl,
    #[error("card record must contain at least one grade")]
    NoGrades,
    #[error("grade '{grade}' appears more than once")]
    DuplicateGrade { grade: String },
    #[error("population entry must look like GRADE=COUNT: '{value}'")]
    InvalidPopulationEntry { value: String },
}

/// Why a sale-history fetch could not produce its first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Upstream answered with a non-success status.
    Status(u16),
    /// The request exceeded its timeout.
    Timeout,
    /// Connection-level failure before a response arrived.
    Transport(String),
    /// The body was not JSON or had no `data` array.
    MalformedBody(String),
    /// The caller's cancellation signal fired.
    Cancelled,
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "API request failed with status {status}"),
            Self::Timeout => f.write_str("API request timed out"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::MalformedBody(message) => write!(f, "malformed response body: {message}"),
            Self::Cancelled => f.write_str("fetch cancelled before the first page completed"),
        }
    }
}

/// Top-level error surfaced by the scrape pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Invalid PSA URL. Unable to extract card ID from '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("Failed to fetch sale history: {0}")]
    FetchFailed(FetchFailure),

    #[error("No auction data found for this card.")]
    NoUsableRecords,

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl PipelineError {
    pub fn invalid_locator(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocator {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidLocator { .. } => "pipeline.invalid_locator",
            Self::FetchFailed(_) => "pipeline.fetch_failed",
            Self::NoUsableRecords => "pipeline.no_usable_records",
            Self::Persistence(_) => "pipeline.persistence_failure",
            Self::Validation(_) => "pipeline.invalid_input",
        }
    }

    /// Whether the failure is attributable to the caller's input.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidLocator { .. } | Self::NoUsableRecords | Self::Validation(_) => true,
            Self::FetchFailed(failure) => {
                let message = failure.to_string().to_ascii_lowercase();
                message.contains("invalid") || message.contains("no data")
            }
            Self::Persistence(_) => false,
        }
    }

    pub fn http_status(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}
