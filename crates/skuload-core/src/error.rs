//! Error classification for the streaming source

use crate::stream::StreamError;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Error from opening or reading the source feed.
///
/// Wraps either a network/HTTP error ([`StreamError`]) or a CSV framing
/// error that ended the stream. Both abort the run; only `Stream` errors
/// raised before the body starts are ever retried.
#[derive(Debug)]
pub enum SourceError {
    Stream(StreamError),
    Csv(csv::Error),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream(e) => write!(f, "{e}"),
            Self::Csv(e) => write!(f, "CSV: {e}"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Stream(e) => Some(e),
            Self::Csv(e) => Some(e),
        }
    }
}

impl Retryable for SourceError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Stream(e) => e.is_retryable(),
            Self::Csv(_) => false,
        }
    }
}

impl From<StreamError> for SourceError {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

impl From<csv::Error> for SourceError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}
