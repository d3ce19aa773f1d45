use thiserror::Error;

use crate::fields::FieldKey;

/// Everything that can end a single fetch early.
///
/// None of these reach the caller as a failure: the pipeline logs them and
/// still delivers whatever was decoded before the error.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The zip code or URL prefix does not form a valid request URL.
    #[error("malformed request URL: {0}")]
    MalformedUrl(String),

    /// Opening or reading the remote stream failed.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// The JSON token stream does not have the expected structure.
    #[error("malformed document at byte {offset}: {message}")]
    MalformedDocument { offset: u64, message: String },

    /// A required entry is missing from the field-name table.
    #[error("unresolved resource key `{0}`")]
    UnresolvedResourceKey(FieldKey),
}

impl ForecastError {
    pub(crate) fn malformed(offset: u64, message: impl Into<String>) -> Self {
        Self::MalformedDocument { offset, message: message.into() }
    }

    /// Wrap an HTTP error, dropping the request URL since it may carry the
    /// API key.
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Transport(std::io::Error::other(err.without_url()))
    }

    /// Short, stable name of the error kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::MalformedUrl(_) => "MalformedURL",
            ForecastError::Transport(_) => "TransportFailure",
            ForecastError::MalformedDocument { .. } => "MalformedDocument",
            ForecastError::UnresolvedResourceKey(_) => "UnresolvedResourceKey",
        }
    }
}
