use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Underlying cause of a transient failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed retrieval attempt.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed with ECONNRESET")]
    ConnectionReset(#[source] BoxError),

    #[error("timed out")]
    Timeout(#[source] BoxError),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("request failed")]
    Transport(#[source] reqwest::Error),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported URL: {0}")]
    UnsupportedUrl(String),
}

impl FetchError {
    /// Whether another attempt might succeed.
    ///
    /// Only connection resets and timeouts are retried; a bad status or any
    /// other transport failure is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::ConnectionReset(_) | FetchError::Timeout(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || has_io_kind(&err, io::ErrorKind::TimedOut) {
            return FetchError::Timeout(Box::new(err));
        }
        if has_io_kind(&err, io::ErrorKind::ConnectionReset)
            || crate::error::report(&err)
                .to_ascii_lowercase()
                .contains("connection reset")
        {
            return FetchError::ConnectionReset(Box::new(err));
        }
        FetchError::Transport(err)
    }
}

/// Search the source chain for an I/O error of the given kind.
fn has_io_kind(err: &(dyn std::error::Error + 'static), kind: io::ErrorKind) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }
        current = e.source();
    }
    false
}
