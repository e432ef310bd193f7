//! Error types for scorm2lfa operations.

use thiserror::Error;

/// Errors that abort a migration run.
///
/// Per-page and per-asset failures never surface here; they are recovered
/// inside [`crate::pipeline`] and [`crate::assets`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read {}", path.display())]
    ReadManifest {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Format an error followed by its source chain, one cause per line.
pub fn report(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n\nCaused by:\n    ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_includes_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "imsmanifest.xml");
        let err = Error::from(io);
        let text = report(&err);
        assert!(text.starts_with("I/O error: imsmanifest.xml"));
        assert!(text.contains("Caused by:"));
    }

    #[test]
    fn test_read_manifest_reports_path() {
        let err = Error::ReadManifest {
            path: "pkg/imsmanifest.xml".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let text = report(&err);
        assert!(text.starts_with("failed to read pkg/imsmanifest.xml"));
        assert!(text.contains("Caused by:"));
    }

    #[test]
    fn test_report_without_source() {
        let err = Error::MissingElement("organization".to_string());
        assert_eq!(report(&err), "Missing required element: organization");
    }
}
