use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors that abort the analysis of a point cloud file.
///
/// Everything else (short header, incomplete schema, truncated data, ...)
/// degrades into notes on the report instead.
/// The io errors are shared, so that reports and errors stay `Clone`.
#[derive(Debug, Error, Clone)]
pub enum PcdError {
    #[error("Cannot open point cloud file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: Arc<std::io::Error>,
    },

    #[error("Failed to read the PCD header: {0}")]
    HeaderRead(#[source] Arc<std::io::Error>),
}

impl PcdError {
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PcdError::Open {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

impl From<std::io::Error> for PcdError {
    fn from(value: std::io::Error) -> Self {
        PcdError::HeaderRead(Arc::new(value))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::io::ErrorKind;

    use super::PcdError;

    #[test]
    fn test_header_read_error_is_clone() {
        let err: PcdError = std::io::Error::new(ErrorKind::UnexpectedEof, "eof").into();
        let cloned = err.clone();
        match cloned {
            PcdError::HeaderRead(e) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Failed to read the PCD header: eof");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_open_error_message() {
        let err = PcdError::open("missing.pcd", std::io::Error::new(ErrorKind::NotFound, "not found"));
        let msg = err.to_string();
        assert!(msg.contains("missing.pcd"));
        assert!(msg.contains("not found"));
        match err {
            PcdError::Open { source, .. } => assert_eq!(source.kind(), ErrorKind::NotFound),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
