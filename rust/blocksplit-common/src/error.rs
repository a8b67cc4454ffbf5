use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns `true` if this error must fail the whole job rather than a
    /// single task attempt.
    pub fn is_index_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::IndexMissing { .. } | ErrorKind::IndexCorrupt { .. }
        )
    }

    pub fn index_missing(path: impl Into<PathBuf>) -> Error {
        Error(ErrorKind::IndexMissing { path: path.into() }.into())
    }

    pub fn index_corrupt(path: impl AsRef<Path>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::IndexCorrupt {
                path: path.as_ref().to_path_buf(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn codec_not_found(path: impl Into<PathBuf>) -> Error {
        Error(ErrorKind::CodecNotFound { path: path.into() }.into())
    }

    pub fn invalid_format(name: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: Default::default(),
            }
            .into(),
        )
    }

    pub fn invalid_format_msg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn checksum_mismatch(element: impl Into<String>) -> Error {
        Error(
            ErrorKind::ChecksumMismatch {
                element: element.into(),
            }
            .into(),
        )
    }

    pub fn config(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::Config {
                message: message.into(),
                source: None,
            }
            .into(),
        )
    }

    pub fn config_source<E>(message: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Config {
                message: message.into(),
                source: Some(Box::new(source)),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("block index not found for '{}'", path.display())]
    IndexMissing { path: PathBuf },

    #[error("corrupt block index for '{}': {message}", path.display())]
    IndexCorrupt { path: PathBuf, message: String },

    #[error("no codec registered for '{}'", path.display())]
    CodecNotFound { path: PathBuf },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("checksum mismatch for '{element}'")]
    ChecksumMismatch { element: String },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<StdErrorBoxed>,
    },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_classification() {
        assert!(Error::index_missing("/data/a.blz4").is_index_error());
        assert!(Error::index_corrupt("/data/a.blz4", "truncated").is_index_error());
        assert!(!Error::invalid_format("header").is_index_error());
        let io = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert!(!Error::from(io).is_index_error());
    }

    #[test]
    fn test_error_display() {
        let e = Error::index_corrupt("/data/a.blz4", "offsets not increasing");
        assert_eq!(
            e.to_string(),
            "corrupt block index for '/data/a.blz4': offsets not increasing"
        );
        let e = Error::index_missing("/data/b.bzst");
        assert_eq!(e.to_string(), "block index not found for '/data/b.bzst'");
    }
}
