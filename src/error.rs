//! Error types for docmason.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for docmason operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting or serializing a document.
#[derive(Error, Debug)]
pub enum Error {
    /// The input file does not exist or cannot be opened for reading.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The input has a wrong or unsupported extension, or its bytes do not
    /// match the format the extension claims.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The document is encrypted or password protected.
    #[error("Document is locked (encrypted)")]
    Locked,

    /// Malformed package, document XML, or unreadable PDF structure.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The output cannot be created or written.
    #[error("Write error: {0}")]
    Write(String),

    /// The conversion was cancelled by the caller.
    #[error("Conversion cancelled")]
    Cancelled,

    /// A collaborator capability is not available (e.g. page rasterization).
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// I/O error when reading files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unexpected failure reported by a collaborator.
    #[error("{0}")]
    Unknown(String),
}

impl Error {
    /// Project this error onto the conversion status taxonomy.
    pub fn status(&self) -> ConvertStatus {
        match self {
            Error::FileNotFound(_) => ConvertStatus::FileNotFound,
            Error::InvalidFormat(_) => ConvertStatus::InvalidFormat,
            Error::Locked => ConvertStatus::Locked,
            Error::Parse(_) | Error::PageOutOfRange(_, _) => ConvertStatus::ParseError,
            Error::Write(_) => ConvertStatus::WriteError,
            Error::Io(e) if e.kind() == io::ErrorKind::NotFound => ConvertStatus::FileNotFound,
            Error::Cancelled | Error::Unsupported(_) | Error::Io(_) | Error::Unknown(_) => {
                ConvertStatus::UnknownError
            }
        }
    }
}

/// Outcome code of a `convert` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvertStatus {
    /// Conversion succeeded (possibly with zero elements).
    Success,
    /// Input file does not exist.
    FileNotFound,
    /// Wrong or unsupported format.
    InvalidFormat,
    /// Encrypted input.
    Locked,
    /// Malformed input structure.
    ParseError,
    /// Output could not be written.
    WriteError,
    /// Unexpected collaborator failure.
    UnknownError,
}

impl ConvertStatus {
    /// Stable numeric code, usable as a process exit code.
    pub fn code(self) -> i32 {
        match self {
            ConvertStatus::Success => 0,
            ConvertStatus::FileNotFound => 1,
            ConvertStatus::InvalidFormat => 2,
            ConvertStatus::Locked => 3,
            ConvertStatus::ParseError => 4,
            ConvertStatus::WriteError => 5,
            ConvertStatus::UnknownError => 6,
        }
    }

    /// Whether this status denotes success.
    pub fn is_success(self) -> bool {
        self == ConvertStatus::Success
    }
}

impl fmt::Display for ConvertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConvertStatus::Success => "Success",
            ConvertStatus::FileNotFound => "FileNotFound",
            ConvertStatus::InvalidFormat => "InvalidFormat",
            ConvertStatus::Locked => "Locked",
            ConvertStatus::ParseError => "ParseError",
            ConvertStatus::WriteError => "WriteError",
            ConvertStatus::UnknownError => "UnknownError",
        };
        f.write_str(name)
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Locked,
            _ => Error::Parse(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Parse(format!("XML: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Parse(format!("XML attribute: {}", err))
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            zip::result::ZipError::UnsupportedArchive(msg) if msg.contains("Password") => {
                Error::Locked
            }
            _ => Error::Parse(format!("package: {}", err)),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Unknown(format!("image: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Locked;
        assert_eq!(err.to_string(), "Document is locked (encrypted)");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.status(), ConvertStatus::FileNotFound);
    }

    #[test]
    fn test_status_projection() {
        assert_eq!(Error::Locked.status(), ConvertStatus::Locked);
        assert_eq!(
            Error::Parse("bad".into()).status(),
            ConvertStatus::ParseError
        );
        assert_eq!(
            Error::Write("disk".into()).status(),
            ConvertStatus::WriteError
        );
        assert_eq!(Error::Cancelled.status(), ConvertStatus::UnknownError);
        assert_eq!(
            Error::InvalidFormat("txt".into()).status(),
            ConvertStatus::InvalidFormat
        );
    }

    #[test]
    fn test_status_codes_are_distinct() {
        let all = [
            ConvertStatus::Success,
            ConvertStatus::FileNotFound,
            ConvertStatus::InvalidFormat,
            ConvertStatus::Locked,
            ConvertStatus::ParseError,
            ConvertStatus::WriteError,
            ConvertStatus::UnknownError,
        ];
        let mut codes: Vec<i32> = all.iter().map(|s| s.code()).collect();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
        assert!(ConvertStatus::Success.is_success());
        assert_eq!(ConvertStatus::Locked.to_string(), "Locked");
    }
}
