//! Input format detection and validation.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Source formats the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
    /// Office Open XML word-processing package
    Docx,
    /// Portable Document Format
    Pdf,
}

impl InputFormat {
    /// Map a file extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" | "docm" | "dotx" | "dotm" => Some(InputFormat::Docx),
            "pdf" => Some(InputFormat::Pdf),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InputFormat::Docx => "docx",
            InputFormat::Pdf => "pdf",
        }
    }

    fn magic(&self) -> &'static [u8] {
        match self {
            InputFormat::Docx => ZIP_MAGIC,
            InputFormat::Pdf => PDF_MAGIC,
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
/// Local file header signature of a zip archive.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// Compound file header; Office wraps password-protected packages in one.
const CFB_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";
const HEADER_LEN: usize = 8;

/// Detect the format from leading bytes alone.
pub fn detect_format_from_bytes(data: &[u8]) -> Option<InputFormat> {
    if data.starts_with(PDF_MAGIC) {
        Some(InputFormat::Pdf)
    } else if data.starts_with(ZIP_MAGIC) {
        Some(InputFormat::Docx)
    } else {
        None
    }
}

/// Resolve and validate the format of a file on disk.
///
/// The extension chooses the branch; the header bytes must agree with it.
///
/// # Errors
/// * [`Error::FileNotFound`] when the path does not exist or is not a file
/// * [`Error::InvalidFormat`] for unknown extensions or mismatching content
/// * [`Error::Locked`] for an encrypted OOXML package
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<InputFormat> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| Error::InvalidFormat("file has no extension".into()))?;
    let format = InputFormat::from_extension(ext)
        .ok_or_else(|| Error::InvalidFormat(format!("unsupported extension: .{}", ext)))?;

    let mut file = File::open(path).map_err(|_| Error::FileNotFound(path.to_path_buf()))?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.by_ref()
        .take(HEADER_LEN as u64)
        .read_to_end(&mut header)?;

    if format == InputFormat::Docx && header.starts_with(CFB_MAGIC) {
        return Err(Error::Locked);
    }
    if !header.starts_with(format.magic()) {
        return Err(Error::InvalidFormat(format!(
            "content of {} is not a {} file",
            path.display(),
            format
        )));
    }

    Ok(format)
}

/// Check if bytes start with a PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data) == Some(InputFormat::Pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detect_from_bytes() {
        assert_eq!(
            detect_format_from_bytes(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3"),
            Some(InputFormat::Pdf)
        );
        assert_eq!(
            detect_format_from_bytes(b"PK\x03\x04\x14\x00"),
            Some(InputFormat::Docx)
        );
        assert_eq!(detect_format_from_bytes(b"<!DOCTYPE html>"), None);
        assert_eq!(detect_format_from_bytes(b"%PD"), None);
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(InputFormat::from_extension("PDF"), Some(InputFormat::Pdf));
        assert_eq!(InputFormat::from_extension("docx"), Some(InputFormat::Docx));
        assert_eq!(InputFormat::from_extension("doc"), None);
    }

    #[test]
    fn test_path_missing() {
        let result = detect_format_from_path("/definitely/not/here.pdf");
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_path_extension_and_content() {
        let dir = tempfile::tempdir().unwrap();

        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, b"hello").unwrap();
        assert!(matches!(
            detect_format_from_path(&txt),
            Err(Error::InvalidFormat(_))
        ));

        let fake = dir.path().join("fake.pdf");
        std::fs::write(&fake, b"PK\x03\x04 not really").unwrap();
        assert!(matches!(
            detect_format_from_path(&fake),
            Err(Error::InvalidFormat(_))
        ));

        let real = dir.path().join("real.pdf");
        let mut f = File::create(&real).unwrap();
        f.write_all(b"%PDF-1.4\n").unwrap();
        drop(f);
        assert_eq!(detect_format_from_path(&real).unwrap(), InputFormat::Pdf);

        let locked = dir.path().join("locked.docx");
        std::fs::write(&locked, CFB_MAGIC).unwrap();
        assert!(matches!(detect_format_from_path(&locked), Err(Error::Locked)));
    }

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.4\n"));
        assert!(!is_pdf_bytes(b"Not a PDF"));
    }
}
