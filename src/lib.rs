//! # docmason
//!
//! Position- and format-preserving extraction of DOCX and PDF documents.
//!
//! Both formats are lowered into one flat list of [`DocumentElement`]s
//! (text, images, tables, charts) sharing a single pixel coordinate space.
//! Intersecting elements are linked, and the result is written as a
//! deterministic `LosslessDocument` XML file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docmason::{convert_file, ConvertOptions};
//!
//! fn main() -> docmason::Result<()> {
//!     let result = convert_file("report.docx", &ConvertOptions::default())?;
//!     std::fs::write("report.xml", &result.xml)?;
//!     println!("{} elements on {} pages", result.element_count(), result.page_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **DOCX**: paragraphs with formatting, tables, anchored and inline pictures,
//!   VML images, and charts with their series
//! - **PDF**: positioned text boxes plus heuristic image, table and chart regions
//! - **Relationships**: symmetric or directional links between intersecting boxes
//! - **Reproducible output**: canonical ordering and clock-free element ids

pub mod convert;
pub mod detect;
pub mod error;
pub mod model;
pub mod ooxml;
pub mod package;
pub mod pdf;
pub mod relate;
pub mod render;
pub mod units;

// Re-export commonly used types
pub use convert::{
    CancellationToken, ConvertOptions, ConvertResult, ConverterRegistry, DocumentConverter,
    ExtractionPipeline, ProgressEvent, ProgressStage,
};
pub use detect::{detect_format_from_bytes, detect_format_from_path, InputFormat};
pub use error::{ConvertStatus, Error, Result};
pub use model::{
    Alignment, DocumentElement, ElementType, FormatInfo, IdGenerator, PositionInfo, Rect,
};
pub use relate::{ElementRelationshipBuilder, RelationshipMode};
pub use render::{CreatedTimestamp, JsonFormat, PageSelection, XmlDocument, XmlOptions};

use std::path::Path;

/// Convert a DOCX or PDF file into lossless XML.
///
/// # Arguments
///
/// * `path` - Path to the source document
/// * `options` - Conversion options
///
/// # Example
///
/// ```no_run
/// use docmason::{convert_file, ConvertOptions, PageSelection};
///
/// let options = ConvertOptions::new().with_pages(PageSelection::Range(1..=3));
/// let result = convert_file("scan.pdf", &options).unwrap();
/// println!("{}", String::from_utf8_lossy(&result.xml));
/// ```
pub fn convert_file<P: AsRef<Path>>(path: P, options: &ConvertOptions) -> Result<ConvertResult> {
    ExtractionPipeline::with_defaults().convert(path.as_ref(), options)
}

/// Convert a file and write the XML to `output`.
///
/// Nothing is written when the conversion fails.
///
/// # Example
///
/// ```no_run
/// use docmason::{convert_to_file, ConvertOptions};
///
/// convert_to_file("report.docx", "out/report.xml", &ConvertOptions::default()).unwrap();
/// ```
pub fn convert_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
    path: P,
    output: Q,
    options: &ConvertOptions,
) -> Result<ConvertResult> {
    ExtractionPipeline::with_defaults().convert_to_file(path.as_ref(), output.as_ref(), options)
}

/// Extract plain text, one Text or Paragraph element per line.
///
/// # Example
///
/// ```no_run
/// use docmason::extract_text;
///
/// let text = extract_text("report.docx").unwrap();
/// println!("{}", text);
/// ```
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let options = ConvertOptions::default().with_verify(false);
    Ok(convert_file(path, &options)?.text())
}

/// Convert a file to a JSON array of elements.
///
/// # Example
///
/// ```no_run
/// use docmason::{to_json, JsonFormat};
///
/// let json = to_json("report.docx", JsonFormat::Pretty).unwrap();
/// std::fs::write("report.json", json).unwrap();
/// ```
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let options = ConvertOptions::default().with_verify(false);
    convert_file(path, &options)?.to_json(format)
}

/// Builder for converting documents.
///
/// # Example
///
/// ```no_run
/// use docmason::{Docmason, RelationshipMode};
///
/// let result = Docmason::new()
///     .with_relationship_mode(RelationshipMode::Directional)
///     .without_binary()
///     .convert("report.docx")?;
/// println!("{}", result.text());
/// # Ok::<(), docmason::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Docmason {
    options: ConvertOptions,
    pipeline: ExtractionPipeline,
}

impl Docmason {
    /// Create a new builder over the default converters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page selection (PDF only).
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.options = self.options.with_pages(pages);
        self
    }

    pub fn with_relationship_mode(mut self, mode: RelationshipMode) -> Self {
        self.options = self.options.with_relationship_mode(mode);
        self
    }

    /// Skip the read-back integrity check.
    pub fn without_verification(mut self) -> Self {
        self.options = self.options.with_verify(false);
        self
    }

    /// Leave image bytes out of the XML.
    pub fn without_binary(mut self) -> Self {
        let xml = self.options.xml.clone().with_binary(false);
        self.options = self.options.with_xml(xml);
        self
    }

    /// Export image bytes into `dir`.
    pub fn with_image_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.options = self.options.with_image_dir(dir);
        self
    }

    /// Set the `created` timestamp policy.
    pub fn with_created(mut self, created: CreatedTimestamp) -> Self {
        let xml = self.options.xml.clone().with_created(created);
        self.options = self.options.with_xml(xml);
        self
    }

    /// Use a custom PDF engine.
    pub fn with_pdf_engine(mut self, engine: std::sync::Arc<dyn pdf::PdfEngine>) -> Self {
        self.pipeline = self.pipeline.with_pdf_engine(engine);
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert a file.
    pub fn convert<P: AsRef<Path>>(&self, path: P) -> Result<ConvertResult> {
        self.pipeline.convert(path.as_ref(), &self.options)
    }

    /// Convert a file and write the XML to `output`.
    pub fn convert_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        path: P,
        output: Q,
    ) -> Result<ConvertResult> {
        self.pipeline
            .convert_to_file(path.as_ref(), output.as_ref(), &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = Docmason::default();
        assert!(builder.options().verify);
        assert!(builder.options().xml.embed_binary);
        assert_eq!(
            builder.options().relationship_mode,
            RelationshipMode::Symmetric
        );
    }

    #[test]
    fn test_builder_chained() {
        let builder = Docmason::new()
            .with_pages(PageSelection::Range(1..=5))
            .with_relationship_mode(RelationshipMode::Directional)
            .without_verification()
            .without_binary()
            .with_created(CreatedTimestamp::Now);

        let options = builder.options();
        assert_eq!(options.pages, PageSelection::Range(1..=5));
        assert_eq!(options.relationship_mode, RelationshipMode::Directional);
        assert!(!options.verify);
        assert!(!options.xml.embed_binary);
        assert_eq!(options.xml.created, CreatedTimestamp::Now);
    }

    #[test]
    fn test_convert_missing_file() {
        let err = convert_file("/no/such/file.pdf", &ConvertOptions::default()).unwrap_err();
        assert_eq!(err.status(), ConvertStatus::FileNotFound);
    }

    #[test]
    fn test_convert_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain").unwrap();
        let err = convert_file(&path, &ConvertOptions::default()).unwrap_err();
        assert_eq!(err.status(), ConvertStatus::InvalidFormat);
    }

    #[test]
    fn test_convert_mismatched_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, "not a pdf at all").unwrap();
        let err = convert_file(&path, &ConvertOptions::default()).unwrap_err();
        assert_eq!(err.status(), ConvertStatus::InvalidFormat);
    }
}
