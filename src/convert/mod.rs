//! Converters and the extraction pipeline.
//!
//! Each source format has a [`DocumentConverter`] that lowers a file into
//! [`DocumentElement`]s. The [`ConverterRegistry`] dispatches on file
//! extension, and [`ExtractionPipeline`] runs detection, extraction,
//! relationship building, serialization and verification in one pass.
//!
//! # Example
//!
//! ```no_run
//! use docmason::convert::{ConvertOptions, ExtractionPipeline};
//! use std::path::Path;
//!
//! fn main() -> docmason::Result<()> {
//!     let pipeline = ExtractionPipeline::with_defaults();
//!     let result = pipeline.convert(Path::new("report.docx"), &ConvertOptions::default())?;
//!     println!("{} elements", result.elements.len());
//!     Ok(())
//! }
//! ```

mod docx;
mod pdf;
mod pipeline;
mod progress;

pub use docx::DocxConverter;
pub use pdf::PdfConverter;
pub use pipeline::{ConvertResult, ExtractionPipeline};
pub use progress::{CancellationToken, ProgressEvent, ProgressStage};
pub(crate) use progress::ProgressReporter;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::detect::InputFormat;
use crate::error::{Error, Result};
use crate::model::{DocumentElement, IdGenerator};
use crate::pdf::RegionOptions;
use crate::relate::RelationshipMode;
use crate::render::{PageSelection, XmlOptions};
use crate::units::LAYOUT_DPI;

/// Options for one conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Pages to extract (PDF only)
    pub pages: PageSelection,

    pub relationship_mode: RelationshipMode,

    /// Relate only elements on the same page
    pub same_page_relationships: bool,

    /// Re-read the serialized XML and compare element counts
    pub verify: bool,

    /// Resolution of the shared pixel space
    pub layout_dpi: f32,

    pub regions: RegionOptions,

    pub xml: XmlOptions,

    /// Write image bytes here, one file per Image element
    pub image_dir: Option<PathBuf>,

    /// Receives stage checkpoints
    pub progress: Option<Sender<ProgressEvent>>,

    pub cancel: Option<CancellationToken>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            pages: PageSelection::All,
            relationship_mode: RelationshipMode::default(),
            same_page_relationships: false,
            verify: true,
            layout_dpi: LAYOUT_DPI,
            regions: RegionOptions::default(),
            xml: XmlOptions::default(),
            image_dir: None,
            progress: None,
            cancel: None,
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_relationship_mode(mut self, mode: RelationshipMode) -> Self {
        self.relationship_mode = mode;
        self
    }

    pub fn with_same_page_relationships(mut self, same_page: bool) -> Self {
        self.same_page_relationships = same_page;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_layout_dpi(mut self, dpi: f32) -> Self {
        self.layout_dpi = dpi;
        self
    }

    pub fn with_regions(mut self, regions: RegionOptions) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_xml(mut self, xml: XmlOptions) -> Self {
        self.xml = xml;
        self
    }

    /// Export each Image element's bytes into `dir`; the file path is
    /// recorded in the element's `saved_path` attribute.
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    pub fn with_progress(mut self, sender: Sender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Elements lowered from one source file, before relationships.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub format: InputFormat,
    pub page_count: u32,
    /// Discovery order
    pub elements: Vec<DocumentElement>,
}

/// Trait for document converters.
///
/// Implement this trait to add support for a new source format.
pub trait DocumentConverter: Send + Sync {
    /// Lowercase extensions without the leading dot (e.g. `["pdf"]`).
    fn supported_extensions(&self) -> &[&str];

    fn name(&self) -> &str;

    fn format(&self) -> InputFormat;

    /// Lower the file into elements. Ids come from `ids` so that discovery
    /// order is shared across the whole document.
    fn extract(
        &self,
        path: &Path,
        options: &ConvertOptions,
        ids: &mut IdGenerator,
    ) -> Result<Extraction>;

    fn supports_extension(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext_lower)
    }
}

/// Maps file extensions to converters.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn DocumentConverter>>,
    by_name: HashMap<String, Arc<dyn DocumentConverter>>,
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Registry with the DOCX and PDF converters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DocxConverter::new()));
        registry.register(Arc::new(PdfConverter::new()));
        registry
    }

    /// Register a converter for all its extensions, replacing earlier ones.
    pub fn register(&mut self, converter: Arc<dyn DocumentConverter>) {
        for ext in converter.supported_extensions() {
            self.converters.insert(ext.to_lowercase(), converter.clone());
        }
        self.by_name.insert(converter.name().to_lowercase(), converter);
    }

    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn DocumentConverter>> {
        self.converters.get(&ext.to_lowercase()).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn DocumentConverter>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    pub fn supports(&self, ext: &str) -> bool {
        self.converters.contains_key(&ext.to_lowercase())
    }

    /// Registered extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.converters.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }

    /// Extract with the converter registered for the file's extension.
    pub fn extract(
        &self,
        path: &Path,
        options: &ConvertOptions,
        ids: &mut IdGenerator,
    ) -> Result<Extraction> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::InvalidFormat("file has no extension".into()))?;

        let converter = self
            .get_by_extension(ext)
            .ok_or_else(|| Error::InvalidFormat(format!("no converter for extension: {}", ext)))?;

        converter.extract(path, options, ids)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("extensions", &self.supported_extensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_options_builder() {
        let options = ConvertOptions::new()
            .with_pages(PageSelection::Range(1..=2))
            .with_relationship_mode(RelationshipMode::Directional)
            .with_same_page_relationships(true)
            .with_verify(false)
            .with_xml(XmlOptions::new().with_binary(false));

        assert_eq!(options.pages, PageSelection::Range(1..=2));
        assert_eq!(options.relationship_mode, RelationshipMode::Directional);
        assert!(options.same_page_relationships);
        assert!(!ConvertOptions::default().same_page_relationships);

        let options = ConvertOptions::new().with_image_dir("./images");
        assert_eq!(options.image_dir, Some(PathBuf::from("./images")));
        assert!(!options.verify);
        assert!(!options.xml.embed_binary);
        assert_eq!(options.layout_dpi, 96.0);
    }

    #[test]
    fn test_registry_with_defaults() {
        let registry = ConverterRegistry::with_defaults();
        assert!(registry.supports("pdf"));
        assert!(registry.supports("DOCX"));
        assert!(!registry.supports("txt"));
        assert_eq!(
            registry.supported_extensions(),
            vec!["docm", "docx", "dotm", "dotx", "pdf"]
        );
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ConverterRegistry::with_defaults();
        let converter = registry.get_by_extension("pdf").unwrap();
        assert_eq!(converter.name(), "pdf");
        assert_eq!(converter.format(), InputFormat::Pdf);
        assert!(registry.get_by_name("DOCX").is_some());
        assert!(registry.get_by_name("xlsx").is_none());
    }

    #[test]
    fn test_registry_unknown_extension() {
        let registry = ConverterRegistry::new();
        let err = registry
            .extract(Path::new("a.xyz"), &ConvertOptions::default(), &mut IdGenerator::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }
}
