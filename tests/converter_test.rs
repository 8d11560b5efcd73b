//! Integration tests for the converter registry.

use std::path::Path;
use std::sync::Arc;

use docmason::convert::{
    ConvertOptions, ConverterRegistry, DocumentConverter, DocxConverter, Extraction,
    ExtractionPipeline, PdfConverter,
};
use docmason::error::{Error, Result};
use docmason::{DocumentElement, ElementType, IdGenerator, InputFormat, XmlDocument};

/// Mock converter for testing.
struct MockConverter {
    extensions: Vec<&'static str>,
    name: &'static str,
}

impl MockConverter {
    fn new(extensions: Vec<&'static str>, name: &'static str) -> Self {
        Self { extensions, name }
    }
}

impl DocumentConverter for MockConverter {
    fn supported_extensions(&self) -> &[&str] {
        &self.extensions
    }

    fn name(&self) -> &str {
        self.name
    }

    fn format(&self) -> InputFormat {
        InputFormat::Docx
    }

    fn extract(
        &self,
        _path: &Path,
        _options: &ConvertOptions,
        ids: &mut IdGenerator,
    ) -> Result<Extraction> {
        let element = DocumentElement::new(ids.next_id(ElementType::Text), ElementType::Text)
            .with_content(format!("Converted by {}", self.name));
        Ok(Extraction {
            format: InputFormat::Docx,
            page_count: 1,
            elements: vec![element],
        })
    }
}

#[test]
fn test_converter_registry_new() {
    let registry = ConverterRegistry::new();

    // Empty registry should support nothing
    assert!(!registry.supports("pdf"));
    assert!(!registry.supports("docx"));
    assert!(registry.supported_extensions().is_empty());
}

#[test]
fn test_converter_registry_with_defaults() {
    let registry = ConverterRegistry::with_defaults();

    assert!(registry.supports("pdf"));
    assert!(registry.supports("PDF")); // Case insensitive
    assert!(registry.supports("docx"));
    assert!(registry.supports("dotm"));
    assert!(!registry.supports("doc"));
}

#[test]
fn test_converter_registry_register() {
    let mut registry = ConverterRegistry::new();
    let converter = Arc::new(MockConverter::new(vec!["txt", "text"], "text"));

    registry.register(converter);

    assert!(registry.supports("txt"));
    assert!(registry.supports("text"));
    assert!(registry.supports("TXT"));
}

#[test]
fn test_converter_registry_get_by_extension() {
    let registry = ConverterRegistry::with_defaults();

    let converter = registry.get_by_extension("pdf");
    assert!(converter.is_some());
    assert_eq!(converter.unwrap().name(), "pdf");

    let converter = registry.get_by_extension("docm").unwrap();
    assert_eq!(converter.format(), InputFormat::Docx);

    assert!(registry.get_by_extension("xlsx").is_none());
}

#[test]
fn test_converter_registry_get_by_name() {
    let registry = ConverterRegistry::with_defaults();

    assert!(registry.get_by_name("pdf").is_some());
    assert!(registry.get_by_name("PDF").is_some()); // Case insensitive
    assert!(registry.get_by_name("unknown").is_none());
}

#[test]
fn test_later_registration_wins() {
    let mut registry = ConverterRegistry::with_defaults();
    registry.register(Arc::new(MockConverter::new(vec!["docx"], "mock-word")));

    let converter = registry.get_by_extension("docx").unwrap();
    assert_eq!(converter.name(), "mock-word");
    // Extensions the replacement does not claim stay with the original.
    assert_eq!(registry.get_by_extension("docm").unwrap().name(), "docx");
}

#[test]
fn test_builtin_converter_extensions() {
    let pdf = PdfConverter::new();
    assert_eq!(pdf.supported_extensions(), &["pdf"]);
    assert!(pdf.supports_extension("PDF"));
    assert!(!pdf.supports_extension("docx"));
    assert!(!pdf.capabilities().rasterize);

    let docx = DocxConverter::new();
    assert_eq!(docx.name(), "docx");
    assert!(docx.supports_extension("DOCX"));
}

#[test]
fn test_mock_converter_extract() {
    let converter = MockConverter::new(vec!["mock"], "mock-converter");
    let mut ids = IdGenerator::new();

    let extraction = converter
        .extract(Path::new("test.mock"), &ConvertOptions::default(), &mut ids)
        .unwrap();
    assert_eq!(extraction.elements.len(), 1);
    assert!(extraction.elements[0].content.contains("mock-converter"));
    assert_eq!(ids.issued(), 1);
}

#[test]
fn test_registry_extract_errors() {
    let registry = ConverterRegistry::with_defaults();
    let options = ConvertOptions::default();

    let result = registry.extract(Path::new("noextension"), &options, &mut IdGenerator::new());
    assert!(matches!(result, Err(Error::InvalidFormat(_))));

    let result = registry.extract(Path::new("test.xyz"), &options, &mut IdGenerator::new());
    assert!(matches!(result, Err(Error::InvalidFormat(_))));
}

#[test]
fn test_pipeline_with_custom_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stub.docx");
    // Only the zip signature is checked before dispatch.
    std::fs::write(&path, b"PK\x03\x04stub").unwrap();

    let mut registry = ConverterRegistry::new();
    registry.register(Arc::new(MockConverter::new(vec!["docx"], "stub")));
    let pipeline = ExtractionPipeline::new(registry);

    let result = pipeline.convert(&path, &ConvertOptions::default()).unwrap();
    assert_eq!(result.element_count(), 1);
    assert_eq!(result.text(), "Converted by stub");

    let doc = XmlDocument::parse(&result.xml).unwrap();
    assert_eq!(doc.source_format, "DOCX");
    assert_eq!(doc.elements[0].content, "Converted by stub");
}
