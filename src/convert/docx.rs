//! DOCX converter.

use std::path::Path;
use std::sync::Arc;

use log::info;

use super::{ConvertOptions, DocumentConverter, Extraction};
use crate::detect::InputFormat;
use crate::error::Result;
use crate::model::IdGenerator;
use crate::ooxml::OoxmlDocumentParser;
use crate::package::{ArchivePackageReader, ZipPackage};

/// Extracts elements from Word packages.
///
/// DOCX carries no pagination, so everything lands on page 1 and the page
/// selection is ignored.
#[derive(Clone)]
pub struct DocxConverter {
    package: Arc<dyn ArchivePackageReader>,
}

impl DocxConverter {
    /// Create a converter reading packages with [`ZipPackage`].
    pub fn new() -> Self {
        Self::with_package(Arc::new(ZipPackage::new()))
    }

    /// Create a converter over a custom archive reader.
    pub fn with_package(package: Arc<dyn ArchivePackageReader>) -> Self {
        Self { package }
    }
}

impl Default for DocxConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocxConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocxConverter").finish_non_exhaustive()
    }
}

impl DocumentConverter for DocxConverter {
    fn supported_extensions(&self) -> &[&str] {
        &["docx", "docm", "dotx", "dotm"]
    }

    fn name(&self) -> &str {
        "docx"
    }

    fn format(&self) -> InputFormat {
        InputFormat::Docx
    }

    fn extract(
        &self,
        path: &Path,
        options: &ConvertOptions,
        ids: &mut IdGenerator,
    ) -> Result<Extraction> {
        let elements = OoxmlDocumentParser::new(self.package.as_ref(), path)
            .with_cancellation(options.cancel.as_ref())
            .parse(ids)?;
        info!("{}: {} elements", path.display(), elements.len());

        Ok(Extraction {
            format: InputFormat::Docx,
            page_count: 1,
            elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::CancellationToken;
    use crate::error::Error;
    use crate::model::ElementType;
    use std::collections::BTreeMap;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;

    /// In-memory package keyed by entry name.
    struct MemoryPackage(BTreeMap<String, Vec<u8>>);

    impl MemoryPackage {
        fn with_document(body: &str) -> Self {
            let document = format!(
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
                body
            );
            let mut entries = BTreeMap::new();
            entries.insert("[Content_Types].xml".to_string(), CONTENT_TYPES.as_bytes().to_vec());
            entries.insert("word/document.xml".to_string(), document.into_bytes());
            Self(entries)
        }
    }

    impl ArchivePackageReader for MemoryPackage {
        fn read_entry(&self, _archive: &Path, entry: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.0.get(entry.trim_start_matches('/')).cloned())
        }

        fn list_entries(&self, _archive: &Path) -> Result<Vec<String>> {
            Ok(self.0.keys().cloned().collect())
        }

        fn write_copy_with_replacements(
            &self,
            _src: &Path,
            _dest: &Path,
            _replacements: &BTreeMap<String, Vec<u8>>,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn extract(package: MemoryPackage, options: &ConvertOptions) -> Result<Extraction> {
        let converter = DocxConverter::with_package(Arc::new(package));
        converter.extract(Path::new("memory.docx"), options, &mut IdGenerator::new())
    }

    #[test]
    fn test_paragraphs_and_table() {
        let package = MemoryPackage::with_document(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
               <w:p/>
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        );
        let extraction = extract(package, &ConvertOptions::default()).unwrap();
        assert_eq!(extraction.page_count, 1);

        let types: Vec<ElementType> = extraction.elements.iter().map(|e| e.element_type).collect();
        assert_eq!(types, vec![ElementType::Text, ElementType::Table]);

        let text = &extraction.elements[0];
        assert_eq!(text.content, "Hello world");
        assert!(text.format.bold);
        assert_eq!(text.page(), 1);
        assert_eq!(text.attributes["source"], "docx");
        assert!(extraction.elements.iter().all(|e| e.page() == 1));
    }

    #[test]
    fn test_missing_main_part() {
        let mut package = MemoryPackage::with_document("");
        package.0.remove("word/document.xml");
        let err = extract(package, &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_cancelled_before_first_block() {
        let token = CancellationToken::new();
        token.cancel();
        let options = ConvertOptions::default().with_cancellation(token);
        let package = MemoryPackage::with_document("<w:p><w:r><w:t>x</w:t></w:r></w:p>");
        let err = extract(package, &options).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
