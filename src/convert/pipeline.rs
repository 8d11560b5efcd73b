//! Detection, extraction, relationships, serialization and verification.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::{
    ConvertOptions, ConverterRegistry, Extraction, PdfConverter, ProgressReporter, ProgressStage,
};
use crate::detect::{detect_format_from_path, InputFormat};
use crate::error::{ConvertStatus, Error, Result};
use crate::model::{extension_for_mime, DocumentElement, ElementType, IdGenerator};
use crate::pdf::PdfEngine;
use crate::relate::ElementRelationshipBuilder;
use crate::render::{
    to_json, to_plain_text, CreatedTimestamp, JsonFormat, LosslessXmlSerializer, XmlDocument,
};

/// Outcome of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    pub status: ConvertStatus,
    pub format: InputFormat,
    pub page_count: u32,
    /// Canonical order, relationships filled
    pub elements: Vec<DocumentElement>,
    /// Intersecting pairs found by the relationship pass
    pub relationship_pairs: usize,
    /// The `LosslessDocument` bytes
    pub xml: Vec<u8>,
}

impl ConvertResult {
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Textual content, one element per line.
    pub fn text(&self) -> String {
        to_plain_text(&self.elements)
    }

    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        to_json(&self.elements, format)
    }
}

/// Runs one document through every stage.
///
/// The pass is synchronous. Callers that need a responsive UI run it on a
/// worker thread and listen on the progress channel.
#[derive(Debug, Clone, Default)]
pub struct ExtractionPipeline {
    registry: ConverterRegistry,
}

impl ExtractionPipeline {
    pub fn new(registry: ConverterRegistry) -> Self {
        Self { registry }
    }

    /// Pipeline over the default DOCX and PDF converters.
    pub fn with_defaults() -> Self {
        Self::new(ConverterRegistry::with_defaults())
    }

    /// Replace the PDF engine of the registered PDF converter.
    pub fn with_pdf_engine(mut self, engine: Arc<dyn PdfEngine>) -> Self {
        self.registry
            .register(Arc::new(PdfConverter::with_engine(engine)));
        self
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Validate the input and lower it into elements, without relationships.
    pub fn extract(&self, path: &Path, options: &ConvertOptions) -> Result<Extraction> {
        let format = detect_format_from_path(path)?;
        debug!("{}: detected {}", path.display(), format);
        let mut ids = IdGenerator::new();
        self.registry.extract(path, options, &mut ids)
    }

    /// Convert a document into lossless XML.
    ///
    /// The first failing stage aborts the conversion; nothing partial is
    /// returned.
    pub fn convert(&self, path: &Path, options: &ConvertOptions) -> Result<ConvertResult> {
        let progress = ProgressReporter::new(options.progress.clone());
        let check_cancelled = || match &options.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        };

        progress.report(ProgressStage::ParseStructure, path.display().to_string());
        let extraction = self.extract(path, options)?;
        check_cancelled()?;

        let mut elements = extraction.elements;
        progress.report(
            ProgressStage::BuildRelationships,
            format!("{} elements", elements.len()),
        );
        let relationship_pairs = ElementRelationshipBuilder::new(options.relationship_mode)
            .with_same_page_only(options.same_page_relationships)
            .build(&mut elements);
        check_cancelled()?;

        if let Some(dir) = &options.image_dir {
            let written = export_images(&mut elements, dir)?;
            debug!("Exported {} images to {}", written, dir.display());
        }

        progress.report(
            ProgressStage::Serialize,
            format!("{} relationship pairs", relationship_pairs),
        );
        let created = resolve_created(path, options.xml.created);
        let source_format = extraction.format.name().to_ascii_uppercase();
        let xml = LosslessXmlSerializer::new(options.xml.clone()).serialize(
            &elements,
            created,
            &source_format,
        )?;

        if options.verify {
            progress.report(ProgressStage::Validate, format!("{} bytes", xml.len()));
            verify_output(&xml, elements.len())?;
        }

        progress.report(
            ProgressStage::Finished,
            format!("{} elements written", elements.len()),
        );
        Ok(ConvertResult {
            status: ConvertStatus::Success,
            format: extraction.format,
            page_count: extraction.page_count,
            elements,
            relationship_pairs,
            xml,
        })
    }

    /// Convert and write the XML to `output`, creating parent directories.
    /// Nothing is written when conversion fails.
    pub fn convert_to_file(
        &self,
        path: &Path,
        output: &Path,
        options: &ConvertOptions,
    ) -> Result<ConvertResult> {
        let result = self.convert(path, options)?;

        let write_err = |e: std::io::Error| Error::Write(format!("{}: {}", output.display(), e));
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(output, &result.xml).map_err(write_err)?;
        Ok(result)
    }

    /// Status-code form of [`convert`](Self::convert): the XML bytes on
    /// success, empty bytes otherwise.
    pub fn convert_with_status(
        &self,
        path: &Path,
        options: &ConvertOptions,
    ) -> (ConvertStatus, Vec<u8>) {
        match self.convert(path, options) {
            Ok(result) => (ConvertStatus::Success, result.xml),
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                (e.status(), Vec::new())
            }
        }
    }
}

/// The instant written to the root `created` attribute.
fn resolve_created(path: &Path, policy: CreatedTimestamp) -> DateTime<Utc> {
    match policy {
        CreatedTimestamp::Fixed(at) => at,
        CreatedTimestamp::Now => Utc::now(),
        CreatedTimestamp::SourceModified => match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(e) => {
                debug!("No modification time for {}: {}", path.display(), e);
                DateTime::<Utc>::from(std::time::UNIX_EPOCH)
            }
        },
    }
}

/// Read the output back and check it describes `expected` elements.
/// Write each Image element's bytes to `dir/<id>.<ext>` and record the path
/// in its `saved_path` attribute. Returns the number of files written.
fn export_images(elements: &mut [DocumentElement], dir: &Path) -> Result<usize> {
    let write_err = |p: &Path, e: std::io::Error| Error::Write(format!("{}: {}", p.display(), e));
    fs::create_dir_all(dir).map_err(|e| write_err(dir, e))?;

    let mut written = 0;
    for el in elements
        .iter_mut()
        .filter(|e| e.element_type == ElementType::Image)
    {
        let Some(data) = &el.binary_data else {
            continue;
        };
        let ext = extension_for_mime(el.mime_type.as_deref().unwrap_or_default());
        let file = dir.join(format!("{}.{}", el.id, ext));
        fs::write(&file, data).map_err(|e| write_err(&file, e))?;
        el.attributes
            .insert("saved_path".into(), file.display().to_string());
        written += 1;
    }
    Ok(written)
}

fn verify_output(xml: &[u8], expected: usize) -> Result<()> {
    let doc = XmlDocument::parse(xml)
        .map_err(|e| Error::Write(format!("integrity check: {}", e)))?;
    doc.verify()
        .map_err(|e| Error::Write(format!("integrity check: {}", e)))?;
    if doc.element_count != expected {
        return Err(Error::Write(format!(
            "integrity check: wrote {} elements, expected {}",
            doc.element_count, expected
        )));
    }
    Ok(())
}
