//! PDF converter.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use super::{ConvertOptions, DocumentConverter, Extraction};
use crate::detect::InputFormat;
use crate::error::{Error, Result};
use crate::model::{DocumentElement, IdGenerator};
use crate::pdf::{
    extract_text_elements, EngineCapabilities, LopdfEngine, PdfEngine, PdfPage, RegionDetector,
};

/// Extracts elements from PDF files through a [`PdfEngine`].
///
/// Engine capabilities are queried once, when the converter is built.
#[derive(Clone)]
pub struct PdfConverter {
    engine: Arc<dyn PdfEngine>,
    capabilities: EngineCapabilities,
}

impl PdfConverter {
    /// Create a converter backed by [`LopdfEngine`].
    pub fn new() -> Self {
        Self::with_engine(Arc::new(LopdfEngine::new()))
    }

    /// Create a converter over a custom engine.
    pub fn with_engine(engine: Arc<dyn PdfEngine>) -> Self {
        let capabilities = engine.capabilities();
        debug!(
            "PDF engine {}: rasterize={}, search={}",
            engine.name(),
            capabilities.rasterize,
            capabilities.search
        );
        Self {
            engine,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }

    /// Text, then region candidates, for one page.
    fn extract_page(
        &self,
        page: &dyn PdfPage,
        page_number: u32,
        detector: &RegionDetector,
        ids: &mut IdGenerator,
    ) -> Result<Vec<DocumentElement>> {
        let boxes = page.text_boxes()?;
        let mut elements = extract_text_elements(page_number, boxes, ids);

        let region_options = detector.options();
        let wants_regions = region_options.detect_images
            || region_options.detect_tables
            || region_options.detect_charts;
        if !wants_regions {
            return Ok(elements);
        }

        let page_text = page.text()?;
        let needs_raster = region_options.detect_images || region_options.snapshot_regions;
        let raster = if self.capabilities.rasterize && needs_raster {
            let dpi = region_options.working_dpi;
            match page.render_to_image(dpi, dpi) {
                Ok(raster) => Some(raster),
                Err(e) => {
                    warn!("Page {}: rasterization failed: {}", page_number, e);
                    None
                }
            }
        } else {
            None
        };

        let candidates =
            detector.detect(page, &page_text, raster.as_ref(), self.capabilities.search);
        debug!("Page {}: {} region candidates", page_number, candidates.len());
        elements.extend(detector.into_elements(candidates, page_number, raster.as_ref(), ids));
        Ok(elements)
    }
}

impl Default for PdfConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PdfConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfConverter")
            .field("engine", &self.engine.name())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl DocumentConverter for PdfConverter {
    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn format(&self) -> InputFormat {
        InputFormat::Pdf
    }

    fn extract(
        &self,
        path: &Path,
        options: &ConvertOptions,
        ids: &mut IdGenerator,
    ) -> Result<Extraction> {
        let doc = self.engine.open(path, options.layout_dpi)?;
        let page_count = doc.page_count();
        info!("{}: {} pages", path.display(), page_count);

        if !self.capabilities.rasterize && options.regions.detect_images {
            info!("Engine {} cannot rasterize; skipping image regions", self.engine.name());
        }

        let detector = RegionDetector::new(options.regions.clone());
        let mut elements = Vec::new();
        for index in 0..page_count {
            let page_number = index + 1;
            if !options.pages.includes(page_number) {
                continue;
            }
            if options.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                return Err(Error::Cancelled);
            }

            let page = match doc.page(index) {
                Ok(page) => page,
                Err(e) => {
                    warn!("Skipping page {}: {}", page_number, e);
                    continue;
                }
            };
            match self.extract_page(page.as_ref(), page_number, &detector, ids) {
                Ok(page_elements) => elements.extend(page_elements),
                Err(e) => warn!("Skipping page {}: {}", page_number, e),
            }
        }

        Ok(Extraction {
            format: InputFormat::Pdf,
            page_count,
            elements,
        })
    }
}
