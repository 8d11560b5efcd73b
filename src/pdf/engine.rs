//! PDF engine abstraction.
//!
//! The pipeline never touches a concrete PDF library. It talks to an
//! injected [`PdfEngine`] whose documents hand out pages measuring text in
//! the layout pixel space chosen at open time.

use std::path::Path;

use image::RgbaImage;

use super::text::group_lines;
use crate::error::Result;
use crate::model::Rect;

/// A run of text and where it sits on the page, in layout pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub text: String,
    pub bbox: Rect,
}

impl TextBox {
    pub fn new(text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// What an engine can do, queried once and passed down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// Pages can be rendered to a raster.
    pub rasterize: bool,
    /// `search` locates text; without it table and chart hints are skipped.
    pub search: bool,
}

impl Default for EngineCapabilities {
    fn default() -> Self {
        Self {
            rasterize: false,
            search: true,
        }
    }
}

/// Opens PDF files.
pub trait PdfEngine: Send + Sync {
    /// Short engine name for logs and provenance attributes.
    fn name(&self) -> &str;

    fn capabilities(&self) -> EngineCapabilities;

    /// Open a document whose pages measure in pixels at `layout_dpi`.
    ///
    /// Fails with `FileNotFound`, `InvalidFormat`, `Locked` or `Parse`.
    fn open(&self, path: &Path, layout_dpi: f32) -> Result<Box<dyn PdfDocument + '_>>;
}

/// An opened document.
pub trait PdfDocument {
    fn page_count(&self) -> u32;

    /// Zero-based page access.
    fn page(&self, index: u32) -> Result<Box<dyn PdfPage + '_>>;
}

/// One page of an opened document.
pub trait PdfPage {
    /// Page size in layout pixels.
    fn size(&self) -> (i32, i32);

    /// Text boxes in content order.
    fn text_boxes(&self) -> Result<Vec<TextBox>>;

    /// Render the page at the given resolution.
    fn render_to_image(&self, dpi_x: f32, dpi_y: f32) -> Result<RgbaImage>;

    /// Plain page text, one visual line per `\n`. Wide horizontal gaps
    /// become runs of spaces so column layout survives.
    fn text(&self) -> Result<String> {
        let lines = group_lines(self.text_boxes()?);
        Ok(lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Boxes of every line (or single box) containing `needle`.
    fn search(&self, needle: &str) -> Result<Vec<Rect>> {
        let needle = needle.trim();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let boxes = self.text_boxes()?;
        let mut hits: Vec<Rect> = boxes
            .iter()
            .filter(|b| b.text.contains(needle))
            .map(|b| b.bbox)
            .collect();
        for line in group_lines(boxes) {
            if line.text.contains(needle) && !hits.iter().any(|r| line.bbox == *r) {
                // A line hit supersedes the single boxes it is made of.
                hits.retain(|r| !line.bbox.intersects(r));
                hits.push(line.bbox);
            }
        }
        Ok(hits)
    }
}
