//! Heuristic region detection for PDF pages.
//!
//! Three independent detectors produce [`RegionCandidate`]s:
//!
//! - image regions: connected non-white areas of a page raster;
//! - table lines: text lines whose spacing suggests columns;
//! - chart hints: caption keywords, widened to cover the likely chart.
//!
//! Candidates may overlap each other and text elements. An empty result is
//! never an error.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::LazyLock;

use fixedbitset::FixedBitSet;
use image::{ImageFormat, Rgba, RgbaImage};
use log::{debug, warn};
use regex::Regex;

use super::engine::PdfPage;
use crate::model::{ChartInfo, ChartType, DocumentElement, ElementType, IdGenerator, ImageInfo, Rect, TableInfo};
use crate::units::LAYOUT_DPI;

static WIDE_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{3,}").expect("valid wide gap regex"));
static CELL_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+|\s{2,}").expect("valid cell split regex"));

/// Default chart caption vocabulary.
pub const DEFAULT_CHART_KEYWORDS: &[&str] = &[
    "图表", "柱状图", "折线图", "饼图", "Chart", "Figure", "Bar", "Pie", "Line", "Scatter",
];

/// Tuning for the region heuristics. Pixel values are in the working raster
/// unless noted.
#[derive(Debug, Clone)]
pub struct RegionOptions {
    /// Resolution the page is rasterized at for image detection
    pub working_dpi: f32,
    /// Seed scan stride
    pub grid_stride: u32,
    /// Pixels at or above this lightness count as paper
    pub white_threshold: u8,
    /// Maximum lightness difference from the seed while flooding
    pub flood_tolerance: u8,
    /// Smallest accepted region, width and height
    pub min_region_size: (u32, u32),
    /// Margin added around chart keyword hits, layout pixels
    pub chart_margin: i32,
    pub chart_keywords: Vec<String>,
    pub detect_images: bool,
    pub detect_tables: bool,
    pub detect_charts: bool,
    /// Attach PNG crops of table and chart regions when a raster exists
    pub snapshot_regions: bool,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            working_dpi: 150.0,
            grid_stride: 10,
            white_threshold: 240,
            flood_tolerance: 30,
            min_region_size: (50, 50),
            chart_margin: 50,
            chart_keywords: DEFAULT_CHART_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            detect_images: true,
            detect_tables: true,
            detect_charts: true,
            snapshot_regions: false,
        }
    }
}

impl RegionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dpi(mut self, dpi: f32) -> Self {
        self.working_dpi = dpi;
        self
    }

    pub fn with_grid_stride(mut self, stride: u32) -> Self {
        self.grid_stride = stride.max(1);
        self
    }

    pub fn with_white_threshold(mut self, threshold: u8) -> Self {
        self.white_threshold = threshold;
        self
    }

    pub fn with_flood_tolerance(mut self, tolerance: u8) -> Self {
        self.flood_tolerance = tolerance;
        self
    }

    pub fn with_min_region_size(mut self, width: u32, height: u32) -> Self {
        self.min_region_size = (width, height);
        self
    }

    pub fn with_chart_margin(mut self, margin: i32) -> Self {
        self.chart_margin = margin;
        self
    }

    pub fn with_chart_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chart_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_images(mut self, enabled: bool) -> Self {
        self.detect_images = enabled;
        self
    }

    pub fn with_tables(mut self, enabled: bool) -> Self {
        self.detect_tables = enabled;
        self
    }

    pub fn with_charts(mut self, enabled: bool) -> Self {
        self.detect_charts = enabled;
        self
    }

    pub fn with_snapshots(mut self, enabled: bool) -> Self {
        self.snapshot_regions = enabled;
        self
    }
}

/// A region found by one of the heuristics. Boxes are in layout pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionCandidate {
    Image { bbox: Rect, png: Vec<u8> },
    TableLine { bbox: Rect, cells: Vec<String> },
    ChartHint { bbox: Rect, keyword: String, chart_type: ChartType },
}

impl RegionCandidate {
    pub fn bbox(&self) -> &Rect {
        match self {
            RegionCandidate::Image { bbox, .. }
            | RegionCandidate::TableLine { bbox, .. }
            | RegionCandidate::ChartHint { bbox, .. } => bbox,
        }
    }
}

/// Composite over white and reduce to luma.
fn lightness(p: &Rgba<u8>) -> u8 {
    let [r, g, b, a] = p.0;
    let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
    let a = a as u32;
    (255 - (255 - luma) * a / 255) as u8
}

/// Find connected non-white regions in a raster.
///
/// Seeds are taken on a coarse grid. From each unvisited seed darker than
/// the white threshold the region grows 4-directionally over pixels that are
/// themselves below the threshold and within the flood tolerance of the
/// seed. Every pixel is visited at most once. Returned boxes are in raster
/// pixels.
pub fn detect_image_regions(raster: &RgbaImage, options: &RegionOptions) -> Vec<Rect> {
    let (width, height) = raster.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let stride = options.grid_stride.max(1);
    let (min_w, min_h) = options.min_region_size;
    let mut visited = FixedBitSet::with_capacity(width as usize * height as usize);
    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;

    let mut regions = Vec::new();
    let mut stack: Vec<(u32, u32)> = Vec::new();

    for sy in (0..height).step_by(stride as usize) {
        for sx in (0..width).step_by(stride as usize) {
            if visited.contains(index(sx, sy)) {
                continue;
            }
            let seed = lightness(raster.get_pixel(sx, sy));
            if seed >= options.white_threshold {
                continue;
            }

            let (mut x0, mut y0, mut x1, mut y1) = (sx, sy, sx, sy);
            visited.insert(index(sx, sy));
            stack.push((sx, sy));
            while let Some((x, y)) = stack.pop() {
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x);
                y1 = y1.max(y);

                let neighbours = [
                    (x.checked_sub(1), Some(y)),
                    (x.checked_add(1).filter(|&v| v < width), Some(y)),
                    (Some(x), y.checked_sub(1)),
                    (Some(x), y.checked_add(1).filter(|&v| v < height)),
                ];
                for (nx, ny) in neighbours {
                    let (Some(nx), Some(ny)) = (nx, ny) else {
                        continue;
                    };
                    let i = index(nx, ny);
                    if visited.contains(i) {
                        continue;
                    }
                    let l = lightness(raster.get_pixel(nx, ny));
                    if l < options.white_threshold && l.abs_diff(seed) < options.flood_tolerance {
                        visited.insert(i);
                        stack.push((nx, ny));
                    }
                }
            }

            let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);
            if w >= min_w && h >= min_h {
                regions.push(Rect::new(x0 as i32, y0 as i32, w as i32, h as i32));
            } else {
                debug!("Discarding {}x{} raster region as noise", w, h);
            }
        }
    }
    regions
}

/// Whether a text line looks like a row of a table.
pub fn is_table_like(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    line.contains('\t') || line.matches("  ").count() > 2 || WIDE_GAP.is_match(line)
}

/// Cells of a table-like line.
pub fn split_cells(line: &str) -> Vec<String> {
    CELL_SPLIT
        .split(line.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Table-line candidates for a page. Lines that cannot be located are skipped.
pub fn detect_table_lines(page: &dyn PdfPage, page_text: &str) -> Vec<RegionCandidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in page_text.lines().filter(|l| is_table_like(l)) {
        let hits = match page.search(line.trim()) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Cannot locate table-like line {:?}: {}", line.trim(), e);
                continue;
            }
        };
        for bbox in hits {
            if bbox.is_empty() || !seen.insert(bbox) {
                continue;
            }
            out.push(RegionCandidate::TableLine {
                bbox,
                cells: split_cells(line),
            });
        }
    }
    out
}

/// Chart hints for a page: each keyword hit widened by the margin and
/// clamped at the page origin. Identical rectangles are reported once.
pub fn detect_chart_hints(
    page: &dyn PdfPage,
    page_text: &str,
    options: &RegionOptions,
) -> Vec<RegionCandidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for keyword in &options.chart_keywords {
        if keyword.is_empty() || !page_text.contains(keyword.as_str()) {
            continue;
        }
        let hits = match page.search(keyword) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Cannot locate chart keyword {:?}: {}", keyword, e);
                continue;
            }
        };
        for hit in hits {
            let bbox = hit.expand(options.chart_margin).clamp_to_origin();
            if bbox.is_empty() || !seen.insert(bbox) {
                continue;
            }
            out.push(RegionCandidate::ChartHint {
                bbox,
                keyword: keyword.clone(),
                chart_type: ChartType::from_keyword(keyword),
            });
        }
    }
    out
}

fn encode_png(image: &RgbaImage) -> Option<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    match image.write_to(&mut buf, ImageFormat::Png) {
        Ok(()) => Some(buf.into_inner()),
        Err(e) => {
            warn!("PNG encoding failed: {}", e);
            None
        }
    }
}

/// Crop a raster to a raster-space rectangle, clipped to the image.
fn crop(raster: &RgbaImage, r: &Rect) -> Option<RgbaImage> {
    let (w, h) = raster.dimensions();
    let r = r.clamp_to_origin();
    let x = r.x as u32;
    let y = r.y as u32;
    if x >= w || y >= h || r.is_empty() {
        return None;
    }
    let cw = (r.width as u32).min(w - x);
    let ch = (r.height as u32).min(h - y);
    Some(image::imageops::crop_imm(raster, x, y, cw, ch).to_image())
}

/// Runs the enabled heuristics over one page.
#[derive(Debug, Clone, Default)]
pub struct RegionDetector {
    options: RegionOptions,
}

impl RegionDetector {
    pub fn new(options: RegionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RegionOptions {
        &self.options
    }

    /// Detect candidates. `raster` must have been rendered at the working DPI.
    pub fn detect(
        &self,
        page: &dyn PdfPage,
        page_text: &str,
        raster: Option<&RgbaImage>,
        search_available: bool,
    ) -> Vec<RegionCandidate> {
        let mut out = Vec::new();

        if self.options.detect_images {
            if let Some(raster) = raster {
                for r in detect_image_regions(raster, &self.options) {
                    let Some(png) = crop(raster, &r).and_then(|img| encode_png(&img)) else {
                        continue;
                    };
                    out.push(RegionCandidate::Image {
                        bbox: r.rescale(self.options.working_dpi, LAYOUT_DPI),
                        png,
                    });
                }
            }
        }
        if search_available && self.options.detect_tables {
            out.extend(detect_table_lines(page, page_text));
        }
        if search_available && self.options.detect_charts {
            out.extend(detect_chart_hints(page, page_text, &self.options));
        }
        out
    }

    /// Fold candidates into elements for `page_number`.
    pub fn into_elements(
        &self,
        candidates: Vec<RegionCandidate>,
        page_number: u32,
        raster: Option<&RgbaImage>,
        ids: &mut IdGenerator,
    ) -> Vec<DocumentElement> {
        let snapshot = |bbox: &Rect| -> Option<Vec<u8>> {
            if !self.options.snapshot_regions {
                return None;
            }
            let raster = raster?;
            let r = bbox.rescale(LAYOUT_DPI, self.options.working_dpi);
            crop(raster, &r).and_then(|img| encode_png(&img))
        };

        let mut elements = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let el = match candidate {
                RegionCandidate::Image { bbox, png } => {
                    let pixel_size = Some((bbox.width.max(0) as u32, bbox.height.max(0) as u32));
                    let info = ImageInfo {
                        id: ids.next_id(ElementType::Image),
                        format: "png".into(),
                        pixel_size,
                        bbox,
                        raw_bytes: png,
                        is_embedded: true,
                        ..Default::default()
                    };
                    info.into_element()
                        .with_attribute("extraction_method", "raster_flood_fill")
                }
                RegionCandidate::TableLine { bbox, cells } => {
                    let mut info = TableInfo::from_rows(ids.next_id(ElementType::Table), vec![cells]);
                    info.bbox = bbox;
                    let mut el = info
                        .into_element()
                        .with_attribute("extraction_method", "text_line_heuristic");
                    if let Some(png) = snapshot(&bbox) {
                        el = el.with_binary(png, "image/png");
                    }
                    el
                }
                RegionCandidate::ChartHint { bbox, keyword, chart_type } => {
                    let info = ChartInfo {
                        id: ids.next_id(ElementType::Chart),
                        chart_type,
                        bbox,
                        ..Default::default()
                    };
                    let mut el = info
                        .into_element()
                        .with_attribute("extraction_method", "keyword_hint")
                        .with_attribute("keyword", keyword);
                    if let Some(png) = snapshot(&bbox) {
                        el = el.with_binary(png, "image/png");
                    }
                    el
                }
            };
            elements.push(
                el.with_page(page_number)
                    .with_attribute("source", "pdf")
                    .with_attribute("approximate", "true"),
            );
        }
        elements
    }
}
