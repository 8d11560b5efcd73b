//! PDF extraction: engine abstraction, text boxes and region heuristics.

mod engine;
mod lopdf_engine;
mod regions;
mod text;

pub use engine::{EngineCapabilities, PdfDocument, PdfEngine, PdfPage, TextBox};
pub use lopdf_engine::{LopdfEngine, LopdfPdf};
pub use regions::{
    detect_chart_hints, detect_image_regions, detect_table_lines, is_table_like, split_cells,
    RegionCandidate, RegionDetector, RegionOptions, DEFAULT_CHART_KEYWORDS,
};
pub use text::{extract_text_elements, group_lines, PageLine};
