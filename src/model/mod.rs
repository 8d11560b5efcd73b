//! Document model types.
//!
//! Both source formats are lowered into one flat list of
//! [`DocumentElement`]s sharing a single pixel coordinate space.

mod content;
mod element;
mod format;
mod geometry;

pub use content::{
    extension_for_mime, mime_for_format, CellInfo, ChartInfo, ChartType, DataSeries, ImageInfo, TableInfo,
};
pub use element::{parse_sequence, DocumentElement, ElementType, IdGenerator, PositionInfo};
pub use format::{Alignment, FormatInfo, RunFormat};
pub use geometry::Rect;
