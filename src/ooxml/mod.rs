//! WordprocessingML (DOCX) reading.
//!
//! The package is opened through [`crate::package::ArchivePackageReader`];
//! everything here works on raw part bytes.

mod chart;
mod cursor;
mod drawing;
mod parser;
mod rels;
mod table;

pub use chart::parse_chart_part;
pub use drawing::{DrawingInfo, VmlPicture};
pub use parser::OoxmlDocumentParser;
pub use rels::{
    part_dir, rels_path_for, resolve_relationships, resolve_target, Relationship,
    RelationshipKind, RelationshipMap,
};
