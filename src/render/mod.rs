//! Output surfaces: lossless XML, JSON and plain text.

mod json;
mod options;
mod text;
mod xml;

pub use json::to_json;
pub use options::{CreatedTimestamp, JsonFormat, PageSelection, XmlOptions};
pub use text::to_plain_text;
pub use xml::{
    LosslessXmlSerializer, XmlDocument, XmlElementSummary, FORMAT_VERSION, ROOT_TAG,
};
