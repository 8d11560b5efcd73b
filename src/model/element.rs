//! The canonical document element.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::format::FormatInfo;
use super::geometry::Rect;

/// Kind of content an element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Text,
    Image,
    Table,
    Chart,
    Shape,
    Hyperlink,
    Footnote,
    Header,
    Footer,
    PageBreak,
    LineBreak,
    Paragraph,
    Signature,
}

impl ElementType {
    pub const ALL: [ElementType; 13] = [
        ElementType::Text,
        ElementType::Image,
        ElementType::Table,
        ElementType::Chart,
        ElementType::Shape,
        ElementType::Hyperlink,
        ElementType::Footnote,
        ElementType::Header,
        ElementType::Footer,
        ElementType::PageBreak,
        ElementType::LineBreak,
        ElementType::Paragraph,
        ElementType::Signature,
    ];

    /// Numeric code written to the `type` attribute.
    pub fn code(&self) -> u8 {
        match self {
            ElementType::Text => 0,
            ElementType::Image => 1,
            ElementType::Table => 2,
            ElementType::Chart => 3,
            ElementType::Shape => 4,
            ElementType::Hyperlink => 5,
            ElementType::Footnote => 6,
            ElementType::Header => 7,
            ElementType::Footer => 8,
            ElementType::PageBreak => 9,
            ElementType::LineBreak => 10,
            ElementType::Paragraph => 11,
            ElementType::Signature => 12,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// XML tag name.
    pub fn tag(&self) -> &'static str {
        match self {
            ElementType::Text => "Text",
            ElementType::Image => "Image",
            ElementType::Table => "Table",
            ElementType::Chart => "Chart",
            ElementType::Shape => "Shape",
            ElementType::Hyperlink => "Hyperlink",
            ElementType::Footnote => "Footnote",
            ElementType::Header => "Header",
            ElementType::Footer => "Footer",
            ElementType::PageBreak => "PageBreak",
            ElementType::LineBreak => "LineBreak",
            ElementType::Paragraph => "Paragraph",
            ElementType::Signature => "Signature",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Prefix used in generated ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ElementType::Text => "text",
            ElementType::Image => "img",
            ElementType::Table => "table",
            ElementType::Chart => "chart",
            ElementType::Shape => "shape",
            ElementType::Hyperlink => "link",
            ElementType::Footnote => "footnote",
            ElementType::Header => "header",
            ElementType::Footer => "footer",
            ElementType::PageBreak => "pagebreak",
            ElementType::LineBreak => "linebreak",
            ElementType::Paragraph => "para",
            ElementType::Signature => "signature",
        }
    }

    /// Whether the content is literal document text.
    pub fn is_textual(&self) -> bool {
        matches!(self, ElementType::Text | ElementType::Paragraph)
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Where an element sits and what it overlaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub bbox: Rect,
    /// 1-based page number
    pub page: u32,
    pub z_order: i32,
    pub is_inline: bool,
    /// Ids of intersecting elements, filled by the relationship pass.
    pub related_ids: Vec<String>,
}

impl Default for PositionInfo {
    fn default() -> Self {
        Self {
            bbox: Rect::placeholder(),
            page: 1,
            z_order: 0,
            is_inline: false,
            related_ids: Vec::new(),
        }
    }
}

/// One unit of extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentElement {
    pub id: String,
    pub element_type: ElementType,
    pub content: String,
    pub format: FormatInfo,
    pub position: PositionInfo,
    /// Provenance and debug metadata
    pub attributes: BTreeMap<String, String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub binary_data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl DocumentElement {
    pub fn new(id: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            id: id.into(),
            element_type,
            content: String::new(),
            format: FormatInfo::default(),
            position: PositionInfo::default(),
            attributes: BTreeMap::new(),
            binary_data: None,
            mime_type: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_format(mut self, format: FormatInfo) -> Self {
        self.format = format;
        self
    }

    pub fn with_bbox(mut self, bbox: Rect) -> Self {
        self.position.bbox = bbox;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.position.page = page;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_binary(mut self, data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        self.binary_data = Some(data);
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn bbox(&self) -> &Rect {
        &self.position.bbox
    }

    pub fn page(&self) -> u32 {
        self.position.page
    }

    /// Discovery sequence number embedded in the id (`{tag}_{seq}_{n}`).
    pub fn sequence(&self) -> Option<u64> {
        parse_sequence(&self.id)
    }
}

/// Extract the discovery sequence from an id of the form `{tag}_{seq}_{n}`.
pub fn parse_sequence(id: &str) -> Option<u64> {
    let mut parts = id.rsplitn(3, '_');
    let _counter = parts.next()?;
    let seq = parts.next()?;
    parts.next()?;
    seq.parse().ok()
}

/// Hands out ids in discovery order.
///
/// The middle component is a document-wide monotonic sequence; the last is a
/// per-type counter. No clock is involved, so ids repeat across runs.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    seq: u64,
    per_type: BTreeMap<ElementType, u32>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, element_type: ElementType) -> String {
        self.seq += 1;
        let n = self.per_type.entry(element_type).or_insert(0);
        *n += 1;
        format!("{}_{}_{}", element_type.id_prefix(), self.seq, n)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.seq
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|e| STANDARD.decode(e).map_err(serde::de::Error::custom))
            .transpose()
    }
}
