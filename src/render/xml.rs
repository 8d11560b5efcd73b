//! The `LosslessDocument` XML wire format.
//!
//! ```xml
//! <LosslessDocument version="1.0" created="..." elementCount="2" sourceFormat="DOCX">
//!   <Text id="text_1_1" type="0" x="0" y="0" width="0" height="0" page="1" zOrder="0" isInline="true">
//!     <Content>Hello</Content>
//!     <Format bold="false" ... />
//!     <Attributes><Attribute key="source" value="docx"/></Attributes>
//!     <RelatedElements/>
//!   </Text>
//! </LosslessDocument>
//! ```

use std::collections::BTreeMap;
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::XmlOptions;
use crate::error::{Error, Result};
use crate::model::{DocumentElement, ElementType, Rect};
use crate::relate::canonical_cmp;

pub const ROOT_TAG: &str = "LosslessDocument";
pub const FORMAT_VERSION: &str = "1.0";

/// Writes element lists as `LosslessDocument` XML.
#[derive(Debug, Clone, Default)]
pub struct LosslessXmlSerializer {
    options: XmlOptions,
}

fn write_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Write(format!("XML: {}", e))
}

/// Characters XML 1.0 cannot carry, even as character references.
fn is_forbidden(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}

/// Escape for text content or, with `in_attribute`, a quoted attribute value.
///
/// Forbidden characters become U+FFFD. Carriage returns are always written as
/// references; inside attributes newlines and tabs are too, so attribute
/// value normalization cannot fold them into spaces.
pub(crate) fn escape_xml(value: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '\r' => out.push_str("&#13;"),
            '\n' if in_attribute => out.push_str("&#10;"),
            '\t' if in_attribute => out.push_str("&#9;"),
            c if is_forbidden(c) => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

fn push_attr(start: &mut BytesStart<'_>, key: &str, value: &str) {
    let escaped = escape_xml(value, true);
    start.push_attribute(Attribute::from((key.as_bytes(), escaped.as_bytes())));
}

impl LosslessXmlSerializer {
    pub fn new(options: XmlOptions) -> Self {
        Self { options }
    }

    /// Serialize in canonical order. The input order does not matter.
    pub fn serialize(
        &self,
        elements: &[DocumentElement],
        created: DateTime<Utc>,
        source_format: &str,
    ) -> Result<Vec<u8>> {
        let mut ordered: Vec<&DocumentElement> = elements.iter().collect();
        ordered.sort_by(|a, b| canonical_cmp(a, b));

        let mut writer = if self.options.indent > 0 {
            Writer::new_with_indent(Cursor::new(Vec::new()), b' ', self.options.indent)
        } else {
            Writer::new(Cursor::new(Vec::new()))
        };

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_err)?;

        let created = created.to_rfc3339_opts(SecondsFormat::Secs, true);
        let count = ordered.len().to_string();
        let mut root = BytesStart::new(ROOT_TAG);
        push_attr(&mut root, "version", FORMAT_VERSION);
        push_attr(&mut root, "created", &created);
        push_attr(&mut root, "elementCount", &count);
        if !source_format.is_empty() {
            push_attr(&mut root, "sourceFormat", source_format);
        }
        writer.write_event(Event::Start(root)).map_err(write_err)?;

        for el in ordered {
            self.write_element(&mut writer, el)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(ROOT_TAG)))
            .map_err(write_err)?;

        let mut bytes = writer.into_inner().into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn write_element(&self, w: &mut Writer<Cursor<Vec<u8>>>, el: &DocumentElement) -> Result<()> {
        let tag = el.element_type.tag();
        let bbox = el.bbox();
        let numbers = [
            ("type", el.element_type.code().to_string()),
            ("x", bbox.x.to_string()),
            ("y", bbox.y.to_string()),
            ("width", bbox.width.to_string()),
            ("height", bbox.height.to_string()),
            ("page", el.page().to_string()),
            ("zOrder", el.position.z_order.to_string()),
            ("isInline", el.position.is_inline.to_string()),
        ];
        let mut start = BytesStart::new(tag);
        push_attr(&mut start, "id", &el.id);
        for (key, value) in &numbers {
            push_attr(&mut start, key, value);
        }
        w.write_event(Event::Start(start)).map_err(write_err)?;

        if !el.content.is_empty() {
            write_text_element(w, "Content", &el.content)?;
        }

        let f = &el.format;
        let format_attrs = [
            ("bold", f.bold.to_string()),
            ("italic", f.italic.to_string()),
            ("underline", f.underline.to_string()),
            ("strikethrough", f.strikethrough.to_string()),
            ("fontSize", f.font_size.to_string()),
            ("fontFamily", f.font_family.clone()),
            ("alignment", f.alignment.as_str().to_string()),
            ("lineSpacing", f.line_spacing.to_string()),
            ("paragraphSpacing", f.paragraph_spacing.to_string()),
            ("leftIndent", f.left_indent.to_string()),
            ("rightIndent", f.right_indent.to_string()),
            ("firstLineIndent", f.first_line_indent.to_string()),
        ];
        let mut format = BytesStart::new("Format");
        for (key, value) in &format_attrs {
            push_attr(&mut format, key, value);
        }
        w.write_event(Event::Empty(format)).map_err(write_err)?;

        if el.attributes.is_empty() {
            w.write_event(Event::Empty(BytesStart::new("Attributes")))
                .map_err(write_err)?;
        } else {
            w.write_event(Event::Start(BytesStart::new("Attributes")))
                .map_err(write_err)?;
            for (key, value) in &el.attributes {
                let mut attr = BytesStart::new("Attribute");
                push_attr(&mut attr, "key", key);
                push_attr(&mut attr, "value", value);
                w.write_event(Event::Empty(attr)).map_err(write_err)?;
            }
            w.write_event(Event::End(BytesEnd::new("Attributes")))
                .map_err(write_err)?;
        }

        if el.position.related_ids.is_empty() {
            w.write_event(Event::Empty(BytesStart::new("RelatedElements")))
                .map_err(write_err)?;
        } else {
            w.write_event(Event::Start(BytesStart::new("RelatedElements")))
                .map_err(write_err)?;
            for id in &el.position.related_ids {
                write_text_element(w, "RelatedId", id)?;
            }
            w.write_event(Event::End(BytesEnd::new("RelatedElements")))
                .map_err(write_err)?;
        }

        if self.options.embed_binary {
            if let Some(data) = &el.binary_data {
                let mut bin = BytesStart::new("BinaryData");
                push_attr(&mut bin, "mimeType", el.mime_type.as_deref().unwrap_or(""));
                push_attr(&mut bin, "encoding", "base64");
                w.write_event(Event::Start(bin)).map_err(write_err)?;
                let encoded = BASE64.encode(data);
                w.write_event(Event::Text(BytesText::new(&encoded)))
                    .map_err(write_err)?;
                w.write_event(Event::End(BytesEnd::new("BinaryData")))
                    .map_err(write_err)?;
            }
        }

        w.write_event(Event::End(BytesEnd::new(tag)))
            .map_err(write_err)?;
        Ok(())
    }
}

fn write_text_element(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(tag)))
        .map_err(write_err)?;
    w.write_event(Event::Text(BytesText::from_escaped(escape_xml(text, false))))
        .map_err(write_err)?;
    w.write_event(Event::End(BytesEnd::new(tag)))
        .map_err(write_err)?;
    Ok(())
}

/// One element as read back from XML.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElementSummary {
    pub tag: String,
    pub id: String,
    pub type_code: Option<u8>,
    pub bbox: Rect,
    pub page: u32,
    pub content: String,
    pub attributes: BTreeMap<String, String>,
    pub related_ids: Vec<String>,
    pub binary: Option<Vec<u8>>,
}

impl XmlElementSummary {
    pub fn element_type(&self) -> Option<ElementType> {
        ElementType::from_tag(&self.tag)
    }
}

/// A parsed `LosslessDocument`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlDocument {
    pub version: String,
    pub created: String,
    pub source_format: String,
    /// The root's `elementCount` attribute
    pub element_count: usize,
    pub elements: Vec<XmlElementSummary>,
}

fn start_attrs(e: &BytesStart<'_>) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        out.insert(key, attr.unescape_value()?.into_owned());
    }
    Ok(out)
}

fn num<T: std::str::FromStr + Default>(attrs: &BTreeMap<String, String>, key: &str) -> T {
    attrs
        .get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}

impl XmlDocument {
    /// Parse serializer output. Malformed XML or a foreign root is a `Parse` error.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(data);
        reader.config_mut().trim_text(true);

        let mut doc = XmlDocument::default();
        let mut path: Vec<String> = Vec::new();
        let mut current: Option<XmlElementSummary> = None;
        let mut saw_root = false;

        loop {
            let event = reader.read_event()?;
            let (start, is_empty) = match &event {
                Event::Start(e) => (Some(e), false),
                Event::Empty(e) => (Some(e), true),
                _ => (None, false),
            };

            if let Some(e) = start {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attrs = start_attrs(e)?;
                match path.len() {
                    0 => {
                        if name != ROOT_TAG {
                            return Err(Error::Parse(format!("unexpected root <{}>", name)));
                        }
                        saw_root = true;
                        doc.version = attrs.get("version").cloned().unwrap_or_default();
                        doc.created = attrs.get("created").cloned().unwrap_or_default();
                        doc.source_format =
                            attrs.get("sourceFormat").cloned().unwrap_or_default();
                        doc.element_count = num(&attrs, "elementCount");
                    }
                    1 => {
                        let summary = XmlElementSummary {
                            id: attrs.get("id").cloned().unwrap_or_default(),
                            type_code: attrs.get("type").and_then(|t| t.parse().ok()),
                            bbox: Rect::new(
                                num(&attrs, "x"),
                                num(&attrs, "y"),
                                num(&attrs, "width"),
                                num(&attrs, "height"),
                            ),
                            page: num(&attrs, "page"),
                            tag: name.clone(),
                            ..Default::default()
                        };
                        if is_empty {
                            doc.elements.push(summary);
                        } else {
                            current = Some(summary);
                        }
                    }
                    _ => {
                        if name == "Attribute" {
                            if let (Some(el), Some(key)) = (current.as_mut(), attrs.get("key")) {
                                let value = attrs.get("value").cloned().unwrap_or_default();
                                el.attributes.insert(key.clone(), value);
                            }
                        }
                    }
                }
                if !is_empty {
                    path.push(name);
                }
                continue;
            }

            match event {
                Event::Text(t) => {
                    let text = t.unescape()?;
                    if let (Some(el), Some(leaf)) = (current.as_mut(), path.last()) {
                        match leaf.as_str() {
                            "Content" => el.content.push_str(&text),
                            "RelatedId" => el.related_ids.push(text.into_owned()),
                            "BinaryData" => {
                                let bytes = BASE64
                                    .decode(text.trim())
                                    .map_err(|e| Error::Parse(format!("base64: {}", e)))?;
                                el.binary = Some(bytes);
                            }
                            _ => {}
                        }
                    }
                }
                Event::End(_) => {
                    path.pop();
                    if path.len() == 1 {
                        if let Some(el) = current.take() {
                            doc.elements.push(el);
                        }
                    }
                }
                Event::Eof => {
                    if let Some(open) = path.last() {
                        return Err(Error::Parse(format!("unclosed <{}>", open)));
                    }
                    break;
                }
                _ => {}
            }
        }

        if !saw_root {
            return Err(Error::Parse(format!("missing <{}> root", ROOT_TAG)));
        }
        Ok(doc)
    }

    /// Number of element children whose tag is a known element type.
    pub fn counted_elements(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| e.element_type().is_some())
            .count()
    }

    /// Root count, child count and id uniqueness agree.
    pub fn verify(&self) -> std::result::Result<(), String> {
        let counted = self.counted_elements();
        if counted != self.element_count {
            return Err(format!(
                "elementCount is {} but {} elements were written",
                self.element_count, counted
            ));
        }
        let mut ids: Vec<&str> = self.elements.iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(w) = ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(format!("duplicate element id {}", w[0]));
        }
        Ok(())
    }
}
