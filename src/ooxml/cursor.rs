//! Namespace-resolving token stream over an XML part.
//!
//! Wraps `quick_xml::NsReader` and hands out owned nodes so the parsers can
//! keep state across events without fighting buffer lifetimes. Empty
//! elements are expanded into a start/end pair.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::error::{Error, Result};

/// Namespaces the parsers care about. Transitional and strict URIs map to
/// the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ns {
    /// wordprocessingml main
    W,
    /// officeDocument relationships
    R,
    /// wordprocessingDrawing
    Wp,
    /// drawingml main
    A,
    /// drawingml picture
    Pic,
    /// drawingml chart
    C,
    /// VML
    V,
    /// legacy Office extensions to VML
    O,
    /// markup compatibility
    Mc,
    /// Unqualified name
    None,
    Other,
}

impl Ns {
    fn from_uri(uri: &[u8]) -> Ns {
        match uri {
            b"http://schemas.openxmlformats.org/wordprocessingml/2006/main"
            | b"http://purl.oclc.org/ooxml/wordprocessingml/main" => Ns::W,
            b"http://schemas.openxmlformats.org/officeDocument/2006/relationships"
            | b"http://purl.oclc.org/ooxml/officeDocument/relationships" => Ns::R,
            b"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"
            | b"http://purl.oclc.org/ooxml/drawingml/wordprocessingDrawing" => Ns::Wp,
            b"http://schemas.openxmlformats.org/drawingml/2006/main"
            | b"http://purl.oclc.org/ooxml/drawingml/main" => Ns::A,
            b"http://schemas.openxmlformats.org/drawingml/2006/picture"
            | b"http://purl.oclc.org/ooxml/drawingml/picture" => Ns::Pic,
            b"http://schemas.openxmlformats.org/drawingml/2006/chart"
            | b"http://purl.oclc.org/ooxml/drawingml/chart" => Ns::C,
            b"urn:schemas-microsoft-com:vml" => Ns::V,
            b"urn:schemas-microsoft-com:office:office" => Ns::O,
            b"http://schemas.openxmlformats.org/markup-compatibility/2006" => Ns::Mc,
            _ => Ns::Other,
        }
    }

    fn resolve(result: ResolveResult<'_>) -> Ns {
        match result {
            ResolveResult::Bound(Namespace(uri)) => Ns::from_uri(uri),
            ResolveResult::Unbound => Ns::None,
            ResolveResult::Unknown(_) => Ns::Other,
        }
    }
}

#[derive(Debug, Clone)]
struct XmlAttr {
    ns: Ns,
    name: String,
    value: String,
}

/// An opened element with resolved name and attributes.
#[derive(Debug, Clone)]
pub struct XmlElement {
    pub ns: Ns,
    pub name: String,
    attrs: Vec<XmlAttr>,
}

impl XmlElement {
    pub fn is(&self, ns: Ns, name: &str) -> bool {
        self.ns == ns && self.name == name
    }

    pub fn attr(&self, ns: Ns, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.ns == ns && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Attribute without a namespace prefix.
    pub fn attr_unqualified(&self, name: &str) -> Option<&str> {
        self.attr(Ns::None, name)
    }

    /// `w:val`
    pub fn val(&self) -> Option<&str> {
        self.attr(Ns::W, "val")
    }

    /// Toggle properties (`w:b`, `w:i`, ...) are on unless `w:val` says otherwise.
    pub fn toggle(&self) -> bool {
        !matches!(self.val(), Some("0") | Some("false") | Some("off") | Some("none"))
    }

    pub fn int_attr(&self, ns: Ns, name: &str) -> Option<i64> {
        self.attr(ns, name).and_then(|v| v.trim().parse().ok())
    }
}

/// One token of the stream.
#[derive(Debug, Clone)]
pub enum XmlNode {
    Start(XmlElement),
    End { ns: Ns, name: String },
    Text(String),
    Eof,
}

pub struct XmlCursor<'a> {
    reader: NsReader<&'a [u8]>,
    depth: usize,
}

impl<'a> XmlCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut reader = NsReader::from_reader(data);
        let config = reader.config_mut();
        config.trim_text(false);
        config.expand_empty_elements = true;
        Self { reader, depth: 0 }
    }

    /// Nesting depth of the element most recently opened.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn next_node(&mut self) -> Result<XmlNode> {
        loop {
            let (resolved, event) = self.reader.read_resolved_event()?;
            match event {
                Event::Start(e) => {
                    let ns = Ns::resolve(resolved);
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    let mut attrs = Vec::new();
                    for attr in e.attributes() {
                        let attr = attr?;
                        // xmlns declarations carry no content
                        if attr.key.as_namespace_binding().is_some() {
                            continue;
                        }
                        let (attr_ns, local) = self.reader.resolve_attribute(attr.key);
                        attrs.push(XmlAttr {
                            ns: Ns::resolve(attr_ns),
                            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
                            value: attr.unescape_value()?.into_owned(),
                        });
                    }
                    self.depth += 1;
                    return Ok(XmlNode::Start(XmlElement { ns, name, attrs }));
                }
                Event::End(e) => {
                    let ns = Ns::resolve(resolved);
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    self.depth = self.depth.saturating_sub(1);
                    return Ok(XmlNode::End { ns, name });
                }
                Event::Text(t) => {
                    let text = t.unescape()?.into_owned();
                    return Ok(XmlNode::Text(text));
                }
                Event::CData(c) => {
                    return Ok(XmlNode::Text(String::from_utf8_lossy(&c).into_owned()));
                }
                Event::Eof => {
                    if self.depth > 0 {
                        return Err(Error::Parse(format!(
                            "XML: document ended with {} unclosed element(s)",
                            self.depth
                        )));
                    }
                    return Ok(XmlNode::Eof);
                }
                // Declarations, comments, processing instructions, doctype
                _ => continue,
            }
        }
    }

    /// Consume everything up to and including the end of the element that
    /// was just opened.
    pub fn skip_element(&mut self) -> Result<()> {
        let target = self.depth;
        loop {
            match self.next_node()? {
                XmlNode::End { .. } if self.depth < target => return Ok(()),
                XmlNode::Eof => {
                    return Err(Error::Parse("XML: unexpected end of document".into()))
                }
                _ => {}
            }
        }
    }

    /// Concatenated text of the element that was just opened, consuming it.
    pub fn element_text(&mut self) -> Result<String> {
        let target = self.depth;
        let mut text = String::new();
        loop {
            match self.next_node()? {
                XmlNode::Text(t) => text.push_str(&t),
                XmlNode::End { .. } if self.depth < target => return Ok(text),
                XmlNode::Eof => {
                    return Err(Error::Parse("XML: unexpected end of document".into()))
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
            xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <w:body><w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t xml:space="preserve">a &amp; b</w:t></w:r></w:p></w:body>
</w:document>"#;

    #[test]
    fn test_resolves_namespaces_and_expands_empty() {
        let mut cursor = XmlCursor::new(DOC.as_bytes());
        let mut starts = Vec::new();
        let mut ends = 0;
        let mut text = String::new();
        loop {
            match cursor.next_node().unwrap() {
                XmlNode::Start(e) => {
                    if e.is(Ns::W, "jc") {
                        assert_eq!(e.val(), Some("center"));
                    }
                    starts.push((e.ns, e.name));
                }
                XmlNode::End { .. } => ends += 1,
                XmlNode::Text(t) => text.push_str(&t),
                XmlNode::Eof => break,
            }
        }
        assert_eq!(starts.len(), ends);
        assert!(starts.contains(&(Ns::W, "t".to_string())));
        assert!(text.contains("a & b"));
    }

    #[test]
    fn test_strict_namespace() {
        let xml = br#"<w:p xmlns:w="http://purl.oclc.org/ooxml/wordprocessingml/main"><w:b w:val="0"/></w:p>"#;
        let mut cursor = XmlCursor::new(xml);
        let mut saw_b = false;
        loop {
            match cursor.next_node().unwrap() {
                XmlNode::Start(e) if e.is(Ns::W, "b") => {
                    assert!(!e.toggle());
                    saw_b = true;
                }
                XmlNode::Eof => break,
                _ => {}
            }
        }
        assert!(saw_b);
    }

    #[test]
    fn test_skip_and_element_text() {
        let xml = b"<root><skip><x>1</x></skip><t>he<i/>llo</t></root>";
        let mut cursor = XmlCursor::new(xml);
        assert!(matches!(cursor.next_node().unwrap(), XmlNode::Start(_)));
        assert!(matches!(cursor.next_node().unwrap(), XmlNode::Start(ref e) if e.name == "skip"));
        cursor.skip_element().unwrap();
        assert!(matches!(cursor.next_node().unwrap(), XmlNode::Start(ref e) if e.name == "t"));
        assert_eq!(cursor.element_text().unwrap(), "hello");
        assert!(matches!(cursor.next_node().unwrap(), XmlNode::End { .. }));
        assert!(matches!(cursor.next_node().unwrap(), XmlNode::Eof));
    }

    #[test]
    fn test_malformed_is_error() {
        let mut cursor = XmlCursor::new(b"<a><b></a>");
        let mut result = Ok(XmlNode::Eof);
        for _ in 0..10 {
            result = cursor.next_node();
            if !matches!(result, Ok(XmlNode::Start(_)) | Ok(XmlNode::Text(_))) {
                break;
            }
        }
        assert!(result.is_err());

        let mut cursor = XmlCursor::new(b"<a><b>");
        cursor.next_node().unwrap();
        cursor.next_node().unwrap();
        assert!(cursor.next_node().is_err());
    }
}
