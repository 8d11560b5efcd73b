//! Relationship part resolution (`_rels/*.rels`).

use std::collections::BTreeMap;

use log::warn;

use super::cursor::{XmlCursor, XmlNode};

/// Relationship types the parser follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    Image,
    Chart,
    Hyperlink,
    OfficeDocument,
    Other,
}

impl RelationshipKind {
    /// Classify by the last path segment of the `Type` URI, which is the
    /// same for transitional and strict packages.
    pub fn from_type_uri(uri: &str) -> Self {
        match uri.rsplit('/').next().unwrap_or_default() {
            "image" => RelationshipKind::Image,
            "chart" => RelationshipKind::Chart,
            "hyperlink" => RelationshipKind::Hyperlink,
            "officeDocument" => RelationshipKind::OfficeDocument,
            _ => RelationshipKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub kind: RelationshipKind,
    /// Package-absolute entry path, or the raw URI for external targets
    pub target: String,
    pub external: bool,
}

/// All relationships of one source part.
#[derive(Debug, Clone, Default)]
pub struct RelationshipMap {
    entries: BTreeMap<String, Relationship>,
}

impl RelationshipMap {
    /// Parse a relationship part. `base_dir` is the directory of the source
    /// part (`word` for `word/document.xml`). Malformed XML yields an empty
    /// map.
    pub fn parse(data: &[u8], base_dir: &str) -> Self {
        match parse_entries(data, base_dir) {
            Ok(entries) => Self { entries },
            Err(e) => {
                warn!("Ignoring malformed relationship part: {}", e);
                Self::default()
            }
        }
    }

    /// Look up `id`, but only if it has the expected kind.
    pub fn get(&self, id: &str, kind: RelationshipKind) -> Option<&Relationship> {
        self.entries.get(id).filter(|r| r.kind == kind)
    }

    /// Id to target map restricted to one kind.
    pub fn of_kind(&self, kind: RelationshipKind) -> BTreeMap<String, String> {
        self.entries
            .values()
            .filter(|r| r.kind == kind)
            .map(|r| (r.id.clone(), r.target.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Map relationship ids to targets of the requested kind.
pub fn resolve_relationships(
    data: &[u8],
    base_dir: &str,
    kind: RelationshipKind,
) -> BTreeMap<String, String> {
    RelationshipMap::parse(data, base_dir).of_kind(kind)
}

fn parse_entries(
    data: &[u8],
    base_dir: &str,
) -> crate::error::Result<BTreeMap<String, Relationship>> {
    let mut cursor = XmlCursor::new(data);
    let mut entries = BTreeMap::new();

    loop {
        match cursor.next_node()? {
            XmlNode::Start(e) if e.name == "Relationship" => {
                let (Some(id), Some(target)) = (e.attr_unqualified("Id"), e.attr_unqualified("Target"))
                else {
                    continue;
                };
                let kind = RelationshipKind::from_type_uri(e.attr_unqualified("Type").unwrap_or_default());
                let external = e
                    .attr_unqualified("TargetMode")
                    .is_some_and(|m| m.eq_ignore_ascii_case("External"));
                let target = if external {
                    target.to_string()
                } else {
                    resolve_target(base_dir, target)
                };
                entries.insert(
                    id.to_string(),
                    Relationship {
                        id: id.to_string(),
                        kind,
                        target,
                        external,
                    },
                );
            }
            XmlNode::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Resolve a relationship target against the source part's directory.
///
/// Absolute targets (`/word/media/a.png`) are taken from the package root;
/// `.` and `..` segments are collapsed.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else if base_dir.is_empty() {
        target.to_string()
    } else {
        format!("{}/{}", base_dir.trim_end_matches('/'), target)
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Location of the relationship part belonging to `part`.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Directory of a part path.
pub fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
  <Relationship Id="rId3" Type="http://purl.oclc.org/ooxml/officeDocument/relationships/image" Target="/word/media/image2.jpeg"/>
  <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart" Target="charts/chart1.xml"/>
  <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/a?b=1&amp;c=2" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn test_filter_by_kind() {
        let images = resolve_relationships(RELS.as_bytes(), "word", RelationshipKind::Image);
        assert_eq!(images.len(), 2);
        assert_eq!(images["rId2"], "word/media/image1.png");
        assert_eq!(images["rId3"], "word/media/image2.jpeg");

        let charts = resolve_relationships(RELS.as_bytes(), "word", RelationshipKind::Chart);
        assert_eq!(charts["rId4"], "word/charts/chart1.xml");
    }

    #[test]
    fn test_external_hyperlink() {
        let map = RelationshipMap::parse(RELS.as_bytes(), "word");
        let link = map.get("rId5", RelationshipKind::Hyperlink).unwrap();
        assert!(link.external);
        assert_eq!(link.target, "https://example.com/a?b=1&c=2");
        // Wrong kind is treated as unresolved
        assert!(map.get("rId5", RelationshipKind::Image).is_none());
        assert!(map.get("rId99", RelationshipKind::Image).is_none());
    }

    #[test]
    fn test_malformed_yields_empty() {
        let map = RelationshipMap::parse(b"<Relationships><Relationship Id=", "word");
        assert!(map.is_empty());
        assert!(resolve_relationships(b"not xml at all <<<", "word", RelationshipKind::Image).is_empty());
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("word", "media/a.png"), "word/media/a.png");
        assert_eq!(resolve_target("word/charts", "../media/a.png"), "word/media/a.png");
        assert_eq!(resolve_target("word", "/customXml/item1.xml"), "customXml/item1.xml");
        assert_eq!(resolve_target("", "./word/document.xml"), "word/document.xml");
    }

    #[test]
    fn test_rels_path() {
        assert_eq!(rels_path_for("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_path_for("word/charts/chart1.xml"), "word/charts/_rels/chart1.xml.rels");
        assert_eq!(part_dir("word/document.xml"), "word");
        assert_eq!(part_dir("root.xml"), "");
    }
}
