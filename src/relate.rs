//! Canonical element ordering and bounding-box relationships.

use std::cmp::Ordering;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::model::DocumentElement;

/// How intersection relationships are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelationshipMode {
    /// Both elements of an intersecting pair list each other.
    #[default]
    Symmetric,
    /// Only the element earlier in canonical order lists the later one.
    Directional,
}

impl RelationshipMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipMode::Symmetric => "symmetric",
            RelationshipMode::Directional => "directional",
        }
    }
}

/// Total order used for relationship building and serialization.
///
/// Page ascending; on a page, elements with a real box come first, ordered
/// by `y`; then the discovery sequence embedded in the id; then the id.
pub fn canonical_cmp(a: &DocumentElement, b: &DocumentElement) -> Ordering {
    a.page()
        .cmp(&b.page())
        .then_with(|| {
            let (ea, eb) = (a.bbox().is_empty(), b.bbox().is_empty());
            match (ea, eb) {
                (false, false) => a.bbox().y.cmp(&b.bbox().y),
                _ => ea.cmp(&eb),
            }
        })
        .then_with(|| match (a.sequence(), b.sequence()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort elements into canonical order.
pub fn sort_canonical(elements: &mut [DocumentElement]) {
    elements.sort_by(canonical_cmp);
}

/// Computes `related_ids` from bounding-box intersections.
///
/// Every pair of distinct elements is compared, across pages too, unless
/// [`with_same_page_only`](Self::with_same_page_only) is set. Previous
/// relationships are discarded, so running the builder twice gives the same
/// result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementRelationshipBuilder {
    mode: RelationshipMode,
    same_page_only: bool,
}

impl ElementRelationshipBuilder {
    pub fn new(mode: RelationshipMode) -> Self {
        Self {
            mode,
            same_page_only: false,
        }
    }

    /// Skip pairs whose elements sit on different pages.
    pub fn with_same_page_only(mut self, same_page_only: bool) -> Self {
        self.same_page_only = same_page_only;
        self
    }

    pub fn mode(&self) -> RelationshipMode {
        self.mode
    }

    pub fn same_page_only(&self) -> bool {
        self.same_page_only
    }

    /// Sort `elements` canonically and fill their relationships. Returns the
    /// number of intersecting pairs.
    pub fn build(&self, elements: &mut [DocumentElement]) -> usize {
        sort_canonical(elements);
        for el in elements.iter_mut() {
            el.position.related_ids.clear();
        }

        let mut pairs = 0;
        for i in 0..elements.len() {
            let (head, tail) = elements.split_at_mut(i + 1);
            let a = &mut head[i];
            if a.bbox().is_empty() {
                continue;
            }
            for b in tail.iter_mut() {
                // Canonical order groups pages, so nothing later shares a's page.
                if self.same_page_only && b.page() != a.page() {
                    break;
                }
                if !a.bbox().intersects(b.bbox()) {
                    continue;
                }
                pairs += 1;
                a.position.related_ids.push(b.id.clone());
                if self.mode == RelationshipMode::Symmetric {
                    b.position.related_ids.push(a.id.clone());
                }
            }
        }

        debug!(
            "{} intersecting pairs among {} elements ({})",
            pairs,
            elements.len(),
            self.mode.as_str()
        );
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementType, Rect};

    fn el(id: &str, page: u32, bbox: Rect) -> DocumentElement {
        DocumentElement::new(id, ElementType::Text)
            .with_page(page)
            .with_bbox(bbox)
    }

    #[test]
    fn test_canonical_order() {
        let mut els = vec![
            el("text_5_3", 1, Rect::placeholder()),
            el("text_4_2", 2, Rect::new(0, 0, 10, 10)),
            el("text_3_1", 1, Rect::new(0, 50, 10, 10)),
            el("img_2_1", 1, Rect::new(0, 10, 10, 10)),
            el("text_1_1", 1, Rect::placeholder()),
        ];
        sort_canonical(&mut els);
        let ids: Vec<&str> = els.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["img_2_1", "text_3_1", "text_1_1", "text_5_3", "text_4_2"]);
    }

    #[test]
    fn test_sequence_beats_lexicographic() {
        let mut els = vec![
            el("text_10_1", 1, Rect::placeholder()),
            el("text_9_1", 1, Rect::placeholder()),
        ];
        sort_canonical(&mut els);
        assert_eq!(els[0].id, "text_9_1");
    }

    fn overlapping() -> Vec<DocumentElement> {
        vec![
            el("a_1_1", 1, Rect::new(0, 0, 100, 100)),
            el("b_2_1", 1, Rect::new(50, 50, 100, 100)),
            el("c_3_1", 1, Rect::new(100, 60, 10, 10)),
            el("d_4_1", 1, Rect::placeholder()),
            el("e_5_1", 2, Rect::new(0, 0, 100, 100)),
        ]
    }

    fn related(els: &[DocumentElement], id: &str) -> Vec<String> {
        els.iter()
            .find(|e| e.id == id)
            .map(|e| e.position.related_ids.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_symmetric() {
        let mut els = overlapping();
        let pairs = ElementRelationshipBuilder::new(RelationshipMode::Symmetric).build(&mut els);
        assert_eq!(pairs, 4);
        assert_eq!(related(&els, "a_1_1"), vec!["b_2_1", "e_5_1"]);
        assert_eq!(related(&els, "b_2_1"), vec!["a_1_1", "c_3_1", "e_5_1"]);
        assert_eq!(related(&els, "c_3_1"), vec!["b_2_1"]);
        assert!(related(&els, "d_4_1").is_empty());
        assert_eq!(related(&els, "e_5_1"), vec!["a_1_1", "b_2_1"]);
    }

    #[test]
    fn test_same_page_only() {
        let mut els = overlapping();
        let pairs = ElementRelationshipBuilder::new(RelationshipMode::Symmetric)
            .with_same_page_only(true)
            .build(&mut els);
        assert_eq!(pairs, 2);
        assert_eq!(related(&els, "a_1_1"), vec!["b_2_1"]);
        assert_eq!(related(&els, "b_2_1"), vec!["a_1_1", "c_3_1"]);
        assert!(related(&els, "e_5_1").is_empty());
    }

    #[test]
    fn test_identical_boxes_on_different_pages() {
        let mut els = vec![
            el("text_1_1", 1, Rect::new(10, 20, 50, 12)),
            el("text_2_2", 2, Rect::new(10, 20, 50, 12)),
        ];
        let builder = ElementRelationshipBuilder::default();
        assert_eq!(builder.build(&mut els), 1);
        assert_eq!(related(&els, "text_1_1"), vec!["text_2_2"]);
        assert_eq!(related(&els, "text_2_2"), vec!["text_1_1"]);

        let pairs = builder.with_same_page_only(true).build(&mut els);
        assert_eq!(pairs, 0);
        assert!(els.iter().all(|e| e.position.related_ids.is_empty()));
    }

    #[test]
    fn test_directional() {
        let mut els = overlapping();
        ElementRelationshipBuilder::new(RelationshipMode::Directional).build(&mut els);
        assert_eq!(related(&els, "a_1_1"), vec!["b_2_1", "e_5_1"]);
        assert_eq!(related(&els, "b_2_1"), vec!["c_3_1", "e_5_1"]);
        assert!(related(&els, "c_3_1").is_empty());
        assert!(related(&els, "e_5_1").is_empty());
    }

    #[test]
    fn test_rebuild_is_stable() {
        let mut els = overlapping();
        let builder = ElementRelationshipBuilder::default();
        builder.build(&mut els);
        let first = els.clone();
        builder.build(&mut els);
        assert_eq!(first, els);
    }
}
