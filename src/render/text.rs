//! Plain text projection of an element list.

use unicode_normalization::UnicodeNormalization;

use crate::model::DocumentElement;
use crate::relate::canonical_cmp;

/// Join the contents of Text and Paragraph elements in canonical order.
///
/// One line per element, NFC-normalized. Empty contents are skipped.
pub fn to_plain_text(elements: &[DocumentElement]) -> String {
    let mut textual: Vec<&DocumentElement> = elements
        .iter()
        .filter(|e| e.element_type.is_textual() && !e.content.trim().is_empty())
        .collect();
    textual.sort_by(|a, b| canonical_cmp(a, b));

    textual
        .iter()
        .map(|e| e.content.nfc().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementType, Rect};

    #[test]
    fn test_to_plain_text() {
        let elements = vec![
            DocumentElement::new("text_3_2", ElementType::Text).with_content("Second"),
            DocumentElement::new("img_2_1", ElementType::Image).with_content("Image: a.png"),
            DocumentElement::new("text_1_1", ElementType::Text)
                .with_content("First")
                .with_bbox(Rect::new(0, 10, 5, 5)),
            DocumentElement::new("text_4_3", ElementType::Text).with_content("  "),
        ];
        assert_eq!(to_plain_text(&elements), "First\nSecond");
    }

    #[test]
    fn test_nfc() {
        let decomposed = "Cafe\u{301}";
        let elements = vec![DocumentElement::new("text_1_1", ElementType::Paragraph)
            .with_content(decomposed)];
        assert_eq!(to_plain_text(&elements), "Caf\u{e9}");
    }

    #[test]
    fn test_empty() {
        assert_eq!(to_plain_text(&[]), "");
    }
}
