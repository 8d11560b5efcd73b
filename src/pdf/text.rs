//! PDF text boxes to Text elements, and line assembly for page text.

use log::debug;

use super::engine::TextBox;
use crate::model::{DocumentElement, ElementType, IdGenerator, Rect};

/// Spaces standing in for a column gap in reconstructed line text.
const COLUMN_GAP: &str = "   ";

/// Boxes sharing a baseline, joined left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLine {
    pub text: String,
    pub bbox: Rect,
}

/// Emit one Text element per box. PDF text boxes carry no run styling, so
/// every element keeps the default format.
pub fn extract_text_elements(
    page_number: u32,
    boxes: Vec<TextBox>,
    ids: &mut IdGenerator,
) -> Vec<DocumentElement> {
    let elements: Vec<DocumentElement> = boxes
        .into_iter()
        .map(|b| {
            DocumentElement::new(ids.next_id(ElementType::Text), ElementType::Text)
                .with_content(b.text)
                .with_bbox(b.bbox)
                .with_page(page_number)
                .with_attribute("source", "pdf")
                .with_attribute("extraction_method", "text_box")
        })
        .collect();
    debug!("Page {}: {} text elements", page_number, elements.len());
    elements
}

/// Group boxes into visual lines, top to bottom.
///
/// Two boxes share a line when their vertical centres are closer than half
/// the taller box. Within a line, gaps wider than the line height become
/// [`COLUMN_GAP`]; smaller gaps become a single space unless the script does
/// not separate words.
pub fn group_lines(mut boxes: Vec<TextBox>) -> Vec<PageLine> {
    boxes.retain(|b| !b.text.is_empty());
    boxes.sort_by(|a, b| (a.bbox.y, a.bbox.x).cmp(&(b.bbox.y, b.bbox.x)));

    let mut lines: Vec<Vec<TextBox>> = Vec::new();
    for b in boxes {
        let joins = lines.last().is_some_and(|line| {
            let bounds = line_bounds(line);
            let tolerance = bounds.height.max(b.bbox.height) / 2;
            (center_y(&bounds) - center_y(&b.bbox)).abs() <= tolerance
        });
        if joins {
            if let Some(line) = lines.last_mut() {
                line.push(b);
            }
        } else {
            lines.push(vec![b]);
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by_key(|b| b.bbox.x);
            let bbox = line_bounds(&line);
            PageLine {
                text: join_line(&line, bbox.height),
                bbox,
            }
        })
        .collect()
}

fn line_bounds(line: &[TextBox]) -> Rect {
    line.iter().skip(1).fold(
        line.first().map(|b| b.bbox).unwrap_or_default(),
        |acc, b| {
            // union() ignores empty boxes; a zero-height box still has a place.
            let x = acc.x.min(b.bbox.x);
            let y = acc.y.min(b.bbox.y);
            Rect::new(
                x,
                y,
                acc.right().max(b.bbox.right()) - x,
                acc.bottom().max(b.bbox.bottom()) - y,
            )
        },
    )
}

fn center_y(r: &Rect) -> i32 {
    r.y + r.height / 2
}

fn join_line(line: &[TextBox], height: i32) -> String {
    let mut text = String::new();
    let mut prev_right: Option<i32> = None;
    for b in line {
        if let Some(right) = prev_right {
            let gap = b.bbox.x - right;
            if gap >= height.max(1) {
                text.push_str(COLUMN_GAP);
            } else if gap > height / 6 && needs_space(&text, &b.text) {
                text.push(' ');
            }
        }
        text.push_str(&b.text);
        prev_right = Some(prev_right.map_or(b.bbox.right(), |r| r.max(b.bbox.right())));
    }
    text
}

fn needs_space(before: &str, after: &str) -> bool {
    match (before.chars().last(), after.chars().next()) {
        (Some(a), Some(b)) => {
            !a.is_whitespace()
                && !b.is_whitespace()
                && !(is_spaceless_script_char(a) && is_spaceless_script_char(b))
        }
        _ => false,
    }
}

/// Chinese and Japanese text does not separate words with spaces; Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2EBEF
        | 0x3040..=0x309F
        | 0x30A0..=0x30FF
        | 0x3000..=0x303F
        | 0xFF00..=0xFFEF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tb(text: &str, x: i32, y: i32, w: i32) -> TextBox {
        TextBox::new(text, Rect::new(x, y, w, 12))
    }

    #[test]
    fn test_extract_text_elements() {
        let mut ids = IdGenerator::new();
        let els = extract_text_elements(2, vec![tb("Total: 42", 10, 20, 50)], &mut ids);
        assert_eq!(els.len(), 1);
        assert_eq!(els[0].page(), 2);
        assert_eq!(els[0].content, "Total: 42");
        assert_eq!(*els[0].bbox(), Rect::new(10, 20, 50, 12));
        assert_eq!(els[0].format, crate::model::FormatInfo::default());
        assert_eq!(els[0].attributes["source"], "pdf");
    }

    #[test]
    fn test_group_lines_orders_and_splits() {
        let lines = group_lines(vec![
            tb("second", 10, 40, 40),
            tb("world", 48, 21, 30),
            tb("Hello", 10, 20, 34),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Hello world");
        assert_eq!(lines[0].bbox, Rect::new(10, 20, 68, 13));
        assert_eq!(lines[1].text, "second");
    }

    #[test]
    fn test_column_gap() {
        let lines = group_lines(vec![tb("Name", 10, 50, 30), tb("Qty", 120, 50, 20)]);
        assert_eq!(lines[0].text, "Name   Qty");
    }

    #[test]
    fn test_cjk_no_space() {
        let lines = group_lines(vec![tb("中文", 10, 50, 24), tb("文本", 38, 50, 24)]);
        assert_eq!(lines[0].text, "中文文本");
        assert!(!is_spaceless_script_char('한'));
    }
}
