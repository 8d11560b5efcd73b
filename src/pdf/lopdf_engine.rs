//! [`PdfEngine`] backed by `lopdf`.
//!
//! Text boxes come from walking each page's content stream and tracking the
//! text matrix. Glyph widths are not read from font programs; box widths are
//! estimated from the character count and font size. Rasterization is not
//! available.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use image::RgbaImage;
use log::{debug, warn};
use lopdf::{Document as LopdfDocument, Object, ObjectId, Stream};

use super::engine::{EngineCapabilities, PdfDocument, PdfEngine, PdfPage, TextBox};
use super::text::is_spaceless_script_char;
use crate::detect::is_pdf_bytes;
use crate::error::{Error, Result};
use crate::model::Rect;
use crate::units::points_to_pixels;

/// US Letter, used when no MediaBox is found up the page tree.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Kerning (thousandths of text space) beyond which a TJ gap reads as a space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

#[derive(Debug, Clone, Default)]
pub struct LopdfEngine;

impl LopdfEngine {
    pub fn new() -> Self {
        Self
    }
}

impl PdfEngine for LopdfEngine {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            rasterize: false,
            search: true,
        }
    }

    fn open(&self, path: &Path, layout_dpi: f32) -> Result<Box<dyn PdfDocument + '_>> {
        let data = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let doc = LopdfPdf::from_bytes(&data, layout_dpi)?;
        Ok(Box::new(doc))
    }
}

/// A loaded document.
pub struct LopdfPdf {
    doc: LopdfDocument,
    pages: Vec<ObjectId>,
    dpi: f32,
}

impl LopdfPdf {
    pub fn from_bytes(data: &[u8], layout_dpi: f32) -> Result<Self> {
        if !is_pdf_bytes(data) {
            return Err(Error::InvalidFormat("missing %PDF- header".into()));
        }
        let doc = LopdfDocument::load_mem(data)?;
        if doc.is_encrypted() {
            return Err(Error::Locked);
        }
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        debug!("PDF {} with {} pages", doc.version, pages.len());
        Ok(Self {
            doc,
            pages,
            dpi: layout_dpi,
        })
    }
}

impl PdfDocument for LopdfPdf {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page(&self, index: u32) -> Result<Box<dyn PdfPage + '_>> {
        let id = *self
            .pages
            .get(index as usize)
            .ok_or(Error::PageOutOfRange(index + 1, self.page_count()))?;
        Ok(Box::new(LopdfPage {
            doc: &self.doc,
            id,
            media_box: media_box(&self.doc, id),
            dpi: self.dpi,
        }))
    }
}

struct LopdfPage<'a> {
    doc: &'a LopdfDocument,
    id: ObjectId,
    media_box: [f32; 4],
    dpi: f32,
}

impl LopdfPage<'_> {
    fn content(&self) -> Result<Vec<u8>> {
        let page = self
            .doc
            .get_dictionary(self.id)
            .map_err(|e| Error::Parse(e.to_string()))?;
        let contents = match page.get(b"Contents") {
            Ok(c) => c,
            // A page without content is blank, not broken.
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r) {
                Ok(Object::Stream(s)) => Ok(stream_bytes(s)),
                _ => Err(Error::Parse("Invalid content stream".to_string())),
            },
            Object::Array(arr) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Object::Reference(r) = obj {
                        if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                            content.extend_from_slice(&stream_bytes(s));
                            content.push(b' ');
                        }
                    }
                }
                Ok(content)
            }
            _ => Err(Error::Parse("Invalid content stream".to_string())),
        }
    }

    fn to_pixels(&self, span: &Span) -> TextBox {
        let [x0, _, _, y1] = self.media_box;
        let height = span.size.abs();
        let top = span.y + height * 0.8;
        let bbox = Rect::new(
            points_to_pixels(span.x - x0, self.dpi),
            points_to_pixels(y1 - top, self.dpi),
            points_to_pixels(span.width, self.dpi),
            points_to_pixels(height, self.dpi),
        );
        TextBox::new(span.text.clone(), bbox)
    }
}

impl PdfPage for LopdfPage<'_> {
    fn size(&self) -> (i32, i32) {
        let [x0, y0, x1, y1] = self.media_box;
        (
            points_to_pixels(x1 - x0, self.dpi),
            points_to_pixels(y1 - y0, self.dpi),
        )
    }

    fn text_boxes(&self) -> Result<Vec<TextBox>> {
        let content = self.content()?;
        if content.is_empty() {
            return Ok(Vec::new());
        }
        let fonts = self
            .doc
            .get_page_fonts(self.id)
            .map_err(|e| Error::Parse(e.to_string()))?;
        let spans = walk_content(self.doc, &content, &fonts)?;
        Ok(spans.iter().map(|s| self.to_pixels(s)).collect())
    }

    fn render_to_image(&self, _dpi_x: f32, _dpi_y: f32) -> Result<RgbaImage> {
        Err(Error::Unsupported(
            "page rasterization is not available with the lopdf engine".into(),
        ))
    }
}

/// A shown string in PDF user space; `y` is the baseline.
#[derive(Debug, Clone)]
struct Span {
    text: String,
    x: f32,
    y: f32,
    width: f32,
    size: f32,
}

/// Text matrix and line matrix state inside a BT/ET block.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    line_e: f32,
    line_f: f32,
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            line_e: 0.0,
            line_f: 0.0,
            leading: 0.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, m: [f32; 6]) {
        let [a, b, c, d, e, f] = m;
        *self = Self {
            a,
            b,
            c,
            d,
            e,
            f,
            line_e: e,
            line_f: f,
            leading: self.leading,
        };
    }

    /// `Td`: move to the start of the next line, offset from the current one.
    fn translate(&mut self, tx: f32, ty: f32) {
        self.line_e += tx * self.a + ty * self.c;
        self.line_f += tx * self.b + ty * self.d;
        self.e = self.line_e;
        self.f = self.line_f;
    }

    fn next_line(&mut self) {
        let leading = if self.leading > 0.0 { self.leading } else { 12.0 };
        self.translate(0.0, -leading);
    }

    /// Move along the baseline after showing text.
    fn advance(&mut self, tx: f32) {
        self.e += tx * self.a;
        self.f += tx * self.b;
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Approximate advance of `text` in text space units at size 1.
fn estimate_advance(text: &str) -> f32 {
    text.chars()
        .map(|c| if is_spaceless_script_char(c) { 1.0 } else { 0.5 })
        .sum()
}

/// Simple text decoding when the font has no usable encoding.
fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // Latin-1
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn walk_content(
    doc: &LopdfDocument,
    content: &[u8],
    fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
) -> Result<Vec<Span>> {
    let content =
        lopdf::content::Content::decode(content).map_err(|e| Error::Parse(e.to_string()))?;

    let mut spans = Vec::new();
    let mut font_name: Vec<u8> = Vec::new();
    let mut font_size: f32 = 12.0;
    let mut tm = TextMatrix::default();
    let mut in_text = false;

    let decode = |font: &[u8], bytes: &[u8]| -> String {
        fonts
            .get(font)
            .and_then(|f| f.get_font_encoding(doc).ok())
            .and_then(|enc| LopdfDocument::decode_text(&enc, bytes).ok())
            .unwrap_or_else(|| decode_text_simple(bytes))
    };

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                in_text = true;
                let leading = tm.leading;
                tm = TextMatrix::default();
                tm.leading = leading;
            }
            "ET" => in_text = false,
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) =
                    (operands.first(), operands.get(1).and_then(get_number))
                {
                    font_name = name.clone();
                    font_size = size;
                }
            }
            "TL" => {
                if let Some(l) = operands.first().and_then(get_number) {
                    tm.leading = l;
                }
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(get_number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(get_number).unwrap_or(0.0);
                if op.operator == "TD" {
                    tm.leading = -ty;
                }
                tm.translate(tx, ty);
            }
            "Tm" => {
                if operands.len() >= 6 {
                    let mut m = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                    for (slot, obj) in m.iter_mut().zip(operands) {
                        if let Some(v) = get_number(obj) {
                            *slot = v;
                        }
                    }
                    tm.set(m);
                }
            }
            "T*" => tm.next_line(),
            "Tj" | "TJ" | "'" | "\"" if in_text => {
                if op.operator == "'" || op.operator == "\"" {
                    tm.next_line();
                }
                let (text, kerning) = match op.operator.as_str() {
                    "TJ" => match operands.first() {
                        Some(Object::Array(items)) => show_array(items, font_name.as_slice(), &decode),
                        _ => (String::new(), 0.0),
                    },
                    "\"" => match operands.get(2) {
                        Some(Object::String(bytes, _)) => (decode(font_name.as_slice(), bytes.as_slice()), 0.0),
                        _ => (String::new(), 0.0),
                    },
                    _ => match operands.first() {
                        Some(Object::String(bytes, _)) => (decode(font_name.as_slice(), bytes.as_slice()), 0.0),
                        _ => (String::new(), 0.0),
                    },
                };

                let advance = (estimate_advance(&text) - kerning / 1000.0) * font_size;
                if !text.trim().is_empty() {
                    let size = font_size * tm.scale();
                    spans.push(Span {
                        width: (estimate_advance(&text) * size).max(0.0),
                        text,
                        x: tm.e,
                        y: tm.f,
                        size,
                    });
                }
                tm.advance(advance);
            }
            _ => {}
        }
    }

    Ok(spans)
}

/// Decode a TJ array. Returns the text and the summed kerning.
fn show_array(
    items: &[Object],
    font: &[u8],
    decode: &dyn Fn(&[u8], &[u8]) -> String,
) -> (String, f32) {
    let mut combined = String::new();
    let mut kerning = 0.0;
    for item in items {
        match item {
            Object::String(bytes, _) => combined.push_str(&decode(font, bytes.as_slice())),
            other => {
                let Some(n) = get_number(other) else {
                    continue;
                };
                kerning += n;
                // Large negative adjustments move right far enough to be a word gap.
                if -n > TJ_SPACE_THRESHOLD
                    && !combined.is_empty()
                    && !combined.ends_with(' ')
                    && !combined.ends_with('\u{00A0}')
                    && combined.chars().last().is_some_and(|c| !is_spaceless_script_char(c))
                {
                    combined.push(' ');
                }
            }
        }
    }
    (combined, kerning)
}

/// MediaBox of a page, inherited through the page tree.
fn media_box(doc: &LopdfDocument, page: ObjectId) -> [f32; 4] {
    let mut current = page;
    // Guards against cyclic Parent links.
    for _ in 0..32 {
        let Ok(dict) = doc.get_dictionary(current) else {
            break;
        };
        if let Ok(obj) = dict.get(b"MediaBox") {
            let array = match obj {
                Object::Reference(r) => doc.get_object(*r).and_then(|o| o.as_array()).ok(),
                other => other.as_array().ok(),
            };
            let values: Vec<f32> = array
                .map(|a| a.iter().filter_map(get_number).collect())
                .unwrap_or_default();
            if let [x0, y0, x1, y1] = values[..] {
                return [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];
            }
            warn!("Malformed MediaBox on object {:?}", current);
            break;
        }
        match dict.get(b"Parent").and_then(|p| p.as_reference()) {
            Ok(parent) => current = parent,
            Err(_) => break,
        }
    }
    DEFAULT_MEDIA_BOX
}

/// Content bytes of a stream. Streams without a `/Filter` are stored raw.
fn stream_bytes(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}
