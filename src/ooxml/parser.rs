//! Main document part walker.
//!
//! Produces a flat, discovery-ordered list of Text, Image, Table and Chart
//! elements from `word/document.xml`. Any XML error aborts the whole parse;
//! elements gathered before the failure are dropped with it.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use log::{debug, warn};

use super::chart::parse_chart_part;
use super::cursor::{Ns, XmlCursor, XmlElement, XmlNode};
use super::drawing::{DrawingInfo, VmlPicture};
use super::rels::{part_dir, rels_path_for, RelationshipKind, RelationshipMap};
use super::table::TableAccumulator;
use crate::convert::CancellationToken;
use crate::error::{Error, Result};
use crate::model::{
    Alignment, DocumentElement, ElementType, FormatInfo, IdGenerator, ImageInfo, Rect, RunFormat,
};
use crate::package::ArchivePackageReader;
use crate::units::{half_points_to_points, twips_to_pixels};

const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Walks the main document part of a DOCX package.
pub struct OoxmlDocumentParser<'a> {
    package: &'a dyn ArchivePackageReader,
    archive: &'a Path,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> OoxmlDocumentParser<'a> {
    pub fn new(package: &'a dyn ArchivePackageReader, archive: &'a Path) -> Self {
        Self {
            package,
            archive,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: Option<&'a CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Locate the main part through the package relationships.
    fn main_part(&self) -> Result<String> {
        let root_rels = self.package.read_entry(self.archive, "_rels/.rels")?;
        let target = root_rels.and_then(|data| {
            RelationshipMap::parse(&data, "")
                .of_kind(RelationshipKind::OfficeDocument)
                .into_values()
                .next()
        });
        Ok(target.unwrap_or_else(|| DEFAULT_MAIN_PART.to_string()))
    }

    /// Parse the package into elements, drawing ids from `ids`.
    pub fn parse(&self, ids: &mut IdGenerator) -> Result<Vec<DocumentElement>> {
        let main = self.main_part()?;
        let xml = self
            .package
            .read_entry(self.archive, &main)?
            .ok_or_else(|| Error::Parse(format!("package has no main document part ({})", main)))?;

        let rels = match self.package.read_entry(self.archive, &rels_path_for(&main))? {
            Some(data) => RelationshipMap::parse(&data, part_dir(&main)),
            None => RelationshipMap::default(),
        };
        debug!("{}: {} relationships", main, rels.len());

        let walker = BodyWalker {
            parser: self,
            rels: &rels,
            ids,
            elements: Vec::new(),
            paragraph: None,
            run: None,
            tables: Vec::new(),
        };
        walker.run(&xml)
    }
}

/// Open paragraph state.
#[derive(Debug, Default)]
struct ParagraphAcc {
    text: String,
    format: FormatInfo,
    first_run_applied: bool,
    attributes: BTreeMap<String, String>,
    hyperlinks: usize,
}

struct BodyWalker<'p, 'a> {
    parser: &'p OoxmlDocumentParser<'a>,
    rels: &'p RelationshipMap,
    ids: &'p mut IdGenerator,
    elements: Vec<DocumentElement>,
    paragraph: Option<ParagraphAcc>,
    /// Properties of the open run, `None` outside runs
    run: Option<RunFormat>,
    tables: Vec<TableAccumulator>,
}

impl BodyWalker<'_, '_> {
    fn run(mut self, xml: &[u8]) -> Result<Vec<DocumentElement>> {
        let mut cursor = XmlCursor::new(xml);
        loop {
            match cursor.next_node()? {
                XmlNode::Start(e) => self.on_start(e, &mut cursor)?,
                XmlNode::End { ns, name } => self.on_end(ns, &name)?,
                XmlNode::Text(_) => {}
                XmlNode::Eof => break,
            }
        }
        Ok(self.elements)
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.parser.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    fn on_start(&mut self, e: XmlElement, cursor: &mut XmlCursor<'_>) -> Result<()> {
        match (e.ns, e.name.as_str()) {
            (Ns::W, "p") => self.paragraph = Some(ParagraphAcc::default()),
            (Ns::W, "pPr") => match self.paragraph.as_mut() {
                Some(acc) => read_paragraph_properties(cursor, acc)?,
                None => cursor.skip_element()?,
            },
            (Ns::W, "r") => self.run = Some(RunFormat::default()),
            (Ns::W, "rPr") => {
                if self.run.is_some() {
                    self.run = Some(read_run_properties(cursor)?);
                } else {
                    cursor.skip_element()?;
                }
            }
            (Ns::W, "t") => {
                let text = cursor.element_text()?;
                self.push_text(&text, true);
            }
            (Ns::W, "tab") => self.push_text("\t", false),
            (Ns::W, "br") | (Ns::W, "cr") => self.push_text("\n", false),
            (Ns::W, "noBreakHyphen") => self.push_text("-", false),
            (Ns::W, "sym") => {
                let ch = e
                    .attr(Ns::W, "char")
                    .and_then(|c| u32::from_str_radix(c, 16).ok())
                    .and_then(char::from_u32);
                if let Some(ch) = ch {
                    self.push_text(ch.encode_utf8(&mut [0; 4]), true);
                }
            }
            // Deleted revisions and field instructions are not document text.
            (Ns::W, "delText") | (Ns::W, "instrText") => cursor.skip_element()?,
            (Ns::W, "hyperlink") => self.on_hyperlink(&e),
            (Ns::W, "drawing") => {
                let drawing = DrawingInfo::read(cursor)?;
                self.emit_drawing(drawing);
            }
            (Ns::W, "pict") | (Ns::W, "object") => {
                let pict = VmlPicture::read(cursor)?;
                self.emit_vml(pict);
            }
            (Ns::W, "tbl") => self.tables.push(TableAccumulator::default()),
            (Ns::W, "tr") => {
                if let Some(t) = self.tables.last_mut() {
                    t.start_row();
                }
            }
            (Ns::W, "tc") => {
                if let Some(t) = self.tables.last_mut() {
                    t.start_cell();
                }
            }
            (Ns::W, "gridCol") => {
                if let (Some(t), Some(w)) = (self.tables.last_mut(), e.int_attr(Ns::W, "w")) {
                    t.add_grid_column(w);
                }
            }
            // The fallback branch repeats the preferred choice in legacy markup.
            (Ns::Mc, "Fallback") => cursor.skip_element()?,
            _ => {}
        }
        Ok(())
    }

    fn on_end(&mut self, ns: Ns, name: &str) -> Result<()> {
        if ns != Ns::W {
            return Ok(());
        }
        match name {
            "p" => {
                self.finish_paragraph();
                self.check_cancelled()?;
            }
            "r" => self.run = None,
            "tc" => {
                if let Some(t) = self.tables.last_mut() {
                    t.end_cell();
                }
            }
            "tr" => {
                if let Some(t) = self.tables.last_mut() {
                    t.end_row();
                }
            }
            "tbl" => {
                self.finish_table();
                self.check_cancelled()?;
            }
            _ => {}
        }
        Ok(())
    }

    fn push_text(&mut self, text: &str, is_text_run: bool) {
        let Some(acc) = self.paragraph.as_mut() else {
            return;
        };
        if is_text_run && !acc.first_run_applied && !text.is_empty() {
            if let Some(run) = self.run.as_ref() {
                acc.format.apply_run(run);
            }
            acc.first_run_applied = true;
        }
        acc.text.push_str(text);
    }

    fn on_hyperlink(&mut self, e: &XmlElement) {
        let Some(acc) = self.paragraph.as_mut() else {
            return;
        };
        if let Some(anchor) = e.attr(Ns::W, "anchor") {
            acc.attributes.insert("anchor".into(), anchor.to_string());
        }
        let Some(rel_id) = e.attr(Ns::R, "id") else {
            return;
        };
        match self.rels.get(rel_id, RelationshipKind::Hyperlink) {
            Some(rel) => {
                acc.hyperlinks += 1;
                let key = if acc.hyperlinks == 1 {
                    "hyperlink".to_string()
                } else {
                    format!("hyperlink_{}", acc.hyperlinks)
                };
                acc.attributes.insert(key, rel.target.clone());
            }
            None => warn!("Unresolved hyperlink relationship {}", rel_id),
        }
    }

    fn finish_paragraph(&mut self) {
        let Some(acc) = self.paragraph.take() else {
            return;
        };
        self.run = None;

        if let Some(table) = self.tables.last_mut() {
            if table.in_cell() {
                table.push_paragraph(&acc.text);
                return;
            }
        }

        if acc.text.trim().is_empty() {
            return;
        }

        let id = self.ids.next_id(ElementType::Text);
        let mut el = DocumentElement::new(id, ElementType::Text)
            .with_content(acc.text)
            .with_format(acc.format)
            .with_attribute("source", "docx")
            .with_attribute("extraction_method", "document_xml");
        el.attributes.extend(acc.attributes);
        debug!("Paragraph {} ({} chars)", el.id, el.content.len());
        self.elements.push(el);
    }

    fn finish_table(&mut self) {
        let Some(table) = self.tables.pop() else {
            return;
        };
        let grid_width = table.grid_width_pixels();
        let id = self.ids.next_id(ElementType::Table);
        let Some(info) = table.finish(id) else {
            debug!("Skipping table without rows");
            return;
        };

        // A nested table's text also belongs to the enclosing cell.
        if let Some(outer) = self.tables.last_mut() {
            if outer.in_cell() {
                outer.push_paragraph(&info.plain_text());
            }
        }

        let mut el = info
            .into_element()
            .with_attribute("source", "docx")
            .with_attribute("extraction_method", "document_xml");
        if grid_width > 0 {
            el.attributes
                .insert("grid_width_px".into(), grid_width.to_string());
        }
        self.elements.push(el);
    }

    fn emit_drawing(&mut self, drawing: DrawingInfo) {
        if let Some(chart_id) = drawing.chart_id.clone() {
            self.emit_chart(&chart_id, &drawing);
            return;
        }
        let Some(rel_id) = drawing.blip_embed.clone().or_else(|| drawing.blip_link.clone()) else {
            debug!("Skipping drawing without picture or chart content");
            return;
        };
        let Some(mut image) = self.load_image(&rel_id) else {
            return;
        };
        image.bbox = drawing.bbox(image.pixel_size);

        let mut el = image.into_element();
        el.position.is_inline = drawing.inline;
        el.position.z_order = drawing.z_order();
        el.attributes.extend(drawing.attributes());
        el.attributes.insert("source".into(), "docx".into());
        el.attributes
            .insert("extraction_method".into(), "drawingml".into());
        self.elements.push(el);
    }

    fn emit_vml(&mut self, pict: VmlPicture) {
        let Some(rel_id) = pict.image_id.clone() else {
            debug!("Skipping VML picture without image data");
            return;
        };
        let Some(mut image) = self.load_image(&rel_id) else {
            return;
        };
        image.bbox = pict.bbox(image.pixel_size);

        let mut el = image.into_element();
        el.position.is_inline = pict.is_inline();
        el.position.z_order = pict.z_order();
        el.attributes.insert("source".into(), "docx".into());
        el.attributes.insert("extraction_method".into(), "vml".into());
        if let Some(title) = pict.title {
            el.attributes.insert("name".into(), title);
        }
        self.elements.push(el);
    }

    /// Resolve an image relationship and read its bytes. Unresolvable
    /// references are skipped.
    fn load_image(&mut self, rel_id: &str) -> Option<ImageInfo> {
        let Some(rel) = self.rels.get(rel_id, RelationshipKind::Image) else {
            warn!("Unresolved image relationship {}", rel_id);
            return None;
        };

        let format = image_format_from_path(&rel.target);
        if rel.external {
            return Some(ImageInfo {
                id: self.ids.next_id(ElementType::Image),
                original_path: rel.target.clone(),
                format,
                is_embedded: false,
                ..Default::default()
            });
        }

        let bytes = match self.parser.package.read_entry(self.parser.archive, &rel.target) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!("Image part {} is missing from the package", rel.target);
                return None;
            }
            Err(e) => {
                warn!("Cannot read image part {}: {}", rel.target, e);
                return None;
            }
        };

        Some(ImageInfo {
            id: self.ids.next_id(ElementType::Image),
            original_path: rel.target.clone(),
            format,
            pixel_size: sniff_dimensions(&bytes),
            bbox: Rect::placeholder(),
            raw_bytes: bytes,
            is_embedded: true,
        })
    }

    fn emit_chart(&mut self, rel_id: &str, drawing: &DrawingInfo) {
        let Some(rel) = self.rels.get(rel_id, RelationshipKind::Chart) else {
            warn!("Unresolved chart relationship {}", rel_id);
            return;
        };
        let data = match self.parser.package.read_entry(self.parser.archive, &rel.target) {
            Ok(Some(data)) => data,
            Ok(None) => {
                warn!("Chart part {} is missing from the package", rel.target);
                return;
            }
            Err(e) => {
                warn!("Cannot read chart part {}: {}", rel.target, e);
                return;
            }
        };
        let mut chart = match parse_chart_part(&data) {
            Ok(chart) => chart,
            Err(e) => {
                warn!("Skipping malformed chart part {}: {}", rel.target, e);
                return;
            }
        };

        chart.id = self.ids.next_id(ElementType::Chart);
        chart.bbox = drawing.bbox(None);
        chart
            .properties
            .insert("source_path".into(), rel.target.clone());

        let mut el = chart.into_element();
        el.position.is_inline = drawing.inline;
        el.position.z_order = drawing.z_order();
        el.attributes.extend(drawing.attributes());
        el.attributes.insert("source".into(), "docx".into());
        el.attributes
            .insert("extraction_method".into(), "chart_part".into());
        self.elements.push(el);
    }
}

/// Read `w:rPr` through its end tag.
fn read_run_properties(cursor: &mut XmlCursor<'_>) -> Result<RunFormat> {
    let target = cursor.depth();
    let mut run = RunFormat::default();
    loop {
        match cursor.next_node()? {
            XmlNode::Start(e) if e.ns == Ns::W => match e.name.as_str() {
                "b" => run.bold = Some(e.toggle()),
                "i" => run.italic = Some(e.toggle()),
                "u" => run.underline = Some(e.toggle()),
                "strike" | "dstrike" => run.strikethrough = Some(e.toggle()),
                "sz" => {
                    if let Some(hp) = e.val().and_then(|v| v.trim().parse::<u32>().ok()) {
                        run.font_size = Some(half_points_to_points(hp));
                    }
                }
                "rFonts" => {
                    run.font_family = ["ascii", "hAnsi", "eastAsia", "cs"]
                        .iter()
                        .find_map(|k| e.attr(Ns::W, k))
                        .map(String::from);
                }
                _ => {}
            },
            XmlNode::End { .. } if cursor.depth() < target => return Ok(run),
            XmlNode::Eof => return Err(Error::Parse("XML: run properties not closed".into())),
            _ => {}
        }
    }
}

/// Read `w:pPr` through its end tag into the paragraph accumulator.
fn read_paragraph_properties(cursor: &mut XmlCursor<'_>, acc: &mut ParagraphAcc) -> Result<()> {
    let target = cursor.depth();
    loop {
        match cursor.next_node()? {
            XmlNode::Start(e) if e.ns == Ns::W => match e.name.as_str() {
                "jc" => {
                    if let Some(a) = e.val().and_then(Alignment::from_ooxml) {
                        acc.format.alignment = a;
                    }
                }
                "ind" => {
                    let twips = |names: &[&str]| names.iter().find_map(|n| e.int_attr(Ns::W, n));
                    if let Some(v) = twips(&["left", "start"]) {
                        acc.format.left_indent = twips_to_pixels(v);
                    }
                    if let Some(v) = twips(&["right", "end"]) {
                        acc.format.right_indent = twips_to_pixels(v);
                    }
                    if let Some(v) = twips(&["firstLine"]) {
                        acc.format.first_line_indent = twips_to_pixels(v);
                    } else if let Some(v) = twips(&["hanging"]) {
                        acc.format.first_line_indent = -twips_to_pixels(v);
                    }
                }
                "spacing" => {
                    let rule = e.attr(Ns::W, "lineRule").unwrap_or("auto");
                    if let Some(line) = e.int_attr(Ns::W, "line") {
                        if rule == "auto" {
                            acc.format.line_spacing = line as f32 / 240.0;
                        }
                    }
                    if let Some(after) = e.int_attr(Ns::W, "after") {
                        acc.format.paragraph_spacing = after as f32 / 20.0;
                    }
                }
                "pStyle" => {
                    if let Some(style) = e.val() {
                        acc.attributes.insert("style".into(), style.to_string());
                    }
                }
                "ilvl" => {
                    if let Some(level) = e.val() {
                        acc.attributes.insert("list_level".into(), level.to_string());
                    }
                }
                "numId" => {
                    if let Some(id) = e.val() {
                        acc.attributes.insert("list_id".into(), id.to_string());
                    }
                }
                // Paragraph mark formatting is the paragraph's baseline.
                "rPr" => {
                    let mark = read_run_properties(cursor)?;
                    acc.format.apply_run(&mark);
                }
                "sectPr" => cursor.skip_element()?,
                _ => {}
            },
            XmlNode::End { .. } if cursor.depth() < target => return Ok(()),
            XmlNode::Eof => {
                return Err(Error::Parse("XML: paragraph properties not closed".into()))
            }
            _ => {}
        }
    }
}

/// Lowercase extension of a part path, normalising `jpg` to `jpeg`.
fn image_format_from_path(path: &str) -> String {
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" => "jpeg".to_string(),
        "tif" => "tiff".to_string(),
        _ => ext,
    }
}

/// Intrinsic pixel size from the image header, if the format is decodable.
fn sniff_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
