//! DrawingML (`w:drawing`) and VML (`w:pict`) picture readers.

use std::collections::BTreeMap;

use log::debug;

use super::cursor::{Ns, XmlCursor, XmlNode};
use crate::error::{Error, Result};
use crate::model::Rect;
use crate::units::{css_length_to_pixels, emu_to_pixels};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Everything a `w:drawing` says about placement and content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawingInfo {
    pub inline: bool,
    /// `wp:extent` in EMU
    pub extent: Option<(i64, i64)>,
    /// `a:xfrm/a:ext` in EMU, used when no extent is given
    pub shape_extent: Option<(i64, i64)>,
    pub offset_h: Option<i64>,
    pub offset_v: Option<i64>,
    pub relative_from_h: Option<String>,
    pub relative_from_v: Option<String>,
    pub align_h: Option<String>,
    pub align_v: Option<String>,
    pub relative_height: Option<i64>,
    pub behind_doc: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub blip_embed: Option<String>,
    pub blip_link: Option<String>,
    pub chart_id: Option<String>,
    /// `w:txbxContent` bodies passed over; their text is not extracted
    pub skipped_text_boxes: usize,
}

impl DrawingInfo {
    /// Read a drawing whose start tag was just consumed, through its end tag.
    pub fn read(cursor: &mut XmlCursor<'_>) -> Result<Self> {
        let target = cursor.depth();
        let mut info = DrawingInfo {
            inline: true,
            ..Default::default()
        };
        let mut axis = None;

        loop {
            match cursor.next_node()? {
                XmlNode::Start(e) => match (e.ns, e.name.as_str()) {
                    (Ns::Wp, "inline") => info.inline = true,
                    (Ns::Wp, "anchor") => {
                        info.inline = false;
                        info.relative_height = e.int_attr(Ns::None, "relativeHeight");
                        info.behind_doc = matches!(
                            e.attr_unqualified("behindDoc"),
                            Some("1") | Some("true") | Some("on")
                        );
                    }
                    (Ns::Wp, "extent") => {
                        if let (Some(cx), Some(cy)) =
                            (e.int_attr(Ns::None, "cx"), e.int_attr(Ns::None, "cy"))
                        {
                            info.extent = Some((cx, cy));
                        }
                    }
                    (Ns::Wp, "positionH") => {
                        axis = Some(Axis::Horizontal);
                        info.relative_from_h = e.attr_unqualified("relativeFrom").map(String::from);
                    }
                    (Ns::Wp, "positionV") => {
                        axis = Some(Axis::Vertical);
                        info.relative_from_v = e.attr_unqualified("relativeFrom").map(String::from);
                    }
                    (Ns::Wp, "posOffset") => {
                        let value = cursor.element_text()?.trim().parse::<i64>().ok();
                        match axis {
                            Some(Axis::Horizontal) => info.offset_h = value,
                            Some(Axis::Vertical) => info.offset_v = value,
                            None => {}
                        }
                    }
                    (Ns::Wp, "align") => {
                        let value = Some(cursor.element_text()?.trim().to_string());
                        match axis {
                            Some(Axis::Horizontal) => info.align_h = value,
                            Some(Axis::Vertical) => info.align_v = value,
                            None => {}
                        }
                    }
                    (Ns::Wp, "docPr") => {
                        info.name = e.attr_unqualified("name").map(String::from);
                        info.description = e
                            .attr_unqualified("descr")
                            .filter(|d| !d.is_empty())
                            .map(String::from);
                    }
                    (Ns::A, "blip") => {
                        info.blip_embed = e.attr(Ns::R, "embed").map(String::from);
                        info.blip_link = e.attr(Ns::R, "link").map(String::from);
                    }
                    (Ns::A, "ext") if info.shape_extent.is_none() => {
                        if let (Some(cx), Some(cy)) =
                            (e.int_attr(Ns::None, "cx"), e.int_attr(Ns::None, "cy"))
                        {
                            info.shape_extent = Some((cx, cy));
                        }
                    }
                    (Ns::C, "chart") => {
                        info.chart_id = e.attr(Ns::R, "id").map(String::from);
                    }
                    (Ns::W, "txbxContent") => {
                        debug!("Skipping text box content inside a drawing");
                        info.skipped_text_boxes += 1;
                        cursor.skip_element()?;
                    }
                    _ => {}
                },
                XmlNode::End { .. } if cursor.depth() < target => return Ok(info),
                XmlNode::End { ns: Ns::Wp, name } if name == "positionH" || name == "positionV" => {
                    axis = None;
                }
                XmlNode::Eof => {
                    return Err(Error::Parse("XML: drawing not closed".into()));
                }
                _ => {}
            }
        }
    }

    /// Placement in layout pixels.
    ///
    /// Inline drawings sit at the origin; anchored ones use their absolute
    /// offsets. Size comes from the extent, then the shape transform, then
    /// the image's own pixel size.
    pub fn bbox(&self, intrinsic: Option<(u32, u32)>) -> Rect {
        let (width, height) = match self.extent.or(self.shape_extent) {
            Some((cx, cy)) => (emu_to_pixels(cx), emu_to_pixels(cy)),
            None => intrinsic
                .map(|(w, h)| (w as i32, h as i32))
                .unwrap_or((0, 0)),
        };
        if self.inline {
            return Rect::new(0, 0, width, height);
        }
        Rect::new(
            emu_to_pixels(self.offset_h.unwrap_or(0)),
            emu_to_pixels(self.offset_v.unwrap_or(0)),
            width,
            height,
        )
    }

    /// Stacking order; anchors carry `relativeHeight`.
    pub fn z_order(&self) -> i32 {
        self.relative_height
            .map(|h| h.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
            .unwrap_or(0)
    }

    /// Provenance attributes for the emitted element.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        attrs.insert(
            "placement".to_string(),
            if self.inline { "inline" } else { "anchor" }.to_string(),
        );
        if let Some((cx, cy)) = self.extent {
            attrs.insert("extent_cx".into(), cx.to_string());
            attrs.insert("extent_cy".into(), cy.to_string());
        }
        if !self.inline {
            attrs.insert("behind_doc".into(), self.behind_doc.to_string());
        }
        let optional = [
            ("relative_from_h", &self.relative_from_h),
            ("relative_from_v", &self.relative_from_v),
            ("align_h", &self.align_h),
            ("align_v", &self.align_v),
            ("name", &self.name),
            ("description", &self.description),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                attrs.insert(key.to_string(), v.clone());
            }
        }
        attrs
    }
}

/// A legacy VML picture (`w:pict` or `w:object`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VmlPicture {
    pub style: BTreeMap<String, String>,
    pub image_id: Option<String>,
    pub title: Option<String>,
}

impl VmlPicture {
    pub fn read(cursor: &mut XmlCursor<'_>) -> Result<Self> {
        let target = cursor.depth();
        let mut pict = VmlPicture::default();

        loop {
            match cursor.next_node()? {
                XmlNode::Start(e) if e.ns == Ns::V => match e.name.as_str() {
                    "shape" | "rect" | "roundrect" | "oval" if pict.style.is_empty() => {
                        if let Some(style) = e.attr_unqualified("style") {
                            pict.style = parse_style(style);
                        }
                    }
                    "imagedata" if pict.image_id.is_none() => {
                        pict.image_id = e.attr(Ns::R, "id").map(String::from);
                        pict.title = e
                            .attr(Ns::O, "title")
                            .or_else(|| e.attr_unqualified("title"))
                            .map(String::from);
                    }
                    _ => {}
                },
                XmlNode::Start(e) if e.is(Ns::W, "txbxContent") => {
                    debug!("Skipping text box content inside a VML shape");
                    cursor.skip_element()?;
                }
                XmlNode::End { .. } if cursor.depth() < target => return Ok(pict),
                XmlNode::Eof => {
                    return Err(Error::Parse("XML: picture not closed".into()));
                }
                _ => {}
            }
        }
    }

    pub fn is_inline(&self) -> bool {
        self.style.get("position").map(String::as_str) != Some("absolute")
    }

    fn length(&self, key: &str) -> Option<i32> {
        self.style.get(key).and_then(|v| css_length_to_pixels(v))
    }

    pub fn bbox(&self, intrinsic: Option<(u32, u32)>) -> Rect {
        let (iw, ih) = intrinsic.map(|(w, h)| (w as i32, h as i32)).unwrap_or((0, 0));
        let width = self.length("width").unwrap_or(iw);
        let height = self.length("height").unwrap_or(ih);
        if self.is_inline() {
            return Rect::new(0, 0, width, height);
        }
        Rect::new(
            self.length("margin-left").or_else(|| self.length("left")).unwrap_or(0),
            self.length("margin-top").or_else(|| self.length("top")).unwrap_or(0),
            width,
            height,
        )
    }

    pub fn z_order(&self) -> i32 {
        self.style
            .get("z-index")
            .and_then(|z| z.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Split a CSS-like `key:value;key:value` declaration list.
fn parse_style(style: &str) -> BTreeMap<String, String> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:c="http://schemas.openxmlformats.org/drawingml/2006/chart" xmlns:v="urn:schemas-microsoft-com:vml""#;

    fn read_drawing(inner: &str) -> DrawingInfo {
        let xml = format!("<w:drawing {}>{}</w:drawing>", NS, inner);
        let mut cursor = XmlCursor::new(xml.as_bytes());
        assert!(matches!(cursor.next_node().unwrap(), XmlNode::Start(_)));
        let info = DrawingInfo::read(&mut cursor).unwrap();
        assert!(matches!(cursor.next_node().unwrap(), XmlNode::Eof));
        info
    }

    #[test]
    fn test_anchor_drawing() {
        let info = read_drawing(
            r#"<wp:anchor behindDoc="1" relativeHeight="251659264">
                 <wp:positionH relativeFrom="column"><wp:posOffset>914400</wp:posOffset></wp:positionH>
                 <wp:positionV relativeFrom="paragraph"><wp:posOffset>0</wp:posOffset></wp:positionV>
                 <wp:extent cx="914400" cy="914400"/>
                 <wp:docPr id="1" name="Picture 1" descr=""/>
                 <a:graphic><a:graphicData><a:blip r:embed="rId5"/>
                   <a:xfrm><a:off x="0" y="0"/><a:ext cx="1" cy="1"/></a:xfrm>
                 </a:graphicData></a:graphic>
               </wp:anchor>"#,
        );
        assert!(!info.inline);
        assert!(info.behind_doc);
        assert_eq!(info.blip_embed.as_deref(), Some("rId5"));
        assert_eq!(info.bbox(None), Rect::new(96, 0, 96, 96));
        assert_eq!(info.z_order(), 251659264);
        let attrs = info.attributes();
        assert_eq!(attrs["placement"], "anchor");
        assert_eq!(attrs["relative_from_h"], "column");
        assert!(!attrs.contains_key("description"));
    }

    #[test]
    fn test_inline_drawing_with_chart() {
        let info = read_drawing(
            r#"<wp:inline><wp:extent cx="1905000" cy="952500"/>
                 <a:graphic><a:graphicData><c:chart r:id="rId9"/></a:graphicData></a:graphic>
               </wp:inline>"#,
        );
        assert!(info.inline);
        assert_eq!(info.chart_id.as_deref(), Some("rId9"));
        assert_eq!(info.bbox(None), Rect::new(0, 0, 200, 100));
        assert_eq!(info.z_order(), 0);
    }

    #[test]
    fn test_text_box_is_skipped() {
        let info = read_drawing(
            r#"<wp:anchor xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape">
                 <a:graphic><a:graphicData><wps:wsp><wps:txbx>
                   <w:txbxContent><w:p><w:r><w:t>Boxed</w:t></w:r></w:p></w:txbxContent>
                 </wps:txbx></wps:wsp></a:graphicData></a:graphic>
                 <wp:extent cx="1905000" cy="952500"/>
               </wp:anchor>"#,
        );
        assert_eq!(info.skipped_text_boxes, 1);
        assert_eq!(info.extent, Some((1_905_000, 952_500)));
        assert!(info.blip_embed.is_none());
    }

    #[test]
    fn test_size_falls_back_to_intrinsic() {
        let info = read_drawing(r#"<wp:inline><a:blip r:embed="rId1"/></wp:inline>"#);
        assert_eq!(info.bbox(Some((40, 30))), Rect::new(0, 0, 40, 30));
    }

    #[test]
    fn test_vml_picture() {
        let xml = format!(
            r#"<w:pict {}><v:shape style="position:absolute;margin-left:72pt;margin-top:36pt;width:1in;height:48px;z-index:4"><v:imagedata r:id="rId7" o:title="logo" xmlns:o="urn:schemas-microsoft-com:office:office"/></v:shape></w:pict>"#,
            NS
        );
        let mut cursor = XmlCursor::new(xml.as_bytes());
        cursor.next_node().unwrap();
        let pict = VmlPicture::read(&mut cursor).unwrap();
        assert_eq!(pict.image_id.as_deref(), Some("rId7"));
        assert_eq!(pict.title.as_deref(), Some("logo"));
        assert!(!pict.is_inline());
        assert_eq!(pict.bbox(None), Rect::new(96, 48, 96, 48));
        assert_eq!(pict.z_order(), 4);
    }

    #[test]
    fn test_parse_style() {
        let style = parse_style("Width: 10pt ; ;height:5pt;bogus");
        assert_eq!(style.get("width").map(String::as_str), Some("10pt"));
        assert_eq!(style.len(), 2);
    }
}
