//! Per-content-type descriptors and their folding into elements.
//!
//! Extractors fill these while walking a source document; a single
//! `into_element` call per descriptor turns them into [`DocumentElement`]s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::element::{DocumentElement, ElementType};
use super::geometry::Rect;

/// An embedded or detected picture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: String,
    /// Part path inside the package, or empty for detected regions
    pub original_path: String,
    /// Lowercase format name ("png", "jpeg", ...)
    pub format: String,
    /// Intrinsic pixel dimensions of the encoded image
    pub pixel_size: Option<(u32, u32)>,
    pub bbox: Rect,
    #[serde(skip)]
    pub raw_bytes: Vec<u8>,
    pub is_embedded: bool,
}

impl ImageInfo {
    pub fn mime_type(&self) -> &'static str {
        mime_for_format(&self.format)
    }

    pub fn into_element(self) -> DocumentElement {
        let label = match self.original_path.rsplit('/').next() {
            Some(name) if !name.is_empty() => format!("Image: {}", name),
            _ => format!("Image {}x{}", self.bbox.width, self.bbox.height),
        };
        let mime = self.mime_type();
        let mut el = DocumentElement::new(self.id, ElementType::Image)
            .with_content(label)
            .with_bbox(self.bbox)
            .with_attribute("format", self.format.clone())
            .with_attribute("embedded", self.is_embedded.to_string());

        if !self.original_path.is_empty() {
            el.attributes
                .insert("source_path".into(), self.original_path.clone());
        }
        if let Some((w, h)) = self.pixel_size {
            el.attributes.insert("pixel_width".into(), w.to_string());
            el.attributes.insert("pixel_height".into(), h.to_string());
        }
        if !self.raw_bytes.is_empty() {
            el = el.with_binary(self.raw_bytes, mime);
        }
        el
    }
}

/// Map a format name or file extension to a MIME type.
pub fn mime_for_format(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// File extension for a MIME type, the inverse of [`mime_for_format`].
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/webp" => "webp",
        "image/x-emf" => "emf",
        "image/x-wmf" => "wmf",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

/// One table cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInfo {
    pub row: usize,
    pub column: usize,
    pub text: String,
}

/// A table as a row-major cell matrix. Rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: String,
    pub row_count: usize,
    pub column_count: usize,
    pub cells: Vec<Vec<CellInfo>>,
    pub bbox: Rect,
}

impl TableInfo {
    /// Build from plain rows of cell text. Column count is the widest row.
    pub fn from_rows(id: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        let cells: Vec<Vec<CellInfo>> = rows
            .into_iter()
            .enumerate()
            .map(|(r, row)| {
                row.into_iter()
                    .enumerate()
                    .map(|(c, text)| CellInfo {
                        row: r,
                        column: c,
                        text,
                    })
                    .collect()
            })
            .collect();
        Self {
            id: id.into(),
            row_count: cells.len(),
            column_count,
            cells,
            bbox: Rect::placeholder(),
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&CellInfo> {
        self.cells.get(row).and_then(|r| r.get(column))
    }

    /// Cell texts joined with tabs per row and newlines between rows.
    pub fn plain_text(&self) -> String {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn into_element(self) -> DocumentElement {
        let mut el = DocumentElement::new(self.id.clone(), ElementType::Table)
            .with_content(format!("Table {}x{}", self.row_count, self.column_count))
            .with_bbox(self.bbox)
            .with_attribute("rows", self.row_count.to_string())
            .with_attribute("columns", self.column_count.to_string());
        for cell in self.cells.into_iter().flatten() {
            el.attributes
                .insert(format!("cell_{}_{}", cell.row, cell.column), cell.text);
        }
        el
    }
}

/// Chart family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    #[default]
    Unknown,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Unknown => "unknown",
        }
    }

    /// Guess the family from a caption keyword.
    pub fn from_keyword(keyword: &str) -> Self {
        let k = keyword.to_lowercase();
        if k.contains("bar") || keyword.contains("柱状图") {
            ChartType::Bar
        } else if k.contains("line") || keyword.contains("折线图") {
            ChartType::Line
        } else if k.contains("pie") || keyword.contains("饼图") {
            ChartType::Pie
        } else {
            ChartType::Unknown
        }
    }

    /// Map a DrawingML plot element local name (`barChart`, `pie3DChart`, ...).
    pub fn from_plot_name(name: &str) -> Option<Self> {
        match name {
            "barChart" | "bar3DChart" => Some(ChartType::Bar),
            "lineChart" | "line3DChart" => Some(ChartType::Line),
            "pieChart" | "pie3DChart" | "doughnutChart" | "ofPieChart" => Some(ChartType::Pie),
            "areaChart" | "area3DChart" | "scatterChart" | "radarChart" | "bubbleChart"
            | "stockChart" | "surfaceChart" | "surface3DChart" => Some(ChartType::Unknown),
            _ => None,
        }
    }
}

/// One data series of a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSeries {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartInfo {
    pub id: String,
    pub title: String,
    pub chart_type: ChartType,
    pub data_series: Vec<DataSeries>,
    pub bbox: Rect,
    pub properties: BTreeMap<String, String>,
}

impl ChartInfo {
    pub fn into_element(self) -> DocumentElement {
        let label = if self.title.is_empty() {
            format!("Chart ({})", self.chart_type.as_str())
        } else {
            self.title.clone()
        };
        let mut el = DocumentElement::new(self.id, ElementType::Chart)
            .with_content(label)
            .with_bbox(self.bbox)
            .with_attribute("chart_type", self.chart_type.as_str())
            .with_attribute("series_count", self.data_series.len().to_string());
        if !self.title.is_empty() {
            el.attributes.insert("title".into(), self.title);
        }
        for (i, series) in self.data_series.iter().enumerate() {
            el.attributes
                .insert(format!("series_{}_label", i), series.label.clone());
            let values = series
                .values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",");
            el.attributes.insert(format!("series_{}_values", i), values);
        }
        el.attributes.extend(self.properties);
        el
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_from_ragged_rows() {
        let t = TableInfo::from_rows(
            "table_1_1",
            vec![
                vec!["a".into(), "b".into()],
                vec!["c".into(), "d".into(), "e".into()],
            ],
        );
        assert_eq!(t.row_count, 2);
        assert_eq!(t.column_count, 3);
        assert_eq!(t.cells[0].len(), 2);
        assert_eq!(t.cell(1, 2).map(|c| c.text.as_str()), Some("e"));
        assert!(t.cell(0, 2).is_none());
        assert_eq!(t.plain_text(), "a\tb\nc\td\te");

        let el = t.into_element();
        assert_eq!(el.element_type, ElementType::Table);
        assert_eq!(el.content, "Table 2x3");
        assert_eq!(el.attributes.get("cell_1_0").map(String::as_str), Some("c"));
        assert_eq!(el.attributes.get("columns").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_image_into_element() {
        let info = ImageInfo {
            id: "img_2_1".into(),
            original_path: "word/media/image1.png".into(),
            format: "png".into(),
            pixel_size: Some((10, 20)),
            bbox: Rect::new(96, 0, 96, 96),
            raw_bytes: vec![0x89, b'P'],
            is_embedded: true,
        };
        let el = info.into_element();
        assert_eq!(el.content, "Image: image1.png");
        assert_eq!(el.mime_type.as_deref(), Some("image/png"));
        assert_eq!(el.binary_data.as_ref().map(Vec::len), Some(2));
        assert_eq!(el.attributes.get("pixel_height").map(String::as_str), Some("20"));
    }

    #[test]
    fn test_chart_type_guess() {
        assert_eq!(ChartType::from_keyword("Bar"), ChartType::Bar);
        assert_eq!(ChartType::from_keyword("饼图"), ChartType::Pie);
        assert_eq!(ChartType::from_keyword("Figure"), ChartType::Unknown);
        assert_eq!(ChartType::from_plot_name("pie3DChart"), Some(ChartType::Pie));
        assert_eq!(ChartType::from_plot_name("plotArea"), None);
    }

    #[test]
    fn test_chart_into_element() {
        let chart = ChartInfo {
            id: "chart_1_1".into(),
            title: "Sales".into(),
            chart_type: ChartType::Line,
            data_series: vec![DataSeries {
                label: "2024".into(),
                values: vec![1.0, 2.5],
            }],
            ..Default::default()
        };
        let el = chart.into_element();
        assert_eq!(el.content, "Sales");
        assert_eq!(
            el.attributes.get("series_0_values").map(String::as_str),
            Some("1,2.5")
        );
        assert_eq!(el.attributes.get("chart_type").map(String::as_str), Some("line"));
    }
}
