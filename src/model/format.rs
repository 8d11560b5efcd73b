//! Character and paragraph formatting.

use serde::{Deserialize, Serialize};

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// Map an OOXML `w:jc` value.
    pub fn from_ooxml(value: &str) -> Option<Self> {
        match value {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "both" | "distribute" | "justify" => Some(Alignment::Justify),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            "justify" => Some(Alignment::Justify),
            _ => None,
        }
    }
}

/// Formatting carried by every element.
///
/// Indents are in layout pixels; spacing is a multiple of the line height
/// (`line_spacing`) or points (`paragraph_spacing`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    /// Font size in points
    pub font_size: f32,
    pub font_family: String,
    pub alignment: Alignment,
    pub line_spacing: f32,
    pub paragraph_spacing: f32,
    pub left_indent: i32,
    pub right_indent: i32,
    pub first_line_indent: i32,
}

impl Default for FormatInfo {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            font_size: 12.0,
            font_family: String::new(),
            alignment: Alignment::Left,
            line_spacing: 1.0,
            paragraph_spacing: 0.0,
            left_indent: 0,
            right_indent: 0,
            first_line_indent: 0,
        }
    }
}

/// Run-level properties as they appear in the source, `None` when unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub font_size: Option<f32>,
    pub font_family: Option<String>,
}

impl RunFormat {
    pub fn is_empty(&self) -> bool {
        *self == RunFormat::default()
    }
}

impl FormatInfo {
    /// Overlay the explicitly set run properties.
    pub fn apply_run(&mut self, run: &RunFormat) {
        if let Some(v) = run.bold {
            self.bold = v;
        }
        if let Some(v) = run.italic {
            self.italic = v;
        }
        if let Some(v) = run.underline {
            self.underline = v;
        }
        if let Some(v) = run.strikethrough {
            self.strikethrough = v;
        }
        if let Some(v) = run.font_size {
            self.font_size = v;
        }
        if let Some(ref v) = run.font_family {
            self.font_family = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let f = FormatInfo::default();
        assert_eq!(f.font_size, 12.0);
        assert_eq!(f.line_spacing, 1.0);
        assert_eq!(f.alignment, Alignment::Left);
        assert!(!f.bold);
    }

    #[test]
    fn test_alignment_mapping() {
        assert_eq!(Alignment::from_ooxml("both"), Some(Alignment::Justify));
        assert_eq!(Alignment::from_ooxml("end"), Some(Alignment::Right));
        assert_eq!(Alignment::from_ooxml("bogus"), None);
        assert_eq!(Alignment::parse(Alignment::Center.as_str()), Some(Alignment::Center));
    }

    #[test]
    fn test_apply_run() {
        let mut f = FormatInfo::default();
        let run = RunFormat {
            bold: Some(true),
            font_size: Some(14.0),
            ..Default::default()
        };
        f.apply_run(&run);
        assert!(f.bold);
        assert!(!f.italic);
        assert_eq!(f.font_size, 14.0);
        assert!(RunFormat::default().is_empty());
        assert!(!run.is_empty());
    }
}
