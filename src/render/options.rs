//! Output and page selection options.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};

/// Where the `created` attribute of the XML root comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreatedTimestamp {
    /// Modification time of the source file; repeated runs give the same bytes
    #[default]
    SourceModified,
    /// Wall clock at serialization time
    Now,
    /// A fixed instant
    Fixed(DateTime<Utc>),
}

/// Options for the lossless XML writer.
#[derive(Debug, Clone)]
pub struct XmlOptions {
    /// Spaces per nesting level; 0 writes everything on one line
    pub indent: usize,
    /// Write element binary data as a base64 `BinaryData` child
    pub embed_binary: bool,
    pub created: CreatedTimestamp,
}

impl XmlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_binary(mut self, embed: bool) -> Self {
        self.embed_binary = embed;
        self
    }

    pub fn with_created(mut self, created: CreatedTimestamp) -> Self {
        self.created = created;
        self
    }
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            embed_binary: true,
            created: CreatedTimestamp::SourceModified,
        }
    }
}

/// JSON output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    #[default]
    Pretty,
    Compact,
}

/// Pages to extract (1-indexed). DOCX has a single page and ignores this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    #[default]
    All,
    /// Inclusive range
    Range(RangeInclusive<u32>),
    /// Sorted, deduplicated page list
    Pages(Vec<u32>),
}

impl PageSelection {
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.binary_search(&page).is_ok(),
        }
    }

    /// Parse "all", "3", "2-5" or a list such as "1,3,5-7".
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        let parse_page = |p: &str| -> Result<u32, String> {
            match p.trim().parse::<u32>() {
                Ok(0) => Err("Page numbers start at 1".to_string()),
                Ok(n) => Ok(n),
                Err(_) => Err(format!("Invalid page number: {:?}", p.trim())),
            }
        };
        let parse_range = |part: &str| -> Result<RangeInclusive<u32>, String> {
            match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (parse_page(start)?, parse_page(end)?);
                    if start > end {
                        return Err(format!("Empty page range: {}", part.trim()));
                    }
                    Ok(start..=end)
                }
                None => {
                    let p = parse_page(part)?;
                    Ok(p..=p)
                }
            }
        };

        if !s.contains(',') && s.contains('-') {
            return Ok(PageSelection::Range(parse_range(s)?));
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            pages.extend(parse_range(part)?);
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}
