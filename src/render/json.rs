//! JSON projection of an element list.

use crate::error::{Error, Result};
use crate::model::DocumentElement;
use crate::relate::canonical_cmp;

use super::JsonFormat;

/// Serialize elements in canonical order.
pub fn to_json(elements: &[DocumentElement], format: JsonFormat) -> Result<String> {
    let mut ordered: Vec<&DocumentElement> = elements.iter().collect();
    ordered.sort_by(|a, b| canonical_cmp(a, b));

    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(&ordered),
        JsonFormat::Compact => serde_json::to_string(&ordered),
    };

    result.map_err(|e| Error::Write(format!("JSON serialization error: {}", e)))
}
