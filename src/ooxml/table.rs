//! Accumulates `w:tbl` content into a cell matrix.

use crate::model::TableInfo;
use crate::units::twips_to_pixels;

/// State of one open table. Nested tables get their own accumulator.
#[derive(Debug, Default)]
pub(crate) struct TableAccumulator {
    rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<Vec<String>>,
    grid_width_twips: i64,
}

impl TableAccumulator {
    pub fn start_row(&mut self) {
        self.row = Some(Vec::new());
    }

    pub fn end_row(&mut self) {
        if let Some(row) = self.row.take() {
            self.rows.push(row);
        }
    }

    pub fn start_cell(&mut self) {
        self.cell = Some(Vec::new());
    }

    pub fn end_cell(&mut self) {
        if let Some(paragraphs) = self.cell.take() {
            let text = paragraphs.join("\n");
            self.row.get_or_insert_with(Vec::new).push(text);
        }
    }

    pub fn in_cell(&self) -> bool {
        self.cell.is_some()
    }

    /// Add one paragraph's text to the open cell. Empty paragraphs are dropped.
    pub fn push_paragraph(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        if let Some(cell) = self.cell.as_mut() {
            cell.push(text.to_string());
        }
    }

    pub fn add_grid_column(&mut self, width_twips: i64) {
        self.grid_width_twips += width_twips.max(0);
    }

    /// Close the table. Tables without rows carry nothing and yield `None`.
    pub fn finish(mut self, id: String) -> Option<TableInfo> {
        self.end_cell();
        self.end_row();
        if self.rows.is_empty() {
            return None;
        }
        Some(TableInfo::from_rows(id, self.rows))
    }

    pub fn grid_width_pixels(&self) -> i32 {
        twips_to_pixels(self.grid_width_twips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_join_paragraphs() {
        let mut t = TableAccumulator::default();
        t.start_row();
        t.start_cell();
        t.push_paragraph("line one");
        t.push_paragraph("");
        t.push_paragraph("line two");
        t.end_cell();
        t.start_cell();
        t.end_cell();
        t.end_row();
        t.start_row();
        t.start_cell();
        t.push_paragraph("x");
        t.end_cell();
        t.end_row();

        let info = t.finish("table_1_1".into()).unwrap();
        assert_eq!(info.row_count, 2);
        assert_eq!(info.column_count, 2);
        assert_eq!(info.cells[0][0].text, "line one\nline two");
        assert_eq!(info.cells[0][1].text, "");
        assert_eq!(info.cells[1].len(), 1);
    }

    #[test]
    fn test_empty_table() {
        assert!(TableAccumulator::default().finish("t".into()).is_none());
    }

    #[test]
    fn test_grid_width() {
        let mut t = TableAccumulator::default();
        t.add_grid_column(1440);
        t.add_grid_column(720);
        assert_eq!(t.grid_width_pixels(), 144);
    }
}
