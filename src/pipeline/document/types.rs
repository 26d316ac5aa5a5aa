use std::path::Path;

use super::grid::detect_grids;
use super::LoadError;

/// One table cell. `None` when the row ends before the column starts.
pub type Cell = Option<String>;

/// A table detected in page text: rows of cells, header first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableGrid {
    pub rows: Vec<Vec<Cell>>,
}

impl TableGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn header(&self) -> Option<&[Cell]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Every row after the header.
    pub fn data_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().skip(1).map(Vec::as_slice)
    }

    /// Cell text, `None` for missing rows, columns and null cells.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }
}

/// One page of extracted content.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub text: String,
    pub tables: Vec<TableGrid>,
}

impl Page {
    /// Build a page and detect its tables from the text.
    pub fn from_text(number: usize, text: String) -> Self {
        let tables = detect_grids(&text);
        Self {
            number,
            text,
            tables,
        }
    }
}

/// A loaded document. Owned by the extraction call that loaded it.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub filename: String,
    pub pages: Vec<Page>,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            filename: filename.into(),
            pages,
        }
    }

    /// Build from raw page texts.
    pub fn from_pages<S: AsRef<str>>(filename: impl Into<String>, pages: &[S]) -> Self {
        let pages = pages
            .iter()
            .enumerate()
            .map(|(i, text)| Page::from_text(i + 1, text.as_ref().to_string()))
            .collect();
        Self::new(filename, pages)
    }

    /// All page texts joined by newlines.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Loads a file into a `SourceDocument` (trait allows mocking for tests).
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<SourceDocument, LoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_text_joins_pages() {
        let doc = SourceDocument::from_pages("a.pdf", &["first", "second"]);
        assert_eq!(doc.full_text(), "first\nsecond");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].number, 2);
    }

    #[test]
    fn cell_access_handles_missing() {
        let grid = TableGrid::new(vec![
            vec![Some("A".into()), Some("B".into())],
            vec![Some("1".into()), None],
        ]);
        assert_eq!(grid.cell(0, 1), Some("B"));
        assert_eq!(grid.cell(1, 1), None);
        assert_eq!(grid.cell(5, 0), None);
        assert_eq!(grid.data_rows().count(), 1);
    }

    #[test]
    fn empty_grid_has_no_header() {
        assert!(TableGrid::default().header().is_none());
    }
}
