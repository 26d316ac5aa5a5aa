use std::path::Path;

use lopdf::{Document, ObjectId};

use super::layout;
use super::types::{DocumentLoader, Page, SourceDocument};
use super::LoadError;

/// PDF loader backed by lopdf.
/// Handles digital PDFs with embedded text layers.
pub struct LopdfLoader;

impl DocumentLoader for LopdfLoader {
    fn load(&self, path: &Path) -> Result<SourceDocument, LoadError> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.load_bytes(&filename, &bytes)
    }
}

impl LopdfLoader {
    pub fn load_bytes(&self, filename: &str, bytes: &[u8]) -> Result<SourceDocument, LoadError> {
        let doc =
            Document::load_mem(bytes).map_err(|e| LoadError::PdfParsing(e.to_string()))?;

        let page_ids = doc.get_pages();
        if page_ids.is_empty() {
            return Err(LoadError::NoPages);
        }

        let pages = page_ids
            .into_iter()
            .map(|(number, page_id)| Page::from_text(number as usize, page_text(&doc, number, page_id)))
            .collect();

        Ok(SourceDocument::new(filename, pages))
    }
}

/// Positioned layout first, lopdf's plain extraction when the content
/// stream cannot be walked, an empty page when neither works.
fn page_text(doc: &Document, number: u32, page_id: ObjectId) -> String {
    match layout::page_text(doc, page_id) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(page = number, error = %e, "Positioned layout failed, using plain extraction");
            doc.extract_text(&[number]).unwrap_or_else(|e| {
                tracing::warn!(
                    page = number,
                    error = %e,
                    "Page text unreadable, continuing with an empty page"
                );
                String::new()
            })
        }
    }
}
