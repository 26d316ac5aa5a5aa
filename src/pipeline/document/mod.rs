//! Document Text/Table Loader.
//!
//! Opens a PDF and yields, per page, the text laid out from glyph positions
//! and the table grids detected in that text. A page that cannot be decoded
//! becomes an empty page; only a document that cannot be opened at all is
//! an error.

pub mod grid;
pub mod layout;
pub mod pdf;
pub mod types;

pub use grid::detect_grids;
pub use pdf::LopdfLoader;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Document has no pages")]
    NoPages,
}
