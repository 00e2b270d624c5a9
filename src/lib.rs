//! xlhtml - render XLSX worksheets as HTML tables
//!
//! Reads a workbook and turns each sheet into a self-contained HTML page:
//! - Cell fonts, fills, borders and alignment as CSS
//! - Number formats, dates and rich text runs
//! - Merged cells with anchor/trailing border composition
//! - Identical style sets collapsed into shared classes
//! - Optional single-page print window estimated from paper size and margins
//! - Floating pictures as inline `data:` images
//!
//! # Usage
//!
//! ```no_run
//! let data = std::fs::read("book.xlsx").unwrap();
//! let pages = xlhtml::render_workbook(&data, &xlhtml::RenderOptions::default()).unwrap();
//! for page in pages {
//!     println!("{}", page.to_html().unwrap());
//! }
//! ```

pub mod cell_ref;
pub mod color;
pub mod css;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod numfmt;
pub mod pagination;
pub mod parser;
pub mod render;
pub mod types;
pub mod units;
pub mod xml_helpers;

pub use css::{deduplicate, CanonicalKey, CompactStyles, StyleDeclarations, StyleDeduplicator, StyleValue};
pub use error::{Result, XlhtmlError};
pub use geometry::{CellGeometry, CellGeometryResolver, GridMetrics, MergeRegion, MergedExtent};
pub use pagination::{estimate_page_cut, PageBoundaryEstimator, PageCut, PaperSize};
pub use render::{HtmlElement, HtmlPage, PaperMode, RenderOptions, SheetRenderer};
pub use types::*;
pub use units::{Measurement, Unit, UnitConverter};

/// Parse an XLSX file and render every sheet.
///
/// # Errors
/// Fails if the archive or its workbook parts cannot be read, or if the
/// options are invalid.
pub fn render_workbook(data: &[u8], options: &RenderOptions) -> Result<Vec<HtmlPage>> {
    // Validate before doing any parsing work.
    options.converter()?;
    let workbook = parser::parse_with(data, options.load_pictures)?;
    SheetRenderer::new(&workbook, options).render_all()
}

/// Parse an XLSX file and render one sheet by index.
///
/// # Errors
/// Fails like [`render_workbook`], or with [`XlhtmlError::SheetNotFound`].
pub fn render_sheet(data: &[u8], sheet_index: usize, options: &RenderOptions) -> Result<HtmlPage> {
    options.converter()?;
    let workbook = parser::parse_with(data, options.load_pictures)?;
    SheetRenderer::new(&workbook, options).render(sheet_index)
}
