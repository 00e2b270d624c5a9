//! Data types for the spreadsheet document model.
//!
//! The model is read-only once parsed: rendering only looks things up by
//! row and column index.

mod cell;
mod drawing;
mod page;
mod rich_text;
mod style;
mod workbook;

pub use cell::*;
pub use drawing::*;
pub use page::*;
pub use rich_text::*;
pub use style::*;
pub use workbook::*;
