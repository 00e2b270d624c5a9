//! HTML rendering of parsed sheets.

mod cell_style;
mod html;
mod options;
mod sheet;

pub use cell_style::{border_css, CellStyleSets, CellStyler};
pub use html::{escape_html, HtmlElement, HtmlPage};
pub use options::{PaperMode, RenderOptions};
pub use sheet::{RenderRange, SheetRenderer};
