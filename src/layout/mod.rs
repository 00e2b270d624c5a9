//! Pixel layout of a rendered cell window.
//!
//! Used to place floating content such as pictures over the table.

mod sheet_layout;

pub use sheet_layout::{PictureRect, SheetLayout};
