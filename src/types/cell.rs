use serde::{Deserialize, Serialize};

use super::rich_text::{plain_text, TextRun};
use crate::numfmt::format_general;

/// A cell's stored value.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    /// Shared string made of separately formatted runs.
    RichText(Vec<TextRun>),
    Number(f64),
    Boolean(bool),
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::RichText(runs) => runs.iter().all(|r| r.text.is_empty()),
            _ => false,
        }
    }

    /// Text shown in the cell.
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) | Self::Error(s) => s.clone(),
            Self::RichText(runs) => plain_text(runs),
            Self::Number(n) => format_general(*n),
            Self::Boolean(true) => "TRUE".to_string(),
            Self::Boolean(false) => "FALSE".to_string(),
        }
    }
}

/// A single cell: its value and an index into the workbook's styles.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub value: CellValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<u32>,
}
