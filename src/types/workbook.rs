use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Cell, CellStyle, Font, PageMargins, PageSetup, Picture};
use crate::geometry::{GridMetrics, MergeRegion};
use crate::units::{column_chars_to_px, digit_width_for_font};

/// Font used when a workbook declares none.
pub const FALLBACK_FONT_NAME: &str = "Calibri";
/// Size in points of the fallback font.
pub const FALLBACK_FONT_SIZE: f64 = 11.0;
/// Row height in points when `sheetFormatPr` gives none.
pub const DEFAULT_ROW_HEIGHT_PT: f64 = 15.0;
/// Column width in pixels when `sheetFormatPr` gives none.
pub const DEFAULT_COL_WIDTH_PX: f64 = 64.0;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
    pub styles: Vec<CellStyle>,
    /// Font of the `Normal` style (first font in styles.xml).
    pub default_font: Font,
    /// Date serials count from 1904-01-01 instead of 1900-01-00.
    #[serde(default)]
    pub date1904: bool,
}

impl Workbook {
    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn style(&self, index: u32) -> Option<&CellStyle> {
        self.styles.get(usize::try_from(index).ok()?)
    }

    pub fn default_font_name(&self) -> &str {
        self.default_font
            .name
            .as_deref()
            .unwrap_or(FALLBACK_FONT_NAME)
    }

    pub fn default_font_size(&self) -> f64 {
        self.default_font.size.unwrap_or(FALLBACK_FONT_SIZE)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// Explicit height in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub cells: BTreeMap<u32, Cell>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub name: String,
    pub rows: BTreeMap<u32, Row>,
    /// Explicit column widths in characters.
    pub col_widths: BTreeMap<u32, f64>,
    pub default_row_height: f64,
    pub default_col_width_px: f64,
    /// Maximum digit width of the default font, in pixels.
    pub digit_width: f64,
    pub merges: Vec<MergeRegion>,
    pub page_margins: PageMargins,
    pub page_setup: PageSetup,
    pub pictures: Vec<Picture>,
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
            col_widths: BTreeMap::new(),
            default_row_height: DEFAULT_ROW_HEIGHT_PT,
            default_col_width_px: DEFAULT_COL_WIDTH_PX,
            digit_width: digit_width_for_font(FALLBACK_FONT_NAME),
            merges: Vec::new(),
            page_margins: PageMargins::default(),
            page_setup: PageSetup::default(),
            pictures: Vec::new(),
        }
    }

    pub fn row(&self, row: u32) -> Option<&Row> {
        self.rows.get(&row)
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.rows.get(&row)?.cells.get(&col)
    }

    /// Number of rows up to and including the last populated or merged row.
    pub fn row_count(&self) -> u32 {
        let rows = self.rows.keys().next_back().map_or(0, |r| r.saturating_add(1));
        let merged = self.merges.iter().map(|m| m.last_row.saturating_add(1)).max().unwrap_or(0);
        rows.max(merged)
    }

    /// Number of columns up to and including the last populated or merged
    /// column.
    pub fn col_count(&self) -> u32 {
        let cells = self
            .rows
            .values()
            .filter_map(|r| r.cells.keys().next_back())
            .map(|c| c.saturating_add(1))
            .max()
            .unwrap_or(0);
        let merged = self.merges.iter().map(|m| m.last_col.saturating_add(1)).max().unwrap_or(0);
        cells.max(merged)
    }
}

impl GridMetrics for Sheet {
    fn row_height_pt(&self, row: u32) -> f64 {
        self.rows
            .get(&row)
            .and_then(|r| r.height)
            .unwrap_or(self.default_row_height)
    }

    fn column_width_px(&self, col: u32) -> f64 {
        self.col_widths
            .get(&col)
            .map_or(self.default_col_width_px, |&chars| {
                column_chars_to_px(chars, self.digit_width)
            })
    }
}
