use serde::{Deserialize, Serialize};

/// A cell-relative drawing anchor point. Offsets are in EMU.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPoint {
    pub col: u32,
    pub col_off: f64,
    pub row: u32,
    pub row_off: f64,
}

/// A picture placed on a sheet.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    pub from: AnchorPoint,
    /// Bottom-right corner for two-cell anchors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<AnchorPoint>,
    /// Explicit (cx, cy) size in EMU for one-cell anchors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mime_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}
