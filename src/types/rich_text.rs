use serde::{Deserialize, Serialize};

use super::UnderlineStyle;

/// A run of text inside a rich shared string.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub text: String,
    /// `None` when the run has no `<rPr>` and takes the cell's font.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<RunStyle>,
}

/// Font properties a run sets explicitly. Unset fields fall back to the
/// cell's font.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Size in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<UnderlineStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vert_align: Option<VerticalAlign>,
}

/// Subscript/superscript placement of a run.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Baseline,
    Subscript,
    Superscript,
}

impl VerticalAlign {
    pub fn from_xlsx(value: &str) -> Option<Self> {
        match value {
            "baseline" => Some(Self::Baseline),
            "subscript" => Some(Self::Subscript),
            "superscript" => Some(Self::Superscript),
            _ => None,
        }
    }
}

/// Concatenated text of all runs.
pub fn plain_text(runs: &[TextRun]) -> String {
    let total_len: usize = runs.iter().map(|r| r.text.len()).sum();
    let mut combined = String::with_capacity(total_len);
    for run in runs {
        combined.push_str(&run.text);
    }
    combined
}
