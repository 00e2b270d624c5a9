//! Render configuration.

use serde::{Deserialize, Serialize};

use crate::css::validate_class_prefix;
use crate::error::Result;
use crate::pagination::PaperSize;
use crate::types::Orientation;
use crate::units::{Unit, UnitConverter, DEFAULT_DPI};
use crate::geometry::MERGED_CONTENT_INSET_PX;

/// Limit the rendered range to what fits the first printed page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaperMode {
    /// Paper to fit; `None` uses the sheet's own `pageSetup` (A4 when unset).
    pub size: Option<PaperSize>,
    /// Orientation override; `None` uses the sheet's own `pageSetup`.
    pub orientation: Option<Orientation>,
}

/// Options for [`SheetRenderer`](super::SheetRenderer).
///
/// All fields have defaults, so a JSON config only needs the keys it changes:
///
/// ```
/// let opts = xlhtml::RenderOptions::from_json_str(r#"{"unit": "px", "compressStyle": false}"#).unwrap();
/// assert!(!opts.compress_style);
/// assert_eq!(opts.dpi, 96);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    pub dpi: u32,
    /// Unit for emitted row heights.
    pub unit: Unit,
    /// Replace inline styles with deduplicated classes.
    pub compress_style: bool,
    pub load_pictures: bool,
    pub paper: Option<PaperMode>,
    /// Inclusive 0-indexed bounds; `None` means the sheet's extent.
    pub start_row: Option<u32>,
    pub end_row: Option<u32>,
    pub start_col: Option<u32>,
    pub end_col: Option<u32>,
    /// Pixels subtracted from each content container's height.
    pub content_inset_px: f64,
    pub cell_class_prefix: String,
    pub container_class_prefix: String,
    pub value_class_prefix: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            unit: Unit::Point,
            compress_style: true,
            load_pictures: true,
            paper: None,
            start_row: None,
            end_row: None,
            start_col: None,
            end_col: None,
            content_inset_px: MERGED_CONTENT_INSET_PX,
            cell_class_prefix: "xc".to_string(),
            container_class_prefix: "xk".to_string(),
            value_class_prefix: "xv".to_string(),
        }
    }
}

impl RenderOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    #[must_use]
    pub fn with_compress_style(mut self, compress: bool) -> Self {
        self.compress_style = compress;
        self
    }

    #[must_use]
    pub fn with_load_pictures(mut self, load: bool) -> Self {
        self.load_pictures = load;
        self
    }

    #[must_use]
    pub fn with_paper(mut self, paper: PaperMode) -> Self {
        self.paper = Some(paper);
        self
    }

    #[must_use]
    pub fn with_rows(mut self, start: u32, end: u32) -> Self {
        self.start_row = Some(start);
        self.end_row = Some(end);
        self
    }

    #[must_use]
    pub fn with_cols(mut self, start: u32, end: u32) -> Self {
        self.start_col = Some(start);
        self.end_col = Some(end);
        self
    }

    #[must_use]
    pub fn with_content_inset_px(mut self, inset: f64) -> Self {
        self.content_inset_px = inset;
        self
    }

    /// Check the fields that serde cannot and build the unit converter.
    pub fn converter(&self) -> Result<UnitConverter> {
        for prefix in [
            &self.cell_class_prefix,
            &self.container_class_prefix,
            &self.value_class_prefix,
        ] {
            validate_class_prefix(prefix)?;
        }
        UnitConverter::new(self.dpi, self.unit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults() {
        let opts = RenderOptions::from_json_str("{}").unwrap();
        assert_eq!(opts, RenderOptions::default());
        assert_eq!(opts.content_inset_px, 3.0);
    }

    #[test]
    fn json_paper_mode() {
        let opts = RenderOptions::from_json_str(
            r#"{"paper": {"size": "letter", "orientation": "landscape"}, "startRow": 2}"#,
        )
        .unwrap();
        let paper = opts.paper.unwrap();
        assert_eq!(paper.size, Some(PaperSize::Letter));
        assert_eq!(paper.orientation, Some(Orientation::Landscape));
        assert_eq!(opts.start_row, Some(2));
    }

    #[test]
    fn unknown_unit_is_an_error() {
        assert!(RenderOptions::from_json_str(r#"{"unit": "furlong"}"#).is_err());
    }

    #[test]
    fn converter_validates() {
        assert!(RenderOptions::default().with_dpi(0).converter().is_err());
        let bad = RenderOptions {
            value_class_prefix: "9x".into(),
            ..RenderOptions::default()
        };
        assert!(bad.converter().is_err());
        let conv = RenderOptions::default()
            .with_unit(Unit::Pixel)
            .converter()
            .unwrap();
        assert_eq!(conv.output(), Unit::Pixel);
    }
}
