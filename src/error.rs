//! Structured error types for xlhtml.

/// All errors that can occur while reading a workbook or rendering it to HTML.
#[derive(Debug, thiserror::Error)]
pub enum XlhtmlError {
    /// A measurement was given a non-finite value.
    #[error("invalid {unit} value: {value}")]
    InvalidUnitValue { value: f64, unit: &'static str },

    /// Resolution must be a positive number of dots per inch.
    #[error("invalid dpi: {0}")]
    InvalidDpi(u32),

    /// A declaration value cannot be written as a stable CSS string.
    #[error("unstable style value for `{name}` on element {element}: {reason}")]
    UnstableStyleValue {
        element: String,
        name: String,
        reason: String,
    },

    /// Group identifiers must be usable as CSS class tokens.
    #[error("invalid class prefix: {0:?}")]
    InvalidClassPrefix(String),

    /// Two merge regions share at least one cell.
    #[error("merge region {first} overlaps {second}")]
    OverlappingMergeRegion { first: String, second: String },

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Render options could not be read.
    #[error("options: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid cell reference.
    #[error("Invalid cell reference: {0}")]
    CellRef(String),

    /// General parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Requested sheet does not exist in the workbook.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlhtmlError>;

impl XlhtmlError {
    pub(crate) fn unstable(element: &str, name: &str, reason: impl Into<String>) -> Self {
        Self::UnstableStyleValue {
            element: element.to_string(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
