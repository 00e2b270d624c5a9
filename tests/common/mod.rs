//! Common test utilities and assertion helpers.
//!
//! Helpers here parse fixture workbooks, render them and look up rendered
//! elements by their internal id (`r{row}c{col}`, with `k`/`v` suffixes for
//! the container and value spans).
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

// Re-export fixtures for convenience
pub use super::fixtures::*;

use xlhtml::{HtmlElement, HtmlPage, RenderOptions, Workbook};

// ============================================================================
// Parsing and Rendering
// ============================================================================

/// Parse XLSX bytes, panicking on failure.
#[must_use]
pub fn parse(data: &[u8]) -> Workbook {
    xlhtml::parser::parse(data).expect("Failed to parse XLSX")
}

/// Render the first sheet with the given options.
#[must_use]
pub fn render_first(data: &[u8], options: &RenderOptions) -> HtmlPage {
    xlhtml::render_sheet(data, 0, options).expect("Failed to render sheet")
}

/// Options with style compression off, so declarations stay inline.
#[must_use]
pub fn inline_options() -> RenderOptions {
    RenderOptions::default().with_compress_style(false)
}

// ============================================================================
// Element Lookup
// ============================================================================

/// Every element in the page body, depth first.
#[must_use]
pub fn all_elements(page: &HtmlPage) -> Vec<HtmlElement> {
    let mut found = Vec::new();
    for root in &page.body {
        root.walk(&mut |e| found.push(e.clone()));
    }
    found
}

/// Element with the given internal id.
#[must_use]
pub fn element(page: &HtmlPage, id: &str) -> HtmlElement {
    all_elements(page)
        .into_iter()
        .find(|e| e.id.as_deref() == Some(id))
        .unwrap_or_else(|| panic!("no element with id {id}"))
}

/// The `<td>` for a 0-indexed cell.
#[must_use]
pub fn td(page: &HtmlPage, row: u32, col: u32) -> HtmlElement {
    element(page, &format!("r{row}c{col}"))
}

/// The content container span for a 0-indexed cell.
#[must_use]
pub fn container(page: &HtmlPage, row: u32, col: u32) -> HtmlElement {
    element(page, &format!("r{row}c{col}k"))
}

/// The value span for a 0-indexed cell.
#[must_use]
pub fn value_span(page: &HtmlPage, row: u32, col: u32) -> HtmlElement {
    element(page, &format!("r{row}c{col}v"))
}

/// All `<td>` elements.
#[must_use]
pub fn cells(page: &HtmlPage) -> Vec<HtmlElement> {
    all_elements(page)
        .into_iter()
        .filter(|e| e.tag == "td")
        .collect()
}

/// Number of `<tr>` elements.
#[must_use]
pub fn row_count(page: &HtmlPage) -> usize {
    all_elements(page).iter().filter(|e| e.tag == "tr").count()
}

/// All `<img>` elements.
#[must_use]
pub fn images(page: &HtmlPage) -> Vec<HtmlElement> {
    all_elements(page)
        .into_iter()
        .filter(|e| e.tag == "img")
        .collect()
}

// ============================================================================
// Style Assertions
// ============================================================================

/// Rendered value of an inline declaration.
#[must_use]
pub fn style_of(element: &HtmlElement, name: &str) -> Option<String> {
    element
        .style
        .get(name)
        .map(|v| v.render().expect("unstable style value"))
}

/// Assert an inline declaration has the expected rendered value.
pub fn assert_style(element: &HtmlElement, name: &str, expected: &str) {
    assert_eq!(
        style_of(element, name).as_deref(),
        Some(expected),
        "{name} on {:?}",
        element.id
    );
}

/// Assert the element carries `class`.
pub fn assert_class(element: &HtmlElement, class: &str) {
    assert!(
        element.has_class(class),
        "{:?} lacks class {class}: {:?}",
        element.id,
        element.classes
    );
}

/// Assert the element does not carry `class`.
pub fn assert_no_class(element: &HtmlElement, class: &str) {
    assert!(
        !element.has_class(class),
        "{:?} unexpectedly has class {class}",
        element.id
    );
}

/// Generated classes on an element with the given prefix (e.g. "xc").
#[must_use]
pub fn generated_classes(element: &HtmlElement, prefix: &str) -> Vec<String> {
    let head = format!("{prefix}-");
    element
        .classes
        .iter()
        .filter(|c| c.starts_with(&head))
        .cloned()
        .collect()
}

/// The stylesheet rule for a class, as written.
#[must_use]
pub fn rule_for(page: &HtmlPage, class: &str) -> String {
    let head = format!(".{class} {{");
    page.stylesheet()
        .lines()
        .find(|line| line.starts_with(&head))
        .map(str::to_string)
        .unwrap_or_else(|| panic!("no rule for .{class}"))
}
