//! Tests for merged-cell rendering.
//!
//! XLSX merge cell format:
//! ```xml
//! <mergeCells count="1">
//!   <mergeCell ref="A1:B2"/>
//! </mergeCells>
//! ```
//!
//! A merge renders as one visible anchor `<td>` with `rowspan`/`colspan`
//! plus hidden covered cells for the rest of the region.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use common::{
    assert_class, assert_no_class, assert_style, cells, container, generated_classes,
    inline_options, render_first, row_count, td,
};
use fixtures::{SheetBuilder, StyleBuilder, XlsxBuilder};
use xlhtml::{CellGeometryResolver, MergeRegion, RenderOptions, Unit};

fn merged(range: &str) -> Vec<u8> {
    XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .cell("A1", "Merged Header", None)
                .merge(range),
        )
        .build()
}

// ============================================================================
// ANCHOR AND COVERED CELLS
// ============================================================================

#[test]
fn test_simple_2x2_merge() {
    let page = render_first(&merged("A1:B2"), &inline_options());

    let anchor = td(&page, 0, 0);
    assert_class(&anchor, "merged-cell");
    assert_no_class(&anchor, "merged-display-cell");
    assert_eq!(anchor.attr("rowspan"), Some("2"));
    assert_eq!(anchor.attr("colspan"), Some("2"));

    for (row, col) in [(0, 1), (1, 0), (1, 1)] {
        let covered = td(&page, row, col);
        assert_class(&covered, "merged-display-cell");
        assert_no_class(&covered, "merged-cell");
        assert_eq!(covered.attr("rowspan"), None);
    }
}

#[test]
fn test_horizontal_merge_has_colspan_only() {
    let page = render_first(&merged("A1:C1"), &inline_options());

    let anchor = td(&page, 0, 0);
    assert_eq!(anchor.attr("colspan"), Some("3"));
    assert_eq!(anchor.attr("rowspan"), None);
    assert_eq!(row_count(&page), 1);
}

#[test]
fn test_vertical_merge_has_rowspan_only() {
    let page = render_first(&merged("A1:A4"), &inline_options());

    let anchor = td(&page, 0, 0);
    assert_eq!(anchor.attr("rowspan"), Some("4"));
    assert_eq!(anchor.attr("colspan"), None);
    // The merge extends the rendered extent past the last populated row.
    assert_eq!(row_count(&page), 4);
}

#[test]
fn test_covered_cells_are_still_emitted() {
    let page = render_first(&merged("A1:B2"), &inline_options());
    assert_eq!(cells(&page).len(), 4);

    let html = page.body_html().unwrap();
    assert_eq!(html.matches("merged-display-cell").count(), 3);
    assert!(html.contains(r#"rowspan="2" colspan="2""#));
}

#[test]
fn test_anchor_outside_window_leaves_covered_cells() {
    let xlsx = merged("A1:B3");
    let options = inline_options().with_rows(1, 2);
    let page = render_first(&xlsx, &options);

    assert!(cells(&page).iter().all(|c| c.has_class("merged-display-cell")));
}

// ============================================================================
// HEIGHTS
// ============================================================================

#[test]
fn test_merged_height_spans_rows() {
    let page = render_first(&merged("A1:B2"), &inline_options());

    assert_style(&td(&page, 0, 0), "height", "30.00pt");
    let inner = container(&page, 0, 0);
    assert_style(&inner, "height", "27.75pt");
    assert_style(&inner, "min-height", "27.75pt");
    assert_style(&inner, "max-height", "27.75pt");
}

#[test]
fn test_merged_height_uses_explicit_row_heights() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .cell("A1", "tall", None)
                .row_height(2, 30.0)
                .merge("A1:A3"),
        )
        .build();
    let page = render_first(&xlsx, &inline_options());

    assert_style(&td(&page, 0, 0), "height", "60.00pt");
    assert_style(&container(&page, 0, 0), "height", "57.75pt");
    // Covered cells keep their own row height.
    assert_style(&td(&page, 1, 0), "height", "30.00pt");
}

#[test]
fn test_merged_height_in_pixels() {
    let options = inline_options().with_unit(Unit::Pixel);
    let page = render_first(&merged("A1:B2"), &options);

    assert_style(&td(&page, 0, 0), "height", "40.00px");
    assert_style(&container(&page, 0, 0), "height", "37.00px");
}

#[test]
fn test_content_inset_is_configurable() {
    let options = inline_options().with_content_inset_px(0.0);
    let page = render_first(&merged("A1:B2"), &options);

    assert_style(&container(&page, 0, 0), "height", "30.00pt");
}

// ============================================================================
// BORDER COMPOSITION
// ============================================================================

#[test]
fn test_trailing_cell_supplies_closing_borders() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .cell(
                    "A1",
                    "Boxed",
                    Some(StyleBuilder::new().border_all("thin", Some("#FF0000"))),
                )
                .styled_cell("B2", StyleBuilder::new().border_all("medium", Some("#0000FF")))
                .merge("A1:B2"),
        )
        .build();
    let page = render_first(&xlsx, &inline_options());

    let anchor = td(&page, 0, 0);
    assert_style(&anchor, "border-top", "1px solid rgb(255, 0, 0)");
    assert_style(&anchor, "border-left", "1px solid rgb(255, 0, 0)");
    assert_style(&anchor, "border-right", "2px solid rgb(0, 0, 255)");
    assert_style(&anchor, "border-bottom", "2px solid rgb(0, 0, 255)");
}

#[test]
fn test_missing_trailing_cell_keeps_anchor_borders() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .cell(
                    "A1",
                    "Boxed",
                    Some(StyleBuilder::new().border_all("thin", None)),
                )
                .merge("A1:C3"),
        )
        .build();
    let page = render_first(&xlsx, &inline_options());

    let anchor = td(&page, 0, 0);
    assert_style(&anchor, "border-right", "1px solid black");
    assert_style(&anchor, "border-bottom", "1px solid black");
}

#[test]
fn test_trailing_cell_without_borders_clears_anchor_edges() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .cell(
                    "A1",
                    "Boxed",
                    Some(StyleBuilder::new().border_all("thin", None)),
                )
                .styled_cell("B1", StyleBuilder::new().bold())
                .merge("A1:B1"),
        )
        .build();
    let page = render_first(&xlsx, &inline_options());

    let anchor = td(&page, 0, 0);
    assert_style(&anchor, "border-left", "1px solid black");
    assert_style(&anchor, "border-right", "none");
    assert_style(&anchor, "border-bottom", "none");
}

// ============================================================================
// COMPRESSION
// ============================================================================

#[test]
fn test_merged_anchor_gets_its_own_class() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .cell("A1", "merged", None)
                .cell("C1", "plain", None)
                .merge("A1:B2"),
        )
        .build();
    let page = render_first(&xlsx, &RenderOptions::default());

    let anchor = generated_classes(&td(&page, 0, 0), "xc");
    let plain = generated_classes(&td(&page, 0, 2), "xc");
    let covered = generated_classes(&td(&page, 0, 1), "xc");
    assert_eq!(anchor.len(), 1);
    assert_ne!(anchor, plain);
    assert_eq!(covered, plain);
}

// ============================================================================
// RESOLVER API
// ============================================================================

#[test]
fn test_resolver_roles() {
    let merges = [MergeRegion::parse("B2:C4").unwrap()];
    let resolver = CellGeometryResolver::new(&merges);

    let anchor = resolver.resolve(1, 1);
    assert!(anchor.is_anchor());
    assert_eq!((anchor.row_span, anchor.col_span), (3, 2));

    let covered = resolver.resolve(3, 2);
    assert!(covered.is_covered());
    assert_eq!((covered.row_span, covered.col_span), (1, 1));

    let outside = resolver.resolve(0, 0);
    assert!(!outside.is_anchor() && !outside.is_covered());
    assert!(outside.span_attributes().is_empty());
}
