//! Tests for reading workbooks into the document model.
//!
//! Each test builds an XLSX in memory with the fixture builders, parses it
//! and checks the resulting `Workbook`.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use common::parse;
use fixtures::{BorderSide, SheetBuilder, StyleBuilder, XlsxBuilder, TINY_PNG};
use test_case::test_case;
use xlhtml::{
    BorderStyle, CellValue, GridMetrics, HAlign, MergeRegion, Orientation, VAlign, VerticalAlign,
    XlhtmlError,
};

// ============================================================================
// CELL VALUES
// ============================================================================

#[test]
fn test_cell_value_kinds() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Values")
                .cell("A1", "shared", None)
                .cell("B1", 12.5, None)
                .cell("C1", true, None)
                .cell("D1", fixtures::CellValue::Error("#DIV/0!".into()), None)
                .cell("E1", fixtures::CellValue::InlineString("inline".into()), None),
        )
        .build();

    let wb = parse(&xlsx);
    let sheet = &wb.sheets[0];
    assert_eq!(sheet.name, "Values");
    assert_eq!(sheet.cell(0, 0).unwrap().value, CellValue::Text("shared".into()));
    assert_eq!(sheet.cell(0, 1).unwrap().value, CellValue::Number(12.5));
    assert_eq!(sheet.cell(0, 2).unwrap().value, CellValue::Boolean(true));
    assert_eq!(sheet.cell(0, 3).unwrap().value, CellValue::Error("#DIV/0!".into()));
    assert_eq!(sheet.cell(0, 4).unwrap().value, CellValue::Text("inline".into()));
}

#[test]
fn test_sheet_order_and_names() {
    let xlsx = XlsxBuilder::new()
        .add_sheet("First")
        .add_cell("A1", 1, None)
        .done()
        .add_sheet("Second & More")
        .add_cell("A1", 2, None)
        .build();

    let wb = parse(&xlsx);
    assert_eq!(wb.sheets.len(), 2);
    assert_eq!(wb.sheets[0].name, "First");
    assert_eq!(wb.sheets[1].name, "Second & More");
    assert!(wb.sheet_by_name("Second & More").is_some());
}

#[test]
fn test_garbage_input_is_an_error() {
    let err = xlhtml::parser::parse(b"not a zip archive").unwrap_err();
    assert!(matches!(err, XlhtmlError::Zip(_)), "{err:?}");
}

// ============================================================================
// STYLES
// ============================================================================

#[test]
fn test_font_fill_and_alignment() {
    let style = StyleBuilder::new()
        .font_name("Arial")
        .font_size(14.0)
        .font_color("#0000FF")
        .bold()
        .italic()
        .underline()
        .bg_color("#FFFF00")
        .align_horizontal("center")
        .align_vertical("top")
        .wrap_text()
        .build();
    let xlsx = fixtures::xlsx_with_styled_cell("styled", style);

    let wb = parse(&xlsx);
    let index = wb.sheets[0].cell(0, 0).unwrap().style.unwrap();
    let style = wb.style(index).unwrap();

    assert_eq!(style.font.name.as_deref(), Some("Arial"));
    assert_eq!(style.font.size, Some(14.0));
    assert_eq!(style.font.color.as_deref(), Some("#0000FF"));
    assert!(style.font.bold);
    assert!(style.font.italic);
    assert!(style.font.underline.is_some());
    assert_eq!(style.bg_color.as_deref(), Some("#FFFF00"));
    assert_eq!(style.align_h, Some(HAlign::Center));
    assert_eq!(style.align_v, Some(VAlign::Top));
    assert!(style.wrap);
}

#[test]
fn test_non_solid_pattern_has_no_background() {
    let style = StyleBuilder::new().bg_color("#FF0000").pattern("gray125");
    let xlsx = fixtures::xlsx_with_styled_cell("x", style);

    let wb = parse(&xlsx);
    let index = wb.sheets[0].cell(0, 0).unwrap().style.unwrap();
    assert_eq!(wb.style(index).unwrap().bg_color, None);
}

#[test_case("thin" => BorderStyle::Thin)]
#[test_case("medium" => BorderStyle::Medium)]
#[test_case("thick" => BorderStyle::Thick)]
#[test_case("double" => BorderStyle::Double)]
#[test_case("dashed" => BorderStyle::Dashed)]
#[test_case("dotted" => BorderStyle::Dotted)]
#[test_case("hair" => BorderStyle::Hair)]
fn test_border_styles(name: &str) -> BorderStyle {
    let style = StyleBuilder::new().border_all(name, Some("#00FF00"));
    let xlsx = fixtures::xlsx_with_styled_cell("b", style);

    let wb = parse(&xlsx);
    let index = wb.sheets[0].cell(0, 0).unwrap().style.unwrap();
    let style = wb.style(index).unwrap();
    let top = style.border_top.as_ref().unwrap();
    assert_eq!(top.color.as_deref(), Some("#00FF00"));
    assert_eq!(style.border_left.as_ref().unwrap().style, top.style);
    top.style
}

#[test]
fn test_single_border_side() {
    let style = StyleBuilder::new().border_bottom(BorderSide::new("medium"));
    let xlsx = fixtures::xlsx_with_styled_cell("b", style);

    let wb = parse(&xlsx);
    let index = wb.sheets[0].cell(0, 0).unwrap().style.unwrap();
    let style = wb.style(index).unwrap();
    assert!(style.border_top.is_none());
    assert_eq!(style.border_bottom.as_ref().unwrap().style, BorderStyle::Medium);
}

#[test]
fn test_default_font_comes_from_first_font() {
    let xlsx = XlsxBuilder::new()
        .default_font("Verdana", 10.0)
        .add_sheet("S")
        .add_cell("A1", "x", None)
        .build();

    let wb = parse(&xlsx);
    assert_eq!(wb.default_font_name(), "Verdana");
    assert_eq!(wb.default_font_size(), 10.0);
}

// ============================================================================
// NUMBER FORMATS AND RICH TEXT
// ============================================================================

#[test]
fn test_number_formats_resolve_to_codes() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .cell("A1", 45000.0, Some(StyleBuilder::new().number_format_id(14)))
                .cell("B1", 0.5, Some(StyleBuilder::new().number_format("0.0%")))
                .cell("C1", 1.0, Some(StyleBuilder::new().bold())),
        )
        .build();

    let wb = parse(&xlsx);
    let style = |col: u32| {
        let index = wb.sheets[0].cell(0, col).unwrap().style.unwrap();
        wb.style(index).unwrap().clone()
    };
    assert_eq!(style(0).num_fmt_id, 14);
    assert_eq!(style(0).number_format.as_deref(), Some("mm-dd-yy"));
    assert_eq!(style(1).num_fmt_id, 164);
    assert_eq!(style(1).number_format.as_deref(), Some("0.0%"));
    assert!(style(2).number_format.is_none());
    assert!(!wb.date1904);
}

#[test]
fn test_date1904_flag() {
    let xlsx = XlsxBuilder::new()
        .date1904()
        .sheet(SheetBuilder::new("S").cell("A1", 1.0, None))
        .build();
    assert!(parse(&xlsx).date1904);
}

#[test]
fn test_rich_shared_string_runs() {
    let runs = vec![
        fixtures::Run::plain("E = mc"),
        fixtures::Run::styled("2").superscript().bold().color("#FF0000"),
    ];
    let xlsx = XlsxBuilder::new()
        .sheet(SheetBuilder::new("S").cell("A1", runs, None).cell("A2", "plain", None))
        .build();

    let wb = parse(&xlsx);
    let sheet = &wb.sheets[0];
    let CellValue::RichText(parsed) = &sheet.cell(0, 0).unwrap().value else {
        panic!("expected rich text");
    };
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].text, "E = mc");
    assert!(parsed[0].style.is_none());
    let sup = parsed[1].style.as_ref().unwrap();
    assert_eq!(sup.vert_align, Some(VerticalAlign::Superscript));
    assert_eq!(sup.bold, Some(true));
    assert_eq!(sup.font_color.as_deref(), Some("#FF0000"));
    assert_eq!(sheet.cell(0, 0).unwrap().value.display(), "E = mc2");
    assert_eq!(sheet.cell(1, 0).unwrap().value, CellValue::Text("plain".into()));
}

// ============================================================================
// GRID GEOMETRY
// ============================================================================

#[test]
fn test_row_heights_and_column_widths() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Grid")
                .cell("A1", "x", None)
                .row_height(1, 30.0)
                .row_height(5, 45.0)
                .col_width(2, 3, 10.0),
        )
        .build();

    let wb = parse(&xlsx);
    let sheet = &wb.sheets[0];
    assert_eq!(sheet.row_height_pt(0), 30.0);
    assert_eq!(sheet.row_height_pt(1), 15.0);
    // Row 5 has no cells but still carries its height.
    assert_eq!(sheet.row_height_pt(4), 45.0);
    assert_eq!(sheet.column_width_px(0), 64.0);
    assert_eq!(sheet.column_width_px(1), 70.0);
    assert_eq!(sheet.column_width_px(2), 70.0);
    assert_eq!(sheet.column_width_px(3), 64.0);
}

#[test]
fn test_default_row_height() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .cell("A1", "x", None)
                .default_row_height(20.0),
        )
        .build();

    let wb = parse(&xlsx);
    assert_eq!(wb.sheets[0].row_height_pt(7), 20.0);
}

#[test]
fn test_merges() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .cell("A1", "header", None)
                .merge("A1:C2")
                .merge("E5:E9"),
        )
        .build();

    let wb = parse(&xlsx);
    let sheet = &wb.sheets[0];
    assert_eq!(
        sheet.merges,
        vec![MergeRegion::new(0, 0, 1, 2), MergeRegion::new(4, 4, 8, 4)]
    );
    // Merges extend the sheet extent beyond the populated cells.
    assert_eq!(sheet.row_count(), 9);
    assert_eq!(sheet.col_count(), 5);
}

// ============================================================================
// PAGE SETUP
// ============================================================================

#[test]
fn test_page_margins_and_setup() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Print")
                .cell("A1", "x", None)
                .margins(0.25, 0.5, 1.0, 0.75)
                .page_setup(1, "landscape"),
        )
        .build();

    let wb = parse(&xlsx);
    let sheet = &wb.sheets[0];
    assert_eq!(sheet.page_margins.left, 0.25);
    assert_eq!(sheet.page_margins.right, 0.5);
    assert_eq!(sheet.page_margins.top, 1.0);
    assert_eq!(sheet.page_margins.bottom, 0.75);
    assert_eq!(sheet.page_setup.paper_size, Some(1));
    assert_eq!(sheet.page_setup.orientation, Orientation::Landscape);
}

#[test]
fn test_page_defaults_without_setup() {
    let wb = parse(&fixtures::xlsx_with_text("x"));
    let sheet = &wb.sheets[0];
    assert_eq!(sheet.page_margins.left, 0.7);
    assert_eq!(sheet.page_margins.top, 0.75);
    assert_eq!(sheet.page_setup.paper_size, None);
    assert_eq!(sheet.page_setup.orientation, Orientation::Portrait);
}

// ============================================================================
// PICTURES
// ============================================================================

#[test]
fn test_picture_anchor_and_media() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Pics")
                .cell("A1", "x", None)
                .picture("Logo", (1, 1), (3, 4)),
        )
        .build();

    let wb = parse(&xlsx);
    let pictures = &wb.sheets[0].pictures;
    assert_eq!(pictures.len(), 1);
    let picture = &pictures[0];
    assert_eq!(picture.name.as_deref(), Some("Logo"));
    assert_eq!(picture.mime_type, "image/png");
    assert_eq!(picture.data, TINY_PNG);
    assert_eq!((picture.from.col, picture.from.row), (1, 1));
    let to = picture.to.unwrap();
    assert_eq!((to.col, to.row), (3, 4));
}

#[test]
fn test_pictures_skipped_when_not_loaded() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Pics")
                .cell("A1", "x", None)
                .picture("Logo", (0, 0), (2, 2)),
        )
        .build();

    let wb = xlhtml::parser::parse_with(&xlsx, false).unwrap();
    assert!(wb.sheets[0].pictures.is_empty());
}
