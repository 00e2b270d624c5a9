//! Sheet to HTML table rendering.
//!
//! Each cell becomes
//! `td.exc-table-cell > span.exc-table-cell-container > span.exc-table-cell-table > span.exc-table-val`.
//! The `td`, the container and the value span each get their own
//! declaration set; with style compression on, each kind is deduplicated in
//! a separate pass so its class names never collide with the others.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::cell_style::{font_family_value, CellStyler};
use super::html::{HtmlElement, HtmlPage};
use super::options::RenderOptions;
use crate::css::{deduplicate, ClassAssignments, StyleDeclarations};
use crate::error::{Result, XlhtmlError};
use crate::geometry::{merged_height_declarations, CellGeometryResolver, GridMetrics, MergedExtent};
use crate::layout::SheetLayout;
use crate::pagination::{estimate_page_cut, PageCut, PaperSize};
use crate::types::{plain_text, CellValue, Picture, Sheet, TextRun, Workbook};
use crate::units::{Measurement, Unit, UnitConverter};

const CELL_CLASS: &str = "exc-table-cell";
const CONTAINER_CLASS: &str = "exc-table-cell-container";
const TABLE_CLASS: &str = "exc-table-cell-table";
const VALUE_CLASS: &str = "exc-table-val";
const END_SPACES_CLASS: &str = "value-end-spaces";

/// Inclusive row and column bounds of a rendered window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderRange {
    pub first_row: u32,
    pub last_row: u32,
    pub first_col: u32,
    pub last_col: u32,
}

impl RenderRange {
    pub fn rows(&self) -> std::ops::RangeInclusive<u32> {
        self.first_row..=self.last_row
    }

    pub fn cols(&self) -> std::ops::RangeInclusive<u32> {
        self.first_col..=self.last_col
    }
}

/// Rules every rendered page needs, independent of cell styles.
fn base_stylesheet(font_family: &str, font_size: &str) -> String {
    format!(
        r#".exc-page {{ position: relative; }}
.exc-page table {{ table-layout: fixed; box-sizing: border-box; border-collapse: collapse; border-spacing: 0; }}
.exc-page td {{ overflow: visible; box-sizing: border-box; padding: 1px 1px 0 1px; vertical-align: middle; white-space: nowrap; color: #000000; font-size: {font_size}; font-weight: 400; font-style: normal; text-decoration: none; font-family: {font_family}; }}
.exc-table-cell.merged-cell {{ overflow: hidden; }}
.exc-table-cell.merged-display-cell {{ display: none; }}
.exc-table-cell.has-data .exc-table-cell-table {{ background-color: white; }}
.exc-table-cell.has-bg-color .exc-table-cell-table {{ background-color: rgba(0, 0, 0, 0); }}
.exc-table-cell-container {{ display: flex; width: 100%; overflow: hidden; }}
.exc-table-cell-table {{ display: table; width: 100%; }}
.exc-table-val {{ display: table-cell; }}
.exc-table-cell.wrap-cell .value-end-spaces {{ white-space: normal; }}
.exc-picture {{ position: absolute; }}"#
    )
}

/// Elements keyed by id, one list per style pass.
#[derive(Default)]
struct StylePasses {
    cells: Vec<(String, StyleDeclarations)>,
    containers: Vec<(String, StyleDeclarations)>,
    values: Vec<(String, StyleDeclarations)>,
}

/// Renders sheets of one workbook with fixed options.
pub struct SheetRenderer<'a> {
    workbook: &'a Workbook,
    options: &'a RenderOptions,
}

impl<'a> SheetRenderer<'a> {
    pub fn new(workbook: &'a Workbook, options: &'a RenderOptions) -> Self {
        Self { workbook, options }
    }

    /// Render the sheet at `sheet_index`.
    pub fn render(&self, sheet_index: usize) -> Result<HtmlPage> {
        let sheet = self
            .workbook
            .sheets
            .get(sheet_index)
            .ok_or_else(|| XlhtmlError::SheetNotFound(sheet_index.to_string()))?;
        self.render_sheet(sheet)
    }

    /// Render every sheet in workbook order.
    pub fn render_all(&self) -> Result<Vec<HtmlPage>> {
        self.workbook
            .sheets
            .iter()
            .map(|sheet| self.render_sheet(sheet))
            .collect()
    }

    /// Window to render: explicit bounds first, then the sheet's extent,
    /// then the first printed page when paper mode is on. `None` when the
    /// window is empty.
    pub fn resolve_range(&self, sheet: &Sheet, conv: &UnitConverter) -> Result<Option<RenderRange>> {
        let opts = self.options;
        let first_row = opts.start_row.unwrap_or(0);
        let first_col = opts.start_col.unwrap_or(0);
        let last_row = match opts.end_row.or_else(|| sheet.row_count().checked_sub(1)) {
            Some(r) => r,
            None => return Ok(None),
        };
        let last_col = match opts.end_col.or_else(|| sheet.col_count().checked_sub(1)) {
            Some(c) => c,
            None => return Ok(None),
        };

        let (mut last_row, mut last_col) = (last_row, last_col);
        if let Some(paper_mode) = &opts.paper {
            let paper = paper_mode
                .size
                .or_else(|| sheet.page_setup.paper_size.and_then(PaperSize::from_code))
                .unwrap_or_default();
            let orientation = paper_mode
                .orientation
                .unwrap_or(sheet.page_setup.orientation);
            let cut = estimate_page_cut(
                sheet,
                last_row.saturating_add(1),
                last_col.saturating_add(1),
                &paper,
                orientation,
                &sheet.page_margins,
                conv,
            )?;
            match (
                PageCut::clamp_end(cut.rows, last_row),
                PageCut::clamp_end(cut.cols, last_col),
            ) {
                (Some(r), Some(c)) => (last_row, last_col) = (r, c),
                _ => {
                    log::debug!("sheet {:?}: first row or column is larger than the page", sheet.name);
                    return Ok(None);
                }
            }
        }

        if first_row > last_row || first_col > last_col {
            return Ok(None);
        }
        Ok(Some(RenderRange {
            first_row,
            last_row,
            first_col,
            last_col,
        }))
    }

    pub fn render_sheet(&self, sheet: &Sheet) -> Result<HtmlPage> {
        let conv = self.options.converter()?;
        let styler = CellStyler::new(self.workbook, conv, self.options.content_inset_px);
        let resolver = CellGeometryResolver::new(&sheet.merges);
        let mut passes = StylePasses::default();

        let mut table = HtmlElement::new("table")
            .with_attr("border", "0")
            .with_attr("cellpadding", "0")
            .with_attr("cellspacing", "0");

        let range = self.resolve_range(sheet, &conv)?;
        if let Some(range) = range {
            for row in range.rows() {
                let mut tr = HtmlElement::new("tr");
                for col in range.cols() {
                    tr.children
                        .push(self.render_cell(sheet, &styler, &resolver, &conv, row, col, &mut passes)?);
                }
                table.children.push(tr);
            }
        }

        let mut page_div = HtmlElement::new("div").with_class("exc-page").with_child(table);
        if let (true, Some(range)) = (self.options.load_pictures, range) {
            page_div
                .children
                .extend(picture_elements(sheet, &range, conv)?);
        }

        let font_size = conv.output_length(self.workbook.default_font_size(), Unit::Point)?;
        let mut page = HtmlPage {
            title: sheet.name.clone(),
            styles: vec![base_stylesheet(
                &font_family_value(self.workbook.default_font_name())
                    .unwrap_or_else(|| "sans-serif".to_string()),
                &font_size.to_string(),
            )],
            body: Vec::new(),
        };

        if self.options.compress_style {
            let cells = deduplicate(
                &self.options.cell_class_prefix,
                passes.cells.iter().map(|(id, d)| (id.as_str(), d)),
            )?;
            let containers = deduplicate(
                &self.options.container_class_prefix,
                passes.containers.iter().map(|(id, d)| (id.as_str(), d)),
            )?;
            let values = deduplicate(
                &self.options.value_class_prefix,
                passes.values.iter().map(|(id, d)| (id.as_str(), d)),
            )?;
            log::debug!(
                "sheet {:?}: {} cells, {}/{}/{} style rules",
                sheet.name,
                passes.cells.len(),
                cells.rule_count,
                containers.rule_count,
                values.rule_count
            );

            let mut assignments = ClassAssignments::default();
            assignments.extend(cells.assignments);
            assignments.extend(containers.assignments);
            assignments.extend(values.assignments);
            apply_classes(&mut page_div, &assignments);

            page.styles.push(cells.stylesheet);
            page.styles.push(containers.stylesheet);
            page.styles.push(values.stylesheet);
        }

        page.body.push(page_div);
        Ok(page)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_cell(
        &self,
        sheet: &Sheet,
        styler: &CellStyler<'_>,
        resolver: &CellGeometryResolver<'_>,
        conv: &UnitConverter,
        row: u32,
        col: u32,
        passes: &mut StylePasses,
    ) -> Result<HtmlElement> {
        let cell = sheet.cell(row, col);
        let mut sets = styler.sets_for(cell, sheet.row_height_pt(row), sheet.column_width_px(col))?;

        let region = resolver.region_at(row, col);
        let trailing = match region {
            Some(r) if r.is_anchor(row, col) && r.trailing() != r.anchor() => {
                let (last_row, last_col) = r.trailing();
                match sheet.cell(last_row, last_col) {
                    Some(trailing_cell) => Some(styler.box_declarations(
                        styler.style_of(Some(trailing_cell)),
                        sheet.row_height_pt(last_row),
                        sheet.column_width_px(last_col),
                    )?),
                    None => None,
                }
            }
            _ => None,
        };
        let geometry = resolver.resolve_with(row, col, sets.cell.clone(), |_, _| trailing);
        sets.cell = geometry.composed.clone();

        let id = format!("r{row}c{col}");
        let mut td = HtmlElement::new("td").with_id(id.clone()).with_class(CELL_CLASS);

        let text = cell.map(|c| styler.display_text(c)).unwrap_or_default();
        td.add_class(if text.is_empty() { "no-data" } else { "has-data" });
        if sets.wrap {
            td.add_class("wrap-cell");
        }

        if let (true, Some(region)) = (geometry.is_anchor(), geometry.region) {
            td.add_class("merged-cell");
            for (name, value) in geometry.span_attributes() {
                td.attrs.push((name.to_string(), value));
            }
            let extent = MergedExtent::of(&region, sheet);
            let (outer, inner) =
                merged_height_declarations(&extent, self.options.content_inset_px, conv)?;
            for (name, value) in outer.iter() {
                sets.cell = sets.cell.with(name, value.clone());
            }
            for (name, value) in inner.iter() {
                sets.container = sets.container.with(name, value.clone());
            }
        } else if geometry.is_covered() {
            td.add_class("merged-display-cell");
        }

        if sets.has_background() {
            td.add_class("has-bg-color");
        }

        let value_id = format!("{id}v");
        let container_id = format!("{id}k");
        let mut value_span = HtmlElement::new("span")
            .with_id(value_id.clone())
            .with_class(VALUE_CLASS);
        match cell.map(|c| &c.value) {
            Some(CellValue::RichText(runs)) => {
                value_span.children = run_elements(styler, runs, sets.wrap)?;
            }
            _ if sets.wrap => {
                let (body, tail) = split_trailing_whitespace(&text);
                if !body.is_empty() {
                    value_span.text = Some(body.to_string());
                }
                if !tail.is_empty() {
                    value_span.children.push(end_spaces(tail));
                }
            }
            _ if !text.is_empty() => value_span.text = Some(text),
            _ => {}
        }
        let container = HtmlElement::new("span")
            .with_id(container_id.clone())
            .with_class(CONTAINER_CLASS)
            .with_child(HtmlElement::new("span").with_class(TABLE_CLASS).with_child(
                value_span.with_style(sets.value.clone()),
            ))
            .with_style(sets.container.clone());

        passes.cells.push((id, sets.cell.clone()));
        passes.containers.push((container_id, sets.container));
        passes.values.push((value_id, sets.value));

        Ok(td.with_style(sets.cell).with_child(container))
    }
}

/// Split `text` before its trailing whitespace.
fn split_trailing_whitespace(text: &str) -> (&str, &str) {
    let body = text.trim_end_matches(char::is_whitespace);
    (body, text.get(body.len()..).unwrap_or_default())
}

/// Trailing whitespace of a wrapped cell, kept out of the line width.
fn end_spaces(text: &str) -> HtmlElement {
    HtmlElement::new("span")
        .with_class(END_SPACES_CLASS)
        .with_text(text)
}

/// One span per rich text run, each with the run's own font inline. In
/// wrapped cells the whitespace ending the whole value moves into
/// `value-end-spaces` spans.
fn run_elements(styler: &CellStyler<'_>, runs: &[TextRun], wrap: bool) -> Result<Vec<HtmlElement>> {
    let full = plain_text(runs);
    let tail_start = if wrap {
        split_trailing_whitespace(&full).0.len()
    } else {
        full.len()
    };

    let mut out = Vec::with_capacity(runs.len());
    let mut start = 0;
    for run in runs {
        let end = start + run.text.len();
        let style = match &run.style {
            Some(style) => styler.run_declarations(style)?,
            None => StyleDeclarations::new(),
        };
        let mut span = HtmlElement::new("span").with_style(style.clone());
        if start >= tail_start {
            span.add_class(END_SPACES_CLASS);
            span.text = Some(run.text.clone());
        } else if tail_start < end {
            let cut = tail_start - start;
            let head = run.text.get(..cut).unwrap_or_default();
            let tail = run.text.get(cut..).unwrap_or_default();
            span.text = Some(head.to_string());
            span.children.push(end_spaces(tail).with_style(style));
        } else {
            span.text = Some(run.text.clone());
        }
        out.push(span);
        start = end;
    }
    Ok(out)
}

/// Replace inline styles with the classes assigned to each element.
fn apply_classes(root: &mut HtmlElement, assignments: &ClassAssignments) {
    root.walk_mut(&mut |element| {
        let Some(id) = element.id.as_deref() else {
            return;
        };
        let classes = assignments.classes_for(id);
        if classes.is_empty() {
            return;
        }
        for class in classes {
            let class = class.as_str().to_string();
            element.add_class(&class);
        }
        element.style = StyleDeclarations::new();
    });
}

fn picture_elements(sheet: &Sheet, range: &RenderRange, conv: UnitConverter) -> Result<Vec<HtmlElement>> {
    let layout = SheetLayout::new(
        sheet,
        (range.first_row, range.last_row),
        (range.first_col, range.last_col),
        conv,
    );
    let mut out = Vec::new();
    for picture in &sheet.pictures {
        if picture.data.is_empty() {
            continue;
        }
        let Some(rect) = layout.picture_rect(picture) else {
            log::debug!("picture {:?} outside rendered window", picture.name);
            continue;
        };
        out.push(picture_element(picture, rect.left, rect.top, rect.width, rect.height)?);
    }
    Ok(out)
}

fn picture_element(picture: &Picture, left: f64, top: f64, width: f64, height: f64) -> Result<HtmlElement> {
    let style = StyleDeclarations::builder()
        .set("left", Measurement::px(left)?)
        .set("top", Measurement::px(top)?)
        .set("width", Measurement::px(width)?)
        .set("height", Measurement::px(height)?)
        .build();
    let src = format!("data:{};base64,{}", picture.mime_type, BASE64.encode(&picture.data));
    let mut img = HtmlElement::new("img")
        .with_class("exc-picture")
        .with_attr("src", src)
        .with_style(style);
    if let Some(name) = &picture.name {
        img = img.with_attr("alt", name.clone());
    }
    Ok(img)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::geometry::MergeRegion;
    use crate::render::PaperMode;
    use crate::types::{Cell, CellStyle, Row, RunStyle};

    fn sheet_with(values: &[(u32, u32, CellValue)]) -> Sheet {
        let mut sheet = Sheet::new("S");
        for (r, c, v) in values {
            sheet.rows.entry(*r).or_insert_with(Row::default).cells.insert(
                *c,
                Cell {
                    value: v.clone(),
                    style: None,
                },
            );
        }
        sheet
    }

    fn workbook(sheet: Sheet) -> Workbook {
        Workbook {
            sheets: vec![sheet],
            ..Workbook::default()
        }
    }

    fn cells(page: &HtmlPage) -> Vec<HtmlElement> {
        let mut found = Vec::new();
        for el in &page.body {
            el.walk(&mut |e| {
                if e.tag == "td" {
                    found.push(e.clone());
                }
            });
        }
        found
    }

    #[test]
    fn range_defaults_to_sheet_extent() {
        let wb = workbook(sheet_with(&[(2, 3, CellValue::Number(1.0))]));
        let opts = RenderOptions::default();
        let renderer = SheetRenderer::new(&wb, &opts);
        let range = renderer
            .resolve_range(&wb.sheets[0], &UnitConverter::default())
            .unwrap()
            .unwrap();
        assert_eq!((range.last_row, range.last_col), (2, 3));
    }

    #[test]
    fn empty_sheet_renders_empty_table() {
        let wb = workbook(Sheet::new("Empty"));
        let opts = RenderOptions::default();
        let page = SheetRenderer::new(&wb, &opts).render(0).unwrap();
        assert!(cells(&page).is_empty());
        assert!(page.to_html().unwrap().contains("<table"));
    }

    #[test]
    fn paper_mode_clamps_rows() {
        let wb = workbook(sheet_with(&[(199, 0, CellValue::Number(1.0))]));
        let opts = RenderOptions::default().with_paper(PaperMode::default());
        let renderer = SheetRenderer::new(&wb, &opts);
        let range = renderer
            .resolve_range(&wb.sheets[0], &UnitConverter::default())
            .unwrap()
            .unwrap();
        // A4 portrait with default margins fits 49 rows of 15pt.
        assert_eq!(range.last_row, 48);
        assert_eq!(range.last_col, 0);
    }

    #[test]
    fn paper_mode_with_oversized_first_row_renders_nothing() {
        let mut sheet = Sheet::new("Tall");
        for r in 0..5 {
            sheet.rows.insert(
                r,
                Row {
                    height: Some(2000.0),
                    cells: [(
                        0,
                        Cell {
                            value: CellValue::Number(f64::from(r)),
                            style: None,
                        },
                    )]
                    .into_iter()
                    .collect(),
                },
            );
        }
        let wb = workbook(sheet);
        let opts = RenderOptions::default().with_paper(PaperMode::default());
        let renderer = SheetRenderer::new(&wb, &opts);
        assert_eq!(
            renderer
                .resolve_range(&wb.sheets[0], &UnitConverter::default())
                .unwrap(),
            None
        );
        let page = renderer.render(0).unwrap();
        assert!(cells(&page).is_empty());
    }

    #[test]
    fn hostile_default_font_cannot_close_style_element() {
        let mut wb = workbook(sheet_with(&[(0, 0, CellValue::Text("x".into()))]));
        wb.default_font.name = Some("</style><script>alert(1)</script>".into());
        for compress in [true, false] {
            let opts = RenderOptions::default().with_compress_style(compress);
            let html = SheetRenderer::new(&wb, &opts).render(0).unwrap().to_html().unwrap();
            assert!(!html.contains("<script>"));
            assert!(!html.contains("</script>"));
            assert_eq!(html.matches("</style>").count(), html.matches("<style>").count());
        }
    }

    fn wrapped(mut wb: Workbook) -> Workbook {
        wb.styles = vec![
            CellStyle::default(),
            CellStyle {
                wrap: true,
                ..CellStyle::default()
            },
        ];
        for row in wb.sheets[0].rows.values_mut() {
            for cell in row.cells.values_mut() {
                cell.style = Some(1);
            }
        }
        wb
    }

    fn value_span(td: &HtmlElement) -> &HtmlElement {
        &td.children[0].children[0].children[0]
    }

    #[test]
    fn wrapped_text_moves_trailing_spaces_into_their_own_span() {
        let wb = wrapped(workbook(sheet_with(&[(0, 0, CellValue::Text("total  \n".into()))])));
        let opts = RenderOptions::default();
        let page = SheetRenderer::new(&wb, &opts).render(0).unwrap();
        let td = &cells(&page)[0];
        assert!(td.has_class("wrap-cell"));
        let value = value_span(td);
        assert_eq!(value.text.as_deref(), Some("total"));
        assert_eq!(value.children.len(), 1);
        assert!(value.children[0].has_class("value-end-spaces"));
        assert_eq!(value.children[0].text.as_deref(), Some("  \n"));
        assert!(page.styles[0].contains(".exc-table-cell.wrap-cell .value-end-spaces { white-space: normal; }"));
    }

    #[test]
    fn unwrapped_text_keeps_trailing_spaces_inline() {
        let wb = workbook(sheet_with(&[(0, 0, CellValue::Text("total  ".into()))]));
        let opts = RenderOptions::default();
        let page = SheetRenderer::new(&wb, &opts).render(0).unwrap();
        let value = value_span(&cells(&page)[0]).clone();
        assert_eq!(value.text.as_deref(), Some("total  "));
        assert!(value.children.is_empty());
    }

    fn rich(parts: &[(&str, Option<RunStyle>)]) -> CellValue {
        CellValue::RichText(
            parts
                .iter()
                .map(|(text, style)| TextRun {
                    text: (*text).to_string(),
                    style: style.clone(),
                })
                .collect(),
        )
    }

    #[test]
    fn rich_text_renders_one_span_per_run() {
        let bold = RunStyle {
            bold: Some(true),
            ..RunStyle::default()
        };
        let wb = workbook(sheet_with(&[(0, 0, rich(&[("plain ", None), ("bold", Some(bold))]))]));
        let opts = RenderOptions::default();
        let page = SheetRenderer::new(&wb, &opts).render(0).unwrap();
        let td = &cells(&page)[0];
        assert!(td.has_class("has-data"));
        let value = value_span(td);
        assert!(value.text.is_none());
        assert_eq!(value.children.len(), 2);
        assert_eq!(value.children[0].text.as_deref(), Some("plain "));
        assert!(value.children[0].style.is_empty());
        assert_eq!(value.children[1].text.as_deref(), Some("bold"));
        assert_eq!(
            value.children[1].style.get("font-weight").unwrap().render().unwrap(),
            "bold"
        );
        // Run fonts stay inline even with compression on.
        assert!(page.to_html().unwrap().contains("style=\"font-weight: bold\""));
    }

    #[test]
    fn wrapped_rich_text_splits_trailing_spaces_across_runs() {
        let italic = RunStyle {
            italic: Some(true),
            ..RunStyle::default()
        };
        let value = rich(&[("a", None), ("b  ", Some(italic)), ("   ", None)]);
        let wb = wrapped(workbook(sheet_with(&[(0, 0, value)])));
        let opts = RenderOptions::default();
        let page = SheetRenderer::new(&wb, &opts).render(0).unwrap();
        let page_cells = cells(&page);
        let runs = &value_span(&page_cells[0]).children;
        assert_eq!(runs.len(), 3);

        assert_eq!(runs[0].text.as_deref(), Some("a"));
        assert!(runs[0].children.is_empty());

        assert_eq!(runs[1].text.as_deref(), Some("b"));
        let tail = &runs[1].children[0];
        assert!(tail.has_class("value-end-spaces"));
        assert_eq!(tail.text.as_deref(), Some("  "));
        assert_eq!(tail.style.get("font-style").unwrap().render().unwrap(), "italic");

        assert!(runs[2].has_class("value-end-spaces"));
        assert_eq!(runs[2].text.as_deref(), Some("   "));
    }

    #[test]
    fn number_formats_shape_cell_text() {
        let mut wb = workbook(sheet_with(&[
            (0, 0, CellValue::Number(45000.0)),
            (0, 1, CellValue::Number(1234.5)),
        ]));
        wb.styles = vec![
            CellStyle::default(),
            CellStyle {
                num_fmt_id: 14,
                number_format: Some("mm-dd-yy".into()),
                ..CellStyle::default()
            },
            CellStyle {
                num_fmt_id: 4,
                number_format: Some("#,##0.00".into()),
                ..CellStyle::default()
            },
        ];
        let row = wb.sheets[0].rows.get_mut(&0).unwrap();
        row.cells.get_mut(&0).unwrap().style = Some(1);
        row.cells.get_mut(&1).unwrap().style = Some(2);

        let opts = RenderOptions::default();
        let page = SheetRenderer::new(&wb, &opts).render(0).unwrap();
        let tds = cells(&page);
        assert_eq!(value_span(&tds[0]).text.as_deref(), Some("03-15-23"));
        assert_eq!(value_span(&tds[1]).text.as_deref(), Some("1,234.50"));
    }

    #[test]
    fn missing_sheet_index() {
        let wb = Workbook::default();
        let opts = RenderOptions::default();
        assert!(matches!(
            SheetRenderer::new(&wb, &opts).render(3),
            Err(XlhtmlError::SheetNotFound(_))
        ));
    }

    #[test]
    fn merged_anchor_and_covered_cells() {
        let mut sheet = sheet_with(&[(0, 0, CellValue::Text("title".into()))]);
        sheet.merges.push(MergeRegion::parse("A1:B2").unwrap());
        let wb = workbook(sheet);
        let opts = RenderOptions::default().with_compress_style(false);
        let page = SheetRenderer::new(&wb, &opts).render(0).unwrap();
        let tds = cells(&page);
        assert_eq!(tds.len(), 4);

        let anchor = &tds[0];
        assert!(anchor.has_class("merged-cell"));
        assert!(anchor.has_class("has-data"));
        assert_eq!(anchor.attr("rowspan"), Some("2"));
        assert_eq!(anchor.attr("colspan"), Some("2"));
        assert_eq!(
            anchor.style.get("height").unwrap().render().unwrap(),
            "30.00pt"
        );
        let container = &anchor.children[0];
        assert_eq!(
            container.style.get("max-height").unwrap().render().unwrap(),
            "27.75pt"
        );

        for covered in &tds[1..] {
            assert!(covered.has_class("merged-display-cell"));
            assert!(covered.attr("rowspan").is_none());
        }
    }

    #[test]
    fn compression_replaces_inline_styles() {
        let wb = workbook(sheet_with(&[
            (0, 0, CellValue::Number(1.0)),
            (0, 1, CellValue::Number(2.0)),
            (1, 0, CellValue::Text("x".into())),
        ]));
        let opts = RenderOptions::default();
        let page = SheetRenderer::new(&wb, &opts).render(0).unwrap();
        let tds = cells(&page);
        assert!(tds.iter().all(|td| td.style.is_empty()));
        assert!(tds.iter().all(|td| td.classes.iter().any(|c| c.starts_with("xc-"))));
        // Same look for every box; numbers and text differ in alignment.
        assert_eq!(page.styles.len(), 4);
        assert_eq!(page.styles[1].lines().count(), 1);
        assert_eq!(page.styles[3].lines().count(), 3);
        assert!(!page.to_html().unwrap().contains("style=\""));
    }

    #[test]
    fn pictures_render_as_data_uris() {
        let mut sheet = sheet_with(&[(0, 0, CellValue::Number(1.0))]);
        sheet.pictures.push(Picture {
            from: crate::types::AnchorPoint::default(),
            extent: Some((914_400.0, 457_200.0)),
            mime_type: "image/png".into(),
            data: vec![1, 2, 3],
            ..Picture::default()
        });
        let wb = workbook(sheet);
        let opts = RenderOptions::default();
        let html = SheetRenderer::new(&wb, &opts).render(0).unwrap().to_html().unwrap();
        assert!(html.contains("src=\"data:image/png;base64,AQID\""));
        assert!(html.contains("width: 96.00px"));

        let opts = RenderOptions::default().with_load_pictures(false);
        let html = SheetRenderer::new(&wb, &opts).render(0).unwrap().to_html().unwrap();
        assert!(!html.contains("<img"));
    }
}
