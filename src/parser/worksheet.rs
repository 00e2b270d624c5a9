//! Worksheet parsing - parses individual sheet XML into Sheet structs.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

use crate::cell_ref::{parse_cell_ref_bytes, MAX_COLS};
use crate::error::Result;
use crate::geometry::MergeRegion;
use crate::types::{Cell, CellValue, Orientation, PageMargins, Row, Sheet};
use crate::units::column_chars_to_px;
use crate::xml_helpers::{attr_f64, attr_string, attr_string_local, attr_u32};

use super::shared_strings::SharedString;

/// Sheet metadata from workbook.xml
#[derive(Debug, Clone)]
pub(super) struct SheetInfo {
    pub name: String,
    pub path: String,
}

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum CellTypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    Default,
}

pub(super) fn parse_cell_type_tag(value: &[u8]) -> CellTypeTag {
    match value {
        b"s" => CellTypeTag::Shared,
        b"b" => CellTypeTag::Bool,
        b"e" => CellTypeTag::Error,
        b"str" => CellTypeTag::Str,
        b"inlineStr" => CellTypeTag::Inline,
        _ => CellTypeTag::Default,
    }
}

/// Turn the raw `<v>`/`<t>` text into a typed value.
pub(super) fn resolve_cell_value(
    raw: Option<&str>,
    tag: CellTypeTag,
    shared_strings: &[SharedString],
) -> CellValue {
    let Some(raw) = raw else {
        return CellValue::Empty;
    };
    match tag {
        CellTypeTag::Shared => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared_strings.get(idx))
            .map_or(CellValue::Empty, |s| match s {
                SharedString::Plain(text) => CellValue::Text(text.clone()),
                SharedString::Rich(runs) => CellValue::RichText(runs.clone()),
            }),
        CellTypeTag::Str | CellTypeTag::Inline => CellValue::Text(raw.to_string()),
        CellTypeTag::Bool => match raw.trim() {
            "1" | "true" => CellValue::Boolean(true),
            "0" | "false" => CellValue::Boolean(false),
            other => CellValue::Text(other.to_string()),
        },
        CellTypeTag::Error => CellValue::Error(raw.to_string()),
        CellTypeTag::Default => match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(raw.to_string()),
        },
    }
}

/// A parsed worksheet plus the rId of its drawing part, if any.
pub(super) struct ParsedSheet {
    pub sheet: Sheet,
    pub drawing_rel: Option<String>,
}

/// Parse a single worksheet
pub(super) fn parse_sheet<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    info: &SheetInfo,
    shared_strings: &[SharedString],
    digit_width: f64,
) -> Result<ParsedSheet> {
    let file = archive.by_name(&info.path)?;
    parse_sheet_xml(BufReader::new(file), &info.name, shared_strings, digit_width)
}

/// Read the text content of the element just opened, up to its end tag.
fn read_text<R: BufRead>(xml: &mut Reader<R>, buf: &mut Vec<u8>, end: &[u8]) -> Result<String> {
    let mut text = String::new();
    loop {
        buf.clear();
        match xml.read_event_into(buf)? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(&t)),
            Event::End(e) if e.local_name().as_ref() == end => break,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

/// Read the children of a `<c>` element and return its raw value text.
fn read_cell_value<R: BufRead>(xml: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<Option<String>> {
    enum Step {
        Open(Vec<u8>),
        Close(Vec<u8>),
        Skip,
        Done,
    }

    let mut value = None;
    let mut inline = String::new();
    let mut in_is = false;
    let mut in_rph = false;
    loop {
        buf.clear();
        let step = match xml.read_event_into(buf)? {
            Event::Start(e) => Step::Open(e.local_name().as_ref().to_vec()),
            Event::End(e) => Step::Close(e.local_name().as_ref().to_vec()),
            Event::Eof => Step::Done,
            _ => Step::Skip,
        };
        match step {
            Step::Open(name) => match name.as_slice() {
                b"v" => value = Some(read_text(xml, buf, b"v")?),
                b"is" => in_is = true,
                b"rPh" => in_rph = true,
                b"t" if in_is && !in_rph => inline.push_str(&read_text(xml, buf, b"t")?),
                _ => {}
            },
            Step::Close(name) => match name.as_slice() {
                b"c" => break,
                b"is" => {
                    in_is = false;
                    value = Some(std::mem::take(&mut inline));
                }
                b"rPh" => in_rph = false,
                _ => {}
            },
            Step::Done => break,
            Step::Skip => {}
        }
    }
    Ok(value)
}

/// Pixel width of the default column: `baseColWidth` digits plus 5px of
/// padding, rounded up to a multiple of 8.
fn base_col_width_px(base_chars: f64, digit_width: f64) -> f64 {
    ((base_chars * digit_width + 5.0) / 8.0).ceil() * 8.0
}

fn parse_page_margins(e: &BytesStart) -> PageMargins {
    let defaults = PageMargins::default();
    PageMargins {
        left: attr_f64(e, b"left").unwrap_or(defaults.left),
        right: attr_f64(e, b"right").unwrap_or(defaults.right),
        top: attr_f64(e, b"top").unwrap_or(defaults.top),
        bottom: attr_f64(e, b"bottom").unwrap_or(defaults.bottom),
        header: attr_f64(e, b"header").unwrap_or(defaults.header),
        footer: attr_f64(e, b"footer").unwrap_or(defaults.footer),
    }
}

/// Parse worksheet XML from any reader.
#[allow(clippy::too_many_lines)]
pub(super) fn parse_sheet_xml<R: BufRead>(
    reader: R,
    name: &str,
    shared_strings: &[SharedString],
    digit_width: f64,
) -> Result<ParsedSheet> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut sheet = Sheet::new(name);
    sheet.digit_width = digit_width;
    sheet.default_col_width_px = base_col_width_px(8.0, digit_width);
    let mut drawing_rel = None;

    let mut buf = Vec::new();
    let mut cell_buf = Vec::new();
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;

    loop {
        let event = xml.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                match e.local_name().as_ref() {
                    b"sheetFormatPr" => {
                        if let Some(h) = attr_f64(e, b"defaultRowHeight").filter(|h| *h > 0.0) {
                            sheet.default_row_height = h;
                        }
                        if let Some(base) = attr_f64(e, b"baseColWidth").filter(|b| *b > 0.0) {
                            sheet.default_col_width_px = base_col_width_px(base, digit_width);
                        }
                        if let Some(w) = attr_f64(e, b"defaultColWidth").filter(|w| *w > 0.0) {
                            sheet.default_col_width_px = column_chars_to_px(w, digit_width);
                        }
                    }

                    b"col" => {
                        let min = attr_u32(e, b"min").unwrap_or(1).max(1);
                        let max = attr_u32(e, b"max").unwrap_or(min).max(min);
                        if let Some(width) = attr_f64(e, b"width") {
                            for col in min..=max.min(MAX_COLS) {
                                sheet.col_widths.insert(col - 1, width);
                            }
                        }
                    }

                    b"row" => {
                        current_row = attr_u32(e, b"r")
                            .filter(|r| *r > 0)
                            .map_or(current_row.saturating_add(1), |r| r);
                        next_col = 0;
                        let height = attr_f64(e, b"ht").filter(|h| *h >= 0.0);
                        if height.is_some() || is_start {
                            sheet.rows.entry(current_row - 1).or_default().height = height;
                        }
                    }

                    b"c" => {
                        let mut position = None;
                        let mut tag = CellTypeTag::Default;
                        let mut style = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => position = parse_cell_ref_bytes(&attr.value),
                                b"t" => tag = parse_cell_type_tag(&attr.value),
                                b"s" => {
                                    style = std::str::from_utf8(&attr.value)
                                        .ok()
                                        .and_then(|s| s.parse().ok());
                                }
                                _ => {}
                            }
                        }
                        // Cells without r follow the previous one in the row.
                        let (col, row) = position.unwrap_or((next_col, current_row.saturating_sub(1)));
                        next_col = col.saturating_add(1);

                        let raw = if is_start {
                            read_cell_value(&mut xml, &mut cell_buf)?
                        } else {
                            None
                        };
                        let value = resolve_cell_value(raw.as_deref(), tag, shared_strings);
                        sheet
                            .rows
                            .entry(row)
                            .or_insert_with(Row::default)
                            .cells
                            .insert(col, Cell { value, style });
                    }

                    b"mergeCell" => {
                        if let Some(range) = attr_string(e, b"ref") {
                            match MergeRegion::parse(&range) {
                                Ok(region) => sheet.merges.push(region),
                                Err(err) => log::warn!("sheet {name}: skipping merge: {err}"),
                            }
                        }
                    }

                    b"pageMargins" => sheet.page_margins = parse_page_margins(e),

                    b"pageSetup" => {
                        sheet.page_setup.paper_size = attr_u32(e, b"paperSize");
                        sheet.page_setup.orientation =
                            match attr_string(e, b"orientation").as_deref() {
                                Some("landscape") => Orientation::Landscape,
                                _ => Orientation::Portrait,
                            };
                    }

                    b"drawing" => drawing_rel = attr_string_local(e, b"id"),

                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(ParsedSheet { sheet, drawing_rel })
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
    use crate::geometry::GridMetrics;
    use crate::types::PageSetup;

    fn parse(xml: &str, strings: &[&str]) -> ParsedSheet {
        let strings: Vec<SharedString> = strings
            .iter()
            .map(|s| SharedString::Plain((*s).to_string()))
            .collect();
        parse_sheet_xml(xml.as_bytes(), "S", &strings, 7.0).unwrap()
    }

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
           xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheetFormatPr defaultRowHeight="16.5"/>
  <cols><col min="2" max="3" width="20" customWidth="1"/><col min="5" max="5" width="4"/></cols>
  <sheetData>
    <row r="1" ht="30" customHeight="1">
      <c r="A1" t="s"><v>1</v></c>
      <c r="B1" s="2"><v>3.5</v></c>
      <c r="C1" t="b"><v>1</v></c>
      <c r="D1" t="inlineStr"><is><r><t>in</t></r><r><t>line</t></r><rPh><t>x</t></rPh></is></c>
    </row>
    <row r="3">
      <c r="A3" t="e"><v>#DIV/0!</v></c>
      <c r="B3" s="1"/>
      <c r="C3" t="str"><v>a &amp; b</v></c>
    </row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A5:C6"/></mergeCells>
  <pageMargins left="0.5" right="0.5" top="1" bottom="1" header="0.3" footer="0.3"/>
  <pageSetup paperSize="8" orientation="landscape"/>
  <drawing r:id="rId7"/>
</worksheet>"#;

    #[test]
    fn parses_cells_and_values() {
        let parsed = parse(SHEET, &["zero", "one"]);
        let sheet = &parsed.sheet;
        assert_eq!(sheet.cell(0, 0).unwrap().value, CellValue::Text("one".into()));
        let b1 = sheet.cell(0, 1).unwrap();
        assert_eq!(b1.value, CellValue::Number(3.5));
        assert_eq!(b1.style, Some(2));
        assert_eq!(sheet.cell(0, 2).unwrap().value, CellValue::Boolean(true));
        assert_eq!(sheet.cell(0, 3).unwrap().value, CellValue::Text("inline".into()));
        assert_eq!(sheet.cell(2, 0).unwrap().value, CellValue::Error("#DIV/0!".into()));
        assert_eq!(sheet.cell(2, 1).unwrap().value, CellValue::Empty);
        assert_eq!(sheet.cell(2, 2).unwrap().value, CellValue::Text("a & b".into()));
    }

    #[test]
    fn rich_shared_string_keeps_runs() {
        use crate::types::{RunStyle, TextRun};

        let runs = vec![
            TextRun {
                text: "H".into(),
                style: None,
            },
            TextRun {
                text: "2".into(),
                style: Some(RunStyle {
                    font_size: Some(8.0),
                    ..RunStyle::default()
                }),
            },
        ];
        let strings = [SharedString::Plain("zero".into()), SharedString::Rich(runs.clone())];
        let value = resolve_cell_value(Some("1"), CellTypeTag::Shared, &strings);
        assert_eq!(value, CellValue::RichText(runs));
        assert_eq!(value.display(), "H2");
        assert_eq!(
            resolve_cell_value(Some("9"), CellTypeTag::Shared, &strings),
            CellValue::Empty
        );
    }

    #[test]
    fn parses_geometry() {
        let sheet = parse(SHEET, &[]).sheet;
        assert_eq!(sheet.row_height_pt(0), 30.0);
        assert_eq!(sheet.row_height_pt(1), 16.5);
        assert_eq!(sheet.row_height_pt(2), 16.5);
        assert_eq!(sheet.col_widths.get(&1), Some(&20.0));
        assert_eq!(sheet.col_widths.get(&2), Some(&20.0));
        assert_eq!(sheet.column_width_px(4), 28.0);
        assert_eq!(sheet.column_width_px(0), 64.0);
        assert_eq!(sheet.merges, vec![MergeRegion::new(4, 0, 5, 2)]);
        assert_eq!(sheet.row_count(), 6);
    }

    #[test]
    fn parses_print_settings() {
        let parsed = parse(SHEET, &[]);
        let sheet = &parsed.sheet;
        assert_eq!(sheet.page_margins.left, 0.5);
        assert_eq!(sheet.page_margins.top, 1.0);
        assert_eq!(
            sheet.page_setup,
            PageSetup {
                paper_size: Some(8),
                orientation: Orientation::Landscape,
            }
        );
        assert_eq!(parsed.drawing_rel.as_deref(), Some("rId7"));
    }

    #[test]
    fn cells_without_reference_follow_on() {
        let xml = r#"<worksheet><sheetData><row r="2"><c><v>1</v></c><c><v>2</v></c></row></sheetData></worksheet>"#;
        let sheet = parse(xml, &[]).sheet;
        assert_eq!(sheet.cell(1, 0).unwrap().value, CellValue::Number(1.0));
        assert_eq!(sheet.cell(1, 1).unwrap().value, CellValue::Number(2.0));
        assert_eq!(sheet.page_margins, PageMargins::default());
    }

    #[test]
    fn default_column_width_from_base() {
        assert_eq!(base_col_width_px(8.0, 7.0), 64.0);
        let xml = r#"<worksheet><sheetFormatPr baseColWidth="10" defaultRowHeight="15"/></worksheet>"#;
        let sheet = parse(xml, &[]).sheet;
        assert_eq!(sheet.column_width_px(3), 80.0);
    }
}
