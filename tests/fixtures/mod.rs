//! In-memory XLSX packages for tests.
//!
//! Builders describe a workbook (sheets, cells, styles, merges, page setup,
//! pictures) and `build()` writes the minimal set of OOXML parts a reader
//! needs into a zip held in memory.
//!
//! ```rust
//! use fixtures::{SheetBuilder, StyleBuilder, XlsxBuilder};
//!
//! let xlsx = XlsxBuilder::new()
//!     .sheet(
//!         SheetBuilder::new("Sheet1")
//!             .cell("A1", "Hello", Some(StyleBuilder::new().bold()))
//!             .cell("B1", 42.0, None)
//!             .merge("A2:B3"),
//!     )
//!     .build();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_lossless
)]

use std::collections::BTreeMap;
use std::fmt::{Display, Write as _};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// One-pixel transparent PNG.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_XDR: &str = "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const CT_PREFIX: &str = "application/vnd.openxmlformats-officedocument";

// --- styles -----------------------------------------------------------------

/// Cell formatting, turned into fonts/fills/borders/cellXfs on build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleBuilder {
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,

    pub bg_color: Option<String>,
    pub pattern_type: Option<String>,

    pub border_top: Option<BorderSide>,
    pub border_right: Option<BorderSide>,
    pub border_bottom: Option<BorderSide>,
    pub border_left: Option<BorderSide>,

    pub align_horizontal: Option<String>,
    pub align_vertical: Option<String>,
    pub wrap_text: bool,

    /// Built-in `numFmtId`.
    pub number_format_id: Option<u32>,
    /// Custom format code, written to `<numFmts>` with an id from 164.
    pub number_format: Option<String>,
}

/// One edge of a cell border.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderSide {
    pub style: String,
    pub color: Option<String>,
}

impl BorderSide {
    #[must_use]
    pub fn new(style: &str) -> Self {
        Self {
            style: style.to_string(),
            color: None,
        }
    }

    /// `#RRGGBB` or ARGB.
    #[must_use]
    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(argb(color));
        self
    }
}

impl StyleBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn font_name(self, name: &str) -> Self {
        Self {
            font_name: Some(name.to_string()),
            ..self
        }
    }

    #[must_use]
    pub fn font_size(self, size: f64) -> Self {
        Self {
            font_size: Some(size),
            ..self
        }
    }

    #[must_use]
    pub fn font_color(self, color: &str) -> Self {
        Self {
            font_color: Some(argb(color)),
            ..self
        }
    }

    #[must_use]
    pub fn bold(self) -> Self {
        Self { bold: true, ..self }
    }

    #[must_use]
    pub fn italic(self) -> Self {
        Self {
            italic: true,
            ..self
        }
    }

    #[must_use]
    pub fn underline(self) -> Self {
        Self {
            underline: true,
            ..self
        }
    }

    #[must_use]
    pub fn strikethrough(self) -> Self {
        Self {
            strikethrough: true,
            ..self
        }
    }

    /// Fill color; the pattern is `solid` unless [`Self::pattern`] says otherwise.
    #[must_use]
    pub fn bg_color(self, color: &str) -> Self {
        Self {
            bg_color: Some(argb(color)),
            ..self
        }
    }

    #[must_use]
    pub fn pattern(self, pattern_type: &str) -> Self {
        Self {
            pattern_type: Some(pattern_type.to_string()),
            ..self
        }
    }

    #[must_use]
    pub fn border_all(self, style: &str, color: Option<&str>) -> Self {
        let side = color.map_or_else(
            || BorderSide::new(style),
            |c| BorderSide::new(style).color(c),
        );
        Self {
            border_top: Some(side.clone()),
            border_right: Some(side.clone()),
            border_bottom: Some(side.clone()),
            border_left: Some(side),
            ..self
        }
    }

    #[must_use]
    pub fn border_top(self, side: BorderSide) -> Self {
        Self {
            border_top: Some(side),
            ..self
        }
    }

    #[must_use]
    pub fn border_right(self, side: BorderSide) -> Self {
        Self {
            border_right: Some(side),
            ..self
        }
    }

    #[must_use]
    pub fn border_bottom(self, side: BorderSide) -> Self {
        Self {
            border_bottom: Some(side),
            ..self
        }
    }

    #[must_use]
    pub fn border_left(self, side: BorderSide) -> Self {
        Self {
            border_left: Some(side),
            ..self
        }
    }

    #[must_use]
    pub fn align_horizontal(self, align: &str) -> Self {
        Self {
            align_horizontal: Some(align.to_string()),
            ..self
        }
    }

    #[must_use]
    pub fn align_vertical(self, align: &str) -> Self {
        Self {
            align_vertical: Some(align.to_string()),
            ..self
        }
    }

    #[must_use]
    pub fn wrap_text(self) -> Self {
        Self {
            wrap_text: true,
            ..self
        }
    }

    #[must_use]
    pub fn number_format_id(self, id: u32) -> Self {
        Self {
            number_format_id: Some(id),
            ..self
        }
    }

    #[must_use]
    pub fn number_format(self, code: &str) -> Self {
        Self {
            number_format: Some(code.to_string()),
            ..self
        }
    }

    /// No-op terminator so call chains read naturally.
    #[must_use]
    pub fn build(self) -> Self {
        self
    }
}

// --- cell values --------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum CellValue {
    /// Stored in the shared string table.
    String(String),
    Number(f64),
    Boolean(bool),
    /// Error literal such as `#DIV/0!`.
    Error(String),
    /// Stored inline in the sheet (`t="inlineStr"`).
    InlineString(String),
    /// Shared string made of formatted runs.
    RichString(Vec<Run>),
    /// Style only.
    Empty,
}

/// One run of a rich shared string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<String>,
    pub superscript: bool,
    /// Run without `<rPr>`.
    pub plain: bool,
}

impl Run {
    /// A run that takes the cell's font.
    #[must_use]
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            plain: true,
            ..Self::default()
        }
    }

    /// A run with an (initially empty) `<rPr>`.
    #[must_use]
    pub fn styled(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn bold(self) -> Self {
        Self { bold: true, ..self }
    }

    #[must_use]
    pub fn italic(self) -> Self {
        Self {
            italic: true,
            ..self
        }
    }

    #[must_use]
    pub fn font(self, name: &str, size: f64) -> Self {
        Self {
            font_name: Some(name.to_string()),
            font_size: Some(size),
            ..self
        }
    }

    #[must_use]
    pub fn color(self, color: &str) -> Self {
        Self {
            font_color: Some(argb(color)),
            ..self
        }
    }

    #[must_use]
    pub fn superscript(self) -> Self {
        Self {
            superscript: true,
            ..self
        }
    }
}

impl From<Vec<Run>> for CellValue {
    fn from(runs: Vec<Run>) -> Self {
        Self::RichString(runs)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

// --- sheets ---------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CellEntry {
    at: String,
    value: CellValue,
    style: Option<StyleBuilder>,
}

/// Drawing anchor corner: 0-indexed col and row, zero offsets.
#[derive(Debug, Clone, Copy)]
struct Corner {
    col: u32,
    row: u32,
}

#[derive(Debug, Clone)]
struct PictureEntry {
    name: String,
    from: Corner,
    to: Corner,
    data: Vec<u8>,
}

/// One worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    name: String,
    cells: Vec<CellEntry>,
    merges: Vec<String>,
    /// (min, max, width in characters), 1-indexed columns.
    col_widths: Vec<(u32, u32, f64)>,
    /// 1-indexed row to height in points.
    row_heights: BTreeMap<u32, f64>,
    default_row_height: Option<f64>,
    /// left, right, top, bottom in inches.
    margins: Option<[f64; 4]>,
    page_setup: Option<(u32, String)>,
    pictures: Vec<PictureEntry>,
}

impl SheetBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn cell<V: Into<CellValue>>(
        mut self,
        cell_ref: &str,
        value: V,
        style: Option<StyleBuilder>,
    ) -> Self {
        self.cells.push(CellEntry {
            at: cell_ref.to_string(),
            value: value.into(),
            style,
        });
        self
    }

    /// Empty cell carrying only a style.
    #[must_use]
    pub fn styled_cell(self, cell_ref: &str, style: StyleBuilder) -> Self {
        self.cell(cell_ref, CellValue::Empty, Some(style))
    }

    #[must_use]
    pub fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }

    /// Width in characters for 1-indexed columns `min..=max`.
    #[must_use]
    pub fn col_width(mut self, min: u32, max: u32, width: f64) -> Self {
        self.col_widths.push((min, max, width));
        self
    }

    /// Height in points for a 1-indexed row.
    #[must_use]
    pub fn row_height(mut self, row: u32, height: f64) -> Self {
        self.row_heights.insert(row, height);
        self
    }

    #[must_use]
    pub fn default_row_height(mut self, height: f64) -> Self {
        self.default_row_height = Some(height);
        self
    }

    /// Margins in inches.
    #[must_use]
    pub fn margins(mut self, left: f64, right: f64, top: f64, bottom: f64) -> Self {
        self.margins = Some([left, right, top, bottom]);
        self
    }

    /// ECMA-376 paper code plus `portrait` or `landscape`.
    #[must_use]
    pub fn page_setup(mut self, paper_size: u32, orientation: &str) -> Self {
        self.page_setup = Some((paper_size, orientation.to_string()));
        self
    }

    /// PNG anchored between two 0-indexed `(col, row)` corners.
    #[must_use]
    pub fn picture(mut self, name: &str, from: (u32, u32), to: (u32, u32)) -> Self {
        self.pictures.push(PictureEntry {
            name: name.to_string(),
            from: Corner {
                col: from.0,
                row: from.1,
            },
            to: Corner {
                col: to.0,
                row: to.1,
            },
            data: TINY_PNG.to_vec(),
        });
        self
    }
}

// --- workbook ---------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
    /// (name, size); Calibri 11 when unset.
    default_font: Option<(String, f64)>,
    date1904: bool,
}

impl XlsxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Start a sheet and keep chaining cells onto it.
    #[must_use]
    pub fn add_sheet(self, name: &str) -> XlsxSheetAdder {
        XlsxSheetAdder {
            builder: self,
            sheet: SheetBuilder::new(name),
        }
    }

    #[must_use]
    pub fn default_font(mut self, name: &str, size: f64) -> Self {
        self.default_font = Some((name.to_string(), size));
        self
    }

    /// Use the 1904 date system.
    #[must_use]
    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let (font, size) = self
            .default_font
            .clone()
            .unwrap_or_else(|| ("Calibri".to_string(), 11.0));
        let mut styles = StyleTable::new(&font, size);
        let mut strings: Vec<String> = Vec::new();
        for cell in self.sheets.iter().flat_map(|s| &s.cells) {
            if let Some(style) = &cell.style {
                styles.register(style);
            }
            if let Some(record) = si_record(&cell.value) {
                if !strings.contains(&record) {
                    strings.push(record);
                }
            }
        }

        let mut pkg = Package::new();
        pkg.part("[Content_Types].xml", content_types(&self.sheets));
        pkg.part(
            "_rels/.rels",
            relationships([("officeDocument", "xl/workbook.xml".to_string())]),
        );
        pkg.part("xl/workbook.xml", workbook(&self.sheets, self.date1904));
        pkg.part(
            "xl/_rels/workbook.xml.rels",
            relationships(
                (1..=self.sheets.len())
                    .map(|n| ("worksheet", format!("worksheets/sheet{n}.xml")))
                    .chain([
                        ("styles", "styles.xml".to_string()),
                        ("sharedStrings", "sharedStrings.xml".to_string()),
                    ]),
            ),
        );
        pkg.part("xl/styles.xml", styles.to_xml());
        if !strings.is_empty() {
            pkg.part("xl/sharedStrings.xml", shared_strings(&strings));
        }

        let mut image_count = 0;
        for (index, sheet) in self.sheets.iter().enumerate() {
            let n = index + 1;
            pkg.part(
                &format!("xl/worksheets/sheet{n}.xml"),
                worksheet(sheet, &strings, &styles),
            );
            if sheet.pictures.is_empty() {
                continue;
            }
            pkg.part(
                &format!("xl/worksheets/_rels/sheet{n}.xml.rels"),
                relationships([("drawing", format!("../drawings/drawing{n}.xml"))]),
            );
            let mut images = Vec::new();
            for picture in &sheet.pictures {
                image_count += 1;
                pkg.binary(&format!("xl/media/image{image_count}.png"), &picture.data);
                images.push(("image", format!("../media/image{image_count}.png")));
            }
            pkg.part(
                &format!("xl/drawings/_rels/drawing{n}.xml.rels"),
                relationships(images),
            );
            pkg.part(&format!("xl/drawings/drawing{n}.xml"), drawing(&sheet.pictures));
        }
        pkg.finish()
    }
}

/// Chaining helper returned by [`XlsxBuilder::add_sheet`].
pub struct XlsxSheetAdder {
    builder: XlsxBuilder,
    sheet: SheetBuilder,
}

impl XlsxSheetAdder {
    #[must_use]
    pub fn add_cell<V: Into<CellValue>>(
        self,
        cell_ref: &str,
        value: V,
        style: Option<StyleBuilder>,
    ) -> Self {
        Self {
            sheet: self.sheet.cell(cell_ref, value, style),
            ..self
        }
    }

    #[must_use]
    pub fn add_merge(self, range: &str) -> Self {
        Self {
            sheet: self.sheet.merge(range),
            ..self
        }
    }

    #[must_use]
    pub fn done(mut self) -> XlsxBuilder {
        self.builder.sheets.push(self.sheet);
        self.builder
    }

    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.done().build()
    }
}

// --- xml writing ------------------------------------------------------------------

/// Append-only XML text with an implicit declaration.
struct Xml(String);

impl Xml {
    fn new() -> Self {
        Self(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#.to_string())
    }

    fn tag(&mut self, name: &str, attrs: &[(&str, &dyn Display)], close: &str) -> &mut Self {
        self.0.push('<');
        self.0.push_str(name);
        for (key, value) in attrs {
            let _ = write!(self.0, r#" {key}="{}""#, escape(&value.to_string()));
        }
        self.0.push_str(close);
        self
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &dyn Display)]) -> &mut Self {
        self.tag(name, attrs, ">")
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &dyn Display)]) -> &mut Self {
        self.tag(name, attrs, "/>")
    }

    fn close(&mut self, name: &str) -> &mut Self {
        let _ = write!(self.0, "</{name}>");
        self
    }

    fn text(&mut self, text: &str) -> &mut Self {
        self.0.push_str(&escape(text));
        self
    }

    /// `<name>text</name>`
    fn leaf(&mut self, name: &str, text: &dyn Display) -> &mut Self {
        self.open(name, &[]).text(&text.to_string()).close(name)
    }

    fn finish(&mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `#RRGGBB` to `FFRRGGBB`; eight-digit input is taken as ARGB already.
fn argb(color: &str) -> String {
    let hex = color.trim_start_matches('#').to_uppercase();
    if hex.len() == 8 {
        hex
    } else {
        format!("FF{hex}")
    }
}

struct Package {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl Package {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    fn binary(&mut self, path: &str, bytes: &[u8]) {
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        self.zip.start_file(path, options).expect("start zip entry");
        self.zip.write_all(bytes).expect("write zip entry");
    }

    fn part(&mut self, path: &str, xml: String) {
        self.binary(path, xml.as_bytes());
    }

    fn finish(mut self) -> Vec<u8> {
        self.zip.finish().expect("finish zip").into_inner()
    }
}

/// Relationships part with ids `rId1..` in iteration order.
fn relationships<'a>(targets: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let mut xml = Xml::new();
    xml.open("Relationships", &[("xmlns", &NS_PKG_REL)]);
    for (index, (kind, target)) in targets.into_iter().enumerate() {
        let id = format!("rId{}", index + 1);
        let kind = format!("{NS_REL}/{kind}");
        xml.empty(
            "Relationship",
            &[("Id", &id), ("Type", &kind), ("Target", &target)],
        );
    }
    xml.close("Relationships").finish()
}

fn content_types(sheets: &[SheetBuilder]) -> String {
    let mut xml = Xml::new();
    xml.open("Types", &[("xmlns", &NS_TYPES)]);
    for (ext, ty) in [
        ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
        ("xml", "application/xml"),
        ("png", "image/png"),
    ] {
        xml.empty("Default", &[("Extension", &ext), ("ContentType", &ty)]);
    }

    let mut overrides = vec![
        ("/xl/workbook.xml".to_string(), "spreadsheetml.sheet.main+xml"),
        ("/xl/styles.xml".to_string(), "spreadsheetml.styles+xml"),
        (
            "/xl/sharedStrings.xml".to_string(),
            "spreadsheetml.sharedStrings+xml",
        ),
    ];
    for (index, sheet) in sheets.iter().enumerate() {
        let n = index + 1;
        overrides.push((
            format!("/xl/worksheets/sheet{n}.xml"),
            "spreadsheetml.worksheet+xml",
        ));
        if !sheet.pictures.is_empty() {
            overrides.push((format!("/xl/drawings/drawing{n}.xml"), "drawing+xml"));
        }
    }
    for (part, suffix) in overrides {
        let ty = format!("{CT_PREFIX}.{suffix}");
        xml.empty("Override", &[("PartName", &part), ("ContentType", &ty)]);
    }
    xml.close("Types").finish()
}

fn workbook(sheets: &[SheetBuilder], date1904: bool) -> String {
    let mut xml = Xml::new();
    xml.open("workbook", &[("xmlns", &NS_MAIN), ("xmlns:r", &NS_REL)]);
    if date1904 {
        xml.empty("workbookPr", &[("date1904", &1)]);
    }
    xml.open("sheets", &[]);
    for (index, sheet) in sheets.iter().enumerate() {
        let n = index + 1;
        let rid = format!("rId{n}");
        xml.empty(
            "sheet",
            &[("name", &sheet.name), ("sheetId", &n), ("r:id", &rid)],
        );
    }
    xml.close("sheets").close("workbook").finish()
}

/// `<si>` record of a shared string value; `None` for other values.
fn si_record(value: &CellValue) -> Option<String> {
    match value {
        CellValue::String(s) => Some(fragment(|x| {
            x.open("si", &[])
                .open("t", &[("xml:space", &"preserve")])
                .text(s)
                .close("t")
                .close("si");
        })),
        CellValue::RichString(runs) => Some(fragment(|x| {
            x.open("si", &[]);
            for run in runs {
                x.open("r", &[]);
                if !run.plain {
                    x.open("rPr", &[]);
                    if run.bold {
                        x.empty("b", &[]);
                    }
                    if run.italic {
                        x.empty("i", &[]);
                    }
                    if run.superscript {
                        x.empty("vertAlign", &[("val", &"superscript")]);
                    }
                    if let Some(size) = run.font_size {
                        x.empty("sz", &[("val", &size)]);
                    }
                    if let Some(color) = &run.font_color {
                        x.empty("color", &[("rgb", color)]);
                    }
                    if let Some(name) = &run.font_name {
                        x.empty("rFont", &[("val", name)]);
                    }
                    x.close("rPr");
                }
                x.open("t", &[("xml:space", &"preserve")])
                    .text(&run.text)
                    .close("t")
                    .close("r");
            }
            x.close("si");
        })),
        _ => None,
    }
}

fn shared_strings(records: &[String]) -> String {
    let mut xml = Xml::new();
    let count = records.len();
    xml.open(
        "sst",
        &[("xmlns", &NS_MAIN), ("count", &count), ("uniqueCount", &count)],
    );
    xml.0.extend(records.iter().map(String::as_str));
    xml.close("sst").finish()
}

fn drawing(pictures: &[PictureEntry]) -> String {
    let mut xml = Xml::new();
    xml.open(
        "xdr:wsDr",
        &[("xmlns:xdr", &NS_XDR), ("xmlns:a", &NS_A), ("xmlns:r", &NS_REL)],
    );
    for (index, picture) in pictures.iter().enumerate() {
        xml.open("xdr:twoCellAnchor", &[("editAs", &"oneCell")]);
        for (tag, corner) in [("xdr:from", picture.from), ("xdr:to", picture.to)] {
            xml.open(tag, &[])
                .leaf("xdr:col", &corner.col)
                .leaf("xdr:colOff", &0)
                .leaf("xdr:row", &corner.row)
                .leaf("xdr:rowOff", &0)
                .close(tag);
        }
        let shape_id = index + 2;
        let embed = format!("rId{}", index + 1);
        xml.open("xdr:pic", &[])
            .open("xdr:nvPicPr", &[])
            .empty("xdr:cNvPr", &[("id", &shape_id), ("name", &picture.name)])
            .empty("xdr:cNvPicPr", &[])
            .close("xdr:nvPicPr")
            .open("xdr:blipFill", &[])
            .empty("a:blip", &[("r:embed", &embed)])
            .close("xdr:blipFill")
            .empty("xdr:spPr", &[])
            .close("xdr:pic")
            .empty("xdr:clientData", &[])
            .close("xdr:twoCellAnchor");
    }
    xml.close("xdr:wsDr").finish()
}

/// 1-indexed row number of a reference such as `B12`.
fn row_of(cell_ref: &str) -> u32 {
    cell_ref
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .expect("cell reference row")
}

fn worksheet(sheet: &SheetBuilder, strings: &[String], styles: &StyleTable) -> String {
    let mut xml = Xml::new();
    xml.open("worksheet", &[("xmlns", &NS_MAIN), ("xmlns:r", &NS_REL)]);

    if let Some(height) = sheet.default_row_height {
        xml.empty(
            "sheetFormatPr",
            &[("defaultRowHeight", &height), ("customHeight", &1)],
        );
    }

    if !sheet.col_widths.is_empty() {
        xml.open("cols", &[]);
        for (min, max, width) in &sheet.col_widths {
            xml.empty(
                "col",
                &[("min", min), ("max", max), ("width", width), ("customWidth", &1)],
            );
        }
        xml.close("cols");
    }

    let mut rows: BTreeMap<u32, Vec<&CellEntry>> = sheet
        .row_heights
        .keys()
        .map(|row| (*row, Vec::new()))
        .collect();
    for cell in &sheet.cells {
        rows.entry(row_of(&cell.at)).or_default().push(cell);
    }

    xml.open("sheetData", &[]);
    for (row, cells) in rows {
        match sheet.row_heights.get(&row) {
            Some(height) => xml.open("row", &[("r", &row), ("ht", height), ("customHeight", &1)]),
            None => xml.open("row", &[("r", &row)]),
        };
        for cell in cells {
            write_cell(&mut xml, cell, strings, styles);
        }
        xml.close("row");
    }
    xml.close("sheetData");

    if !sheet.merges.is_empty() {
        xml.open("mergeCells", &[("count", &sheet.merges.len())]);
        for range in &sheet.merges {
            xml.empty("mergeCell", &[("ref", range)]);
        }
        xml.close("mergeCells");
    }

    if let Some([left, right, top, bottom]) = sheet.margins {
        xml.empty(
            "pageMargins",
            &[
                ("left", &left),
                ("right", &right),
                ("top", &top),
                ("bottom", &bottom),
                ("header", &0.3),
                ("footer", &0.3),
            ],
        );
    }

    if let Some((paper, orientation)) = &sheet.page_setup {
        xml.empty(
            "pageSetup",
            &[("paperSize", paper), ("orientation", orientation)],
        );
    }

    if !sheet.pictures.is_empty() {
        xml.empty("drawing", &[("r:id", &"rId1")]);
    }

    xml.close("worksheet").finish()
}

fn write_cell(xml: &mut Xml, cell: &CellEntry, strings: &[String], styles: &StyleTable) {
    let style = cell
        .style
        .as_ref()
        .and_then(|s| styles.index_of(s))
        .filter(|idx| *idx > 0);

    let mut attrs: Vec<(&str, &dyn Display)> = vec![("r", &cell.at)];
    if let Some(idx) = &style {
        attrs.push(("s", idx));
    }

    let (kind, body): (Option<&str>, Option<String>) = match &cell.value {
        CellValue::String(_) | CellValue::RichString(_) => {
            let record = si_record(&cell.value);
            (
                Some("s"),
                Some(
                    strings
                        .iter()
                        .position(|x| Some(x) == record.as_ref())
                        .unwrap_or(0)
                        .to_string(),
                ),
            )
        }
        CellValue::Number(n) => (None, Some(n.to_string())),
        CellValue::Boolean(b) => (Some("b"), Some(u8::from(*b).to_string())),
        CellValue::Error(e) => (Some("e"), Some(e.clone())),
        CellValue::InlineString(s) => {
            attrs.push(("t", &"inlineStr"));
            xml.open("c", &attrs)
                .open("is", &[])
                .leaf("t", s)
                .close("is")
                .close("c");
            return;
        }
        CellValue::Empty => (None, None),
    };
    if let Some(kind) = &kind {
        attrs.push(("t", kind));
    }
    match body {
        Some(value) => {
            xml.open("c", &attrs).leaf("v", &value).close("c");
        }
        None => {
            xml.empty("c", &attrs);
        }
    }
}

// --- style table ------------------------------------------------------------------

/// styles.xml records, interned by their serialized form.
struct StyleTable {
    /// Custom format codes; the first gets id 164.
    num_fmts: Vec<String>,
    fonts: Vec<String>,
    fills: Vec<String>,
    borders: Vec<String>,
    xfs: Vec<String>,
    registered: Vec<(StyleBuilder, u32)>,
    default_font: (String, f64),
}

fn intern(list: &mut Vec<String>, record: String) -> usize {
    match list.iter().position(|r| *r == record) {
        Some(idx) => idx,
        None => {
            list.push(record);
            list.len() - 1
        }
    }
}

fn fragment(build: impl FnOnce(&mut Xml)) -> String {
    let mut xml = Xml(String::new());
    build(&mut xml);
    xml.finish()
}

impl StyleTable {
    fn new(font: &str, size: f64) -> Self {
        let mut table = Self {
            num_fmts: Vec::new(),
            fonts: Vec::new(),
            fills: Vec::new(),
            borders: Vec::new(),
            xfs: Vec::new(),
            registered: Vec::new(),
            default_font: (font.to_string(), size),
        };
        let base_font = table.font_record(&StyleBuilder::default());
        table.fonts.push(base_font);
        for pattern in ["none", "gray125"] {
            table.fills.push(fragment(|x| {
                x.open("fill", &[])
                    .empty("patternFill", &[("patternType", &pattern)])
                    .close("fill");
            }));
        }
        table.borders.push(Self::border_record(&StyleBuilder::default()));
        table
            .xfs
            .push(r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>"#.to_string());
        table
    }

    fn font_record(&self, style: &StyleBuilder) -> String {
        let name = style.font_name.as_ref().unwrap_or(&self.default_font.0);
        let size = style.font_size.unwrap_or(self.default_font.1);
        fragment(|x| {
            x.open("font", &[]);
            for (on, tag) in [
                (style.bold, "b"),
                (style.italic, "i"),
                (style.underline, "u"),
                (style.strikethrough, "strike"),
            ] {
                if on {
                    x.empty(tag, &[]);
                }
            }
            x.empty("sz", &[("val", &size)]);
            if let Some(color) = &style.font_color {
                x.empty("color", &[("rgb", color)]);
            }
            x.empty("name", &[("val", name)]).close("font");
        })
    }

    fn fill_record(style: &StyleBuilder) -> Option<String> {
        if style.bg_color.is_none() && style.pattern_type.is_none() {
            return None;
        }
        let pattern = style.pattern_type.as_deref().unwrap_or("solid");
        Some(fragment(|x| {
            x.open("fill", &[])
                .open("patternFill", &[("patternType", &pattern)]);
            if let Some(color) = &style.bg_color {
                x.empty("fgColor", &[("rgb", color)]);
            }
            x.close("patternFill").close("fill");
        }))
    }

    fn border_record(style: &StyleBuilder) -> String {
        fragment(|x| {
            x.open("border", &[]);
            for (tag, side) in [
                ("left", &style.border_left),
                ("right", &style.border_right),
                ("top", &style.border_top),
                ("bottom", &style.border_bottom),
            ] {
                match side {
                    Some(side) => {
                        x.open(tag, &[("style", &side.style)]);
                        if let Some(color) = &side.color {
                            x.empty("color", &[("rgb", color)]);
                        }
                        x.close(tag);
                    }
                    None => {
                        x.empty(tag, &[]);
                    }
                }
            }
            x.empty("diagonal", &[]).close("border");
        })
    }

    fn register(&mut self, style: &StyleBuilder) -> u32 {
        if let Some(idx) = self.index_of(style) {
            return idx;
        }

        let font_record = self.font_record(style);
        let font = intern(&mut self.fonts, font_record);
        let fill = Self::fill_record(style).map_or(0, |r| intern(&mut self.fills, r));
        let border = intern(&mut self.borders, Self::border_record(style));
        let aligned =
            style.align_horizontal.is_some() || style.align_vertical.is_some() || style.wrap_text;
        let num_fmt_id = match &style.number_format {
            Some(code) => 164 + intern(&mut self.num_fmts, code.clone()),
            None => style.number_format_id.map_or(0, |id| id as usize),
        };

        let record = fragment(|x| {
            let ids: [(&str, &dyn Display); 4] = [
                ("numFmtId", &num_fmt_id),
                ("fontId", &font),
                ("fillId", &fill),
                ("borderId", &border),
            ];
            if !aligned {
                x.empty("xf", &ids);
                return;
            }
            let mut attrs = ids.to_vec();
            attrs.push(("applyAlignment", &1));
            x.open("xf", &attrs);
            let mut align: Vec<(&str, &dyn Display)> = Vec::new();
            if let Some(h) = &style.align_horizontal {
                align.push(("horizontal", h));
            }
            if let Some(v) = &style.align_vertical {
                align.push(("vertical", v));
            }
            if style.wrap_text {
                align.push(("wrapText", &1));
            }
            x.empty("alignment", &align).close("xf");
        });

        self.xfs.push(record);
        let idx = (self.xfs.len() - 1) as u32;
        self.registered.push((style.clone(), idx));
        idx
    }

    fn index_of(&self, style: &StyleBuilder) -> Option<u32> {
        self.registered
            .iter()
            .find_map(|(known, idx)| (known == style).then_some(*idx))
    }

    fn to_xml(&self) -> String {
        let mut xml = Xml::new();
        xml.open("styleSheet", &[("xmlns", &NS_MAIN)]);
        if !self.num_fmts.is_empty() {
            xml.open("numFmts", &[("count", &self.num_fmts.len())]);
            for (index, code) in self.num_fmts.iter().enumerate() {
                let id = 164 + index;
                xml.empty("numFmt", &[("numFmtId", &id), ("formatCode", code)]);
            }
            xml.close("numFmts");
        }
        for (tag, records) in [
            ("fonts", &self.fonts),
            ("fills", &self.fills),
            ("borders", &self.borders),
        ] {
            xml.open(tag, &[("count", &records.len())]);
            xml.0.extend(records.iter().map(String::as_str));
            xml.close(tag);
        }
        xml.open("cellStyleXfs", &[("count", &1)])
            .empty(
                "xf",
                &[("numFmtId", &0), ("fontId", &0), ("fillId", &0), ("borderId", &0)],
            )
            .close("cellStyleXfs");
        xml.open("cellXfs", &[("count", &self.xfs.len())]);
        xml.0.extend(self.xfs.iter().map(String::as_str));
        xml.close("cellXfs");
        xml.open("cellStyles", &[("count", &1)])
            .empty(
                "cellStyle",
                &[("name", &"Normal"), ("xfId", &0), ("builtinId", &0)],
            )
            .close("cellStyles");
        xml.close("styleSheet").finish()
    }
}

// --- shortcuts ----------------------------------------------------------------------

/// One empty sheet named `Sheet1`.
#[must_use]
pub fn minimal_xlsx() -> Vec<u8> {
    XlsxBuilder::new().add_sheet("Sheet1").build()
}

/// `Sheet1!A1` holding `text`.
#[must_use]
pub fn xlsx_with_text(text: &str) -> Vec<u8> {
    XlsxBuilder::new()
        .add_sheet("Sheet1")
        .add_cell("A1", text, None)
        .build()
}

/// `Sheet1!A1` holding `value` with `style`.
#[must_use]
pub fn xlsx_with_styled_cell<V: Into<CellValue>>(value: V, style: StyleBuilder) -> Vec<u8> {
    XlsxBuilder::new()
        .add_sheet("Sheet1")
        .add_cell("A1", value, Some(style))
        .build()
}
