//! Parsing of xl/styles.xml and resolution of `cellXfs` into [`CellStyle`]s.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::BufRead;

use crate::color::{resolve_color, ColorSpec};
use crate::error::Result;
use crate::numfmt::builtin_format;
use crate::types::{Border, BorderStyle, CellStyle, Font, HAlign, UnderlineStyle, VAlign};
use crate::xml_helpers::{attr_bool, attr_string, attr_u32, attr_val, attr_val_f64, parse_color_attrs};

#[derive(Debug, Default, Clone)]
pub(super) struct RawFont {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub color: Option<ColorSpec>,
    pub bold: bool,
    pub italic: bool,
    pub underline: Option<UnderlineStyle>,
    pub strikethrough: bool,
}

#[derive(Debug, Default, Clone)]
pub(super) struct RawFill {
    pub pattern_type: Option<String>,
    pub fg_color: Option<ColorSpec>,
    pub bg_color: Option<ColorSpec>,
}

#[derive(Debug, Default, Clone)]
pub(super) struct RawBorderSide {
    pub style: String,
    pub color: Option<ColorSpec>,
}

#[derive(Debug, Default, Clone)]
pub(super) struct RawBorder {
    pub left: Option<RawBorderSide>,
    pub right: Option<RawBorderSide>,
    pub top: Option<RawBorderSide>,
    pub bottom: Option<RawBorderSide>,
}

#[derive(Debug, Default, Clone)]
pub(super) struct CellXf {
    pub num_fmt_id: u32,
    pub font_id: Option<u32>,
    pub fill_id: Option<u32>,
    pub border_id: Option<u32>,
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
}

#[derive(Debug, Default)]
pub(super) struct StyleSheet {
    pub fonts: Vec<RawFont>,
    pub fills: Vec<RawFill>,
    pub borders: Vec<RawBorder>,
    pub cell_xfs: Vec<CellXf>,
    pub indexed_colors: Option<Vec<String>>,
    /// Custom format codes from `<numFmts>`, keyed by `numFmtId`.
    pub num_fmts: HashMap<u32, String>,
}

pub(super) fn font_flag(e: &BytesStart) -> bool {
    attr_bool(e, b"val").unwrap_or(true)
}

pub(super) fn underline_style(e: &BytesStart) -> Option<UnderlineStyle> {
    match attr_val(e).as_deref() {
        None | Some("single") => Some(UnderlineStyle::Single),
        Some("double") => Some(UnderlineStyle::Double),
        Some("singleAccounting") => Some(UnderlineStyle::SingleAccounting),
        Some("doubleAccounting") => Some(UnderlineStyle::DoubleAccounting),
        _ => None,
    }
}

/// Parse styles.xml content
#[allow(clippy::too_many_lines)]
pub(super) fn parse_styles<R: BufRead>(reader: R) -> Result<StyleSheet> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut stylesheet = StyleSheet::default();
    let mut buf = Vec::new();

    let mut in_fonts = false;
    let mut in_fills = false;
    let mut in_borders = false;
    let mut in_cell_xfs = false;
    let mut in_indexed_colors = false;

    let mut current_font: Option<RawFont> = None;
    let mut current_fill: Option<RawFill> = None;
    let mut current_border: Option<RawBorder> = None;
    let mut current_side: Option<RawBorderSide> = None;
    let mut current_xf: Option<CellXf> = None;
    let mut indexed_colors: Vec<String> = Vec::new();

    loop {
        let event = xml.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"fonts" => in_fonts = !is_empty,
                    b"fills" => in_fills = !is_empty,
                    b"borders" => in_borders = !is_empty,
                    b"cellXfs" => in_cell_xfs = !is_empty,
                    b"indexedColors" => in_indexed_colors = !is_empty,

                    b"numFmt" => {
                        if let (Some(id), Some(code)) =
                            (attr_u32(e, b"numFmtId"), attr_string(e, b"formatCode"))
                        {
                            stylesheet.num_fmts.insert(id, code);
                        }
                    }

                    b"rgbColor" if in_indexed_colors => {
                        let spec = parse_color_attrs(e);
                        if let Some(color) = resolve_color(&spec, None) {
                            indexed_colors.push(color);
                        }
                    }

                    b"font" if in_fonts => {
                        if is_empty {
                            stylesheet.fonts.push(RawFont::default());
                        } else {
                            current_font = Some(RawFont::default());
                        }
                    }
                    b"sz" => {
                        if let Some(font) = current_font.as_mut() {
                            font.size = attr_val_f64(e);
                        }
                    }
                    b"name" => {
                        if let Some(font) = current_font.as_mut() {
                            font.name = attr_val(e);
                        }
                    }
                    b"b" => {
                        if let Some(font) = current_font.as_mut() {
                            font.bold = font_flag(e);
                        }
                    }
                    b"i" => {
                        if let Some(font) = current_font.as_mut() {
                            font.italic = font_flag(e);
                        }
                    }
                    b"strike" => {
                        if let Some(font) = current_font.as_mut() {
                            font.strikethrough = font_flag(e);
                        }
                    }
                    b"u" => {
                        if let Some(font) = current_font.as_mut() {
                            font.underline = underline_style(e);
                        }
                    }

                    b"fill" if in_fills => {
                        if is_empty {
                            stylesheet.fills.push(RawFill::default());
                        } else {
                            current_fill = Some(RawFill::default());
                        }
                    }
                    b"patternFill" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.pattern_type = attr_string(e, b"patternType");
                        }
                    }
                    b"fgColor" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.fg_color = Some(parse_color_attrs(e));
                        }
                    }
                    b"bgColor" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.bg_color = Some(parse_color_attrs(e));
                        }
                    }

                    b"border" if in_borders => {
                        if is_empty {
                            stylesheet.borders.push(RawBorder::default());
                        } else {
                            current_border = Some(RawBorder::default());
                        }
                    }
                    side @ (b"left" | b"right" | b"top" | b"bottom") if current_border.is_some() => {
                        let raw = RawBorderSide {
                            style: attr_string(e, b"style").unwrap_or_default(),
                            color: None,
                        };
                        if is_empty {
                            if let Some(border) = current_border.as_mut() {
                                set_side(border, side, raw);
                            }
                        } else {
                            current_side = Some(raw);
                        }
                    }

                    b"color" => {
                        let spec = parse_color_attrs(e);
                        if let Some(side) = current_side.as_mut() {
                            side.color = Some(spec);
                        } else if let Some(font) = current_font.as_mut() {
                            font.color = Some(spec);
                        }
                    }

                    b"xf" if in_cell_xfs => {
                        let xf = CellXf {
                            num_fmt_id: attr_u32(e, b"numFmtId").unwrap_or(0),
                            font_id: attr_u32(e, b"fontId"),
                            fill_id: attr_u32(e, b"fillId"),
                            border_id: attr_u32(e, b"borderId"),
                            ..CellXf::default()
                        };
                        if is_empty {
                            stylesheet.cell_xfs.push(xf);
                        } else {
                            current_xf = Some(xf);
                        }
                    }
                    b"alignment" => {
                        if let Some(xf) = current_xf.as_mut() {
                            xf.horizontal = attr_string(e, b"horizontal");
                            xf.vertical = attr_string(e, b"vertical");
                            xf.wrap_text = attr_bool(e, b"wrapText").unwrap_or(false);
                        }
                    }
                    _ => {}
                }
            }

            Event::End(ref e) => match e.local_name().as_ref() {
                b"fonts" => in_fonts = false,
                b"fills" => in_fills = false,
                b"borders" => in_borders = false,
                b"cellXfs" => in_cell_xfs = false,
                b"indexedColors" => in_indexed_colors = false,
                b"font" => {
                    if let Some(font) = current_font.take() {
                        stylesheet.fonts.push(font);
                    }
                }
                b"fill" => {
                    if let Some(fill) = current_fill.take() {
                        stylesheet.fills.push(fill);
                    }
                }
                side @ (b"left" | b"right" | b"top" | b"bottom") => {
                    if let (Some(raw), Some(border)) = (current_side.take(), current_border.as_mut())
                    {
                        set_side(border, side, raw);
                    }
                }
                b"border" => {
                    if let Some(border) = current_border.take() {
                        stylesheet.borders.push(border);
                    }
                }
                b"xf" => {
                    if let Some(xf) = current_xf.take() {
                        stylesheet.cell_xfs.push(xf);
                    }
                }
                _ => {}
            },

            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !indexed_colors.is_empty() {
        stylesheet.indexed_colors = Some(indexed_colors);
    }
    Ok(stylesheet)
}

fn set_side(border: &mut RawBorder, side: &[u8], raw: RawBorderSide) {
    if raw.style.is_empty() || raw.style == "none" {
        return;
    }
    match side {
        b"left" => border.left = Some(raw),
        b"right" => border.right = Some(raw),
        b"top" => border.top = Some(raw),
        _ => border.bottom = Some(raw),
    }
}

fn get<T>(items: &[T], id: Option<u32>) -> Option<&T> {
    items.get(usize::try_from(id?).ok()?)
}

impl StyleSheet {
    pub(super) fn palette(&self) -> Option<&[String]> {
        self.indexed_colors.as_deref()
    }

    fn resolve_font(&self, raw: &RawFont) -> Font {
        Font {
            name: raw.name.clone(),
            size: raw.size,
            color: raw
                .color
                .as_ref()
                .and_then(|c| resolve_color(c, self.palette())),
            bold: raw.bold,
            italic: raw.italic,
            underline: raw.underline,
            strikethrough: raw.strikethrough,
        }
    }

    fn resolve_border(&self, side: Option<&RawBorderSide>) -> Option<Border> {
        let side = side?;
        let style = BorderStyle::from_xlsx(&side.style);
        if style == BorderStyle::None {
            return None;
        }
        Some(Border {
            style,
            color: side
                .color
                .as_ref()
                .and_then(|c| resolve_color(c, self.palette())),
        })
    }

    /// Format code of a `numFmtId`: custom codes first, then built-ins.
    /// `None` for General and for unknown ids.
    fn number_format(&self, id: u32) -> Option<String> {
        let code = self
            .num_fmts
            .get(&id)
            .map(String::as_str)
            .or_else(|| builtin_format(id))?;
        if code.eq_ignore_ascii_case("general") {
            return None;
        }
        Some(code.to_string())
    }

    /// Only solid pattern fills become a background color.
    fn resolve_fill(&self, fill: &RawFill) -> Option<String> {
        match fill.pattern_type.as_deref() {
            Some("solid") => fill
                .fg_color
                .as_ref()
                .or(fill.bg_color.as_ref())
                .and_then(|c| resolve_color(c, self.palette())),
            _ => None,
        }
    }

    /// Font of the `Normal` style: the first font in the table.
    pub(super) fn default_font(&self) -> Font {
        self.fonts
            .first()
            .map(|raw| self.resolve_font(raw))
            .unwrap_or_default()
    }

    /// Resolve one `cellXfs` entry. Unset parts fall back to the default font.
    pub(super) fn resolve_xf(&self, xf: &CellXf) -> CellStyle {
        let font = get(&self.fonts, xf.font_id)
            .map(|raw| self.resolve_font(raw))
            .unwrap_or_else(|| self.default_font());
        let border = get(&self.borders, xf.border_id);

        CellStyle {
            font,
            bg_color: get(&self.fills, xf.fill_id).and_then(|f| self.resolve_fill(f)),
            border_top: self.resolve_border(border.and_then(|b| b.top.as_ref())),
            border_right: self.resolve_border(border.and_then(|b| b.right.as_ref())),
            border_bottom: self.resolve_border(border.and_then(|b| b.bottom.as_ref())),
            border_left: self.resolve_border(border.and_then(|b| b.left.as_ref())),
            align_h: xf.horizontal.as_deref().and_then(HAlign::from_xlsx),
            align_v: xf.vertical.as_deref().and_then(VAlign::from_xlsx),
            wrap: xf.wrap_text,
            num_fmt_id: xf.num_fmt_id,
            number_format: self.number_format(xf.num_fmt_id),
        }
    }

    pub(super) fn resolve_all(&self) -> Vec<CellStyle> {
        self.cell_xfs.iter().map(|xf| self.resolve_xf(xf)).collect()
    }
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

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1">
    <numFmt numFmtId="164" formatCode="yyyy/mm/dd;@"/>
  </numFmts>
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><i val="0"/><u/><sz val="14"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FF00FF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color rgb="FF0000FF"/></left><right style="medium"/><top/><bottom style="double"><color indexed="2"/></bottom></border>
  </borders>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="1" applyAlignment="1">
      <alignment horizontal="center" vertical="top" wrapText="1"/>
    </xf>
    <xf numFmtId="164" fontId="0" fillId="0" borderId="0" applyNumberFormat="1"/>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" applyNumberFormat="1"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn parses_tables() {
        let sheet = parse_styles(STYLES.as_bytes()).unwrap();
        assert_eq!(sheet.fonts.len(), 2);
        assert_eq!(sheet.fills.len(), 3);
        assert_eq!(sheet.borders.len(), 2);
        assert_eq!(sheet.cell_xfs.len(), 4);
        assert_eq!(sheet.num_fmts.get(&164).map(String::as_str), Some("yyyy/mm/dd;@"));
        assert!(sheet.borders[0].left.is_none());
    }

    #[test]
    fn resolves_styled_xf() {
        let sheet = parse_styles(STYLES.as_bytes()).unwrap();
        let styles = sheet.resolve_all();
        let plain = &styles[0];
        assert_eq!(plain.font.name.as_deref(), Some("Calibri"));
        assert_eq!(plain.font.color.as_deref(), Some("#000000"));
        assert!(plain.bg_color.is_none());

        let styled = &styles[1];
        assert!(styled.font.bold);
        assert!(!styled.font.italic);
        assert_eq!(styled.font.underline, Some(UnderlineStyle::Single));
        assert_eq!(styled.font.size, Some(14.0));
        assert_eq!(styled.font.color.as_deref(), Some("#FF0000"));
        assert_eq!(styled.bg_color.as_deref(), Some("#00FF00"));
        let left = styled.border_left.as_ref().unwrap();
        assert_eq!(left.style, BorderStyle::Thin);
        assert_eq!(left.color.as_deref(), Some("#0000FF"));
        assert_eq!(styled.border_right.as_ref().unwrap().style, BorderStyle::Medium);
        assert!(styled.border_right.as_ref().unwrap().color.is_none());
        assert!(styled.border_top.is_none());
        assert_eq!(
            styled.border_bottom.as_ref().unwrap().color.as_deref(),
            Some("#FF0000")
        );
        assert_eq!(styled.align_h, Some(HAlign::Center));
        assert_eq!(styled.align_v, Some(VAlign::Top));
        assert!(styled.wrap);
    }

    #[test]
    fn resolves_number_formats() {
        let sheet = parse_styles(STYLES.as_bytes()).unwrap();
        let styles = sheet.resolve_all();
        assert_eq!(styles[0].num_fmt_id, 0);
        assert!(styles[0].number_format.is_none());
        assert_eq!(styles[2].num_fmt_id, 164);
        assert_eq!(styles[2].number_format.as_deref(), Some("yyyy/mm/dd;@"));
        assert_eq!(styles[3].number_format.as_deref(), Some("mm-dd-yy"));
    }

    #[test]
    fn custom_code_overrides_builtin_id() {
        let mut sheet = StyleSheet::default();
        sheet.num_fmts.insert(14, "dd.mm.yyyy".into());
        let xf = CellXf {
            num_fmt_id: 14,
            ..CellXf::default()
        };
        assert_eq!(sheet.resolve_xf(&xf).number_format.as_deref(), Some("dd.mm.yyyy"));
        let unknown = CellXf {
            num_fmt_id: 300,
            ..CellXf::default()
        };
        assert!(sheet.resolve_xf(&unknown).number_format.is_none());
    }

    #[test]
    fn default_font_is_first() {
        let sheet = parse_styles(STYLES.as_bytes()).unwrap();
        assert_eq!(sheet.default_font().size, Some(11.0));
        assert_eq!(StyleSheet::default().default_font(), Font::default());
    }
}
