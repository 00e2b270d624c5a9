//! Translate resolved cell styles into the three declaration sets each
//! rendered cell carries: the `<td>` box, the content container span and
//! the value span.

use crate::color::css_color;
use crate::css::{DeclarationsBuilder, StyleDeclarations, StyleValue};
use crate::error::Result;
use crate::geometry::content_height;
use crate::numfmt::{format_general, NumberFormat};
use crate::types::{
    Border, BorderStyle, Cell, CellStyle, CellValue, Font, HAlign, RunStyle, VAlign, VerticalAlign, Workbook,
};
use crate::units::{Unit, UnitConverter};

/// Declaration sets for one cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellStyleSets {
    pub cell: StyleDeclarations,
    pub container: StyleDeclarations,
    pub value: StyleDeclarations,
    pub wrap: bool,
}

impl CellStyleSets {
    pub fn has_background(&self) -> bool {
        self.cell.contains("background-color")
    }
}

/// CSS shorthand for one border side. Missing sides draw nothing.
pub fn border_css(border: Option<&Border>) -> String {
    let Some(border) = border else {
        return "none".to_string();
    };
    let stroke = match border.style {
        BorderStyle::None => return "none".to_string(),
        BorderStyle::Thin | BorderStyle::Hair => "1px solid",
        BorderStyle::Medium => "2px solid",
        BorderStyle::Thick => "1.5pt solid",
        BorderStyle::Double => "1.5pt double",
        BorderStyle::Dotted => "1px dotted",
        BorderStyle::Dashed | BorderStyle::DashDot | BorderStyle::DashDotDot => "1px dashed",
        BorderStyle::SlantDashDot => "1px dashed",
        BorderStyle::MediumDashed | BorderStyle::MediumDashDot | BorderStyle::MediumDashDotDot => {
            "2px dashed"
        }
    };
    let color = border
        .color
        .as_deref()
        .and_then(css_color)
        .unwrap_or_else(|| "black".to_string());
    format!("{stroke} {color}")
}

/// Render a font name as a CSS `font-family` value.
///
/// Names made of plain identifier words pass through unquoted. Anything else
/// becomes a single-quoted string with every character outside a small safe
/// set written as a CSS hex escape, so the value can never close the
/// declaration, the rule or the enclosing `<style>` element.
pub(crate) fn font_family_value(name: &str) -> Option<String> {
    let name: String = name.chars().filter(|c| !c.is_control()).collect();
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let plain = name.split(' ').all(|word| {
        word.chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && word.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    });
    if plain {
        return Some(name.to_string());
    }
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('\'');
    for c in name.chars() {
        if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | ',' | '&' | '(' | ')') {
            quoted.push(c);
        } else {
            quoted.push_str(&format!("\\{:X} ", u32::from(c)));
        }
    }
    quoted.push('\'');
    Some(quoted)
}

fn text_decoration(font: &Font) -> Option<&'static str> {
    match (font.underline.is_some(), font.strikethrough) {
        (true, true) => Some("underline line-through"),
        (true, false) => Some("underline"),
        (false, true) => Some("line-through"),
        (false, false) => None,
    }
}

fn run_decoration(run: &RunStyle) -> Option<&'static str> {
    match (run.underline.is_some(), run.strikethrough) {
        (true, Some(true)) => Some("underline line-through"),
        (true, _) => Some("underline"),
        (false, Some(true)) => Some("line-through"),
        (false, Some(false)) => Some("none"),
        (false, None) => None,
    }
}

/// `text-align` and `justify-content` for a horizontal alignment.
fn horizontal(align: Option<HAlign>, value: &CellValue) -> &'static [(&'static str, &'static str)] {
    const LEFT: &[(&str, &str)] = &[("text-align", "left"), ("justify-content", "flex-start")];
    const CENTER: &[(&str, &str)] = &[("text-align", "center"), ("justify-content", "center")];
    const RIGHT: &[(&str, &str)] = &[("text-align", "right"), ("justify-content", "flex-end")];

    match align.unwrap_or(HAlign::General) {
        HAlign::General => match value {
            CellValue::Number(_) => RIGHT,
            CellValue::Text(_) | CellValue::RichText(_) => LEFT,
            CellValue::Boolean(_) => CENTER,
            CellValue::Empty | CellValue::Error(_) => &[],
        },
        HAlign::Left => LEFT,
        HAlign::Center => CENTER,
        HAlign::Right => RIGHT,
        HAlign::CenterContinuous => &[("text-align", "center")],
        HAlign::Justify => &[("text-align", "justify")],
        HAlign::Distributed => &[("text-align", "justify"), ("text-align-last", "justify")],
        // No CSS equivalent for repeating content across the width.
        HAlign::Fill => &[],
    }
}

/// `vertical-align` and `align-items`. Cells without a vertical alignment
/// sit at the bottom.
fn vertical(align: Option<VAlign>) -> &'static [(&'static str, &'static str)] {
    match align.unwrap_or(VAlign::Bottom) {
        VAlign::Top => &[("vertical-align", "baseline"), ("align-items", "flex-start")],
        VAlign::Center => &[("vertical-align", "middle"), ("align-items", "center")],
        VAlign::Bottom => &[("vertical-align", "bottom"), ("align-items", "flex-end")],
        VAlign::Justify | VAlign::Distributed => &[],
    }
}

/// Builds declaration sets and display text for the cells of one workbook.
#[derive(Clone, Debug)]
pub struct CellStyler<'a> {
    workbook: &'a Workbook,
    conv: UnitConverter,
    inset_px: f64,
    /// Compiled number format per style index; `None` for General.
    formats: Vec<Option<NumberFormat>>,
}

impl<'a> CellStyler<'a> {
    pub fn new(workbook: &'a Workbook, conv: UnitConverter, inset_px: f64) -> Self {
        let formats = workbook
            .styles
            .iter()
            .map(|s| s.number_format.as_deref().map(NumberFormat::parse))
            .collect();
        Self {
            workbook,
            conv,
            inset_px,
            formats,
        }
    }

    fn number_format(&self, cell: &Cell) -> Option<&NumberFormat> {
        let index = usize::try_from(cell.style.unwrap_or(0)).ok()?;
        self.formats.get(index)?.as_ref()
    }

    /// Text a cell shows once its number format is applied.
    pub fn display_text(&self, cell: &Cell) -> String {
        let format = self.number_format(cell);
        match (&cell.value, format) {
            (CellValue::Number(n), Some(format)) => format.format_number(*n, self.workbook.date1904),
            (CellValue::Number(n), None) => format_general(*n),
            (CellValue::Text(s), Some(format)) => format.format_text(s),
            (value, _) => value.display(),
        }
    }

    /// Inline declarations for a rich text run. Only properties the run
    /// sets are declared; the rest come from the cell's container.
    pub fn run_declarations(&self, run: &RunStyle) -> Result<StyleDeclarations> {
        let size = run
            .font_size
            .map(|pt| self.conv.output_length(pt, Unit::Point))
            .transpose()?;
        let vertical_align = run.vert_align.and_then(|v| match v {
            VerticalAlign::Superscript => Some("super"),
            VerticalAlign::Subscript => Some("sub"),
            VerticalAlign::Baseline => None,
        });
        Ok(StyleDeclarations::builder()
            .set_opt("color", run.font_color.as_deref().and_then(css_color))
            .set_opt("font-weight", run.bold.map(|b| if b { "bold" } else { "normal" }))
            .set_opt("font-style", run.italic.map(|i| if i { "italic" } else { "normal" }))
            .set_opt("text-decoration", run_decoration(run))
            .set_opt("font-size", size)
            .set_opt("font-family", run.font_family.as_deref().and_then(font_family_value))
            .set_opt("vertical-align", vertical_align)
            .build())
    }

    /// Resolved style of a cell. Unstyled cells use the workbook's first
    /// cell format.
    pub fn style_of(&self, cell: Option<&Cell>) -> Option<&'a CellStyle> {
        let index = cell.and_then(|c| c.style).unwrap_or(0);
        let style = self.workbook.style(index);
        if style.is_none() && index != 0 {
            log::warn!("cell references missing style {index}");
        }
        style
    }

    /// Declarations for the `<td>` box.
    pub fn box_declarations(
        &self,
        style: Option<&CellStyle>,
        height_pt: f64,
        width_px: f64,
    ) -> Result<StyleDeclarations> {
        let height = self.conv.output_length(height_pt, Unit::Point)?;
        let width = StyleValue::Length(self.conv.measure(width_px, Unit::Pixel)?);
        let background = style
            .and_then(|s| s.bg_color.as_deref())
            .and_then(css_color);

        Ok(StyleDeclarations::builder()
            .set("height", height)
            .set_all(&["width", "min-width", "max-width"], &width)
            .set("border-top", border_css(style.and_then(|s| s.border_top.as_ref())))
            .set("border-right", border_css(style.and_then(|s| s.border_right.as_ref())))
            .set("border-bottom", border_css(style.and_then(|s| s.border_bottom.as_ref())))
            .set("border-left", border_css(style.and_then(|s| s.border_left.as_ref())))
            .set_opt("background-color", background)
            .build())
    }

    /// Declarations for the content container span.
    pub fn container_declarations(
        &self,
        style: Option<&CellStyle>,
        height_pt: f64,
    ) -> Result<StyleDeclarations> {
        let inner = StyleValue::Length(
            content_height(height_pt, self.inset_px, &self.conv)?.to(self.conv.output()),
        );
        let builder = StyleDeclarations::builder()
            .set_all(&["height", "min-height", "max-height"], &inner);
        let builder = if style.is_some_and(|s| s.wrap) {
            builder
                .set("white-space", "pre-wrap")
                .set("word-break", "break-word")
        } else {
            builder.set("white-space", "pre")
        };
        self.font_declarations(builder, style.map(|s| &s.font))
    }

    fn font_declarations(
        &self,
        builder: DeclarationsBuilder,
        font: Option<&Font>,
    ) -> Result<StyleDeclarations> {
        let default = &self.workbook.default_font;
        let font = font.unwrap_or(default);
        let size_pt = font.size.unwrap_or_else(|| self.workbook.default_font_size());
        let family = font
            .name
            .as_deref()
            .unwrap_or_else(|| self.workbook.default_font_name());

        Ok(builder
            .set_opt("color", font.color.as_deref().and_then(css_color))
            .set_opt("font-weight", font.bold.then_some("bold"))
            .set_opt("font-style", font.italic.then_some("italic"))
            .set_opt("text-decoration", text_decoration(font))
            .set("font-size", self.conv.output_length(size_pt, Unit::Point)?)
            .set_opt("font-family", font_family_value(family))
            .build())
    }

    /// Declarations for the value span.
    pub fn value_declarations(style: Option<&CellStyle>, value: &CellValue) -> StyleDeclarations {
        horizontal(style.and_then(|s| s.align_h), value)
            .iter()
            .chain(vertical(style.and_then(|s| s.align_v)))
            .copied()
            .collect()
    }

    /// All three sets for a cell with the given row height and column width.
    pub fn sets_for(&self, cell: Option<&Cell>, height_pt: f64, width_px: f64) -> Result<CellStyleSets> {
        let style = self.style_of(cell);
        let value = cell.map_or(&CellValue::Empty, |c| &c.value);
        Ok(CellStyleSets {
            cell: self.box_declarations(style, height_pt, width_px)?,
            container: self.container_declarations(style, height_pt)?,
            value: Self::value_declarations(style, value),
            wrap: style.is_some_and(|s| s.wrap),
        })
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
    use crate::types::UnderlineStyle;
    use test_case::test_case;

    fn text(decls: &StyleDeclarations, name: &str) -> Option<String> {
        decls.get(name).map(|v| v.render().unwrap())
    }

    #[test_case(BorderStyle::Thin => "1px solid black")]
    #[test_case(BorderStyle::Medium => "2px solid black")]
    #[test_case(BorderStyle::Dashed => "1px dashed black")]
    #[test_case(BorderStyle::Dotted => "1px dotted black")]
    #[test_case(BorderStyle::Thick => "1.5pt solid black")]
    #[test_case(BorderStyle::Double => "1.5pt double black")]
    #[test_case(BorderStyle::Hair => "1px solid black")]
    #[test_case(BorderStyle::MediumDashed => "2px dashed black")]
    #[test_case(BorderStyle::MediumDashDotDot => "2px dashed black")]
    #[test_case(BorderStyle::SlantDashDot => "1px dashed black")]
    #[test_case(BorderStyle::None => "none")]
    fn border_mapping(style: BorderStyle) -> String {
        border_css(Some(&Border { style, color: None }))
    }

    #[test]
    fn border_color_and_missing_side() {
        let border = Border {
            style: BorderStyle::Thin,
            color: Some("#FF0000".into()),
        };
        assert_eq!(border_css(Some(&border)), "1px solid rgb(255, 0, 0)");
        assert_eq!(border_css(None), "none");
    }

    #[test_case(CellValue::Number(1.0), "right", "flex-end")]
    #[test_case(CellValue::Text("a".into()), "left", "flex-start")]
    #[test_case(CellValue::Boolean(true), "center", "center")]
    fn general_alignment_follows_value(value: CellValue, align: &str, justify: &str) {
        let decls = CellStyler::value_declarations(None, &value);
        assert_eq!(text(&decls, "text-align").as_deref(), Some(align));
        assert_eq!(text(&decls, "justify-content").as_deref(), Some(justify));
        assert_eq!(text(&decls, "align-items").as_deref(), Some("flex-end"));
    }

    #[test]
    fn explicit_alignment_wins() {
        let style = CellStyle {
            align_h: Some(HAlign::Center),
            align_v: Some(VAlign::Top),
            ..CellStyle::default()
        };
        let decls = CellStyler::value_declarations(Some(&style), &CellValue::Number(3.0));
        assert_eq!(text(&decls, "text-align").as_deref(), Some("center"));
        assert_eq!(text(&decls, "vertical-align").as_deref(), Some("baseline"));
        assert_eq!(text(&decls, "align-items").as_deref(), Some("flex-start"));
    }

    #[test]
    fn box_has_geometry_borders_and_fill() {
        let wb = Workbook::default();
        let styler = CellStyler::new(&wb, UnitConverter::default(), 3.0);
        let style = CellStyle {
            bg_color: Some("#00FF00".into()),
            border_bottom: Some(Border {
                style: BorderStyle::Medium,
                color: None,
            }),
            ..CellStyle::default()
        };
        let decls = styler.box_declarations(Some(&style), 15.0, 64.0).unwrap();
        assert_eq!(
            decls.to_inline().unwrap(),
            "background-color: rgb(0, 255, 0); border-bottom: 2px solid black; \
             border-left: none; border-right: none; border-top: none; height: 15.00pt; \
             max-width: 64.00px; min-width: 64.00px; width: 64.00px"
        );
    }

    #[test]
    fn container_wrap_and_font() {
        let wb = Workbook::default();
        let styler = CellStyler::new(&wb, UnitConverter::default(), 3.0);
        let style = CellStyle {
            wrap: true,
            font: Font {
                bold: true,
                italic: true,
                underline: Some(UnderlineStyle::Single),
                color: Some("#0000FF".into()),
                size: Some(14.0),
                name: Some("Arial".into()),
                ..Font::default()
            },
            ..CellStyle::default()
        };
        let decls = styler.container_declarations(Some(&style), 15.0).unwrap();
        assert_eq!(text(&decls, "white-space").as_deref(), Some("pre-wrap"));
        assert_eq!(text(&decls, "word-break").as_deref(), Some("break-word"));
        assert_eq!(text(&decls, "font-weight").as_deref(), Some("bold"));
        assert_eq!(text(&decls, "font-style").as_deref(), Some("italic"));
        assert_eq!(text(&decls, "text-decoration").as_deref(), Some("underline"));
        assert_eq!(text(&decls, "color").as_deref(), Some("rgb(0, 0, 255)"));
        assert_eq!(text(&decls, "font-size").as_deref(), Some("14.00pt"));
        assert_eq!(text(&decls, "font-family").as_deref(), Some("Arial"));
        // 15pt minus 3px (2.25pt).
        assert_eq!(text(&decls, "max-height").as_deref(), Some("12.75pt"));
    }

    #[test]
    fn unstyled_cell_uses_default_font() {
        let wb = Workbook::default();
        let styler = CellStyler::new(&wb, UnitConverter::default(), 3.0);
        let decls = styler.container_declarations(None, 15.0).unwrap();
        assert_eq!(text(&decls, "white-space").as_deref(), Some("pre"));
        assert_eq!(text(&decls, "font-family").as_deref(), Some("Calibri"));
        assert_eq!(text(&decls, "font-size").as_deref(), Some("11.00pt"));
        assert!(!decls.contains("font-weight"));
    }

    #[test]
    fn plain_font_names_stay_unquoted() {
        assert_eq!(font_family_value("Times New Roman").as_deref(), Some("Times New Roman"));
        assert_eq!(font_family_value(" Arial ").as_deref(), Some("Arial"));
        assert_eq!(font_family_value(" \n "), None);
    }

    #[test]
    fn hostile_font_name_is_quoted_and_escaped() {
        assert_eq!(
            font_family_value("Evil; color: red").as_deref(),
            Some("'Evil\\3B  color\\3A  red'")
        );
        let value = font_family_value("</style><script>alert(1)</script>").unwrap();
        assert!(!value.contains('<'));
        assert!(!value.contains('>'));
        assert!(value.starts_with("'\\3C \\2F style"));
        assert_eq!(
            font_family_value("O'Brien \\ Co").as_deref(),
            Some("'O\\27 Brien \\5C  Co'")
        );
        // Digits cannot start an unquoted family name.
        assert_eq!(font_family_value("3M Sans").as_deref(), Some("'3M Sans'"));
    }

    fn formatted_workbook() -> Workbook {
        Workbook {
            styles: vec![
                CellStyle::default(),
                CellStyle {
                    num_fmt_id: 14,
                    number_format: Some("yyyy-mm-dd".into()),
                    ..CellStyle::default()
                },
                CellStyle {
                    num_fmt_id: 10,
                    number_format: Some("0.00%".into()),
                    ..CellStyle::default()
                },
                CellStyle {
                    num_fmt_id: 164,
                    number_format: Some("0;-0;0;\"[\"@\"]\"".into()),
                    ..CellStyle::default()
                },
            ],
            ..Workbook::default()
        }
    }

    #[test_case(CellValue::Number(45000.0), 1 => "2023-03-15"; "date")]
    #[test_case(CellValue::Number(0.125), 2 => "12.50%"; "percent")]
    #[test_case(CellValue::Number(0.125), 0 => "0.125"; "general")]
    #[test_case(CellValue::Text("x".into()), 3 => "[x]"; "text section")]
    #[test_case(CellValue::Boolean(false), 2 => "FALSE"; "boolean ignores format")]
    fn display_text_applies_number_format(value: CellValue, style: u32) -> String {
        let wb = formatted_workbook();
        let styler = CellStyler::new(&wb, UnitConverter::default(), 3.0);
        styler.display_text(&Cell {
            value,
            style: Some(style),
        })
    }

    #[test]
    fn date1904_workbook_shifts_dates() {
        let wb = Workbook {
            date1904: true,
            ..formatted_workbook()
        };
        let styler = CellStyler::new(&wb, UnitConverter::default(), 3.0);
        let cell = Cell {
            value: CellValue::Number(0.0),
            style: Some(1),
        };
        assert_eq!(styler.display_text(&cell), "1904-01-01");
    }

    #[test]
    fn run_declarations_only_set_what_the_run_sets() {
        let wb = Workbook::default();
        let styler = CellStyler::new(&wb, UnitConverter::default(), 3.0);
        let run = RunStyle {
            bold: Some(false),
            font_color: Some("#FF0000".into()),
            font_size: Some(8.0),
            vert_align: Some(VerticalAlign::Superscript),
            ..RunStyle::default()
        };
        let decls = styler.run_declarations(&run).unwrap();
        assert_eq!(
            decls.to_inline().unwrap(),
            "color: rgb(255, 0, 0); font-size: 8.00pt; font-weight: normal; vertical-align: super"
        );
        assert!(styler.run_declarations(&RunStyle::default()).unwrap().is_empty());
    }

    #[test]
    fn run_font_family_is_escaped() {
        let wb = Workbook::default();
        let styler = CellStyler::new(&wb, UnitConverter::default(), 3.0);
        let run = RunStyle {
            font_family: Some("x}</style>".into()),
            ..RunStyle::default()
        };
        let family = text(&styler.run_declarations(&run).unwrap(), "font-family").unwrap();
        assert!(!family.contains('<'));
        assert!(!family.contains('}'));
    }

    #[test]
    fn dangling_style_index_falls_back_to_none() {
        let wb = Workbook::default();
        let styler = CellStyler::new(&wb, UnitConverter::default(), 3.0);
        let cell = Cell {
            value: CellValue::Number(1.0),
            style: Some(99),
        };
        assert!(styler.style_of(Some(&cell)).is_none());
        let sets = styler.sets_for(Some(&cell), 15.0, 64.0).unwrap();
        assert!(!sets.has_background());
        assert!(!sets.wrap);
    }
}
