//! Shared string table (xl/sharedStrings.xml), keeping rich text runs.
//!
//! ```xml
//! <si><t>Plain text</t></si>
//! <si>
//!   <r><rPr><b/><sz val="12"/><color rgb="FFFF0000"/><rFont val="Arial"/></rPr><t>Styled</t></r>
//!   <r><t> normal</t></r>
//! </si>
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

use crate::color::resolve_color;
use crate::types::{RunStyle, TextRun, VerticalAlign};
use crate::xml_helpers::{attr_val, attr_val_f64, parse_color_attrs};

use super::styles::{font_flag, underline_style};

/// One `<si>` entry.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum SharedString {
    Plain(String),
    Rich(Vec<TextRun>),
}

impl Default for SharedString {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

fn apply_run_property(style: &mut RunStyle, e: &BytesStart, palette: Option<&[String]>) {
    match e.local_name().as_ref() {
        b"b" => style.bold = Some(font_flag(e)),
        b"i" => style.italic = Some(font_flag(e)),
        b"strike" => style.strikethrough = Some(font_flag(e)),
        b"u" => style.underline = underline_style(e),
        b"sz" => style.font_size = attr_val_f64(e),
        b"rFont" => style.font_family = attr_val(e),
        b"color" => style.font_color = resolve_color(&parse_color_attrs(e), palette),
        b"vertAlign" => style.vert_align = attr_val(e).as_deref().and_then(VerticalAlign::from_xlsx),
        _ => {}
    }
}

/// Parse a shared string table. Phonetic runs (`<rPh>`) are skipped.
pub(super) fn parse_shared_strings_xml<R: BufRead>(
    reader: R,
    palette: Option<&[String]>,
) -> Vec<SharedString> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut plain = String::new();
    let mut runs: Vec<TextRun> = Vec::new();
    let mut run: Option<TextRun> = None;
    let mut in_si = false;
    let mut in_t = false;
    let mut in_rpr = false;
    let mut in_rph = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    plain.clear();
                    runs.clear();
                }
                b"rPh" => in_rph = true,
                b"r" if in_si && !in_rph => run = Some(TextRun::default()),
                b"rPr" => {
                    if let Some(run) = run.as_mut() {
                        in_rpr = true;
                        run.style = Some(RunStyle::default());
                    }
                }
                b"t" if in_si && !in_rph => in_t = true,
                _ if in_rpr => {
                    if let Some(style) = run.as_mut().and_then(|r| r.style.as_mut()) {
                        apply_run_property(style, e, palette);
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"si" => strings.push(SharedString::default()),
                b"rPr" => {
                    if let Some(run) = run.as_mut() {
                        run.style = Some(RunStyle::default());
                    }
                }
                _ if in_rpr => {
                    if let Some(style) = run.as_mut().and_then(|r| r.style.as_mut()) {
                        apply_run_property(style, e, palette);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_t => {
                if let Ok(text) = e.unescape() {
                    match run.as_mut() {
                        Some(run) => run.text.push_str(&text),
                        None => plain.push_str(&text),
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    let entry = if runs.is_empty() {
                        SharedString::Plain(std::mem::take(&mut plain))
                    } else {
                        SharedString::Rich(std::mem::take(&mut runs))
                    };
                    strings.push(entry);
                    in_si = false;
                }
                b"r" => {
                    if let Some(run) = run.take() {
                        runs.push(run);
                    }
                }
                b"rPr" => in_rpr = false,
                b"rPh" => in_rph = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    strings
}

/// Read the shared string table. A missing part yields an empty table.
pub(super) fn parse_shared_strings<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
    palette: Option<&[String]>,
) -> Vec<SharedString> {
    let sst_path = path.unwrap_or("xl/sharedStrings.xml");
    let Ok(file) = archive.by_name(sst_path) else {
        return Vec::new();
    };
    parse_shared_strings_xml(BufReader::new(file), palette)
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

    const SST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
  <si><t xml:space="preserve">plain  </t></si>
  <si/>
  <si>
    <r><rPr><b/><i val="0"/><u/><sz val="14"/><color rgb="FFFF0000"/><rFont val="Arial"/></rPr><t>Bold</t></r>
    <r><t xml:space="preserve"> and </t></r>
    <r><rPr><vertAlign val="superscript"/><color indexed="2"/><strike/></rPr><t>2</t></r>
  </si>
  <si><t>漢字</t><rPh sb="0" eb="2"><t>カンジ</t></rPh></si>
</sst>"#;

    #[test]
    fn keeps_plain_and_empty_entries() {
        let strings = parse_shared_strings_xml(SST.as_bytes(), None);
        assert_eq!(strings.len(), 4);
        assert_eq!(strings[0], SharedString::Plain("plain  ".into()));
        assert_eq!(strings[1], SharedString::Plain(String::new()));
        assert_eq!(strings[3], SharedString::Plain("漢字".into()));
    }

    #[test]
    fn keeps_rich_runs_with_their_fonts() {
        let strings = parse_shared_strings_xml(SST.as_bytes(), None);
        let SharedString::Rich(runs) = &strings[2] else {
            panic!("expected rich text, got {:?}", strings[2]);
        };
        assert_eq!(runs.len(), 3);

        let bold = runs[0].style.as_ref().unwrap();
        assert_eq!(runs[0].text, "Bold");
        assert_eq!(bold.bold, Some(true));
        assert_eq!(bold.italic, Some(false));
        assert_eq!(bold.underline, Some(UnderlineStyle::Single));
        assert_eq!(bold.font_size, Some(14.0));
        assert_eq!(bold.font_color.as_deref(), Some("#FF0000"));
        assert_eq!(bold.font_family.as_deref(), Some("Arial"));

        assert_eq!(runs[1].text, " and ");
        assert!(runs[1].style.is_none());

        let sup = runs[2].style.as_ref().unwrap();
        assert_eq!(sup.vert_align, Some(VerticalAlign::Superscript));
        assert_eq!(sup.strikethrough, Some(true));
        assert_eq!(sup.font_color.as_deref(), Some("#FF0000"));
        assert!(sup.bold.is_none());
    }

    #[test]
    fn custom_palette_colors_runs() {
        let palette = vec!["#000000".to_string(), "#FFFFFF".to_string(), "#123456".to_string()];
        let strings = parse_shared_strings_xml(SST.as_bytes(), Some(palette.as_slice()));
        let SharedString::Rich(runs) = &strings[2] else {
            panic!("expected rich text");
        };
        assert_eq!(
            runs[2].style.as_ref().unwrap().font_color.as_deref(),
            Some("#123456")
        );
    }
}
