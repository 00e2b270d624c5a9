//! Main XLSX parser
//!
//! Reads the ZIP package into a [`Workbook`]: workbook relationships, styles,
//! shared strings (with rich text runs), each worksheet and the pictures of
//! its drawing part.
//! Optional parts that are missing are not errors.

mod drawings;
mod relationships;
mod shared_strings;
mod styles;
mod worksheet;

use std::io::{BufReader, Cursor};
use zip::ZipArchive;

use crate::error::Result;
use crate::types::Workbook;
use crate::units::digit_width_for_font;

use drawings::parse_drawing;
use relationships::{parse_part_relationships, parse_workbook_info, parse_workbook_relationships};
use shared_strings::parse_shared_strings;
use styles::{parse_styles, StyleSheet};
use worksheet::parse_sheet;

/// Parse an XLSX file from bytes.
pub fn parse(data: &[u8]) -> Result<Workbook> {
    parse_with(data, true)
}

/// Parse an XLSX file, optionally skipping drawing parts.
pub fn parse_with(data: &[u8], load_pictures: bool) -> Result<Workbook> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let relationships = parse_workbook_relationships(&mut archive);

    let styles_path = relationships.styles.as_deref().unwrap_or("xl/styles.xml");
    let stylesheet = match archive.by_name(styles_path) {
        Ok(file) => parse_styles(BufReader::new(file))?,
        Err(_) => StyleSheet::default(),
    };
    // Run colors resolve against the stylesheet's palette.
    let shared_strings = parse_shared_strings(
        &mut archive,
        relationships.shared_strings.as_deref(),
        stylesheet.palette(),
    );
    let workbook_info = parse_workbook_info(&mut archive, &relationships.worksheets)?;

    let mut workbook = Workbook {
        sheets: Vec::new(),
        styles: stylesheet.resolve_all(),
        default_font: stylesheet.default_font(),
        date1904: workbook_info.date1904,
    };
    let digit_width = digit_width_for_font(workbook.default_font_name());

    for info in workbook_info.sheets {
        let parsed = match parse_sheet(&mut archive, &info, &shared_strings, digit_width) {
            Ok(parsed) => parsed,
            Err(crate::error::XlhtmlError::Zip(err)) => {
                log::warn!("sheet {} ({}) is missing: {err}", info.name, info.path);
                continue;
            }
            Err(err) => return Err(err),
        };
        let mut sheet = parsed.sheet;

        if load_pictures {
            if let Some(rel_id) = parsed.drawing_rel {
                let rels = parse_part_relationships(&mut archive, &info.path);
                if let Some(rel) = rels.get(&rel_id) {
                    sheet.pictures = parse_drawing(&mut archive, &rel.target)?;
                }
            }
        }

        workbook.sheets.push(sheet);
    }

    log::debug!(
        "parsed {} sheets, {} styles, {} shared strings",
        workbook.sheets.len(),
        workbook.styles.len(),
        shared_strings.len()
    );
    Ok(workbook)
}
