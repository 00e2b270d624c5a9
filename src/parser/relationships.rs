//! Package relationships and the workbook's sheet list.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

use crate::error::Result;
use crate::xml_helpers::{attr_bool, attr_string, attr_string_local};

use super::worksheet::SheetInfo;

/// One `<Relationship>` entry with its target resolved to a package path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Relationship {
    pub rel_type: String,
    pub target: String,
}

/// Workbook relationships parsed from xl/_rels/workbook.xml.rels
#[derive(Default, Debug)]
pub(super) struct WorkbookRelationships {
    /// rId -> full worksheet path, e.g. "xl/worksheets/sheet1.xml"
    pub worksheets: HashMap<String, String>,
    pub shared_strings: Option<String>,
    pub styles: Option<String>,
}

/// Relationships file for a part: "xl/drawings/drawing1.xml" ->
/// "xl/drawings/_rels/drawing1.xml.rels"
pub(super) fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

/// Resolve a relationship target against the directory of its source part.
///
/// Absolute targets ("/xl/media/image1.png") are package-rooted.
pub(super) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        return stripped.to_string();
    }

    let mut components: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for part in target.split('/') {
        match part {
            ".." => {
                components.pop();
            }
            "." | "" => {}
            _ => components.push(part),
        }
    }
    components.join("/")
}

/// Parse the relationships of `part_path`, keyed by rId.
///
/// A missing rels file yields an empty map.
pub(super) fn parse_part_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part_path: &str,
) -> HashMap<String, Relationship> {
    let mut rels = HashMap::new();
    let part_path = part_path.trim_start_matches('/');
    let base_dir = part_path.rsplit_once('/').map_or("", |(dir, _)| dir);

    let Ok(file) = archive.by_name(&rels_path_for(part_path)) else {
        return rels;
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let id = attr_string(e, b"Id").unwrap_or_default();
                    let target = attr_string(e, b"Target").unwrap_or_default();
                    let rel_type = attr_string(e, b"Type").unwrap_or_default();
                    let external = attr_string(e, b"TargetMode").as_deref() == Some("External");
                    if !id.is_empty() && !target.is_empty() && !external {
                        rels.insert(
                            id,
                            Relationship {
                                rel_type,
                                target: resolve_target(base_dir, &target),
                            },
                        );
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    rels
}

/// Parse workbook relationships from xl/_rels/workbook.xml.rels
pub(super) fn parse_workbook_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> WorkbookRelationships {
    let mut rels = WorkbookRelationships::default();

    for (id, rel) in parse_part_relationships(archive, "xl/workbook.xml") {
        if rel.rel_type.ends_with("/worksheet") {
            rels.worksheets.insert(id, rel.target);
        } else if rel.rel_type.ends_with("/sharedStrings") {
            rels.shared_strings = Some(rel.target);
        } else if rel.rel_type.ends_with("/styles") {
            rels.styles = Some(rel.target);
        }
    }

    rels
}

/// Sheet list and calendar settings from xl/workbook.xml.
#[derive(Debug, Default)]
pub(super) struct WorkbookInfo {
    /// Sheets in tab order.
    pub sheets: Vec<SheetInfo>,
    pub date1904: bool,
}

/// Parse xl/workbook.xml.
pub(super) fn parse_workbook_info<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> Result<WorkbookInfo> {
    let file = archive.by_name("xl/workbook.xml")?;
    parse_workbook_xml(BufReader::new(file), relationships)
}

fn parse_workbook_xml<R: BufRead>(
    reader: R,
    relationships: &HashMap<String, String>,
) -> Result<WorkbookInfo> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut info = WorkbookInfo::default();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) => match e.local_name().as_ref() {
                b"workbookPr" => info.date1904 = attr_bool(e, b"date1904").unwrap_or(false),
                b"sheet" => {
                    if let Some(name) = attr_string(e, b"name").filter(|n| !n.is_empty()) {
                        let path = attr_string_local(e, b"id")
                            .and_then(|id| relationships.get(&id).cloned())
                            .unwrap_or_else(|| {
                                format!("xl/worksheets/sheet{}.xml", info.sheets.len() + 1)
                            });
                        info.sheets.push(SheetInfo { name, path });
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(info)
}
