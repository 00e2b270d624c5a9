//! Pictures from `xl/drawings/drawing*.xml`.
//!
//! Each `twoCellAnchor`/`oneCellAnchor` holding a `pic` becomes a
//! [`Picture`]. The `blip` embed id is resolved through the drawing's
//! relationships to a media part whose bytes are loaded. Charts, shapes and
//! absolute anchors are skipped.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

use crate::error::Result;
use crate::types::{AnchorPoint, Picture};
use crate::xml_helpers::{attr_f64, attr_string, attr_string_local};

use super::relationships::{parse_part_relationships, Relationship};

/// MIME type from leading magic bytes, falling back to the file extension.
pub(super) fn detect_mime_type(data: &[u8], path: &str) -> &'static str {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        return "image/png";
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if data.starts_with(b"GIF8") {
        return "image/gif";
    }
    if data.starts_with(b"BM") {
        return "image/bmp";
    }
    if data.len() > 11 && data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP".as_slice())
    {
        return "image/webp";
    }
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => "application/octet-stream",
    }
}

/// Anchor data collected before the media bytes are attached.
#[derive(Debug, Default)]
pub(super) struct PictureAnchor {
    pub from: AnchorPoint,
    pub to: Option<AnchorPoint>,
    pub extent: Option<(f64, f64)>,
    pub name: Option<String>,
    pub embed: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Corner {
    From,
    To,
}

/// Parse anchors of picture elements from drawing XML.
pub(super) fn parse_picture_anchors<R: BufRead>(reader: R) -> Result<Vec<PictureAnchor>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut anchors = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<PictureAnchor> = None;
    let mut has_pic = false;
    let mut corner: Option<Corner> = None;
    let mut field: Option<Vec<u8>> = None;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"twoCellAnchor" | b"oneCellAnchor" => {
                    current = Some(PictureAnchor::default());
                    has_pic = false;
                }
                b"from" => corner = Some(Corner::From),
                b"to" => {
                    corner = Some(Corner::To);
                    if let Some(anchor) = current.as_mut() {
                        anchor.to = Some(AnchorPoint::default());
                    }
                }
                name @ (b"col" | b"colOff" | b"row" | b"rowOff") if corner.is_some() => {
                    field = Some(name.to_vec());
                }
                // Anchor-level extent only; `a:ext` inside the picture's
                // transform is ignored.
                b"ext" if corner.is_none() && !has_pic => {
                    if let (Some(anchor), Some(cx), Some(cy)) =
                        (current.as_mut(), attr_f64(e, b"cx"), attr_f64(e, b"cy"))
                    {
                        anchor.extent = Some((cx, cy));
                    }
                }
                b"pic" => has_pic = true,
                b"cNvPr" if has_pic => {
                    if let Some(anchor) = current.as_mut() {
                        anchor.name = attr_string(e, b"name");
                    }
                }
                b"blip" if has_pic => {
                    if let Some(anchor) = current.as_mut() {
                        anchor.embed = attr_string_local(e, b"embed");
                    }
                }
                _ => {}
            },
            Event::Text(ref t) => {
                if let (Some(name), Some(corner), Some(anchor)) =
                    (field.as_deref(), corner, current.as_mut())
                {
                    let text = t.unescape()?;
                    let point = match corner {
                        Corner::From => Some(&mut anchor.from),
                        Corner::To => anchor.to.as_mut(),
                    };
                    if let Some(point) = point {
                        let text = text.trim();
                        match name {
                            b"col" => point.col = text.parse().unwrap_or(0),
                            b"row" => point.row = text.parse().unwrap_or(0),
                            b"colOff" => point.col_off = text.parse().unwrap_or(0.0),
                            _ => point.row_off = text.parse().unwrap_or(0.0),
                        }
                    }
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"twoCellAnchor" | b"oneCellAnchor" => {
                    if let Some(anchor) = current.take() {
                        if has_pic && anchor.embed.is_some() {
                            anchors.push(anchor);
                        }
                    }
                    has_pic = false;
                }
                b"from" | b"to" => corner = None,
                b"col" | b"colOff" | b"row" | b"rowOff" => field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(anchors)
}

fn read_media<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Option<Vec<u8>> {
    let mut file = archive.by_name(path).ok()?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).ok()?;
    (!data.is_empty()).then_some(data)
}

/// Pictures of one drawing part with their image bytes loaded.
///
/// Pictures whose media cannot be resolved or read are skipped.
pub(super) fn parse_drawing<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    drawing_path: &str,
) -> Result<Vec<Picture>> {
    let rels: HashMap<String, Relationship> = parse_part_relationships(archive, drawing_path);
    let anchors = match archive.by_name(drawing_path) {
        Ok(file) => parse_picture_anchors(BufReader::new(file))?,
        Err(_) => {
            log::warn!("drawing part {drawing_path} is missing");
            return Ok(Vec::new());
        }
    };

    let mut pictures = Vec::with_capacity(anchors.len());
    for anchor in anchors {
        let Some(media) = anchor
            .embed
            .as_ref()
            .and_then(|id| rels.get(id))
            .map(|rel| rel.target.clone())
        else {
            log::warn!("{drawing_path}: picture {:?} has no media relationship", anchor.name);
            continue;
        };
        let Some(data) = read_media(archive, &media) else {
            log::warn!("{drawing_path}: unreadable media {media}");
            continue;
        };
        pictures.push(Picture {
            from: anchor.from,
            to: anchor.to,
            extent: anchor.extent,
            name: anchor.name,
            mime_type: detect_mime_type(&data, &media).to_string(),
            data,
        });
    }
    Ok(pictures)
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

    const DRAWING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing"
          xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <xdr:twoCellAnchor editAs="oneCell">
    <xdr:from><xdr:col>1</xdr:col><xdr:colOff>9525</xdr:colOff><xdr:row>2</xdr:row><xdr:rowOff>19050</xdr:rowOff></xdr:from>
    <xdr:to><xdr:col>4</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>8</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
    <xdr:pic>
      <xdr:nvPicPr><xdr:cNvPr id="2" name="Logo"/><xdr:cNvPicPr/></xdr:nvPicPr>
      <xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill>
      <xdr:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="1" cy="1"/></a:xfrm></xdr:spPr>
    </xdr:pic>
    <xdr:clientData/>
  </xdr:twoCellAnchor>
  <xdr:oneCellAnchor>
    <xdr:from><xdr:col>0</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>0</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
    <xdr:ext cx="952500" cy="476250"/>
    <xdr:pic>
      <xdr:nvPicPr><xdr:cNvPr id="3" name="Badge"/></xdr:nvPicPr>
      <xdr:blipFill><a:blip r:embed="rId2"/></xdr:blipFill>
    </xdr:pic>
    <xdr:clientData/>
  </xdr:oneCellAnchor>
  <xdr:twoCellAnchor>
    <xdr:from><xdr:col>5</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>5</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
    <xdr:to><xdr:col>6</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>6</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
    <xdr:sp><xdr:nvSpPr><xdr:cNvPr id="4" name="Box"/></xdr:nvSpPr></xdr:sp>
    <xdr:clientData/>
  </xdr:twoCellAnchor>
</xdr:wsDr>"#;

    #[test]
    fn parses_picture_anchors_only() {
        let anchors = parse_picture_anchors(DRAWING.as_bytes()).unwrap();
        assert_eq!(anchors.len(), 2);

        let logo = &anchors[0];
        assert_eq!(logo.name.as_deref(), Some("Logo"));
        assert_eq!(logo.embed.as_deref(), Some("rId1"));
        assert_eq!(
            logo.from,
            AnchorPoint {
                col: 1,
                col_off: 9525.0,
                row: 2,
                row_off: 19050.0
            }
        );
        let to = logo.to.unwrap();
        assert_eq!((to.col, to.row), (4, 8));
        assert!(logo.extent.is_none());

        let badge = &anchors[1];
        assert!(badge.to.is_none());
        assert_eq!(badge.extent, Some((952_500.0, 476_250.0)));
    }

    #[test]
    fn mime_detection() {
        assert_eq!(detect_mime_type(&[0x89, b'P', b'N', b'G', 0], "x.bin"), "image/png");
        assert_eq!(detect_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0], "x"), "image/jpeg");
        assert_eq!(detect_mime_type(b"????", "media/image1.JPEG"), "image/jpeg");
        assert_eq!(detect_mime_type(b"????", "media/blob"), "application/octet-stream");
    }
}
