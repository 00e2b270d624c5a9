//! Merged-cell geometry.
//!
//! A merge region renders as a single table cell: its top-left anchor gets
//! `rowspan`/`colspan` and carries the content, every other cell in the
//! region is covered and hidden. The anchor's box also has to look like the
//! whole region, so its closing borders come from the region's trailing
//! (bottom-right) cell and its height is the sum of the spanned rows.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::cell_ref::{cell_name, parse_cell_range};
use crate::css::{StyleDeclarations, StyleValue};
use crate::error::{Result, XlhtmlError};
use crate::units::{Measurement, Unit, UnitConverter};

/// Visual correction subtracted from a cell's content container height,
/// in pixels. Empirical: it accounts for the border and padding the outer
/// box consumes and is an approximation, not a derived quantity.
pub const MERGED_CONTENT_INSET_PX: f64 = 3.0;

/// A rectangular merge, 0-indexed and inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRegion {
    pub first_row: u32,
    pub last_row: u32,
    pub first_col: u32,
    pub last_col: u32,
}

impl MergeRegion {
    /// Build a region from two corners in any order.
    pub fn new(row_a: u32, col_a: u32, row_b: u32, col_b: u32) -> Self {
        Self {
            first_row: row_a.min(row_b),
            last_row: row_a.max(row_b),
            first_col: col_a.min(col_b),
            last_col: col_a.max(col_b),
        }
    }

    /// Parse an A1-style range such as "A1:B2".
    pub fn parse(range: &str) -> Result<Self> {
        let (r1, c1, r2, c2) = parse_cell_range(range)?;
        Ok(Self::new(r1, c1, r2, c2))
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        self.rows().contains(&row) && self.cols().contains(&col)
    }

    pub fn rows(&self) -> RangeInclusive<u32> {
        self.first_row..=self.last_row
    }

    pub fn cols(&self) -> RangeInclusive<u32> {
        self.first_col..=self.last_col
    }

    /// Rows covered. Never zero; a hand-built region with its corners
    /// reversed counts as a single row.
    pub fn row_span(&self) -> u32 {
        self.last_row.saturating_sub(self.first_row).saturating_add(1)
    }

    pub fn col_span(&self) -> u32 {
        self.last_col.saturating_sub(self.first_col).saturating_add(1)
    }

    /// Top-left (row, col).
    pub fn anchor(&self) -> (u32, u32) {
        (self.first_row, self.first_col)
    }

    /// Bottom-right (row, col).
    pub fn trailing(&self) -> (u32, u32) {
        (self.last_row, self.last_col)
    }

    pub fn is_anchor(&self, row: u32, col: u32) -> bool {
        (row, col) == self.anchor()
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }
}

impl fmt::Display for MergeRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            cell_name(self.first_row, self.first_col),
            cell_name(self.last_row, self.last_col)
        )
    }
}

/// Report the first pair of overlapping regions.
///
/// The resolver assumes merge lists are disjoint and never calls this;
/// callers that take merges from untrusted input can check up front.
pub fn validate_merges(merges: &[MergeRegion]) -> Result<()> {
    for (i, a) in merges.iter().enumerate() {
        for b in merges.iter().skip(i + 1) {
            if a.intersects(b) {
                return Err(XlhtmlError::OverlappingMergeRegion {
                    first: a.to_string(),
                    second: b.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Which edge a border declaration draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BorderEdge {
    Top,
    Right,
    Bottom,
    Left,
}

impl BorderEdge {
    pub const ALL: [Self; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    /// CSS shorthand property for this edge.
    pub fn property(self) -> &'static str {
        match self {
            Self::Top => "border-top",
            Self::Right => "border-right",
            Self::Bottom => "border-bottom",
            Self::Left => "border-left",
        }
    }

    /// Whether a merge's trailing cell overrides the anchor on this edge.
    pub fn trailing_wins(self) -> bool {
        matches!(self, Self::Right | Self::Bottom)
    }

    /// Edge of a `border-<edge>` or `border-<edge>-*` declaration.
    pub fn of_declaration(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("border-")?;
        let edge = rest.split('-').next()?;
        match edge {
            "top" => Some(Self::Top),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            _ => None,
        }
    }
}

/// Compose an anchor's box declarations with its region's trailing cell.
///
/// Every trailing declaration the anchor lacks is adopted. Where both have
/// one, the trailing value replaces the anchor's only on the right and
/// bottom edges.
pub fn compose_anchor_declarations(
    anchor: &StyleDeclarations,
    trailing: &StyleDeclarations,
) -> StyleDeclarations {
    let mut composed = anchor.clone();
    for (name, value) in trailing.iter() {
        let take = !anchor.contains(name)
            || BorderEdge::of_declaration(name).is_some_and(BorderEdge::trailing_wins);
        if take {
            composed = composed.with(name, value.clone());
        }
    }
    composed
}

/// Read-only row and column extents of a sheet.
pub trait GridMetrics {
    /// Height of `row` in points, falling back to the sheet default.
    fn row_height_pt(&self, row: u32) -> f64;

    /// Width of `col` in pixels, falling back to the sheet default.
    fn column_width_px(&self, col: u32) -> f64;
}

/// How a cell relates to the merge list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellRole {
    Single,
    Anchor,
    Covered,
}

/// Merge facts for one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellGeometry {
    pub role: CellRole,
    pub region: Option<MergeRegion>,
    pub row_span: u32,
    pub col_span: u32,
    /// Box declarations after anchor/trailing composition. For cells that
    /// are not anchors this is the cell's own set.
    pub composed: StyleDeclarations,
}

impl CellGeometry {
    fn single(own: StyleDeclarations) -> Self {
        Self {
            role: CellRole::Single,
            region: None,
            row_span: 1,
            col_span: 1,
            composed: own,
        }
    }

    pub fn is_anchor(&self) -> bool {
        self.role == CellRole::Anchor
    }

    pub fn is_covered(&self) -> bool {
        self.role == CellRole::Covered
    }

    /// `rowspan`/`colspan` attributes, each only when greater than one.
    pub fn span_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = Vec::new();
        if self.is_anchor() {
            if self.row_span > 1 {
                attrs.push(("rowspan", self.row_span.to_string()));
            }
            if self.col_span > 1 {
                attrs.push(("colspan", self.col_span.to_string()));
            }
        }
        attrs
    }
}

/// Aggregate size of a merge region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergedExtent {
    /// Sum of spanned row heights, in points.
    pub height_pt: f64,
    /// Sum of spanned column widths, in pixels.
    pub width_px: f64,
}

impl MergedExtent {
    pub fn of(region: &MergeRegion, grid: &impl GridMetrics) -> Self {
        Self {
            height_pt: region.rows().map(|r| grid.row_height_pt(r)).sum(),
            width_px: region.cols().map(|c| grid.column_width_px(c)).sum(),
        }
    }
}

/// Height of a content container inside a box of `outer_pt` points.
pub fn content_height(outer_pt: f64, inset_px: f64, conv: &UnitConverter) -> Result<Measurement> {
    let outer = conv.measure(outer_pt, Unit::Point)?;
    let inset = conv.measure(inset_px, Unit::Pixel)?;
    Ok(outer.minus(&inset))
}

/// Looks up merge facts for cells of one sheet.
///
/// Lookup is a linear scan over the merge list and returns the first
/// region containing the cell; overlapping regions are not detected.
#[derive(Clone, Copy, Debug)]
pub struct CellGeometryResolver<'a> {
    merges: &'a [MergeRegion],
}

impl<'a> CellGeometryResolver<'a> {
    pub fn new(merges: &'a [MergeRegion]) -> Self {
        Self { merges }
    }

    pub fn region_at(&self, row: u32, col: u32) -> Option<&'a MergeRegion> {
        self.merges.iter().find(|m| m.contains(row, col))
    }

    /// Merge role and spans of a cell, with its own declarations unchanged.
    pub fn resolve(&self, row: u32, col: u32) -> CellGeometry {
        self.resolve_with(row, col, StyleDeclarations::new(), |_, _| None)
    }

    /// Merge role and spans of a cell, composing an anchor's box
    /// declarations with the trailing cell's set from `style_at`.
    pub fn resolve_with<F>(
        &self,
        row: u32,
        col: u32,
        own: StyleDeclarations,
        style_at: F,
    ) -> CellGeometry
    where
        F: FnOnce(u32, u32) -> Option<StyleDeclarations>,
    {
        let Some(region) = self.region_at(row, col) else {
            return CellGeometry::single(own);
        };

        if region.is_anchor(row, col) {
            let (last_row, last_col) = region.trailing();
            let composed = if region.trailing() == region.anchor() {
                own
            } else {
                match style_at(last_row, last_col) {
                    Some(trailing) => compose_anchor_declarations(&own, &trailing),
                    None => own,
                }
            };
            CellGeometry {
                role: CellRole::Anchor,
                region: Some(*region),
                row_span: region.row_span(),
                col_span: region.col_span(),
                composed,
            }
        } else {
            CellGeometry {
                role: CellRole::Covered,
                region: Some(*region),
                row_span: 1,
                col_span: 1,
                composed: own,
            }
        }
    }
}

/// Box and container heights for an anchor, as declarations.
///
/// The outer box gets the full merged height; the container gets
/// `height`, `min-height` and `max-height` reduced by `inset_px`. Both are
/// expressed in the converter's output unit.
pub fn merged_height_declarations(
    extent: &MergedExtent,
    inset_px: f64,
    conv: &UnitConverter,
) -> Result<(StyleDeclarations, StyleDeclarations)> {
    let outer = conv.output_length(extent.height_pt, Unit::Point)?;
    let inner = content_height(extent.height_pt, inset_px, conv)?.to(conv.output());
    let boxed = StyleDeclarations::new().with("height", outer);
    let container = StyleDeclarations::builder()
        .set_all(
            &["height", "min-height", "max-height"],
            &StyleValue::Length(inner),
        )
        .build();
    Ok((boxed, container))
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
    use std::collections::HashMap;
    use test_case::test_case;

    struct Grid {
        heights: HashMap<u32, f64>,
        default_height: f64,
        width: f64,
    }

    impl GridMetrics for Grid {
        fn row_height_pt(&self, row: u32) -> f64 {
            self.heights
                .get(&row)
                .copied()
                .unwrap_or(self.default_height)
        }

        fn column_width_px(&self, _col: u32) -> f64 {
            self.width
        }
    }

    fn decls(pairs: &[(&str, &str)]) -> StyleDeclarations {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn anchor_and_covered_cells() {
        // Rows 1-3 and columns 1-2 counting from one, i.e. A1:B3.
        let merges = [MergeRegion::new(0, 0, 2, 1)];
        let resolver = CellGeometryResolver::new(&merges);

        let anchor = resolver.resolve(0, 0);
        assert!(anchor.is_anchor());
        assert_eq!((anchor.row_span, anchor.col_span), (3, 2));

        for (r, c) in [(0, 1), (1, 0), (1, 1), (2, 0), (2, 1)] {
            let g = resolver.resolve(r, c);
            assert!(g.is_covered(), "({r},{c}) should be covered");
            assert!(g.span_attributes().is_empty());
        }

        let outside = resolver.resolve(3, 0);
        assert_eq!(outside.role, CellRole::Single);
        assert_eq!((outside.row_span, outside.col_span), (1, 1));
    }

    #[test]
    fn reversed_hand_built_region_does_not_underflow() {
        let region = MergeRegion {
            first_row: 5,
            last_row: 2,
            first_col: 3,
            last_col: 0,
        };
        assert_eq!(region.row_span(), 1);
        assert_eq!(region.col_span(), 1);
        assert!(!region.contains(3, 1));
    }

    #[test]
    fn full_height_region_span_saturates() {
        let region = MergeRegion::new(0, 0, u32::MAX, 0);
        assert_eq!(region.row_span(), u32::MAX);
        assert_eq!(region.col_span(), 1);
    }

    #[test]
    fn span_attributes_skip_ones() {
        let merges = [MergeRegion::parse("A1:D1").unwrap()];
        let g = CellGeometryResolver::new(&merges).resolve(0, 0);
        assert_eq!(g.span_attributes(), vec![("colspan", "4".to_string())]);

        let merges = [MergeRegion::parse("B2:B5").unwrap()];
        let g = CellGeometryResolver::new(&merges).resolve(1, 1);
        assert_eq!(g.span_attributes(), vec![("rowspan", "4".to_string())]);
    }

    #[test]
    fn trailing_bottom_border_replaces_anchor() {
        let anchor = decls(&[("border-bottom", "none")]);
        let trailing = decls(&[("border-bottom", "1px solid black")]);
        let composed = compose_anchor_declarations(&anchor, &trailing);
        assert_eq!(
            composed.get("border-bottom"),
            Some(&StyleValue::from("1px solid black"))
        );
    }

    #[test]
    fn anchor_top_border_kept() {
        let anchor = decls(&[("border-top", "1px solid black")]);
        let trailing = decls(&[("border-top", "2px solid red")]);
        let composed = compose_anchor_declarations(&anchor, &trailing);
        assert_eq!(
            composed.get("border-top"),
            Some(&StyleValue::from("1px solid black"))
        );
    }

    #[test]
    fn missing_declarations_adopted_from_trailing() {
        let anchor = decls(&[("width", "64px")]);
        let trailing = decls(&[
            ("width", "80px"),
            ("border-left", "1px dotted black"),
            ("background-color", "rgb(255, 0, 0)"),
        ]);
        let composed = compose_anchor_declarations(&anchor, &trailing);
        assert_eq!(composed.get("width"), Some(&StyleValue::from("64px")));
        assert!(composed.contains("border-left"));
        assert!(composed.contains("background-color"));
    }

    #[test]
    fn resolver_composes_with_trailing_style() {
        let merges = [MergeRegion::parse("A1:B2").unwrap()];
        let resolver = CellGeometryResolver::new(&merges);
        let own = decls(&[("border-right", "none"), ("border-top", "1px solid black")]);
        let mut asked = None;
        let g = resolver.resolve_with(0, 0, own, |r, c| {
            asked = Some((r, c));
            Some(decls(&[
                ("border-right", "2px solid black"),
                ("border-top", "none"),
            ]))
        });
        assert_eq!(asked, Some((1, 1)));
        assert_eq!(
            g.composed.get("border-right"),
            Some(&StyleValue::from("2px solid black"))
        );
        assert_eq!(
            g.composed.get("border-top"),
            Some(&StyleValue::from("1px solid black"))
        );
    }

    #[test_case("border-right" => Some(BorderEdge::Right))]
    #[test_case("border-bottom-color" => Some(BorderEdge::Bottom))]
    #[test_case("border-top" => Some(BorderEdge::Top))]
    #[test_case("padding-right" => None)]
    #[test_case("border-radius" => None)]
    fn edges_from_names(name: &str) -> Option<BorderEdge> {
        BorderEdge::of_declaration(name)
    }

    #[test]
    fn only_closing_edges_trail() {
        let winners: Vec<_> = BorderEdge::ALL
            .into_iter()
            .filter(|e| e.trailing_wins())
            .collect();
        assert_eq!(winners, [BorderEdge::Right, BorderEdge::Bottom]);
    }

    #[test]
    fn merged_height_uses_default_for_missing_rows() {
        let grid = Grid {
            heights: HashMap::from([(0, 30.0), (2, 12.0)]),
            default_height: 15.0,
            width: 64.0,
        };
        let region = MergeRegion::new(0, 0, 2, 2);
        let extent = MergedExtent::of(&region, &grid);
        assert_eq!(extent.height_pt, 57.0);
        assert_eq!(extent.width_px, 192.0);
    }

    /// The 3px inset is an empirical correction; this pins its current
    /// value rather than asserting a layout law.
    #[test]
    fn container_height_is_inset_approximation() {
        let conv = UnitConverter::default();
        let extent = MergedExtent {
            height_pt: 30.0,
            width_px: 0.0,
        };
        let (outer, inner) =
            merged_height_declarations(&extent, MERGED_CONTENT_INSET_PX, &conv).unwrap();
        assert_eq!(outer.to_inline().unwrap(), "height: 30.00pt");
        assert_eq!(
            inner.to_inline().unwrap(),
            "height: 27.75pt; max-height: 27.75pt; min-height: 27.75pt"
        );
    }

    #[test]
    fn overlap_validation() {
        let ok = [
            MergeRegion::parse("A1:B2").unwrap(),
            MergeRegion::parse("C1:C5").unwrap(),
        ];
        assert!(validate_merges(&ok).is_ok());

        let bad = [
            MergeRegion::parse("A1:B2").unwrap(),
            MergeRegion::parse("B2:C3").unwrap(),
        ];
        match validate_merges(&bad).unwrap_err() {
            XlhtmlError::OverlappingMergeRegion { first, second } => {
                assert_eq!(first, "A1:B2");
                assert_eq!(second, "B2:C3");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn parse_normalizes_corners() {
        let region = MergeRegion::parse("C4:A1").unwrap();
        assert_eq!(region.anchor(), (0, 0));
        assert_eq!(region.trailing(), (3, 2));
        assert_eq!(region.to_string(), "A1:C4");
    }
}
