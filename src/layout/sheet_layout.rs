//! Pre-computed layout data for a rendered window of a sheet.
//!
//! Positions are cumulative pixel offsets from the top-left corner of the
//! first rendered cell, so an absolutely positioned element inside the page
//! lines up with the table.

use crate::cell_ref::{MAX_COLS, MAX_ROWS};
use crate::geometry::GridMetrics;
use crate::types::{AnchorPoint, Picture};
use crate::units::UnitConverter;

/// Pixel rectangle of a floating picture, relative to the window origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PictureRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Cumulative column and row edges for a window of the grid.
pub struct SheetLayout<'a, G: GridMetrics> {
    grid: &'a G,
    conv: UnitConverter,
    first_row: u32,
    first_col: u32,
    /// `col_positions[i]` = x of the left edge of column `first_col + i`;
    /// one extra trailing entry for the right edge.
    col_positions: Vec<f64>,
    /// `row_positions[i]` = y of the top edge of row `first_row + i`.
    row_positions: Vec<f64>,
}

impl<'a, G: GridMetrics> SheetLayout<'a, G> {
    /// Layout for rows `first_row..=last_row` and columns
    /// `first_col..=last_col`. An inverted range gives an empty axis.
    pub fn new(
        grid: &'a G,
        (first_row, last_row): (u32, u32),
        (first_col, last_col): (u32, u32),
        conv: UnitConverter,
    ) -> Self {
        let mut col_positions = vec![0.0];
        let mut x = 0.0;
        for col in first_col..=last_col {
            x += grid.column_width_px(col);
            col_positions.push(x);
        }

        let mut row_positions = vec![0.0];
        let mut y = 0.0;
        for row in first_row..=last_row {
            y += conv.pt_to_px(grid.row_height_pt(row)).unwrap_or(0.0);
            row_positions.push(y);
        }

        Self {
            grid,
            conv,
            first_row,
            first_col,
            col_positions,
            row_positions,
        }
    }

    fn row_px(&self, row: u32) -> f64 {
        self.conv
            .pt_to_px(self.grid.row_height_pt(row))
            .unwrap_or(0.0)
    }

    /// X of the left edge of `col`, or `None` left of the window.
    ///
    /// Columns past the window keep accumulating grid widths up to the
    /// right edge of the worksheet grid.
    pub fn col_x(&self, col: u32) -> Option<f64> {
        let col = col.min(MAX_COLS);
        let offset = usize::try_from(col.checked_sub(self.first_col)?).ok()?;
        if let Some(x) = self.col_positions.get(offset) {
            return Some(*x);
        }
        let known = self.col_positions.len() - 1;
        let mut x = self.total_width();
        let start = self.first_col.saturating_add(u32::try_from(known).ok()?);
        for c in start..col {
            x += self.grid.column_width_px(c);
        }
        Some(x)
    }

    /// Y of the top edge of `row`, or `None` above the window. Rows past
    /// the bottom of the worksheet grid clamp to its edge.
    pub fn row_y(&self, row: u32) -> Option<f64> {
        let row = row.min(MAX_ROWS);
        let offset = usize::try_from(row.checked_sub(self.first_row)?).ok()?;
        if let Some(y) = self.row_positions.get(offset) {
            return Some(*y);
        }
        let known = self.row_positions.len() - 1;
        let mut y = self.total_height();
        let start = self.first_row.saturating_add(u32::try_from(known).ok()?);
        for r in start..row {
            y += self.row_px(r);
        }
        Some(y)
    }

    pub fn total_width(&self) -> f64 {
        self.col_positions.last().copied().unwrap_or(0.0)
    }

    pub fn total_height(&self) -> f64 {
        self.row_positions.last().copied().unwrap_or(0.0)
    }

    /// Pixel position of a drawing anchor point.
    pub fn anchor_point(&self, point: &AnchorPoint) -> Option<(f64, f64)> {
        let x = self.col_x(point.col)? + self.conv.emu_to_px(point.col_off).ok()?;
        let y = self.row_y(point.row)? + self.conv.emu_to_px(point.row_off).ok()?;
        Some((x, y))
    }

    /// Placement of a picture, or `None` when it starts outside the window
    /// or has no usable size.
    pub fn picture_rect(&self, picture: &Picture) -> Option<PictureRect> {
        let last_row = self
            .first_row
            .saturating_add(u32::try_from(self.row_positions.len() - 1).ok()?);
        let last_col = self
            .first_col
            .saturating_add(u32::try_from(self.col_positions.len() - 1).ok()?);
        if picture.from.row >= last_row || picture.from.col >= last_col {
            return None;
        }

        let (left, top) = self.anchor_point(&picture.from)?;
        let (width, height) = match (&picture.to, picture.extent) {
            (Some(to), _) => {
                let (right, bottom) = self.anchor_point(to)?;
                (right - left, bottom - top)
            }
            (None, Some((cx, cy))) => (
                self.conv.emu_to_px(cx).ok()?,
                self.conv.emu_to_px(cy).ok()?,
            ),
            (None, None) => return None,
        };

        (width > 0.0 && height > 0.0).then_some(PictureRect {
            left,
            top,
            width,
            height,
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
    use crate::units::EMU_PER_INCH;

    struct Grid;

    impl GridMetrics for Grid {
        fn row_height_pt(&self, row: u32) -> f64 {
            if row == 1 {
                30.0
            } else {
                15.0
            }
        }

        fn column_width_px(&self, col: u32) -> f64 {
            if col == 0 {
                100.0
            } else {
                64.0
            }
        }
    }

    fn layout() -> SheetLayout<'static, Grid> {
        SheetLayout::new(&Grid, (0, 3), (0, 2), UnitConverter::default())
    }

    #[test]
    fn cumulative_edges() {
        let l = layout();
        assert_eq!(l.col_x(0), Some(0.0));
        assert_eq!(l.col_x(1), Some(100.0));
        assert_eq!(l.col_x(3), Some(228.0));
        assert_eq!(l.total_width(), 228.0);
        // 15pt = 20px, 30pt = 40px
        assert_eq!(l.row_y(2), Some(60.0));
        assert_eq!(l.total_height(), 100.0);
    }

    #[test]
    fn extends_past_window() {
        let l = layout();
        assert_eq!(l.col_x(5), Some(228.0 + 128.0));
        assert_eq!(l.row_y(6), Some(100.0 + 40.0));
    }

    #[test]
    fn anchor_beyond_grid_clamps_to_grid_edge() {
        let l = layout();
        let right = 100.0 + 64.0 * f64::from(MAX_COLS - 1);
        assert_eq!(l.col_x(u32::MAX), Some(right));
        assert_eq!(l.col_x(MAX_COLS + 7), Some(right));
        // Rows 0 and 2.. are 20px, row 1 is 40px.
        let bottom = 40.0 + 20.0 * f64::from(MAX_ROWS - 1);
        assert_eq!(l.row_y(u32::MAX), Some(bottom));

        let picture = Picture {
            from: AnchorPoint::default(),
            to: Some(AnchorPoint {
                col: u32::MAX,
                col_off: 0.0,
                row: u32::MAX,
                row_off: 0.0,
            }),
            ..Picture::default()
        };
        let rect = layout().picture_rect(&picture).unwrap();
        assert_eq!(rect.width, right);
        assert_eq!(rect.height, bottom);
    }

    #[test]
    fn window_offset() {
        let l = SheetLayout::new(&Grid, (1, 2), (1, 2), UnitConverter::default());
        assert_eq!(l.col_x(0), None);
        assert_eq!(l.col_x(1), Some(0.0));
        assert_eq!(l.row_y(2), Some(40.0));
    }

    #[test]
    fn two_cell_picture() {
        let picture = Picture {
            from: AnchorPoint {
                col: 1,
                col_off: EMU_PER_INCH / 96.0 * 4.0,
                row: 0,
                row_off: 0.0,
            },
            to: Some(AnchorPoint {
                col: 2,
                col_off: 0.0,
                row: 2,
                row_off: 0.0,
            }),
            ..Picture::default()
        };
        let rect = layout().picture_rect(&picture).unwrap();
        assert!((rect.left - 104.0).abs() < 1e-9);
        assert_eq!(rect.top, 0.0);
        assert!((rect.width - 60.0).abs() < 1e-9);
        assert_eq!(rect.height, 60.0);
    }

    #[test]
    fn one_cell_picture_and_outside_window() {
        let mut picture = Picture {
            from: AnchorPoint::default(),
            extent: Some((EMU_PER_INCH, EMU_PER_INCH / 2.0)),
            ..Picture::default()
        };
        let rect = layout().picture_rect(&picture).unwrap();
        assert!((rect.width - 96.0).abs() < 1e-9);
        assert!((rect.height - 48.0).abs() < 1e-9);

        picture.from.row = 10;
        assert!(layout().picture_rect(&picture).is_none());
        picture.from.row = 0;
        picture.extent = None;
        assert!(layout().picture_rect(&picture).is_none());
    }
}
