//! Estimating how much of a sheet fits on one printed page.
//!
//! The estimate walks rows (or columns) in order and stops at the first one
//! that crosses the printable extent. That boundary row is kept when at most
//! half of it spills over the edge and dropped otherwise.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::GridMetrics;
use crate::types::{Orientation, PageMargins};
use crate::units::{convert, Unit, UnitConverter};

/// Counts how many consecutive extents fit a printable length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageBoundaryEstimator {
    available: f64,
}

impl PageBoundaryEstimator {
    /// `page`, `margin_a` and `margin_b` in points.
    pub fn new(page: f64, margin_a: f64, margin_b: f64) -> Self {
        Self {
            available: page - margin_a - margin_b,
        }
    }

    /// Printable length in points.
    pub fn available(&self) -> f64 {
        self.available
    }

    /// Number of leading `sizes` (in points) that fit the page.
    ///
    /// Zero sizes yields zero. Non-finite or negative sizes count as empty.
    pub fn fit<I>(&self, sizes: I) -> usize
    where
        I: IntoIterator<Item = f64>,
    {
        let mut total = 0.0;
        let mut count = 0;
        for size in sizes {
            let size = if size.is_finite() { size.max(0.0) } else { 0.0 };
            total += size;
            if total > self.available {
                let difference = total - self.available;
                if difference <= size / 2.0 {
                    count += 1;
                }
                break;
            }
            count += 1;
        }
        count
    }
}

/// Estimated page extent of a sheet, as row and column counts from the
/// top-left cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCut {
    pub rows: u32,
    pub cols: u32,
}

impl PageCut {
    /// Index of the last row on the page, or `None` for an empty page.
    pub fn last_row_index(&self) -> Option<u32> {
        self.rows.checked_sub(1)
    }

    /// Index of the last column on the page, or `None` for an empty page.
    pub fn last_col_index(&self) -> Option<u32> {
        self.cols.checked_sub(1)
    }

    /// Clamp a requested inclusive end index against an estimated count.
    ///
    /// `None` when nothing fits; otherwise the earlier of the cut's last
    /// index and `end`.
    pub fn clamp_end(count: u32, end: u32) -> Option<u32> {
        count.checked_sub(1).map(|last| last.min(end))
    }
}

/// Standard paper sizes, in millimetres, portrait.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaperSize {
    Letter,
    Legal,
    A3,
    A4,
    A5,
    Custom { width_mm: f64, height_mm: f64 },
}

impl Default for PaperSize {
    fn default() -> Self {
        Self::A4
    }
}

impl PaperSize {
    /// Map an ECMA-376 `paperSize` code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Letter),
            5 => Some(Self::Legal),
            8 => Some(Self::A3),
            9 => Some(Self::A4),
            11 => Some(Self::A5),
            _ => None,
        }
    }

    /// (width, height) in millimetres, portrait.
    pub fn dimensions_mm(&self) -> (f64, f64) {
        match *self {
            Self::Letter => (215.9, 279.4),
            Self::Legal => (215.9, 355.6),
            Self::A3 => (297.0, 420.0),
            Self::A4 => (210.0, 297.0),
            Self::A5 => (148.0, 210.0),
            Self::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// (width, height) in millimetres for an orientation.
    pub fn oriented_mm(&self, orientation: Orientation) -> (f64, f64) {
        let (w, h) = self.dimensions_mm();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Estimate the first page of a sheet-like grid.
///
/// `row_count`/`col_count` bound the walk; margins are in inches as stored
/// in the sheet, paper dimensions in millimetres.
pub fn estimate_page_cut(
    grid: &impl GridMetrics,
    row_count: u32,
    col_count: u32,
    paper: &PaperSize,
    orientation: Orientation,
    margins: &PageMargins,
    conv: &UnitConverter,
) -> Result<PageCut> {
    let (width_mm, height_mm) = paper.oriented_mm(orientation);
    let dpi = conv.dpi();
    let inch = |v: f64| convert(v, Unit::Inch, Unit::Point, dpi);

    let vertical = PageBoundaryEstimator::new(
        convert(height_mm, Unit::Millimetre, Unit::Point, dpi)?,
        inch(margins.top)?,
        inch(margins.bottom)?,
    );
    let horizontal = PageBoundaryEstimator::new(
        convert(width_mm, Unit::Millimetre, Unit::Point, dpi)?,
        inch(margins.left)?,
        inch(margins.right)?,
    );

    let rows = vertical.fit((0..row_count).map(|r| grid.row_height_pt(r)));
    let cols = horizontal.fit((0..col_count).map(|c| {
        conv.px_to_pt(grid.column_width_px(c)).unwrap_or(0.0)
    }));

    let cut = PageCut {
        rows: u32::try_from(rows).unwrap_or(u32::MAX),
        cols: u32::try_from(cols).unwrap_or(u32::MAX),
    };
    log::debug!(
        "page cut {cut:?} for {row_count}x{col_count} cells on {width_mm}x{height_mm}mm"
    );
    Ok(cut)
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
    use test_case::test_case;

    #[test]
    fn half_row_tie_break_includes_row() {
        // 4 rows reach 80pt; the 5th reaches 100pt, 5pt over, under half.
        let estimator = PageBoundaryEstimator::new(95.0, 0.0, 0.0);
        assert_eq!(estimator.fit([20.0; 10]), 5);
    }

    #[test]
    fn more_than_half_over_excludes_row() {
        // 4 rows reach 80pt; the 5th reaches 100pt, 15pt over, more than half.
        let estimator = PageBoundaryEstimator::new(85.0, 0.0, 0.0);
        assert_eq!(estimator.fit([20.0; 10]), 4);
    }

    #[test]
    fn exactly_half_over_is_included() {
        let estimator = PageBoundaryEstimator::new(90.0, 0.0, 0.0);
        assert_eq!(estimator.fit([20.0; 10]), 5);
    }

    #[test]
    fn no_rows_no_cut() {
        let estimator = PageBoundaryEstimator::new(95.0, 10.0, 10.0);
        assert_eq!(estimator.fit(std::iter::empty()), 0);
    }

    #[test]
    fn everything_fits() {
        let estimator = PageBoundaryEstimator::new(1000.0, 36.0, 36.0);
        assert_eq!(estimator.fit([15.0; 20]), 20);
    }

    #[test]
    fn margins_reduce_available() {
        let estimator = PageBoundaryEstimator::new(135.0, 20.0, 20.0);
        assert_eq!(estimator.available(), 95.0);
        assert_eq!(estimator.fit([20.0; 10]), 5);
    }

    #[test]
    fn oversized_first_row_gives_empty_page() {
        let estimator = PageBoundaryEstimator::new(10.0, 0.0, 0.0);
        assert_eq!(estimator.fit([100.0]), 0);
    }

    #[test_case(1 => Some(PaperSize::Letter))]
    #[test_case(5 => Some(PaperSize::Legal))]
    #[test_case(8 => Some(PaperSize::A3))]
    #[test_case(9 => Some(PaperSize::A4))]
    #[test_case(11 => Some(PaperSize::A5))]
    #[test_case(70 => None)]
    fn paper_codes(code: u32) -> Option<PaperSize> {
        PaperSize::from_code(code)
    }

    #[test]
    fn landscape_swaps() {
        assert_eq!(
            PaperSize::A4.oriented_mm(Orientation::Landscape),
            (297.0, 210.0)
        );
    }

    #[test_case(0, 30 => None; "nothing fits")]
    #[test_case(10, 30 => Some(9); "cut before end")]
    #[test_case(40, 30 => Some(30); "cut past end ignored")]
    #[test_case(31, 30 => Some(30); "cut at end")]
    fn clamp(count: u32, end: u32) -> Option<u32> {
        PageCut::clamp_end(count, end)
    }

    struct Uniform;

    impl GridMetrics for Uniform {
        fn row_height_pt(&self, _row: u32) -> f64 {
            15.0
        }

        fn column_width_px(&self, _col: u32) -> f64 {
            64.0
        }
    }

    #[test]
    fn a4_portrait_cut() {
        let margins = PageMargins::default();
        let cut = estimate_page_cut(
            &Uniform,
            200,
            50,
            &PaperSize::A4,
            Orientation::Portrait,
            &margins,
            &UnitConverter::default(),
        )
        .unwrap();
        // 297mm = 841.89pt, minus 1.5in = 733.89pt; 48 rows = 720pt,
        // the 49th spills 1.11pt.
        assert_eq!(cut.rows, 49);
        // 210mm = 595.28pt, minus 1.4in = 494.48pt; columns are 48pt,
        // 10 = 480pt and the 11th spills 33.52pt.
        assert_eq!(cut.cols, 10);
        assert_eq!(cut.last_row_index(), Some(48));
    }
}
