//! Utilities for parsing and formatting Excel-style cell references.

use crate::error::{Result, XlhtmlError};

/// Rows in a worksheet grid.
pub const MAX_ROWS: u32 = 1_048_576;

/// Columns in a worksheet grid (A through XFD).
pub const MAX_COLS: u32 = 16_384;

/// Parse a cell reference like "A1" into (col, row) where col and row are 0-indexed.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    parse_cell_ref_bytes(cell_ref.trim().as_bytes())
}

/// Parse a cell reference from raw bytes (ASCII) into (col, row), 0-indexed.
///
/// Bytes equivalent of [`parse_cell_ref`] for raw XML attribute values.
/// Letters must precede digits; `$` anchors are ignored.
pub fn parse_cell_ref_bytes(ref_bytes: &[u8]) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for &b in ref_bytes {
        if b == b'$' {
            continue;
        }
        if b.is_ascii_alphabetic() && !saw_row {
            let upper = b.to_ascii_uppercase();
            col = col
                .checked_mul(26)?
                .checked_add(u32::from(upper - b'A') + 1)?;
            saw_col = true;
        } else if b.is_ascii_digit() && saw_col {
            row = row.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 {
        return None;
    }

    Some((col - 1, row - 1))
}

/// Parse a range like "A1:B10" (or a single cell "A1") into
/// (start_row, start_col, end_row, end_col).
pub fn parse_cell_range(range: &str) -> Result<(u32, u32, u32, u32)> {
    let invalid = || XlhtmlError::CellRef(range.to_string());
    if let Some((start, end)) = range.split_once(':') {
        let (start_col, start_row) = parse_cell_ref(start).ok_or_else(invalid)?;
        let (end_col, end_row) = parse_cell_ref(end).ok_or_else(invalid)?;
        Ok((start_row, start_col, end_row, end_col))
    } else {
        let (col, row) = parse_cell_ref(range).ok_or_else(invalid)?;
        Ok((row, col, row, col))
    }
}

/// Column letters for a 0-indexed column ("A", "Z", "AA", ...).
pub fn col_to_letters(col: u32) -> String {
    let mut n = u64::from(col) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + u8::try_from(rem).unwrap_or(0));
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Reference text like "B3" for a 0-indexed (row, col).
pub fn cell_name(row: u32, col: u32) -> String {
    format!("{}{}", col_to_letters(col), u64::from(row) + 1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("A1" => Some((0, 0)))]
    #[test_case("$C$7" => Some((2, 6)))]
    #[test_case("aa10" => Some((26, 9)))]
    #[test_case("XFD1048576" => Some((16_383, 1_048_575)))]
    #[test_case("A0" => None)]
    #[test_case("1A" => None)]
    #[test_case("A" => None)]
    #[test_case("A1B" => None)]
    fn parses_refs(text: &str) -> Option<(u32, u32)> {
        parse_cell_ref(text)
    }

    #[test]
    fn parses_ranges() {
        assert_eq!(parse_cell_range("B2:D5").unwrap(), (1, 1, 4, 3));
        assert_eq!(parse_cell_range("C3").unwrap(), (2, 2, 2, 2));
        assert!(parse_cell_range("B2:").is_err());
    }

    #[test_case(0 => "A")]
    #[test_case(25 => "Z")]
    #[test_case(26 => "AA")]
    #[test_case(701 => "ZZ")]
    #[test_case(702 => "AAA")]
    fn letters(col: u32) -> String {
        col_to_letters(col)
    }

    #[test]
    fn names_round_trip() {
        for (row, col) in [(0, 0), (9, 27), (99, 702)] {
            assert_eq!(parse_cell_ref(&cell_name(row, col)), Some((col, row)));
        }
    }
}
