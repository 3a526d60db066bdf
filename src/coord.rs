//! Grid cell coordinates.
//!
//! Column 0 is the index column and row 0 is the header row. Data columns
//! and rows start at 1, so data row `r` lives at page index `r - 1`.

use std::fmt;
use std::str::FromStr;

use color_eyre::eyre::{eyre, Report};

/// Separator used by the `"<column>|<row>"` string form.
pub const COORD_SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CellCoord {
    pub column: usize,
    pub row: usize,
}

impl CellCoord {
    pub fn new(column: usize, row: usize) -> Self {
        Self { column, row }
    }

    /// Parse `"<column>|<row>"`. Returns None for anything malformed.
    pub fn parse(key: &str) -> Option<Self> {
        let (column, row) = key.split_once(COORD_SEPARATOR)?;
        let column = column.trim().parse().ok()?;
        let row = row.trim().parse().ok()?;
        Some(Self { column, row })
    }

    pub fn is_header(&self) -> bool {
        self.row == 0
    }

    pub fn is_index_column(&self) -> bool {
        self.column == 0
    }

    /// Zero-based position in the data page, None for the header row.
    pub fn data_row(&self) -> Option<usize> {
        self.row.checked_sub(1)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.column, COORD_SEPARATOR, self.row)
    }
}

impl FromStr for CellCoord {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            eyre!(
                "Invalid cell '{}'. Expected COLUMN{}ROW, e.g. 2{}10",
                s,
                COORD_SEPARATOR,
                COORD_SEPARATOR
            )
        })
    }
}

/// Sort two endpoints so the first is not greater than the second.
pub fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Normalize a rectangle given by two corners into (top-left, bottom-right).
pub fn normalize(start: CellCoord, end: CellCoord) -> (CellCoord, CellCoord) {
    let (c0, c1) = ordered(start.column, end.column);
    let (r0, r1) = ordered(start.row, end.row);
    (CellCoord::new(c0, r0), CellCoord::new(c1, r1))
}
