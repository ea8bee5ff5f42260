//! Merge ranges and the merge role of individual cells
//!
//! A merged region only displays its top-left (anchor) cell. Every other
//! cell it covers must be left out when the region is rebuilt as an HTML
//! table, and the anchor must carry the region's extent as `rowspan` /
//! `colspan`. [`classify`] derives that role for one cell; [`MergeIndex`]
//! precomputes it for a whole sheet.

use ahash::AHashMap;
use std::fmt;
use std::str::FromStr;

use crate::cell::{Cell, CellAddress};
use crate::error::{Error, Result};

/// A rectangular merged region (e.g., "B2:C4"), 1-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MergeRange {
    pub min_row: u32,
    pub max_row: u32,
    pub min_col: u32,
    pub max_col: u32,
}

impl MergeRange {
    /// Create a range from two corners, normalized so `min <= max`
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        Self {
            min_row: start.row.min(end.row),
            max_row: start.row.max(end.row),
            min_col: start.col.min(end.col),
            max_col: start.col.max(end.col),
        }
    }

    /// Create a range from 1-based row/column bounds
    pub fn from_bounds(min_row: u32, min_col: u32, max_row: u32, max_col: u32) -> Self {
        Self::new(
            CellAddress::new(min_row, min_col),
            CellAddress::new(max_row, max_col),
        )
    }

    /// Parse a range from A1:B10 notation
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        match s.split_once(':') {
            Some((start, end)) => {
                let start = CellAddress::parse(start)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                let end = CellAddress::parse(end)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::new(start, end))
            }
            None => {
                let addr = CellAddress::parse(s)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::new(addr, addr))
            }
        }
    }

    /// Top-left cell of the range
    pub fn anchor(&self) -> CellAddress {
        CellAddress::new(self.min_row, self.min_col)
    }

    /// Number of rows covered
    pub fn row_count(&self) -> u32 {
        self.max_row - self.min_row + 1
    }

    /// Number of columns covered
    pub fn col_count(&self) -> u32 {
        self.max_col - self.min_col + 1
    }

    /// Check if a cell position is inside this range
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.min_row && row <= self.max_row && col >= self.min_col && col <= self.max_col
    }

    /// Check if this range shares any cell with another
    pub fn overlaps(&self, other: &MergeRange) -> bool {
        self.min_row <= other.max_row
            && self.max_row >= other.min_row
            && self.min_col <= other.max_col
            && self.max_col >= other.min_col
    }

    /// Role of the cell at `(row, col)` with respect to this range alone.
    ///
    /// `None` means this range says nothing about the cell and the next
    /// range should be consulted.
    pub fn descriptor_at(&self, row: u32, col: u32) -> Option<MergeDescriptor> {
        if self.min_col == self.max_col {
            if col != self.min_col {
                return None;
            }
            if row == self.min_row {
                return Some(MergeDescriptor::RowSpan(self.row_count()));
            }
            if row > self.min_row && row <= self.max_row {
                return Some(MergeDescriptor::Suppressed);
            }
            None
        } else if self.min_row == self.max_row {
            if row != self.min_row {
                return None;
            }
            if col == self.min_col {
                return Some(MergeDescriptor::ColSpan(self.col_count()));
            }
            if col > self.min_col && col <= self.max_col {
                return Some(MergeDescriptor::Suppressed);
            }
            None
        } else if row == self.min_row && col == self.min_col {
            Some(MergeDescriptor::Mix {
                rows: self.row_count(),
                cols: self.col_count(),
            })
        } else if self.contains(row, col) {
            Some(MergeDescriptor::Suppressed)
        } else {
            None
        }
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        let start = CellAddress::new(self.min_row, self.min_col);
        let end = CellAddress::new(self.max_row, self.max_col);
        if start == end {
            start.to_a1_string()
        } else {
            format!("{}:{}", start, end)
        }
    }
}

impl fmt::Display for MergeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for MergeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// How a cell takes part in a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MergeDescriptor {
    /// Not part of any merged region
    Normal,
    /// Anchor of a single-column region spanning `n` rows
    RowSpan(u32),
    /// Anchor of a single-row region spanning `n` columns
    ColSpan(u32),
    /// Anchor of a region spanning several rows and columns
    Mix { rows: u32, cols: u32 },
    /// Covered by a region but not its anchor; never rendered
    Suppressed,
}

/// Classify a cell against a list of merge ranges.
///
/// Ranges are tried in order and the first one that has anything to say
/// about the cell wins. Cells outside every range are [`MergeDescriptor::Normal`].
pub fn classify(cell: &Cell, ranges: &[MergeRange]) -> MergeDescriptor {
    classify_at(cell.row(), cell.col(), ranges)
}

/// [`classify`] by position
pub fn classify_at(row: u32, col: u32, ranges: &[MergeRange]) -> MergeDescriptor {
    ranges
        .iter()
        .find_map(|range| range.descriptor_at(row, col))
        .unwrap_or(MergeDescriptor::Normal)
}

/// Return the first pair of ranges that share a cell, if any
pub fn find_overlap(ranges: &[MergeRange]) -> Option<(MergeRange, MergeRange)> {
    ranges.iter().enumerate().find_map(|(i, first)| {
        ranges[i + 1..]
            .iter()
            .find(|second| first.overlaps(second))
            .map(|second| (*first, *second))
    })
}

/// Precomputed merge roles for every merged cell of a sheet
///
/// Equivalent to calling [`classify_at`] per cell, without rescanning the
/// range list each time.
#[derive(Debug, Clone, Default)]
pub struct MergeIndex {
    roles: AHashMap<(u32, u32), MergeDescriptor>,
}

impl MergeIndex {
    /// Build the index; earlier ranges win where ranges overlap
    pub fn build(ranges: &[MergeRange]) -> Self {
        let mut roles = AHashMap::new();
        for range in ranges {
            for row in range.min_row..=range.max_row {
                for col in range.min_col..=range.max_col {
                    if let Some(descriptor) = range.descriptor_at(row, col) {
                        roles.entry((row, col)).or_insert(descriptor);
                    }
                }
            }
        }
        Self { roles }
    }

    /// Merge role of the cell at `(row, col)`
    pub fn get(&self, row: u32, col: u32) -> MergeDescriptor {
        self.roles
            .get(&(row, col))
            .copied()
            .unwrap_or(MergeDescriptor::Normal)
    }

    /// Number of cells covered by any merged region
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Check if no cell is merged
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
