//! Splitting a sheet into one header block and one block per record
//!
//! Column 1 drives the split: a row-merge there groups several sheet rows
//! into one record, every other row is a record on its own.

use crate::cell::Cell;
use crate::merge::MergeDescriptor;
use crate::sheet::Sheet;

/// A contiguous run of sheet rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'a> {
    /// 0-based position of the first row in [`Sheet::rows`]
    pub start: usize,
    /// The rows of the block
    pub rows: &'a [Vec<Cell>],
}

impl<'a> Block<'a> {
    /// Number of rows in the block
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the block holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row of the block
    pub fn first_row(&self) -> Option<&'a [Cell]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Cell of the first row at a 1-based column
    pub fn lead_cell(&self, col: u32) -> Option<&'a Cell> {
        let c = (col as usize).checked_sub(1)?;
        self.first_row()?.get(c)
    }
}

/// A sheet split into its header block and record blocks
#[derive(Debug, Clone)]
pub struct Segmentation<'a> {
    /// Column headings
    pub header: Block<'a>,
    /// One block per recipient, in sheet order
    pub records: Vec<Block<'a>>,
}

/// Compute the length of every block, header first.
///
/// The lengths always add up to the sheet's row count. Column-1 cells that
/// are `ColSpan`, `Mix` or an unclaimed `Suppressed` count as a one-row block.
pub fn block_lengths(sheet: &Sheet) -> Vec<usize> {
    let total = sheet.row_count();
    let mut lengths = Vec::new();
    let mut row = 0;

    while row < total {
        let remaining = total - row;
        let len = match sheet.descriptor_at(row as u32 + 1, 1) {
            MergeDescriptor::RowSpan(n) => (n as usize).clamp(1, remaining),
            MergeDescriptor::Normal
            | MergeDescriptor::ColSpan(_)
            | MergeDescriptor::Mix { .. }
            | MergeDescriptor::Suppressed => 1,
        };
        lengths.push(len);
        row += len;
    }

    lengths
}

/// Split a sheet into blocks. Returns `None` for a sheet without rows.
pub fn segment(sheet: &Sheet) -> Option<Segmentation<'_>> {
    let rows = sheet.rows();
    let mut start = 0;
    let mut blocks = block_lengths(sheet).into_iter().map(|len| {
        let block = Block {
            start,
            rows: &rows[start..start + len],
        };
        start += len;
        block
    });

    let header = blocks.next()?;
    Some(Segmentation {
        header,
        records: blocks.collect(),
    })
}
