//! Loaded worksheet: a dense grid of cells plus its merged regions

use std::collections::BTreeMap;

use crate::cell::{Cell, CellValue};
use crate::error::{Error, Result};
use crate::merge::{find_overlap, MergeDescriptor, MergeIndex, MergeRange};
use crate::{MAX_COLS, MAX_ROWS};

/// A worksheet as the mailer sees it
///
/// Rows are stored densely from row 1 to the last used row, and every row
/// has the same number of cells (column 1 to the last used column). Merge
/// ranges keep the order in which the file listed them. A `Sheet` is
/// read-only once built.
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<Cell>>,
    merges: Vec<MergeRange>,
    index: MergeIndex,
}

impl Sheet {
    /// Sheet name as shown on its tab
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All rows, in sheet order
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Row by 0-based position in [`Sheet::rows`]
    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Total number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in every row
    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Check if the sheet has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at a 1-based position
    pub fn cell_at(&self, row: u32, col: u32) -> Option<&Cell> {
        let r = (row as usize).checked_sub(1)?;
        let c = (col as usize).checked_sub(1)?;
        self.rows.get(r)?.get(c)
    }

    /// Merged regions in file order
    pub fn merged_regions(&self) -> &[MergeRange] {
        &self.merges
    }

    /// Merge role of a cell of this sheet
    pub fn descriptor(&self, cell: &Cell) -> MergeDescriptor {
        self.index.get(cell.row(), cell.col())
    }

    /// Merge role of the cell at a 1-based position
    pub fn descriptor_at(&self, row: u32, col: u32) -> MergeDescriptor {
        self.index.get(row, col)
    }
}

/// Incremental builder for a [`Sheet`]
///
/// Cells may be set in any order; unset positions inside the used area
/// become [`CellValue::Empty`].
#[derive(Debug, Default)]
pub struct SheetBuilder {
    name: String,
    values: BTreeMap<(u32, u32), CellValue>,
    merges: Vec<MergeRange>,
    max_row: u32,
    max_col: u32,
}

impl SheetBuilder {
    /// Start an empty sheet
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the value at a 1-based position
    pub fn set<V: Into<CellValue>>(&mut self, row: u32, col: u32, value: V) -> Result<&mut Self> {
        Self::validate_position(row, col)?;
        self.extend_to(row, col);
        self.values.insert((row, col), value.into());
        Ok(self)
    }

    /// Append a full row after the last used row, starting at column 1
    pub fn push_row<I, V>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let row = self.max_row + 1;
        let mut col = 0;
        for value in values {
            col += 1;
            self.set(row, col, value)?;
        }
        if col == 0 {
            self.extend_to(row, 1);
        }
        Ok(self)
    }

    /// Record a merged region
    pub fn merge(&mut self, range: MergeRange) -> Result<&mut Self> {
        Self::validate_position(range.max_row, range.max_col)?;
        self.extend_to(range.max_row, range.max_col);
        self.merges.push(range);
        Ok(self)
    }

    /// Make sure the used area reaches at least `(row, col)`
    pub fn extend_to(&mut self, row: u32, col: u32) -> &mut Self {
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        self
    }

    /// Finish the sheet.
    ///
    /// Fails with [`Error::OverlappingMerges`] if two merged regions share a
    /// cell, since such a sheet has no single reading.
    pub fn build(self) -> Result<Sheet> {
        if let Some((first, second)) = find_overlap(&self.merges) {
            return Err(Error::OverlappingMerges { first, second });
        }

        let mut values = self.values;
        let rows = (1..=self.max_row)
            .map(|row| {
                (1..=self.max_col)
                    .map(|col| {
                        let value = values.remove(&(row, col)).unwrap_or_default();
                        Cell::new(row, col, value)
                    })
                    .collect()
            })
            .collect();

        let index = MergeIndex::build(&self.merges);

        Ok(Sheet {
            name: self.name,
            rows,
            merges: self.merges,
            index,
        })
    }

    fn validate_position(row: u32, col: u32) -> Result<()> {
        if row == 0 || row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS));
        }
        if col == 0 || col > MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_dense_grid() {
        let mut builder = SheetBuilder::new("Payroll");
        builder.set(1, 1, "Email").unwrap();
        builder.set(3, 2, 42).unwrap();
        let sheet = builder.build().unwrap();

        assert_eq!(sheet.name(), "Payroll");
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.col_count(), 2);
        assert!(sheet.cell_at(2, 2).unwrap().value.is_empty());
        assert_eq!(sheet.cell_at(3, 2).unwrap().coordinate(), "B3");
        assert_eq!(sheet.cell_at(3, 2).unwrap().value.as_number(), Some(42.0));
        assert!(sheet.cell_at(0, 1).is_none());
        assert!(sheet.cell_at(4, 1).is_none());
    }

    #[test]
    fn test_merge_extends_grid() {
        let mut builder = SheetBuilder::new("Sheet1");
        builder.push_row(["a@x.com", "Jan"]).unwrap();
        builder.merge(MergeRange::parse("A1:A3").unwrap()).unwrap();
        let sheet = builder.build().unwrap();

        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.descriptor_at(1, 1), MergeDescriptor::RowSpan(3));
        assert_eq!(sheet.descriptor_at(3, 1), MergeDescriptor::Suppressed);
        assert_eq!(sheet.descriptor_at(1, 2), MergeDescriptor::Normal);
    }

    #[test]
    fn test_push_row_appends() {
        let mut builder = SheetBuilder::new("Sheet1");
        builder.push_row(["h1", "h2", "h3"]).unwrap();
        builder.push_row(Vec::<CellValue>::new()).unwrap();
        builder.push_row([CellValue::Empty, CellValue::from(1)]).unwrap();
        let sheet = builder.build().unwrap();

        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.col_count(), 3);
        assert_eq!(sheet.cell_at(3, 2).unwrap().value.as_number(), Some(1.0));
    }

    #[test]
    fn test_overlapping_merges_rejected() {
        let mut builder = SheetBuilder::new("Sheet1");
        builder.merge(MergeRange::parse("A1:A3").unwrap()).unwrap();
        builder.merge(MergeRange::parse("A3:C3").unwrap()).unwrap();

        match builder.build() {
            Err(Error::OverlappingMerges { first, second }) => {
                assert_eq!(first.to_string(), "A1:A3");
                assert_eq!(second.to_string(), "A3:C3");
            }
            other => panic!("expected overlap error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_position() {
        let mut builder = SheetBuilder::new("Sheet1");
        assert!(builder.set(0, 1, "x").is_err());
        assert!(builder.set(1, MAX_COLS + 1, "x").is_err());
    }
}
