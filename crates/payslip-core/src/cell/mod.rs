//! Cell-related types
//!
//! This module contains:
//! - [`CellValue`] - The evaluated value of a cell
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`Cell`] - A value pinned to its address in a sheet

mod address;
mod value;

pub use address::CellAddress;
pub use value::{CellError, CellValue, SharedString};

/// A single cell of a loaded sheet
///
/// Immutable once the sheet is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Evaluated value; [`CellValue::Empty`] stands for a missing value
    pub value: CellValue,
    /// Position in the sheet (1-based)
    pub address: CellAddress,
}

impl Cell {
    /// Create a cell at the given 1-based position
    pub fn new(row: u32, col: u32, value: CellValue) -> Self {
        Self {
            value,
            address: CellAddress::new(row, col),
        }
    }

    /// Row number (1-based)
    pub fn row(&self) -> u32 {
        self.address.row
    }

    /// Column number (1-based)
    pub fn col(&self) -> u32 {
        self.address.col
    }

    /// A1-style coordinate of the cell
    pub fn coordinate(&self) -> String {
        self.address.to_a1_string()
    }
}
