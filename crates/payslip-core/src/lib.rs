//! # payslip-core
//!
//! Sheet model and the pure algorithms behind payslip mailing.
//!
//! - [`Sheet`] / [`SheetBuilder`] - a dense cell grid plus its merged regions
//! - [`classify`] / [`MergeIndex`] - the merge role of each cell
//! - [`segment`] - one header block and one block per recipient
//! - [`render_rows`] - HTML table rows honoring row/column spans
//!
//! ## Example
//!
//! ```rust
//! use payslip_core::{segment, render_block, CellTag, MergeRange, SheetBuilder};
//!
//! let mut builder = SheetBuilder::new("Payroll");
//! builder.push_row(["Email", "Month", "Name"]).unwrap();
//! builder.push_row(["a@x.com", "Jan", "Alice"]).unwrap();
//! builder.push_row(["", "Feb", "Alice"]).unwrap();
//! builder.merge(MergeRange::parse("A2:A3").unwrap()).unwrap();
//! let sheet = builder.build().unwrap();
//!
//! let blocks = segment(&sheet).unwrap();
//! assert_eq!(blocks.records.len(), 1);
//! assert_eq!(blocks.records[0].len(), 2);
//!
//! let html = render_block(&sheet, &blocks.records[0], CellTag::Data);
//! assert!(html.contains(">Feb</td>"));
//! ```

pub mod cell;
pub mod error;
pub mod html;
pub mod merge;
pub mod segment;
pub mod sheet;

pub use cell::{Cell, CellAddress, CellError, CellValue, SharedString};
pub use error::{Error, Result};
pub use html::{escape_html, render_block, render_rows, CellTag};
pub use merge::{classify, classify_at, find_overlap, MergeDescriptor, MergeIndex, MergeRange};
pub use segment::{block_lengths, segment, Block, Segmentation};
pub use sheet::{Sheet, SheetBuilder};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u32 = 16_384;
