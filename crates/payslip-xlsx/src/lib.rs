//! # payslip-xlsx
//!
//! Reads the first worksheet of an XLSX (Office Open XML) workbook into a
//! [`payslip_core::Sheet`]: evaluated cell values plus merged regions.

pub mod error;
pub mod reader;

mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
