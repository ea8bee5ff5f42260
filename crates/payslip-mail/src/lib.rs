//! # payslip-mail
//!
//! Turns a payroll [`Sheet`](payslip_core::Sheet) into one HTML message per
//! recipient and sends each through a [`Transport`].
//!
//! - [`Settings`] / [`Layout`] - explicit configuration, loaded once
//! - [`MessageTemplate`] - header table, preamble and signature, built once
//! - [`Transport`] - [`SmtpTransport`] for real sends, [`PreviewTransport`] for files
//! - [`Journal`] - append-only, timestamped run log
//! - [`DispatchEngine`] - the one-pass send loop
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use payslip_core::SheetBuilder;
//! use payslip_mail::{
//!     Credentials, DispatchEngine, MemoryJournal, MessageSettings, SendOutcome, Transport,
//! };
//!
//! struct Accept;
//!
//! impl Transport for Accept {
//!     fn send(&mut self, _to: &str, _subject: &str, _body: &str, _auth: &Credentials) -> SendOutcome {
//!         SendOutcome::Delivered
//!     }
//! }
//!
//! let mut builder = SheetBuilder::new("Payroll");
//! builder.push_row(["Email", "Month", "Dept", "Name"]).unwrap();
//! builder.push_row(["a@x.com", "Jan", "Ops", "Alice"]).unwrap();
//! let sheet = builder.build().unwrap();
//!
//! let settings = MessageSettings::default();
//! let mut transport = Accept;
//! let mut journal = MemoryJournal::default();
//! let engine = DispatchEngine::new(&settings, Credentials::new("hr@x.com", "pw"))
//!     .with_send_interval(Duration::ZERO);
//!
//! let outcome = engine.run(&sheet, "", "", &mut transport, &mut journal).unwrap();
//! assert!(!outcome.summary().any_failure);
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod journal;
pub mod template;
pub mod transport;

pub use config::{load_text_source, Layout, MessageSettings, Settings, UserSettings};
pub use dispatch::{
    normalize_address, DispatchEngine, DispatchOutcome, RecordOutcome, RecordStatus, RunInputs,
    RunSummary,
};
pub use error::{ConfigError, ConfigResult, DispatchError, DispatchResult};
pub use journal::{FileJournal, Journal, MemoryJournal};
pub use template::MessageTemplate;
pub use transport::{Credentials, PreviewTransport, SendOutcome, SmtpTransport, Transport};
