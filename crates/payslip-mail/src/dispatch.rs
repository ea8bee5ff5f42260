//! The dispatch loop
//!
//! One pass over the record blocks of a sheet, in row order. A record with
//! no address is skipped, a failed send is recorded and the loop goes on;
//! only problems found before the first send abort a run.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use payslip_core::{render_block, segment, Block, CellTag, Sheet};
use payslip_xlsx::XlsxReader;

use crate::config::{load_text_source, Layout, MessageSettings};
use crate::error::{ConfigError, DispatchError, DispatchResult};
use crate::journal::Journal;
use crate::template::MessageTemplate;
use crate::transport::{Credentials, SendOutcome, Transport};

/// What happened to one record block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RecordStatus {
    Sent,
    Failed(String),
    SkippedNoAddress,
}

/// Outcome of one record block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    /// 1-based sheet row of the block's first row
    pub row: u32,
    /// Normalized address, `None` when the record was skipped
    pub recipient: Option<String>,
    pub display_name: String,
    pub status: RecordStatus,
}

impl RecordOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == RecordStatus::Sent
    }

    pub fn failed(&self) -> bool {
        matches!(self.status, RecordStatus::Failed(_))
    }

    pub fn skipped_no_address(&self) -> bool {
        self.status == RecordStatus::SkippedNoAddress
    }
}

/// Counts for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Set when at least one send failed; skips do not count
    pub any_failure: bool,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.sent + self.failed + self.skipped
    }
}

/// Per-record outcomes of a run, in sheet order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub subject: String,
    pub records: Vec<RecordOutcome>,
}

impl DispatchOutcome {
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for record in &self.records {
            match record.status {
                RecordStatus::Sent => summary.sent += 1,
                RecordStatus::Failed(_) => summary.failed += 1,
                RecordStatus::SkippedNoAddress => summary.skipped += 1,
            }
        }
        summary.any_failure = summary.failed > 0;
        summary
    }
}

/// Inputs of a run read from disk
#[derive(Debug)]
pub struct RunInputs {
    pub sheet: Sheet,
    pub preamble: String,
    pub signature: String,
}

impl RunInputs {
    /// Read the workbook plus the preamble and signature of `layout`
    pub fn load(layout: &Layout, workbook: &Path) -> DispatchResult<Self> {
        let sheet = XlsxReader::read_file(workbook)?;
        Ok(Self {
            sheet,
            preamble: read_source(&layout.attach_file())?,
            signature: read_source(&layout.signature_file())?,
        })
    }
}

fn read_source(path: &Path) -> DispatchResult<String> {
    load_text_source(path).map_err(|source| {
        DispatchError::Config(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    })
}

/// Called with the send interval after each successful send
type PauseFn = Arc<dyn Fn(Duration) + Send + Sync>;

/// Sends one message per record block
#[derive(Clone)]
pub struct DispatchEngine {
    subject: String,
    display_name_column: u32,
    period_column: u32,
    send_interval: Duration,
    credentials: Credentials,
    date: NaiveDate,
    pause: PauseFn,
}

impl fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("subject", &self.subject)
            .field("display_name_column", &self.display_name_column)
            .field("period_column", &self.period_column)
            .field("send_interval", &self.send_interval)
            .field("credentials", &self.credentials)
            .field("date", &self.date)
            .finish_non_exhaustive()
    }
}

impl DispatchEngine {
    /// Engine for `[message]` settings, stamped with today's date
    pub fn new(settings: &MessageSettings, credentials: Credentials) -> Self {
        Self {
            subject: settings.subject.clone(),
            display_name_column: settings.display_name_column,
            period_column: settings.period_column,
            send_interval: Duration::from_millis(settings.send_interval_ms),
            credentials,
            date: Local::now().date_naive(),
            pause: Arc::new(thread::sleep),
        }
    }

    /// Override the pause after each successful send
    pub fn with_send_interval(mut self, interval: Duration) -> Self {
        self.send_interval = interval;
        self
    }

    /// Replace `thread::sleep` as the pause between sends
    pub fn with_pause(mut self, pause: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.pause = Arc::new(pause);
        self
    }

    /// Override the date stamp of the messages
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Subject line; `{period}` comes from the first record block
    pub fn subject_for(&self, records: &[Block<'_>]) -> String {
        let period = records
            .first()
            .and_then(|block| block.lead_cell(self.period_column))
            .map(|cell| cell.value.to_string())
            .unwrap_or_default();
        self.subject.replace("{period}", period.trim())
    }

    /// Run the whole batch.
    ///
    /// Fails only if the sheet has no rows; every record gets an entry in
    /// the returned outcome whatever its transport reports.
    pub fn run(
        &self,
        sheet: &Sheet,
        preamble: &str,
        signature: &str,
        transport: &mut dyn Transport,
        journal: &mut dyn Journal,
    ) -> DispatchResult<DispatchOutcome> {
        let blocks =
            segment(sheet).ok_or_else(|| DispatchError::EmptySheet(sheet.name().to_string()))?;

        let template =
            MessageTemplate::for_header(sheet, &blocks.header, preamble, signature, self.date);
        let subject = self.subject_for(&blocks.records);

        log::info!(
            "sending {} records from sheet '{}' (header: {} rows)",
            blocks.records.len(),
            sheet.name(),
            blocks.header.len()
        );

        let mut records = Vec::with_capacity(blocks.records.len());
        for block in &blocks.records {
            let outcome = self.dispatch_record(sheet, block, &template, &subject, transport, journal);
            if outcome.succeeded() && !self.send_interval.is_zero() {
                (self.pause)(self.send_interval);
            }
            records.push(outcome);
        }

        let outcome = DispatchOutcome { subject, records };
        let summary = outcome.summary();
        journal.append_line(&format!(
            "run finished: {} sent, {} failed, {} skipped",
            summary.sent, summary.failed, summary.skipped
        ));
        log::info!(
            "run finished: {} sent, {} failed, {} skipped",
            summary.sent,
            summary.failed,
            summary.skipped
        );

        Ok(outcome)
    }

    fn dispatch_record(
        &self,
        sheet: &Sheet,
        block: &Block<'_>,
        template: &MessageTemplate,
        subject: &str,
        transport: &mut dyn Transport,
        journal: &mut dyn Journal,
    ) -> RecordOutcome {
        let row = block.start as u32 + 1;
        let display_name = block
            .lead_cell(self.display_name_column)
            .map(|cell| cell.value.to_string())
            .unwrap_or_default();

        let address = match block.lead_cell(1).filter(|cell| !cell.value.is_blank()) {
            Some(cell) => normalize_address(&cell.value.to_string()),
            None => {
                log::info!("row {}: no address, skipping {}", row, display_name);
                journal.append_line(&format!("skipped row {} ({}): no address", row, display_name));
                return RecordOutcome {
                    row,
                    recipient: None,
                    display_name,
                    status: RecordStatus::SkippedNoAddress,
                };
            }
        };

        let body = render_block(sheet, block, CellTag::Data);
        let message = template.render(&display_name, &body);

        let status = match transport.send(&address, subject, &message, &self.credentials) {
            SendOutcome::Delivered => {
                log::info!("sent to {} <{}>", display_name, address);
                journal.append_line(&format!("sent to {} {}", display_name, address));
                RecordStatus::Sent
            }
            SendOutcome::Failed(reason) => {
                log::warn!("failed to send to {} <{}>: {}", display_name, address, reason);
                journal.append_line(&format!(
                    "failed to send to {} {}: {}",
                    display_name, address, reason
                ));
                RecordStatus::Failed(reason)
            }
        };

        RecordOutcome {
            row,
            recipient: Some(address),
            display_name,
            status,
        }
    }
}

/// Drop line breaks and spaces that creep into address cells
pub fn normalize_address(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\n' | '\r' | ' '))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::MemoryJournal;
    use payslip_core::{CellValue, SheetBuilder};

    struct Accept(Vec<String>);

    impl Transport for Accept {
        fn send(&mut self, to: &str, _: &str, _: &str, _: &Credentials) -> SendOutcome {
            self.0.push(to.to_string());
            SendOutcome::Delivered
        }
    }

    fn engine() -> DispatchEngine {
        DispatchEngine::new(&MessageSettings::default(), Credentials::new("hr@x.com", "pw"))
            .with_send_interval(Duration::ZERO)
            .with_date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("a@x.com \n"), "a@x.com");
        assert_eq!(normalize_address(" b @x.com\r\n"), "b@x.com");
        assert_eq!(normalize_address("c@x.com"), "c@x.com");
    }

    #[test]
    fn test_subject_uses_first_record_period() {
        let mut builder = SheetBuilder::new("Payroll");
        builder.push_row(["Email", "Period"]).unwrap();
        builder.push_row(["a@x.com", " 2024-01 "]).unwrap();
        builder.push_row(["b@x.com", "ignored"]).unwrap();
        let sheet = builder.build().unwrap();
        let blocks = segment(&sheet).unwrap();

        assert_eq!(engine().subject_for(&blocks.records), "Payslip for 2024-01");
        assert_eq!(engine().subject_for(&[]), "Payslip for ");
    }

    #[test]
    fn test_empty_sheet_is_fatal() {
        let sheet = SheetBuilder::new("Blank").build().unwrap();
        let mut transport = Accept(Vec::new());
        let mut journal = MemoryJournal::default();

        let err = engine()
            .run(&sheet, "", "", &mut transport, &mut journal)
            .unwrap_err();
        assert!(matches!(err, DispatchError::EmptySheet(name) if name == "Blank"));
        assert!(journal.lines().is_empty());
    }

    #[test]
    fn test_header_only_sheet_sends_nothing() {
        let mut builder = SheetBuilder::new("Payroll");
        builder.push_row(["Email", "Month"]).unwrap();
        let sheet = builder.build().unwrap();
        let mut transport = Accept(Vec::new());
        let mut journal = MemoryJournal::default();

        let outcome = engine()
            .run(&sheet, "", "", &mut transport, &mut journal)
            .unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.summary(), RunSummary::default());
        assert_eq!(
            journal.messages().collect::<Vec<_>>(),
            vec!["run finished: 0 sent, 0 failed, 0 skipped"]
        );
    }

    #[test]
    fn test_whitespace_address_is_skipped() {
        let mut builder = SheetBuilder::new("Payroll");
        builder.push_row(["Email", "Month", "Dept", "Name"]).unwrap();
        builder.push_row([" \n", "Jan", "Ops", "Carol"]).unwrap();
        builder
            .push_row([CellValue::from("d@x.com"), "Jan".into(), "Ops".into(), CellValue::Empty])
            .unwrap();
        let sheet = builder.build().unwrap();
        let mut transport = Accept(Vec::new());
        let mut journal = MemoryJournal::default();

        let outcome = engine()
            .run(&sheet, "", "", &mut transport, &mut journal)
            .unwrap();

        assert!(outcome.records[0].skipped_no_address());
        assert_eq!(outcome.records[0].display_name, "Carol");
        assert_eq!(outcome.records[0].row, 2);
        assert!(outcome.records[1].succeeded());
        assert_eq!(outcome.records[1].display_name, "");
        assert_eq!(transport.0, vec!["d@x.com".to_string()]);
    }

    #[test]
    fn test_summary_counts() {
        let outcome = DispatchOutcome {
            subject: String::new(),
            records: vec![
                RecordOutcome {
                    row: 2,
                    recipient: Some("a@x.com".into()),
                    display_name: "A".into(),
                    status: RecordStatus::Sent,
                },
                RecordOutcome {
                    row: 3,
                    recipient: Some("b@x.com".into()),
                    display_name: "B".into(),
                    status: RecordStatus::Failed("timeout".into()),
                },
                RecordOutcome {
                    row: 4,
                    recipient: None,
                    display_name: "C".into(),
                    status: RecordStatus::SkippedNoAddress,
                },
            ],
        };

        let summary = outcome.summary();
        assert!(summary.any_failure);
        assert_eq!((summary.sent, summary.failed, summary.skipped), (1, 1, 1));
        assert_eq!(summary.total(), 3);

        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["any_failure"], true);
        assert_eq!(json["sent"], 1);

        let status = serde_json::to_value(&outcome.records[1].status).unwrap();
        assert_eq!(status["status"], "failed");
        assert_eq!(status["reason"], "timeout");
    }
}
