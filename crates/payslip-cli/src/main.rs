//! Payslip CLI - mails each employee their own rows of a payroll workbook

mod logger;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use payslip_core::{segment, Sheet};
use payslip_mail::{
    normalize_address, DispatchEngine, FileJournal, Layout, PreviewTransport, RunInputs, Settings,
    SmtpTransport, Transport,
};
use payslip_xlsx::XlsxReader;

#[derive(Parser)]
#[command(name = "payslip")]
#[command(author, version, about = "Send per-employee payslips from a payroll workbook")]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    /// More log output (repeat for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PathArgs {
    /// Directory holding config/, data/ and logs/ (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,

    /// Settings file (default: <base-dir>/config/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Payroll workbook (default: the configured workbook in <base-dir>/data)
    #[arg(long, global = true)]
    workbook: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message per record over SMTP
    Send,

    /// Write the messages as HTML files instead of sending them
    Preview {
        /// Output directory
        #[arg(short, long, default_value = "preview")]
        out: PathBuf,
    },

    /// Show how the workbook splits into header and records
    Inspect {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Create the directory layout and a settings skeleton
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(logger::level_for(cli.verbose, cli.quiet))
        .context("Failed to install logger")?;

    let layout = Layout::new(&cli.paths.base_dir);

    match cli.command {
        Commands::Send => send(&layout, &cli.paths, None),
        Commands::Preview { out } => send(&layout, &cli.paths, Some(&out)),
        Commands::Inspect { json } => inspect(&layout, &cli.paths, json),
        Commands::Init => init(&layout),
    }
}

fn load_settings(layout: &Layout, paths: &PathArgs) -> Result<Settings> {
    let path = paths
        .config
        .clone()
        .unwrap_or_else(|| layout.config_file());
    Settings::load(&path).with_context(|| {
        format!(
            "Failed to load settings from '{}' (run `payslip init` to create one)",
            path.display()
        )
    })
}

fn workbook_path(layout: &Layout, paths: &PathArgs, settings: Option<&Settings>) -> PathBuf {
    match (&paths.workbook, settings) {
        (Some(path), _) => path.clone(),
        (None, Some(settings)) => layout.workbook_path(&settings.message.workbook),
        (None, None) => layout.workbook_path("payroll.xlsx"),
    }
}

/// Full run; `preview` swaps SMTP for HTML files
fn send(layout: &Layout, paths: &PathArgs, preview: Option<&Path>) -> Result<()> {
    let settings = load_settings(layout, paths)?;
    let workbook = workbook_path(layout, paths, Some(&settings));

    let inputs = RunInputs::load(layout, &workbook)
        .with_context(|| format!("Failed to prepare run from '{}'", workbook.display()))?;

    let mut engine = DispatchEngine::new(&settings.message, settings.user.credentials());
    let mut transport: Box<dyn Transport> = match preview {
        Some(dir) => {
            engine = engine.with_send_interval(std::time::Duration::ZERO);
            Box::new(PreviewTransport::new(dir))
        }
        None => Box::new(SmtpTransport::new(&settings.user)),
    };

    let log_path = layout.log_file();
    let mut journal = FileJournal::new(&log_path);

    let outcome = engine
        .run(
            &inputs.sheet,
            &inputs.preamble,
            &inputs.signature,
            transport.as_mut(),
            &mut journal,
        )
        .with_context(|| format!("Failed to process '{}'", workbook.display()))?;

    let summary = outcome.summary();
    println!(
        "{} sent, {} failed, {} skipped (no address)",
        summary.sent, summary.failed, summary.skipped
    );
    if summary.any_failure {
        println!("Some messages failed, check {}.", log_path.display());
    } else if let Some(dir) = preview {
        println!("All messages written to {}.", dir.display());
    } else {
        println!("All messages sent.");
    }

    Ok(())
}

#[derive(Serialize)]
struct InspectReport {
    sheet: String,
    rows: usize,
    columns: usize,
    merged_regions: Vec<String>,
    header_rows: usize,
    records: Vec<RecordView>,
}

#[derive(Serialize)]
struct RecordView {
    row: usize,
    rows: usize,
    address: Option<String>,
    display_name: String,
}

fn inspect_report(sheet: &Sheet, display_name_column: u32) -> InspectReport {
    let (header_rows, records) = match segment(sheet) {
        Some(blocks) => {
            let records = blocks
                .records
                .iter()
                .map(|block| RecordView {
                    row: block.start + 1,
                    rows: block.len(),
                    address: block
                        .lead_cell(1)
                        .filter(|cell| !cell.value.is_blank())
                        .map(|cell| normalize_address(&cell.value.to_string())),
                    display_name: block
                        .lead_cell(display_name_column)
                        .map(|cell| cell.value.to_string())
                        .unwrap_or_default(),
                })
                .collect();
            (blocks.header.len(), records)
        }
        None => (0, Vec::new()),
    };

    InspectReport {
        sheet: sheet.name().to_string(),
        rows: sheet.row_count(),
        columns: sheet.col_count(),
        merged_regions: sheet
            .merged_regions()
            .iter()
            .map(|range| range.to_a1_string())
            .collect(),
        header_rows,
        records,
    }
}

fn inspect(layout: &Layout, paths: &PathArgs, json: bool) -> Result<()> {
    // Settings are optional here; without them the defaults apply
    let config = paths.config.clone().unwrap_or_else(|| layout.config_file());
    let settings = if config.exists() {
        Some(load_settings(layout, paths)?)
    } else {
        None
    };
    let workbook = workbook_path(layout, paths, settings.as_ref());
    let display_name_column = settings
        .as_ref()
        .map_or(4, |s| s.message.display_name_column);

    let sheet = XlsxReader::read_file(&workbook)
        .with_context(|| format!("Failed to open '{}'", workbook.display()))?;
    let report = inspect_report(&sheet, display_name_column);

    if json {
        let text = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", text);
        return Ok(());
    }

    println!("File: {}", workbook.display());
    println!(
        "Sheet: \"{}\" ({} rows x {} columns)",
        report.sheet, report.rows, report.columns
    );
    if !report.merged_regions.is_empty() {
        println!("Merged: {}", report.merged_regions.join(", "));
    }
    println!("Header: {} rows", report.header_rows);
    println!("Records: {}", report.records.len());
    for record in &report.records {
        println!(
            "  row {:<4} {} row(s)  {:<32} {}",
            record.row,
            record.rows,
            record.address.as_deref().unwrap_or("(no address)"),
            record.display_name
        );
    }

    Ok(())
}

fn init(layout: &Layout) -> Result<()> {
    layout
        .ensure_dirs()
        .with_context(|| format!("Failed to create directories in '{}'", layout.base_dir().display()))?;

    let config = layout.config_file();
    if layout
        .write_default_config()
        .with_context(|| format!("Failed to write '{}'", config.display()))?
    {
        println!("Wrote {}", config.display());
    } else {
        println!("Kept existing {}", config.display());
    }
    println!(
        "Put the workbook, attach.txt and signature.txt in {}",
        layout.data_dir().display()
    );

    Ok(())
}
