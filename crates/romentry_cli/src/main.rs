//! Headless command-line front end for the measurement form core.
//!
//! # Responsibility
//! - Exercise the form core without a UI: schema listing, template checks,
//!   report generation, database import and checkpoint recovery.
//! - Initialize logging and crash handling from the form configuration.

use clap::{Parser, Subcommand};
use log::info;
use romentry_core::crash::error_chain;
use romentry_core::db::{open_db, DbError};
use romentry_core::report::{render_spreadsheet, render_text, validate_template, SpreadsheetTemplate};
use romentry_core::{
    clinical_form, init_logging, install_crash_handler, ConfigError, FileCheckpoint, FormConfig,
    FormSynchronizer, JsonFileStore, LoadOutcome, MemoryForm, PatientInfo, Registry,
    RegistryError, ReportError, ReportKind, SqliteRowStore, StoreError, SyncError,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Range-of-motion measurement form tools
#[derive(Parser)]
#[command(name = "romentry")]
#[command(version = romentry_core::core_version())]
#[command(about = "Inspect, report and import range-of-motion measurements", long_about = None)]
struct Cli {
    /// Form configuration file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the variables of the built-in form
    Fields,

    /// Check that a report template only uses known variables
    CheckTemplate {
        /// Template file
        template: PathBuf,

        /// Template is a tab-separated spreadsheet grid
        #[arg(long)]
        spreadsheet: bool,
    },

    /// Render a report from a saved record
    Report {
        /// Saved record (JSON)
        record: PathBuf,

        /// Template file
        template: PathBuf,

        /// Leave unit suffixes out of values
        #[arg(long)]
        no_units: bool,

        /// Render a tab-separated spreadsheet instead of text
        #[arg(long)]
        spreadsheet: bool,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a saved record into a measurement database row
    Import {
        /// SQLite database file, created when missing
        db: PathBuf,

        /// Saved record (JSON)
        record: PathBuf,

        /// Existing measurement row; a new patient and row are created when omitted
        #[arg(long)]
        rom_id: Option<i64>,
    },

    /// Report on the working checkpoint left by an abnormal exit
    Recover {
        /// Remove the checkpoint after reporting
        #[arg(long)]
        discard: bool,
    },
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Registry(RegistryError),
    Sync(SyncError),
    Store(StoreError),
    Db(DbError),
    Report(ReportError),
    Io { path: PathBuf, source: std::io::Error },
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Sync(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Report(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => err.source(),
            Self::Sync(err) => err.source(),
            Self::Store(err) => err.source(),
            Self::Db(err) => err.source(),
            Self::Io { source, .. } => Some(source),
            Self::Registry(_) | Self::Report(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RegistryError> for CliError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<SyncError> for CliError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ReportError> for CliError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("romentry: {}", error_chain(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => FormConfig::load(path)?,
        None => FormConfig::default(),
    };
    start_diagnostics(&config);
    let registry = Registry::build(&clinical_form(), &config.body_weight_control)?;

    match cli.command {
        Commands::Fields => cmd_fields(&registry),
        Commands::CheckTemplate {
            template,
            spreadsheet,
        } => cmd_check_template(&registry, &template, spreadsheet),
        Commands::Report {
            record,
            template,
            no_units,
            spreadsheet,
            output,
        } => {
            let kind = match (spreadsheet, no_units) {
                (true, _) => ReportKind::Spreadsheet,
                (false, true) => ReportKind::IsokineticText,
                (false, false) => ReportKind::Text,
            };
            cmd_report(registry, config, &record, &template, kind, output.as_deref())
        }
        Commands::Import { db, record, rom_id } => cmd_import(registry, config, &db, &record, rom_id),
        Commands::Recover { discard } => cmd_recover(registry, config, discard),
    }
}

fn start_diagnostics(config: &FormConfig) {
    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("romentry: logging disabled: {}", error_chain(&err));
        }
    }
    install_crash_handler(config.crash_dump_path.clone());
}

fn cmd_fields(registry: &Registry) -> Result<(), CliError> {
    for control in registry.controls() {
        let derived = if control.is_derived() { " (derived)" } else { "" };
        println!(
            "{}\t{}\t{:?}{}",
            control.variable_name, control.id, control.control_type, derived
        );
    }
    Ok(())
}

fn cmd_check_template(registry: &Registry, path: &Path, spreadsheet: bool) -> Result<(), CliError> {
    let text = read_text(path)?;
    let known = registry.all_variable_names();
    let fields = if spreadsheet {
        let joined = SpreadsheetTemplate::from_tsv(&text)
            .rows
            .iter()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        validate_template(&joined, &known)?
    } else {
        validate_template(&text, &known)?
    };
    println!("{}: {} fields, all known", path.display(), fields.len());
    Ok(())
}

fn cmd_report(
    registry: Registry,
    config: FormConfig,
    record: &Path,
    template: &Path,
    kind: ReportKind,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let mut sync = headless_form(registry, config)?;
    let outcome = sync.load_from(&JsonFileStore::new(), record)?;
    print_reconciliation(&outcome);

    let data = sync.report_data(kind.includes_units());
    let template_text = read_text(template)?;
    let rendered = match kind {
        ReportKind::Spreadsheet => {
            render_spreadsheet(&data, &SpreadsheetTemplate::from_tsv(&template_text))?.to_tsv()
        }
        ReportKind::Text | ReportKind::IsokineticText => render_text(&data, &template_text)?,
    };

    match output {
        Some(path) => std::fs::write(path, rendered).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?,
        None => print!("{rendered}"),
    }
    info!(
        "event=report_render module=cli status=ok kind={:?} modified={}",
        kind, outcome.modified
    );
    Ok(())
}

fn cmd_import(
    registry: Registry,
    config: FormConfig,
    db: &Path,
    record: &Path,
    rom_id: Option<i64>,
) -> Result<(), CliError> {
    let conn = open_db(db)?;
    let store = SqliteRowStore::new(&conn, config.no_value_text.as_str());
    let added = store.ensure_columns(&registry.all_variable_names())?;

    let rom_id = match rom_id {
        Some(rom_id) => rom_id,
        None => {
            let patient_id = store.create_patient(&PatientInfo::default())?;
            store.create_rom(patient_id)?
        }
    };

    let mut sync = headless_form(registry, config)?;
    let outcome = sync.load_from(&JsonFileStore::new(), record)?;
    print_reconciliation(&outcome);
    let saved = sync.save_to(&store, &rom_id)?;
    if let Some(warning) = saved.hetu_warning {
        eprintln!("warning: {warning}");
    }
    println!(
        "imported {} into rom_id {rom_id} ({} modified fields, {} new columns)",
        record.display(),
        outcome.modified,
        added.len()
    );
    Ok(())
}

fn cmd_recover(registry: Registry, config: FormConfig, discard: bool) -> Result<(), CliError> {
    let checkpoint = FileCheckpoint::new(config.checkpoint_path.clone());
    let mut sync = headless_form(registry, config)?.with_checkpoint(checkpoint.clone());

    match sync.recover_checkpoint(&checkpoint)? {
        Some(outcome) => {
            print_reconciliation(&outcome);
            println!(
                "checkpoint {} holds {} modified fields",
                checkpoint.path().display(),
                outcome.modified
            );
            if discard {
                sync.discard_checkpoint()?;
                println!("checkpoint removed");
            }
        }
        None => println!("no checkpoint at {}", checkpoint.path().display()),
    }
    Ok(())
}

fn headless_form<'a>(
    registry: Registry,
    mut config: FormConfig,
) -> Result<FormSynchronizer<'a, MemoryForm>, CliError> {
    config.auto_persist = false;
    let view = MemoryForm::for_registry(&registry);
    Ok(FormSynchronizer::new(registry, view, config)?)
}

fn print_reconciliation(outcome: &LoadOutcome) {
    if let Some(message) = outcome.report.message() {
        let label = if outcome.report.requires_attention() {
            "warning"
        } else {
            "note"
        };
        eprintln!("{label}: {message}");
    }
}

fn read_text(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
