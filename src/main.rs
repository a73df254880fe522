use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;
mod content_events;
mod decimal;
mod display_items;
mod error;
mod literal;
mod normalize;
mod output;
mod records;
mod splits;
mod tiers;

use config::SotbConfig;
use error::Result;
use literal::{Literal, ToLiteral};
use output::{write_document, Destination, OutputFormat};
use records::{read_csv, DisplayItemRow, SplitRow, TierRow};

#[derive(Parser)]
#[command(name = "sotb")]
#[command(about = "Turn SOTB sheet exports into model importer records")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to <config dir>/sotb/config.toml if present)
    #[arg(long, global = true, env = "SOTB_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the output file is written to
    #[arg(long, short = 'o', global = true, env = "SOTB_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Literal)]
    format: OutputFormat,

    /// Print the document instead of writing a file
    #[arg(long, global = true)]
    stdout: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SheetArgs {
    /// CSV export of the SOTB sheet
    csvfile: PathBuf,

    /// Machine name of the bundle, used to name the output file
    #[arg(long, short = 'b')]
    bundle: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Revenue splits for the initial and price-increase phases
    Splits(SheetArgs),
    /// Content events (price tiers and their rewards)
    ContentEvents(SheetArgs),
    /// Display items for every title in the bundle
    DisplayItems(SheetArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = SotbConfig::load(cli.config.as_deref())?;

    let (sheet, kind, document) = match &cli.command {
        Commands::Splits(sheet) => {
            let rows: Vec<SplitRow> = read_csv(&sheet.csvfile)?;
            let document = splits::build_splits(&rows, &config.splits)?;
            (sheet, "splits", document.to_literal())
        }
        Commands::ContentEvents(sheet) => {
            let rows: Vec<TierRow> = read_csv(&sheet.csvfile)?;
            let events = content_events::build_content_events(&rows)?;
            (sheet, "contentevents", events.to_literal())
        }
        Commands::DisplayItems(sheet) => {
            let rows: Vec<DisplayItemRow> = read_csv(&sheet.csvfile)?;
            let items = display_items::build_display_items(&rows)?;
            (sheet, "displayitems", Literal::List(items))
        }
    };

    emit(cli, &config, &sheet.bundle, kind, &document)
}

fn emit(
    cli: &Cli,
    config: &SotbConfig,
    bundle: &str,
    kind: &str,
    document: &Literal,
) -> Result<()> {
    if cli.stdout {
        write_document(document, cli.format, Destination::Stdout, bundle, kind)?;
        return Ok(());
    }

    let dir = config.resolve_output_dir(cli.output_dir.as_deref());
    if let Some(path) =
        write_document(document, cli.format, Destination::Directory(&dir), bundle, kind)?
    {
        println!("{} has been created", path.display());
    }
    Ok(())
}
