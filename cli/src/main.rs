use std::env;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use wbdict_backend::db::{DatabaseHandle, default_db_path};
use wbdict_backend::stats::format_stats_table;
use wbdict_backend::{TagRules, get_create_wbdict_dir, logger, parse_tei_file};

use wbdict_cli::convert::convert_directory;
use wbdict_cli::import::{DEFAULT_BATCH_SIZE, import_directory};

#[derive(Parser, Debug)]
#[command(author, version, about = "TEI dictionary entries to JSON and SQLite", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory for logs and the default database.
    /// If not provided, the WBDICT_DIR environment variable will be used.
    #[arg(long, global = true, value_name = "DIRECTORY_PATH", env = "WBDICT_DIR")]
    wbdict_dir: Option<PathBuf>,

    /// One of silent, error, warn, info, debug
    #[arg(long, global = true, value_name = "LEVEL", env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a directory of TEI XML entries to JSON files with the same layout
    #[command(arg_required_else_help = true)]
    Convert {
        #[arg(value_name = "INPUT_DIR")]
        input_dir: PathBuf,

        #[arg(value_name = "OUTPUT_DIR", default_value = "./output_json")]
        output_dir: PathBuf,
    },

    /// Import a directory of TEI XML entries into the entries database
    #[command(arg_required_else_help = true)]
    Import {
        #[arg(value_name = "INPUT_DIR")]
        input_dir: PathBuf,

        /// Database file, defaults to entries.sqlite3 in the wbdict directory
        #[arg(long, value_name = "DB_PATH", env = "WBDICT_DB_PATH")]
        db_path: Option<PathBuf>,

        /// Number of files parsed and written per transaction
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Create or update the database schema before importing
        #[arg(long, default_value_t = false)]
        setup_schema: bool,
    },

    /// Print one TEI file as JSON
    #[command(arg_required_else_help = true)]
    Show {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print per-dictionary statistics of the entries database
    Stats {
        #[arg(long, value_name = "DB_PATH", env = "WBDICT_DB_PATH")]
        db_path: Option<PathBuf>,
    },
}

fn print_separator() {
    println!("{}", "=".repeat(60));
}

fn run_convert(input_dir: &Path, output_dir: &Path) -> Result<()> {
    let start = Instant::now();

    println!("Input:  {}", input_dir.display());
    println!("Output: {}", output_dir.display());
    print_separator();

    let summary = convert_directory(input_dir, output_dir, &TagRules::default(), true)?;
    if summary.total == 0 {
        println!("✗ No XML files found in {}", input_dir.display());
        return Ok(());
    }

    println!();
    print_separator();
    println!("Conversion complete!");
    println!("  Total:     {}", summary.total);
    println!("  Converted: {}", summary.converted);
    println!("  Failed:    {}", summary.failed);
    print_separator();

    if !summary.stats.is_empty() {
        println!("\nStatistics:");
        print!("{}", format_stats_table(&summary.stats.rows()));
    }

    println!("\nDuration: {}", logger::format_duration(start.elapsed()));
    Ok(())
}

fn run_import(input_dir: &Path, db_path: &Path, batch_size: usize, setup_schema: bool) -> Result<()> {
    if !input_dir.is_dir() {
        bail!("Directory not found: {}", input_dir.display());
    }

    println!("Database:         {}", db_path.display());
    println!("Import directory: {}", input_dir.display());
    print_separator();

    let db = DatabaseHandle::open(db_path, setup_schema)?;
    if setup_schema {
        println!("✓ Schema created/updated");
    }

    let summary = import_directory(&db, input_dir, batch_size, &TagRules::default(), true)?;
    if summary.total == 0 {
        println!("✗ No XML files found in {}", input_dir.display());
        return Ok(());
    }

    println!();
    print_separator();
    println!("Import complete!");
    println!("  Total:    {}", summary.total);
    println!("  Success:  {}", summary.imported);
    println!("  Failed:   {}", summary.failed);
    print_separator();

    print_db_statistics(&db)
}

fn run_show(file: &Path) -> Result<()> {
    let entry = parse_tei_file(file, &TagRules::default())?;
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

fn run_stats(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        bail!("Database not found: {}", db_path.display());
    }
    let db = DatabaseHandle::open(db_path, false)?;
    print_db_statistics(&db)
}

fn print_db_statistics(db: &DatabaseHandle) -> Result<()> {
    let rows = db.wb_statistics().context("Failed to read database statistics")?;
    println!("\nDatabase Statistics:");
    print!("{}", format_stats_table(&rows));

    let total = db.count_entries()?;
    println!("\nTotal entries in database: {}", total);
    Ok(())
}

fn main() {
    // The .env file may define WBDICT_DIR or WBDICT_DB_PATH,
    // clap picks them up via `env = ...`.
    if dotenv().is_err() {
        tracing::debug!("No .env file found or failed to load.");
    }

    let cli = Cli::parse();

    // Precedence: --wbdict-dir, then WBDICT_DIR, then the platform data dir.
    // Exported so the logger and the default database path agree with it.
    if let Some(path) = &cli.wbdict_dir {
        unsafe { env::set_var("WBDICT_DIR", path); }
    }

    match get_create_wbdict_dir() {
        Ok(p) if p.is_dir() => {}
        Ok(p) => {
            eprintln!("Error: Not a directory: {:?}", p);
            exit(1);
        }
        Err(e) => {
            eprintln!("Failed to get wbdict directory: {}", e);
            eprintln!("Use the --wbdict-dir option or set the WBDICT_DIR environment variable.");
            exit(1);
        }
    }

    if let Some(level) = &cli.log_level {
        if !logger::set_log_level_str(level) {
            eprintln!("Error: Unknown log level: {}", level);
            exit(1);
        }
    }
    logger::debug(&format!("Log level: {}", logger::get_log_level().as_str()));

    let command_result = match cli.command {
        Commands::Convert { input_dir, output_dir } => run_convert(&input_dir, &output_dir),

        Commands::Import { input_dir, db_path, batch_size, setup_schema } => {
            let db_path = db_path.unwrap_or_else(default_db_path);
            run_import(&input_dir, &db_path, batch_size, setup_schema)
        }

        Commands::Show { file } => run_show(&file),

        Commands::Stats { db_path } => run_stats(&db_path.unwrap_or_else(default_db_path)),
    };

    if let Err(e) = command_result {
        logger::error(&format!("{:#}", e));
        eprintln!("Error executing command: {:#}", e);
        exit(1);
    }
}
