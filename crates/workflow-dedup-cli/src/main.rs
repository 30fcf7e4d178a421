use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use std::path::PathBuf;
use workflow_dedup_core::{logging, Config, DedupReport, LogLevel, ReportEntry, WorkflowDeduper};

const RULE: &str = "--------------------------------------------------";

#[derive(Parser)]
#[command(name = "workflow-dedup")]
#[command(about = "Remove near-duplicate generative workflow snapshots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare documents in filename order and optionally delete near-duplicates
    Dedup {
        /// Directory containing the JSON documents
        directory: PathBuf,

        /// Delete documents whose difference to the last kept one is LESS than
        /// this percentage; 0 deletes exact duplicates (ignoring seeds)
        #[arg(short = 'd', long, value_name = "PERCENT")]
        delete_threshold: Option<f64>,

        /// Report what would be deleted without touching any file
        #[arg(long)]
        dry_run: bool,

        /// Copy documents here before deleting them
        #[arg(long, value_name = "DIR")]
        backup_dir: Option<PathBuf>,

        /// Maximum directory depth to scan (1 = the directory itself)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write logs to a rotating file in this directory
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,

        /// Verbosity level
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Show the difference between two documents
    Diff {
        left: PathBuf,
        right: PathBuf,

        /// List the leaf paths that differ
        #[arg(long)]
        show_paths: bool,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "workflow-dedup.json")]
        path: PathBuf,
    },
}

fn init_console_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn print_report(report: &DedupReport) {
    for entry in &report.entries {
        match entry {
            ReportEntry::Initial(name) => println!("  {}: (Initial file, kept by default)", name),
            ReportEntry::Compared(record) => println!(
                "  {} vs {}: Diff {:.2}% - {}",
                record.filename, record.compared_against, record.distance_percent, record.outcome
            ),
            ReportEntry::Skipped(skipped) => {
                println!("Error: {}: {}. Skipping.", skipped.filename, skipped.message)
            }
        }
    }

    let summary = &report.summary;
    println!("{}", RULE);
    println!("Comparison Summary:");
    println!("  Total JSON files processed: {}", summary.total_processed);
    println!("  Files compared: {}", summary.total_compared);
    if let Some(threshold) = report.threshold {
        println!(
            "  Files dropped (diff < {:.2}%): {}",
            threshold, summary.total_dropped
        );
        println!("  Files deleted: {}", summary.total_deleted);
    }
    if summary.total_errors > 0 {
        println!("  Errors: {}", summary.total_errors);
    }
    println!("Comparison complete.");
}

fn main() -> Result<(), anyhow::Error> {
    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Dedup {
            directory,
            delete_threshold,
            dry_run,
            backup_dir,
            max_depth,
            config,
            log_dir,
            verbose,
        } => {
            // Set up configuration
            let mut config = if let Some(config_path) = config {
                Config::from_file(&config_path)?
            } else {
                Config::default()
            };

            // Override config with command line arguments
            if delete_threshold.is_some() {
                config.delete_threshold = delete_threshold;
            }
            config.dry_run |= dry_run;
            if backup_dir.is_some() {
                config.backup_dir = backup_dir;
            }
            if max_depth.is_some() {
                config.max_depth = max_depth;
            }

            // Set log level based on verbosity
            config.log_level = match verbose {
                0 => config.log_level,
                1 => LogLevel::Debug,
                _ => LogLevel::Trace,
            };

            match &log_dir {
                Some(dir) => logging::init_logger(dir, config.log_level.into())?,
                // Report lines go to stdout; keep the console log for problems
                None if verbose == 0 => init_console_logger(LevelFilter::Warn),
                None => init_console_logger(config.log_level.into()),
            }

            // Validates the configuration before anything is touched
            let mut deduper = WorkflowDeduper::new(config)?;

            println!(
                "Comparing JSON files in '{}' (Delete Threshold: {}{})...",
                directory.display(),
                deduper
                    .config()
                    .delete_threshold
                    .map_or_else(|| "None".to_string(), |t| t.to_string()),
                if deduper.config().delete_threshold.is_some()
                    && !deduper.config().is_deletion_mode()
                {
                    ", dry run"
                } else {
                    ""
                }
            );
            println!("{}", RULE);

            let report = deduper.run(&directory)?;
            if report.entries.is_empty() {
                println!("No JSON files found in '{}'.", directory.display());
                return Ok(());
            }

            print_report(&report);
            info!("Deduplication complete");
            Ok(())
        }

        Commands::Diff {
            left,
            right,
            show_paths,
        } => {
            init_console_logger(LevelFilter::Warn);

            let deduper = WorkflowDeduper::new(Config::default())?;
            let comparison = deduper.compare(&left, &right)?;

            println!(
                "{} vs {}: Diff {:.2}%",
                left.display(),
                right.display(),
                comparison.distance_percent
            );

            if show_paths {
                for path_value in &comparison.diff.only_in_left {
                    println!("  - {} = {}", path_value.path, path_value.value);
                }
                for path_value in &comparison.diff.only_in_right {
                    println!("  + {} = {}", path_value.path, path_value.value);
                }
            }
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}
