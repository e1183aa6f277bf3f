//! dtable-index CLI - extract index facts from guided decision tables

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dtable_index::{
    resolve_type_name, BatchIndexer, Config, DecisionTable, DecisionTableIndexer,
    DefaultIndexBuilder, ErrorPolicy, Fact,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dtable-index")]
#[command(about = "Extract type, field and attribute index facts from guided decision tables")]
#[command(version)]
struct Cli {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a single decision table
    Index {
        /// Table document (JSON)
        file: PathBuf,

        /// Skip columns that cannot be indexed instead of failing
        #[arg(long)]
        keep_going: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Index every decision table under a directory
    Batch {
        /// Directory to walk
        dir: PathBuf,

        /// Skip columns and tables that cannot be indexed instead of failing
        #[arg(long)]
        keep_going: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Resolve a type name the way the indexer does
    Resolve {
        /// Type name, qualified or not
        type_name: String,

        /// Import (repeatable, first match wins)
        #[arg(long = "import", short)]
        imports: Vec<String>,

        /// Package used when no import matches
        #[arg(long, short, default_value = "")]
        package: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn load_config(path: Option<&Path>, keep_going: bool) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    if keep_going {
        config.columns.on_error = ErrorPolicy::Skip;
        config.batch.on_error = ErrorPolicy::Skip;
    }

    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Index {
            file,
            keep_going,
            format,
        } => {
            let config = load_config(cli.config.as_deref(), keep_going)?;
            let table = DecisionTable::load(&file)
                .with_context(|| format!("loading {}", file.display()))?;

            let mut builder = DefaultIndexBuilder::with_package(&table.package_name);
            let report = DecisionTableIndexer::from_config(&table, &config)
                .index_report(&mut builder)
                .with_context(|| format!("indexing {}", file.display()))?;

            match format {
                OutputFormat::Text => {
                    print_facts(&report.facts);
                    for skipped in &report.skipped {
                        eprintln!("Skipped: {}", skipped);
                    }
                    println!();
                    println!(
                        "{} facts ({} types, {} fields, {} attributes)",
                        report.facts.len(),
                        builder.type_count(),
                        builder.field_count(),
                        builder.attribute_count()
                    );
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }

        Command::Batch {
            dir,
            keep_going,
            format,
        } => {
            let config = load_config(cli.config.as_deref(), keep_going)?;
            let report = BatchIndexer::new(config).index_directory(&dir)?;

            match format {
                OutputFormat::Text => {
                    for asset in &report.assets {
                        println!("{}", asset.path.display());
                        print_facts(&asset.facts);
                        for skipped in &asset.skipped {
                            eprintln!("Skipped: {}", skipped);
                        }
                        println!();
                    }
                    for failure in &report.failures {
                        eprintln!("Failed: {}", failure);
                    }
                    println!(
                        "Indexed {} tables ({} facts), {} failed",
                        report.asset_count(),
                        report.fact_count(),
                        report.failures.len()
                    );
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }

        Command::Resolve {
            type_name,
            imports,
            package,
        } => {
            println!("{}", resolve_type_name(&type_name, &imports, &package));
        }
    }

    Ok(())
}

fn print_facts(facts: &HashSet<Fact>) {
    let mut sorted: Vec<_> = facts.iter().collect();
    sorted.sort();
    for fact in sorted {
        println!("  {}", fact);
    }
}
