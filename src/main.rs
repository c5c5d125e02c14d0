use anyhow::{bail, Context, Result};
use bib_master::bibtex::{parse_records, render_collection, RecordStream};
use bib_master::config::{load_config, Config};
use bib_master::models::{Record, SearchResult, SourceTag};
use bib_master::sources::SourceRegistry;
use bib_master::utils::{
    assign_missing_keys, consolidate, deduplicate_records, find_duplicates, CacheService,
    DuplicateStrategy,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// bib-master - Collect, deduplicate and export BibTeX records
#[derive(Parser, Debug)]
#[command(name = "bib-master")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "hongkongkiwi")]
#[command(about = "Collect, deduplicate and export BibTeX records", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Bibtex)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for records
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// BibTeX entries
    Bibtex,
    /// JSON (machine-readable)
    Json,
    /// Table (human-readable)
    Table,
}

/// Which member of a duplicate group to keep
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
    First,
    Last,
    /// Keep everything and list the duplicate groups on stderr
    Mark,
}

impl From<Strategy> for DuplicateStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::First => DuplicateStrategy::First,
            Strategy::Last => DuplicateStrategy::Last,
            Strategy::Mark => DuplicateStrategy::Mark,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search all configured sources and print the merged results
    #[command(alias = "s")]
    Search {
        /// Search terms
        #[arg(required = true)]
        terms: Vec<String>,

        /// BibTeX file to search locally (overrides the configuration)
        #[arg(long, short)]
        local: Option<PathBuf>,

        /// Query DBLP directly, bypassing the search cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Parse a BibTeX file and print it in canonical form
    #[command(alias = "fmt")]
    Format {
        file: PathBuf,

        /// Rewrite the file instead of printing
        #[arg(long, short)]
        write: bool,
    },

    /// Report records missing fields required by their entry type
    Check { file: PathBuf },

    /// Print citation keys, generating them for unkeyed records
    Keys { file: PathBuf },

    /// Remove duplicate records from a BibTeX file
    Dedup {
        file: PathBuf,

        #[arg(long, short, value_enum, default_value_t = Strategy::First)]
        strategy: Strategy,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Manage the DBLP search cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show cache status and statistics
    Status,

    /// Remove every cached search
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error".to_string(),
        (false, 0) => config.logging.level.clone(),
        (false, 1) => "debug".to_string(),
        (false, _) => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("bib_master={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Search {
            terms,
            local,
            no_cache,
        } => {
            if local.is_some() {
                config.local.bib_file = local;
            }
            if no_cache {
                config.cache.enabled = false;
            }
            let results = search(&config, &terms).await;
            print_results(&results, cli.output)?;
        }
        Commands::Format { file, write } => {
            if write {
                let count = rewrite_file(&file)?;
                tracing::info!("Formatted {} records in {}", count, file.display());
            } else {
                print_records(&read_records(&file)?, cli.output)?;
            }
        }
        Commands::Check { file } => {
            let records = read_records(&file)?;
            let mut invalid = 0;
            for record in &records {
                let missing = record.missing_requirements();
                if !missing.is_empty() {
                    invalid += 1;
                    let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
                    println!(
                        "{} ({}): missing {}",
                        record.effective_key(),
                        record.effective_category(),
                        names.join(", ")
                    );
                }
            }
            if invalid > 0 {
                bail!("{} of {} records are incomplete", invalid, records.len());
            }
            println!("All {} records are complete", records.len());
        }
        Commands::Keys { file } => {
            let mut results = as_local_results(read_records(&file)?);
            assign_missing_keys(&mut results);
            for result in &results {
                println!("{}", result.record.effective_key());
            }
        }
        Commands::Dedup { file, strategy } => {
            let records = read_records(&file)?;
            for group in find_duplicates(&records) {
                let keys: Vec<String> = group.iter().map(|&i| records[i].effective_key()).collect();
                eprintln!("Duplicates: {}", keys.join(", "));
            }
            let records = deduplicate_records(records, strategy.into());
            print_records(&records, cli.output)?;
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
        Commands::Cache { command } => {
            let cache = CacheService::from_config(config.cache.clone());
            cache.initialize()?;

            match command {
                CacheCommands::Status => {
                    let stats = cache.stats();
                    if !stats.enabled {
                        println!("Cache: disabled");
                        println!("To enable, set BIB_MASTER_CACHE__ENABLED=true");
                    } else {
                        println!("Cache: enabled");
                        println!("Directory: {}", stats.cache_dir.display());
                        println!(
                            "Search cache: {} items ({} KB)",
                            stats.search_count, stats.size_kb
                        );
                        println!("Search TTL: {} seconds", stats.ttl.as_secs());
                    }
                }
                CacheCommands::Clear => {
                    cache.clear_all()?;
                    if !cli.quiet {
                        eprintln!("Cleared {}", cache.cache_dir().display());
                    }
                }
            }
        }
    }

    Ok(())
}

/// Query every configured source, merge the results and key them
async fn search(config: &Config, terms: &[String]) -> Vec<SearchResult> {
    let registry = SourceRegistry::from_config(config);
    tracing::debug!("Searching {} sources: {:?}", registry.len(), registry.tags());

    let timeout = Duration::from_secs(config.search.timeout_secs);
    let by_source = registry.search_all(terms, timeout).await;
    for (tag, results) in &by_source {
        tracing::debug!("{}: {} results", tag, results.len());
    }

    let mut results = consolidate(&by_source, &config.search.priority);
    assign_missing_keys(&mut results);
    results
}

/// Parse a BibTeX file, logging malformed entries
fn read_records(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path.display().to_string();
    Ok(parse_records(&content, |message: &str| {
        tracing::warn!("{}: {}", name, message);
    }))
}

/// Rewrite a BibTeX file in canonical form, returning the record count
///
/// Refuses to touch the file when the rewrite would lose text: entries that
/// fail to parse and `@string`, `@preamble` or `@comment` blocks.
fn rewrite_file(path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut problems: Vec<String> = Vec::new();
    let mut stream = RecordStream::new(&content, |message: &str| {
        problems.push(message.to_string());
    });
    let records: Vec<Record> = stream.by_ref().collect();
    let auxiliary = stream.auxiliary_blocks();
    drop(stream);

    if !problems.is_empty() {
        bail!(
            "Not rewriting {}: {} entries could not be parsed ({})",
            path.display(),
            problems.len(),
            problems.join("; ")
        );
    }
    if auxiliary > 0 {
        bail!(
            "Not rewriting {}: {} @string, @preamble or @comment blocks would be lost",
            path.display(),
            auxiliary
        );
    }

    std::fs::write(path, render_collection(&records) + "\n")
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(records.len())
}

fn as_local_results(records: Vec<Record>) -> Vec<SearchResult> {
    records
        .into_iter()
        .map(|record| SearchResult::new(record, SourceTag::Local, 1.0))
        .collect()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn print_records(records: &[Record], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Bibtex => println!("{}", render_collection(records)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Key", "Type", "Title", "Authors", "Year"]);

            for record in records {
                table.add_row(vec![
                    Cell::new(record.effective_key()).add_attribute(Attribute::Bold),
                    Cell::new(record.effective_category().to_string()),
                    Cell::new(truncate(record.title().unwrap_or_default(), 50)),
                    Cell::new(truncate(&record.authors().join(", "), 30)),
                    Cell::new(record.year().unwrap_or_default()),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn print_results(results: &[SearchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Bibtex => {
            println!("{}", render_collection(results.iter().map(|r| &r.record)));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(results)?),
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["", "Key", "Title", "Authors", "Year", "Sources", "Score"]);

            for result in results {
                let record = &result.record;
                // local entries are already in the user's file
                let marker = if result.has_source(&SourceTag::Local) { "*" } else { "" };
                table.add_row(vec![
                    Cell::new(marker),
                    Cell::new(record.effective_key()).add_attribute(Attribute::Bold),
                    Cell::new(truncate(record.title().unwrap_or_default(), 50)),
                    Cell::new(truncate(&record.authors().join(", "), 30)),
                    Cell::new(record.year().unwrap_or_default()),
                    Cell::new(result.source_list()),
                    Cell::new(format!("{:.2}", result.score)),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
