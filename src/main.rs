//! CLI entry point for `mboxnav`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use mboxnav::config::Config;
use mboxnav::export::{eml, mbox as mbox_export};
use mboxnav::index::mailbox::DateDiagnostic;
use mboxnav::index::{build_index, sample_dates, IndexOptions, MailboxIndex, MailboxStats};
use mboxnav::session::{Page, Session};
use mboxnav::shell::{render_page, Shell};
use mboxnav::store::MboxStore;

#[derive(Parser)]
#[command(
    name = "mboxnav",
    version,
    about = "Index, browse, search and split mbox archives",
    long_about = "Index, browse, search and split mbox archives of any size.\n\n\
                  The file is scanned once into an in-memory index; browsing, \
                  searching and sorting never reload it."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// MBOX file to browse
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse a file interactively
    Browse { path: PathBuf },
    /// Show statistics
    Stats {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Search From and Subject (case-insensitive)
    Search {
        path: PathBuf,
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Write message N (file order) verbatim to a file or directory
    Export {
        path: PathBuf,
        index: usize,
        dest: PathBuf,
    },
    /// Copy every message dated in YEAR into a new mbox file
    Split {
        source: PathBuf,
        year: i32,
        #[arg(required_unless_present = "sample")]
        output: Option<PathBuf>,
        /// Print the raw and resolved date of every matched message
        #[arg(long)]
        debug: bool,
        /// Only resolve the dates of the first N messages; write nothing
        #[arg(long, value_name = "N")]
        sample: Option<usize>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mboxnav::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Browse { path }) => cmd_browse(&path, &config),
        Some(Commands::Stats { path, json }) => cmd_stats(&path, json, &config),
        Some(Commands::Search { path, query, json }) => cmd_search(&path, &query, json, &config),
        Some(Commands::Export { path, index, dest }) => cmd_export(&path, index, &dest, &config),
        Some(Commands::Split {
            source,
            year,
            output,
            debug,
            sample,
        }) => match sample {
            Some(n) => cmd_sample(&source, n, &config),
            None => match output {
                Some(output) => cmd_split(&source, year, &output, debug, &config),
                None => anyhow::bail!("an output file is required unless --sample is given"),
            },
        },
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => match cli.file {
            Some(path) => cmd_browse(&path, &config),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        },
    }
}

fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = mboxnav::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mboxnav.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxnav", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

/// Build the index behind an "Indexing" progress bar.
fn load_index(path: &Path, config: &Config) -> anyhow::Result<MailboxIndex> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let file_size = std::fs::metadata(path)?.len();
    let pb = ProgressBar::new(file_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Indexing [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let progress: &dyn Fn(u64, u64) = &|current, total| {
        pb.set_length(total);
        pb.set_position(current);
    };
    let index = build_index(path, &IndexOptions::from_config(config), Some(progress));
    pb.finish_and_clear();
    Ok(index?)
}

/// Start the interactive browser on stdin/stdout.
fn cmd_browse(path: &Path, config: &Config) -> anyhow::Result<()> {
    let index = load_index(path, config)?;
    let mut session = Session::new(index, config)?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut shell = Shell::new(&mut session, stdout.lock(), &config.browse);
    shell.run(stdin.lock())?;
    Ok(())
}

/// Show statistics for an MBOX file.
fn cmd_stats(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let start = Instant::now();
    let index = load_index(path, config)?;
    let elapsed = start.elapsed();
    let stats = MailboxStats::compute(&index);

    if json {
        print_stats_json(&index, &stats, elapsed)
    } else {
        print_stats_table(&index, &stats, elapsed);
        Ok(())
    }
}

fn print_stats_table(index: &MailboxIndex, stats: &MailboxStats, elapsed: std::time::Duration) {
    println!();
    println!("  {:<20} {}", "File:", index.path().display());
    println!("  {:<20} {}", "Size:", format_size(stats.file_size, BINARY));
    println!("  {:<20} {}", "Messages:", stats.total);
    if stats.preamble_bytes > 0 {
        println!("  {:<20} {} bytes", "Preamble:", stats.preamble_bytes);
    }
    if let (Some(min), Some(max)) = (stats.earliest, stats.latest) {
        println!(
            "  {:<20} {} to {}",
            "Date range:",
            min.format("%Y-%m-%d"),
            max.format("%Y-%m-%d")
        );
    }
    println!(
        "  {:<20} {} parsed, {} unparsed",
        "Dates:", stats.parsed_dates, stats.unparsed_dates
    );
    for (strategy, count) in &stats.by_strategy {
        println!("  {:<20} {count}", format!("  {strategy}"));
    }
    println!("  {:<20} {:.2?}", "Indexing time:", elapsed);

    if !stats.top_domains.is_empty() {
        println!();
        println!("  Top sender domains:");
        for (domain, count) in &stats.top_domains {
            println!("    @{domain}: {count} messages");
        }
    }
    println!();
}

fn print_stats_json(
    index: &MailboxIndex,
    stats: &MailboxStats,
    elapsed: std::time::Duration,
) -> anyhow::Result<()> {
    let date_range = stats
        .earliest
        .zip(stats.latest)
        .map(|(min, max)| {
            serde_json::json!({
                "oldest": min.to_string(),
                "newest": max.to_string(),
            })
        });
    let strategies: serde_json::Map<String, serde_json::Value> = stats
        .by_strategy
        .iter()
        .map(|(strategy, count)| (strategy.name().to_string(), serde_json::json!(count)))
        .collect();
    let domains: Vec<serde_json::Value> = stats
        .top_domains
        .iter()
        .map(|(domain, count)| serde_json::json!({ "domain": domain, "count": count }))
        .collect();

    let value = serde_json::json!({
        "file": index.path().to_string_lossy(),
        "file_size": stats.file_size,
        "preamble_bytes": stats.preamble_bytes,
        "message_count": stats.total,
        "parsed_dates": stats.parsed_dates,
        "unparsed_dates": stats.unparsed_dates,
        "date_range": date_range,
        "strategies": strategies,
        "top_domains": domains,
        "indexing_time_ms": elapsed.as_millis(),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Search From and Subject and print the matches.
fn cmd_search(path: &Path, query: &str, json: bool, config: &Config) -> anyhow::Result<()> {
    let index = load_index(path, config)?;
    let mut session = Session::new(index, config)?;
    let outcome = session.search(query)?;

    if json {
        let results: Vec<serde_json::Value> = outcome
            .matches
            .iter()
            .filter_map(|&i| session.index().records().get(i))
            .map(|record| {
                serde_json::json!({
                    "index": record.index,
                    "offset": record.offset,
                    "length": record.length,
                    "date": record.date.date().map(|d| d.to_string()),
                    "from": record.from(),
                    "subject": record.subject(),
                })
            })
            .collect();
        let value = serde_json::json!({
            "query": outcome.query,
            "total": outcome.total(),
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!();
    if outcome.is_truncated() {
        println!(
            "  Found {} matches (showing first {})",
            outcome.total(),
            outcome.displayed().len()
        );
    } else {
        println!("  Found {} matches", outcome.total());
    }
    if outcome.total() == 0 {
        return Ok(());
    }
    let page = Page {
        start: 0,
        indices: outcome.displayed().to_vec(),
        view_len: outcome.total(),
    };
    print!(
        "{}",
        render_page(
            &session,
            &page,
            config.browse.from_width,
            config.browse.subject_width
        )
    );
    Ok(())
}

/// Export one message, addressed by its position in the file.
fn cmd_export(path: &Path, ordinal: usize, dest: &Path, config: &Config) -> anyhow::Result<()> {
    let index = load_index(path, config)?;
    let record = index.get(ordinal)?;
    let mut store = MboxStore::open(path)?;
    let written = eml::export_eml(&mut store, record, dest)?;
    println!("Saved → {}", written.display());
    Ok(())
}

/// Extract every message dated in `year`.
fn cmd_split(
    source: &Path,
    year: i32,
    output: &Path,
    debug: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let index = load_index(source, config)?;
    let start = Instant::now();
    let report = mbox_export::extract_year(&index, year, output, debug)?;

    if debug {
        for diag in &report.diagnostics {
            print_diagnostic(diag);
        }
        println!();
    }

    println!(
        "Extracted {} of {} messages from {} to {} ({}, {:.2?})",
        report.matched,
        report.scanned,
        report.year,
        report.output.display(),
        format_size(report.bytes_written, BINARY),
        start.elapsed()
    );
    if report.unparsed > 0 {
        println!(
            "{} message(s) skipped: date could not be determined",
            report.unparsed
        );
    }
    Ok(())
}

/// Print how the dates of the first `n` messages resolve.
fn cmd_sample(source: &Path, n: usize, config: &Config) -> anyhow::Result<()> {
    let diagnostics = sample_dates(source, &IndexOptions::from_config(config), n)?;
    for diag in &diagnostics {
        print_diagnostic(diag);
    }
    let unparsed = diagnostics.iter().filter(|d| d.date.is_none()).count();
    println!();
    println!(
        "Sampled {} message(s): {} parsed, {} unparsed",
        diagnostics.len(),
        diagnostics.len() - unparsed,
        unparsed
    );
    Ok(())
}

fn print_diagnostic(diag: &DateDiagnostic) {
    let resolved = diag
        .date
        .map_or_else(|| "-".to_string(), |d| d.to_string());
    println!(
        "{:>6}  {:<16} {:<32} {}",
        diag.index,
        diag.strategy_name(),
        resolved,
        diag.raw.as_deref().unwrap_or("(no Date header)")
    );
}
