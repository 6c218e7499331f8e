//! # Knowledge Garden CLI (`kg`)
//!
//! The `kg` binary loads an exported chat history and searches it. Every
//! command takes the export file as its first argument; nothing is persisted
//! between runs.
//!
//! ## Usage
//!
//! ```bash
//! kg [--config ./config/kg.toml] [--verbose] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kg load <file>` | Normalize an export and report what was found |
//! | `kg search <file> "<query>"` | Keyword search with optional filters |
//! | `kg stats <file>` | Message, conversation and speaker counts |
//! | `kg recent <file>` | Conversation summaries, newest first |
//! | `kg shell <file>` | Live search: one query per stdin line, debounced |
//! | `kg formats` | List supported export formats |
//! | `kg completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # Everything the assistant said about lifetimes in March
//! kg search conversations.json lifetimes --speaker assistant \
//!     --since 2024-03-01 --until 2024-03-31
//!
//! # HTML fragment with highlighted matches
//! kg search conversations.json "borrow checker" --format html > results.html
//!
//! # Interactive
//! kg shell conversations.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use knowledge_garden::config::{self, Config, OutputFormat};
use knowledge_garden::debounce::Debouncer;
use knowledge_garden::render;
use knowledge_garden::search::SearchFilter;
use knowledge_garden::session::{LoadSummary, Session};
use knowledge_garden::stats;
use knowledge_garden::summary;
use knowledge_garden::traits::{InputShape, NormalizerRegistry};

/// Knowledge Garden CLI: keyword search over exported AI chat histories.
///
/// `--config` is optional; without it the built-in defaults apply. See
/// `config/kg.example.toml` for every setting.
#[derive(Parser)]
#[command(
    name = "kg",
    about = "Knowledge Garden: keyword search over exported AI chat histories",
    version,
    long_about = "Knowledge Garden normalizes an exported chat history (conversations.json \
    and its older variants) into a flat list of messages and runs case-insensitive, \
    all-terms-must-match keyword searches over it."
)]
struct Cli {
    /// Path to a configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize an export file and report counts.
    ///
    /// Prints how many messages and conversations were found, how many raw
    /// messages were skipped, and which top-level layout the file had.
    Load {
        /// Export file (`.json`).
        file: PathBuf,

        /// Output format: `text` or `json` (`html` prints text).
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Search the messages of an export file.
    ///
    /// A message matches when its text contains every whitespace-separated
    /// term of the query, case-insensitively. Results keep export order.
    Search {
        /// Export file (`.json`).
        file: PathBuf,

        /// Search terms.
        query: String,

        /// Only messages from this speaker (`user`, `assistant`, `system`, `unknown`).
        #[arg(long)]
        speaker: Option<String>,

        /// Only messages on or after this date (YYYY-MM-DD, UTC).
        #[arg(long)]
        since: Option<String>,

        /// Only messages on or before this date (YYYY-MM-DD, UTC).
        #[arg(long)]
        until: Option<String>,

        /// Maximum number of results (overrides `[search].max_results`).
        #[arg(long)]
        limit: Option<usize>,

        /// Output format (overrides `[display].format`).
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show corpus statistics.
    Stats {
        /// Export file (`.json`).
        file: PathBuf,

        /// Output format: `text` or `json` (`html` prints text).
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// List conversations, newest first, with first-message previews.
    Recent {
        /// Export file (`.json`).
        file: PathBuf,

        /// Number of conversations to show (overrides `[summary].limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Output format: `text` or `json` (`html` prints text).
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Live search: each stdin line is a new query.
    ///
    /// Queries are debounced by `[search].debounce_ms`; only the last line
    /// of a quick burst is searched. End of input runs the pending search.
    Shell {
        /// Export file (`.json`).
        file: PathBuf,

        /// Only messages from this speaker.
        #[arg(long)]
        speaker: Option<String>,

        /// Output format (overrides `[display].format`).
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// List supported export formats.
    Formats,

    /// Print shell completions (bash, zsh, fish, elvish, powershell).
    Completions {
        /// Target shell.
        shell: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("knowledge_garden=debug,kg=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("knowledge_garden=warn,kg=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't need config or an export
    match &cli.command {
        Commands::Formats => {
            list_formats(&NormalizerRegistry::with_defaults());
            return Ok(());
        }
        Commands::Completions { shell } => {
            return print_completions(shell);
        }
        _ => {}
    }

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    let registry = NormalizerRegistry::with_defaults();

    match cli.command {
        Commands::Load { file, format } => {
            let mut session = Session::new();
            let summary = load(&mut session, &registry, &file)?;
            match format.unwrap_or(OutputFormat::Text) {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary.report)?),
                _ => print!("{}", format_load_summary(&file, &summary)),
            }
        }
        Commands::Search {
            file,
            query,
            speaker,
            since,
            until,
            limit,
            format,
        } => {
            let filter = SearchFilter::from_args(
                speaker.as_deref(),
                since.as_deref(),
                until.as_deref(),
                limit.or(cfg.search.max_results),
            )?;
            let mut session = Session::new();
            load(&mut session, &registry, &file)?;
            let outcome = session.search(&query, &filter);
            let rendered = render::render_outcome(
                &outcome,
                format.unwrap_or(cfg.display.format),
                cfg.display.snippet_chars,
            )?;
            emit(&rendered)?;
        }
        Commands::Stats { file, format } => {
            let mut session = Session::new();
            load(&mut session, &registry, &file)?;
            let corpus_stats = session.stats();
            match format.unwrap_or(OutputFormat::Text) {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&corpus_stats)?),
                _ => print!("{}", stats::format_stats(&corpus_stats)),
            }
        }
        Commands::Recent {
            file,
            limit,
            format,
        } => {
            let mut session = Session::new();
            load(&mut session, &registry, &file)?;
            let limit = limit.unwrap_or(cfg.summary.limit);
            if limit == 0 {
                anyhow::bail!("--limit must be >= 1");
            }
            let mut summaries = summary::summarize(session.corpus(), cfg.summary.preview_chars);
            summaries.truncate(limit);
            match format.unwrap_or(OutputFormat::Text) {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
                _ => print!("{}", render::render_summaries_text(&summaries)),
            }
        }
        Commands::Shell {
            file,
            speaker,
            format,
        } => {
            let filter = SearchFilter::from_args(
                speaker.as_deref(),
                None,
                None,
                cfg.search.max_results,
            )?;
            run_shell(&cfg, &registry, &file, filter, format.unwrap_or(cfg.display.format))
                .await?;
        }
        Commands::Formats | Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn load(session: &mut Session, registry: &NormalizerRegistry, file: &Path) -> Result<LoadSummary> {
    session
        .load_path(registry, file)
        .with_context(|| format!("Failed to load {}", file.display()))
}

fn format_load_summary(file: &Path, summary: &LoadSummary) -> String {
    let mut out = format!(
        "Loaded {} messages from {} conversations ({})\n",
        summary.messages,
        summary.conversations,
        file.display()
    );
    out.push_str(&format!("  Normalizer:    {}\n", summary.normalizer));
    out.push_str(&format!("  Layout:        {}\n", summary.report.shape.describe()));
    out.push_str(&format!("  Raw messages:  {}\n", summary.report.raw_messages));
    out.push_str(&format!("  Skipped:       {}\n", summary.report.skipped));
    if summary.report.shape == InputShape::Unrecognized {
        out.push_str("Warning: no conversations list found; the file produced no messages.\n");
    }
    out
}

/// Print rendered output, ensuring a trailing newline.
fn emit(rendered: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    if !rendered.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    // A panic inside a search leaves the session itself intact.
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_shell(
    cfg: &Config,
    registry: &NormalizerRegistry,
    file: &Path,
    filter: SearchFilter,
    format: OutputFormat,
) -> Result<()> {
    let mut session = Session::new();
    let summary = load(&mut session, registry, file)?;
    eprintln!(
        "Loaded {} messages from {} conversations. One query per line; end input to finish.",
        summary.messages, summary.conversations
    );

    let session = Arc::new(Mutex::new(session));
    let mut debouncer = Debouncer::new(cfg.debounce_delay());
    let snippet_chars = cfg.display.snippet_chars;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let session = Arc::clone(&session);
        let filter = filter.clone();
        debouncer.schedule(move || {
            let mut session = lock(&session);
            let outcome = session.search(&line, &filter);
            match render::render_outcome(&outcome, format, snippet_chars) {
                Ok(rendered) => {
                    if let Err(e) = emit(&rendered) {
                        tracing::warn!(error = %e, "failed to write results");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to render results"),
            }
        });
    }
    debouncer.flush().await;

    eprintln!("{} searches run.", lock(&session).history().len());
    Ok(())
}

fn list_formats(registry: &NormalizerRegistry) {
    println!("{:<14} DESCRIPTION", "FORMAT");
    for normalizer in registry.list() {
        println!("{:<14} {}", normalizer.name(), normalizer.description());
    }
}

fn print_completions(shell: &str) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell};

    let parsed: Shell = shell.parse().map_err(|_| {
        anyhow::anyhow!("Unknown shell '{}'. Use: bash, zsh, fish, elvish, powershell", shell)
    })?;

    let mut cmd = Cli::command();
    generate(parsed, &mut cmd, "kg", &mut std::io::stdout());
    Ok(())
}
