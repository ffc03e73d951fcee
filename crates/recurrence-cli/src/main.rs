//! `recur` CLI -- compute, preview, advance and encode task recurrence rules.
//!
//! ## Usage
//!
//! ```sh
//! # Next occurrence strictly after a date (state document on stdin)
//! recur next --after 2024-03-15 -i state.json
//!
//! # The next 5 due dates of a task
//! recur preview --count 5 -i state.json
//!
//! # Complete the current occurrence and print the advanced state
//! recur advance --date 2024-03-15 --by alice -i state.json -o state.next.json
//!
//! # Rule document to provider RRULE line and back
//! recur encode -i rule.json
//! echo 'RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;COUNT=10' | recur decode
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use recurrence_engine::{codec, RecurrenceRule, RecurrenceState};
use std::io::{self, Read};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recur", version, about = "Household task recurrence engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the next occurrence of a recurrence state after a date
    Next {
        /// Reference date (YYYY-MM-DD)
        #[arg(long)]
        after: NaiveDate,
        /// Accept an occurrence falling on the reference date itself
        #[arg(long)]
        inclusive: bool,
        /// Input state file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List upcoming due dates of a recurrence state
    Preview {
        /// Number of dates to list
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
        /// Input state file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Record a completed occurrence and print the advanced state
    Advance {
        /// Completed occurrence date (defaults to the current due date)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Who completed the occurrence
        #[arg(long)]
        by: String,
        /// Input state file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Encode a rule document as a provider RRULE line
    Encode {
        /// Input rule file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Decode a provider RRULE line into a rule document
    Decode {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Next {
            after,
            inclusive,
            input,
            output,
        } => {
            let state = read_state(input.as_deref())?;
            let next = recurrence_engine::next_occurrence(&state, after, inclusive);
            let line = next.map_or_else(|| "none".to_string(), |d| d.to_string());
            write_output(output.as_deref(), &format!("{line}\n"))?;
        }
        Commands::Preview {
            count,
            input,
            output,
        } => {
            let state = read_state(input.as_deref())?;
            let mut listing = String::new();
            for date in recurrence_engine::upcoming(&state).take(count) {
                listing.push_str(&date.to_string());
                listing.push('\n');
            }
            write_output(output.as_deref(), &listing)?;
        }
        Commands::Advance {
            date,
            by,
            input,
            output,
        } => {
            let state = read_state(input.as_deref())?;
            let occurrence = match date {
                Some(date) => date,
                None => state
                    .next_due()
                    .context("Recurrence has ended; pass --date to record a completion")?,
            };
            let step = recurrence_engine::advance(&state, occurrence, &by);
            debug!(next_due = ?step.next_due, terminal = step.is_terminal(), "advanced");
            let pretty = serde_json::to_string_pretty(&step)?;
            write_output(output.as_deref(), &format!("{pretty}\n"))?;
        }
        Commands::Encode { input, output } => {
            let json = read_input(input.as_deref())?;
            let rule: RecurrenceRule =
                serde_json::from_str(&json).context("Failed to parse rule document")?;
            let lines = codec::encode(&rule).context("Failed to encode rule")?;
            write_output(output.as_deref(), &format!("{}\n", lines.join("\n")))?;
        }
        Commands::Decode { input, output } => {
            let text = read_input(input.as_deref())?;
            let lines: Vec<&str> = text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            let rule = codec::decode(&lines).context("Failed to decode RRULE")?;
            let pretty = serde_json::to_string_pretty(&rule)?;
            write_output(output.as_deref(), &format!("{pretty}\n"))?;
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_state(path: Option<&str>) -> Result<RecurrenceState> {
    let json = read_input(path)?;
    serde_json::from_str(&json).context("Failed to parse recurrence state document")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
