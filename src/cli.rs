use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::commands::history::{HistoryFilter, HistoryOptions};
use crate::commands::logs::{DEFAULT_LIMIT, LogsOptions};
use crate::commands::watch::WatchOptions;
use crate::tier::ledger::LedgerKind;
use crate::tier::state::WatcherKind;

#[derive(Debug, Parser)]
#[command(
    name = "tiersync",
    version,
    about = "Files uploaded documents into job folders and promotes finished jobs across storage tiers"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the watchers (daemon by default).
    Watch(WatchArgs),
    /// Stop a running watcher daemon.
    Stop,
    /// Show paths, configuration and watcher counters.
    Status,
    /// Move promoted job folders back to where they came from.
    Revert {
        #[arg(required = true)]
        jobs: Vec<String>,
    },
    /// Show ledger rows, newest first.
    Logs(LogsArgs),
    /// List promotions with their current revert state.
    History {
        #[arg(long, value_enum, default_value_t = HistoryFilter::All)]
        filter: HistoryFilter,
        #[arg(long)]
        search: Option<String>,
    },
    /// Delete Transaction Log rows for the given jobs without moving folders.
    Forget {
        #[arg(required = true)]
        jobs: Vec<String>,
    },
    /// Summarise the promotion ledger.
    Report {
        /// Write the text report to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct WatchArgs {
    /// Run a single cycle of each selected watcher and exit.
    #[arg(long)]
    once: bool,

    /// Limit to these watchers (ingest, promote, reconcile).
    #[arg(long, value_parser = parse_watcher, num_args = 1..)]
    only: Vec<WatcherKind>,
}

#[derive(Debug, Args)]
struct LogsArgs {
    /// ingest, promote, reconcile, transactions or reverts.
    #[arg(value_parser = parse_ledger)]
    ledger: LedgerKind,

    #[arg(long)]
    search: Option<String>,

    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,
}

fn parse_watcher(raw: &str) -> Result<WatcherKind, String> {
    WatcherKind::parse(raw).ok_or_else(|| format!("unknown watcher `{raw}`"))
}

fn parse_ledger(raw: &str) -> Result<LedgerKind, String> {
    LedgerKind::parse(raw).ok_or_else(|| format!("unknown ledger `{raw}`"))
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for line in &report.details {
        println!("{line}");
    }
    for issue in &report.issues {
        eprintln!("issue: {issue}");
    }
    Ok(())
}

/// Parse arguments, run the command and print its report. Returns whether
/// the command reported success.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    let report = match &cli.command {
        Command::Watch(args) => commands::watch::run(&WatchOptions {
            once: args.once,
            only: args.only.clone(),
        })?,
        Command::Stop => commands::stop::run()?,
        Command::Status => commands::status::run()?,
        Command::Revert { jobs } => commands::revert::run(jobs)?,
        Command::Logs(args) => commands::logs::run(&LogsOptions {
            ledger: args.ledger,
            search: args.search.clone(),
            limit: args.limit,
        })?,
        Command::History { filter, search } => commands::history::run(&HistoryOptions {
            filter: *filter,
            search: search.clone(),
        })?,
        Command::Forget { jobs } => commands::forget::run(jobs)?,
        Command::Report { out } => commands::report::run(out.as_ref())?,
    };
    print_report(&report, cli.json)?;
    Ok(report.ok)
}
