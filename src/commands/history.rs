use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use crate::commands::CommandReport;
use crate::tier::ledger::row_matches;
use crate::tier::paths::resolve_paths;
use crate::tier::transactions::{MoveTransaction, TransactionState, read_transactions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum HistoryFilter {
    #[default]
    All,
    Pending,
    Reverted,
}

impl HistoryFilter {
    fn accepts(self, state: TransactionState) -> bool {
        match self {
            Self::All => true,
            Self::Pending => state == TransactionState::Pending,
            Self::Reverted => state == TransactionState::Reverted,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    pub filter: HistoryFilter,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct HistoryEntry<'a> {
    #[serde(flatten)]
    transaction: &'a MoveTransaction,
    state: TransactionState,
}

pub fn run(opts: &HistoryOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("history");

    let txs = match read_transactions(&paths) {
        Ok(txs) => txs,
        Err(err) => {
            report.issue(format!("{err:#}"));
            return Ok(report);
        }
    };

    let mut entries = Vec::new();
    for tx in txs.iter().rev() {
        let state = tx.state();
        if !opts.filter.accepts(state) {
            continue;
        }
        if let Some(needle) = &opts.search {
            let row = [
                tx.job_key.clone(),
                tx.original_path.display().to_string(),
                tx.moved_path.display().to_string(),
                tx.timestamp.clone(),
            ];
            if !row_matches(&row, needle) {
                continue;
            }
        }
        report.detail(format!(
            "[{}] {} {} | {} -> {}",
            state.as_str(),
            tx.timestamp,
            tx.job_key,
            tx.original_path.display(),
            tx.moved_path.display()
        ));
        entries.push(HistoryEntry {
            transaction: tx,
            state,
        });
    }

    report.detail(format!("{} transaction(s) listed", entries.len()));
    report.attach(&entries);
    Ok(report)
}
