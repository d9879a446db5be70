pub mod config;
pub mod cycle;
pub mod daemon_lock;
pub mod extract;
pub mod fsops;
pub mod importer_map;
pub mod ingest;
pub mod keys;
pub mod ledger;
pub mod paths;
pub mod promote;
pub mod reconcile;
pub mod report;
pub mod state;
pub mod transactions;
pub mod undo;
pub mod watcher;
