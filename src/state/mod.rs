//! State management module for Catalog-Harvest
//!
//! This module contains the run-scoped state shared by the walker and the
//! pipeline: the dedup ledger deciding whether an item is processed.

mod ledger;

pub use ledger::{DedupLedger, LedgerError};
