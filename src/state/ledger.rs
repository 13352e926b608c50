use std::collections::HashSet;
use thiserror::Error;

/// Errors raised by misuse of the ledger
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("prior identifiers were already loaded")]
    PriorAlreadyLoaded,

    #[error("prior identifiers must be loaded before any item is marked ({marked} marked)")]
    LoadAfterMark { marked: usize },
}

/// Tracks which item identifiers have already been processed
///
/// Membership is split in two partitions:
/// - identifiers persisted by earlier runs, loaded once through
///   [`DedupLedger::load_prior`] and never touched again
/// - identifiers marked during this run, which start empty
///
/// An item is considered seen when it is in either partition. There is no
/// removal operation, so membership only ever grows.
#[derive(Debug, Clone, Default)]
pub struct DedupLedger {
    prior: HashSet<String>,
    this_run: HashSet<String>,
    prior_loaded: bool,
}

impl DedupLedger {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the identifier was processed in this or a prior run
    pub fn seen(&self, id: &str) -> bool {
        self.this_run.contains(id) || self.prior.contains(id)
    }

    /// Records that the identifier was processed in this run
    pub fn mark(&mut self, id: &str) {
        if !self.this_run.contains(id) {
            self.this_run.insert(id.to_string());
        }
    }

    /// Loads identifiers persisted by previous runs
    ///
    /// Must be called at most once and before any call to [`DedupLedger::mark`].
    pub fn load_prior<I, S>(&mut self, ids: I) -> Result<(), LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.prior_loaded {
            return Err(LedgerError::PriorAlreadyLoaded);
        }
        if !self.this_run.is_empty() {
            return Err(LedgerError::LoadAfterMark {
                marked: self.this_run.len(),
            });
        }

        self.prior = ids
            .into_iter()
            .map(|id| {
                let id: String = id.into();
                id.trim().to_string()
            })
            .filter(|id| !id.is_empty())
            .collect();
        self.prior_loaded = true;
        Ok(())
    }

    /// Number of identifiers loaded from prior runs
    pub fn prior_count(&self) -> usize {
        self.prior.len()
    }

    /// Number of identifiers marked during this run
    pub fn marked_this_run(&self) -> usize {
        self.this_run.len()
    }

    /// Total number of distinct identifiers known to the ledger
    pub fn len(&self) -> usize {
        self.prior.union(&self.this_run).count()
    }

    /// Returns true if no identifier is known
    pub fn is_empty(&self) -> bool {
        self.prior.is_empty() && self.this_run.is_empty()
    }
}
