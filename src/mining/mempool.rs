//! Pending transaction queue
//!
//! Transfers submitted without immediate mining wait here until the next
//! mined block. Outputs spent by a queued transaction are reserved so later
//! transfers do not try to spend them again.

use crate::core::{OutPoint, Transaction, TransactionError};
use crate::storage::UtxoSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

// =============================================================================
// Configuration
// =============================================================================

/// Maximum number of queued transactions
pub const DEFAULT_MEMPOOL_SIZE: usize = 10_000;

// =============================================================================
// Error Types
// =============================================================================

/// Mempool errors
#[derive(Error, Debug)]
pub enum MempoolError {
    #[error("Transaction already exists")]
    DuplicateTransaction,
    #[error("Output {0} is already spent by a queued transaction")]
    DoubleSpend(OutPoint),
    #[error("Transaction validation error: {0}")]
    ValidationError(#[from] TransactionError),
    #[error("Mempool full")]
    MempoolFull,
}

// =============================================================================
// Mempool
// =============================================================================

/// Queued transactions in arrival order
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Outputs already claimed by queued transactions
    pub fn reserved(&self) -> HashSet<OutPoint> {
        self.transactions
            .iter()
            .flat_map(|tx| tx.inputs.iter().map(|input| input.outpoint()))
            .collect()
    }

    /// Queue a transaction after checking it against the index
    pub fn add(&mut self, tx: Transaction, index: &UtxoSet) -> Result<(), MempoolError> {
        if self.transactions.len() >= DEFAULT_MEMPOOL_SIZE {
            return Err(MempoolError::MempoolFull);
        }
        if self.transactions.iter().any(|queued| queued.id == tx.id) {
            return Err(MempoolError::DuplicateTransaction);
        }

        let reserved = self.reserved();
        if let Some(input) = tx.inputs.iter().find(|i| reserved.contains(&i.outpoint())) {
            return Err(MempoolError::DoubleSpend(input.outpoint()));
        }

        tx.verify(|op| index.find(op).cloned())?;
        self.transactions.push(tx);
        Ok(())
    }

    /// Keep only the transactions still valid against `index`, returning how
    /// many were dropped
    pub fn retain_valid(&mut self, index: &UtxoSet) -> usize {
        let before = self.transactions.len();
        self.transactions = self.drain_valid(index);
        before - self.transactions.len()
    }

    /// Empty the queue, returning the transactions still valid against `index`
    ///
    /// Transactions whose inputs vanished from the index or conflict with an
    /// earlier queued transaction are dropped.
    pub fn drain_valid(&mut self, index: &UtxoSet) -> Vec<Transaction> {
        let mut claimed: HashSet<OutPoint> = HashSet::new();
        let mut valid = Vec::new();

        for tx in self.transactions.drain(..) {
            let conflicts = tx.inputs.iter().any(|i| claimed.contains(&i.outpoint()));
            if conflicts {
                log::warn!("Dropping queued transaction {}: conflicting inputs", tx.id);
                continue;
            }
            if let Err(e) = tx.verify(|op| index.find(op).cloned()) {
                log::warn!("Dropping queued transaction {}: {}", tx.id, e);
                continue;
            }

            claimed.extend(tx.inputs.iter().map(|i| i.outpoint()));
            valid.push(tx);
        }

        valid
    }
}
