//! Mining engine for the ledger
//!
//! Builds a block from a coinbase plus the given transactions, finds a valid
//! nonce and appends it to the chain.

use crate::core::{Block, Blockchain, BlockchainError, Transaction, TransactionError};
use log::info;
use std::time::Instant;
use thiserror::Error;

/// Mining errors
#[derive(Error, Debug)]
pub enum MiningError {
    #[error("Coinbase error: {0}")]
    Coinbase(#[from] TransactionError),
    #[error("Chain rejected block: {0}")]
    Chain(#[from] BlockchainError),
}

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
}

/// Miner for creating new blocks
pub struct Miner {
    /// Address receiving the coinbase reward
    pub address: String,
    pub difficulty: u32,
}

impl Miner {
    pub fn new(address: &str, difficulty: u32) -> Self {
        Self {
            address: address.to_string(),
            difficulty,
        }
    }

    /// Mine a new block with the given transactions on top of `chain`
    pub fn mine_block(
        &self,
        chain: &mut Blockchain,
        transactions: Vec<Transaction>,
    ) -> Result<(Block, MiningStats), MiningError> {
        let start = Instant::now();

        let coinbase = Transaction::coinbase(&self.address, "")?;
        let mut all_transactions = vec![coinbase];
        all_transactions.extend(transactions);

        let height = chain.height() + 1;
        info!(
            "Mining block {} with difficulty {}...",
            height, self.difficulty
        );

        let block = Block::new(
            all_transactions,
            chain.tip().hash.clone(),
            height,
            self.difficulty,
        );

        let elapsed = start.elapsed().as_millis();
        let attempts = block.nonce + 1;
        let hash_rate = if elapsed > 0 {
            (attempts as f64) / (elapsed as f64 / 1000.0)
        } else {
            attempts as f64
        };

        info!(
            "Block {} mined in {}ms ({} attempts, {:.2} H/s)",
            block.height, elapsed, attempts, hash_rate
        );

        chain.append(block.clone())?;

        Ok((
            block,
            MiningStats {
                hash_attempts: attempts,
                time_ms: elapsed,
                hash_rate,
            },
        ))
    }
}
