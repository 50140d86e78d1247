//! Block implementation for the ledger
//!
//! A block links to its parent through `prev_hash`. The genesis block is the
//! only block with an empty `prev_hash`.

use crate::core::transaction::Transaction;
use crate::crypto::{double_sha256, meets_difficulty, sha256_hex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A block in the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub timestamp: DateTime<Utc>,
    /// Hex block hash
    pub hash: String,
    pub transactions: Vec<Transaction>,
    /// Hex hash of the parent block, empty for genesis
    pub prev_hash: String,
    pub nonce: u64,
    pub height: u64,
    /// Required leading zero bits of `hash`
    pub difficulty: u32,
}

impl Block {
    /// Create and mine a new block
    pub fn new(
        transactions: Vec<Transaction>,
        prev_hash: String,
        height: u64,
        difficulty: u32,
    ) -> Self {
        let mut block = Self {
            timestamp: Utc::now(),
            hash: String::new(),
            transactions,
            prev_hash,
            nonce: 0,
            height,
            difficulty,
        };
        block.mine();
        block
    }

    /// Create the genesis block around its coinbase
    pub fn genesis(coinbase: Transaction, difficulty: u32) -> Self {
        Self::new(vec![coinbase], String::new(), 0, difficulty)
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    /// Hash over the transaction IDs in block order
    pub fn hash_transactions(&self) -> String {
        let ids: Vec<&str> = self.transactions.iter().map(|tx| tx.id.as_str()).collect();
        sha256_hex(ids.concat().as_bytes())
    }

    fn header_hash(&self, nonce: u64) -> Vec<u8> {
        let data = format!(
            "{}{}{}{}{}{}",
            self.prev_hash,
            self.hash_transactions(),
            self.timestamp.timestamp(),
            self.difficulty,
            self.height,
            nonce
        );
        double_sha256(data.as_bytes())
    }

    /// Find a nonce whose header hash meets the difficulty, returns attempts
    pub fn mine(&mut self) -> u64 {
        let mut nonce = 0u64;

        loop {
            let hash = self.header_hash(nonce);
            if meets_difficulty(&hash, self.difficulty) || nonce == u64::MAX {
                self.nonce = nonce;
                self.hash = hex::encode(hash);
                return nonce + 1;
            }
            nonce += 1;
        }
    }

    /// Check the cached hash and its proof of work
    pub fn is_valid_pow(&self) -> bool {
        let hash = self.header_hash(self.nonce);
        hex::encode(&hash) == self.hash && meets_difficulty(&hash, self.difficulty)
    }
}
