//! Spendable-output index
//!
//! Maps transaction IDs to the outputs of that transaction that are still
//! unspent. Rebuilt in full from a chain, or advanced one mined block at a
//! time.

use crate::core::{Block, Blockchain, OutPoint, TxOutput};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One unspent output and its position in the owning transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnspentOutput {
    pub index: u32,
    pub output: TxOutput,
}

/// The spendable-output index of one ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UtxoSet {
    outputs: BTreeMap<String, Vec<UnspentOutput>>,
}

impl UtxoSet {
    /// Build the index from scratch by walking the chain newest-first
    pub fn rebuild(chain: &Blockchain) -> Self {
        let mut spent: HashSet<OutPoint> = HashSet::new();
        let mut outputs = BTreeMap::new();

        for block in chain.iter() {
            // Later transactions in a block may spend earlier ones
            for tx in block.transactions.iter().rev() {
                let unspent: Vec<UnspentOutput> = tx
                    .outputs
                    .iter()
                    .enumerate()
                    .map(|(i, output)| UnspentOutput {
                        index: i as u32,
                        output: output.clone(),
                    })
                    .filter(|u| !spent.contains(&OutPoint::new(&tx.id, u.index)))
                    .collect();

                if !unspent.is_empty() {
                    outputs.insert(tx.id.clone(), unspent);
                }

                if !tx.is_coinbase() {
                    spent.extend(tx.inputs.iter().map(|input| input.outpoint()));
                }
            }
        }

        Self { outputs }
    }

    /// Advance the index past a newly mined block
    pub fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            if !tx.is_coinbase() {
                for input in &tx.inputs {
                    if let Some(entry) = self.outputs.get_mut(&input.tx_id) {
                        entry.retain(|u| u.index != input.out);
                        if entry.is_empty() {
                            self.outputs.remove(&input.tx_id);
                        }
                    }
                }
            }

            let unspent = tx
                .outputs
                .iter()
                .enumerate()
                .map(|(i, output)| UnspentOutput {
                    index: i as u32,
                    output: output.clone(),
                })
                .collect();
            self.outputs.insert(tx.id.clone(), unspent);
        }
    }

    /// Number of transactions with at least one unspent output
    pub fn transaction_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn find(&self, outpoint: &OutPoint) -> Option<&TxOutput> {
        self.outputs
            .get(&outpoint.tx_id)?
            .iter()
            .find(|u| u.index == outpoint.index)
            .map(|u| &u.output)
    }

    /// Sum of unspent value locked to `pub_key_hash` (hex)
    pub fn balance(&self, pub_key_hash: &str) -> u64 {
        self.outputs
            .values()
            .flatten()
            .filter(|u| u.output.is_locked_with(pub_key_hash))
            .map(|u| u.output.value)
            .sum()
    }

    /// Pick outputs owned by `pub_key_hash` until `amount` is covered
    ///
    /// Outpoints in `reserved` are skipped. Returns the accumulated value and
    /// the chosen outpoints; the value is short of `amount` only when every
    /// spendable output was taken.
    pub fn spendable_outputs(
        &self,
        pub_key_hash: &str,
        amount: u64,
        reserved: &HashSet<OutPoint>,
    ) -> (u64, Vec<OutPoint>) {
        let mut accumulated = 0u64;
        let mut chosen = Vec::new();

        for (tx_id, unspent) in &self.outputs {
            for u in unspent {
                if accumulated >= amount {
                    return (accumulated, chosen);
                }
                let outpoint = OutPoint::new(tx_id, u.index);
                if u.output.is_locked_with(pub_key_hash) && !reserved.contains(&outpoint) {
                    accumulated += u.output.value;
                    chosen.push(outpoint);
                }
            }
        }

        (accumulated, chosen)
    }
}
