//! Blockchain handle
//!
//! An opened ledger for one node. Blocks are kept oldest-first with a hash
//! index so the chain can be walked backwards through `prev_hash` links.

use crate::config::NodeId;
use crate::core::block::Block;
use crate::core::transaction::Transaction;
use std::collections::HashMap;
use thiserror::Error;

/// Blockchain-related errors
#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Invalid chain: {0}")]
    InvalidChain(String),
}

/// An opened ledger
#[derive(Debug, Clone)]
pub struct Blockchain {
    node_id: NodeId,
    /// Never empty; `blocks[0]` is genesis
    blocks: Vec<Block>,
    by_hash: HashMap<String, usize>,
}

impl Blockchain {
    /// Start a chain from its genesis block
    pub fn new(node_id: NodeId, genesis: Block) -> Self {
        let by_hash = HashMap::from([(genesis.hash.clone(), 0)]);
        Self {
            node_id,
            blocks: vec![genesis],
            by_hash,
        }
    }

    /// Rebuild a chain from stored blocks, oldest first
    pub fn from_blocks(node_id: NodeId, blocks: Vec<Block>) -> Result<Self, BlockchainError> {
        let mut blocks = blocks.into_iter();
        let genesis = blocks
            .next()
            .ok_or_else(|| BlockchainError::InvalidChain("no genesis block".to_string()))?;

        if !genesis.is_genesis() {
            return Err(BlockchainError::InvalidChain(
                "first block has a parent".to_string(),
            ));
        }

        let mut chain = Self::new(node_id, genesis);
        for block in blocks {
            chain.append(block)?;
        }
        Ok(chain)
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// The newest block
    pub fn tip(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn height(&self) -> u64 {
        self.tip().height
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks oldest-first, the order they are persisted in
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, hash: &str) -> Option<&Block> {
        self.by_hash.get(hash).map(|&i| &self.blocks[i])
    }

    /// Walk from the tip to genesis by following `prev_hash`
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            chain: self,
            next: Some(self.tip().hash.as_str()),
        }
    }

    /// Append a block on top of the current tip
    pub fn append(&mut self, block: Block) -> Result<(), BlockchainError> {
        let tip = self.tip();

        if block.prev_hash != tip.hash {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} does not extend tip {}",
                block.hash, tip.hash
            )));
        }
        if block.height != tip.height + 1 {
            return Err(BlockchainError::InvalidBlock(format!(
                "invalid height: expected {}, got {}",
                tip.height + 1,
                block.height
            )));
        }
        if !block.is_valid_pow() {
            return Err(BlockchainError::InvalidBlock(
                "invalid proof of work".to_string(),
            ));
        }

        self.by_hash.insert(block.hash.clone(), self.blocks.len());
        self.blocks.push(block);
        Ok(())
    }

    pub fn find_transaction(&self, id: &str) -> Option<&Transaction> {
        self.iter()
            .flat_map(|block| block.transactions.iter())
            .find(|tx| tx.id == id)
    }
}

/// Newest-first iterator over a chain; ends after the genesis block
pub struct ChainIter<'a> {
    chain: &'a Blockchain,
    next: Option<&'a str>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.chain.get(self.next?)?;
        self.next = if block.is_genesis() {
            None
        } else {
            Some(block.prev_hash.as_str())
        };
        Some(block)
    }
}
