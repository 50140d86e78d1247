//! Mining module for block creation and transaction queuing

pub mod mempool;
pub mod miner;

pub use mempool::{Mempool, MempoolError};
pub use miner::{Miner, MiningError, MiningStats};
