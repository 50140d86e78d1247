//! Core ledger components
//!
//! - Transactions (UTXO model, outputs locked to public key hashes)
//! - Blocks (proof of work, previous-hash links)
//! - Blockchain (an opened ledger with a newest-first iterator)

pub mod block;
pub mod blockchain;
pub mod transaction;

pub use block::Block;
pub use blockchain::{Blockchain, BlockchainError, ChainIter};
pub use transaction::{
    OutPoint, Transaction, TransactionError, TxInput, TxOutput, BLOCK_REWARD,
};
