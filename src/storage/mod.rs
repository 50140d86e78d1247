//! Storage module for ledger persistence and the spendable-output index

pub mod persistence;
pub mod utxo;

pub use persistence::{write_json_atomic, ChainStore, StorageError};
pub use utxo::{UnspentOutput, UtxoSet};
