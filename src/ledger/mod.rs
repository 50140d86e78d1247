//! Ledger and key-store collaborators
//!
//! The gateway only talks to the ledger through [`LedgerBackend`] and to the
//! wallets through [`KeyStore`]. [`FileLedger`] and [`FileKeyStore`] are the
//! JSON-file implementations used by the node.

pub mod address;
pub mod file;

pub use address::{
    parse_amount, Address, AddressFormat, Base58Check, InvalidAddress, InvalidAmount,
    MIN_ADDRESS_LEN,
};
pub use file::{FileKeyStore, FileLedger};

use crate::config::NodeId;
use crate::core::{Blockchain, BlockchainError, Transaction, TransactionError};
use crate::crypto::KeyError;
use crate::mining::{MempoolError, MiningError};
use crate::storage::StorageError;
use crate::wallet::WalletError;
use thiserror::Error;

/// Errors reported by the ledger and key-store collaborators
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("No existing blockchain found for node {0}. Create one first.")]
    NotFound(NodeId),
    #[error("Blockchain already exists")]
    AlreadyExists,
    #[error("Spendable-output index missing for node {0}. Run reindexutxo.")]
    IndexMissing(NodeId),
    #[error("Not enough funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error("{0}")]
    InvalidInput(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
    #[error("Chain error: {0}")]
    Chain(#[from] BlockchainError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
    #[error("Mempool error: {0}")]
    Mempool(#[from] MempoolError),
    #[error("Mining error: {0}")]
    Mining(#[from] MiningError),
}

/// A transfer that passed request validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: u64,
    /// Mine a block now instead of queueing the transaction
    pub mine: bool,
}

/// Ledger operations consumed by the gateway
///
/// Methods taking `&mut self` write to the ledger; callers hold exclusive
/// access for their whole duration.
pub trait LedgerBackend: Send + Sync {
    /// Open the existing chain of `node`
    fn open(&self, node: &NodeId) -> Result<Blockchain, LedgerError>;

    /// Create a chain whose genesis block rewards `genesis`
    fn init(&mut self, node: &NodeId, genesis: &Address) -> Result<Blockchain, LedgerError>;

    /// Rebuild the spendable-output index from scratch.
    /// Returns the number of transactions with unspent outputs.
    fn rebuild_index(&mut self, chain: &Blockchain) -> Result<usize, LedgerError>;

    fn balance_of(&self, node: &NodeId, address: &Address) -> Result<u64, LedgerError>;

    /// Build, sign and either mine or queue a transfer
    fn send(&mut self, node: &NodeId, transfer: &Transfer) -> Result<Transaction, LedgerError>;
}

/// Wallet operations consumed by the gateway
pub trait KeyStore: Send + Sync {
    fn create_address(&mut self, node: &NodeId) -> Result<Address, LedgerError>;

    /// Addresses of all wallets of `node`, sorted
    fn list_addresses(&self, node: &NodeId) -> Result<Vec<Address>, LedgerError>;
}
