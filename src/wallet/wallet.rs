//! Wallet implementation for the ledger
//!
//! A wallet is one secp256k1 key pair. All wallets of a node live in a single
//! JSON file `wallets_<node>.json` under the data directory.

use crate::config::NodeId;
use crate::core::{OutPoint, Transaction, TransactionError, TxInput, TxOutput};
use crate::crypto::{KeyError, KeyPair};
use crate::storage::{write_json_atomic, StorageError, UtxoSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// A ledger wallet
pub struct Wallet {
    key_pair: KeyPair,
}

impl Wallet {
    /// Create a new wallet with a fresh key pair
    pub fn new() -> Self {
        Self {
            key_pair: KeyPair::generate(),
        }
    }

    /// Import a wallet from a private key
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, WalletError> {
        Ok(Self {
            key_pair: KeyPair::from_private_key_hex(private_key_hex)?,
        })
    }

    pub fn address(&self) -> String {
        self.key_pair.address()
    }

    /// Get the wallet's private key (hex)
    /// WARNING: Keep this secret!
    pub fn private_key(&self) -> String {
        self.key_pair.private_key_hex()
    }

    /// Hex public key hash that outputs owned by this wallet are locked to
    pub fn pub_key_hash(&self) -> String {
        hex::encode(self.key_pair.pub_key_hash())
    }

    /// Build and sign a transfer of `amount` to `recipient`
    ///
    /// Outputs in `reserved` are already claimed by queued transactions and
    /// are not selected. Change goes back to this wallet.
    pub fn create_transaction(
        &self,
        recipient: &str,
        amount: u64,
        index: &UtxoSet,
        reserved: &HashSet<OutPoint>,
    ) -> Result<Transaction, WalletError> {
        let pub_key_hash = self.pub_key_hash();
        let (available, selected) = index.spendable_outputs(&pub_key_hash, amount, reserved);

        if available < amount {
            return Err(WalletError::InsufficientFunds {
                have: available,
                need: amount,
            });
        }

        let inputs = selected
            .into_iter()
            .map(|outpoint| TxInput {
                tx_id: outpoint.tx_id,
                out: outpoint.index,
                signature: String::new(),
                pub_key: String::new(),
            })
            .collect();

        let mut outputs = vec![TxOutput::lock(recipient, amount)?];
        let change = available - amount;
        if change > 0 {
            outputs.push(TxOutput {
                value: change,
                pub_key_hash,
            });
        }

        let mut tx = Transaction::new(inputs, outputs);
        tx.sign(&self.key_pair)?;
        Ok(tx)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WalletFile {
    /// address -> private key hex
    wallets: BTreeMap<String, String>,
}

/// The wallets of one node
pub struct Wallets {
    path: PathBuf,
    file: WalletFile,
}

impl Wallets {
    pub fn file_path(data_dir: &Path, node_id: &NodeId) -> PathBuf {
        data_dir.join(format!("wallets_{node_id}.json"))
    }

    /// Load the node's wallets; a missing file means no wallets yet
    pub fn load(data_dir: &Path, node_id: &NodeId) -> Result<Self, WalletError> {
        let path = Self::file_path(data_dir, node_id);
        let file = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            WalletFile::default()
        };

        Ok(Self { path, file })
    }

    pub fn save(&self) -> Result<(), WalletError> {
        write_json_atomic(&self.path, &self.file)?;
        Ok(())
    }

    /// Generate a wallet and add it to the set; call `save` to persist
    pub fn create_wallet(&mut self) -> Wallet {
        let wallet = Wallet::new();
        self.file
            .wallets
            .insert(wallet.address(), wallet.private_key());
        wallet
    }

    /// All addresses, sorted
    pub fn addresses(&self) -> Vec<String> {
        self.file.wallets.keys().cloned().collect()
    }

    pub fn get(&self, address: &str) -> Result<Option<Wallet>, WalletError> {
        self.file
            .wallets
            .get(address)
            .map(|key| Wallet::from_private_key(key))
            .transpose()
    }
}
