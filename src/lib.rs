//! Ledger Gateway: the HTTP surface of a single-node UTXO ledger
//!
//! This crate provides:
//! - A REST gateway with request validation and error aggregation
//! - Proof of Work blocks linked by previous-hash
//! - ECDSA digital signatures (secp256k1) and Base58Check addresses
//! - UTXO-based transactions with a persisted spendable-output index
//! - Per-node wallet files and JSON chain storage
//! - A command line mirroring every HTTP operation
//!
//! # Example
//!
//! ```rust,no_run
//! use ledger_gateway::config::{GatewayConfig, NodeId};
//! use ledger_gateway::api::{create_router, ApiState};
//!
//! let config = GatewayConfig::new(NodeId::new("3000").unwrap(), ".ledger_data");
//! let app = create_router(ApiState::new(config));
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod ledger;
pub mod mining;
pub mod storage;
pub mod wallet;

// Re-export commonly used types
pub use api::{create_router, ApiState, ErrorReport, GatewayError};
pub use config::{GatewayConfig, NodeId};
pub use core::{Block, Blockchain, Transaction, BLOCK_REWARD};
pub use crypto::KeyPair;
pub use ledger::{
    Address, AddressFormat, Base58Check, FileKeyStore, FileLedger, KeyStore, LedgerBackend,
    LedgerError, Transfer,
};
pub use mining::{Mempool, Miner};
pub use storage::{ChainStore, UtxoSet};
pub use wallet::{Wallet, Wallets};
