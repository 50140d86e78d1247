//! Wallet module for key storage and transaction signing

pub mod wallet;

pub use wallet::{Wallet, WalletError, Wallets};
