//! JSON-file ledger and key store

use crate::config::{GatewayConfig, NodeId};
use crate::core::{Block, Blockchain, Transaction};
use crate::crypto::pub_key_hash_from_address;
use crate::ledger::{Address, KeyStore, LedgerBackend, LedgerError, Transfer};
use crate::mining::{Mempool, Miner};
use crate::storage::{ChainStore, UtxoSet};
use crate::wallet::{WalletError, Wallets};
use log::{info, warn};
use std::path::PathBuf;

/// Data carried by the genesis coinbase input
pub const GENESIS_COINBASE_DATA: &str =
    "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";

/// Ledger stored under `<data_dir>/blocks_<node>/`
#[derive(Debug, Clone)]
pub struct FileLedger {
    data_dir: PathBuf,
    difficulty: u32,
}

impl FileLedger {
    pub fn new(data_dir: impl Into<PathBuf>, difficulty: u32) -> Self {
        Self {
            data_dir: data_dir.into(),
            difficulty,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(&config.data_dir, config.difficulty)
    }

    fn store(&self, node: &NodeId) -> ChainStore {
        ChainStore::new(&self.data_dir, node)
    }

    fn load_index(&self, store: &ChainStore, node: &NodeId) -> Result<UtxoSet, LedgerError> {
        store
            .load_index()?
            .ok_or_else(|| LedgerError::IndexMissing(node.clone()))
    }
}

impl LedgerBackend for FileLedger {
    fn open(&self, node: &NodeId) -> Result<Blockchain, LedgerError> {
        let store = self.store(node);
        if !store.exists() {
            return Err(LedgerError::NotFound(node.clone()));
        }
        Ok(store.load_chain(node)?)
    }

    fn init(&mut self, node: &NodeId, genesis: &Address) -> Result<Blockchain, LedgerError> {
        let store = self.store(node);
        if store.exists() {
            return Err(LedgerError::AlreadyExists);
        }

        let coinbase = Transaction::coinbase(genesis.as_str(), GENESIS_COINBASE_DATA)?;
        let chain = Blockchain::new(node.clone(), Block::genesis(coinbase, self.difficulty));
        store.save_chain(&chain)?;

        info!(
            "Created blockchain for node {} (genesis {})",
            node,
            chain.tip().hash
        );
        Ok(chain)
    }

    fn rebuild_index(&mut self, chain: &Blockchain) -> Result<usize, LedgerError> {
        let store = self.store(chain.node_id());
        let index = UtxoSet::rebuild(chain);

        // Queued transactions may spend outputs a later block already consumed
        let mut mempool = store.load_mempool()?;
        let dropped = mempool.retain_valid(&index);
        if dropped > 0 {
            store.save_mempool(&mempool)?;
            info!("Dropped {} stale queued transactions", dropped);
        }
        store.save_index(&index)?;

        let count = index.transaction_count();
        info!(
            "Rebuilt spendable-output index for node {}: {} transactions",
            chain.node_id(),
            count
        );
        Ok(count)
    }

    fn balance_of(&self, node: &NodeId, address: &Address) -> Result<u64, LedgerError> {
        let store = self.store(node);
        if !store.exists() {
            return Err(LedgerError::NotFound(node.clone()));
        }

        let index = self.load_index(&store, node)?;
        let pub_key_hash = hex::encode(pub_key_hash_from_address(address.as_str())?);
        Ok(index.balance(&pub_key_hash))
    }

    fn send(&mut self, node: &NodeId, transfer: &Transfer) -> Result<Transaction, LedgerError> {
        let store = self.store(node);
        let mut chain = self.open(node)?;
        let mut index = self.load_index(&store, node)?;
        let mut mempool = store.load_mempool()?;

        let wallets = Wallets::load(&self.data_dir, node)?;
        let wallet = wallets.get(transfer.from.as_str())?.ok_or_else(|| {
            LedgerError::InvalidInput(format!("no wallet found for address {}", transfer.from))
        })?;

        let tx = wallet
            .create_transaction(
                transfer.to.as_str(),
                transfer.amount,
                &index,
                &mempool.reserved(),
            )
            .map_err(|e| match e {
                WalletError::InsufficientFunds { have, need } => {
                    LedgerError::InsufficientFunds { have, need }
                }
                other => LedgerError::Wallet(other),
            })?;

        if transfer.mine {
            let mut transactions = mempool.drain_valid(&index);
            transactions.push(tx.clone());

            let miner = Miner::new(transfer.from.as_str(), self.difficulty);
            let (block, _stats) = miner.mine_block(&mut chain, transactions)?;

            index.apply_block(&block);
            if let Err(e) = commit_block(&store, &chain, &mempool, &index) {
                warn!(
                    "Block {} for node {} not fully written, index dropped: {}",
                    block.hash, node, e
                );
                return Err(e);
            }
        } else {
            mempool.add(tx.clone(), &index)?;
            store.save_mempool(&mempool)?;
            info!(
                "Queued transaction {} ({} pending)",
                tx.id,
                mempool.len()
            );
        }

        Ok(tx)
    }
}

/// Persist a freshly mined block
///
/// The index is removed first and written last, so after any failure reads
/// report it missing until `rebuild_index` runs against the stored chain.
fn commit_block(
    store: &ChainStore,
    chain: &Blockchain,
    mempool: &Mempool,
    index: &UtxoSet,
) -> Result<(), LedgerError> {
    store.remove_index()?;
    store.save_chain(chain)?;
    store.save_mempool(mempool)?;
    store.save_index(index)?;
    Ok(())
}

/// Wallets stored in `<data_dir>/wallets_<node>.json`
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    data_dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(&config.data_dir)
    }
}

impl KeyStore for FileKeyStore {
    fn create_address(&mut self, node: &NodeId) -> Result<Address, LedgerError> {
        let mut wallets = Wallets::load(&self.data_dir, node)?;
        let address = wallets.create_wallet().address();
        wallets.save()?;

        info!("Created wallet {} for node {}", address, node);
        Ok(Address::from_trusted(address))
    }

    fn list_addresses(&self, node: &NodeId) -> Result<Vec<Address>, LedgerError> {
        let wallets = Wallets::load(&self.data_dir, node)?;
        Ok(wallets
            .addresses()
            .into_iter()
            .map(Address::from_trusted)
            .collect())
    }
}
