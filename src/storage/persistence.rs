//! Ledger persistence layer
//!
//! Each node id owns a directory `blocks_<node>` under the data directory
//! holding the chain, its spendable-output index and the pending
//! transaction queue as JSON files. Every write goes to a temporary file
//! that is renamed into place.

use crate::config::NodeId;
use crate::core::{Block, Blockchain};
use crate::mining::Mempool;
use crate::storage::utxo::UtxoSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

const CHAIN_FILE: &str = "chain.json";
const INDEX_FILE: &str = "utxo.json";
const MEMPOOL_FILE: &str = "mempool.json";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

#[derive(Serialize, Deserialize)]
struct ChainFile {
    blocks: Vec<Block>,
}

/// Files of one node's ledger
#[derive(Debug, Clone)]
pub struct ChainStore {
    dir: PathBuf,
}

impl ChainStore {
    pub fn new(data_dir: &Path, node_id: &NodeId) -> Self {
        Self {
            dir: data_dir.join(format!("blocks_{node_id}")),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a chain has been created for this node
    pub fn exists(&self) -> bool {
        self.dir.join(CHAIN_FILE).exists()
    }

    pub fn load_chain(&self, node_id: &NodeId) -> Result<Blockchain, StorageError> {
        let file: ChainFile = self
            .read(CHAIN_FILE)?
            .ok_or_else(|| StorageError::InvalidData(format!("no chain for node {node_id}")))?;

        Blockchain::from_blocks(node_id.clone(), file.blocks)
            .map_err(|e| StorageError::InvalidData(e.to_string()))
    }

    pub fn save_chain(&self, chain: &Blockchain) -> Result<(), StorageError> {
        let file = ChainFile {
            blocks: chain.blocks().to_vec(),
        };
        self.write(CHAIN_FILE, &file)
    }

    /// `None` if the index was never built
    pub fn load_index(&self) -> Result<Option<UtxoSet>, StorageError> {
        self.read(INDEX_FILE)
    }

    pub fn save_index(&self, index: &UtxoSet) -> Result<(), StorageError> {
        self.write(INDEX_FILE, index)
    }

    /// Drop the index so reads report it missing until it is rebuilt
    pub fn remove_index(&self) -> Result<(), StorageError> {
        match fs::remove_file(self.dir.join(INDEX_FILE)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Pending transactions; empty if nothing was ever queued
    pub fn load_mempool(&self) -> Result<Mempool, StorageError> {
        Ok(self.read(MEMPOOL_FILE)?.unwrap_or_default())
    }

    pub fn save_mempool(&self, mempool: &Mempool) -> Result<(), StorageError> {
        self.write(MEMPOOL_FILE, mempool)
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(fs::File::open(path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        write_json_atomic(&self.dir.join(name), value)
    }
}

/// Write `value` as pretty JSON through a temp file and an atomic rename
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let writer = BufWriter::new(fs::File::create(&temp_path)?);
        serde_json::to_writer_pretty(writer, value)?;
    }
    fs::rename(&temp_path, path)?;

    Ok(())
}
