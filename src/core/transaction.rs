//! Transaction handling for the ledger
//!
//! Implements a UTXO-based transaction model. Outputs are locked to the
//! public key hash behind an address; inputs reference earlier outputs and
//! carry an ECDSA signature from the owning key.

use crate::crypto::{
    hash160, pub_key_hash_from_address, public_key_from_hex, sha256, sha256_hex,
    verify_signature, KeyError, KeyPair,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reward paid by every coinbase transaction
pub const BLOCK_REWARD: u64 = 20;

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Invalid signature on input {0}")]
    InvalidSignature(usize),
    #[error("Input {0} is not signed by the owner of the spent output")]
    WrongOwner(usize),
    #[error("Referenced output {0} is not spendable")]
    MissingOutput(OutPoint),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// Reference to one output of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_id: String,
    pub index: u32,
}

impl OutPoint {
    pub fn new(tx_id: &str, index: u32) -> Self {
        Self {
            tx_id: tx_id.to_string(),
            index,
        }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.index)
    }
}

/// Transaction input (reference to a previous output)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TxInput {
    /// ID of the transaction holding the spent output; empty for coinbase
    pub tx_id: String,
    /// Index of the spent output
    pub out: u32,
    /// Hex compact signature
    pub signature: String,
    /// Hex public key of the spender (arbitrary data for coinbase)
    pub pub_key: String,
}

impl TxInput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(&self.tx_id, self.out)
    }
}

/// Transaction output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TxOutput {
    pub value: u64,
    /// Hex RIPEMD160(SHA256(pubkey)) of the owner
    pub pub_key_hash: String,
}

impl TxOutput {
    /// Lock `value` to the owner of `address`
    pub fn lock(address: &str, value: u64) -> Result<Self, KeyError> {
        let pub_key_hash = pub_key_hash_from_address(address)?;
        Ok(Self {
            value,
            pub_key_hash: hex::encode(pub_key_hash),
        })
    }

    pub fn is_locked_with(&self, pub_key_hash: &str) -> bool {
        self.pub_key_hash == pub_key_hash
    }
}

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Hash of the inputs and outputs
    pub id: String,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Create an unsigned transaction
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            id: String::new(),
            inputs,
            outputs,
        };
        tx.id = tx.calculate_hash();
        tx
    }

    /// Create a coinbase transaction paying `BLOCK_REWARD` to `recipient`
    ///
    /// Random data goes into the input when `data` is empty so two coinbases
    /// to the same address never share an ID.
    pub fn coinbase(recipient: &str, data: &str) -> Result<Self, TransactionError> {
        let data = if data.is_empty() {
            hex::encode(rand::random::<[u8; 24]>())
        } else {
            data.to_string()
        };

        let input = TxInput {
            tx_id: String::new(),
            out: 0,
            signature: String::new(),
            pub_key: data,
        };
        let output = TxOutput::lock(recipient, BLOCK_REWARD)?;

        Ok(Self::new(vec![input], vec![output]))
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].tx_id.is_empty()
    }

    pub fn calculate_hash(&self) -> String {
        let data = format!("{:?}{:?}", self.inputs, self.outputs);
        sha256_hex(data.as_bytes())
    }

    /// Digest covered by the input signatures: spent outpoints and new outputs
    pub fn signing_digest(&self) -> Vec<u8> {
        let spent: Vec<(&str, u32)> = self
            .inputs
            .iter()
            .map(|input| (input.tx_id.as_str(), input.out))
            .collect();
        let data = format!("{:?}{:?}", spent, self.outputs);
        sha256(data.as_bytes())
    }

    /// Sign every input with the provided key pair
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), TransactionError> {
        if self.is_coinbase() {
            return Ok(());
        }

        let digest = self.signing_digest();
        let public_key_hex = key_pair.public_key_hex();

        for input in &mut self.inputs {
            input.signature = hex::encode(key_pair.sign(&digest)?);
            input.pub_key = public_key_hex.clone();
        }

        // Recalculate hash after signing
        self.id = self.calculate_hash();
        Ok(())
    }

    /// Verify every input against the output it spends
    ///
    /// `lookup` resolves an outpoint to the unspent output it names.
    pub fn verify<F>(&self, lookup: F) -> Result<(), TransactionError>
    where
        F: Fn(&OutPoint) -> Option<TxOutput>,
    {
        if self.is_coinbase() {
            return Ok(());
        }

        let digest = self.signing_digest();

        for (i, input) in self.inputs.iter().enumerate() {
            let outpoint = input.outpoint();
            let spent = lookup(&outpoint).ok_or(TransactionError::MissingOutput(outpoint))?;

            let public_key = public_key_from_hex(&input.pub_key)?;
            if !spent.is_locked_with(&hex::encode(hash160(&public_key.serialize()))) {
                return Err(TransactionError::WrongOwner(i));
            }

            let signature =
                hex::decode(&input.signature).map_err(|_| TransactionError::InvalidSignature(i))?;
            if !verify_signature(&public_key, &digest, &signature)? {
                return Err(TransactionError::InvalidSignature(i));
            }
        }

        Ok(())
    }

    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}
