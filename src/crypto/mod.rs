//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 / RIPEMD-160 hashing
//! - ECDSA key management (secp256k1)
//! - Base58Check account addresses

pub mod hash;
pub mod keys;

pub use hash::{double_sha256, hash160, meets_difficulty, sha256, sha256_hex};
pub use keys::{
    address_from_pub_key_hash, checksum, pub_key_hash_from_address, public_key_from_hex,
    validate_address, verify_signature, KeyError, KeyPair, ADDRESS_VERSION, CHECKSUM_LEN,
    PUB_KEY_HASH_LEN,
};
