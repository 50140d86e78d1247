//! ECDSA key management and account addresses
//!
//! Key pairs live on the secp256k1 curve. An address is
//! `Base58Check(version || RIPEMD160(SHA256(pubkey)) || checksum)`, where the
//! checksum is the first four bytes of the double SHA-256 of the payload.

use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::hash::{double_sha256, hash160, sha256};

/// Version byte prefixed to every address payload
pub const ADDRESS_VERSION: u8 = 0x00;

/// Number of checksum bytes appended to an address payload
pub const CHECKSUM_LEN: usize = 4;

/// Length of a public key hash
pub const PUB_KEY_HASH_LEN: usize = 20;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Compressed public key as hex
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// RIPEMD160(SHA256(pubkey))
    pub fn pub_key_hash(&self) -> Vec<u8> {
        hash160(&self.public_key.serialize())
    }

    pub fn address(&self) -> String {
        address_from_pub_key_hash(&self.pub_key_hash())
    }

    /// Sign a message digest with the private key
    pub fn sign(&self, message_hash: &[u8]) -> Result<Vec<u8>, KeyError> {
        let secp = Secp256k1::new();
        let message = Message::from_digest_slice(&digest32(message_hash))?;
        let signature = secp.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact().to_vec())
    }
}

/// First four bytes of the double SHA-256 of `payload`
pub fn checksum(payload: &[u8]) -> Vec<u8> {
    double_sha256(payload)[..CHECKSUM_LEN].to_vec()
}

/// Encode a public key hash as a Base58Check address
pub fn address_from_pub_key_hash(pub_key_hash: &[u8]) -> String {
    let mut payload = Vec::with_capacity(1 + pub_key_hash.len() + CHECKSUM_LEN);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(pub_key_hash);
    let check = checksum(&payload);
    payload.extend_from_slice(&check);
    bs58::encode(payload).into_string()
}

/// Decode an address back to its public key hash, verifying the checksum
pub fn pub_key_hash_from_address(address: &str) -> Result<Vec<u8>, KeyError> {
    let invalid = || KeyError::InvalidAddress(address.to_string());

    let bytes = bs58::decode(address).into_vec().map_err(|_| invalid())?;
    if bytes.len() != 1 + PUB_KEY_HASH_LEN + CHECKSUM_LEN {
        return Err(invalid());
    }

    let (payload, actual) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if payload[0] != ADDRESS_VERSION || checksum(payload) != actual {
        return Err(invalid());
    }

    Ok(payload[1..].to_vec())
}

/// Checksum predicate used to accept or reject account identifiers
pub fn validate_address(address: &str) -> bool {
    pub_key_hash_from_address(address).is_ok()
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Verify a compact signature against a public key
pub fn verify_signature(
    public_key: &PublicKey,
    message_hash: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(&digest32(message_hash))?;
    let sig = secp256k1::ecdsa::Signature::from_compact(signature)
        .map_err(|_| KeyError::InvalidSignature)?;

    Ok(secp.verify_ecdsa(&message, &sig, public_key).is_ok())
}

// secp256k1 only signs 32-byte digests
fn digest32(message_hash: &[u8]) -> Vec<u8> {
    if message_hash.len() == 32 {
        message_hash.to_vec()
    } else {
        sha256(message_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let message_hash = sha256(b"transfer 10");

        let signature = kp.sign(&message_hash).unwrap();
        assert!(verify_signature(&kp.public_key, &message_hash, &signature).unwrap());

        let other = KeyPair::generate();
        assert!(!verify_signature(&other.public_key, &message_hash, &signature).unwrap());
    }

    #[test]
    fn test_key_pair_from_hex() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::from_private_key_hex(&kp1.private_key_hex()).unwrap();
        assert_eq!(kp1.address(), kp2.address());
    }

    #[test]
    fn test_address_round_trip() {
        let kp = KeyPair::generate();
        let address = kp.address();

        assert!(address.starts_with('1'));
        assert!(validate_address(&address));
        assert_eq!(pub_key_hash_from_address(&address).unwrap(), kp.pub_key_hash());
    }

    #[test]
    fn test_corrupted_address_rejected() {
        let address = KeyPair::generate().address();

        // Swap the last character for a different base58 digit
        let mut corrupted = address.clone();
        let last = corrupted.pop().unwrap();
        corrupted.push(if last == '2' { '3' } else { '2' });

        assert!(!validate_address(&corrupted));
        assert!(!validate_address("AAAAA"));
        assert!(!validate_address("0OIl")); // not base58
        assert!(!validate_address(""));
    }
}
