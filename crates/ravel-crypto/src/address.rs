//! Address derivation from public keys
//!
//! A RavelLedger address is derived from a compressed secp256k1 public
//! key: the last 20 bytes of `keccak256(pubkey)`, prefixed with a network
//! version byte and the little-endian chain id, hex-encoded. The same key
//! therefore yields different addresses on different chains and networks.

use crate::{keccak256, CryptoError};

/// Length of a compressed secp256k1 public key in bytes
pub const PUBLIC_KEY_LEN: usize = 33;

/// Version byte for mainnet addresses
const MAINNET_VERSION: u8 = 0x01;
/// Version byte for testnet addresses
const TESTNET_VERSION: u8 = 0x41;

/// Derive the address string for a public key on the given network.
///
/// Returns an error if the key is not a 33-byte compressed public key.
pub fn derive_address(pubkey: &[u8], testnet: bool, chain_id: u32) -> Result<String, CryptoError> {
    if pubkey.len() != PUBLIC_KEY_LEN {
        return Err(CryptoError::InvalidPublicKey {
            expected: PUBLIC_KEY_LEN,
            got: pubkey.len(),
        });
    }

    let digest = keccak256(pubkey);

    // version (1) + chain id (4) + pubkey hash tail (20)
    let mut payload = [0u8; 25];
    payload[0] = if testnet { TESTNET_VERSION } else { MAINNET_VERSION };
    payload[1..5].copy_from_slice(&chain_id.to_le_bytes());
    payload[5..].copy_from_slice(&digest.as_bytes()[12..]);

    Ok(hex::encode(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pubkey(fill: u8) -> Vec<u8> {
        let mut key = vec![fill; PUBLIC_KEY_LEN];
        key[0] = 0x02; // compressed-key tag
        key
    }

    #[test]
    fn test_derive_address_deterministic() {
        let key = test_pubkey(0x11);
        let a = derive_address(&key, false, 1).unwrap();
        let b = derive_address(&key, false, 1).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50); // 25 bytes hex-encoded
    }

    #[test]
    fn test_derive_address_distinct_keys() {
        let a = derive_address(&test_pubkey(0x11), false, 1).unwrap();
        let b = derive_address(&test_pubkey(0x22), false, 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_derive_address_network_and_chain() {
        let key = test_pubkey(0x11);
        let mainnet = derive_address(&key, false, 1).unwrap();
        let testnet = derive_address(&key, true, 1).unwrap();
        let other_chain = derive_address(&key, false, 2).unwrap();
        assert_ne!(mainnet, testnet);
        assert_ne!(mainnet, other_chain);
        assert!(mainnet.starts_with("01"));
        assert!(testnet.starts_with("41"));
    }

    #[test]
    fn test_derive_address_rejects_bad_length() {
        let result = derive_address(&[0x02; 32], false, 1);
        match result {
            Err(CryptoError::InvalidPublicKey { expected: 33, got: 32 }) => {}
            _ => panic!("expected InvalidPublicKey error"),
        }
        assert!(derive_address(&[], false, 1).is_err());
        assert!(derive_address(&[0x02; 65], false, 1).is_err());
    }
}
