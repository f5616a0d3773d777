//! Static address→public-key directory used for signature checks (spec C7).
//!
//! Seeded once at node startup from the trusted wallet directory and never
//! rotated afterwards, as spec.md §4.7 requires. Grounded in the teacher's
//! keyed-map patterns (`src/network/protocol.rs`'s `PeerInfo` registry) but
//! simplified to a bare map, since this spec has no peer discovery to
//! maintain.

use std::collections::HashMap;
use std::path::Path;

use k256::ecdsa::VerifyingKey;

use crate::config::NODE_PORTS;
use crate::crypto::{address, decode_public_key, Hash};
use crate::error::WalletError;

/// Address → public key. Every non-coinbase `sender` referenced by a valid
/// block must be present here; unknown senders make a transaction invalid
/// (spec C7, `BalanceError::UnknownAddress`).
#[derive(Debug, Clone, Default)]
pub struct Keychain {
    entries: HashMap<Hash, VerifyingKey>,
}

impl Keychain {
    pub fn new() -> Self {
        Keychain {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, addr: Hash, key: VerifyingKey) {
        self.entries.insert(addr, key);
    }

    pub fn get(&self, addr: &Hash) -> Option<&VerifyingKey> {
        self.entries.get(addr)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads every `<port>-public.pem` in `dir` for the mesh's node ports,
    /// deriving each entry's address from the key itself.
    pub fn load_mesh(dir: &Path) -> Result<Self, WalletError> {
        Self::load_ports(dir, &NODE_PORTS)
    }

    /// Loads `<port>-public.pem` for exactly the given ports.
    pub fn load_ports(dir: &Path, ports: &[u16]) -> Result<Self, WalletError> {
        let mut keychain = Keychain::new();
        for &port in ports {
            let path = dir.join(format!("{port}-public.pem"));
            let pem = std::fs::read_to_string(&path)?;
            let key = decode_public_key(&pem)?;
            keychain.insert(address(&key), key);
        }
        Ok(keychain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_keypair;
    use std::fs;

    #[test]
    fn insert_then_get_round_trips() {
        let (_, pk) = generate_keypair();
        let addr = address(&pk);
        let mut keychain = Keychain::new();
        keychain.insert(addr, pk);
        assert!(keychain.get(&addr).is_some());
    }

    #[test]
    fn get_returns_none_for_unregistered_address() {
        let keychain = Keychain::new();
        assert!(keychain.get(&[0u8; 32]).is_none());
    }

    #[test]
    fn load_ports_reads_every_public_pem_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ports = [7000u16, 8000];
        let mut expected_addrs = Vec::new();

        for &port in &ports {
            let (_, pk) = generate_keypair();
            expected_addrs.push(address(&pk));
            let pem = crate::crypto::encode_public_key(&pk).unwrap();
            fs::write(dir.path().join(format!("{port}-public.pem")), pem).unwrap();
        }

        let keychain = Keychain::load_ports(dir.path(), &ports).unwrap();
        assert_eq!(keychain.len(), 2);
        for addr in expected_addrs {
            assert!(keychain.get(&addr).is_some());
        }
    }

    #[test]
    fn load_ports_fails_when_a_pem_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = Keychain::load_ports(dir.path(), &[7000]).unwrap_err();
        assert!(matches!(err, WalletError::Io(_)));
    }
}
