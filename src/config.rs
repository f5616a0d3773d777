//! Static mesh, genesis, and timing configuration (spec §6, §4.8).
//!
//! The three node ports, the injector port, and the genesis block are
//! module-level constants in the original implementation. Per the design
//! notes (spec.md §9 "Global state"), this crate loads them once into a
//! `Config` value at startup instead of reaching for process-wide statics,
//! so tests can build fresh, independent configurations. `NODE_IP`/`HQ_IP`
//! env discovery mirrors the original's `dotenv.load_dotenv()` +
//! `os.getenv` pattern via `dotenvy`, the way the teacher crate loads its
//! own environment-derived settings.

use std::net::{IpAddr, SocketAddr};
use std::sync::OnceLock;
use std::time::Duration;

use crate::balance::Balance;
use crate::chain::Blockchain;
use crate::codec::{Block, Header, Transaction, VERSION};
use crate::crypto::Hash;
use crate::error::NodeError;
use crate::pow;

/// The three static node ports that make up the mesh.
pub const NODE_PORTS: [u16; 3] = [7000, 8000, 9000];

/// Port the injector binds and sends from.
pub const HQ_PORT: u16 = 6000;

/// Fixed genesis timestamp (spec §6).
pub const GENESIS_TIMESTAMP: u32 = 1_634_700_000;

/// Nonce search budget spent per scheduling quantum while mining (spec §4.8).
pub const MINING_QUANTUM: u64 = 1000;

/// Receive timeout applied to each `LISTEN` iteration (spec §4.8: "100 ms -
/// 1 s"). A generous 1 s keeps demo traffic readable without starving the
/// miner of listen attempts.
pub const LISTEN_TIMEOUT: Duration = Duration::from_millis(500);

/// Maximum size of a single UDP datagram this node will read or write (spec
/// §5: OS X's UDP payload limit, carried forward unchanged).
pub const MAX_DATAGRAM_SIZE: usize = 9216;

/// Well-known address that receives the genesis coinbase reward.
///
/// The original implementation hard-codes a *specific* port-7000 wallet's
/// public key as the genesis recipient — a real keypair committed alongside
/// the vectors. This repository has no committed keypair to reproduce
/// bit-for-bit, so the genesis address here is instead a fixed,
/// implementation-defined 32-byte constant (the SHA-256 of a fixed label).
/// Every node that builds `genesis_block()` computes the identical constant
/// and replays the identical deterministic proof-of-work search, so the
/// convergence property the spec cares about — "every node must construct
/// and hash the same genesis block" — still holds; only the literal test
/// vectors in spec.md §8 (which assume a specific, undisclosed keypair) are
/// not bit-reproducible here. See DESIGN.md for this decision.
pub fn genesis_address() -> Hash {
    crate::crypto::sha256(b"readcoin-genesis-address-v1")
}

static GENESIS: OnceLock<Block> = OnceLock::new();

/// Builds the network's genesis block: a single coinbase transaction paying
/// `genesis_address()`, mined deterministically from nonce zero.
///
/// Proof-of-work search is pure and deterministic (§4.4): every node that
/// calls this function performs the identical search over the identical
/// header fields and arrives at the identical nonce and hash, so no node
/// needs to trust a peer's copy of genesis — it can rebuild it locally. The
/// result is cached after the first call since the search itself (~65,536
/// hashes on average) is too expensive to repeat on every comparison.
pub fn genesis_block() -> Block {
    GENESIS
        .get_or_init(|| {
            let coinbase = Transaction::coinbase(genesis_address());
            let merkle_root = crate::merkle::MerkleTree::new(&[crate::crypto::sha256(
                &crate::codec::encode_transaction(&coinbase),
            )])
            .expect("single-leaf tree always builds")
            .root();

            let mut header = Header {
                version: VERSION,
                previous_hash: [0u8; 32],
                merkle_root,
                timestamp: GENESIS_TIMESTAMP,
                nonce: 0,
            };

            // The 16-bit target succeeds after ~65,536 attempts on average;
            // this budget is generous enough to make a search failure
            // effectively impossible while still bounded, per the
            // component's own contract.
            let outcome = pow::search(&mut header, 0, 50_000_000);
            if outcome.hash.is_none() {
                panic!("genesis proof-of-work search exhausted its budget without a solution");
            }

            Block {
                header,
                transactions: vec![coinbase],
            }
        })
        .clone()
}

/// Configuration shared by a running node: the static mesh, this node's own
/// port, and the addresses env discovery resolved.
#[derive(Debug, Clone)]
pub struct Config {
    pub node_ip: IpAddr,
    pub hq_ip: IpAddr,
    pub port: u16,
}

impl Config {
    /// Loads `NODE_IP`/`HQ_IP` from the process environment, after first
    /// letting `dotenvy` populate them from a `.env` file if present — the
    /// same two-step the original implementation performs per-process.
    pub fn from_env(port: u16) -> Result<Self, NodeError> {
        dotenvy::dotenv().ok();

        let node_ip = std::env::var("NODE_IP")
            .map_err(|_| NodeError::BadCli)?
            .parse::<IpAddr>()
            .map_err(|_| NodeError::BadCli)?;
        let hq_ip = std::env::var("HQ_IP")
            .map_err(|_| NodeError::BadCli)?
            .parse::<IpAddr>()
            .map_err(|_| NodeError::BadCli)?;

        Ok(Config { node_ip, hq_ip, port })
    }

    /// This node's own bind address.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.node_ip, self.port)
    }

    /// The mesh's three node addresses, including this node's own.
    pub fn node_addrs(&self) -> Vec<SocketAddr> {
        NODE_PORTS
            .iter()
            .map(|&p| SocketAddr::new(self.node_ip, p))
            .collect()
    }

    /// The peer addresses this node should broadcast to (every node except
    /// itself).
    pub fn peer_addrs(&self) -> Vec<SocketAddr> {
        self.node_addrs()
            .into_iter()
            .filter(|addr| addr.port() != self.port)
            .collect()
    }

    /// The injector's bind address.
    pub fn hq_addr(&self) -> SocketAddr {
        SocketAddr::new(self.hq_ip, HQ_PORT)
    }
}

/// The genesis blockchain: a single-block chain holding only `genesis_block()`.
pub fn genesis_chain() -> Blockchain {
    let mut chain = Blockchain::new();
    chain.push(genesis_block());
    chain
}

/// The balance sheet immediately after genesis, with the miner's coinbase
/// coin already credited.
pub fn genesis_balance() -> Balance {
    let chain = genesis_chain();
    crate::balance::init_balance(&chain).expect("genesis chain is trivially valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_block_satisfies_proof_of_work() {
        let block = genesis_block();
        assert!(pow::is_valid(&block.header));
        assert_eq!(block.header.previous_hash, [0u8; 32]);
        assert_eq!(block.header.timestamp, GENESIS_TIMESTAMP);
    }

    #[test]
    fn genesis_block_is_deterministic_across_calls() {
        let a = genesis_block();
        let b = genesis_block();
        assert_eq!(a, b);
    }

    #[test]
    fn genesis_balance_credits_the_genesis_address() {
        let balance = genesis_balance();
        let addr = genesis_address();
        assert_eq!(balance.accounts.get(&addr).map(Vec::len), Some(1));
    }

    #[test]
    fn node_addrs_lists_all_three_mesh_ports() {
        let cfg = Config {
            node_ip: "127.0.0.1".parse().unwrap(),
            hq_ip: "127.0.0.1".parse().unwrap(),
            port: 7000,
        };
        assert_eq!(cfg.node_addrs().len(), 3);
        assert_eq!(cfg.peer_addrs().len(), 2);
    }
}
