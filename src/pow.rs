//! Proof-of-work search (spec C4).
//!
//! Difficulty is fixed for the lifetime of the network: a header's double
//! hash must begin with 16 zero bits. There is no retargeting (the
//! teacher's `src/consensus/difficulty.rs` adjustment logic has no
//! counterpart here — see DESIGN.md). The nonce search itself follows the
//! shape of the teacher's `PowMiner::mine` loop in `src/consensus/pow.rs`:
//! walk a bounded nonce range, hash the header at each step, stop on the
//! first hit or when the budget is exhausted.

use crate::codec::{encode_header, Header};
use crate::crypto::{dhash, Hash};

/// Number of leading zero bits a header's double hash must have.
pub const DIFFICULTY_BITS: u32 = 16;

/// Whether `hash` satisfies the fixed difficulty target.
pub fn meets_target(hash: &Hash) -> bool {
    hash[0] == 0 && hash[1] == 0
}

/// The double hash of a header's wire encoding — the value proof-of-work
/// difficulty is judged against.
pub fn header_hash(header: &Header) -> Hash {
    dhash(&encode_header(header))
}

/// Outcome of one bounded nonce search (spec C4): either a winning hash was
/// found, or the budget was exhausted and `next_nonce` tells the caller
/// where to resume on its next quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowOutcome {
    pub next_nonce: u64,
    pub hash: Option<Hash>,
}

/// Searches nonces `start_nonce..start_nonce + budget` for one that
/// satisfies the difficulty target, mutating `header.nonce` in place as it
/// goes. This is the node loop's scheduling quantum: a node interleaves
/// mining with listening by calling this with a small `budget` (e.g. 1000)
/// per iteration (spec §4.4, §4.8).
pub fn search(header: &mut Header, start_nonce: u64, budget: u64) -> PowOutcome {
    for offset in 0..budget {
        let nonce = start_nonce + offset;
        header.nonce = nonce;
        let hash = header_hash(header);
        if meets_target(&hash) {
            return PowOutcome {
                next_nonce: nonce,
                hash: Some(hash),
            };
        }
    }
    header.nonce = start_nonce;
    PowOutcome {
        next_nonce: start_nonce + budget,
        hash: None,
    }
}

/// Convenience wrapper over [`search`] starting from nonce zero, for
/// one-shot searches (tests, genesis construction) that don't need to
/// resume across quanta.
pub fn mine(header: &mut Header, max_attempts: u64) -> Option<Hash> {
    search(header, 0, max_attempts).hash
}

/// Checks that `header`'s recorded nonce actually satisfies the difficulty
/// target, without searching for one.
pub fn is_valid(header: &Header) -> bool {
    meets_target(&header_hash(header))
}
