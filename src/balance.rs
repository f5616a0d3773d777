//! Per-address spendable-coin bookkeeping (spec C6).
//!
//! A `Balance` tracks, per address, an ordered multiset of reference
//! hashes — each one a spendable "coin" created by a prior transaction.
//! There are no amounts: a reference hash either is or isn't in an
//! address's set. This mirrors the original implementation's
//! `balances.py`, generalized to the spec's 32-byte hash domain and
//! `Keychain`-backed signature checks, structured as a plain in-memory map
//! the way the teacher's `src/database/utxo_set.rs` models a storage trait
//! around an owned collection — simplified here to a bare `HashMap` since
//! this spec has no on-disk persistence layer.

use std::collections::HashMap;

use crate::chain::Blockchain;
use crate::codec::{encode_transaction, Block, Transaction};
use crate::crypto::{dhash, sha256, Hash};
use crate::error::BalanceError;
use crate::keychain::Keychain;

/// The zero hash, used as the coinbase sentinel for both `reference_hash`
/// and `sender`.
const ZERO_HASH: Hash = [0u8; 32];

/// Per-address spendable coin references, plus the hash of the last block
/// applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub latest_hash: Hash,
    pub accounts: HashMap<Hash, Vec<Hash>>,
}

impl Balance {
    /// An empty balance sheet with no blocks applied yet.
    pub fn empty() -> Self {
        Balance {
            latest_hash: ZERO_HASH,
            accounts: HashMap::new(),
        }
    }
}

/// Validates `tx` against `balance` without mutating anything.
///
/// - A coinbase (`reference_hash == 0 && sender == 0`) is always valid.
/// - A transaction with exactly one of the two zeroed is a malformed
///   coinbase and is always invalid.
/// - Otherwise the sender must be known to `keychain`, must currently hold
///   `reference_hash` as a spendable coin, and the signature must verify
///   over `reference_hash ∥ receiver`.
pub fn validate_transaction(
    balance: &Balance,
    keychain: &Keychain,
    tx: &Transaction,
) -> Result<(), BalanceError> {
    let is_zero_reference = tx.reference_hash == ZERO_HASH;
    let is_zero_sender = tx.sender == ZERO_HASH;

    if is_zero_reference && is_zero_sender {
        return Ok(());
    }
    if is_zero_reference != is_zero_sender {
        return Err(BalanceError::BadCoinbaseReference);
    }

    let coins = balance
        .accounts
        .get(&tx.sender)
        .filter(|c| !c.is_empty())
        .ok_or(BalanceError::UnknownSender(tx.sender))?;

    if !coins.contains(&tx.reference_hash) {
        return Err(BalanceError::UnknownReference);
    }

    let public_key = keychain
        .get(&tx.sender)
        .ok_or(BalanceError::UnknownAddress)?;

    let mut message = Vec::with_capacity(64);
    message.extend_from_slice(&tx.reference_hash);
    message.extend_from_slice(&tx.receiver);

    if !crate::crypto::verify(&tx.signature, public_key, &message) {
        return Err(BalanceError::BadSignature);
    }

    Ok(())
}

/// Applies an already-validated transaction to `balance`: removes the spent
/// reference from the sender's set (a no-op for coinbase) and credits a
/// freshly computed reference hash to the receiver.
fn apply_transaction(balance: &mut Balance, tx: &Transaction) {
    if tx.sender != ZERO_HASH {
        if let Some(coins) = balance.accounts.get_mut(&tx.sender) {
            if let Some(pos) = coins.iter().position(|r| *r == tx.reference_hash) {
                coins.remove(pos);
            }
        }
    }

    let reference = sha256(&encode_transaction(tx));
    balance.accounts.entry(tx.receiver).or_default().push(reference);
}

/// Validates and applies every transaction of `block` in order, then
/// advances `latest_hash` to the block's own hash. Transactions are applied
/// one at a time against the running balance so that a later transaction in
/// the same block may legitimately spend an earlier one's output.
pub fn apply_block(
    balance: &mut Balance,
    keychain: &Keychain,
    block: &Block,
) -> Result<(), BalanceError> {
    for tx in &block.transactions {
        validate_transaction(balance, keychain, tx)?;
        apply_transaction(balance, tx);
    }
    balance.latest_hash = dhash(&crate::codec::encode_header(&block.header));
    Ok(())
}

/// Replays every block of `chain`, genesis first, into a fresh balance
/// sheet.
pub fn init_balance(chain: &Blockchain) -> Result<Balance, BalanceError> {
    init_balance_with_keychain(chain, &Keychain::new())
}

/// Like [`init_balance`], but validates signatures against `keychain` as it
/// replays. Pass an empty keychain only when replaying chains that carry no
/// non-coinbase transactions (e.g. a bare genesis chain).
pub fn init_balance_with_keychain(
    chain: &Blockchain,
    keychain: &Keychain,
) -> Result<Balance, BalanceError> {
    let mut balance = Balance::empty();
    for hash in &chain.chain {
        let block = chain.blocks.get(hash).expect("chain index is internally consistent");
        apply_block(&mut balance, keychain, block)?;
    }
    Ok(balance)
}
