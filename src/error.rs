//! Crate-wide error types, one enum per concern, following the same shape as
//! the teacher's error module: a `thiserror`-derived enum with one variant
//! per failure kind, each carrying enough context to log usefully.

use thiserror::Error;

/// Errors raised while encoding or decoding the wire format (spec C1).
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("buffer too short: need at least {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },

    #[error("unknown header version {0}")]
    UnknownVersion(u8),

    #[error("block declares {declared} transactions but only {available} bytes remain")]
    TransactionCountMismatch { declared: usize, available: usize },

    #[error("chain entry size {0} exceeds the maximum frame size")]
    BlockTooLarge(usize),

    #[error("chain frame declares zero-length block")]
    ZeroLengthBlock,

    #[error("header nonce field's high 24 bytes are non-zero and would be silently truncated")]
    NonceOverflow,
}

/// Errors raised while validating blocks or chains (spec C5).
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("block header hash does not meet the required proof-of-work target")]
    InsufficientWork,

    #[error("block declares no transactions")]
    EmptyBlock,

    #[error("first transaction of a block is not a coinbase")]
    MissingCoinbase,

    #[error("block contains more than one coinbase transaction")]
    DuplicateCoinbase,

    #[error("merkle root in header does not match the block's transactions")]
    MerkleMismatch,

    #[error("block's previous_hash does not match any known chain tip")]
    UnknownParent,

    #[error("chain is empty")]
    EmptyChain,

    #[error("genesis block does not match the expected constant")]
    BadGenesis,

    #[error("base balance's latest hash is not present in the candidate chain")]
    UnknownBase,

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Errors raised while applying transactions to a balance sheet (spec C6).
#[derive(Error, Debug)]
pub enum BalanceError {
    #[error("sender address {0:?} is not known to this balance sheet")]
    UnknownSender([u8; 32]),

    #[error("reference hash is not among the sender's spendable coins")]
    UnknownReference,

    #[error("transaction signature does not verify against the sender's public key")]
    BadSignature,

    #[error("sender address has no registered public key in the wallet book")]
    UnknownAddress,

    #[error("coinbase transaction must reference the zero hash")]
    BadCoinbaseReference,
}

/// Errors raised while loading or saving wallet material (spec C7).
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("failed to read key material: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse PEM key material: {0}")]
    Pem(String),
}

/// Errors raised while starting or running a node or the injector (spec C8/C9).
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("failed to bind UDP socket: {0}")]
    BindFailed(std::io::Error),

    #[error("unrecognized command-line arguments")]
    BadCli,

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
