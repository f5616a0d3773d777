//! Wire types and their big-endian binary framing (spec C1).
//!
//! This is a hand-rolled codec, not `serde`/`bincode`: the wire layout is
//! part of the contract between nodes, not an artifact of a Rust type's
//! memory layout. The general shape (manual `to_be_bytes`/`from_be_bytes`
//! framing around fixed-size fields) follows the teacher's
//! `BlockHeader::to_bytes` helper in its mining demo binary, generalized
//! into reusable encode/decode pairs.

use crate::crypto::{Hash, SignatureBytes, SIGNATURE_SIZE};
use crate::error::CodecError;

/// Only header version currently understood.
pub const VERSION: u8 = 0;

pub const HASH_SIZE: usize = 32;
/// `reference_hash ∥ sender ∥ receiver ∥ signature`.
pub const TRANSACTION_SIZE: usize = HASH_SIZE * 3 + SIGNATURE_SIZE;
/// `version ∥ previous_hash ∥ merkle_root ∥ timestamp ∥ nonce`.
pub const HEADER_SIZE: usize = 1 + HASH_SIZE + HASH_SIZE + 4 + 32;

/// A signed transfer of one coin from `sender` to `receiver`. A coinbase
/// transaction has `reference_hash` equal to the zero hash and an all-zero
/// signature, and is never independently verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub reference_hash: Hash,
    pub sender: Hash,
    pub receiver: Hash,
    pub signature: SignatureBytes,
}

impl Transaction {
    /// Builds the coinbase transaction that must open every mined block.
    pub fn coinbase(receiver: Hash) -> Self {
        Transaction {
            reference_hash: [0u8; HASH_SIZE],
            sender: [0u8; HASH_SIZE],
            receiver,
            signature: [0u8; SIGNATURE_SIZE],
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.reference_hash == [0u8; HASH_SIZE] && self.sender == [0u8; HASH_SIZE]
    }
}

/// A block header: version, parent link, transaction-set commitment,
/// timestamp, and proof-of-work nonce.
///
/// The nonce is stored on the wire as a 32-byte big-endian integer (the
/// original design's header layout), but is kept in memory as a `u64` — the
/// bounded nonce search (spec C4) never approaches `u64::MAX`, so the wire
/// value is always representable by zero-extending/truncating against the
/// top 24 bytes, which this codec always writes as zero and requires to be
/// zero on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub previous_hash: Hash,
    pub merkle_root: Hash,
    pub timestamp: u32,
    pub nonce: u64,
}

/// A full block: header plus its transaction list, the first of which must
/// be a coinbase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

/// An ordered list of blocks, genesis first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
}

pub fn encode_transaction(tx: &Transaction) -> [u8; TRANSACTION_SIZE] {
    let mut out = [0u8; TRANSACTION_SIZE];
    let mut cursor = 0;
    out[cursor..cursor + HASH_SIZE].copy_from_slice(&tx.reference_hash);
    cursor += HASH_SIZE;
    out[cursor..cursor + HASH_SIZE].copy_from_slice(&tx.sender);
    cursor += HASH_SIZE;
    out[cursor..cursor + HASH_SIZE].copy_from_slice(&tx.receiver);
    cursor += HASH_SIZE;
    out[cursor..cursor + SIGNATURE_SIZE].copy_from_slice(&tx.signature);
    out
}

pub fn decode_transaction(buf: &[u8]) -> Result<Transaction, CodecError> {
    if buf.len() < TRANSACTION_SIZE {
        return Err(CodecError::Truncated {
            need: TRANSACTION_SIZE,
            got: buf.len(),
        });
    }
    let mut cursor = 0;
    let reference_hash = read_hash(buf, &mut cursor);
    let sender = read_hash(buf, &mut cursor);
    let receiver = read_hash(buf, &mut cursor);
    let mut signature = [0u8; SIGNATURE_SIZE];
    signature.copy_from_slice(&buf[cursor..cursor + SIGNATURE_SIZE]);
    Ok(Transaction {
        reference_hash,
        sender,
        receiver,
        signature,
    })
}

fn read_hash(buf: &[u8], cursor: &mut usize) -> Hash {
    let mut hash = [0u8; HASH_SIZE];
    hash.copy_from_slice(&buf[*cursor..*cursor + HASH_SIZE]);
    *cursor += HASH_SIZE;
    hash
}

pub fn encode_header(header: &Header) -> [u8; HEADER_SIZE] {
    let mut out = [0u8; HEADER_SIZE];
    let mut cursor = 0;
    out[cursor] = header.version;
    cursor += 1;
    out[cursor..cursor + HASH_SIZE].copy_from_slice(&header.previous_hash);
    cursor += HASH_SIZE;
    out[cursor..cursor + HASH_SIZE].copy_from_slice(&header.merkle_root);
    cursor += HASH_SIZE;
    out[cursor..cursor + 4].copy_from_slice(&header.timestamp.to_be_bytes());
    cursor += 4;
    // 32-byte big-endian nonce, zero-extended from the in-memory u64.
    out[cursor + 24..cursor + 32].copy_from_slice(&header.nonce.to_be_bytes());
    out
}

pub fn decode_header(buf: &[u8]) -> Result<Header, CodecError> {
    if buf.len() < HEADER_SIZE {
        return Err(CodecError::Truncated {
            need: HEADER_SIZE,
            got: buf.len(),
        });
    }
    let mut cursor = 0;
    let version = buf[cursor];
    if version != VERSION {
        return Err(CodecError::UnknownVersion(version));
    }
    cursor += 1;
    let previous_hash = read_hash(buf, &mut cursor);
    let merkle_root = read_hash(buf, &mut cursor);
    let mut ts = [0u8; 4];
    ts.copy_from_slice(&buf[cursor..cursor + 4]);
    let timestamp = u32::from_be_bytes(ts);
    cursor += 4;
    let nonce_field = &buf[cursor..cursor + 32];
    if nonce_field[..24] != [0u8; 24] {
        return Err(CodecError::NonceOverflow);
    }
    let mut nonce_be = [0u8; 8];
    nonce_be.copy_from_slice(&nonce_field[24..32]);
    let nonce = u64::from_be_bytes(nonce_be);
    Ok(Header {
        version,
        previous_hash,
        merkle_root,
        timestamp,
        nonce,
    })
}

/// Blocks are framed as `size:u32-BE ∥ header(101B) ∥ tx_count:u8 ∥
/// tx_count × transaction(168B)`.
///
/// The original design specifies a one-byte size prefix, sized for a much
/// smaller per-transaction encoding (a 36-byte transaction with bare port
/// numbers for sender/receiver, see the original implementation's early
/// `transactions.py`). Once addresses became full 32-byte hashes and
/// transactions carry a 72-byte signature, a single block with only its
/// mandatory coinbase transaction already needs 271 bytes — more than a
/// `u8` can express. Rather than silently wrap (which would make
/// `decode_chain` ambiguous, since a wrapped size can collide with a
/// smaller real block), this codec widens the prefix to `u32`-BE. Every
/// other field keeps its specified width and position.
pub fn encode_block(block: &Block) -> Result<Vec<u8>, CodecError> {
    let tx_count = block.transactions.len();
    let body_len = HEADER_SIZE + 1 + tx_count * TRANSACTION_SIZE;
    let total_len = 4 + body_len;
    let size = u32::try_from(body_len).map_err(|_| CodecError::BlockTooLarge(body_len))?;

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(&encode_header(&block.header));
    out.push(tx_count as u8);
    for tx in &block.transactions {
        out.extend_from_slice(&encode_transaction(tx));
    }
    Ok(out)
}

/// Decodes a single framed block from the front of `buf`, returning the
/// block and the number of bytes consumed.
pub fn decode_block(buf: &[u8]) -> Result<(Block, usize), CodecError> {
    if buf.len() < 4 {
        return Err(CodecError::Truncated {
            need: 4,
            got: buf.len(),
        });
    }
    let mut size_bytes = [0u8; 4];
    size_bytes.copy_from_slice(&buf[0..4]);
    let body_len = u32::from_be_bytes(size_bytes) as usize;
    if body_len == 0 {
        return Err(CodecError::ZeroLengthBlock);
    }
    let total_len = 4 + body_len;
    if buf.len() < total_len {
        return Err(CodecError::Truncated {
            need: total_len,
            got: buf.len(),
        });
    }
    let body = &buf[4..total_len];
    if body.len() < HEADER_SIZE + 1 {
        return Err(CodecError::Truncated {
            need: HEADER_SIZE + 1,
            got: body.len(),
        });
    }
    let header = decode_header(&body[..HEADER_SIZE])?;
    let tx_count = body[HEADER_SIZE] as usize;
    let tx_bytes = &body[HEADER_SIZE + 1..];
    if tx_bytes.len() < tx_count * TRANSACTION_SIZE {
        return Err(CodecError::TransactionCountMismatch {
            declared: tx_count,
            available: tx_bytes.len(),
        });
    }
    let mut transactions = Vec::with_capacity(tx_count);
    for i in 0..tx_count {
        let start = i * TRANSACTION_SIZE;
        transactions.push(decode_transaction(&tx_bytes[start..start + TRANSACTION_SIZE])?);
    }
    Ok((Block { header, transactions }, total_len))
}

/// Encodes a full chain as the concatenation of its framed blocks.
pub fn encode_chain(chain: &Blockchain) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    for block in &chain.blocks {
        out.extend_from_slice(&encode_block(block)?);
    }
    Ok(out)
}

/// Decodes a full chain, walking the buffer block by block until every byte
/// is consumed. Total: any decode failure is propagated rather than
/// producing a partial chain.
pub fn decode_chain(buf: &[u8]) -> Result<Blockchain, CodecError> {
    let mut blocks = Vec::new();
    let mut cursor = 0;
    while cursor < buf.len() {
        let (block, consumed) = decode_block(&buf[cursor..])?;
        blocks.push(block);
        cursor += consumed;
    }
    Ok(Blockchain { blocks })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            version: VERSION,
            previous_hash: [0u8; 32],
            merkle_root: [7u8; 32],
            timestamp: 1_634_700_000,
            nonce: 102_275,
        }
    }

    #[test]
    fn header_round_trips() {
        let header = sample_header();
        let encoded = encode_header(&header);
        assert_eq!(encoded.len(), HEADER_SIZE);
        let decoded = decode_header(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_decode_rejects_truncation() {
        let encoded = encode_header(&sample_header());
        let err = decode_header(&encoded[..HEADER_SIZE - 1]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn header_decode_rejects_nonzero_high_nonce_bytes() {
        let mut encoded = encode_header(&sample_header());
        // version(1) + previous_hash(32) + merkle_root(32) + timestamp(4) =
        // 69: the nonce field starts there and its high 24 bytes (69..93)
        // must always be zero.
        encoded[70] = 1;
        let err = decode_header(&encoded).unwrap_err();
        assert!(matches!(err, CodecError::NonceOverflow));
    }

    #[test]
    fn header_decode_rejects_unknown_version() {
        let mut encoded = encode_header(&sample_header());
        encoded[0] = 9;
        let err = decode_header(&encoded).unwrap_err();
        assert!(matches!(err, CodecError::UnknownVersion(9)));
    }

    #[test]
    fn transaction_round_trips() {
        let tx = Transaction {
            reference_hash: [1u8; 32],
            sender: [2u8; 32],
            receiver: [3u8; 32],
            signature: [4u8; SIGNATURE_SIZE],
        };
        let encoded = encode_transaction(&tx);
        assert_eq!(encoded.len(), TRANSACTION_SIZE);
        assert_eq!(decode_transaction(&encoded).unwrap(), tx);
    }

    #[test]
    fn block_round_trips_with_coinbase_only() {
        let block = Block {
            header: sample_header(),
            transactions: vec![Transaction::coinbase([9u8; 32])],
        };
        let encoded = encode_block(&block).unwrap();
        let (decoded, consumed) = decode_block(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, block);
    }

    #[test]
    fn chain_round_trips_across_multiple_blocks() {
        let genesis = Block {
            header: sample_header(),
            transactions: vec![Transaction::coinbase([1u8; 32])],
        };
        let mut second_header = sample_header();
        second_header.previous_hash = dhash_of(&genesis.header);
        second_header.nonce = 22_025;
        let second = Block {
            header: second_header,
            transactions: vec![
                Transaction::coinbase([2u8; 32]),
                Transaction {
                    reference_hash: [5u8; 32],
                    sender: [1u8; 32],
                    receiver: [2u8; 32],
                    signature: [6u8; SIGNATURE_SIZE],
                },
            ],
        };
        let chain = Blockchain {
            blocks: vec![genesis, second],
        };
        let encoded = encode_chain(&chain).unwrap();
        let decoded = decode_chain(&encoded).unwrap();
        assert_eq!(decoded, chain);
    }

    fn dhash_of(header: &Header) -> Hash {
        crate::crypto::dhash(&encode_header(header))
    }

    #[test]
    fn decode_chain_rejects_zero_length_block() {
        let bytes = 0u32.to_be_bytes();
        let err = decode_chain(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::ZeroLengthBlock));
    }

    #[rstest::rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    #[case(36)]
    fn block_round_trips_at_various_transaction_counts(#[case] tx_count: u8) {
        let mut transactions = vec![Transaction::coinbase([1u8; 32])];
        for i in 1..tx_count {
            transactions.push(Transaction {
                reference_hash: [i; 32],
                sender: [i.wrapping_add(1); 32],
                receiver: [i.wrapping_add(2); 32],
                signature: [i; SIGNATURE_SIZE],
            });
        }
        let block = Block {
            header: sample_header(),
            transactions,
        };
        let encoded = encode_block(&block).unwrap();
        let (decoded, consumed) = decode_block(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, block);
    }
}
