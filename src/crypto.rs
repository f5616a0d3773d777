//! Hashing, signing and addressing (spec C2).
//!
//! Hashes are plain SHA-256; `dhash` is the double-hash used for block and
//! genesis identity. Signing is ECDSA over secp256k1 (`k256`), mirroring the
//! original implementation's `cryptography.hazmat` pipeline: SHA-256 digest,
//! DER-encoded signature, SPKI/PEM public keys and PKCS8/PEM private keys.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand_core::OsRng;
use sha2::{Digest, Sha256};

use crate::error::WalletError;

/// A 32-byte hash, used for both block/transaction identity and addresses.
pub type Hash = [u8; 32];

/// A DER-encoded ECDSA signature, right-padded with zero bytes to a fixed
/// width so that transactions have a constant wire size.
pub const SIGNATURE_SIZE: usize = 72;
pub type SignatureBytes = [u8; SIGNATURE_SIZE];

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice, used wherever the spec calls for a block or
/// genesis identity hash.
pub fn dhash(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

/// Generates a fresh secp256k1 keypair.
pub fn generate_keypair() -> (SigningKey, VerifyingKey) {
    let signing_key = SigningKey::random(&mut OsRng);
    let verifying_key = *signing_key.verifying_key();
    (signing_key, verifying_key)
}

/// An address is the SHA-256 hash of a public key's SPKI/PEM encoding.
pub fn address(public_key: &VerifyingKey) -> Hash {
    let pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .expect("secp256k1 public keys always encode to PEM");
    sha256(pem.as_bytes())
}

/// Signs `message` with `signing_key`, returning a fixed-width, zero-padded
/// DER signature.
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> SignatureBytes {
    let signature: Signature = signing_key.sign(message);
    let der = signature.to_der();
    let der_bytes = der.as_bytes();
    let mut out = [0u8; SIGNATURE_SIZE];
    let n = der_bytes.len().min(SIGNATURE_SIZE);
    out[..n].copy_from_slice(&der_bytes[..n]);
    out
}

/// Recovers the true DER length of a zero-padded signature by reading its
/// own SEQUENCE length byte, so the trailing zero padding can be stripped
/// before handing the bytes to a strict DER parser.
fn der_len(buf: &SignatureBytes) -> Option<usize> {
    if buf[0] != 0x30 {
        return None;
    }
    let len = buf[1];
    if len & 0x80 != 0 {
        // Long-form lengths never occur for secp256k1 ECDSA signatures.
        return None;
    }
    let total = 2 + len as usize;
    if total > buf.len() {
        return None;
    }
    Some(total)
}

/// Verifies a fixed-width signature against `message` and `public_key`.
/// Total: malformed or non-matching signatures simply return `false`.
pub fn verify(signature: &SignatureBytes, public_key: &VerifyingKey, message: &[u8]) -> bool {
    let Some(len) = der_len(signature) else {
        return false;
    };
    let Ok(sig) = Signature::from_der(&signature[..len]) else {
        return false;
    };
    public_key.verify(message, &sig).is_ok()
}

/// Serializes a signing key to PKCS8/PEM, as the original implementation's
/// `save_keys` writes `{prefix}private.pem`.
pub fn encode_private_key(signing_key: &SigningKey) -> Result<String, WalletError> {
    signing_key
        .to_pkcs8_pem(LineEnding::LF)
        .map(|pem| pem.to_string())
        .map_err(|e| WalletError::Pem(e.to_string()))
}

/// Serializes a public key to SPKI/PEM, as `save_keys` writes
/// `{prefix}public.pem`.
pub fn encode_public_key(verifying_key: &VerifyingKey) -> Result<String, WalletError> {
    verifying_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| WalletError::Pem(e.to_string()))
}

/// Parses a PKCS8/PEM private key.
pub fn decode_private_key(pem: &str) -> Result<SigningKey, WalletError> {
    SigningKey::from_pkcs8_pem(pem).map_err(|e| WalletError::Pem(e.to_string()))
}

/// Parses an SPKI/PEM public key.
pub fn decode_public_key(pem: &str) -> Result<VerifyingKey, WalletError> {
    VerifyingKey::from_public_key_pem(pem).map_err(|e| WalletError::Pem(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_32_bytes_and_deterministic() {
        let a = sha256(b"hello");
        let b = sha256(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn dhash_is_sha256_of_sha256() {
        let expected = sha256(&sha256(b"readcoin"));
        assert_eq!(dhash(b"readcoin"), expected);
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let (sk, pk) = generate_keypair();
        let msg = b"transfer one coin";
        let sig = sign(&sk, msg);
        assert!(verify(&sig, &pk, msg));
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let (sk, pk) = generate_keypair();
        let sig = sign(&sk, b"original");
        assert!(!verify(&sig, &pk, b"tampered"));
    }

    #[test]
    fn verify_rejects_garbage_signature() {
        let (_, pk) = generate_keypair();
        let garbage = [0u8; SIGNATURE_SIZE];
        assert!(!verify(&garbage, &pk, b"anything"));
    }

    #[test]
    fn address_is_deterministic_for_same_key() {
        let (_, pk) = generate_keypair();
        assert_eq!(address(&pk), address(&pk));
    }

    #[test]
    fn pem_round_trips_through_encode_decode() {
        let (sk, pk) = generate_keypair();
        let priv_pem = encode_private_key(&sk).unwrap();
        let pub_pem = encode_public_key(&pk).unwrap();

        let sk2 = decode_private_key(&priv_pem).unwrap();
        let pk2 = decode_public_key(&pub_pem).unwrap();

        assert_eq!(address(&pk), address(&pk2));
        let msg = b"round trip";
        assert!(verify(&sign(&sk2, msg), &pk, msg));
    }
}
