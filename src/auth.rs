//! Wallet signature verification.
//!
//! Users prove control of an address by signing a fixed message with the
//! standard `personal_sign` scheme. Verification recovers the signer from the
//! signature and compares it to the claimed address; nothing here touches the
//! network.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Message every wallet signs to authenticate
pub const SIGN_MESSAGE: &str = "I am verifying my identity to use the Web3 Article Summarizer";

const PERSONAL_SIGN_PREFIX: &str = "\x19Ethereum Signed Message:\n";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("empty signature provided")]
    EmptySignature,
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// The message a client must present to the user for signing
pub fn message_to_sign() -> &'static str {
    SIGN_MESSAGE
}

/// Recovers signers of [`SIGN_MESSAGE`] and matches them against claimed addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    pub fn new() -> Self {
        Self
    }

    pub fn message(&self) -> &'static str {
        SIGN_MESSAGE
    }

    /// Check that `signature` over the fixed message was produced by `wallet_address`.
    ///
    /// Malformed input (empty signature, bad address, undecodable signature)
    /// is an [`AuthError`]. A well-formed signature from another key is `Ok(false)`.
    pub fn verify(&self, wallet_address: &str, signature: &str) -> Result<bool, AuthError> {
        let expected = checksum_address(wallet_address)?;
        let (signature, recovery_id) = parse_signature(signature)?;
        let digest = personal_digest(SIGN_MESSAGE);

        match VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id) {
            Ok(key) => {
                let recovered = address_of(&key);
                tracing::debug!(%recovered, %expected, "recovered signer");
                Ok(recovered.eq_ignore_ascii_case(&expected))
            }
            Err(e) => {
                tracing::debug!(error = %e, "public key recovery failed");
                Ok(false)
            }
        }
    }
}

/// Normalize an address to its EIP-55 mixed-case form
pub fn checksum_address(address: &str) -> Result<String, AuthError> {
    let hex_part = strip_hex_prefix(address.trim());

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AuthError::InvalidAddress(address.to_string()));
    }

    Ok(to_checksum(&hex_part.to_ascii_lowercase()))
}

/// Checksummed address of a public key
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag
    let hash = keccak256(&point.as_bytes()[1..]);
    to_checksum(&hex::encode(&hash[12..]))
}

/// Sign [`SIGN_MESSAGE`] the way a wallet's `personal_sign` does.
///
/// Returns `0x`-prefixed `r || s || v` with `v` in {27, 28}.
pub fn sign_message(key: &SigningKey) -> Result<String, AuthError> {
    let digest = personal_digest(SIGN_MESSAGE);
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| AuthError::SigningFailed(e.to_string()))?;

    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Parse a hex private key, with or without `0x`
pub fn signing_key_from_hex(private_key: &str) -> Result<SigningKey, AuthError> {
    let raw = strip_hex_prefix(private_key.trim());
    let bytes = hex::decode(raw).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
    SigningKey::from_slice(&bytes).map_err(|e| AuthError::InvalidKey(e.to_string()))
}

fn parse_signature(signature: &str) -> Result<(Signature, RecoveryId), AuthError> {
    let trimmed = signature.trim();
    if trimmed.is_empty() {
        return Err(AuthError::EmptySignature);
    }

    let bytes = hex::decode(strip_hex_prefix(trimmed))
        .map_err(|e| AuthError::MalformedSignature(format!("not hex: {}", e)))?;
    if bytes.len() != 65 {
        return Err(AuthError::MalformedSignature(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }

    // Wallets emit v as 27/28, some libraries as 0/1
    let v = bytes[64];
    let v = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| AuthError::MalformedSignature(format!("invalid recovery id {}", bytes[64])))?;

    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| AuthError::MalformedSignature(e.to_string()))?;

    Ok((signature, recovery_id))
}

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

fn personal_digest(message: &str) -> [u8; 32] {
    let mut data = format!("{}{}", PERSONAL_SIGN_PREFIX, message.len()).into_bytes();
    data.extend_from_slice(message.as_bytes());
    keccak256(&data)
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn to_checksum(lower_hex: &str) -> String {
    let hash = keccak256(lower_hex.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower_hex.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    #[test]
    fn checksum_matches_known_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            assert_eq!(checksum_address(&expected.to_lowercase()).unwrap(), expected);
            assert_eq!(checksum_address(&expected.to_uppercase()[2..]).unwrap(), expected);
        }
    }

    #[test]
    fn address_of_private_key_one() {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let key = SigningKey::from_slice(&secret).unwrap();
        assert_eq!(
            address_of(key.verifying_key()),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn signed_message_verifies_for_signer() {
        let verifier = SignatureVerifier::new();
        for seed in [0x11, 0x42, 0x7f] {
            let key = key(seed);
            let address = address_of(key.verifying_key());
            let signature = sign_message(&key).unwrap();

            assert_eq!(verifier.verify(&address, &signature), Ok(true));
            assert_eq!(verifier.verify(&address.to_lowercase(), &signature), Ok(true));
            // Deterministic
            assert_eq!(verifier.verify(&address, &signature), Ok(true));
        }
    }

    #[test]
    fn signature_from_other_key_is_rejected() {
        let verifier = SignatureVerifier::new();
        let signature = sign_message(&key(0x11)).unwrap();
        let other = address_of(key(0x22).verifying_key());
        assert_eq!(verifier.verify(&other, &signature), Ok(false));
    }

    #[test]
    fn prefix_and_recovery_byte_variants_are_accepted() {
        let verifier = SignatureVerifier::new();
        let key = key(0x33);
        let address = address_of(key.verifying_key());
        let signature = sign_message(&key).unwrap();

        let bare = &signature[2..];
        assert_eq!(verifier.verify(&address, bare), Ok(true));
        assert_eq!(verifier.verify(&address, &format!("0X{}", bare)), Ok(true));

        let mut bytes = hex::decode(bare).unwrap();
        bytes[64] -= 27;
        assert_eq!(verifier.verify(&address, &hex::encode(&bytes)), Ok(true));
    }

    #[test]
    fn tampered_signature_does_not_verify() {
        let verifier = SignatureVerifier::new();
        let key = key(0x44);
        let address = address_of(key.verifying_key());
        let mut bytes = hex::decode(&sign_message(&key).unwrap()[2..]).unwrap();
        bytes[64] = if bytes[64] == 27 { 28 } else { 27 };

        let result = verifier.verify(&address, &hex::encode(&bytes));
        assert_ne!(result, Ok(true));
    }

    #[test]
    fn malformed_input_fails_closed() {
        let verifier = SignatureVerifier::new();
        let address = address_of(key(0x55).verifying_key());

        assert_eq!(verifier.verify(&address, ""), Err(AuthError::EmptySignature));
        assert_eq!(verifier.verify(&address, "   "), Err(AuthError::EmptySignature));
        assert!(matches!(
            verifier.verify(&address, "0xnothex"),
            Err(AuthError::MalformedSignature(_))
        ));
        assert!(matches!(
            verifier.verify(&address, "0x1234"),
            Err(AuthError::MalformedSignature(_))
        ));

        let mut bytes = vec![0x01; 65];
        bytes[64] = 40;
        assert!(matches!(
            verifier.verify(&address, &hex::encode(&bytes)),
            Err(AuthError::MalformedSignature(_))
        ));

        let signature = sign_message(&key(0x55)).unwrap();
        assert!(matches!(
            verifier.verify("0x1234", &signature),
            Err(AuthError::InvalidAddress(_))
        ));
        assert!(matches!(
            verifier.verify("not an address at all, not even close!!!", &signature),
            Err(AuthError::InvalidAddress(_))
        ));
    }

    #[test]
    fn signing_key_parses_with_and_without_prefix() {
        let hex_key = "11".repeat(32);
        let a = signing_key_from_hex(&hex_key).unwrap();
        let b = signing_key_from_hex(&format!("0x{}", hex_key)).unwrap();
        let c = signing_key_from_hex(&format!("0X{}", hex_key)).unwrap();
        assert_eq!(a.verifying_key(), b.verifying_key());
        assert_eq!(a.verifying_key(), c.verifying_key());
        assert!(matches!(signing_key_from_hex("zz"), Err(AuthError::InvalidKey(_))));
    }

    #[test]
    fn message_is_exposed() {
        assert_eq!(message_to_sign(), SIGN_MESSAGE);
        assert_eq!(SignatureVerifier::new().message(), SIGN_MESSAGE);
    }
}
