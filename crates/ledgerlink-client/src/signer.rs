//! Request signing with the adapter's private key.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroize;

use crate::error::ClientError;

/// Ed25519 signer for escrow-store requests.
/// Seed material is zeroized after key construction.
pub struct RequestSigner {
    signing_key: SigningKey,
}

/// Only the public half is ever printed.
impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Create a signer from a hex-encoded 32-byte seed, tolerating a
    /// leading `0x` marker.
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self, ClientError> {
        let body = seed_hex.strip_prefix("0x").unwrap_or(seed_hex);
        let bytes = hex::decode(body).map_err(|e| ClientError::InvalidKey(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(ClientError::InvalidKey(format!(
                "seed must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);
        let signer = Self::from_seed(&seed);
        seed.zeroize();
        Ok(signer)
    }

    /// Sign a request payload, returning the 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// The hex-encoded public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    #[test]
    fn test_sign_verifies() {
        let signer = RequestSigner::from_seed(&[7u8; 32]);
        let msg = b"escrow call payload";
        let sig_bytes = signer.sign(msg);
        assert_eq!(sig_bytes.len(), 64);

        let sig = Signature::from_bytes(&sig_bytes.try_into().unwrap());
        let vk = SigningKey::from_bytes(&[7u8; 32]).verifying_key();
        assert!(vk.verify(msg, &sig).is_ok());
    }

    #[test]
    fn test_from_seed_hex() {
        let signer = RequestSigner::from_seed_hex(&format!("0x{}", "11".repeat(32))).unwrap();
        assert_eq!(signer.public_key_hex().len(), 64);
    }

    #[test]
    fn test_bad_seed_length_rejected() {
        let err = RequestSigner::from_seed_hex("0x1122").unwrap_err();
        assert!(matches!(err, ClientError::InvalidKey(_)));
    }

    #[test]
    fn test_non_hex_seed_rejected() {
        let err = RequestSigner::from_seed_hex("zz").unwrap_err();
        assert!(matches!(err, ClientError::InvalidKey(_)));
    }

    #[test]
    fn test_debug_shows_public_key_only() {
        let signer = RequestSigner::from_seed(&[7u8; 32]);
        let repr = format!("{signer:?}");
        assert!(repr.contains(&signer.public_key_hex()));
        assert!(!repr.contains(&"07".repeat(32)));
    }
}
