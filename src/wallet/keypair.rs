// Wallet identity key pair

use crate::core::{BlankedSignature, Signable, sha256_hash};
use crate::error::{CryptoError, Result};
use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;

/// Key pair, possibly public-only (locked)
#[derive(Clone)]
pub struct KeyPair {
    secret_key: Option<SecretKey>,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let mut rng = OsRng;

        let secret_key = SecretKey::new(&mut rng);
        let public_key = secret_key.public_key(&secp);

        Self {
            secret_key: Some(secret_key),
            public_key,
        }
    }

    /// Import a public key string; the result can only verify
    pub fn from_public_key_str(pub_key: &str) -> std::result::Result<Self, CryptoError> {
        let bytes = hex::decode(pub_key)
            .map_err(|e| CryptoError::InvalidKey(format!("public key is not hex: {}", e)))?;
        let public_key = PublicKey::from_slice(&bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        Ok(Self {
            secret_key: None,
            public_key,
        })
    }

    /// Create from secret key bytes
    pub(crate) fn from_secret_bytes(bytes: &[u8]) -> std::result::Result<Self, CryptoError> {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let public_key = secret_key.public_key(&secp);

        Ok(Self {
            secret_key: Some(secret_key),
            public_key,
        })
    }

    /// Raw secret key bytes, if present
    pub(crate) fn secret_bytes(&self) -> Option<[u8; 32]> {
        self.secret_key.map(|sk| sk.secret_bytes())
    }

    /// Public key as a string (hex of the compressed point)
    pub fn public_key_string(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Whether the private key is loaded
    pub fn has_private_key(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Copy without the private key
    pub fn public_only(&self) -> Self {
        Self {
            secret_key: None,
            public_key: self.public_key,
        }
    }

    /// Sign SHA256(data), returning the hex compact signature
    pub fn sign(&self, data: &[u8]) -> std::result::Result<String, CryptoError> {
        let secret_key = self.secret_key.as_ref().ok_or(CryptoError::NoPrivateKey)?;

        let secp = Secp256k1::new();
        let message = Message::from_digest(sha256_hash(data));
        let signature = secp.sign_ecdsa(&message, secret_key);

        Ok(hex::encode(signature.serialize_compact()))
    }

    /// Verify a hex signature over SHA256(data).
    ///
    /// A well-formed signature that does not match yields `Ok(false)`;
    /// only an undecodable signature string is an error.
    pub fn verify(&self, data: &[u8], signature: &str) -> std::result::Result<bool, CryptoError> {
        let bytes = hex::decode(signature)
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        let signature = Signature::from_compact(&bytes)
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;

        let secp = Secp256k1::new();
        let message = Message::from_digest(sha256_hash(data));

        Ok(secp.verify_ecdsa(&message, &signature, &self.public_key).is_ok())
    }

    /// Sign an entity's canonical form and store the signature in it
    pub fn sign_entity<T: Signable + ?Sized>(&self, entity: &mut T) -> Result<()> {
        if entity.is_signed() {
            return Err(CryptoError::AlreadySigned.into());
        }

        let canonical = entity.canonical_form(false)?;
        let signature = self.sign(canonical.as_bytes())?;
        *entity.signature_mut() = signature;

        Ok(())
    }

    /// Verify an entity's signature against its canonical form.
    ///
    /// The signature field is blanked for the duration of the check and
    /// restored afterwards on every path.
    pub fn verify_entity<T: Signable + ?Sized>(&self, entity: &mut T) -> Result<bool> {
        if !entity.is_signed() {
            return Err(CryptoError::MissingSignature.into());
        }

        let blanked = BlankedSignature::new(entity);
        let canonical = blanked.canonical_form(false)?;
        let valid = self.verify(canonical.as_bytes(), blanked.saved())?;

        Ok(valid)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_string())
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}
