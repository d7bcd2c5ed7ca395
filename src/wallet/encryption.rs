//! Password-based encryption of wallet private keys.
//!
//! The encrypted private key is a hex string of the following layout:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       4   m_cost (u32 LE)
//!   4       4   t_cost (u32 LE)
//!   8       4   p_cost (u32 LE)
//!  12      16   salt
//!  28      24   XChaCha20-Poly1305 nonce
//!  52      48   ciphertext of the 32-byte secret key + 16-byte tag
//! ```
//!
//! The key is derived with Argon2id. The KDF parameters travel with the
//! ciphertext and are authenticated as associated data, so a key encrypted
//! under one configuration still decrypts after the configuration changes.

use crate::error::CryptoError;
use crate::wallet::KeyPair;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Minimum password length in characters
pub const MIN_PASSWORD_LEN: usize = 8;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const PARAMS_LEN: usize = 12;
const HEADER_LEN: usize = PARAMS_LEN + SALT_LEN + NONCE_LEN;
const TAG_LEN: usize = 16;
const SECRET_LEN: usize = 32;

// Upper bounds on KDF parameters read from a blob: 1 GiB, 16 passes, 8 lanes
const MAX_M_COST: u32 = 1 << 20;
const MAX_T_COST: u32 = 16;
const MAX_P_COST: u32 = 8;

/// Argon2id parameters used when encrypting a private key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub m_cost: u32,
    /// Number of passes
    pub t_cost: u32,
    /// Degree of parallelism
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 65_536, // 64 MiB
            t_cost: 3,
            p_cost: 1,
        }
    }
}

impl KdfParams {
    fn to_bytes(self) -> [u8; PARAMS_LEN] {
        let mut bytes = [0u8; PARAMS_LEN];
        bytes[0..4].copy_from_slice(&self.m_cost.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.t_cost.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.p_cost.to_le_bytes());
        bytes
    }

    /// Reject parameters above the supported ceiling before any memory is
    /// committed to key derivation
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.m_cost > MAX_M_COST {
            return Err(CryptoError::InvalidKdfParams(format!(
                "memory cost {} KiB exceeds {} KiB",
                self.m_cost, MAX_M_COST
            )));
        }
        if self.t_cost > MAX_T_COST {
            return Err(CryptoError::InvalidKdfParams(format!(
                "{} passes exceeds {}",
                self.t_cost, MAX_T_COST
            )));
        }
        if self.p_cost > MAX_P_COST {
            return Err(CryptoError::InvalidKdfParams(format!(
                "{} lanes exceeds {}",
                self.p_cost, MAX_P_COST
            )));
        }
        Ok(())
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let word = |i: usize| {
            let mut w = [0u8; 4];
            w.copy_from_slice(&bytes[i..i + 4]);
            u32::from_le_bytes(w)
        };
        Self {
            m_cost: word(0),
            t_cost: word(4),
            p_cost: word(8),
        }
    }
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct DerivedKey([u8; 32]);

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`]
pub fn validate_password(password: &str) -> Result<(), CryptoError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CryptoError::WeakPassword {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

fn derive_key(password: &str, salt: &[u8], params: &KdfParams) -> Result<DerivedKey, CryptoError> {
    params.validate()?;
    let argon2_params = argon2::Params::new(params.m_cost, params.t_cost, params.p_cost, Some(32))
        .map_err(|e| CryptoError::InvalidKdfParams(e.to_string()))?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let mut key = DerivedKey([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key.0)
        .map_err(|e| CryptoError::InvalidKdfParams(e.to_string()))?;

    Ok(key)
}

/// Encrypt the private half of `keypair` under `password`
pub fn encrypt_private_key(
    keypair: &KeyPair,
    password: &str,
    params: &KdfParams,
) -> Result<String, CryptoError> {
    validate_password(password)?;

    let secret = Zeroizing::new(keypair.secret_bytes().ok_or(CryptoError::NoPrivateKey)?);

    let mut header = [0u8; HEADER_LEN];
    header[..PARAMS_LEN].copy_from_slice(&params.to_bytes());
    OsRng.fill_bytes(&mut header[PARAMS_LEN..]);

    let salt = &header[PARAMS_LEN..PARAMS_LEN + SALT_LEN];
    let nonce = &header[PARAMS_LEN + SALT_LEN..];
    let key = derive_key(password, salt, params)?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key.0));
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: secret.as_slice(),
                aad: &header[..PARAMS_LEN + SALT_LEN],
            },
        )
        .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;

    let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    blob.extend_from_slice(&header);
    blob.extend_from_slice(&ciphertext);

    Ok(hex::encode(blob))
}

/// Decrypt an encrypted private key with `password`
pub fn decrypt_private_key(encrypted: &str, password: &str) -> Result<KeyPair, CryptoError> {
    if encrypted.is_empty() {
        return Err(CryptoError::WalletLocked);
    }

    let blob = hex::decode(encrypted).map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;
    if blob.len() != HEADER_LEN + SECRET_LEN + TAG_LEN {
        return Err(CryptoError::MalformedCiphertext(format!(
            "expected {} bytes, got {}",
            HEADER_LEN + SECRET_LEN + TAG_LEN,
            blob.len()
        )));
    }

    let params = KdfParams::from_bytes(&blob[..PARAMS_LEN]);
    let salt = &blob[PARAMS_LEN..PARAMS_LEN + SALT_LEN];
    let nonce = &blob[PARAMS_LEN + SALT_LEN..HEADER_LEN];
    let key = derive_key(password, salt, &params)?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key.0));
    let secret = Zeroizing::new(
        cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: &blob[HEADER_LEN..],
                    aad: &blob[..PARAMS_LEN + SALT_LEN],
                },
            )
            .map_err(|_| CryptoError::BadPassword)?,
    );

    KeyPair::from_secret_bytes(&secret)
}

#[cfg(test)]
pub(crate) fn test_params() -> KdfParams {
    KdfParams {
        m_cost: 256,
        t_cost: 1,
        p_cost: 1,
    }
}
