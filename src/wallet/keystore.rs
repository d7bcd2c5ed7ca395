// Wallet records and wallet files

use crate::core::{Quant, Signable};
use crate::error::{CryptoError, Result};
use crate::wallet::{KdfParams, KeyPair, decrypt_private_key, encrypt_private_key, validate_password};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Wallet - a public key identity, optionally owned (encrypted private key on record)
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub pub_key: String,
    /// Empty string when the private key is not known locally
    #[serde(default)]
    pub priv_key_encrypted: String,
    #[serde(default)]
    pub balance: Quant,
    /// Store-assigned id, 0 until persisted
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    identity: Option<KeyPair>,
}

impl Wallet {
    /// Create a new owned wallet with a freshly generated key pair.
    ///
    /// The new wallet starts unlocked with a zero balance.
    pub fn create(name: &str, email: &str, password: &str, kdf: &KdfParams) -> Result<Self> {
        validate_password(password)?;

        let keypair = KeyPair::generate();
        let priv_key_encrypted = encrypt_private_key(&keypair, password, kdf)?;

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            pub_key: keypair.public_key_string(),
            priv_key_encrypted,
            balance: 0,
            id: 0,
            identity: Some(keypair),
        })
    }

    /// Wallet known only by its public key (another party or a node)
    pub fn from_public_key(name: &str, email: &str, pub_key: &str, balance: Quant) -> Result<Self> {
        let keypair = KeyPair::from_public_key_str(pub_key)?;

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            pub_key: pub_key.to_string(),
            priv_key_encrypted: String::new(),
            balance,
            id: 0,
            identity: Some(keypair),
        })
    }

    /// Rebuild a persisted wallet row; the key is parsed lazily on use
    pub(crate) fn from_record(
        id: i64,
        name: String,
        email: String,
        pub_key: String,
        priv_key_encrypted: String,
        balance: Quant,
    ) -> Self {
        Self {
            name,
            email,
            pub_key,
            priv_key_encrypted,
            balance,
            id,
            identity: None,
        }
    }

    /// Parse a wallet document, checking the public key is usable
    pub fn from_json(json: &str) -> Result<Self> {
        let mut wallet: Wallet = serde_json::from_str(json)?;
        wallet.identity = Some(KeyPair::from_public_key_str(&wallet.pub_key)?);
        Ok(wallet)
    }

    /// Serialize the wallet document
    pub fn to_json(&self, indent: bool) -> Result<String> {
        crate::core::to_json(self, indent)
    }

    /// Whether the encrypted private key is on record
    pub fn is_owned(&self) -> bool {
        !self.priv_key_encrypted.is_empty()
    }

    /// Whether the private key is loaded in memory
    pub fn is_unlocked(&self) -> bool {
        self.identity.as_ref().is_some_and(KeyPair::has_private_key)
    }

    /// Decrypt the private key and keep it in memory
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        let keypair = self.decrypt(password)?;
        self.identity = Some(keypair);
        Ok(())
    }

    /// Drop the private key from memory
    pub fn lock(&mut self) {
        self.identity = self.identity.as_ref().map(KeyPair::public_only);
    }

    /// Re-encrypt the private key under a new password.
    ///
    /// Leaves the lock state unchanged.
    pub fn change_password(&mut self, current: &str, new: &str, kdf: &KdfParams) -> Result<()> {
        validate_password(new)?;
        let keypair = self.decrypt(current)?;
        self.priv_key_encrypted = encrypt_private_key(&keypair, new, kdf)?;
        Ok(())
    }

    fn decrypt(&self, password: &str) -> Result<KeyPair> {
        let keypair = decrypt_private_key(&self.priv_key_encrypted, password)?;
        if keypair.public_key_string() != self.pub_key {
            return Err(CryptoError::KeyMismatch.into());
        }
        Ok(keypair)
    }

    /// Public key handle for verification
    pub fn public_handle(&self) -> Result<KeyPair> {
        match &self.identity {
            Some(keypair) => Ok(keypair.public_only()),
            None => Ok(KeyPair::from_public_key_str(&self.pub_key)?),
        }
    }

    /// Sign an entity with this wallet's private key
    pub fn sign<T: Signable + ?Sized>(&self, entity: &mut T) -> Result<()> {
        match &self.identity {
            Some(keypair) if keypair.has_private_key() => keypair.sign_entity(entity),
            _ => Err(CryptoError::NoPrivateKey.into()),
        }
    }

    /// Verify an entity was signed by this wallet
    pub fn verify<T: Signable + ?Sized>(&self, entity: &mut T) -> Result<bool> {
        self.public_handle()?.verify_entity(entity)
    }

    /// Copy suitable for sharing: no private key, encrypted or otherwise
    pub fn public_export(&self) -> Wallet {
        Wallet {
            priv_key_encrypted: String::new(),
            identity: self.identity.as_ref().map(KeyPair::public_only),
            ..self.clone()
        }
    }

    /// Save the wallet document to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, public_only: bool) -> Result<()> {
        let json = if public_only {
            self.public_export().to_json(true)?
        } else {
            self.to_json(true)?
        };

        fs::write(path, json)?;
        Ok(())
    }

    /// Load a wallet document from a file.
    ///
    /// Balances only ever come from nodes, so the imported balance is reset.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let mut wallet = Self::from_json(&json)?;
        wallet.balance = 0;
        Ok(wallet)
    }

    /// Name for display
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { "No Name" } else { &self.name }
    }
}

impl PartialEq for Wallet {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.email == other.email
            && self.pub_key == other.pub_key
            && self.priv_key_encrypted == other.priv_key_encrypted
            && self.balance == other.balance
    }
}

impl Eq for Wallet {}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("pub_key", &self.pub_key)
            .field("owned", &self.is_owned())
            .field("balance", &self.balance)
            .field("unlocked", &self.is_unlocked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::wallet::encryption::test_params;

    #[test]
    fn test_create_wallet() {
        let w = Wallet::create("Alice", "alice@example.com", "password1", &test_params()).unwrap();

        assert!(w.is_owned());
        assert!(w.is_unlocked());
        assert_eq!(w.balance, 0);
        assert_eq!(w.id, 0);
        assert!(KeyPair::from_public_key_str(&w.pub_key).is_ok());
    }

    #[test]
    fn test_create_with_weak_password() {
        let result = Wallet::create("Alice", "", "short", &test_params());
        assert!(matches!(
            result,
            Err(Error::Crypto(CryptoError::WeakPassword { .. }))
        ));
    }

    #[test]
    fn test_lock_unlock() {
        let mut w = Wallet::create("Alice", "", "password1", &test_params()).unwrap();

        w.lock();
        assert!(!w.is_unlocked());
        assert!(w.is_owned());

        assert!(matches!(
            w.unlock("password2"),
            Err(Error::Crypto(CryptoError::BadPassword))
        ));
        assert!(!w.is_unlocked());

        w.unlock("password1").unwrap();
        assert!(w.is_unlocked());
    }

    #[test]
    fn test_unlock_public_only_wallet() {
        let owner = Wallet::create("Bob", "", "password1", &test_params()).unwrap();
        let mut other = Wallet::from_public_key("Bob", "", &owner.pub_key, 0).unwrap();

        assert!(!other.is_owned());
        assert!(!other.is_unlocked());
        assert!(matches!(
            other.unlock("password1"),
            Err(Error::Crypto(CryptoError::WalletLocked))
        ));
    }

    #[test]
    fn test_foreign_private_key_is_rejected() {
        let alice = Wallet::create("Alice", "", "password1", &test_params()).unwrap();
        let mut mallory = Wallet::create("Mallory", "", "password1", &test_params()).unwrap();
        mallory.priv_key_encrypted = alice.priv_key_encrypted.clone();

        assert!(matches!(
            mallory.unlock("password1"),
            Err(Error::Crypto(CryptoError::KeyMismatch))
        ));
    }

    #[test]
    fn test_change_password() {
        let mut w = Wallet::create("Alice", "", "password1", &test_params()).unwrap();
        w.lock();

        assert!(w.change_password("wrongpass", "password2", &test_params()).is_err());
        assert!(w.change_password("password1", "short", &test_params()).is_err());

        w.change_password("password1", "password2", &test_params()).unwrap();
        assert!(!w.is_unlocked());
        assert!(w.unlock("password1").is_err());
        w.unlock("password2").unwrap();
    }

    #[test]
    fn test_locked_wallet_cannot_sign() {
        let mut w = Wallet::create("Alice", "", "password1", &test_params()).unwrap();
        w.lock();

        let mut note = crate::network::ErrorPacket {
            kind: crate::network::PacketType::Error,
            envelope: Default::default(),
            msg: "hello".to_string(),
        };
        assert!(matches!(
            w.sign(&mut note),
            Err(Error::Crypto(CryptoError::NoPrivateKey))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut w = Wallet::create("Alice", "alice@example.com", "password1", &test_params()).unwrap();
        w.balance = 1234;
        w.id = 7;

        let decoded = Wallet::from_json(&w.to_json(false).unwrap()).unwrap();
        assert_eq!(decoded, w);
        assert_eq!(decoded.id, 0); // transient
        assert!(!decoded.is_unlocked()); // transient
    }

    #[test]
    fn test_json_field_names() {
        let w = Wallet::create("Alice", "a@b.c", "password1", &test_params()).unwrap();
        let json = w.to_json(false).unwrap();

        assert!(json.starts_with(r#"{"name":"Alice","email":"a@b.c","pubKey":""#));
        assert!(json.contains(r#""privKeyEncrypted":""#));
        assert!(json.ends_with(r#""balance":0}"#));
        assert!(!json.contains("unlocked"));
    }

    #[test]
    fn test_from_json_rejects_bad_key() {
        let json = r#"{"name":"x","email":"","pubKey":"nope","privKeyEncrypted":"","balance":0}"#;
        assert!(Wallet::from_json(json).is_err());
    }

    #[test]
    fn test_export_and_import_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = Wallet::create("Alice", "", "password1", &test_params()).unwrap();
        w.balance = 500;

        let private_path = dir.path().join("alice.wallet");
        let public_path = dir.path().join("alice.pub.wallet");
        w.save_to_file(&private_path, false).unwrap();
        w.save_to_file(&public_path, true).unwrap();

        // Public export leaves the in-memory wallet alone
        assert!(w.is_owned());
        assert!(w.is_unlocked());

        let mut private = Wallet::load_from_file(&private_path).unwrap();
        assert_eq!(private.pub_key, w.pub_key);
        assert_eq!(private.balance, 0);
        private.unlock("password1").unwrap();

        let public = Wallet::load_from_file(&public_path).unwrap();
        assert_eq!(public.pub_key, w.pub_key);
        assert!(!public.is_owned());
    }

    #[test]
    fn test_display_name() {
        let owner = Wallet::create("", "", "password1", &test_params()).unwrap();
        assert_eq!(owner.display_name(), "No Name");
    }
}
