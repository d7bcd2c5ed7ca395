// Node records - remote ledger nodes and their identity wallets

use crate::error::Result;
use crate::wallet::Wallet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Node document shipped with the application and seeded on first start.
///
/// Its public key is the curve point whose x coordinate is
/// `sha256("virtual-wallet default node" || 0x00)`, so no private key for it
/// is known and no reply can verify against it. Import a real node to talk
/// to a ledger.
pub const DEFAULT_NODE_JSON: &str = include_str!("../../assets/default_node.json");

/// A ledger node: where to reach it and the wallet it signs replies with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Store-assigned id, 0 until persisted
    #[serde(skip)]
    pub id: i64,
    pub uri: String,
    pub wallet: Wallet,
}

impl Node {
    /// Create a node record
    pub fn new(uri: &str, wallet: Wallet) -> Self {
        Self {
            id: 0,
            uri: uri.to_string(),
            wallet,
        }
    }

    /// Parse a node document, checking the wallet key is usable
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let uri = value
            .get("uri")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let wallet = match value.get("wallet") {
            Some(wallet) => Wallet::from_json(&wallet.to_string())?,
            None => Wallet::from_json("{}")?,
        };

        Ok(Self { id: 0, uri, wallet })
    }

    /// The node bundled with the application
    pub fn default_node() -> Result<Self> {
        Self::from_json(DEFAULT_NODE_JSON)
    }

    /// Serialize the node document
    pub fn to_json(&self, indent: bool) -> Result<String> {
        crate::core::to_json(self, indent)
    }

    /// Public key of the node's wallet
    pub fn pub_key(&self) -> &str {
        &self.wallet.pub_key
    }

    /// Save the node document to a file; never includes a private key
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let export = Node {
            wallet: self.wallet.public_export(),
            ..self.clone()
        };
        fs::write(path, export.to_json(true)?)?;
        Ok(())
    }

    /// Load a node document from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.wallet == other.wallet
    }
}

impl Eq for Node {}
