// Node protocol packets

use crate::core::{Signable, Transaction, gen_nonce};
use crate::error::{PacketError, Result};
use crate::network::Node;
use crate::wallet::Wallet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Packet types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketType {
    GetWallets,
    GetNodes,
    GetTransactions,
    WalletList,
    NodeList,
    TransactionList,
    Transaction,
    TransactionReply,
    Error,
}

impl PacketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PacketType::GetWallets => "GetWallets",
            PacketType::GetNodes => "GetNodes",
            PacketType::GetTransactions => "GetTransactions",
            PacketType::WalletList => "WalletList",
            PacketType::NodeList => "NodeList",
            PacketType::TransactionList => "TransactionList",
            PacketType::Transaction => "Transaction",
            PacketType::TransactionReply => "TransactionReply",
            PacketType::Error => "Error",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "GetWallets" => Some(PacketType::GetWallets),
            "GetNodes" => Some(PacketType::GetNodes),
            "GetTransactions" => Some(PacketType::GetTransactions),
            "WalletList" => Some(PacketType::WalletList),
            "NodeList" => Some(PacketType::NodeList),
            "TransactionList" => Some(PacketType::TransactionList),
            "Transaction" => Some(PacketType::Transaction),
            "TransactionReply" => Some(PacketType::TransactionReply),
            "Error" => Some(PacketType::Error),
            _ => None,
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common fields of every node-signed packet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedEnvelope {
    #[serde(default)]
    pub origin_uri: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub sender_pub_key: String,
    #[serde(default)]
    pub signature: String,
}

impl SignedEnvelope {
    /// Unsigned envelope originating from `node`
    pub fn from_node(node: &Node) -> Self {
        Self {
            origin_uri: node.uri.clone(),
            nonce: gen_nonce(),
            sender_pub_key: node.wallet.pub_key.clone(),
            signature: String::new(),
        }
    }
}

/// Request for the current state of a set of wallets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWalletsPacket {
    #[serde(rename = "type")]
    pub kind: PacketType,
    #[serde(default)]
    pub pub_keys: Vec<String>,
}

impl GetWalletsPacket {
    pub fn new<'a, I>(wallets: I) -> Self
    where
        I: IntoIterator<Item = &'a Wallet>,
    {
        Self {
            kind: PacketType::GetWallets,
            pub_keys: wallets.into_iter().map(|w| w.pub_key.clone()).collect(),
        }
    }
}

/// Node reply carrying wallet states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletListPacket {
    #[serde(rename = "type")]
    pub kind: PacketType,
    #[serde(flatten)]
    pub envelope: SignedEnvelope,
    #[serde(default)]
    pub wallets: Vec<Wallet>,
}

impl WalletListPacket {
    /// Build and sign a wallet list as `node`
    pub fn signed(wallets: Vec<Wallet>, node: &Node) -> Result<Self> {
        let mut packet = Self {
            kind: PacketType::WalletList,
            envelope: SignedEnvelope::from_node(node),
            wallets: wallets.iter().map(Wallet::public_export).collect(),
        };
        node.wallet.sign(&mut packet)?;
        Ok(packet)
    }
}

/// Wrapper submitting a transaction to a node.
///
/// Encodes as `{"type":"Transaction","txn":<transaction>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionPacket {
    #[serde(rename = "type")]
    pub kind: PacketType,
    pub txn: Transaction,
}

impl TransactionPacket {
    pub fn new(txn: Transaction) -> Self {
        Self {
            kind: PacketType::Transaction,
            txn,
        }
    }
}

/// Node verdict on a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReplyPacket {
    #[serde(rename = "type")]
    pub kind: PacketType,
    #[serde(flatten)]
    pub envelope: SignedEnvelope,
    pub succ: bool,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub txn_nonce: String,
}

impl TransactionReplyPacket {
    /// Build and sign a transaction verdict as `node`
    pub fn signed(succ: bool, msg: &str, txn_nonce: &str, node: &Node) -> Result<Self> {
        let mut packet = Self {
            kind: PacketType::TransactionReply,
            envelope: SignedEnvelope::from_node(node),
            succ,
            msg: msg.to_string(),
            txn_nonce: txn_nonce.to_string(),
        };
        node.wallet.sign(&mut packet)?;
        Ok(packet)
    }
}

/// Node-side failure report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPacket {
    #[serde(rename = "type")]
    pub kind: PacketType,
    #[serde(flatten)]
    pub envelope: SignedEnvelope,
    #[serde(default)]
    pub msg: String,
}

impl ErrorPacket {
    /// Build and sign an error report as `node`
    pub fn signed(msg: &str, node: &Node) -> Result<Self> {
        let mut packet = Self {
            kind: PacketType::Error,
            envelope: SignedEnvelope::from_node(node),
            msg: msg.to_string(),
        };
        node.wallet.sign(&mut packet)?;
        Ok(packet)
    }
}

macro_rules! impl_signed_packet {
    ($($packet:ty),*) => {
        $(
            impl Signable for $packet {
                fn signature(&self) -> &str {
                    &self.envelope.signature
                }

                fn signature_mut(&mut self) -> &mut String {
                    &mut self.envelope.signature
                }

                fn canonical_form(&self, indent: bool) -> Result<String> {
                    crate::core::to_json(self, indent)
                }
            }
        )*
    };
}

impl_signed_packet!(WalletListPacket, TransactionReplyPacket, ErrorPacket);

/// Any packet exchanged with a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    GetWallets(GetWalletsPacket),
    WalletList(WalletListPacket),
    Transaction(TransactionPacket),
    TransactionReply(TransactionReplyPacket),
    Error(ErrorPacket),
}

impl Packet {
    /// Decode a packet, dispatching on its `type` field
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Decode a packet from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_bytes(json.as_bytes())
    }

    fn from_value(mut value: Value) -> Result<Self> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| PacketError::Malformed("missing type field".to_string()))?;
        let kind =
            PacketType::from_string(tag).ok_or_else(|| PacketError::UnknownType(tag.to_string()))?;

        let packet = match kind {
            PacketType::GetWallets => Packet::GetWallets(serde_json::from_value(value)?),
            PacketType::WalletList => Packet::WalletList(serde_json::from_value(value)?),
            PacketType::TransactionReply => {
                Packet::TransactionReply(serde_json::from_value(value)?)
            }
            PacketType::Error => Packet::Error(serde_json::from_value(value)?),
            PacketType::Transaction => {
                let txn = value
                    .get_mut("txn")
                    .map(Value::take)
                    .ok_or_else(|| PacketError::Malformed("missing txn field".to_string()))?;
                Packet::Transaction(TransactionPacket::new(Transaction::from_value(txn)?))
            }
            other => return Err(PacketError::Unsupported(other).into()),
        };

        Ok(packet)
    }

    /// Encode the packet
    pub fn to_json(&self, indent: bool) -> Result<String> {
        match self {
            Packet::GetWallets(p) => crate::core::to_json(p, indent),
            Packet::WalletList(p) => crate::core::to_json(p, indent),
            Packet::Transaction(p) => crate::core::to_json(p, indent),
            Packet::TransactionReply(p) => crate::core::to_json(p, indent),
            Packet::Error(p) => crate::core::to_json(p, indent),
        }
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::GetWallets(_) => PacketType::GetWallets,
            Packet::WalletList(_) => PacketType::WalletList,
            Packet::Transaction(_) => PacketType::Transaction,
            Packet::TransactionReply(_) => PacketType::TransactionReply,
            Packet::Error(_) => PacketType::Error,
        }
    }

    /// The node-signed part of the packet, if it carries a signature
    pub fn signed_mut(&mut self) -> Option<&mut dyn Signable> {
        match self {
            Packet::WalletList(p) => Some(p),
            Packet::TransactionReply(p) => Some(p),
            Packet::Error(p) => Some(p),
            Packet::GetWallets(_) | Packet::Transaction(_) => None,
        }
    }

    /// Envelope of a node-signed packet
    pub fn envelope(&self) -> Option<&SignedEnvelope> {
        match self {
            Packet::WalletList(p) => Some(&p.envelope),
            Packet::TransactionReply(p) => Some(&p.envelope),
            Packet::Error(p) => Some(&p.envelope),
            Packet::GetWallets(_) | Packet::Transaction(_) => None,
        }
    }
}

impl From<GetWalletsPacket> for Packet {
    fn from(p: GetWalletsPacket) -> Self {
        Packet::GetWallets(p)
    }
}

impl From<TransactionPacket> for Packet {
    fn from(p: TransactionPacket) -> Self {
        Packet::Transaction(p)
    }
}

impl From<WalletListPacket> for Packet {
    fn from(p: WalletListPacket) -> Self {
        Packet::WalletList(p)
    }
}

impl From<TransactionReplyPacket> for Packet {
    fn from(p: TransactionReplyPacket) -> Self {
        Packet::TransactionReply(p)
    }
}

impl From<ErrorPacket> for Packet {
    fn from(p: ErrorPacket) -> Self {
        Packet::Error(p)
    }
}
