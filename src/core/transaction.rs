// Ledger transactions

use crate::core::{
    FEE_FRACTION, MAX_TXN_FEE, MIN_GENESIS_AMOUNT, MIN_TXN_FEE, Quant, Signable, gen_nonce, to_json,
};
use crate::error::{Result, TransactionError};
use crate::wallet::Wallet;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Transaction discriminants.
///
/// Only `Genesis` and `Regular` have decoders; the rest are reserved
/// ledger operations recognised on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Genesis,
    Regular,
    CreatePile,
    PlunderPile,
    CreateNode,
    RetireNode,
    KillNode,
    InfluenceNode,
    CreateVote,
    CastVote,
    Inflation,
    ChangeParam,
    ForcedRegular,
    ForcedDiffuse,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Genesis => "Genesis",
            TransactionType::Regular => "Regular",
            TransactionType::CreatePile => "CreatePile",
            TransactionType::PlunderPile => "PlunderPile",
            TransactionType::CreateNode => "CreateNode",
            TransactionType::RetireNode => "RetireNode",
            TransactionType::KillNode => "KillNode",
            TransactionType::InfluenceNode => "InfluenceNode",
            TransactionType::CreateVote => "CreateVote",
            TransactionType::CastVote => "CastVote",
            TransactionType::Inflation => "Inflation",
            TransactionType::ChangeParam => "ChangeParam",
            TransactionType::ForcedRegular => "ForcedRegular",
            TransactionType::ForcedDiffuse => "ForcedDiffuse",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "Genesis" => Some(TransactionType::Genesis),
            "Regular" => Some(TransactionType::Regular),
            "CreatePile" => Some(TransactionType::CreatePile),
            "PlunderPile" => Some(TransactionType::PlunderPile),
            "CreateNode" => Some(TransactionType::CreateNode),
            "RetireNode" => Some(TransactionType::RetireNode),
            "KillNode" => Some(TransactionType::KillNode),
            "InfluenceNode" => Some(TransactionType::InfluenceNode),
            "CreateVote" => Some(TransactionType::CreateVote),
            "CastVote" => Some(TransactionType::CastVote),
            "Inflation" => Some(TransactionType::Inflation),
            "ChangeParam" => Some(TransactionType::ChangeParam),
            "ForcedRegular" => Some(TransactionType::ForcedRegular),
            "ForcedDiffuse" => Some(TransactionType::ForcedDiffuse),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Genesis transaction - creates value, no sender, no fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub nonce: String,
    pub signature: String,
    pub fee: Quant,
    pub creator_pub_key: String,
    pub beneficiary_pub_key: String,
    pub amount: Quant,
}

impl GenesisTransaction {
    /// Create and sign a genesis transaction with the creator's wallet
    pub fn new(creator: &Wallet, beneficiary_pub_key: &str, amount: Quant) -> Result<Self> {
        if amount < MIN_GENESIS_AMOUNT {
            return Err(TransactionError::BelowMinimumGenesis {
                amount,
                minimum: MIN_GENESIS_AMOUNT,
            }
            .into());
        }

        let mut txn = Self {
            kind: TransactionType::Genesis,
            nonce: gen_nonce(),
            signature: String::new(),
            fee: 0,
            creator_pub_key: creator.pub_key.clone(),
            beneficiary_pub_key: beneficiary_pub_key.to_string(),
            amount,
        };

        creator.sign(&mut txn)?;
        Ok(txn)
    }
}

/// Regular transaction - moves value between two public keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub nonce: String,
    pub signature: String,
    pub fee: Quant,
    pub sender_pub_key: String,
    pub recipient_pub_key: String,
    pub amount: Quant,
}

impl RegularTransaction {
    /// Build a transfer from `sender`.
    ///
    /// With `sign_now = false` the transaction is left unsigned so the fee
    /// can be previewed before committing.
    pub fn new(
        sender: &Wallet,
        recipient_pub_key: &str,
        amount: Quant,
        node_count: usize,
        sign_now: bool,
    ) -> Result<Self> {
        if amount < 0 {
            return Err(TransactionError::NegativeAmount(amount).into());
        }

        let fee = Self::compute_fee(amount, node_count)?;

        let remaining = sender
            .balance
            .checked_sub(amount)
            .and_then(|b| b.checked_sub(fee));
        if remaining.is_none_or(|b| b < 0) {
            return Err(TransactionError::InsufficientBalance {
                balance: sender.balance,
                amount,
                fee,
            }
            .into());
        }

        let mut txn = Self {
            kind: TransactionType::Regular,
            nonce: gen_nonce(),
            signature: String::new(),
            fee,
            sender_pub_key: sender.pub_key.clone(),
            recipient_pub_key: recipient_pub_key.to_string(),
            amount,
        };

        if sign_now {
            sender.sign(&mut txn)?;
        }

        Ok(txn)
    }

    /// Fee for `amount` split evenly across `node_count` nodes.
    ///
    /// The clamped fee is floor-divided by the node count and multiplied
    /// back, so the remainder of the division is dropped (1000 over three
    /// nodes is 999).
    pub fn compute_fee(amount: Quant, node_count: usize) -> std::result::Result<Quant, TransactionError> {
        if node_count == 0 {
            return Err(TransactionError::NoNodes);
        }

        let raw = ((amount as f64) * FEE_FRACTION).round() as Quant;
        let raw = raw.clamp(MIN_TXN_FEE, MAX_TXN_FEE);
        let nodes = node_count as Quant;

        Ok(nodes * (raw / nodes))
    }

    /// Total debited from the sender, saturating for amounts read off the wire
    pub fn total_debit(&self) -> Quant {
        self.amount.saturating_add(self.fee)
    }
}

/// Transaction - closed set of decodable variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Genesis(GenesisTransaction),
    Regular(RegularTransaction),
}

impl Transaction {
    /// Decode from canonical JSON, dispatching on the `type` discriminant
    pub fn from_canonical_form(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Decode from an already parsed JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| TransactionError::UnknownType("<missing>".to_string()))?;

        let kind = TransactionType::from_string(tag)
            .ok_or_else(|| TransactionError::UnknownType(tag.to_string()))?;

        match kind {
            TransactionType::Genesis => Ok(Transaction::Genesis(serde_json::from_value(value)?)),
            TransactionType::Regular => Ok(Transaction::Regular(serde_json::from_value(value)?)),
            other => Err(TransactionError::Unsupported(other).into()),
        }
    }

    /// Encode to canonical JSON (the form that is signed and transmitted)
    pub fn to_canonical_form(&self, indent: bool) -> Result<String> {
        to_json(self, indent)
    }

    pub fn kind(&self) -> TransactionType {
        match self {
            Transaction::Genesis(g) => g.kind,
            Transaction::Regular(r) => r.kind,
        }
    }

    pub fn nonce(&self) -> &str {
        match self {
            Transaction::Genesis(g) => &g.nonce,
            Transaction::Regular(r) => &r.nonce,
        }
    }

    pub fn fee(&self) -> Quant {
        match self {
            Transaction::Genesis(g) => g.fee,
            Transaction::Regular(r) => r.fee,
        }
    }

    pub fn amount(&self) -> Quant {
        match self {
            Transaction::Genesis(g) => g.amount,
            Transaction::Regular(r) => r.amount,
        }
    }

    /// Whether `pub_key` is a party to this transaction
    pub fn involves(&self, pub_key: &str) -> bool {
        match self {
            Transaction::Genesis(g) => g.creator_pub_key == pub_key || g.beneficiary_pub_key == pub_key,
            Transaction::Regular(r) => r.sender_pub_key == pub_key || r.recipient_pub_key == pub_key,
        }
    }
}

impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Transaction::Genesis(g) => g.serialize(serializer),
            Transaction::Regular(r) => r.serialize(serializer),
        }
    }
}

impl From<GenesisTransaction> for Transaction {
    fn from(txn: GenesisTransaction) -> Self {
        Transaction::Genesis(txn)
    }
}

impl From<RegularTransaction> for Transaction {
    fn from(txn: RegularTransaction) -> Self {
        Transaction::Regular(txn)
    }
}

impl Signable for GenesisTransaction {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn signature_mut(&mut self) -> &mut String {
        &mut self.signature
    }

    fn canonical_form(&self, indent: bool) -> Result<String> {
        to_json(self, indent)
    }
}

impl Signable for RegularTransaction {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn signature_mut(&mut self) -> &mut String {
        &mut self.signature
    }

    fn canonical_form(&self, indent: bool) -> Result<String> {
        to_json(self, indent)
    }
}

impl Signable for Transaction {
    fn signature(&self) -> &str {
        match self {
            Transaction::Genesis(g) => &g.signature,
            Transaction::Regular(r) => &r.signature,
        }
    }

    fn signature_mut(&mut self) -> &mut String {
        match self {
            Transaction::Genesis(g) => &mut g.signature,
            Transaction::Regular(r) => &mut r.signature,
        }
    }

    fn canonical_form(&self, indent: bool) -> Result<String> {
        self.to_canonical_form(indent)
    }
}
