// Error types

use crate::core::TransactionType;
use crate::network::PacketType;
use std::time::Duration;
use thiserror::Error;

/// Key handling, password and signature errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Incorrect password")]
    BadPassword,

    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("Wallet is locked: no encrypted private key on record")]
    WalletLocked,

    #[error("Signature is already present")]
    AlreadySigned,

    #[error("Missing signature")]
    MissingSignature,

    #[error("Key has no private material")]
    NoPrivateKey,

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Malformed encrypted private key: {0}")]
    MalformedCiphertext(String),

    #[error("Decrypted private key does not match the wallet public key")]
    KeyMismatch,

    #[error("Invalid key derivation parameters: {0}")]
    InvalidKdfParams(String),
}

/// Transaction construction and decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Genesis amount of {amount} is below minimum amount {minimum}")]
    BelowMinimumGenesis { amount: i64, minimum: i64 },

    #[error("Unable to send negative amount: {0}")]
    NegativeAmount(i64),

    #[error("Insufficient balance ({balance}) to send amount ({amount} + {fee})")]
    InsufficientBalance { balance: i64, amount: i64, fee: i64 },

    #[error("Unknown transaction type: {0}")]
    UnknownType(String),

    #[error("No decoder for transaction type {0}")]
    Unsupported(TransactionType),

    #[error("Cannot split a fee over zero nodes")]
    NoNodes,
}

/// Packet decoding and verification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Unknown packet type: {0}")]
    UnknownType(String),

    #[error("No decoder for packet type {0}")]
    Unsupported(PacketType),

    #[error("Packet from {0} failed verification")]
    VerificationFailed(String),

    #[error("Malformed packet: {0}")]
    Malformed(String),

    #[error("Node reported error: {0}")]
    Remote(String),

    #[error("Unexpected reply: expected {expected}, got {actual}")]
    UnexpectedReply { expected: PacketType, actual: PacketType },
}

/// Ledger store invariant violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Wallet already exists in store")]
    DuplicateWallet,

    #[error("Node public key already exists in store")]
    DuplicateNode,

    #[error("Transaction already exists in store")]
    DuplicateTransaction,

    #[error("Conflicting schemas for {table} table")]
    SchemaConflict { table: String },

    #[error("Name, email and balance are all unset")]
    NoFieldsProvided,

    #[error("Wallet associated with node is missing its id (id<=0)")]
    MissingWalletId,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Node wallet public key does not match the one found in store")]
    WalletMismatch,

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Balance of wallet {0} out of range")]
    BalanceOverflow(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Node transport failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to reach node: {0}")]
    ConnectFailed(String),

    #[error("Node replied with status {0}")]
    NonSuccessStatus(u16),

    #[error("Node did not reply within {0:?}")]
    Timeout(Duration),
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::Store(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
