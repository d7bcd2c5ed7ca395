// Node networking

mod client;
mod handler;
mod message;
mod node;

pub use client::{HttpTransport, JSON_CONTENT_TYPE, LEGACY_FORM_CONTENT_TYPE, NodeClient, Transport};
pub use handler::{
    TransactionOutcome, apply_transaction, apply_wallet_list, refresh_balances, submit_transaction,
    verify_reply,
};
pub use message::{
    ErrorPacket, GetWalletsPacket, Packet, PacketType, SignedEnvelope, TransactionPacket,
    TransactionReplyPacket, WalletListPacket,
};
pub use node::{DEFAULT_NODE_JSON, Node};
