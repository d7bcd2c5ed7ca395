// Virtual wallet
// Signed wallets and transactions relayed through ledger nodes

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod wallet;

// Re-exports for convenience
pub use cli::{Cli, CliHandler};
pub use config::Config;
pub use core::{GenesisTransaction, RegularTransaction, Signable, Transaction, TransactionType};
pub use error::{Error, Result};
pub use network::{Node, NodeClient, Packet, PacketType};
pub use storage::{LedgerStore, NodeFilter, WalletFilter};
pub use wallet::{KeyPair, Wallet};
