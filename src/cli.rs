// CLI commands

use crate::config::{Config, DEFAULT_DATA_DIR};
use crate::core::{
    GenesisTransaction, Quant, RegularTransaction, Transaction, format_balance, parse_balance,
};
use crate::error::{Error, Result, StoreError, TransactionError};
use crate::network::{
    Node, NodeClient, TransactionOutcome, refresh_balances, submit_transaction,
};
use crate::storage::{LedgerStore, NodeFilter, SharedStore, WalletFilter};
use crate::wallet::{KeyPair, Wallet};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "virtual-wallet")]
#[command(about = "Wallet client for a node-relayed virtual currency", long_about = None)]
pub struct Cli {
    /// Directory holding the ledger database and config.json
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wallet commands
    #[command(subcommand)]
    Wallet(WalletCommands),

    /// Node commands
    #[command(subcommand)]
    Node(NodeCommands),

    /// Refresh wallet balances from a node
    Refresh {
        /// Node URI or public key (first known node if not specified)
        #[arg(long)]
        node: Option<String>,
    },

    /// Send an amount to another wallet
    Send {
        /// Sending wallet (name or public key)
        from: String,
        /// Receiving wallet (name or public key)
        to: String,
        /// Amount, e.g. "1.5" or "1.5 PIG"
        amount: String,
        /// Password of the sending wallet
        #[arg(short, long)]
        password: String,
        /// Node URI or public key (first known node if not specified)
        #[arg(long)]
        node: Option<String>,
        /// Show the fee without signing or sending
        #[arg(long)]
        dry_run: bool,
    },

    /// Create currency with a genesis transaction
    Genesis {
        /// Creating wallet (name or public key)
        creator: String,
        /// Beneficiary wallet (name or public key)
        beneficiary: String,
        /// Amount, e.g. "1" or "1 PIG"
        amount: String,
        /// Password of the creating wallet
        #[arg(short, long)]
        password: String,
        /// Node URI or public key (first known node if not specified)
        #[arg(long)]
        node: Option<String>,
    },

    /// List recorded transactions
    History {
        /// Only transactions involving this wallet (name or public key)
        wallet: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Create a new wallet
    Create {
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Password protecting the private key (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },

    /// List wallets
    List {
        /// Only wallets with a private key
        #[arg(long, conflicts_with = "other")]
        owned: bool,
        /// Only wallets known by public key
        #[arg(long)]
        other: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Minimum balance, inclusive
        #[arg(long)]
        min: Option<String>,
        /// Maximum balance, inclusive
        #[arg(long)]
        max: Option<String>,
    },

    /// Import a wallet file
    Import { file: PathBuf },

    /// Export a wallet to a file
    Export {
        wallet: String,
        file: PathBuf,
        /// Leave the encrypted private key out
        #[arg(long)]
        public: bool,
    },

    /// Remove a wallet
    Remove { wallet: String },

    /// Change name and/or email
    Edit {
        wallet: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Check a wallet password
    UnlockCheck {
        wallet: String,
        #[arg(short, long)]
        password: String,
    },

    /// Change a wallet password
    Passwd {
        wallet: String,
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
}

#[derive(Subcommand)]
pub enum NodeCommands {
    /// List nodes
    List {
        #[arg(long)]
        uri: Option<String>,
    },

    /// Import a node file
    Import { file: PathBuf },
}

/// CLI handler
pub struct CliHandler {
    config: Config,
    store: SharedStore,
    client: NodeClient,
}

impl CliHandler {
    /// Open the store in the configured data directory
    pub fn new(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let mut store = LedgerStore::open(config.db_path())?;

        match Node::default_node().and_then(|node| store.seed_default_node(node)) {
            Ok(node) => log::debug!("Default node {}", node.uri),
            Err(e) => log::warn!("Failed to seed default node: {}", e),
        }

        let client = NodeClient::from_config(&config)?;

        Ok(Self {
            config,
            store: store.into_shared(),
            client,
        })
    }

    /// Handle CLI command
    pub async fn handle(&self, cli: Cli) -> Result<()> {
        let result = match cli.command {
            Commands::Wallet(cmd) => self.handle_wallet(cmd).await,
            Commands::Node(cmd) => self.handle_node(cmd).await,
            Commands::Refresh { node } => self.refresh(node.as_deref()).await,
            Commands::Send {
                from,
                to,
                amount,
                password,
                node,
                dry_run,
            } => {
                self.send(&from, &to, &amount, &password, node.as_deref(), dry_run)
                    .await
            }
            Commands::Genesis {
                creator,
                beneficiary,
                amount,
                password,
                node,
            } => {
                self.genesis(&creator, &beneficiary, &amount, &password, node.as_deref())
                    .await
            }
            Commands::History { wallet } => self.history(wallet.as_deref()).await,
        };

        self.store.read().await.flush()?;
        result
    }

    /// Handle wallet commands
    async fn handle_wallet(&self, cmd: WalletCommands) -> Result<()> {
        match cmd {
            WalletCommands::Create {
                name,
                email,
                password,
            } => {
                let mut wallet = Wallet::create(&name, &email, &password, &self.config.kdf)?;
                self.store.write().await.add_wallet(&mut wallet)?;

                println!("Wallet created:");
                println!("  Id: {}", wallet.id);
                println!("  Public key: {}", wallet.pub_key);
                Ok(())
            }
            WalletCommands::List {
                owned,
                other,
                name,
                email,
                min,
                max,
            } => {
                let mut filter = WalletFilter::new()
                    .balance_between(parse_optional_amount(min)?, parse_optional_amount(max)?);
                filter.name = name;
                filter.email = email;

                let store = self.store.read().await;
                let wallets: Vec<&Wallet> = store
                    .find_wallets(&filter)
                    .into_iter()
                    .filter(|w| (!owned || w.is_owned()) && (!other || !w.is_owned()))
                    .collect();

                println!("Wallets ({}):", wallets.len());
                for wallet in wallets {
                    print_wallet(wallet);
                }
                Ok(())
            }
            WalletCommands::Import { file } => {
                let mut wallet = Wallet::load_from_file(&file)?;
                self.store.write().await.add_wallet(&mut wallet)?;

                println!("Imported wallet {} ({})", wallet.id, wallet.display_name());
                Ok(())
            }
            WalletCommands::Export {
                wallet,
                file,
                public,
            } => {
                let store = self.store.read().await;
                let wallet = resolve_wallet(&store, &wallet)?;
                wallet.save_to_file(&file, public)?;

                println!("Exported {} to {}", wallet.display_name(), file.display());
                Ok(())
            }
            WalletCommands::Remove { wallet } => {
                let mut store = self.store.write().await;
                let wallet = resolve_wallet(&store, &wallet)?.clone();
                store.remove_wallet(&wallet)?;

                println!("Removed wallet {}", wallet.display_name());
                Ok(())
            }
            WalletCommands::Edit {
                wallet,
                name,
                email,
            } => {
                let mut store = self.store.write().await;
                let mut wallet = resolve_wallet(&store, &wallet)?.clone();
                store.update_meta_and_balance(&mut wallet, name.as_deref(), email.as_deref(), None)?;

                print_wallet(&wallet);
                Ok(())
            }
            WalletCommands::UnlockCheck { wallet, password } => {
                let mut wallet = resolve_wallet(&*self.store.read().await, &wallet)?.clone();
                wallet.unlock(&password)?;

                println!("Password accepted for {}", wallet.display_name());
                Ok(())
            }
            WalletCommands::Passwd {
                wallet,
                current,
                new,
            } => {
                let mut store = self.store.write().await;
                let mut wallet = resolve_wallet(&store, &wallet)?.clone();
                wallet.change_password(&current, &new, &self.config.kdf)?;
                store.update_private_key(&wallet)?;

                println!("Password changed for {}", wallet.display_name());
                Ok(())
            }
        }
    }

    /// Handle node commands
    async fn handle_node(&self, cmd: NodeCommands) -> Result<()> {
        match cmd {
            NodeCommands::List { uri } => {
                let filter = NodeFilter {
                    uri,
                    pub_key: None,
                };
                let store = self.store.read().await;
                let nodes = store.find_nodes(&filter);

                println!("Nodes ({}):", nodes.len());
                for node in nodes {
                    println!("  [{}] {}", node.id, node.uri);
                    println!("      Public key: {}", node.wallet.pub_key);
                    println!("      Balance: {}", format_balance(node.wallet.balance));
                }
                Ok(())
            }
            NodeCommands::Import { file } => {
                let node = Node::load_from_file(&file)?;
                let node = self.store.write().await.import_node(node)?;

                println!("Imported node {} at {}", node.id, node.uri);
                Ok(())
            }
        }
    }

    /// Refresh balances from a node
    async fn refresh(&self, node: Option<&str>) -> Result<()> {
        let node = self.select_node(node).await?;
        let updated = refresh_balances(&self.client, &self.store, &node).await?;

        println!("Updated {} balances from {}", updated, node.uri);
        for wallet in self.store.read().await.owned_wallets() {
            print_wallet(wallet);
        }
        Ok(())
    }

    /// Send a regular transaction
    async fn send(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        password: &str,
        node: Option<&str>,
        dry_run: bool,
    ) -> Result<()> {
        let amount = parse_amount(amount)?;

        let (mut sender, recipient, node_count) = {
            let store = self.store.read().await;
            let sender = resolve_wallet(&store, from)?.clone();
            let recipient = resolve_pub_key(&store, to)?;
            (sender, recipient, store.node_count())
        };

        if dry_run {
            let txn = RegularTransaction::new(&sender, &recipient, amount, node_count, false)?;
            println!("Amount: {}", format_balance(txn.amount));
            println!("Fee:    {}", format_balance(txn.fee));
            println!("Total:  {}", format_balance(txn.total_debit()));
            println!(
                "Balance after: {}",
                format_balance(sender.balance - txn.total_debit())
            );
            return Ok(());
        }

        sender.unlock(password)?;
        let txn = RegularTransaction::new(&sender, &recipient, amount, node_count, true)?;
        println!(
            "Sending {} (fee {})",
            format_balance(txn.amount),
            format_balance(txn.fee)
        );

        self.submit(node, txn.into()).await
    }

    /// Send a genesis transaction
    async fn genesis(
        &self,
        creator: &str,
        beneficiary: &str,
        amount: &str,
        password: &str,
        node: Option<&str>,
    ) -> Result<()> {
        let amount = parse_amount(amount)?;

        let (mut creator, beneficiary) = {
            let store = self.store.read().await;
            (
                resolve_wallet(&store, creator)?.clone(),
                resolve_pub_key(&store, beneficiary)?,
            )
        };

        creator.unlock(password)?;
        let txn = GenesisTransaction::new(&creator, &beneficiary, amount)?;

        self.submit(node, txn.into()).await
    }

    async fn submit(&self, node: Option<&str>, txn: Transaction) -> Result<()> {
        let node = self.select_node(node).await?;

        match submit_transaction(&self.client, &self.store, &node, txn).await? {
            TransactionOutcome::Accepted => println!("✓ Transaction accepted by {}", node.uri),
            TransactionOutcome::Rejected(msg) => {
                println!("✗ Transaction rejected by {}: {}", node.uri, msg)
            }
        }
        Ok(())
    }

    /// List transactions
    async fn history(&self, wallet: Option<&str>) -> Result<()> {
        let store = self.store.read().await;
        let transactions: Vec<&Transaction> = match wallet {
            Some(wallet) => {
                let pub_key = resolve_pub_key(&store, wallet)?;
                store.find_transactions_by_wallet(&pub_key)?
            }
            None => store.transactions().iter().collect(),
        };

        println!("Transactions ({}):", transactions.len());
        for txn in transactions {
            println!(
                "  {} {} amount {} fee {}",
                txn.kind(),
                txn.nonce(),
                format_balance(txn.amount()),
                format_balance(txn.fee())
            );
        }
        Ok(())
    }

    async fn select_node(&self, key: Option<&str>) -> Result<Node> {
        let store = self.store.read().await;

        let node = match key {
            Some(key) => store
                .find_node_by_pub_key(key)
                .or_else(|| store.nodes().iter().find(|n| n.uri == key)),
            // The bundled node cannot sign replies; prefer any imported one
            None => {
                let bundled = Node::default_node().ok();
                store
                    .nodes()
                    .iter()
                    .find(|n| bundled.as_ref().is_none_or(|b| b.pub_key() != n.pub_key()))
                    .or_else(|| store.nodes().first())
            }
        };

        match (node, key) {
            (Some(node), _) => Ok(node.clone()),
            (None, Some(key)) => Err(Error::InvalidArgument(format!("Unknown node: {}", key))),
            (None, None) => Err(TransactionError::NoNodes.into()),
        }
    }
}

/// Find a stored wallet by exact public key or unique name
fn resolve_wallet<'a>(store: &'a LedgerStore, key: &str) -> Result<&'a Wallet> {
    if let Some(wallet) = store.find_wallet_by_pub_key(key) {
        return Ok(wallet);
    }

    let named: Vec<&Wallet> = store
        .wallets()
        .iter()
        .filter(|w| w.name.eq_ignore_ascii_case(key))
        .collect();

    match named.as_slice() {
        [wallet] => Ok(*wallet),
        [] => Err(StoreError::WalletNotFound(key.to_string()).into()),
        _ => Err(Error::InvalidArgument(format!(
            "'{}' names {} wallets, use the public key",
            key,
            named.len()
        ))),
    }
}

/// Public key of a stored wallet, or a valid public key given directly
fn resolve_pub_key(store: &LedgerStore, key: &str) -> Result<String> {
    match resolve_wallet(store, key) {
        Ok(wallet) => Ok(wallet.pub_key.clone()),
        Err(e) => match KeyPair::from_public_key_str(key) {
            Ok(keypair) => Ok(keypair.public_key_string()),
            Err(_) => Err(e),
        },
    }
}

fn parse_amount(text: &str) -> Result<Quant> {
    parse_balance(text).map_err(Error::InvalidArgument)
}

fn parse_optional_amount(text: Option<String>) -> Result<Option<Quant>> {
    text.as_deref().map(parse_amount).transpose()
}

fn print_wallet(wallet: &Wallet) {
    let marker = if wallet.is_owned() { "*" } else { " " };
    println!(
        "  {}[{}] {} <{}> {}",
        marker,
        wallet.id,
        wallet.display_name(),
        wallet.email,
        format_balance(wallet.balance)
    );
    println!("      {}", wallet.pub_key);
}
