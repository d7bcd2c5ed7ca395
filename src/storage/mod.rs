// Storage layer - in-memory ledger index written through to the database

mod filter;
mod ledger_db;

pub use filter::{NodeFilter, WalletFilter};
pub use ledger_db::{LedgerDb, NodeRow, TransactionRow, WalletRow};

use crate::core::{Quant, Signable, Transaction, TransactionType};
use crate::error::{CryptoError, Result, StoreError};
use crate::network::Node;
use crate::wallet::Wallet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store shared between the CLI and the network handlers
pub type SharedStore = Arc<RwLock<LedgerStore>>;

impl From<&Wallet> for WalletRow {
    fn from(w: &Wallet) -> Self {
        Self {
            name: w.name.clone(),
            email: w.email.clone(),
            pub_key: w.pub_key.clone(),
            priv_key_encrypted: w.priv_key_encrypted.clone(),
            balance: w.balance,
        }
    }
}

/// Ledger store: wallets, nodes and transactions.
///
/// Readers see only the in-memory index. Every mutation validates first,
/// writes the database, and only then touches the index, so a failed
/// mutation leaves both unchanged. Wallets held here are always locked.
pub struct LedgerStore {
    db: LedgerDb,
    wallets: Vec<Wallet>,
    nodes: Vec<Node>,
    transactions: Vec<Transaction>,
}

impl LedgerStore {
    /// Open (or create) the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(LedgerDb::new(path)?)
    }

    /// Create an in-memory store (for testing)
    pub fn memory() -> Result<Self> {
        Self::load(LedgerDb::memory()?)
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    fn load(db: LedgerDb) -> Result<Self> {
        let wallets: Vec<Wallet> = db
            .load_wallets()?
            .into_iter()
            .map(|(id, row)| {
                Wallet::from_record(
                    id,
                    row.name,
                    row.email,
                    row.pub_key,
                    row.priv_key_encrypted,
                    row.balance,
                )
            })
            .collect();

        let mut nodes = Vec::new();
        for (id, row) in db.load_nodes()? {
            match wallets.iter().find(|w| w.id == row.wallet_id) {
                Some(wallet) => nodes.push(Node {
                    id,
                    uri: row.uri,
                    wallet: wallet.clone(),
                }),
                None => log::warn!("Node {} refers to missing wallet {}", id, row.wallet_id),
            }
        }

        let mut transactions = Vec::new();
        for (id, row) in db.load_transactions()? {
            match Transaction::from_canonical_form(row.canonical.as_bytes()) {
                Ok(txn) => transactions.push(txn),
                Err(e) => log::warn!("Skipping undecodable transaction {}: {}", id, e),
            }
        }

        log::info!(
            "Loaded {} wallets, {} nodes, {} transactions",
            wallets.len(),
            nodes.len(),
            transactions.len()
        );

        Ok(Self {
            db,
            wallets,
            nodes,
            transactions,
        })
    }

    pub fn wallets(&self) -> &[Wallet] {
        &self.wallets
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Manually flush the database
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Add a wallet, assigning its id.
    ///
    /// A wallet already known by public key only gains its encrypted
    /// private key (key recovery) and keeps its id; any other repeat of a
    /// public key is a duplicate.
    pub fn add_wallet(&mut self, wallet: &mut Wallet) -> Result<()> {
        if wallet.pub_key.is_empty() {
            return Err(StoreError::MissingField("pubKey").into());
        }

        let matches: Vec<usize> = self
            .wallets
            .iter()
            .enumerate()
            .filter(|(_, w)| w.pub_key == wallet.pub_key)
            .map(|(i, _)| i)
            .collect();

        match matches.as_slice() {
            [] => {
                let id = self.db.insert_wallet(&WalletRow::from(&*wallet))?;
                wallet.id = id;

                let mut stored = wallet.clone();
                stored.lock();
                self.wallets.push(stored);

                log::info!("Added wallet {} ({})", id, wallet.display_name());
                Ok(())
            }
            [index] if !self.wallets[*index].is_owned() && wallet.is_owned() => {
                let index = *index;
                let mut row = WalletRow::from(&self.wallets[index]);
                row.priv_key_encrypted = wallet.priv_key_encrypted.clone();

                let id = self.wallets[index].id;
                self.db.update_wallet(id, &row)?;
                self.set_private_key(index, &wallet.priv_key_encrypted);
                wallet.id = id;

                log::info!("Recovered private key for wallet {}", id);
                Ok(())
            }
            _ => Err(StoreError::DuplicateWallet.into()),
        }
    }

    /// Persist a re-encrypted private key (after a password change)
    pub fn update_private_key(&mut self, wallet: &Wallet) -> Result<()> {
        if !wallet.is_owned() {
            return Err(CryptoError::WalletLocked.into());
        }

        let index = self.wallet_index(&wallet.pub_key)?;
        let mut row = WalletRow::from(&self.wallets[index]);
        row.priv_key_encrypted = wallet.priv_key_encrypted.clone();

        self.db.update_wallet(self.wallets[index].id, &row)?;
        self.set_private_key(index, &wallet.priv_key_encrypted);

        log::info!("Updated private key for wallet {}", self.wallets[index].id);
        Ok(())
    }

    /// Remove a wallet by public key; returns whether it was present.
    ///
    /// Nodes and transactions referring to it are left as they are. An
    /// orphaned node keeps working until the store is reopened; `load`
    /// drops node rows whose wallet row is gone, since a node row keeps
    /// only the wallet id.
    pub fn remove_wallet(&mut self, wallet: &Wallet) -> Result<bool> {
        let Some(index) = self.wallets.iter().position(|w| w.pub_key == wallet.pub_key) else {
            return Ok(false);
        };

        let id = self.wallets[index].id;
        self.db.delete_wallet(id)?;
        self.wallets.remove(index);

        log::info!("Removed wallet {}", id);
        Ok(true)
    }

    /// Update name, email and/or balance of a stored wallet.
    ///
    /// `wallet` receives the same changes as the stored copy.
    pub fn update_meta_and_balance(
        &mut self,
        wallet: &mut Wallet,
        name: Option<&str>,
        email: Option<&str>,
        balance: Option<Quant>,
    ) -> Result<()> {
        if name.is_none() && email.is_none() && balance.is_none() {
            return Err(StoreError::NoFieldsProvided.into());
        }

        let index = self.wallet_index(&wallet.pub_key)?;
        let mut updated = self.wallets[index].clone();
        if let Some(name) = name {
            updated.name = name.to_string();
        }
        if let Some(email) = email {
            updated.email = email.to_string();
        }
        if let Some(balance) = balance {
            updated.balance = balance;
        }

        self.db.update_wallet(updated.id, &WalletRow::from(&updated))?;

        wallet.id = updated.id;
        wallet.name = updated.name.clone();
        wallet.email = updated.email.clone();
        wallet.balance = updated.balance;
        self.replace_wallet(index, updated);

        Ok(())
    }

    /// Set the balances of several wallets in one database transaction.
    ///
    /// Fails without writing anything if any public key is unknown.
    pub fn set_balances(&mut self, balances: &[(String, Quant)]) -> Result<()> {
        let mut changes: Vec<(usize, Quant)> = Vec::with_capacity(balances.len());
        for (pub_key, balance) in balances {
            let index = self.wallet_index(pub_key)?;
            match changes.iter_mut().find(|(i, _)| *i == index) {
                Some(change) => change.1 = *balance,
                None => changes.push((index, *balance)),
            }
        }
        self.write_balances(changes)
    }

    /// Add signed amounts to the balances of several wallets in one
    /// database transaction.
    ///
    /// Fails without writing anything if any public key is unknown.
    pub fn adjust_balances(&mut self, deltas: &[(String, Quant)]) -> Result<()> {
        let changes = self.balance_changes(deltas)?;
        self.write_balances(changes)
    }

    /// Record an accepted transaction together with the balance changes it
    /// causes, in one database transaction.
    ///
    /// Returns `false` without touching any balance when the transaction is
    /// already on record, so applying it twice never moves value twice.
    pub fn record_transaction(
        &mut self,
        txn: Transaction,
        deltas: &[(String, Quant)],
    ) -> Result<bool> {
        if !txn.is_signed() {
            return Err(CryptoError::MissingSignature.into());
        }
        if self.find_transaction_by_signature(txn.signature()).is_some() {
            log::debug!("Transaction {} already applied", txn.nonce());
            return Ok(false);
        }

        let changes = self.balance_changes(deltas)?;
        let row = TransactionRow {
            signature: txn.signature().to_string(),
            canonical: txn.to_canonical_form(false)?,
        };

        let id = self.db.commit_transaction(&self.balance_rows(&changes), &row)?;
        self.apply_balances(changes);
        self.transactions.push(txn);

        log::info!("Applied transaction {}", id);
        Ok(true)
    }

    // New balances after `deltas`, one entry per wallet
    fn balance_changes(&self, deltas: &[(String, Quant)]) -> Result<Vec<(usize, Quant)>> {
        let mut changes: Vec<(usize, Quant)> = Vec::with_capacity(deltas.len());
        for (pub_key, delta) in deltas {
            let index = self.wallet_index(pub_key)?;
            let (slot, current) = match changes.iter().position(|(i, _)| *i == index) {
                Some(slot) => (Some(slot), changes[slot].1),
                None => (None, self.wallets[index].balance),
            };
            let balance = current
                .checked_add(*delta)
                .ok_or_else(|| StoreError::BalanceOverflow(pub_key.clone()))?;
            match slot {
                Some(slot) => changes[slot].1 = balance,
                None => changes.push((index, balance)),
            }
        }
        Ok(changes)
    }

    fn balance_rows(&self, changes: &[(usize, Quant)]) -> Vec<(i64, WalletRow)> {
        changes
            .iter()
            .map(|&(index, balance)| {
                let mut row = WalletRow::from(&self.wallets[index]);
                row.balance = balance;
                (self.wallets[index].id, row)
            })
            .collect()
    }

    fn write_balances(&mut self, changes: Vec<(usize, Quant)>) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        self.db.update_wallets(&self.balance_rows(&changes))?;
        self.apply_balances(changes);

        Ok(())
    }

    // Index side of a balance write that already reached the database
    fn apply_balances(&mut self, changes: Vec<(usize, Quant)>) {
        for (index, balance) in changes {
            let mut updated = self.wallets[index].clone();
            log::debug!(
                "Balance of wallet {}: {} -> {}",
                updated.id,
                updated.balance,
                balance
            );
            updated.balance = balance;
            self.replace_wallet(index, updated);
        }
    }

    /// Add a node, assigning its id.
    ///
    /// The node's wallet must already be stored under the same id.
    pub fn add_node(&mut self, node: &mut Node) -> Result<()> {
        if node.wallet.pub_key.is_empty() {
            return Err(StoreError::MissingField("pubKey").into());
        }
        if node.uri.is_empty() {
            return Err(StoreError::MissingField("uri").into());
        }
        if self.nodes.iter().any(|n| n.wallet.pub_key == node.wallet.pub_key) {
            return Err(StoreError::DuplicateNode.into());
        }
        if node.wallet.id <= 0 {
            return Err(StoreError::MissingWalletId.into());
        }

        let stored = self
            .find_wallet_by_id(node.wallet.id)
            .ok_or_else(|| StoreError::WalletNotFound(node.wallet.id.to_string()))?;
        if stored.pub_key != node.wallet.pub_key {
            return Err(StoreError::WalletMismatch.into());
        }
        let stored = stored.clone();

        let id = self.db.insert_node(&NodeRow {
            wallet_id: stored.id,
            uri: node.uri.clone(),
        })?;
        node.id = id;

        self.nodes.push(Node {
            id,
            uri: node.uri.clone(),
            wallet: stored,
        });

        log::info!("Added node {} at {}", id, node.uri);
        Ok(())
    }

    /// Add a node read from a document, storing its wallet first if the
    /// public key is new
    pub fn import_node(&mut self, mut node: Node) -> Result<Node> {
        if self.find_node_by_pub_key(&node.wallet.pub_key).is_some() {
            return Err(StoreError::DuplicateNode.into());
        }

        match self.find_wallet_by_pub_key(&node.wallet.pub_key) {
            Some(wallet) => node.wallet = wallet.clone(),
            None => self.add_wallet(&mut node.wallet)?,
        }
        self.add_node(&mut node)?;

        Ok(node)
    }

    /// Add the bundled default node unless its public key is already known
    pub fn seed_default_node(&mut self, node: Node) -> Result<Node> {
        if let Some(existing) = self.find_node_by_pub_key(&node.wallet.pub_key) {
            return Ok(existing.clone());
        }

        let node = self.import_node(node)?;
        log::info!("Seeded default node {}", node.uri);
        Ok(node)
    }

    /// Record a signed transaction; returns whether it was added.
    ///
    /// A transaction whose signature is already on record is a duplicate,
    /// silently skipped when `ignore_duplicate` is set.
    pub fn add_transaction(&mut self, txn: Transaction, ignore_duplicate: bool) -> Result<bool> {
        if !txn.is_signed() {
            return Err(CryptoError::MissingSignature.into());
        }

        if self.find_transaction_by_signature(txn.signature()).is_some() {
            if ignore_duplicate {
                log::debug!("Ignoring duplicate transaction {}", txn.nonce());
                return Ok(false);
            }
            return Err(StoreError::DuplicateTransaction.into());
        }

        let row = TransactionRow {
            signature: txn.signature().to_string(),
            canonical: txn.to_canonical_form(false)?,
        };
        let id = self.db.insert_transaction(&row)?;
        self.transactions.push(txn);

        log::info!("Recorded transaction {}", id);
        Ok(true)
    }

    /// Wallets matching `filter`, in insertion order
    pub fn find_wallets(&self, filter: &WalletFilter) -> Vec<&Wallet> {
        self.wallets.iter().filter(|w| filter.matches(w)).collect()
    }

    /// Nodes matching `filter`, in insertion order
    pub fn find_nodes(&self, filter: &NodeFilter) -> Vec<&Node> {
        self.nodes.iter().filter(|n| filter.matches(n)).collect()
    }

    pub fn find_wallet_by_id(&self, id: i64) -> Option<&Wallet> {
        self.wallets.iter().find(|w| w.id == id)
    }

    /// Exact public key lookup
    pub fn find_wallet_by_pub_key(&self, pub_key: &str) -> Option<&Wallet> {
        self.wallets.iter().find(|w| w.pub_key == pub_key)
    }

    pub fn find_node_by_id(&self, id: i64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Exact public key lookup
    pub fn find_node_by_pub_key(&self, pub_key: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.wallet.pub_key == pub_key)
    }

    /// Wallets with an encrypted private key on record
    pub fn owned_wallets(&self) -> Vec<&Wallet> {
        self.wallets.iter().filter(|w| w.is_owned()).collect()
    }

    /// Wallets known by public key only
    pub fn other_wallets(&self) -> Vec<&Wallet> {
        self.wallets.iter().filter(|w| !w.is_owned()).collect()
    }

    pub fn find_transaction_by_signature(&self, signature: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.signature() == signature)
    }

    pub fn find_transactions_by_type(&self, kind: TransactionType) -> Vec<&Transaction> {
        self.transactions.iter().filter(|t| t.kind() == kind).collect()
    }

    /// Transactions in which `pub_key` takes part
    pub fn find_transactions_by_wallet(&self, pub_key: &str) -> Result<Vec<&Transaction>> {
        if pub_key.is_empty() {
            return Err(StoreError::MissingField("pubKey").into());
        }
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.involves(pub_key))
            .collect())
    }

    fn wallet_index(&self, pub_key: &str) -> Result<usize> {
        self.wallets
            .iter()
            .position(|w| w.pub_key == pub_key)
            .ok_or_else(|| StoreError::WalletNotFound(pub_key.to_string()).into())
    }

    // Keep node copies of a wallet in step with the wallet itself
    fn replace_wallet(&mut self, index: usize, wallet: Wallet) {
        for node in self.nodes.iter_mut().filter(|n| n.wallet.id == wallet.id) {
            node.wallet = wallet.clone();
        }
        self.wallets[index] = wallet;
    }

    fn set_private_key(&mut self, index: usize, priv_key_encrypted: &str) {
        let mut updated = self.wallets[index].clone();
        updated.priv_key_encrypted = priv_key_encrypted.to_string();
        updated.lock();
        self.replace_wallet(index, updated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GenesisTransaction, RegularTransaction};
    use crate::error::Error;
    use crate::wallet::test_params;

    fn owned(name: &str) -> Wallet {
        Wallet::create(name, &format!("{}@example.com", name.to_lowercase()), "password1", &test_params())
            .unwrap()
    }

    fn stored_node(store: &mut LedgerStore, uri: &str) -> Node {
        let mut wallet = owned("Node");
        store.add_wallet(&mut wallet).unwrap();
        let mut node = Node::new(uri, wallet);
        store.add_node(&mut node).unwrap();
        node
    }

    #[test]
    fn test_add_wallet_assigns_ids() {
        let mut store = LedgerStore::memory().unwrap();
        let mut a = owned("Alice");
        let mut b = owned("Bob");

        store.add_wallet(&mut a).unwrap();
        store.add_wallet(&mut b).unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.wallets().len(), 2);
        assert_eq!(store.find_wallet_by_id(2).unwrap().pub_key, b.pub_key);
        // The caller's copy keeps its key, the stored copy never holds one
        assert!(a.is_unlocked());
        assert!(!store.wallets()[0].is_unlocked());
    }

    #[test]
    fn test_add_wallet_requires_pub_key() {
        let mut store = LedgerStore::memory().unwrap();
        let mut w = owned("Alice");
        w.pub_key.clear();

        assert!(matches!(
            store.add_wallet(&mut w),
            Err(Error::Store(StoreError::MissingField("pubKey")))
        ));
        assert!(store.wallets().is_empty());
    }

    #[test]
    fn test_add_wallet_key_recovery() {
        let mut store = LedgerStore::memory().unwrap();
        let full = owned("Alice");

        let mut public = full.public_export();
        store.add_wallet(&mut public).unwrap();
        let original_id = public.id;
        assert!(!store.wallets()[0].is_owned());

        let mut recovered = full.clone();
        store.add_wallet(&mut recovered).unwrap();

        assert_eq!(recovered.id, original_id);
        assert_eq!(store.wallets().len(), 1);
        assert_eq!(store.wallets()[0].priv_key_encrypted, full.priv_key_encrypted);
    }

    #[test]
    fn test_add_wallet_duplicate() {
        let mut store = LedgerStore::memory().unwrap();
        let full = owned("Alice");

        store.add_wallet(&mut full.clone()).unwrap();
        assert!(matches!(
            store.add_wallet(&mut full.clone()),
            Err(Error::Store(StoreError::DuplicateWallet))
        ));

        // Public-only repeat of a known wallet is a duplicate as well
        assert!(matches!(
            store.add_wallet(&mut full.public_export()),
            Err(Error::Store(StoreError::DuplicateWallet))
        ));
        assert_eq!(store.wallets().len(), 1);
    }

    #[test]
    fn test_add_node_validation() {
        let mut store = LedgerStore::memory().unwrap();
        let mut wallet = owned("Node");

        // Wallet not yet stored
        let mut node = Node::new("http://node/", wallet.clone());
        assert!(matches!(
            store.add_node(&mut node),
            Err(Error::Store(StoreError::MissingWalletId))
        ));

        store.add_wallet(&mut wallet).unwrap();

        let mut no_uri = Node::new("", wallet.clone());
        assert!(matches!(
            store.add_node(&mut no_uri),
            Err(Error::Store(StoreError::MissingField("uri")))
        ));

        let mut other = owned("Other");
        store.add_wallet(&mut other).unwrap();
        let mut mismatched = Node::new("http://node/", wallet.clone());
        mismatched.wallet.id = other.id;
        assert!(matches!(
            store.add_node(&mut mismatched),
            Err(Error::Store(StoreError::WalletMismatch))
        ));

        let mut node = Node::new("http://node/", wallet.clone());
        store.add_node(&mut node).unwrap();
        assert_eq!(node.id, 1);

        let mut again = Node::new("http://other/", wallet);
        assert!(matches!(
            store.add_node(&mut again),
            Err(Error::Store(StoreError::DuplicateNode))
        ));
        assert_eq!(store.nodes().len(), 1);
    }

    #[test]
    fn test_remove_wallet_leaves_nodes() {
        let mut store = LedgerStore::memory().unwrap();
        let node = stored_node(&mut store, "http://node/");

        assert!(store.remove_wallet(&node.wallet).unwrap());
        assert!(!store.remove_wallet(&node.wallet).unwrap());
        assert!(store.wallets().is_empty());
        assert_eq!(store.nodes().len(), 1);
    }

    #[test]
    fn test_orphaned_node_dropped_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger");

        {
            let mut store = LedgerStore::open(&path).unwrap();
            let orphan = stored_node(&mut store, "http://orphan/");
            stored_node(&mut store, "http://kept/");
            store.remove_wallet(&orphan.wallet).unwrap();
            assert_eq!(store.nodes().len(), 2);
            store.flush().unwrap();
        }

        let store = LedgerStore::open(&path).unwrap();
        let uris: Vec<&str> = store.nodes().iter().map(|n| n.uri.as_str()).collect();
        assert_eq!(uris, vec!["http://kept/"]);
    }

    #[test]
    fn test_update_meta_and_balance() {
        let mut store = LedgerStore::memory().unwrap();
        let mut w = owned("Alice");
        store.add_wallet(&mut w).unwrap();

        assert!(matches!(
            store.update_meta_and_balance(&mut w, None, None, None),
            Err(Error::Store(StoreError::NoFieldsProvided))
        ));

        store
            .update_meta_and_balance(&mut w, Some("Alicia"), None, Some(42))
            .unwrap();

        assert_eq!(w.name, "Alicia");
        assert_eq!(w.balance, 42);
        let stored = store.find_wallet_by_pub_key(&w.pub_key).unwrap();
        assert_eq!(stored.name, "Alicia");
        assert_eq!(stored.email, "alice@example.com");
        assert_eq!(stored.balance, 42);
    }

    #[test]
    fn test_update_unknown_wallet() {
        let mut store = LedgerStore::memory().unwrap();
        let mut w = owned("Alice");

        assert!(matches!(
            store.update_meta_and_balance(&mut w, None, None, Some(1)),
            Err(Error::Store(StoreError::WalletNotFound(_)))
        ));
    }

    #[test]
    fn test_balance_updates_reach_node_copies() {
        let mut store = LedgerStore::memory().unwrap();
        let node = stored_node(&mut store, "http://node/");

        store
            .adjust_balances(&[(node.wallet.pub_key.clone(), 333)])
            .unwrap();

        assert_eq!(store.nodes()[0].wallet.balance, 333);
        assert_eq!(store.find_wallet_by_pub_key(node.pub_key()).unwrap().balance, 333);
    }

    #[test]
    fn test_adjust_balances_all_or_nothing() {
        let mut store = LedgerStore::memory().unwrap();
        let mut a = owned("Alice");
        store.add_wallet(&mut a).unwrap();

        let result = store.adjust_balances(&[(a.pub_key.clone(), 100), ("02ff".to_string(), 5)]);
        assert!(result.is_err());
        assert_eq!(store.wallets()[0].balance, 0);

        store
            .adjust_balances(&[(a.pub_key.clone(), 100), (a.pub_key.clone(), -30)])
            .unwrap();
        assert_eq!(store.wallets()[0].balance, 70);

        store.set_balances(&[(a.pub_key.clone(), 5)]).unwrap();
        assert_eq!(store.wallets()[0].balance, 5);
    }

    #[test]
    fn test_adjust_balances_overflow() {
        let mut store = LedgerStore::memory().unwrap();
        let mut a = owned("Alice");
        store.add_wallet(&mut a).unwrap();
        store.set_balances(&[(a.pub_key.clone(), Quant::MAX)]).unwrap();

        assert!(matches!(
            store.adjust_balances(&[(a.pub_key.clone(), 1)]),
            Err(Error::Store(StoreError::BalanceOverflow(_)))
        ));
        assert_eq!(store.wallets()[0].balance, Quant::MAX);
    }

    #[test]
    fn test_record_transaction_once() {
        let mut store = LedgerStore::memory().unwrap();
        let mut alice = owned("Alice");
        store.add_wallet(&mut alice).unwrap();
        let txn: Transaction = GenesisTransaction::new(&alice, &alice.pub_key, 20000)
            .unwrap()
            .into();
        let credit = [(alice.pub_key.clone(), 20000)];

        assert!(store.record_transaction(txn.clone(), &credit).unwrap());
        assert!(!store.record_transaction(txn.clone(), &credit).unwrap());
        assert_eq!(store.wallets()[0].balance, 20000);
        assert_eq!(store.transactions(), &[txn]);

        let sender = store.wallets()[0].clone();
        let unsigned: Transaction = RegularTransaction::new(&sender, "02ab", 10, 1, false)
            .unwrap()
            .into();
        assert!(matches!(
            store.record_transaction(unsigned, &[(alice.pub_key.clone(), -1010)]),
            Err(Error::Crypto(CryptoError::MissingSignature))
        ));
        assert_eq!(store.wallets()[0].balance, 20000);
    }

    #[test]
    fn test_find_wallets() {
        let mut store = LedgerStore::memory().unwrap();
        for name in ["Alice", "Bob", "Alfred"] {
            store.add_wallet(&mut owned(name)).unwrap();
        }
        let mut carol = owned("Carol").public_export();
        store.add_wallet(&mut carol).unwrap();

        let found = store.find_wallets(&WalletFilter::new().name("al"));
        let names: Vec<&str> = found.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Alfred"]);

        assert_eq!(store.find_wallets(&WalletFilter::new()).len(), 4);
        assert_eq!(store.owned_wallets().len(), 3);
        assert_eq!(store.other_wallets()[0].name, "Carol");
    }

    #[test]
    fn test_transactions() {
        let mut store = LedgerStore::memory().unwrap();
        let mut alice = owned("Alice");
        let bob = owned("Bob");

        let genesis: Transaction = GenesisTransaction::new(&alice, &alice.pub_key, 20000)
            .unwrap()
            .into();
        alice.balance = 20000;
        let regular: Transaction = RegularTransaction::new(&alice, &bob.pub_key, 5000, 1, true)
            .unwrap()
            .into();
        let unsigned: Transaction = RegularTransaction::new(&alice, &bob.pub_key, 5000, 1, false)
            .unwrap()
            .into();

        assert!(matches!(
            store.add_transaction(unsigned, false),
            Err(Error::Crypto(CryptoError::MissingSignature))
        ));

        assert!(store.add_transaction(genesis.clone(), false).unwrap());
        assert!(store.add_transaction(regular.clone(), false).unwrap());
        assert!(matches!(
            store.add_transaction(regular.clone(), false),
            Err(Error::Store(StoreError::DuplicateTransaction))
        ));
        assert!(!store.add_transaction(regular.clone(), true).unwrap());
        assert_eq!(store.transactions().len(), 2);

        assert_eq!(store.find_transactions_by_wallet(&alice.pub_key).unwrap().len(), 2);
        assert_eq!(store.find_transactions_by_wallet(&bob.pub_key).unwrap(), vec![&regular]);
        assert!(store.find_transactions_by_wallet("").is_err());

        assert_eq!(store.find_transactions_by_type(TransactionType::Genesis), vec![&genesis]);
        assert_eq!(
            store.find_transaction_by_signature(regular.signature()),
            Some(&regular)
        );
    }

    #[test]
    fn test_seed_default_node_once() {
        let mut store = LedgerStore::memory().unwrap();

        let seeded = store.seed_default_node(Node::default_node().unwrap()).unwrap();
        assert!(seeded.id > 0);
        assert!(seeded.wallet.id > 0);

        let again = store.seed_default_node(Node::default_node().unwrap()).unwrap();
        assert_eq!(again.id, seeded.id);
        assert_eq!(store.nodes().len(), 1);
        assert_eq!(store.wallets().len(), 1);
    }

    #[test]
    fn test_import_node() {
        let mut store = LedgerStore::memory().unwrap();
        let mut known = owned("Node").public_export();
        store.add_wallet(&mut known).unwrap();

        let node = store.import_node(Node::new("http://node/", known.clone())).unwrap();
        assert_eq!(node.wallet.id, known.id);
        assert_eq!(store.wallets().len(), 1);

        let fresh = store
            .import_node(Node::new("http://fresh/", owned("Fresh").public_export()))
            .unwrap();
        assert!(fresh.wallet.id > known.id);
        assert_eq!(store.wallets().len(), 2);

        assert!(matches!(
            store.import_node(Node::new("http://again/", known)),
            Err(Error::Store(StoreError::DuplicateNode))
        ));
        assert_eq!(store.nodes().len(), 2);
    }

    #[test]
    fn test_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger");

        let (alice, node, txn) = {
            let mut store = LedgerStore::open(&path).unwrap();
            let mut alice = owned("Alice");
            store.add_wallet(&mut alice).unwrap();
            let node = stored_node(&mut store, "http://node/");
            store.adjust_balances(&[(alice.pub_key.clone(), 30000)]).unwrap();
            alice.balance = 30000;

            let txn: Transaction = RegularTransaction::new(&alice, &node.wallet.pub_key, 100, 1, true)
                .unwrap()
                .into();
            store.add_transaction(txn.clone(), false).unwrap();
            store.flush().unwrap();
            (alice, node, txn)
        };

        let store = LedgerStore::open(&path).unwrap();
        let reloaded = store.find_wallet_by_pub_key(&alice.pub_key).unwrap();
        assert_eq!(reloaded.id, alice.id);
        assert_eq!(reloaded.balance, 30000);
        assert_eq!(reloaded.priv_key_encrypted, alice.priv_key_encrypted);

        assert_eq!(store.nodes().len(), 1);
        assert_eq!(store.nodes()[0].uri, node.uri);
        assert_eq!(store.nodes()[0].wallet.id, node.wallet.id);
        assert_eq!(store.transactions(), &[txn]);
    }

    #[test]
    fn test_update_private_key() {
        let mut store = LedgerStore::memory().unwrap();
        let mut w = owned("Alice");
        store.add_wallet(&mut w).unwrap();

        w.change_password("password1", "password2", &test_params()).unwrap();
        store.update_private_key(&w).unwrap();

        let mut stored = store.find_wallet_by_pub_key(&w.pub_key).unwrap().clone();
        assert!(stored.unlock("password1").is_err());
        stored.unlock("password2").unwrap();
    }
}
