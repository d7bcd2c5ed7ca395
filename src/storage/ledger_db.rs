// Ledger database using sled

use crate::core::Quant;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use sled::transaction::{
    ConflictableTransactionResult, TransactionError, Transactional, TransactionalTree,
};
use sled::{Db, Tree};
use std::path::Path;

type Result<T> = std::result::Result<T, StoreError>;

pub(crate) const WALLETS_TABLE: &str = "wallets";
pub(crate) const NODES_TABLE: &str = "nodes";
pub(crate) const TRANSACTIONS_TABLE: &str = "transactions";

const WALLETS_SCHEMA: &str = "create table wallets (id integer primary key autoincrement, \
     name varchar(100), email varchar(100), pubKey varchar(400) not null, \
     privKeyEncrypted varchar(2000) not null, balance integer)";
const NODES_SCHEMA: &str = "create table nodes (id integer primary key autoincrement, \
     walletId integer not null, uri varchar(50) not null)";
const TRANSACTIONS_SCHEMA: &str = "create table transactions (id integer primary key autoincrement, \
     signature varchar(200) not null, canonical text not null)";

/// Persisted wallet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRow {
    pub name: String,
    pub email: String,
    pub pub_key: String,
    pub priv_key_encrypted: String,
    pub balance: Quant,
}

/// Persisted node row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRow {
    pub wallet_id: i64,
    pub uri: String,
}

/// Persisted transaction row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub signature: String,
    pub canonical: String,
}

/// Ledger database: one tree per table plus a meta tree for
/// schema descriptions and id counters
pub struct LedgerDb {
    db: Db,
    wallets: Tree,
    nodes: Tree,
    transactions: Tree,
    meta: Tree,
}

impl LedgerDb {
    /// Open (or create) the database at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| StoreError::Database(format!("Failed to open database: {}", e)))?;
        Self::from_db(db)
    }

    /// Create an in-memory database (for testing)
    pub fn memory() -> Result<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config
            .open()
            .map_err(|e| StoreError::Database(format!("Failed to create memory db: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let ledger = Self {
            wallets: db.open_tree(WALLETS_TABLE)?,
            nodes: db.open_tree(NODES_TABLE)?,
            transactions: db.open_tree(TRANSACTIONS_TABLE)?,
            meta: db.open_tree("meta")?,
            db,
        };

        ledger.check_schema(WALLETS_TABLE, WALLETS_SCHEMA)?;
        ledger.check_schema(NODES_TABLE, NODES_SCHEMA)?;
        ledger.check_schema(TRANSACTIONS_TABLE, TRANSACTIONS_SCHEMA)?;

        Ok(ledger)
    }

    /// Record the table description on first open, compare it afterwards
    fn check_schema(&self, table: &str, schema: &str) -> Result<()> {
        let key = Self::schema_key(table);

        match self.meta.get(&key)? {
            Some(stored) => {
                let stored = String::from_utf8_lossy(&stored);
                if !stored.eq_ignore_ascii_case(schema) {
                    log::error!("Schema for {} table differs from the stored one", table);
                    return Err(StoreError::SchemaConflict {
                        table: table.to_string(),
                    });
                }
            }
            None => {
                log::info!("Creating {} table", table);
                self.meta.insert(key, schema.as_bytes())?;
            }
        }

        Ok(())
    }

    /// Overwrite a stored schema description
    #[cfg(test)]
    pub(crate) fn set_schema(&self, table: &str, schema: &str) -> Result<()> {
        self.meta.insert(Self::schema_key(table), schema.as_bytes())?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> Db {
        self.db
    }

    #[cfg(test)]
    pub(crate) fn reopen(db: Db) -> Result<Self> {
        Self::from_db(db)
    }

    /// Load all wallet rows in id order
    pub fn load_wallets(&self) -> Result<Vec<(i64, WalletRow)>> {
        Self::load_rows(&self.wallets)
    }

    /// Load all node rows in id order
    pub fn load_nodes(&self) -> Result<Vec<(i64, NodeRow)>> {
        Self::load_rows(&self.nodes)
    }

    /// Load all transaction rows in id order
    pub fn load_transactions(&self) -> Result<Vec<(i64, TransactionRow)>> {
        Self::load_rows(&self.transactions)
    }

    /// Insert a wallet row, returning its generated id
    pub fn insert_wallet(&self, row: &WalletRow) -> Result<i64> {
        self.insert_row(&self.wallets, WALLETS_TABLE, row)
    }

    /// Insert a node row, returning its generated id
    pub fn insert_node(&self, row: &NodeRow) -> Result<i64> {
        self.insert_row(&self.nodes, NODES_TABLE, row)
    }

    /// Insert a transaction row, returning its generated id
    pub fn insert_transaction(&self, row: &TransactionRow) -> Result<i64> {
        self.insert_row(&self.transactions, TRANSACTIONS_TABLE, row)
    }

    /// Replace a wallet row
    pub fn update_wallet(&self, id: i64, row: &WalletRow) -> Result<()> {
        self.update_wallets(&[(id, row.clone())])
    }

    /// Replace several wallet rows at once; either all are written or none
    pub fn update_wallets(&self, rows: &[(i64, WalletRow)]) -> Result<()> {
        let encoded = Self::encode_rows(rows)?;

        self.wallets
            .transaction(|tree| -> ConflictableTransactionResult<()> {
                for (key, value) in &encoded {
                    tree.insert(key.as_slice(), value.as_slice())?;
                }
                Ok(())
            })
            .map_err(Self::transaction_error)?;

        Ok(())
    }

    /// Write wallet rows and insert a transaction row in one commit,
    /// returning the transaction's generated id
    pub fn commit_transaction(
        &self,
        wallets: &[(i64, WalletRow)],
        txn: &TransactionRow,
    ) -> Result<i64> {
        let encoded = Self::encode_rows(wallets)?;
        let value = Self::encode(txn)?;
        let seq_key = Self::seq_key(TRANSACTIONS_TABLE);

        let id = (&self.wallets, &self.transactions, &self.meta)
            .transaction(|(wallet_tree, txn_tree, meta)| -> ConflictableTransactionResult<i64> {
                for (key, row) in &encoded {
                    wallet_tree.insert(key.as_slice(), row.as_slice())?;
                }
                let id = Self::next_id(meta, &seq_key)?;
                txn_tree.insert(Self::id_key(id), value.as_slice())?;
                Ok(id)
            })
            .map_err(Self::transaction_error)?;

        log::debug!("Committed transaction row {} with {} wallet rows", id, wallets.len());
        Ok(id)
    }

    /// Delete a wallet row; returns whether it existed
    pub fn delete_wallet(&self, id: i64) -> Result<bool> {
        Ok(self.wallets.remove(Self::id_key(id))?.is_some())
    }

    /// Manually flush database
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    fn insert_row<T: Serialize>(&self, tree: &Tree, table: &str, row: &T) -> Result<i64> {
        let value = Self::encode(row)?;
        let seq_key = Self::seq_key(table);

        let id = (tree, &self.meta)
            .transaction(|(tree, meta)| -> ConflictableTransactionResult<i64> {
                let id = Self::next_id(meta, &seq_key)?;
                tree.insert(Self::id_key(id), value.as_slice())?;
                Ok(id)
            })
            .map_err(Self::transaction_error)?;

        log::debug!("Inserted {} row {}", table, id);
        Ok(id)
    }

    // Bump a table's id counter inside a transaction
    fn next_id(meta: &TransactionalTree, seq_key: &[u8]) -> ConflictableTransactionResult<i64> {
        let next = match meta.get(seq_key)? {
            Some(bytes) => Self::decode_id(&bytes) + 1,
            None => 1,
        };
        meta.insert(seq_key, Self::id_key(next))?;
        Ok(next)
    }

    fn load_rows<T: DeserializeOwned>(tree: &Tree) -> Result<Vec<(i64, T)>> {
        let mut rows = Vec::new();
        for item in tree.iter() {
            let (key, value) = item?;
            let row = serde_json::from_slice(&value)
                .map_err(|e| StoreError::Database(format!("Corrupt row: {}", e)))?;
            rows.push((Self::decode_id(&key), row));
        }
        Ok(rows)
    }

    fn encode_rows(rows: &[(i64, WalletRow)]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        rows.iter()
            .map(|(id, row)| Ok((Self::id_key(*id), Self::encode(row)?)))
            .collect()
    }

    fn encode<T: Serialize>(row: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(row).map_err(|e| StoreError::Database(format!("Failed to encode row: {}", e)))
    }

    fn transaction_error(e: TransactionError<()>) -> StoreError {
        match e {
            TransactionError::Abort(()) => StoreError::Database("Transaction aborted".to_string()),
            TransactionError::Storage(e) => e.into(),
        }
    }

    // Helper: big-endian id, so tree order is insertion order
    fn id_key(id: i64) -> Vec<u8> {
        id.to_be_bytes().to_vec()
    }

    fn decode_id(bytes: &[u8]) -> i64 {
        let mut buf = [0u8; 8];
        let n = bytes.len().min(8);
        buf[8 - n..].copy_from_slice(&bytes[bytes.len() - n..]);
        i64::from_be_bytes(buf)
    }

    // Helper: meta key holding a table's schema description
    fn schema_key(table: &str) -> Vec<u8> {
        format!("schema/{}", table).into_bytes()
    }

    // Helper: meta key holding a table's last assigned id
    fn seq_key(table: &str) -> Vec<u8> {
        format!("seq/{}", table).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, pub_key: &str) -> WalletRow {
        WalletRow {
            name: name.to_string(),
            email: String::new(),
            pub_key: pub_key.to_string(),
            priv_key_encrypted: String::new(),
            balance: 0,
        }
    }

    #[test]
    fn test_ids_are_sequential_per_table() {
        let db = LedgerDb::memory().unwrap();

        assert_eq!(db.insert_wallet(&row("a", "01")).unwrap(), 1);
        assert_eq!(db.insert_wallet(&row("b", "02")).unwrap(), 2);

        let node = NodeRow {
            wallet_id: 2,
            uri: "http://x/".to_string(),
        };
        assert_eq!(db.insert_node(&node).unwrap(), 1);

        let wallets = db.load_wallets().unwrap();
        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets[0], (1, row("a", "01")));
        assert_eq!(wallets[1].0, 2);
        assert_eq!(db.load_nodes().unwrap(), vec![(1, node)]);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let db = LedgerDb::memory().unwrap();

        let id = db.insert_wallet(&row("a", "01")).unwrap();
        assert!(db.delete_wallet(id).unwrap());
        assert!(!db.delete_wallet(id).unwrap());

        assert_eq!(db.insert_wallet(&row("b", "02")).unwrap(), id + 1);
    }

    #[test]
    fn test_update_wallets() {
        let db = LedgerDb::memory().unwrap();
        let a = db.insert_wallet(&row("a", "01")).unwrap();
        let b = db.insert_wallet(&row("b", "02")).unwrap();

        let mut ra = row("a", "01");
        ra.balance = 10;
        let mut rb = row("b", "02");
        rb.balance = 20;
        db.update_wallets(&[(a, ra.clone()), (b, rb.clone())]).unwrap();

        assert_eq!(db.load_wallets().unwrap(), vec![(a, ra), (b, rb)]);
    }

    #[test]
    fn test_commit_transaction_writes_both_tables() {
        let db = LedgerDb::memory().unwrap();
        let a = db.insert_wallet(&row("a", "01")).unwrap();

        let mut ra = row("a", "01");
        ra.balance = -500;
        let txn = TransactionRow {
            signature: "aa".to_string(),
            canonical: "{}".to_string(),
        };

        assert_eq!(db.commit_transaction(&[(a, ra.clone())], &txn).unwrap(), 1);
        assert_eq!(db.insert_transaction(&txn).unwrap(), 2);

        assert_eq!(db.load_wallets().unwrap(), vec![(a, ra)]);
        assert_eq!(db.load_transactions().unwrap().len(), 2);
    }

    #[test]
    fn test_schema_conflict() {
        let db = LedgerDb::memory().unwrap();
        db.set_schema(NODES_TABLE, "create table nodes (id integer)").unwrap();

        let result = LedgerDb::reopen(db.into_inner());
        assert!(matches!(
            result,
            Err(StoreError::SchemaConflict { table }) if table == NODES_TABLE
        ));
    }

    #[test]
    fn test_schema_check_ignores_case() {
        let db = LedgerDb::memory().unwrap();
        db.set_schema(WALLETS_TABLE, &WALLETS_SCHEMA.to_uppercase()).unwrap();

        assert!(LedgerDb::reopen(db.into_inner()).is_ok());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger");

        {
            let db = LedgerDb::new(&path).unwrap();
            db.insert_wallet(&row("a", "01")).unwrap();
            db.flush().unwrap();
        }

        let db = LedgerDb::new(&path).unwrap();
        assert_eq!(db.load_wallets().unwrap(), vec![(1, row("a", "01"))]);
        assert_eq!(db.insert_wallet(&row("b", "02")).unwrap(), 2);
    }
}
