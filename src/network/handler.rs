// Reply handlers - apply verified node replies to the ledger store

use crate::core::{Quant, Signable, Transaction, format_balance};
use crate::error::{PacketError, Result};
use crate::network::{
    GetWalletsPacket, Node, NodeClient, Packet, PacketType, Transport, TransactionPacket,
    WalletListPacket,
};
use crate::storage::LedgerStore;
use crate::wallet::Wallet;
use tokio::sync::RwLock;

/// What a node decided about a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Accepted,
    Rejected(String),
}

/// Check a reply was signed by `node`.
///
/// Failures are logged and reported as `VerificationFailed`; the reply
/// must not be acted on.
pub fn verify_reply(node: &Node, reply: &mut Packet) -> Result<()> {
    let kind = reply.packet_type();
    let verified = match reply.signed_mut() {
        Some(signed) => match node.wallet.verify(signed) {
            Ok(valid) => valid,
            Err(e) => {
                log::warn!("Reply from {} could not be verified: {}", node.uri, e);
                false
            }
        },
        None => {
            log::warn!("Unsigned {} reply from {}", kind, node.uri);
            false
        }
    };

    if !verified {
        log::warn!("Dropping {} reply from {}: bad signature", kind, node.uri);
        return Err(PacketError::VerificationFailed(node.uri.clone()).into());
    }

    Ok(())
}

/// Ask `node` for the balances of every stored wallet and apply them.
///
/// Returns the number of wallets whose balance changed.
pub async fn refresh_balances<T: Transport>(
    client: &NodeClient<T>,
    store: &RwLock<LedgerStore>,
    node: &Node,
) -> Result<usize> {
    let request = {
        let store = store.read().await;
        GetWalletsPacket::new(store.wallets())
    };
    if request.pub_keys.is_empty() {
        return Ok(0);
    }

    let mut reply = client.send(&request.into(), node).await?;
    verify_reply(node, &mut reply)?;

    match reply {
        Packet::WalletList(list) => {
            let mut store = store.write().await;
            apply_wallet_list(&mut store, &list)
        }
        Packet::Error(error) => {
            log::warn!("Node {} refused balance refresh: {}", node.uri, error.msg);
            Err(PacketError::Remote(error.msg).into())
        }
        other => Err(PacketError::UnexpectedReply {
            expected: PacketType::WalletList,
            actual: other.packet_type(),
        }
        .into()),
    }
}

/// Apply a verified wallet list; returns the number of balances changed.
///
/// A stored wallet the node left out of its list but which still carries
/// a balance is logged as anomalous and left as it is.
pub fn apply_wallet_list(store: &mut LedgerStore, list: &WalletListPacket) -> Result<usize> {
    let mut balances: Vec<(String, Quant)> = Vec::new();

    for known in anomalous_wallets(store, list) {
        log::warn!(
            "Anomalous balance {} for wallet {}",
            format_balance(known.balance),
            known.display_name()
        );
    }

    for wallet in &list.wallets {
        match store.find_wallet_by_pub_key(&wallet.pub_key) {
            Some(known) if known.balance != wallet.balance => {
                balances.push((wallet.pub_key.clone(), wallet.balance));
            }
            Some(_) => {}
            None if wallet.balance != 0 => {
                log::warn!(
                    "Node reported balance {} for unknown wallet {}",
                    wallet.balance,
                    wallet.pub_key
                );
            }
            None => {}
        }
    }

    store.set_balances(&balances)?;
    log::info!("Refreshed {} balances", balances.len());

    Ok(balances.len())
}

// Stored wallets with a balance that the node did not list
fn anomalous_wallets<'a>(store: &'a LedgerStore, list: &WalletListPacket) -> Vec<&'a Wallet> {
    store
        .wallets()
        .iter()
        .filter(|known| known.balance != 0)
        .filter(|known| !list.wallets.iter().any(|w| w.pub_key == known.pub_key))
        .collect()
}

/// Submit a signed transaction to `node` and apply it if accepted
pub async fn submit_transaction<T: Transport>(
    client: &NodeClient<T>,
    store: &RwLock<LedgerStore>,
    node: &Node,
    txn: Transaction,
) -> Result<TransactionOutcome> {
    let request = Packet::from(TransactionPacket::new(txn.clone()));
    let mut reply = client.send(&request, node).await?;
    verify_reply(node, &mut reply)?;

    match reply {
        Packet::TransactionReply(reply) => {
            if !reply.txn_nonce.is_empty() && reply.txn_nonce != txn.nonce() {
                log::warn!(
                    "Reply from {} is for transaction {}, not {}",
                    node.uri,
                    reply.txn_nonce,
                    txn.nonce()
                );
                return Err(PacketError::Malformed(format!(
                    "reply for unknown transaction {}",
                    reply.txn_nonce
                ))
                .into());
            }

            if !reply.succ {
                log::warn!("Node {} rejected transaction: {}", node.uri, reply.msg);
                return Ok(TransactionOutcome::Rejected(reply.msg));
            }

            let mut store = store.write().await;
            if !apply_transaction(&mut store, txn)? {
                log::warn!("Node {} accepted a transaction already on record", node.uri);
            }
            Ok(TransactionOutcome::Accepted)
        }
        Packet::Error(error) => {
            log::warn!("Node {} reported error: {}", node.uri, error.msg);
            Ok(TransactionOutcome::Rejected(error.msg))
        }
        other => Err(PacketError::UnexpectedReply {
            expected: PacketType::TransactionReply,
            actual: other.packet_type(),
        }
        .into()),
    }
}

/// Apply an accepted transaction to local balances and record it; returns
/// whether anything changed.
///
/// The sender pays `amount + fee`, the recipient gains `amount` and every
/// known node wallet gains `fee / node_count`. Recipients not in the store
/// are skipped. A transaction already on record is not applied again.
pub fn apply_transaction(store: &mut LedgerStore, txn: Transaction) -> Result<bool> {
    if store.find_transaction_by_signature(txn.signature()).is_some() {
        log::debug!("Transaction {} already applied", txn.nonce());
        return Ok(false);
    }

    let mut deltas: Vec<(String, Quant)> = Vec::new();

    match &txn {
        Transaction::Genesis(genesis) => {
            push_if_known(store, &mut deltas, &genesis.beneficiary_pub_key, genesis.amount);
        }
        Transaction::Regular(regular) => {
            deltas.push((regular.sender_pub_key.clone(), -regular.total_debit()));
            push_if_known(store, &mut deltas, &regular.recipient_pub_key, regular.amount);

            let node_count = store.node_count() as Quant;
            if node_count > 0 {
                let share = regular.fee / node_count;
                let node_keys: Vec<String> =
                    store.nodes().iter().map(|n| n.wallet.pub_key.clone()).collect();
                for pub_key in node_keys {
                    push_if_known(store, &mut deltas, &pub_key, share);
                }
            }
        }
    }

    store.record_transaction(txn, &deltas)
}

fn push_if_known(store: &LedgerStore, deltas: &mut Vec<(String, Quant)>, pub_key: &str, amount: Quant) {
    if store.find_wallet_by_pub_key(pub_key).is_some() {
        deltas.push((pub_key.to_string(), amount));
    } else {
        log::debug!("Skipping credit to unknown wallet {}", pub_key);
    }
}
