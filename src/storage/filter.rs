// Store query filters

use crate::core::Quant;
use crate::network::Node;
use crate::wallet::Wallet;

/// Wallet query; unset fields match everything.
///
/// Strings match as case-insensitive substrings, the balance bounds are
/// inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub pub_key: Option<String>,
    pub priv_key_encrypted: Option<String>,
    pub min_balance: Option<Quant>,
    pub max_balance: Option<Quant>,
}

impl WalletFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn pub_key(mut self, pub_key: &str) -> Self {
        self.pub_key = Some(pub_key.to_string());
        self
    }

    pub fn priv_key_encrypted(mut self, priv_key_encrypted: &str) -> Self {
        self.priv_key_encrypted = Some(priv_key_encrypted.to_string());
        self
    }

    pub fn balance_between(mut self, min: Option<Quant>, max: Option<Quant>) -> Self {
        self.min_balance = min;
        self.max_balance = max;
        self
    }

    pub fn matches(&self, wallet: &Wallet) -> bool {
        contains(&self.name, &wallet.name)
            && contains(&self.email, &wallet.email)
            && contains(&self.pub_key, &wallet.pub_key)
            && contains(&self.priv_key_encrypted, &wallet.priv_key_encrypted)
            && self.min_balance.is_none_or(|min| wallet.balance >= min)
            && self.max_balance.is_none_or(|max| wallet.balance <= max)
    }
}

/// Node query; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub uri: Option<String>,
    pub pub_key: Option<String>,
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = Some(uri.to_string());
        self
    }

    pub fn pub_key(mut self, pub_key: &str) -> Self {
        self.pub_key = Some(pub_key.to_string());
        self
    }

    pub fn matches(&self, node: &Node) -> bool {
        contains(&self.uri, &node.uri) && contains(&self.pub_key, &node.wallet.pub_key)
    }
}

fn contains(needle: &Option<String>, haystack: &str) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(name: &str, email: &str, balance: Quant) -> Wallet {
        Wallet::from_record(1, name.to_string(), email.to_string(), "02ab".to_string(), String::new(), balance)
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert!(WalletFilter::new().matches(&wallet("", "", 0)));
        assert!(WalletFilter::new().matches(&wallet("x", "y", -5)));
    }

    #[test]
    fn test_case_insensitive_substring() {
        let w = wallet("Alice Smith", "Alice@Example.com", 0);

        assert!(WalletFilter::new().name("alice").matches(&w));
        assert!(WalletFilter::new().name("SMITH").matches(&w));
        assert!(WalletFilter::new().email("example.COM").matches(&w));
        assert!(!WalletFilter::new().name("bob").matches(&w));
        assert!(!WalletFilter::new().name("alice").email("bob").matches(&w));
    }

    #[test]
    fn test_balance_range_is_inclusive() {
        let w = wallet("a", "", 100);

        assert!(WalletFilter::new().balance_between(Some(100), Some(100)).matches(&w));
        assert!(WalletFilter::new().balance_between(Some(50), None).matches(&w));
        assert!(WalletFilter::new().balance_between(None, Some(150)).matches(&w));
        assert!(!WalletFilter::new().balance_between(Some(101), None).matches(&w));
        assert!(!WalletFilter::new().balance_between(None, Some(99)).matches(&w));
    }

    #[test]
    fn test_node_filter() {
        let node = Node::new("http://Node.Example/", wallet("n", "", 0));

        assert!(NodeFilter::new().matches(&node));
        assert!(NodeFilter::new().uri("node.example").matches(&node));
        assert!(NodeFilter::new().pub_key("AB").matches(&node));
        assert!(!NodeFilter::new().uri("other").matches(&node));
    }
}
