//! Block statistics
//!
//! Counters behind the extension's "blocked" badge and the top-domains
//! list. Updated by the gate after every successful close.

use std::collections::HashMap;

use crate::url::extract_host;

/// Host bucket for openers whose URL has no host.
pub const UNKNOWN_HOST: &str = "(unknown)";

#[derive(Debug, Clone, Default)]
pub struct BlockStats {
    total: u64,
    by_host: HashMap<String, u64>,
}

impl BlockStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one blocked popup opened from `opener_url`.
    pub fn record_block(&mut self, opener_url: &str) {
        self.total += 1;
        let host = extract_host(opener_url).unwrap_or(UNKNOWN_HOST);
        *self.by_host.entry(host.to_ascii_lowercase()).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count_for(&self, host: &str) -> u64 {
        self.by_host.get(host).copied().unwrap_or(0)
    }

    /// The `n` hosts with the most blocks, highest first, ties by name.
    pub fn top_hosts(&self, n: usize) -> Vec<(&str, u64)> {
        let mut hosts: Vec<(&str, u64)> = self
            .by_host
            .iter()
            .map(|(host, &count)| (host.as_str(), count))
            .collect();
        hosts.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        hosts.truncate(n);
        hosts
    }

    pub fn reset(&mut self) {
        self.total = 0;
        self.by_host.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_top_hosts() {
        let mut stats = BlockStats::new();
        stats.record_block("https://b.example/x");
        stats.record_block("https://a.example/y");
        stats.record_block("https://B.example/z");
        stats.record_block("https://c.example/");
        stats.record_block("about:blank");

        assert_eq!(stats.total(), 5);
        assert_eq!(stats.count_for("b.example"), 2);
        assert_eq!(stats.count_for(UNKNOWN_HOST), 1);
        assert_eq!(
            stats.top_hosts(3),
            vec![("b.example", 2), ("(unknown)", 1), ("a.example", 1)]
        );
    }

    #[test]
    fn test_query_with_at_sign_counts_opener_host() {
        let mut stats = BlockStats::new();
        stats.record_block("https://a.example?next=x@b.example");
        assert_eq!(stats.count_for("a.example"), 1);
        assert_eq!(stats.count_for("b.example"), 0);
    }

    #[test]
    fn test_reset() {
        let mut stats = BlockStats::new();
        stats.record_block("https://a.example/");
        stats.reset();
        assert_eq!(stats.total(), 0);
        assert!(stats.top_hosts(5).is_empty());
    }
}
