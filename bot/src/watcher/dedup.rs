use std::collections::{HashSet, VecDeque};

/// Bounded FIFO of already-alerted transaction hashes for one watch key.
/// Once the cap is reached the oldest entry falls out first.
#[derive(Debug, Clone)]
pub struct NotifiedSet {
    order: VecDeque<String>,
    seen: HashSet<String>,
    cap: usize,
}

impl NotifiedSet {
    pub fn new(cap: usize) -> Self {
        Self {
            order: VecDeque::new(),
            seen: HashSet::new(),
            cap: cap.max(1),
        }
    }

    /// Rebuilds a set from persisted hashes, oldest first.
    pub fn from_hashes(hashes: Vec<String>, cap: usize) -> Self {
        let mut set = Self::new(cap);
        for hash in hashes {
            set.insert(hash);
        }
        set
    }

    pub fn contains(&self, tx_hash: &str) -> bool {
        self.seen.contains(tx_hash)
    }

    /// Records a hash, evicting the oldest entry when full. Returns false
    /// when the hash was already present.
    pub fn insert(&mut self, tx_hash: String) -> bool {
        if self.seen.contains(&tx_hash) {
            return false;
        }

        if self.order.len() == self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }

        self.seen.insert(tx_hash.clone());
        self.order.push_back(tx_hash);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut set = NotifiedSet::new(10);
        assert!(set.insert("0xh1".to_string()));
        assert!(set.contains("0xh1"));
        assert!(!set.contains("0xh2"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut set = NotifiedSet::new(10);
        assert!(set.insert("0xh1".to_string()));
        assert!(!set.insert("0xh1".to_string()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn evicts_oldest_beyond_cap() {
        let mut set = NotifiedSet::new(3);
        for hash in ["0xh1", "0xh2", "0xh3", "0xh4"] {
            set.insert(hash.to_string());
        }

        assert_eq!(set.len(), 3);
        assert!(!set.contains("0xh1"));
        assert!(set.contains("0xh2"));
        assert!(set.contains("0xh3"));
        assert!(set.contains("0xh4"));
    }

    #[test]
    fn evicted_hash_can_be_inserted_again() {
        let mut set = NotifiedSet::new(2);
        set.insert("0xh1".to_string());
        set.insert("0xh2".to_string());
        set.insert("0xh3".to_string());

        assert!(!set.contains("0xh1"));
        assert!(set.insert("0xh1".to_string()));
        assert!(!set.contains("0xh2"));
    }

    #[test]
    fn from_hashes_applies_the_cap() {
        let hashes = (1..=5).map(|i| format!("0xh{}", i)).collect();
        let set = NotifiedSet::from_hashes(hashes, 3);

        assert_eq!(set.len(), 3);
        assert!(!set.contains("0xh1"));
        assert!(!set.contains("0xh2"));
        assert!(set.contains("0xh5"));
    }

    #[test]
    fn zero_cap_is_clamped() {
        let mut set = NotifiedSet::new(0);
        assert!(set.insert("0xh1".to_string()));
        assert!(set.contains("0xh1"));
        assert_eq!(set.len(), 1);
    }
}
