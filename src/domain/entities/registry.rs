//! The persisted URL-to-entry cache registry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cache_key::CacheKey;

/// One persisted cache record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Key naming the backing file in the cache directory.
    pub cache_key: CacheKey,
    /// When the entry was recorded. Drives oldest-first eviction.
    pub created_at: DateTime<Utc>,
}

impl RegistryEntry {
    /// Creates an entry recorded now.
    #[must_use]
    pub fn new(cache_key: CacheKey) -> Self {
        Self {
            cache_key,
            created_at: Utc::now(),
        }
    }

    /// Creates an entry with an explicit record time.
    #[must_use]
    pub const fn recorded_at(cache_key: CacheKey, created_at: DateTime<Utc>) -> Self {
        Self {
            cache_key,
            created_at,
        }
    }
}

/// In-memory view of the persisted cache index.
///
/// Maps source URLs to their current entry. The registry itself knows nothing
/// about files on disk; [`CacheStore`](crate::infrastructure::CacheStore)
/// pairs it with the cache directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl CacheRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the entry for `url`.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&RegistryEntry> {
        self.entries.get(url)
    }

    /// Records `entry` for `url`, returning the displaced entry if any.
    pub fn insert(&mut self, url: String, entry: RegistryEntry) -> Option<RegistryEntry> {
        self.entries.insert(url, entry)
    }

    /// Removes the entry for `url`.
    pub fn remove(&mut self, url: &str) -> Option<RegistryEntry> {
        self.entries.remove(url)
    }

    /// Removes and returns the entry with the earliest `created_at`.
    ///
    /// Ties are broken arbitrarily.
    pub fn pop_oldest(&mut self) -> Option<(String, RegistryEntry)> {
        let url = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.created_at)
            .map(|(url, _)| url.clone())?;
        let entry = self.entries.remove(&url)?;
        Some((url, entry))
    }

    /// Iterates over all recorded entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegistryEntry)> {
        self.entries.iter()
    }

    /// Iterates over the cache keys referenced by the registry.
    pub fn cache_keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.values().map(|entry| &entry.cache_key)
    }

    /// Empties the registry, returning the removed entries.
    pub fn take_entries(&mut self) -> HashMap<String, RegistryEntry> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn entry_aged(url: &str, minutes_ago: i64) -> RegistryEntry {
        RegistryEntry::recorded_at(
            CacheKey::derive_with_salt(url, 1000 + minutes_ago.unsigned_abs()),
            Utc::now() - TimeDelta::minutes(minutes_ago),
        )
    }

    #[test]
    fn test_insert_displaces_the_previous_entry() {
        let mut registry = CacheRegistry::new();
        let first = entry_aged("https://cdn.example.com/a.png", 10);
        let second = entry_aged("https://cdn.example.com/a.png", 0);

        assert!(registry
            .insert("https://cdn.example.com/a.png".to_string(), first.clone())
            .is_none());
        let displaced = registry.insert("https://cdn.example.com/a.png".to_string(), second);

        assert_eq!(displaced, Some(first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_pop_oldest_drains_in_creation_order() {
        let mut registry = CacheRegistry::new();
        registry.insert("https://cdn.example.com/new.png".to_string(), entry_aged("new", 1));
        registry.insert("https://cdn.example.com/old.png".to_string(), entry_aged("old", 30));
        registry.insert("https://cdn.example.com/mid.png".to_string(), entry_aged("mid", 15));

        let order: Vec<String> = std::iter::from_fn(|| registry.pop_oldest())
            .map(|(url, _)| url)
            .collect();

        assert_eq!(
            order,
            vec![
                "https://cdn.example.com/old.png",
                "https://cdn.example.com/mid.png",
                "https://cdn.example.com/new.png",
            ]
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_take_entries_leaves_the_registry_empty() {
        let mut registry = CacheRegistry::new();
        registry.insert("https://cdn.example.com/a.png".to_string(), entry_aged("a", 1));
        registry.insert("https://cdn.example.com/b.png".to_string(), entry_aged("b", 2));

        let drained = registry.take_entries();

        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_round_trips_through_json() {
        let mut registry = CacheRegistry::new();
        registry.insert("https://cdn.example.com/a.png".to_string(), entry_aged("a", 5));

        let json = serde_json::to_string(&registry).unwrap();
        let back: CacheRegistry = serde_json::from_str(&json).unwrap();

        assert_eq!(back.len(), 1);
        assert_eq!(
            back.get("https://cdn.example.com/a.png"),
            registry.get("https://cdn.example.com/a.png")
        );
    }
}
