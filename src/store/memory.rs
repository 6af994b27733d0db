//! In-memory route table.

use dashmap::DashMap;

use crate::store::{ProxyRoute, RouteLookup, StoreError};

/// A concurrent in-memory route table, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    routes: DashMap<String, ProxyRoute>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, route: ProxyRoute) {
        self.routes.insert(route.external_hostname.to_ascii_lowercase(), route);
    }

    pub fn remove(&self, hostname: &str) -> Option<ProxyRoute> {
        self.routes.remove(&hostname.to_ascii_lowercase()).map(|(_, route)| route)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl FromIterator<ProxyRoute> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = ProxyRoute>>(iter: I) -> Self {
        let store = Self::new();
        for route in iter {
            store.insert(route);
        }
        store
    }
}

impl RouteLookup for MemoryStore {
    fn lookup(&self, hostname: &str) -> Result<Option<ProxyRoute>, StoreError> {
        Ok(self
            .routes
            .get(&hostname.to_ascii_lowercase())
            .map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let store: MemoryStore = [ProxyRoute::new("shop.example.com", "10.0.0.5:8080")]
            .into_iter()
            .collect();

        assert!(store.lookup("SHOP.example.COM").unwrap().is_some());
        assert!(store.remove("shop.example.com").is_some());
        assert!(store.is_empty());
    }
}
