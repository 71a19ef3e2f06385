//! Authoritative name-keyed set of resolved contracts for one output target

use crate::types::Contract;
use indexmap::IndexMap;
use std::sync::Arc;

/// Insertion-ordered map from contract name to resolved contract.
///
/// Keys always equal the `name` of their value. Replacing an entry keeps its
/// position; removing one preserves the order of the rest, so the generated
/// artifact stays stable across incremental updates.
#[derive(Debug, Clone, Default)]
pub struct ContractMap {
    entries: IndexMap<String, Arc<Contract>>,
}

impl ContractMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a contract whose name must not already be present.
    ///
    /// Hands the contract back on collision.
    pub fn insert_new(&mut self, contract: Contract) -> std::result::Result<(), Contract> {
        if self.entries.contains_key(&contract.name) {
            return Err(contract);
        }
        self.entries
            .insert(contract.name.clone(), Arc::new(contract));
        Ok(())
    }

    /// Insert or replace a contract, returning the previous entry
    pub fn upsert(&mut self, contract: Contract) -> Option<Arc<Contract>> {
        self.entries
            .insert(contract.name.clone(), Arc::new(contract))
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<Contract>> {
        self.entries.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Contract>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Cheap copy of the current contents, in map order
    pub fn snapshot(&self) -> Vec<Arc<Contract>> {
        self.entries.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolver::resolve, types::ContractDefinition};
    use serde_json::json;

    fn contract(name: &str, function: &str) -> Contract {
        let abi = json!([{
            "type": "function",
            "name": function,
            "stateMutability": "view",
            "inputs": [],
            "outputs": []
        }]);
        resolve(&ContractDefinition::new(name, abi), true).unwrap()
    }

    #[test]
    fn test_insert_new_rejects_duplicates() {
        let mut map = ContractMap::new();
        map.insert_new(contract("A", "a")).unwrap();
        let rejected = map.insert_new(contract("A", "b")).unwrap_err();
        assert_eq!(rejected.name, "A");
        assert_eq!(map.len(), 1);
        assert!(map.get("A").unwrap().content.contains("\"a\""));
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut map = ContractMap::new();
        map.insert_new(contract("A", "a")).unwrap();
        map.insert_new(contract("B", "b")).unwrap();
        map.insert_new(contract("C", "c")).unwrap();

        let previous = map.upsert(contract("B", "updated")).unwrap();
        assert!(previous.content.contains("\"b\""));
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert!(map.get("B").unwrap().content.contains("\"updated\""));

        assert!(map.upsert(contract("D", "d")).is_none());
        assert_eq!(map.names().last(), Some("D"));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut map = ContractMap::new();
        for name in ["A", "B", "C"] {
            map.insert_new(contract(name, "f")).unwrap();
        }

        assert!(map.remove("B").is_some());
        assert!(map.remove("missing").is_none());
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["A", "C"]);
        assert!(!map.contains("B"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut map = ContractMap::new();
        map.insert_new(contract("A", "a")).unwrap();
        let snapshot = map.snapshot();
        map.remove("A");
        assert_eq!(snapshot.len(), 1);
        assert!(map.is_empty());
    }
}
