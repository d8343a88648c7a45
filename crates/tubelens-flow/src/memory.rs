//! Shared and per-branch state handed to every node.
//!
//! [`Memory`] has three parts:
//!
//! - typed `resources` shared by every branch for the whole run
//!   (store handles, collaborator clients, output settings)
//! - a **global** JSON map shared by reference with every branch, so a
//!   write from any branch is visible to its siblings and the parent
//! - a **local** JSON overlay owned by one branch (`item`, `index`,
//!   per-branch limits); reads check it before global
//!
//! Inside a fan-out branch the memory also carries the branch's
//! [`SlotHandle`].

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{FlowError, Result};
use crate::slots::SlotHandle;

/// Local key holding the fan-out item of a branch.
pub const ITEM_KEY: &str = "item";

/// Local key holding the fan-out index of a branch.
pub const INDEX_KEY: &str = "index";

/// State visible to nodes while a flow runs.
pub struct Memory<R> {
    resources: Arc<R>,
    global: Arc<RwLock<Map<String, Value>>>,
    local: Map<String, Value>,
    slot: Option<SlotHandle>,
}

impl<R> Memory<R> {
    /// Create a top-level memory with empty global and local maps.
    pub fn new(resources: R) -> Self {
        Self::with_shared(Arc::new(resources))
    }

    /// Create a top-level memory over already-shared resources.
    pub fn with_shared(resources: Arc<R>) -> Self {
        Self {
            resources,
            global: Arc::new(RwLock::new(Map::new())),
            local: Map::new(),
            slot: None,
        }
    }

    /// Seed a global value while constructing the memory.
    pub fn with_global(self, key: impl Into<String>, value: Value) -> Self {
        self.global.write().insert(key.into(), value);
        self
    }

    pub fn resources(&self) -> &R {
        &self.resources
    }

    pub fn shared_resources(&self) -> Arc<R> {
        Arc::clone(&self.resources)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Raw value for `key`, checking local before global.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.local.get(key) {
            return Some(value.clone());
        }
        self.global.read().get(key).cloned()
    }

    /// Typed value for `key`, or `None` if unset (or JSON null).
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_value(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| FlowError::Serialization {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    /// Typed value for `key`; a missing key is an error.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get(key)?
            .ok_or_else(|| FlowError::MissingKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.local.contains_key(key) || self.global.read().contains_key(key)
    }

    /// The fan-out item of this branch.
    pub fn item<T: DeserializeOwned>(&self) -> Result<T> {
        self.local
            .get(ITEM_KEY)
            .cloned()
            .ok_or_else(|| FlowError::MissingKey(ITEM_KEY.to_string()))
            .and_then(|value| {
                serde_json::from_value(value).map_err(|source| FlowError::Serialization {
                    key: ITEM_KEY.to_string(),
                    source,
                })
            })
    }

    /// The fan-out index of this branch, if running inside one.
    pub fn index(&self) -> Option<usize> {
        self.local
            .get(INDEX_KEY)
            .and_then(Value::as_u64)
            .map(|i| i as usize)
    }

    /// Result slot of this branch, if running inside a fan-out.
    pub fn slot(&self) -> Option<&SlotHandle> {
        self.slot.as_ref()
    }

    /// Copy of the current global map.
    pub fn global_snapshot(&self) -> Map<String, Value> {
        self.global.read().clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Write a global value. Visible to every branch immediately.
    pub fn set_global<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = to_value(key, value)?;
        self.set_global_value(key, value);
        Ok(())
    }

    pub fn set_global_value(&self, key: impl Into<String>, value: Value) {
        self.global.write().insert(key.into(), value);
    }

    /// Write a local value. Visible only to this branch.
    pub fn set_local<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = to_value(key, value)?;
        self.local.insert(key.to_string(), value);
        Ok(())
    }

    pub fn set_local_value(&mut self, key: impl Into<String>, value: Value) {
        self.local.insert(key.into(), value);
    }

    /// Memory for one fan-out branch: same resources and global map,
    /// a fresh local map and the branch's slot.
    pub(crate) fn branch(&self, local: Map<String, Value>, slot: SlotHandle) -> Self {
        Self {
            resources: Arc::clone(&self.resources),
            global: Arc::clone(&self.global),
            local,
            slot: Some(slot),
        }
    }
}

fn to_value<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|source| FlowError::Serialization {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::ResultSlots;
    use serde_json::json;

    #[test]
    fn test_local_shadows_global() {
        let mut memory = Memory::new(()).with_global("k", json!(1));
        assert_eq!(memory.require::<i64>("k").unwrap(), 1);
        memory.set_local("k", &2).unwrap();
        assert_eq!(memory.require::<i64>("k").unwrap(), 2);
        assert_eq!(memory.global_snapshot()["k"], json!(1));
    }

    #[test]
    fn test_missing_key() {
        let memory = Memory::new(());
        assert!(memory.get::<String>("nope").unwrap().is_none());
        let err = memory.require::<String>("nope").unwrap_err();
        assert!(matches!(err, FlowError::MissingKey(k) if k == "nope"));
    }

    #[test]
    fn test_null_reads_as_unset() {
        let memory = Memory::new(()).with_global("k", Value::Null);
        assert!(memory.get::<String>("k").unwrap().is_none());
        assert!(memory.contains("k"));
    }

    #[test]
    fn test_wrong_shape_is_serialization_error() {
        let memory = Memory::new(()).with_global("k", json!("text"));
        let err = memory.require::<Vec<u32>>("k").unwrap_err();
        assert!(matches!(err, FlowError::Serialization { .. }));
    }

    #[test]
    fn test_branch_shares_global_not_local() {
        let mut parent = Memory::new(());
        parent.set_local("parent_only", &true).unwrap();
        let slots = ResultSlots::new(1);

        let mut local = Map::new();
        local.insert(ITEM_KEY.into(), json!({"n": 7}));
        local.insert(INDEX_KEY.into(), json!(0));
        let mut branch = parent.branch(local, slots.handle(0).unwrap());

        assert!(!branch.contains("parent_only"));
        assert_eq!(branch.index(), Some(0));
        assert_eq!(branch.item::<Value>().unwrap(), json!({"n": 7}));
        assert!(branch.slot().is_some());

        branch.set_global("shared", &"from branch").unwrap();
        branch.set_local("scratch", &1).unwrap();
        assert_eq!(parent.require::<String>("shared").unwrap(), "from branch");
        assert!(!parent.contains("scratch"));
    }

    #[test]
    fn test_top_level_has_no_item_or_slot() {
        let memory = Memory::new(());
        assert!(memory.index().is_none());
        assert!(memory.slot().is_none());
        assert!(matches!(
            memory.item::<Value>().unwrap_err(),
            FlowError::MissingKey(_)
        ));
    }
}
