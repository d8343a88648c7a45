//! Write-once result buffer for parallel branches.
//!
//! A [`ResultSlots`] buffer is sized before any branch starts. Each branch
//! receives a [`SlotHandle`] scoped to its own index, so branches can only
//! write their own slot, and only once.

use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::error::{FlowError, Result};

/// A pre-sized buffer of write-once JSON slots.
#[derive(Debug, Clone)]
pub struct ResultSlots {
    slots: Arc<[OnceLock<Value>]>,
}

impl ResultSlots {
    /// Allocate exactly `len` empty slots.
    pub fn new(len: usize) -> Self {
        let slots: Vec<OnceLock<Value>> = (0..len).map(|_| OnceLock::new()).collect();
        Self {
            slots: slots.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Handle for the slot at `index`, or `None` if out of range.
    pub fn handle(&self, index: usize) -> Option<SlotHandle> {
        (index < self.slots.len()).then(|| SlotHandle {
            index,
            slots: Arc::clone(&self.slots),
        })
    }

    /// One handle per slot, in index order.
    pub(crate) fn handles(&self) -> impl Iterator<Item = SlotHandle> + '_ {
        (0..self.slots.len()).map(|index| SlotHandle {
            index,
            slots: Arc::clone(&self.slots),
        })
    }

    /// Snapshot the buffer, `None` marking unfilled slots.
    pub fn values(&self) -> Vec<Option<Value>> {
        self.slots.iter().map(|s| s.get().cloned()).collect()
    }
}

/// Write access to a single slot of a [`ResultSlots`] buffer.
#[derive(Debug, Clone)]
pub struct SlotHandle {
    index: usize,
    slots: Arc<[OnceLock<Value>]>,
}

impl SlotHandle {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Write the slot. Fails if it was already written.
    pub fn fill(&self, value: Value) -> Result<()> {
        self.slots[self.index]
            .set(value)
            .map_err(|_| FlowError::SlotAlreadyFilled(self.index))
    }

    /// Serialize `value` and write the slot.
    pub fn fill_with<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|source| FlowError::Serialization {
            key: format!("slot[{}]", self.index),
            source,
        })?;
        self.fill(value)
    }

    pub fn is_filled(&self) -> bool {
        self.slots[self.index].get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slots_start_empty() {
        let slots = ResultSlots::new(3);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots.values(), vec![None, None, None]);
    }

    #[test]
    fn test_handle_writes_only_its_index() {
        let slots = ResultSlots::new(3);
        slots.handle(1).unwrap().fill(json!("b")).unwrap();
        assert_eq!(slots.values(), vec![None, Some(json!("b")), None]);
    }

    #[test]
    fn test_slot_is_write_once() {
        let slots = ResultSlots::new(1);
        let handle = slots.handle(0).unwrap();
        handle.fill(json!(1)).unwrap();
        let err = handle.fill(json!(2)).unwrap_err();
        assert!(matches!(err, FlowError::SlotAlreadyFilled(0)));
        assert_eq!(slots.values(), vec![Some(json!(1))]);
    }

    #[test]
    fn test_out_of_range_handle() {
        let slots = ResultSlots::new(2);
        assert!(slots.handle(2).is_none());
        assert!(ResultSlots::new(0).is_empty());
    }

    #[test]
    fn test_fill_with_serializes() {
        let slots = ResultSlots::new(1);
        let handle = slots.handle(0).unwrap();
        handle.fill_with(&vec![1, 2, 3]).unwrap();
        assert!(handle.is_filled());
        assert_eq!(slots.values()[0], Some(json!([1, 2, 3])));
    }
}
