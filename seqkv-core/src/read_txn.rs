use crate::host::Host;
use crate::message::Body;
use crate::store::{Key, Value};

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Filled {
        value: Option<Value>,
        order_index: Option<u64>,
    },
}

/// Accumulates a multi-key read response. Keys that are pending at read
/// time are parked (`add_pending`) and later filled in by
/// `Replica::drain_order_buffer` via `resolve_pending`; keys that are
/// already settled are filled immediately via `add_pair`.
pub struct ReadTransaction {
    pub client_addr: Host,
    keys: Vec<Key>,
    slots: Vec<Slot>,
    n_pending: usize,
}

impl ReadTransaction {
    pub fn new(client_addr: Host, keys: Vec<Key>) -> Self {
        let slots = Vec::with_capacity(keys.len());
        Self {
            client_addr,
            keys,
            slots,
            n_pending: 0,
        }
    }

    /// Appends a pending slot for the next key in the transaction's key
    /// order; increments `n_pending`. Must be called in the same order as
    /// the transaction's `keys`, interleaved with `add_pair` for keys that
    /// are already settled.
    pub fn add_pending(&mut self) {
        self.slots.push(Slot::Pending);
        self.n_pending += 1;
    }

    /// Appends a filled slot for the next key in the transaction's key
    /// order. Returns true iff the transaction is now final.
    pub fn add_pair(&mut self, value: Option<Value>, order_index: Option<u64>) -> bool {
        self.slots.push(Slot::Filled { value, order_index });
        self.is_final()
    }

    /// Resolves every still-pending slot for `key` (there may be more than
    /// one if the read named the same key twice). Returns true iff the
    /// transaction is now final.
    pub fn resolve_pending(&mut self, key: &str, value: Option<Value>, order_index: Option<u64>) -> bool {
        for (slot, slot_key) in self.slots.iter_mut().zip(self.keys.iter()) {
            if slot_key == key && matches!(slot, Slot::Pending) {
                *slot = Slot::Filled {
                    value: value.clone(),
                    order_index,
                };
                self.n_pending -= 1;
            }
        }
        self.is_final()
    }

    pub fn has_pending_key(&self, key: &str) -> bool {
        self.keys
            .iter()
            .zip(self.slots.iter())
            .any(|(k, slot)| k == key && matches!(slot, Slot::Pending))
    }

    pub fn is_final(&self) -> bool {
        self.n_pending == 0 && self.slots.len() == self.keys.len()
    }

    /// Produces the reply payload, element ordering equal to the input key
    /// order.
    pub fn response(&self) -> Body {
        let (values, order_indices) = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Filled { value, order_index } => (value.clone(), *order_index),
                Slot::Pending => (None, None),
            })
            .unzip();
        Body::ReadOk {
            value: values,
            order_index: order_indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_fill_is_final_right_away() {
        let mut txn = ReadTransaction::new(Host::new("c", 1), vec!["k".into()]);
        let is_final = txn.add_pair(Some("v".into()), Some(0));
        assert!(is_final);
        match txn.response() {
            Body::ReadOk { value, order_index } => {
                assert_eq!(value, vec![Some("v".to_string())]);
                assert_eq!(order_index, vec![Some(0)]);
            }
            _ => panic!("expected ReadOk"),
        }
    }

    #[test]
    fn pending_key_blocks_finality_until_resolved() {
        let mut txn = ReadTransaction::new(Host::new("c", 1), vec!["a".into(), "b".into()]);
        txn.add_pair(Some("a-val".into()), Some(0));
        txn.add_pending();
        assert!(!txn.is_final());

        let is_final = txn.resolve_pending("b", Some("b-val".into()), Some(1));
        assert!(is_final);
    }

    #[test]
    fn has_pending_key_reflects_only_unresolved_slots() {
        let mut txn = ReadTransaction::new(Host::new("c", 1), vec!["a".into()]);
        txn.add_pending();
        assert!(txn.has_pending_key("a"));
        txn.resolve_pending("a", Some("v".into()), Some(0));
        assert!(!txn.has_pending_key("a"));
    }
}
