use std::collections::HashSet;

use crate::host::Host;
use crate::msgid::MsgId;
use crate::store::{Key, Value};

/// Originator-side record of a write awaiting peer acknowledgements.
///
/// Lives only on the replica that accepted the `client_write`; destroyed
/// once `is_complete` holds, at which point its fields are handed to the
/// commit-pending map (spec.md section 3, invariant I3).
pub struct PendingWrite {
    pub id: MsgId,
    pub keys: Vec<Key>,
    pub values: Vec<Value>,
    pub client_addr: Host,
    ack_from: HashSet<Host>,
}

impl PendingWrite {
    pub fn new(id: MsgId, keys: Vec<Key>, values: Vec<Value>, client_addr: Host) -> Self {
        Self {
            id,
            keys,
            values,
            client_addr,
            ack_from: HashSet::new(),
        }
    }

    /// Idempotent on repeated acks from the same host (set semantics).
    pub fn ack(&mut self, from: Host) {
        self.ack_from.insert(from);
    }

    /// True once acks have arrived from every other member of an
    /// `N`-node cluster (the originator does not ack itself).
    pub fn is_complete(&self, cluster_size: usize) -> bool {
        self.ack_from.len() >= cluster_size.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pw() -> PendingWrite {
        PendingWrite::new(
            MsgId::new(&Host::new("a", 1), 0),
            vec!["k".into()],
            vec!["v".into()],
            Host::new("client", 9),
        )
    }

    #[test]
    fn incomplete_until_n_minus_1_acks() {
        let mut pw = pw();
        assert!(!pw.is_complete(3));
        pw.ack(Host::new("b", 2));
        assert!(!pw.is_complete(3));
        pw.ack(Host::new("c", 3));
        assert!(pw.is_complete(3));
    }

    #[test]
    fn repeated_ack_from_same_host_is_idempotent() {
        let mut pw = pw();
        pw.ack(Host::new("b", 2));
        pw.ack(Host::new("b", 2));
        assert!(!pw.is_complete(3));
    }

    #[test]
    fn single_node_cluster_completes_with_zero_acks() {
        assert!(pw().is_complete(1));
    }
}
