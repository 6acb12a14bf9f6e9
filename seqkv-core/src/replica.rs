use std::collections::{HashMap, HashSet};

use crate::host::Host;
use crate::message::{Body, Envelope};
use crate::msgid::MsgId;
use crate::pending::PendingWrite;
use crate::read_txn::ReadTransaction;
use crate::store::{Key, Store, StoreEntry, Value};

/// A write another replica has accepted but whose order index this replica
/// has not yet consumed. On the originating replica `client_addr` is
/// `Some`; on any other replica it is `None` (spec.md section 9: only the
/// originating replica ever replies to the client).
struct CommitEntry {
    keys: Vec<Key>,
    values: Vec<Value>,
    client_addr: Option<Host>,
}

/// Cluster membership and per-node configuration, fixed at construction —
/// this protocol has no runtime membership-change message.
pub struct ReplicaConfig {
    pub self_host: Host,
    /// All hosts in the cluster, including `self_host`. The last entry is
    /// the orderer.
    pub cluster: Vec<Host>,
    pub order_on_write: bool,
}

/// A replica node. Folds in the orderer's extra responsibilities (assigning
/// `OrderIndex` values, broadcasting `write_order`) behind `is_orderer`,
/// the same way the teacher's `KafkaNode` folds leader-only behavior behind
/// `node.id == self.leader` rather than using a separate type.
///
/// `handle` is a pure, synchronous state transition: envelope in, envelopes
/// out. All state mutation happens under this single call, matching the
/// single-writer executor spec.md section 5 requires — a `MessageLoop`
/// (see `node_loop`) is the only thing that calls it, one message at a
/// time.
pub struct Replica {
    self_host: Host,
    peers: Vec<Host>,
    cluster: Vec<Host>,
    orderer: Host,
    is_orderer: bool,
    order_on_write: bool,

    write_seq: u64,
    store: Store,
    order_index: u64,

    pending_writes: HashMap<MsgId, PendingWrite>,
    commit_pending: HashMap<MsgId, CommitEntry>,
    order_buffer: HashMap<MsgId, u64>,

    /// Reverse index backing `is_key_pending` in O(1): spec.md's design
    /// notes license this in place of scanning `pending_writes` and
    /// `commit_pending`. Counts are incremented for *every* key of a
    /// `PendingWrite` but only the *first* key of a `CommitEntry`, exactly
    /// matching the conservative predicate spec.md section 4.1 defines
    /// (and which `examples/original_source/follower.py`'s `is_key_pending`
    /// implements the same way for its write buffer).
    pending_key_refs: HashMap<Key, u32>,

    pending_reads: HashMap<u64, ReadTransaction>,
    next_read_id: u64,
    read_buffer: HashMap<Key, Vec<u64>>,

    /// Orderer-only: next index to assign. Unused on non-orderer replicas.
    next_index: u64,
    /// Orderer-only: every MsgID that has already been assigned an index,
    /// so a redelivered `client_write_ack` (UDP may duplicate, spec.md
    /// section 7) rebroadcasts the existing decision instead of consuming
    /// a second index for the same write.
    assigned_order: HashMap<MsgId, u64>,

    exited: bool,
}

impl Replica {
    pub fn new(config: ReplicaConfig) -> Self {
        let ReplicaConfig {
            self_host,
            cluster,
            order_on_write,
        } = config;
        let orderer = cluster
            .last()
            .cloned()
            .expect("cluster must contain at least one host");
        let is_orderer = orderer == self_host;
        let peers = cluster
            .iter()
            .filter(|host| **host != self_host)
            .cloned()
            .collect();

        Self {
            self_host,
            peers,
            cluster,
            orderer,
            is_orderer,
            order_on_write,
            write_seq: 0,
            store: Store::new(),
            order_index: 0,
            pending_writes: HashMap::new(),
            commit_pending: HashMap::new(),
            order_buffer: HashMap::new(),
            pending_key_refs: HashMap::new(),
            pending_reads: HashMap::new(),
            next_read_id: 0,
            read_buffer: HashMap::new(),
            next_index: 0,
            assigned_order: HashMap::new(),
            exited: false,
        }
    }

    pub fn self_host(&self) -> &Host {
        &self.self_host
    }

    pub fn is_orderer(&self) -> bool {
        self.is_orderer
    }

    /// Count of writes applied locally (invariant I1: equals the size of
    /// the prefix of the global order this replica has consumed).
    pub fn order_index(&self) -> u64 {
        self.order_index
    }

    pub fn get(&self, key: &str) -> Option<&StoreEntry> {
        self.store.get(key)
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    fn next_msg_id(&mut self) -> MsgId {
        let seq = self.write_seq;
        self.write_seq += 1;
        MsgId::new(&self.self_host, seq)
    }

    fn is_key_pending(&self, key: &str) -> bool {
        self.pending_key_refs.contains_key(key)
    }

    fn index_pending_write(&mut self, pw: &PendingWrite) {
        for key in &pw.keys {
            *self.pending_key_refs.entry(key.clone()).or_insert(0) += 1;
        }
    }

    fn unindex_pending_write(&mut self, pw: &PendingWrite) {
        for key in &pw.keys {
            self.decrement_pending_ref(key);
        }
    }

    fn index_commit_entry(&mut self, entry: &CommitEntry) {
        if let Some(first) = entry.keys.first() {
            *self.pending_key_refs.entry(first.clone()).or_insert(0) += 1;
        }
    }

    fn unindex_commit_entry(&mut self, entry: &CommitEntry) {
        if let Some(first) = entry.keys.first() {
            self.decrement_pending_ref(first);
        }
    }

    fn decrement_pending_ref(&mut self, key: &str) {
        if let Some(count) = self.pending_key_refs.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.pending_key_refs.remove(key);
            }
        }
    }

    /// Dispatches one inbound envelope, returning every envelope it
    /// produces in response. Unknown message types and client-facing
    /// replies misdelivered to a replica are logged and dropped, per
    /// spec.md section 7.
    pub fn handle(&mut self, envelope: Envelope) -> Vec<Envelope> {
        let Envelope { src, body, .. } = envelope;
        match body {
            Body::ClientWrite { keys, values } => self.client_write(keys, values, src),
            Body::ClientRead { keys } => self.client_read(keys, src),
            Body::Write {
                id,
                keys,
                values,
                from,
            } => self.handle_write(id, keys, values, from),
            Body::Acknowledge { id, from } => self.handle_acknowledge(id, from),
            Body::ClientWriteAck { id } => self.handle_client_write_ack(id),
            Body::WriteOrder { id, index } => self.handle_write_order(id, index),
            Body::Exit => {
                tracing::info!(host = %self.self_host, "exit received");
                self.exited = true;
                Vec::new()
            }
            Body::ReadOk { .. } | Body::WriteResult { .. } => {
                tracing::warn!(%src, "client-facing reply delivered to a replica; dropping");
                Vec::new()
            }
        }
    }

    /// `client_write(keys, values, return_addr)`: allocates a fresh MsgID,
    /// records a `PendingWrite`, and broadcasts `write` to every peer.
    /// Never replies to the client directly — that happens once the write
    /// completes (see `try_complete_pending_write`).
    pub fn client_write(&mut self, keys: Vec<Key>, values: Vec<Value>, return_addr: Host) -> Vec<Envelope> {
        let id = self.next_msg_id();
        let pending = PendingWrite::new(id.clone(), keys.clone(), values.clone(), return_addr);
        self.index_pending_write(&pending);
        self.pending_writes.insert(id.clone(), pending);

        let mut out: Vec<Envelope> = self
            .peers
            .iter()
            .map(|peer| {
                Envelope::new(
                    self.self_host.clone(),
                    peer.clone(),
                    Body::Write {
                        id: id.clone(),
                        keys: keys.clone(),
                        values: values.clone(),
                        from: self.self_host.clone(),
                    },
                )
            })
            .collect();

        // A single-node cluster (no peers) completes with zero acks.
        out.extend(self.try_complete_pending_write(&id));
        out
    }

    /// `write(id, keys, values, from)`: records the peer's write in
    /// `CommitPending` (client_addr = None) and acknowledges. Idempotent on
    /// redelivery — `keys`/`values` are immutable for a given MsgID, so a
    /// repeat insert is a no-op.
    fn handle_write(&mut self, id: MsgId, keys: Vec<Key>, values: Vec<Value>, from: Host) -> Vec<Envelope> {
        if !self.commit_pending.contains_key(&id) {
            let entry = CommitEntry {
                keys,
                values,
                client_addr: None,
            };
            self.index_commit_entry(&entry);
            self.commit_pending.insert(id.clone(), entry);
        }

        vec![Envelope::new(
            self.self_host.clone(),
            from.clone(),
            Body::Acknowledge {
                id,
                from: self.self_host.clone(),
            },
        )]
    }

    /// `acknowledge(id, from)`: records the ack; if the write is now
    /// complete, hands it to `CommitPending`, notifies the orderer, and
    /// (if `order_on_write = false`) replies to the client immediately.
    /// Acks for an unknown (already-completed) MsgID are ignored.
    fn handle_acknowledge(&mut self, id: MsgId, from: Host) -> Vec<Envelope> {
        let Some(pending) = self.pending_writes.get_mut(&id) else {
            tracing::debug!(%id, %from, "acknowledge for unknown write; ignoring");
            return Vec::new();
        };
        pending.ack(from);
        self.try_complete_pending_write(&id)
    }

    /// Moves a `PendingWrite` to `CommitPending` once it has acks from
    /// every other cluster member, notifying the orderer and (unless
    /// `order_on_write`) the client.
    fn try_complete_pending_write(&mut self, id: &MsgId) -> Vec<Envelope> {
        let Some(pending) = self.pending_writes.get(id) else {
            return Vec::new();
        };
        if !pending.is_complete(self.cluster.len()) {
            return Vec::new();
        }

        let pending = self.pending_writes.remove(id).unwrap();
        self.unindex_pending_write(&pending);

        let client_addr = pending.client_addr.clone();
        let entry = CommitEntry {
            keys: pending.keys.clone(),
            values: pending.values.clone(),
            client_addr: Some(client_addr.clone()),
        };
        self.index_commit_entry(&entry);
        self.commit_pending.insert(id.clone(), entry);

        let mut out = vec![Envelope::new(
            self.self_host.clone(),
            self.orderer.clone(),
            Body::ClientWriteAck { id: id.clone() },
        )];

        if !self.order_on_write {
            out.push(Envelope::new(
                self.self_host.clone(),
                client_addr,
                Body::WriteResult {
                    keys: pending.keys,
                    values: pending.values,
                },
            ));
        }

        out
    }

    /// Orderer-only: assigns the next `OrderIndex` and broadcasts
    /// `write_order` to every cluster member, including itself.
    /// `client_write_ack` processing is strictly sequential because
    /// `handle` is only ever called one message at a time. A redelivered
    /// ack for an id already assigned (UDP may duplicate, spec.md section
    /// 7) rebroadcasts that same decision instead of consuming a fresh
    /// index — assigning two indices to one MsgID would violate density
    /// (I1/I2) and uniqueness (P3) of the order.
    fn handle_client_write_ack(&mut self, id: MsgId) -> Vec<Envelope> {
        if !self.is_orderer {
            tracing::warn!(%id, host = %self.self_host, "client_write_ack received by a non-orderer replica; dropping");
            return Vec::new();
        }

        let index = match self.assigned_order.get(&id) {
            Some(&index) => {
                tracing::debug!(%id, index, "duplicate client_write_ack; rebroadcasting existing order");
                index
            }
            None => {
                let index = self.next_index;
                self.next_index += 1;
                self.assigned_order.insert(id.clone(), index);
                index
            }
        };

        self.cluster
            .iter()
            .map(|host| {
                Envelope::new(
                    self.self_host.clone(),
                    host.clone(),
                    Body::WriteOrder {
                        id: id.clone(),
                        index,
                    },
                )
            })
            .collect()
    }

    /// `write_order(id, index)`: buffers the announcement and drains every
    /// entry whose index is now contiguous with `order_index`.
    fn handle_write_order(&mut self, id: MsgId, index: u64) -> Vec<Envelope> {
        self.order_buffer.insert(id, index);
        self.drain_order_buffer()
    }

    fn drain_order_buffer(&mut self) -> Vec<Envelope> {
        let mut out = Vec::new();
        let mut applied_keys: HashSet<Key> = HashSet::new();

        loop {
            let ready = self
                .order_buffer
                .iter()
                .find(|(_, &idx)| idx == self.order_index)
                .map(|(id, _)| id.clone());
            let Some(id) = ready else { break };
            self.order_buffer.remove(&id);

            let Some(entry) = self.commit_pending.remove(&id) else {
                // Impossible per spec.md section 4.1's delivery-ordering
                // argument: write_order can only arrive after this
                // replica's CommitPending entry for `id` exists. If it is
                // somehow missing, log and stop draining rather than skip
                // an index — losing an index here would violate I1/I2.
                tracing::error!(%id, index = self.order_index, "write_order for unknown MsgID; dropping");
                break;
            };
            self.unindex_commit_entry(&entry);

            for (key, value) in entry.keys.iter().zip(entry.values.iter()) {
                self.store.set(key.clone(), value.clone(), self.order_index);
                applied_keys.insert(key.clone());
            }

            if self.order_on_write {
                if let Some(client_addr) = entry.client_addr.clone() {
                    out.push(Envelope::new(
                        self.self_host.clone(),
                        client_addr,
                        Body::WriteResult {
                            keys: entry.keys.clone(),
                            values: entry.values.clone(),
                        },
                    ));
                }
            }

            self.order_index += 1;
        }

        out.extend(self.wake_read_buffer(applied_keys));
        out
    }

    /// After a drain pass, revisits every applied key's read buffer: keys
    /// no longer pending have their waiting `ReadTransaction`s resolved,
    /// and finalized transactions get their single response sent.
    fn wake_read_buffer(&mut self, applied_keys: HashSet<Key>) -> Vec<Envelope> {
        let mut out = Vec::new();
        for key in applied_keys {
            if self.is_key_pending(&key) {
                continue;
            }
            let Some(waiting) = self.read_buffer.remove(&key) else {
                continue;
            };
            let (value, order_index) = match self.store.get(&key) {
                Some(entry) => (Some(entry.value.clone()), Some(entry.order_index)),
                None => (None, None),
            };
            for read_id in waiting {
                let Some(txn) = self.pending_reads.get_mut(&read_id) else {
                    continue;
                };
                let is_final = txn.resolve_pending(&key, value.clone(), order_index);
                if is_final {
                    let txn = self.pending_reads.remove(&read_id).unwrap();
                    out.push(Envelope::new(self.self_host.clone(), txn.client_addr.clone(), txn.response()));
                }
            }
        }
        out
    }

    /// `client_read(keys, return_addr)`: fills settled keys immediately;
    /// pending keys are parked until `write_order` draining resolves them.
    pub fn client_read(&mut self, keys: Vec<Key>, return_addr: Host) -> Vec<Envelope> {
        let mut txn = ReadTransaction::new(return_addr.clone(), keys.clone());
        let mut pending_keys: Vec<Key> = Vec::new();

        for key in &keys {
            if self.is_key_pending(key) {
                txn.add_pending();
                pending_keys.push(key.clone());
            } else {
                let (value, order_index) = match self.store.get(key) {
                    Some(entry) => (Some(entry.value.clone()), Some(entry.order_index)),
                    None => (None, None),
                };
                txn.add_pair(value, order_index);
            }
        }

        if txn.is_final() {
            return vec![Envelope::new(self.self_host.clone(), return_addr, txn.response())];
        }

        let read_id = self.next_read_id;
        self.next_read_id += 1;
        let distinct: HashSet<&Key> = pending_keys.iter().collect();
        for key in distinct {
            self.read_buffer.entry(key.clone()).or_default().push(read_id);
        }
        self.pending_reads.insert(read_id, txn);
        Vec::new()
    }
}
