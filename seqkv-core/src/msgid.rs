use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::Host;

/// A cluster-unique identifier for a client-originated write, constructed at
/// the originating replica as `host:port:seq`. Never reused: `seq` is a
/// per-replica monotonically increasing counter tied to that replica's
/// uptime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MsgId(String);

impl MsgId {
    pub fn new(origin: &Host, seq: u64) -> Self {
        Self(format!("{}:{}:{seq}", origin.address, origin.port))
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
