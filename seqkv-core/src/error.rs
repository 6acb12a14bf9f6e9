use thiserror::Error;

/// Errors from the datagram transport: the actual socket and JSON framing,
/// both of which spec.md treats as an external collaborator. Protocol-level
/// conditions (unknown MsgID, malformed but well-formed-JSON message) are
/// *not* represented here — per spec.md section 7 those are logged and
/// dropped inside `Replica`, never surfaced as `Err`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode outgoing message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors constructing a cluster configuration from CLI arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cluster must contain at least one host")]
    EmptyCluster,
    #[error("invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },
    #[error("self host '{0}' is not a member of the cluster")]
    SelfNotInCluster(String),
}
