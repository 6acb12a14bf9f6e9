pub mod config;
pub mod error;
pub mod host;
pub mod message;
pub mod msgid;
pub mod node_loop;
pub mod pending;
pub mod read_txn;
pub mod replica;
pub mod store;
pub mod transport;

pub use config::{parse_cluster, replica_config_for};
pub use error::{ConfigError, TransportError};
pub use host::Host;
pub use message::{Body, Envelope};
pub use msgid::MsgId;
pub use node_loop::MessageLoop;
pub use replica::{Replica, ReplicaConfig};
pub use store::{Key, Store, StoreEntry, Value};
pub use transport::{Transport, UdpTransport};
