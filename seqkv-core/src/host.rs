use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};

use serde::{Deserialize, Serialize};

/// A node or client endpoint, identified by address and port.
///
/// Two `Host`s are equal iff their address and port are equal; this is the
/// identity used throughout the cluster (ack sets, the peer list, the
/// originating replica embedded in a `MsgId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    pub address: String,
    pub port: u16,
}

impl Host {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Resolves this host to a socket address suitable for `UdpSocket::bind`/`send_to`.
    pub fn socket_addr(&self) -> std::io::Result<SocketAddr> {
        (self.address.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("no address resolved for {self}"),
                )
            })
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl std::str::FromStr for Host {
    type Err = std::num::ParseIntError;

    /// Parses the `address:port` form used on the wire for `MsgId`s and CLI
    /// arguments alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((address, port)) => Ok(Host::new(address, port.parse()?)),
            None => Ok(Host::new(s, 0)),
        }
    }
}
