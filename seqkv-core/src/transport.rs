use tokio::net::UdpSocket;

use crate::error::TransportError;
use crate::host::Host;
use crate::message::Envelope;

/// The datagram substrate `MessageLoop` drives. An `async fn` in a trait
/// (edition 2024), the same shape the teacher reaches for instead of
/// pulling in `async-trait` now that the language supports it natively.
pub trait Transport {
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError>;
    /// Blocks until a datagram arrives. Returns `Ok(None)` for a datagram
    /// that failed to decode — logged and dropped, never surfaced as an
    /// error, per spec.md section 7's treatment of malformed messages.
    async fn recv(&self) -> Result<Option<Envelope>, TransportError>;
}

/// UDP + line-delimited-JSON framing. One datagram carries exactly one
/// encoded `Envelope`, matching the teacher's `serde_json::to_string`
/// over a single transmission unit rather than a streaming codec.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn bind(host: &Host) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(host.socket_addr()?).await?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for UdpTransport {
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let payload = serde_json::to_vec(envelope)?;
        let addr = envelope.dest.socket_addr()?;
        self.socket.send_to(&payload, addr).await?;
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Envelope>, TransportError> {
        let mut buf = vec![0u8; 64 * 1024];
        let (len, _from) = self.socket.recv_from(&mut buf).await?;
        match serde_json::from_slice::<Envelope>(&buf[..len]) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(err) => {
                tracing::warn!(%err, "dropping malformed datagram");
                Ok(None)
            }
        }
    }
}
