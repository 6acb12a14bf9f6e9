//! A minimal client for talking to a `seqkv` cluster over UDP. Spec.md
//! section 1 treats clients as an external collaborator the protocol
//! doesn't define; this crate is one concrete such collaborator, built on
//! top of `seqkv_core::UdpTransport` the same way the protocol's replicas
//! are.

use std::time::Duration;

use rand::Rng;
use seqkv_core::{Body, Envelope, Host, Key, Transport, UdpTransport, Value};
use thiserror::Error;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] seqkv_core::TransportError),
    #[error("no reply from cluster within {0:?}")]
    Timeout(Duration),
    #[error("unexpected reply type from cluster")]
    UnexpectedReply,
}

/// Talks to any one of a fixed list of cluster hosts. Not itself a
/// replica: it owns a transport and a reply timeout, nothing else.
pub struct Client {
    transport: UdpTransport,
    self_host: Host,
    cluster: Vec<Host>,
    reply_timeout: Duration,
}

impl Client {
    pub async fn connect(cluster: Vec<Host>, reply_timeout: Duration) -> Result<Self, ClientError> {
        let transport = UdpTransport::bind(&Host::new("127.0.0.1", 0)).await?;
        let addr = transport.local_addr().map_err(seqkv_core::TransportError::Io)?;
        let self_host = Host::new(addr.ip().to_string(), addr.port());
        Ok(Self {
            transport,
            self_host,
            cluster,
            reply_timeout,
        })
    }

    /// Picks a cluster member at random to spread load across replicas —
    /// any replica can service a write or a read, per spec.md section 1.
    fn random_host(&self) -> &Host {
        let index = rand::rng().random_range(0..self.cluster.len());
        &self.cluster[index]
    }

    pub async fn write(&self, keys: Vec<Key>, values: Vec<Value>) -> Result<(), ClientError> {
        let target = self.random_host().clone();
        self.transport
            .send(&Envelope::new(
                self.self_host.clone(),
                target,
                Body::ClientWrite { keys, values },
            ))
            .await?;
        match self.await_reply().await? {
            Body::WriteResult { .. } => Ok(()),
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    pub async fn read(&self, keys: Vec<Key>) -> Result<(Vec<Option<Value>>, Vec<Option<u64>>), ClientError> {
        let target = self.random_host().clone();
        self.transport
            .send(&Envelope::new(self.self_host.clone(), target, Body::ClientRead { keys }))
            .await?;
        match self.await_reply().await? {
            Body::ReadOk { value, order_index } => Ok((value, order_index)),
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    async fn await_reply(&self) -> Result<Body, ClientError> {
        let envelope = timeout(self.reply_timeout, self.transport.recv())
            .await
            .map_err(|_| ClientError::Timeout(self.reply_timeout))??
            .ok_or(ClientError::UnexpectedReply)?;
        Ok(envelope.body)
    }
}
