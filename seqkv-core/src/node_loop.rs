use crate::replica::Replica;
use crate::transport::Transport;

/// Drives a `Replica` from a `Transport`: receive one envelope, hand it to
/// `Replica::handle`, send every resulting envelope, repeat. Fully
/// processing one message's consequences before receiving the next is
/// what makes the single-writer discipline spec.md section 5 requires
/// hold in practice, even though nothing here takes a lock.
pub struct MessageLoop<T: Transport> {
    transport: T,
    replica: Replica,
}

impl<T: Transport> MessageLoop<T> {
    pub fn new(transport: T, replica: Replica) -> Self {
        Self { transport, replica }
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    /// Runs until the replica processes an `exit` message.
    pub async fn run(&mut self) -> Result<(), crate::error::TransportError> {
        while !self.replica.has_exited() {
            self.tick().await?;
        }
        Ok(())
    }

    /// Processes exactly one inbound envelope, logging and skipping a
    /// malformed datagram rather than stalling the loop on it.
    pub async fn tick(&mut self) -> Result<(), crate::error::TransportError> {
        let Some(envelope) = self.transport.recv().await? else {
            return Ok(());
        };
        for outgoing in self.replica.handle(envelope) {
            self.dispatch(outgoing).await?;
        }
        Ok(())
    }

    /// Loopback (`dest == self_host`) is routed in-process rather than
    /// round-tripping through the socket: the orderer addressing
    /// `client_write_ack`/`write_order` to itself (spec.md section 9) is
    /// the common case this avoids a real send for.
    fn dispatch<'a>(
        &'a mut self,
        envelope: crate::message::Envelope,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), crate::error::TransportError>> + 'a>> {
        Box::pin(async move {
            if envelope.dest == *self.replica.self_host() {
                for looped in self.replica.handle(envelope) {
                    self.dispatch(looped).await?;
                }
                Ok(())
            } else {
                self.transport.send(&envelope).await
            }
        })
    }
}
