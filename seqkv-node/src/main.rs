//! Runs a single `seqkv` replica. Usage:
//!
//!   seqkv-node --self 127.0.0.1:5000 --cluster 127.0.0.1:5000,127.0.0.1:5001,127.0.0.1:5002 [--order-on-write]
//!
//! The last entry of `--cluster` is the orderer. Argument parsing is
//! hand-rolled the way the teacher's binaries avoid a CLI framework
//! entirely — this crate's only addition is the two flags a process needs
//! to find its place in the cluster.

use seqkv_core::{config, MessageLoop, Replica, UdpTransport};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Config(#[from] seqkv_core::ConfigError),
    #[error(transparent)]
    Transport(#[from] seqkv_core::TransportError),
}

struct Args {
    self_addr: String,
    cluster: Vec<String>,
    order_on_write: bool,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, StartupError> {
    let mut self_addr = None;
    let mut cluster = None;
    let mut order_on_write = false;

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--self" => {
                let value = raw.next().ok_or_else(|| StartupError::Usage("--self requires a value".into()))?;
                self_addr = Some(value);
            }
            "--cluster" => {
                let value = raw
                    .next()
                    .ok_or_else(|| StartupError::Usage("--cluster requires a value".into()))?;
                cluster = Some(value.split(',').map(str::to_string).collect());
            }
            "--order-on-write" => order_on_write = true,
            other => return Err(StartupError::Usage(format!("unrecognized argument '{other}'"))),
        }
    }

    Ok(Args {
        self_addr: self_addr.ok_or_else(|| StartupError::Usage("missing required --self".into()))?,
        cluster: cluster.ok_or_else(|| StartupError::Usage("missing required --cluster".into()))?,
        order_on_write,
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run().await {
        tracing::error!(%err, "seqkv-node failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let args = parse_args(std::env::args().skip(1))?;
    let cluster = config::parse_cluster(&args.cluster)?;
    let replica_config = config::replica_config_for(&args.self_addr, cluster, args.order_on_write)?;

    let self_host = replica_config.self_host.clone();
    let transport = UdpTransport::bind(&self_host).await?;
    let replica = Replica::new(replica_config);

    tracing::info!(host = %self_host, orderer = replica.is_orderer(), "seqkv-node listening");

    let mut message_loop = MessageLoop::new(transport, replica);
    message_loop.run().await?;
    Ok(())
}
