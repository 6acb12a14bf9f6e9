use crate::error::ConfigError;
use crate::host::Host;
use crate::replica::ReplicaConfig;

/// Parses `"addr:port"` entries into a cluster list, same `address:port`
/// grammar `Host::from_str` already defines for the wire. The last entry
/// is the orderer (spec.md section 3.2) — callers are expected to list
/// the orderer last, there is no separate election step.
pub fn parse_cluster(entries: &[String]) -> Result<Vec<Host>, ConfigError> {
    if entries.is_empty() {
        return Err(ConfigError::EmptyCluster);
    }
    entries
        .iter()
        .map(|entry| {
            entry
                .parse::<Host>()
                .map_err(|err| ConfigError::InvalidHost {
                    host: entry.clone(),
                    reason: err.to_string(),
                })
        })
        .collect()
}

/// Builds a `ReplicaConfig` for `self_addr`, failing if it is not a member
/// of `cluster` — a replica cannot serve a cluster it isn't part of.
pub fn replica_config_for(
    self_addr: &str,
    cluster: Vec<Host>,
    order_on_write: bool,
) -> Result<ReplicaConfig, ConfigError> {
    let self_host: Host = self_addr
        .parse()
        .map_err(|err: std::num::ParseIntError| ConfigError::InvalidHost {
            host: self_addr.to_string(),
            reason: err.to_string(),
        })?;
    if !cluster.contains(&self_host) {
        return Err(ConfigError::SelfNotInCluster(self_addr.to_string()));
    }
    Ok(ReplicaConfig {
        self_host,
        cluster,
        order_on_write,
    })
}
