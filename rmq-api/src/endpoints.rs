//! Management API endpoints.
//!
//! Each method returns the JSON body as received. Names that end up in a
//! path segment (virtual hosts, nodes, users) are escaped, so the default
//! virtual host `/` is sent as `%2F`.

use crate::client::Client;
use crate::dto::{Definition, WhoAmI};
use crate::error::{ApiError, Result};
use crate::page::PageFilter;
use bytes::Bytes;
use rmq_web::{Query, path_escape};
use std::fmt;
use std::str::FromStr;

/// Unit of the certificate expiration window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    /// Every unit, shortest first.
    pub const ALL: [TimeUnit; 4] = [Self::Days, Self::Weeks, Self::Months, Self::Years];

    /// Name used in the API path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Years => "years",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ApiError::InvalidArgument(format!(
                    "unknown time unit {s:?}, expected one of days, weeks, months, years"
                ))
            })
    }
}

fn seg(name: &str) -> String {
    path_escape(name)
}

impl Client {
    async fn get_paged(&self, path: &str, page: Option<&PageFilter>) -> Result<Bytes> {
        let query = page.and_then(PageFilter::to_query);
        self.get_json(path, query.as_ref()).await
    }

    // Cluster

    /// Cluster-wide overview: versions, totals and listeners.
    pub async fn overview(&self) -> Result<Bytes> {
        self.get_json("overview", None).await
    }

    /// Every node in the cluster.
    pub async fn nodes(&self) -> Result<Bytes> {
        self.get_json("nodes", None).await
    }

    /// One node. `memory` and `binary` add expensive statistics.
    pub async fn node(&self, name: &str, memory: bool, binary: bool) -> Result<Bytes> {
        let mut query = Query::new();
        query
            .add_if(memory, "memory", "true")
            .add_if(binary, "binary", "true");
        self.get_json(&format!("nodes/{}", seg(name)), Some(&query))
            .await
    }

    /// Management UI extensions.
    pub async fn extensions(&self) -> Result<Bytes> {
        self.get_json("extensions", None).await
    }

    /// Server definitions: users, vhosts, queues, exchanges, bindings and policies.
    pub async fn definitions(&self) -> Result<Bytes> {
        self.get_json("definitions", None).await
    }

    /// Definitions of one virtual host.
    pub async fn vhost_definitions(&self, vhost: &str) -> Result<Bytes> {
        self.get_json(&format!("definitions/{}", seg(vhost)), None)
            .await
    }

    /// Typed definitions of one virtual host.
    pub async fn vhost_definition(&self, vhost: &str) -> Result<Definition> {
        self.get(&format!("definitions/{}", seg(vhost)), None).await
    }

    // Connections and channels

    /// Open connections.
    pub async fn connections(&self, page: Option<&PageFilter>) -> Result<Bytes> {
        self.get_paged("connections", page).await
    }

    /// Open connections in one virtual host.
    pub async fn vhost_connections(&self, vhost: &str, page: Option<&PageFilter>) -> Result<Bytes> {
        self.get_paged(&format!("vhosts/{}/connections", seg(vhost)), page)
            .await
    }

    /// One connection by name.
    pub async fn connection(&self, name: &str) -> Result<Bytes> {
        self.get_json(&format!("connections/{}", seg(name)), None)
            .await
    }

    /// Open channels.
    pub async fn channels(&self, page: Option<&PageFilter>) -> Result<Bytes> {
        self.get_paged("channels", page).await
    }

    // Exchanges, queues and bindings

    /// Every exchange.
    pub async fn exchanges(&self, page: Option<&PageFilter>) -> Result<Bytes> {
        self.get_paged("exchanges", page).await
    }

    /// Every queue.
    pub async fn queues(&self, page: Option<&PageFilter>) -> Result<Bytes> {
        self.get_paged("queues", page).await
    }

    /// Queues in one virtual host.
    pub async fn vhost_queues(&self, vhost: &str, page: Option<&PageFilter>) -> Result<Bytes> {
        self.get_paged(&format!("queues/{}", seg(vhost)), page).await
    }

    /// One queue.
    pub async fn queue(&self, vhost: &str, name: &str) -> Result<Bytes> {
        self.get_json(&format!("queues/{}/{}", seg(vhost), seg(name)), None)
            .await
    }

    /// Every binding.
    pub async fn bindings(&self) -> Result<Bytes> {
        self.get_json("bindings", None).await
    }

    /// Bindings in one virtual host.
    pub async fn vhost_bindings(&self, vhost: &str) -> Result<Bytes> {
        self.get_json(&format!("bindings/{}", seg(vhost)), None).await
    }

    // Virtual hosts

    /// Every virtual host.
    pub async fn vhosts(&self) -> Result<Bytes> {
        self.get_json("vhosts", None).await
    }

    /// One virtual host.
    pub async fn vhost(&self, name: &str) -> Result<Bytes> {
        self.get_json(&format!("vhosts/{}", seg(name)), None).await
    }

    /// Limits of every virtual host.
    pub async fn vhosts_limits(&self) -> Result<Bytes> {
        self.get_json("vhost-limits", None).await
    }

    /// Limits of one virtual host.
    pub async fn vhost_limits(&self, vhost: &str) -> Result<Bytes> {
        self.get_json(&format!("vhost-limits/{}", seg(vhost)), None)
            .await
    }

    // Users and access

    /// Every user.
    pub async fn users(&self) -> Result<Bytes> {
        self.get_json("users", None).await
    }

    /// One user.
    pub async fn user(&self, name: &str) -> Result<Bytes> {
        self.get_json(&format!("users/{}", seg(name)), None).await
    }

    /// The authenticated user.
    pub async fn whoami(&self) -> Result<WhoAmI> {
        self.get("whoami", None).await
    }

    /// Permissions of every user in every virtual host.
    pub async fn permissions(&self) -> Result<Bytes> {
        self.get_json("permissions", None).await
    }

    /// Authentication details used by the management UI.
    pub async fn auth(&self) -> Result<Bytes> {
        self.get_json("auth", None).await
    }

    /// Authentication attempts on a node.
    pub async fn auth_attempts(&self, node: &str) -> Result<Bytes> {
        self.get_json(&format!("auth/attempts/{}", seg(node)), None)
            .await
    }

    /// Authentication attempts on a node, grouped by source.
    pub async fn auth_attempts_by_source(&self, node: &str) -> Result<Bytes> {
        self.get_json(&format!("auth/attempts/{}/source", seg(node)), None)
            .await
    }

    // Parameters and federation

    /// Every global parameter.
    pub async fn global_parameters(&self) -> Result<Bytes> {
        self.get_json("global-parameters", None).await
    }

    /// One global parameter.
    pub async fn global_parameter(&self, name: &str) -> Result<Bytes> {
        self.get_json(&format!("global-parameters/{}", seg(name)), None)
            .await
    }

    /// Federation links in every virtual host.
    pub async fn federation_links(&self) -> Result<Bytes> {
        self.get_json("federation-links", None).await
    }

    /// Federation links in one virtual host.
    pub async fn vhost_federation_links(&self, vhost: &str) -> Result<Bytes> {
        self.get_json(&format!("federation-links/{}", seg(vhost)), None)
            .await
    }

    // Health checks

    /// Fails when any alarm is in effect in the cluster.
    pub async fn check_alarms(&self) -> Result<Bytes> {
        self.get_json("health/checks/alarms", None).await
    }

    /// Fails when an alarm is in effect on the target node.
    pub async fn check_local_alarms(&self) -> Result<Bytes> {
        self.get_json("health/checks/local-alarms", None).await
    }

    /// Fails when a TLS listener certificate expires within the window.
    pub async fn check_certificate_expiration(&self, within: u32, unit: TimeUnit) -> Result<Bytes> {
        if within == 0 {
            return Err(ApiError::InvalidArgument(
                "the expiration window must be at least 1".to_string(),
            ));
        }
        self.get_json(
            &format!("health/checks/certificate-expiration/{within}/{unit}"),
            None,
        )
        .await
    }

    /// Fails when nothing listens on `port`.
    pub async fn check_port_listener(&self, port: u16) -> Result<Bytes> {
        self.get_json(&format!("health/checks/port-listener/{port}"), None)
            .await
    }

    /// Fails when nothing listens for `protocol`.
    pub async fn check_protocol_listener(&self, protocol: &str) -> Result<Bytes> {
        self.get_json(
            &format!("health/checks/protocol-listener/{}", seg(protocol)),
            None,
        )
        .await
    }

    /// Fails when a virtual host is down on the target node.
    pub async fn check_virtual_hosts(&self) -> Result<Bytes> {
        self.get_json("health/checks/virtual-hosts", None).await
    }

    /// Fails when the node holds the last quorum of a quorum queue.
    pub async fn check_node_is_quorum_critical(&self) -> Result<Bytes> {
        self.get_json("health/checks/node-is-quorum-critical", None)
            .await
    }

    /// Fails when the node holds the only synchronised mirror of a classic queue.
    pub async fn check_node_is_mirror_sync_critical(&self) -> Result<Bytes> {
        self.get_json("health/checks/node-is-mirror-sync-critical", None)
            .await
    }

    /// Declares a test queue in `vhost`, then publishes and consumes a message.
    pub async fn check_aliveness(&self, vhost: &str) -> Result<Bytes> {
        self.get_json(&format!("aliveness-test/{}", seg(vhost)), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_unit_parsing() {
        assert_eq!("days".parse::<TimeUnit>().unwrap(), TimeUnit::Days);
        assert_eq!("Months".parse::<TimeUnit>().unwrap(), TimeUnit::Months);
        assert!(matches!(
            "fortnights".parse::<TimeUnit>(),
            Err(ApiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_time_unit_display() {
        let names: Vec<String> = TimeUnit::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["days", "weeks", "months", "years"]);
    }

    #[test]
    fn test_segment_escaping() {
        assert_eq!(seg("/"), "%2F");
        assert_eq!(seg("rabbit@node-1"), "rabbit%40node-1");
    }
}
