//! Typed views of management API payloads.
//!
//! Only the fields this crate reads are modelled. Missing fields fall back
//! to their defaults, so responses trimmed with `columns` still decode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Exported definitions of a broker or one virtual host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Definition {
    pub rabbit_version: String,
    pub parameters: Vec<Value>,
    pub policies: Vec<Value>,
    pub queues: Vec<Queue>,
    pub exchanges: Vec<Exchange>,
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Queue {
    pub name: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exchange {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub internal: bool,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Binding {
    pub vhost: String,
    pub source: String,
    pub destination: String,
    pub destination_type: String,
    pub properties_key: String,
    pub routing_key: String,
    pub arguments: Map<String, Value>,
}

impl Binding {
    /// True when the binding routes to a queue rather than an exchange.
    pub fn targets_queue(&self) -> bool {
        self.destination_type == "queue"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VHost {
    pub name: String,
    pub description: String,
    pub tracing: bool,
}

/// The authenticated user. `tags` is a list on recent brokers and a
/// comma separated string on older ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhoAmI {
    pub name: String,
    pub tags: Value,
}
