//! Graphviz rendering of exchange/queue topology.

use crate::dto::Definition;
use crate::error::{ApiError, Result};
use std::collections::HashMap;
use std::fmt::Write;

const GRAPH_NAME: &str = "RabbitMQ";

/// Render the queues, exchanges and bindings of `definition` as a DOT digraph.
///
/// Queues are blue boxes (`Q001`, …), exchanges gray octagons (`E001`, …).
/// Bindings to queues are blue edges, bindings to exchanges black ones.
/// A binding that names an unknown source or destination is an error.
pub fn to_dot(definition: &Definition) -> Result<String> {
    let mut out = String::new();
    let mut queues = HashMap::new();
    let mut exchanges = HashMap::new();

    // writing to a String cannot fail
    let _ = writeln!(out, "digraph {GRAPH_NAME} {{");

    for (i, queue) in definition.queues.iter().enumerate() {
        let id = format!("Q{:03}", i + 1);
        let _ = writeln!(
            out,
            "\t{id} [ color=blue, label={}, shape=box ];",
            quoted(&queue.name)
        );
        queues.insert(queue.name.as_str(), id);
    }

    for (i, exchange) in definition.exchanges.iter().enumerate() {
        let id = format!("E{:03}", i + 1);
        let label = format!("{}\\ntype = {}", exchange.name, exchange.kind);
        let _ = writeln!(
            out,
            "\t{id} [ color=gray, label={}, shape=octagon ];",
            quoted(&label)
        );
        exchanges.insert(exchange.name.as_str(), id);
    }

    for binding in &definition.bindings {
        let source = exchanges.get(binding.source.as_str()).ok_or_else(|| {
            ApiError::Topology(format!(
                "could not find source exchange {} for binding",
                binding.source
            ))
        })?;

        let (targets, color) = if binding.targets_queue() {
            (&queues, "blue")
        } else {
            (&exchanges, "black")
        };
        let target = targets.get(binding.destination.as_str()).ok_or_else(|| {
            ApiError::Topology(format!(
                "could not find destination {} {} for binding",
                binding.destination_type, binding.destination
            ))
        })?;

        let _ = writeln!(out, "\t{source}->{target} [ color={color} ];");
    }

    out.push_str("}\n");
    Ok(out)
}

/// Quote a label, breaking lines before `:` so long names stay readable.
fn quoted(label: &str) -> String {
    format!("\"{}\"", label.replace('"', "\\\"").replace(':', "\\n:"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{Binding, Exchange, Queue};

    fn queue(name: &str) -> Queue {
        Queue {
            name: name.to_string(),
            ..Queue::default()
        }
    }

    fn exchange(name: &str, kind: &str) -> Exchange {
        Exchange {
            name: name.to_string(),
            kind: kind.to_string(),
            ..Exchange::default()
        }
    }

    fn binding(source: &str, destination: &str, destination_type: &str) -> Binding {
        Binding {
            source: source.to_string(),
            destination: destination.to_string(),
            destination_type: destination_type.to_string(),
            ..Binding::default()
        }
    }

    #[test]
    fn test_to_dot() {
        let definition = Definition {
            queues: vec![queue("orders"), queue("audit:log")],
            exchanges: vec![exchange("events", "topic"), exchange("fanout.x", "fanout")],
            bindings: vec![
                binding("events", "orders", "queue"),
                binding("events", "fanout.x", "exchange"),
                binding("fanout.x", "audit:log", "queue"),
            ],
            ..Definition::default()
        };

        let dot = to_dot(&definition).unwrap();
        assert_eq!(
            dot,
            "digraph RabbitMQ {\n\
             \tQ001 [ color=blue, label=\"orders\", shape=box ];\n\
             \tQ002 [ color=blue, label=\"audit\\n:log\", shape=box ];\n\
             \tE001 [ color=gray, label=\"events\\ntype = topic\", shape=octagon ];\n\
             \tE002 [ color=gray, label=\"fanout.x\\ntype = fanout\", shape=octagon ];\n\
             \tE001->Q001 [ color=blue ];\n\
             \tE001->E002 [ color=black ];\n\
             \tE002->Q002 [ color=blue ];\n\
             }\n"
        );
    }

    #[test]
    fn test_unknown_source() {
        let definition = Definition {
            queues: vec![queue("orders")],
            bindings: vec![binding("missing", "orders", "queue")],
            ..Definition::default()
        };
        let err = to_dot(&definition).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid topology: could not find source exchange missing for binding"
        );
    }

    #[test]
    fn test_unknown_destination() {
        let definition = Definition {
            exchanges: vec![exchange("events", "topic")],
            bindings: vec![binding("events", "gone", "queue")],
            ..Definition::default()
        };
        assert!(matches!(to_dot(&definition), Err(ApiError::Topology(_))));
    }
}
