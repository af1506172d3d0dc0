//! `rmq generate`: the topology of the configured virtual host as a Graphviz digraph.

use super::client;
use crate::error::CliResult;
use rmq_api::Config;
use rmq_api::dto::Definition;
use rmq_api::topology::to_dot;
use rmq_web::Context;
use std::io::{self, Write};

pub async fn execute(config: Config, ctx: Context) -> CliResult<()> {
    let host = config.host.clone();
    let vhost = config.vhost.clone();
    let definition = client(config, ctx).vhost_definition(&vhost).await?;

    let stdout = io::stdout();
    write_graph(&mut stdout.lock(), &definition, &host, &vhost)
}

pub fn write_graph<W: Write>(
    out: &mut W,
    definition: &Definition,
    host: &str,
    vhost: &str,
) -> CliResult<()> {
    let dot = to_dot(definition)?;
    writeln!(out, "// RabbitMQ version: {}", definition.rabbit_version)?;
    writeln!(out, "// node host: {host}")?;
    writeln!(out, "// vhost: {vhost}")?;
    out.write_all(dot.as_bytes())?;
    out.flush()?;
    Ok(())
}
