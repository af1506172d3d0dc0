//! `rmq check ...`

use super::{client, emit};
use crate::error::{CliError, CliResult};
use clap::{Args, Subcommand};
use rmq_api::{Config, TimeUnit};
use rmq_web::Context;

#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Fails if there are alarms in effect in the cluster
    Alarms,

    /// Fails if there are alarms in effect on the target node
    LocalAlarms,

    /// Fails if a TLS listener certificate expires within the given period
    CertificateExpiration(Within),

    /// Fails if there is no listener on the given port or protocol
    Listener(Listener),

    /// Fails if a virtual host is not running on the target node
    VirtualHosts,

    /// Fails if the target node holds the last quorum of a quorum queue
    NodeIsQuorumCritical,

    /// Fails if the target node holds the only synchronised mirror of a classic queue
    NodeIsMirrorSyncCritical,

    /// Publishes and consumes a test message in the configured virtual host
    VhostAliveness,
}

/// Exactly one window must be given.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Within {
    /// The number of days within which the certificate expires
    #[arg(short = 'd', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub within_days: Option<u32>,

    /// The number of weeks within which the certificate expires
    #[arg(short = 'w', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub within_weeks: Option<u32>,

    /// The number of months within which the certificate expires
    #[arg(short = 'm', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub within_months: Option<u32>,

    /// The number of years within which the certificate expires
    #[arg(short = 'y', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub within_years: Option<u32>,
}

impl Within {
    pub fn window(&self) -> CliResult<(u32, TimeUnit)> {
        let windows = [
            (self.within_days, TimeUnit::Days),
            (self.within_weeks, TimeUnit::Weeks),
            (self.within_months, TimeUnit::Months),
            (self.within_years, TimeUnit::Years),
        ];
        let mut given = windows
            .into_iter()
            .filter_map(|(within, unit)| within.map(|w| (w, unit)));

        match (given.next(), given.next()) {
            (Some(window), None) => Ok(window),
            _ => Err(CliError::InvalidArgument(
                "exactly one of --within-days, --within-weeks, --within-months, --within-years must be specified"
                    .to_string(),
            )),
        }
    }
}

/// Exactly one of port or protocol must be given.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Listener {
    /// The listener port
    #[arg(long)]
    pub port: Option<u16>,

    /// The listener protocol: amqp091, amqp10, mqtt, stomp, web-mqtt, web-stomp
    #[arg(long)]
    pub protocol: Option<String>,
}

pub async fn execute(command: CheckCommand, config: Config, ctx: Context) -> CliResult<()> {
    let pretty = config.pretty_print;
    let vhost = config.vhost.clone();
    let client = client(config, ctx);

    let result = match command {
        CheckCommand::Alarms => client.check_alarms().await,
        CheckCommand::LocalAlarms => client.check_local_alarms().await,
        CheckCommand::CertificateExpiration(within) => {
            let (within, unit) = within.window()?;
            client.check_certificate_expiration(within, unit).await
        }
        CheckCommand::Listener(Listener {
            port: Some(port), ..
        }) => client.check_port_listener(port).await,
        CheckCommand::Listener(Listener {
            protocol: Some(protocol),
            ..
        }) => client.check_protocol_listener(&protocol).await,
        CheckCommand::Listener(_) => {
            return Err(CliError::InvalidArgument(
                "exactly one of --port, --protocol must be specified".to_string(),
            ));
        }
        CheckCommand::VirtualHosts => client.check_virtual_hosts().await,
        CheckCommand::NodeIsQuorumCritical => client.check_node_is_quorum_critical().await,
        CheckCommand::NodeIsMirrorSyncCritical => client.check_node_is_mirror_sync_critical().await,
        CheckCommand::VhostAliveness => client.check_aliveness(&vhost).await,
    };

    emit(result, pretty)
}
