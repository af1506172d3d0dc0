//! `rmq list ...`

use super::{client, emit};
use crate::error::CliResult;
use clap::{Args, Subcommand};
use rmq_api::{Config, PageFilter};
use rmq_web::Context;

/// Options that shape list responses.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Fields to include, use dots for sub-fields like message_stats.publish_details.rate
    #[arg(long, global = true, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Field to sort by, only one field is supported
    #[arg(long, global = true)]
    pub sort: Option<String>,

    /// Reverse the sort order
    #[arg(long, global = true)]
    pub sort_reverse: bool,
}

impl ListArgs {
    pub fn apply(&self, config: &mut Config) {
        if !self.columns.is_empty() {
            config.columns = self.columns.clone();
        }
        if let Some(sort) = &self.sort {
            config.sort = sort.clone();
        }
        if self.sort_reverse {
            config.sort_reverse = true;
        }
    }
}

/// Paging and name filtering.
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// The results page number (one-based)
    #[arg(short, long)]
    pub page: Option<i64>,

    /// The results page size
    #[arg(short = 's', long)]
    pub page_size: Option<i64>,

    /// The name to filter for
    #[arg(short, long)]
    pub name: Option<String>,

    /// Treat --name as a regular expression
    #[arg(short, long)]
    pub regex: bool,
}

impl PageArgs {
    /// The filter, or `None` when no paging flag was given.
    pub fn filter(&self) -> Option<PageFilter> {
        if self.page.is_none() && self.page_size.is_none() && self.name.is_none() {
            return None;
        }
        Some(PageFilter::new_page_filter(
            self.page.unwrap_or(0),
            self.page_size.unwrap_or(0),
            self.name.clone().unwrap_or_default(),
            self.regex,
        ))
    }
}

#[derive(Args, Debug)]
pub struct ListCommand {
    #[command(flatten)]
    pub options: ListArgs,

    #[command(subcommand)]
    pub target: ListTarget,
}

#[derive(Subcommand, Debug)]
pub enum ListTarget {
    /// Cluster-wide overview
    Overview,

    /// Authentication details
    Auth,

    /// Authentication attempt statistics of a node
    AuthAttempts {
        /// The node name
        #[arg(short, long)]
        node: String,
    },

    /// Authentication attempt statistics of a node, per source
    AuthAttemptsBySource {
        /// The node name
        #[arg(short, long)]
        node: String,
    },

    /// Nodes in the cluster
    Nodes,

    /// One node
    Node {
        /// The node name
        #[arg(short, long)]
        name: String,

        /// Add memory statistics, can degrade performance
        #[arg(short, long)]
        memory: bool,

        /// Add binary statistics, can degrade performance
        #[arg(short, long)]
        binary: bool,
    },

    /// Management plugin extensions
    Extensions,

    /// Server definitions
    Definitions,

    /// Definitions of the configured virtual host
    VhostDefinitions,

    /// Open connections
    Connections(PageArgs),

    /// Open connections in the configured virtual host
    VhostConnections(PageArgs),

    /// One connection
    Connection {
        /// The connection name
        #[arg(short, long)]
        name: String,
    },

    /// Open channels
    Channels(PageArgs),

    /// Exchanges
    Exchanges(PageArgs),

    /// Queues
    Queues(PageArgs),

    /// Queues in the configured virtual host
    VhostQueues(PageArgs),

    /// One queue in the configured virtual host
    Queue {
        /// The queue name
        #[arg(short, long)]
        name: String,
    },

    /// Bindings
    Bindings,

    /// Bindings in the configured virtual host
    VhostBindings,

    /// Virtual hosts
    Vhosts,

    /// The configured virtual host
    Vhost,

    /// Limits of every virtual host
    VhostsLimits,

    /// Limits of the configured virtual host
    VhostLimits,

    /// Users
    Users,

    /// One user
    User {
        /// The user name
        #[arg(short, long)]
        name: String,
    },

    /// The current user
    Whoami,

    /// Permissions of every user
    Permissions,

    /// Global parameters
    GlobalParameters,

    /// One global parameter
    GlobalParameter {
        /// The parameter name
        #[arg(short, long)]
        name: String,
    },

    /// Federation links
    FederationLinks,

    /// Federation links in the configured virtual host
    VhostFederationLinks,
}

pub async fn execute(command: ListCommand, mut config: Config, ctx: Context) -> CliResult<()> {
    command.options.apply(&mut config);
    let pretty = config.pretty_print;
    let vhost = config.vhost.clone();
    let client = client(config, ctx);

    let result = match command.target {
        ListTarget::Overview => client.overview().await,
        ListTarget::Auth => client.auth().await,
        ListTarget::AuthAttempts { node } => client.auth_attempts(&node).await,
        ListTarget::AuthAttemptsBySource { node } => client.auth_attempts_by_source(&node).await,
        ListTarget::Nodes => client.nodes().await,
        ListTarget::Node {
            name,
            memory,
            binary,
        } => client.node(&name, memory, binary).await,
        ListTarget::Extensions => client.extensions().await,
        ListTarget::Definitions => client.definitions().await,
        ListTarget::VhostDefinitions => client.vhost_definitions(&vhost).await,
        ListTarget::Connections(page) => client.connections(page.filter().as_ref()).await,
        ListTarget::VhostConnections(page) => {
            client
                .vhost_connections(&vhost, page.filter().as_ref())
                .await
        }
        ListTarget::Connection { name } => client.connection(&name).await,
        ListTarget::Channels(page) => client.channels(page.filter().as_ref()).await,
        ListTarget::Exchanges(page) => client.exchanges(page.filter().as_ref()).await,
        ListTarget::Queues(page) => client.queues(page.filter().as_ref()).await,
        ListTarget::VhostQueues(page) => client.vhost_queues(&vhost, page.filter().as_ref()).await,
        ListTarget::Queue { name } => client.queue(&vhost, &name).await,
        ListTarget::Bindings => client.bindings().await,
        ListTarget::VhostBindings => client.vhost_bindings(&vhost).await,
        ListTarget::Vhosts => client.vhosts().await,
        ListTarget::Vhost => client.vhost(&vhost).await,
        ListTarget::VhostsLimits => client.vhosts_limits().await,
        ListTarget::VhostLimits => client.vhost_limits(&vhost).await,
        ListTarget::Users => client.users().await,
        ListTarget::User { name } => client.user(&name).await,
        ListTarget::Whoami => client.get_json("whoami", None).await,
        ListTarget::Permissions => client.permissions().await,
        ListTarget::GlobalParameters => client.global_parameters().await,
        ListTarget::GlobalParameter { name } => client.global_parameter(&name).await,
        ListTarget::FederationLinks => client.federation_links().await,
        ListTarget::VhostFederationLinks => client.vhost_federation_links(&vhost).await,
    };

    emit(result, pretty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_paging_flags() {
        assert_eq!(PageArgs::default().filter(), None);
    }

    #[test]
    fn test_paging_flags_fill_defaults() {
        let args = PageArgs {
            name: Some("orders".to_string()),
            regex: true,
            ..PageArgs::default()
        };
        let filter = args.filter().unwrap();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 100);
        assert_eq!(filter.to_url_suffix(), "?name=orders&use_regex=true");
    }

    #[test]
    fn test_list_args_override_config() {
        let mut config = Config {
            sort: "name".to_string(),
            ..Config::default()
        };
        ListArgs {
            columns: vec!["name".to_string()],
            sort: None,
            sort_reverse: true,
        }
        .apply(&mut config);

        assert_eq!(config.columns, vec!["name"]);
        assert_eq!(config.sort, "name");
        assert!(config.sort_reverse);
    }
}
