//! rmq - command line client for the RabbitMQ management API.
//!
//! # Commands
//!
//! - `rmq list <resource>` - List nodes, queues, connections, users, ...
//! - `rmq check <check>` - Run a health check
//! - `rmq get <path>` - GET any management API path
//! - `rmq generate` - Print the virtual host topology as a Graphviz digraph
//! - `rmq config <show|set|unset|create>` - Manage the config file
//!
//! Settings come from `~/.rmq.toml`, `RMQ_*` environment variables and
//! command line flags, in that order of precedence (last wins).

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rmq_api::Config;
use rmq_web::Context;
use std::io;
use std::path::PathBuf;
use tracing::warn;

mod commands;
mod error;
mod logging;
mod settings;

use commands::check::CheckCommand;
use commands::config::ConfigCommand;
use commands::list::ListCommand;
use commands::{check, config, generate, get, list};
use error::CliResult;

/// Command line client for the RabbitMQ management API
#[derive(Parser)]
#[command(name = "rmq")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "Command line client for the RabbitMQ management API")]
#[command(long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = format!(
    "{}\n  {} rmq list queues --columns name,messages --sort messages --sort-reverse\n  {} rmq --vhost orders list vhost-queues -n 'order.*' -r\n  {} rmq check certificate-expiration --within-weeks 4\n  {} rmq config set host rabbit.internal",
    "Examples:".bright_cyan().bold(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file [default: ~/.rmq.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

/// Connection flags. Given flags override the config file and environment.
#[derive(Args, Debug, Default)]
struct ConnectionArgs {
    /// RabbitMQ api protocol
    #[arg(long, global = true)]
    scheme: Option<String>,

    /// RabbitMQ machine name
    #[arg(long, global = true)]
    host: Option<String>,

    /// RabbitMQ management api port
    #[arg(long, global = true)]
    api_port: Option<u16>,

    /// RabbitMQ user name
    #[arg(long, global = true)]
    user: Option<String>,

    /// RabbitMQ password
    #[arg(long, global = true)]
    password: Option<String>,

    /// RabbitMQ virtual host
    #[arg(long, global = true)]
    vhost: Option<String>,

    /// Log http request and response details to stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Indent the json responses
    #[arg(long, global = true)]
    pretty_print: bool,
}

impl ConnectionArgs {
    fn apply(&self, config: &mut Config) {
        let strings = [
            (&self.scheme, &mut config.scheme),
            (&self.host, &mut config.host),
            (&self.user, &mut config.user),
            (&self.password, &mut config.password),
            (&self.vhost, &mut config.vhost),
        ];
        for (flag, value) in strings {
            if let Some(flag) = flag {
                *value = flag.clone();
            }
        }
        if let Some(port) = self.api_port {
            config.api_port = port;
        }
        if self.debug {
            config.debug = true;
        }
        if self.pretty_print {
            config.pretty_print = true;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List resources of the broker
    #[command(alias = "l")]
    List(ListCommand),

    /// Run health checks
    #[command(alias = "c")]
    Check {
        #[command(subcommand)]
        command: CheckCommand,
    },

    /// GET a path relative to the api root, e.g. `rmq get queues/%2F`
    Get {
        /// The path, optionally with a query string
        path: String,
    },

    /// Print the topology of the virtual host as a Graphviz digraph
    Generate,

    /// Show and edit the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

async fn run(cli: Cli) -> CliResult<()> {
    let loaded = settings::load(cli.config.as_deref())?;
    let mut api_config = loaded.config.clone();
    cli.connection.apply(&mut api_config);

    logging::init(api_config.debug);
    for key in &loaded.ignored {
        warn!(key = %key, "Ignoring unknown setting in config file");
    }
    // Config commands run with invalid values so they can repair the file.
    if matches!(cli.command, Commands::Config { .. }) {
        for problem in &loaded.invalid {
            warn!(problem = %problem, "Ignoring invalid setting");
        }
    } else {
        loaded.ensure_valid()?;
    }

    let ctx = Context::background();
    let cancel = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::List(command) => list::execute(command, api_config, ctx).await,
        Commands::Check { command } => check::execute(command, api_config, ctx).await,
        Commands::Get { path } => get::execute(&path, api_config, ctx).await,
        Commands::Generate => generate::execute(api_config, ctx).await,
        Commands::Config { command } => {
            config::execute(command, &loaded, &api_config, &mut io::stdout().lock())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "ERROR:".red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "rmq",
            "--host",
            "rabbit",
            "--api-port",
            "15673",
            "--pretty-print",
            "list",
            "nodes",
        ]);
        let mut config = Config {
            host: "file-host".to_string(),
            user: "file-user".to_string(),
            ..Config::default()
        };
        cli.connection.apply(&mut config);

        assert_eq!(config.host, "rabbit");
        assert_eq!(config.api_port, 15673);
        assert_eq!(config.user, "file-user");
        assert!(config.pretty_print);
        assert!(!config.debug);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "rmq", "list", "queues", "--vhost", "orders", "-n", "a.*", "-r",
        ]);
        assert_eq!(cli.connection.vhost.as_deref(), Some("orders"));
    }

    #[test]
    fn test_exactly_one_expiration_window() {
        assert!(Cli::try_parse_from(["rmq", "check", "certificate-expiration"]).is_err());
        assert!(
            Cli::try_parse_from(["rmq", "check", "certificate-expiration", "-d", "1", "-w", "2"])
                .is_err()
        );
        assert!(
            Cli::try_parse_from(["rmq", "check", "certificate-expiration", "-d", "0"]).is_err()
        );
        assert!(
            Cli::try_parse_from(["rmq", "check", "certificate-expiration", "-m", "3"]).is_ok()
        );
    }

    #[test]
    fn test_listener_needs_port_or_protocol() {
        assert!(Cli::try_parse_from(["rmq", "check", "listener"]).is_err());
        assert!(
            Cli::try_parse_from([
                "rmq",
                "check",
                "listener",
                "--port",
                "5672",
                "--protocol",
                "amqp091",
            ])
            .is_err()
        );
        assert!(Cli::try_parse_from(["rmq", "check", "listener", "--protocol", "mqtt"]).is_ok());
    }
}
