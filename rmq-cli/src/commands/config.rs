//! `rmq config ...`: inspect and edit the config file.

use crate::error::{CliError, CliResult};
use crate::settings::{self, Settings, value_text};
use clap::Subcommand;
use rmq_api::Config;
use rmq_api::config::{ENV_PREFIX, normalize_key};
use std::io::Write;

const MASK: &str = "xxxxx";

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the settings loaded from the config file, environment and flags
    Show {
        /// Only show the values defined in the config file
        #[arg(long, conflicts_with = "env_only")]
        file_only: bool,

        /// Only show the values defined in environment variables
        #[arg(long)]
        env_only: bool,
    },

    /// Save a setting in the config file
    Set {
        /// Setting name, e.g. api-port
        key: String,
        value: String,
    },

    /// Remove settings from the config file
    Unset {
        /// Setting names
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Create the config file if it does not exist yet
    Create,
}

pub fn execute<W: Write>(
    command: ConfigCommand,
    settings: &Settings,
    effective: &Config,
    out: &mut W,
) -> CliResult<()> {
    match command {
        ConfigCommand::Show {
            file_only: true, ..
        } => show_file(settings, out),
        ConfigCommand::Show { env_only: true, .. } => show_env(settings, out),
        ConfigCommand::Show { .. } => {
            let entries: Vec<(String, String)> = effective
                .entries()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
            print_entries(out, &entries)
        }
        ConfigCommand::Set { key, value } => set(settings, &key, &value, out),
        ConfigCommand::Unset { keys } => unset(settings, &keys, out),
        ConfigCommand::Create => create(settings, out),
    }
}

fn show_file<W: Write>(settings: &Settings, out: &mut W) -> CliResult<()> {
    let path = settings.require_path()?.display();
    if settings.file.is_empty() {
        writeln!(out, "No settings configured in config file {path}")?;
        return Ok(());
    }
    writeln!(out, "The current settings loaded from config file '{path}'")?;
    let entries: Vec<(String, String)> = settings
        .file
        .iter()
        .filter_map(|(k, v)| value_text(v).map(|text| (k.clone(), text)))
        .collect();
    print_entries(out, &entries)
}

fn show_env<W: Write>(settings: &Settings, out: &mut W) -> CliResult<()> {
    if settings.env.is_empty() {
        writeln!(out, "No settings configured in environment")?;
        return Ok(());
    }
    writeln!(
        out,
        "The current settings loaded from environment variables with prefix '{ENV_PREFIX}_'"
    )?;
    let entries: Vec<(String, String)> = settings
        .env
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    print_entries(out, &entries)
}

/// Aligned `key : value` lines sorted by key. Passwords are masked.
fn print_entries<W: Write>(out: &mut W, entries: &[(String, String)]) -> CliResult<()> {
    let mut entries = entries.to_vec();
    entries.sort();
    let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

    for (key, value) in &entries {
        let value = if normalize_key(key) == "password" && !value.is_empty() {
            MASK
        } else {
            value.as_str()
        };
        writeln!(out, "{key:<width$} : {value}")?;
    }
    Ok(())
}

fn set<W: Write>(settings: &Settings, key: &str, value: &str, out: &mut W) -> CliResult<()> {
    let path = settings.require_path()?;
    let (key, value) = settings::typed_value(key, value)?;

    if key == "password" {
        writeln!(
            out,
            "You really shouldn't do that, now you will have a cleartext password stored in {}",
            path.display()
        )?;
        writeln!(out, "You can undo your mistake with the command 'rmq config unset {key}'")?;
    }

    let mut table = settings::read_table(path)?;
    table.retain(|k, _| normalize_key(k) != key);
    table.insert(key, value);
    settings::write_table(path, &table)
}

fn unset<W: Write>(settings: &Settings, keys: &[String], out: &mut W) -> CliResult<()> {
    let path = settings.require_path()?;
    if !path.exists() {
        return Err(CliError::Config(format!(
            "config file {} does not exist",
            path.display()
        )));
    }

    let remove: Vec<String> = keys.iter().map(|k| normalize_key(k)).collect();
    let mut table = settings::read_table(path)?;
    let before = table.len();
    table.retain(|k, _| !remove.contains(&normalize_key(k)));

    if before != table.len() && remove.iter().any(|k| k == "password") {
        writeln!(
            out,
            "I'm really happy you reconsidered storing cleartext passwords on disk! Removing it now from {}",
            path.display()
        )?;
    }
    settings::write_table(path, &table)
}

fn create<W: Write>(settings: &Settings, out: &mut W) -> CliResult<()> {
    let path = settings.require_path()?;
    if path.exists() {
        writeln!(out, "Config file already exists at {}", path.display())?;
        return Ok(());
    }

    let defaults = toml::to_string(&Config::default())?;
    let mut content = format!(
        "# rmq settings\n#\n# {ENV_PREFIX}_<KEY> environment variables and command line flags\n# take precedence over the values in this file.\n#\n"
    );
    for line in defaults.lines().filter(|l| !l.trim().is_empty()) {
        content.push_str("# ");
        content.push_str(line);
        content.push('\n');
    }
    std::fs::write(path, content)?;
    writeln!(out, "Created config file at {}", path.display())?;
    Ok(())
}
