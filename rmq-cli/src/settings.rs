//! Settings loading.
//!
//! Values are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. the config file (`~/.rmq.toml` or `--config <path>`)
//! 3. `RMQ_*` environment variables
//! 4. command line flags, applied by the caller

use crate::error::{CliError, CliResult};
use rmq_api::Config;
use rmq_api::config::{env_var_name, normalize_key};
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Config file name in the home directory.
pub const FILE_NAME: &str = ".rmq.toml";

/// Settings after the file and environment layers.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The config file, whether or not it exists.
    pub path: Option<PathBuf>,
    /// Raw contents of the config file.
    pub file: Table,
    /// Settings taken from the environment as `(key, value)`.
    pub env: Vec<(&'static str, String)>,
    /// Keys in the config file that are not settings.
    pub ignored: Vec<String>,
    /// Values from the file or environment that could not be parsed.
    pub invalid: Vec<String>,
    pub config: Config,
}

impl Settings {
    /// Fail on the first value that could not be parsed.
    pub fn ensure_valid(&self) -> CliResult<()> {
        match self.invalid.first() {
            Some(problem) => Err(CliError::Config(problem.clone())),
            None => Ok(()),
        }
    }

    /// The config file path, or an error when there is no home directory.
    pub fn require_path(&self) -> CliResult<&Path> {
        self.path.as_deref().ok_or_else(|| {
            CliError::Config("no home directory, pass --config <path>".to_string())
        })
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(FILE_NAME))
}

/// Load from `explicit` (or the default file) and the process environment.
pub fn load(explicit: Option<&Path>) -> CliResult<Settings> {
    let path = explicit.map(Path::to_path_buf).or_else(default_path);
    load_with(path, |name| std::env::var(name).ok())
}

pub fn load_with(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> CliResult<Settings> {
    let file = match &path {
        Some(path) => read_table(path)?,
        None => Table::new(),
    };

    let mut config = Config::default();
    let mut ignored = Vec::new();
    let mut invalid = Vec::new();
    for (key, value) in &file {
        let known = Config::KEYS.contains(&normalize_key(key).as_str());
        match value_text(value) {
            Some(text) if known => {
                if let Err(e) = config.set(key, &text) {
                    invalid.push(format!("{}: {e}", display_path(&path)));
                }
            }
            _ => ignored.push(key.clone()),
        }
    }

    let mut from_env = Vec::new();
    for key in Config::KEYS {
        let name = env_var_name(key);
        if let Some(value) = env(&name) {
            match config.set(key, &value) {
                Ok(()) => from_env.push((key, value)),
                Err(e) => invalid.push(format!("{name}: {e}")),
            }
        }
    }

    Ok(Settings {
        path,
        file,
        env: from_env,
        ignored,
        invalid,
        config,
    })
}

/// Read a TOML table; a missing file is an empty table.
pub fn read_table(path: &Path) -> CliResult<Table> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Table::new()),
        Err(e) => Err(CliError::Config(format!(
            "could not read {}: {e}",
            path.display()
        ))),
    }
}

pub fn write_table(path: &Path, table: &Table) -> CliResult<()> {
    std::fs::write(path, toml::to_string_pretty(table)?)?;
    Ok(())
}

/// Parse `value` for `key` and return the canonical key with a typed TOML value.
pub fn typed_value(key: &str, value: &str) -> CliResult<(String, Value)> {
    let key = normalize_key(key);
    let mut config = Config::default();
    config.set(&key, value)?;

    match Value::try_from(&config)? {
        Value::Table(mut table) => table
            .remove(&key)
            .map(|value| (key.clone(), value))
            .ok_or_else(|| CliError::Config(format!("unknown setting {key:?}"))),
        _ => Err(CliError::Config("settings did not serialize to a table".to_string())),
    }
}

/// Render a TOML value the way `Config::set` parses it.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_text)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| FILE_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_with(Some(dir.path().join("absent.toml")), env_of(&[])).unwrap();
        assert_eq!(settings.config, Config::default());
        assert!(settings.file.is_empty());
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "host = \"file-host\"\napi-port = 1\ncolumns = [\"name\", \"state\"]\n",
        );
        let settings = load_with(Some(path), env_of(&[("RMQ_API_PORT", "2")])).unwrap();

        assert_eq!(settings.config.host, "file-host");
        assert_eq!(settings.config.api_port, 2);
        assert_eq!(settings.config.columns, vec!["name", "state"]);
        assert_eq!(settings.env, vec![("api-port", "2".to_string())]);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "colour = \"blue\"\n[section]\nhost = \"x\"\n");
        let settings = load_with(Some(path), env_of(&[])).unwrap();

        assert_eq!(settings.config, Config::default());
        assert_eq!(settings.ignored, vec!["colour", "section"]);
    }

    #[test]
    fn test_invalid_values_are_collected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "debug = \"sometimes\"\nhost = \"rabbit\"\n");
        let settings = load_with(Some(path), env_of(&[])).unwrap();

        assert_eq!(settings.config.host, "rabbit");
        assert!(!settings.config.debug);
        assert_eq!(settings.invalid.len(), 1);
        assert!(matches!(settings.ensure_valid(), Err(CliError::Config(_))));

        let settings = load_with(None, env_of(&[("RMQ_API_PORT", "http")])).unwrap();
        assert!(settings.env.is_empty());
        let err = settings.ensure_valid().unwrap_err();
        assert!(err.to_string().contains("RMQ_API_PORT"));
    }

    #[test]
    fn test_typed_value() {
        assert_eq!(
            typed_value("API_PORT", "15673").unwrap(),
            ("api-port".to_string(), Value::Integer(15673))
        );
        assert_eq!(
            typed_value("pretty-print", "yes").unwrap(),
            ("pretty-print".to_string(), Value::Boolean(true))
        );
        let (_, columns) = typed_value("columns", "name,state").unwrap();
        assert_eq!(value_text(&columns).unwrap(), "name,state");
        assert!(typed_value("nope", "x").is_err());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        let mut table = Table::new();
        let (key, value) = typed_value("host", "rabbit").unwrap();
        table.insert(key, value);

        write_table(&path, &table).unwrap();
        assert_eq!(read_table(&path).unwrap(), table);
    }
}
