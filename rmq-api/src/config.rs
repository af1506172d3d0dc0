//! Connection and listing settings for the management API.

use crate::error::{ApiError, Result};
use rmq_web::{APPLICATION_JSON, Query, Request};
use serde::{Deserialize, Serialize};

/// Prefix of the environment variables that override settings.
pub const ENV_PREFIX: &str = "RMQ";

/// Settings shared by every management API call.
///
/// Field names use kebab-case when serialized, so `api_port` is stored as
/// `api-port` and read from `RMQ_API_PORT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub scheme: String,
    pub host: String,
    pub api_port: u16,
    pub vhost: String,
    pub user: String,
    pub password: String,
    pub debug: bool,
    pub pretty_print: bool,
    pub columns: Vec<String>,
    pub sort: String,
    pub sort_reverse: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            api_port: 15672,
            vhost: "/".to_string(),
            user: "guest".to_string(),
            password: "guest".to_string(),
            debug: false,
            pretty_print: false,
            columns: Vec::new(),
            sort: String::new(),
            sort_reverse: false,
        }
    }
}

impl Config {
    /// All setting names, sorted.
    pub const KEYS: [&'static str; 11] = [
        "api-port",
        "columns",
        "debug",
        "host",
        "password",
        "pretty-print",
        "scheme",
        "sort",
        "sort-reverse",
        "user",
        "vhost",
    ];

    /// Root of the management API, e.g. `http://localhost:15672/api/`.
    pub fn api_url(&self) -> String {
        format!("{}://{}:{}/api/", self.scheme, self.host, self.api_port)
    }

    /// Query parameters added to every call: `columns`, `sort` and `sort_reverse`.
    pub fn list_query(&self) -> Query {
        let mut query = Query::new();
        query
            .add_if(!self.columns.is_empty(), "columns", self.columns.join(","))
            .add_if(!self.sort.is_empty(), "sort", self.sort.as_str())
            .add_if(self.sort_reverse, "sort_reverse", "true");
        query
    }

    /// Point `request` at the API root and add credentials and JSON headers.
    pub fn apply(&self, request: &mut Request) {
        request
            .base_url(self.api_url())
            .basic_auth(&self.user, &self.password)
            .content_type(APPLICATION_JSON)
            .accept(APPLICATION_JSON);
    }

    /// The value of `key` rendered as text. Columns are joined with `,`.
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match normalize_key(key).as_str() {
            "scheme" => self.scheme.clone(),
            "host" => self.host.clone(),
            "api-port" => self.api_port.to_string(),
            "vhost" => self.vhost.clone(),
            "user" => self.user.clone(),
            "password" => self.password.clone(),
            "debug" => self.debug.to_string(),
            "pretty-print" => self.pretty_print.to_string(),
            "columns" => self.columns.join(","),
            "sort" => self.sort.clone(),
            "sort-reverse" => self.sort_reverse.to_string(),
            _ => return Err(ApiError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Parse `value` and store it under `key`.
    ///
    /// Keys are matched case-insensitively; `_` and `.` count as `-`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_key(key).as_str() {
            "scheme" => self.scheme = value.to_string(),
            "host" => self.host = value.to_string(),
            "api-port" => {
                self.api_port = value.trim().parse().map_err(|_| {
                    ApiError::InvalidArgument(format!("{key}: {value:?} is not a port number"))
                })?
            }
            "vhost" => self.vhost = value.to_string(),
            "user" => self.user = value.to_string(),
            "password" => self.password = value.to_string(),
            "debug" => self.debug = parse_bool(key, value)?,
            "pretty-print" => self.pretty_print = parse_bool(key, value)?,
            "columns" => self.columns = split_columns(value),
            "sort" => self.sort = value.to_string(),
            "sort-reverse" => self.sort_reverse = parse_bool(key, value)?,
            _ => return Err(ApiError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Every setting as `(key, value)`, sorted by key.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        Self::KEYS
            .iter()
            .filter_map(|key| self.get(key).ok().map(|value| (*key, value)))
            .collect()
    }
}

/// Canonical form of a setting name: lowercase with `-` separators.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace(['_', '.'], "-")
}

/// Environment variable that overrides `key`, e.g. `RMQ_API_PORT`.
pub fn env_var_name(key: &str) -> String {
    format!(
        "{ENV_PREFIX}_{}",
        normalize_key(key).replace('-', "_").to_ascii_uppercase()
    )
}

/// Split a comma separated column list, dropping empty entries.
pub fn split_columns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ApiError::InvalidArgument(format!(
            "{key}: {value:?} is not a boolean"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url(), "http://localhost:15672/api/");
        assert_eq!(config.vhost, "/");
        assert_eq!(config.user, "guest");
        assert!(config.list_query().is_empty());
    }

    #[test]
    fn test_list_query() {
        let config = Config {
            columns: vec!["name".to_string(), "message_stats.publish_details.rate".to_string()],
            sort: "name".to_string(),
            sort_reverse: true,
            ..Config::default()
        };
        assert_eq!(
            config.list_query().query_string(),
            "?columns=name%2Cmessage_stats.publish_details.rate&sort=name&sort_reverse=true"
        );
    }

    #[test]
    fn test_set_parses_values() {
        let mut config = Config::default();
        config.set("API_PORT", "15673").unwrap();
        config.set("pretty.print", "true").unwrap();
        config.set("columns", "name, state,,").unwrap();
        config.set("Host", "rabbit").unwrap();

        assert_eq!(config.api_port, 15673);
        assert!(config.pretty_print);
        assert_eq!(config.columns, vec!["name", "state"]);
        assert_eq!(config.get("host").unwrap(), "rabbit");
        assert_eq!(config.get("columns").unwrap(), "name,state");
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("api-port", "not-a-port"),
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(matches!(
            config.set("debug", "maybe"),
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(matches!(
            config.set("colour", "blue"),
            Err(ApiError::UnknownKey(_))
        ));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_entries_cover_every_key() {
        let entries = Config::default().entries();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, Config::KEYS.to_vec());
        assert!(entries.contains(&("api-port", "15672".to_string())));
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("api-port"), "RMQ_API_PORT");
        assert_eq!(env_var_name("sort.reverse"), "RMQ_SORT_REVERSE");
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["api-port"], 15672);
        assert_eq!(json["pretty-print"], false);

        let partial: Config = serde_json::from_str(r#"{"host":"rabbit"}"#).unwrap();
        assert_eq!(partial.host, "rabbit");
        assert_eq!(partial.api_port, 15672);
    }

    #[tokio::test]
    async fn test_apply() {
        let config = Config {
            host: "rabbit".to_string(),
            ..Config::default()
        };
        let mut request = Request::new();
        config.apply(request.path("overview"));

        let built = request.build().await.unwrap();
        assert_eq!(built.url().as_str(), "http://rabbit:15672/api/overview");
        assert_eq!(built.headers()["authorization"], "Basic Z3Vlc3Q6Z3Vlc3Q=");
        assert_eq!(built.headers()["accept"], APPLICATION_JSON);
    }
}
