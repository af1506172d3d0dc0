//! Management API client.

use crate::config::Config;
use crate::error::{ApiError, Result};
use bytes::Bytes;
use http::{Method, StatusCode};
use rmq_web::{BodyReader, BoxError, Builder, Context, JsonCodec, Query, Slot, redacted};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;
use url::Url;

/// Client for the RabbitMQ management HTTP API.
///
/// Every call goes to `{scheme}://{host}:{api-port}/api/{path}` with basic
/// authentication and the configured `columns`, `sort` and `sort_reverse`
/// parameters. Bodies are returned as received; a status outside 2xx
/// becomes [`ApiError::Status`].
#[derive(Debug, Clone)]
pub struct Client {
    config: Config,
    http: reqwest::Client,
    ctx: Context,
}

impl Client {
    /// A client for `config` using a fresh transport and a background context.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            ctx: Context::background(),
        }
    }

    /// Use `http` as the transport.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Run every call under `ctx`.
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// The settings every call uses.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The URL a `GET` of `path` with `query` would use.
    pub fn url(&self, path: &str, query: Option<&Query>) -> Result<Url> {
        Ok(self.builder(Method::GET, path, query).url()?)
    }

    /// `GET` a path relative to the API root. `path` may carry its own query.
    pub async fn get_json(&self, path: &str, query: Option<&Query>) -> Result<Bytes> {
        self.call(self.builder(Method::GET, path, query)).await
    }

    /// `GET` a path and deserialize the body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: Option<&Query>) -> Result<T> {
        let body = self.get_json(path, query).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `PUT` `body` as JSON.
    pub async fn put_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Bytes> {
        let builder = self
            .builder(Method::PUT, path, None)
            .request(|r| {
                r.body_encode(body, Some(Arc::new(JsonCodec)));
            });
        self.call(builder).await
    }

    /// `POST` `body` as JSON.
    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Bytes> {
        let builder = self
            .builder(Method::POST, path, None)
            .request(|r| {
                r.body_encode(body, Some(Arc::new(JsonCodec)));
            });
        self.call(builder).await
    }

    fn builder(&self, method: Method, path: &str, query: Option<&Query>) -> Builder {
        let (path, inline) = split_query(path);

        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let extra = query.map(Query::pairs).unwrap_or_default();
        for (name, value) in inline
            .into_iter()
            .chain(extra)
            .chain(self.config.list_query().pairs())
        {
            params.entry(name).or_default().push(value);
        }

        Builder::new().client(self.http.clone()).request(|r| {
            self.config.apply(r);
            r.method(method).path(path.trim_start_matches('/'));
            for (name, values) in params {
                r.param(name, values);
            }
        })
    }

    async fn call(&self, builder: Builder) -> Result<Bytes> {
        let url = builder.url()?;
        let status: Slot<StatusCode> = Slot::new();
        let body: Slot<Bytes> = Slot::new();

        let builder = {
            let status = status.clone();
            let body = body.clone();
            builder.response(move |r| {
                r.max_size(-1)
                    .ensure(move |rsp: &reqwest::Response| -> std::result::Result<(), BoxError> {
                        status.set(rsp.status());
                        Ok(())
                    })
                    .body(move |_ctx: Context, mut reader: BodyReader| {
                        let body = body.clone();
                        async move {
                            let mut buf = Vec::new();
                            reader.read_to_end(&mut buf).await?;
                            body.set(Bytes::from(buf));
                            Ok::<(), BoxError>(())
                        }
                    });
            })
        };

        debug!(url = %redacted(&url), "Calling management API");
        builder.invoke(&self.ctx).await?;

        let status = status.take().unwrap_or_default();
        let body = body.take().unwrap_or_default();
        if !status.is_success() {
            debug!(status = %status, "Management API returned an error status");
            return Err(ApiError::Status {
                status,
                url: redacted(&url),
                body,
            });
        }
        Ok(body)
    }
}

/// Split `path?query` into the path and the decoded query pairs.
fn split_query(path: &str) -> (&str, Vec<(String, String)>) {
    match path.split_once('?') {
        Some((path, query)) => (
            path,
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (path, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(Config::default())
    }

    #[test]
    fn test_url_joins_api_root() {
        let url = client().url("/overview", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:15672/api/overview");
    }

    #[test]
    fn test_url_keeps_escaped_vhost() {
        let url = client().url("queues/%2F", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:15672/api/queues/%2F");
    }

    #[test]
    fn test_url_merges_queries() {
        let config = Config {
            columns: vec!["name".to_string()],
            sort: "messages".to_string(),
            ..Config::default()
        };
        let mut query = Query::new();
        query.add("page", "2");

        let url = Client::new(config)
            .url("queues?name=orders", Some(&query))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:15672/api/queues?columns=name&name=orders&page=2&sort=messages"
        );
    }

    #[test]
    fn test_split_query() {
        assert_eq!(split_query("nodes"), ("nodes", vec![]));
        assert_eq!(
            split_query("nodes/rabbit@a?memory=true&x=a+b"),
            (
                "nodes/rabbit@a",
                vec![
                    ("memory".to_string(), "true".to_string()),
                    ("x".to_string(), "a b".to_string()),
                ]
            )
        );
    }
}
