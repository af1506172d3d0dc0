//! Request descriptor.

use crate::body::{BodySource, CachedBody, GetBody, Payload};
use crate::codec::{APPLICATION_FORM, RequestEncoding};
use crate::error::{BoxError, SharedError};
use crate::query::{query_escape, resolve_path};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use url::Url;

/// Inspects or modifies a request after it was built and before it is sent.
///
/// Returning an error stops processing; the request is never sent.
pub trait RequestProcessor: Send + Sync {
    /// Process the request.
    fn process(&self, request: &mut reqwest::Request) -> std::result::Result<(), BoxError>;
}

impl<F> RequestProcessor for F
where
    F: Fn(&mut reqwest::Request) -> std::result::Result<(), BoxError> + Send + Sync,
{
    fn process(&self, request: &mut reqwest::Request) -> std::result::Result<(), BoxError> {
        self(request)
    }
}

/// Accumulates everything needed to build one HTTP request.
///
/// Nothing is resolved until [`Request::url`] or [`Request::build`]; both
/// can be called any number of times. Cloning gives an independent copy.
#[derive(Clone)]
pub struct Request {
    base_url: String,
    scheme: Option<String>,
    host: Option<String>,
    paths: Vec<String>,
    query: BTreeMap<String, Vec<String>>,
    fragment: Option<String>,
    method: Method,
    headers: HeaderMap,
    invalid_header: Option<(String, String)>,
    body: BodySource,
    encoding: Option<Arc<dyn RequestEncoding>>,
    processors: Vec<Arc<dyn RequestProcessor>>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            scheme: None,
            host: None,
            paths: Vec::new(),
            query: BTreeMap::new(),
            fragment: None,
            method: Method::GET,
            headers: HeaderMap::new(),
            invalid_header: None,
            body: BodySource::Empty,
            encoding: None,
            processors: Vec::new(),
        }
    }
}

impl Request {
    /// An empty `GET` request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method.
    pub fn method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    /// The configured HTTP method.
    pub fn get_method(&self) -> &Method {
        &self.method
    }

    /// Set the base URL. A missing trailing `/` is appended.
    pub fn base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        let mut base_url = base_url.into();
        if !base_url.is_empty() && !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// Override the URL scheme.
    pub fn scheme(&mut self, scheme: impl Into<String>) -> &mut Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Override the URL host, optionally with a `:port` suffix.
    pub fn host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    /// Override the URL host and port.
    pub fn host_and_port(&mut self, host: impl fmt::Display, port: u16) -> &mut Self {
        self.host(format!("{host}:{port}"))
    }

    /// Append a path, resolved against the URL built so far.
    ///
    /// A relative path replaces everything after the last `/`; a path
    /// starting with `/` replaces the whole path.
    pub fn path(&mut self, path: impl Into<String>) -> &mut Self {
        self.paths.push(path.into());
        self
    }

    /// Set a query parameter, replacing earlier values with the same name.
    pub fn param<I, V>(&mut self, name: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.query
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Set the URL fragment.
    pub fn fragment(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Set a header, replacing earlier values for the same (case-insensitive) key.
    ///
    /// An invalid name or value is reported by [`Request::build`].
    pub fn header<I, V>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let name = match HeaderName::try_from(key) {
            Ok(name) => name,
            Err(e) => return self.record_invalid_header(key, e),
        };

        let mut parsed = Vec::new();
        for value in values {
            match HeaderValue::try_from(value.as_ref()) {
                Ok(v) => parsed.push(v),
                Err(e) => return self.record_invalid_header(key, e),
            }
        }

        self.headers.remove(&name);
        for value in parsed {
            self.headers.append(name.clone(), value);
        }
        self
    }

    /// The headers configured so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Set the `Content-Type` header.
    pub fn content_type(&mut self, content_type: &str) -> &mut Self {
        self.header(CONTENT_TYPE.as_str(), [content_type])
    }

    /// Set the `Accept` header.
    pub fn accept(&mut self, content_type: &str) -> &mut Self {
        self.header(ACCEPT.as_str(), [content_type])
    }

    /// Set the `Accept` header from content types and their quality values.
    ///
    /// Entries are ordered by descending quality, then by name. Quality is
    /// clamped to `[0, 1]`.
    pub fn accept_range<I, K>(&mut self, range: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let entries: BTreeMap<String, f64> =
            range.into_iter().map(|(k, q)| (k.into(), q)).collect();
        let values = sorted_range(entries.into_iter().collect());
        self.header(ACCEPT.as_str(), values)
    }

    /// Set `Authorization: Basic` from a user and password.
    pub fn basic_auth(&mut self, user: &str, password: &str) -> &mut Self {
        let encoded = STANDARD.encode(format!("{user}:{password}"));
        self.header(AUTHORIZATION.as_str(), [format!("Basic {encoded}")])
    }

    /// Set `Authorization: Bearer`.
    pub fn bearer_auth(&mut self, token: &str) -> &mut Self {
        self.header(AUTHORIZATION.as_str(), [format!("Bearer {token}")])
    }

    /// Use `get_body` as the body source. It is called once per send.
    pub fn body(&mut self, get_body: impl GetBody + 'static) -> &mut Self {
        self.body = BodySource::Generator(Arc::new(get_body));
        self
    }

    /// Use `get_body` as the body source, calling it at most once and replaying its result.
    ///
    /// The whole body is held in memory.
    pub fn body_cached(&mut self, get_body: impl GetBody + 'static) -> &mut Self {
        self.body = BodySource::Cached(Arc::new(CachedBody::new(get_body)));
        self
    }

    /// Read the body from `reader`. It can only be sent once.
    pub fn body_reader(&mut self, reader: impl AsyncRead + Send + 'static) -> &mut Self {
        self.body = BodySource::reader(reader);
        self
    }

    /// Send `body` as is.
    pub fn body_bytes(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = BodySource::Bytes(body.into());
        self
    }

    /// Send `body` as is.
    pub fn body_string(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = BodySource::Bytes(Bytes::from(body.into()));
        self
    }

    /// Send `form` URL-encoded and set the matching `Content-Type`.
    pub fn body_form<I, K, V>(&mut self, form: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs: Vec<(String, String)> = form
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.body = match serde_urlencoded::to_string(&pairs) {
            Ok(encoded) => BodySource::Bytes(Bytes::from(encoded)),
            Err(e) => BodySource::Invalid(Arc::new(e)),
        };
        self.content_type(APPLICATION_FORM)
    }

    /// Stream the body from the file at `path`, opened at send time.
    pub fn body_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.body = BodySource::File(path.into());
        self
    }

    /// Set the request encoding and the matching `Content-Type`.
    pub fn body_encoding(&mut self, encoding: Arc<dyn RequestEncoding>) -> &mut Self {
        let content_type = encoding.content_type().to_string();
        self.encoding = Some(encoding);
        self.content_type(&content_type)
    }

    /// Encode `value` as the body with the request encoding active at send time.
    ///
    /// `value` is captured now. Passing `encoding` is the same as calling
    /// [`Request::body_encoding`] first.
    pub fn body_encode<T>(
        &mut self,
        value: &T,
        encoding: Option<Arc<dyn RequestEncoding>>,
    ) -> &mut Self
    where
        T: Serialize + ?Sized,
    {
        if let Some(encoding) = encoding {
            self.body_encoding(encoding);
        }
        self.body = match serde_json::to_value(value) {
            Ok(value) => BodySource::Encode(Arc::new(value)),
            Err(e) => BodySource::Invalid(Arc::new(e) as SharedError),
        };
        self
    }

    /// Add request processors. They run in order on every built request.
    pub fn ensure(&mut self, processor: impl RequestProcessor + 'static) -> &mut Self {
        self.processors.push(Arc::new(processor));
        self
    }

    /// Resolve the request URL.
    pub fn url(&self) -> Result<Url> {
        let mut url = self.parse_base()?;

        if let Some(scheme) = &self.scheme {
            url.set_scheme(scheme)
                .map_err(|()| Error::InvalidScheme(scheme.clone()))?;
        }

        if let Some(host) = &self.host {
            set_host(&mut url, host)?;
        }

        for path in &self.paths {
            let resolved = resolve_path(url.path(), path);
            url.set_path(&resolved);
        }

        if !self.query.is_empty() {
            let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (k, v) in url.query_pairs() {
                merged.entry(k.into_owned()).or_default().push(v.into_owned());
            }
            for (k, vv) in &self.query {
                merged.insert(k.clone(), vv.clone());
            }
            let encoded = merged
                .iter()
                .flat_map(|(k, vv)| {
                    vv.iter()
                        .map(move |v| format!("{}={}", query_escape(k), query_escape(v)))
                })
                .collect::<Vec<_>>()
                .join("&");
            url.set_query((!encoded.is_empty()).then_some(encoded.as_str()));
        }

        if let Some(fragment) = &self.fragment {
            url.set_fragment(Some(fragment));
        }

        Ok(url)
    }

    /// Build a request from the configured values.
    ///
    /// Resolves the URL and the body, applies the headers and runs the
    /// request processors, stopping at the first error.
    pub async fn build(&self) -> Result<reqwest::Request> {
        if let Some((name, message)) = &self.invalid_header {
            return Err(Error::InvalidHeader {
                name: name.clone(),
                message: message.clone(),
            });
        }

        let url = self.url()?;
        let payload = self.body.open(self.encoding.as_ref()).await?;

        let mut request = reqwest::Request::new(self.method.clone(), url);
        match payload {
            Payload::Empty => {}
            Payload::Bytes(bytes) => *request.body_mut() = Some(reqwest::Body::from(bytes)),
            Payload::Stream(stream) => {
                *request.body_mut() = Some(reqwest::Body::wrap_stream(ReaderStream::new(stream)))
            }
        }

        self.apply_headers(request.headers_mut());

        for processor in &self.processors {
            processor
                .process(&mut request)
                .map_err(Error::RequestProcessor)?;
        }

        Ok(request)
    }

    fn parse_base(&self) -> Result<Url> {
        let invalid = |source| Error::InvalidUrl {
            url: self.base_url.clone(),
            source,
        };

        if self.base_url.is_empty() {
            let scheme = self.scheme.as_deref().unwrap_or("https");
            let host = self.host.as_deref().unwrap_or_default();
            return Url::parse(&format!("{scheme}://{host}/")).map_err(invalid);
        }

        match Url::parse(&self.base_url) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("https://{}", self.base_url)).map_err(invalid)
            }
            Err(e) => Err(invalid(e)),
        }
    }

    fn apply_headers(&self, target: &mut HeaderMap) {
        for name in self.headers.keys() {
            target.remove(name);
            for value in self.headers.get_all(name) {
                target.append(name.clone(), value.clone());
            }
        }
    }

    fn record_invalid_header(&mut self, key: &str, e: impl fmt::Display) -> &mut Self {
        if self.invalid_header.is_none() {
            self.invalid_header = Some((key.to_string(), e.to_string()));
        }
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("paths", &self.paths)
            .field("query", &self.query)
            .field("fragment", &self.fragment)
            .field("headers", &self.headers)
            .field("body", &self.body.kind())
            .field(
                "encoding",
                &self.encoding.as_ref().map(|e| e.content_type().to_string()),
            )
            .field("processors", &self.processors.len())
            .finish()
    }
}

fn set_host(url: &mut Url, host: &str) -> Result<()> {
    let invalid = |source| Error::InvalidUrl {
        url: host.to_string(),
        source,
    };

    let (name, port) = match host.rsplit_once(':') {
        // a bare IPv6 literal has colons but no port
        Some((name, port)) if !port.contains(']') => {
            let port = port
                .parse::<u16>()
                .map_err(|_| invalid(url::ParseError::InvalidPort))?;
            (name, Some(port))
        }
        _ => (host, None),
    };

    url.set_host(Some(name)).map_err(invalid)?;
    if let Some(port) = port {
        url.set_port(Some(port))
            .map_err(|()| invalid(url::ParseError::InvalidPort))?;
    }
    Ok(())
}

/// Order content types for an `Accept` header.
///
/// Highest quality first, names ascending on ties. The leading entry is
/// left bare when its quality is exactly 1.
pub(crate) fn sorted_range(entries: Vec<(String, f64)>) -> Vec<String> {
    let mut entries: Vec<(String, f64)> = entries
        .into_iter()
        .map(|(name, q)| (name, clamp_quality(q)))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    entries
        .into_iter()
        .enumerate()
        .map(|(i, (name, q))| {
            if i == 0 && q == 1.0 {
                name
            } else {
                format!("{name};q={}", format_quality(q))
            }
        })
        .collect()
}

fn clamp_quality(q: f64) -> f64 {
    if q.is_nan() || q <= 0.0 {
        0.0
    } else if q >= 1.0 {
        1.0
    } else {
        q
    }
}

/// Format with three significant digits and no trailing zeros, e.g. `0.255`, `0.5`, `1`, `1e-05`.
pub(crate) fn format_quality(q: f64) -> String {
    const DIGITS: i32 = 3;

    if q == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{:.*e}", (DIGITS - 1) as usize, q);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (DIGITS - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{q:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
