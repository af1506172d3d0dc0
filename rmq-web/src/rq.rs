//! Request configuration closures for [`Builder::request`](crate::Builder::request).
//!
//! ```
//! use rmq_web::{Builder, rq};
//!
//! let builder = Builder::get("http://localhost:15672/api/")
//!     .request(rq::path("queues"))
//!     .request(rq::param("page", ["2"]));
//! assert_eq!(
//!     builder.url().unwrap().as_str(),
//!     "http://localhost:15672/api/queues?page=2"
//! );
//! ```

use crate::Request;
use crate::body::GetBody;
use crate::codec::RequestEncoding;
use crate::request::RequestProcessor;
use bytes::Bytes;
use http::Method;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Set the HTTP method.
pub fn method(method: Method) -> impl FnOnce(&mut Request) {
    move |r: &mut Request| {
        r.method(method);
    }
}

/// Set the base URL that paths are resolved against.
pub fn base_url(base_url: impl Into<String>) -> impl FnOnce(&mut Request) {
    let base_url = base_url.into();
    move |r: &mut Request| {
        r.base_url(base_url);
    }
}

/// Override the URL scheme.
pub fn scheme(scheme: impl Into<String>) -> impl FnOnce(&mut Request) {
    let scheme = scheme.into();
    move |r: &mut Request| {
        r.scheme(scheme);
    }
}

/// Override the URL host.
pub fn host(host: impl Into<String>) -> impl FnOnce(&mut Request) {
    let host = host.into();
    move |r: &mut Request| {
        r.host(host);
    }
}

/// Override the URL host and port.
pub fn host_and_port(host: impl Into<String>, port: u16) -> impl FnOnce(&mut Request) {
    let host = host.into();
    move |r: &mut Request| {
        r.host_and_port(host, port);
    }
}

/// Append a path segment. A leading `/` replaces the path.
pub fn path(path: impl Into<String>) -> impl FnOnce(&mut Request) {
    let path = path.into();
    move |r: &mut Request| {
        r.path(path);
    }
}

/// Replace the values of a query parameter.
pub fn param<I, V>(name: impl Into<String>, values: I) -> impl FnOnce(&mut Request)
where
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    let name = name.into();
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    move |r: &mut Request| {
        r.param(name, values);
    }
}

/// Set the URL fragment.
pub fn fragment(fragment: impl Into<String>) -> impl FnOnce(&mut Request) {
    let fragment = fragment.into();
    move |r: &mut Request| {
        r.fragment(fragment);
    }
}

/// Replace the values of a header.
pub fn header<I, V>(key: impl Into<String>, values: I) -> impl FnOnce(&mut Request)
where
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    let key = key.into();
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    move |r: &mut Request| {
        r.header(&key, values);
    }
}

/// Set the `Content-Type` header.
pub fn content_type(content_type: impl Into<String>) -> impl FnOnce(&mut Request) {
    let content_type = content_type.into();
    move |r: &mut Request| {
        r.content_type(&content_type);
    }
}

/// Set the `Accept` header.
pub fn accept(content_type: impl Into<String>) -> impl FnOnce(&mut Request) {
    let content_type = content_type.into();
    move |r: &mut Request| {
        r.accept(&content_type);
    }
}

/// Set a quality-weighted `Accept` header.
pub fn accept_range<I, K>(range: I) -> impl FnOnce(&mut Request)
where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
{
    let range: Vec<(String, f64)> = range.into_iter().map(|(k, q)| (k.into(), q)).collect();
    move |r: &mut Request| {
        r.accept_range(range);
    }
}

/// Add HTTP basic authentication.
pub fn basic_auth(
    user: impl Into<String>,
    password: impl Into<String>,
) -> impl FnOnce(&mut Request) {
    let (user, password) = (user.into(), password.into());
    move |r: &mut Request| {
        r.basic_auth(&user, &password);
    }
}

/// Add a bearer token.
pub fn bearer_auth(token: impl Into<String>) -> impl FnOnce(&mut Request) {
    let token = token.into();
    move |r: &mut Request| {
        r.bearer_auth(&token);
    }
}

/// Use a body generator, invoked at every send.
pub fn body(get_body: impl GetBody + 'static) -> impl FnOnce(&mut Request) {
    move |r: &mut Request| {
        r.body(get_body);
    }
}

/// Use a body generator, invoked once and replayed.
pub fn body_cached(get_body: impl GetBody + 'static) -> impl FnOnce(&mut Request) {
    move |r: &mut Request| {
        r.body_cached(get_body);
    }
}

/// Use a one-shot reader as the body.
pub fn body_reader(reader: impl AsyncRead + Send + 'static) -> impl FnOnce(&mut Request) {
    move |r: &mut Request| {
        r.body_reader(reader);
    }
}

/// Use bytes as the body.
pub fn body_bytes(body: impl Into<Bytes>) -> impl FnOnce(&mut Request) {
    let body = body.into();
    move |r: &mut Request| {
        r.body_bytes(body);
    }
}

/// Use a string as the body.
pub fn body_string(body: impl Into<String>) -> impl FnOnce(&mut Request) {
    let body = body.into();
    move |r: &mut Request| {
        r.body_string(body);
    }
}

/// Send URL-encoded form pairs.
pub fn body_form<I, K, V>(form: I) -> impl FnOnce(&mut Request)
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let form: Vec<(String, String)> = form
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    move |r: &mut Request| {
        r.body_form(form);
    }
}

/// Stream a file as the body. The file is opened at send time.
pub fn body_file(path: impl Into<PathBuf>) -> impl FnOnce(&mut Request) {
    let path = path.into();
    move |r: &mut Request| {
        r.body_file(path);
    }
}

/// Set the encoding used by [`body_encode`].
pub fn body_encoding(encoding: Arc<dyn RequestEncoding>) -> impl FnOnce(&mut Request) {
    move |r: &mut Request| {
        r.body_encoding(encoding);
    }
}

/// Encode `value` at send time.
pub fn body_encode<T: Serialize>(
    value: T,
    encoding: Option<Arc<dyn RequestEncoding>>,
) -> impl FnOnce(&mut Request) {
    move |r: &mut Request| {
        r.body_encode(&value, encoding);
    }
}

/// Register a request processor.
pub fn ensure(processor: impl RequestProcessor + 'static) -> impl FnOnce(&mut Request) {
    move |r: &mut Request| {
        r.ensure(processor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Builder;

    #[test]
    fn test_helpers_match_direct_calls() {
        let helpers = Builder::new()
            .request(base_url("http://localhost/api"))
            .request(host_and_port("rabbit", 15672))
            .request(path("vhosts"))
            .request(fragment("f"))
            .request(param("columns", ["name"]));

        let direct = Builder::new().request(|r| {
            r.base_url("http://localhost/api")
                .host_and_port("rabbit", 15672)
                .path("vhosts")
                .fragment("f")
                .param("columns", ["name"]);
        });

        assert_eq!(helpers.url().unwrap(), direct.url().unwrap());
        assert_eq!(
            helpers.url().unwrap().as_str(),
            "http://rabbit:15672/api/vhosts?columns=name#f"
        );
    }

    #[tokio::test]
    async fn test_header_helpers() {
        let request = Builder::get("http://localhost/")
            .request(header("X-Custom", ["one", "two"]))
            .request(bearer_auth("t0k3n"))
            .request(accept("text/plain"))
            .http_request()
            .await
            .unwrap();

        let custom: Vec<_> = request.headers().get_all("x-custom").iter().collect();
        assert_eq!(custom, vec!["one", "two"]);
        assert_eq!(request.headers().get("authorization").unwrap(), "Bearer t0k3n");
        assert_eq!(request.headers().get("accept").unwrap(), "text/plain");
    }
}
