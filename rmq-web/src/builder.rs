//! The request/response builder.

use crate::codec::{Codec, JsonCodec, Slot};
use crate::query::redacted;
use crate::response::BodyHandler;
use crate::{Context, Error, Request, Response, Result};
use http::Method;
use http::header::ACCEPT;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;

/// Client used when none is configured.
static DEFAULT_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Fluent builder for one kind of HTTP exchange.
///
/// Holds a [`Request`] and a [`Response`] description. Nothing goes over
/// the wire until [`Builder::invoke`]; a builder can be invoked any number
/// of times and cloned to derive variants.
///
/// ```rust,no_run
/// use rmq_web::{Builder, Context, Slot, rs};
///
/// # async fn run() -> rmq_web::Result<()> {
/// let overview: Slot<serde_json::Value> = Slot::new();
///
/// Builder::get("http://localhost:15672/api/")
///     .request(|r| {
///         r.path("overview").basic_auth("guest", "guest");
///     })
///     .response(rs::ensure_status_ok())
///     .use_json(&(), overview.clone())
///     .invoke(&Context::background())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    client: Option<reqwest::Client>,
    request: Request,
    response: Response,
}

impl Builder {
    /// An empty builder for a `GET` request.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_method(method: Method, base_url: impl Into<String>) -> Self {
        let mut builder = Self::new();
        builder.request.method(method).base_url(base_url);
        builder
    }

    /// A `GET` builder.
    pub fn get(base_url: impl Into<String>) -> Self {
        Self::with_method(Method::GET, base_url)
    }

    /// A `POST` builder.
    pub fn post(base_url: impl Into<String>) -> Self {
        Self::with_method(Method::POST, base_url)
    }

    /// A `PUT` builder.
    pub fn put(base_url: impl Into<String>) -> Self {
        Self::with_method(Method::PUT, base_url)
    }

    /// A `PATCH` builder.
    pub fn patch(base_url: impl Into<String>) -> Self {
        Self::with_method(Method::PATCH, base_url)
    }

    /// A `DELETE` builder.
    pub fn delete(base_url: impl Into<String>) -> Self {
        Self::with_method(Method::DELETE, base_url)
    }

    /// A `HEAD` builder.
    pub fn head(base_url: impl Into<String>) -> Self {
        Self::with_method(Method::HEAD, base_url)
    }

    /// An `OPTIONS` builder.
    pub fn options(base_url: impl Into<String>) -> Self {
        Self::with_method(Method::OPTIONS, base_url)
    }

    /// A `TRACE` builder.
    pub fn trace(base_url: impl Into<String>) -> Self {
        Self::with_method(Method::TRACE, base_url)
    }

    /// A `CONNECT` builder.
    pub fn connect(base_url: impl Into<String>) -> Self {
        Self::with_method(Method::CONNECT, base_url)
    }

    /// Use `client` instead of the shared default client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Use `codec` to encode the request body and decode the response body.
    pub fn codec<C: Codec + 'static>(mut self, codec: C) -> Self {
        let codec = Arc::new(codec);
        self.request.body_encoding(codec.clone());
        self.response.body_encoding(vec![codec]);
        self.apply_accept();
        self
    }

    /// Encode `req` as the request body and decode the response into `rsp`, both with `codec`.
    pub fn use_codec<Req, Rsp, C>(mut self, req: &Req, rsp: Slot<Rsp>, codec: C) -> Self
    where
        Req: Serialize + ?Sized,
        Rsp: DeserializeOwned + Send + 'static,
        C: Codec + 'static,
    {
        let codec = Arc::new(codec);
        self.request.body_encode(req, Some(codec.clone()));
        self.response.body_decode(rsp, vec![codec]);
        self.apply_accept();
        self
    }

    /// [`Builder::use_codec`] with JSON.
    pub fn use_json<Req, Rsp>(self, req: &Req, rsp: Slot<Rsp>) -> Self
    where
        Req: Serialize + ?Sized,
        Rsp: DeserializeOwned + Send + 'static,
    {
        self.use_codec(req, rsp, JsonCodec)
    }

    /// Configure the request.
    pub fn request(mut self, configure: impl FnOnce(&mut Request)) -> Self {
        configure(&mut self.request);
        self
    }

    /// Configure the response handling.
    ///
    /// Decoders set here also set the request `Accept` header.
    pub fn response(mut self, configure: impl FnOnce(&mut Response)) -> Self {
        configure(&mut self.response);
        self.apply_accept();
        self
    }

    /// The URL the request would be sent to.
    pub fn url(&self) -> Result<Url> {
        self.request.url()
    }

    /// Build the request without sending it.
    pub async fn http_request(&self) -> Result<reqwest::Request> {
        self.request.build().await
    }

    /// Send `request` under `ctx`, then validate and consume the response.
    pub async fn send(&self, ctx: &Context, request: reqwest::Request) -> Result<()> {
        self.dispatch(ctx, request, None).await
    }

    /// Build the request and send it.
    pub async fn invoke(&self, ctx: &Context) -> Result<()> {
        let request = self.request.build().await?;
        self.dispatch(ctx, request, None).await
    }

    /// Like [`Builder::invoke`], with a one-off body handler replacing the configured body mode.
    ///
    /// At most one handler may be passed.
    pub async fn invoke_with(
        &self,
        ctx: &Context,
        handlers: Vec<Arc<dyn BodyHandler>>,
    ) -> Result<()> {
        let request = self.request.build().await?;
        if handlers.len() > 1 {
            return Err(Error::TooManyHandlers);
        }
        self.dispatch(ctx, request, handlers.first()).await
    }

    async fn dispatch(
        &self,
        ctx: &Context,
        request: reqwest::Request,
        handler: Option<&Arc<dyn BodyHandler>>,
    ) -> Result<()> {
        let client = self.client.as_ref().unwrap_or(&*DEFAULT_CLIENT);

        debug!(
            method = %request.method(),
            url = %redacted(request.url()),
            "Sending HTTP request"
        );

        let response = ctx.run(client.execute(request)).await??;

        debug!(status = %response.status(), "Received HTTP response");
        for (name, value) in response.headers() {
            trace!(header = %name, value = ?value, "Response header");
        }

        self.response.process(&response)?;
        ctx.run(self.response.consume(ctx, response, handler)).await?
    }

    fn apply_accept(&mut self) {
        if let Some(values) = self.response.take_accept() {
            self.request.header(ACCEPT.as_str(), values);
        }
    }
}
