//! Response handling: validation, size cap and body consumption.

use crate::body::BodyReader;
use crate::codec::{DecodeTarget, ResponseEncoding, Slot};
use crate::error::BoxError;
use crate::request::sorted_range;
use crate::{Context, Error, Result};
use futures::TryStreamExt;
use futures::future::BoxFuture;
use http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::io::StreamReader;

/// Default cap on the number of response body bytes handed to a handler (1 MiB).
pub const DEFAULT_MAX_RESPONSE_SIZE: i64 = 1 << 20;

/// Inspects a response before its body is read.
///
/// Returning an error stops processing; the body is dropped unread.
pub trait ResponseProcessor: Send + Sync {
    /// Process the response.
    fn process(&self, response: &reqwest::Response) -> std::result::Result<(), BoxError>;
}

impl<F> ResponseProcessor for F
where
    F: Fn(&reqwest::Response) -> std::result::Result<(), BoxError> + Send + Sync,
{
    fn process(&self, response: &reqwest::Response) -> std::result::Result<(), BoxError> {
        self(response)
    }
}

/// Consumes the size-capped response body.
///
/// Implemented for async closures taking a [`Context`] and a [`BodyReader`]:
///
/// ```
/// use rmq_web::{BodyReader, BoxError, Context, Response};
/// use tokio::io::AsyncReadExt;
///
/// let mut response = Response::new();
/// response.body(|_ctx: Context, mut body: BodyReader| async move {
///     let mut text = String::new();
///     body.read_to_string(&mut text).await?;
///     Ok::<(), BoxError>(())
/// });
/// ```
pub trait BodyHandler: Send + Sync {
    /// Handle the body. `ctx` is the context the exchange runs under.
    fn handle(
        &self,
        ctx: Context,
        body: BodyReader,
    ) -> BoxFuture<'static, std::result::Result<(), BoxError>>;
}

impl<F, Fut> BodyHandler for F
where
    F: Fn(Context, BodyReader) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
{
    fn handle(
        &self,
        ctx: Context,
        body: BodyReader,
    ) -> BoxFuture<'static, std::result::Result<(), BoxError>> {
        Box::pin(self(ctx, body))
    }
}

#[derive(Clone, Default)]
enum BodyMode {
    #[default]
    Discard,
    Handler(Arc<dyn BodyHandler>),
    Decode(Arc<dyn DecodeTarget>),
}

impl BodyMode {
    fn name(&self) -> &'static str {
        match self {
            Self::Discard => "discard",
            Self::Handler(_) => "handler",
            Self::Decode(_) => "decode",
        }
    }
}

/// Accumulates how a response is validated and consumed.
///
/// Exactly one body mode is active: discard (the default), a handler, or
/// decoding into a [`Slot`]. Setting a mode replaces the previous one.
#[derive(Clone)]
pub struct Response {
    max_size: i64,
    decoders: Vec<Arc<dyn ResponseEncoding>>,
    processors: Vec<Arc<dyn ResponseProcessor>>,
    mode: BodyMode,
    pending_accept: Option<Vec<String>>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_RESPONSE_SIZE,
            decoders: Vec::new(),
            processors: Vec::new(),
            mode: BodyMode::Discard,
            pending_accept: None,
        }
    }
}

impl Response {
    /// Discard the body, capped at [`DEFAULT_MAX_RESPONSE_SIZE`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of body bytes delivered to the body mode.
    ///
    /// `-1` disables the cap (anything below is treated as `-1`); `0` is
    /// valid when the body is expected to be empty.
    pub fn max_size(&mut self, size: i64) -> &mut Self {
        self.max_size = size.max(-1);
        self
    }

    /// The configured maximum body size.
    pub fn get_max_size(&self) -> i64 {
        self.max_size
    }

    /// Add response processors. They run in order before the body is read.
    pub fn ensure(&mut self, processor: impl ResponseProcessor + 'static) -> &mut Self {
        self.processors.push(Arc::new(processor));
        self
    }

    /// Hand the capped body to `handler`.
    pub fn body(&mut self, handler: impl BodyHandler + 'static) -> &mut Self {
        self.mode = BodyMode::Handler(Arc::new(handler));
        self
    }

    /// Write the capped body to the file at `path`, creating or truncating it.
    pub fn body_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        let path = path.into();
        self.body(move |_ctx: Context, mut body: BodyReader| {
            let path = path.clone();
            async move {
                let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!("could not open file for writing '{}': {e}", path.display()),
                    )
                })?;
                tokio::io::copy(&mut body, &mut file).await?;
                file.flush().await?;
                Ok::<(), BoxError>(())
            }
        })
    }

    /// Copy the capped body into `writer`.
    pub fn body_copy_to<W>(&mut self, writer: Arc<tokio::sync::Mutex<W>>) -> &mut Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.body(move |_ctx: Context, mut body: BodyReader| {
            let writer = Arc::clone(&writer);
            async move {
                let mut writer = writer.lock().await;
                tokio::io::copy(&mut body, &mut *writer).await?;
                writer.flush().await?;
                Ok::<(), BoxError>(())
            }
        })
    }

    /// Set the acceptable response decoders.
    ///
    /// Also derives the request's `Accept` header: a single decoder gives
    /// its content type, several give a quality-weighted list in
    /// registration order.
    pub fn body_encoding(&mut self, decoders: Vec<Arc<dyn ResponseEncoding>>) -> &mut Self {
        self.pending_accept = match decoders.len() {
            0 => None,
            1 => Some(vec![decoders[0].content_type().to_string()]),
            _ => Some(sorted_range(quality_values(&decoders))),
        };
        self.decoders = decoders;
        self
    }

    /// Decode the body into `slot` with the decoder matching the response `Content-Type`.
    pub fn body_decode<T>(
        &mut self,
        slot: Slot<T>,
        decoders: Vec<Arc<dyn ResponseEncoding>>,
    ) -> &mut Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.body_encoding(decoders);
        self.mode = BodyMode::Decode(Arc::new(slot));
        self
    }

    /// The `Accept` values derived by the last [`Response::body_encoding`], if not yet applied.
    pub(crate) fn take_accept(&mut self) -> Option<Vec<String>> {
        self.pending_accept.take()
    }

    /// Run the response processors in order.
    pub(crate) fn process(&self, response: &reqwest::Response) -> Result<()> {
        for processor in &self.processors {
            processor
                .process(response)
                .map_err(Error::ResponseProcessor)?;
        }
        Ok(())
    }

    /// Consume the body with `handler` if given, otherwise with the configured mode.
    pub(crate) async fn consume(
        &self,
        ctx: &Context,
        response: reqwest::Response,
        handler: Option<&Arc<dyn BodyHandler>>,
    ) -> Result<()> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let stream = response.bytes_stream().map_err(io::Error::other);
        let mut body = BodyReader::new(StreamReader::new(stream), self.max_size);

        let mode = match handler {
            Some(handler) => BodyMode::Handler(Arc::clone(handler)),
            None => self.mode.clone(),
        };

        match mode {
            BodyMode::Discard => {
                tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
                Ok(())
            }
            BodyMode::Handler(handler) => handler
                .handle(ctx.clone(), body)
                .await
                .map_err(Error::Handler),
            BodyMode::Decode(target) => {
                let decoder = self.select_decoder(&content_type)?;
                let mut buf = Vec::new();
                body.read_to_end(&mut buf).await?;
                let value = decoder.decode(&buf).map_err(Error::Decode)?;
                target.fill(value).map_err(Error::Decode)
            }
        }
    }

    fn select_decoder(&self, content_type: &str) -> Result<&Arc<dyn ResponseEncoding>> {
        let media_type = content_type
            .split_once(';')
            .map_or(content_type, |(m, _)| m)
            .trim();

        self.decoders
            .iter()
            .find(|d| media_type.is_empty() || d.content_type().eq_ignore_ascii_case(media_type))
            .ok_or_else(|| Error::UnsupportedContentType(media_type.to_string()))
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decoders: Vec<_> = self.decoders.iter().map(|d| d.content_type()).collect();
        f.debug_struct("Response")
            .field("max_size", &self.max_size)
            .field("decoders", &decoders)
            .field("processors", &self.processors.len())
            .field("mode", &self.mode.name())
            .finish()
    }
}

/// Quality values for a decoder list: `1`, then evenly spaced down towards 0.
///
/// Duplicate content types (case-insensitive) are skipped without using up a weight.
fn quality_values(decoders: &[Arc<dyn ResponseEncoding>]) -> Vec<(String, f64)> {
    let step = 1.0 / (decoders.len() + 1) as f64;
    let mut seen = HashSet::new();
    let mut q = 1.0;
    let mut values = Vec::new();

    for decoder in decoders {
        let content_type = decoder.content_type();
        if !seen.insert(content_type.to_ascii_lowercase()) {
            continue;
        }
        values.push((content_type.to_string(), q));
        q -= step;
    }
    values
}
