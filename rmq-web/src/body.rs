//! Request body sources and the capped response body reader.

use crate::codec::RequestEncoding;
use crate::error::{BoxError, SharedError};
use crate::{Error, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll, ready};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf, Take};

/// A readable request body stream.
pub type BodyStream = Pin<Box<dyn AsyncRead + Send>>;

/// Produces a request body stream.
///
/// May be called more than once for one logical request, for example when a
/// cached body is replayed.
pub trait GetBody: Send + Sync {
    /// Open a fresh body stream.
    fn get_body(&self) -> std::result::Result<BodyStream, BoxError>;
}

impl<F> GetBody for F
where
    F: Fn() -> std::result::Result<BodyStream, BoxError> + Send + Sync,
{
    fn get_body(&self) -> std::result::Result<BodyStream, BoxError> {
        self()
    }
}

/// Wraps a [`GetBody`] so the inner source runs at most once.
///
/// The first call reads the whole body into memory; that result, bytes or
/// error, is handed to every later caller. Keep cached bodies small.
pub struct CachedBody {
    inner: Arc<dyn GetBody>,
    state: tokio::sync::Mutex<Option<std::result::Result<Bytes, SharedError>>>,
}

impl CachedBody {
    /// Cache the body produced by `inner`.
    pub fn new(inner: impl GetBody + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            state: tokio::sync::Mutex::new(None),
        }
    }

    /// The cached bytes, loading them on first use.
    pub async fn bytes(&self) -> std::result::Result<Bytes, SharedError> {
        let mut state = self.state.lock().await;
        if let Some(result) = state.as_ref() {
            return result.clone();
        }
        let result = self.load().await;
        *state = Some(result.clone());
        result
    }

    async fn load(&self) -> std::result::Result<Bytes, SharedError> {
        let mut stream = self.inner.get_body().map_err(SharedError::from)?;
        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| Arc::new(e) as SharedError)?;
        Ok(Bytes::from(buf))
    }
}

/// What a request body resolves to at send time.
pub(crate) enum Payload {
    /// No body at all.
    Empty,
    /// In-memory body; the transport can replay it on redirects.
    Bytes(Bytes),
    /// Streaming body; sent once.
    Stream(BodyStream),
}

/// Where a request body comes from. Nothing is read until [`BodySource::open`].
#[derive(Clone, Default)]
pub(crate) enum BodySource {
    #[default]
    Empty,
    Bytes(Bytes),
    File(PathBuf),
    Encode(Arc<Value>),
    Invalid(SharedError),
    Generator(Arc<dyn GetBody>),
    Cached(Arc<CachedBody>),
    Reader(Arc<Mutex<Option<BodyStream>>>),
}

impl BodySource {
    pub(crate) fn reader(reader: impl AsyncRead + Send + 'static) -> Self {
        let stream: BodyStream = Box::pin(reader);
        Self::Reader(Arc::new(Mutex::new(Some(stream))))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Bytes(_) => "bytes",
            Self::File(_) => "file",
            Self::Encode(_) => "encode",
            Self::Invalid(_) => "invalid",
            Self::Generator(_) => "generator",
            Self::Cached(_) => "cached",
            Self::Reader(_) => "reader",
        }
    }

    /// Resolve the body. `encoding` is the request encoding active at send time.
    pub(crate) async fn open(
        &self,
        encoding: Option<&Arc<dyn RequestEncoding>>,
    ) -> Result<Payload> {
        match self {
            Self::Empty => Ok(Payload::Empty),
            Self::Bytes(bytes) => Ok(Payload::Bytes(bytes.clone())),
            Self::File(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!("could not open file for reading '{}': {e}", path.display()),
                    )
                })?;
                Ok(Payload::Stream(Box::pin(file)))
            }
            Self::Encode(value) => {
                let encoding = encoding.ok_or(Error::NoEncoder)?;
                let bytes = encoding
                    .encode(value)
                    .map_err(|e| Error::Encode(SharedError::from(e)))?;
                Ok(Payload::Bytes(bytes))
            }
            Self::Invalid(e) => Err(Error::Encode(Arc::clone(e))),
            Self::Generator(get_body) => get_body
                .get_body()
                .map(Payload::Stream)
                .map_err(|e| Error::Body(SharedError::from(e))),
            Self::Cached(cached) => cached.bytes().await.map(Payload::Bytes).map_err(Error::Body),
            Self::Reader(reader) => reader
                .lock()
                .take()
                .map(Payload::Stream)
                .ok_or(Error::BodyConsumed),
        }
    }
}

/// Response body stream limited to the configured maximum size.
///
/// Reading stops silently at the cap. [`BodyReader::truncated`] tells
/// whether the server sent more than that; the extra bytes are never
/// delivered.
pub struct BodyReader {
    inner: Take<Pin<Box<dyn AsyncRead + Send>>>,
    capped: bool,
    probed: bool,
    truncated: bool,
}

impl BodyReader {
    /// Wrap `inner`, delivering at most `max_size` bytes. A negative size disables the cap.
    pub fn new(inner: impl AsyncRead + Send + 'static, max_size: i64) -> Self {
        let boxed: Pin<Box<dyn AsyncRead + Send>> = Box::pin(inner);
        let (limit, capped) = match u64::try_from(max_size) {
            Ok(limit) => (limit, true),
            Err(_) => (u64::MAX, false),
        };
        Self {
            inner: boxed.take(limit),
            capped,
            probed: false,
            truncated: false,
        }
    }

    /// True once the cap was reached with more bytes left on the wire.
    ///
    /// Only meaningful after the reader returned end-of-stream.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl AsyncRead for BodyReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        let at_cap = buf.filled().len() == before
            && buf.remaining() > 0
            && this.capped
            && !this.probed
            && this.inner.limit() == 0;
        if at_cap {
            // look one byte past the cap; it is dropped, never handed out
            let mut probe = [0u8; 1];
            let mut probe_buf = ReadBuf::new(&mut probe);
            ready!(this.inner.get_mut().as_mut().poll_read(cx, &mut probe_buf))?;
            this.probed = true;
            this.truncated = !probe_buf.filled().is_empty();
        }
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_source(calls: Arc<AtomicUsize>, body: &'static str) -> impl GetBody {
        move || -> std::result::Result<BodyStream, BoxError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Box::pin(body.as_bytes()))
        }
    }

    async fn read_all(payload: Payload) -> Vec<u8> {
        match payload {
            Payload::Empty => Vec::new(),
            Payload::Bytes(bytes) => bytes.to_vec(),
            Payload::Stream(mut stream) => {
                let mut buf = Vec::new();
                stream.read_to_end(&mut buf).await.unwrap();
                buf
            }
        }
    }

    #[tokio::test]
    async fn test_cached_body_calls_source_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = Arc::new(CachedBody::new(counting_source(calls.clone(), "payload")));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cached = cached.clone();
                tokio::spawn(async move { cached.bytes().await.unwrap() })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            assert_eq!(&result.unwrap()[..], b"payload");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_body_replays_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cached = CachedBody::new(move || -> std::result::Result<BodyStream, BoxError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("generator exploded".into())
        });

        let first = cached.bytes().await.unwrap_err();
        let second = cached.bytes().await.unwrap_err();

        assert_eq!(first.to_string(), "generator exploded");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_source_is_no_body() {
        let payload = BodySource::Empty.open(None).await.unwrap();
        assert!(matches!(payload, Payload::Empty));
    }

    #[tokio::test]
    async fn test_reader_is_single_use() {
        let source = BodySource::reader(&b"once"[..]);

        let first = source.open(None).await.unwrap();
        assert_eq!(read_all(first).await, b"once");

        let second = source.open(None).await;
        assert!(matches!(second, Err(Error::BodyConsumed)));
    }

    #[tokio::test]
    async fn test_encode_without_encoding() {
        let source = BodySource::Encode(Arc::new(serde_json::json!({"a": 1})));
        assert!(matches!(source.open(None).await, Err(Error::NoEncoder)));
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let source = BodySource::File(PathBuf::from("/definitely/not/here.json"));
        let err = source.open(None).await.err().unwrap();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[tokio::test]
    async fn test_body_reader_caps_and_flags_truncation() {
        let mut reader = BodyReader::new(&b"0123456789"[..], 4);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, b"0123");
        assert!(reader.truncated());
    }

    #[tokio::test]
    async fn test_body_reader_exact_size_is_not_truncated() {
        let mut reader = BodyReader::new(&b"0123"[..], 4);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, b"0123");
        assert!(!reader.truncated());
    }

    #[tokio::test]
    async fn test_body_reader_unlimited() {
        let mut reader = BodyReader::new(&b"0123456789"[..], -1);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(out.len(), 10);
        assert!(!reader.truncated());
    }
}
