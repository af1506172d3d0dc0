//! Response configuration closures for [`Builder::response`](crate::Builder::response),
//! including status-code checks.

use crate::body::BodyReader;
use crate::codec::{ResponseEncoding, Slot};
use crate::error::BoxError;
use crate::response::{BodyHandler, ResponseProcessor};
use crate::{Context, Response};
use http::StatusCode;
use serde::de::DeserializeOwned;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWrite;

pub fn max_size(size: i64) -> impl FnOnce(&mut Response) {
    move |r: &mut Response| {
        r.max_size(size);
    }
}

pub fn ensure(processor: impl ResponseProcessor + 'static) -> impl FnOnce(&mut Response) {
    move |r: &mut Response| {
        r.ensure(processor);
    }
}

pub fn body(handler: impl BodyHandler + 'static) -> impl FnOnce(&mut Response) {
    move |r: &mut Response| {
        r.body(handler);
    }
}

pub fn body_file(path: impl Into<PathBuf>) -> impl FnOnce(&mut Response) {
    let path = path.into();
    move |r: &mut Response| {
        r.body_file(path);
    }
}

pub fn body_copy_to<W>(writer: Arc<tokio::sync::Mutex<W>>) -> impl FnOnce(&mut Response)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    move |r: &mut Response| {
        r.body_copy_to(writer);
    }
}

pub fn body_encoding(decoders: Vec<Arc<dyn ResponseEncoding>>) -> impl FnOnce(&mut Response) {
    move |r: &mut Response| {
        r.body_encoding(decoders);
    }
}

pub fn body_decode<T>(
    slot: Slot<T>,
    decoders: Vec<Arc<dyn ResponseEncoding>>,
) -> impl FnOnce(&mut Response)
where
    T: DeserializeOwned + Send + 'static,
{
    move |r: &mut Response| {
        r.body_decode(slot, decoders);
    }
}

/// Require one of `expected` as the response status.
pub fn ensure_status(expected: impl IntoIterator<Item = StatusCode>) -> impl FnOnce(&mut Response) {
    let expected: Vec<StatusCode> = expected.into_iter().collect();
    ensure(move |rsp: &reqwest::Response| -> Result<(), BoxError> {
        if expected.contains(&rsp.status()) {
            return Ok(());
        }
        let codes: Vec<String> = expected.iter().map(|s| s.as_u16().to_string()).collect();
        Err(format!(
            "expected one of [{}] status codes but got {}",
            codes.join(" "),
            rsp.status()
        )
        .into())
    })
}

fn ensure_exact(expected: StatusCode) -> impl FnOnce(&mut Response) {
    ensure(move |rsp: &reqwest::Response| -> Result<(), BoxError> {
        if rsp.status() == expected {
            Ok(())
        } else {
            Err(format!("expected {expected} status, got {}", rsp.status()).into())
        }
    })
}

fn ensure_range(range: Range<u16>) -> impl FnOnce(&mut Response) {
    ensure(move |rsp: &reqwest::Response| -> Result<(), BoxError> {
        if range.contains(&rsp.status().as_u16()) {
            Ok(())
        } else {
            Err(format!(
                "expected {}-{} status, got {}",
                range.start,
                range.end - 1,
                rsp.status()
            )
            .into())
        }
    })
}

/// Require a 1xx status.
pub fn ensure_status_informational() -> impl FnOnce(&mut Response) {
    ensure_range(100..200)
}

/// Require `200 OK`.
pub fn ensure_status_ok() -> impl FnOnce(&mut Response) {
    ensure_exact(StatusCode::OK)
}

/// Require `201 Created`.
pub fn ensure_status_created() -> impl FnOnce(&mut Response) {
    ensure_exact(StatusCode::CREATED)
}

/// Require `202 Accepted`.
pub fn ensure_status_accepted() -> impl FnOnce(&mut Response) {
    ensure_exact(StatusCode::ACCEPTED)
}

/// Require a 2xx status.
pub fn ensure_status_success() -> impl FnOnce(&mut Response) {
    ensure_range(200..300)
}

/// Require a 3xx status.
pub fn ensure_status_redirect() -> impl FnOnce(&mut Response) {
    ensure_range(300..400)
}

/// Require a 4xx status.
pub fn ensure_status_client_error() -> impl FnOnce(&mut Response) {
    ensure_range(400..500)
}

/// Require a 5xx status.
pub fn ensure_status_server_error() -> impl FnOnce(&mut Response) {
    ensure_range(500..600)
}

/// A body handler that reads the capped body into `slot` as text.
pub fn body_text(slot: Slot<String>) -> impl FnOnce(&mut Response) {
    body(move |_ctx: Context, mut body: BodyReader| {
        let slot = slot.clone();
        async move {
            use tokio::io::AsyncReadExt;
            let mut text = String::new();
            body.read_to_string(&mut text).await?;
            slot.set(text);
            Ok::<(), BoxError>(())
        }
    })
}
