//! # rmq-web
//!
//! A fluent HTTP request/response builder on top of `reqwest`.
//!
//! A [`Builder`] describes one kind of exchange: how to build the request
//! (method, URL parts, headers, a lazily resolved body, request processors)
//! and how to handle the response (status and header checks, a size cap, and
//! one way to consume the body). Builders are cheap to clone and can be
//! invoked any number of times.
//!
//! ## Features
//!
//! - **Lazy bodies**: generators, cached generators, readers, files and
//!   values encoded at send time
//! - **Processors**: validate or adjust the request before sending and the
//!   response before its body is read
//! - **Size cap**: the response body is cut at [`DEFAULT_MAX_RESPONSE_SIZE`]
//!   unless configured otherwise
//! - **Codecs**: JSON and form encodings with content negotiation
//! - **Cancellation**: every exchange runs under a [`Context`] with an
//!   optional deadline
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rmq_web::{Builder, Context, Slot, rs};
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Debug, Deserialize)]
//! struct WhoAmI {
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let me: Slot<WhoAmI> = Slot::new();
//!
//!     Builder::get("http://localhost:15672/api/")
//!         .request(|r| {
//!             r.path("whoami").basic_auth("guest", "guest");
//!         })
//!         .response(rs::ensure_status_ok())
//!         .use_json(&(), me.clone())
//!         .invoke(&Context::background().with_timeout(Duration::from_secs(5)))
//!         .await?;
//!
//!     println!("{:?}", me.take());
//!     Ok(())
//! }
//! ```

mod body;
mod builder;
mod codec;
mod context;
mod error;
mod query;
mod request;
mod response;

pub mod rq;
pub mod rs;

pub use body::{BodyReader, BodyStream, CachedBody, GetBody};
pub use builder::Builder;
pub use codec::{
    APPLICATION_FORM, APPLICATION_JSON, Codec, Encoding, FormCodec, JsonCodec, RequestEncoding,
    ResponseEncoding, Slot,
};
pub use context::Context;
pub use error::{BoxError, Error, ErrorKind, Result, SharedError};
pub use query::{Query, path_escape, query_escape, redacted};
pub use request::{Request, RequestProcessor};
pub use response::{BodyHandler, DEFAULT_MAX_RESPONSE_SIZE, Response, ResponseProcessor};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Builder, Context, Error, JsonCodec, Query, Request, Response, Result, Slot, rq, rs,
    };
}
