//! CLI command implementations.

pub mod check;
pub mod config;
pub mod generate;
pub mod get;
pub mod list;

use crate::error::CliResult;
use bytes::Bytes;
use rmq_api::{ApiError, Client, Config, print_json};
use rmq_web::Context;
use std::io::{self, Write};

pub(crate) fn client(config: Config, ctx: Context) -> Client {
    Client::new(config).with_context(ctx)
}

/// Print a response body to stdout.
pub(crate) fn emit(result: rmq_api::Result<Bytes>, pretty: bool) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    emit_to(&mut out, result, pretty)
}

/// Print a response body. Error responses are printed too, then returned.
pub(crate) fn emit_to<W: Write>(
    out: &mut W,
    result: rmq_api::Result<Bytes>,
    pretty: bool,
) -> CliResult<()> {
    match result {
        Ok(body) => Ok(print_json(out, &body, pretty)?),
        Err(ApiError::Status { status, url, body }) => {
            // error pages are not always JSON
            if !(pretty && print_json(out, &body, true).is_ok()) {
                print_json(out, &body, false)?;
            }
            Err(ApiError::Status { status, url, body }.into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use http::StatusCode;

    fn status_error(body: &'static str) -> rmq_api::Result<Bytes> {
        Err(ApiError::Status {
            status: StatusCode::NOT_FOUND,
            url: "http://localhost:15672/api/queues/%2F/x".to_string(),
            body: Bytes::from_static(body.as_bytes()),
        })
    }

    #[test]
    fn test_success_is_printed() {
        let mut out = Vec::new();
        emit_to(&mut out, Ok(Bytes::from_static(b"[1]")), true).unwrap();
        assert_eq!(out, b"[\n  1\n]\n");
    }

    #[test]
    fn test_error_body_is_printed_before_failing() {
        let mut out = Vec::new();
        let err = emit_to(&mut out, status_error(r#"{"error":"not_found"}"#), true).unwrap_err();

        assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"error\": \"not_found\"\n}\n");
        assert!(matches!(err, CliError::Api(_)));
        assert_eq!(
            err.to_string(),
            "request failed: 404 Not Found ( url: http://localhost:15672/api/queues/%2F/x )"
        );
    }

    #[test]
    fn test_non_json_error_body_is_printed_raw() {
        let mut out = Vec::new();
        assert!(emit_to(&mut out, status_error("<html>"), true).is_err());
        assert_eq!(out, b"<html>\n");
    }
}
