//! POST body-echo responder
//!
//! Reads the request body, writes the decoded text to the server's output
//! followed by a newline, and acknowledges with a fixed plaintext response.
//! Protocol errors (bad framing, bad encoding) answer 400 and never outlive
//! the exchange they occurred on.

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{HeaderMap, Request, Response};

use crate::http;
use crate::logger;

/// Why a POST body could not be accepted
#[derive(Debug, PartialEq, Eq)]
pub enum BodyError {
    MissingContentLength,
    InvalidContentLength(String),
    InvalidUtf8,
}

impl std::fmt::Display for BodyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingContentLength => write!(f, "missing Content-Length header"),
            Self::InvalidContentLength(value) => {
                write!(f, "invalid Content-Length value: '{value}'")
            }
            Self::InvalidUtf8 => write!(f, "request body is not valid UTF-8"),
        }
    }
}

/// Parse and validate the `Content-Length` header.
///
/// The header is required for POST: a request without one, or with a
/// non-numeric value, is a protocol error answered with 400 rather than
/// served.
pub fn parse_content_length(headers: &HeaderMap) -> Result<usize, BodyError> {
    let value = headers
        .get(CONTENT_LENGTH)
        .ok_or(BodyError::MissingContentLength)?;
    let text = value
        .to_str()
        .map_err(|_| BodyError::InvalidContentLength("<non-ASCII>".to_string()))?;
    text.parse::<usize>()
        .map_err(|_| BodyError::InvalidContentLength(text.to_string()))
}

/// Decode collected body bytes as UTF-8 text
pub fn decode_body(bytes: &[u8]) -> Result<&str, BodyError> {
    std::str::from_utf8(bytes).map_err(|_| BodyError::InvalidUtf8)
}

/// Handle a POST request: log the body, acknowledge with 200.
pub async fn handle_post<B>(req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let content_length = match parse_content_length(req.headers()) {
        Ok(n) => n,
        Err(e) => {
            logger::log_warning(&format!("Rejected POST: {e}"));
            return http::build_400_response(&e.to_string());
        }
    };

    let collected = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            logger::log_error(&format!("Failed to read POST body: {e}"));
            return http::build_400_response("failed to read request body");
        }
    };

    // hyper frames the body to Content-Length; a shorter read means the
    // client closed early
    let body = &collected[..content_length.min(collected.len())];

    match decode_body(body) {
        Ok(text) => {
            logger::log_post_body(text);
            http::build_post_ack_response()
        }
        Err(e) => {
            logger::log_warning(&format!("Rejected POST: {e}"));
            http::build_400_response(&e.to_string())
        }
    }
}
