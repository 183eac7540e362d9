//! Error types for the GoSell API client.
//!
//! # Design
//! Every non-2xx response is normalized into a single `HttpError` carrying a
//! best-effort message, the status code and the parsed payload, so callers
//! can branch on status or dig into structured validation detail. Transport
//! and decode failures keep their own variants and are never retried here.

use thiserror::Error;

use crate::client::Payload;

/// Errors returned by `ApiClient` build, parse and send methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    HttpError {
        message: String,
        status: u16,
        payload: Payload,
    },

    /// The body claimed JSON but did not parse, or did not match the
    /// expected shape.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The round trip itself failed (unreachable host, aborted connection).
    #[error("transport failed: {0}")]
    TransportError(String),

    /// The requested method is not one of GET/POST/PUT/PATCH/DELETE.
    #[error("unsupported HTTP method: {0}")]
    InvalidMethod(String),
}

impl ApiError {
    /// HTTP status for application failures, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            ApiError::HttpError { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

