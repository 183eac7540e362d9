//! Synchronous API client core for the GoSell back office.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values for a JSON
//! REST backend that authenticates through a cookie session and expects the
//! CSRF cookie echoed in `X-CSRF-TOKEN` on every call. The round trip itself
//! goes through a `Transport`, so the core stays deterministic and testable.
//!
//! # Design
//! - `ApiClient` is stateless: a `base_url` plus an injected `CookieReader`.
//! - `RequestBody` is a tagged union decided once per call; each kind has
//!   its own encoding and `Content-Type` rule.
//! - Responses are JSON or text based purely on the declared content type;
//!   204 is never parsed. Every non-2xx status becomes one `HttpError` shape.
//! - Typed endpoints (`api`) follow the `build_*` / `parse_*` split.

pub mod api;
pub mod body;
pub mod client;
pub mod config;
pub mod cookies;
pub mod error;
pub mod format;
pub mod http;
pub mod query;
pub mod transport;
pub mod types;

pub use body::{MultipartForm, RequestBody};
pub use client::{ApiClient, Payload, RequestOptions};
pub use config::ClientConfig;
pub use cookies::{CookieReader, CookieString, SharedCookieJar, CSRF_COOKIE, CSRF_HEADER};
pub use error::ApiError;
pub use http::{Credentials, HttpMethod, HttpRequest, HttpResponse, WireBody};
pub use query::{OrderBy, OrderDir, PriceField, ProductQuery};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{DashboardSummary, LoginResponse, MeResponse, Product, User};
