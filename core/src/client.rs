//! Request builder and response parser for the GoSell REST backend.
//!
//! # Design
//! `ApiClient` holds only a `base_url` and a cookie reader, and carries no
//! mutable state between calls. Each call is split into `build_request`,
//! which produces an `HttpRequest`, and `parse_response`, which consumes an
//! `HttpResponse`. `send` glues the two around a single `Transport` round
//! trip: no retries, no timeout, no deduplication of concurrent calls.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::body::{RequestBody, APPLICATION_JSON};
use crate::cookies::{csrf_token, CookieReader, CSRF_HEADER};
use crate::error::ApiError;
use crate::http::{find_header, Credentials, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Per-call options: method, extra headers and body.
///
/// The method is kept as text so callers may pass any casing; it is
/// uppercased and validated when the request is built.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self::default().method("POST")
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ApiError> {
        self.body = RequestBody::json(value)?;
        Ok(self)
    }
}

/// Successful outcome of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Body declared as JSON and parsed.
    Json(Value),
    /// Any other body, kept verbatim.
    Text(String),
    /// 204 No Content.
    Empty,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Convert to a JSON value: text becomes a JSON string, empty becomes null.
    pub fn into_value(self) -> Value {
        match self {
            Payload::Json(v) => v,
            Payload::Text(s) => Value::String(s),
            Payload::Empty => Value::Null,
        }
    }

    /// Deserialize the payload into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.into_value())
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}

/// Synchronous, stateless client for the GoSell API.
#[derive(Debug, Clone)]
pub struct ApiClient<C> {
    base_url: String,
    cookies: C,
}

impl<C: CookieReader> ApiClient<C> {
    /// `base_url` may be empty, in which case paths are used as-is (the
    /// front end sits behind a proxy).
    pub fn new(base_url: &str, cookies: C) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookies,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cookies(&self) -> &C {
        &self.cookies
    }

    /// Build the request for `path` with the body, CSRF and credential
    /// rules applied.
    pub fn build_request(&self, path: &str, options: RequestOptions) -> Result<HttpRequest, ApiError> {
        let method = match options.method.as_deref() {
            Some(m) => m.parse::<HttpMethod>()?,
            None => HttpMethod::Get,
        };

        let mut headers = options.headers;
        let (body, default_content_type) = options.body.encode()?;
        if let Some(content_type) = default_content_type {
            if find_header(&headers, "content-type").is_none() {
                headers.push(("Content-Type".to_string(), content_type.to_string()));
            }
        }

        let csrf = csrf_token(&self.cookies);
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case(CSRF_HEADER));
        if !csrf.is_empty() {
            headers.push((CSRF_HEADER.to_string(), csrf));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!(
            %method,
            %url,
            csrf = find_header(&headers, CSRF_HEADER).is_some(),
            "request built"
        );

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
            credentials: Credentials::Include,
        })
    }

    /// Interpret a response: 204 is empty, the content type picks JSON or
    /// text, and any non-2xx status becomes `ApiError::HttpError`.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Payload, ApiError> {
        if response.status == 204 {
            return Ok(Payload::Empty);
        }

        let is_json = response
            .header("content-type")
            .is_some_and(|ct| ct.contains(APPLICATION_JSON));
        let success = response.is_success();
        let status = response.status;

        let payload = if is_json {
            let value = serde_json::from_str::<Value>(&response.body)
                .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
            Payload::Json(value)
        } else {
            Payload::Text(response.body)
        };

        if !success {
            let message = error_message(&payload, status);
            warn!(status, %message, "request failed");
            return Err(ApiError::HttpError {
                message,
                status,
                payload,
            });
        }

        debug!(status, "response parsed");
        Ok(payload)
    }

    /// Build, execute once through `transport`, and parse.
    pub fn send<T: Transport + ?Sized>(
        &self,
        transport: &T,
        path: &str,
        options: RequestOptions,
    ) -> Result<Payload, ApiError> {
        let request = self.build_request(path, options)?;
        let response = transport.execute(request)?;
        self.parse_response(response)
    }
}

/// Best-effort human message for a failed response.
fn error_message(payload: &Payload, status: u16) -> String {
    let nested = |v: &Value| {
        v.pointer("/error/message")
            .and_then(message_text)
            .or_else(|| v.get("message").and_then(message_text))
    };
    match payload {
        Payload::Text(text) => text.clone(),
        Payload::Json(Value::String(text)) => text.clone(),
        Payload::Json(value) => nested(value).unwrap_or_else(|| fallback_message(status)),
        Payload::Empty => fallback_message(status),
    }
}

/// A message field counts when it is a non-empty string, a non-zero number
/// or `true`; numbers and booleans are rendered as text.
fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn fallback_message(status: u16) -> String {
    format!("Request failed ({status})")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::body::MultipartForm;
    use crate::cookies::CSRF_COOKIE;
    use crate::http::WireBody;

    fn no_cookies() -> HashMap<String, String> {
        HashMap::new()
    }

    fn with_csrf() -> HashMap<String, String> {
        HashMap::from([(CSRF_COOKIE.to_string(), "tok-123".to_string())])
    }

    type Reader = fn() -> HashMap<String, String>;

    fn client() -> ApiClient<Reader> {
        ApiClient::new("http://localhost:5000", no_cookies as Reader)
    }

    fn csrf_client() -> ApiClient<Reader> {
        ApiClient::new("http://localhost:5000", with_csrf as Reader)
    }

    fn response(status: u16, content_type: Option<&str>, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: content_type
                .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
                .unwrap_or_default(),
            body: body.to_string(),
        }
    }

    #[test]
    fn default_method_is_get_without_body() {
        let req = client().build_request("/api/auth/me", RequestOptions::get()).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:5000/api/auth/me");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
        assert_eq!(req.credentials, Credentials::Include);
    }

    #[test]
    fn method_is_uppercased() {
        let req = client()
            .build_request("/x", RequestOptions::default().method("patch"))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.method.to_string(), "PATCH");
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = client()
            .build_request("/x", RequestOptions::default().method("connect"))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidMethod(_)));
    }

    #[test]
    fn structured_body_is_json_encoded() {
        let options = RequestOptions::post()
            .json(&json!({"email": "a@b.c", "password": "pw"}))
            .unwrap();
        let req = client().build_request("/api/auth/login", options).unwrap();
        assert_eq!(req.header("content-type"), Some("application/json"));
        let Some(WireBody::Text(text)) = req.body else {
            panic!("expected text body");
        };
        let sent: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(sent, json!({"email": "a@b.c", "password": "pw"}));
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let options = RequestOptions::post()
            .header("content-type", "application/merge-patch+json")
            .body(json!({"nom": "Lampe"}));
        let req = client().build_request("/api/products/1", options).unwrap();
        let content_types: Vec<_> = req
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
        assert_eq!(content_types[0].1, "application/merge-patch+json");
    }

    #[test]
    fn string_body_is_sent_verbatim() {
        let options = RequestOptions::post().body(r#"{"email":"x"}"#);
        let req = client().build_request("/api/auth/login", options).unwrap();
        assert_eq!(req.body, Some(WireBody::Text(r#"{"email":"x"}"#.to_string())));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn binary_and_multipart_have_no_injected_content_type() {
        let req = client()
            .build_request("/upload", RequestOptions::post().body(vec![1u8, 2, 3]))
            .unwrap();
        assert_eq!(req.body, Some(WireBody::Binary(vec![1, 2, 3])));
        assert!(req.header("content-type").is_none());

        let form = MultipartForm::new().text("nom", "Lampe");
        let req = client()
            .build_request("/upload", RequestOptions::post().body(form))
            .unwrap();
        assert!(matches!(req.body, Some(WireBody::Multipart(_))));
        assert!(req.header("content-type").is_none());
    }

    #[test]
    fn csrf_header_on_get_and_post() {
        let c = csrf_client();
        let get = c.build_request("/api/products", RequestOptions::get()).unwrap();
        assert_eq!(get.header(CSRF_HEADER), Some("tok-123"));

        let post = c.build_request("/api/auth/logout", RequestOptions::post()).unwrap();
        assert_eq!(post.header("x-csrf-token"), Some("tok-123"));
    }

    #[test]
    fn csrf_header_replaces_caller_value() {
        let options = RequestOptions::get().header("x-csrf-token", "stale");
        let req = csrf_client().build_request("/x", options).unwrap();
        let values: Vec<_> = req
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(CSRF_HEADER))
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(values, vec!["tok-123"]);
    }

    #[test]
    fn no_csrf_header_without_cookie() {
        let req = client().build_request("/x", RequestOptions::post()).unwrap();
        assert!(req.header(CSRF_HEADER).is_none());
    }

    #[test]
    fn cookie_is_reread_on_every_call() {
        use std::cell::Cell;
        let counter = Cell::new(0);
        let reader = || {
            counter.set(counter.get() + 1);
            HashMap::from([(CSRF_COOKIE.to_string(), format!("tok-{}", counter.get()))])
        };
        let c = ApiClient::new("", reader);
        let first = c.build_request("/a", RequestOptions::get()).unwrap();
        let second = c.build_request("/a", RequestOptions::get()).unwrap();
        assert_eq!(first.header(CSRF_HEADER), Some("tok-1"));
        assert_eq!(second.header(CSRF_HEADER), Some("tok-2"));
        assert_eq!(first.url, "/a");
    }

    #[test]
    fn parse_no_content() {
        let payload = client().parse_response(response(204, None, "")).unwrap();
        assert_eq!(payload, Payload::Empty);
    }

    #[test]
    fn parse_no_content_ignores_bogus_json_header() {
        let payload = client()
            .parse_response(response(204, Some("application/json"), "not json"))
            .unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn parse_json_success() {
        let payload = client()
            .parse_response(response(200, Some("application/json; charset=utf-8"), r#"{"a":1}"#))
            .unwrap();
        assert_eq!(payload, Payload::Json(json!({"a": 1})));
    }

    #[test]
    fn parse_text_success() {
        let payload = client()
            .parse_response(response(200, Some("text/plain"), r#"{"a":1}"#))
            .unwrap();
        assert_eq!(payload, Payload::Text(r#"{"a":1}"#.to_string()));
    }

    #[test]
    fn parse_missing_content_type_is_text() {
        let payload = client().parse_response(response(200, None, "ok")).unwrap();
        assert_eq!(payload, Payload::Text("ok".to_string()));
    }

    #[test]
    fn parse_bad_json_is_decode_error() {
        let err = client()
            .parse_response(response(200, Some("application/json"), "{nope"))
            .unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn parse_nested_error_message() {
        let err = client()
            .parse_response(response(
                404,
                Some("application/json"),
                r#"{"error":{"message":"not found"}}"#,
            ))
            .unwrap_err();
        assert_eq!(err.to_string(), "not found");
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.payload(),
            Some(&Payload::Json(json!({"error": {"message": "not found"}})))
        );
    }

    #[test]
    fn parse_top_level_message() {
        let err = client()
            .parse_response(response(
                422,
                Some("application/json"),
                r#"{"message":"invalid","fields":{"email":"required"}}"#,
            ))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid");
        let fields = err.payload().and_then(Payload::as_json).unwrap();
        assert_eq!(fields["fields"]["email"], "required");
    }

    #[test]
    fn nested_message_wins_over_top_level() {
        let err = client()
            .parse_response(response(
                401,
                Some("application/json"),
                r#"{"error":{"message":"expired"},"message":"other"}"#,
            ))
            .unwrap_err();
        assert_eq!(err.to_string(), "expired");
    }

    #[test]
    fn parse_text_error_uses_body() {
        let err = client()
            .parse_response(response(500, Some("text/plain"), "boom"))
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn parse_json_string_error_uses_string() {
        let err = client()
            .parse_response(response(403, Some("application/json"), r#""forbidden""#))
            .unwrap_err();
        assert_eq!(err.to_string(), "forbidden");
    }

    #[test]
    fn parse_error_without_message_falls_back() {
        let err = client()
            .parse_response(response(400, Some("application/json"), "{}"))
            .unwrap_err();
        assert!(err.to_string().contains("400"));
        assert_eq!(err.payload(), Some(&Payload::Json(json!({}))));
    }

    #[test]
    fn scalar_message_fields_are_rendered() {
        let err = client()
            .parse_response(response(409, Some("application/json"), r#"{"message":42}"#))
            .unwrap_err();
        assert_eq!(err.to_string(), "42");

        let err = client()
            .parse_response(response(422, Some("application/json"), r#"{"error":{"message":true}}"#))
            .unwrap_err();
        assert_eq!(err.to_string(), "true");

        // Falsy values fall through to the next field, then to the fallback.
        let err = client()
            .parse_response(response(
                400,
                Some("application/json"),
                r#"{"error":{"message":0},"message":"bad input"}"#,
            ))
            .unwrap_err();
        assert_eq!(err.to_string(), "bad input");

        let err = client()
            .parse_response(response(400, Some("application/json"), r#"{"message":false}"#))
            .unwrap_err();
        assert_eq!(err.to_string(), "Request failed (400)");
    }

    #[test]
    fn payload_decode() {
        #[derive(serde::Deserialize)]
        struct A {
            a: u32,
        }
        let a: A = Payload::Json(json!({"a": 7})).decode().unwrap();
        assert_eq!(a.a, 7);
        assert!(Payload::Text("x".into()).decode::<A>().is_err());
        assert_eq!(Payload::Empty.into_value(), Value::Null);
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let c = ApiClient::new("http://localhost:5000/", no_cookies);
        let req = c.build_request("/api/auth/me", RequestOptions::get()).unwrap();
        assert_eq!(req.url, "http://localhost:5000/api/auth/me");
    }
}
