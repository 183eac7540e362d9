//! The I/O seam between `ApiClient` and an HTTP stack.
//!
//! `ApiClient::send` hands a built `HttpRequest` to a `Transport` and parses
//! whatever comes back. Any closure `Fn(HttpRequest) -> Result<HttpResponse,
//! ApiError>` is a transport, which is what the unit tests use. With the
//! `ureq` feature (on by default) `UreqTransport` performs real blocking
//! HTTP and keeps the session cookies in a `SharedCookieJar`.

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round trip.
///
/// Implementations report unreachable hosts and broken connections as
/// `ApiError::TransportError` and must hand back every status, 4xx and 5xx
/// included, as an `HttpResponse`.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<F> Transport for F
where
    F: Fn(HttpRequest) -> Result<HttpResponse, ApiError>,
{
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::native::UreqTransport;

#[cfg(feature = "ureq")]
mod native {
    use std::fmt;

    use tracing::debug;
    use ureq::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};

    use super::Transport;
    use crate::body::MultipartForm;
    use crate::cookies::SharedCookieJar;
    use crate::error::ApiError;
    use crate::http::{find_header, Credentials, HttpRequest, HttpResponse, WireBody};

    /// Blocking transport backed by a ureq agent.
    ///
    /// Cookies set by the server land in the jar and are sent back on every
    /// request, which is what `Credentials::Include` asks for. The same jar
    /// is the natural cookie reader for the `ApiClient`.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
        jar: SharedCookieJar,
    }

    impl fmt::Debug for UreqTransport {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("UreqTransport").field("jar", &self.jar).finish_non_exhaustive()
        }
    }

    impl UreqTransport {
        pub fn new(jar: SharedCookieJar) -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent, jar }
        }

        pub fn jar(&self) -> &SharedCookieJar {
            &self.jar
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new(SharedCookieJar::new())
        }
    }

    impl Transport for UreqTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            let mut builder = ureq::http::Request::builder()
                .method(request.method.as_str())
                .uri(request.url.as_str());
            for (name, value) in wire_headers(&request, &self.jar) {
                builder = builder.header(name, value);
            }

            let result = match request.body {
                None => {
                    let req = builder.body(()).map_err(build_error)?;
                    self.agent.run(req)
                }
                Some(WireBody::Text(text)) => {
                    let req = builder.body(text).map_err(build_error)?;
                    self.agent.run(req)
                }
                Some(WireBody::Binary(bytes)) => {
                    let req = builder.body(bytes).map_err(build_error)?;
                    self.agent.run(req)
                }
                Some(WireBody::Multipart(form)) => {
                    let boundary = format!("gosell-{}", uuid::Uuid::new_v4().simple());
                    let req = builder
                        .header(CONTENT_TYPE, MultipartForm::content_type(&boundary))
                        .body(form.encode(&boundary))
                        .map_err(build_error)?;
                    self.agent.run(req)
                }
            };
            let mut response = result.map_err(|e| ApiError::TransportError(e.to_string()))?;

            for value in response.headers().get_all(SET_COOKIE) {
                if let Ok(value) = value.to_str() {
                    self.jar.store(value);
                }
            }

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
                .collect();
            let body = if status == 204 {
                String::new()
            } else {
                response
                    .body_mut()
                    .read_to_string()
                    .map_err(|e| ApiError::TransportError(e.to_string()))?
            };
            debug!(method = %request.method, url = %request.url, status, "round trip done");

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

    /// Caller headers as sent: a multipart body drops any caller
    /// `Content-Type` since the boundary header replaces it, and the jar
    /// cookies are added unless the caller set `Cookie` itself.
    fn wire_headers(request: &HttpRequest, jar: &SharedCookieJar) -> Vec<(String, String)> {
        let multipart = matches!(request.body, Some(WireBody::Multipart(_)));
        let mut headers: Vec<(String, String)> = request
            .headers
            .iter()
            .filter(|(name, _)| !(multipart && name.eq_ignore_ascii_case(CONTENT_TYPE.as_str())))
            .cloned()
            .collect();

        match request.credentials {
            Credentials::Include => {
                if find_header(&request.headers, COOKIE.as_str()).is_none() {
                    if let Some(cookies) = jar.header_value() {
                        headers.push((COOKIE.as_str().to_string(), cookies));
                    }
                }
            }
        }
        headers
    }

    fn build_error(e: ureq::http::Error) -> ApiError {
        ApiError::TransportError(e.to_string())
    }

}
