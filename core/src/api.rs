//! Typed GoSell endpoints on top of `ApiClient`.
//!
//! # Design
//! Each endpoint gets a `build_*` method producing an `HttpRequest` and a
//! `parse_*` method consuming an `HttpResponse`, mirroring the generic
//! `build_request` / `parse_response` pair. The un-prefixed methods run the
//! pair through a `Transport`.

use serde_json::Value;
use tracing::debug;

use crate::body::RequestBody;
use crate::client::{ApiClient, Payload, RequestOptions};
use crate::cookies::CookieReader;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::query::ProductQuery;
use crate::transport::Transport;
use crate::types::{DashboardSummary, LoginRequest, LoginResponse, MeResponse, Product};

pub const ME_PATH: &str = "/api/auth/me";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const DASHBOARD_SUMMARY_PATH: &str = "/api/dashboard/summary";
pub const PRODUCTS_PATH: &str = "/api/products";

impl<C: CookieReader> ApiClient<C> {
    pub fn build_me(&self) -> Result<HttpRequest, ApiError> {
        self.build_request(ME_PATH, RequestOptions::get())
    }

    pub fn parse_me(&self, response: HttpResponse) -> Result<MeResponse, ApiError> {
        self.parse_response(response)?.decode()
    }

    /// The credentials go out as a pre-serialized JSON string; the email is
    /// trimmed, the password is sent untouched.
    pub fn build_login(&self, email: &str, password: &str) -> Result<HttpRequest, ApiError> {
        let input = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let body = serde_json::to_string(&input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        self.build_request(LOGIN_PATH, RequestOptions::post().body(RequestBody::Text(body)))
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        self.parse_response(response)?.decode()
    }

    pub fn build_logout(&self) -> Result<HttpRequest, ApiError> {
        self.build_request(LOGOUT_PATH, RequestOptions::post())
    }

    /// Any success, with or without a body, counts as logged out.
    pub fn parse_logout(&self, response: HttpResponse) -> Result<(), ApiError> {
        self.parse_response(response).map(|_| ())
    }

    pub fn build_dashboard_summary(&self) -> Result<HttpRequest, ApiError> {
        self.build_request(DASHBOARD_SUMMARY_PATH, RequestOptions::get())
    }

    pub fn parse_dashboard_summary(&self, response: HttpResponse) -> Result<DashboardSummary, ApiError> {
        self.parse_response(response)?.decode()
    }

    pub fn build_list_products(&self, query: &ProductQuery) -> Result<HttpRequest, ApiError> {
        let path = format!("{PRODUCTS_PATH}?{}", query.to_query_string()?);
        self.build_request(&path, RequestOptions::get())
    }

    /// A success payload that is not a JSON array yields an empty list.
    pub fn parse_list_products(&self, response: HttpResponse) -> Result<Vec<Product>, ApiError> {
        match self.parse_response(response)? {
            payload @ Payload::Json(Value::Array(_)) => payload.decode(),
            other => {
                debug!(?other, "product list payload is not an array");
                Ok(Vec::new())
            }
        }
    }

    pub fn me<T: Transport + ?Sized>(&self, transport: &T) -> Result<MeResponse, ApiError> {
        let response = transport.execute(self.build_me()?)?;
        self.parse_me(response)
    }

    pub fn login<T: Transport + ?Sized>(
        &self,
        transport: &T,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        let response = transport.execute(self.build_login(email, password)?)?;
        self.parse_login(response)
    }

    pub fn logout<T: Transport + ?Sized>(&self, transport: &T) -> Result<(), ApiError> {
        let response = transport.execute(self.build_logout()?)?;
        self.parse_logout(response)
    }

    pub fn dashboard_summary<T: Transport + ?Sized>(&self, transport: &T) -> Result<DashboardSummary, ApiError> {
        let response = transport.execute(self.build_dashboard_summary()?)?;
        self.parse_dashboard_summary(response)
    }

    pub fn list_products<T: Transport + ?Sized>(
        &self,
        transport: &T,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, ApiError> {
        let response = transport.execute(self.build_list_products(query)?)?;
        self.parse_list_products(response)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::cookies::{CSRF_COOKIE, CSRF_HEADER};
    use crate::http::{HttpMethod, WireBody};

    type Reader = fn() -> HashMap<String, String>;

    fn session() -> HashMap<String, String> {
        HashMap::from([(CSRF_COOKIE.to_string(), "csrf-1".to_string())])
    }

    fn client() -> ApiClient<Reader> {
        ApiClient::new("http://localhost:5000", session as Reader)
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    #[test]
    fn build_login_sends_string_body() {
        let req = client().build_login("  ana@example.com ", " pw ").unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:5000/api/auth/login");
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.header(CSRF_HEADER), Some("csrf-1"));
        let Some(WireBody::Text(text)) = req.body else {
            panic!("expected text body");
        };
        let sent: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(sent["email"], "ana@example.com");
        assert_eq!(sent["password"], " pw ");
    }

    #[test]
    fn parse_login_success() {
        let login = client()
            .parse_login(json_response(
                200,
                r#"{"ok":true,"user":{"id":1,"email":"ana@example.com"},"csrf_access":"x"}"#,
            ))
            .unwrap();
        assert_eq!(login.ok, Some(true));
        assert_eq!(login.user.email.as_deref(), Some("ana@example.com"));
        assert_eq!(login.extra["csrf_access"], "x");
    }

    #[test]
    fn parse_login_bad_credentials() {
        let err = client()
            .parse_login(json_response(401, r#"{"error":{"message":"Identifiants invalides"}}"#))
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Identifiants invalides");
    }

    #[test]
    fn logout_accepts_no_content_and_envelope() {
        let c = client();
        let req = c.build_logout().unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert!(req.body.is_none());
        assert!(c
            .parse_logout(HttpResponse {
                status: 204,
                headers: Vec::new(),
                body: String::new(),
            })
            .is_ok());
        assert!(c.parse_logout(json_response(200, r#"{"ok":true}"#)).is_ok());
    }

    #[test]
    fn parse_me_user() {
        let me = client()
            .parse_me(json_response(200, r#"{"user":{"id":2,"first_name":"Ana"}}"#))
            .unwrap();
        assert_eq!(me.user.unwrap().greeting(), "Bienvenue, Ana");
        assert_eq!(client().build_me().unwrap().method, HttpMethod::Get);
    }

    #[test]
    fn build_list_products_appends_query() {
        let query = ProductQuery::new().with_search("chaise").with_page(2);
        let req = client().build_list_products(&query).unwrap();
        assert_eq!(
            req.url,
            "http://localhost:5000/api/products?search=chaise&order_by=date_mise_en_vente&order_dir=desc&page=2&page_size=20"
        );
        assert_eq!(req.header(CSRF_HEADER), Some("csrf-1"));
    }

    #[test]
    fn parse_list_products_non_array_is_empty() {
        let products = client()
            .parse_list_products(json_response(200, r#"{"items":[]}"#))
            .unwrap();
        assert!(products.is_empty());

        let products = client()
            .parse_list_products(json_response(200, r#"[{"id":1,"nom":"Lampe","prix_achat":"5"}]"#))
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].prix_achat, Some(5.0));
    }

    #[test]
    fn parse_list_products_keeps_rows_without_id() {
        let products = client()
            .parse_list_products(json_response(200, r#"[{"id":1,"nom":"a"},{"nom":"no id"},{"id":"4"}]"#))
            .unwrap();
        let ids: Vec<Option<i64>> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(1), None, Some(4)]);
        assert_eq!(products[1].nom, "no id");
    }

    #[test]
    fn parse_dashboard_summary_with_null_sections() {
        let summary = client()
            .parse_dashboard_summary(json_response(
                200,
                r#"{"counts":{"nb_lots":null},"risk_products":{"items":null},"benefices":{"scope":{"include_fees":null}}}"#,
            ))
            .unwrap();
        assert_eq!(summary.counts.nb_lots, 0);
        assert!(summary.risk_products.items.is_empty());
        assert!(!summary.benefices.scope.include_fees);
    }

    #[test]
    fn dashboard_summary_through_transport() {
        let transport = |req: HttpRequest| {
            assert_eq!(req.url, "http://localhost:5000/api/dashboard/summary");
            Ok::<_, ApiError>(json_response(200, r#"{"counts":{"nb_lots":3}}"#))
        };
        let summary = client().dashboard_summary(&transport).unwrap();
        assert_eq!(summary.counts.nb_lots, 3);
    }

    #[test]
    fn transport_failure_propagates() {
        let transport = |_: HttpRequest| Err::<HttpResponse, _>(ApiError::TransportError("refused".into()));
        let err = client().me(&transport).unwrap_err();
        assert!(matches!(err, ApiError::TransportError(_)));
    }
}
