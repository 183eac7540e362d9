//! Cookie access and CSRF token lookup.
//!
//! # Design
//! Reading cookies is an environment capability, so the client takes a
//! `CookieReader` instead of reaching for global state. Three readers ship
//! with the crate: any closure returning a name/value map, a parsed
//! `document.cookie`-style string, and `SharedCookieJar`, the in-process jar
//! a native transport fills from `Set-Cookie` headers.
//!
//! The token is re-read on every request because the server may rotate it
//! between calls.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use cookie::time::Duration;
use cookie::Cookie;
use tracing::{debug, warn};

/// Cookie the backend sets alongside the access token.
pub const CSRF_COOKIE: &str = "csrf_access_token";

/// Header that echoes the CSRF cookie back to the backend.
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// Source of the cookies visible to the client at request time.
pub trait CookieReader {
    /// Current cookies, name to decoded value.
    fn read_cookies(&self) -> HashMap<String, String>;
}

impl<F> CookieReader for F
where
    F: Fn() -> HashMap<String, String>,
{
    fn read_cookies(&self) -> HashMap<String, String> {
        self()
    }
}

/// CSRF token from `reader`, or an empty string when the cookie is absent.
pub fn csrf_token<R: CookieReader + ?Sized>(reader: &R) -> String {
    reader
        .read_cookies()
        .remove(CSRF_COOKIE)
        .unwrap_or_default()
}

/// Cookies parsed from a `name=value; other=value` string.
#[derive(Debug, Clone, Default)]
pub struct CookieString {
    raw: String,
}

impl CookieString {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

/// When a name repeats, the first occurrence wins: browsers list the cookie
/// with the most specific path first.
impl CookieReader for CookieString {
    fn read_cookies(&self) -> HashMap<String, String> {
        let mut cookies = HashMap::new();
        for cookie in Cookie::split_parse_encoded(self.raw.as_str()).filter_map(Result::ok) {
            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value().to_string());
        }
        cookies
    }
}

/// Thread-safe cookie store shared between a transport and the client.
///
/// Cookies are keyed by name; a later `Set-Cookie` for the same name
/// replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct SharedCookieJar {
    inner: Arc<RwLock<HashMap<String, Cookie<'static>>>>,
}

impl SharedCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one `Set-Cookie` header value.
    ///
    /// A cookie with `Max-Age` of zero or less removes the stored one.
    pub fn store(&self, set_cookie: &str) {
        let cookie = match Cookie::parse_encoded(set_cookie.to_string()) {
            Ok(c) => c,
            Err(e) => {
                warn!("ignoring malformed Set-Cookie header: {e}");
                return;
            }
        };
        let Ok(mut jar) = self.inner.write() else {
            warn!("cookie jar lock poisoned, dropping Set-Cookie");
            return;
        };
        let name = cookie.name().to_string();
        if cookie.max_age().is_some_and(|age| age <= Duration::ZERO) {
            debug!(cookie = %name, "cookie expired by server");
            jar.remove(&name);
        } else {
            debug!(cookie = %name, "cookie stored");
            jar.insert(name, cookie);
        }
    }

    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut jar) = self.inner.write() {
            let cookie = Cookie::new(name.into(), value.into());
            jar.insert(cookie.name().to_string(), cookie);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut jar) = self.inner.write() {
            jar.clear();
        }
    }

    /// `Cookie` request header value, or `None` when the jar is empty.
    pub fn header_value(&self) -> Option<String> {
        let jar = self.inner.read().ok()?;
        if jar.is_empty() {
            return None;
        }
        let mut pairs: Vec<String> = jar
            .values()
            .map(|c| c.stripped().encoded().to_string())
            .collect();
        pairs.sort();
        Some(pairs.join("; "))
    }
}

impl CookieReader for SharedCookieJar {
    fn read_cookies(&self) -> HashMap<String, String> {
        match self.inner.read() {
            Ok(jar) => jar
                .iter()
                .map(|(name, c)| (name.clone(), c.value().to_string()))
                .collect(),
            Err(_) => HashMap::new(),
        }
    }
}
