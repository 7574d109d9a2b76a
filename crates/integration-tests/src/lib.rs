//! Integration tests for the tshop storefront.
//!
//! Tests drive the full router (session, rate limit, and header layers
//! included) with in-memory catalog, user, and session stores, so no database
//! is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tshop-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::{Extension, Router};
use axum::http::{HeaderMap, Request, StatusCode, header};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use tshop_storefront::config::StorefrontConfig;
use tshop_storefront::db::memory::{MemoryCatalog, MemoryUsers};
use tshop_storefront::state::AppState;

/// Password that passes every signup check.
pub const PASSWORD: &str = "varnish-and-sawdust";

/// Session cookie name set by the storefront.
const SESSION_COOKIE: &str = "tshop_session";

/// Static directory of the storefront crate, independent of the test's cwd.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../storefront/static");

/// Peer address of every test request.
const CLIENT_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 5000);

/// Storefront under test plus a one-cookie browser.
pub struct TestApp {
    router: Router,
    pub catalog: Arc<MemoryCatalog>,
    pub users: Arc<MemoryUsers>,
    cookie: Option<String>,
}

/// Response with the body already collected.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    /// Storefront with a generous rate limit.
    pub fn new() -> Self {
        Self::with_settings(&[("STOREFRONT_RATE_LIMIT_PER_MINUTE", "1000")])
    }

    /// Storefront with extra configuration variables.
    pub fn with_settings(settings: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = HashMap::from([
            (
                "STOREFRONT_DATABASE_URL".to_owned(),
                "postgres://unused@localhost/unused".to_owned(),
            ),
            ("STOREFRONT_STATIC_DIR".to_owned(), STATIC_DIR.to_owned()),
        ]);
        for (key, value) in settings {
            vars.insert((*key).to_owned(), (*value).to_owned());
        }

        let config = StorefrontConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let catalog = Arc::new(MemoryCatalog::default());
        let users = Arc::new(MemoryUsers::default());
        let state = AppState::new(config, catalog.clone(), users.clone());

        // The rate limiter keys on the peer address, which `into_make_service_with_connect_info`
        // supplies in production.
        let router = tshop_storefront::app(state, MemoryStore::default())
            .layer(Extension(ConnectInfo(CLIENT_ADDR)));

        Self {
            router,
            catalog,
            users,
            cookie: None,
        }
    }

    /// Whether the browser currently holds a session cookie.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    /// Send a GET request.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.request("GET", uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// Send a GET request with extra headers.
    pub async fn get_with_headers(&mut self, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = self.request("GET", uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// Send a url-encoded form POST.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Register an account through the signup form.
    pub async fn signup(&mut self, username: &str) -> TestResponse {
        self.post_form(
            "/signup/",
            &[
                ("username", username),
                ("password1", PASSWORD),
                ("password2", PASSWORD),
            ],
        )
        .await
    }

    /// Log in through the login form.
    pub async fn login(&mut self, username: &str) -> TestResponse {
        self.post_form("/login/", &[("username", username), ("password", PASSWORD)])
            .await
    }

    /// Sign up and log in.
    pub async fn signup_and_login(&mut self, username: &str) {
        let response = self.signup(username).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
        let response = self.login(username).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            self.store_cookie(value.to_str().unwrap());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    fn store_cookie(&mut self, set_cookie: &str) {
        let pair = set_cookie.split(';').next().unwrap_or_default().trim();
        let Some((name, value)) = pair.split_once('=') else {
            return;
        };
        if name != SESSION_COOKIE {
            return;
        }

        let removed = value.is_empty() || set_cookie.to_ascii_lowercase().contains("max-age=0");
        self.cookie = (!removed).then(|| pair.to_owned());
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
