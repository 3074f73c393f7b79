//! In-process test harness for the MP RECORDS API.
//!
//! Every [`TestApp`] runs the full router over an empty in-memory store and a
//! temporary upload directory, so tests need neither a database nor a
//! listening socket.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p mp-records-integration-tests
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use mp_records_server::config::{JwtConfig, LogFormat, ServerConfig};
use mp_records_server::db::MemoryStore;
use mp_records_server::state::AppState;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "wydania-2024";
pub const CUSTOMER_PASSWORD: &str = "koszulka-123";

const JWT_SECRET: &str = "k8#Qz!2vLw9@Rt5^Yp1&Xm4*Bn7$Cs0%";

/// Configuration pointing at `uploads_dir`, with no bootstrap admin.
#[must_use]
pub fn test_config(uploads_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        jwt: JwtConfig {
            secret: SecretString::from(JWT_SECRET),
            admin_ttl: Duration::from_secs(3600),
        },
        bootstrap_admin: None,
        uploads_dir,
        client_url: None,
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// The application router with its state and upload directory.
pub struct TestApp {
    router: Router,
    state: AppState,
    uploads: TempDir,
}

impl TestApp {
    /// # Panics
    ///
    /// Panics if the temporary directory or the HTTP client cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let uploads = TempDir::new().expect("Failed to create upload directory");
        let config = test_config(uploads.path().to_path_buf());
        let state = AppState::new(config, Arc::new(MemoryStore::new()))
            .expect("Failed to initialize application state");
        let router = mp_records_server::app(state.clone());
        Self {
            router,
            state,
            uploads,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    #[must_use]
    pub fn uploads_dir(&self) -> &Path {
        self.uploads.path()
    }

    /// Run one request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the response body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {});
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Send a request with an optional bearer token and JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Create the first admin account and log in as it.
    ///
    /// # Panics
    ///
    /// Panics if setup or login fails.
    pub async fn admin_token(&self) -> String {
        let setup = self
            .post(
                "/api/auth/setup",
                None,
                &json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(setup.status, StatusCode::CREATED, "setup failed: {}", setup.text());
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Log in as an existing admin account.
    ///
    /// # Panics
    ///
    /// Panics if the credentials are rejected.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let login = self
            .post(
                "/api/auth/login",
                None,
                &json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "login failed: {}", login.text());
        token_of(&login.json())
    }

    /// Register a shop customer and return their token.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn customer_token(&self, email: &str) -> String {
        let register = self
            .post(
                "/api/customers/register",
                None,
                &json!({
                    "email": email,
                    "password": CUSTOMER_PASSWORD,
                    "firstName": "Ola",
                    "lastName": "Kowalska",
                }),
            )
            .await;
        assert_eq!(
            register.status,
            StatusCode::CREATED,
            "register failed: {}",
            register.text()
        );
        token_of(&register.json())
    }

    /// Create a product through the admin API and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the product is rejected.
    pub async fn create_product(&self, token: &str, product: &Value) -> String {
        let created = self.post("/api/products", Some(token), product).await;
        assert_eq!(
            created.status,
            StatusCode::CREATED,
            "create product failed: {}",
            created.text()
        );
        id_of(&created.json())
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

fn token_of(body: &Value) -> String {
    body.get("token")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default()
}

/// The `data.id` of a response body.
#[must_use]
pub fn id_of(body: &Value) -> String {
    body.pointer("/data/id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default()
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Parse the body as JSON, or `Value::Null` if it is not JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    #[must_use]
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Hand-built `multipart/form-data` body.
#[derive(Debug)]
pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartBody {
    #[must_use]
    pub fn new() -> Self {
        Self {
            boundary: "----mp-records-test-boundary".to_owned(),
            buf: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    #[must_use]
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, contents: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(contents);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// Finish the body as a POST request to `uri`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    #[must_use]
    pub fn into_request(mut self, uri: &str, token: Option<&str>) -> Request<Body> {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
            .body(Body::from(self.buf))
            .expect("Failed to build multipart request")
    }
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}
