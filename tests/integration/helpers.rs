//! Test helpers and utilities

use std::io::{Cursor, Read};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use plugin_forge::config::{
    GeneratorConfig, LogFormat, LoggingConfig, OptionalDuration, RateLimitConfig,
    SecurityConfig, ServerConfig,
};
use plugin_forge::{Config, Server};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use tempfile::TempDir;
use zip::ZipArchive;

/// In-process server bound to 127.0.0.1 on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    pub temp_dir: PathBuf,
    server: Arc<Server>,
    _scratch: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Server without rate limiting.
    pub async fn start() -> Self {
        Self::start_with_rate_limit(None).await
    }

    /// Server allowing `limit` generations per client per minute.
    pub async fn start_with_rate_limit(limit: Option<u64>) -> Self {
        let scratch = TempDir::new().expect("Failed to create scratch dir");
        let temp_dir = scratch.path().join("archives");
        std::fs::create_dir_all(&temp_dir).expect("Failed to create archive dir");

        let template_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("template");
        let listen: SocketAddr = "127.0.0.1:0".parse().unwrap();

        let config = Config {
            server: ServerConfig::new(listen)
                .with_workers(1)
                .with_request_timeout(OptionalDuration::from_secs(30)),
            generator: GeneratorConfig::new(template_dir).with_temp_dir(&temp_dir),
            security: SecurityConfig {
                rate_limit: limit.map(|max| {
                    RateLimitConfig::new(max, 60, scratch.path().join("rate_limits"))
                }),
                ..SecurityConfig::default()
            },
            logging: LoggingConfig {
                filter: "plugin_forge=warn".into(),
                service_name: "plugin_forge_test".into(),
                format: LogFormat::Text,
                access_log: false,
            },
        };

        let server = Arc::new(Server::bind(config).expect("Failed to bind test server"));
        let base_url = format!("http://{}", server.local_addr());

        let runner = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = runner.run().await;
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            client,
            temp_dir,
            server,
            _scratch: scratch,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// Load the form and pull the CSRF token out of it.
    pub async fn fetch_token(&self) -> String {
        let body = self.get("/").await.text().await.expect("Failed to read form");
        extract_token(&body).expect("form carries no csrf token")
    }

    /// POST an urlencoded form to `/generate`.
    pub async fn post_generate(&self, form: &[(&str, String)]) -> Response {
        self.client
            .post(self.url("/generate"))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.trigger_shutdown();
    }
}

/// Value of the hidden `csrf_token` input.
pub fn extract_token(html: &str) -> Option<String> {
    let marker = r#"name="csrf_token" value=""#;
    let start = html.find(marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_string())
}

/// A submission that passes validation.
pub fn valid_form(token: &str) -> Vec<(&'static str, String)> {
    vec![
        ("csrf_token", token.to_string()),
        ("plugin_name", "Demo Plugin".into()),
        ("plugin_slug", "demo-plugin".into()),
        ("text_domain", "demo-plugin".into()),
        ("plugin_namespace", "DemoPlugin".into()),
        ("vendor_namespace", "Acme".into()),
        ("plugin_description", "Adds a demo.".into()),
        ("author_name", "Jane Doe".into()),
        ("author_uri", "https://example.com".into()),
        ("plugin_uri", "https://example.com/demo".into()),
        ("version", "1.2.3".into()),
        ("requires_php", "8.2".into()),
    ]
}

/// Every entry of a ZIP body, name and content.
pub fn unzip(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("body is not a zip");
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (entry.name().to_string(), content)
        })
        .collect()
}

/// Assert that response has expected status
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert that response contains header
pub fn assert_header(response: &Response, name: &str, expected: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert_eq!(value, expected, "Header '{}' mismatch", name);
}

/// Assert that response contains header with prefix
pub fn assert_header_starts_with(response: &Response, name: &str, prefix: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert!(
        value.starts_with(prefix),
        "Header '{}' expected to start with '{}', got '{}'",
        name,
        prefix,
        value
    );
}

/// Assert that response has header present
pub fn assert_has_header(response: &Response, name: &str) {
    assert!(
        response.headers().contains_key(name),
        "Header '{}' not found",
        name
    );
}

/// Assert that response body contains substring
pub async fn assert_body_contains(response: Response, substring: &str) {
    let body = response.text().await.expect("Failed to read body");
    assert!(
        body.contains(substring),
        "Body does not contain '{}'. Body: {}",
        substring,
        &body[..body.len().min(500)]
    );
}
