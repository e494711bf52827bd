//! Route handlers and the shared application state behind them.

use std::net::IpAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::SET_COOKIE;
use http::{HeaderMap, HeaderValue};
use hyper::StatusCode;
use tracing::{info, warn};

use super::pages::form_page;
use super::request::parse_form;
use super::response::{archive_response, html_response, HttpResponse};
use crate::config::{GeneratorConfig, SecurityConfig};
use crate::core::fields::names;
use crate::core::{Error, FieldSet, Result};
use crate::forge::{Generator, TempArchive, Validator, ZipCreator};
use crate::security::csrf::{CsrfProtection, TOKEN_FIELD};
use crate::security::{session_cookie, session_id_from_headers, RateLimiter};

/// State shared by every connection.
pub struct AppState {
    validator: Validator,
    generator: Generator,
    csrf: CsrfProtection,
    rate_limiter: Option<RateLimiter>,
    secure_cookie: bool,
}

impl AppState {
    pub fn new(generator: GeneratorConfig, security: &SecurityConfig) -> Result<Self> {
        let rate_limiter = match &security.rate_limit {
            Some(config) => {
                let limiter = RateLimiter::new(config.clone())?;
                limiter.cleanup();
                info!(
                    "Rate limiting enabled: {} requests per {} seconds per client (records in {})",
                    limiter.limit(),
                    limiter.window_secs(),
                    limiter.storage_dir().display()
                );
                Some(limiter)
            }
            None => None,
        };

        let generator = Generator::new(generator);
        if let Err(e) = generator.check_template() {
            warn!("{}; generation requests will fail", e);
        }

        Ok(Self {
            validator: Validator::new(),
            generator,
            csrf: CsrfProtection::from_config(security),
            rate_limiter,
            secure_cookie: security.secure_cookie,
        })
    }

    /// Render the form with this session's token, starting a session if needed.
    pub fn form(&self, headers: &HeaderMap) -> HttpResponse {
        let session_id = session_id_from_headers(headers);
        let (session, field) = self.csrf.token_field(session_id.as_deref());

        let mut response = html_response(StatusCode::OK, form_page(&field));
        if session.created {
            if let Ok(cookie) = HeaderValue::from_str(&session_cookie(&session.id, self.secure_cookie)) {
                response.headers_mut().insert(SET_COOKIE, cookie);
            }
        }
        response
    }

    /// Handle a form submission: token, rate limit, validation, generation,
    /// archive, download. Stops at the first failing step.
    pub async fn generate(
        self: &Arc<Self>,
        headers: &HeaderMap,
        body: Bytes,
        client_ip: IpAddr,
    ) -> Result<HttpResponse> {
        let fields = parse_form(headers, body).await?;

        let session_id = session_id_from_headers(headers);
        if !self
            .csrf
            .validate(session_id.as_deref(), fields.value(TOKEN_FIELD))
        {
            warn!(ip = %client_ip, "rejected submission with invalid CSRF token");
            return Err(Error::InvalidCsrfToken);
        }

        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || state.run_pipeline(fields, client_ip))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?
    }

    fn run_pipeline(&self, raw: FieldSet, client_ip: IpAddr) -> Result<HttpResponse> {
        if let Some(limiter) = &self.rate_limiter {
            let check = limiter.check(&client_ip.to_string())?;
            if !check.allowed {
                warn!(ip = %client_ip, retry_after = check.reset_after, "rate limit exceeded");
                return Err(Error::RateLimited {
                    retry_after: check.reset_after,
                });
            }
        }

        let fields = self.validator.sanitize(&raw);
        self.validator.validate(&fields)?;

        let files = self.generator.generate(&fields)?;

        let slug = fields.value(names::PLUGIN_SLUG);
        let creator = ZipCreator::new(slug, &self.generator.config().temp_dir);
        let archive = TempArchive::new(creator.path().to_path_buf());
        creator.create(&files)?;

        let response = archive_response(archive, &creator.download_name())?;
        info!(
            slug = slug,
            files = files.len(),
            ip = %client_ip,
            "plugin generated"
        );
        Ok(response)
    }
}
