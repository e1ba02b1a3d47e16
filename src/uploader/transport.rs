use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::{multipart, Body, Client};
use std::sync::Arc;
use std::time::Duration;

use super::media::MediaKind;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

/// Invoked with `(cumulative_bytes_sent, total_bytes)` as the body goes out.
pub type ProgressCallback = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// How the transport identifies the session to the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPolicy {
    Anonymous,
    SessionCookie(String),
    BearerToken(String),
}

/// Everything one upload sends.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub kind: MediaKind,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Sends one avatar upload and returns the raw success body.
///
/// Non-success statuses come back as [`AppError::ServerRejection`], transport
/// failures as [`AppError::Network`].
#[async_trait]
pub trait AvatarTransport: Send + Sync {
    async fn upload(&self, request: UploadRequest, on_progress: ProgressCallback)
        -> AppResult<String>;
}

/// reqwest-backed transport posting multipart bodies to a fixed endpoint.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    field_name: String,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        upload_path: &str,
        credentials: CredentialPolicy,
        timeout: Option<Duration>,
    ) -> AppResult<Self> {
        InputValidator::validate_base_url(base_url)?;
        InputValidator::validate_endpoint_path(upload_path)?;

        let mut builder = Client::builder().default_headers(credential_headers(&credentials)?);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/{}",
                base_url.trim().trim_end_matches('/'),
                upload_path.trim()
            ),
            field_name: "avatar".to_string(),
            chunk_size: 64 * 1024,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self::new(
            &config.api_base_url,
            &config.upload_path,
            config.credential_policy(),
            config.request_timeout(),
        )?
        .with_field_name(&config.upload_field)
        .with_chunk_size(config.progress_chunk_size))
    }

    pub fn with_field_name(mut self, field_name: &str) -> Self {
        self.field_name = field_name.trim().to_string();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(&self, request: UploadRequest, on_progress: ProgressCallback) -> AppResult<multipart::Form> {
        let total = request.bytes.len() as u64;
        let chunks: Vec<Vec<u8>> = request
            .bytes
            .chunks(self.chunk_size)
            .map(<[u8]>::to_vec)
            .collect();

        let mut sent = 0u64;
        let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            on_progress(sent, Some(total));
            Ok::<_, std::io::Error>(chunk)
        }));

        let part = multipart::Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(InputValidator::sanitize_filename(&request.file_name))
            .mime_str(&request.content_type)?;

        Ok(multipart::Form::new().part(self.field_name.clone(), part))
    }
}

#[async_trait]
impl AvatarTransport for HttpTransport {
    async fn upload(
        &self,
        request: UploadRequest,
        on_progress: ProgressCallback,
    ) -> AppResult<String> {
        let kind = request.kind;
        let size = request.bytes.len();
        let form = self.build_form(request, on_progress)?;

        log::info!("Uploading {} ({} bytes) to {}", kind, size, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("kind", kind.as_str())])
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            log::debug!(
                "Upload response (first 300 chars): {}",
                body.chars().take(300).collect::<String>()
            );
            return Ok(body);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        log::warn!("Upload rejected with status {}: {}", status, error_text);

        Err(AppError::server_rejection(
            Some(status.as_u16()),
            error_text.chars().take(300).collect::<String>(),
        ))
    }
}

fn credential_headers(credentials: &CredentialPolicy) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let invalid = |_| AppError::validation("credentials", "Contains characters not allowed in a header");

    match credentials {
        CredentialPolicy::Anonymous => {}
        CredentialPolicy::SessionCookie(cookie) => {
            let mut value = HeaderValue::from_str(cookie).map_err(invalid)?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }
        CredentialPolicy::BearerToken(token) => {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(invalid)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
    }

    Ok(headers)
}
