//! Remote resume store client.
//!
//! One resource per identity: `GET` fetches the stored document, `PUT`
//! replaces it. All requests carry the caller's bearer token.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use resumesync_core::improve::{ContentImprover, ContentType, ImprovedContent};
use resumesync_core::sync::{RemoteStore, SyncError, TokenProvider};
use resumesync_core::{IdentityKey, ResumeDocument};

use crate::error::{RemoteError, Result};
use crate::types::*;

/// Default API location for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Client for the remote resume store API.
#[derive(Debug, Clone)]
pub struct ResumeStoreClient {
    client: reqwest::Client,
    base_url: String,
}

impl ResumeStoreClient {
    fn log_response(status: StatusCode, body: &str) {
        if status.is_success() {
            debug!("[RemoteStore] Response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[RemoteStore] Response error ({}): {}", status, preview);
    }

    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the API (e.g., "http://localhost:8000")
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(RemoteError::invalid_request("API base URL is empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create headers for an API request.
    fn headers(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| RemoteError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    fn document_url(&self, identity: &IdentityKey) -> String {
        format!(
            "{}/users/{}",
            self.base_url,
            urlencoding::encode(identity.as_str())
        )
    }

    fn error_from_body(status: StatusCode, body: &str) -> RemoteError {
        let message = serde_json::from_str::<ApiErrorResponse>(body)
            .ok()
            .and_then(|error| error.describe())
            .unwrap_or_else(|| format!("Request failed: {}", body));
        RemoteError::api(status.as_u16(), message)
    }

    /// Read the body and decode JSON, or turn a non-2xx into `RemoteError::Api`.
    async fn read_body(response: reqwest::Response) -> Result<(StatusCode, String)> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::error_from_body(status, &body));
        }
        Ok((status, body))
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let (status, body) = Self::read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "[RemoteStore] Failed to deserialize response ({}): {}",
                status,
                e
            );
            RemoteError::Json(e)
        })
    }

    fn envelope_into_document(envelope: ProfileEnvelope) -> Result<ResumeDocument> {
        envelope.into_document().map_err(|e| {
            log::error!("[RemoteStore] {}", e);
            RemoteError::Json(e.source)
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch the stored document. `Ok(None)` when the server answers 404 or
    /// returns no profile.
    ///
    /// GET /users/{identity}
    pub async fn get_document(
        &self,
        token: &str,
        identity: &IdentityKey,
    ) -> Result<Option<ResumeDocument>> {
        let url = self.document_url(identity);
        debug!("[RemoteStore] GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers(token)?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("[RemoteStore] No document stored for {}", identity);
            return Ok(None);
        }

        let envelope: ProfileEnvelope = Self::parse_response(response).await?;
        if envelope.is_empty() {
            return Ok(None);
        }
        Self::envelope_into_document(envelope).map(Some)
    }

    /// Replace the stored document and return the canonical stored value.
    /// An empty 2xx body means the server kept exactly what was sent.
    ///
    /// PUT /users/{identity}
    pub async fn put_document(
        &self,
        token: &str,
        identity: &IdentityKey,
        document: &ResumeDocument,
    ) -> Result<ResumeDocument> {
        let url = self.document_url(identity);
        debug!("[RemoteStore] PUT {}", url);

        let response = self
            .client
            .put(&url)
            .headers(self.headers(token)?)
            .json(&ProfileEnvelopeRef { profile: document })
            .send()
            .await?;

        let (_, body) = Self::read_body(response).await?;
        if body.trim().is_empty() {
            return Ok(document.clone());
        }
        let envelope: ProfileEnvelope = serde_json::from_str(&body)?;
        if envelope.is_empty() {
            return Ok(document.clone());
        }
        Self::envelope_into_document(envelope)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content improvement
    // ─────────────────────────────────────────────────────────────────────────

    /// Ask the server to rewrite a piece of text.
    ///
    /// POST /api/ai/improve-content
    pub async fn improve_content(
        &self,
        token: &str,
        request: &ImproveContentRequest,
    ) -> Result<ImproveContentResponse> {
        if request.original_text.trim().is_empty() {
            return Err(RemoteError::invalid_request(
                "Please enter some content to improve",
            ));
        }
        let url = format!("{}/api/ai/improve-content", self.base_url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers(token)?)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

#[async_trait]
impl RemoteStore for ResumeStoreClient {
    async fn fetch(
        &self,
        identity: &IdentityKey,
        token: &str,
    ) -> std::result::Result<Option<ResumeDocument>, SyncError> {
        self.get_document(token, identity)
            .await
            .map_err(SyncError::from)
    }

    async fn store(
        &self,
        identity: &IdentityKey,
        token: &str,
        document: &ResumeDocument,
    ) -> std::result::Result<ResumeDocument, SyncError> {
        self.put_document(token, identity, document)
            .await
            .map_err(SyncError::from)
    }
}

/// [`ContentImprover`] over HTTP, using the host's token provider.
#[derive(Clone)]
pub struct ContentImproveClient {
    client: ResumeStoreClient,
    tokens: Arc<dyn TokenProvider>,
}

impl ContentImproveClient {
    pub fn new(client: ResumeStoreClient, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { client, tokens }
    }
}

#[async_trait]
impl ContentImprover for ContentImproveClient {
    async fn improve(
        &self,
        text: &str,
        content_type: ContentType,
    ) -> std::result::Result<ImprovedContent, SyncError> {
        let token = self
            .tokens
            .access_token()
            .ok_or_else(|| SyncError::Auth("Not authenticated. Please login.".to_string()))?;
        let request = ImproveContentRequest {
            content_type,
            original_text: text.to_string(),
        };
        let response = self.client.improve_content(&token, &request).await?;
        Ok(ImprovedContent {
            text: response.corrected_text,
            suggestions: response.suggestions,
        })
    }
}
