//! Wire types for the remote store API.

use resumesync_core::improve::ContentType;
use resumesync_core::{ParseError, ResumeDocument};
use serde::{Deserialize, Serialize};

/// Request body for `PUT /users/{identity}`.
#[derive(Debug, Serialize)]
pub struct ProfileEnvelopeRef<'a> {
    pub profile: &'a ResumeDocument,
}

/// Response body carrying a stored document.
///
/// Older servers store the profile as a JSON-encoded string, sometimes with a
/// second `profile` wrapper inside; both shapes are accepted.
#[derive(Debug, Deserialize)]
pub struct ProfileEnvelope {
    #[serde(default)]
    pub profile: serde_json::Value,
}

impl ProfileEnvelope {
    /// True when the body carried no profile at all.
    pub fn is_empty(&self) -> bool {
        self.profile.is_null()
    }

    pub fn into_document(self) -> std::result::Result<ResumeDocument, ParseError> {
        let mut value = match self.profile {
            serde_json::Value::String(raw) => serde_json::from_str(&raw)
                .map_err(|e| ParseError::new("remote profile string", e))?,
            other => other,
        };
        let nested = value.as_object().is_some_and(|object| {
            object.contains_key("profile") && !object.contains_key("personalInfo")
        });
        if nested {
            value = value
                .get_mut("profile")
                .map(serde_json::Value::take)
                .unwrap_or_default();
        }
        if value.is_null() {
            value = serde_json::Value::Object(Default::default());
        }
        ResumeDocument::from_value(value, "remote document")
    }
}

/// Error body returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiErrorResponse {
    pub fn describe(&self) -> Option<String> {
        match (&self.code, &self.message, &self.detail) {
            (Some(code), Some(message), _) => Some(format!("{}: {}", code, message)),
            (_, Some(message), _) => Some(message.clone()),
            (_, _, Some(detail)) => Some(detail.clone()),
            _ => None,
        }
    }
}

/// Request body for `POST /api/ai/improve-content`.
#[derive(Debug, Clone, Serialize)]
pub struct ImproveContentRequest {
    pub content_type: ContentType,
    pub original_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImproveContentResponse {
    pub corrected_text: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}
