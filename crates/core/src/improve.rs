//! Boundary to the AI content-improvement collaborator.
//!
//! Improved text never touches the document directly; the editor applies it
//! through a regular [`crate::mutation::Mutation`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::sync::SyncError;

/// Kind of text sent for improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    AboutMe,
    Responsibility,
    ProjectDescription,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovedContent {
    pub text: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[async_trait]
pub trait ContentImprover: Send + Sync {
    async fn improve(
        &self,
        text: &str,
        content_type: ContentType,
    ) -> Result<ImprovedContent, SyncError>;
}

impl ContentType {
    /// Content type hint for the text stored at `path`.
    pub fn for_path(path: &crate::document::FieldPath) -> Self {
        use crate::document::{FieldPath, ListSection, ScalarField};
        match path {
            FieldPath::Scalar {
                field: ScalarField::AboutMe,
            } => ContentType::AboutMe,
            FieldPath::Responsibility { .. } => ContentType::Responsibility,
            FieldPath::ItemField {
                section: ListSection::Projects,
                field,
                ..
            } if field == "description" => ContentType::ProjectDescription,
            _ => ContentType::General,
        }
    }
}
