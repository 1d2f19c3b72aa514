//! HTTP client for the remote resume store and the content-improvement API.

mod client;
mod error;
mod types;

pub use client::{ContentImproveClient, ResumeStoreClient, DEFAULT_API_URL};
pub use error::{RemoteError, Result};
pub use types::*;
