// ABOUTME: Consultation backend API: trait seam plus reqwest implementation
// Every response uses the {code, status, data?, error?} envelope

pub mod client;

pub use client::HttpConsultationApi;

use crate::chat::protocol::ChatRecord;
use crate::models::{ArchitectProfile, ConsultationMode, ConsultationSession, ConsultationStatus, LoginData};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,
    #[error("No bearer token available; please log in again")]
    MissingToken,
    #[error("Server returned {code}: {message}")]
    Status { code: u16, message: String },
    #[error("Network or server error: {0}")]
    Transport(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Failed to read file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    #[serde(default)]
    pub status: Option<String>,
    pub data: Option<T>,
    /// A string, or a list of validation messages.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl<T> Envelope<T> {
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .collect::<Vec<_>>()
                .join("; "),
            Some(other) => other.to_string(),
            None => self.status.clone().unwrap_or_else(|| "Unknown error".to_string()),
        }
    }

    /// `data` on code 200; `NotFound` on 404; otherwise the server's message.
    pub fn into_result(self) -> Result<T, ApiError> {
        match self.code {
            200 | 201 => match self.data {
                Some(data) => Ok(data),
                None => Err(ApiError::Decode("response carried no data".to_string())),
            },
            404 => Err(ApiError::NotFound),
            code => Err(ApiError::Status {
                code,
                message: self.error_message(),
            }),
        }
    }
}

/// Filters for the architect's consultation list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsultationQuery {
    pub mode: Option<ConsultationMode>,
    pub status: Option<ConsultationStatus>,
    pub include_cancelled: Option<bool>,
    pub upcoming: Option<bool>,
}

impl ConsultationQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(mode) = self.mode {
            params.push(("type", mode.as_wire().to_string()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.as_wire().to_string()));
        }
        if let Some(include) = self.include_cancelled {
            params.push(("includeCancelled", include.to_string()));
        }
        if let Some(upcoming) = self.upcoming {
            params.push(("upcoming", upcoming.to_string()));
        }
        params
    }
}

lazy_static! {
    static ref EXTENSION: Regex = Regex::new(r"\.(\w+)$").unwrap();
}

/// A file headed for the chat upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub uri: String,
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Name and MIME type derived from the URI; defaults to a jpeg.
    pub fn from_uri(uri: &str, bytes: Vec<u8>) -> Self {
        let name = uri
            .rsplit('/')
            .next()
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("image_{}.jpg", chrono::Utc::now().timestamp_millis()));
        let mime_type = EXTENSION
            .captures(&name)
            .map(|caps| format!("image/{}", caps[1].to_lowercase()))
            .unwrap_or_else(|| "image/jpeg".to_string());
        Self {
            uri: uri.to_string(),
            name,
            mime_type,
            bytes,
        }
    }

    /// Read a device-local image (`file://` or plain path).
    pub async fn read_local(uri: &str) -> Result<Self, ApiError> {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::File {
            path: path.to_string(),
            source,
        })?;
        Ok(Self::from_uri(uri, bytes))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsultationApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginData, ApiError>;
    async fn get_profile(&self) -> Result<ArchitectProfile, ApiError>;
    async fn list_consultations(&self, query: &ConsultationQuery) -> Result<Vec<ConsultationSession>, ApiError>;
    async fn get_consultation(&self, consultation_id: &str) -> Result<ConsultationSession, ApiError>;
    /// `ApiError::NotFound` when the room has no history yet.
    async fn get_chat_history(&self, room_id: &str) -> Result<Vec<ChatRecord>, ApiError>;
    /// Durable URL of the uploaded file.
    async fn upload_chat_file(&self, room_id: &str, file: FileUpload) -> Result<String, ApiError>;
}
