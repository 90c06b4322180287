// ABOUTME: reqwest client for the consultation backend
// Attaches the stored bearer token and unwraps the response envelope

use super::{ApiError, ConsultationApi, ConsultationQuery, Envelope, FileUpload};
use crate::chat::protocol::ChatRecord;
use crate::credentials::{bearer_token, CredentialStore};
use crate::models::{ArchitectProfile, ConsultationSession, LoginData};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct HttpConsultationApi {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpConsultationApi {
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = bearer_token(self.credentials.as_ref())
            .await
            .ok_or(ApiError::MissingToken)?;
        Ok(builder.bearer_auth(token))
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().path().to_string();
        debug!("{} -> {}", url, status);

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }

        let body = response.text().await?;
        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(e) if !status.is_success() => {
                warn!("Non-envelope error body from {}: {}", url, e);
                Err(ApiError::Status {
                    code: status.as_u16(),
                    message: status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string(),
                })
            }
            Err(e) => Err(ApiError::Decode(e.to_string())),
        }
    }
}

#[async_trait]
impl ConsultationApi for HttpConsultationApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginData, ApiError> {
        let request = self
            .client
            .post(self.url("/architects/login"))
            .json(&json!({ "email": email, "password": password }));
        self.execute(request).await
    }

    async fn get_profile(&self) -> Result<ArchitectProfile, ApiError> {
        let request = self.authorized(self.client.get(self.url("/architects/me"))).await?;
        self.execute(request).await
    }

    async fn list_consultations(&self, query: &ConsultationQuery) -> Result<Vec<ConsultationSession>, ApiError> {
        let request = self
            .authorized(
                self.client
                    .get(self.url("/architects/consultations"))
                    .query(&query.to_params()),
            )
            .await?;
        self.execute(request).await
    }

    async fn get_consultation(&self, consultation_id: &str) -> Result<ConsultationSession, ApiError> {
        let path = format!("/consultations/{}", consultation_id);
        let request = self.authorized(self.client.get(self.url(&path))).await?;
        self.execute(request).await
    }

    async fn get_chat_history(&self, room_id: &str) -> Result<Vec<ChatRecord>, ApiError> {
        let path = format!("/chats/{}", room_id);
        let request = self.authorized(self.client.get(self.url(&path))).await?;
        self.execute(request).await
    }

    async fn upload_chat_file(&self, room_id: &str, file: FileUpload) -> Result<String, ApiError> {
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.mime_type)?;
        let form = Form::new().part("file", part);

        let path = format!("/chats/{}/files", room_id);
        let request = self
            .authorized(self.client.post(self.url(&path)).multipart(form))
            .await?;
        self.execute(request).await
    }
}
