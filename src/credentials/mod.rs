// ABOUTME: Secure key-value credential storage used for the bearer token and signed-in identity
// The chat core only reads from it; login and logout are the only writers

pub mod file_store;

pub use file_store::FileCredentialStore;

use crate::models::LoginData;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// Well-known keys shared with the login flow.
pub mod keys {
    pub const USER_TOKEN: &str = "userToken";
    pub const USER_ID: &str = "userId";
    pub const EMAIL: &str = "email";
    pub const USERNAME: &str = "username";
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt credential file: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("No config directory available for credential storage")]
    NoStorageLocation,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CredentialError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), CredentialError>;
    async fn delete(&self, key: &str) -> Result<(), CredentialError>;
}

/// Bearer token, if one is stored. Store failures count as "absent".
pub async fn bearer_token(store: &dyn CredentialStore) -> Option<String> {
    match store.get(keys::USER_TOKEN).await {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            tracing::warn!("Failed to read bearer token: {}", e);
            None
        }
    }
}

pub async fn store_login(store: &dyn CredentialStore, data: &LoginData) -> Result<(), CredentialError> {
    if data.token.is_empty() {
        return Ok(());
    }
    store.set(keys::USER_TOKEN, &data.token).await?;
    store.set(keys::USER_ID, &data.user_id).await?;
    store.set(keys::EMAIL, &data.email).await?;
    store.set(keys::USERNAME, &data.username).await?;
    info!("Stored credentials for {}", data.username);
    Ok(())
}

pub async fn clear_login(store: &dyn CredentialStore) -> Result<(), CredentialError> {
    for key in [keys::USER_TOKEN, keys::USER_ID, keys::EMAIL, keys::USERNAME] {
        store.delete(key).await?;
    }
    info!("Cleared stored credentials");
    Ok(())
}

/// Process-local store, handy for tests and one-shot tools.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        self.values.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CredentialError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
