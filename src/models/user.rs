// ABOUTME: Signed-in architect identity and profile models

use crate::credentials::{keys, CredentialStore};
use serde::{Deserialize, Serialize};

/// Who "me" is inside a chat room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    pub username: Option<String>,
}

impl UserIdentity {
    pub fn new(user_id: impl Into<String>, username: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username,
        }
    }

    /// Read the identity saved at login. `None` when nobody is signed in.
    pub async fn load(store: &dyn CredentialStore) -> Option<Self> {
        let user_id = store.get(keys::USER_ID).await.ok().flatten()?;
        let username = store.get(keys::USERNAME).await.ok().flatten();
        Some(Self { user_id, username })
    }

    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or("You")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub experience: Option<u32>,
    #[serde(default)]
    pub rate_online: Option<f64>,
    #[serde(default)]
    pub rate_offline: Option<f64>,
    #[serde(default)]
    pub portfolio: Option<String>,
}
