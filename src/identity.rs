use anyhow::Context;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewIdentity {
    pub email: String,
    pub password: String,
    pub username: String,
    pub phone: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Identity gateway: account creation and OAuth redirects.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn create_user(&self, user: &NewIdentity) -> Result<Uuid, IdentityError>;
    async fn delete_user(&self, id: Uuid) -> anyhow::Result<()>;
    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> anyhow::Result<String>;
}

/// Supabase Auth admin API.
#[derive(Clone)]
pub struct SupabaseIdentity {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct CreatedUser {
    id: Uuid,
}

impl SupabaseIdentity {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("build identity http client")?;
        Ok(Self {
            http,
            base_url: config.supabase_url.clone(),
            service_key: config.supabase_service_key.clone(),
        })
    }

    fn admin(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

#[async_trait]
impl IdentityClient for SupabaseIdentity {
    async fn create_user(&self, user: &NewIdentity) -> Result<Uuid, IdentityError> {
        let url = format!("{}/auth/v1/admin/users", self.base_url);
        let body = json!({
            "email": user.email,
            "password": user.password,
            "email_confirm": true,
            "user_metadata": { "username": user.username, "phone": user.phone },
        });

        let resp = self
            .admin(self.http.post(url))
            .json(&body)
            .send()
            .await
            .context("identity create_user request")?;

        let status = resp.status();
        if status.is_success() {
            let created: CreatedUser = resp.json().await.context("identity create_user body")?;
            debug!(user_id = %created.id, "identity user created");
            return Ok(created.id);
        }

        let text = resp.text().await.unwrap_or_default();
        if is_email_taken(status, &text) {
            return Err(IdentityError::EmailTaken);
        }
        Err(anyhow::anyhow!("identity create_user failed: {} {}", status, text).into())
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<()> {
        let url = format!("{}/auth/v1/admin/users/{}", self.base_url, id);
        self.admin(self.http.delete(url))
            .send()
            .await
            .context("identity delete_user request")?
            .error_for_status()
            .context("identity delete_user")?;
        Ok(())
    }

    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str) -> anyhow::Result<String> {
        authorize_url(&self.base_url, provider, redirect_to)
    }
}

pub(crate) fn authorize_url(
    base_url: &str,
    provider: OAuthProvider,
    redirect_to: &str,
) -> anyhow::Result<String> {
    let url = Url::parse_with_params(
        &format!("{}/auth/v1/authorize", base_url),
        &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
    )
    .context("build authorize url")?;
    Ok(url.into())
}

fn is_email_taken(status: StatusCode, body: &str) -> bool {
    status == StatusCode::UNPROCESSABLE_ENTITY
        || (status == StatusCode::BAD_REQUEST && body.contains("already"))
}
