use anyhow::Context;
use axum::http::HeaderValue;
use serde::Deserialize;
use tracing::warn;

/// Where account credentials live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthBackend {
    /// Argon2 hash stored in our own `users` table.
    Local,
    /// Account held by the identity provider, profile row in `user_profiles`.
    Identity,
}

impl AuthBackend {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "identity" => Ok(Self::Identity),
            other => anyhow::bail!("unknown AUTH_BACKEND {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub s3_endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub storage: StorageConfig,
    pub cors_origins: Vec<String>,
    pub oauth_redirect_url: String,
    pub auth_backend: AuthBackend,
}

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let supabase_url = std::env::var("SUPABASE_URL")
            .context("SUPABASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let supabase_service_key =
            std::env::var("SUPABASE_SERVICE_ROLE_KEY").context("SUPABASE_SERVICE_ROLE_KEY")?;

        let storage = StorageConfig {
            s3_endpoint: std::env::var("STORAGE_S3_ENDPOINT")
                .unwrap_or_else(|_| format!("{}/storage/v1/s3", supabase_url)),
            bucket: std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "service-images".into()),
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID")
                .context("STORAGE_ACCESS_KEY_ID")?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY")
                .context("STORAGE_SECRET_ACCESS_KEY")?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "ap-southeast-1".into()),
        };

        let auth_backend = match std::env::var("AUTH_BACKEND") {
            Ok(v) => AuthBackend::parse(&v)?,
            Err(_) => AuthBackend::Local,
        };

        Ok(Self {
            database_url,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            supabase_url,
            supabase_service_key,
            storage,
            cors_origins: split_origins(
                &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.into()),
            ),
            oauth_redirect_url: std::env::var("OAUTH_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:5173/auth/callback".into()),
            auth_backend,
        })
    }

    /// CORS origins as header values; entries that are not valid header values are dropped.
    pub fn allowed_origins(&self) -> Vec<HeaderValue> {
        self.cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(%origin, error = %e, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect()
    }

    pub fn public_object_base(&self) -> String {
        format!(
            "{}/storage/v1/object/public/{}",
            self.supabase_url, self.storage.bucket
        )
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
