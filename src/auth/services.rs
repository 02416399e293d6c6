use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use tracing::{error, info, warn};

use super::dto::{PublicUser, Registration};
use super::repo::{self, User};
use crate::{
    error::ApiError,
    identity::{IdentityError, NewIdentity},
    state::AppState,
};

const EMAIL_TAKEN: &str = "Email already exists";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Account row and password hash in our own `users` table.
pub async fn register_local(st: &AppState, reg: Registration) -> Result<PublicUser, ApiError> {
    if User::find_by_email(&st.db, &reg.email).await?.is_some() {
        warn!(email = %reg.email, "email already registered");
        return Err(ApiError::BadRequest(EMAIL_TAKEN.into()));
    }

    let password = reg.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(anyhow::Error::from)??;

    let user = User::create(&st.db, &reg.email, &reg.username, &hash).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(PublicUser {
        id: user.id,
        email: user.email,
        username: user.username,
    })
}

/// Account at the identity provider plus a local profile row. If the profile
/// cannot be written the provider account is deleted again.
pub async fn register_with_identity(
    st: &AppState,
    reg: Registration,
) -> Result<PublicUser, ApiError> {
    let new = NewIdentity {
        email: reg.email.clone(),
        password: reg.password,
        username: reg.username.clone(),
        phone: reg.phone.clone(),
    };

    let user_id = match st.identity.create_user(&new).await {
        Ok(id) => id,
        Err(IdentityError::EmailTaken) => {
            warn!(email = %reg.email, "email already registered at identity provider");
            return Err(ApiError::BadRequest(EMAIL_TAKEN.into()));
        }
        Err(IdentityError::Other(e)) => return Err(e.into()),
    };

    if let Err(e) = repo::insert_profile(&st.db, user_id, &reg.username, reg.phone.as_deref()).await {
        if let Err(cleanup) = st.identity.delete_user(user_id).await {
            warn!(%user_id, error = ?cleanup, "failed to remove identity account after profile error");
        }
        return Err(e.into());
    }

    info!(%user_id, email = %reg.email, "user registered with identity provider");
    Ok(PublicUser {
        id: user_id,
        email: reg.email,
        username: reg.username,
    })
}
