use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for user registration. `phone` is only stored by the identity backend.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Registration input after presence checks.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub phone: Option<String>,
}

fn filled(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl RegisterRequest {
    /// `None` when email, username or password is missing or blank.
    pub fn into_registration(self) -> Option<Registration> {
        Some(Registration {
            email: filled(self.email)?.to_lowercase(),
            username: filled(self.username)?,
            // passwords are taken verbatim
            password: self.password.filter(|p| !p.is_empty())?,
            phone: filled(self.phone),
        })
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: PublicUser,
}
