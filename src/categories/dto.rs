use serde::Deserialize;

/// Body of `POST /categories` and `PUT /categories/:id`.
#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_th: Option<String>,
}

impl CategoryPayload {
    /// Trimmed name, `None` when missing or blank.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}
