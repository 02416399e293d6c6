use bytes::Bytes;
use serde::Serialize;

use super::repo::{Service, ServiceItem};

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub body: Bytes,
    pub content_type: String,
}

/// Multipart fields of a service create/update request, before validation.
#[derive(Debug, Default)]
pub struct ServiceForm {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub description: Option<String>,
    pub items: Option<String>,
    pub images: Vec<UploadedImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewServiceItem {
    pub name: String,
    pub price_per_unit: f64,
    pub unit: String,
}

/// A validated create request.
#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub category_id: i32,
    pub description: Option<String>,
    pub items: Vec<NewServiceItem>,
    pub image: UploadedImage,
}

/// A validated update request; `None` means keep the stored value.
#[derive(Debug, Clone, Default)]
pub struct ServiceChanges {
    pub name: Option<String>,
    pub category_id: Option<i32>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub items: Option<Vec<NewServiceItem>>,
    pub image: Option<UploadedImage>,
}

impl ServiceChanges {
    pub fn apply_to(&self, current: &Service, image_url: String) -> Service {
        Service {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            description: match &self.description {
                Some(d) => d.clone(),
                None => current.description.clone(),
            },
            category_id: self.category_id.or(current.category_id),
            image_url,
            ..current.clone()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceDetails {
    #[serde(flatten)]
    pub service: Service,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub items: Vec<ServiceItem>,
}
