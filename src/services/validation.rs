//! Request validation for service create/update.
//!
//! Runs as an extractor so a handler only ever sees a payload that passed every
//! rule. All violations are collected and returned together.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
};
use serde_json::Value;
use tracing::warn;

use super::dto::{NewService, NewServiceItem, ServiceChanges, ServiceForm, UploadedImage};
use crate::error::ApiError;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

pub const IMAGE_FIELD: &str = "imageFile";
/// Largest value `NUMERIC(10, 2)` holds.
pub const MAX_ITEM_PRICE: f64 = 99_999_999.99;

impl ServiceForm {
    pub async fn from_multipart(mut mp: Multipart) -> Result<Self, ApiError> {
        let mut form = ServiceForm::default();
        while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                IMAGE_FIELD => {
                    let has_file_name = field.file_name().is_some_and(|n| !n.is_empty());
                    let content_type = field
                        .content_type()
                        .map(str::to_string)
                        .unwrap_or_else(|| "application/octet-stream".into());
                    let body = field.bytes().await.map_err(bad_multipart)?;
                    // browsers send an empty part when no file was picked
                    if has_file_name || !body.is_empty() {
                        form.images.push(UploadedImage { body, content_type });
                    }
                }
                "name" | "category_id" | "description" | "items" => {
                    let text = field.text().await.map_err(bad_multipart)?;
                    let slot = match name.as_str() {
                        "name" => &mut form.name,
                        "category_id" => &mut form.category_id,
                        "description" => &mut form.description,
                        _ => &mut form.items,
                    };
                    *slot = Some(text);
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
}

fn check_name(raw: &str, errors: &mut Vec<String>) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() {
        errors.push("name: service name is required".into());
        None
    } else if name.chars().count() > MAX_NAME_CHARS {
        errors.push(format!("name: must be at most {MAX_NAME_CHARS} characters"));
        None
    } else {
        Some(name.to_string())
    }
}

fn check_category(raw: &str, errors: &mut Vec<String>) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.push("category_id: a category is required".into());
        return None;
    }
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            errors.push("category_id: must be a positive integer".into());
            None
        }
    }
}

fn check_description(raw: &str, errors: &mut Vec<String>) -> Option<String> {
    if raw.chars().count() > MAX_DESCRIPTION_CHARS {
        errors.push(format!(
            "description: must be at most {MAX_DESCRIPTION_CHARS} characters"
        ));
    }
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn check_image(mut images: Vec<UploadedImage>, errors: &mut Vec<String>) -> Option<UploadedImage> {
    if images.len() > 1 {
        errors.push(format!("{IMAGE_FIELD}: only one image may be uploaded"));
        return None;
    }
    let image = images.pop()?;
    let before = errors.len();
    if !ALLOWED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
        errors.push(format!(
            "{IMAGE_FIELD}: file type must be one of {}",
            ALLOWED_IMAGE_TYPES.join(", ")
        ));
    }
    if image.body.len() > MAX_IMAGE_BYTES {
        errors.push(format!("{IMAGE_FIELD}: file must be at most 5MB"));
    }
    (errors.len() == before).then_some(image)
}

fn non_blank_str<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn numeric(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Whole cents, allowing for binary float noise.
fn has_at_most_two_decimals(p: f64) -> bool {
    let cents = p * 100.0;
    (cents - cents.round()).abs() < 1e-4
}

/// Parses the JSON-encoded `items` field.
pub fn parse_items(raw: &str, errors: &mut Vec<String>) -> Option<Vec<NewServiceItem>> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => {
            errors.push("items: must be a JSON array".into());
            return None;
        }
    };
    let Some(list) = value.as_array().filter(|l| !l.is_empty()) else {
        errors.push("items: at least one item is required".into());
        return None;
    };

    let before = errors.len();
    let mut items = Vec::with_capacity(list.len());
    for (i, item) in list.iter().enumerate() {
        let name = non_blank_str(item, "name");
        if name.is_none() {
            errors.push(format!("items[{i}].name: item name is required"));
        }

        let price = match item.get("price_per_unit") {
            None | Some(Value::Null) => {
                errors.push(format!("items[{i}].price_per_unit: price is required"));
                None
            }
            Some(v) => match numeric(v) {
                Some(p) if p > MAX_ITEM_PRICE => {
                    errors.push(format!(
                        "items[{i}].price_per_unit: must be at most {MAX_ITEM_PRICE:.2}"
                    ));
                    None
                }
                Some(p) if p >= 0.0 && !has_at_most_two_decimals(p) => {
                    errors.push(format!(
                        "items[{i}].price_per_unit: at most 2 decimal places"
                    ));
                    None
                }
                Some(p) if p >= 0.0 => Some(p),
                _ => {
                    errors.push(format!(
                        "items[{i}].price_per_unit: must be a non-negative number"
                    ));
                    None
                }
            },
        };

        let unit = non_blank_str(item, "unit");
        if unit.is_none() {
            errors.push(format!("items[{i}].unit: unit is required"));
        }

        if let (Some(name), Some(price_per_unit), Some(unit)) = (name, price, unit) {
            items.push(NewServiceItem {
                name: name.to_string(),
                price_per_unit,
                unit: unit.to_string(),
            });
        }
    }

    (errors.len() == before).then_some(items)
}

pub fn validate_create(form: ServiceForm) -> Result<NewService, Vec<String>> {
    let mut errors = Vec::new();

    let name = match form.name.as_deref() {
        Some(raw) => check_name(raw, &mut errors),
        None => {
            errors.push("name: service name is required".into());
            None
        }
    };

    let category_id = check_category(form.category_id.as_deref().unwrap_or(""), &mut errors);

    let image = if form.images.is_empty() {
        errors.push(format!("{IMAGE_FIELD}: an image is required"));
        None
    } else {
        check_image(form.images, &mut errors)
    };

    let description = form
        .description
        .as_deref()
        .and_then(|d| check_description(d, &mut errors));

    let items = match form.items.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => parse_items(raw, &mut errors),
        None => {
            errors.push("items: at least one item is required".into());
            None
        }
    };

    match (name, category_id, image, items) {
        (Some(name), Some(category_id), Some(image), Some(items)) if errors.is_empty() => {
            Ok(NewService {
                name,
                category_id,
                description,
                items,
                image,
            })
        }
        _ => Err(errors),
    }
}

/// Same rules as create, applied only to the fields that were sent.
pub fn validate_update(form: ServiceForm) -> Result<ServiceChanges, Vec<String>> {
    let mut errors = Vec::new();

    let name = form.name.as_deref().and_then(|raw| check_name(raw, &mut errors));
    let category_id = form
        .category_id
        .as_deref()
        .and_then(|raw| check_category(raw, &mut errors));
    let description = form
        .description
        .as_deref()
        .map(|d| check_description(d, &mut errors));
    let image = check_image(form.images, &mut errors);
    let items = match form.items.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => parse_items(raw, &mut errors),
        None => None,
    };

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(ServiceChanges {
        name,
        category_id,
        description,
        items,
        image,
    })
}

async fn read_form<S: Send + Sync>(req: Request, state: &S) -> Result<ServiceForm, ApiError> {
    let mp = Multipart::from_request(req, state)
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    ServiceForm::from_multipart(mp).await
}

/// Multipart body of `POST /services`, already validated.
pub struct ValidatedCreateService(pub NewService);

#[async_trait]
impl<S> FromRequest<S> for ValidatedCreateService
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let form = read_form(req, state).await?;
        validate_create(form).map(Self).map_err(|errors| {
            warn!(?errors, "service create rejected");
            ApiError::Validation(errors)
        })
    }
}

/// Multipart body of `PUT /services/:id`, already validated.
pub struct ValidatedUpdateService(pub ServiceChanges);

#[async_trait]
impl<S> FromRequest<S> for ValidatedUpdateService
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let form = read_form(req, state).await?;
        validate_update(form).map(Self).map_err(|errors| {
            warn!(?errors, "service update rejected");
            ApiError::Validation(errors)
        })
    }
}
