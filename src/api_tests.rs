//! End-to-end tests through the axum router.
//!
//! Tests without a database use `AppState::fake()`: every request they make is
//! answered before a connection is needed. The rest run with `#[sqlx::test]`
//! against the crate migrations.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use crate::{
    app::build_app,
    state::{fakes, AppState},
};

const BOUNDARY: &str = "homefix-test-boundary";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

struct Part<'a> {
    name: &'a str,
    value: &'a [u8],
    file: Option<(&'a str, &'a str)>, // (file name, content type)
}

fn text<'a>(name: &'a str, value: &'a str) -> Part<'a> {
    Part {
        name,
        value: value.as_bytes(),
        file: None,
    }
}

fn image<'a>(bytes: &'a [u8]) -> Part<'a> {
    Part {
        name: "imageFile",
        value: bytes,
        file: Some(("clean.png", "image/png")),
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file {
            Some((file_name, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        part.name, file_name, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.value);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(method: &str, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

const ONE_ITEM: &str = r#"[{"name":"ทำความสะอาด 1 ชม.","price_per_unit":300,"unit":"ชั่วโมง"}]"#;

// ---- no database needed ----

#[tokio::test]
async fn hello_world() {
    let app = build_app(AppState::fake());
    let (status, body) = send(&app, get("/test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Hello World!" }));
}

#[tokio::test]
async fn create_service_with_empty_items_is_rejected() {
    let app = build_app(AppState::fake());
    let req = multipart_request(
        "POST",
        "/api/services",
        &[text("name", "ทำความสะอาดบ้าน"), text("category_id", "1"), text("items", "[]"), image(PNG)],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"], json!(["items: at least one item is required"]));
}

#[tokio::test]
async fn create_service_without_image_is_rejected() {
    let app = build_app(AppState::fake());
    let req = multipart_request(
        "POST",
        "/api/services",
        &[text("name", "ทำความสะอาดบ้าน"), text("category_id", "1"), text("items", ONE_ITEM)],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["imageFile: an image is required"]));
}

#[tokio::test]
async fn create_service_reports_all_errors() {
    let app = build_app(AppState::fake());
    let req = multipart_request("POST", "/api/services", &[text("category_id", "abc")]);
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn out_of_range_item_price_is_a_validation_error() {
    let app = build_app(AppState::fake());
    let req = multipart_request(
        "POST",
        "/api/services",
        &[
            text("name", "ทำความสะอาดบ้าน"),
            text("category_id", "1"),
            text("items", r#"[{"name":"x","price_per_unit":100000000,"unit":"u"}]"#),
            image(PNG),
        ],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"],
        json!(["items[0].price_per_unit: must be at most 99999999.99"])
    );
}

#[tokio::test]
async fn update_service_with_bad_items_is_rejected() {
    let app = build_app(AppState::fake());
    let req = multipart_request("PUT", "/api/services/1", &[text("items", "not json")]);
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["items: must be a JSON array"]));
}

#[tokio::test]
async fn non_numeric_price_bound_is_rejected() {
    let app = build_app(AppState::fake());
    let (status, body) = send(&app, get("/api/services?min_price=cheap")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["min_price: must be a number"]));
}

#[tokio::test]
async fn malformed_ids_are_rejected() {
    let app = build_app(AppState::fake());
    let (status, body) = send(&app, get("/api/categories/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid id" }));

    let (status, body) = send(&app, get("/api/orders/my-orders/42")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid user id" }));
}

#[tokio::test]
async fn category_without_name_is_rejected() {
    let app = build_app(AppState::fake());
    let (status, body) = send(&app, json_request("POST", "/api/categories", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Name is required" }));
}

#[tokio::test]
async fn register_requires_fields() {
    let app = build_app(AppState::fake());
    let (status, body) = send(
        &app,
        json_request("POST", "/api/auth/register", json!({ "email": "a@b.co" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required fields" }));

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            json!({ "email": "not-an-email", "username": "u", "password": "p" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid email" }));
}

#[tokio::test]
async fn oauth_redirects_to_provider() {
    let app = build_app(AppState::fake());
    for provider in ["google", "facebook"] {
        let resp = app
            .clone()
            .oneshot(get(&format!("/api/auth/oauth/{provider}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://fake.local/auth/v1/authorize?"));
        assert!(location.contains(&format!("provider={provider}")));
        assert!(location.contains("redirect_to=http%3A%2F%2Flocalhost%3A5173%2Fauth%2Fcallback"));
    }
}

// ---- database backed ----

fn app_with(db: PgPool) -> (Router, Arc<fakes::FakeStorage>) {
    let storage = Arc::new(fakes::FakeStorage::default());
    (build_app(fakes::with_pool(db, storage.clone())), storage)
}

async fn count(db: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db)
        .await
        .unwrap()
}

async fn seed_category(db: &PgPool, name: &str) -> i32 {
    sqlx::query_scalar::<_, i32>("INSERT INTO categories (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(db)
        .await
        .unwrap()
}

/// Service with one item per price, created at the given instant.
async fn seed_service(db: &PgPool, name: &str, category_id: i32, created_at: &str, prices: &[f64]) -> i32 {
    let id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO services (name, category_id, image_url, created_at) \
         VALUES ($1, $2, 'https://fake.local/x.png', $3::timestamptz) RETURNING id",
    )
    .bind(name)
    .bind(category_id)
    .bind(created_at)
    .fetch_one(db)
    .await
    .unwrap();
    for price in prices {
        sqlx::query(
            "INSERT INTO service_items (service_id, name, price_per_unit, unit) VALUES ($1, 'item', $2::numeric, 'unit')",
        )
        .bind(id)
        .bind(*price)
        .execute(db)
        .await
        .unwrap();
    }
    id
}

async fn seed_reviews(db: &PgPool, service_id: i32, ratings: &[i32]) {
    for rating in ratings {
        sqlx::query("INSERT INTO reviews (service_id, rating) VALUES ($1, $2)")
            .bind(service_id)
            .bind(*rating)
            .execute(db)
            .await
            .unwrap();
    }
}

fn names(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap().to_string())
        .collect()
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn category_round_trip(db: PgPool) {
    let (app, _) = app_with(db);
    let (status, created) = send(
        &app,
        json_request("POST", "/api/categories", json!({ "name": "ล้างแอร์" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = send(&app, get(&format!("/api/categories/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "ล้างแอร์");

    let (status, updated) = send(
        &app,
        json_request("PUT", &format!("/api/categories/{id}"), json!({ "name": "ซ่อมแอร์" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "ซ่อมแอร์");

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/categories/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Category deleted successfully" }));
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn missing_category_is_404(db: PgPool) {
    let (app, _) = app_with(db);
    let (status, body) = send(&app, get("/api/categories/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Category not found" }));
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn create_service_example(db: PgPool) {
    let category_id = seed_category(&db, "cleaning").await;
    let (app, storage) = app_with(db.clone());
    let category = category_id.to_string();
    let req = multipart_request(
        "POST",
        "/api/services",
        &[
            text("name", "ทำความสะอาดบ้าน"),
            text("category_id", &category),
            text("items", ONE_ITEM),
            image(PNG),
        ],
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_i64().unwrap() > 0);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["price_per_unit"], json!(300.0));
    assert_eq!(storage.uploaded().len(), 1);

    let id = body["id"].as_i64().unwrap();
    let (status, fetched) = send(&app, get(&format!("/api/services/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["category_name"], "cleaning");
    assert_eq!(fetched["items"][0]["unit"], "ชั่วโมง");
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn rejected_create_writes_nothing(db: PgPool) {
    let category_id = seed_category(&db, "cleaning").await;
    let (app, storage) = app_with(db.clone());
    let category = category_id.to_string();

    let empty_items = multipart_request(
        "POST",
        "/api/services",
        &[text("name", "x"), text("category_id", &category), text("items", "[]"), image(PNG)],
    );
    assert_eq!(send(&app, empty_items).await.0, StatusCode::BAD_REQUEST);

    let no_image = multipart_request(
        "POST",
        "/api/services",
        &[text("name", "x"), text("category_id", &category), text("items", ONE_ITEM)],
    );
    assert_eq!(send(&app, no_image).await.0, StatusCode::BAD_REQUEST);

    assert_eq!(count(&db, "services").await, 0);
    assert!(storage.uploaded().is_empty());
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn category_filter_only_returns_that_category(db: PgPool) {
    let a = seed_category(&db, "a").await;
    let b = seed_category(&db, "b").await;
    seed_service(&db, "a1", a, "2025-01-01T00:00:00Z", &[100.0]).await;
    seed_service(&db, "b1", b, "2025-01-02T00:00:00Z", &[200.0]).await;
    seed_service(&db, "a2", a, "2025-01-03T00:00:00Z", &[300.0]).await;
    let (app, _) = app_with(db);

    let (status, body) = send(&app, get(&format!("/api/services?category_id={a}"))).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["category_id"] == json!(a)));
    assert!(rows.iter().all(|r| r["category_name"] == "a"));
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn sorting_and_fallbacks(db: PgPool) {
    let c = seed_category(&db, "c").await;
    seed_service(&db, "beta", c, "2025-01-02T00:00:00Z", &[50.0, 500.0]).await;
    seed_service(&db, "alpha", c, "2025-01-03T00:00:00Z", &[300.0]).await;
    seed_service(&db, "gamma", c, "2025-01-01T00:00:00Z", &[100.0]).await;
    let (app, _) = app_with(db);

    let (_, body) = send(&app, get("/api/services?sort_by=bogus")).await;
    assert_eq!(names(&body), ["gamma", "beta", "alpha"]);

    let (_, body) = send(&app, get("/api/services?sort_by=bogus&order=desc")).await;
    assert_eq!(names(&body), ["alpha", "beta", "gamma"]);

    let (_, body) = send(&app, get("/api/services?sort_by=name&order=sideways")).await;
    assert_eq!(names(&body), ["alpha", "beta", "gamma"]);

    let (_, body) = send(&app, get("/api/services?sort_by=price&order=DESC")).await;
    assert_eq!(names(&body), ["alpha", "gamma", "beta"]);
    assert_eq!(body[2]["min_price"], json!(50.0));
    assert_eq!(body[2]["max_price"], json!(500.0));

    let (_, body) = send(&app, get("/api/services?min_price=60&max_price=200")).await;
    assert_eq!(names(&body), ["gamma"]);

    let (_, body) = send(&app, get("/api/services?search=ALP")).await;
    assert_eq!(names(&body), ["alpha"]);
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn recommended_excludes_low_ratings(db: PgPool) {
    let c = seed_category(&db, "c").await;
    let good = seed_service(&db, "good", c, "2025-01-01T00:00:00Z", &[100.0]).await;
    let best = seed_service(&db, "best", c, "2025-01-02T00:00:00Z", &[100.0]).await;
    let meh = seed_service(&db, "meh", c, "2025-01-03T00:00:00Z", &[100.0]).await;
    seed_service(&db, "unrated", c, "2025-01-04T00:00:00Z", &[100.0]).await;
    seed_reviews(&db, good, &[4, 4]).await;
    seed_reviews(&db, best, &[5, 5, 4]).await;
    seed_reviews(&db, meh, &[5, 2]).await;
    let (app, _) = app_with(db);

    let (status, body) = send(&app, get("/api/services?filter=recommended&sort_by=name")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), ["best", "good"]);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["avg_rating"].as_f64().unwrap() >= 4.0));
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn my_orders_are_reshaped(db: PgPool) {
    let c = seed_category(&db, "c").await;
    let service = seed_service(&db, "ล้างแอร์", c, "2025-01-01T00:00:00Z", &[500.0]).await;
    let user = uuid::Uuid::new_v4();
    let order_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO orders (user_id, status, net_price, created_at) \
         VALUES ($1, 'pending', 1500, '2025-01-01T00:00:00Z') RETURNING id",
    )
    .bind(user)
    .fetch_one(&db)
    .await
    .unwrap();
    sqlx::query("INSERT INTO order_items (order_id, service_id) VALUES ($1, $2), ($1, NULL)")
        .bind(order_id)
        .bind(service)
        .execute(&db)
        .await
        .unwrap();
    let (app, _) = app_with(db);

    let (status, body) = send(&app, get(&format!("/api/orders/my-orders/{user}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "id": format!("AD{:08}", order_id),
            "status": "pending",
            "date": "01/01/2568 07:00 น.",
            "worker": "รอการจัดสรรช่าง",
            "price": "1,500.00",
            "details": ["ล้างแอร์"],
        }])
    );
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn delete_service_removes_rows(db: PgPool) {
    let c = seed_category(&db, "c").await;
    let id = seed_service(&db, "x", c, "2025-01-01T00:00:00Z", &[1.0, 2.0]).await;
    let (app, _) = app_with(db.clone());

    let del = |id: i32| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/services/{id}"))
            .body(Body::empty())
            .unwrap()
    };
    let (status, body) = send(&app, del(id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Service deleted successfully" }));
    assert_eq!(count(&db, "services").await, 0);
    assert_eq!(count(&db, "service_items").await, 0);

    let (status, body) = send(&app, del(id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Service not found" }));
}
