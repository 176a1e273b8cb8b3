// ABOUTME: End-to-end tests driving the full router with oneshot requests
// ABOUTME: Covers tickets, health checks, quotes, uploads, chat degradation, telemetry, and sync errors

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use backstage_api::{create_router, ApiSettings, AppState};
use backstage_core::ServiceKey;
use backstage_pricing::Catalog;
use backstage_storage::{memory_pool, Database};

struct TestApp {
    router: Router,
    pool: SqlitePool,
    uploads: TempDir,
}

async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

async fn setup_with(prepare: impl FnOnce(&mut ApiSettings)) -> TestApp {
    let pool = memory_pool().await.unwrap();
    build(pool, prepare).await
}

async fn build(pool: SqlitePool, prepare: impl FnOnce(&mut ApiSettings)) -> TestApp {
    let uploads = TempDir::new().unwrap();
    let mut settings = ApiSettings {
        upload_dir: uploads.path().to_path_buf(),
        public_url: "http://localhost:4010".to_string(),
        ..Default::default()
    };
    prepare(&mut settings);

    let db = Database::from_pool(pool.clone()).await.unwrap();
    let state = AppState::new(&db, Arc::new(Catalog::builtin().unwrap()), settings);

    TestApp {
        router: create_router(state),
        pool,
        uploads,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let (status, bytes) = send(app, builder.body(body).unwrap()).await;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

fn ticket_body(descripcion: &str) -> Value {
    json!({
        "titulo": "No puedo emitir boletas",
        "descripcion": descripcion,
        "creado_por_nombre": "Marta",
        "creado_por_email": "marta@tienda.cl"
    })
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let app = setup().await;
    let (status, body) = send_json(&app, "GET", "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn config_never_exposes_service_key() {
    let app = setup_with(|s| s.public_key = Some("pk_public".to_string())).await;
    let (status, body) = send_json(&app, "GET", "/api/config", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["public_key"], "pk_public");
    assert_eq!(body["data"]["chat_transcripts"], true);
    assert!(body["data"].get("service_key").is_none());
}

#[tokio::test]
async fn ticket_with_empty_description_is_rejected_without_a_row() {
    let app = setup().await;
    send_json(&app, "POST", "/api/tickets", Some(ticket_body("Detalle"))).await;
    let (_, before) = send_json(&app, "GET", "/api/tickets", None).await;

    let (status, body) = send_json(&app, "POST", "/api/tickets", Some(ticket_body(""))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("descripcion"));

    let (_, after) = send_json(&app, "GET", "/api/tickets", None).await;
    assert_eq!(
        before["data"].as_array().unwrap().len(),
        after["data"].as_array().unwrap().len()
    );
    assert_eq!(count(&app.pool, "tickets").await, 1);
}

#[tokio::test]
async fn ticket_for_unknown_project_is_rejected() {
    let app = setup().await;
    let mut body = ticket_body("Detalle");
    body["proyecto_id"] = json!("proj-missing");

    let (status, response) = send_json(&app, "POST", "/api/tickets", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
    assert!(response["error"]["message"].as_str().unwrap().contains("proyecto_id"));
    assert_eq!(count(&app.pool, "tickets").await, 0);
}

#[tokio::test]
async fn ticket_lifecycle_with_comments() {
    let app = setup().await;
    let (status, created) = send_json(&app, "POST", "/api/tickets", Some(ticket_body("Detalle"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["numero"], 1);
    assert_eq!(created["data"]["estado"], "created");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, updated) = send_json(
        &app,
        "PATCH",
        &format!("/api/tickets/{}", id),
        Some(json!({"estado": "testing", "prioridad": "urgent"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["estado"], "testing");
    assert_eq!(updated["data"]["prioridad"], "urgent");

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/tickets/{}/comments", id),
        Some(json!({"mensaje": "Estamos revisando", "autor_nombre": "Soporte", "es_admin": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, comments) =
        send_json(&app, "GET", &format!("/api/tickets/{}/comments", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments["data"][0]["es_admin"], true);

    let (status, filtered) =
        send_json(&app, "GET", "/api/tickets?email=marta@tienda.cl&estado=testing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn comment_on_missing_ticket_is_404() {
    let app = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/tickets/tkt-missing/comments",
        Some(json!({"mensaje": "Hola", "autor_nombre": "Marta", "es_admin": false})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn strict_policy_rejects_backward_transition() {
    let app = setup_with(|s| s.transition_policy = backstage_support::TransitionPolicy::Forward).await;
    let (_, created) = send_json(&app, "POST", "/api/tickets", Some(ticket_body("Detalle"))).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/tickets/{}", id);

    let (_, fresh) = send_json(&app, "GET", &uri, None).await;
    assert_eq!(
        fresh["data"]["transiciones_permitidas"],
        json!(["replicating", "adjusting", "testing", "deploying", "resolved"])
    );

    let (status, moved) = send_json(&app, "PATCH", &uri, Some(json!({"estado": "deploying"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["data"]["transiciones_permitidas"], json!(["resolved"]));
    let (status, _) = send_json(&app, "PATCH", &uri, Some(json!({"estado": "adjusting"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn project_without_url_reports_no_url_and_records_one_sample() {
    let app = setup().await;
    let (status, created) = send_json(
        &app,
        "POST",
        "/api/backstage/projects",
        Some(json!({"name": "Tienda Sin URL"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["data"].get("client_api_key").is_none());
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/backstage/projects/{}/health", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"status": "inactive", "reason": "no_url", "latency_ms": null})
    );
    assert_eq!(count(&app.pool, "project_health_checks").await, 1);

    let (_, overview) = send_json(&app, "GET", "/api/backstage/projects", None).await;
    assert_eq!(overview["data"][0]["latest_health"]["reason"], "no_url");
}

#[tokio::test]
async fn sync_config_update_reports_key_presence_without_exposing_it() {
    let app = setup().await;
    let (_, created) = send_json(
        &app,
        "POST",
        "/api/backstage/projects",
        Some(json!({"name": "Tienda Sur", "client_api_url": "https://sur.example.cl"})),
    )
    .await;
    assert_eq!(created["data"]["has_client_api_key"], false);
    let uri = format!("/api/backstage/projects/{}", created["data"]["id"].as_str().unwrap());

    let (status, updated) =
        send_json(&app, "PATCH", &uri, Some(json!({"client_api_key": "sk-tienda"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["has_client_api_key"], true);
    assert_eq!(updated["data"]["client_api_url"], "https://sur.example.cl");
    assert!(updated["data"].get("client_api_key").is_none());

    let (status, _) =
        send_json(&app, "PATCH", &uri, Some(json!({"client_api_url": "ftp://sur"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send_json(&app, "PATCH", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send_json(
        &app,
        "PATCH",
        "/api/backstage/projects/proj-missing",
        Some(json!({"client_api_key": "sk"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, overview) = send_json(&app, "GET", "/api/backstage/projects", None).await;
    assert_eq!(overview["data"][0]["has_client_api_key"], true);
}

#[tokio::test]
async fn configured_service_key_guards_credential_updates() {
    let app = setup_with(|s| s.service_key = Some(ServiceKey::new("sk_admin".to_string()))).await;
    let (_, created) =
        send_json(&app, "POST", "/api/backstage/projects", Some(json!({"name": "Tienda Sur"}))).await;
    let uri = format!("/api/backstage/projects/{}", created["data"]["id"].as_str().unwrap());
    let body = json!({"client_api_key": "sk-tienda"}).to_string();

    for presented in [None, Some("sk_wrong")] {
        let mut request = Request::builder()
            .method("PATCH")
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = presented {
            request = request.header("x-service-key", key);
        }
        let (status, _) = send(&app, request.body(Body::from(body.clone())).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, bytes) = send(
        &app,
        Request::builder()
            .method("PATCH")
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-service-key", "sk_admin")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(updated["data"]["has_client_api_key"], true);
}

#[tokio::test]
async fn quote_preview_matches_catalog_prices() {
    let app = setup().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/cotizaciones/preview",
        Some(json!({
            "sistemaBaseId": "basico",
            "modulosIds": ["inventario"],
            "formaPagoId": "contado",
            "serviciosIds": []
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subtotal"], 1_200_000);
    assert_eq!(body["data"]["descuento"], 0);
    assert_eq!(body["data"]["recargo"], 0);
    assert_eq!(body["data"]["total"], 1_200_000);
}

#[tokio::test]
async fn unknown_base_system_is_rejected() {
    let app = setup().await;
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/cotizaciones/preview",
        Some(json!({"sistemaBaseId": "inexistente", "formaPagoId": "contado"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generated_quote_returns_pdf_and_rejects_invalid_state() {
    let app = setup().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/cotizaciones/generar")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "sistemaBaseId": "basico",
                "modulosIds": ["inventario"],
                "formaPagoId": "contado",
                "cliente": {"nombre": "Camila Rojas"}
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let numero = response.headers()["x-cotizacion-numero"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(numero.starts_with("COT-"));
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment"));
    let pdf = response.into_body().collect().await.unwrap().to_bytes();
    assert!(pdf.starts_with(b"%PDF"));

    let (_, list) = send_json(&app, "GET", "/api/cotizaciones", None).await;
    let id = list["data"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/cotizaciones/{}", id);

    let (status, _) = send_json(&app, "PATCH", &uri, Some(json!({"estado": "archived"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, unchanged) = send_json(&app, "GET", &uri, None).await;
    assert_eq!(unchanged["data"]["estado"], "sent");

    let (status, accepted) = send_json(&app, "PATCH", &uri, Some(json!({"estado": "accepted"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["data"]["estado"], "accepted");

    let (status, regenerated) = send(
        &app,
        Request::builder()
            .uri(format!("/api/cotizaciones/{}/pdf", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(regenerated.starts_with(b"%PDF"));
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
    let app = setup().await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/cotizaciones/generar",
        Some(json!({"sistemaBaseId": "basico", "formaPagoId": "contado"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("cliente"));
    assert!(body["request_id"].is_string());
    assert_eq!(count(&app.pool, "cotizaciones").await, 0);

    let (status, body) =
        send_json(&app, "PATCH", "/api/cotizaciones/cot-missing", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, bytes) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/tickets")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"titulo\": "))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, bytes) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/tickets")
            .body(Body::from(ticket_body("Detalle").to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

fn multipart_body(boundary: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"captura.png\"\r\n",
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

async fn upload(app: &TestApp, namespace: &str, content_type: &str, data: &[u8]) -> (StatusCode, Value) {
    let boundary = "backstage-boundary";
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/uploads/{}", namespace))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body(boundary, content_type, data)))
        .unwrap();
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

#[tokio::test]
async fn image_upload_is_stored_and_served() {
    let app = setup().await;
    let png = png_bytes(16, 9);

    let (status, body) = upload(&app, "support", "image/png", &png).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["width"], 16);
    assert_eq!(body["data"]["height"], 9);
    let path = body["data"]["path"].as_str().unwrap().to_string();
    assert!(path.starts_with("support/"));
    assert!(path.ends_with(".png"));
    assert!(body["data"]["url"]
        .as_str()
        .unwrap()
        .starts_with("http://localhost:4010/uploads/support/"));
    assert!(app.uploads.path().join(&path).exists());

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/uploads/{}", path))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert!(response.headers()[header::CONTENT_SECURITY_POLICY]
        .to_str()
        .unwrap()
        .contains("sandbox"));
    let served = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(served.to_vec(), png);
}

#[tokio::test]
async fn oversized_or_non_image_uploads_are_rejected() {
    let app = setup().await;

    let (status, _) = upload(&app, "logos", "application/pdf", b"%PDF-1.7").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let big = vec![0u8; 2 * 1024 * 1024 + 1];
    let (status, _) = upload(&app, "logos", "image/png", &big).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = upload(&app, "otros", "image/png", &png_bytes(2, 2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_content_must_match_declared_image_type() {
    let app = setup().await;

    let (status, body) = upload(&app, "support", "image/png", b"not an image at all").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = upload(&app, "support", "image/jpeg", &png_bytes(4, 4)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Valid signature, truncated header
    let (status, _) = upload(&app, "support", "image/png", b"\x89PNG\r\n\x1a\nfake-image-bytes").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(!app.uploads.path().join("support").exists());
}

#[tokio::test]
async fn svg_uploads_are_rejected() {
    let app = setup().await;
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(document.cookie)</script></svg>"#;

    let (status, body) = upload(&app, "logos", "image/svg+xml", svg).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["error"]["message"].as_str().unwrap().contains("SVG"));
    assert!(!app.uploads.path().join("logos").exists());
}

#[tokio::test]
async fn chat_degrades_when_transcripts_are_not_provisioned() {
    let pool = memory_pool().await.unwrap();
    sqlx::query("DROP TABLE chat_messages")
        .execute(&pool)
        .await
        .unwrap();
    let app = build(pool, |_| {}).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/chat/messages",
        Some(json!({"session_id": "sess-1", "role": "user", "content": "Hola"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["id"], Value::Null);

    let (status, body) = send_json(&app, "GET", "/api/chat/sess-1/messages", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn telemetry_requires_a_known_key_and_event_type() {
    let app = setup().await;
    let (_, created) = send_json(
        &app,
        "POST",
        "/api/backstage/projects",
        Some(json!({"name": "Tienda"})),
    )
    .await;
    let project_id = created["data"]["id"].as_str().unwrap().to_string();
    let key = created["data"]["telemetry_api_key"].as_str().unwrap().to_string();

    let ingest = |key: &str, body: Value| {
        Request::builder()
            .method("POST")
            .uri("/v1/telemetry")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", key)
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let (status, _) = send(&app, ingest("bsk_unknown", json!({"event_type": "sale.created"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, ingest(&key, json!({"description": "sin tipo"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        ingest(&key, json!({"event_type": "sale.created", "user_email": "Cajero@Tienda.cl"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, events) = send_json(
        &app,
        "GET",
        &format!("/api/backstage/projects/{}/telemetry", project_id),
        None,
    )
    .await;
    assert_eq!(events["data"][0]["event_type"], "sale.created");
    assert_eq!(events["data"][0]["user_email"], "cajero@tienda.cl");
}

#[tokio::test]
async fn sync_maps_rejected_key_to_401() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let app = setup().await;
    let (_, created) = send_json(
        &app,
        "POST",
        "/api/backstage/projects",
        Some(json!({"name": "Tienda", "client_api_url": server.uri(), "client_api_key": "wrong"})),
    )
    .await;
    let project_id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/store/sync-client-data",
        Some(json!({"project_id": project_id})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "CLIENT_API_UNAUTHORIZED");
}

#[tokio::test]
async fn sync_without_key_is_a_configuration_error() {
    let app = setup().await;
    let (_, created) = send_json(
        &app,
        "POST",
        "/api/backstage/projects",
        Some(json!({"name": "Tienda", "client_api_url": "http://127.0.0.1:9"})),
    )
    .await;
    let project_id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/store/sync-client-data",
        Some(json!({"project_id": project_id})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CLIENT_API_NOT_CONFIGURED");
}
