// ABOUTME: Tests for the one-shot backstage commands
// ABOUTME: Offline quote rendering and single project health checks against an in-memory database

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use backstage_cli::commands::{check_project, render_offline_quote, QuoteFile};
use backstage_monitoring::{HealthReason, HealthStatus, ProjectCreateInput, ProjectStorage};
use backstage_pricing::Catalog;
use backstage_proposals::Brand;
use backstage_storage::{memory_pool, Database};

fn quote_file(cliente: &str) -> QuoteFile {
    serde_json::from_value(json!({
        "sistemaBaseId": "basico",
        "modulosIds": ["inventario"],
        "formaPagoId": "contado",
        "cliente": {"nombre": cliente, "empresa": "Ferretería Sur"},
        "notas": "Incluye capacitación"
    }))
    .unwrap()
}

#[test]
fn offline_quote_renders_a_draft_pdf() {
    let catalog = Catalog::builtin().unwrap();
    let fecha = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    let quote = render_offline_quote(&catalog, &Brand::default(), &quote_file("Camila Rojas"), fecha).unwrap();

    assert_eq!(quote.totals.total, 1_200_000);
    assert!(quote.pdf.starts_with(b"%PDF"));

    let again = render_offline_quote(&catalog, &Brand::default(), &quote_file("Camila Rojas"), fecha).unwrap();
    assert_eq!(quote.pdf, again.pdf);
}

#[test]
fn offline_quote_requires_a_client_name() {
    let catalog = Catalog::builtin().unwrap();
    let fecha = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    let err = render_offline_quote(&catalog, &Brand::default(), &quote_file("  "), fecha).unwrap_err();
    assert!(err.to_string().contains("cliente.nombre"));
}

#[test]
fn offline_quote_rejects_unknown_catalog_ids() {
    let catalog = Catalog::builtin().unwrap();
    let fecha = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    let mut file = quote_file("Camila Rojas");
    file.request.sistema_base_id = "inexistente".to_string();

    assert!(render_offline_quote(&catalog, &Brand::default(), &file, fecha).is_err());
}

#[test]
fn offline_quote_tolerates_missing_avatar() {
    let dir = TempDir::new().unwrap();
    let brand = Brand {
        avatar_path: Some(dir.path().join("missing.jpg")),
        ..Brand::default()
    };
    let catalog = Catalog::builtin().unwrap();
    let fecha = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    assert!(render_offline_quote(&catalog, &brand, &quote_file("Camila Rojas"), fecha).is_ok());
}

async fn database() -> Database {
    Database::from_pool(memory_pool().await.unwrap()).await.unwrap()
}

async fn project(db: &Database, url: Option<String>) -> String {
    ProjectStorage::new(db.pool.clone())
        .create_project(ProjectCreateInput {
            name: "Tienda Sur".to_string(),
            client_api_url: url,
            client_api_key: None,
            logo_url: None,
        })
        .await
        .unwrap()
        .id
}

async fn sample_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM project_health_checks")
        .fetch_one(&db.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn check_health_without_url_records_inactive_sample() {
    let db = database().await;
    let id = project(&db, None).await;

    let result = check_project(&db, Duration::from_secs(3), &id).await.unwrap();

    assert_eq!(result.status, HealthStatus::Inactive);
    assert_eq!(result.reason, Some(HealthReason::NoUrl));
    assert_eq!(sample_count(&db).await, 1);
}

#[tokio::test]
async fn check_health_reports_active_deployment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let db = database().await;
    let id = project(&db, Some(server.uri())).await;

    let result = check_project(&db, Duration::from_secs(3), &id).await.unwrap();
    assert_eq!(result.status, HealthStatus::Active);
    assert_eq!(sample_count(&db).await, 1);
}

#[tokio::test]
async fn check_health_for_unknown_project_fails() {
    let db = database().await;
    assert!(check_project(&db, Duration::from_secs(3), "proj-missing").await.is_err());
    assert_eq!(sample_count(&db).await, 0);
}
