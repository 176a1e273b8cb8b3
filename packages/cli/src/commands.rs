// ABOUTME: One-shot commands: offline quote rendering and a single project health check
// ABOUTME: Reuse the same pricing, rendering, and monitoring code paths as the server

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use backstage_core::constants::PROPOSAL_VALIDITY_DAYS;
use backstage_monitoring::{HealthCheckResult, HealthChecker, HealthMonitor, HealthStorage, ProjectStorage};
use backstage_pricing::{compute_quote, Catalog, QuoteRequest, QuoteTotals};
use backstage_proposals::{render_proposal, Brand, ClientInfo, ProposalDocument};
use backstage_storage::Database;

use crate::config::Config;
use crate::server::load_catalog;

/// Number printed on proposals rendered outside the server
pub const DRAFT_NUMBER: &str = "BORRADOR";

/// Request file accepted by `backstage quote`
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteFile {
    #[serde(flatten)]
    pub request: QuoteRequest,
    pub cliente: ClientInfo,
    #[serde(default)]
    pub notas: Option<String>,
}

#[derive(Debug)]
pub struct OfflineQuote {
    pub totals: QuoteTotals,
    pub pdf: Vec<u8>,
}

/// Price and render without touching storage
pub fn render_offline_quote(
    catalog: &Catalog,
    brand: &Brand,
    file: &QuoteFile,
    fecha: NaiveDate,
) -> anyhow::Result<OfflineQuote> {
    if file.cliente.nombre.trim().is_empty() {
        anyhow::bail!("cliente.nombre is required");
    }

    let totals = compute_quote(catalog, &file.request)?;
    let doc = ProposalDocument {
        numero: DRAFT_NUMBER,
        fecha,
        validez_dias: PROPOSAL_VALIDITY_DAYS,
        cliente: &file.cliente,
        totals: &totals,
        notas: file.notas.as_deref(),
    };
    let pdf = render_proposal(&doc, brand).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(OfflineQuote { totals, pdf })
}

pub async fn run_quote(config: &Config, request_path: &Path, out: &Path) -> anyhow::Result<QuoteTotals> {
    let raw = tokio::fs::read_to_string(request_path)
        .await
        .with_context(|| format!("Failed to read {}", request_path.display()))?;
    let file: QuoteFile = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid quote request in {}", request_path.display()))?;

    let catalog = load_catalog(config)?;
    let today = chrono::Local::now().date_naive();
    let quote = render_offline_quote(&catalog, &config.brand(), &file, today)?;

    tokio::fs::write(out, &quote.pdf)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;
    Ok(quote.totals)
}

/// Check one project and store the sample
pub async fn check_project(
    db: &Database,
    timeout: Duration,
    project_id: &str,
) -> anyhow::Result<HealthCheckResult> {
    let projects = ProjectStorage::new(db.pool.clone());
    let project = projects.get_project(project_id).await?;

    let monitor = HealthMonitor::new(
        HealthChecker::new(reqwest::Client::new(), timeout),
        HealthStorage::new(db.pool.clone()),
    );
    Ok(monitor
        .check_and_record(&project, &CancellationToken::new())
        .await)
}

pub async fn run_check_health(config: &Config, project_id: &str) -> anyhow::Result<HealthCheckResult> {
    let db = Database::connect(&config.storage_config())
        .await
        .context("Failed to open database")?;
    let result = check_project(&db, config.health_timeout, project_id).await;
    db.pool.close().await;
    result
}
