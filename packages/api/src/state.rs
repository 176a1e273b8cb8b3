// ABOUTME: Shared application state injected into every router
// ABOUTME: Built once at startup from the database handle, catalog, and API settings

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use backstage_core::constants::{ACTIVITIES_TIMEOUT_MS, CLIENT_SYNC_TIMEOUT_MS, HEALTH_CHECK_TIMEOUT_MS};
use backstage_core::ServiceKey;
use backstage_monitoring::{
    ActivitiesProxy, ActivityStorage, ClientApi, ClientSync, HealthChecker, HealthMonitor,
    HealthStorage, ProjectStorage,
};
use backstage_pricing::Catalog;
use backstage_proposals::{Brand, ProposalService, ProposalStorage};
use backstage_storage::{Database, StorageCapabilities};
use backstage_support::{ChatStorage, CommentStorage, TicketStorage, TransitionPolicy};

/// Settings the API needs beyond the database and catalog
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Restricted key that may be handed to browsers
    pub public_key: Option<String>,
    /// When set, project credential changes must present it in `x-service-key`
    pub service_key: Option<ServiceKey>,
    pub upload_dir: PathBuf,
    /// Base for public upload URLs, without a trailing slash
    pub public_url: String,
    pub brand: Brand,
    pub transition_policy: TransitionPolicy,
    pub health_timeout: Duration,
    pub activities_timeout: Duration,
    pub sync_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            public_key: None,
            service_key: None,
            upload_dir: backstage_core::default_upload_dir(),
            public_url: "http://localhost:4010".to_string(),
            brand: Brand::default(),
            transition_policy: TransitionPolicy::default(),
            health_timeout: Duration::from_millis(HEALTH_CHECK_TIMEOUT_MS),
            activities_timeout: Duration::from_millis(ACTIVITIES_TIMEOUT_MS),
            sync_timeout: Duration::from_millis(CLIENT_SYNC_TIMEOUT_MS),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub capabilities: StorageCapabilities,
    pub catalog: Arc<Catalog>,
    pub tickets: Arc<TicketStorage>,
    pub comments: Arc<CommentStorage>,
    pub chat: Arc<ChatStorage>,
    pub proposals: Arc<ProposalService>,
    pub projects: Arc<ProjectStorage>,
    pub health: Arc<HealthMonitor>,
    pub sync: Arc<ClientSync>,
    pub activities_proxy: Arc<ActivitiesProxy>,
    pub activities: Arc<ActivityStorage>,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    pub fn new(db: &Database, catalog: Arc<Catalog>, settings: ApiSettings) -> Self {
        let pool = db.pool.clone();
        let http = reqwest::Client::new();
        let client_api = ClientApi::new(http.clone());

        Self {
            capabilities: db.capabilities,
            catalog: catalog.clone(),
            tickets: Arc::new(TicketStorage::new(pool.clone())),
            comments: Arc::new(CommentStorage::new(pool.clone())),
            chat: Arc::new(ChatStorage::new(pool.clone(), db.capabilities)),
            proposals: Arc::new(ProposalService::new(
                catalog,
                settings.brand.clone(),
                ProposalStorage::new(pool.clone()),
            )),
            projects: Arc::new(ProjectStorage::new(pool.clone())),
            health: Arc::new(HealthMonitor::new(
                HealthChecker::new(http, settings.health_timeout),
                HealthStorage::new(pool.clone()),
            )),
            sync: Arc::new(ClientSync::new(
                client_api.clone(),
                settings.sync_timeout,
                pool.clone(),
            )),
            activities_proxy: Arc::new(ActivitiesProxy::new(
                client_api,
                settings.activities_timeout,
            )),
            activities: Arc::new(ActivityStorage::new(pool)),
            settings: Arc::new(settings),
        }
    }
}
