// ABOUTME: Tenant project monitoring for Backstage
// ABOUTME: Projects, health checks and polling, client-data sync, activities, and telemetry

pub mod activities;
pub mod client;
pub mod health;
pub mod poller;
pub mod projects;
pub mod sync;

pub use activities::{Activity, ActivitiesProxy, ActivityStorage, TelemetryEvent};
pub use client::{ClientApi, ClientApiError, ClientEndpoint};
pub use health::{
    HealthCheckResult, HealthChecker, HealthMonitor, HealthReason, HealthSample, HealthStatus,
    HealthStorage,
};
pub use poller::{poll_once, HealthPoller, PollerError};
pub use projects::{validate_http_url, Project, ProjectCreateInput, ProjectStorage};
pub use sync::{ClientDataPayload, ClientSync, SyncCredentials, SyncError, SyncOutcome};
