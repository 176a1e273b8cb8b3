// ABOUTME: Client-data synchronization from a tenant deployment into the central store
// ABOUTME: Validates the remote payload, then upserts stores and users by natural key

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use backstage_core::generate_id;
use backstage_storage::StorageError;

use crate::client::{ClientApi, ClientApiError, ClientEndpoint};
use crate::projects::{write_project_metadata, ProjectStorage, SyncMetadata};

pub const CLIENT_DATA_PATH: &str = "/api/backstage/client-data";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] ClientApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Credentials supplied with a sync request; missing values fall back to the project's
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncCredentials {
    pub client_api_url: Option<String>,
    pub client_api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub users_synced: usize,
    pub stores_synced: usize,
    pub owner_set: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteStore {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "logoUrl")]
    pub logo_url: Option<String>,
    #[serde(default, alias = "isMain")]
    pub is_main: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    #[serde(default)]
    pub id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "isOwner")]
    pub is_owner: bool,
}

/// Response body of the client-data endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientDataPayload {
    #[serde(default)]
    pub stores: Vec<RemoteStore>,
    #[serde(default)]
    pub users: Vec<RemoteUser>,
    #[serde(default, alias = "mainStoreId")]
    pub main_store_id: Option<String>,
    #[serde(default, alias = "logoUrl")]
    pub logo_url: Option<String>,
}

impl ClientDataPayload {
    /// Schema checks applied before anything is written
    pub fn validate(&self) -> Result<(), String> {
        let mut store_ids = HashSet::new();
        for (i, store) in self.stores.iter().enumerate() {
            if store.id.trim().is_empty() {
                return Err(format!("stores[{}].id is empty", i));
            }
            if store.name.trim().is_empty() {
                return Err(format!("stores[{}].name is empty", i));
            }
            if !store_ids.insert(store.id.trim()) {
                return Err(format!("duplicate store id '{}'", store.id.trim()));
            }
        }

        let mut emails = HashSet::new();
        for (i, user) in self.users.iter().enumerate() {
            let email = user.email.trim().to_lowercase();
            let well_formed = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
            if !well_formed {
                return Err(format!("users[{}].email '{}' is not an email", i, user.email));
            }
            if !emails.insert(email.clone()) {
                return Err(format!("duplicate user email '{}'", email));
            }
        }
        Ok(())
    }

    /// The single flagged owner, if exactly one user carries the flag
    fn owner(&self) -> Option<&RemoteUser> {
        let mut owners = self.users.iter().filter(|u| u.is_owner);
        match (owners.next(), owners.next()) {
            (Some(owner), None) => Some(owner),
            _ => None,
        }
    }

    fn main_store(&self) -> Option<&RemoteStore> {
        match self.main_store_id.as_deref().map(str::trim) {
            Some(id) => self.stores.iter().find(|s| s.id.trim() == id),
            None => self.stores.iter().find(|s| s.is_main),
        }
    }
}

pub struct ClientSync {
    api: ClientApi,
    timeout: Duration,
    pool: SqlitePool,
}

impl ClientSync {
    pub fn new(api: ClientApi, timeout: Duration, pool: SqlitePool) -> Self {
        Self { api, timeout, pool }
    }

    /// Pull users and stores from the project's deployment. Replaying the same
    /// payload leaves the store unchanged apart from sync timestamps.
    pub async fn sync(
        &self,
        project_id: &str,
        credentials: SyncCredentials,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome, SyncError> {
        let project = ProjectStorage::new(self.pool.clone())
            .get_project(project_id)
            .await?;

        let url = credentials
            .client_api_url
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .or(project.client_api_url.as_deref());
        let key = credentials
            .client_api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .or(project.client_api_key.as_deref());
        let endpoint = ClientEndpoint::resolve(url, key)?;

        let body = self
            .api
            .get(&endpoint, CLIENT_DATA_PATH, self.timeout, cancel)
            .await?;
        let payload: ClientDataPayload = serde_json::from_slice(&body)
            .map_err(|e| ClientApiError::InvalidPayload(e.to_string()))?;
        payload.validate().map_err(ClientApiError::InvalidPayload)?;

        debug!(
            project_id,
            stores = payload.stores.len(),
            users = payload.users.len(),
            "Client data received"
        );

        let outcome = self
            .persist(project_id, &endpoint, &payload, credentials)
            .await?;

        info!(
            project_id,
            users_synced = outcome.users_synced,
            stores_synced = outcome.stores_synced,
            owner_set = outcome.owner_set,
            "Client data synchronized"
        );
        Ok(outcome)
    }

    async fn persist(
        &self,
        project_id: &str,
        endpoint: &ClientEndpoint,
        payload: &ClientDataPayload,
        credentials: SyncCredentials,
    ) -> Result<SyncOutcome, StorageError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        for store in &payload.stores {
            sqlx::query(
                r#"
                INSERT INTO synced_stores (
                    id, project_id, external_id, name, address, logo_url, is_main, synced_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(project_id, external_id) DO UPDATE SET
                    name = excluded.name,
                    address = excluded.address,
                    logo_url = excluded.logo_url,
                    is_main = excluded.is_main,
                    synced_at = excluded.synced_at
                "#,
            )
            .bind(generate_id("store"))
            .bind(project_id)
            .bind(store.id.trim())
            .bind(store.name.trim())
            .bind(store.address.as_deref())
            .bind(store.logo_url.as_deref().and_then(|l| endpoint.resolve_asset(l)))
            .bind(store.is_main)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;
        }

        for user in &payload.users {
            sqlx::query(
                r#"
                INSERT INTO synced_users (
                    id, project_id, external_id, email, name, role, is_owner, synced_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(project_id, email) DO UPDATE SET
                    external_id = excluded.external_id,
                    name = excluded.name,
                    role = excluded.role,
                    is_owner = excluded.is_owner,
                    synced_at = excluded.synced_at
                "#,
            )
            .bind(generate_id("user"))
            .bind(project_id)
            .bind(user.id.as_deref())
            .bind(user.email.trim().to_lowercase())
            .bind(user.name.as_deref())
            .bind(user.role.as_deref())
            .bind(user.is_owner)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Sqlx)?;
        }

        let owner = payload.owner().map(|u| {
            let email = u.email.trim().to_lowercase();
            let name = u
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| email.clone());
            (name, email)
        });
        let main_store = payload.main_store();
        let logo_url = payload
            .logo_url
            .as_deref()
            .and_then(|l| endpoint.resolve_asset(l))
            .or_else(|| {
                main_store
                    .and_then(|s| s.logo_url.as_deref())
                    .and_then(|l| endpoint.resolve_asset(l))
            });

        let metadata = SyncMetadata {
            owner: owner.clone(),
            main_store_id: main_store.map(|s| s.id.trim().to_string()),
            logo_url,
            client_api_url: credentials.client_api_url,
            client_api_key: credentials.client_api_key,
        };
        write_project_metadata(&mut tx, project_id, &metadata, Some(now)).await?;

        tx.commit().await.map_err(StorageError::Sqlx)?;

        Ok(SyncOutcome {
            users_synced: payload.users.len(),
            stores_synced: payload.stores.len(),
            owner_set: owner.is_some(),
        })
    }
}
