//! Application state.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use jobmart_firestore::{
    with_deadline, ApplicantRepository, DocumentStore, FirestoreClient, JobRepository,
    MemoryStore, RepoResult,
};
use jobmart_models::RequirementCatalogue;

use crate::auth::{JwksCache, TokenVerifier};
use crate::config::{ApiConfig, StoreBackend};
use crate::error::ApiResult;
use crate::services::AccountService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn DocumentStore>,
    pub catalogue: Arc<RequirementCatalogue>,
    pub jobs: JobRepository,
    pub applicants: ApplicantRepository,
    pub accounts: AccountService,
    pub auth: Arc<dyn TokenVerifier>,
}

impl AppState {
    /// Build the state from configuration and the environment.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let catalogue = load_catalogue(&config)?;
        info!(requirements = catalogue.len(), "Loaded requirement catalogue");

        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Firestore => Arc::new(
                FirestoreClient::from_env()
                    .await
                    .context("failed to create Firestore client")?,
            ),
            StoreBackend::Memory => {
                warn!("Using the in-memory document store; data will not persist");
                Arc::new(MemoryStore::new())
            }
        };

        let project_id = std::env::var("FIREBASE_PROJECT_ID")
            .or_else(|_| std::env::var("GCP_PROJECT_ID"))
            .context("FIREBASE_PROJECT_ID or GCP_PROJECT_ID must be set for token verification")?;
        let auth = JwksCache::new(project_id)
            .await
            .context("failed to load Firebase signing keys")?;

        Ok(Self::from_parts(config, store, Arc::new(catalogue), Arc::new(auth)))
    }

    /// Wire the repositories over an already-built store and verifier.
    pub fn from_parts(
        config: ApiConfig,
        store: Arc<dyn DocumentStore>,
        catalogue: Arc<RequirementCatalogue>,
        auth: Arc<dyn TokenVerifier>,
    ) -> Self {
        let jobs = JobRepository::new(Arc::clone(&store), Arc::clone(&catalogue));
        let applicants = ApplicantRepository::new(Arc::clone(&store), jobs.clone());
        let accounts = AccountService::new(Arc::clone(&store), config.store_timeout);
        Self {
            config,
            store,
            catalogue,
            jobs,
            applicants,
            accounts,
            auth,
        }
    }

    /// Await an engine call under the configured store deadline.
    pub async fn bounded<T, F>(&self, fut: F) -> ApiResult<T>
    where
        F: Future<Output = RepoResult<T>>,
    {
        Ok(with_deadline(self.config.store_timeout, fut).await?)
    }
}

fn load_catalogue(config: &ApiConfig) -> anyhow::Result<RequirementCatalogue> {
    match &config.requirements_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            RequirementCatalogue::from_json(&json)
                .with_context(|| format!("invalid requirement catalogue in {}", path.display()))
        }
        None => RequirementCatalogue::builtin().context("built-in requirement catalogue"),
    }
}
