use std::sync::Arc;

use anyhow::Context;

use crate::auth::repo::AccountRepo;
use crate::config::{AppConfig, StoreBackend};
use crate::db::PgStore;
use crate::feedback::repo::FeedbackRepo;
use crate::memory::MemoryStore;
use crate::paytypes::repo::PaytypeRepo;
use crate::products::repo::ProductRepo;
use crate::transactions::{repo::TransactionRepo, services::TransactionService};
use crate::users::repo::UserRepo;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub products: Arc<dyn ProductRepo>,
    pub paytypes: Arc<dyn PaytypeRepo>,
    pub feedback: Arc<dyn FeedbackRepo>,
    pub accounts: Arc<dyn AccountRepo>,
    pub transactions: TransactionService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let state = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres store")?;
                let store = Arc::new(PgStore::connect(url).await?);
                Self::from_store(config.clone(), store)
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store with demo data; nothing is persisted");
                Self::from_store(config.clone(), Arc::new(MemoryStore::demo()?))
            }
        };

        Ok(state)
    }

    /// Wires every repository handle to one backing store.
    pub fn from_store<S>(config: Arc<AppConfig>, store: Arc<S>) -> Self
    where
        S: UserRepo + ProductRepo + PaytypeRepo + TransactionRepo + FeedbackRepo + AccountRepo + 'static,
    {
        let users: Arc<dyn UserRepo> = store.clone();
        let products: Arc<dyn ProductRepo> = store.clone();
        let paytypes: Arc<dyn PaytypeRepo> = store.clone();
        let transactions: Arc<dyn TransactionRepo> = store.clone();
        let feedback: Arc<dyn FeedbackRepo> = store.clone();
        let accounts: Arc<dyn AccountRepo> = store;

        Self {
            config,
            transactions: TransactionService::new(
                transactions,
                users.clone(),
                products.clone(),
                paytypes.clone(),
            ),
            users,
            products,
            paytypes,
            feedback,
            accounts,
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            admin: None,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_store(Self::test_config(), Arc::new(MemoryStore::new()))
    }
}
