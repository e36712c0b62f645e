use std::sync::Arc;

use tracing::{info, warn};

use crate::accounts::{
    memory::MemoryAccountRepository,
    repo::{AccountRepository, PgAccountRepository},
    AccountService,
};
use crate::config::{AppConfig, StoreKind};
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let repo: Arc<dyn AccountRepository> = match (config.store, &config.database) {
            (StoreKind::Postgres, Some(database)) => {
                let pool = db::connect(database).await?;
                info!("using postgres account store");
                Arc::new(PgAccountRepository::new(pool))
            }
            (StoreKind::Postgres, None) => {
                anyhow::bail!("postgres account store selected without database settings")
            }
            (StoreKind::Memory, _) => {
                warn!("using in-memory account store; accounts are lost on exit");
                Arc::new(MemoryAccountRepository::new())
            }
        };

        Ok(Self::from_parts(AccountService::new(repo), config))
    }

    pub fn from_parts(accounts: AccountService, config: Arc<AppConfig>) -> Self {
        Self { accounts, config }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, ServerConfig};

        let config = Arc::new(AppConfig {
            store: StoreKind::Memory,
            database: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
        });
        let accounts = AccountService::new(Arc::new(MemoryAccountRepository::new()));
        Self::from_parts(accounts, config)
    }
}
