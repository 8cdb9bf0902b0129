use std::sync::Arc;
use tracing::info;

use crate::dbs::memory::MemoryPersistenceClient;
use crate::error::Result;
use crate::trait_client::PersistenceClient;

/// Picks a storage backend.
///
/// With a database URL (and the `postgres` feature) the Postgres backend is
/// connected and migrated; otherwise an in-memory store is returned.
pub struct PersistenceBuilder {
    database_url: Option<String>,
    max_connections: u32,
    run_migrations: bool,
}

impl PersistenceBuilder {
    pub fn new() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            run_migrations: true,
        }
    }

    pub fn database_url(mut self, url: Option<String>) -> Self {
        self.database_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub async fn build(self) -> Result<Arc<dyn PersistenceClient>> {
        match self.database_url {
            #[cfg(feature = "postgres")]
            Some(url) => {
                let client =
                    crate::dbs::postgres::PostgresPersistenceClient::connect(&url, self.max_connections)
                        .await?;
                if self.run_migrations {
                    client.migrate().await?;
                }
                Ok(Arc::new(client))
            }
            #[cfg(not(feature = "postgres"))]
            Some(_) => Err(crate::error::PersistError::Connection(
                "DATABASE_URL is set but the postgres feature is disabled".to_string(),
            )),
            None => {
                info!("No database configured, using in-memory store");
                Ok(Arc::new(MemoryPersistenceClient::new()))
            }
        }
    }
}

impl Default for PersistenceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
