//! Service layer hosting every repository method.
//!
//! `SprigService` wraps `SprigDb` plus the few settings that change how
//! orders are dated. All repo methods are implemented as `impl SprigService`
//! blocks in `repos/`, the periodic jobs in `jobs/`, and bundles in `bundle`.

use sprig_config::SprigConfig;

use crate::SprigDb;
use crate::error::DatabaseError;

/// Settings the service needs from configuration.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Days between harvest and delivery when an order gives no harvest date.
    pub harvest_lead_days: i64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            harvest_lead_days: 1,
        }
    }
}

impl From<&SprigConfig> for ServiceSettings {
    fn from(config: &SprigConfig) -> Self {
        Self {
            harvest_lead_days: config.orders.harvest_lead_days,
        }
    }
}

/// Orchestrates multi-row mutations over a single database handle.
///
/// Mutations that touch more than one row follow this protocol:
/// 1. Begin transaction
/// 2. Execute SQL through the shared connection
/// 3. Commit on success, roll back on the first error
pub struct SprigService {
    db: SprigDb,
    settings: ServiceSettings,
}

impl SprigService {
    /// Create a new service over a local database file.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str, settings: ServiceSettings) -> Result<Self, DatabaseError> {
        let db = SprigDb::open_local(db_path).await?;
        Ok(Self { db, settings })
    }

    /// Create from an existing `SprigDb` (for testing).
    #[must_use]
    pub const fn from_db(db: SprigDb, settings: ServiceSettings) -> Self {
        Self { db, settings }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &SprigDb {
        &self.db
    }

    #[must_use]
    pub const fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Begin a transaction on the shared connection.
    pub(crate) async fn begin(&self) -> Result<libsql::Transaction, DatabaseError> {
        Ok(self.db.conn().transaction().await?)
    }

    /// Commit `tx` if `result` is `Ok`, otherwise roll it back and return the error.
    pub(crate) async fn finish<T>(
        tx: libsql::Transaction,
        result: Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!(%rollback_error, "transaction rollback failed");
                }
                Err(error)
            }
        }
    }
}
