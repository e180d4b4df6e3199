use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rocksdb::TransactionDB;

use crate::error::TenantError;
use crate::Result;

pub const SCHEMA_VERSION: u32 = 1;
pub const SCHEMA_VERSION_KEY: &[u8] = b"system/schema_version";
pub const CREATED_AT_KEY: &[u8] = b"system/created_at";

/// Administrative boundary for provisioning: create, initialize and drop
/// whole company databases. Normal per-tenant code never sees this trait;
/// only the provisioner holds it, and only for the duration of a
/// provisioning attempt.
pub trait StorageAdmin: Send + Sync {
    fn database_exists(&self, storage_identifier: &str) -> bool;

    /// Creates a new, empty database. Fails if one already exists under the
    /// identifier.
    fn create_database(&self, storage_identifier: &str) -> Result<Arc<TransactionDB>>;

    /// Writes the baseline schema (version stamp and system rows) into a
    /// freshly created database.
    fn init_schema(&self, db: &TransactionDB) -> Result<()>;

    /// Removes a database. Rollback cleanup only.
    fn drop_database(&self, storage_identifier: &str) -> Result<()>;
}

/// Directory-per-database admin rooted at the companies data directory.
pub struct DirAdmin {
    root: PathBuf,
}

impl DirAdmin {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(DirAdmin {
            root: root.as_ref().to_path_buf(),
        })
    }

    pub fn database_path(&self, storage_identifier: &str) -> PathBuf {
        self.root.join(storage_identifier)
    }
}

impl StorageAdmin for DirAdmin {
    fn database_exists(&self, storage_identifier: &str) -> bool {
        self.database_path(storage_identifier).exists()
    }

    fn create_database(&self, storage_identifier: &str) -> Result<Arc<TransactionDB>> {
        let path = self.database_path(storage_identifier);
        if path.exists() {
            return Err(TenantError::TenantAlreadyExists(
                storage_identifier.to_string(),
            ));
        }

        Ok(Arc::new(crate::rocksdb::new(path)?))
    }

    fn init_schema(&self, db: &TransactionDB) -> Result<()> {
        let tx = db.transaction();
        tx.put(SCHEMA_VERSION_KEY, SCHEMA_VERSION.to_le_bytes())?;
        tx.put(CREATED_AT_KEY, Utc::now().to_rfc3339().as_bytes())?;
        tx.commit()?;
        Ok(())
    }

    fn drop_database(&self, storage_identifier: &str) -> Result<()> {
        let path = self.database_path(storage_identifier);
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }
}
