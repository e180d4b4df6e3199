use std::path::Path;
use std::sync::Arc;

use rocksdb::TransactionDB;
use serde::Deserialize;
use serde::Serialize;

use crate::admin::SCHEMA_VERSION;
use crate::admin::SCHEMA_VERSION_KEY;
use crate::error::TenantError;
use crate::sequences::Sequences;
use crate::settings::Settings;
use crate::Result;

/// Per-company service bundle over one open company database.
pub struct TenantProvider {
    pub sequences: Arc<Sequences>,
    pub settings: Arc<Settings>,
}

impl TenantProvider {
    pub fn try_new(db: Arc<TransactionDB>) -> Result<Self> {
        let tx = db.transaction();
        match tx.get(SCHEMA_VERSION_KEY)? {
            None => {
                return Err(TenantError::Internal(
                    "schema version missing, database was not provisioned".to_string(),
                ));
            }
            Some(value) => {
                let version = u32::from_le_bytes(value.try_into().map_err(|_| {
                    TenantError::Internal("malformed schema version".to_string())
                })?);
                if version != SCHEMA_VERSION {
                    return Err(TenantError::Internal(format!(
                        "schema version mismatch: found {version}, expected {SCHEMA_VERSION}"
                    )));
                }
            }
        }

        Ok(TenantProvider {
            sequences: Arc::new(Sequences::new(db.clone())),
            settings: Arc::new(Settings::new(db.clone())),
        })
    }
}

/// Host-side reopen entry: opens an already provisioned company database
/// under the data root.
pub fn open_company<P: AsRef<Path>>(data_root: P, storage_identifier: &str) -> Result<TenantProvider> {
    let path = data_root
        .as_ref()
        .join("companies")
        .join(storage_identifier);
    let db = Arc::new(crate::rocksdb::open(path)?);
    TenantProvider::try_new(db)
}

#[derive(Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub next: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub meta: ResponseMetadata,
}
