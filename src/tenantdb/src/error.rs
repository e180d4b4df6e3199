use std::result;
use std::string::FromUtf8Error;

use thiserror::Error;

use crate::provision::Cleanup;
use crate::provision::ProvisionStep;

pub type Result<T> = result::Result<T, TenantError>;

#[derive(Error, Debug)]
pub enum TenantError {
    #[error("unknown sequence {0:?}")]
    UnknownSequence(String),
    #[error("duplicate sequence {0:?}")]
    DuplicateSequence(String),
    #[error("already exists {0:?}")]
    AlreadyExists(String),
    #[error("not found {0:?}")]
    NotFound(String),
    #[error("invalid tenant name {0:?}: must be lowercase letters, digits and underscores, not starting with a digit")]
    InvalidTenantName(String),
    #[error("tenant already exists {0:?}")]
    TenantAlreadyExists(String),
    #[error("provisioning failed at step \"{step}\": {reason}; {cleanup}")]
    ProvisioningFailure {
        step: ProvisionStep,
        reason: String,
        cleanup: Cleanup,
    },
    #[error("schema initialization failed at step \"{step}\": {reason}; {cleanup}")]
    SchemaInitializationFailure {
        step: ProvisionStep,
        reason: String,
        cleanup: Cleanup,
    },
    #[error("internal: {0:?}")]
    Internal(String),
    #[error("storage failure: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("from utf {0:?}")]
    FromUtf8(#[from] FromUtf8Error),
    #[error("bincode {0:?}")]
    Bincode(#[from] bincode::Error),
    #[error("io {0}")]
    Io(#[from] std::io::Error),
    #[error("{0:?}")]
    Other(#[from] anyhow::Error),
}
