use std::result;

use tenantdb::error::TenantError;
use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Tenant(#[from] TenantError),
    #[error("{0}")]
    Internal(String),
    #[error("StdIO: {0:?}")]
    StdIO(#[from] std::io::Error),
    #[error("other: {0:?}")]
    Other(#[from] anyhow::Error),
}
