use std::sync::Arc;

use bincode::deserialize;
use bincode::serialize;
use chrono::DateTime;
use chrono::Utc;
use rocksdb::Transaction;
use rocksdb::TransactionDB;
use serde::Deserialize;
use serde::Serialize;

use crate::error::TenantError;
use crate::index::check_insert_constraints;
use crate::index::get_index;
use crate::index::insert_index;
use crate::index::next_seq;
use crate::list_data;
use crate::make_data_value_key;
use crate::make_id_seq_key;
use crate::make_index_key;
use crate::tenant::ListResponse;
use crate::Result;

const NAMESPACE: &[u8] = b"companies";
const IDX_IDENT: &[u8] = b"ident";

// Fixed pointer key naming the company the application opens on startup.
const ACTIVE_KEY: &[u8] = b"companies/active";

fn index_keys(storage_identifier: &str) -> Vec<Option<Vec<u8>>> {
    [index_ident_key(storage_identifier)].to_vec()
}

fn index_ident_key(storage_identifier: &str) -> Option<Vec<u8>> {
    Some(make_index_key(NAMESPACE, IDX_IDENT, storage_identifier).to_vec())
}

/// Application-level registry of provisioned companies. Lives in its own
/// database, outside any company's storage.
pub struct Companies {
    db: Arc<TransactionDB>,
}

impl Companies {
    pub fn new(db: Arc<TransactionDB>) -> Self {
        Companies { db }
    }

    fn get_by_id_(&self, tx: &Transaction<TransactionDB>, id: u64) -> Result<Company> {
        let key = make_data_value_key(NAMESPACE, id);

        match tx.get(key)? {
            None => Err(TenantError::NotFound(format!("company {id}"))),
            Some(value) => Ok(deserialize(&value)?),
        }
    }

    pub fn create(&self, req: CreateCompanyRequest) -> Result<Company> {
        let tx = self.db.transaction();
        let company = self.create_(&tx, req)?;
        tx.commit()?;
        Ok(company)
    }

    /// Registers a company and marks it active in one transaction. Used by
    /// the provisioner's finalize step.
    pub fn create_active(&self, req: CreateCompanyRequest) -> Result<Company> {
        let tx = self.db.transaction();
        let company = self.create_(&tx, req)?;
        tx.put(ACTIVE_KEY, company.id.to_le_bytes())?;
        tx.commit()?;
        Ok(company)
    }

    fn create_(&self, tx: &Transaction<TransactionDB>, req: CreateCompanyRequest) -> Result<Company> {
        let idx_keys = index_keys(&req.storage_identifier);
        check_insert_constraints(tx, idx_keys.as_ref())?;

        let created_at = Utc::now();
        let id = next_seq(tx, make_id_seq_key(NAMESPACE))?;

        let company = Company {
            id,
            created_at,
            updated_at: None,
            display_name: req.display_name,
            storage_identifier: req.storage_identifier,
        };

        let data = serialize(&company)?;
        tx.put(make_data_value_key(NAMESPACE, id), &data)?;

        insert_index(tx, idx_keys.as_ref(), &data)?;
        Ok(company)
    }

    pub fn get_by_id(&self, id: u64) -> Result<Company> {
        let tx = self.db.transaction();

        self.get_by_id_(&tx, id)
    }

    pub fn get_by_storage_identifier(&self, storage_identifier: &str) -> Result<Company> {
        let tx = self.db.transaction();
        let data = get_index(
            &tx,
            index_ident_key(storage_identifier).unwrap(),
            format!("company {storage_identifier}"),
        )?;
        Ok(deserialize::<Company>(&data)?)
    }

    pub fn exists(&self, storage_identifier: &str) -> Result<bool> {
        let tx = self.db.transaction();
        Ok(tx.get(index_ident_key(storage_identifier).unwrap())?.is_some())
    }

    pub fn list(&self) -> Result<ListResponse<Company>> {
        let tx = self.db.transaction();

        list_data(&tx, NAMESPACE)
    }

    pub fn set_active(&self, id: u64) -> Result<Company> {
        let tx = self.db.transaction();

        let company = self.get_by_id_(&tx, id)?;
        tx.put(ACTIVE_KEY, id.to_le_bytes())?;
        tx.commit()?;
        Ok(company)
    }

    pub fn active(&self) -> Result<Option<Company>> {
        let tx = self.db.transaction();

        match tx.get(ACTIVE_KEY)? {
            None => Ok(None),
            Some(value) => {
                let id = u64::from_le_bytes(
                    value
                        .try_into()
                        .map_err(|_| TenantError::Internal("malformed active pointer".to_string()))?,
                );
                Ok(Some(self.get_by_id_(&tx, id)?))
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Company {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub display_name: String,
    pub storage_identifier: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateCompanyRequest {
    pub display_name: String,
    pub storage_identifier: String,
}
