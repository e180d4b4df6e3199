use std::sync::Arc;

use bincode::deserialize;
use bincode::serialize;
use chrono::DateTime;
use chrono::Utc;
use rocksdb::TransactionDB;
use serde::Deserialize;
use serde::Serialize;

use crate::make_named_key;
use crate::Result;

const NAMESPACE: &[u8] = b"configuration";

// Single well-known key for the company-settings row. There is exactly one
// such row per company database.
const COMPANY_SETTINGS_KEY: &[u8] = b"company_settings/data";

fn config_key(key: &str) -> Vec<u8> {
    make_named_key(NAMESPACE, key)
}

/// Keyed configuration entries plus the singleton company-settings row of
/// one company database.
pub struct Settings {
    db: Arc<TransactionDB>,
}

impl Settings {
    pub fn new(db: Arc<TransactionDB>) -> Self {
        Settings { db }
    }

    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let tx = self.db.transaction();
        match tx.get(config_key(key))? {
            None => Ok(None),
            Some(value) => Ok(Some(String::from_utf8(value)?)),
        }
    }

    pub fn get_value_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let tx = self.db.transaction();
        tx.put(config_key(key), value.as_bytes())?;
        tx.commit()?;
        Ok(())
    }

    pub fn delete_value(&self, key: &str) -> Result<()> {
        let tx = self.db.transaction();
        tx.delete(config_key(key))?;
        tx.commit()?;
        Ok(())
    }

    pub fn company(&self) -> Result<Option<CompanySettings>> {
        let tx = self.db.transaction();
        match tx.get(COMPANY_SETTINGS_KEY)? {
            None => Ok(None),
            Some(value) => Ok(Some(deserialize(&value)?)),
        }
    }

    pub fn save_company(&self, settings: CompanySettings) -> Result<CompanySettings> {
        let settings = CompanySettings {
            updated_at: Some(Utc::now()),
            ..settings
        };

        let tx = self.db.transaction();
        tx.put(COMPANY_SETTINGS_KEY, serialize(&settings)?)?;
        tx.commit()?;
        Ok(settings)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompanySettings {
    pub company_name: String,
    pub base_currency: String,
    /// 1-based month the fiscal year starts in.
    pub fiscal_year_start_month: u32,
    pub address: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}
