use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use rocksdb::TransactionDB;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::admin::StorageAdmin;
use crate::companies::Companies;
use crate::companies::Company;
use crate::companies::CreateCompanyRequest;
use crate::error::TenantError;
use crate::sequences::CreateSequenceRequest;
use crate::sequences::Sequences;
use crate::settings::CompanySettings;
use crate::settings::Settings;
use crate::Result;

lazy_static! {
    static ref STORAGE_IDENTIFIER: Regex = Regex::new("^[a-z_][a-z0-9_]*$").unwrap();
}

const DEFAULT_BASE_CURRENCY: &str = "USD";

const IDENT_PREFIX: &str = "gb_";
const IDENT_MAX_BODY: usize = 40;

/// Counters every seeded company database starts with.
pub const DEFAULT_SEQUENCES: &[(&str, u64, Option<&str>)] = &[
    ("CREDIT_NOTE", 0, Some("CN-{value:06}")),
    ("JOURNAL_ENTRY", 0, Some("JE-{value:06}")),
    ("PAYMENT", 0, Some("PAY-{value:06}")),
    ("PURCHASE_INVOICE", 0, Some("PI-{value:06}")),
    ("RECEIPT", 0, Some("RCPT-{value:06}")),
    ("SALES_INVOICE", 0, Some("INV-{value:06}")),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProvisionStep {
    Validate,
    CreateStorage,
    InitSchema,
    SeedDefaults,
    Finalize,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisionStep::Validate => "validate",
            ProvisionStep::CreateStorage => "create storage",
            ProvisionStep::InitSchema => "initialize schema",
            ProvisionStep::SeedDefaults => "seed defaults",
            ProvisionStep::Finalize => "finalize",
        };
        f.write_str(s)
    }
}

/// Outcome of the rollback that follows a failed provisioning step. A
/// failed drop is reported, never swallowed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cleanup {
    RolledBack,
    LeftBehind(String),
}

impl fmt::Display for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cleanup::RolledBack => f.write_str("database fully rolled back"),
            Cleanup::LeftBehind(reason) => write!(
                f,
                "database left behind, manual cleanup required ({reason})"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub display_name: String,
    pub storage_identifier: String,
    pub seed_with_defaults: bool,
}

/// The "tenant ready" signal. The host closes its current connections and
/// reopens under `company.storage_identifier` (see `open_company`).
#[derive(Debug, Clone)]
pub struct ProvisionedTenant {
    pub company: Company,
}

/// Stands up an isolated database for a new company: validate, create
/// storage, initialize schema, seed defaults, register. Any failure after
/// storage creation rolls the database back; from the caller's point of
/// view either a fully usable company exists afterwards or none does.
pub struct Provisioner {
    registry: Arc<Companies>,
    admin: Arc<dyn StorageAdmin>,
}

impl Provisioner {
    pub fn new(registry: Arc<Companies>, admin: Arc<dyn StorageAdmin>) -> Self {
        Provisioner { registry, admin }
    }

    pub fn provision(&self, req: ProvisionRequest) -> Result<ProvisionedTenant> {
        info!(
            "provisioning company {:?} as {:?}...",
            req.display_name, req.storage_identifier
        );

        self.validate(&req)?;

        debug!("creating storage...");
        let db = self
            .admin
            .create_database(&req.storage_identifier)
            .map_err(|e| match e {
                TenantError::TenantAlreadyExists(_) => e,
                e => TenantError::ProvisioningFailure {
                    step: ProvisionStep::CreateStorage,
                    reason: e.to_string(),
                    cleanup: Cleanup::RolledBack,
                },
            })?;

        debug!("initializing schema...");
        if let Err(e) = self.admin.init_schema(&db) {
            let cleanup = self.rollback(db, &req.storage_identifier);
            return Err(TenantError::SchemaInitializationFailure {
                step: ProvisionStep::InitSchema,
                reason: e.to_string(),
                cleanup,
            });
        }

        if req.seed_with_defaults {
            debug!("seeding default sequences and settings...");
            if let Err(e) = seed_defaults(&db, &req) {
                let cleanup = self.rollback(db, &req.storage_identifier);
                return Err(TenantError::SchemaInitializationFailure {
                    step: ProvisionStep::SeedDefaults,
                    reason: e.to_string(),
                    cleanup,
                });
            }
        }

        // Close the admin-side handle before the host reopens the database.
        drop(db);

        debug!("registering company...");
        let company = match self.registry.create_active(CreateCompanyRequest {
            display_name: req.display_name,
            storage_identifier: req.storage_identifier.clone(),
        }) {
            Ok(company) => company,
            Err(e) => {
                let cleanup = self.drop_database(&req.storage_identifier);
                return Err(TenantError::ProvisioningFailure {
                    step: ProvisionStep::Finalize,
                    reason: e.to_string(),
                    cleanup,
                });
            }
        };

        info!(
            "company {:?} is ready under {:?}",
            company.display_name, company.storage_identifier
        );
        Ok(ProvisionedTenant { company })
    }

    fn validate(&self, req: &ProvisionRequest) -> Result<()> {
        if !STORAGE_IDENTIFIER.is_match(&req.storage_identifier) {
            return Err(TenantError::InvalidTenantName(
                req.storage_identifier.clone(),
            ));
        }

        if self.registry.exists(&req.storage_identifier)?
            || self.admin.database_exists(&req.storage_identifier)
        {
            return Err(TenantError::TenantAlreadyExists(
                req.storage_identifier.clone(),
            ));
        }

        Ok(())
    }

    fn rollback(&self, db: Arc<TransactionDB>, storage_identifier: &str) -> Cleanup {
        drop(db);
        self.drop_database(storage_identifier)
    }

    fn drop_database(&self, storage_identifier: &str) -> Cleanup {
        match self.admin.drop_database(storage_identifier) {
            Ok(()) => {
                info!("rolled back database {storage_identifier:?}");
                Cleanup::RolledBack
            }
            Err(e) => {
                warn!("cleanup of database {storage_identifier:?} failed: {e}");
                Cleanup::LeftBehind(e.to_string())
            }
        }
    }
}

fn seed_defaults(db: &Arc<TransactionDB>, req: &ProvisionRequest) -> Result<()> {
    let sequences = Sequences::new(db.clone());
    let tx = db.transaction();
    for (name, initial_value, format_template) in DEFAULT_SEQUENCES {
        sequences.create_tx(&tx, CreateSequenceRequest {
            name: (*name).to_string(),
            initial_value: *initial_value,
            format_template: format_template.map(|t| t.to_string()),
        })?;
    }
    tx.commit()?;

    let settings = Settings::new(db.clone());
    settings.set_value("base_currency", DEFAULT_BASE_CURRENCY)?;
    settings.set_value("fiscal_year_start_month", "1")?;
    settings.save_company(CompanySettings {
        company_name: req.display_name.clone(),
        base_currency: DEFAULT_BASE_CURRENCY.to_string(),
        fiscal_year_start_month: 1,
        address: None,
        updated_at: None,
    })?;

    Ok(())
}

/// Derives a valid storage identifier from a human-facing company name:
/// lowercase, illegal runs squashed to a single underscore, trimmed, capped
/// and prefixed.
pub fn suggest_storage_identifier(display_name: &str) -> String {
    let mut body = String::with_capacity(display_name.len());
    let mut prev_underscore = false;
    for c in display_name.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            c
        } else {
            '_'
        };
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        body.push(c);
    }

    let body: String = body.trim_matches('_').chars().take(IDENT_MAX_BODY).collect();
    format!("{IDENT_PREFIX}{body}")
}
