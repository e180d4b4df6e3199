use std::sync::Arc;

use bincode::deserialize;
use bincode::serialize;
use chrono::DateTime;
use chrono::Datelike;
use chrono::Utc;
use common::types::OptionalProperty;
use rocksdb::Transaction;
use rocksdb::TransactionDB;
use serde::Deserialize;
use serde::Serialize;

use crate::error::TenantError;
use crate::list_data;
use crate::make_named_key;
use crate::tenant::ListResponse;
use crate::Result;

const NAMESPACE: &[u8] = b"sequences";

fn counter_key(name: &str) -> Vec<u8> {
    make_named_key(NAMESPACE, name)
}

/// Named document-number counters for one company database.
///
/// `next_value` is the only issuance path: the counter row is read under an
/// exclusive row lock (`get_for_update`) and rewritten inside the same
/// transaction, so concurrent callers against the same name are serialized
/// by the storage engine. Values returned by committed calls are strictly
/// increasing and contiguous per name; nothing is retried internally.
pub struct Sequences {
    db: Arc<TransactionDB>,
}

impl Sequences {
    pub fn new(db: Arc<TransactionDB>) -> Self {
        Sequences { db }
    }

    pub fn create(&self, req: CreateSequenceRequest) -> Result<Sequence> {
        let tx = self.db.transaction();
        let seq = self.create_tx(&tx, req)?;
        tx.commit()?;
        Ok(seq)
    }

    /// `create` inside a caller-supplied transaction. Commit is left to the
    /// caller.
    pub fn create_tx(
        &self,
        tx: &Transaction<TransactionDB>,
        req: CreateSequenceRequest,
    ) -> Result<Sequence> {
        let key = counter_key(&req.name);
        if tx.get_for_update(&key, true)?.is_some() {
            return Err(TenantError::DuplicateSequence(req.name));
        }

        let seq = Sequence {
            name: req.name,
            current_value: req.initial_value,
            format_template: req.format_template,
            created_at: Utc::now(),
            updated_at: None,
        };
        tx.put(&key, serialize(&seq)?)?;
        Ok(seq)
    }

    pub fn get_by_name(&self, name: &str) -> Result<Sequence> {
        let tx = self.db.transaction();
        self.get_by_name_tx(&tx, name)
    }

    pub fn get_by_name_tx(&self, tx: &Transaction<TransactionDB>, name: &str) -> Result<Sequence> {
        match tx.get(counter_key(name))? {
            None => Err(TenantError::UnknownSequence(name.to_string())),
            Some(value) => Ok(deserialize(&value)?),
        }
    }

    pub fn list(&self) -> Result<ListResponse<Sequence>> {
        let tx = self.db.transaction();

        self.list_tx(&tx)
    }

    pub fn list_tx(&self, tx: &Transaction<TransactionDB>) -> Result<ListResponse<Sequence>> {
        list_data(tx, NAMESPACE)
    }

    /// Changes the rendering template only. The stored numeric value is not
    /// writable once the sequence exists.
    pub fn update(&self, name: &str, req: UpdateSequenceRequest) -> Result<Sequence> {
        let tx = self.db.transaction();
        let seq = self.update_tx(&tx, name, req)?;
        tx.commit()?;
        Ok(seq)
    }

    pub fn update_tx(
        &self,
        tx: &Transaction<TransactionDB>,
        name: &str,
        req: UpdateSequenceRequest,
    ) -> Result<Sequence> {
        let key = counter_key(name);
        let mut seq: Sequence = match tx.get_for_update(&key, true)? {
            None => return Err(TenantError::UnknownSequence(name.to_string())),
            Some(value) => deserialize(&value)?,
        };

        if let OptionalProperty::Some(format_template) = req.format_template {
            seq.format_template = format_template;
        }
        seq.updated_at = Some(Utc::now());

        tx.put(&key, serialize(&seq)?)?;
        Ok(seq)
    }

    pub fn next_value(&self, name: &str) -> Result<String> {
        let tx = self.db.transaction();
        let value = self.next_value_tx(&tx, name)?;
        tx.commit()?;
        Ok(value)
    }

    /// `next_value` inside a caller-supplied transaction. The counter row
    /// stays locked until the caller commits or rolls back, so a rolled-back
    /// business transaction never burns a number.
    pub fn next_value_tx(&self, tx: &Transaction<TransactionDB>, name: &str) -> Result<String> {
        let key = counter_key(name);
        let mut seq: Sequence = match tx.get_for_update(&key, true)? {
            None => return Err(TenantError::UnknownSequence(name.to_string())),
            Some(value) => deserialize(&value)?,
        };

        seq.current_value += 1;
        tx.put(&key, serialize(&seq)?)?;

        Ok(render(seq.format_template.as_deref(), seq.current_value))
    }
}

/// Renders a counter value through its template. Tokens: `{value}`,
/// `{value:0N}` (zero-pad to width N), `{year}`. Unknown tokens are kept
/// verbatim. A missing template renders the bare decimal value.
fn render(template: Option<&str>, value: u64) -> String {
    let template = match template {
        None => return value.to_string(),
        Some(t) => t,
    };

    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        match rest[open..].find('}') {
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
            Some(close) => {
                render_token(&mut out, &rest[open + 1..open + close], value);
                rest = &rest[open + close + 1..];
            }
        }
    }
    out.push_str(rest);

    out
}

fn render_token(out: &mut String, token: &str, value: u64) {
    if token == "value" {
        out.push_str(&value.to_string());
    } else if token == "year" {
        out.push_str(&Utc::now().year().to_string());
    } else if let Some(width) = token
        .strip_prefix("value:0")
        .and_then(|w| w.parse::<usize>().ok())
    {
        out.push_str(&format!("{value:0width$}"));
    } else {
        out.push('{');
        out.push_str(token);
        out.push('}');
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub name: String,
    pub current_value: u64,
    pub format_template: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateSequenceRequest {
    pub name: String,
    pub initial_value: u64,
    pub format_template: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateSequenceRequest {
    #[serde(default)]
    pub format_template: OptionalProperty<Option<String>>,
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;
    use chrono::Utc;

    use super::render;

    #[test]
    fn test_render_plain() {
        assert_eq!(render(None, 42), "42");
        assert_eq!(render(Some("{value}"), 42), "42");
    }

    #[test]
    fn test_render_padded() {
        assert_eq!(render(Some("INV-{value:06}"), 7), "INV-000007");
        assert_eq!(render(Some("{value:03}/A"), 1234), "1234/A");
    }

    #[test]
    fn test_render_year() {
        let year = Utc::now().year();
        assert_eq!(
            render(Some("JE/{year}/{value:04}"), 3),
            format!("JE/{year}/0003")
        );
    }

    #[test]
    fn test_render_unknown_token_and_unbalanced() {
        assert_eq!(render(Some("X{foo}-{value}"), 5), "X{foo}-5");
        assert_eq!(render(Some("{value}-{oops"), 5), "5-{oops");
    }
}
