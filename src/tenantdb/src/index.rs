use rocksdb::Transaction;
use rocksdb::TransactionDB;

use crate::error::TenantError;
use crate::Result;

pub fn check_insert_constraints(
    tx: &Transaction<TransactionDB>,
    keys: &[Option<Vec<u8>>],
) -> Result<()> {
    for key in keys.iter().flatten() {
        if tx.get_for_update(key, true)?.is_some() {
            return Err(TenantError::AlreadyExists(String::from_utf8(
                key.to_owned(),
            )?));
        }
    }
    Ok(())
}

pub fn insert_index(
    tx: &Transaction<TransactionDB>,
    keys: &[Option<Vec<u8>>],
    data: &[u8],
) -> Result<()> {
    for key in keys.iter().flatten() {
        tx.put(key, data)?;
    }
    Ok(())
}

pub fn get_index<K>(
    tx: &Transaction<TransactionDB>,
    key: K,
    err_key: impl ToString,
) -> Result<Vec<u8>>
where
    K: AsRef<[u8]>,
{
    match tx.get(key.as_ref())? {
        None => Err(TenantError::NotFound(err_key.to_string())),
        Some(v) => Ok(v),
    }
}

/// Mints the next row id under the given sequence key. Holds an exclusive
/// lock on the key until the enclosing transaction commits.
pub fn next_seq<K: AsRef<[u8]>>(tx: &Transaction<TransactionDB>, key: K) -> Result<u64> {
    let id = tx.get_for_update(key.as_ref(), true)?;
    let result: u64 = match id {
        Some(v) => u64::from_le_bytes(v.try_into().unwrap()) + 1,
        None => 1,
    };
    tx.put(key, result.to_le_bytes())?;

    Ok(result)
}
