use std::path::Path;

use rocksdb::ColumnFamilyDescriptor;
use rocksdb::Options;
use rocksdb::TransactionDB;
use rocksdb::TransactionDBOptions;

use crate::Result;

enum ColumnFamily {
    General,
}

fn cf_descriptor(cf: ColumnFamily, opts: Options) -> ColumnFamilyDescriptor {
    match cf {
        ColumnFamily::General => ColumnFamilyDescriptor::new("general", opts),
    }
}

/// Opens a database, creating it if necessary.
pub fn new<P: AsRef<Path>>(path: P) -> Result<TransactionDB> {
    open_(path, true)
}

/// Opens an already provisioned database. Fails if it doesn't exist.
pub fn open<P: AsRef<Path>>(path: P) -> Result<TransactionDB> {
    open_(path, false)
}

fn open_<P: AsRef<Path>>(path: P, create_if_missing: bool) -> Result<TransactionDB> {
    let mut opts = Options::default();

    opts.create_if_missing(create_if_missing);
    opts.create_missing_column_families(create_if_missing);

    let cf_descriptors = vec![cf_descriptor(ColumnFamily::General, opts.clone())];
    let txopts = TransactionDBOptions::default();

    Ok(TransactionDB::open_cf_descriptors(
        &opts,
        &txopts,
        path,
        cf_descriptors,
    )?)
}
