use std::env::temp_dir;
use std::sync::Arc;

use tenantdb::companies::Companies;
use tenantdb::companies::CreateCompanyRequest;
use tenantdb::error::TenantError;
use uuid::Uuid;

fn open_registry() -> Companies {
    let mut path = temp_dir();
    path.push(format!("{}.db", Uuid::new_v4()));

    let db = Arc::new(tenantdb::rocksdb::new(path).unwrap());
    Companies::new(db)
}

#[test]
fn test_companies() {
    let companies = open_registry();

    assert!(!companies.exists("gb_one").unwrap());
    assert!(companies.active().unwrap().is_none());

    let one = companies
        .create(CreateCompanyRequest {
            display_name: "Company One".to_string(),
            storage_identifier: "gb_one".to_string(),
        })
        .unwrap();
    assert_eq!(one.id, 1);
    assert!(companies.exists("gb_one").unwrap());

    let got = companies.get_by_storage_identifier("gb_one").unwrap();
    assert_eq!(got, one);
    assert_eq!(companies.get_by_id(one.id).unwrap(), one);

    assert!(matches!(
        companies.get_by_storage_identifier("gb_missing"),
        Err(TenantError::NotFound(_))
    ));

    let err = companies
        .create(CreateCompanyRequest {
            display_name: "Other Name".to_string(),
            storage_identifier: "gb_one".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, TenantError::AlreadyExists(_)));

    let two = companies
        .create_active(CreateCompanyRequest {
            display_name: "Company Two".to_string(),
            storage_identifier: "gb_two".to_string(),
        })
        .unwrap();
    assert_eq!(two.id, 2);
    assert_eq!(companies.active().unwrap().unwrap().id, two.id);

    companies.set_active(one.id).unwrap();
    assert_eq!(companies.active().unwrap().unwrap().id, one.id);

    assert_eq!(companies.list().unwrap().data.len(), 2);
}
