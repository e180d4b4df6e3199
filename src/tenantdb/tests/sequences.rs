use std::env::temp_dir;
use std::sync::Arc;
use std::thread;

use common::types::OptionalProperty;
use tenantdb::error::TenantError;
use tenantdb::sequences::CreateSequenceRequest;
use tenantdb::sequences::Sequences;
use tenantdb::sequences::UpdateSequenceRequest;
use uuid::Uuid;

fn open_sequences() -> Sequences {
    let mut path = temp_dir();
    path.push(format!("{}.db", Uuid::new_v4()));

    let db = Arc::new(tenantdb::rocksdb::new(path).unwrap());
    Sequences::new(db)
}

#[test]
fn test_sequences() {
    let sequences = open_sequences();

    assert!(matches!(
        sequences.next_value("SALES_INVOICE"),
        Err(TenantError::UnknownSequence(_))
    ));
    assert!(matches!(
        sequences.get_by_name("SALES_INVOICE"),
        Err(TenantError::UnknownSequence(_))
    ));

    let seq = sequences
        .create(CreateSequenceRequest {
            name: "SALES_INVOICE".to_string(),
            initial_value: 0,
            format_template: None,
        })
        .unwrap();
    assert_eq!(seq.current_value, 0);

    assert_eq!(sequences.next_value("SALES_INVOICE").unwrap(), "1");
    assert_eq!(sequences.next_value("SALES_INVOICE").unwrap(), "2");

    // the failed lookup above must not have minted anything
    assert_eq!(
        sequences.get_by_name("SALES_INVOICE").unwrap().current_value,
        2
    );
}

#[test]
fn test_duplicate_definition_leaves_counter_untouched() {
    let sequences = open_sequences();

    sequences
        .create(CreateSequenceRequest {
            name: "PAYMENT".to_string(),
            initial_value: 10,
            format_template: Some("PAY-{value:04}".to_string()),
        })
        .unwrap();

    let err = sequences
        .create(CreateSequenceRequest {
            name: "PAYMENT".to_string(),
            initial_value: 999,
            format_template: None,
        })
        .unwrap_err();
    assert!(matches!(err, TenantError::DuplicateSequence(_)));

    let seq = sequences.get_by_name("PAYMENT").unwrap();
    assert_eq!(seq.current_value, 10);
    assert_eq!(seq.format_template.as_deref(), Some("PAY-{value:04}"));

    assert_eq!(sequences.next_value("PAYMENT").unwrap(), "PAY-0011");
}

#[test]
fn test_get_by_name_is_idempotent() {
    let sequences = open_sequences();

    sequences
        .create(CreateSequenceRequest {
            name: "RECEIPT".to_string(),
            initial_value: 5,
            format_template: None,
        })
        .unwrap();

    let a = sequences.get_by_name("RECEIPT").unwrap();
    let b = sequences.get_by_name("RECEIPT").unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_update_format_template() {
    let sequences = open_sequences();

    sequences
        .create(CreateSequenceRequest {
            name: "JOURNAL_ENTRY".to_string(),
            initial_value: 0,
            format_template: None,
        })
        .unwrap();

    assert_eq!(sequences.next_value("JOURNAL_ENTRY").unwrap(), "1");

    let seq = sequences
        .update("JOURNAL_ENTRY", UpdateSequenceRequest {
            format_template: OptionalProperty::Some(Some("JE-{value:06}".to_string())),
        })
        .unwrap();
    assert_eq!(seq.current_value, 1);

    assert_eq!(sequences.next_value("JOURNAL_ENTRY").unwrap(), "JE-000002");

    assert!(matches!(
        sequences.update("NOPE", UpdateSequenceRequest::default()),
        Err(TenantError::UnknownSequence(_))
    ));
}

#[test]
fn test_list_is_name_ordered() {
    let sequences = open_sequences();

    for name in ["SALES_INVOICE", "CREDIT_NOTE", "PAYMENT"] {
        sequences
            .create(CreateSequenceRequest {
                name: name.to_string(),
                initial_value: 0,
                format_template: None,
            })
            .unwrap();
    }

    let names = sequences
        .list()
        .unwrap()
        .data
        .into_iter()
        .map(|s| s.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["CREDIT_NOTE", "PAYMENT", "SALES_INVOICE"]);
}

#[test]
fn test_caller_scoped_transaction() {
    let mut path = temp_dir();
    path.push(format!("{}.db", Uuid::new_v4()));

    let db = Arc::new(tenantdb::rocksdb::new(path).unwrap());
    let sequences = Sequences::new(db.clone());

    sequences
        .create(CreateSequenceRequest {
            name: "SALES_INVOICE".to_string(),
            initial_value: 0,
            format_template: None,
        })
        .unwrap();

    // an abandoned caller scope does not burn the number
    {
        let tx = db.transaction();
        assert_eq!(sequences.next_value_tx(&tx, "SALES_INVOICE").unwrap(), "1");
    }
    assert_eq!(sequences.next_value("SALES_INVOICE").unwrap(), "1");

    // read, update and list all participate in one caller scope
    let tx = db.transaction();
    assert_eq!(
        sequences
            .get_by_name_tx(&tx, "SALES_INVOICE")
            .unwrap()
            .current_value,
        1
    );
    sequences
        .update_tx(&tx, "SALES_INVOICE", UpdateSequenceRequest {
            format_template: OptionalProperty::Some(Some("INV-{value:06}".to_string())),
        })
        .unwrap();
    assert_eq!(sequences.list_tx(&tx).unwrap().data.len(), 1);
    tx.commit().unwrap();

    assert_eq!(sequences.next_value("SALES_INVOICE").unwrap(), "INV-000002");
}

#[test]
fn test_concurrent_next_value_is_gapless() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;

    let mut path = temp_dir();
    path.push(format!("{}.db", Uuid::new_v4()));

    let db = Arc::new(tenantdb::rocksdb::new(path).unwrap());
    let sequences = Arc::new(Sequences::new(db));

    sequences
        .create(CreateSequenceRequest {
            name: "SALES_INVOICE".to_string(),
            initial_value: 0,
            format_template: None,
        })
        .unwrap();

    let handles = (0..THREADS)
        .map(|_| {
            let sequences = sequences.clone();
            thread::spawn(move || {
                let mut values = Vec::with_capacity(PER_THREAD);
                for _ in 0..PER_THREAD {
                    // a lock-wait timeout is a retriable storage failure by
                    // contract, so the caller retries
                    let value = loop {
                        match sequences.next_value("SALES_INVOICE") {
                            Ok(v) => break v,
                            Err(TenantError::Storage(_)) => continue,
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    };
                    values.push(value.parse::<u64>().unwrap());
                }
                values
            })
        })
        .collect::<Vec<_>>();

    let mut values = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect::<Vec<_>>();
    values.sort_unstable();

    // pairwise distinct and contiguous: exactly 1..=THREADS*PER_THREAD
    let expected = (1..=(THREADS * PER_THREAD) as u64).collect::<Vec<_>>();
    assert_eq!(values, expected);
}
