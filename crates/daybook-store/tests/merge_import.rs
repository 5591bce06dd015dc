use pretty_assertions::assert_eq;

use daybook_io::MemoryStore;
use daybook_model::{FieldDef, FieldValue, ImportTable, Schema};
use daybook_store::{LedgerSession, StoreError};

fn schema() -> Schema {
    Schema::new(
        vec![
            FieldDef::date("date"),
            FieldDef::number("seq"),
            FieldDef::text("invoice"),
            FieldDef::number("amount"),
        ],
        "date",
        &["invoice"],
    )
    .unwrap()
    .with_ordinal_field("seq")
    .unwrap()
}

fn candidate(date: &str, invoice: &str, amount: f64) -> Vec<(String, FieldValue)> {
    vec![
        ("date".into(), date.into()),
        ("invoice".into(), invoice.into()),
        ("amount".into(), FieldValue::Number(amount)),
    ]
}

fn seeded_session() -> LedgerSession<MemoryStore> {
    let (mut session, _) = LedgerSession::open(MemoryStore::new(), schema());
    session.submit(&candidate("2024-01-03", "INV1", 100.0)).unwrap();
    session.submit(&candidate("2024-01-01", "INV2", 50.0)).unwrap();
    session
}

fn import(rows: &[(&str, &str, &str)]) -> ImportTable {
    // Upload columns deliberately cover the schema in a different order,
    // with an extra column the projection must drop.
    ImportTable {
        columns: vec![
            "amount".into(),
            "uploaded_by".into(),
            "invoice".into(),
            "date".into(),
            "seq".into(),
        ],
        rows: rows
            .iter()
            .map(|(date, invoice, amount)| {
                vec![
                    FieldValue::Text((*amount).into()),
                    FieldValue::Text("importer".into()),
                    FieldValue::Text((*invoice).into()),
                    FieldValue::Text((*date).into()),
                    FieldValue::Empty,
                ]
            })
            .collect(),
    }
}

fn invoices(session: &LedgerSession<MemoryStore>) -> Vec<String> {
    session
        .table()
        .rows()
        .iter()
        .map(|row| {
            session
                .table()
                .schema()
                .field_index("invoice")
                .and_then(|i| row.value(i))
                .map(FieldValue::to_display_string)
                .unwrap_or_default()
        })
        .collect()
}

#[test]
fn merge_appends_dedupes_and_resorts() {
    let mut session = seeded_session();
    session.begin_edit(0).unwrap();

    let outcome = session
        .merge_import(&import(&[
            ("2024-01-02", "INV3", "10"),
            // Duplicate of an existing row: the existing (first) one wins.
            ("2024-06-30", "INV1", "999"),
            // Duplicate within the upload itself.
            ("2024-01-04", "INV3", "11"),
        ]))
        .unwrap();

    assert_eq!(outcome.appended, 3);
    assert_eq!(outcome.dropped, 2);
    assert_eq!(outcome.rows, 3);
    // Sorted by date; the kept INV1 is the pre-existing 2024-01-03 row.
    assert_eq!(invoices(&session), ["INV2", "INV3", "INV1"]);
    assert_eq!(
        session.table().field_value(2, "amount"),
        Some(&FieldValue::Number(100.0))
    );
    // Positions changed wholesale, so the edit selection is gone.
    assert_eq!(session.cursor(), None);
    // Ordinals follow the post-merge order.
    assert_eq!(
        session.table().field_value(0, "seq"),
        Some(&FieldValue::Number(1.0))
    );
    assert_eq!(
        session.table().field_value(2, "seq"),
        Some(&FieldValue::Number(3.0))
    );
    assert_eq!(session.store().stored(), Some(session.table()));
}

#[test]
fn merge_never_decreases_row_count() {
    let mut session = seeded_session();
    let before = session.table().len();

    let outcome = session
        .merge_import(&import(&[
            ("2024-01-03", "INV1", "100"),
            ("2024-01-01", "INV2", "50"),
        ]))
        .unwrap();

    assert_eq!(outcome.rows, before);
    assert_eq!(outcome.appended, 2);
    assert_eq!(outcome.dropped, 2);
}

#[test]
fn missing_columns_reject_the_whole_import() {
    let mut session = seeded_session();
    let before = session.table().clone();
    let stored_before = session.store().stored().cloned();

    let incoming = ImportTable {
        columns: vec!["invoice".into(), "amount".into()],
        rows: vec![vec![
            FieldValue::Text("INV9".into()),
            FieldValue::Text("1".into()),
        ]],
    };
    let err = session.merge_import(&incoming).unwrap_err();
    match err {
        StoreError::SchemaMismatch { missing } => {
            assert_eq!(missing, vec!["date".to_string(), "seq".to_string()]);
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }

    // No mutation and no flush happened.
    assert_eq!(session.table(), &before);
    assert_eq!(session.store().stored().cloned(), stored_before);
}

#[test]
fn rows_without_dedupe_keys_all_survive() {
    let mut session = seeded_session();
    let outcome = session
        .merge_import(&import(&[
            ("2024-01-02", "", "10"),
            ("2024-01-04", "", "20"),
        ]))
        .unwrap();

    assert_eq!(outcome.dropped, 0);
    assert_eq!(outcome.rows, 4);
}
