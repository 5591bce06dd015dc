use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use daybook_io::MemoryStore;
use daybook_model::{FieldDef, FieldValue, NoteParts, Schema, DEFAULT_NOTE_CATEGORIES};
use daybook_store::{LedgerSession, OpenNotice, StoreError, SubmitKind};

fn schema() -> Schema {
    Schema::new(
        vec![
            FieldDef::date("date"),
            FieldDef::number("seq"),
            FieldDef::text("invoice"),
            FieldDef::number("amount"),
            FieldDef::text("remark"),
        ],
        "date",
        &["invoice"],
    )
    .unwrap()
    .with_ordinal_field("seq")
    .unwrap()
    .with_note_field("remark", &DEFAULT_NOTE_CATEGORIES)
    .unwrap()
}

fn candidate(date: &str, invoice: &str, amount: f64) -> Vec<(String, FieldValue)> {
    vec![
        ("date".into(), date.into()),
        ("invoice".into(), invoice.into()),
        ("amount".into(), FieldValue::Number(amount)),
    ]
}

fn open_empty() -> LedgerSession<MemoryStore> {
    let (session, notice) = LedgerSession::open(MemoryStore::new(), schema());
    assert_eq!(notice, Some(OpenNotice::CreatedNew));
    session
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
fn submit_into_empty_table_appends_one_row() {
    let mut session = open_empty();
    let outcome = session.submit(&candidate("2024-01-05", "INV1", 100.0)).unwrap();

    assert_eq!(outcome.rows, 1);
    assert_eq!(outcome.kind, SubmitKind::Inserted);
    assert_eq!(session.cursor(), None);
    assert_eq!(
        session.table().field_value(0, "date").unwrap().as_date(),
        NaiveDate::from_ymd_opt(2024, 1, 5)
    );
    assert_eq!(
        session.table().field_value(0, "amount"),
        Some(&FieldValue::Number(100.0))
    );
    // Flushed to the store, not just mutated in memory.
    assert_eq!(session.store().stored(), Some(session.table()));
}

#[test]
fn submit_resorts_by_date_and_renumbers() {
    let mut session = open_empty();
    session.submit(&candidate("2024-01-05", "INV1", 100.0)).unwrap();
    session.submit(&candidate("2024-01-01", "INV2", 50.0)).unwrap();

    assert_eq!(invoices(&session), ["INV2", "INV1"]);
    assert_eq!(
        session.table().field_value(0, "seq"),
        Some(&FieldValue::Number(1.0))
    );
    assert_eq!(
        session.table().field_value(1, "seq"),
        Some(&FieldValue::Number(2.0))
    );
}

#[test]
fn submit_while_editing_updates_in_place() {
    let mut session = open_empty();
    session.submit(&candidate("2024-01-01", "INV1", 100.0)).unwrap();
    session.submit(&candidate("2024-01-02", "INV2", 50.0)).unwrap();

    let draft = session.begin_edit(1).unwrap();
    assert_eq!(session.cursor(), Some(1));
    assert_eq!(draft.fields[2], ("invoice".into(), "INV2".into()));

    let outcome = session.submit(&candidate("2024-01-02", "INV2", 75.0)).unwrap();
    assert_eq!(outcome.rows, 2);
    assert_eq!(outcome.kind, SubmitKind::Updated);
    assert_eq!(session.cursor(), None);
    assert_eq!(
        session.table().field_value(1, "amount"),
        Some(&FieldValue::Number(75.0))
    );
}

#[test]
fn begin_edit_decodes_the_note_field() {
    let mut session = open_empty();
    let mut fields = candidate("2024-01-01", "INV1", 100.0);
    fields.push(("remark".into(), "returned: wrong size".into()));
    session.submit(&fields).unwrap();

    let draft = session.begin_edit(0).unwrap();
    assert_eq!(draft.note, Some(NoteParts::new("returned", "wrong size")));

    // Legacy free text is preserved as detail.
    session.cancel_edit();
    let mut fields = candidate("2024-01-02", "INV2", 10.0);
    fields.push(("remark".into(), "call customer back".into()));
    session.submit(&fields).unwrap();
    let draft = session.begin_edit(1).unwrap();
    assert_eq!(draft.note, Some(NoteParts::new("", "call customer back")));
}

#[test]
fn cancel_edit_discards_selection_without_mutation() {
    let mut session = open_empty();
    session.submit(&candidate("2024-01-01", "INV1", 100.0)).unwrap();

    let before = session.table().clone();
    session.begin_edit(0).unwrap();
    session.cancel_edit();
    assert_eq!(session.cursor(), None);
    assert_eq!(session.table(), &before);
}

#[test]
fn delete_shifts_rows_and_remaps_the_cursor() {
    let mut session = open_empty();
    session.submit(&candidate("2024-01-01", "INV1", 1.0)).unwrap();
    session.submit(&candidate("2024-01-02", "INV2", 2.0)).unwrap();
    session.submit(&candidate("2024-01-03", "INV3", 3.0)).unwrap();

    // Editing row 1; deleting an earlier row decrements the cursor so it
    // still points at the same logical row.
    session.begin_edit(1).unwrap();
    let rows = session.delete(0).unwrap();
    assert_eq!(rows, 2);
    assert_eq!(session.cursor(), Some(0));
    assert_eq!(invoices(&session), ["INV2", "INV3"]);

    // Deleting a later row leaves the cursor alone.
    session.cancel_edit();
    session.begin_edit(0).unwrap();
    session.delete(1).unwrap();
    assert_eq!(session.cursor(), Some(0));

    // Deleting the edited row clears the cursor.
    session.delete(0).unwrap();
    assert_eq!(session.cursor(), None);
    assert!(session.table().is_empty());
}

#[test]
fn stale_indices_are_rejected() {
    let mut session = open_empty();
    session.submit(&candidate("2024-01-01", "INV1", 1.0)).unwrap();

    assert!(matches!(
        session.begin_edit(5),
        Err(StoreError::IndexOutOfRange { index: 5, len: 1 })
    ));
    assert!(matches!(
        session.delete(1),
        Err(StoreError::IndexOutOfRange { index: 1, len: 1 })
    ));
}

#[test]
fn negative_amounts_are_rejected_without_mutation() {
    let mut session = open_empty();
    let before = session.table().clone();
    let err = session
        .submit(&candidate("2024-01-01", "INV1", -1.0))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidCandidate(_)));
    assert_eq!(session.table(), &before);
}

#[test]
fn failed_flush_rolls_back_table_and_cursor() {
    let mut seed = open_empty();
    seed.submit(&candidate("2024-01-01", "INV1", 1.0)).unwrap();
    seed.submit(&candidate("2024-01-02", "INV2", 2.0)).unwrap();
    let before = seed.table().clone();

    let mut store = MemoryStore::with_table(before.clone());
    // Inject a one-shot fault so the next flush fails and the retry works.
    store.fail_next_write();
    let (mut session, notice) = LedgerSession::open(store, schema());
    assert_eq!(notice, None);
    session.begin_edit(0).unwrap();

    let err = session.submit(&candidate("2024-01-01", "INV1", 9.0)).unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
    assert_eq!(session.table(), &before);
    assert_eq!(session.cursor(), Some(0));
    assert_eq!(session.store().stored(), Some(&before));

    // Retrying after the transient failure succeeds.
    let outcome = session.submit(&candidate("2024-01-01", "INV1", 9.0)).unwrap();
    assert_eq!(outcome.kind, SubmitKind::Updated);
    assert_eq!(
        session.table().field_value(0, "amount"),
        Some(&FieldValue::Number(9.0))
    );
}

#[test]
fn open_degrades_to_empty_on_unreadable_source() {
    let dir = tempfile::tempdir().unwrap();
    // A directory path exists but cannot be read as a CSV file.
    let store = daybook_io::CsvLedger::new(dir.path());
    let (session, notice) = LedgerSession::open(store, schema());

    assert!(session.table().is_empty());
    assert!(matches!(
        notice,
        Some(OpenNotice::RecoveredUnreadable { .. })
    ));
}
