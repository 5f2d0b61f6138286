use serde_json::json;

use indecab_export::export::table::{list_table, Table};
use indecab_export::export::xlsx::write_workbook;

#[test]
fn writes_primary_and_auxiliary_sheets_to_disk() {
    let records = vec![
        json!({
            "dutyId": "D-1",
            "customer": { "name": "Acme", "id": 1 },
            "amount": 1250.5,
            "closed": true,
            "invoices": [{ "number": "I-1", "amount": 1250.5 }],
        }),
        json!({
            "dutyId": "D-2",
            "customer": { "name": "Zen", "id": 2 },
            "amount": 900,
            "closed": false,
            "invoices": [],
        }),
    ];

    let duties = Table::from_records("Duties", &records);
    let invoices = list_table(&records, "invoices", "dutyId", &["dutyId"], "Invoices");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("billed.xlsx");

    write_workbook(&path, &[duties, invoices]).unwrap();

    let metadata = std::fs::metadata(&path).unwrap();
    assert!(metadata.len() > 0);
}

#[test]
fn writes_empty_auxiliary_table_without_error() {
    let table = Table::new("Duties", vec!["dutyId".to_string()]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.xlsx");

    write_workbook(&path, &[table]).unwrap();

    assert!(path.exists());
}

#[test]
fn sheet_names_past_the_excel_limit_are_truncated() {
    let mut table = Table::new(
        "exp_documents_permitDetails_rows_and_more",
        vec!["vehicleId".to_string()],
    );
    table.rows.push(vec![json!("V-1")]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long_names.xlsx");

    write_workbook(&path, &[table]).unwrap();

    assert!(path.exists());
}
