use carsales_core::{Record, RecordBackend, StorageError, Table, XlsxFileBackend};
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::Path;

fn sample_table() -> Table {
    Table::from(vec![
        Record::new("Alice", "Civic", "CH001", "5000", "2023-01-01"),
        Record::new("Bob, Jr.", "Corolla", "CH002", "6000.50", "2023-02-01"),
    ])
}

/// Writes a workbook the way a pandas export of the legacy data would look.
fn write_legacy_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let headers = [
        "Customer Name",
        "Car Name/Model",
        "Chasis Number",
        "Sold For (¥)",
        "Selling Date",
    ];
    for (column, header) in headers.iter().enumerate() {
        sheet.write_string(0, column as u16, *header).unwrap();
    }
    sheet.write_string(1, 0, "Alice").unwrap();
    sheet.write_string(1, 1, "Civic").unwrap();
    sheet.write_string(1, 2, "CH001").unwrap();
    sheet.write_number(1, 3, 5000.0).unwrap();
    sheet.write_string(1, 4, "2023-01-01").unwrap();
    sheet.write_string(3, 0, "Bob").unwrap();
    sheet.write_string(3, 1, "Corolla").unwrap();
    sheet.write_string(3, 2, "CH002").unwrap();
    workbook.save(path).unwrap();
}

#[test]
fn missing_file_loads_as_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let backend = XlsxFileBackend::open(dir.path().join("car_sales_data.xlsx")).unwrap();

    assert!(backend.load().unwrap().is_empty());
}

#[test]
fn save_then_load_roundtrips_and_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let backend = XlsxFileBackend::open(dir.path().join("car_sales_data.xlsx")).unwrap();

    backend.save(&sample_table()).unwrap();
    assert_eq!(backend.load().unwrap(), sample_table());

    backend.save(&Table::new()).unwrap();
    assert!(backend.load().unwrap().is_empty());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn legacy_workbook_with_numeric_cells_loads_as_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("car_sales_data.xlsx");
    write_legacy_workbook(&path);

    let table = XlsxFileBackend::open(&path).unwrap().load().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.records()[0],
        Record::new("Alice", "Civic", "CH001", "5000", "2023-01-01")
    );
    assert_eq!(
        table.records()[1],
        Record::new("Bob", "Corolla", "CH002", "", "")
    );
}

#[test]
fn non_workbook_file_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("car_sales_data.xlsx");
    fs::write(&path, "Customer Name,Car Name/Model\n").unwrap();

    let err = XlsxFileBackend::open(&path).unwrap().load().unwrap_err();
    assert!(matches!(err, StorageError::Malformed(_)));
}

#[test]
fn closed_backend_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = XlsxFileBackend::open(dir.path().join("car_sales_data.xlsx")).unwrap();
    backend.close().unwrap();

    assert!(matches!(
        backend.load().unwrap_err(),
        StorageError::Unreachable(_)
    ));
    assert!(matches!(
        backend.save(&sample_table()).unwrap_err(),
        StorageError::Unreachable(_)
    ));
}
