use carsales_core::{CsvFileBackend, Record, RecordBackend, StorageError, Table};
use std::fs;

fn sample_table() -> Table {
    Table::from(vec![
        Record::new("Alice", "Civic", "CH001", "5000", "2023-01-01"),
        Record::new("Bob, Jr.", "Corolla \"GR\"", "CH002", "6000", "2023-02-01"),
    ])
}

#[test]
fn missing_file_loads_as_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let backend = CsvFileBackend::open(dir.path().join("sales.csv")).unwrap();

    assert!(backend.load().unwrap().is_empty());
}

#[test]
fn save_then_load_roundtrips_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let backend = CsvFileBackend::open(dir.path().join("sales.csv")).unwrap();

    backend.save(&sample_table()).unwrap();
    assert_eq!(backend.load().unwrap(), sample_table());

    let reloaded = backend.load().unwrap();
    backend.save(&reloaded).unwrap();
    assert_eq!(backend.load().unwrap(), sample_table());
}

#[test]
fn save_writes_canonical_header_and_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.csv");
    let backend = CsvFileBackend::open(&path).unwrap();

    backend.save(&sample_table()).unwrap();
    backend.save(&Table::new()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(
        text.lines().next().unwrap(),
        "Customer Name,Car Name/Model,Chassis Number,Sold For,Selling Date"
    );
    assert_eq!(text.lines().count(), 1);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn legacy_headers_and_short_rows_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.csv");
    fs::write(
        &path,
        "\u{feff}Customer Name,Car Name/Model,Chasis Number,Sold For (¥),Selling Date\n\
         Alice,Civic,CH001,5000,2023-01-01\n\
         ,,,,\n\
         Bob,Corolla,CH002\n",
    )
    .unwrap();

    let table = CsvFileBackend::open(&path).unwrap().load().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.records()[0].sold_for, "5000");
    assert_eq!(
        table.records()[1],
        Record::new("Bob", "Corolla", "CH002", "", "")
    );
}

#[test]
fn empty_file_loads_as_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    fs::write(&path, "").unwrap();

    assert!(CsvFileBackend::open(&path).unwrap().load().unwrap().is_empty());
}

#[test]
fn missing_required_column_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.csv");
    fs::write(&path, "Customer Name,Car Name/Model\nAlice,Civic\n").unwrap();

    let err = CsvFileBackend::open(&path).unwrap().load().unwrap_err();
    assert!(matches!(err, StorageError::Malformed(_)));
}

#[test]
fn opening_a_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = CsvFileBackend::open(dir.path()).unwrap_err();
    assert!(matches!(err, StorageError::Unreachable(_)));
}

#[test]
fn save_into_missing_directory_fails_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let backend = CsvFileBackend::open(dir.path().join("nope").join("sales.csv")).unwrap();

    let err = backend.save(&sample_table()).unwrap_err();
    assert!(matches!(err, StorageError::Unreachable(_)));
}

#[test]
fn closed_backend_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.csv");
    let mut backend = CsvFileBackend::open(&path).unwrap();
    backend.save(&sample_table()).unwrap();
    backend.close().unwrap();
    backend.close().unwrap();

    assert!(matches!(
        backend.load().unwrap_err(),
        StorageError::Unreachable(_)
    ));
    assert!(matches!(
        backend.save(&Table::new()).unwrap_err(),
        StorageError::Unreachable(_)
    ));
    assert_eq!(backend.describe(), "csv:closed");
    assert_eq!(
        CsvFileBackend::open(&path).unwrap().load().unwrap(),
        sample_table()
    );
}
