use carsales_core::{
    CsvFileBackend, Record, RecordBackend, RecordInput, RecordService, SearchField, ServiceError,
    SqliteBackend, StorageError, Table, ValidationError,
};
use std::fs;
use std::path::Path;

fn input(name: &str, chassis: &str, sold_for: &str) -> RecordInput {
    RecordInput {
        customer_name: name.to_string(),
        car_model: "Corolla".to_string(),
        chassis_number: chassis.to_string(),
        sold_for: sold_for.to_string(),
        selling_date: "2023-02-01".to_string(),
    }
}

fn csv_service(path: &Path) -> RecordService<CsvFileBackend> {
    RecordService::new(CsvFileBackend::open(path).unwrap())
}

#[test]
fn add_persists_and_duplicate_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.csv");
    let service = csv_service(&path);

    service.add_record(&input("Alice", "CH001", "5000")).unwrap();
    let err = service
        .add_record(&input("Bob", " ch001 ", "6000"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::DuplicateChassis(_))
    ));

    let reopened = csv_service(&path);
    let table = reopened.list_all().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.records()[0].customer_name, "Alice");
}

#[test]
fn rejected_add_does_not_write_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.csv");
    let service = csv_service(&path);

    let err = service.add_record(&input("", "CH001", "5000")).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(!path.exists());
}

#[test]
fn lookup_by_name_and_chassis() {
    let dir = tempfile::tempdir().unwrap();
    let service = csv_service(&dir.path().join("sales.csv"));
    service.add_record(&input("John Doe", "CH001", "5000")).unwrap();
    service.add_record(&input("Mary Major", "CH002", "4000")).unwrap();

    let by_name = service.lookup(SearchField::CustomerName, "jo").unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].index, 0);

    let by_chassis = service.lookup(SearchField::ChassisNumber, " ch002 ").unwrap();
    assert_eq!(by_chassis[0].record.customer_name, "Mary Major");

    assert!(service.lookup(SearchField::CustomerName, "  ").unwrap().is_empty());
}

#[test]
fn delete_removes_record_and_unknown_chassis_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.csv");
    let service = csv_service(&path);
    service.add_record(&input("Alice", "CH001", "5000")).unwrap();
    service.add_record(&input("Bob", "CH002", "6000")).unwrap();

    assert_eq!(service.preview_delete("ch001").unwrap().len(), 1);
    let removed = service.delete_record("ch001").unwrap();
    assert_eq!(removed[0].customer_name, "Alice");
    assert!(service
        .lookup(SearchField::ChassisNumber, "CH001")
        .unwrap()
        .is_empty());

    let before = fs::read_to_string(&path).unwrap();
    let err = service.delete_record("CH404").unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(chassis) if chassis == "CH404"));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn edit_by_chassis_updates_in_place() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let service = RecordService::new(backend);
    service.add_record(&input("Alice", "CH001", "5000")).unwrap();
    service.add_record(&input("Bob", "CH002", "6000")).unwrap();

    let mut changes = service.lookup(SearchField::ChassisNumber, "CH001").unwrap()[0]
        .record
        .to_input();
    changes.sold_for = "5500".to_string();
    let edited = service.edit_by_chassis("CH001", &changes).unwrap();
    assert_eq!(edited.sold_for, "5500");

    let table = service.list_all().unwrap();
    assert_eq!(table.records()[0].sold_for, "5500");
    assert_eq!(table.records()[1].customer_name, "Bob");

    let clash = service
        .edit_record(1, &input("Bob", "CH001", "6000"))
        .unwrap_err();
    assert!(matches!(
        clash,
        ServiceError::Validation(ValidationError::DuplicateChassis(_))
    ));

    let missing = service
        .edit_by_chassis("CH404", &input("X", "CH404", "1"))
        .unwrap_err();
    assert!(matches!(missing, ServiceError::NotFound(_)));
}

struct FailingBackend;

impl RecordBackend for FailingBackend {
    fn load(&self) -> carsales_core::StorageResult<Table> {
        Ok(Table::from(vec![Record::new(
            "Alice",
            "Civic",
            "CH001",
            "5000",
            "2023-01-01",
        )]))
    }

    fn save(&self, _table: &Table) -> carsales_core::StorageResult<()> {
        Err(StorageError::PermissionDenied(
            "close the spreadsheet and try again".to_string(),
        ))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

#[test]
fn storage_failure_on_save_surfaces_as_storage_error() {
    let service = RecordService::new(FailingBackend);

    let err = service.add_record(&input("Bob", "CH002", "6000")).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Storage(StorageError::PermissionDenied(_))
    ));
    assert!(err.to_string().contains("permission denied"));
}
