//! In-memory sales table and its lookup/mutation rules.
//!
//! # Responsibility
//! - Hold an ordered list of records between a load and a save.
//! - Enforce chassis uniqueness on every mutation.
//!
//! # Invariants
//! - Insertion order is preserved; mutations never reorder records.
//! - A failed mutation leaves the table untouched.
//! - Tables built only through `add`/`update` never contain two records with
//!   the same [`chassis_key`].

use crate::model::record::{chassis_key, Record, RecordInput, ValidationError};
use serde::{Deserialize, Serialize};

/// Field a lookup matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    /// Case-insensitive substring match.
    CustomerName,
    /// Case-insensitive, trimmed exact match.
    ChassisNumber,
}

/// Ordered sequence of sale records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Returns `(index, record)` pairs matching `query`.
    ///
    /// A blank query performs no search and yields nothing.
    pub fn find(&self, field: SearchField, query: &str) -> Vec<(usize, &Record)> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        match field {
            SearchField::CustomerName => {
                let needle = query.to_lowercase();
                self.records
                    .iter()
                    .enumerate()
                    .filter(|(_, record)| record.customer_name.to_lowercase().contains(&needle))
                    .collect()
            }
            SearchField::ChassisNumber => {
                let key = chassis_key(query);
                self.records
                    .iter()
                    .enumerate()
                    .filter(|(_, record)| record.chassis_key() == key)
                    .collect()
            }
        }
    }

    /// Position of the record holding `chassis`, if any.
    pub fn position_of(&self, chassis: &str) -> Option<usize> {
        let key = chassis_key(chassis);
        self.records
            .iter()
            .position(|record| record.chassis_key() == key)
    }

    /// Validates `input` and appends it.
    ///
    /// # Errors
    /// - Any error from [`Record::from_input`].
    /// - `DuplicateChassis` when the chassis is already present.
    pub fn add(&mut self, input: &RecordInput) -> Result<&Record, ValidationError> {
        let record = Record::from_input(input)?;
        if self.chassis_taken(&record.chassis_key(), None) {
            return Err(ValidationError::DuplicateChassis(record.chassis_number));
        }

        self.records.push(record);
        let last = self.records.len() - 1;
        Ok(&self.records[last])
    }

    /// Removes every record whose chassis matches and returns them.
    ///
    /// An empty return means nothing matched and the table is unchanged.
    pub fn remove(&mut self, chassis: &str) -> Vec<Record> {
        let key = chassis_key(chassis);
        if key.is_empty() {
            return Vec::new();
        }

        let (removed, kept): (Vec<Record>, Vec<Record>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|record| record.chassis_key() == key);
        self.records = kept;
        removed
    }

    /// Validates `input` and overwrites the record at `index`.
    ///
    /// The record being replaced is excluded from the duplicate check, so
    /// keeping the same chassis is always allowed.
    pub fn update(&mut self, index: usize, input: &RecordInput) -> Result<&Record, ValidationError> {
        if index >= self.records.len() {
            return Err(ValidationError::NoSuchRecord(index));
        }

        let record = Record::from_input(input)?;
        if self.chassis_taken(&record.chassis_key(), Some(index)) {
            return Err(ValidationError::DuplicateChassis(record.chassis_number));
        }

        self.records[index] = record;
        Ok(&self.records[index])
    }

    fn chassis_taken(&self, key: &str, except: Option<usize>) -> bool {
        self.records
            .iter()
            .enumerate()
            .any(|(index, record)| Some(index) != except && record.chassis_key() == key)
    }
}

impl From<Vec<Record>> for Table {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{SearchField, Table};
    use crate::model::record::{Record, RecordInput, ValidationError};

    fn input(name: &str, chassis: &str) -> RecordInput {
        RecordInput {
            customer_name: name.to_string(),
            car_model: "Corolla".to_string(),
            chassis_number: chassis.to_string(),
            sold_for: "6000".to_string(),
            selling_date: "2023-02-01".to_string(),
        }
    }

    fn seeded() -> Table {
        Table::from(vec![Record::new(
            "Alice",
            "Civic",
            "CH001",
            "5000",
            "2023-01-01",
        )])
    }

    #[test]
    fn blank_query_returns_nothing() {
        let table = seeded();
        assert!(table.find(SearchField::CustomerName, "   ").is_empty());
        assert!(table.find(SearchField::ChassisNumber, "").is_empty());
    }

    #[test]
    fn remove_with_blank_chassis_is_noop() {
        let mut table = seeded();
        assert!(table.remove("  ").is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn update_out_of_range_is_rejected() {
        let mut table = seeded();
        let err = table.update(3, &input("Bob", "CH009")).unwrap_err();
        assert_eq!(err, ValidationError::NoSuchRecord(3));
    }

    #[test]
    fn position_of_matches_case_insensitively() {
        let table = seeded();
        assert_eq!(table.position_of(" ch001 "), Some(0));
        assert_eq!(table.position_of("CH002"), None);
    }
}
