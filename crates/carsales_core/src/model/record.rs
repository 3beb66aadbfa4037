//! Car-sale record model and input normalization.
//!
//! # Responsibility
//! - Define the flat record persisted by every backend.
//! - Turn raw user input into a normalized record or a validation error.
//!
//! # Invariants
//! - Every text field of a normalized record is trimmed.
//! - `sold_for` of a normalized record is a non-negative decimal string.
//! - `selling_date` of a normalized record is `YYYY-MM-DD`.
//! - Chassis numbers compare through [`chassis_key`] only.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static SOLD_FOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("valid sold_for regex"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Column order shared by every tabular backend.
pub const COLUMN_HEADERS: [&str; 5] = [
    "Customer Name",
    "Car Name/Model",
    "Chassis Number",
    "Sold For",
    "Selling Date",
];

/// Record fields, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    CustomerName,
    CarModel,
    ChassisNumber,
    SoldFor,
    SellingDate,
}

impl RecordField {
    pub const ALL: [RecordField; 5] = [
        Self::CustomerName,
        Self::CarModel,
        Self::ChassisNumber,
        Self::SoldFor,
        Self::SellingDate,
    ];

    /// Canonical column header written by backends.
    pub fn header(self) -> &'static str {
        COLUMN_HEADERS[self.column()]
    }

    /// Zero-based column position.
    pub fn column(self) -> usize {
        match self {
            Self::CustomerName => 0,
            Self::CarModel => 1,
            Self::ChassisNumber => 2,
            Self::SoldFor => 3,
            Self::SellingDate => 4,
        }
    }

    /// Resolves a header cell, accepting legacy spellings.
    ///
    /// Older sheets were written with `Chasis Number` and `Sold For (¥)`.
    /// A leading byte-order mark, as written by some spreadsheet exports, is
    /// ignored.
    pub fn from_header(header: &str) -> Option<Self> {
        match header.trim_start_matches('\u{feff}').trim() {
            "Customer Name" => Some(Self::CustomerName),
            "Car Name/Model" | "Car Model" => Some(Self::CarModel),
            "Chassis Number" | "Chasis Number" => Some(Self::ChassisNumber),
            "Sold For" | "Sold For (¥)" => Some(Self::SoldFor),
            "Selling Date" => Some(Self::SellingDate),
            _ => None,
        }
    }
}

impl Display for RecordField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header())
    }
}

/// One car-sale transaction.
///
/// Values loaded from storage are kept verbatim; only records built through
/// [`Record::from_input`] are guaranteed normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "Car Name/Model")]
    pub car_model: String,
    #[serde(rename = "Chassis Number")]
    pub chassis_number: String,
    #[serde(rename = "Sold For")]
    pub sold_for: String,
    #[serde(rename = "Selling Date")]
    pub selling_date: String,
}

/// Raw, unvalidated field values as entered by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordInput {
    pub customer_name: String,
    pub car_model: String,
    pub chassis_number: String,
    pub sold_for: String,
    pub selling_date: String,
}

/// Validation failures for record mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty after trimming.
    MissingField(RecordField),
    /// Another record already uses this chassis number.
    DuplicateChassis(String),
    /// `Sold For` is not a non-negative number.
    InvalidSoldFor(String),
    /// `Selling Date` is not a recognizable calendar date.
    InvalidDate(String),
    /// Target index is outside the table.
    NoSuchRecord(usize),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is empty"),
            Self::DuplicateChassis(chassis) => {
                write!(f, "chassis number `{chassis}` already exists")
            }
            Self::InvalidSoldFor(value) => {
                write!(f, "sold for `{value}` is not a non-negative number")
            }
            Self::InvalidDate(value) => write!(f, "selling date `{value}` is not a valid date"),
            Self::NoSuchRecord(index) => write!(f, "no record at position {index}"),
        }
    }
}

impl ValidationError {
    /// Field whose value was rejected, when the failure concerns one field.
    pub fn field(&self) -> Option<RecordField> {
        match self {
            Self::MissingField(field) => Some(*field),
            Self::DuplicateChassis(_) => Some(RecordField::ChassisNumber),
            Self::InvalidSoldFor(_) => Some(RecordField::SoldFor),
            Self::InvalidDate(_) => Some(RecordField::SellingDate),
            Self::NoSuchRecord(_) => None,
        }
    }
}

impl Error for ValidationError {}

impl Record {
    /// Builds a record from already-clean values without validation.
    ///
    /// Used by backends and tests; user input goes through [`Record::from_input`].
    pub fn new(
        customer_name: impl Into<String>,
        car_model: impl Into<String>,
        chassis_number: impl Into<String>,
        sold_for: impl Into<String>,
        selling_date: impl Into<String>,
    ) -> Self {
        Self {
            customer_name: customer_name.into(),
            car_model: car_model.into(),
            chassis_number: chassis_number.into(),
            sold_for: sold_for.into(),
            selling_date: selling_date.into(),
        }
    }

    /// Validates and normalizes raw input.
    ///
    /// Does not check chassis uniqueness; that needs the surrounding table.
    ///
    /// # Errors
    /// - `MissingField` when name, model, or chassis is blank.
    /// - `InvalidSoldFor` when the price is not a non-negative decimal.
    /// - `InvalidDate` when the date matches none of the accepted formats.
    pub fn from_input(input: &RecordInput) -> Result<Self, ValidationError> {
        let customer_name = required(&input.customer_name, RecordField::CustomerName)?;
        let car_model = required(&input.car_model, RecordField::CarModel)?;
        let chassis_number = required(&input.chassis_number, RecordField::ChassisNumber)?;
        let sold_for = normalize_sold_for(&input.sold_for)?;
        let selling_date = normalize_selling_date(&input.selling_date)?;

        Ok(Self {
            customer_name,
            car_model,
            chassis_number,
            sold_for,
            selling_date,
        })
    }

    /// Returns the comparison key of this record's chassis number.
    pub fn chassis_key(&self) -> String {
        chassis_key(&self.chassis_number)
    }

    /// Returns the value stored for `field`.
    pub fn field(&self, field: RecordField) -> &str {
        match field {
            RecordField::CustomerName => &self.customer_name,
            RecordField::CarModel => &self.car_model,
            RecordField::ChassisNumber => &self.chassis_number,
            RecordField::SoldFor => &self.sold_for,
            RecordField::SellingDate => &self.selling_date,
        }
    }

    /// Cells in column order.
    pub fn to_row(&self) -> Vec<String> {
        RecordField::ALL
            .iter()
            .map(|field| self.field(*field).to_string())
            .collect()
    }

    /// Converts back into editable input, e.g. to prefill an edit form.
    pub fn to_input(&self) -> RecordInput {
        RecordInput {
            customer_name: self.customer_name.clone(),
            car_model: self.car_model.clone(),
            chassis_number: self.chassis_number.clone(),
            sold_for: self.sold_for.clone(),
            selling_date: self.selling_date.clone(),
        }
    }
}

/// Normalizes a chassis number for comparison: trimmed and uppercased.
pub fn chassis_key(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Trims a price and checks it is a non-negative decimal.
pub fn normalize_sold_for(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if SOLD_FOR_RE.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidSoldFor(trimmed.to_string()))
    }
}

/// Parses a date in any accepted format and renders it as `YYYY-MM-DD`.
pub fn normalize_selling_date(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    let date = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
                .map(|datetime| datetime.date())
        })
        .ok_or_else(|| ValidationError::InvalidDate(trimmed.to_string()))?;

    Ok(date.format("%Y-%m-%d").to_string())
}

fn required(value: &str, field: RecordField) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}
