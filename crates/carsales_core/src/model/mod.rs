//! Sales record domain model.
//!
//! # Responsibility
//! - Define the flat car-sale record and its input normalization rules.
//! - Provide the in-memory table with lookup and validated mutations.
//!
//! # Invariants
//! - Chassis number is the only key, compared trimmed and case-insensitively.
//! - Table operations never touch storage; callers load and save explicitly.

pub mod record;
pub mod table;
