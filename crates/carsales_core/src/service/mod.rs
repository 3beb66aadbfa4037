//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate load → mutate → save for front-ends.
//! - Keep callers independent of which backend is in use.

pub mod record_service;
