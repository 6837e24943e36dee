//! Core data models for the bucket inventory.
//!
//! Endpoints and listing pages describe what comes over the wire; object
//! records are the flat, persisted inventory; aggregates are views derived
//! from the records.

pub mod aggregate;
pub mod bucket;
pub mod listing;
pub mod object;
