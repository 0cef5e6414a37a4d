//! Facpub Database Layer
//!
//! Embedded SQLite store for the harvesting pipeline. Holds canonical
//! publication rows, per-faculty association rows, human curation verdicts,
//! and per-(faculty, publication) co-author rows. Every write is an upsert
//! keyed by primary key, so a crashed run can simply be re-run.

pub mod associations;
pub mod coauthors;
pub mod curation;
pub mod database;
pub mod error;
pub mod publications;
pub mod schema;

pub use database::Database;
pub use error::{DbError, Result};
pub use curation::{CurationSeed, Verdict};
pub use publications::Publication;
