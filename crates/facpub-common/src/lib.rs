//! facpub-common — Shared error type and run configuration used across all Facpub crates.

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{FacpubError, Result};
