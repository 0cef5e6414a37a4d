//! facpub-harvest — Publication harvesting pipeline.
//!
//! - Candidate search against Entrez esearch (query built from name variants,
//!   ORCID, and the harvest date window)
//! - Batched efetch of per-record author/affiliation XML
//! - Author identity and affiliation resolution
//! - Persistence of publications, associations, and co-authors
//! - Curation overrides and signal aggregation
//! - NIH RePORTER funding awards (same retrying client, no author resolution)
//! - Final JSON document for the reporting view

pub mod awards;
pub mod client;
pub mod entrez;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod query;
pub mod resolver;
pub mod roster;
pub mod signals;

pub use client::{RetryPolicy, RetryingClient};
pub use entrez::{EntrezClient, RecordSource};
pub use models::{ArticleAuthor, ArticleRecord, Authorship, NameVariant, Researcher};
pub use pipeline::{run_pipeline, RunReport};
