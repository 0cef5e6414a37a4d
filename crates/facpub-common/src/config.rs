//! Run configuration.
//! Built once from the process environment (the binary loads `.env` via dotenvy
//! first) and passed immutably into the pipeline driver.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{FacpubError, Result};

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Roster CSV path.
    pub roster_path: PathBuf,
    /// SQLite database file path.
    pub db_path: PathBuf,
    /// Output JSON document path (overwritten atomically each run).
    pub output_path: PathBuf,
    /// Optional legacy curation seed file (JSON of per-faculty verdict lists).
    pub legacy_curation_path: Option<PathBuf>,

    /// Contact email, required by the Entrez usage policy.
    pub contact_email: String,
    /// Tool name reported to Entrez.
    pub tool_name: String,
    /// Optional NCBI API key (raises the rate limit).
    pub ncbi_api_key: Option<String>,

    /// Institution term matched against affiliations in addition to each
    /// researcher's own signature terms.
    pub default_institution_term: String,
    /// Explicit harvest window start; falls back to per-researcher tenure date.
    pub window_start: Option<NaiveDate>,
    /// Explicit harvest window end; falls back to today.
    pub window_end: Option<NaiveDate>,

    /// Gate records on affiliation matching.
    pub validate_affiliation: bool,
    /// Also search last-name-plus-first-initial variants (higher false-positive
    /// risk; the resolver compensates downstream).
    pub match_initials: bool,
    /// Accept a matched author with zero recorded affiliation strings.
    pub accept_missing_affiliation: bool,
    /// Also harvest NIH RePORTER funding awards.
    pub harvest_awards: bool,

    /// Pause between researchers, for provider politeness.
    pub request_pause: Duration,
    /// Maximum candidate identifiers requested per search.
    pub max_results: usize,
}

fn default_tool_name() -> String { "facpub".to_string() }
fn default_institution() -> String { "university of minnesota".to_string() }
fn default_pause_ms() -> u64 { 400 }
fn default_max_results() -> usize { 500 }

impl Config {
    /// Build the configuration from `FACPUB_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let contact_email = env_required("FACPUB_CONTACT_EMAIL")?;

        Ok(Self {
            roster_path: env_or("FACPUB_ROSTER", "data/roster.csv").into(),
            db_path: env_or("FACPUB_DB", "data/facpub.db").into(),
            output_path: env_or("FACPUB_OUTPUT", "data/publications.json").into(),
            legacy_curation_path: env_opt("FACPUB_LEGACY_CURATION").map(PathBuf::from),
            contact_email,
            tool_name: env_or("FACPUB_TOOL", &default_tool_name()),
            ncbi_api_key: env_opt("FACPUB_NCBI_API_KEY"),
            default_institution_term: env_or("FACPUB_INSTITUTION", &default_institution()),
            window_start: env_date("FACPUB_WINDOW_START")?,
            window_end: env_date("FACPUB_WINDOW_END")?,
            validate_affiliation: env_bool("FACPUB_VALIDATE_AFFILIATION", true)?,
            match_initials: env_bool("FACPUB_MATCH_INITIALS", true)?,
            accept_missing_affiliation: env_bool("FACPUB_ACCEPT_MISSING_AFFILIATION", true)?,
            harvest_awards: env_bool("FACPUB_HARVEST_AWARDS", false)?,
            request_pause: Duration::from_millis(
                env_u64("FACPUB_REQUEST_PAUSE_MS", default_pause_ms())?,
            ),
            max_results: env_u64("FACPUB_MAX_RESULTS", default_max_results() as u64)? as usize,
        })
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_required(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        FacpubError::Config(format!(
            "{key} is required (the provider's usage policy wants a contact address)"
        ))
    })
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    match env_opt(key) {
        None => Ok(default),
        Some(v) => parse_bool(&v)
            .ok_or_else(|| FacpubError::Config(format!("{key}: expected true/false, got {v:?}"))),
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match env_opt(key) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| FacpubError::Config(format!("{key}: expected integer, got {v:?}"))),
    }
}

fn env_date(key: &str) -> Result<Option<NaiveDate>> {
    match env_opt(key) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(&v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| FacpubError::Config(format!("{key}: expected YYYY-MM-DD, got {v:?}"))),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
