//! Roster ingestion.
//!
//! One CSV row per researcher–program pairing. Rows sharing an id merge into
//! a single researcher: name spellings accumulate as variants, program tags
//! union, and the first non-empty value wins for single-valued fields. Rows
//! with no name fields are skipped silently.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use facpub_common::{FacpubError, Result};

use crate::models::{NameVariant, Researcher};

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default)]
    orcid: String,
    #[serde(default)]
    contact: String,
    #[serde(default)]
    department: String,
    /// Pipe-delimited affiliation/contact signature terms.
    #[serde(default)]
    signature_terms: String,
    #[serde(default)]
    program: String,
    /// Tenure start, M/D/YYYY.
    #[serde(default)]
    start_date: String,
}

/// Load and merge the roster file.
pub fn load_roster(path: &Path) -> Result<Vec<Researcher>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| FacpubError::Roster(format!("{}: {e}", path.display())))?;

    let mut merged: BTreeMap<String, Researcher> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in reader.deserialize::<RosterRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                debug!(error = %e, "unreadable roster row skipped");
                skipped += 1;
                continue;
            }
        };

        if row.given_name.is_empty() && row.family_name.is_empty() {
            skipped += 1;
            continue;
        }

        let id = if row.id.is_empty() {
            slugify(&format!("{} {} {}", row.given_name, row.family_name, row.contact))
        } else {
            slugify(&row.id)
        };

        let entry = merged.entry(id.clone()).or_insert_with(|| Researcher {
            id,
            display_name: format!("{} {}", row.given_name, row.family_name)
                .trim()
                .to_string(),
            variants: Vec::new(),
            orcid: None,
            department: None,
            match_terms: Vec::new(),
            programs: Vec::new(),
            start_date: None,
        });

        let variant = NameVariant {
            given: row.given_name.clone(),
            family: row.family_name.clone(),
        };
        if !entry.variants.contains(&variant) {
            entry.variants.push(variant);
        }

        if entry.orcid.is_none() && !row.orcid.is_empty() {
            entry.orcid = Some(row.orcid.clone());
        }
        if entry.department.is_none() && !row.department.is_empty() {
            entry.department = Some(row.department.clone());
        }
        for term in row.signature_terms.split('|') {
            let term = term.trim().to_string();
            if !term.is_empty() && !entry.match_terms.contains(&term) {
                entry.match_terms.push(term);
            }
        }
        if !row.program.is_empty() && !entry.programs.contains(&row.program) {
            entry.programs.push(row.program.clone());
        }
        if entry.start_date.is_none() && !row.start_date.is_empty() {
            entry.start_date = NaiveDate::parse_from_str(&row.start_date, "%m/%d/%Y").ok();
        }
    }

    let roster: Vec<Researcher> = merged.into_values().collect();
    info!(researchers = roster.len(), skipped, "roster loaded");
    Ok(roster)
}

fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}
