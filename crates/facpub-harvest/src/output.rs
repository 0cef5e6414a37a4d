//! Output document for the reporting view.
//!
//! One JSON file, overwritten atomically each run (written to a temp file in
//! the same directory, then renamed over the target).

use std::path::Path;

use serde::Serialize;
use tracing::info;

use facpub_common::Result;

use crate::awards::Award;
use crate::models::Authorship;
use crate::signals::Signals;

#[derive(Debug, Serialize)]
pub struct OutputDoc {
    /// ISO timestamp of this run.
    pub updated: String,
    pub source: String,
    pub faculty: Vec<FacultyEntry>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyEntry {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    pub programs: Vec<String>,
    pub publications: Vec<PublicationEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_counts: Option<AuthorCounts>,
    pub signals: SignalPair,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub awards: Vec<Award>,
    /// Set when this researcher's harvest failed; the entry is then empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationEntry {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorship: Option<Authorship>,
}

/// Accepted-set summary of where the researcher sits in author lists.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorCounts {
    pub first: usize,
    pub last: usize,
    pub sole: usize,
    pub middle: usize,
}

impl AuthorCounts {
    pub fn tally<'a>(authorships: impl Iterator<Item = &'a Authorship>) -> Self {
        let mut counts = AuthorCounts::default();
        for a in authorships {
            if a.is_sole() {
                counts.sole += 1;
            } else if a.is_first {
                counts.first += 1;
            } else if a.is_last {
                counts.last += 1;
            } else {
                counts.middle += 1;
            }
        }
        counts
    }
}

/// Accepted-set and rejected-set signals, side by side for the curation view.
#[derive(Debug, Default, Serialize)]
pub struct SignalPair {
    pub positive: Signals,
    pub negative: Signals,
}

/// Serialise and atomically replace the output document.
pub fn write_atomic(path: &Path, doc: &OutputDoc) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(doc)?;

    let mut tmp = match parent {
        Some(parent) => tempfile::NamedTempFile::new_in(parent)?,
        None => tempfile::NamedTempFile::new_in(".")?,
    };
    std::io::Write::write_all(&mut tmp, &json)?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), bytes = json.len(), "output document written");
    Ok(())
}
