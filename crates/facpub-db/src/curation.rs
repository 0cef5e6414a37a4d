//! Human curation verdicts.
//!
//! A verdict overrides automatic matching for one (faculty, publication) pair:
//! `true_positive` forces inclusion, `false_positive` forces exclusion. At
//! most one verdict exists per pair; writing a new one replaces the old.
//! Verdicts are operator-supplied — the pipeline itself only reads them,
//! except for the one-time legacy seeding below.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    TruePositive,
    FalsePositive,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::TruePositive => "true_positive",
            Verdict::FalsePositive => "false_positive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "true_positive" => Some(Verdict::TruePositive),
            "false_positive" => Some(Verdict::FalsePositive),
            _ => None,
        }
    }
}

/// Write a verdict, replacing any previous verdict for the pair.
pub async fn set_verdict(
    pool: &SqlitePool,
    faculty_id: &str,
    pmid: &str,
    verdict: Verdict,
    reason: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO curation (faculty_id, pmid, verdict, reason, updated_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(faculty_id, pmid) DO UPDATE SET
            verdict    = excluded.verdict,
            reason     = excluded.reason,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(faculty_id)
    .bind(pmid)
    .bind(verdict.as_str())
    .bind(reason)
    .execute(pool)
    .await?;

    Ok(())
}

/// All verdicts for one faculty member, keyed by PMID.
pub async fn verdicts_for(pool: &SqlitePool, faculty_id: &str) -> Result<HashMap<String, Verdict>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT pmid, verdict FROM curation WHERE faculty_id = ?",
    )
    .bind(faculty_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(pmid, v)| Verdict::parse(&v).map(|verdict| (pmid, verdict)))
        .collect())
}

/// True while no curation row exists yet.
pub async fn curation_is_empty(pool: &SqlitePool) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM curation")
        .fetch_one(pool)
        .await?;
    Ok(count == 0)
}

/// Per-faculty verdict lists from the legacy flat file.
#[derive(Debug, Default, Deserialize)]
pub struct CurationSeed {
    #[serde(default)]
    pub true_positives: Vec<String>,
    #[serde(default)]
    pub false_positives: Vec<String>,
}

const SEED_REASON: &str = "seeded from legacy verdict file";

/// One-time import of the legacy per-faculty true/false-positive lists.
///
/// Runs only while the curation table is empty, so manual edits made after the
/// first import are never clobbered. Returns the number of rows inserted.
pub async fn seed_legacy(pool: &SqlitePool, path: &Path) -> Result<usize> {
    if !curation_is_empty(pool).await? {
        debug!("curation table is not empty, skipping legacy seed");
        return Ok(0);
    }
    if !path.exists() {
        debug!(path = %path.display(), "no legacy curation file, skipping seed");
        return Ok(0);
    }

    let raw = std::fs::read_to_string(path)?;
    let seeds: HashMap<String, CurationSeed> = serde_json::from_str(&raw)
        .map_err(|e| DbError::Seed(format!("{}: {e}", path.display())))?;

    let mut inserted = 0;
    for (faculty_id, seed) in &seeds {
        for pmid in &seed.true_positives {
            set_verdict(pool, faculty_id, pmid, Verdict::TruePositive, SEED_REASON).await?;
            inserted += 1;
        }
        for pmid in &seed.false_positives {
            set_verdict(pool, faculty_id, pmid, Verdict::FalsePositive, SEED_REASON).await?;
            inserted += 1;
        }
    }

    info!(rows = inserted, path = %path.display(), "seeded curation from legacy file");
    Ok(inserted)
}
