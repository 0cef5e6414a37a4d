//! Canonical publication rows.
//!
//! Keyed by PMID and globally deduplicated: one row per record no matter how
//! many faculty are linked to it. Re-upserting overwrites the metadata fields
//! and touches `updated_at`; rows are never deleted.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Publication {
    pub pmid: String,
    pub title: String,
    pub journal: Option<String>,
    pub year: Option<i64>,
    pub doi: Option<String>,
    pub url: Option<String>,
}

/// Insert or update a publication row.
pub async fn upsert_publication(pool: &SqlitePool, publication: &Publication) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO publications (pmid, title, journal, year, doi, url, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(pmid) DO UPDATE SET
            title      = excluded.title,
            journal    = excluded.journal,
            year       = excluded.year,
            doi        = excluded.doi,
            url        = excluded.url,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&publication.pmid)
    .bind(&publication.title)
    .bind(&publication.journal)
    .bind(publication.year)
    .bind(&publication.doi)
    .bind(&publication.url)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one publication by PMID.
pub async fn load_publication(pool: &SqlitePool, pmid: &str) -> Result<Option<Publication>> {
    let row = sqlx::query_as::<_, Publication>(
        "SELECT pmid, title, journal, year, doi, url FROM publications WHERE pmid = ?",
    )
    .bind(pmid)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Publications currently accepted for a faculty member: associated rows minus
/// anything a curator has confirmed as a false positive. Ordered newest first
/// with PMID as a deterministic tiebreaker.
pub async fn accepted_publications(pool: &SqlitePool, faculty_id: &str) -> Result<Vec<Publication>> {
    let rows = sqlx::query_as::<_, Publication>(
        r#"
        SELECT p.pmid, p.title, p.journal, p.year, p.doi, p.url
        FROM publications p
        JOIN faculty_publications fp ON fp.pmid = p.pmid
        LEFT JOIN curation c ON c.faculty_id = fp.faculty_id AND c.pmid = fp.pmid
        WHERE fp.faculty_id = ?
          AND (c.verdict IS NULL OR c.verdict != 'false_positive')
        ORDER BY p.year IS NULL, p.year DESC, p.pmid
        "#,
    )
    .bind(faculty_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Publications a curator confirmed as false positives for a faculty member.
/// Feeds the rejected-set signals so reviewers can compare both sides.
pub async fn rejected_publications(pool: &SqlitePool, faculty_id: &str) -> Result<Vec<Publication>> {
    let rows = sqlx::query_as::<_, Publication>(
        r#"
        SELECT p.pmid, p.title, p.journal, p.year, p.doi, p.url
        FROM publications p
        JOIN curation c ON c.pmid = p.pmid
        WHERE c.faculty_id = ? AND c.verdict = 'false_positive'
        ORDER BY p.year IS NULL, p.year DESC, p.pmid
        "#,
    )
    .bind(faculty_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
