//! Faculty–publication association rows.
//!
//! Insert sets both seen timestamps; a repeat sighting only extends
//! `last_seen_at`, so `first_seen_at` records when the pairing was first
//! attributed.

use sqlx::SqlitePool;

use crate::error::Result;

/// Insert or refresh an association row.
pub async fn upsert_association(
    pool: &SqlitePool,
    faculty_id: &str,
    pmid: &str,
    source: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO faculty_publications (faculty_id, pmid, first_seen_at, last_seen_at, source)
        VALUES (?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, ?)
        ON CONFLICT(faculty_id, pmid) DO UPDATE SET
            last_seen_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(faculty_id)
    .bind(pmid)
    .bind(source)
    .execute(pool)
    .await?;

    Ok(())
}

/// All PMIDs associated with a faculty member, curated or not.
pub async fn association_pmids(pool: &SqlitePool, faculty_id: &str) -> Result<Vec<String>> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT pmid FROM faculty_publications WHERE faculty_id = ? ORDER BY pmid",
    )
    .bind(faculty_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
