//! Co-author rows per (faculty, publication) pair.
//!
//! Rebuilt wholesale whenever a record is re-resolved, so the stored list
//! always reflects the latest author list from the provider.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::error::Result;

/// Replace the full co-author list for one (faculty, publication) pair.
pub async fn replace_coauthors(
    pool: &SqlitePool,
    faculty_id: &str,
    pmid: &str,
    names: &[String],
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM faculty_publication_coauthors WHERE faculty_id = ? AND pmid = ?")
        .bind(faculty_id)
        .bind(pmid)
        .execute(&mut *tx)
        .await?;

    for name in names {
        sqlx::query(
            r#"
            INSERT INTO faculty_publication_coauthors (faculty_id, pmid, name)
            VALUES (?, ?, ?)
            ON CONFLICT(faculty_id, pmid, name) DO NOTHING
            "#,
        )
        .bind(faculty_id)
        .bind(pmid)
        .bind(name)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Co-author names for a faculty member, keyed by PMID.
pub async fn coauthors_for(
    pool: &SqlitePool,
    faculty_id: &str,
) -> Result<HashMap<String, Vec<String>>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT pmid, name FROM faculty_publication_coauthors WHERE faculty_id = ? ORDER BY pmid, name",
    )
    .bind(faculty_id)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (pmid, name) in rows {
        map.entry(pmid).or_default().push(name);
    }
    Ok(map)
}
