//! Store behaviour against an in-memory database: upsert idempotence,
//! curation overrides, and one-time legacy seeding.

use facpub_db::{associations, coauthors, curation, publications};
use facpub_db::{Database, Publication, Verdict};

fn pub_row(pmid: &str, title: &str, year: i64) -> Publication {
    Publication {
        pmid: pmid.to_string(),
        title: title.to_string(),
        journal: Some("J Test".to_string()),
        year: Some(year),
        doi: None,
        url: Some(format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/")),
    }
}

async fn open_db() -> Database {
    let db = Database::open_in_memory().await.expect("open");
    db.migrate().await.expect("migrate");
    db
}

#[tokio::test]
async fn upsert_publication_overwrites_metadata() {
    let db = open_db().await;

    publications::upsert_publication(db.pool(), &pub_row("100", "Old title", 2019))
        .await
        .expect("insert");
    publications::upsert_publication(db.pool(), &pub_row("100", "New title", 2020))
        .await
        .expect("update");

    let loaded = publications::load_publication(db.pool(), "100")
        .await
        .expect("load")
        .expect("row exists");
    assert_eq!(loaded.title, "New title");
    assert_eq!(loaded.year, Some(2020));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM publications")
        .fetch_one(db.pool())
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn association_repeat_upsert_keeps_single_row() {
    let db = open_db().await;
    publications::upsert_publication(db.pool(), &pub_row("200", "T", 2021))
        .await
        .expect("pub");

    associations::upsert_association(db.pool(), "smith-j", "200", "entrez")
        .await
        .expect("first");
    associations::upsert_association(db.pool(), "smith-j", "200", "entrez")
        .await
        .expect("repeat");

    let pmids = associations::association_pmids(db.pool(), "smith-j")
        .await
        .expect("pmids");
    assert_eq!(pmids, vec!["200".to_string()]);

    let (first_seen, last_seen): (String, String) = sqlx::query_as(
        "SELECT first_seen_at, last_seen_at FROM faculty_publications WHERE faculty_id = ? AND pmid = ?",
    )
    .bind("smith-j")
    .bind("200")
    .fetch_one(db.pool())
    .await
    .expect("row");
    assert!(first_seen <= last_seen);
}

#[tokio::test]
async fn false_positive_verdict_removes_from_accepted_set() {
    let db = open_db().await;
    publications::upsert_publication(db.pool(), &pub_row("300", "Kept", 2020))
        .await
        .expect("pub");
    publications::upsert_publication(db.pool(), &pub_row("301", "Rejected", 2021))
        .await
        .expect("pub");
    associations::upsert_association(db.pool(), "smith-j", "300", "entrez")
        .await
        .expect("assoc");
    associations::upsert_association(db.pool(), "smith-j", "301", "entrez")
        .await
        .expect("assoc");

    curation::set_verdict(db.pool(), "smith-j", "301", Verdict::FalsePositive, "wrong person")
        .await
        .expect("verdict");

    let accepted = publications::accepted_publications(db.pool(), "smith-j")
        .await
        .expect("accepted");
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].pmid, "300");

    let rejected = publications::rejected_publications(db.pool(), "smith-j")
        .await
        .expect("rejected");
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].pmid, "301");
}

#[tokio::test]
async fn new_verdict_replaces_old_one() {
    let db = open_db().await;
    publications::upsert_publication(db.pool(), &pub_row("400", "Flip", 2022))
        .await
        .expect("pub");
    associations::upsert_association(db.pool(), "smith-j", "400", "entrez")
        .await
        .expect("assoc");

    curation::set_verdict(db.pool(), "smith-j", "400", Verdict::FalsePositive, "first pass")
        .await
        .expect("fp");
    curation::set_verdict(db.pool(), "smith-j", "400", Verdict::TruePositive, "second look")
        .await
        .expect("tp");

    let verdicts = curation::verdicts_for(db.pool(), "smith-j").await.expect("verdicts");
    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts.get("400"), Some(&Verdict::TruePositive));

    let accepted = publications::accepted_publications(db.pool(), "smith-j")
        .await
        .expect("accepted");
    assert_eq!(accepted.len(), 1);
}

#[tokio::test]
async fn coauthors_are_replaced_wholesale() {
    let db = open_db().await;
    publications::upsert_publication(db.pool(), &pub_row("500", "T", 2020))
        .await
        .expect("pub");

    coauthors::replace_coauthors(
        db.pool(),
        "smith-j",
        "500",
        &["Doe A".to_string(), "Roe B".to_string()],
    )
    .await
    .expect("first");
    coauthors::replace_coauthors(db.pool(), "smith-j", "500", &["Poe C".to_string()])
        .await
        .expect("second");

    let map = coauthors::coauthors_for(db.pool(), "smith-j").await.expect("map");
    assert_eq!(map.get("500"), Some(&vec!["Poe C".to_string()]));
}

#[tokio::test]
async fn legacy_seed_runs_at_most_once() {
    let db = open_db().await;

    let dir = tempfile::tempdir().expect("tempdir");
    let seed_path = dir.path().join("curation_seed.json");
    std::fs::write(
        &seed_path,
        r#"{"smith-j": {"true_positives": ["600"], "false_positives": ["601"]}}"#,
    )
    .expect("write seed");

    let inserted = curation::seed_legacy(db.pool(), &seed_path).await.expect("seed");
    assert_eq!(inserted, 2);

    // Operator corrects a seeded verdict, then the pipeline re-runs with the
    // legacy file still on disk.
    curation::set_verdict(db.pool(), "smith-j", "601", Verdict::TruePositive, "actually ours")
        .await
        .expect("correct");

    let inserted_again = curation::seed_legacy(db.pool(), &seed_path).await.expect("reseed");
    assert_eq!(inserted_again, 0);

    let verdicts = curation::verdicts_for(db.pool(), "smith-j").await.expect("verdicts");
    assert_eq!(verdicts.get("601"), Some(&Verdict::TruePositive));
}
