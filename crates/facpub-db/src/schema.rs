//! Table definitions.
//!
//! Publication rows are global (one row per PMID regardless of how many
//! faculty link to it) and never deleted, so false positives and historical
//! co-authorship stay inspectable.

pub const MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS publications(
  pmid        TEXT PRIMARY KEY,
  title       TEXT NOT NULL,
  journal     TEXT,
  year        INTEGER,
  doi         TEXT,
  url         TEXT,
  updated_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS faculty_publications(
  faculty_id    TEXT NOT NULL,
  pmid          TEXT NOT NULL,
  first_seen_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
  last_seen_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
  source        TEXT NOT NULL DEFAULT 'entrez',
  PRIMARY KEY(faculty_id, pmid)
);
CREATE INDEX IF NOT EXISTS idx_fp_faculty ON faculty_publications(faculty_id);

CREATE TABLE IF NOT EXISTS curation(
  faculty_id  TEXT NOT NULL,
  pmid        TEXT NOT NULL,
  verdict     TEXT NOT NULL CHECK (verdict IN ('true_positive','false_positive')),
  reason      TEXT,
  updated_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
  PRIMARY KEY(faculty_id, pmid)
);

CREATE TABLE IF NOT EXISTS faculty_publication_coauthors(
  faculty_id  TEXT NOT NULL,
  pmid        TEXT NOT NULL,
  name        TEXT NOT NULL,
  PRIMARY KEY(faculty_id, pmid, name)
);
CREATE INDEX IF NOT EXISTS idx_coauthors_faculty ON faculty_publication_coauthors(faculty_id);
"#;
