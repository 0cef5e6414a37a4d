//! End-to-end harvesting pipeline.
//!
//! Orchestrates the full flow for one run:
//!   1. One-time legacy curation seeding (skipped once any verdict exists)
//!   2. Per researcher, strictly in sequence:
//!      a. Build the search expression from name variants / ORCID / window
//!      b. esearch for candidate PMIDs
//!      c. efetch details in batches
//!      d. Resolve author identity and affiliation
//!      e. Upsert publications, associations, and co-author rows
//!      f. Apply curation overrides, fetching curated PMIDs the search no
//!         longer surfaces
//!      g. Aggregate signals over the accepted and rejected sets
//!   3. Write the output document atomically
//!
//! One researcher failing never aborts the run; the entry is emitted empty
//! with the error attached and the run report drives the exit status.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use tracing::{info, instrument, warn};

use facpub_common::{Config, Result};
use facpub_db::{associations, coauthors, curation, publications};
use facpub_db::{Database, Publication, Verdict};

use crate::awards::ReporterClient;
use crate::entrez::RecordSource;
use crate::models::{ArticleRecord, Researcher};
use crate::output::{
    self, AuthorCounts, FacultyEntry, OutputDoc, PublicationEntry, SignalPair,
};
use crate::query::{build_term, resolve_window};
use crate::resolver::{match_author_position, resolve_records, MatchPolicy, Resolution};
use crate::signals::compute_signals;

const SOURCE_NAME: &str = "entrez";

/// Summary of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub researchers: usize,
    /// Ids of researchers whose harvest failed.
    pub failed: Vec<String>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run the pipeline for the whole roster and write the output document.
#[instrument(skip_all, fields(researchers = roster.len()))]
pub async fn run_pipeline<S: RecordSource>(
    config: &Config,
    source: &S,
    awards: Option<&ReporterClient>,
    db: &Database,
    roster: &[Researcher],
) -> Result<RunReport> {
    let t0 = std::time::Instant::now();

    if let Some(seed_path) = &config.legacy_curation_path {
        curation::seed_legacy(db.pool(), seed_path).await?;
    }

    let today = Utc::now().date_naive();
    let mut faculty = Vec::with_capacity(roster.len());
    let mut failed = Vec::new();

    for (i, researcher) in roster.iter().enumerate() {
        if i > 0 {
            // Provider politeness: fixed pause between researchers.
            tokio::time::sleep(config.request_pause).await;
        }

        match harvest_researcher(config, source, awards, db, researcher, today).await {
            Ok(entry) => faculty.push(entry),
            Err(err) => {
                warn!(researcher = %researcher.id, error = %err, "harvest failed, emitting empty entry");
                failed.push(researcher.id.clone());
                faculty.push(FacultyEntry {
                    id: researcher.id.clone(),
                    name: researcher.display_name.clone(),
                    department: researcher.department.clone(),
                    orcid: researcher.orcid.clone(),
                    programs: researcher.programs.clone(),
                    error: Some(err.to_string()),
                    ..Default::default()
                });
            }
        }
    }

    let doc = OutputDoc {
        updated: Utc::now().to_rfc3339(),
        source: SOURCE_NAME.to_string(),
        faculty,
    };
    output::write_atomic(&config.output_path, &doc)?;

    let report = RunReport {
        researchers: roster.len(),
        failed,
        duration_ms: t0.elapsed().as_millis() as u64,
    };

    info!(
        researchers = report.researchers,
        failed = report.failed.len(),
        duration_ms = report.duration_ms,
        "pipeline run complete"
    );

    Ok(report)
}

/// Harvest one researcher: search, resolve, persist, curate, aggregate.
#[instrument(skip_all, fields(researcher = %researcher.id))]
async fn harvest_researcher<S: RecordSource>(
    config: &Config,
    source: &S,
    awards: Option<&ReporterClient>,
    db: &Database,
    researcher: &Researcher,
    today: chrono::NaiveDate,
) -> Result<FacultyEntry> {
    let pool = db.pool();

    let window = resolve_window(researcher, config.window_start, config.window_end, today);
    let term = build_term(researcher, &window, config.match_initials);

    let pmids = source.search(&term, config.max_results).await?;
    info!(candidates = pmids.len(), "search complete");

    let records = source.fetch(&pmids).await?;
    let by_pmid: HashMap<&str, &ArticleRecord> =
        records.iter().map(|r| (r.pmid.as_str(), r)).collect();

    let policy = MatchPolicy {
        match_initials: config.match_initials,
        validate_affiliation: config.validate_affiliation,
        accept_missing_affiliation: config.accept_missing_affiliation,
        default_term: config.default_institution_term.clone(),
    };
    let mut resolution = resolve_records(researcher, &records, &policy);
    info!(
        accepted = resolution.accepted.len(),
        fetched = records.len(),
        "resolution complete"
    );

    // ── Persist the automatically accepted set ────────────────────────────────
    for pmid in &resolution.accepted {
        let record = match by_pmid.get(pmid.as_str()) {
            Some(record) => *record,
            None => continue,
        };
        publications::upsert_publication(pool, &to_publication(record)).await?;
        associations::upsert_association(pool, &researcher.id, pmid, SOURCE_NAME).await?;
        if let Some(names) = resolution.coauthors.get(pmid) {
            coauthors::replace_coauthors(pool, &researcher.id, pmid, names).await?;
        }
    }

    // ── Curation overrides ────────────────────────────────────────────────────
    let verdicts = curation::verdicts_for(pool, &researcher.id).await?;
    apply_curation(db, researcher, source, &verdicts, &by_pmid, &mut resolution).await?;

    // ── Assemble the entry from the store ─────────────────────────────────────
    let accepted = publications::accepted_publications(pool, &researcher.id).await?;
    let rejected = publications::rejected_publications(pool, &researcher.id).await?;
    let coauthor_map = coauthors::coauthors_for(pool, &researcher.id).await?;

    let publication_entries: Vec<PublicationEntry> = accepted
        .iter()
        .map(|p| PublicationEntry {
            id: p.pmid.clone(),
            title: p.title.clone(),
            journal: p.journal.clone(),
            year: p.year,
            doi: p.doi.clone(),
            url: p.url.clone(),
            authorship: resolution.authorship.get(&p.pmid).copied(),
        })
        .collect();

    let known_authorships: Vec<_> = accepted
        .iter()
        .filter_map(|p| resolution.authorship.get(&p.pmid))
        .collect();
    let author_counts = (!known_authorships.is_empty())
        .then(|| AuthorCounts::tally(known_authorships.into_iter()));

    let signals = SignalPair {
        positive: compute_signals(&accepted, &coauthor_map),
        negative: compute_signals(&rejected, &coauthor_map),
    };

    let awards = match awards {
        Some(client) => {
            let fiscal_years: Vec<i64> =
                (window.start.year() as i64..=window.end.year() as i64).collect();
            client.search_awards(researcher, &fiscal_years).await?
        }
        None => Vec::new(),
    };

    Ok(FacultyEntry {
        id: researcher.id.clone(),
        name: researcher.display_name.clone(),
        department: researcher.department.clone(),
        orcid: researcher.orcid.clone(),
        programs: researcher.programs.clone(),
        publications: publication_entries,
        author_counts,
        signals,
        awards,
        error: None,
    })
}

/// Enforce curation verdicts against this run's batch.
///
/// True positives are force-included: the association row is written even when
/// automatic matching rejected (or never saw) the record. Curated PMIDs the
/// search no longer surfaces get a dedicated metadata fetch when the store has
/// no row yet, so the output stays complete. False positives need no write
/// here — the accepted-set read excludes them.
async fn apply_curation<S: RecordSource>(
    db: &Database,
    researcher: &Researcher,
    source: &S,
    verdicts: &HashMap<String, Verdict>,
    batch: &HashMap<&str, &ArticleRecord>,
    resolution: &mut Resolution,
) -> Result<()> {
    let pool = db.pool();

    let mut to_fetch: Vec<String> = Vec::new();
    for pmid in verdicts.keys() {
        if batch.contains_key(pmid.as_str()) {
            continue;
        }
        if publications::load_publication(pool, pmid).await?.is_none() {
            to_fetch.push(pmid.clone());
        }
    }
    to_fetch.sort();

    let fetched = if to_fetch.is_empty() {
        Vec::new()
    } else {
        info!(n = to_fetch.len(), "fetching curated records missing from the batch");
        source.fetch(&to_fetch).await?
    };

    for record in &fetched {
        publications::upsert_publication(pool, &to_publication(record)).await?;
    }

    for (pmid, verdict) in verdicts {
        if *verdict != Verdict::TruePositive {
            continue;
        }

        associations::upsert_association(pool, &researcher.id, pmid, "curation").await?;

        // Recover authorship facts and co-authors when the author list is at
        // hand, whether from this run's batch or the dedicated fetch.
        let record = batch
            .get(pmid.as_str())
            .copied()
            .or_else(|| fetched.iter().find(|r| &r.pmid == pmid));
        let Some(record) = record else { continue };

        if resolution.authorship.contains_key(pmid) {
            continue;
        }
        if let Some(position) =
            match_author_position(researcher, &record.authors, true)
        {
            resolution.authorship.insert(
                pmid.clone(),
                crate::models::Authorship::new(position, record.authors.len()),
            );
            let names: Vec<String> = record
                .authors
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != position)
                .map(|(_, a)| a.display_name())
                .collect();
            coauthors::replace_coauthors(pool, &researcher.id, pmid, &names).await?;
        }
    }

    Ok(())
}

fn to_publication(record: &ArticleRecord) -> Publication {
    Publication {
        pmid: record.pmid.clone(),
        title: record.title.clone(),
        journal: record.journal.clone(),
        year: record.year,
        doi: record.doi.clone(),
        url: Some(record.canonical_url()),
    }
}
