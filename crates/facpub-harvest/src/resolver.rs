//! Identity & affiliation resolver.
//!
//! Decides, per fetched record, whether the matched author really is the
//! target researcher. Matching runs in priority order: a persistent
//! identifier match wins outright; otherwise the family name must match
//! exactly after normalisation and the given names must be compatible
//! (exact, prefix in either direction, or first-initial equality when
//! initials matching is on). The first author position satisfying the test
//! wins. A match then passes the affiliation gate before the record is
//! accepted.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{ArticleAuthor, ArticleRecord, Authorship, Researcher};

/// Resolver policy knobs, lifted straight from the run configuration.
#[derive(Debug, Clone)]
pub struct MatchPolicy {
    pub match_initials: bool,
    pub validate_affiliation: bool,
    /// A matched author with zero recorded affiliation strings is kept when
    /// true (missing data should not silently drop a likely-true match).
    pub accept_missing_affiliation: bool,
    /// Institution term allowed in addition to the researcher's own terms.
    pub default_term: String,
}

/// Per-researcher resolution output.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Accepted candidate PMIDs, in input order.
    pub accepted: Vec<String>,
    pub dates: HashMap<String, NaiveDate>,
    pub coauthors: HashMap<String, Vec<String>>,
    pub authorship: HashMap<String, Authorship>,
    /// PMIDs accepted despite having no affiliation data on the matched
    /// author; surfaced so the researcher's run can log a warning.
    pub missing_affiliation: Vec<String>,
}

/// Resolve a batch of fetched records for one researcher.
pub fn resolve_records(
    researcher: &Researcher,
    records: &[ArticleRecord],
    policy: &MatchPolicy,
) -> Resolution {
    let mut out = Resolution::default();

    for record in records {
        let Some(position) = match_author_position(researcher, &record.authors, policy.match_initials)
        else {
            debug!(pmid = %record.pmid, "no author position matched");
            continue;
        };

        let matched = &record.authors[position];
        let decision = if policy.validate_affiliation {
            affiliation_decision(matched, researcher, &policy.default_term)
        } else {
            AffiliationDecision::Accepted
        };

        match decision {
            AffiliationDecision::Rejected => {
                debug!(pmid = %record.pmid, "affiliation mismatch, record rejected");
                continue;
            }
            AffiliationDecision::NoData => {
                if !policy.accept_missing_affiliation {
                    debug!(pmid = %record.pmid, "no affiliation on file, record rejected by policy");
                    continue;
                }
                warn!(
                    pmid = %record.pmid,
                    researcher = %researcher.id,
                    "matched author has no affiliation on file, keeping record"
                );
                out.missing_affiliation.push(record.pmid.clone());
            }
            AffiliationDecision::Accepted => {}
        }

        out.accepted.push(record.pmid.clone());
        if let Some(date) = record.pub_date {
            out.dates.insert(record.pmid.clone(), date);
        }
        out.authorship.insert(
            record.pmid.clone(),
            Authorship::new(position, record.authors.len()),
        );
        out.coauthors.insert(
            record.pmid.clone(),
            record
                .authors
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != position)
                .map(|(_, a)| a.display_name())
                .collect(),
        );
    }

    out
}

/// Find the first author position that matches the researcher.
pub fn match_author_position(
    researcher: &Researcher,
    authors: &[ArticleAuthor],
    match_initials: bool,
) -> Option<usize> {
    let researcher_orcid = researcher.orcid.as_deref().map(normalize_orcid);

    authors.iter().position(|author| {
        if let (Some(want), Some(have)) = (
            researcher_orcid.as_deref(),
            author.orcid.as_deref().map(normalize_orcid).as_deref(),
        ) {
            if want == have {
                return true;
            }
        }
        researcher
            .variants
            .iter()
            .any(|variant| author_matches_variant(author, &variant.given, &variant.family, match_initials))
    })
}

fn author_matches_variant(
    author: &ArticleAuthor,
    given: &str,
    family: &str,
    match_initials: bool,
) -> bool {
    let author_family = match author.family.as_deref() {
        Some(f) => normalize_letters(f),
        None => return false,
    };
    if author_family != normalize_letters(family) {
        return false;
    }

    let author_given = author
        .given
        .as_deref()
        .or(author.initials.as_deref())
        .map(normalize_letters)
        .unwrap_or_default();
    let variant_given = normalize_letters(given);

    if author_given.is_empty() || variant_given.is_empty() {
        // Family-only entries only ever match through the identifier path.
        return false;
    }

    if author_given == variant_given
        || author_given.starts_with(&variant_given)
        || variant_given.starts_with(&author_given)
    {
        return true;
    }

    match_initials && author_given.chars().next() == variant_given.chars().next()
}

enum AffiliationDecision {
    Accepted,
    Rejected,
    NoData,
}

/// Accept when any normalised affiliation of the matched author contains any
/// normalised allowed term as a substring.
fn affiliation_decision(
    author: &ArticleAuthor,
    researcher: &Researcher,
    default_term: &str,
) -> AffiliationDecision {
    if author.affiliations.is_empty() {
        return AffiliationDecision::NoData;
    }

    let terms: Vec<String> = researcher
        .match_terms
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(default_term))
        .map(normalize_alnum)
        .filter(|t| !t.is_empty())
        .collect();

    let hit = author.affiliations.iter().any(|affiliation| {
        let normalized = normalize_alnum(affiliation);
        terms.iter().any(|term| normalized.contains(term.as_str()))
    });

    if hit {
        AffiliationDecision::Accepted
    } else {
        AffiliationDecision::Rejected
    }
}

/// Lowercase, letters only. Family and given names compare in this form.
fn normalize_letters(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Lowercase, alphanumerics only. Affiliation strings and terms compare in
/// this form.
fn normalize_alnum(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Strip separators from an ORCID; tolerates the full orcid.org URL form.
fn normalize_orcid(s: &str) -> String {
    let stripped: String = s
        .chars()
        .filter(|c| c.is_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    stripped
        .strip_prefix("HTTPSORCIDORG")
        .or_else(|| stripped.strip_prefix("HTTPORCIDORG"))
        .unwrap_or(&stripped)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NameVariant;

    fn researcher(variants: &[(&str, &str)], orcid: Option<&str>, terms: &[&str]) -> Researcher {
        Researcher {
            id: "test".to_string(),
            display_name: "Test Researcher".to_string(),
            variants: variants
                .iter()
                .map(|(given, family)| NameVariant {
                    given: given.to_string(),
                    family: family.to_string(),
                })
                .collect(),
            orcid: orcid.map(str::to_string),
            department: None,
            match_terms: terms.iter().map(|t| t.to_string()).collect(),
            programs: vec![],
            start_date: None,
        }
    }

    fn author(family: &str, given: &str, affiliations: &[&str]) -> ArticleAuthor {
        ArticleAuthor {
            family: Some(family.to_string()),
            given: Some(given.to_string()),
            initials: None,
            orcid: None,
            affiliations: affiliations.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn record(pmid: &str, authors: Vec<ArticleAuthor>) -> ArticleRecord {
        ArticleRecord {
            pmid: pmid.to_string(),
            title: "T".to_string(),
            authors,
            ..Default::default()
        }
    }

    fn policy() -> MatchPolicy {
        MatchPolicy {
            match_initials: true,
            validate_affiliation: true,
            accept_missing_affiliation: true,
            default_term: "university of minnesota".to_string(),
        }
    }

    #[test]
    fn affiliation_filters_out_other_institution() {
        // Two candidates, same author name, different institutions: only the
        // Minnesota one survives.
        let r = researcher(&[("Erin", "Larson")], None, &["dept of medicine"]);
        let records = vec![
            record(
                "1",
                vec![author("Larson", "Erin W", &["University of Minnesota Dept of Medicine"])],
            ),
            record("2", vec![author("Larson", "Erin W", &["University of Wisconsin"])]),
        ];

        let res = resolve_records(&r, &records, &policy());
        assert_eq!(res.accepted, vec!["1".to_string()]);
    }

    #[test]
    fn given_name_prefix_matches_both_directions() {
        let r = researcher(&[("Jane", "Smith")], None, &[]);
        let mut p = policy();
        p.validate_affiliation = false;

        // "J" is a prefix of "Jane".
        let res = resolve_records(&r, &[record("1", vec![author("Smith", "J", &[])])], &p);
        assert_eq!(res.accepted, vec!["1".to_string()]);

        // "Jane" is a prefix of "Jane Q".
        let res = resolve_records(&r, &[record("2", vec![author("Smith", "Jane Q", &[])])], &p);
        assert_eq!(res.accepted, vec!["2".to_string()]);
    }

    #[test]
    fn variant_order_yields_single_acceptance() {
        let r = researcher(&[("J", "Smith"), ("Jane", "Smith")], None, &[]);
        let mut p = policy();
        p.validate_affiliation = false;

        for name in ["J", "Jane"] {
            let res = resolve_records(&r, &[record("1", vec![author("Smith", name, &[])])], &p);
            assert_eq!(res.accepted, vec!["1".to_string()]);
            assert_eq!(res.authorship.get("1").map(|a| a.position), Some(0));
        }
    }

    #[test]
    fn initials_never_accepted_when_disabled_and_no_orcid() {
        let r = researcher(&[("Margaret", "Kim")], None, &[]);
        let mut p = policy();
        p.match_initials = false;
        p.validate_affiliation = false;

        // Same first initial, different name: only initial-level matching
        // would accept this.
        let res = resolve_records(&r, &[record("1", vec![author("Kim", "Minji", &[])])], &p);
        assert!(res.accepted.is_empty());

        // With initials matching enabled the same entry would match.
        p.match_initials = true;
        let res = resolve_records(&r, &[record("1", vec![author("Kim", "Minji", &[])])], &p);
        assert_eq!(res.accepted, vec!["1".to_string()]);
    }

    #[test]
    fn orcid_match_beats_name_mismatch() {
        let r = researcher(&[("Robert", "Jones")], Some("0000-0002-1825-0097"), &[]);
        let mut a = author("Smithson", "Bobby", &[]);
        a.orcid = Some("https://orcid.org/0000-0002-1825-0097".to_string());
        let mut p = policy();
        p.validate_affiliation = false;

        let res = resolve_records(&r, &[record("1", vec![a])], &p);
        assert_eq!(res.accepted, vec!["1".to_string()]);
    }

    #[test]
    fn first_matching_position_wins() {
        let r = researcher(&[("Erin", "Larson")], None, &[]);
        let mut p = policy();
        p.validate_affiliation = false;

        let records = vec![record(
            "1",
            vec![
                author("Chen", "Wei", &[]),
                author("Larson", "Erin", &[]),
                author("Larson", "E", &[]),
            ],
        )];
        let res = resolve_records(&r, &records, &p);
        let a = res.authorship.get("1").copied().unwrap();
        assert_eq!(a.position, 1);
        assert_eq!(a.total, 3);
    }

    #[test]
    fn fifth_of_five_authors_is_last_not_first() {
        let r = researcher(&[("Erin", "Larson")], None, &[]);
        let mut p = policy();
        p.validate_affiliation = false;

        let records = vec![record(
            "1",
            vec![
                author("A", "Q", &[]),
                author("B", "Q", &[]),
                author("C", "Q", &[]),
                author("D", "Q", &[]),
                author("Larson", "Erin", &[]),
            ],
        )];
        let res = resolve_records(&r, &records, &p);
        let a = res.authorship.get("1").copied().unwrap();
        assert_eq!((a.position, a.total, a.is_first, a.is_last), (4, 5, false, true));
    }

    #[test]
    fn missing_affiliation_follows_policy_flag() {
        let r = researcher(&[("Erin", "Larson")], None, &["minnesota"]);
        let records = vec![record("1", vec![author("Larson", "Erin", &[])])];

        let res = resolve_records(&r, &records, &policy());
        assert_eq!(res.accepted, vec!["1".to_string()]);
        assert_eq!(res.missing_affiliation, vec!["1".to_string()]);

        let mut strict = policy();
        strict.accept_missing_affiliation = false;
        let res = resolve_records(&r, &records, &strict);
        assert!(res.accepted.is_empty());
    }

    #[test]
    fn coauthors_exclude_the_matched_researcher() {
        let r = researcher(&[("Erin", "Larson")], None, &[]);
        let mut p = policy();
        p.validate_affiliation = false;

        let records = vec![record(
            "1",
            vec![
                author("Chen", "Wei", &[]),
                author("Larson", "Erin", &[]),
                author("Okafor", "Chiamaka", &[]),
            ],
        )];
        let res = resolve_records(&r, &records, &p);
        assert_eq!(
            res.coauthors.get("1"),
            Some(&vec!["Chen Wei".to_string(), "Okafor Chiamaka".to_string()])
        );
    }

    #[test]
    fn family_only_entries_do_not_match_by_name() {
        let r = researcher(&[("Erin", "Larson")], None, &[]);
        let mut p = policy();
        p.validate_affiliation = false;

        let collective = ArticleAuthor {
            family: Some("Larson".to_string()),
            ..Default::default()
        };
        let res = resolve_records(&r, &[record("1", vec![collective])], &p);
        assert!(res.accepted.is_empty());
    }

    #[test]
    fn resolved_dates_are_keyed_by_pmid() {
        let r = researcher(&[("Erin", "Larson")], None, &[]);
        let mut p = policy();
        p.validate_affiliation = false;

        let mut rec = record("1", vec![author("Larson", "Erin", &[])]);
        rec.pub_date = NaiveDate::from_ymd_opt(2021, 3, 15);
        let res = resolve_records(&r, &[rec], &p);
        assert_eq!(
            res.dates.get("1").copied(),
            NaiveDate::from_ymd_opt(2021, 3, 15)
        );
    }

    #[test]
    fn orcid_normalisation_tolerates_url_form() {
        assert_eq!(
            normalize_orcid("https://orcid.org/0000-0002-1825-0097"),
            normalize_orcid("0000-0002-1825-0097")
        );
    }
}
