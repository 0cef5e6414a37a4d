//! Candidate query builder.
//!
//! Produces the Entrez search expression for one researcher and date window.
//! The expression only needs recall; precision is enforced downstream by the
//! resolver, so the author clause is deliberately broad.

use chrono::NaiveDate;

use crate::models::Researcher;

/// Resolved harvest window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Floor for researchers with no registered tenure start: covers the whole
/// plausible publication record.
fn tenure_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Resolve the harvest window: explicit configuration bounds win, then the
/// researcher's tenure start, then the epoch floor; the end defaults to today.
pub fn resolve_window(
    researcher: &Researcher,
    explicit_start: Option<NaiveDate>,
    explicit_end: Option<NaiveDate>,
    today: NaiveDate,
) -> DateWindow {
    let start = explicit_start
        .or(researcher.start_date)
        .unwrap_or_else(tenure_epoch);
    let end = explicit_end.unwrap_or(today);
    DateWindow { start, end }
}

/// Build the full search expression: author clauses OR'd together, AND'd with
/// the publication-date clause.
pub fn build_term(researcher: &Researcher, window: &DateWindow, match_initials: bool) -> String {
    let mut clauses: Vec<String> = Vec::new();

    for variant in &researcher.variants {
        push_unique(
            &mut clauses,
            format!("\"{} {}\"[Author]", variant.family, variant.given),
        );
    }

    // Initials search casts a much wider net and is only worth the
    // false-positive risk when there is no persistent identifier to pin the
    // author down.
    if researcher.orcid.is_none() && match_initials {
        for variant in &researcher.variants {
            if let Some(initial) = variant.given.chars().next() {
                push_unique(
                    &mut clauses,
                    format!("\"{} {}\"[Author]", variant.family, initial),
                );
            }
        }
    }

    if let Some(orcid) = &researcher.orcid {
        push_unique(&mut clauses, format!("\"{orcid}\"[Author - Identifier]"));
    }

    format!("({}) AND {}", clauses.join(" OR "), date_clause(window))
}

fn date_clause(window: &DateWindow) -> String {
    let fmt = |d: NaiveDate| d.format("%Y/%m/%d").to_string();
    if window.start == window.end {
        format!("\"{}\"[Date - Publication]", fmt(window.start))
    } else {
        format!(
            "(\"{}\"[Date - Publication] : \"{}\"[Date - Publication])",
            fmt(window.start),
            fmt(window.end)
        )
    }
}

fn push_unique(clauses: &mut Vec<String>, clause: String) {
    if !clauses.contains(&clause) {
        clauses.push(clause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NameVariant;

    fn researcher(orcid: Option<&str>) -> Researcher {
        Researcher {
            id: "larson-erin".to_string(),
            display_name: "Erin Larson".to_string(),
            variants: vec![NameVariant {
                given: "Erin".to_string(),
                family: "Larson".to_string(),
            }],
            orcid: orcid.map(str::to_string),
            department: None,
            match_terms: vec![],
            programs: vec![],
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1),
        }
    }

    fn window() -> DateWindow {
        DateWindow {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        }
    }

    #[test]
    fn full_name_and_initial_clauses_without_orcid() {
        let term = build_term(&researcher(None), &window(), true);
        assert!(term.contains("\"Larson Erin\"[Author]"));
        assert!(term.contains("\"Larson E\"[Author]"));
        assert!(!term.contains("[Author - Identifier]"));
    }

    #[test]
    fn initials_clause_suppressed_when_disabled() {
        let term = build_term(&researcher(None), &window(), false);
        assert!(term.contains("\"Larson Erin\"[Author]"));
        assert!(!term.contains("\"Larson E\"[Author]"));
    }

    #[test]
    fn orcid_replaces_initials_clause() {
        let term = build_term(&researcher(Some("0000-0002-1825-0097")), &window(), true);
        assert!(term.contains("\"0000-0002-1825-0097\"[Author - Identifier]"));
        assert!(!term.contains("\"Larson E\"[Author]"));
    }

    #[test]
    fn date_clause_covers_window() {
        let term = build_term(&researcher(None), &window(), true);
        assert!(term.contains(
            "(\"2020/01/01\"[Date - Publication] : \"2024/06/30\"[Date - Publication])"
        ));
    }

    #[test]
    fn single_day_window_collapses_to_one_clause() {
        let day = NaiveDate::from_ymd_opt(2023, 3, 5).unwrap();
        let term = build_term(&researcher(None), &DateWindow { start: day, end: day }, true);
        assert!(term.contains("AND \"2023/03/05\"[Date - Publication]"));
        assert!(!term.contains(" : "));
    }

    #[test]
    fn missing_start_falls_back_to_epoch() {
        let mut r = researcher(None);
        r.start_date = None;
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let w = resolve_window(&r, None, None, today);
        assert_eq!(w.start, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(w.end, today);
    }

    #[test]
    fn explicit_bounds_override_tenure() {
        let r = researcher(None);
        let start = NaiveDate::from_ymd_opt(2022, 7, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
        let w = resolve_window(&r, Some(start), Some(end), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(w, DateWindow { start, end });
    }

    #[test]
    fn duplicate_variants_produce_one_clause() {
        let mut r = researcher(None);
        r.variants.push(NameVariant {
            given: "Erin".to_string(),
            family: "Larson".to_string(),
        });
        let term = build_term(&r, &window(), true);
        assert_eq!(term.matches("\"Larson Erin\"[Author]").count(), 1);
    }
}
