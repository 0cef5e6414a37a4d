//! Signal aggregator.
//!
//! Pure summary statistics over a record list: count, year span and
//! histogram, and frequency-ranked venues, title keywords, and co-authors.
//! Computed twice per researcher each run — once over the accepted set and
//! once over the curator-confirmed false positives — so a reviewer can see
//! what a true match looks like next to what was filtered out.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use facpub_db::Publication;

/// Ranking depth for venues, keywords, and co-authors.
pub const TOP_N: usize = 10;

/// Tokens dropped from title keyword extraction: English function words plus
/// the bibliometric filler that appears in almost every title.
const STOPWORDS: &[&str] = &[
    "about", "after", "among", "analysis", "and", "are", "assessment", "associated",
    "association", "based", "before", "between", "can", "case", "clinical", "cohort",
    "comparison", "does", "during", "early", "effect", "effects", "evaluation", "follow",
    "for", "from", "has", "have", "impact", "into", "late", "long", "new", "not", "novel",
    "outcome", "outcomes", "over", "report", "results", "review", "role", "short",
    "studies", "study", "term", "than", "that", "the", "their", "through", "toward",
    "trial", "under", "use", "using", "versus", "what", "when", "with", "within", "without",
];

const MIN_TOKEN_LEN: usize = 3;

/// One ranked entry: display label plus occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedLabel {
    pub label: String,
    pub count: u64,
}

/// Per-researcher summary over one record set.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signals {
    pub count: usize,
    pub year_min: Option<i64>,
    pub year_max: Option<i64>,
    pub years: BTreeMap<i64, u64>,
    pub venues: Vec<RankedLabel>,
    pub keywords: Vec<RankedLabel>,
    pub coauthors: Vec<RankedLabel>,
}

/// Compute signals for a record list. `coauthors` maps PMID to the co-author
/// display names stored for the researcher.
pub fn compute_signals(
    records: &[Publication],
    coauthors: &HashMap<String, Vec<String>>,
) -> Signals {
    let mut signals = Signals {
        count: records.len(),
        ..Default::default()
    };

    let mut venue_counts: HashMap<String, (String, u64)> = HashMap::new();
    let mut keyword_counts: HashMap<String, (String, u64)> = HashMap::new();
    let mut coauthor_counts: HashMap<String, (String, u64)> = HashMap::new();

    for record in records {
        if let Some(year) = record.year {
            *signals.years.entry(year).or_insert(0) += 1;
            signals.year_min = Some(signals.year_min.map_or(year, |y| y.min(year)));
            signals.year_max = Some(signals.year_max.map_or(year, |y| y.max(year)));
        }

        if let Some(journal) = &record.journal {
            bump(&mut venue_counts, journal);
        }

        for keyword in title_keywords(&record.title) {
            bump(&mut keyword_counts, &keyword);
        }

        if let Some(names) = coauthors.get(&record.pmid) {
            for name in names {
                bump(&mut coauthor_counts, name);
            }
        }
    }

    signals.venues = ranked(venue_counts);
    signals.keywords = ranked(keyword_counts);
    signals.coauthors = ranked(coauthor_counts);
    signals
}

/// Count under a normalised grouping key, keeping the first-seen casing as
/// the display label.
fn bump(counts: &mut HashMap<String, (String, u64)>, label: &str) {
    let key = normalize_label(label);
    if key.is_empty() {
        return;
    }
    counts
        .entry(key)
        .and_modify(|(_, n)| *n += 1)
        .or_insert_with(|| (label.to_string(), 1));
}

/// Frequency ranking, ties broken by lexicographic label, truncated to
/// [`TOP_N`].
fn ranked(counts: HashMap<String, (String, u64)>) -> Vec<RankedLabel> {
    let mut entries: Vec<RankedLabel> = counts
        .into_values()
        .map(|(label, count)| RankedLabel { label, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries.truncate(TOP_N);
    entries
}

/// Extract keywords from a title: lowercase, collapse non-alphanumerics to
/// spaces, drop short tokens and stopwords.
pub fn title_keywords(title: &str) -> Vec<String> {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .filter(|token| !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(pmid: &str, title: &str, journal: &str, year: Option<i64>) -> Publication {
        Publication {
            pmid: pmid.to_string(),
            title: title.to_string(),
            journal: Some(journal.to_string()),
            year,
            doi: None,
            url: None,
        }
    }

    #[test]
    fn stopworded_title_keeps_only_diabetes() {
        let keywords = title_keywords("Outcomes of Long-Term Follow-Up Studies in Diabetes");
        assert_eq!(keywords, vec!["diabetes".to_string()]);
    }

    #[test]
    fn hyphens_split_into_tokens() {
        let keywords = title_keywords("Graft-versus-host disease");
        assert_eq!(keywords, vec!["graft".to_string(), "host".to_string(), "disease".to_string()]);
    }

    #[test]
    fn year_histogram_and_span() {
        let records = vec![
            publication("1", "Alpha kidney", "J One", Some(2020)),
            publication("2", "Beta kidney", "J One", Some(2022)),
            publication("3", "Gamma kidney", "J Two", Some(2020)),
            publication("4", "Delta kidney", "J Two", None),
        ];
        let signals = compute_signals(&records, &HashMap::new());

        assert_eq!(signals.count, 4);
        assert_eq!(signals.year_min, Some(2020));
        assert_eq!(signals.year_max, Some(2022));
        assert_eq!(signals.years.get(&2020), Some(&2));
        assert_eq!(signals.years.get(&2022), Some(&1));
    }

    #[test]
    fn venues_group_on_normalised_name_but_keep_display_casing() {
        let records = vec![
            publication("1", "A kidney", "J. Clin. Invest.", Some(2020)),
            publication("2", "B kidney", "J Clin Invest", Some(2021)),
            publication("3", "C kidney", "Lancet", Some(2021)),
        ];
        let signals = compute_signals(&records, &HashMap::new());

        assert_eq!(signals.venues[0].label, "J. Clin. Invest.");
        assert_eq!(signals.venues[0].count, 2);
        assert_eq!(signals.venues[1].label, "Lancet");
    }

    #[test]
    fn ranking_ties_break_lexicographically() {
        let records = vec![
            publication("1", "A kidney", "Beta Journal", Some(2020)),
            publication("2", "B kidney", "Alpha Journal", Some(2020)),
        ];
        let signals = compute_signals(&records, &HashMap::new());

        assert_eq!(signals.venues[0].label, "Alpha Journal");
        assert_eq!(signals.venues[1].label, "Beta Journal");
    }

    #[test]
    fn coauthor_frequencies_come_from_the_lookup() {
        let records = vec![
            publication("1", "A kidney", "J", Some(2020)),
            publication("2", "B kidney", "J", Some(2021)),
        ];
        let mut coauthors = HashMap::new();
        coauthors.insert(
            "1".to_string(),
            vec!["Chen W".to_string(), "Okafor C".to_string()],
        );
        coauthors.insert("2".to_string(), vec!["Chen W".to_string()]);

        let signals = compute_signals(&records, &coauthors);
        assert_eq!(signals.coauthors[0].label, "Chen W");
        assert_eq!(signals.coauthors[0].count, 2);
        assert_eq!(signals.coauthors[1].label, "Okafor C");
        assert_eq!(signals.coauthors[1].count, 1);
    }

    #[test]
    fn empty_input_yields_empty_signals() {
        let signals = compute_signals(&[], &HashMap::new());
        assert_eq!(signals.count, 0);
        assert_eq!(signals.year_min, None);
        assert!(signals.venues.is_empty());
    }
}
