//! Data models for the harvesting pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One spelling of a researcher's name. Spelling varies across records, so a
/// researcher carries a set of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameVariant {
    pub given: String,
    pub family: String,
}

/// A roster member whose publications we harvest. Constructed once per run
/// from the roster file and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Researcher {
    /// Stable slug, derived from the roster id or name+contact.
    pub id: String,
    pub display_name: String,
    pub variants: Vec<NameVariant>,
    pub orcid: Option<String>,
    /// Department label for the reporting view.
    pub department: Option<String>,
    /// Affiliation signature terms matched against author affiliations.
    pub match_terms: Vec<String>,
    pub programs: Vec<String>,
    /// Tenure start; bounds the harvest window when no explicit start is set.
    pub start_date: Option<NaiveDate>,
}

/// One author entry from a fetched record, in list order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleAuthor {
    pub family: Option<String>,
    pub given: Option<String>,
    pub initials: Option<String>,
    pub orcid: Option<String>,
    pub affiliations: Vec<String>,
}

impl ArticleAuthor {
    /// Display name in citation form, e.g. "Larson EW".
    pub fn display_name(&self) -> String {
        let family = self.family.as_deref().unwrap_or("");
        let tail = self
            .initials
            .as_deref()
            .or(self.given.as_deref())
            .unwrap_or("");
        if tail.is_empty() {
            family.to_string()
        } else {
            format!("{family} {tail}")
        }
    }
}

/// A record fetched from the details endpoint, with its ordered author list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub pmid: String,
    pub title: String,
    pub journal: Option<String>,
    pub year: Option<i64>,
    pub doi: Option<String>,
    pub pub_date: Option<NaiveDate>,
    pub authors: Vec<ArticleAuthor>,
}

impl ArticleRecord {
    pub fn canonical_url(&self) -> String {
        format!("https://pubmed.ncbi.nlm.nih.gov/{}/", self.pmid)
    }
}

/// Where the researcher sits in a record's author list. A sole author is both
/// first and last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorship {
    pub position: usize,
    pub total: usize,
    pub is_first: bool,
    pub is_last: bool,
}

impl Authorship {
    pub fn new(position: usize, total: usize) -> Self {
        Self {
            position,
            total,
            is_first: position == 0,
            is_last: position + 1 == total,
        }
    }

    pub fn is_sole(&self) -> bool {
        self.is_first && self.is_last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sole_author_is_first_and_last() {
        let a = Authorship::new(0, 1);
        assert!(a.is_first && a.is_last && a.is_sole());
    }

    #[test]
    fn last_of_five() {
        let a = Authorship::new(4, 5);
        assert_eq!(a.position, 4);
        assert_eq!(a.total, 5);
        assert!(!a.is_first);
        assert!(a.is_last);
        assert!(!a.is_sole());
    }

    #[test]
    fn display_name_prefers_initials() {
        let author = ArticleAuthor {
            family: Some("Larson".to_string()),
            given: Some("Erin W".to_string()),
            initials: Some("EW".to_string()),
            ..Default::default()
        };
        assert_eq!(author.display_name(), "Larson EW");
    }
}
