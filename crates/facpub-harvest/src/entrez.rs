//! Entrez E-utilities source.
//!
//! Endpoints used:
//!   esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi
//!
//! Search returns a ranked PMID list; details are fetched in batches of at
//! most [`EFETCH_CHUNK`] ids and parsed from `PubmedArticleSet` XML, keeping
//! the full ordered author list with per-author affiliations and identifiers.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, instrument, warn};

use facpub_common::{FacpubError, Result};

use crate::client::RetryingClient;
use crate::models::{ArticleAuthor, ArticleRecord};

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// Provider batch limit for detail fetches.
pub const EFETCH_CHUNK: usize = 100;

/// Search-and-fetch interface of the provider. The pipeline is generic over
/// this so tests can substitute a canned source.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Run a search expression, returning candidate PMIDs.
    async fn search(&self, term: &str, retmax: usize) -> Result<Vec<String>>;

    /// Fetch full records for a list of PMIDs.
    async fn fetch(&self, pmids: &[String]) -> Result<Vec<ArticleRecord>>;
}

pub struct EntrezClient {
    client: RetryingClient,
    tool: String,
    email: String,
    api_key: Option<String>,
    /// Pause between consecutive provider requests.
    pause: Duration,
}

impl EntrezClient {
    pub fn new(
        client: RetryingClient,
        tool: &str,
        email: &str,
        api_key: Option<String>,
        pause: Duration,
    ) -> Self {
        Self {
            client,
            tool: tool.to_string(),
            email: email.to_string(),
            api_key,
            pause,
        }
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("tool", self.tool.clone()),
            ("email", self.email.clone()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }
}

#[async_trait]
impl RecordSource for EntrezClient {
    #[instrument(skip(self))]
    async fn search(&self, term: &str, retmax: usize) -> Result<Vec<String>> {
        let mut params = self.base_params();
        params.push(("term", term.to_string()));
        params.push(("retmax", retmax.to_string()));
        params.push(("retmode", "json".to_string()));

        let resp = self.client.get_json(ESEARCH_URL, &params).await?;

        let ids: Vec<String> = resp
            .pointer("/esearchresult/idlist")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        debug!(n = ids.len(), "esearch returned candidates");
        Ok(ids)
    }

    #[instrument(skip(self, pmids), fields(n = pmids.len()))]
    async fn fetch(&self, pmids: &[String]) -> Result<Vec<ArticleRecord>> {
        let mut records = Vec::with_capacity(pmids.len());

        for (i, chunk) in pmids.chunks(EFETCH_CHUNK).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.pause).await;
            }

            let mut params = self.base_params();
            params.push(("id", chunk.join(",")));
            params.push(("rettype", "abstract".to_string()));
            params.push(("retmode", "xml".to_string()));

            let xml = self.client.get_text(EFETCH_URL, &params).await?;
            records.extend(parse_article_set(&xml)?);
        }

        Ok(records)
    }
}

/// Parse `PubmedArticleSet` XML into records.
///
/// State machine over quick-xml events; only first/author-level PMIDs and
/// identifiers are taken, and the PMIDs inside `CommentsCorrections` blocks
/// are skipped.
pub fn parse_article_set(xml: &str) -> Result<Vec<ArticleRecord>> {
    let mut records = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<ArticleRecord> = None;
    let mut author: Option<ArticleAuthor> = None;

    let mut in_pmid = false;
    let mut in_comments = false;
    let mut in_title = false;
    let mut in_journal = false;
    let mut in_journal_title = false;
    let mut in_pubdate = false;
    let mut in_year = false;
    let mut in_month = false;
    let mut in_day = false;
    let mut in_medline_date = false;
    let mut in_last_name = false;
    let mut in_fore_name = false;
    let mut in_initials = false;
    let mut in_affiliation = false;
    let mut identifier_source: Option<String> = None;
    let mut elocation_type: Option<String> = None;
    let mut article_id_type: Option<String> = None;

    let mut year = String::new();
    let mut month = String::new();
    let mut day = String::new();

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"PubmedArticle" => {
                    current = Some(ArticleRecord::default());
                    year.clear();
                    month.clear();
                    day.clear();
                }
                b"PMID" => in_pmid = true,
                b"CommentsCorrections" => in_comments = true,
                b"ArticleTitle" => in_title = true,
                b"Journal" => in_journal = true,
                b"Title" if in_journal => in_journal_title = true,
                b"PubDate" => in_pubdate = true,
                b"Year" if in_pubdate => in_year = true,
                b"Month" if in_pubdate => in_month = true,
                b"Day" if in_pubdate => in_day = true,
                b"MedlineDate" if in_pubdate => in_medline_date = true,
                b"Author" => author = Some(ArticleAuthor::default()),
                b"LastName" => in_last_name = true,
                b"ForeName" => in_fore_name = true,
                b"Initials" => in_initials = true,
                b"Affiliation" => in_affiliation = true,
                b"Identifier" => {
                    identifier_source = attribute(e, b"Source")?;
                }
                b"ELocationID" => {
                    elocation_type = attribute(e, b"EIdType")?;
                }
                b"ArticleId" => {
                    article_id_type = attribute(e, b"IdType")?;
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if let Some(ref mut a) = author {
                    if in_last_name {
                        a.family = Some(text.clone());
                    } else if in_fore_name {
                        a.given = Some(text.clone());
                    } else if in_initials {
                        a.initials = Some(text.clone());
                    } else if in_affiliation {
                        a.affiliations.push(text.clone());
                    } else if identifier_source.as_deref() == Some("ORCID") {
                        a.orcid = Some(text.clone());
                    }
                } else if let Some(ref mut record) = current {
                    if in_pmid && !in_comments && record.pmid.is_empty() {
                        record.pmid = text;
                    } else if in_title {
                        // Titles may contain inline markup; accumulate the
                        // text nodes instead of keeping only the last one.
                        if !record.title.is_empty() {
                            record.title.push(' ');
                        }
                        record.title.push_str(&text);
                    } else if in_journal_title {
                        record.journal = Some(text);
                    } else if in_year {
                        year = text;
                    } else if in_month {
                        month = text;
                    } else if in_day {
                        day = text;
                    } else if in_medline_date && year.is_empty() {
                        // e.g. "2020 Jan-Feb": the leading token carries the year.
                        year = text.chars().take(4).collect();
                    } else if elocation_type.as_deref() == Some("doi") && record.doi.is_none() {
                        record.doi = Some(text);
                    } else if article_id_type.as_deref() == Some("doi") && record.doi.is_none() {
                        record.doi = Some(text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"PMID" => in_pmid = false,
                b"CommentsCorrections" => in_comments = false,
                b"ArticleTitle" => in_title = false,
                b"Journal" => in_journal = false,
                b"Title" => in_journal_title = false,
                b"PubDate" => in_pubdate = false,
                b"Year" => in_year = false,
                b"Month" => in_month = false,
                b"Day" => in_day = false,
                b"MedlineDate" => in_medline_date = false,
                b"LastName" => in_last_name = false,
                b"ForeName" => in_fore_name = false,
                b"Initials" => in_initials = false,
                b"Affiliation" => in_affiliation = false,
                b"Identifier" => identifier_source = None,
                b"ELocationID" => elocation_type = None,
                b"ArticleId" => article_id_type = None,
                b"Author" => {
                    if let (Some(a), Some(ref mut record)) = (author.take(), current.as_mut()) {
                        record.authors.push(a);
                    }
                }
                b"PubmedArticle" => {
                    if let Some(mut record) = current.take() {
                        record.year = year.parse::<i64>().ok();
                        record.pub_date = assemble_date(&year, &month, &day);
                        if record.title.is_empty() || record.pmid.is_empty() {
                            warn!(pmid = %record.pmid, "skipping article with missing pmid/title");
                        } else {
                            records.push(record);
                        }
                        year.clear();
                        month.clear();
                        day.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FacpubError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

fn attribute(e: &quick_xml::events::BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| FacpubError::Xml(err.to_string()))?;
    Ok(attr.map(|a| String::from_utf8_lossy(&a.value).into_owned()))
}

/// Best-available publication date; month and day default to 1 when missing.
fn assemble_date(year: &str, month: &str, day: &str) -> Option<chrono::NaiveDate> {
    let y: i32 = year.parse().ok()?;
    let m = month_number(month).unwrap_or(1);
    let d: u32 = day.parse().unwrap_or(1);
    chrono::NaiveDate::from_ymd_opt(y, m, d)
}

fn month_number(month: &str) -> Option<u32> {
    if let Ok(n) = month.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    match month.get(..3).map(|m| m.to_ascii_lowercase()).as_deref() {
        Some("jan") => Some(1),
        Some("feb") => Some(2),
        Some("mar") => Some(3),
        Some("apr") => Some(4),
        Some("may") => Some(5),
        Some("jun") => Some(6),
        Some("jul") => Some(7),
        Some("aug") => Some(8),
        Some("sep") => Some(9),
        Some("oct") => Some(10),
        Some("nov") => Some(11),
        Some("dec") => Some(12),
        _ => None,
    }
}
