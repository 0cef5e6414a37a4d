//! NIH RePORTER funding-award source.
//!
//! Structurally simpler sibling of the publication harvest: one POST per
//! researcher against the projects search endpoint, no author-position
//! resolution. Shares the retrying client with the Entrez source.

use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument};

use facpub_common::Result;

use crate::client::RetryingClient;
use crate::models::Researcher;

const REPORTER_URL: &str = "https://api.reporter.nih.gov/v2/projects/search";
const PAGE_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Award {
    pub project_num: String,
    pub title: String,
    pub fiscal_year: Option<i64>,
    pub org_name: Option<String>,
    pub award_amount: Option<i64>,
}

pub struct ReporterClient {
    client: RetryingClient,
}

impl ReporterClient {
    pub fn new(client: RetryingClient) -> Self {
        Self { client }
    }

    /// Search awards by PI name over a fiscal-year window.
    #[instrument(skip(self, researcher), fields(researcher = %researcher.id))]
    pub async fn search_awards(
        &self,
        researcher: &Researcher,
        fiscal_years: &[i64],
    ) -> Result<Vec<Award>> {
        let pi_names: Vec<serde_json::Value> = researcher
            .variants
            .iter()
            .map(|v| json!({ "any_name": format!("{} {}", v.family, v.given) }))
            .collect();

        let body = json!({
            "criteria": {
                "pi_names": pi_names,
                "fiscal_years": fiscal_years,
            },
            "limit": PAGE_LIMIT,
            "offset": 0,
        });

        let resp = self.client.post_json(REPORTER_URL, &body).await?;
        let awards = parse_projects(&resp);
        debug!(n = awards.len(), "reporter search returned awards");
        Ok(awards)
    }
}

fn parse_projects(resp: &serde_json::Value) -> Vec<Award> {
    resp.pointer("/results")
        .and_then(|v| v.as_array())
        .map(|results| {
            results
                .iter()
                .filter_map(|project| {
                    let project_num = project.get("project_num")?.as_str()?.to_string();
                    Some(Award {
                        project_num,
                        title: project
                            .get("project_title")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        fiscal_year: project.get("fiscal_year").and_then(|v| v.as_i64()),
                        org_name: project
                            .pointer("/organization/org_name")
                            .and_then(|v| v.as_str())
                            .map(str::to_string),
                        award_amount: project.get("award_amount").and_then(|v| v.as_i64()),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
