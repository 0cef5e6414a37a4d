//! Retrying network client.
//!
//! One client is shared by the Entrez search, the Entrez detail fetch, and the
//! RePORTER awards source. Transient conditions (connect/timeout failures,
//! rate-limit and server-busy statuses) are retried with exponential backoff
//! and multiplicative jitter; any other error status fails immediately with
//! the response body captured.

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use facpub_common::{FacpubError, Result};

/// Statuses worth another attempt: rate limiting and server unavailability.
const RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 7,
            base_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(user_agent: &str, policy: RetryPolicy) -> Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(user_agent.to_string())
            .timeout(policy.timeout)
            .build()?;

        Ok(Self { client, policy })
    }

    /// GET returning the response body as text.
    pub async fn get_text(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        let response = self
            .execute(|| self.client.get(url).query(params))
            .await?;
        Ok(response.text().await?)
    }

    /// GET returning parsed JSON.
    pub async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<serde_json::Value> {
        let response = self
            .execute(|| self.client.get(url).query(params))
            .await?;
        Ok(response.json().await?)
    }

    /// POST with a JSON body, returning parsed JSON.
    pub async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let response = self.execute(|| self.client.post(url).json(body)).await?;
        Ok(response.json().await?)
    }

    /// Send a request, retrying transient failures up to the attempt budget.
    async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_failure = String::new();

        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(&self.policy, attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, last = %last_failure, "retrying request");
                tokio::time::sleep(delay).await;
            }

            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!(attempt, %status, "request succeeded");
                        return Ok(response);
                    }
                    if is_retryable_status(status) {
                        last_failure = format!("HTTP {status}");
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(FacpubError::Provider {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(err) if err.is_timeout() || err.is_connect() => {
                    last_failure = err.to_string();
                    continue;
                }
                Err(err) => return Err(FacpubError::Http(err)),
            }
        }

        Err(FacpubError::RetriesExhausted {
            attempts: self.policy.max_attempts,
            last: last_failure,
        })
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}

/// Exponential backoff with multiplicative jitter: base doubles per attempt,
/// then is scaled by a uniform factor in [0.75, 1.25].
fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let exp = policy.base_delay.as_millis() as f64 * 2f64.powi(attempt.saturating_sub(1) as i32);
    let jitter = rand::thread_rng().gen_range(0.75..=1.25);
    Duration::from_millis((exp * jitter) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_cover_rate_limit_and_unavailability() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn backoff_doubles_within_jitter_bounds() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(400),
            ..Default::default()
        };
        for attempt in 1..6u32 {
            let expected = 400f64 * 2f64.powi(attempt as i32 - 1);
            let delay = backoff_delay(&policy, attempt).as_millis() as f64;
            assert!(delay >= expected * 0.75 - 1.0, "attempt {attempt}: {delay} too short");
            assert!(delay <= expected * 1.25 + 1.0, "attempt {attempt}: {delay} too long");
        }
    }
}
