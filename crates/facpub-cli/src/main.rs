//! Facpub — faculty publication harvester.
//! Entry point for the batch pipeline binary.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use facpub_common::Config;
use facpub_db::Database;
use facpub_harvest::awards::ReporterClient;
use facpub_harvest::roster::load_roster;
use facpub_harvest::{run_pipeline, EntrezClient, RetryPolicy, RetryingClient};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            // Some researchers failed; the output was still written.
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<bool> {
    let config = Config::from_env()?;
    info!(
        roster = %config.roster_path.display(),
        db = %config.db_path.display(),
        output = %config.output_path.display(),
        "starting harvest run"
    );

    let roster = load_roster(&config.roster_path)?;
    if roster.is_empty() {
        anyhow::bail!("roster {} has no usable rows", config.roster_path.display());
    }

    let db = Database::open(&config.db_path).await?;
    db.migrate().await?;

    let user_agent = format!("{}/0.1 (mailto:{})", config.tool_name, config.contact_email);
    let client = RetryingClient::new(&user_agent, RetryPolicy::default())?;

    let entrez = EntrezClient::new(
        client.clone(),
        &config.tool_name,
        &config.contact_email,
        config.ncbi_api_key.clone(),
        config.request_pause,
    );
    let reporter = config.harvest_awards.then(|| ReporterClient::new(client));

    let report = run_pipeline(&config, &entrez, reporter.as_ref(), &db, &roster).await?;

    if !report.all_succeeded() {
        error!(failed = ?report.failed, "run finished with failed researchers");
    }
    Ok(report.all_succeeded())
}
