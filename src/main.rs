mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use dss_extract::config::{self, PollPolicy, ServiceConfig};
use dss_extract::extract::{
    ExtractionJob, ExtractionKind, Extractor, IdentifierKind, DEFAULT_COMPOSITE_FIELDS,
};
use dss_extract::fetch::{self, Credentials, HttpTransport};
use dss_extract::records;
use dss_extract::stream::{self, StreamRequest};

#[tokio::main]
async fn main() -> Result<()> {
    // load .env before logging and credentials read the environment
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let transport =
        HttpTransport::from_config(&config).context("Failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, stopping");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Extract {
            kind,
            identifier,
            id_type,
            fields,
            conditions,
            output,
        } => {
            let mut job = ExtractionJob::new(kind, fields, id_type, identifier);
            if !conditions.is_empty() {
                job = job.with_condition(conditions);
            }
            run_extract(&config, &transport, job, output.as_deref(), &cancel).await?;
        }
        Commands::Composite {
            isins,
            fields,
            concurrency,
        } => {
            let fields = if fields.is_empty() {
                DEFAULT_COMPOSITE_FIELDS.iter().map(|f| f.to_string()).collect()
            } else {
                fields
            };
            let jobs = isins
                .into_iter()
                .map(|isin| {
                    ExtractionJob::new(
                        ExtractionKind::Composite,
                        fields.iter().cloned(),
                        IdentifierKind::Isin,
                        isin,
                    )
                })
                .collect();
            run_composite(&config, &transport, jobs, concurrency, &cancel).await?;
        }
        Commands::Stream {
            identifier,
            id_type,
            start,
            end,
            csv,
        } => {
            let request = StreamRequest {
                start_date: start,
                end_date: end,
                identifier_kind: id_type,
                identifier,
            };
            run_stream(&config, &transport, &request, csv.as_deref()).await?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = config::resolve_service_config(cli.config.as_deref())
        .context("Failed to load service configuration")?;

    if let Some(interval) = cli.interval {
        config.poll.interval_secs = interval;
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.poll.max_attempts = Some(max_attempts);
    }
    if let Some(deadline) = cli.deadline {
        config.poll.deadline_secs = Some(deadline);
    }
    config::validate_service_config(&config).context("Invalid command line overrides")?;

    Ok(config)
}

async fn run_extract(
    config: &ServiceConfig,
    transport: &HttpTransport,
    mut job: ExtractionJob,
    output: Option<&Path>,
    cancel: &CancellationToken,
) -> Result<()> {
    let credentials = Credentials::extraction_from_env()?;
    let session = fetch::request_extraction_session(transport, config, &credentials)
        .await
        .context("Failed to obtain extraction token")?;

    let extractor = Extractor::new(&session, transport).with_prefer_wait(config.prefer_wait_secs);
    let policy: PollPolicy = config.poll_policy();
    extractor
        .drive(&mut job, &policy, cancel)
        .await
        .with_context(|| format!("{} extraction for {} did not complete", job.kind, job.identifier))?;

    match output {
        Some(path) => {
            records::save_extraction_body(job.result(), path)?;
            println!("Saved result to {}", path.display());
        }
        None => println!("{}", job.result_text()),
    }
    Ok(())
}

async fn run_composite(
    config: &ServiceConfig,
    transport: &HttpTransport,
    mut jobs: Vec<ExtractionJob>,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let credentials = Credentials::extraction_from_env()?;
    let session = fetch::request_extraction_session(transport, config, &credentials)
        .await
        .context("Failed to obtain extraction token")?;

    let extractor = Extractor::new(&session, transport).with_prefer_wait(config.prefer_wait_secs);
    let results = extractor
        .drive_all(&mut jobs, &config.poll_policy(), cancel, concurrency)
        .await;

    let mut failures = 0;
    for (job, result) in jobs.iter().zip(results) {
        match result {
            Ok(()) => println!("{}\t{}", job.identifier, job.result_text()),
            Err(err) => {
                failures += 1;
                if err.is_transient() {
                    log::warn!("{}: {} (worth retrying)", job.identifier, err);
                } else {
                    log::error!("{}: {}", job.identifier, err);
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} composite extractions failed", failures, jobs.len());
    }
    Ok(())
}

async fn run_stream(
    config: &ServiceConfig,
    transport: &HttpTransport,
    request: &StreamRequest,
    csv: Option<&Path>,
) -> Result<()> {
    let credentials = Credentials::stream_from_env()?;
    let session = fetch::request_stream_session(transport, config, &credentials)
        .await
        .context("Failed to obtain stream token")?;

    let result = stream::fetch_stream(&session, transport, request)
        .await?
        .into_result();

    match csv {
        Some(path) => {
            let rows = records::save_stream_csv(&result, path)?;
            println!("Saved {} rows to {}", rows, path.display());
        }
        None => {
            for (series, date, value) in result.rows() {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    date.format("%Y-%m-%d"),
                    series.data_type,
                    series.symbol,
                    series.currency,
                    value
                );
            }
        }
    }
    Ok(())
}
