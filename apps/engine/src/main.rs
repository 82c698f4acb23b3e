use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use jobfit::config::{BlobBackend, Config, RecordBackend, S3Config};
use jobfit::gateway::redis::RedisRecordStore;
use jobfit::gateway::s3::S3BlobStore;
use jobfit::gateway::{BlobStore, Gateway, RecordStore};
use jobfit::pipeline::convert::ExternalConverter;
use jobfit::pipeline::{AnalysisPipeline, AnalysisRequest};
use jobfit::platform::PlatformClient;
use jobfit::session::{SessionPhase, SessionStore};
use jobfit::{review, wipe};

#[derive(Parser)]
#[command(name = "jobfit", version, about = "Resume scoring engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show session phase and the signed-in user
    Status,
    /// Sign in to the capability platform
    SignIn,
    /// Sign out
    SignOut,
    /// Analyze a resume PDF against a job description
    Analyze {
        /// Path to the resume PDF
        #[arg(long)]
        file: PathBuf,
        /// Company the posting belongs to
        #[arg(long)]
        company: String,
        /// Job title from the posting
        #[arg(long)]
        job_title: String,
        /// Job description text
        #[arg(long)]
        job_description: String,
    },
    /// Show a stored analysis by record id
    Review { id: Uuid },
    /// Delete every stored blob and flush all records
    Wipe {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobFit engine v{}", env!("CARGO_PKG_VERSION"));

    let gateway = build_gateway(&config).await?;
    let session = SessionStore::new(gateway.clone());

    session.init().await;

    match cli.command {
        Command::Status => {
            let state = session.state();
            println!("phase: {:?}", state.phase);
            if let Some(error) = &state.last_error {
                println!("last error: {error}");
            }
            match &state.user {
                Some(user) => println!("signed in as {}", user.username),
                None => println!("not signed in"),
            }
        }

        Command::SignIn => {
            ensure_initialized(&session)?;
            session.sign_in().await;
            let state = session.state();
            match &state.user {
                Some(user) => println!("signed in as {}", user.username),
                None => bail!(
                    "sign in failed: {}",
                    state
                        .last_error
                        .map(|e| e.message)
                        .unwrap_or_else(|| "not authenticated".to_string())
                ),
            }
        }

        Command::SignOut => {
            ensure_initialized(&session)?;
            session.sign_out().await;
            let state = session.state();
            if let Some(error) = &state.last_error {
                bail!("sign out failed: {error}");
            }
            println!("signed out");
        }

        Command::Analyze {
            file,
            company,
            job_title,
            job_description,
        } => {
            ensure_initialized(&session)?;
            if !session.state().is_authenticated {
                session.sign_in().await;
            }
            let state = session.state();
            if state.phase != SessionPhase::Ready || !state.is_authenticated {
                bail!("analyze requires an authenticated session; run `jobfit sign-in`");
            }

            let document = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("resume.pdf")
                .to_string();

            let converter = Arc::new(ExternalConverter::new(config.converter_cmd.clone()));
            let pipeline = AnalysisPipeline::new(gateway.clone(), session.clone(), converter);

            let id = pipeline
                .run(AnalysisRequest {
                    company_name: company,
                    job_title,
                    job_description,
                    file_name,
                    document: document.into(),
                })
                .await?;

            println!("analysis complete: {id}");
        }

        Command::Review { id } => {
            ensure_initialized(&session)?;
            let view = review::load_view(&gateway, id)
                .await?
                .with_context(|| format!("no record with id {id}"))?;

            let record = &view.record;
            println!("record {}", record.id);
            println!("role: {} at {}", record.job_title, record.company_name);
            println!(
                "resume: {} bytes, preview image: {} bytes",
                view.resume.size(),
                view.image.size()
            );
            match record.feedback() {
                None => println!("status: pending (no feedback yet)"),
                Some(feedback) => {
                    println!("overall:        {}", feedback.overall_score);
                    println!("tone & style:   {}", feedback.tone_and_style.score);
                    println!("content:        {}", feedback.content.score);
                    println!("structure:      {}", feedback.structure.score);
                    println!("skills:         {}", feedback.skills.score);
                    println!("ATS:            {}", feedback.ats.score);
                }
            }
        }

        Command::Wipe { yes } => {
            ensure_initialized(&session)?;
            if !session.state().is_authenticated {
                bail!("wipe requires an authenticated session; run `jobfit sign-in`");
            }
            if !yes {
                bail!("wipe deletes every stored blob and record; pass --yes to confirm");
            }
            let report = wipe::wipe_all(&gateway).await?;
            println!(
                "wiped {} blobs, records flushed: {}",
                report.blobs_deleted, report.records_flushed
            );
        }
    }

    Ok(())
}

/// Bails if session bootstrap ended in an error phase.
fn ensure_initialized(session: &SessionStore) -> Result<()> {
    let state = session.state();
    if let Some(error) = &state.last_error {
        bail!("session failed to initialize: {error}");
    }
    Ok(())
}

/// Wires the gateway from config: the platform client always provides probe,
/// identity, and inference; blobs and records can be swapped onto S3/Redis.
async fn build_gateway(config: &Config) -> Result<Gateway> {
    let platform = PlatformClient::new(
        config.platform_base_url.clone(),
        config.platform_token.clone(),
    );

    let blobs: Arc<dyn BlobStore> = match (&config.blob_backend, &config.s3) {
        (BlobBackend::S3, Some(s3)) => {
            let client = build_s3_client(s3).await;
            info!(bucket = %s3.bucket, "blob backend: s3");
            Arc::new(S3BlobStore::new(client, s3.bucket.clone()))
        }
        _ => Arc::new(platform.clone()),
    };

    let records: Arc<dyn RecordStore> = match (&config.record_backend, &config.redis_url) {
        (RecordBackend::Redis, Some(url)) => {
            info!("record backend: redis");
            let client = redis::Client::open(url.as_str()).context("connecting to Redis")?;
            Arc::new(RedisRecordStore::new(client))
        }
        _ => Arc::new(platform.clone()),
    };

    Ok(Gateway {
        probe: Arc::new(platform.clone()),
        identity: Arc::new(platform.clone()),
        blobs,
        records,
        inference: Arc::new(platform),
    })
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(s3: &S3Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &s3.access_key_id,
        &s3.secret_access_key,
        None,
        None,
        "jobfit-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&s3.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
