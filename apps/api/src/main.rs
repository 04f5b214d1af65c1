mod batch_jobs;
mod chat;
mod config;
mod db;
mod decision;
mod decision_log;
mod errors;
mod llm_client;
mod memory;
mod normalizer;
mod pipeline;
mod routes;
mod scheduler;
mod scoring;
mod sheets;
mod slack;
mod state;
mod storage;
mod summary_store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::batch_jobs::{BatchJobs, Notifier};
use crate::chat::intent::{IntentFallback, LlmIntentFallback};
use crate::chat::ChatBot;
use crate::config::{Config, SlackBotConfig};
use crate::db::init_memory;
use crate::decision::l1::L1Policy;
use crate::decision_log::DecisionLog;
use crate::llm_client::LlmClient;
use crate::pipeline::summary::Stage;
use crate::pipeline::PipelineContext;
use crate::routes::build_router;
use crate::scoring::LlmCandidateScorer;
use crate::sheets::auth::{ServiceAccountAuth, ServiceAccountKey};
use crate::sheets::dashboard::Dashboard;
use crate::sheets::google::GoogleSheetsClient;
use crate::sheets::SheetsApi;
use crate::slack::client::{ChatPoster, SlackClient};
use crate::slack::SlackBot;
use crate::state::AppState;
use crate::storage::s3::S3FileStore;
use crate::summary_store::SummaryStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("talent_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Talent API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let store = Arc::new(S3FileStore::new(s3, config.s3_bucket.clone(), &config.s3_endpoint));
    info!(bucket = %config.s3_bucket, "S3 file store initialized");

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let sheets = build_sheets_client(&config)?;
    let dashboard = match (&sheets, &config.recruiter_sheet_id) {
        (Some(api), Some(id)) => Some(Dashboard::new(api.clone(), id.clone())),
        _ => None,
    };
    let decision_log = match (&sheets, &config.decision_sheet_id) {
        (Some(api), Some(id)) => Some(DecisionLog::new(api.clone(), id.clone())),
        _ => None,
    };

    let memory = init_memory(&config.memory).await;

    let pipeline = Arc::new(PipelineContext {
        store,
        scorer: Arc::new(LlmCandidateScorer(llm.clone())),
        dashboard,
        decision_log,
        memory,
        folders: config.folders.clone(),
        l1_policy: L1Policy {
            advance_threshold: config.l1_advance_threshold,
            reject_threshold: config.l1_reject_threshold,
        },
        l2_policy: config.l2_policy,
    });
    info!(roles = ?config.folders.roles, "Pipeline configured");

    let riva_poster: Arc<dyn ChatPoster> =
        Arc::new(SlackClient::new("Riva", config.riva.bot_token.clone())?);
    let arjun_poster: Arc<dyn ChatPoster> =
        Arc::new(SlackClient::new("Arjun", config.arjun.bot_token.clone())?);
    warn_missing_chat_settings("Riva", &config.riva);
    warn_missing_chat_settings("Arjun", &config.arjun);

    let summaries = Arc::new(SummaryStore::default());
    let jobs = Arc::new(BatchJobs::new(
        pipeline.clone(),
        summaries.clone(),
        Notifier {
            poster: riva_poster.clone(),
            channel: config.riva.default_channel_id.clone(),
        },
        Notifier {
            poster: arjun_poster.clone(),
            channel: config.arjun.default_channel_id.clone(),
        },
    ));

    let fallback: Option<Arc<dyn IntentFallback>> = if config.llm_intent_fallback {
        Some(Arc::new(LlmIntentFallback(llm)))
    } else {
        info!("Model intent fallback disabled");
        None
    };
    let slack_bot = |stage: Stage, poster: Arc<dyn ChatPoster>, bot_config: &SlackBotConfig| {
        Arc::new(SlackBot {
            chat: Arc::new(ChatBot::new(
                stage,
                pipeline.clone(),
                summaries.clone(),
                jobs.clone(),
                fallback.clone(),
            )),
            poster,
            config: bot_config.clone(),
        })
    };
    let riva = slack_bot(Stage::L1, riva_poster, &config.riva);
    let arjun = slack_bot(Stage::L2, arjun_poster, &config.arjun);

    let _scheduled = scheduler::spawn(jobs.clone(), &config.scheduler);

    // Build app state
    let state = AppState {
        config: config.clone(),
        jobs,
        riva,
        arjun,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "talent-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

/// Spreadsheet client, or `None` when no sheet or no service account is configured.
fn build_sheets_client(config: &Config) -> Result<Option<Arc<dyn SheetsApi>>> {
    if config.recruiter_sheet_id.is_none() && config.decision_sheet_id.is_none() {
        info!("No spreadsheet configured; dashboard and decision log disabled");
        return Ok(None);
    }
    let Some(key_file) = config.google_service_account_file.as_deref() else {
        warn!("Spreadsheet id set but GOOGLE_SERVICE_ACCOUNT_FILE is missing; sheet updates disabled");
        return Ok(None);
    };
    let http = reqwest::Client::new();
    let auth = ServiceAccountAuth::new(ServiceAccountKey::from_file(key_file)?, http.clone())?;
    let client = GoogleSheetsClient::new(http, auth)?;
    info!("Google Sheets client initialized");
    Ok(Some(Arc::new(client)))
}

fn warn_missing_chat_settings(bot: &str, config: &SlackBotConfig) {
    if config.bot_token.is_none() {
        warn!(bot, "Bot token missing; replies and notifications will fail");
    }
    if config.signing_secret.is_none() {
        warn!(bot, "Signing secret missing; callbacks will be rejected");
    }
    if config.default_channel_id.is_none() {
        warn!(bot, "Default channel missing; batch notifications disabled");
    }
    if config.bot_user_id.is_none() {
        warn!(bot, "Bot user id missing; channel mentions will be ignored");
    }
}
