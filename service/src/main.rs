mod config;
mod fix_endpoint;
mod session_service;

use std::{fs::OpenOptions, sync::Arc};

use run_coach_feedback::{FeedbackManager, audio::NullSink};
use run_coach_lib::tracker::TrackerConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{config::ServiceConfig, session_service::SessionService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::fs::create_dir_all("service/log")?;
    let log_file = "service/log/service.log";

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    tracing::info!("Starting run coach service...");

    let config = ServiceConfig::from_env();

    let (tx, _rx) = broadcast::channel(100);
    let feedback = FeedbackManager::new(config.remote.clone(), Arc::new(NullSink))
        .map_err(|err| anyhow::anyhow!("Failed to build feedback manager: {:?}", err))?;

    let service = Arc::new(SessionService::new(
        TrackerConfig::default(),
        feedback,
        config.session_id.clone(),
        config.feedback_enabled,
        tx,
    ));

    fix_endpoint::listen(service, &config.bind_address).await
}
