use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use discussion_harvester::config::Config;
use discussion_harvester::export::write_export;
use discussion_harvester::harvester::{ForumLayout, Harvester};
use discussion_harvester::models::DiscussionDetail;
use discussion_harvester::session::auth::ensure_signed_in;
use discussion_harvester::session::{ChromiumSession, PageSession, SessionOptions};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting discussion-harvester");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        listing_url = %config.listing_url,
        output = %config.output_path.display(),
        headless = config.headless,
        proxy = config.proxy.is_some(),
        "Configuration loaded"
    );

    let session = ChromiumSession::launch(&SessionOptions::from_config(&config))
        .await
        .context("Failed to launch browser")?;

    let mut harvested = Vec::new();
    let outcome = harvest(&session, &config, &mut harvested).await;

    // Whatever was collected is written, even after an interruption or a fatal error
    if !harvested.is_empty() || outcome.is_ok() {
        write_export(&config.output_path, &harvested, config.output_compact)
            .await
            .context("Failed to write export")?;
    }

    session.shutdown().await;
    outcome
}

async fn harvest(
    session: &ChromiumSession,
    config: &Config,
    sink: &mut Vec<DiscussionDetail>,
) -> Result<()> {
    // Land on the listing first so a sign-in wall can be handled before crawling
    session
        .navigate(&config.listing_url)
        .await
        .with_context(|| format!("Failed to open listing page {}", config.listing_url))?;

    let stdin = BufReader::new(tokio::io::stdin());
    if ensure_signed_in(session, &config.sign_in_selector, stdin).await? {
        info!("Continuing after sign-in");
    }

    let harvester = Harvester::new(
        session,
        ForumLayout::default(),
        config.heuristics.clone(),
        config.limits(),
        config.pacing(),
    );

    tokio::select! {
        result = harvester.run(&config.listing_url, sink) => {
            let stats = result.context("Harvest failed")?;
            info!(
                harvested = stats.harvested,
                failed = stats.failed,
                "Run complete"
            );
        }
        () = shutdown_signal() => {
            warn!("Interrupted, exporting what was collected so far");
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,discussion_harvester=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
