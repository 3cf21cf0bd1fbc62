use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use undine::{
    config::AppConfig,
    http_client::HttpClientPool,
    persistence::sqlite::SqliteStateRepository,
    settings::HttpSettingsApi,
    supervisor::Supervisor,
    telemetry::ChannelFeedClient,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing app.yaml.
    #[arg(long)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the monitoring daemon.
    Run,
    /// Performs a single alert-check cycle and prints the outcome.
    CheckAlerts,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();

    let supervisor = build_supervisor(cli.config_dir.as_deref()).await?;

    match cli.command {
        Commands::Run => supervisor.run().await?,
        Commands::CheckAlerts => {
            let report = supervisor.check_alerts_once().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn build_supervisor(
    config_dir: Option<&str>,
) -> Result<Supervisor<SqliteStateRepository>, Box<dyn std::error::Error>> {
    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(config_dir)?;
    tracing::debug!(
        database_url = %config.database_url,
        channel_id = %config.feed.channel_id,
        "Configuration loaded."
    );

    tracing::debug!("Initializing state repository...");
    let repo = Arc::new(SqliteStateRepository::new(&config.database_url).await?);
    repo.run_migrations().await?;
    tracing::info!("Database migrations completed.");

    let client_pool = Arc::new(HttpClientPool::new());
    let feed_client = client_pool.get_or_create(&config.http_retry_config).await?;
    let telemetry = Arc::new(ChannelFeedClient::new(&config.feed, feed_client)?);
    tracing::info!(channel_id = %config.feed.channel_id, "Channel feed source initialized.");

    let mut builder = Supervisor::builder()
        .config(config.clone())
        .state(repo)
        .telemetry(telemetry)
        .client_pool(Arc::clone(&client_pool));

    if let Some(remote_url) = &config.settings_sync.remote_url {
        let settings_client = client_pool.get_or_create(&config.http_retry_config).await?;
        let settings_api = Arc::new(HttpSettingsApi::new(remote_url, settings_client)?);
        builder = builder.settings_api(settings_api);
        tracing::info!(remote_url = %remote_url, "Remote settings synchronization enabled.");
    } else {
        tracing::info!("No remote settings service configured; settings are managed locally.");
    }

    Ok(builder.build().await?)
}
