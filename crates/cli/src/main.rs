mod prompt;

use {
    clap::Parser,
    std::{path::PathBuf, sync::Arc},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    wizard_client::{auth, config},
    wizard_session::{GatewayChannel, WizardDriver},
};

#[derive(Parser)]
#[command(name = "wizard", about = "Run the gateway setup wizard in the terminal")]
struct Cli {
    /// Gateway WebSocket URL (overrides config value).
    #[arg(long, env = "WIZARD_GATEWAY_URL")]
    url: Option<String>,

    /// API key for the gateway (overrides config value).
    #[arg(long)]
    api_key: Option<String>,

    /// Config file to use instead of searching for `wizard.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

/// Logs go to stderr so they do not interleave with the prompts on stdout.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::discover_and_load(),
    };
    if let Some(url) = &cli.url {
        config.gateway.url = url.clone();
    }

    let auth = auth::resolve_auth(cli.api_key.as_deref(), config.gateway.api_key.as_deref());
    info!(url = %config.gateway.url, "starting setup wizard");

    let (rpc, events) = wizard_client::connect(&config.gateway, auth);
    let driver = WizardDriver::new(Some(rpc as Arc<dyn GatewayChannel>));
    prompt::run(driver, events).await
}
