use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_agent::Agent;
use infrastructure::AgentConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override Agent ID
    #[arg(long)]
    agent_id: Option<String>,

    /// Seconds between status reports, 0 disables them
    #[arg(long, default_value_t = 60)]
    status_interval_secs: u64,
}

async fn run() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "info,edge_agent=debug,application=debug".into()
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🤖 EMS Edge Agent Starting...");
    info!("🆔 Process ID: {}", std::process::id());

    let args = Args::parse();

    // Running from the workspace root during development
    let dev_config = "crates/edge-agent/config";
    let config_dir = if !Path::new(&args.config_dir).exists() && Path::new(dev_config).exists() {
        dev_config.to_string()
    } else {
        args.config_dir.clone()
    };
    info!("📂 Config directory: {}", config_dir);

    let mut config = AgentConfig::load(&config_dir)?;
    if let Some(id) = args.agent_id {
        config.agent_id = id;
    }
    info!(
        channels = config.channels.len(),
        controllers = config.controllers.len(),
        "✅ Loaded configuration for Agent: {}",
        config.agent_id
    );

    let agent = Agent::start(&config)?;

    let status_task = (args.status_interval_secs > 0).then(|| {
        let period = Duration::from_secs(args.status_interval_secs);
        let snapshot = agent.status_source();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                info!("💓 Status: {}", snapshot());
            }
        })
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutting down..."),
        Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
    }

    if let Some(handle) = status_task {
        handle.abort();
    }
    info!("Final status: {}", agent.status());
    agent.shutdown().await?;

    info!("👋 Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        eprintln!("--------------------------------------------------");
        eprintln!("The agent stopped because of a fatal error.");
        std::process::exit(1);
    }
}
