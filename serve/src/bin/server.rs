//! SmartRecover server binary: load config, initialize tracing, wire the
//! state, serve.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "smartrecover-server", about = "SmartRecover incident-triage API")]
struct Args {
    /// Path of the YAML config file; defaults + environment when absent.
    #[arg(long, env = "SMARTRECOVER_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address.
    #[arg(long, env = "SMARTRECOVER_ADDR", default_value = "127.0.0.1:8000")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _ = dotenv::dotenv();
    let args = Args::parse();

    let app_config = config::load(args.config.as_deref())?;
    let log_handle = Arc::new(config::tracing_init::init(&app_config.logging)?);

    let state = serve::AppState::from_config(&app_config, Some(log_handle))?;
    serve::run_serve(&args.addr, state).await
}
