use std::sync::Arc;

use clap::Parser;

use zonegate::state::AppState;
use zonegate::{config, logging, supervisor};

/// Multi-protocol DNS resolver and authoritative front-end for an
/// internal zone, forwarding everything else to configured upstreams.
#[derive(Parser, Debug)]
#[command(name = "zonegate")]
struct Cli {
    /// Environment name selecting ./config.<env>.toml; empty loads ./config.toml.
    #[arg(long, default_value = "")]
    env: String,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = match config::load(&cli.env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let _logging_guard = logging::init(&config.logger);
    log::info!("startup arguments: env={:?}", cli.env);

    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            log::error!("failed to initialize application state: {e}");
            std::process::exit(1);
        }
    };

    supervisor::run(state).await
}
