//! secure-crud binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use secure_crud::{api, cli, config::Config, logging, RandomUserClient, RateLimiter};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'secure-crud --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.log_filter());
    info!("secure-crud v{}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server terminated with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let server_config = config.to_server_config()?;
    let limits = config.rate_limit_config()?;

    if !limits.enabled {
        tracing::warn!("rate limiting is disabled");
    }

    let source = RandomUserClient::new(config.upstream.base_url.clone(), config.upstream_timeout())?;
    let limiter = Arc::new(RateLimiter::new(limits));
    let state = api::AppState::in_memory(Arc::new(source), limiter)
        .with_store_timeout(config.store_timeout());

    info!(
        upstream = %config.upstream.base_url,
        origins = ?server_config.allowed_origins,
        "state initialized"
    );

    api::serve(server_config, state).await?;
    Ok(())
}
