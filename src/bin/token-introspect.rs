use anyhow::Result;
use clap::arg;
use clap::command;
use clap::Parser;
use token_introspect::pipeline::Validator;
use token_introspect::server;
use token_introspect::utils::config_loader;
use token_introspect::utils::logging;
use token_introspect::utils::logging::LogLevel;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "token-introspect.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Resolve the introspection endpoint (fails fast on discovery errors)
    // -------------------------------

    let introspection = &service_config.introspection;
    let endpoint = introspection.resolve_endpoint().await?;
    info!(endpoint = %endpoint, "introspection endpoint resolved");

    // -------------------------------
    // 3. Build the validator
    // -------------------------------

    let validator = Validator::new(introspection.build_config(endpoint)?);

    // -------------------------------
    // 4. Serve forward-auth and metrics
    // -------------------------------

    info!("Service starting...");
    server::server::start(&service_config.settings, validator).await
}
