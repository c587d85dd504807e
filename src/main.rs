use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use secureload::logging::init_tracing;
use secureload::metrics::init_metrics;
use secureload::router::init_router;
use secureload::secureload_config::AppConfig;
use secureload::state::init_app_state;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "secureload")]
#[command(about = "SecureLoad accounts API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to listen on, overrides BIND_ADDRESS
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Load and validate configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::CheckConfig => {
            println!("Configuration OK");
            println!("  Provider:      {}", config.upstream.provider.display_name());
            println!("  Auth server:   {}", config.upstream.base_url);
            println!("  API version:   {}", config.upstream.api_version);
            println!("  JWT algorithm: {}", config.jwt.algorithm);
            println!(
                "  Identity store: {}",
                if config.server.database_url.is_some() {
                    "postgres"
                } else {
                    "in-memory"
                }
            );
            Ok(())
        }
        Commands::Serve { bind } => {
            init_tracing(&config.server.log_dir)?;

            let state = match init_app_state(&config).await {
                Ok(state) => state,
                Err(e) => {
                    error!(error = %e, "Failed to initialize application state");
                    std::process::exit(1);
                }
            };
            let state = state.with_metrics(init_metrics()?);
            let app = init_router(state);

            let bind_address = bind.unwrap_or_else(|| config.server.bind_address.clone());
            let listener = tokio::net::TcpListener::bind(&bind_address).await?;
            info!(
                address = %bind_address,
                provider = config.upstream.provider.display_name(),
                "Server running"
            );
            axum::serve(listener, app).await?;
            Ok(())
        }
    }
}
