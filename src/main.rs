use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use viaprox::{AppConfig, MatchCriteria, RestApi, SearchOptions, Services};

/// Proximity search over Colombian street addresses
#[derive(Parser, Debug)]
#[command(name = "viaprox")]
#[command(about = "Address proximity search with semantic and structured matching", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST API
    Serve {
        #[arg(long, default_value_t = 8080)]
        http_port: u16,
    },
    /// Search addresses near a raw address
    Search {
        address: String,
        #[arg(short, long, default_value_t = 5)]
        radius: u32,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        neighborhoods: bool,
        #[arg(long)]
        quadrants: bool,
        /// Restrict vector search to a municipality
        #[arg(long)]
        municipality: Option<String>,
    },
    /// Rows agreeing with an address on via type and number range
    Similar {
        address: String,
        #[arg(long)]
        same_municipality: bool,
    },
    /// Print the structured form of an address
    Parse { address: String },
    /// Embed stored rows into the vector index and snapshot it
    Migrate {
        /// Only migrate the first rows, per the configured test-mode limit
        #[arg(long)]
        test_mode: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Parse { address } => {
            let parser = viaprox::AddressParser::new(Arc::new(viaprox::Gazetteer::new(config.gazetteer.clone())));
            println!("{}", serde_json::to_string_pretty(&parser.parse(&address))?);
        }
        Command::Search {
            address,
            radius,
            page,
            limit,
            neighborhoods,
            quadrants,
            municipality,
        } => {
            let services = Services::open(&config).await?;
            let orchestrator = services.orchestrator(&config);
            let options = SearchOptions {
                include_neighborhoods: neighborhoods,
                include_quadrants: quadrants,
                municipality,
                ..SearchOptions::with_radius(radius).page(page, limit)
            };
            let result = orchestrator.search_nearby_addresses(&address, &options).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Similar {
            address,
            same_municipality,
        } => {
            let services = Services::open(&config).await?;
            let orchestrator = services.orchestrator(&config);
            let criteria = MatchCriteria {
                via_code_match: true,
                number_range_match: true,
                municipality_match: same_municipality,
                ..Default::default()
            };
            let target = orchestrator.parse(&address);
            let found = orchestrator.find_similar_addresses(&target, &criteria).await?;
            println!("{}", serde_json::to_string_pretty(&found)?);
        }
        Command::Migrate { test_mode } => {
            let services = Services::open(&config).await?;
            let mut options = config.migration.clone();
            options.test_mode |= test_mode;
            let progress = services.migrate(&options).await?;
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        Command::Serve { http_port } => serve(&config, http_port).await?,
    }

    Ok(())
}

async fn serve(config: &AppConfig, http_port: u16) -> anyhow::Result<()> {
    info!("Starting viaprox v{}", env!("CARGO_PKG_VERSION"));
    info!("Dataset: {:?}", config.dataset);

    let services = Services::open(config).await?;
    let orchestrator = Arc::new(services.orchestrator(config));
    info!(
        rows = services.store.len(),
        vectors = services.index.len(),
        semantic = orchestrator.semantic_configured(),
        "services initialized"
    );

    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(orchestrator, http_port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });
    info!("HTTP API: http://localhost:{}/", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
