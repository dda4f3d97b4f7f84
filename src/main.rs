//! route-access: route resolution and access gate.
//!
//! ```text
//!     Client Request
//!     ─────────────────▶ http gate ──▶ resolver ──▶ store (by outline)
//!                            │             │
//!                            │             ▼
//!                            │        RouteCollection (fit desc)
//!                            ▼
//!                      access manager ──▶ attached checks (ALL / ANY)
//!                            │
//!     ◀──────────────────────┘ 200 / 403 / 404
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use route_access::access::context::{AccountDirectory, RequestContext};
use route_access::config::{load_config, AppConfig, ConfigWatcher};
use route_access::http::GateServer;
use route_access::lifecycle::signals::spawn_signal_handler;
use route_access::lifecycle::{Services, Shutdown};
use route_access::observability::{init_logging, init_metrics};
use route_access::routing::{candidate_outlines, normalize_path, path_parts};

#[derive(Parser)]
#[command(name = "route-access")]
#[command(about = "Resolve request paths to routes and decide access", long_about = None)]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, default_value = "route-access.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach access checks and dump the configured routes
    Dump,
    /// List the routes matching a path, most specific first
    Resolve { path: String },
    /// Decide access to a path for an account
    Check {
        path: String,
        #[arg(short, long)]
        account: Option<String>,
    },
    /// Print the candidate outlines for a path
    Outlines { path: String },
    /// Run the HTTP access gate
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Outlines { path } = &cli.command {
        let normalized = normalize_path(path);
        for outline in candidate_outlines(&path_parts(&normalized)) {
            println!("{outline}");
        }
        return Ok(());
    }

    let config = load_config(&cli.config)?;
    init_logging(&config.observability);

    match cli.command {
        Commands::Dump => {
            let services = Services::open(&config.store)?;
            let routes = services.rebuild(&config.store.route_set, config.routes())?;
            for route in &routes {
                println!("{}\t{}\t{}\t{}", route.name, route.pattern, route.access_mode, route.access_checks.join(","));
            }
        }
        Commands::Resolve { path } => {
            let services = Services::from_config(&config)?;
            let routes = services.resolver.resolve_path(&path)?;
            for route in routes.iter() {
                let fit = route.compiled.as_ref().map(|c| c.fit).unwrap_or_default();
                println!("{}\t{}\tfit={:#b}", route.name, route.pattern, fit);
            }
        }
        Commands::Check { path, account } => {
            let services = Services::from_config(&config)?;
            let account = AccountDirectory::new(config.accounts.iter().cloned()).lookup(account.as_deref());
            let routes = services.resolver.resolve_path(&path)?;
            let Some(route) = routes.first().cloned() else {
                return Err(format!("No route found for path '{path}'").into());
            };

            let context = RequestContext::new(&path, account.clone()).with_route(route.clone());
            let granted = services.access.check(&route, &context)?;
            let report = serde_json::json!({
                "route": route.name,
                "account": account.id,
                "access_mode": route.access_mode,
                "access_checks": route.access_checks,
                "parameters": context.attributes(),
                "granted": granted,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Serve => serve(&cli.config, config).await?,
        Commands::Outlines { .. } => {}
    }

    Ok(())
}

async fn serve(path: &std::path::Path, config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("route-access v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let services = Services::from_config(&config)?;
    let server = GateServer::new(&config, services);
    let shutdown = Shutdown::new();

    let (watcher, updates) = ConfigWatcher::new(path);
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
            None
        }
    };
    let reloader = server.spawn_reloader(updates, &shutdown);
    spawn_signal_handler(shutdown.clone());

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    server.run(listener, &shutdown).await?;
    let _ = reloader.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
