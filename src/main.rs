use anyhow::{Context, Result};
use bt_live::api::{create_router, AppState};
use bt_live::config::{load_config, BtLiveConfig};
use bt_live::connection::{ConnectionManager, HttpTransport, LiveClient};
use bt_live::diagram;
use bt_live::presenter::{ConsolePresenter, LogPresenter, Presenter};
use bt_live::preview::render_preview;
use bt_live::state::{run_demo_feed, StatusBoard};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bt-live", about = "Live behavior tree status dashboard")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "BT_LIVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the status stream and diagram page
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
        /// Rendered diagram (SVG) to serve
        #[arg(long)]
        diagram: Option<PathBuf>,
        /// Publish random node states
        #[arg(long)]
        demo: bool,
    },
    /// Follow a status stream and print node states
    Watch {
        /// Status stream URL (overrides client.url)
        #[arg(long)]
        url: Option<String>,
        /// Rendered diagram (SVG) to take the tracked entities from
        #[arg(long)]
        diagram: Option<PathBuf>,
        /// Entities to track when no diagram is given
        #[arg(long = "entity")]
        entities: Vec<String>,
        /// Report statuses through the log instead of printing them
        #[arg(long)]
        log_only: bool,
    },
    /// Wrap a file in an HTML page for viewing
    Preview {
        file: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bt_live=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BtLiveConfig::default(),
    };
    config.apply_env();

    match cli.command {
        Command::Serve {
            bind,
            diagram,
            demo,
        } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if diagram.is_some() {
                config.server.diagram = diagram;
            }
            config.server.demo |= demo;
            serve(config).await
        }
        Command::Watch {
            url,
            diagram,
            entities,
            log_only,
        } => {
            if let Some(url) = url {
                config.client.url = url;
            }
            if diagram.is_some() {
                config.client.diagram = diagram;
            }
            if !entities.is_empty() {
                config.client.entities = entities;
            }
            if log_only {
                watch(config, LogPresenter::new()).await
            } else {
                let presenter =
                    ConsolePresenter::new(std::io::stdout(), config.client.history_width);
                watch(config, presenter).await
            }
        }
        Command::Preview { file, output } => preview(file, output),
    }
}

async fn serve(config: BtLiveConfig) -> Result<()> {
    let server = config.server;
    info!(bind = %server.bind, "bt-live server starting...");

    let (diagram_svg, entities) = match &server.diagram {
        Some(path) => {
            let svg = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read diagram {}", path.display()))?;
            let entities = diagram::entity_ids_from_svg(&svg);
            info!(diagram = %path.display(), entities = entities.len(), "Diagram loaded");
            (Some(svg), entities)
        }
        None => (None, Vec::new()),
    };

    let board = Arc::new(StatusBoard::new(entities));

    let demo_handle = if server.demo {
        if board.entities().is_empty() {
            warn!("Demo feed enabled but the diagram has no nodes");
        }
        Some(tokio::spawn(run_demo_feed(
            Arc::clone(&board),
            server.demo_interval_ms,
        )))
    } else {
        None
    };

    let router = create_router(AppState {
        board,
        emit_interval: Duration::from_millis(server.emit_interval_ms),
        diagram_svg,
    });
    let listener = tokio::net::TcpListener::bind(&server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", server.bind))?;
    info!(address = %listener.local_addr()?, "Listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    if let Some(handle) = demo_handle {
        handle.abort();
    }
    info!("bt-live server stopped");

    Ok(())
}

async fn watch<P: Presenter + Send + 'static>(config: BtLiveConfig, presenter: P) -> Result<()> {
    let client = config.client;
    let entities = client.resolve_entities()?;
    info!(
        url = %client.url,
        entities = entities.len(),
        watchdog_timeout_ms = client.watchdog_timeout_ms,
        "Watching status stream"
    );

    let mut manager = ConnectionManager::new(presenter, client.watchdog_timeout());
    manager.initialize(entities)?;

    let live = LiveClient::new(HttpTransport::new(client.url), manager);
    let manager = live
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for ctrl_c signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!(samples = manager.history().len(), "Stopped watching");
    Ok(())
}

fn preview(file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let page = render_preview(&file)?;
    match output {
        Some(path) => {
            std::fs::write(&path, page)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(output = %path.display(), "Preview written");
        }
        None => print!("{}", page),
    }
    Ok(())
}
