use anyhow::{anyhow, Context, Result};
use bio_db::DbHandle;
use clap::{Parser, Subcommand};
use records::infra::storage::schema::ensure_schema;
use records::{Records, RecordsConfig};
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if create_dirs {
        if let Some(dir) = p.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create database directory {}", dir.display()))?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Bio Server - service requests, their catalog and users over REST
#[derive(Parser)]
#[command(name = "bio-server")]
#[command(about = "Bio Server - service requests, their catalog and users over REST")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database with the schema created at startup
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // home_dir is normalized and created while loading
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Bio Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let records_cfg = RecordsConfig::from_value(&config.records)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, records_cfg).await,
        Commands::Check => check_config(&config),
    }
}

async fn connect_db(db_config: &DatabaseConfig, base_dir: &Path) -> Result<DbHandle> {
    let mut dsn = db_config.url.trim().to_owned();
    if dsn.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    // Relative sqlite paths are resolved against home_dir, not the cwd.
    if dsn.starts_with("sqlite://") {
        dsn = absolutize_sqlite_dsn(&dsn, base_dir, true)?;
    }

    tracing::info!(url = %db_config.redacted_url(), "Connecting to database");
    let db = DbHandle::connect(&dsn, db_config.connect_opts())
        .await
        .with_context(|| format!("cannot connect to {}", db_config.redacted_url()))?;
    tracing::info!("Connected DB backend: {:?}", db.engine());
    Ok(db)
}

async fn run_server(config: AppConfig, records_cfg: RecordsConfig) -> Result<()> {
    let db_config = config
        .database
        .clone()
        .ok_or_else(|| anyhow!("Database configuration is required to run the server"))?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let db = connect_db(&db_config, Path::new(&config.server.home_dir)).await?;
    if db_config.bootstrap_schema {
        ensure_schema(db.seaorm())
            .await
            .context("failed to create database schema")?;
        tracing::info!("Database schema ensured");
    }
    if !db_config.transactions {
        tracing::warn!("Transactions disabled; operations are not atomic");
    }

    let records = Records::new(db.unit_of_work(db_config.transactions), &records_cfg);
    let mut app = records.router().layer(TraceLayer::new_for_http());
    if let Some(timeout) = config.request_timeout() {
        app = app.layer(TimeoutLayer::new(timeout));
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // The service holds pool references; release them so the close is real.
    drop(records);
    db.close().await;
    tracing::info!("Bio Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    if let Some(db) = &config.database {
        bio_db::DbHandle::detect(db.url.trim())
            .with_context(|| format!("invalid database url {}", db.redacted_url()))?;
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
