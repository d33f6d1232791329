use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use runtime::{AppConfig, ConfigResolver, ConfigSources, LoggingSettings, DEFAULT_PARSER_CONFIG};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use users_info::config::{UsersInfoConfig, SECRET_IDS};
use users_info::UsersInfo;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// UserDB Server - user account functions over HTTP
#[derive(Parser)]
#[command(name = "userdb-server")]
#[command(about = "UserDB Server - user account functions over HTTP")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the parameter descriptor
    #[arg(long, default_value = DEFAULT_PARSER_CONFIG)]
    parser_config: PathBuf,

    /// Property file, replacing whatever configFileId resolves to
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Descriptor-driven parameters after `--`, e.g. `-- --userdbHost db.internal`
#[derive(Args, Clone, Default)]
struct Params {
    #[arg(last = true, value_name = "PARAMS")]
    params: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run(Params),
    /// Check configuration
    Check(Params),
    /// Print the effective configuration as YAML and exit
    PrintConfig(Params),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (command, params) = match cli.command {
        None => (Command::Run, Vec::new()),
        Some(Commands::Run(p)) => (Command::Run, p.params),
        Some(Commands::Check(p)) => (Command::Check, p.params),
        Some(Commands::PrintConfig(p)) => (Command::PrintConfig, p.params),
    };
    let mut sources = ConfigSources::from_process(&cli.parser_config, params);
    if let Some(path) = &cli.config_file {
        sources = sources.with_config_file(path);
    }
    let resolver = ConfigResolver::new(sources);
    let app_config = resolver.resolve().with_context(|| {
        format!(
            "failed to load parser config '{}'",
            cli.parser_config.display()
        )
    })?;
    let module_config = UsersInfoConfig::from_config(&app_config);

    if command == Command::PrintConfig {
        print!("{}", app_config.to_yaml_redacted(SECRET_IDS)?);
        return Ok(());
    }

    let mut logging = LoggingSettings::from_config(&app_config).with_verbosity(cli.verbose);
    if module_config.test_mode && cli.verbose == 0 {
        logging.console_level = "debug".to_string();
    }
    runtime::init_logging(&logging);
    for w in app_config.warnings() {
        tracing::warn!("{w}");
    }
    tracing::info!("UserDB Server starting");

    match command {
        Command::Run => run_server(module_config).await,
        Command::Check => check_config(&app_config, &module_config),
        Command::PrintConfig => Ok(()),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Check,
    PrintConfig,
}

async fn run_server(config: UsersInfoConfig) -> Result<()> {
    let addr = config.bind_addr();
    tracing::debug!(db = ?config.db, functions = ?config.functions, "effective module settings");

    let module = UsersInfo::init(config)
        .await
        .context("failed to initialize users_info")?;
    let router = module
        .router()?
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("HTTP server bound on {}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown())
        .await;
    module.shutdown().await;
    served.context("HTTP server failed")
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = tokio::signal::ctrl_c() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("HTTP server shutting down gracefully");
}

fn check_config(app_config: &AppConfig, config: &UsersInfoConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    println!("Parameters:");
    for p in app_config.entries() {
        let shown = if SECRET_IDS.contains(&p.option_id.as_str()) && !p.value.is_empty() {
            "***"
        } else {
            p.value.as_str()
        };
        println!("  {} = {} ({:?})", p.option_id, shown, p.source);
    }
    for w in app_config.warnings() {
        println!("warning: {w}");
    }

    if let Err(msg) = config.functions.validate() {
        bail!("invalid function names: {msg}");
    }
    let target = config
        .db
        .connect_options()
        .context("invalid database settings")?;
    println!("Database: {target}");
    println!("Listen: {}", config.bind_addr());

    println!("Configuration check passed");
    Ok(())
}
