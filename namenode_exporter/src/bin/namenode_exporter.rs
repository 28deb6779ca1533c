//! Main `namenode_exporter` binary.

use std::{
    env,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use jemallocator::Jemalloc;
use namenode_exporter::{
    config::{self, Config},
    fetch::{self, Fetcher},
    httpd::{self, Server},
    namenode,
    process::Process,
    registry::{self, Collector, Registry},
    signals,
};
use tokio::runtime::Builder;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Environment variable holding the YAML configuration itself.
const CONFIG_ENV_VAR: &str = "NAMENODE_EXPORTER_CONFIG";

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Could not read config file {path:?}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::Error),
    #[error("Unable to build JMX client: {0}")]
    Fetch(#[from] fetch::Error),
    #[error("Unable to register collector: {0}")]
    Registry(#[from] registry::Error),
    #[error("HTTP server failed: {0}")]
    Httpd(#[from] httpd::Error),
    #[error("HTTP server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    args: ExporterArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and exit
    ConfigCheck(ConfigCheckCommand),
}

#[derive(Args)]
struct ConfigCheckCommand {
    /// path on disk to the configuration file
    #[clap(long)]
    config_path: Option<PathBuf>,
}

#[derive(Args)]
struct ExporterArgs {
    /// path on disk to the configuration file
    #[clap(long)]
    config_path: Option<PathBuf>,
    /// URL of the NameNode JMX servlet
    #[clap(long)]
    namenode_jmx_url: Option<String>,
    /// timeout for a single fetch of the JMX servlet, in milliseconds
    #[clap(long)]
    namenode_jmx_timeout_ms: Option<u64>,
    /// NameNode PID file, enables process metrics
    #[clap(long)]
    namenode_pid_file: Option<PathBuf>,
    /// address -- IP plus port -- to serve metrics on
    #[clap(long)]
    web_listen_address: Option<SocketAddr>,
    /// path under which metrics are exposed
    #[clap(long)]
    web_telemetry_path: Option<String>,
    /// format of log output
    #[clap(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);
    match format {
        LogFormat::Text => builder.finish().init(),
        LogFormat::Json => builder.json().finish().init(),
    }
}

fn load_config_contents(config_path: Option<&Path>) -> Result<Option<String>, Error> {
    if let Ok(env_var_value) = env::var(CONFIG_ENV_VAR) {
        debug!("Using config from env var '{CONFIG_ENV_VAR}'");
        return Ok(Some(env_var_value));
    }
    let Some(path) = config_path else {
        debug!("No configuration file given, using defaults");
        return Ok(None);
    };
    debug!("Attempting to open configuration file at: {}", path.display());
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_config(contents: Option<&str>) -> Result<Config, Error> {
    let config = match contents {
        Some(contents) => Config::from_yaml(contents)?,
        None => Config::default(),
    };
    Ok(config)
}

fn validate_config(config_path: Option<&Path>) -> Result<Config, Error> {
    let contents = load_config_contents(config_path)?;
    let config = parse_config(contents.as_deref())?;
    config.validate()?;
    info!("Configuration is valid");
    Ok(config)
}

fn get_config(args: &ExporterArgs, contents: Option<String>) -> Result<Config, Error> {
    let contents = match contents {
        Some(contents) => Some(contents),
        None => load_config_contents(args.config_path.as_deref())?,
    };
    let mut config = parse_config(contents.as_deref())?;

    if let Some(url) = &args.namenode_jmx_url {
        config.jmx_url.clone_from(url);
    }
    if let Some(timeout) = args.namenode_jmx_timeout_ms {
        config.jmx_timeout_milliseconds = timeout;
    }
    if let Some(pid_file) = &args.namenode_pid_file {
        config.pid_file = Some(pid_file.clone());
    }
    if let Some(addr) = args.web_listen_address {
        config.listen_address = addr;
    }
    if let Some(path) = &args.web_telemetry_path {
        config.telemetry_path.clone_from(path);
    }

    config.validate()?;
    Ok(config)
}

fn build_registry(config: &Config) -> Result<Registry, Error> {
    let mut registry = Registry::new();
    let fetcher = Fetcher::new(config.jmx_url()?, config.jmx_timeout())?;
    registry.register(Collector::Namenode(namenode::Exporter::new(fetcher)))?;
    if let Some(pid_file) = &config.pid_file {
        info!("Reporting process metrics for PID in {}", pid_file.display());
        registry.register(Collector::Process(Process::new(pid_file.clone())))?;
    }
    Ok(registry)
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<(), Error> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<(), Error> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

async fn inner_main(config: Config) -> Result<(), Error> {
    let registry = build_registry(&config)?;
    info!("Scraping {}", config.jmx_url);

    let server = Server::bind(
        config.listen_address,
        config.concurrent_requests_max,
        Arc::new(registry),
        &config.telemetry_path,
    )
    .await?;

    let (watcher, broadcaster) = signals::signal();
    let mut server_handle = tokio::spawn(server.run(watcher));

    tokio::select! {
        res = wait_for_signal() => {
            res?;
            info!("Received shutdown signal, stopping.");
            broadcaster.signal();
            server_handle.await??;
        }
        res = &mut server_handle => {
            error!("HTTP server exited before shutdown was requested");
            res??;
        }
    }
    Ok(())
}

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_logging(cli.args.log_format);

    if let Some(Commands::ConfigCheck(cmd)) = cli.command {
        match validate_config(cmd.config_path.as_deref()) {
            Ok(_) => std::process::exit(0),
            Err(err) => {
                error!("Configuration validation failed: {err}");
                std::process::exit(1)
            }
        }
    }

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting namenode_exporter {version}");

    let config = get_config(&cli.args, None)?;
    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let res = runtime.block_on(inner_main(config));
    info!("Bye. :)");
    res
}
