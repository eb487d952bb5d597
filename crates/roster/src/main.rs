use std::fs;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use config::{Config, Environment, File, FileFormat};
use log::{LevelFilter, debug, info};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use roster::api::{AppState, create_router};
use roster::auth::{AuthConfig, AuthState};
use roster::db::Database;
use roster::mailer::{EmailSender, LogMailer, MailConfig, SmtpMailer};
use roster::user::{UserRepository, UserService};

const APP_NAME: &str = "roster";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging();
    debug!("config file: {}", ctx.paths.config_file.display());

    match cli.command {
        Command::Serve(cmd) => async_serve(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Roster - user management and directory service.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Enable trace logging (overrides other levels)
    #[arg(long, global = true)]
    trace: bool,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Disable ANSI colors in output
    #[arg(long = "no-color", global = true)]
    no_color: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Create config directories and a default config file
    Init(InitCommand),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
    /// Database file path (overrides config)
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the resolved configuration
    Show,
    /// Print the config file path
    Path,
}

/// Application configuration, deserialized from the config file with
/// `ROSTER__`-prefixed environment overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    server: ServerConfig,
    database: DatabaseConfig,
    auth: AuthConfig,
    security: SecurityConfig,
    mail: MailConfig,
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ServerConfig {
    host: String,
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8087,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct DatabaseConfig {
    /// Database file path. Defaults to `<data dir>/roster.db`.
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct SecurityConfig {
    /// Failed login attempts after which an account is locked.
    lockout_threshold: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            lockout_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Resolved filesystem locations.
#[derive(Debug, Clone)]
struct AppPaths {
    config_file: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    fn discover(config_override: Option<PathBuf>) -> Self {
        let config_file = config_override.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("config.toml")
        });

        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME);

        Self {
            config_file,
            data_dir,
        }
    }
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.clone());
        let config = load_config(&paths)?;
        Ok(Self {
            common,
            paths,
            config,
        })
    }

    fn init_logging(&self) {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return;
        }

        let level = match self.effective_log_level() {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        };

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("roster={level},tower_http={level}")));

        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            let disable_color = self.common.no_color
                || std::env::var_os("NO_COLOR").is_some()
                || !io::stderr().is_terminal();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_ansi(!disable_color))
                .try_init()
                .ok();
        }

        // Also init env_logger for compatibility with log crate users
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        builder.filter_level(self.effective_log_level());
        builder.try_init().ok();
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => match self.config.logging.level.as_str() {
                    "error" => LevelFilter::Error,
                    "warn" => LevelFilter::Warn,
                    "debug" => LevelFilter::Debug,
                    "trace" => LevelFilter::Trace,
                    _ => LevelFilter::Info,
                },
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

fn load_config(paths: &AppPaths) -> Result<AppConfig> {
    let built = Config::builder()
        .add_source(
            File::from(paths.config_file.as_path())
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(
            Environment::with_prefix("ROSTER")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .context("building configuration")?;

    let config: AppConfig = built
        .try_deserialize()
        .context("deserializing configuration")?;

    Ok(config)
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    let config = &ctx.config;

    // Fail early on a missing or weak JWT secret
    let auth_state = AuthState::new(&config.auth).map_err(|e| anyhow::anyhow!("{}", e))?;

    let db_path = cmd
        .database
        .or_else(|| config.database.path.clone())
        .unwrap_or_else(|| ctx.paths.data_dir.join("roster.db"));
    let database = Database::new(&db_path).await?;
    info!("Database: {}", db_path.display());

    let user_repo = UserRepository::new(database.pool().clone());
    let user_service = UserService::new(user_repo, config.security.lockout_threshold);

    let mailer: Arc<dyn EmailSender> = if config.mail.enabled {
        Arc::new(SmtpMailer::new(config.mail.clone())?)
    } else {
        info!("Outbound mail disabled, verification emails will only be logged");
        Arc::new(LogMailer)
    };

    let state = AppState::new(user_service, auth_state, mailer);
    let app = create_router(state);

    let host = cmd.host.unwrap_or_else(|| config.server.host.clone());
    let port = cmd.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("invalid address")?;

    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    let path = &ctx.paths.config_file;
    if path.exists() && !cmd.force {
        info!("Config already exists at {} (use --force to overwrite)", path.display());
        return Ok(());
    }

    write_default_config(path)?;
    fs::create_dir_all(&ctx.paths.data_dir).with_context(|| {
        format!("creating data directory {}", ctx.paths.data_dir.display())
    })?;

    info!("Wrote default config to {}", path.display());
    Ok(())
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    // Ship a freshly generated JWT secret so `init && serve` works out of
    // the box without shipping a known default
    let config = AppConfig {
        auth: AuthConfig {
            jwt_secret: Some(AuthConfig::generate_jwt_secret()),
            ..Default::default()
        },
        ..Default::default()
    };

    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = String::new();
    body.push_str("# Configuration for ");
    body.push_str(APP_NAME);
    body.push('\n');
    body.push_str("# File: ");
    body.push_str(&path.display().to_string());
    body.push_str("\n\n");
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let rendered =
                toml::to_string_pretty(&ctx.config).context("serializing configuration")?;
            print!("{rendered}");
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
        }
    }
    Ok(())
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
