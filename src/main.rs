use anyhow::{Context, Result};
use chatbot_backend::services::register_builtin_services;
use chatbot_backend::{AppConfig, AppContext, ServiceRegistry};
use clap::Parser;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "chatbot-backend")]
#[command(about = "Runtime layer for the chatbot backend API")]
#[command(version)]
#[command(long_about = "Boots the chatbot backend: probes optional subsystems, initializes \
them in order, serves the HTTP API behind the request pipeline and shuts everything down \
in reverse order on SIGINT or SIGTERM.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "chatbot.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit without starting the server")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize and shut down services without serving
    #[arg(long, help = "Initialize and shut down every service without serving HTTP")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("# Chatbot backend configuration");
        println!("# Every key can also be set through the environment, e.g. PORT=8080");
        println!();
        println!("{}", AppConfig::default().to_toml()?);
        return Ok(());
    }

    let config = AppConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    let _log_guard = init_logging(&args, &config)?;

    info!("Starting chatbot backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    info!(
        environment = %config.environment,
        debug = config.debug,
        "Configuration loaded and validated"
    );

    let mut registry = ServiceRegistry::new();
    register_builtin_services(&mut registry, &config)?;
    registry.probe_and_enable().await;

    let context = AppContext::new(config, registry);

    let exit_code = if args.dry_run {
        info!("Dry run mode - services will be initialized and shut down without serving");
        context.dry_run().await
    } else {
        context.run().await
    }
    .map_err(|e| {
        error!("Runtime error: {}", e);
        e
    })?;

    info!("Chatbot backend exited with code: {}", exit_code);

    // Flush buffered log lines before exiting
    drop(_log_guard);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args, config: &AppConfig) -> Result<WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Command line flags win over LOG_LEVEL
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        config.log_level.as_str()
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "chatbot_backend={level},tower_http={level}",
            level = log_level
        ))
    });

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let default_format = if config.is_production() { "json" } else { "pretty" };
    let fmt_layer = match args.log_format.as_deref().unwrap_or(default_format) {
        "json" => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        "compact" => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        "pretty" => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        format => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
