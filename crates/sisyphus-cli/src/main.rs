use clap::{Parser, Subcommand};
use sisyphus_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "sisyphus", version, about = "Sisyphus focus timer")]
struct Cli {
    /// Act as this user (defaults to `user` in config.toml)
    #[arg(long, global = true)]
    user: Option<String>,
    /// Keep everything in memory for this invocation only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Per-user settings
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Focus reports
    Report {
        #[command(subcommand)]
        action: commands::report::ReportAction,
    },
    /// Recorded sessions
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
}

/// Log to stderr so stdout stays machine-readable.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_env("SISYPHUS_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let app_config = AppConfig::load();
    let filter = app_config
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| AppConfig::default().log_filter);
    init_tracing(&filter);

    let result: commands::CliResult = match app_config {
        Ok(config) => {
            let ctx = Context::new(config, cli.user, cli.ephemeral);
            match cli.command {
                Commands::Timer { action } => commands::timer::run(&ctx, action),
                Commands::Task { action } => commands::task::run(&ctx, action),
                Commands::Config { action } => commands::config::run(&ctx, action),
                Commands::Report { action } => commands::report::run(&ctx, action),
                Commands::Session { action } => commands::session::run(&ctx, action),
            }
        }
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
