mod cli;
mod commands;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use invsync_config::Config;

use crate::cli::{Cli, Command, GlobalOpts, LogFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the `-v` count.
fn init_tracing(global: &GlobalOpts, format: LogFormat) -> Result<WorkerGuard, CliError> {
    let level = match global.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, guard) = match &global.log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir)?;
            let name = path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("invsync.log"));
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };
    let ansi = global.log_file.is_none();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_ansi(ansi).init(),
    }
    Ok(guard)
}

fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(invsync_config::config_path);
    invsync_config::load_config(Some(&path)).map_err(|e| CliError::from_config(e, &path))
}

fn log_format(global: &GlobalOpts, config: &Config) -> LogFormat {
    global.log_format.unwrap_or(if config.log_format == "json" {
        LogFormat::Json
    } else {
        LogFormat::Text
    })
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "invsync", &mut std::io::stdout());
            Ok(())
        }

        // Config commands work without a valid configuration
        Command::Config(args) => commands::config_cmd::handle(&args, &cli.global),

        Command::Run => {
            let (config, _guard) = prepare(&cli.global)?;
            commands::run::handle(config).await
        }
        Command::DataSources => {
            let (config, _guard) = prepare(&cli.global)?;
            commands::data_sources::handle(&config, &cli.global)
        }
        Command::Events(args) => {
            let (config, _guard) = prepare(&cli.global)?;
            commands::events::handle(&args, &config, &cli.global)
        }
    }
}

/// Loads the configuration, then starts logging in the configured format.
fn prepare(global: &GlobalOpts) -> Result<(Config, WorkerGuard), CliError> {
    let config = load_config(global)?;
    let guard = init_tracing(global, log_format(global, &config))?;
    Ok((config, guard))
}
