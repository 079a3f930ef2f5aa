// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Accrue: accumulates per-user work context and generates deliverables
//! from it.

mod null_connector;
mod serve;
mod status;
mod wiring;

use std::path::PathBuf;
use std::process::ExitCode;

use accrue_config::AccrueConfig;
use accrue_core::{AccrueError, Platform};
use accrue_service::SyncTarget;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "accrue", version, about, long_about = None)]
struct Cli {
    /// Explicit config file instead of the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the periodic runner until interrupted.
    Serve,
    /// Trigger a manual sync of one resource or a whole platform.
    Sync {
        #[arg(long)]
        user: String,
        #[arg(long)]
        platform: Platform,
        /// A single resource; the whole platform when omitted.
        #[arg(long)]
        resource: Option<String>,
    },
    /// Run a deliverable now.
    Run { deliverable_id: String },
    /// Show a user's coverage summary.
    Status {
        #[arg(long)]
        user: String,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration with secrets redacted.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => accrue_config::load_and_validate_path(path),
        None => accrue_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            accrue_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    match dispatch(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("accrue: {e} ({})", e.kind());
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Commands, config: AccrueConfig) -> Result<(), AccrueError> {
    match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Sync {
            user,
            platform,
            resource,
        } => {
            serve::init_tracing(&config.service.log_level);
            let service = wiring::build_service(config).await?;
            let target = match resource {
                Some(resource_id) => SyncTarget::Resource {
                    platform,
                    resource_id,
                },
                None => SyncTarget::Platform { platform },
            };
            let reports = service.trigger_sync(&user, target).await?;
            print_json(&reports)
        }
        Commands::Run { deliverable_id } => {
            serve::init_tracing(&config.service.log_level);
            let service = wiring::build_service(config).await?;
            let report = service.run_deliverable_now(&deliverable_id).await?;
            print_json(&report)
        }
        Commands::Status { user, json } => {
            let service = wiring::build_service(config).await?;
            let summary = service.get_coverage_summary(&user).await?;
            if json {
                print_json(&summary)
            } else {
                status::print_table(&summary);
                Ok(())
            }
        }
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config.redacted())
                .map_err(|e| AccrueError::Internal(format!("failed to render config: {e}")))?;
            println!("{rendered}");
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AccrueError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AccrueError::Internal(format!("failed to render output: {e}")))?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sync_parses_platform_names() {
        let cli = Cli::parse_from([
            "accrue", "sync", "--user", "u1", "--platform", "gmail", "--resource", "INBOX",
        ]);
        match cli.command {
            Commands::Sync {
                platform, resource, ..
            } => {
                assert_eq!(platform, Platform::Gmail);
                assert_eq!(resource.as_deref(), Some("INBOX"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn default_config_renders_as_toml() {
        let config = accrue_config::load_and_validate_str("").unwrap();
        let rendered = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(rendered.contains("[sync]"));
    }
}
