//! Omega terminal
//!
//! Line-oriented Web3 command terminal

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod cmd_parser;
mod commands;
mod config;
mod context;
mod error;
mod history;
mod input;
mod input_mode;
mod output;
mod queue;
mod services;
mod session;
mod terminal;

use config::{load_or_create_config, parse_override};
use terminal::Terminal;

#[derive(Debug, Parser)]
#[command(name = "omega-terminal")]
#[command(about = "Omega - Web3 command terminal", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.omega/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override a config value, e.g. --set theme=matrix
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    overrides: Vec<(String, String)>,

    /// Run a command before the first prompt (repeatable)
    #[arg(short, long, value_name = "COMMAND")]
    exec: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_or_create_config(cli.config.as_deref())?;
    config.merge_overrides(cli.overrides)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(config.log_filter())
        .init();

    tracing::debug!("Loaded configuration: {:?}", config);

    let mut builder = Terminal::builder(config);
    if !cli.exec.is_empty() {
        builder = builder.without_wallet_prompt();
    }
    cli::run_cli(builder.build(), cli.exec).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_repeated_flags() {
        let cli = Cli::try_parse_from([
            "omega-terminal",
            "--config",
            "/tmp/omega.toml",
            "--set",
            "theme=matrix",
            "--set",
            "sound=false",
            "-e",
            "status",
            "--exec",
            "echo \"hi there\"",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/omega.toml")));
        assert_eq!(
            cli.overrides,
            vec![
                ("theme".to_string(), "matrix".to_string()),
                ("sound".to_string(), "false".to_string()),
            ]
        );
        assert_eq!(cli.exec, vec!["status", "echo \"hi there\""]);
    }

    #[test]
    fn test_cli_rejects_malformed_override() {
        assert!(Cli::try_parse_from(["omega-terminal", "--set", "theme"]).is_err());
        assert!(Cli::try_parse_from(["omega-terminal", "--bogus"]).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["omega-terminal"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.overrides.is_empty());
        assert!(cli.exec.is_empty());
    }
}
