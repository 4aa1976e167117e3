#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use probot::config::Config;
use probot::gateway;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// `ProBot` - a small chat server in front of Gemini.
#[derive(Parser, Debug)]
#[command(name = "probot")]
#[command(version)]
#[command(about = "Web chat assistant backed by Google Gemini.", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "probot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on; overrides config and env
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; overrides config and env
        #[arg(long)]
        host: Option<String>,
    },

    /// Show the effective configuration
    Status,

    /// Print a shell completion script to stdout
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Completion scripts go to stdout, so no logging yet.
    if let Commands::Completions { shell } = cli.command {
        let mut stdout = std::io::stdout();
        clap_complete::generate(shell, &mut Cli::command(), "probot", &mut stdout);
        return Ok(());
    }

    // Initialize logging - respects RUST_LOG env var
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("probot=info,tower_http=info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Completions { .. } => Ok(()),

        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            info!(
                "Starting ProBot on {}:{}",
                config.gateway.host, config.gateway.port
            );
            gateway::run_gateway(config).await
        }

        Commands::Status => {
            print_status(&config);
            Ok(())
        }
    }
}

fn print_status(config: &Config) {
    println!("🤖 ProBot Status");
    println!();
    println!("Version:     {}", env!("CARGO_PKG_VERSION"));
    println!("Config:      {}", config.config_path.display());
    println!();
    println!("Provider:    {}", config.provider.name);
    println!("  Model:     {}", config.provider.model);
    println!(
        "  API key:   {}",
        config
            .masked_api_key()
            .unwrap_or_else(|| "(not set)".into())
    );
    println!(
        "  Timeout:   {}",
        config
            .provider
            .timeout_secs
            .map_or_else(|| "none".into(), |s| format!("{s}s"))
    );
    println!();
    println!(
        "Gateway:     {}:{}",
        config.gateway.host, config.gateway.port
    );
    println!("  Static:    {}", config.gateway.static_dir.display());
    println!("  Upload:    {} bytes max", config.gateway.max_upload_bytes);
    println!();
    println!(
        "Generation:  temperature {}, topP {}, maxOutputTokens {}",
        config.generation.temperature,
        config.generation.top_p,
        config.generation.max_output_tokens
    );
    println!(
        "Sessions:    in-memory, {} turns max, default id \"{}\"",
        config.session.max_turns, config.session.default_session_id
    );
    match &config.prompt.persona_path {
        Some(path) => println!("Persona:     {}", path.display()),
        None => println!("Persona:     built-in"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_host_and_port() {
        let cli = Cli::try_parse_from(["probot", "serve", "--port", "8080", "--host", "0.0.0.0"])
            .unwrap();
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, Some(8080));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from("probot.toml"));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["probot", "status", "--config", "/etc/probot.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.config, PathBuf::from("/etc/probot.toml"));
    }
}
