// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatline - a streaming chat service over local model backends.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use chatline_config::ChatlineConfig;
use clap::{Parser, Subcommand};

/// Chatline - a streaming chat service over local model backends.
#[derive(Parser, Debug)]
#[command(name = "chatline", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP and WebSocket server.
    Serve,
    /// Validate the configuration and print a summary.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> ChatlineConfig {
    let loaded = match path {
        Some(path) => chatline_config::load_and_validate_path(path),
        None => chatline_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            chatline_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn print_summary(config: &ChatlineConfig) {
    println!("chatline: configuration OK");
    println!("  server:     {}:{}", config.server.host, config.server.port);
    println!("  ollama:     {}", config.ollama.base_url);
    println!(
        "  models:     fast={} code={} general={} classifier={}",
        config.routing.fast.model,
        config.routing.code.model,
        config.routing.general.model,
        config.classifier.model
    );
    println!(
        "  pool:       {} connections, {}ms acquire timeout",
        config.pool.capacity, config.pool.acquire_timeout_ms
    );
    println!("  cache:      {} entries", config.cache.capacity);
    println!("  prometheus: {}", config.prometheus.enabled);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("chatline: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => print_summary(&config),
        None => {
            println!("chatline: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands_and_global_config() {
        let cli = Cli::try_parse_from(["chatline", "serve", "--config", "/tmp/c.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));

        let cli = Cli::try_parse_from(["chatline", "check-config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["chatline", "shell"]).is_err());
    }

    #[test]
    fn defaults_are_valid() {
        let config = chatline_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.pool.capacity, 3);
        assert_eq!(config.cache.capacity, 100);
    }
}
