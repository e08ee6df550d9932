//! # tunebridge
//!
//! Command-line client for the Tunebridge music library.
//!
//! ## Configuration
//!
//! Reads `$XDG_CONFIG_HOME/tunebridge/config.toml`, creating a documented
//! default file on first run. Spotify needs a `client_id` from the Spotify
//! developer dashboard before it can be enabled.
//!
//! ## Running
//!
//! ```bash
//! tunebridge auth spotify
//! tunebridge albums
//! tunebridge playlists --provider spotify --json
//! tunebridge link spotify album 4aawyAB9vmqN3uQ7FjRGTy
//!
//! # With debug logging
//! RUST_LOG=debug tunebridge status
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use provider_spotify::consent::ChannelConsentFlow;
use tunebridge_cli::config::Config;
use tunebridge_cli::consent_host;
use tunebridge_cli::unified::UnifiedResult;
use tunebridge_cli::Tunebridge;
use tunebridge_core::prelude::*;
use tunebridge_credentials::FileCredentialStore;

#[derive(Debug, Parser)]
#[command(name = "tunebridge", version, about = "Browse your music library across streaming services")]
struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authorize access to a provider
    Auth {
        #[arg(value_parser = parse_provider)]
        provider: MusicProviderType,
    },
    /// Remove stored authorization for a provider
    Logout {
        #[arg(value_parser = parse_provider)]
        provider: MusicProviderType,
    },
    /// Show which providers are configured and authorized
    Status,
    /// List saved albums, newest first
    Albums(ListArgs),
    /// List playlists, newest first
    Playlists(ListArgs),
    /// Print the deep link that opens an entry in the provider's app
    Link {
        #[arg(value_parser = parse_provider)]
        provider: MusicProviderType,
        kind: EntryKind,
        id: String,
    },
}

#[derive(Debug, clap::Args)]
struct ListArgs {
    /// Only list entries from this provider
    #[arg(long, value_parser = parse_provider)]
    provider: Option<MusicProviderType>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EntryKind {
    Album,
    Playlist,
}

fn parse_provider(raw: &str) -> std::result::Result<MusicProviderType, String> {
    MusicProviderType::from_id(raw).ok_or_else(|| {
        let known: Vec<&str> = MusicProviderType::ALL.iter().map(|p| p.id()).collect();
        format!("unknown provider '{raw}', expected one of: {}", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    info!("Starting tunebridge v{}", env!("CARGO_PKG_VERSION"));

    let store = FileCredentialStore::new(config.credentials_path()?);
    info!("Using credential store at {}", store.path().display());

    let (consent, requests) = ChannelConsentFlow::new();
    let host = consent_host::spawn_terminal_host(requests);

    // No MusicKit binding exists for terminal hosts.
    let app = Tunebridge::from_config(&config, Arc::new(store), Arc::new(consent), None)?;

    let outcome = run(&app, cli.command).await;
    host.abort();
    outcome
}

async fn run(app: &Tunebridge, command: Command) -> Result<()> {
    match command {
        Command::Auth { provider } => {
            app.authorize(provider).await?;
            println!("{} authorized", provider);
        }
        Command::Logout { provider } => {
            app.logout(provider).await?;
            println!("{} authorization removed", provider);
        }
        Command::Status => {
            for status in app.status().await {
                let state = match (status.configured, status.authorized) {
                    (false, _) => "not configured".to_string(),
                    (true, false) => "not authorized".to_string(),
                    (true, true) => match status.token_expiry {
                        Some(expiry) => format!("authorized (token valid until {})", expiry.to_rfc3339()),
                        None => "authorized".to_string(),
                    },
                };
                println!("{:<12} {}", status.provider.display_name(), state);
            }
        }
        Command::Albums(args) => {
            let result = app.library().albums(args.provider).await;
            if args.json {
                print_json(&result)?;
            } else {
                for album in &result.items {
                    println!(
                        "{:<40} {:<28} {}",
                        album.title,
                        album.artist_name,
                        album.source_provider.display_name()
                    );
                }
                report_gaps(&result);
            }
        }
        Command::Playlists(args) => {
            let result = app.library().playlists(args.provider).await;
            if args.json {
                print_json(&result)?;
            } else {
                for playlist in &result.items {
                    let tracks = playlist
                        .track_count
                        .map(|n| format!("{n} tracks"))
                        .unwrap_or_default();
                    println!(
                        "{:<40} {:<12} {}",
                        playlist.name,
                        tracks,
                        playlist.source_provider.display_name()
                    );
                }
                report_gaps(&result);
            }
        }
        Command::Link { provider, kind, id } => {
            let link = match kind {
                EntryKind::Album => {
                    let album = CanonicalAlbum::new(provider, id, "", "");
                    app.registry().deep_link(LibraryItem::Album(&album))
                }
                EntryKind::Playlist => {
                    let playlist = CanonicalPlaylist::new(provider, id, "");
                    app.registry().deep_link(LibraryItem::Playlist(&playlist))
                }
            }
            .context("No deep link can be built for this entry")?;

            println!("{}", link.app_url);
            if let Some(web_url) = link.web_url {
                println!("{}", web_url);
            }
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{json}");
    Ok(())
}

fn report_gaps<T>(result: &UnifiedResult<T>) {
    for provider in &result.unauthorized {
        eprintln!("{} skipped: run `tunebridge auth {}` first", provider.display_name(), provider.id());
    }
    for failure in &result.failures {
        eprintln!("{} failed: {}", failure.provider.display_name(), failure.message);
    }
}
