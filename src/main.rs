//! # Encore - Bandit-Driven Music Recommendations
//!
//! Encore seeds candidate tracks from Last.fm, ranks them with a
//! multi-armed-bandit policy and learns from the ratings you give.
//!
//! ## Usage
//!
//! ```bash
//! # One-off recommendations
//! encore recommend --track "Gravity" --artist "John Mayer"
//!
//! # Rate results and let the policy learn
//! encore rate --track "Gravity" --artist "John Mayer"
//!
//! # Offline, against a catalogue fixture
//! encore --catalogue catalogue.json recommend --track "Gravity" --artist "John Mayer"
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use encore::catalogue::{Catalogue, LastFmClient, MemoryCatalogue};
use encore::cli::{self, SeedArgs};
use encore::completion;
use encore::config::Config;
use encore::interactive::{self, RoundSeed, LOCAL_USER};
use encore::session::SessionRegistry;
use log::{debug, info};
use std::sync::Arc;

/// Pick the catalogue: an offline fixture when given, Last.fm otherwise.
fn build_catalogue(args: &cli::Args, config: &Config) -> Result<Arc<dyn Catalogue + Sync>> {
    if let Some(path) = &args.catalogue {
        info!("Using offline catalogue {}", path.display());
        return Ok(Arc::new(MemoryCatalogue::load(path)?));
    }

    let client = LastFmClient::new(
        config.api_key()?,
        &config.lastfm_base_url,
        config.request_timeout_secs,
    )?;
    Ok(Arc::new(client))
}

fn build_sessions(args: &cli::Args, config: &Config) -> Result<SessionRegistry> {
    let catalogue = build_catalogue(args, config)?;
    Ok(SessionRegistry::from_config(config, catalogue))
}

fn round_seed(seed: SeedArgs) -> RoundSeed {
    RoundSeed {
        mode: seed.mode,
        track: seed.track,
        artist: seed.artist,
        tag: seed.tag,
        limit: seed.limit,
    }
}

/// Main entry point for the Encore application.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug encore recommend ...` - everything
/// - `RUST_LOG=encore::bandit=debug encore rate ...` - sampled scores only
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    let mut config = Config::load()?;
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    debug!("Effective config: {:?}", config.redacted());

    match &args.command {
        cli::Command::Recommend { seed, exclude } => {
            let mut sessions = build_sessions(&args, &config)?;
            let picks = sessions.get_or_create(LOCAL_USER).recommender.recommend_bulk(
                seed.mode,
                &seed.track,
                &seed.artist,
                seed.tag.as_deref(),
                seed.limit,
                exclude,
            );
            interactive::print_round(&mut std::io::stdout().lock(), &picks)?;
        }
        cli::Command::Rate { seed } => {
            let mut sessions = build_sessions(&args, &config)?;
            info!("Starting rating session with {} policy", config.policy);
            let stdin = std::io::stdin();
            interactive::run(
                &mut sessions,
                &round_seed(seed.clone()),
                stdin.lock(),
                &mut std::io::stdout().lock(),
            )?;
        }
        cli::Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(*shell, &mut cmd);
        }
    }

    Ok(())
}
