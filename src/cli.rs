//! # Command-Line Interface Module
//!
//! Clap definitions for the `encore` binary.
//!
//! ## Commands
//!
//! - `recommend`: print a ranked list for a seed track
//! - `rate`: interactive loop that recommends, takes star ratings and learns
//! - `config`: show the effective configuration
//! - `completion`: generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! encore recommend --track "Gravity" --artist "John Mayer"
//! encore rate --track "Gravity" --artist "John Mayer" --policy epsilon-greedy
//! encore recommend --track "Gravity" --artist "John Mayer" --mode tag --tag blues
//! ```

use crate::bandit::PolicyKind;
use crate::recommender::RecommendMode;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "encore")]
#[command(about = "Encore: bandit-driven music recommendations seeded from Last.fm")]
#[command(version)]
pub struct Args {
    /// Offline catalogue JSON file to use instead of the Last.fm API
    #[arg(long, global = true, env = "ENCORE_CATALOGUE", value_hint = clap::ValueHint::FilePath)]
    pub catalogue: Option<PathBuf>,

    /// Bandit policy for new listeners (overrides the config file)
    #[arg(long, global = true, value_enum)]
    pub policy: Option<PolicyKind>,

    /// Seed every random source for reproducible output
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// The seed a recommendation round starts from.
#[derive(clap::Args, Debug, Clone)]
pub struct SeedArgs {
    /// Seed track name
    #[arg(long)]
    pub track: String,

    /// Seed artist name
    #[arg(long)]
    pub artist: String,

    /// Tag (genre) whose top tracks join the pool in tag mode
    #[arg(long)]
    pub tag: Option<String>,

    /// How the seed is used: "track", "artist" or "tag"
    #[arg(long, value_enum, default_value_t = RecommendMode::Track)]
    pub mode: RecommendMode,

    /// Maximum number of recommendations per round
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print recommendations for a seed track
    ///
    /// Gathers similar tracks, the artist's top tracks and (in tag mode) the
    /// tag's top tracks, scores them with the bandit policy and prints the
    /// selection with final scores.
    Recommend {
        #[command(flatten)]
        seed: SeedArgs,

        /// Item id ("Track - Artist") to leave out; repeatable
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Rate recommendations interactively and watch the policy learn
    ///
    /// Shows a numbered list, then reads commands from stdin:
    /// `<n> <stars>` rates item n from 0 to 5, `more` fetches a fresh round,
    /// `top` recommends around your favourite, `playlists` lists rated
    /// tracks, `reset` forgets everything learned, `quit` exits.
    Rate {
        #[command(flatten)]
        seed: SeedArgs,
    },

    /// Print the effective configuration as JSON (API key masked)
    Config,

    /// Generate shell completions
    ///
    /// Usage: encore completion bash > ~/.local/share/bash-completion/completions/encore
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
