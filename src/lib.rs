//! Bandit-driven music recommendations that learn from your ratings.
//!
//! Core modules:
//! - [`bandit`] - Thompson Sampling and Epsilon-Greedy policies
//! - [`recommender`] - Candidate gathering, scoring and selection
//! - [`catalogue`] - Track sources (Last.fm, in-memory)
//! - [`session`] - Per-listener state, ratings and playlists
//!
//! ### Supporting Modules
//!
//! - [`config`] - Configuration file and environment handling
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//! - [`interactive`] - Terminal rating loop
//!
//! ## Quick Start Example
//!
//! ```
//! use encore::bandit::ThompsonSampling;
//! use encore::catalogue::{CatalogueTrack, MemoryCatalogue};
//! use encore::recommender::{RecommendMode, Recommender};
//!
//! let mut catalogue = MemoryCatalogue::default();
//! catalogue.add_similar("Gravity", "John Mayer", vec![
//!     CatalogueTrack::new("Belief", "John Mayer"),
//!     CatalogueTrack::new("Stop This Train", "John Mayer"),
//! ]);
//!
//! let mut recommender = Recommender::new(
//!     Box::new(catalogue),
//!     Box::new(ThompsonSampling::with_seed(1)),
//! );
//!
//! let mode = RecommendMode::Track;
//! let picks = recommender.recommend_bulk(mode, "Gravity", "John Mayer", None, 10, &[]);
//! assert_eq!(picks.len(), 2);
//!
//! // A five-star rating becomes a reward of 1.0
//! recommender.give_feedback(&picks[0].id, 1.0);
//! assert_eq!(recommender.policy().value(&picks[0].id), 1.0);
//! ```
//!
//! ## Algorithm Details
//!
//! ### Thompson Sampling
//! - Keeps `(total reward, observations)` per `"track - artist"` id
//! - Scores by drawing from `Beta(1 + reward, 1 + count - reward)`
//! - Unseen tracks draw uniformly, so new music always gets a chance
//!
//! ### Epsilon-Greedy
//! - With probability epsilon (0.2) scores uniformly at random
//! - Otherwise scores with the empirical mean reward
//!
//! ### Engine-Level Diversity
//! - Tracks returned in the last three rounds have their score halved
//! - Every score gets a uniform nudge in `[-0.2, 0.2]`
//! - One round in five is a random sample instead of the top scores
//!
//! ## Error Handling
//!
//! The core never fails: empty catalogues and unknown tracks produce empty
//! lists or zero statistics. Catalogue, configuration and CLI code return
//! `anyhow::Result`.
//!
//! ## Logging
//!
//! Uses the `log` facade. The binary initialises `env_logger`, so
//! `RUST_LOG=encore=debug` shows every sampled score.

pub mod bandit;
pub mod catalogue;
pub mod cli;
pub mod completion;
pub mod config;
pub mod interactive;
pub mod recommender;
pub mod session;
