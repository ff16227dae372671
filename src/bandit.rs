//! # Bandit Policies
//!
//! Online learning policies that turn per-track reward history into an
//! exploration-aware score.
//!
//! Every policy keeps a [`RewardTable`] keyed by item identifier
//! (`"<track> - <artist>"`) and exposes the same capability through the
//! [`Bandit`] trait, so the recommendation engine never needs to know which
//! algorithm is active:
//!
//! - [`ThompsonSampling`] - samples from a Beta posterior per item
//! - [`EpsilonGreedy`] - coin flip between a uniform draw and the empirical mean
//!
//! Each policy owns its random source. Use `with_seed` for reproducible runs.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Smallest shape parameter handed to the Beta distribution.
const MIN_SHAPE: f64 = 1e-10;

/// Exploration probability used by [`EpsilonGreedy`] unless configured otherwise.
pub const DEFAULT_EPSILON: f64 = 0.2;

/// Accumulated feedback for a single item.
///
/// Rewards are expected in `[0.0, 1.0]`, which keeps `total_reward <= count`.
/// Thompson Sampling relies on that: `1 + count - total_reward` is its Beta
/// `beta` parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardStats {
    pub total_reward: f64,
    pub count: u32,
}

impl RewardStats {
    /// Fold one observation into the running totals.
    pub fn record(&mut self, reward: f64) {
        self.total_reward += reward;
        self.count += 1;
    }

    /// Empirical mean reward, `0.0` for an item with no observations.
    #[must_use]
    pub fn mean(&self) -> f64 {
        match self.count {
            0 => 0.0,
            count => self.total_reward / f64::from(count),
        }
    }

    /// Ranking proxy used to pick a user's favourite item.
    ///
    /// `reward / (reward + count)` is monotone in the share of positive
    /// feedback but is not a probability.
    #[must_use]
    pub fn success_ratio(&self) -> f64 {
        self.total_reward / (self.total_reward + f64::from(self.count) + 1e-9)
    }

    /// Whether the pair still satisfies `total_reward <= count`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total_reward <= f64::from(self.count) + 1e-9
    }
}

/// Per-item reward statistics owned by a policy.
pub type RewardTable = HashMap<String, RewardStats>;

/// Capability shared by every exploration/exploitation policy.
///
/// `update` and `score` are the whole contract the engine relies on. `stats`
/// and `value` are read-only views for ranking and diagnostics.
pub trait Bandit: Send {
    /// Record an observed reward for `item_id`. Never fails and does not
    /// validate the range of `reward`.
    fn update(&mut self, item_id: &str, reward: f64);

    /// Exploration-aware score for `item_id`. Unknown items count as having
    /// zero observations.
    fn score(&mut self, item_id: &str) -> f64;

    /// All statistics recorded so far.
    fn stats(&self) -> &RewardTable;

    /// Empirical mean reward of `item_id`.
    fn value(&self, item_id: &str) -> f64 {
        self.stats().get(item_id).map_or(0.0, RewardStats::mean)
    }
}

fn record_reward(rewards: &mut RewardTable, item_id: &str, reward: f64) {
    let stats = rewards.entry(item_id.to_string()).or_default();
    stats.record(reward);
    debug!(
        "Recorded reward {reward:.2} for {item_id} (total={:.2}, count={})",
        stats.total_reward, stats.count
    );
}

/// Thompson Sampling over Beta-distributed reward estimates.
///
/// `score` draws once from `Beta(1 + reward, 1 + count - reward)`. New items
/// get `Beta(1, 1)`, a uniform draw on `[0, 1]`, so they compete fairly with
/// established ones. Items with a long, favourable history produce samples
/// concentrated near their mean.
///
/// # Examples
///
/// ```
/// use encore::bandit::{Bandit, ThompsonSampling};
///
/// let mut policy = ThompsonSampling::with_seed(7);
/// policy.update("Gravity - John Mayer", 1.0);
///
/// let score = policy.score("Gravity - John Mayer");
/// assert!((0.0..=1.0).contains(&score));
/// assert_eq!(policy.value("Gravity - John Mayer"), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct ThompsonSampling {
    rewards: RewardTable,
    rng: StdRng,
}

impl ThompsonSampling {
    /// Policy seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Policy with a reproducible random stream.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rewards: RewardTable::new(),
            rng,
        }
    }

    /// Beta posterior parameters `(alpha, beta)` for `item_id`.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the stored statistics violate
    /// `total_reward <= count`. Release builds clamp the parameters instead.
    #[must_use]
    pub fn beta_params(&self, item_id: &str) -> (f64, f64) {
        let stats = self.rewards.get(item_id).copied().unwrap_or_default();
        debug_assert!(
            stats.is_consistent(),
            "reward statistics for {item_id} exceed their observation count: {stats:?}"
        );

        let alpha = 1.0 + stats.total_reward;
        let beta = 1.0 + f64::from(stats.count) - stats.total_reward;
        (alpha.max(MIN_SHAPE), beta.max(MIN_SHAPE))
    }
}

impl Default for ThompsonSampling {
    fn default() -> Self {
        Self::new()
    }
}

impl Bandit for ThompsonSampling {
    fn update(&mut self, item_id: &str, reward: f64) {
        record_reward(&mut self.rewards, item_id, reward);
    }

    fn score(&mut self, item_id: &str) -> f64 {
        let (alpha, beta) = self.beta_params(item_id);
        let mean = alpha / (alpha + beta);
        let score = match Beta::new(alpha, beta) {
            Ok(dist) => {
                let sample: f64 = dist.sample(&mut self.rng);
                if sample.is_finite() {
                    sample
                } else {
                    warn!("Beta({alpha}, {beta}) for {item_id} sampled {sample}, using the mean");
                    mean
                }
            }
            Err(err) => {
                warn!("Cannot sample Beta({alpha}, {beta}) for {item_id}: {err}");
                mean
            }
        };
        debug!("Thompson {item_id} | Beta({alpha:.1}, {beta:.1}) -> score={score:.2}");
        score
    }

    fn stats(&self) -> &RewardTable {
        &self.rewards
    }
}

/// Epsilon-Greedy: explore with probability `epsilon`, otherwise exploit.
///
/// Exploration returns a uniform draw on `[0, 1]`; exploitation returns the
/// empirical mean (`0.0` for unseen items). The coin is flipped on every
/// call, there is no decay schedule.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    rewards: RewardTable,
    epsilon: f64,
    rng: StdRng,
}

impl EpsilonGreedy {
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(DEFAULT_EPSILON, StdRng::from_entropy())
    }

    #[must_use]
    pub fn with_seed(epsilon: f64, seed: u64) -> Self {
        Self::with_rng(epsilon, StdRng::seed_from_u64(seed))
    }

    /// `epsilon` is clamped to `[0, 1]`.
    #[must_use]
    pub fn with_rng(epsilon: f64, rng: StdRng) -> Self {
        Self {
            rewards: RewardTable::new(),
            epsilon: epsilon.clamp(0.0, 1.0),
            rng,
        }
    }

    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self::new()
    }
}

impl Bandit for EpsilonGreedy {
    fn update(&mut self, item_id: &str, reward: f64) {
        record_reward(&mut self.rewards, item_id, reward);
    }

    fn score(&mut self, item_id: &str) -> f64 {
        if self.rng.gen::<f64>() < self.epsilon {
            let score = self.rng.gen_range(0.0..=1.0);
            debug!("Explore {item_id} | score={score:.2}");
            return score;
        }

        let stats = self.rewards.get(item_id).copied().unwrap_or_default();
        let score = stats.mean();
        debug!(
            "Exploit {item_id} | score={score:.2} (total={:.2}, count={})",
            stats.total_reward, stats.count
        );
        score
    }

    fn stats(&self) -> &RewardTable {
        &self.rewards
    }
}

/// Selects which policy a fresh recommender is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    Thompson,
    EpsilonGreedy,
}

impl PolicyKind {
    /// Build a fresh policy with empty statistics.
    ///
    /// `epsilon` only applies to [`PolicyKind::EpsilonGreedy`].
    #[must_use]
    pub fn build(self, epsilon: f64, seed: Option<u64>) -> Box<dyn Bandit> {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        match self {
            Self::Thompson => Box::new(ThompsonSampling::with_rng(rng)),
            Self::EpsilonGreedy => Box::new(EpsilonGreedy::with_rng(epsilon, rng)),
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thompson => write!(f, "thompson"),
            Self::EpsilonGreedy => write!(f, "epsilon-greedy"),
        }
    }
}
