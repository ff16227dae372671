//! # Recommendation Engine
//!
//! Turns a seed (track, artist, optional tag) into a ranked list of candidate
//! tracks, and routes user feedback back into the active [`Bandit`] policy.
//!
//! ## Pipeline
//!
//! 1. **Gather**: similar tracks, the artist's top tracks and, in tag mode,
//!    the tag's top tracks are concatenated and deduplicated by item id.
//! 2. **Filter**: caller-supplied exclusions are dropped.
//! 3. **Score**: each candidate gets a policy score, halved if it was
//!    recommended in one of the last few rounds, plus a small uniform
//!    perturbation.
//! 4. **Select**: with probability `exploration_rate` a random sample is
//!    returned, otherwise the top `limit` by score.
//! 5. **Remember**: the returned ids become the newest round of the
//!    recently-recommended window.
//!
//! The policy already explores per item. The engine-level coin flip and
//! perturbation keep a converged policy from returning the same list on
//! every call.

use crate::bandit::Bandit;
use crate::catalogue::{Catalogue, CatalogueTrack};
use anyhow::{bail, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Separator between track and artist in an item id.
pub const ID_SEPARATOR: &str = " - ";

/// Build the item id used as the unit of learning.
///
/// Both halves are trimmed so that the same (track, artist) pair always maps
/// to the same key.
///
/// ```
/// assert_eq!(encore::recommender::item_id(" Gravity ", "John Mayer"), "Gravity - John Mayer");
/// ```
#[must_use]
pub fn item_id(track: &str, artist: &str) -> String {
    format!("{}{ID_SEPARATOR}{}", track.trim(), artist.trim())
}

/// Split an item id back into `(track, artist)`.
///
/// Splits on the last separator, since track titles ("Song - Live") contain
/// it far more often than artist names.
#[must_use]
pub fn split_item_id(id: &str) -> Option<(&str, &str)> {
    id.rsplit_once(ID_SEPARATOR)
        .filter(|(track, artist)| !track.trim().is_empty() && !artist.trim().is_empty())
}

/// A scored candidate produced by one recommendation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub artist: String,
    pub id: String,
    pub score: f64,
}

impl From<CatalogueTrack> for Candidate {
    fn from(track: CatalogueTrack) -> Self {
        let id = item_id(&track.name, &track.artist.name);
        Self {
            name: track.name,
            artist: track.artist.name,
            id,
            score: 0.0,
        }
    }
}

/// How the seed is interpreted. The tag is only queried in [`RecommendMode::Tag`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RecommendMode {
    #[default]
    Track,
    Artist,
    Tag,
}

/// Tuning knobs for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Probability of an engine-level random round.
    pub exploration_rate: f64,
    /// Half-width of the uniform score perturbation.
    pub perturbation: f64,
    /// Multiplier applied to recently recommended items.
    pub recency_damping: f64,
    /// Number of past rounds remembered for damping.
    pub recent_rounds: usize,
    pub similar_limit: usize,
    pub artist_limit: usize,
    pub tag_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exploration_rate: 0.2,
            perturbation: 0.2,
            recency_damping: 0.5,
            recent_rounds: 3,
            similar_limit: 30,
            artist_limit: 20,
            tag_limit: 20,
        }
    }
}

impl EngineConfig {
    /// Largest accepted perturbation half-width. Policy scores live in
    /// `[0, 1]`, so anything wider only adds noise.
    pub const MAX_PERTURBATION: f64 = 1.0;

    /// Check that every probability and width is finite and in range.
    ///
    /// # Errors
    ///
    /// Names the first out-of-range setting.
    pub fn validate(&self) -> Result<()> {
        for (name, value, max) in [
            ("exploration_rate", self.exploration_rate, 1.0),
            ("recency_damping", self.recency_damping, 1.0),
            ("perturbation", self.perturbation, Self::MAX_PERTURBATION),
        ] {
            if !(0.0..=max).contains(&value) {
                bail!("Engine setting {name} must be between 0 and {max}, got {value}");
            }
        }
        Ok(())
    }

    /// Copy with every setting forced into range. Non-finite values fall
    /// back to their defaults.
    #[must_use]
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        Self {
            exploration_rate: clamp_or(self.exploration_rate, 1.0, defaults.exploration_rate),
            recency_damping: clamp_or(self.recency_damping, 1.0, defaults.recency_damping),
            perturbation: clamp_or(
                self.perturbation,
                Self::MAX_PERTURBATION,
                defaults.perturbation,
            ),
            ..self
        }
    }
}

fn clamp_or(value: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        fallback
    }
}

/// Bandit-driven recommender for one listener.
pub struct Recommender {
    catalogue: Box<dyn Catalogue>,
    bandit: Box<dyn Bandit>,
    config: EngineConfig,
    recent: VecDeque<Vec<String>>,
    previous: HashSet<String>,
    rng: StdRng,
}

impl Recommender {
    /// Recommender with default tuning and an entropy-seeded random source.
    #[must_use]
    pub fn new(catalogue: Box<dyn Catalogue>, bandit: Box<dyn Bandit>) -> Self {
        Self::with_config(catalogue, bandit, EngineConfig::default(), None)
    }

    /// Recommender with explicit tuning. `seed` pins the engine's own
    /// random source (perturbation and exploration rounds). Out-of-range
    /// settings are clamped.
    #[must_use]
    pub fn with_config(
        catalogue: Box<dyn Catalogue>,
        bandit: Box<dyn Bandit>,
        config: EngineConfig,
        seed: Option<u64>,
    ) -> Self {
        if let Err(err) = config.validate() {
            warn!("{err}, clamping into range");
        }
        Self {
            catalogue,
            bandit,
            config: config.clamped(),
            recent: VecDeque::new(),
            previous: HashSet::new(),
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        }
    }

    /// Collect the deduplicated candidate pool for a seed.
    ///
    /// A failing lookup is logged and counts as an empty answer. An empty
    /// result means "nothing to recommend", not an error.
    pub fn gather_candidates(
        &self,
        track: &str,
        artist: &str,
        tag: Option<&str>,
    ) -> Vec<Candidate> {
        let mut tracks = lookup_or_empty("similar tracks", || {
            self.catalogue.similar_tracks(track, artist, self.config.similar_limit)
        });
        tracks.extend(lookup_or_empty("artist top tracks", || {
            self.catalogue.artist_top_tracks(artist, self.config.artist_limit)
        }));
        if let Some(tag) = tag.filter(|tag| !tag.trim().is_empty()) {
            tracks.extend(lookup_or_empty("tag top tracks", || {
                self.catalogue.tag_top_tracks(tag, self.config.tag_limit)
            }));
        }

        let mut seen = HashSet::new();
        let unique: Vec<Candidate> = tracks
            .into_iter()
            .map(Candidate::from)
            .filter(|candidate| seen.insert(candidate.id.clone()))
            .collect();

        debug!("Gathered {} unique candidates for {}", unique.len(), item_id(track, artist));
        unique
    }

    /// Rank candidates for a seed and return at most `limit` of them.
    ///
    /// Never returns an id listed in `exclude_ids`. Returns fewer than
    /// `limit` only when the filtered pool is smaller.
    pub fn recommend_bulk(
        &mut self,
        mode: RecommendMode,
        track: &str,
        artist: &str,
        tag: Option<&str>,
        limit: usize,
        exclude_ids: &[String],
    ) -> Vec<Candidate> {
        let tag = tag.filter(|_| mode == RecommendMode::Tag);
        let excluded: HashSet<&str> = exclude_ids.iter().map(String::as_str).collect();

        let mut pool: Vec<Candidate> = self
            .gather_candidates(track, artist, tag)
            .into_iter()
            .filter(|candidate| !excluded.contains(candidate.id.as_str()))
            .collect();

        for candidate in &mut pool {
            let mut score = self.bandit.score(&candidate.id);
            if self.is_recent(&candidate.id) {
                score *= self.config.recency_damping;
            }
            candidate.score = score + self.perturbation();
        }

        let explore = self.rng.gen::<f64>() < self.config.exploration_rate;
        let selected = if explore {
            pool.shuffle(&mut self.rng);
            pool.truncate(limit);
            pool
        } else {
            sort_by_score(&mut pool);
            pool.truncate(limit);
            pool
        };

        info!(
            "Recommended {} tracks for {} ({})",
            selected.len(),
            item_id(track, artist),
            if explore { "explore" } else { "exploit" }
        );
        self.remember(&selected);
        selected
    }

    /// Single best (or explored) candidate for a seed.
    pub fn recommend_one(
        &mut self,
        mode: RecommendMode,
        track: &str,
        artist: &str,
        tag: Option<&str>,
        exclude_ids: &[String],
    ) -> Option<Candidate> {
        self.recommend_bulk(mode, track, artist, tag, 1, exclude_ids)
            .into_iter()
            .next()
    }

    /// Recommend around the listener's favourite item so far.
    ///
    /// The favourite is the id with the highest `reward / (reward + count)`
    /// ratio. Its neighbourhood is regathered and ranked by raw policy score,
    /// without damping or perturbation. Returns an empty list until some item
    /// has received a positive reward.
    pub fn recommend_personal_top(&mut self, top_k: usize) -> Vec<Candidate> {
        let best = self
            .bandit
            .stats()
            .iter()
            .filter(|(_, stats)| stats.total_reward > 0.0)
            .max_by(|(a_id, a), (b_id, b)| {
                a.success_ratio()
                    .total_cmp(&b.success_ratio())
                    .then_with(|| b_id.cmp(a_id))
            })
            .map(|(id, _)| id.clone());

        let Some(best) = best else {
            debug!("No positive feedback yet, nothing to personalise");
            return Vec::new();
        };
        let Some((track, artist)) = split_item_id(&best) else {
            warn!("Cannot split favourite item id {best:?} into track and artist");
            return Vec::new();
        };

        let mut pool = self.gather_candidates(track, artist, None);
        for candidate in &mut pool {
            candidate.score = self.bandit.score(&candidate.id);
        }
        sort_by_score(&mut pool);
        pool.truncate(top_k);

        info!("Personal top {} seeded from {best}", pool.len());
        pool
    }

    /// Feed a reward for a previously recommended item into the policy.
    ///
    /// Repeated feedback for the same id accumulates.
    pub fn give_feedback(&mut self, item_id: &str, reward: f64) {
        self.bandit.update(item_id, reward);
    }

    /// Swap in a fresh policy, discarding learned statistics.
    pub fn reset_policy(&mut self, bandit: Box<dyn Bandit>) {
        self.bandit = bandit;
    }

    #[must_use]
    pub fn policy(&self) -> &dyn Bandit {
        self.bandit.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ids returned by the most recent `recommend_bulk` call.
    #[must_use]
    pub fn previous_selection(&self) -> &HashSet<String> {
        &self.previous
    }

    /// Whether `id` was returned in one of the remembered rounds.
    #[must_use]
    pub fn is_recent(&self, id: &str) -> bool {
        self.recent.iter().any(|round| round.iter().any(|recent| recent == id))
    }

    /// Number of rounds currently remembered for damping.
    #[must_use]
    pub fn recent_rounds(&self) -> usize {
        self.recent.len()
    }

    fn perturbation(&mut self) -> f64 {
        let width = self.config.perturbation;
        if width > 0.0 {
            self.rng.gen_range(-width..=width)
        } else {
            0.0
        }
    }

    fn remember(&mut self, selected: &[Candidate]) {
        let round: Vec<String> = selected.iter().map(|candidate| candidate.id.clone()).collect();
        self.previous = round.iter().cloned().collect();

        if round.is_empty() {
            return;
        }
        self.recent.push_back(round);
        while self.recent.len() > self.config.recent_rounds {
            self.recent.pop_front();
        }
    }
}

fn lookup_or_empty(
    what: &str,
    lookup: impl FnOnce() -> Result<Vec<CatalogueTrack>>,
) -> Vec<CatalogueTrack> {
    lookup().unwrap_or_else(|err| {
        warn!("Catalogue lookup for {what} failed: {err:#}");
        Vec::new()
    })
}

fn sort_by_score(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bandit::{RewardTable, ThompsonSampling};
    use crate::catalogue::MemoryCatalogue;
    use std::collections::HashMap;

    /// Policy with fixed per-item scores so ranking is predictable.
    struct FixedPolicy {
        scores: HashMap<String, f64>,
        rewards: RewardTable,
    }

    impl FixedPolicy {
        fn new(scores: &[(&str, f64)]) -> Self {
            Self {
                scores: scores.iter().map(|(id, s)| ((*id).to_string(), *s)).collect(),
                rewards: RewardTable::new(),
            }
        }
    }

    impl Bandit for FixedPolicy {
        fn update(&mut self, item_id: &str, reward: f64) {
            self.rewards.entry(item_id.to_string()).or_default().record(reward);
        }

        fn score(&mut self, item_id: &str) -> f64 {
            self.scores.get(item_id).copied().unwrap_or(0.5)
        }

        fn stats(&self) -> &RewardTable {
            &self.rewards
        }
    }

    struct FailingCatalogue;

    impl Catalogue for FailingCatalogue {
        fn similar_tracks(&self, _: &str, _: &str, _: usize) -> Result<Vec<CatalogueTrack>> {
            anyhow::bail!("connection refused")
        }

        fn artist_top_tracks(&self, artist: &str, _: usize) -> Result<Vec<CatalogueTrack>> {
            Ok(vec![CatalogueTrack::new("Fallback", artist)])
        }

        fn tag_top_tracks(&self, _: &str, _: usize) -> Result<Vec<CatalogueTrack>> {
            anyhow::bail!("timeout")
        }
    }

    fn tracks(names: &[&str], artist: &str) -> Vec<CatalogueTrack> {
        names.iter().map(|name| CatalogueTrack::new(name, artist)).collect()
    }

    fn sample_catalogue() -> MemoryCatalogue {
        let mut catalogue = MemoryCatalogue::default();
        catalogue.add_similar("Gravity", "John Mayer", tracks(&["S1", "S2", "S3"], "Band"));
        catalogue.add_artist("John Mayer", tracks(&["A1", "Gravity"], "John Mayer"));
        catalogue.add_tag("blues", tracks(&["T1", "S1"], "Band"));
        catalogue
    }

    fn deterministic() -> EngineConfig {
        EngineConfig {
            exploration_rate: 0.0,
            perturbation: 0.0,
            ..EngineConfig::default()
        }
    }

    fn engine(policy: impl Bandit + 'static, config: EngineConfig) -> Recommender {
        Recommender::with_config(Box::new(sample_catalogue()), Box::new(policy), config, Some(17))
    }

    fn track_round(rec: &mut Recommender, limit: usize, exclude: &[String]) -> Vec<Candidate> {
        let mode = RecommendMode::Track;
        rec.recommend_bulk(mode, "Gravity", "John Mayer", None, limit, exclude)
    }

    fn tag_round(rec: &mut Recommender, limit: usize, exclude: &[String]) -> Vec<Candidate> {
        let mode = RecommendMode::Tag;
        rec.recommend_bulk(mode, "Gravity", "John Mayer", Some("blues"), limit, exclude)
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|candidate| candidate.id.as_str()).collect()
    }

    #[test]
    fn test_item_id_round_trip() {
        assert_eq!(item_id("Gravity", "John Mayer"), "Gravity - John Mayer");
        assert_eq!(item_id(" Gravity", "John Mayer  "), item_id("Gravity", "John Mayer"));
        assert_eq!(split_item_id("Gravity - John Mayer"), Some(("Gravity", "John Mayer")));
        assert_eq!(
            split_item_id("Gravity - Live at the Nokia Theatre - John Mayer"),
            Some(("Gravity - Live at the Nokia Theatre", "John Mayer"))
        );
        assert_eq!(split_item_id("no separator"), None);
        assert_eq!(split_item_id(" - John Mayer"), None);
    }

    #[test]
    fn test_gather_deduplicates_in_first_seen_order() {
        let recommender = engine(FixedPolicy::new(&[]), deterministic());
        let pool = recommender.gather_candidates("Gravity", "John Mayer", Some("blues"));

        assert_eq!(
            ids(&pool),
            vec![
                "S1 - Band",
                "S2 - Band",
                "S3 - Band",
                "A1 - John Mayer",
                "Gravity - John Mayer",
                "T1 - Band",
            ]
        );
        assert_eq!(pool.iter().filter(|c| c.id == "S1 - Band").count(), 1);
    }

    #[test]
    fn test_gather_without_tag_skips_tag_lookup() {
        let recommender = engine(FixedPolicy::new(&[]), deterministic());
        let pool = recommender.gather_candidates("Gravity", "John Mayer", None);
        assert!(!ids(&pool).contains(&"T1 - Band"));
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn test_gather_tolerates_catalogue_failures() {
        let recommender = Recommender::with_config(
            Box::new(FailingCatalogue),
            Box::new(FixedPolicy::new(&[])),
            deterministic(),
            Some(1),
        );
        let pool = recommender.gather_candidates("Any", "Artist", Some("rock"));
        assert_eq!(ids(&pool), vec!["Fallback - Artist"]);
    }

    #[test]
    fn test_gather_unknown_seed_is_empty() {
        let recommender = engine(FixedPolicy::new(&[]), deterministic());
        assert!(recommender.gather_candidates("Nothing", "Nobody", Some("none")).is_empty());
    }

    #[test]
    fn test_bulk_ranks_by_score_and_respects_limit() {
        let policy = FixedPolicy::new(&[
            ("S1 - Band", 0.1),
            ("S2 - Band", 0.9),
            ("S3 - Band", 0.3),
            ("A1 - John Mayer", 0.7),
            ("Gravity - John Mayer", 0.2),
        ]);
        let mut recommender = engine(policy, deterministic());

        let picks = track_round(&mut recommender, 3, &[]);
        assert_eq!(ids(&picks), vec!["S2 - Band", "A1 - John Mayer", "S3 - Band"]);
        assert!(picks.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[test]
    fn test_bulk_pool_smaller_than_limit() {
        let mut recommender = engine(FixedPolicy::new(&[]), deterministic());
        let picks = track_round(&mut recommender, 10, &[]);
        assert_eq!(picks.len(), 5, "Pool of 5 caps the result, not the limit");
    }

    #[test]
    fn test_bulk_never_returns_excluded_ids() {
        for seed in 0..50 {
            let mut recommender = Recommender::with_config(
                Box::new(sample_catalogue()),
                Box::new(ThompsonSampling::with_seed(seed)),
                EngineConfig::default(),
                Some(seed),
            );
            let exclude = vec!["S1 - Band".to_string(), "A1 - John Mayer".to_string()];
            let picks = tag_round(&mut recommender, 10, &exclude);

            assert_eq!(picks.len(), 4);
            assert!(picks.iter().all(|pick| !exclude.contains(&pick.id)));
        }
    }

    #[test]
    fn test_bulk_all_excluded_is_empty() {
        let mut recommender = engine(FixedPolicy::new(&[]), deterministic());
        let exclude: Vec<String> = recommender
            .gather_candidates("Gravity", "John Mayer", None)
            .into_iter()
            .map(|c| c.id)
            .collect();

        let picks = track_round(&mut recommender, 10, &exclude);
        assert!(picks.is_empty());
        assert!(recommender.previous_selection().is_empty());
        assert_eq!(recommender.recent_rounds(), 0, "Empty rounds are not remembered");
    }

    #[test]
    fn test_tag_only_used_in_tag_mode() {
        let mut recommender = engine(FixedPolicy::new(&[]), deterministic());

        let track_mode = recommender.recommend_bulk(
            RecommendMode::Track,
            "Gravity",
            "John Mayer",
            Some("blues"),
            10,
            &[],
        );
        assert!(!ids(&track_mode).contains(&"T1 - Band"));

        let tag_mode = tag_round(&mut recommender, 10, &[]);
        assert!(ids(&tag_mode).contains(&"T1 - Band"));
    }

    #[test]
    fn test_recent_items_are_damped() {
        let mut recommender = engine(FixedPolicy::new(&[]), deterministic());

        let first = track_round(&mut recommender, 10, &[]);
        assert!(first.iter().all(|c| (c.score - 0.5).abs() < 1e-12));

        for _ in 0..2 {
            let next = track_round(&mut recommender, 10, &[]);
            for candidate in &next {
                assert!(recommender.is_recent(&candidate.id));
                assert!(
                    (candidate.score - 0.25).abs() < 1e-12,
                    "{} should be damped by half, got {}",
                    candidate.id,
                    candidate.score
                );
            }
        }
    }

    #[test]
    fn test_damping_demotes_previous_picks() {
        let policy = FixedPolicy::new(&[
            ("S1 - Band", 0.9),
            ("S2 - Band", 0.8),
            ("S3 - Band", 0.6),
            ("A1 - John Mayer", 0.55),
            ("Gravity - John Mayer", 0.1),
        ]);
        let mut recommender = engine(policy, deterministic());

        let first = track_round(&mut recommender, 2, &[]);
        assert_eq!(ids(&first), vec!["S1 - Band", "S2 - Band"]);

        let second = track_round(&mut recommender, 2, &[]);
        assert_eq!(ids(&second), vec!["S3 - Band", "A1 - John Mayer"]);
        let expected: HashSet<String> = ["S3 - Band", "A1 - John Mayer"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(recommender.previous_selection(), &expected);
    }

    #[test]
    fn test_recent_window_keeps_three_rounds() {
        let mut recommender = engine(FixedPolicy::new(&[]), deterministic());
        for _ in 0..5 {
            track_round(&mut recommender, 1, &[]);
        }
        assert_eq!(recommender.recent_rounds(), 3);

        let config = EngineConfig {
            recent_rounds: 1,
            ..deterministic()
        };
        let mut short_memory = engine(FixedPolicy::new(&[("S1 - Band", 0.9)]), config);
        track_round(&mut short_memory, 1, &[]);
        assert!(short_memory.is_recent("S1 - Band"));
        track_round(&mut short_memory, 1, &[]);
        assert!(!short_memory.is_recent("S1 - Band"), "Oldest round must be evicted");
    }

    #[test]
    fn test_exploration_round_samples_from_pool() {
        let config = EngineConfig {
            exploration_rate: 1.0,
            perturbation: 0.0,
            ..EngineConfig::default()
        };
        let mut recommender = engine(FixedPolicy::new(&[]), config);
        let pool: HashSet<String> = recommender
            .gather_candidates("Gravity", "John Mayer", None)
            .into_iter()
            .map(|c| c.id)
            .collect();

        let picks = track_round(&mut recommender, 3, &[]);
        assert_eq!(picks.len(), 3);
        let unique: HashSet<&str> = ids(&picks).into_iter().collect();
        assert_eq!(unique.len(), 3, "Sampling is without replacement");
        assert!(picks.iter().all(|pick| pool.contains(&pick.id)));
    }

    #[test]
    fn test_perturbation_stays_within_bounds() {
        let config = EngineConfig {
            exploration_rate: 0.0,
            ..EngineConfig::default()
        };
        let mut recommender = engine(FixedPolicy::new(&[]), config);
        let picks = track_round(&mut recommender, 10, &[]);
        assert!(picks.iter().all(|c| (0.3..=0.7).contains(&c.score)));
    }

    #[test]
    fn test_out_of_range_settings_are_clamped() {
        let config = EngineConfig {
            exploration_rate: f64::NAN,
            perturbation: 1e308,
            recency_damping: -3.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let mut recommender = engine(FixedPolicy::new(&[]), config);
        assert_eq!(recommender.config().perturbation, EngineConfig::MAX_PERTURBATION);
        assert_eq!(recommender.config().exploration_rate, 0.2);
        assert_eq!(recommender.config().recency_damping, 0.0);

        let picks = track_round(&mut recommender, 10, &[]);
        assert_eq!(picks.len(), 5);
        assert!(picks.iter().all(|c| (-0.5..=1.5).contains(&c.score)));
    }

    #[test]
    fn test_default_settings_validate() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(deterministic().validate().is_ok());
    }

    #[test]
    fn test_recommend_one() {
        let policy = FixedPolicy::new(&[("A1 - John Mayer", 0.99)]);
        let mut recommender = engine(policy, deterministic());
        let pick =
            recommender.recommend_one(RecommendMode::Track, "Gravity", "John Mayer", None, &[]);
        assert_eq!(pick.map(|c| c.id), Some("A1 - John Mayer".to_string()));

        let none = recommender.recommend_one(RecommendMode::Track, "Nothing", "Nobody", None, &[]);
        assert!(none.is_none());
    }

    #[test]
    fn test_personal_top_without_feedback_is_empty() {
        let mut recommender = engine(ThompsonSampling::with_seed(2), deterministic());
        assert!(recommender.recommend_personal_top(3).is_empty());

        recommender.give_feedback("Gravity - John Mayer", 0.0);
        assert!(recommender.recommend_personal_top(3).is_empty(), "Zero rewards give no favourite");
    }

    #[test]
    fn test_personal_top_seeds_from_favourite() {
        let policy = FixedPolicy::new(&[("S3 - Band", 0.95), ("S1 - Band", 0.2)]);
        let mut recommender = engine(policy, deterministic());
        recommender.give_feedback("Gravity - John Mayer", 1.0);
        recommender.give_feedback("Other - Someone", 0.2);

        let top = recommender.recommend_personal_top(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, "S3 - Band");
        assert_eq!(top[0].score, 0.95, "Personal top scores are not perturbed");
        assert_eq!(recommender.recent_rounds(), 0, "Personal top does not touch the window");
    }

    #[test]
    fn test_feedback_accumulates() {
        let mut recommender = engine(ThompsonSampling::with_seed(9), deterministic());
        recommender.give_feedback("S1 - Band", 1.0);
        recommender.give_feedback("S1 - Band", 1.0);
        recommender.give_feedback("S1 - Band", 0.0);

        let stats = recommender.policy().stats()["S1 - Band"];
        assert_eq!(stats.count, 3);
        assert!((stats.total_reward - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset_policy_discards_statistics() {
        let mut recommender = engine(ThompsonSampling::with_seed(9), deterministic());
        recommender.give_feedback("S1 - Band", 1.0);
        recommender.reset_policy(Box::new(ThompsonSampling::with_seed(10)));
        assert!(recommender.policy().stats().is_empty());
    }
}
