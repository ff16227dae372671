//! # Listener Sessions
//!
//! Per-listener state for a long-running front end. Each listener gets their
//! own [`Recommender`] (and therefore their own policy statistics) plus six
//! rating playlists, so learning never leaks between listeners.
//!
//! ## Lifecycle
//!
//! - **Created** on first use through a factory closure
//! - **Touched** on every access (`last_active`)
//! - **Reset** by rebuilding the recommender, which discards learned
//!   statistics but keeps playlists
//! - **Evicted** by [`SessionRegistry::evict_idle`] once idle longer than the
//!   configured timeout
//!
//! The registry itself is not synchronised. Wrap it in [`SharedSessions`]
//! when several threads serve requests; the single lock also serialises all
//! policy updates.

use crate::bandit::Bandit;
use crate::catalogue::Catalogue;
use crate::config::Config;
use crate::recommender::{split_item_id, Candidate, RecommendMode, Recommender};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Highest star rating a listener can give.
pub const MAX_RATING: f64 = 5.0;

/// One playlist per whole star, `0..=5`.
pub const RATING_BUCKETS: usize = 6;

/// Registry shared between request handlers.
pub type SharedSessions = Arc<Mutex<SessionRegistry>>;

/// Builds a fresh recommender for a new or reset session.
pub type RecommenderFactory = Box<dyn Fn() -> Recommender + Send>;

/// Convert a star rating into a bandit reward in `[0, 1]`.
///
/// Ratings above [`MAX_RATING`] are capped; non-positive (or NaN) ratings
/// count as no reward.
///
/// ```
/// use encore::session::rating_to_reward;
///
/// assert_eq!(rating_to_reward(4.0), 0.8);
/// assert_eq!(rating_to_reward(0.0), 0.0);
/// assert_eq!(rating_to_reward(9.0), 1.0);
/// ```
#[must_use]
pub fn rating_to_reward(rating: f64) -> f64 {
    if rating > 0.0 {
        rating.min(MAX_RATING) / MAX_RATING
    } else {
        0.0
    }
}

/// Playlist bucket a rating is filed under (whole stars, truncated:
/// 3.5 stars lands in bucket 3).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rating_bucket(rating: f64) -> usize {
    if rating > 0.0 {
        rating.min(MAX_RATING) as usize
    } else {
        0
    }
}

/// A track filed into a rating playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub rating: f64,
}

/// Six playlists holding rated tracks, one per whole star.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatingPlaylists {
    buckets: [Vec<RatedTrack>; RATING_BUCKETS],
}

impl RatingPlaylists {
    /// Add `track` to `bucket`. Returns `false` if the bucket does not exist
    /// or already holds a track with the same id.
    pub fn add(&mut self, bucket: usize, track: RatedTrack) -> bool {
        let Some(playlist) = self.buckets.get_mut(bucket) else {
            return false;
        };
        if playlist.iter().any(|existing| existing.id == track.id) {
            return false;
        }
        playlist.push(track);
        true
    }

    /// Remove the track with `id` from `bucket`. Returns whether anything was removed.
    pub fn remove(&mut self, bucket: usize, id: &str) -> bool {
        let Some(playlist) = self.buckets.get_mut(bucket) else {
            return false;
        };
        let before = playlist.len();
        playlist.retain(|track| track.id != id);
        playlist.len() < before
    }

    #[must_use]
    pub fn bucket(&self, bucket: usize) -> Option<&[RatedTrack]> {
        self.buckets.get(bucket).map(Vec::as_slice)
    }

    /// `(stars, tracks)` for every bucket, lowest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &[RatedTrack])> {
        self.buckets.iter().map(Vec::as_slice).enumerate()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the service keeps for one listener.
pub struct UserSession {
    pub recommender: Recommender,
    pub playlists: RatingPlaylists,
    pub created_at: Instant,
    pub last_active: Instant,
}

impl UserSession {
    fn new(recommender: Recommender) -> Self {
        let now = Instant::now();
        Self {
            recommender,
            playlists: RatingPlaylists::default(),
            created_at: now,
            last_active: now,
        }
    }

    /// Apply a star rating for `item_id`: reward the policy and file the
    /// track into the matching playlist.
    pub fn rate(&mut self, item_id: &str, rating: f64) -> f64 {
        let reward = rating_to_reward(rating);
        self.recommender.give_feedback(item_id, reward);

        if let Some((name, artist)) = split_item_id(item_id) {
            let track = RatedTrack {
                id: item_id.to_string(),
                name: name.to_string(),
                artist: artist.to_string(),
                rating,
            };
            if !self.playlists.add(rating_bucket(rating), track) {
                debug!("{item_id} already filed under {} stars", rating_bucket(rating));
            }
        }
        reward
    }

    /// Time since the session was created, as of `now`.
    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

/// Listener id → session map with idle eviction.
pub struct SessionRegistry {
    sessions: HashMap<String, UserSession>,
    factory: RecommenderFactory,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration, factory: impl Fn() -> Recommender + Send + 'static) -> Self {
        Self {
            sessions: HashMap::new(),
            factory: Box::new(factory),
            idle_timeout,
        }
    }

    /// Registry whose sessions share one catalogue and are built with the
    /// configured policy and engine tuning.
    pub fn from_config<C>(config: &Config, catalogue: Arc<C>) -> Self
    where
        C: Catalogue + Sync + ?Sized + 'static,
    {
        let engine = config.engine.clone();
        let policy = config.policy;
        let epsilon = config.epsilon;
        let seed = config.seed;

        Self::new(Duration::from_secs(config.session_timeout_secs), move || {
            let bandit: Box<dyn Bandit> = policy.build(epsilon, seed);
            Recommender::with_config(
                Box::new(Arc::clone(&catalogue)),
                bandit,
                engine.clone(),
                seed.map(|seed| seed.wrapping_add(1)),
            )
        })
    }

    #[must_use]
    pub fn shared(self) -> SharedSessions {
        Arc::new(Mutex::new(self))
    }

    /// Session for `user_id`, created on first use. Marks it active.
    pub fn get_or_create(&mut self, user_id: &str) -> &mut UserSession {
        let factory = &self.factory;
        let session = self.sessions.entry(user_id.to_string()).or_insert_with(|| {
            info!("Created new session for {user_id}");
            UserSession::new(factory())
        });
        session.last_active = Instant::now();
        session
    }

    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<&UserSession> {
        self.sessions.get(user_id)
    }

    /// Recommend for `user_id` from a track seed.
    pub fn recommend(
        &mut self,
        user_id: &str,
        track: &str,
        artist: &str,
        limit: usize,
        exclude_ids: &[String],
    ) -> Vec<Candidate> {
        self.get_or_create(user_id)
            .recommender
            .recommend_bulk(RecommendMode::Track, track, artist, None, limit, exclude_ids)
    }

    /// Record a star rating from `user_id`. Returns the reward fed to the policy.
    pub fn rate(&mut self, user_id: &str, item_id: &str, rating: f64) -> f64 {
        let reward = self.get_or_create(user_id).rate(item_id, rating);
        info!("{user_id} rated {item_id} {rating} (reward {reward:.2})");
        reward
    }

    /// Rebuild `user_id`'s recommender, discarding learned statistics and the
    /// recency window. Playlists are kept.
    pub fn reset(&mut self, user_id: &str) {
        let fresh = (self.factory)();
        self.get_or_create(user_id).recommender = fresh;
        info!("Reset bandit state for {user_id}");
    }

    /// Drop sessions idle for longer than the timeout as of `now`.
    /// Returns the evicted listener ids.
    pub fn evict_idle(&mut self, now: Instant) -> Vec<String> {
        let timeout = self.idle_timeout;
        let idle: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, session)| now.saturating_duration_since(session.last_active) > timeout)
            .map(|(user_id, _)| user_id.clone())
            .collect();

        for user_id in &idle {
            if let Some(session) = self.sessions.remove(user_id) {
                info!(
                    "Evicted idle session for {user_id} ({} ratings, age {:?})",
                    session.playlists.len(),
                    session.age(now)
                );
            }
        }
        idle
    }

    #[must_use]
    pub fn contains(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
