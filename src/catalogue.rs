//! # Catalogue Module
//!
//! The external source of candidate tracks. The recommendation engine only
//! talks to the [`Catalogue`] trait, which has three lookups:
//!
//! - tracks similar to a seed track
//! - an artist's top tracks
//! - a tag's (genre's) top tracks
//!
//! Each returns `{name, artist: {name}}` records in rank order, possibly fewer
//! than requested.
//!
//! Two implementations ship with the crate:
//!
//! - [`LastFmClient`] - blocking HTTP client for the Last.fm web API
//! - [`MemoryCatalogue`] - in-memory data, optionally loaded from a JSON file,
//!   for offline use and tests

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default Last.fm API endpoint.
pub const LASTFM_BASE_URL: &str = "http://ws.audioscrobbler.com/2.0/";

/// Artist reference inside a catalogue record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

/// One track as returned by the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueTrack {
    pub name: String,
    pub artist: ArtistRef,
}

impl CatalogueTrack {
    #[must_use]
    pub fn new(name: &str, artist: &str) -> Self {
        Self {
            name: name.to_string(),
            artist: ArtistRef {
                name: artist.to_string(),
            },
        }
    }
}

/// Track lookup capability consumed by the recommender.
///
/// # Errors
///
/// Implementations return an error when the lookup itself fails (network,
/// malformed response). "Nothing found" is an empty list, not an error.
pub trait Catalogue: Send {
    fn similar_tracks(
        &self,
        track: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<CatalogueTrack>>;

    fn artist_top_tracks(&self, artist: &str, limit: usize) -> Result<Vec<CatalogueTrack>>;

    fn tag_top_tracks(&self, tag: &str, limit: usize) -> Result<Vec<CatalogueTrack>>;
}

impl<C: Catalogue + Sync + ?Sized> Catalogue for std::sync::Arc<C> {
    fn similar_tracks(
        &self,
        track: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<CatalogueTrack>> {
        (**self).similar_tracks(track, artist, limit)
    }

    fn artist_top_tracks(&self, artist: &str, limit: usize) -> Result<Vec<CatalogueTrack>> {
        (**self).artist_top_tracks(artist, limit)
    }

    fn tag_top_tracks(&self, tag: &str, limit: usize) -> Result<Vec<CatalogueTrack>> {
        (**self).tag_top_tracks(tag, limit)
    }
}

/// Blocking client for the Last.fm web API.
///
/// One request per lookup, with the configured timeout and no retries.
pub struct LastFmClient {
    api_key: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl LastFmClient {
    /// Build a client for `base_url` (usually [`LASTFM_BASE_URL`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(api_key: &str, base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .user_agent(concat!("encore/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build Last.fm HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            client,
        })
    }

    fn request(&self, method: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut query: Vec<(&str, &str)> = vec![
            ("method", method),
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
        ];
        query.extend_from_slice(params);

        debug!("Last.fm {method} {params:?}");
        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .with_context(|| format!("Last.fm request {method} failed"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Last.fm {method} returned HTTP {status}");
        }

        response
            .text()
            .with_context(|| format!("Failed to read Last.fm {method} response body"))
    }
}

impl Catalogue for LastFmClient {
    fn similar_tracks(
        &self,
        track: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<CatalogueTrack>> {
        let limit = limit.to_string();
        let body = self.request(
            "track.getSimilar",
            &[("track", track), ("artist", artist), ("limit", &limit)],
        )?;
        parse_tracks(&body, "similartracks")
    }

    fn artist_top_tracks(&self, artist: &str, limit: usize) -> Result<Vec<CatalogueTrack>> {
        let limit = limit.to_string();
        let body = self.request("artist.getTopTracks", &[("artist", artist), ("limit", &limit)])?;
        parse_tracks(&body, "toptracks")
    }

    fn tag_top_tracks(&self, tag: &str, limit: usize) -> Result<Vec<CatalogueTrack>> {
        let limit = limit.to_string();
        let body = self.request("tag.getTopTracks", &[("tag", tag), ("limit", &limit)])?;
        parse_tracks(&body, "tracks")
    }
}

#[derive(Debug, Default, Deserialize)]
struct TrackSection {
    #[serde(default)]
    track: Vec<CatalogueTrack>,
}

/// Extract `<section>.track` from a Last.fm JSON body.
///
/// A missing section (Last.fm reports "not found" as an `{"error": .., "message": ..}`
/// payload) yields an empty list.
///
/// # Errors
///
/// Returns an error if `body` is not valid JSON or the track records are malformed.
pub fn parse_tracks(body: &str, section: &str) -> Result<Vec<CatalogueTrack>> {
    let mut root: HashMap<String, serde_json::Value> =
        serde_json::from_str(body).context("Last.fm response is not a JSON object")?;

    if let Some(message) = root.get("message").and_then(serde_json::Value::as_str) {
        debug!("Last.fm reported: {message}");
    }

    match root.remove(section) {
        Some(value) => {
            let section: TrackSection = serde_json::from_value(value)
                .with_context(|| format!("Malformed `{section}` section in Last.fm response"))?;
            Ok(section.track)
        }
        None => Ok(Vec::new()),
    }
}

/// In-memory catalogue keyed by seed.
///
/// Lookup keys are case-insensitive. Results are truncated to the requested
/// limit.
///
/// # Examples
///
/// ```
/// use encore::catalogue::{Catalogue, CatalogueTrack, MemoryCatalogue};
///
/// let mut catalogue = MemoryCatalogue::default();
/// let tracks = vec![CatalogueTrack::new("Slow Dancing", "John Mayer")];
/// catalogue.add_similar("Gravity", "John Mayer", tracks);
///
/// let tracks = catalogue.similar_tracks("gravity", "john mayer", 10)?;
/// assert_eq!(tracks.len(), 1);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCatalogue {
    #[serde(default)]
    similar: HashMap<String, Vec<CatalogueTrack>>,
    #[serde(default)]
    artists: HashMap<String, Vec<CatalogueTrack>>,
    #[serde(default)]
    tags: HashMap<String, Vec<CatalogueTrack>>,
}

impl MemoryCatalogue {
    /// Load a catalogue fixture written as JSON:
    ///
    /// ```json
    /// {
    ///   "similar": { "gravity - john mayer": [{"name": "..", "artist": {"name": ".."}}] },
    ///   "artists": { "john mayer": [] },
    ///   "tags": { "blues": [] }
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalogue file {}", path.display()))?;
        let parsed: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid catalogue file {}", path.display()))?;

        // Normalise keys so hand-written fixtures match case-insensitively.
        Ok(Self {
            similar: lowercase_keys(parsed.similar),
            artists: lowercase_keys(parsed.artists),
            tags: lowercase_keys(parsed.tags),
        })
    }

    pub fn add_similar(&mut self, track: &str, artist: &str, tracks: Vec<CatalogueTrack>) {
        self.similar.insert(similar_key(track, artist), tracks);
    }

    pub fn add_artist(&mut self, artist: &str, tracks: Vec<CatalogueTrack>) {
        self.artists.insert(artist.trim().to_lowercase(), tracks);
    }

    pub fn add_tag(&mut self, tag: &str, tracks: Vec<CatalogueTrack>) {
        self.tags.insert(tag.trim().to_lowercase(), tracks);
    }

    fn lookup(
        map: &HashMap<String, Vec<CatalogueTrack>>,
        key: &str,
        limit: usize,
    ) -> Vec<CatalogueTrack> {
        map.get(key)
            .map(|tracks| tracks.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

fn similar_key(track: &str, artist: &str) -> String {
    format!("{} - {}", track.trim(), artist.trim()).to_lowercase()
}

fn lowercase_keys(
    map: HashMap<String, Vec<CatalogueTrack>>,
) -> HashMap<String, Vec<CatalogueTrack>> {
    map.into_iter().map(|(key, tracks)| (key.trim().to_lowercase(), tracks)).collect()
}

impl Catalogue for MemoryCatalogue {
    fn similar_tracks(
        &self,
        track: &str,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<CatalogueTrack>> {
        Ok(Self::lookup(&self.similar, &similar_key(track, artist), limit))
    }

    fn artist_top_tracks(&self, artist: &str, limit: usize) -> Result<Vec<CatalogueTrack>> {
        Ok(Self::lookup(&self.artists, &artist.trim().to_lowercase(), limit))
    }

    fn tag_top_tracks(&self, tag: &str, limit: usize) -> Result<Vec<CatalogueTrack>> {
        Ok(Self::lookup(&self.tags, &tag.trim().to_lowercase(), limit))
    }
}
