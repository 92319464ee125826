//! Process-local cache of successful resolutions
//!
//! Entries live for thirty minutes and are evicted lazily when a lookup
//! finds them stale.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::models::{ContentType, LanguagePreference, Stream, StreamRequest};

/// Lifetime of a cached stream
pub const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Identity of a resolution: what was asked for and in which language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub content_type: ContentType,
    pub id: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub language: LanguagePreference,
}

impl CacheKey {
    /// Build the key for a validated request
    pub fn new(request: &StreamRequest, language: LanguagePreference) -> Self {
        let (season, episode) = match request.content_type {
            ContentType::Series => (request.season, request.episode),
            ContentType::Movie => (None, None),
        };

        Self {
            content_type: request.content_type,
            id: request.title_id.primary().unwrap_or_default().to_string(),
            season,
            episode,
            language,
        }
    }
}

/// `series:tt0903747:1:2:pt-BR`, `movie:tt0133093:original`
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.id)?;
        if let (Some(s), Some(e)) = (self.season, self.episode) {
            write!(f, ":{}:{}", s, e)?;
        }
        write!(f, ":{}", self.language)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    stream: Stream,
    cached_at: Instant,
}

/// TTL cache keyed by [`CacheKey`]
#[derive(Debug)]
pub struct StreamCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl Default for StreamCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamCache {
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Fresh entry for `key`; a stale one is removed and reported as absent
    pub fn get(&self, key: &CacheKey) -> Option<Stream> {
        let mut entries = self.lock();
        let fresh = entries.get(key)?.cached_at.elapsed() < self.ttl;

        if fresh {
            entries.get(key).map(|e| e.stream.clone())
        } else {
            entries.remove(key);
            tracing::debug!(key = %key, "evicted stale cache entry");
            None
        }
    }

    pub fn insert(&self, key: CacheKey, stream: Stream) {
        self.lock().insert(
            key,
            CacheEntry {
                stream,
                cached_at: Instant::now(),
            },
        );
    }

    /// Remove every entry, or only those whose key text contains `pattern`.
    /// Returns how many entries were dropped.
    pub fn clear(&self, pattern: Option<&str>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();

        match pattern {
            Some(pattern) => entries.retain(|key, _| !key.to_string().contains(pattern)),
            None => entries.clear(),
        }

        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
