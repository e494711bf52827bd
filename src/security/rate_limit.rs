//! Per-client rate limiting with a sliding window.
//!
//! Each identifier gets one JSON file holding the Unix-second timestamps of
//! its accepted requests. Reads and writes are not locked across processes;
//! concurrent checks for one identifier may lose an update.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::core::Result;

/// Result of a rate limit check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is allowed.
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u64,
    /// Seconds until the oldest recorded request leaves the window.
    pub reset_after: u64,
}

/// File-backed sliding window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    storage_dir: PathBuf,
    limit: u64,
    window_secs: u64,
    cleanup_percent: u8,
}

impl RateLimiter {
    /// Create a limiter, creating the storage directory if needed.
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        fs::create_dir_all(&config.storage_dir)?;
        Ok(Self {
            storage_dir: config.storage_dir,
            limit: config.max_requests,
            window_secs: config.window_secs,
            cleanup_percent: config.cleanup_percent,
        })
    }

    /// Get the rate limit value.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Get the window duration in seconds.
    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Record a request for `identifier` if the window has room.
    pub fn check(&self, identifier: &str) -> Result<RateLimitResult> {
        self.maybe_cleanup(unix_now());
        self.check_at(identifier, unix_now())
    }

    /// [`RateLimiter::check`] with an explicit clock and no cleanup.
    pub fn check_at(&self, identifier: &str, now: u64) -> Result<RateLimitResult> {
        let path = self.record_path(identifier);
        let mut requests = self.live_requests(&path, now);

        if requests.len() as u64 >= self.limit {
            return Ok(RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_after: self.reset_after(&requests, now).max(1),
            });
        }

        requests.push(now);
        fs::write(&path, serde_json::to_vec(&requests)?)?;

        Ok(RateLimitResult {
            allowed: true,
            remaining: self.limit - requests.len() as u64,
            reset_after: self.reset_after(&requests, now),
        })
    }

    /// Whether a request from `identifier` is allowed; records it if so.
    pub fn is_allowed(&self, identifier: &str) -> Result<bool> {
        Ok(self.check(identifier)?.allowed)
    }

    pub fn is_allowed_at(&self, identifier: &str, now: u64) -> Result<bool> {
        Ok(self.check_at(identifier, now)?.allowed)
    }

    /// Requests left for `identifier` in the current window.
    pub fn remaining(&self, identifier: &str) -> u64 {
        self.remaining_at(identifier, unix_now())
    }

    pub fn remaining_at(&self, identifier: &str, now: u64) -> u64 {
        let live = self.live_requests(&self.record_path(identifier), now);
        self.limit.saturating_sub(live.len() as u64)
    }

    /// Seconds until the oldest stored request expires, 0 when none.
    pub fn seconds_until_reset(&self, identifier: &str) -> u64 {
        self.seconds_until_reset_at(identifier, unix_now())
    }

    pub fn seconds_until_reset_at(&self, identifier: &str, now: u64) -> u64 {
        let stored = read_record(&self.record_path(identifier));
        self.reset_after(&stored, now)
    }

    /// Delete records untouched for two windows. Returns how many went.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(unix_now())
    }

    pub fn cleanup_at(&self, now: u64) -> usize {
        let cutoff = now.saturating_sub(self.window_secs.saturating_mul(2));
        let entries = match fs::read_dir(&self.storage_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.storage_dir.display(), error = %e, "rate limit cleanup failed");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(t) => to_unix(t),
                Err(_) => continue,
            };
            if modified < cutoff && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, "stale rate limit records removed");
        }
        removed
    }

    fn maybe_cleanup(&self, now: u64) {
        if self.cleanup_percent == 0 {
            return;
        }
        if rand::thread_rng().gen_range(1..=100u8) <= self.cleanup_percent {
            self.cleanup_at(now);
        }
    }

    fn record_path(&self, identifier: &str) -> PathBuf {
        let digest = Sha256::digest(identifier.as_bytes());
        self.storage_dir.join(format!("{}.json", hex::encode(digest)))
    }

    fn live_requests(&self, path: &Path, now: u64) -> Vec<u64> {
        let cutoff = now.saturating_sub(self.window_secs);
        let mut requests = read_record(path);
        requests.retain(|&t| t > cutoff);
        requests
    }

    fn reset_after(&self, requests: &[u64], now: u64) -> u64 {
        requests
            .iter()
            .min()
            .map(|oldest| (oldest + self.window_secs).saturating_sub(now))
            .unwrap_or(0)
    }
}

/// Stored timestamps; a missing or corrupt record reads as empty.
fn read_record(path: &Path) -> Vec<u64> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable rate limit record");
            Vec::new()
        }
    }
}

fn to_unix(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

fn unix_now() -> u64 {
    to_unix(SystemTime::now())
}
