use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::saved::MediaKind;

/// Upper bound on the continue-watching collection. Inserting beyond this
/// evicts the entry with the oldest `last_watched_at`.
pub const CONTINUE_WATCHING_CAP: usize = 20;

/// A user's continue-watching entry, recording the last playback position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressItem {
    pub media_id: u64,
    /// Row id assigned by the persistence service; `None` until first sync.
    pub remote_id: Option<String>,
    pub title: String,
    pub poster_path: Option<String>,
    pub media_kind: MediaKind,
    /// Percentage watched, 0–100.
    pub progress_percent: u8,
    pub last_watched_at: DateTime<Utc>,
    /// Series only.
    pub season: Option<u32>,
    /// Series only.
    pub episode: Option<u32>,
}

/// Caller-supplied fields for a continue-watching upsert. The manager sets
/// `last_watched_at` to the call time.
#[derive(Debug, Clone)]
pub struct ProgressDraft {
    pub media_id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub media_kind: MediaKind,
    pub progress_percent: u8,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}
