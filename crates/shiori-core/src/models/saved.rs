use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a tracked title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(Self::Movie),
            "series" => Some(Self::Series),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's watchlist entry for a single title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedItem {
    /// Stable external identifier, shared with the metadata provider.
    pub media_id: u64,
    /// Row id assigned by the persistence service; `None` until first sync.
    pub remote_id: Option<String>,
    pub title: String,
    pub poster_path: Option<String>,
    pub media_kind: MediaKind,
    pub added_at: DateTime<Utc>,
    pub watched: bool,
    pub watch_later: bool,
    /// User rating, 0–10.
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

/// Caller-supplied fields for a new watchlist entry. The manager fills in
/// `added_at` and the initial flags.
#[derive(Debug, Clone)]
pub struct SavedDraft {
    pub media_id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub media_kind: MediaKind,
}
