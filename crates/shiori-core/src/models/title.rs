use serde::{Deserialize, Serialize};

use super::saved::MediaKind;

/// Title details as the resolver consumes them. The api crate owns the
/// richer wire types; the runtime maps them down to these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleDetails {
    pub media_id: u64,
    pub media_kind: MediaKind,
    pub title: String,
    pub poster_path: Option<String>,
    /// Empty for movies.
    pub seasons: Vec<Season>,
}

/// A season summary from the title listing. Season 0 is the provider's
/// "specials" bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub season_number: u32,
    pub name: String,
    pub episode_count: u32,
}

/// A single episode within a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub episode_number: u32,
    pub name: String,
}
