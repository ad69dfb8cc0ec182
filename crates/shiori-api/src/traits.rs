//! Trait definitions for the external services the tracking core consumes.
//!
//! The concrete clients (TMDB metadata, the userdata row store) implement
//! these traits, allowing the runtime and its tests to be service-agnostic.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of title as the metadata provider distinguishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleKind {
    Movie,
    Series,
}

/// Read-only access to title metadata.
pub trait MetadataProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch details for a single title. For a series this includes the
    /// season summaries; for a movie `seasons` is empty.
    fn title_details(
        &self,
        kind: TitleKind,
        media_id: u64,
    ) -> impl Future<Output = Result<TitleInfo, Self::Error>> + Send;

    /// Fetch the episode list for one season of a series.
    fn season_episodes(
        &self,
        media_id: u64,
        season_number: u32,
    ) -> impl Future<Output = Result<Vec<EpisodeInfo>, Self::Error>> + Send;
}

/// Row-level CRUD over the per-user `saved_items` and `progress_items`
/// tables. Rows are scoped by the authenticated user and unique on
/// (`user`, `media_id`); the store assigns the opaque row ids.
pub trait ListStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_saved(
        &self,
        auth: &StoreAuth,
    ) -> impl Future<Output = Result<Vec<SavedRow>, Self::Error>> + Send;

    /// Fetch the user's progress rows, ordered by `last_watched_at`
    /// descending.
    fn fetch_progress(
        &self,
        auth: &StoreAuth,
    ) -> impl Future<Output = Result<Vec<ProgressRow>, Self::Error>> + Send;

    fn find_saved(
        &self,
        auth: &StoreAuth,
        media_id: u64,
    ) -> impl Future<Output = Result<Option<SavedRow>, Self::Error>> + Send;

    fn find_progress(
        &self,
        auth: &StoreAuth,
        media_id: u64,
    ) -> impl Future<Output = Result<Option<ProgressRow>, Self::Error>> + Send;

    /// Insert a row and return it as stored, including the assigned id.
    fn insert_saved(
        &self,
        auth: &StoreAuth,
        row: &NewSavedRow,
    ) -> impl Future<Output = Result<SavedRow, Self::Error>> + Send;

    fn update_saved(
        &self,
        auth: &StoreAuth,
        row_id: &str,
        patch: &SavedPatch,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn delete_saved(
        &self,
        auth: &StoreAuth,
        row_id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn insert_progress(
        &self,
        auth: &StoreAuth,
        row: &NewProgressRow,
    ) -> impl Future<Output = Result<ProgressRow, Self::Error>> + Send;

    fn update_progress(
        &self,
        auth: &StoreAuth,
        row_id: &str,
        patch: &ProgressPatch,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn delete_progress(
        &self,
        auth: &StoreAuth,
        row_id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Per-user scope and credentials for row operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAuth {
    pub user_id: String,
    pub access_token: String,
}

/// Title details from the metadata provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleInfo {
    pub media_id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f32>,
    /// Empty for movies.
    pub seasons: Vec<SeasonInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonInfo {
    pub season_number: u32,
    pub name: String,
    pub episode_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub episode_number: u32,
    pub name: String,
}

/// A `saved_items` row as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRow {
    pub id: String,
    pub media_id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub media_kind: String,
    pub added_at: DateTime<Utc>,
    pub watched: bool,
    pub watch_later: bool,
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

/// Payload for a new `saved_items` row; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSavedRow {
    pub media_id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub media_kind: String,
    pub added_at: DateTime<Utc>,
    pub watched: bool,
    pub watch_later: bool,
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

/// Partial update for a `saved_items` row — only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_later: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A `progress_items` row as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRow {
    pub id: String,
    pub media_id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub media_kind: String,
    pub progress_percent: u8,
    pub last_watched_at: DateTime<Utc>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

/// Payload for a new `progress_items` row; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProgressRow {
    pub media_id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub media_kind: String,
    pub progress_percent: u8,
    pub last_watched_at: DateTime<Utc>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

/// Partial update for a `progress_items` row — only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_watched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
}
