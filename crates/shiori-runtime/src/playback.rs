//! Resolver driver for the title detail view.
//!
//! Opening a title runs season/episode resolution against navigation
//! parameters, the continue-watching entry, and the title's season list,
//! then rewrites the parameters to the final pair. Selecting a season or
//! episode re-runs the relevant part of the resolution and records the new
//! position as in progress.

use tracing::{debug, warn};

use shiori_api::traits::{ListStore, MetadataProvider, TitleInfo, TitleKind};
use shiori_core::models::{Episode, MediaKind, ProgressDraft, Season, TitleDetails};
use shiori_core::resolver::{self, NavParams};

use crate::{Outcome, Tracker};

/// State for one open title detail view: the resolved position, the episode
/// list of the selected season, and the rewritten navigation parameters.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TitleView {
    pub details: TitleDetails,
    pub nav: NavParams,
    pub season: Option<u32>,
    pub episodes: Vec<Episode>,
    pub episode: Option<u32>,
}

impl<S: ListStore, M: MetadataProvider> Tracker<S, M> {
    /// Open a title's detail view and resolve the position to present.
    ///
    /// For a movie there is nothing to resolve. For a series, the resolved
    /// episode (if any) is immediately recorded as in progress with zero
    /// percent watched — opening an episode marks it before playback.
    pub async fn open_title(&self, kind: MediaKind, media_id: u64, nav: NavParams) -> TitleView {
        let details = match self.metadata.title_details(title_kind(kind), media_id).await {
            Ok(info) => title_details_from_info(kind, info),
            Err(e) => {
                warn!(media_id, error = %e, "metadata fetch failed, using partial data");
                TitleDetails {
                    media_id,
                    media_kind: kind,
                    title: String::new(),
                    poster_path: None,
                    seasons: Vec::new(),
                }
            }
        };

        let progress = self.mirror.read().await.progress_item(media_id).cloned();

        let resolved_season =
            resolver::resolve_season(&nav, progress.as_ref(), &details.seasons)
                .map(|s| s.season_number);
        let Some(season_number) = resolved_season else {
            // Single-unit title, or no season data survived a fetch failure.
            return TitleView {
                details,
                nav: NavParams::default(),
                season: None,
                episodes: Vec::new(),
                episode: None,
            };
        };

        let episodes = self.fetch_episodes(media_id, season_number).await;
        let episode = resolver::resolve_episode(&nav, progress.as_ref(), season_number, &episodes)
            .map(|e| e.episode_number);

        let view = TitleView {
            details,
            nav: NavParams::for_position(season_number, episode),
            season: Some(season_number),
            episodes,
            episode,
        };
        self.mark_in_progress(&view).await;
        view
    }

    /// Change the selected season. Episode resolution is re-run against the
    /// new season's list and the navigation parameters rewritten to the
    /// final pair.
    pub async fn select_season(&self, view: &mut TitleView, season_number: u32) {
        if !view
            .details
            .seasons
            .iter()
            .any(|s| s.season_number == season_number)
        {
            return;
        }

        // A season change drops any stale episode parameter before
        // resolution.
        let nav = NavParams::new(Some(season_number.to_string()), None);
        let progress = self
            .mirror
            .read()
            .await
            .progress_item(view.details.media_id)
            .cloned();

        let episodes = self
            .fetch_episodes(view.details.media_id, season_number)
            .await;
        let episode = resolver::resolve_episode(&nav, progress.as_ref(), season_number, &episodes)
            .map(|e| e.episode_number);

        view.season = Some(season_number);
        view.episodes = episodes;
        view.episode = episode;
        view.nav = NavParams::for_position(season_number, episode);
        self.mark_in_progress(view).await;
    }

    /// Select an episode within the current season.
    pub async fn select_episode(&self, view: &mut TitleView, episode_number: u32) {
        let Some(season_number) = view.season else {
            return;
        };
        if !view
            .episodes
            .iter()
            .any(|e| e.episode_number == episode_number)
        {
            return;
        }

        view.episode = Some(episode_number);
        view.nav = NavParams::for_position(season_number, Some(episode_number));
        self.mark_in_progress(view).await;
    }

    /// Step to the next episode in the selected season, if there is one.
    pub async fn next_episode(&self, view: &mut TitleView) {
        if let Some(n) = neighbor_episode(view, 1) {
            self.select_episode(view, n).await;
        }
    }

    /// Step to the previous episode in the selected season, if there is one.
    pub async fn previous_episode(&self, view: &mut TitleView) {
        if let Some(n) = neighbor_episode(view, -1) {
            self.select_episode(view, n).await;
        }
    }

    /// Record the viewed title as in progress from the start. For a movie
    /// this is the explicit "watch now" action; for a series it also fires
    /// on every season/episode selection.
    pub async fn start_watching(&self, view: &TitleView) -> Outcome {
        self.upsert_progress(ProgressDraft {
            media_id: view.details.media_id,
            title: view.details.title.clone(),
            poster_path: view.details.poster_path.clone(),
            media_kind: view.details.media_kind,
            progress_percent: 0,
            season: view.season,
            episode: view.episode,
        })
        .await
    }

    async fn mark_in_progress(&self, view: &TitleView) {
        if view.episode.is_none() {
            return;
        }
        let outcome = self.start_watching(view).await;
        if outcome != Outcome::Applied {
            debug!(
                media_id = view.details.media_id,
                ?outcome,
                "open-position upsert not applied"
            );
        }
    }

    async fn fetch_episodes(&self, media_id: u64, season_number: u32) -> Vec<Episode> {
        match self.metadata.season_episodes(media_id, season_number).await {
            Ok(episodes) => episodes
                .into_iter()
                .map(|e| Episode {
                    episode_number: e.episode_number,
                    name: e.name,
                })
                .collect(),
            Err(e) => {
                warn!(media_id, season_number, error = %e, "episode list fetch failed");
                Vec::new()
            }
        }
    }
}

fn neighbor_episode(view: &TitleView, offset: i64) -> Option<u32> {
    let current = view.episode?;
    let idx = view
        .episodes
        .iter()
        .position(|e| e.episode_number == current)?;
    let target = idx as i64 + offset;
    if target < 0 {
        return None;
    }
    view.episodes
        .get(target as usize)
        .map(|e| e.episode_number)
}

fn title_kind(kind: MediaKind) -> TitleKind {
    match kind {
        MediaKind::Movie => TitleKind::Movie,
        MediaKind::Series => TitleKind::Series,
    }
}

fn title_details_from_info(kind: MediaKind, info: TitleInfo) -> TitleDetails {
    TitleDetails {
        media_id: info.media_id,
        media_kind: kind,
        title: info.title,
        poster_path: info.poster_path,
        seasons: info
            .seasons
            .into_iter()
            .map(|s| Season {
                season_number: s.season_number,
                name: s.name,
                episode_count: s.episode_count,
            })
            .collect(),
    }
}
