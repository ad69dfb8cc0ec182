//! Season/episode resolution for multi-unit titles.
//!
//! When a title's detail view opens, three sources compete to decide which
//! season and episode to present: explicit navigation parameters, the
//! title's continue-watching entry, and the title's own season list. The
//! functions here apply the precedence order; the runtime drives them and
//! rewrites the navigation parameters to the final pair.

use serde::{Deserialize, Serialize};

use crate::models::{Episode, ProgressItem, Season};

/// The two string-valued query parameters read on entry and rewritten
/// whenever the resolved position changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavParams {
    pub season: Option<String>,
    pub episode: Option<String>,
}

impl NavParams {
    pub fn new(season: Option<String>, episode: Option<String>) -> Self {
        Self { season, episode }
    }

    /// Canonical parameters for a resolved position, so the final state is
    /// shareable and bookmarkable.
    pub fn for_position(season: u32, episode: Option<u32>) -> Self {
        Self {
            season: Some(season.to_string()),
            episode: episode.map(|e| e.to_string()),
        }
    }

    /// The season parameter, if present and numeric.
    pub fn season_number(&self) -> Option<u32> {
        self.season.as_deref().and_then(|s| s.parse().ok())
    }

    /// The episode parameter, if present and numeric.
    pub fn episode_number(&self) -> Option<u32> {
        self.episode.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Pick the season to present. First match wins:
/// navigation parameter, then the continue-watching entry, then the first
/// season numbered above 0 (skipping specials), then the first season at
/// all. Returns `None` only for an empty season list.
pub fn resolve_season<'a>(
    nav: &NavParams,
    progress: Option<&ProgressItem>,
    seasons: &'a [Season],
) -> Option<&'a Season> {
    if let Some(n) = nav.season_number() {
        if let Some(season) = seasons.iter().find(|s| s.season_number == n) {
            return Some(season);
        }
    }

    if let Some(n) = progress.and_then(|p| p.season) {
        if let Some(season) = seasons.iter().find(|s| s.season_number == n) {
            return Some(season);
        }
    }

    seasons
        .iter()
        .find(|s| s.season_number > 0)
        .or_else(|| seasons.first())
}

/// Pick the episode to present within an already-resolved season.
///
/// The navigation episode applies only when its paired season parameter
/// matches the resolved season; the continue-watching episode applies only
/// when its recorded season matches. Otherwise the first episode of the
/// season wins. Returns `None` only for an empty episode list.
pub fn resolve_episode<'a>(
    nav: &NavParams,
    progress: Option<&ProgressItem>,
    season_number: u32,
    episodes: &'a [Episode],
) -> Option<&'a Episode> {
    if nav.season_number() == Some(season_number) {
        if let Some(n) = nav.episode_number() {
            if let Some(episode) = episodes.iter().find(|e| e.episode_number == n) {
                return Some(episode);
            }
        }
    }

    if let Some(p) = progress {
        if p.season == Some(season_number) {
            if let Some(n) = p.episode {
                if let Some(episode) = episodes.iter().find(|e| e.episode_number == n) {
                    return Some(episode);
                }
            }
        }
    }

    episodes.first()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::MediaKind;

    fn seasons(numbers: &[u32]) -> Vec<Season> {
        numbers
            .iter()
            .map(|&n| Season {
                season_number: n,
                name: format!("Season {n}"),
                episode_count: 10,
            })
            .collect()
    }

    fn episodes(count: u32) -> Vec<Episode> {
        (1..=count)
            .map(|n| Episode {
                episode_number: n,
                name: format!("Episode {n}"),
            })
            .collect()
    }

    fn progress(season: Option<u32>, episode: Option<u32>) -> ProgressItem {
        ProgressItem {
            media_id: 1399,
            remote_id: None,
            title: "Game of Thrones".into(),
            poster_path: None,
            media_kind: MediaKind::Series,
            progress_percent: 50,
            last_watched_at: Utc::now(),
            season,
            episode,
        }
    }

    #[test]
    fn test_season_param_wins_over_progress() {
        let list = seasons(&[0, 1, 2, 3]);
        let nav = NavParams::new(Some("2".into()), None);
        let p = progress(Some(1), Some(5));

        let resolved = resolve_season(&nav, Some(&p), &list).unwrap();
        assert_eq!(resolved.season_number, 2);
    }

    #[test]
    fn test_progress_season_when_no_param() {
        let list = seasons(&[0, 1, 2, 3]);
        let p = progress(Some(3), None);

        let resolved = resolve_season(&NavParams::default(), Some(&p), &list).unwrap();
        assert_eq!(resolved.season_number, 3);
    }

    #[test]
    fn test_first_non_specials_season_as_fallback() {
        let list = seasons(&[0, 1, 2, 3]);
        let resolved = resolve_season(&NavParams::default(), None, &list).unwrap();
        assert_eq!(resolved.season_number, 1);
    }

    #[test]
    fn test_specials_only_show_resolves_to_season_zero() {
        let list = seasons(&[0]);
        let resolved = resolve_season(&NavParams::default(), None, &list).unwrap();
        assert_eq!(resolved.season_number, 0);
    }

    #[test]
    fn test_unknown_season_param_falls_through() {
        let list = seasons(&[1, 2]);
        let nav = NavParams::new(Some("9".into()), None);
        let p = progress(Some(2), None);

        let resolved = resolve_season(&nav, Some(&p), &list).unwrap();
        assert_eq!(resolved.season_number, 2);
    }

    #[test]
    fn test_empty_season_list() {
        assert!(resolve_season(&NavParams::default(), None, &[]).is_none());
    }

    #[test]
    fn test_episode_param_requires_matching_season_param() {
        let eps = episodes(10);

        // Paired season matches the resolved season: param applies.
        let nav = NavParams::new(Some("2".into()), Some("4".into()));
        let resolved = resolve_episode(&nav, None, 2, &eps).unwrap();
        assert_eq!(resolved.episode_number, 4);

        // Episode param without a season param is ignored.
        let nav = NavParams::new(None, Some("4".into()));
        let resolved = resolve_episode(&nav, None, 2, &eps).unwrap();
        assert_eq!(resolved.episode_number, 1);
    }

    #[test]
    fn test_progress_episode_invalidated_by_season_mismatch() {
        let eps = episodes(10);
        let p = progress(Some(1), Some(5));

        // Resolved season is 2; the recorded episode was for season 1.
        let resolved = resolve_episode(&NavParams::default(), Some(&p), 2, &eps).unwrap();
        assert_eq!(resolved.episode_number, 1);

        // With the seasons matching, the recorded episode applies.
        let resolved = resolve_episode(&NavParams::default(), Some(&p), 1, &eps).unwrap();
        assert_eq!(resolved.episode_number, 5);
    }

    #[test]
    fn test_episode_param_beats_progress() {
        let eps = episodes(10);
        let nav = NavParams::new(Some("1".into()), Some("7".into()));
        let p = progress(Some(1), Some(5));

        let resolved = resolve_episode(&nav, Some(&p), 1, &eps).unwrap();
        assert_eq!(resolved.episode_number, 7);
    }

    #[test]
    fn test_nav_params_rewrite() {
        let params = NavParams::for_position(2, Some(4));
        assert_eq!(params.season.as_deref(), Some("2"));
        assert_eq!(params.episode.as_deref(), Some("4"));
        assert_eq!(params.season_number(), Some(2));
        assert_eq!(params.episode_number(), Some(4));
    }

    #[test]
    fn test_non_numeric_params_ignored() {
        let nav = NavParams::new(Some("finale".into()), Some("last".into()));
        let list = seasons(&[0, 1]);
        let resolved = resolve_season(&nav, None, &list).unwrap();
        assert_eq!(resolved.season_number, 1);
    }
}
