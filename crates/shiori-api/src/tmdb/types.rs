use serde::Deserialize;

use crate::traits::{EpisodeInfo, SeasonInfo, TitleInfo};

/// `/movie/{id}` response, reduced to the fields the core consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f32>,
}

impl MovieDetails {
    pub fn into_title_info(self) -> TitleInfo {
        TitleInfo {
            media_id: self.id,
            title: self.title,
            poster_path: self.poster_path,
            release_date: self.release_date,
            vote_average: self.vote_average,
            seasons: Vec::new(),
        }
    }
}

/// `/tv/{id}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TvDetails {
    pub id: u64,
    pub name: String,
    pub poster_path: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: Option<f32>,
    #[serde(default)]
    pub seasons: Vec<TvSeason>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvSeason {
    pub season_number: u32,
    pub name: Option<String>,
    #[serde(default)]
    pub episode_count: u32,
}

impl TvDetails {
    pub fn into_title_info(self) -> TitleInfo {
        TitleInfo {
            media_id: self.id,
            title: self.name,
            poster_path: self.poster_path,
            release_date: self.first_air_date,
            vote_average: self.vote_average,
            seasons: self
                .seasons
                .into_iter()
                .map(|s| SeasonInfo {
                    name: s
                        .name
                        .unwrap_or_else(|| format!("Season {}", s.season_number)),
                    season_number: s.season_number,
                    episode_count: s.episode_count,
                })
                .collect(),
        }
    }
}

/// `/tv/{id}/season/{n}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SeasonDetails {
    #[serde(default)]
    pub episodes: Vec<TvEpisode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvEpisode {
    pub episode_number: u32,
    pub name: Option<String>,
}

impl TvEpisode {
    pub fn into_episode_info(self) -> EpisodeInfo {
        EpisodeInfo {
            name: self
                .name
                .unwrap_or_else(|| format!("Episode {}", self.episode_number)),
            episode_number: self.episode_number,
        }
    }
}
