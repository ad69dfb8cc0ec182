use reqwest::Client;

use super::error::TmdbError;
use super::types::{MovieDetails, SeasonDetails, TvDetails};
use crate::traits::{EpisodeInfo, MetadataProvider, TitleInfo, TitleKind};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB REST metadata client.
pub struct TmdbClient {
    base_url: String,
    api_key: String,
    language: String,
    http: Client,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            language: "en-US".into(),
            http: Client::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, TmdbError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(TmdbError::Api {
                status,
                message: body,
            })
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, TmdbError> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        resp.json().await.map_err(|e| TmdbError::Parse(e.to_string()))
    }
}

impl MetadataProvider for TmdbClient {
    type Error = TmdbError;

    async fn title_details(&self, kind: TitleKind, media_id: u64) -> Result<TitleInfo, TmdbError> {
        match kind {
            TitleKind::Movie => {
                let details: MovieDetails = self.get_json(&format!("/movie/{media_id}")).await?;
                Ok(details.into_title_info())
            }
            TitleKind::Series => {
                let details: TvDetails = self.get_json(&format!("/tv/{media_id}")).await?;
                Ok(details.into_title_info())
            }
        }
    }

    async fn season_episodes(
        &self,
        media_id: u64,
        season_number: u32,
    ) -> Result<Vec<EpisodeInfo>, TmdbError> {
        let details: SeasonDetails = self
            .get_json(&format!("/tv/{media_id}/season/{season_number}"))
            .await?;
        Ok(details
            .episodes
            .into_iter()
            .map(|e| e.into_episode_info())
            .collect())
    }
}
