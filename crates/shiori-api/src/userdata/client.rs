use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::error::StoreError;
use crate::traits::{
    ListStore, NewProgressRow, NewSavedRow, ProgressPatch, ProgressRow, SavedPatch, SavedRow,
    StoreAuth,
};

const SAVED_TABLE: &str = "saved_items";
const PROGRESS_TABLE: &str = "progress_items";

/// Client for the userdata persistence service: a PostgREST-style rows API
/// exposing the per-user `saved_items` and `progress_items` tables.
///
/// Every request carries the project api key plus the user's bearer token;
/// row-level security on the service side scopes rows to that user.
pub struct UserDataClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl UserDataClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: Client::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn request(&self, req: reqwest::RequestBuilder, auth: &StoreAuth) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", auth.access_token))
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(StoreError::Api {
                status,
                message: body,
            })
        }
    }

    async fn select_rows<T: serde::de::DeserializeOwned>(
        &self,
        auth: &StoreAuth,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let resp = self
            .request(self.http.get(self.table_url(table)), auth)
            .query(query)
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        resp.json().await.map_err(|e| StoreError::Parse(e.to_string()))
    }

    /// Insert a row and parse the returned representation.
    async fn insert_row<T: serde::de::DeserializeOwned>(
        &self,
        auth: &StoreAuth,
        table: &str,
        body: serde_json::Value,
    ) -> Result<T, StoreError> {
        let resp = self
            .request(self.http.post(self.table_url(table)), auth)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        let mut rows: Vec<T> = resp
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))?;

        if rows.is_empty() {
            return Err(StoreError::Parse("insert returned no representation".into()));
        }
        Ok(rows.remove(0))
    }

    async fn patch_row(
        &self,
        auth: &StoreAuth,
        table: &str,
        row_id: &str,
        body: &impl serde::Serialize,
    ) -> Result<(), StoreError> {
        let resp = self
            .request(self.http.patch(self.table_url(table)), auth)
            .query(&[("id", format!("eq.{row_id}"))])
            .json(body)
            .send()
            .await?;

        Self::check_response(resp).await?;
        Ok(())
    }

    async fn delete_row(
        &self,
        auth: &StoreAuth,
        table: &str,
        row_id: &str,
    ) -> Result<(), StoreError> {
        let resp = self
            .request(self.http.delete(self.table_url(table)), auth)
            .query(&[("id", format!("eq.{row_id}"))])
            .send()
            .await?;

        // Treat 404 as success — the row is already gone.
        if resp.status().as_u16() == 404 {
            debug!(table, row_id, "row already deleted");
            return Ok(());
        }
        Self::check_response(resp).await?;
        Ok(())
    }

    /// Serialize an insert payload and attach the owning user id.
    fn owned_body(
        auth: &StoreAuth,
        row: &impl serde::Serialize,
    ) -> Result<serde_json::Value, StoreError> {
        let mut body = serde_json::to_value(row).map_err(|e| StoreError::Parse(e.to_string()))?;
        body["user_id"] = json!(auth.user_id);
        Ok(body)
    }
}

impl ListStore for UserDataClient {
    type Error = StoreError;

    async fn fetch_saved(&self, auth: &StoreAuth) -> Result<Vec<SavedRow>, StoreError> {
        self.select_rows(
            auth,
            SAVED_TABLE,
            &[
                ("select", "*".into()),
                ("user_id", format!("eq.{}", auth.user_id)),
                ("order", "added_at.desc".into()),
            ],
        )
        .await
    }

    async fn fetch_progress(&self, auth: &StoreAuth) -> Result<Vec<ProgressRow>, StoreError> {
        self.select_rows(
            auth,
            PROGRESS_TABLE,
            &[
                ("select", "*".into()),
                ("user_id", format!("eq.{}", auth.user_id)),
                ("order", "last_watched_at.desc".into()),
            ],
        )
        .await
    }

    async fn find_saved(
        &self,
        auth: &StoreAuth,
        media_id: u64,
    ) -> Result<Option<SavedRow>, StoreError> {
        let mut rows: Vec<SavedRow> = self
            .select_rows(
                auth,
                SAVED_TABLE,
                &[
                    ("select", "*".into()),
                    ("user_id", format!("eq.{}", auth.user_id)),
                    ("media_id", format!("eq.{media_id}")),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    async fn find_progress(
        &self,
        auth: &StoreAuth,
        media_id: u64,
    ) -> Result<Option<ProgressRow>, StoreError> {
        let mut rows: Vec<ProgressRow> = self
            .select_rows(
                auth,
                PROGRESS_TABLE,
                &[
                    ("select", "*".into()),
                    ("user_id", format!("eq.{}", auth.user_id)),
                    ("media_id", format!("eq.{media_id}")),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    async fn insert_saved(
        &self,
        auth: &StoreAuth,
        row: &NewSavedRow,
    ) -> Result<SavedRow, StoreError> {
        let body = Self::owned_body(auth, row)?;
        self.insert_row(auth, SAVED_TABLE, body).await
    }

    async fn update_saved(
        &self,
        auth: &StoreAuth,
        row_id: &str,
        patch: &SavedPatch,
    ) -> Result<(), StoreError> {
        self.patch_row(auth, SAVED_TABLE, row_id, patch).await
    }

    async fn delete_saved(&self, auth: &StoreAuth, row_id: &str) -> Result<(), StoreError> {
        self.delete_row(auth, SAVED_TABLE, row_id).await
    }

    async fn insert_progress(
        &self,
        auth: &StoreAuth,
        row: &NewProgressRow,
    ) -> Result<ProgressRow, StoreError> {
        let body = Self::owned_body(auth, row)?;
        self.insert_row(auth, PROGRESS_TABLE, body).await
    }

    async fn update_progress(
        &self,
        auth: &StoreAuth,
        row_id: &str,
        patch: &ProgressPatch,
    ) -> Result<(), StoreError> {
        self.patch_row(auth, PROGRESS_TABLE, row_id, patch).await
    }

    async fn delete_progress(&self, auth: &StoreAuth, row_id: &str) -> Result<(), StoreError> {
        self.delete_row(auth, PROGRESS_TABLE, row_id).await
    }
}
