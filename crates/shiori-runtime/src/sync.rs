//! The remote sync adapter.
//!
//! Translates mirror mutations into remote calls over a [`ListStore`]
//! implementation. Every call is bounded by the configured timeout; an
//! elapsed timer is the same failure as a transport error. Failures are
//! logged here with the triggering operation, so callers only branch on
//! success or failure and the mirror is never touched before confirmation.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use shiori_api::traits::{
    ListStore, NewProgressRow, NewSavedRow, ProgressPatch, ProgressRow, SavedPatch, SavedRow,
    StoreAuth,
};

/// Marker for a failed or timed-out remote call. The condition has already
/// been logged; the failure kind is irrelevant to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncFailed;

pub struct SyncAdapter<S> {
    store: S,
    timeout: Duration,
}

impl<S: ListStore> SyncAdapter<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub async fn fetch_saved(&self, auth: &StoreAuth) -> Result<Vec<SavedRow>, SyncFailed> {
        self.call("fetch_saved", self.store.fetch_saved(auth)).await
    }

    pub async fn fetch_progress(&self, auth: &StoreAuth) -> Result<Vec<ProgressRow>, SyncFailed> {
        self.call("fetch_progress", self.store.fetch_progress(auth))
            .await
    }

    pub async fn find_saved(
        &self,
        auth: &StoreAuth,
        media_id: u64,
    ) -> Result<Option<SavedRow>, SyncFailed> {
        self.call("find_saved", self.store.find_saved(auth, media_id))
            .await
    }

    pub async fn find_progress(
        &self,
        auth: &StoreAuth,
        media_id: u64,
    ) -> Result<Option<ProgressRow>, SyncFailed> {
        self.call("find_progress", self.store.find_progress(auth, media_id))
            .await
    }

    pub async fn insert_saved(
        &self,
        auth: &StoreAuth,
        row: &NewSavedRow,
    ) -> Result<SavedRow, SyncFailed> {
        self.call("insert_saved", self.store.insert_saved(auth, row))
            .await
    }

    pub async fn update_saved(
        &self,
        auth: &StoreAuth,
        row_id: &str,
        patch: &SavedPatch,
    ) -> Result<(), SyncFailed> {
        self.call("update_saved", self.store.update_saved(auth, row_id, patch))
            .await
    }

    pub async fn delete_saved(&self, auth: &StoreAuth, row_id: &str) -> Result<(), SyncFailed> {
        self.call("delete_saved", self.store.delete_saved(auth, row_id))
            .await
    }

    pub async fn insert_progress(
        &self,
        auth: &StoreAuth,
        row: &NewProgressRow,
    ) -> Result<ProgressRow, SyncFailed> {
        self.call("insert_progress", self.store.insert_progress(auth, row))
            .await
    }

    pub async fn update_progress(
        &self,
        auth: &StoreAuth,
        row_id: &str,
        patch: &ProgressPatch,
    ) -> Result<(), SyncFailed> {
        self.call(
            "update_progress",
            self.store.update_progress(auth, row_id, patch),
        )
        .await
    }

    pub async fn delete_progress(&self, auth: &StoreAuth, row_id: &str) -> Result<(), SyncFailed> {
        self.call("delete_progress", self.store.delete_progress(auth, row_id))
            .await
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, SyncFailed>
    where
        F: Future<Output = Result<T, S::Error>>,
    {
        match timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "remote call failed");
                Err(SyncFailed)
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout_secs = self.timeout.as_secs(),
                    "remote call timed out"
                );
                Err(SyncFailed)
            }
        }
    }
}
