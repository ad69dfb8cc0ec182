//! The tracking service object embedded in the media browsing client.
//!
//! [`Tracker`] owns the local mirror of the user's saved and in-progress
//! lists and exposes the watchlist and continue-watching managers. It is an
//! explicitly injected object with its lifecycle tied to the identity
//! session — no hidden singleton. All remote writes follow
//! confirm-then-apply: the mirror changes only after the persistence
//! service has acknowledged the call, so a failed write leaves local state
//! exactly as it was.

mod playback;
mod sync;

pub use playback::TitleView;

use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use shiori_api::tmdb::TmdbClient;
use shiori_api::traits::{
    ListStore, MetadataProvider, NewProgressRow, NewSavedRow, ProgressPatch, ProgressRow,
    SavedPatch, SavedRow, StoreAuth,
};
use shiori_api::userdata::UserDataClient;
use shiori_core::config::AppConfig;
use shiori_core::filter::{filter_sort, FilterOptions};
use shiori_core::mirror::Mirror;
use shiori_core::models::{MediaKind, ProgressDraft, ProgressItem, SavedDraft, SavedItem};
use shiori_core::session::{IdentitySnapshot, SessionState, UserHandle};

use crate::sync::SyncAdapter;

/// Result of a manager operation. Managers never return `Err` across this
/// boundary; failures are outcomes the caller may surface or ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The mutation was confirmed remotely and applied to the mirror.
    Applied,
    /// Nothing to do: already saved, already absent, or no remote row to
    /// mutate.
    NoOp,
    /// No signed-in user; mutating operations are disabled.
    NotSignedIn,
    /// The remote call failed or timed out; the mirror is unchanged.
    RemoteFailed,
    /// The identity changed while the call was in flight; the confirmed
    /// result was discarded.
    Superseded,
}

/// The production tracker over the real service clients.
pub type Runtime = Tracker<UserDataClient, TmdbClient>;

#[derive(Debug, Default)]
struct SessionCtx {
    user: Option<UserHandle>,
    state: SessionState,
}

pub struct Tracker<S, M> {
    sync: SyncAdapter<S>,
    metadata: M,
    mirror: RwLock<Mirror>,
    session: RwLock<SessionCtx>,
}

impl Tracker<UserDataClient, TmdbClient> {
    /// Construct the production tracker from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let store = UserDataClient::new(
            config.userdata.base_url.as_str(),
            config.userdata.api_key.as_str(),
        );
        let metadata = TmdbClient::with_base_url(
            config.metadata.base_url.as_str(),
            config.metadata.api_key.as_str(),
        )
        .with_language(config.metadata.language.as_str());
        Self::new(store, metadata, config)
    }
}

impl<S: ListStore, M: MetadataProvider> Tracker<S, M> {
    pub fn new(store: S, metadata: M, config: &AppConfig) -> Self {
        Self {
            sync: SyncAdapter::new(
                store,
                Duration::from_secs(config.sync.request_timeout_secs),
            ),
            metadata,
            mirror: RwLock::new(Mirror::new()),
            session: RwLock::new(SessionCtx::default()),
        }
    }

    // ── Identity lifecycle ──────────────────────────────────────

    /// Feed an identity snapshot from the session provider.
    ///
    /// A snapshot still marked "resolving" does nothing. A changed identity
    /// resets the mirror (starting a new generation, which discards any
    /// in-flight writes) and, for a signed-in user, runs the initial fetch
    /// of both tables before returning. Fetch failure leaves the affected
    /// collection empty but still raises the ready flag.
    pub async fn set_identity(&self, snapshot: IdentitySnapshot) {
        if snapshot.resolving {
            debug!("identity still resolving, ignoring");
            return;
        }

        {
            let session = self.session.read().await;
            if session.user == snapshot.user {
                return;
            }
        }

        let Some(user) = snapshot.user else {
            {
                let mut session = self.session.write().await;
                session.user = None;
                session.state = SessionState::Uninitialized;
            }
            self.mirror.write().await.reset();
            info!("signed out, mirror cleared");
            return;
        };

        {
            let mut session = self.session.write().await;
            session.user = Some(user.clone());
            session.state = SessionState::Loading;
        }
        let generation = {
            let mut mirror = self.mirror.write().await;
            mirror.reset();
            mirror.generation()
        };
        info!(user_id = %user.user_id, "identity resolved, fetching lists");

        let auth = store_auth(&user);

        // Two independent fetches; either may fail on its own.
        let saved: Vec<SavedItem> = match self.sync.fetch_saved(&auth).await {
            Ok(rows) => rows.into_iter().map(saved_item_from_row).collect(),
            Err(_) => Vec::new(),
        };
        let progress: Vec<ProgressItem> = match self.sync.fetch_progress(&auth).await {
            Ok(rows) => rows.into_iter().map(progress_item_from_row).collect(),
            Err(_) => Vec::new(),
        };

        {
            let mut mirror = self.mirror.write().await;
            if mirror.generation() != generation {
                debug!("identity changed during initial fetch, discarding");
                return;
            }
            mirror.load(saved, progress);
        }

        let mut session = self.session.write().await;
        if session.user.as_ref() == Some(&user) {
            session.state = SessionState::Ready;
        }
    }

    pub async fn state(&self) -> SessionState {
        self.session.read().await.state
    }

    /// True once the initial fetch for the current identity has settled.
    pub async fn is_ready(&self) -> bool {
        self.mirror.read().await.is_ready()
    }

    // ── Mirror reads ────────────────────────────────────────────

    pub async fn watchlist(&self) -> Vec<SavedItem> {
        self.mirror.read().await.saved().to_vec()
    }

    pub async fn continue_watching(&self) -> Vec<ProgressItem> {
        self.mirror.read().await.progress().to_vec()
    }

    pub async fn is_saved(&self, media_id: u64) -> bool {
        self.mirror.read().await.is_saved(media_id)
    }

    /// The view-ready ordered subset of the watchlist.
    pub async fn filtered_watchlist(&self, options: &FilterOptions) -> Vec<SavedItem> {
        filter_sort(self.mirror.read().await.saved(), options)
    }

    // ── Watchlist manager ───────────────────────────────────────

    /// Save a title for later. A title already on the watchlist is left
    /// untouched.
    pub async fn add_to_watchlist(&self, draft: SavedDraft) -> Outcome {
        let (auth, generation) = match self.begin_mutation().await {
            Ok(v) => v,
            Err(outcome) => return outcome,
        };

        if self.mirror.read().await.is_saved(draft.media_id) {
            debug!(media_id = draft.media_id, "already in watchlist");
            return Outcome::NoOp;
        }

        let row = NewSavedRow {
            media_id: draft.media_id,
            title: draft.title,
            poster_path: draft.poster_path,
            media_kind: draft.media_kind.as_str().to_string(),
            added_at: Utc::now(),
            watched: false,
            watch_later: false,
            rating: None,
            notes: None,
        };
        let stored = match self.sync.insert_saved(&auth, &row).await {
            Ok(row) => row,
            Err(_) => return Outcome::RemoteFailed,
        };

        let mut mirror = self.mirror.write().await;
        if mirror.generation() != generation {
            return Outcome::Superseded;
        }
        mirror.insert_saved(saved_item_from_row(stored));
        Outcome::Applied
    }

    pub async fn remove_from_watchlist(&self, media_id: u64) -> Outcome {
        let (auth, generation) = match self.begin_mutation().await {
            Ok(v) => v,
            Err(outcome) => return outcome,
        };

        let cached = match self.mirror.read().await.saved_item(media_id) {
            Some(item) => item.remote_id.clone(),
            None => {
                debug!(media_id, "not in watchlist");
                return Outcome::NoOp;
            }
        };
        let row_id = match self.resolve_saved_row(&auth, media_id, cached).await {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        if self.sync.delete_saved(&auth, &row_id).await.is_err() {
            return Outcome::RemoteFailed;
        }

        let mut mirror = self.mirror.write().await;
        if mirror.generation() != generation {
            return Outcome::Superseded;
        }
        mirror.remove_saved(media_id);
        Outcome::Applied
    }

    pub async fn toggle_watched(&self, media_id: u64) -> Outcome {
        let target = match self.mirror.read().await.saved_item(media_id) {
            Some(item) => !item.watched,
            None => return Outcome::NoOp,
        };
        let patch = SavedPatch {
            watched: Some(target),
            ..Default::default()
        };
        self.patch_saved(media_id, patch, move |mirror| {
            mirror.set_watched(media_id, target);
        })
        .await
    }

    pub async fn toggle_watch_later(&self, media_id: u64) -> Outcome {
        let target = match self.mirror.read().await.saved_item(media_id) {
            Some(item) => !item.watch_later,
            None => return Outcome::NoOp,
        };
        let patch = SavedPatch {
            watch_later: Some(target),
            ..Default::default()
        };
        self.patch_saved(media_id, patch, move |mirror| {
            mirror.set_watch_later(media_id, target);
        })
        .await
    }

    /// Set the user rating for a saved title (0–10).
    pub async fn set_rating(&self, media_id: u64, rating: u8) -> Outcome {
        let rating = rating.min(10);
        let patch = SavedPatch {
            rating: Some(rating),
            ..Default::default()
        };
        self.patch_saved(media_id, patch, move |mirror| {
            mirror.set_rating(media_id, rating);
        })
        .await
    }

    pub async fn set_notes(&self, media_id: u64, notes: String) -> Outcome {
        let patch = SavedPatch {
            notes: Some(notes.clone()),
            ..Default::default()
        };
        self.patch_saved(media_id, patch, move |mirror| {
            mirror.set_notes(media_id, notes);
        })
        .await
    }

    /// Shared shape of the field mutations: resolve the remote row, patch
    /// it, then apply the same change to the mirror.
    async fn patch_saved(
        &self,
        media_id: u64,
        patch: SavedPatch,
        apply: impl FnOnce(&mut Mirror),
    ) -> Outcome {
        let (auth, generation) = match self.begin_mutation().await {
            Ok(v) => v,
            Err(outcome) => return outcome,
        };

        let cached = match self.mirror.read().await.saved_item(media_id) {
            Some(item) => item.remote_id.clone(),
            None => return Outcome::NoOp,
        };
        let row_id = match self.resolve_saved_row(&auth, media_id, cached).await {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        if self.sync.update_saved(&auth, &row_id, &patch).await.is_err() {
            return Outcome::RemoteFailed;
        }

        let mut mirror = self.mirror.write().await;
        if mirror.generation() != generation {
            return Outcome::Superseded;
        }
        apply(&mut mirror);
        Outcome::Applied
    }

    // ── Continue-watching manager ───────────────────────────────

    /// Record or refresh a playback position. An existing entry for the
    /// same title is overwritten in place; a new entry may evict the
    /// least-recently-watched one once the collection is full.
    pub async fn upsert_progress(&self, draft: ProgressDraft) -> Outcome {
        let (auth, generation) = match self.begin_mutation().await {
            Ok(v) => v,
            Err(outcome) => return outcome,
        };

        let existing = self
            .mirror
            .read()
            .await
            .progress_item(draft.media_id)
            .cloned();
        let now = Utc::now();
        let percent = draft.progress_percent.min(100);

        if let Some(existing) = existing {
            let row_id = match self
                .resolve_progress_row(&auth, draft.media_id, existing.remote_id.clone())
                .await
            {
                Ok(id) => id,
                Err(outcome) => return outcome,
            };
            let patch = ProgressPatch {
                title: Some(draft.title.clone()),
                poster_path: draft.poster_path.clone(),
                progress_percent: Some(percent),
                last_watched_at: Some(now),
                season: draft.season,
                episode: draft.episode,
            };
            if self
                .sync
                .update_progress(&auth, &row_id, &patch)
                .await
                .is_err()
            {
                return Outcome::RemoteFailed;
            }

            let item = ProgressItem {
                media_id: draft.media_id,
                remote_id: Some(row_id),
                title: draft.title,
                poster_path: draft.poster_path.or(existing.poster_path),
                media_kind: draft.media_kind,
                progress_percent: percent,
                last_watched_at: now,
                season: draft.season.or(existing.season),
                episode: draft.episode.or(existing.episode),
            };
            let mut mirror = self.mirror.write().await;
            if mirror.generation() != generation {
                return Outcome::Superseded;
            }
            mirror.upsert_progress(item);
            return Outcome::Applied;
        }

        let row = NewProgressRow {
            media_id: draft.media_id,
            title: draft.title,
            poster_path: draft.poster_path,
            media_kind: draft.media_kind.as_str().to_string(),
            progress_percent: percent,
            last_watched_at: now,
            season: draft.season,
            episode: draft.episode,
        };
        let stored = match self.sync.insert_progress(&auth, &row).await {
            Ok(row) => row,
            Err(_) => return Outcome::RemoteFailed,
        };

        let evicted = {
            let mut mirror = self.mirror.write().await;
            if mirror.generation() != generation {
                return Outcome::Superseded;
            }
            mirror.upsert_progress(progress_item_from_row(stored))
        };

        if let Some(evicted) = evicted {
            debug!(media_id = evicted.media_id, "evicted by capacity");
            if let Some(row_id) = evicted.remote_id {
                // Best-effort: the cap is a local invariant and an orphaned
                // row is re-truncated on the next fetch.
                let _ = self.sync.delete_progress(&auth, &row_id).await;
            }
        }
        Outcome::Applied
    }

    pub async fn remove_progress(&self, media_id: u64) -> Outcome {
        let (auth, generation) = match self.begin_mutation().await {
            Ok(v) => v,
            Err(outcome) => return outcome,
        };

        let cached = match self.mirror.read().await.progress_item(media_id) {
            Some(item) => item.remote_id.clone(),
            None => {
                debug!(media_id, "not in continue watching");
                return Outcome::NoOp;
            }
        };
        let row_id = match self.resolve_progress_row(&auth, media_id, cached).await {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        if self.sync.delete_progress(&auth, &row_id).await.is_err() {
            return Outcome::RemoteFailed;
        }

        let mut mirror = self.mirror.write().await;
        if mirror.generation() != generation {
            return Outcome::Superseded;
        }
        mirror.remove_progress(media_id);
        Outcome::Applied
    }

    /// Record a playback tick from the player: refresh the percentage
    /// watched and the recency of an existing entry.
    pub async fn report_progress(&self, media_id: u64, percent: u8) -> Outcome {
        let (auth, generation) = match self.begin_mutation().await {
            Ok(v) => v,
            Err(outcome) => return outcome,
        };

        let existing = match self.mirror.read().await.progress_item(media_id) {
            Some(item) => item.clone(),
            None => {
                debug!(media_id, "no progress entry to update");
                return Outcome::NoOp;
            }
        };
        let row_id = match self
            .resolve_progress_row(&auth, media_id, existing.remote_id.clone())
            .await
        {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        let now = Utc::now();
        let percent = percent.min(100);
        let patch = ProgressPatch {
            progress_percent: Some(percent),
            last_watched_at: Some(now),
            ..Default::default()
        };
        if self
            .sync
            .update_progress(&auth, &row_id, &patch)
            .await
            .is_err()
        {
            return Outcome::RemoteFailed;
        }

        let mut item = existing;
        item.remote_id = Some(row_id);
        item.progress_percent = percent;
        item.last_watched_at = now;

        let mut mirror = self.mirror.write().await;
        if mirror.generation() != generation {
            return Outcome::Superseded;
        }
        mirror.upsert_progress(item);
        Outcome::Applied
    }

    // ── Internals ───────────────────────────────────────────────

    /// Capture the auth scope and the mirror generation a mutating call is
    /// issued against.
    async fn begin_mutation(&self) -> Result<(StoreAuth, u64), Outcome> {
        let auth = {
            let session = self.session.read().await;
            match session.user.as_ref() {
                Some(user) => store_auth(user),
                None => return Err(Outcome::NotSignedIn),
            }
        };
        let generation = self.mirror.read().await.generation();
        Ok((auth, generation))
    }

    /// Row id for a saved title: the cached id, or a lookup round trip.
    /// A not-found aborts the mutation silently.
    async fn resolve_saved_row(
        &self,
        auth: &StoreAuth,
        media_id: u64,
        cached: Option<String>,
    ) -> Result<String, Outcome> {
        if let Some(id) = cached {
            return Ok(id);
        }
        match self.sync.find_saved(auth, media_id).await {
            Ok(Some(row)) => Ok(row.id),
            Ok(None) => {
                debug!(media_id, "no remote saved row, aborting");
                Err(Outcome::NoOp)
            }
            Err(_) => Err(Outcome::RemoteFailed),
        }
    }

    async fn resolve_progress_row(
        &self,
        auth: &StoreAuth,
        media_id: u64,
        cached: Option<String>,
    ) -> Result<String, Outcome> {
        if let Some(id) = cached {
            return Ok(id);
        }
        match self.sync.find_progress(auth, media_id).await {
            Ok(Some(row)) => Ok(row.id),
            Ok(None) => {
                debug!(media_id, "no remote progress row, aborting");
                Err(Outcome::NoOp)
            }
            Err(_) => Err(Outcome::RemoteFailed),
        }
    }
}

// ── Row mapping ─────────────────────────────────────────────────

fn store_auth(user: &UserHandle) -> StoreAuth {
    StoreAuth {
        user_id: user.user_id.clone(),
        access_token: user.access_token.clone(),
    }
}

fn saved_item_from_row(row: SavedRow) -> SavedItem {
    SavedItem {
        media_id: row.media_id,
        remote_id: Some(row.id),
        title: row.title,
        poster_path: row.poster_path,
        media_kind: MediaKind::from_str(&row.media_kind).unwrap_or(MediaKind::Movie),
        added_at: row.added_at,
        watched: row.watched,
        watch_later: row.watch_later,
        rating: row.rating,
        notes: row.notes,
    }
}

fn progress_item_from_row(row: ProgressRow) -> ProgressItem {
    ProgressItem {
        media_id: row.media_id,
        remote_id: Some(row.id),
        title: row.title,
        poster_path: row.poster_path,
        media_kind: MediaKind::from_str(&row.media_kind).unwrap_or(MediaKind::Movie),
        progress_percent: row.progress_percent.min(100),
        last_watched_at: row.last_watched_at,
        season: row.season,
        episode: row.episode,
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use shiori_core::models::{MediaKind, ProgressDraft, SavedDraft, SavedItem};
    use shiori_core::models::CONTINUE_WATCHING_CAP;
    use shiori_core::session::SessionState;

    use super::testutil::*;
    use super::*;

    fn draft(media_id: u64, title: &str) -> SavedDraft {
        SavedDraft {
            media_id,
            title: title.into(),
            poster_path: None,
            media_kind: MediaKind::Movie,
        }
    }

    fn progress_draft(media_id: u64) -> ProgressDraft {
        ProgressDraft {
            media_id,
            title: format!("Title {media_id}"),
            poster_path: None,
            media_kind: MediaKind::Series,
            progress_percent: 0,
            season: Some(1),
            episode: Some(1),
        }
    }

    #[tokio::test]
    async fn test_duplicate_add_is_noop() {
        let tracker = signed_in_tracker().await;

        assert_eq!(tracker.add_to_watchlist(draft(603, "The Matrix")).await, Outcome::Applied);
        let before = tracker.watchlist().await;

        assert_eq!(tracker.add_to_watchlist(draft(603, "The Matrix")).await, Outcome::NoOp);
        assert_eq!(tracker.watchlist().await, before);
    }

    #[tokio::test]
    async fn test_add_then_remove_round_trip() {
        let tracker = signed_in_tracker().await;
        let before = tracker.watchlist().await;

        tracker.add_to_watchlist(draft(603, "The Matrix")).await;
        assert_eq!(tracker.remove_from_watchlist(603).await, Outcome::Applied);

        assert_eq!(tracker.watchlist().await, before);
        assert!(tracker.sync.store().state.lock().unwrap().saved.is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let tracker = signed_in_tracker().await;
        assert_eq!(tracker.remove_from_watchlist(999).await, Outcome::NoOp);
    }

    #[tokio::test]
    async fn test_write_failure_leaves_mirror_untouched() {
        let tracker = signed_in_tracker().await;
        tracker.add_to_watchlist(draft(603, "The Matrix")).await;
        let before = tracker.watchlist().await;

        tracker.sync.store().fail_writes(true);

        assert_eq!(tracker.add_to_watchlist(draft(604, "Reloaded")).await, Outcome::RemoteFailed);
        assert_eq!(tracker.toggle_watched(603).await, Outcome::RemoteFailed);
        assert_eq!(tracker.set_rating(603, 9).await, Outcome::RemoteFailed);
        assert_eq!(tracker.watchlist().await, before);
    }

    #[tokio::test]
    async fn test_mutations_require_sign_in() {
        let tracker = tracker(MockStore::new());
        assert_eq!(tracker.add_to_watchlist(draft(1, "A")).await, Outcome::NotSignedIn);
        assert_eq!(tracker.upsert_progress(progress_draft(1)).await, Outcome::NotSignedIn);
        assert_eq!(tracker.toggle_watched(1).await, Outcome::NoOp);
    }

    #[tokio::test]
    async fn test_sign_out_clears_mirror() {
        let tracker = signed_in_tracker().await;
        tracker.add_to_watchlist(draft(603, "The Matrix")).await;
        tracker.upsert_progress(progress_draft(1399)).await;

        tracker.set_identity(signed_out()).await;

        assert!(tracker.watchlist().await.is_empty());
        assert!(tracker.continue_watching().await.is_empty());
        assert_eq!(tracker.state().await, SessionState::Uninitialized);
        // Remote rows are untouched by sign-out.
        assert_eq!(tracker.sync.store().state.lock().unwrap().saved.len(), 1);
    }

    #[tokio::test]
    async fn test_initial_fetch_populates_mirror() {
        let store = MockStore::new();
        store.state.lock().unwrap().saved.push(saved_row(603, "The Matrix"));
        let tracker = tracker(store);

        tracker.set_identity(signed_in("user-1")).await;

        assert_eq!(tracker.state().await, SessionState::Ready);
        assert!(tracker.is_saved(603).await);
        let item = &tracker.watchlist().await[0];
        assert_eq!(item.remote_id.as_deref(), Some("seed-603"));
    }

    #[tokio::test]
    async fn test_read_failure_still_raises_ready() {
        let store = MockStore::new();
        store.state.lock().unwrap().saved.push(saved_row(603, "The Matrix"));
        store.state.lock().unwrap().fail_reads = true;
        let tracker = tracker(store);

        tracker.set_identity(signed_in("user-1")).await;

        assert!(tracker.is_ready().await);
        assert_eq!(tracker.state().await, SessionState::Ready);
        assert!(tracker.watchlist().await.is_empty());
    }

    #[tokio::test]
    async fn test_resolving_identity_does_nothing() {
        let tracker = tracker(MockStore::new());
        tracker
            .set_identity(IdentitySnapshot {
                user: None,
                resolving: true,
            })
            .await;
        assert_eq!(tracker.state().await, SessionState::Uninitialized);
        assert!(!tracker.is_ready().await);
    }

    #[tokio::test]
    async fn test_toggles_alternate() {
        let tracker = signed_in_tracker().await;
        tracker.add_to_watchlist(draft(603, "The Matrix")).await;

        assert_eq!(tracker.toggle_watched(603).await, Outcome::Applied);
        assert!(tracker.watchlist().await[0].watched);
        assert_eq!(tracker.toggle_watched(603).await, Outcome::Applied);
        assert!(!tracker.watchlist().await[0].watched);

        // The remote row tracked both flips.
        assert!(!tracker.sync.store().state.lock().unwrap().saved[0].watched);
    }

    #[tokio::test]
    async fn test_rating_and_notes_overwrite() {
        let tracker = signed_in_tracker().await;
        tracker.add_to_watchlist(draft(603, "The Matrix")).await;

        assert_eq!(tracker.set_rating(603, 15).await, Outcome::Applied);
        assert_eq!(tracker.watchlist().await[0].rating, Some(10)); // clamped

        assert_eq!(tracker.set_notes(603, "rewatch soon".into()).await, Outcome::Applied);
        assert_eq!(tracker.watchlist().await[0].notes.as_deref(), Some("rewatch soon"));
    }

    #[tokio::test]
    async fn test_lookup_resolves_missing_row_id() {
        let tracker = signed_in_tracker().await;
        tracker.add_to_watchlist(draft(603, "The Matrix")).await;

        // Simulate an entry whose row id was never learned.
        {
            let mut mirror = tracker.mirror.write().await;
            let item = mirror.remove_saved(603).unwrap();
            mirror.insert_saved(SavedItem {
                remote_id: None,
                ..item
            });
        }

        assert_eq!(tracker.toggle_watched(603).await, Outcome::Applied);
        assert!(tracker.sync.store().state.lock().unwrap().saved[0].watched);
    }

    #[tokio::test]
    async fn test_progress_cap_evicts_oldest() {
        let tracker = signed_in_tracker().await;

        for i in 0..(CONTINUE_WATCHING_CAP as u64 + 1) {
            assert_eq!(tracker.upsert_progress(progress_draft(i)).await, Outcome::Applied);
        }

        let list = tracker.continue_watching().await;
        assert_eq!(list.len(), CONTINUE_WATCHING_CAP);
        // The first-inserted entry had the oldest last_watched_at.
        assert!(!list.iter().any(|i| i.media_id == 0));
        assert!(list
            .windows(2)
            .all(|w| w[0].last_watched_at >= w[1].last_watched_at));

        // The evicted row was also deleted remotely.
        assert_eq!(
            tracker.sync.store().state.lock().unwrap().progress.len(),
            CONTINUE_WATCHING_CAP
        );
    }

    #[tokio::test]
    async fn test_upsert_overwrites_in_place() {
        let tracker = signed_in_tracker().await;
        tracker.upsert_progress(progress_draft(1399)).await;
        let row_id = tracker.continue_watching().await[0].remote_id.clone();

        let mut update = progress_draft(1399);
        update.progress_percent = 80;
        update.episode = Some(5);
        assert_eq!(tracker.upsert_progress(update).await, Outcome::Applied);

        let list = tracker.continue_watching().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].progress_percent, 80);
        assert_eq!(list[0].episode, Some(5));
        assert_eq!(list[0].remote_id, row_id);
    }

    #[tokio::test]
    async fn test_report_progress_updates_existing_only() {
        let tracker = signed_in_tracker().await;
        assert_eq!(tracker.report_progress(1399, 50).await, Outcome::NoOp);

        tracker.upsert_progress(progress_draft(1399)).await;
        assert_eq!(tracker.report_progress(1399, 150).await, Outcome::Applied);

        let item = &tracker.continue_watching().await[0];
        assert_eq!(item.progress_percent, 100); // clamped
        assert_eq!(item.season, Some(1)); // untouched
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_change_mid_write_is_superseded() {
        let store = MockStore::new();
        store.state.lock().unwrap().write_delay = Some(Duration::from_millis(200));
        let tracker = Arc::new(tracker(store));
        tracker.set_identity(signed_in("user-1")).await;

        let slow = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.add_to_watchlist(draft(603, "The Matrix")).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        tracker.set_identity(signed_out()).await;

        assert_eq!(slow.await.unwrap(), Outcome::Superseded);
        assert!(tracker.watchlist().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_remote_failure() {
        let store = MockStore::new();
        store.state.lock().unwrap().hang_writes = true;
        let tracker = tracker(store);
        tracker.set_identity(signed_in("user-1")).await;

        let before = tracker.watchlist().await;
        assert_eq!(tracker.add_to_watchlist(draft(603, "The Matrix")).await, Outcome::RemoteFailed);
        assert_eq!(tracker.watchlist().await, before);
    }

    #[tokio::test]
    async fn test_filtered_watchlist_reads_mirror() {
        let tracker = signed_in_tracker().await;
        tracker.add_to_watchlist(draft(603, "The Matrix")).await;
        tracker.add_to_watchlist(draft(604, "Reloaded")).await;
        tracker.toggle_watched(604).await;

        let options = FilterOptions {
            show_watched: false,
            ..Default::default()
        };
        let visible = tracker.filtered_watchlist(&options).await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].media_id, 603);
    }
}
