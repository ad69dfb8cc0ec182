use tracing::debug;

use crate::models::{ProgressItem, SavedItem, CONTINUE_WATCHING_CAP};

/// In-memory, session-scoped reflection of the two remote tables.
///
/// The mirror is the single owner of both collections and never touches the
/// network. The sync adapter applies remote-confirmed changes to it; the UI
/// reads it synchronously. `generation` identifies one mirror lifetime
/// between identity changes and tags in-flight remote calls so a late result
/// against a dead mirror can be discarded.
#[derive(Debug, Default)]
pub struct Mirror {
    saved: Vec<SavedItem>,
    progress: Vec<ProgressItem>,
    ready: bool,
    generation: u64,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reads ───────────────────────────────────────────────────

    pub fn saved(&self) -> &[SavedItem] {
        &self.saved
    }

    pub fn progress(&self) -> &[ProgressItem] {
        &self.progress
    }

    /// True once the initial fetch for the current identity has settled,
    /// successfully or not.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Membership test for the watchlist.
    pub fn is_saved(&self, media_id: u64) -> bool {
        self.saved.iter().any(|i| i.media_id == media_id)
    }

    pub fn saved_item(&self, media_id: u64) -> Option<&SavedItem> {
        self.saved.iter().find(|i| i.media_id == media_id)
    }

    pub fn progress_item(&self, media_id: u64) -> Option<&ProgressItem> {
        self.progress.iter().find(|i| i.media_id == media_id)
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Install the result of the initial fetch and raise the ready flag.
    ///
    /// The progress collection is normalized to its invariant here: sorted
    /// descending by `last_watched_at` and truncated to the cap, in case the
    /// remote table holds more rows than the session ever shows.
    pub fn load(&mut self, saved: Vec<SavedItem>, mut progress: Vec<ProgressItem>) {
        progress.sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));
        progress.truncate(CONTINUE_WATCHING_CAP);
        self.saved = saved;
        self.progress = progress;
        self.ready = true;
    }

    /// Empty both collections and start a new generation. Called whenever
    /// the active identity changes, including to "no user".
    pub fn reset(&mut self) {
        self.saved.clear();
        self.progress.clear();
        self.ready = false;
        self.generation += 1;
        debug!(generation = self.generation, "mirror reset");
    }

    // ── Watchlist mutations ─────────────────────────────────────

    /// Prepend a confirmed watchlist entry (most-recent-first order).
    pub fn insert_saved(&mut self, item: SavedItem) {
        self.saved.insert(0, item);
    }

    pub fn remove_saved(&mut self, media_id: u64) -> Option<SavedItem> {
        let idx = self.saved.iter().position(|i| i.media_id == media_id)?;
        Some(self.saved.remove(idx))
    }

    pub fn set_watched(&mut self, media_id: u64, watched: bool) -> bool {
        self.with_saved(media_id, |i| i.watched = watched)
    }

    pub fn set_watch_later(&mut self, media_id: u64, watch_later: bool) -> bool {
        self.with_saved(media_id, |i| i.watch_later = watch_later)
    }

    pub fn set_rating(&mut self, media_id: u64, rating: u8) -> bool {
        self.with_saved(media_id, |i| i.rating = Some(rating))
    }

    pub fn set_notes(&mut self, media_id: u64, notes: String) -> bool {
        self.with_saved(media_id, |i| i.notes = Some(notes))
    }

    fn with_saved(&mut self, media_id: u64, f: impl FnOnce(&mut SavedItem)) -> bool {
        match self.saved.iter_mut().find(|i| i.media_id == media_id) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    // ── Continue-watching mutations ─────────────────────────────

    /// Insert or overwrite a confirmed progress entry, keeping the
    /// collection sorted descending by `last_watched_at` and within the cap.
    ///
    /// An existing entry for the same media id is overwritten in place
    /// (its `remote_id` survives if the incoming entry carries none).
    /// Returns the entry evicted by capacity, if any.
    pub fn upsert_progress(&mut self, mut item: ProgressItem) -> Option<ProgressItem> {
        if let Some(existing) = self.progress.iter_mut().find(|i| i.media_id == item.media_id) {
            if item.remote_id.is_none() {
                item.remote_id = existing.remote_id.take();
            }
            *existing = item;
        } else {
            self.progress.push(item);
        }

        self.progress
            .sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));

        if self.progress.len() > CONTINUE_WATCHING_CAP {
            // Sorted descending, so the overflow entry is the oldest.
            return self.progress.pop();
        }
        None
    }

    pub fn remove_progress(&mut self, media_id: u64) -> Option<ProgressItem> {
        let idx = self.progress.iter().position(|i| i.media_id == media_id)?;
        Some(self.progress.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::MediaKind;

    fn saved(media_id: u64, title: &str) -> SavedItem {
        SavedItem {
            media_id,
            remote_id: Some(format!("row-{media_id}")),
            title: title.into(),
            poster_path: None,
            media_kind: MediaKind::Movie,
            added_at: Utc::now(),
            watched: false,
            watch_later: false,
            rating: None,
            notes: None,
        }
    }

    fn progress(media_id: u64, minutes_ago: i64) -> ProgressItem {
        ProgressItem {
            media_id,
            remote_id: Some(format!("row-{media_id}")),
            title: format!("Title {media_id}"),
            poster_path: None,
            media_kind: MediaKind::Series,
            progress_percent: 0,
            last_watched_at: Utc::now() - Duration::minutes(minutes_ago),
            season: None,
            episode: None,
        }
    }

    #[test]
    fn test_membership() {
        let mut mirror = Mirror::new();
        mirror.insert_saved(saved(603, "The Matrix"));

        assert!(mirror.is_saved(603));
        assert!(!mirror.is_saved(604));
    }

    #[test]
    fn test_insert_prepends() {
        let mut mirror = Mirror::new();
        mirror.insert_saved(saved(1, "First"));
        mirror.insert_saved(saved(2, "Second"));

        assert_eq!(mirror.saved()[0].media_id, 2);
        assert_eq!(mirror.saved()[1].media_id, 1);
    }

    #[test]
    fn test_reset_bumps_generation_and_clears() {
        let mut mirror = Mirror::new();
        mirror.load(vec![saved(1, "A")], vec![progress(2, 0)]);
        assert!(mirror.is_ready());

        let gen = mirror.generation();
        mirror.reset();

        assert_eq!(mirror.generation(), gen + 1);
        assert!(!mirror.is_ready());
        assert!(mirror.saved().is_empty());
        assert!(mirror.progress().is_empty());
    }

    #[test]
    fn test_load_normalizes_progress() {
        let mut mirror = Mirror::new();
        let rows: Vec<ProgressItem> = (0..25).map(|i| progress(i, i as i64)).collect();
        mirror.load(vec![], rows);

        assert_eq!(mirror.progress().len(), CONTINUE_WATCHING_CAP);
        // Newest first.
        assert_eq!(mirror.progress()[0].media_id, 0);
        assert!(mirror
            .progress()
            .windows(2)
            .all(|w| w[0].last_watched_at >= w[1].last_watched_at));
    }

    #[test]
    fn test_upsert_progress_evicts_oldest() {
        let mut mirror = Mirror::new();
        for i in 0..CONTINUE_WATCHING_CAP as u64 {
            assert!(mirror.upsert_progress(progress(i, 100 + i as i64)).is_none());
        }

        let evicted = mirror.upsert_progress(progress(999, 0)).unwrap();
        // The entry with the smallest last_watched_at goes.
        assert_eq!(evicted.media_id, (CONTINUE_WATCHING_CAP - 1) as u64);
        assert_eq!(mirror.progress().len(), CONTINUE_WATCHING_CAP);
        assert_eq!(mirror.progress()[0].media_id, 999);
    }

    #[test]
    fn test_upsert_progress_overwrites_in_place() {
        let mut mirror = Mirror::new();
        mirror.upsert_progress(progress(7, 60));

        let mut updated = progress(7, 0);
        updated.remote_id = None;
        updated.progress_percent = 80;
        assert!(mirror.upsert_progress(updated).is_none());

        assert_eq!(mirror.progress().len(), 1);
        let item = mirror.progress_item(7).unwrap();
        assert_eq!(item.progress_percent, 80);
        // Identity preserved: the stored remote id survives the overwrite.
        assert_eq!(item.remote_id.as_deref(), Some("row-7"));
    }

    #[test]
    fn test_field_mutators_miss_returns_false() {
        let mut mirror = Mirror::new();
        assert!(!mirror.set_watched(42, true));

        mirror.insert_saved(saved(42, "Blade Runner"));
        assert!(mirror.set_watched(42, true));
        assert!(mirror.saved_item(42).unwrap().watched);
    }
}
