use serde::{Deserialize, Serialize};

use crate::models::{MediaKind, SavedItem};

/// Sort key for the watchlist view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    AddedAt,
    Title,
    Rating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Media-kind restriction for the watchlist view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    Movie,
    Series,
    All,
}

impl KindFilter {
    fn matches(self, kind: MediaKind) -> bool {
        match self {
            Self::All => true,
            Self::Movie => kind == MediaKind::Movie,
            Self::Series => kind == MediaKind::Series,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOptions {
    pub show_watched: bool,
    pub show_watch_later: bool,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub media_kind: KindFilter,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            show_watched: true,
            show_watch_later: true,
            sort_by: SortBy::AddedAt,
            sort_order: SortOrder::Desc,
            media_kind: KindFilter::All,
        }
    }
}

/// Produce the view-ready ordered subset of the watchlist.
///
/// The two visibility filters are independent exclusions: an item can be
/// dropped by either rule. Ties under the sort key keep their prior
/// collection order.
pub fn filter_sort(items: &[SavedItem], options: &FilterOptions) -> Vec<SavedItem> {
    let mut filtered: Vec<SavedItem> = items
        .iter()
        .filter(|i| options.show_watched || !i.watched)
        .filter(|i| options.show_watch_later || !i.watch_later)
        .filter(|i| options.media_kind.matches(i.media_kind))
        .cloned()
        .collect();

    filtered.sort_by(|a, b| {
        let ord = match options.sort_by {
            SortBy::AddedAt => a.added_at.cmp(&b.added_at),
            SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            // Missing rating sorts as 0.
            SortBy::Rating => a.rating.unwrap_or(0).cmp(&b.rating.unwrap_or(0)),
        };
        match options.sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });

    filtered
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn item(media_id: u64, title: &str, kind: MediaKind) -> SavedItem {
        SavedItem {
            media_id,
            remote_id: None,
            title: title.into(),
            poster_path: None,
            media_kind: kind,
            added_at: Utc::now() + Duration::seconds(media_id as i64),
            watched: false,
            watch_later: false,
            rating: None,
            notes: None,
        }
    }

    #[test]
    fn test_watched_excluded_regardless_of_watch_later() {
        let mut a = item(1, "A", MediaKind::Movie);
        a.watched = true;
        a.watch_later = true;
        let b = item(2, "B", MediaKind::Movie);

        let options = FilterOptions {
            show_watched: false,
            ..Default::default()
        };
        let out = filter_sort(&[a, b], &options);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].media_id, 2);
    }

    #[test]
    fn test_exclusions_compose_with_kind_filter() {
        let mut movie = item(1, "Watched Movie", MediaKind::Movie);
        movie.watched = true;
        let series = item(2, "Unwatched Series", MediaKind::Series);

        let options = FilterOptions {
            show_watched: false,
            media_kind: KindFilter::Movie,
            ..Default::default()
        };
        // The movie is dropped for being watched, the series for its kind.
        assert!(filter_sort(&[movie, series], &options).is_empty());
    }

    #[test]
    fn test_title_sort_case_insensitive() {
        let items = vec![
            item(1, "zebra", MediaKind::Movie),
            item(2, "Apple", MediaKind::Movie),
            item(3, "mango", MediaKind::Movie),
        ];
        let options = FilterOptions {
            sort_by: SortBy::Title,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let out = filter_sort(&items, &options);
        let titles: Vec<&str> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Apple", "mango", "zebra"]);
    }

    #[test]
    fn test_rating_sort_missing_as_zero_is_stable() {
        let mut rated = item(1, "Rated", MediaKind::Movie);
        rated.rating = Some(7);
        let unrated_a = item(2, "First unrated", MediaKind::Movie);
        let unrated_b = item(3, "Second unrated", MediaKind::Movie);

        let options = FilterOptions {
            sort_by: SortBy::Rating,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let out = filter_sort(&[rated, unrated_a, unrated_b], &options);
        // Both unrated items sort as 0, keeping their input order.
        assert_eq!(out[0].media_id, 2);
        assert_eq!(out[1].media_id, 3);
        assert_eq!(out[2].media_id, 1);
    }

    #[test]
    fn test_added_at_desc_is_default() {
        let items = vec![
            item(1, "Old", MediaKind::Movie),
            item(5, "New", MediaKind::Movie),
        ];
        let out = filter_sort(&items, &FilterOptions::default());
        assert_eq!(out[0].media_id, 5);
    }
}
