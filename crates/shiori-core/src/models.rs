mod progress;
mod saved;
mod title;

pub use progress::{ProgressDraft, ProgressItem, CONTINUE_WATCHING_CAP};
pub use saved::{MediaKind, SavedDraft, SavedItem};
pub use title::{Episode, Season, TitleDetails};
