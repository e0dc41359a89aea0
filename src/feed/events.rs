// src/feed/events.rs
use serde::Serialize;

/// Event name carried by every tick of the news feed.
pub const NEWS_UPDATE: &str = "news-update";

/// Envelope pushed to a subscriber on each tick.
///
/// Serializes as `{"event":"news-update","story":<story>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEvent<T> {
    pub event: &'static str,
    pub story: T,
}

impl<T> FeedEvent<T> {
    pub fn news_update(story: T) -> Self {
        Self {
            event: NEWS_UPDATE,
            story,
        }
    }
}
