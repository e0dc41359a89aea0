//! Live news feed: per-subscriber timers pushing random stories.

pub mod broadcaster;
pub mod events;
pub mod subscription;

pub use broadcaster::{pick, FeedBroadcaster, FeedConfig, FeedStream};
pub use events::{FeedEvent, NEWS_UPDATE};
pub use subscription::{Subscription, SubscriptionState};
