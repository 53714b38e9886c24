pub mod feed_ranker;
pub mod filter_mode;
pub mod filter_settings;
pub mod karma_inflation;
pub mod scoring;
pub mod time_decay;
pub mod views;

pub use feed_ranker::FeedRanker;
pub use filter_mode::{FilterMode, TagDefaults};
pub use filter_settings::{FilterSettings, FilterTag, SuggestedTag};
pub use karma_inflation::{KarmaInflationHandle, KarmaInflationSeries};
pub use scoring::{GlobalScoreModifier, ScoreCompositor};
pub use time_decay::{DecayParams, TimeDecayModel};
pub use views::{QueryPlan, ViewResolver};
