pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;
pub mod store;

pub use config::{Config, SiteConfig};
pub use error::{FeedRankingError, Result};
pub use models::{Post, ViewTerms};
pub use services::{FeedRanker, KarmaInflationHandle, QueryPlan, ViewResolver};
pub use store::{FeedPage, InMemoryPostStore, PostStore};
