//! Post storage seam.
//!
//! A store executes a compiled [`QueryPlan`]; how it filters and orders is up
//! to the backend. `InMemoryPostStore` evaluates plans directly against posts
//! held in memory and serves tests and the CLI.

use crate::models::Post;
use crate::services::views::sort::compare;
use crate::services::views::{QueryPlan, SyntheticValues};
use async_trait::async_trait;
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::RwLock;
use tracing::debug;

/// One page of results, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub post_ids: Vec<String>,
    /// Synthetic values per returned post, aligned with `post_ids`
    pub synthetic: Vec<SyntheticValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
}

impl FeedPage {
    pub fn len(&self) -> usize {
        self.post_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.post_ids.is_empty()
    }
}

#[async_trait]
pub trait PostStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn execute(&self, plan: &QueryPlan) -> Result<FeedPage, Self::Error>;
}

#[derive(Debug, Default)]
pub struct InMemoryPostStore {
    posts: RwLock<Vec<Post>>,
}

impl InMemoryPostStore {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts: RwLock::new(posts),
        }
    }

    /// Insert or replace by id.
    pub async fn upsert(&self, post: Post) {
        let mut posts = self.posts.write().await;
        match posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => *existing = post,
            None => posts.push(post),
        }
    }

    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    type Error = Infallible;

    async fn execute(&self, plan: &QueryPlan) -> Result<FeedPage, Self::Error> {
        let posts = self.posts.read().await;

        let mut admitted: Vec<(&Post, SyntheticValues)> = posts
            .iter()
            .filter(|p| plan.admits(p))
            .map(|p| (p, plan.synthetic_values(p)))
            .collect();
        let total = admitted.len();

        admitted.sort_by(|a, b| compare(&plan.sort, (a.0, &a.1), (b.0, &b.1)));
        admitted.truncate(plan.limit);

        debug!(
            view = %plan.view,
            scanned = posts.len(),
            matched = total,
            returned = admitted.len(),
            "Executed plan in memory"
        );

        let (post_ids, synthetic) = admitted
            .into_iter()
            .map(|(p, values)| (p.id.clone(), values))
            .unzip();

        Ok(FeedPage {
            post_ids,
            synthetic,
            total_count: Some(total),
        })
    }
}
