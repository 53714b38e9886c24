use crate::models::ViewTerms;
use crate::services::views::{QueryPlan, ViewResolver};
use crate::store::{FeedPage, PostStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Compile-then-execute facade over a [`PostStore`].
pub struct FeedRanker<S> {
    resolver: Arc<ViewResolver>,
    store: Arc<S>,
}

impl<S> Clone for FeedRanker<S> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: PostStore> FeedRanker<S> {
    pub fn new(resolver: Arc<ViewResolver>, store: Arc<S>) -> Self {
        Self { resolver, store }
    }

    pub fn plan(&self, view: &str, terms: &ViewTerms, now: DateTime<Utc>) -> QueryPlan {
        self.resolver.compile(view, terms, now)
    }

    /// Store errors are returned as-is.
    pub async fn fetch(
        &self,
        view: &str,
        terms: &ViewTerms,
        now: DateTime<Utc>,
    ) -> Result<FeedPage, S::Error> {
        let start = Instant::now();
        let plan = self.plan(view, terms, now);
        let page = self.store.execute(&plan).await?;

        info!(
            view = %view,
            returned = page.len(),
            limit = plan.limit,
            duration_ms = start.elapsed().as_millis(),
            "Feed fetched"
        );

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DecayConfig, FeedConfig, SiteConfig};
    use crate::models::fixtures;
    use crate::services::karma_inflation::KarmaInflationHandle;
    use crate::store::InMemoryPostStore;
    use async_trait::async_trait;

    fn resolver() -> Arc<ViewResolver> {
        Arc::new(ViewResolver::new(
            SiteConfig::default(),
            FeedConfig::default(),
            &DecayConfig::default(),
            KarmaInflationHandle::default(),
        ))
    }

    #[derive(Debug, thiserror::Error)]
    #[error("store offline")]
    struct Offline;

    struct OfflineStore;

    #[async_trait]
    impl PostStore for OfflineStore {
        type Error = Offline;

        async fn execute(&self, _plan: &QueryPlan) -> Result<FeedPage, Self::Error> {
            Err(Offline)
        }
    }

    #[tokio::test]
    async fn test_fetch_runs_plan_against_store() {
        let now = Utc::now();
        let store = Arc::new(InMemoryPostStore::new(vec![
            fixtures::post("old", 5.0, now - chrono::Duration::days(2)),
            fixtures::post("fresh", 5.0, now),
        ]));
        let ranker = FeedRanker::new(resolver(), store);

        let page = ranker.fetch("new", &ViewTerms::default(), now).await.unwrap();
        assert_eq!(page.post_ids, vec!["fresh", "old"]);
    }

    #[tokio::test]
    async fn test_store_error_passes_through() {
        let ranker = FeedRanker::new(resolver(), Arc::new(OfflineStore));
        let err = ranker
            .fetch("magic", &ViewTerms::default(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "store offline");
    }
}
