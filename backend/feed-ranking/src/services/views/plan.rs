use super::predicate::Predicate;
use super::sort::SortTerm;
use crate::models::Post;
use crate::services::karma_inflation::KarmaInflationSeries;
use crate::services::scoring::ScoreCompositor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Per-request computed fields. Never stored on the post.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_score: Option<ScoreCompositor>,
    /// Snapshot of the inflation series taken at compile time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub karma_inflation_adjusted_score: Option<Arc<KarmaInflationSeries>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub karma_inflation_adjusted_score: Option<f64>,
}

impl SyntheticFields {
    pub fn is_empty(&self) -> bool {
        self.filtered_score.is_none() && self.karma_inflation_adjusted_score.is_none()
    }

    pub fn evaluate(&self, post: &Post, now: DateTime<Utc>) -> SyntheticValues {
        SyntheticValues {
            filtered_score: self
                .filtered_score
                .as_ref()
                .map(|c| c.filtered_score(post, now)),
            karma_inflation_adjusted_score: self
                .karma_inflation_adjusted_score
                .as_ref()
                .map(|series| series.adjust(post.base_score, post.posted_at)),
        }
    }
}

/// Compiled query for one feed request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    pub view: String,
    pub selector: Predicate,
    pub sort: Vec<SortTerm>,
    pub synthetic_fields: SyntheticFields,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_hint: Option<&'static str>,
    /// Clock used for every decay computation in this plan
    pub evaluated_at: DateTime<Utc>,
}

impl QueryPlan {
    pub fn admits(&self, post: &Post) -> bool {
        self.selector.matches(post)
    }

    pub fn synthetic_values(&self, post: &Post) -> SyntheticValues {
        self.synthetic_fields.evaluate(post, self.evaluated_at)
    }
}
