use crate::services::filter_settings::FilterSettings;
use crate::services::time_decay::DecayOverrides;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Approved,
    Rejected,
    Spam,
    Deleted,
}

/// A post as the store sees it. Read-only to the ranking core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub coauthor_user_ids: Vec<String>,
    pub status: PostStatus,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub is_future: bool,
    #[serde(default)]
    pub unlisted: bool,
    /// Shortform container posts are hidden from post lists
    #[serde(default)]
    pub shortform: bool,
    #[serde(default)]
    pub author_is_unreviewed: bool,
    #[serde(default)]
    pub rejected: bool,
    #[serde(default)]
    pub hidden_related_question: bool,
    #[serde(default)]
    pub hide_author: bool,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub question: bool,
    #[serde(default)]
    pub is_event: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub af: bool,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub af_sticky: bool,
    #[serde(default)]
    pub meta_sticky: bool,
    #[serde(default)]
    pub sticky_priority: f64,
    pub base_score: f64,
    pub max_base_score: f64,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub frontpage_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub curated_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_commented_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag_relevance: HashMap<String, f64>,
}

impl Post {
    /// A tag is active on a post when its relevance is positive.
    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tag_relevance.get(tag_id).is_some_and(|r| *r > 0.0)
    }

    pub fn tag_relevance(&self, tag_id: &str) -> f64 {
        self.tag_relevance.get(tag_id).copied().unwrap_or(0.0)
    }

    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.user_id == user_id || self.coauthor_user_ids.iter().any(|id| id == user_id)
    }

    /// Latest sign of life: the newest comment, or the post itself.
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        match self.last_commented_at {
            Some(commented) if commented > self.posted_at => commented,
            _ => self.posted_at,
        }
    }
}

/// Request parameters for a feed view.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTerms {
    pub view: Option<String>,
    pub filter_settings: Option<FilterSettings>,
    #[serde(default, deserialize_with = "lenient_threshold")]
    pub karma_threshold: Option<i64>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
    pub time_field: Option<String>,
    #[serde(default, deserialize_with = "lenient_limit")]
    pub limit: Option<usize>,
    pub sorted_by: Option<String>,
    /// Named selector fragment, e.g. "curated" or "questions"
    pub filter: Option<String>,
    #[serde(default)]
    pub af: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub forum: bool,
    pub user_id: Option<String>,
    pub tag_id: Option<String>,
    pub group_id: Option<String>,
    #[serde(flatten)]
    pub decay: DecayOverrides,
}

/// Karma thresholds arrive as numbers or numeric strings.
fn lenient_threshold<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f.trunc() as i64),
        Some(serde_json::Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Some(f.trunc() as i64),
            _ => {
                warn!(value = %s, "Unparsable karma threshold, ignoring");
                None
            }
        },
        Some(other) => {
            warn!(value = %other, "Unparsable karma threshold, ignoring");
            None
        }
    })
}

/// Page sizes must be positive whole numbers, given as numbers or numeric
/// strings. Anything else leaves the limit unset.
fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = match &raw {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    Ok(match parsed {
        Some(n) if n.is_finite() && n >= 1.0 && n.fract() == 0.0 => Some(n as usize),
        _ => {
            if let Some(value) = raw {
                warn!(value = %value, "Invalid limit, using default");
            }
            None
        }
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A post that passes the baseline predicate.
    pub fn post(id: &str, base_score: f64, posted_at: DateTime<Utc>) -> Post {
        Post {
            id: id.to_string(),
            user_id: "author".to_string(),
            coauthor_user_ids: vec![],
            status: PostStatus::Approved,
            draft: false,
            is_future: false,
            unlisted: false,
            shortform: false,
            author_is_unreviewed: false,
            rejected: false,
            hidden_related_question: false,
            hide_author: false,
            group_id: None,
            question: false,
            is_event: false,
            meta: false,
            af: false,
            sticky: false,
            af_sticky: false,
            meta_sticky: false,
            sticky_priority: 0.0,
            base_score,
            max_base_score: base_score,
            posted_at,
            frontpage_date: Some(posted_at),
            curated_date: None,
            last_commented_at: None,
            tag_relevance: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_view_terms_from_wire() {
        let terms: ViewTerms = serde_json::from_value(json!({
            "view": "magic",
            "karmaThreshold": "30",
            "forum": true,
            "limit": 10,
            "startingAgeHours": 4.0,
            "activityFactor": 0.2,
            "filterSettings": {"personalBlog": "Default", "tags": []}
        }))
        .unwrap();

        assert_eq!(terms.view.as_deref(), Some("magic"));
        assert_eq!(terms.karma_threshold, Some(30));
        assert!(terms.forum);
        assert!(!terms.af);
        assert_eq!(terms.decay.starting_age_hours, Some(4.0));
        assert_eq!(terms.decay.activity_factor, Some(0.2));
        assert!(terms.filter_settings.is_some());
    }

    #[test]
    fn test_bad_threshold_is_ignored() {
        let terms: ViewTerms = serde_json::from_value(json!({"karmaThreshold": "lots"})).unwrap();
        assert_eq!(terms.karma_threshold, None);
        let terms: ViewTerms = serde_json::from_value(json!({"karmaThreshold": -5})).unwrap();
        assert_eq!(terms.karma_threshold, Some(-5));
    }

    #[test]
    fn test_bad_limit_is_ignored() {
        for bad in [json!(-1), json!(0), json!(2.5), json!("ten"), json!(true)] {
            let terms: ViewTerms = serde_json::from_value(json!({"limit": bad})).unwrap();
            assert_eq!(terms.limit, None);
        }
        let terms: ViewTerms = serde_json::from_value(json!({"limit": "10"})).unwrap();
        assert_eq!(terms.limit, Some(10));
        let terms: ViewTerms = serde_json::from_value(json!({"limit": 7})).unwrap();
        assert_eq!(terms.limit, Some(7));
        let terms: ViewTerms = serde_json::from_value(json!({})).unwrap();
        assert_eq!(terms.limit, None);
    }

    #[test]
    fn test_tag_activity() {
        let mut post = fixtures::post("p", 1.0, Utc::now());
        post.tag_relevance.insert("on".to_string(), 3.0);
        post.tag_relevance.insert("off".to_string(), 0.0);
        assert!(post.has_tag("on"));
        assert!(!post.has_tag("off"));
        assert!(!post.has_tag("missing"));
    }
}
