//! Integration tests: compile view terms, then execute the plan in memory.

use chrono::{DateTime, Duration, TimeZone, Utc};
use feed_ranking::config::{DecayConfig, FeedConfig};
use feed_ranking::services::time_decay::{decay, DecayParams};
use feed_ranking::{
    FeedRanker, InMemoryPostStore, KarmaInflationHandle, Post, PostStore, SiteConfig,
    ViewResolver, ViewTerms,
};
use serde_json::{json, Value};
use std::sync::Arc;

const EPS: f64 = 1e-9;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn resolver() -> ViewResolver {
    ViewResolver::new(
        SiteConfig::default(),
        FeedConfig::default(),
        &DecayConfig::default(),
        KarmaInflationHandle::default(),
    )
}

/// Post on the wire; `overrides` is merged over an approved frontpage post.
fn post(id: &str, overrides: Value) -> Post {
    let mut base = json!({
        "id": id,
        "userId": "author",
        "status": "approved",
        "baseScore": 10.0,
        "maxBaseScore": 10.0,
        "postedAt": now(),
        "frontpageDate": now(),
    });
    if let (Some(obj), Value::Object(extra)) = (base.as_object_mut(), overrides) {
        obj.extend(extra);
    }
    serde_json::from_value(base).unwrap()
}

fn terms(value: Value) -> ViewTerms {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_hard_filters_and_together() {
    let store = InMemoryPostStore::new(vec![
        post(
            "personal-blog",
            json!({"frontpageDate": null, "tagRelevance": {"t1": 5}}),
        ),
        post("frontpage-tagged", json!({"tagRelevance": {"t1": 5}})),
        post("frontpage-untagged", json!({})),
    ]);
    let request = terms(json!({
        "filterSettings": {
            "personalBlog": "Hidden",
            "tags": [{"tagId": "t1", "tagName": "T1", "filterMode": "Required"}]
        }
    }));

    let plan = resolver().compile("magic", &request, now());
    let page = store.execute(&plan).await.unwrap();

    assert_eq!(page.post_ids, vec!["frontpage-tagged"]);
}

#[tokio::test]
async fn test_factor_tag_multiplies_filtered_score() {
    let store = InMemoryPostStore::new(vec![post(
        "p",
        json!({"baseScore": 10.0, "tagRelevance": {"t1": 3}}),
    )]);
    let request = terms(json!({
        "filterSettings": {
            "personalBlog": "Default",
            "tags": [{"tagId": "t1", "tagName": "T1", "filterMode": "x2.0"}]
        }
    }));

    let plan = resolver().compile("magic", &request, now());
    let page = store.execute(&plan).await.unwrap();
    let d0 = decay(now(), now(), &DecayParams::default());

    let score = page.synthetic[0].filtered_score.unwrap();
    assert!((score - 20.0 / d0).abs() < EPS);
}

#[tokio::test]
async fn test_no_settings_ranks_by_base_score() {
    let store = InMemoryPostStore::new(vec![
        post("old", json!({"baseScore": 50.0, "postedAt": now() - Duration::days(30)})),
        post("new", json!({"baseScore": 5.0})),
    ]);

    let plan = resolver().compile("magic", &ViewTerms::default(), now());
    let page = store.execute(&plan).await.unwrap();

    assert_eq!(page.post_ids, vec!["old", "new"]);
    assert_eq!(page.synthetic[0].filtered_score, Some(50.0));
    assert_eq!(page.synthetic[1].filtered_score, Some(5.0));
}

#[tokio::test]
async fn test_sticky_priority_beats_score_in_forum() {
    let store = InMemoryPostStore::new(vec![
        post("plain", json!({"baseScore": 500.0})),
        post("sticky-5", json!({"sticky": true, "stickyPriority": 5, "baseScore": 100.0})),
        post("sticky-10", json!({"sticky": true, "stickyPriority": 10, "baseScore": 1.0})),
    ]);

    let plan = resolver().compile("top", &terms(json!({"forum": true})), now());
    let page = store.execute(&plan).await.unwrap();

    assert_eq!(page.post_ids, vec!["sticky-10", "sticky-5", "plain"]);
}

#[tokio::test]
async fn test_ranker_fetch_with_scoping_terms() {
    let store = Arc::new(InMemoryPostStore::new(vec![
        post("mine", json!({"userId": "u1", "postedAt": now() - Duration::hours(1)})),
        post("coauthored", json!({"coauthorUserIds": ["u1"]})),
        post("hidden-author", json!({"userId": "u1", "hideAuthor": true})),
        post("other", json!({"userId": "u2"})),
    ]));
    let ranker = FeedRanker::new(Arc::new(resolver()), store);

    let page = ranker
        .fetch("new", &terms(json!({"userId": "u1"})), now())
        .await
        .unwrap();

    assert_eq!(page.post_ids, vec!["coauthored", "mine"]);
}

#[tokio::test]
async fn test_request_view_and_limit_from_terms() {
    let posts = (0..30)
        .map(|i| post(&format!("p{i:02}"), json!({"postedAt": now() - Duration::hours(i)})))
        .collect();
    let store = InMemoryPostStore::new(posts);

    let plan = resolver().compile_request(&terms(json!({"view": "userPosts"})), now());
    let page = store.execute(&plan).await.unwrap();
    assert_eq!(page.post_ids, vec!["p00", "p01", "p02", "p03", "p04"]);
    assert_eq!(page.total_count, Some(30));

    let plan = resolver().compile_request(&terms(json!({"view": "old", "limit": 2})), now());
    let page = store.execute(&plan).await.unwrap();
    assert_eq!(page.post_ids, vec!["p29", "p28"]);
}
