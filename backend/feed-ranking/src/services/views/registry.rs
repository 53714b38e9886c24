//! Static registry of named post views and selector filters.
//!
//! Each view contributes a selector fragment, a default sort and an index hint
//! on top of the baseline predicate. Nothing here can remove baseline clauses.

use super::predicate::{FlagField, Predicate, ScoreField, TimeField};
use super::sort::{named_sorting, SortKey, SortTerm};
use crate::models::ViewTerms;
use std::collections::HashMap;

type SelectorFn = fn(&ViewTerms) -> Vec<Predicate>;
type SortFn = fn(&ViewTerms) -> Vec<SortTerm>;

#[derive(Clone, Copy)]
pub struct ViewDefinition {
    pub name: &'static str,
    selector: SelectorFn,
    sort: Option<SortFn>,
    pub default_limit: Option<usize>,
    pub index_hint: Option<&'static str>,
}

impl ViewDefinition {
    pub fn selector(&self, terms: &ViewTerms) -> Vec<Predicate> {
        (self.selector)(terms)
    }

    pub fn default_sort(&self, terms: &ViewTerms) -> Option<Vec<SortTerm>> {
        self.sort.map(|f| f(terms))
    }
}

impl std::fmt::Debug for ViewDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewDefinition")
            .field("name", &self.name)
            .field("has_sort", &self.sort.is_some())
            .field("default_limit", &self.default_limit)
            .field("index_hint", &self.index_hint)
            .finish()
    }
}

fn no_selector(_: &ViewTerms) -> Vec<Predicate> {
    Vec::new()
}

fn has(field: TimeField) -> Predicate {
    Predicate::HasDate { field }
}

fn named(name: &str) -> Vec<SortTerm> {
    named_sorting(name).unwrap_or_default()
}

fn view(
    name: &'static str,
    selector: SelectorFn,
    sort: SortFn,
    index_hint: Option<&'static str>,
) -> ViewDefinition {
    ViewDefinition {
        name,
        selector,
        sort: Some(sort),
        default_limit: None,
        index_hint,
    }
}

/// A view that only narrows the selector and leaves ordering to `sortedBy`.
fn unsorted(name: &'static str, selector: SelectorFn, index_hint: Option<&'static str>) -> ViewDefinition {
    ViewDefinition {
        name,
        selector,
        sort: None,
        default_limit: None,
        index_hint,
    }
}

fn builtin_views() -> Vec<ViewDefinition> {
    vec![
        view("magic", no_selector, |_| named("magic"), Some("posts.score")),
        view("top", no_selector, |_| named("top"), Some("posts.stickies_baseScore")),
        view(
            "topAdjusted",
            no_selector,
            |_| named("topAdjusted"),
            Some("posts.stickies_baseScore"),
        ),
        view("new", no_selector, |_| named("new"), Some("posts.stickies_postedAt")),
        view("old", no_selector, |_| named("old"), Some("posts.stickies_postedAt")),
        view("recentComments", no_selector, |_| named("recentComments"), None),
        unsorted("timeframe", no_selector, Some("posts.postedAt_baseScore")),
        view(
            "daily",
            no_selector,
            |_| vec![SortTerm::desc(SortKey::BaseScore)],
            Some("posts.postedAt_baseScore"),
        ),
        view(
            "tagRelevance",
            |terms| {
                terms
                    .tag_id
                    .iter()
                    .map(|tag_id| Predicate::TagActive {
                        tag_id: tag_id.clone(),
                    })
                    .collect()
            },
            |terms| match &terms.tag_id {
                Some(tag_id) => vec![
                    SortTerm::desc(SortKey::TagRelevance {
                        tag_id: tag_id.clone(),
                    }),
                    SortTerm::desc(SortKey::BaseScore),
                ],
                None => vec![SortTerm::desc(SortKey::BaseScore)],
            },
            Some("posts.tagRelevance"),
        ),
        view(
            "frontpage",
            |_| vec![has(TimeField::FrontpageDate)],
            |_| {
                vec![
                    SortTerm::desc(SortKey::Sticky),
                    SortTerm::desc(SortKey::StickyPriority),
                    SortTerm::desc(SortKey::FilteredScore),
                ]
            },
            Some("posts.frontpage"),
        ),
        view(
            "frontpage-rss",
            |_| vec![has(TimeField::FrontpageDate)],
            |_| {
                vec![
                    SortTerm::desc(SortKey::FrontpageDate),
                    SortTerm::desc(SortKey::PostedAt),
                ]
            },
            Some("posts.frontpage"),
        ),
        view(
            "curated",
            |_| vec![has(TimeField::CuratedDate)],
            |_| {
                vec![
                    SortTerm::desc(SortKey::Sticky),
                    SortTerm::desc(SortKey::CuratedDate),
                    SortTerm::desc(SortKey::PostedAt),
                ]
            },
            Some("posts.curated"),
        ),
        view(
            "curated-rss",
            |_| vec![has(TimeField::CuratedDate)],
            |_| {
                vec![
                    SortTerm::desc(SortKey::CuratedDate),
                    SortTerm::desc(SortKey::PostedAt),
                ]
            },
            Some("posts.curated"),
        ),
        view(
            "community",
            |_| {
                vec![
                    Predicate::LacksDate {
                        field: TimeField::FrontpageDate,
                    },
                    Predicate::flag(FlagField::IsEvent, false),
                ]
            },
            |_| {
                vec![
                    SortTerm::desc(SortKey::Sticky),
                    SortTerm::desc(SortKey::FilteredScore),
                ]
            },
            Some("posts.community"),
        ),
        view("community-rss", community_rss_selector, |_| named("new"), None),
        view("rss", community_rss_selector, |_| named("new"), None),
        view(
            "meta-rss",
            |_| vec![Predicate::flag(FlagField::Meta, true)],
            |_| named("new"),
            None,
        ),
        view(
            "topQuestions",
            |_| {
                vec![
                    Predicate::flag(FlagField::Question, true),
                    Predicate::AtLeast {
                        field: ScoreField::BaseScore,
                        value: 40.0,
                    },
                ]
            },
            |_| named("recentComments"),
            Some("posts.topQuestions"),
        ),
        view(
            "recentQuestionActivity",
            |_| vec![Predicate::flag(FlagField::Question, true)],
            |_| named("recentComments"),
            Some("posts.topQuestions"),
        ),
        ViewDefinition {
            default_limit: Some(5),
            ..view(
                "userPosts",
                |terms| {
                    terms
                        .user_id
                        .iter()
                        .map(|user_id| Predicate::AuthoredBy {
                            user_id: user_id.clone(),
                        })
                        .collect()
                },
                |_| named("new"),
                Some("posts.userId_postedAt"),
            )
        },
    ]
}

fn community_rss_selector(_: &ViewTerms) -> Vec<Predicate> {
    vec![
        Predicate::LacksDate {
            field: TimeField::FrontpageDate,
        },
        Predicate::Above {
            field: ScoreField::MaxBaseScore,
            value: 2.0,
        },
    ]
}

/// Selector fragment for a named `filter` term. `None` for unknown names.
pub fn named_filter(name: &str) -> Option<Vec<Predicate>> {
    let clauses = match name {
        "curated" => vec![has(TimeField::CuratedDate)],
        "nonSticky" => vec![Predicate::flag(FlagField::Sticky, false)],
        "frontpage" => vec![has(TimeField::FrontpageDate)],
        "questions" => vec![Predicate::flag(FlagField::Question, true)],
        "events" => vec![Predicate::flag(FlagField::IsEvent, true)],
        "meta" => vec![Predicate::flag(FlagField::Meta, true)],
        "untagged" => vec![Predicate::Untagged],
        "tagged" => vec![Predicate::Tagged],
        // The baseline already excludes group posts
        "all" | "includeMetaAndPersonal" => Vec::new(),
        _ => return None,
    };
    Some(clauses)
}

/// Name → definition map, built once at startup.
#[derive(Debug, Clone)]
pub struct ViewRegistry {
    views: HashMap<&'static str, ViewDefinition>,
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ViewRegistry {
    pub fn builtin() -> Self {
        Self {
            views: builtin_views().into_iter().map(|v| (v.name, v)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ViewDefinition> {
        self.views.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.views.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_feed_views() {
        let registry = ViewRegistry::builtin();
        for name in ["magic", "top", "topAdjusted", "new", "frontpage", "userPosts", "rss"] {
            assert!(registry.get(name).is_some(), "missing view {name}");
        }
        assert!(registry.get("drafts").is_none());
    }

    #[test]
    fn test_tag_relevance_view_uses_tag() {
        let registry = ViewRegistry::builtin();
        let view = registry.get("tagRelevance").unwrap();
        let terms = ViewTerms {
            tag_id: Some("t1".to_string()),
            ..ViewTerms::default()
        };
        assert_eq!(
            view.selector(&terms),
            vec![Predicate::TagActive {
                tag_id: "t1".to_string()
            }]
        );
        let sort = view.default_sort(&terms).unwrap();
        assert_eq!(
            sort[0].key,
            SortKey::TagRelevance {
                tag_id: "t1".to_string()
            }
        );
    }

    #[test]
    fn test_user_posts_default_limit() {
        let registry = ViewRegistry::builtin();
        assert_eq!(registry.get("userPosts").unwrap().default_limit, Some(5));
        assert_eq!(registry.get("magic").unwrap().default_limit, None);
    }

    #[test]
    fn test_named_filters() {
        assert_eq!(named_filter("untagged"), Some(vec![Predicate::Untagged]));
        assert_eq!(named_filter("all"), Some(vec![]));
        assert!(named_filter("unknown").is_none());
    }
}
