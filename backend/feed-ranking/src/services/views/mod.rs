//! View Resolver
//!
//! Compiles a named view plus request terms into a [`QueryPlan`]: a selector,
//! a sort order, synthetic ranking fields and a page size.
//!
//! # Composition
//! 1. Baseline predicate (approved, published, reviewed, not grouped ...)
//! 2. Request scoping (author, af/meta, karma threshold, named filter, time window)
//! 3. Hard filter-setting predicates (`Required`/`Hidden` tags, personal blog)
//! 4. View selector fragment
//! 5. Sort: recognized `sortedBy`, else the view's default, sticky keys first
//!    in forum listings, post id last
//!
//! All clauses are ANDed. Conflicting hard filters legitimately produce an
//! empty page. Unknown view, sort, filter and time-field names are logged and
//! contribute nothing.

pub mod plan;
pub mod predicate;
pub mod registry;
pub mod sort;

pub use plan::{QueryPlan, SyntheticFields, SyntheticValues};
pub use predicate::{Conjunction, FlagField, Predicate, ScoreField, TimeField};
pub use registry::{named_filter, ViewDefinition, ViewRegistry};
pub use sort::{named_sorting, with_stickies, SortDirection, SortKey, SortTerm};

use crate::config::{DecayConfig, FeedConfig, SiteConfig};
use crate::models::{PostStatus, ViewTerms};
use crate::services::filter_mode::{FilterMode, TagDefaults};
use crate::services::filter_settings::{merge_suggested_tags, FilterSettings};
use crate::services::karma_inflation::KarmaInflationHandle;
use crate::services::scoring::ScoreCompositor;
use crate::services::time_decay::{ActivityParams, DecayParams, TimeDecayModel};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// View name that adds nothing beyond the baseline.
pub const DEFAULT_VIEW: &str = "default";

/// Karma thresholds below this are clamped
pub const MAX_LOW_KARMA_THRESHOLD: i64 = -1000;

pub struct ViewResolver {
    registry: ViewRegistry,
    site: SiteConfig,
    tag_defaults: TagDefaults,
    feed: FeedConfig,
    decay_defaults: DecayParams,
    activity_fallback: ActivityParams,
    inflation: KarmaInflationHandle,
}

impl ViewResolver {
    pub fn new(
        site: SiteConfig,
        feed: FeedConfig,
        decay: &DecayConfig,
        inflation: KarmaInflationHandle,
    ) -> Self {
        Self {
            registry: ViewRegistry::builtin(),
            tag_defaults: site.tag_defaults(),
            site,
            feed,
            decay_defaults: decay.params(),
            activity_fallback: decay.activity(),
            inflation,
        }
    }

    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    /// Compile using the view named in the terms, or the default view.
    pub fn compile_request(&self, terms: &ViewTerms, now: DateTime<Utc>) -> QueryPlan {
        let view_name = terms.view.as_deref().unwrap_or(DEFAULT_VIEW);
        self.compile(view_name, terms, now)
    }

    pub fn compile(&self, view_name: &str, terms: &ViewTerms, now: DateTime<Utc>) -> QueryPlan {
        let definition = self.registry.get(view_name);
        if definition.is_none() && view_name != DEFAULT_VIEW {
            warn!(view = %view_name, "Unknown view, compiling baseline only");
        }

        let settings = terms
            .filter_settings
            .as_ref()
            .map(|s| merge_suggested_tags(&s.clone().deduplicated(), &self.site.suggested_tags));

        let mut selector = Conjunction::new();
        selector.extend(baseline(terms));
        selector.extend(scoping(terms));
        if let Some(threshold) = karma_threshold(terms) {
            selector.extend(threshold);
        }
        if let Some(name) = terms.filter.as_deref() {
            match named_filter(name) {
                Some(clauses) => {
                    selector.extend(clauses);
                }
                None => warn!(filter = %name, view = %view_name, "Unknown filter, ignoring"),
            }
        }
        if let Some(window) = time_window(terms) {
            selector.and(window);
        }
        if let Some(settings) = &settings {
            selector.extend(hard_predicates(settings, &self.tag_defaults));
        }
        if let Some(definition) = definition {
            selector.extend(definition.selector(terms));
        }

        let sort = self.sort_for(view_name, definition, terms);

        let wants = |key: &SortKey| sort.iter().any(|t| &t.key == key);
        let filtered_score = (settings.is_some() || wants(&SortKey::FilteredScore)).then(|| {
            ScoreCompositor::new(
                settings.as_ref(),
                &self.tag_defaults,
                self.site.global_score_modifiers.clone(),
                TimeDecayModel::new(
                    self.decay_defaults
                        .with_overrides(&terms.decay, self.activity_fallback),
                ),
            )
        });
        let karma_inflation_adjusted_score = wants(&SortKey::KarmaInflationAdjustedScore)
            .then(|| self.inflation.snapshot());

        let limit = terms
            .limit
            .filter(|l| *l > 0)
            .or_else(|| definition.and_then(|d| d.default_limit))
            .unwrap_or(self.feed.default_limit)
            .clamp(1, self.feed.max_limit.max(1));

        let plan = QueryPlan {
            view: view_name.to_string(),
            selector: selector.build(),
            sort,
            synthetic_fields: SyntheticFields {
                filtered_score,
                karma_inflation_adjusted_score,
            },
            limit,
            index_hint: definition.and_then(|d| d.index_hint),
            evaluated_at: now,
        };

        debug!(
            view = %plan.view,
            clauses = plan.selector.clause_count(),
            sort_keys = plan.sort.len(),
            limit = plan.limit,
            "Compiled view"
        );

        plan
    }

    fn sort_for(
        &self,
        view_name: &str,
        definition: Option<&ViewDefinition>,
        terms: &ViewTerms,
    ) -> Vec<SortTerm> {
        let requested = terms.sorted_by.as_deref().and_then(|name| {
            let sorting = named_sorting(name);
            if sorting.is_none() {
                warn!(sorted_by = %name, view = %view_name, "Unknown sort, ignoring");
            }
            sorting
        });

        let mut sort = requested
            .or_else(|| definition.and_then(|d| d.default_sort(terms)))
            .unwrap_or_default();

        if let Some(flag) = sticky_flag(terms) {
            sort = with_stickies(flag, sort);
        }
        sort.push(SortTerm::asc(SortKey::Id));
        sort
    }
}

/// Clauses every view starts from.
fn baseline(terms: &ViewTerms) -> Vec<Predicate> {
    vec![
        Predicate::Status {
            status: PostStatus::Approved,
        },
        Predicate::flag(FlagField::Draft, false),
        Predicate::flag(FlagField::IsFuture, false),
        Predicate::flag(FlagField::Unlisted, false),
        Predicate::flag(FlagField::Shortform, false),
        Predicate::flag(FlagField::AuthorIsUnreviewed, false),
        Predicate::flag(FlagField::Rejected, false),
        Predicate::flag(FlagField::HiddenRelatedQuestion, false),
        // A group scope narrows to that group instead of ungrouped posts
        Predicate::Group {
            group_id: terms.group_id.clone(),
        },
    ]
}

fn scoping(terms: &ViewTerms) -> Vec<Predicate> {
    let mut clauses = Vec::new();
    if let Some(user_id) = &terms.user_id {
        clauses.push(Predicate::AuthoredBy {
            user_id: user_id.clone(),
        });
        clauses.push(Predicate::flag(FlagField::HideAuthor, false));
    }
    if terms.af {
        clauses.push(Predicate::flag(FlagField::Af, true));
    }
    if terms.meta {
        clauses.push(Predicate::flag(FlagField::Meta, true));
    }
    clauses
}

fn karma_threshold(terms: &ViewTerms) -> Option<Vec<Predicate>> {
    let threshold = terms.karma_threshold.filter(|k| *k != 0)?;
    let value = threshold.max(MAX_LOW_KARMA_THRESHOLD) as f64;
    Some(vec![
        Predicate::AtLeast {
            field: ScoreField::BaseScore,
            value,
        },
        Predicate::AtLeast {
            field: ScoreField::MaxBaseScore,
            value,
        },
    ])
}

fn time_window(terms: &ViewTerms) -> Option<Predicate> {
    if terms.after.is_none() && terms.before.is_none() {
        return None;
    }
    let field = match terms.time_field.as_deref() {
        None => TimeField::PostedAt,
        Some(raw) => TimeField::parse(raw).unwrap_or_else(|| {
            warn!(time_field = %raw, "Unknown time field, using postedAt");
            TimeField::PostedAt
        }),
    };
    Some(Predicate::Within {
        field,
        after: terms.after,
        before: terms.before,
    })
}

/// `Required` tags must be active, `Hidden` tags must not be; the personal
/// blog mode requires or forbids a frontpage date.
pub fn hard_predicates(settings: &FilterSettings, defaults: &TagDefaults) -> Vec<Predicate> {
    let mut clauses: Vec<Predicate> = settings
        .effective_tags(defaults)
        .filter_map(|(tag_id, mode)| match mode {
            FilterMode::Required => Some(Predicate::TagActive {
                tag_id: tag_id.to_string(),
            }),
            FilterMode::Hidden => Some(Predicate::TagInactive {
                tag_id: tag_id.to_string(),
            }),
            _ => None,
        })
        .collect();

    match settings.effective_personal_blog() {
        FilterMode::Hidden => clauses.push(Predicate::HasDate {
            field: TimeField::FrontpageDate,
        }),
        FilterMode::Required => clauses.push(Predicate::LacksDate {
            field: TimeField::FrontpageDate,
        }),
        _ => {}
    }
    clauses
}

/// Sticky column for the listing context; first match wins.
fn sticky_flag(terms: &ViewTerms) -> Option<SortKey> {
    if !terms.forum {
        None
    } else if terms.af {
        Some(SortKey::AfSticky)
    } else if terms.meta {
        Some(SortKey::MetaSticky)
    } else {
        Some(SortKey::Sticky)
    }
}
