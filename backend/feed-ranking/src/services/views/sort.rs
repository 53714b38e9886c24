//! Sort keys and named sortings.

use super::plan::SyntheticValues;
use crate::models::Post;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SortKey {
    Sticky,
    AfSticky,
    MetaSticky,
    StickyPriority,
    BaseScore,
    PostedAt,
    LastCommentedAt,
    CuratedDate,
    FrontpageDate,
    TagRelevance { tag_id: String },
    /// Synthetic, computed per request
    FilteredScore,
    /// Synthetic, computed per request
    KarmaInflationAdjustedScore,
    /// Final tie-break on post id
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortTerm {
    #[serde(flatten)]
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortTerm {
    pub fn desc(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Desc,
        }
    }

    pub fn asc(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Asc,
        }
    }
}

/// Named sortings accepted as `sortedBy`. `None` for unknown names.
pub fn named_sorting(name: &str) -> Option<Vec<SortTerm>> {
    let terms = match name {
        "magic" => vec![SortTerm::desc(SortKey::FilteredScore)],
        "top" => vec![SortTerm::desc(SortKey::BaseScore)],
        "topAdjusted" => vec![SortTerm::desc(SortKey::KarmaInflationAdjustedScore)],
        "new" => vec![SortTerm::desc(SortKey::PostedAt)],
        "old" => vec![SortTerm::asc(SortKey::PostedAt)],
        "recentComments" => vec![SortTerm::desc(SortKey::LastCommentedAt)],
        _ => return None,
    };
    Some(terms)
}

/// Prepend the sticky keys for the listing context, dropping later duplicates.
pub fn with_stickies(sticky_flag: SortKey, sort: Vec<SortTerm>) -> Vec<SortTerm> {
    let mut out = vec![
        SortTerm::desc(sticky_flag),
        SortTerm::desc(SortKey::StickyPriority),
    ];
    for term in sort {
        if !out.iter().any(|t| t.key == term.key) {
            out.push(term);
        }
    }
    out
}

/// Single sortable value. `Missing` orders below everything, like a null.
#[derive(Debug, Clone, PartialEq)]
enum SortValue<'a> {
    Missing,
    Bool(bool),
    Number(f64),
    Time(DateTime<Utc>),
    Text(&'a str),
}

impl SortValue<'_> {
    fn rank(&self) -> u8 {
        match self {
            SortValue::Missing => 0,
            SortValue::Bool(_) => 1,
            SortValue::Number(_) => 2,
            SortValue::Time(_) => 3,
            SortValue::Text(_) => 4,
        }
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Bool(a), SortValue::Bool(b)) => a.cmp(b),
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Time(a), SortValue::Time(b)) => a.cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn value_of<'a>(key: &SortKey, post: &'a Post, synthetic: &SyntheticValues) -> SortValue<'a> {
    let opt_time = |t: Option<DateTime<Utc>>| t.map_or(SortValue::Missing, SortValue::Time);
    // Non-finite scores rank as missing
    let opt_num = |n: Option<f64>| {
        n.filter(|v| v.is_finite())
            .map_or(SortValue::Missing, SortValue::Number)
    };
    match key {
        SortKey::Sticky => SortValue::Bool(post.sticky),
        SortKey::AfSticky => SortValue::Bool(post.af_sticky),
        SortKey::MetaSticky => SortValue::Bool(post.meta_sticky),
        SortKey::StickyPriority => SortValue::Number(post.sticky_priority),
        SortKey::BaseScore => SortValue::Number(post.base_score),
        SortKey::PostedAt => SortValue::Time(post.posted_at),
        SortKey::LastCommentedAt => opt_time(post.last_commented_at),
        SortKey::CuratedDate => opt_time(post.curated_date),
        SortKey::FrontpageDate => opt_time(post.frontpage_date),
        SortKey::TagRelevance { tag_id } => SortValue::Number(post.tag_relevance(tag_id)),
        SortKey::FilteredScore => opt_num(synthetic.filtered_score),
        SortKey::KarmaInflationAdjustedScore => opt_num(synthetic.karma_inflation_adjusted_score),
        SortKey::Id => SortValue::Text(&post.id),
    }
}

/// Compare two posts under a sort order.
pub fn compare(
    sort: &[SortTerm],
    a: (&Post, &SyntheticValues),
    b: (&Post, &SyntheticValues),
) -> Ordering {
    for term in sort {
        let left = value_of(&term.key, a.0, a.1);
        let right = value_of(&term.key, b.0, b.1);
        let ord = left.total_cmp(&right);
        let ord = match term.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
