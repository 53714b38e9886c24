//! Selector AST handed to the store.
//!
//! Serializes to a tagged JSON form the storage adapter translates into its own
//! query language; `matches` is the reference semantics used by the in-memory
//! store.

use crate::models::{Post, PostStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlagField {
    Draft,
    IsFuture,
    Unlisted,
    Shortform,
    AuthorIsUnreviewed,
    Rejected,
    HiddenRelatedQuestion,
    HideAuthor,
    Question,
    IsEvent,
    Meta,
    Af,
    Sticky,
}

impl FlagField {
    fn read(self, post: &Post) -> bool {
        match self {
            FlagField::Draft => post.draft,
            FlagField::IsFuture => post.is_future,
            FlagField::Unlisted => post.unlisted,
            FlagField::Shortform => post.shortform,
            FlagField::AuthorIsUnreviewed => post.author_is_unreviewed,
            FlagField::Rejected => post.rejected,
            FlagField::HiddenRelatedQuestion => post.hidden_related_question,
            FlagField::HideAuthor => post.hide_author,
            FlagField::Question => post.question,
            FlagField::IsEvent => post.is_event,
            FlagField::Meta => post.meta,
            FlagField::Af => post.af,
            FlagField::Sticky => post.sticky,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreField {
    BaseScore,
    MaxBaseScore,
}

impl ScoreField {
    fn read(self, post: &Post) -> f64 {
        match self {
            ScoreField::BaseScore => post.base_score,
            ScoreField::MaxBaseScore => post.max_base_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeField {
    PostedAt,
    FrontpageDate,
    CuratedDate,
    LastCommentedAt,
}

impl TimeField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "postedAt" => Some(TimeField::PostedAt),
            "frontpageDate" => Some(TimeField::FrontpageDate),
            "curatedDate" => Some(TimeField::CuratedDate),
            "lastCommentedAt" => Some(TimeField::LastCommentedAt),
            _ => None,
        }
    }

    pub(crate) fn read(self, post: &Post) -> Option<DateTime<Utc>> {
        match self {
            TimeField::PostedAt => Some(post.posted_at),
            TimeField::FrontpageDate => post.frontpage_date,
            TimeField::CuratedDate => post.curated_date,
            TimeField::LastCommentedAt => post.last_commented_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Predicate {
    Status { status: PostStatus },
    Flag { field: FlagField, value: bool },
    /// `None` selects posts with no owning group
    Group { group_id: Option<String> },
    AuthoredBy { user_id: String },
    AtLeast { field: ScoreField, value: f64 },
    Above { field: ScoreField, value: f64 },
    /// Exclusive bounds; a missing date never matches
    Within {
        field: TimeField,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    },
    HasDate { field: TimeField },
    LacksDate { field: TimeField },
    TagActive { tag_id: String },
    TagInactive { tag_id: String },
    Tagged,
    Untagged,
    All { clauses: Vec<Predicate> },
}

impl Predicate {
    pub fn flag(field: FlagField, value: bool) -> Self {
        Predicate::Flag { field, value }
    }

    pub fn matches(&self, post: &Post) -> bool {
        match self {
            Predicate::Status { status } => post.status == *status,
            Predicate::Flag { field, value } => field.read(post) == *value,
            Predicate::Group { group_id } => post.group_id == *group_id,
            Predicate::AuthoredBy { user_id } => post.is_authored_by(user_id),
            Predicate::AtLeast { field, value } => field.read(post) >= *value,
            Predicate::Above { field, value } => field.read(post) > *value,
            Predicate::Within {
                field,
                after,
                before,
            } => match field.read(post) {
                Some(t) => after.map_or(true, |a| t > a) && before.map_or(true, |b| t < b),
                None => false,
            },
            Predicate::HasDate { field } => field.read(post).is_some(),
            Predicate::LacksDate { field } => field.read(post).is_none(),
            Predicate::TagActive { tag_id } => post.has_tag(tag_id),
            Predicate::TagInactive { tag_id } => !post.has_tag(tag_id),
            Predicate::Tagged => !post.tag_relevance.is_empty(),
            Predicate::Untagged => post.tag_relevance.is_empty(),
            Predicate::All { clauses } => clauses.iter().all(|c| c.matches(post)),
        }
    }

    pub fn clause_count(&self) -> usize {
        match self {
            Predicate::All { clauses } => clauses.iter().map(Predicate::clause_count).sum(),
            _ => 1,
        }
    }
}

/// Conjunction builder. Clauses only accumulate; nothing is ever replaced.
#[derive(Debug, Clone, Default)]
pub struct Conjunction {
    clauses: Vec<Predicate>,
}

impl Conjunction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(&mut self, predicate: Predicate) -> &mut Self {
        match predicate {
            Predicate::All { clauses } => self.clauses.extend(clauses),
            other => self.clauses.push(other),
        }
        self
    }

    pub fn extend<I: IntoIterator<Item = Predicate>>(&mut self, predicates: I) -> &mut Self {
        for p in predicates {
            self.and(p);
        }
        self
    }

    pub fn build(self) -> Predicate {
        Predicate::All {
            clauses: self.clauses,
        }
    }
}
