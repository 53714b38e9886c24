//! Filter Settings Model
//!
//! A user's tag/topic visibility preferences plus the pure operations that
//! update them. Persisting the result is the caller's job.

use super::filter_mode::{FilterMode, TagDefaults};
use crate::error::{FeedRankingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTag {
    pub tag_id: String,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub filter_mode: FilterMode,
}

impl FilterTag {
    pub fn new(tag_id: impl Into<String>, tag_name: impl Into<String>, filter_mode: FilterMode) -> Self {
        Self {
            tag_id: tag_id.into(),
            tag_name: tag_name.into(),
            filter_mode,
        }
    }
}

/// A tag the site suggests to every user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedTag {
    pub tag_id: String,
    pub tag_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    #[serde(default = "default_personal_blog")]
    pub personal_blog: FilterMode,
    #[serde(default)]
    pub tags: Vec<FilterTag>,
}

fn default_personal_blog() -> FilterMode {
    FilterMode::Hidden
}

impl FilterSettings {
    pub fn tag(&self, tag_id: &str) -> Option<&FilterTag> {
        self.tags.iter().find(|t| t.tag_id == tag_id)
    }

    /// Drop repeated tag ids, keeping the last occurrence in the position of the first.
    pub fn deduplicated(mut self) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut tags: Vec<FilterTag> = Vec::with_capacity(self.tags.len());
        for tag in self.tags.drain(..) {
            if seen.insert(tag.tag_id.clone()) {
                tags.push(tag);
            } else if let Some(existing) = tags.iter_mut().find(|t| t.tag_id == tag.tag_id) {
                *existing = tag;
            }
        }
        self.tags = tags;
        self
    }

    /// Tag modes with `TagDefault` replaced by the site defaults.
    pub fn effective_tags<'a>(
        &'a self,
        defaults: &'a TagDefaults,
    ) -> impl Iterator<Item = (&'a str, FilterMode)> + 'a {
        self.tags
            .iter()
            .map(move |t| (t.tag_id.as_str(), defaults.resolve(&t.tag_id, t.filter_mode)))
    }

    /// The personal-blog mode; `TagDefault` has no tag to defer to.
    pub fn effective_personal_blog(&self) -> FilterMode {
        match self.personal_blog {
            FilterMode::TagDefault => FilterMode::Default,
            mode => mode,
        }
    }
}

/// Settings a user starts with before touching anything.
pub fn default_filter_settings(site_default_tags: &[FilterTag]) -> FilterSettings {
    FilterSettings {
        personal_blog: FilterMode::Hidden,
        tags: site_default_tags.to_vec(),
    }
}

/// Append suggested tags the user has no entry for, as `Default`.
///
/// Existing entries are left as they are, so applying it twice is the same
/// as applying it once.
pub fn merge_suggested_tags(settings: &FilterSettings, suggested: &[SuggestedTag]) -> FilterSettings {
    let mut merged = settings.clone();
    for tag in suggested {
        if merged.tag(&tag.tag_id).is_none() {
            merged
                .tags
                .push(FilterTag::new(&tag.tag_id, &tag.tag_name, FilterMode::Default));
        }
    }
    merged
}

/// Insert or update the mode for `tag_id`.
pub fn set_tag_filter(
    settings: &FilterSettings,
    tag_id: &str,
    tag_name: Option<&str>,
    filter_mode: FilterMode,
) -> Result<FilterSettings> {
    let mut updated = settings.clone();
    match updated.tags.iter_mut().find(|t| t.tag_id == tag_id) {
        Some(existing) => {
            existing.filter_mode = filter_mode;
            if let Some(name) = tag_name {
                existing.tag_name = name.to_string();
            }
        }
        None => {
            let name = tag_name
                .filter(|n| !n.is_empty())
                .ok_or_else(|| FeedRankingError::validation("missing tag name"))?;
            updated.tags.push(FilterTag::new(tag_id, name, filter_mode));
        }
    }
    Ok(updated)
}

/// Remove the entry for `tag_id`. Suggested tags cannot be removed, only
/// set back to `Default`.
pub fn remove_tag_filter(
    settings: &FilterSettings,
    tag_id: &str,
    suggested: &[SuggestedTag],
) -> Result<FilterSettings> {
    if suggested.iter().any(|t| t.tag_id == tag_id) {
        return Err(FeedRankingError::validation("cannot remove suggested tag"));
    }
    let mut updated = settings.clone();
    updated.tags.retain(|t| t.tag_id != tag_id);
    Ok(updated)
}

pub fn set_personal_blog_filter(settings: &FilterSettings, mode: FilterMode) -> FilterSettings {
    FilterSettings {
        personal_blog: mode,
        tags: settings.tags.clone(),
    }
}
