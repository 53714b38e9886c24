//! Score Compositor
//!
//! Folds a user's soft filter modes, the site's global score modifiers and the
//! time-decay denominator into a single `filteredScore` per post:
//!
//! ```text
//! additive  = baseScore + Σ additive(active soft tags) + Σ global modifiers + personal blog bonus
//! product   = Π multiplicative(active soft tags)
//! filtered  = additive * product / decay(postedAt, now)
//! ```
//!
//! Without filter settings the score passes through as `baseScore`.

use super::filter_mode::{resolve_additive, resolve_multiplicative, FilterMode, TagDefaults};
use super::filter_settings::FilterSettings;
use super::time_decay::TimeDecayModel;
use crate::models::Post;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which posts a global modifier applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifierScope {
    All,
    Curated,
    Frontpage,
}

/// Site-wide score bonus, configured per deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalScoreModifier {
    pub name: String,
    pub bonus: f64,
    #[serde(default = "default_scope")]
    pub applies_to: ModifierScope,
}

fn default_scope() -> ModifierScope {
    ModifierScope::All
}

impl GlobalScoreModifier {
    pub fn bonus_for(&self, post: &Post) -> f64 {
        let applies = match self.applies_to {
            ModifierScope::All => true,
            ModifierScope::Curated => post.curated_date.is_some(),
            ModifierScope::Frontpage => post.frontpage_date.is_some(),
        };
        if applies {
            self.bonus
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftTag {
    pub tag_id: String,
    pub mode: FilterMode,
}

/// The score-affecting part of a user's filter settings, resolved once per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftFilter {
    pub tags: Vec<SoftTag>,
    /// Bonus for posts without a frontpage date; zero when personal blog is a hard filter
    pub personal_blog_bonus: f64,
}

impl SoftFilter {
    pub fn from_settings(settings: &FilterSettings, defaults: &TagDefaults) -> Self {
        let tags = settings
            .effective_tags(defaults)
            .filter(|(_, mode)| mode.is_soft())
            .map(|(tag_id, mode)| SoftTag {
                tag_id: tag_id.to_string(),
                mode,
            })
            .collect();

        let personal_blog = settings.effective_personal_blog();
        let personal_blog_bonus = if personal_blog.is_hard() {
            0.0
        } else {
            resolve_additive(&personal_blog)
        };

        Self {
            tags,
            personal_blog_bonus,
        }
    }

    fn active<'a>(&'a self, post: &'a Post) -> impl Iterator<Item = &'a SoftTag> + 'a {
        self.tags.iter().filter(move |t| post.has_tag(&t.tag_id))
    }

    /// Score before the decay denominator is applied.
    pub fn raw_score(&self, post: &Post, modifiers: &[GlobalScoreModifier]) -> f64 {
        let tag_bonus: f64 = self.active(post).map(|t| resolve_additive(&t.mode)).sum();
        let global_bonus: f64 = modifiers.iter().map(|m| m.bonus_for(post)).sum();
        let blog_bonus = if post.frontpage_date.is_none() {
            self.personal_blog_bonus
        } else {
            0.0
        };

        let additive = post.base_score + tag_bonus + global_bonus + blog_bonus;
        let product: f64 = self.active(post).map(|t| resolve_multiplicative(&t.mode)).product();

        additive * product
    }
}

/// Everything needed to evaluate `filteredScore` for any post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCompositor {
    /// `None` means the request carried no filter settings
    pub soft_filter: Option<SoftFilter>,
    pub modifiers: Vec<GlobalScoreModifier>,
    pub decay: TimeDecayModel,
}

impl ScoreCompositor {
    pub fn new(
        settings: Option<&FilterSettings>,
        defaults: &TagDefaults,
        modifiers: Vec<GlobalScoreModifier>,
        decay: TimeDecayModel,
    ) -> Self {
        Self {
            soft_filter: settings.map(|s| SoftFilter::from_settings(s, defaults)),
            modifiers,
            decay,
        }
    }

    pub fn filtered_score(&self, post: &Post, now: DateTime<Utc>) -> f64 {
        match &self.soft_filter {
            None => post.base_score,
            Some(soft) => {
                let raw = soft.raw_score(post, &self.modifiers);
                raw / self
                    .decay
                    .decay(post.posted_at, Some(post.last_activity_at()), now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use crate::services::filter_settings::FilterTag;
    use crate::services::time_decay::DecayParams;

    const EPS: f64 = 1e-9;

    fn compositor(settings: Option<&FilterSettings>, modifiers: Vec<GlobalScoreModifier>) -> ScoreCompositor {
        ScoreCompositor::new(
            settings,
            &TagDefaults::default(),
            modifiers,
            TimeDecayModel::new(DecayParams::default()),
        )
    }

    fn settings(personal_blog: FilterMode, tags: Vec<FilterTag>) -> FilterSettings {
        FilterSettings { personal_blog, tags }
    }

    #[test]
    fn test_pass_through_without_settings() {
        let now = Utc::now();
        let c = compositor(None, vec![GlobalScoreModifier {
            name: "boost".to_string(),
            bonus: 100.0,
            applies_to: ModifierScope::All,
        }]);
        for score in [-20.0, 0.0, 7.5, 1200.0] {
            let post = fixtures::post("p", score, now - chrono::Duration::days(30));
            assert_eq!(c.filtered_score(&post, now), score);
        }
    }

    #[test]
    fn test_reduced_tag_halves_raw_score() {
        let s = settings(FilterMode::Default, vec![FilterTag::new("t1", "T1", FilterMode::Reduced)]);
        let soft = SoftFilter::from_settings(&s, &TagDefaults::default());
        let mut post = fixtures::post("p", 40.0, Utc::now());
        post.tag_relevance.insert("t1".to_string(), 1.0);
        assert!((soft.raw_score(&post, &[]) - 20.0).abs() < EPS);
    }

    #[test]
    fn test_factor_tag_scenario() {
        let now = Utc::now();
        let s = settings(
            FilterMode::Default,
            vec![FilterTag::new("t1", "T1", FilterMode::Multiplicative(2.0))],
        );
        let c = compositor(Some(&s), vec![]);
        let mut post = fixtures::post("p", 10.0, now);
        post.tag_relevance.insert("t1".to_string(), 3.0);

        let d0 = c.decay.decay(now, Some(now), now);
        assert!((c.filtered_score(&post, now) - 20.0 / d0).abs() < EPS);
    }

    #[test]
    fn test_inactive_tags_and_hard_modes_are_ignored() {
        let s = settings(
            FilterMode::Default,
            vec![
                FilterTag::new("sub", "Sub", FilterMode::Subscribed),
                FilterTag::new("req", "Req", FilterMode::Required),
                FilterTag::new("zero", "Zero", FilterMode::Additive(0.0)),
            ],
        );
        let soft = SoftFilter::from_settings(&s, &TagDefaults::default());
        assert_eq!(soft.tags.len(), 1);

        let mut post = fixtures::post("p", 10.0, Utc::now());
        post.tag_relevance.insert("req".to_string(), 5.0);
        assert!((soft.raw_score(&post, &[]) - 10.0).abs() < EPS);

        post.tag_relevance.insert("sub".to_string(), 1.0);
        assert!((soft.raw_score(&post, &[]) - 35.0).abs() < EPS);
    }

    #[test]
    fn test_personal_blog_bonus_only_off_frontpage() {
        let s = settings(FilterMode::Additive(8.0), vec![]);
        let soft = SoftFilter::from_settings(&s, &TagDefaults::default());

        let mut personal = fixtures::post("personal", 10.0, Utc::now());
        personal.frontpage_date = None;
        let frontpage = fixtures::post("front", 10.0, Utc::now());

        assert!((soft.raw_score(&personal, &[]) - 18.0).abs() < EPS);
        assert!((soft.raw_score(&frontpage, &[]) - 10.0).abs() < EPS);

        let hidden = SoftFilter::from_settings(&settings(FilterMode::Hidden, vec![]), &TagDefaults::default());
        assert_eq!(hidden.personal_blog_bonus, 0.0);
    }

    #[test]
    fn test_global_modifiers_respect_scope() {
        let modifiers = vec![
            GlobalScoreModifier {
                name: "curated".to_string(),
                bonus: 5.0,
                applies_to: ModifierScope::Curated,
            },
            GlobalScoreModifier {
                name: "everyone".to_string(),
                bonus: 1.0,
                applies_to: ModifierScope::All,
            },
        ];
        let soft = SoftFilter::default();
        let mut post = fixtures::post("p", 10.0, Utc::now());
        assert!((soft.raw_score(&post, &modifiers) - 11.0).abs() < EPS);
        post.curated_date = Some(Utc::now());
        assert!((soft.raw_score(&post, &modifiers) - 16.0).abs() < EPS);
    }

    #[test]
    fn test_tag_default_uses_site_mode() {
        let defaults = TagDefaults::new([("core".to_string(), FilterMode::Additive(10.0))]);
        let s = settings(FilterMode::Default, vec![FilterTag::new("core", "Core", FilterMode::TagDefault)]);
        let soft = SoftFilter::from_settings(&s, &defaults);
        assert_eq!(soft.tags[0].mode, FilterMode::Additive(10.0));
    }
}
