// ============================================
// Time Decay Model
// ============================================
//
// Denominator for the "magic" sort:
//
//   decay = (age_hours + starting_age_hours) ^ exponent
//
// The exponent drifts from `decay_factor_slowest` for brand-new posts toward
// `decay_factor_fastest` as the post ages:
//
//   w        = starting_age_hours / (age_hours + starting_age_hours)
//   exponent = fastest + (slowest - fastest) * w
//
// With activity adjustment enabled, recent activity pulls the exponent back
// toward the slowest factor:
//
//   activity = activity_factor  (explicit override), or
//            = activity_weight * 0.5 ^ (hours_since_activity / activity_half_life_hours)
//   exponent = exponent * (1 - activity) + slowest * activity
//
// The base is at least 1 and the exponent is non-negative and non-decreasing
// in age, so the result is >= 1 and never falls as the post gets older.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityParams {
    pub half_life_hours: f64,
    pub weight: f64,
    /// Replaces the half-life/weight computation when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor_override: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayParams {
    pub starting_age_hours: f64,
    pub decay_factor_slowest: f64,
    pub decay_factor_fastest: f64,
    /// `None` selects the basic parametrization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityParams>,
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            starting_age_hours: 2.0,
            decay_factor_slowest: 1.15,
            decay_factor_fastest: 1.5,
            activity: None,
        }
    }
}

/// Per-request overrides, as they arrive in view terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayOverrides {
    pub starting_age_hours: Option<f64>,
    pub decay_factor_slowest: Option<f64>,
    pub decay_factor_fastest: Option<f64>,
    pub activity_half_life_hours: Option<f64>,
    pub activity_weight: Option<f64>,
    pub activity_factor: Option<f64>,
}

impl DecayOverrides {
    fn touches_activity(&self) -> bool {
        self.activity_half_life_hours.is_some()
            || self.activity_weight.is_some()
            || self.activity_factor.is_some()
    }
}

impl DecayParams {
    /// Layer request overrides on top of configured defaults.
    ///
    /// Any activity override switches on the activity-adjusted model, using
    /// `fallback_activity` for the fields the request did not set.
    pub fn with_overrides(&self, overrides: &DecayOverrides, fallback_activity: ActivityParams) -> Self {
        let activity = if overrides.touches_activity() || self.activity.is_some() {
            let base = self.activity.unwrap_or(fallback_activity);
            Some(ActivityParams {
                half_life_hours: overrides.activity_half_life_hours.unwrap_or(base.half_life_hours),
                weight: overrides.activity_weight.unwrap_or(base.weight),
                factor_override: overrides.activity_factor.or(base.factor_override),
            })
        } else {
            None
        };

        Self {
            starting_age_hours: overrides.starting_age_hours.unwrap_or(self.starting_age_hours),
            decay_factor_slowest: overrides
                .decay_factor_slowest
                .unwrap_or(self.decay_factor_slowest),
            decay_factor_fastest: overrides
                .decay_factor_fastest
                .unwrap_or(self.decay_factor_fastest),
            activity,
        }
    }
}

/// Hours between two instants; negative spans count as zero.
fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    ((later - earlier).num_milliseconds() as f64 / MS_PER_HOUR).max(0.0)
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeDecayModel {
    params: DecayParams,
}

impl TimeDecayModel {
    pub fn new(params: DecayParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DecayParams {
        &self.params
    }

    /// Decay denominator for a post.
    ///
    /// `last_activity_at` only matters for the activity-adjusted model; when
    /// absent the post's own timestamp is used.
    pub fn decay(
        &self,
        posted_at: DateTime<Utc>,
        last_activity_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> f64 {
        let defaults = DecayParams::default();
        let start = finite_or(self.params.starting_age_hours, defaults.starting_age_hours).max(1.0);
        let a = finite_or(self.params.decay_factor_slowest, defaults.decay_factor_slowest).max(0.0);
        let b = finite_or(self.params.decay_factor_fastest, defaults.decay_factor_fastest).max(0.0);
        let (slowest, fastest) = if a <= b { (a, b) } else { (b, a) };

        let age_hours = hours_between(posted_at, now);
        let base = age_hours + start;
        let youth = start / base;
        let mut exponent = fastest + (slowest - fastest) * youth;

        if let Some(activity) = &self.params.activity {
            let level = activity_level(activity, last_activity_at.unwrap_or(posted_at), now);
            exponent = exponent * (1.0 - level) + slowest * level;
        }

        base.powf(exponent)
    }
}

/// Recent-activity level in `[0, 1]`.
fn activity_level(params: &ActivityParams, last_activity_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let level = match params.factor_override {
        Some(factor) => factor,
        None => {
            if params.half_life_hours.is_nan() || params.half_life_hours <= 0.0 {
                return 0.0;
            }
            let since = hours_between(last_activity_at, now);
            params.weight * 0.5f64.powf(since / params.half_life_hours)
        }
    };
    finite_or(level, 0.0).clamp(0.0, 1.0)
}

/// Convenience wrapper for the basic parametrization.
pub fn decay(posted_at: DateTime<Utc>, now: DateTime<Utc>, params: &DecayParams) -> f64 {
    TimeDecayModel::new(*params).decay(posted_at, None, now)
}
