//! Filter Mode Algebra
//!
//! A filter mode is the per-tag (or personal-blog) visibility rule a user picks.
//! `Hidden` and `Required` become hard predicates in the compiled query; every
//! other mode folds into the ranking score as an additive bonus, a
//! multiplicative factor, or nothing at all.
//!
//! On the wire a mode is a keyword string, a bare number, or `"x<factor>"`.
//! It is parsed exactly once, here, and never re-parsed downstream.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Additive bonus granted to tags the user subscribed to
pub const SUBSCRIBED_BONUS: f64 = 25.0;

/// Multiplier applied to tags the user chose to see less of
pub const REDUCED_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum FilterMode {
    Hidden,
    #[default]
    Default,
    Required,
    Subscribed,
    Reduced,
    /// Defer to the site-configured mode for the tag
    TagDefault,
    Additive(f64),
    Multiplicative(f64),
}

impl FilterMode {
    /// Interpret a bare number.
    ///
    /// `0 < n < 1` is a multiplicative factor; everything else (including
    /// exactly 0 and exactly 1) is an additive karma bonus.
    pub fn from_number(n: f64) -> Self {
        if !n.is_finite() {
            warn!(value = n, "Non-finite filter mode, treating as Default");
            return FilterMode::Default;
        }
        if n > 0.0 && n < 1.0 {
            FilterMode::Multiplicative(n)
        } else {
            FilterMode::Additive(n)
        }
    }

    /// Parse a wire string. Unrecognized input falls back to `Default`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "Hidden" => return FilterMode::Hidden,
            "Default" => return FilterMode::Default,
            "Required" => return FilterMode::Required,
            "Subscribed" => return FilterMode::Subscribed,
            "Reduced" => return FilterMode::Reduced,
            "TagDefault" => return FilterMode::TagDefault,
            _ => {}
        }

        if let Some(factor) = trimmed.strip_prefix('x') {
            match factor.parse::<f64>() {
                Ok(f) if f.is_finite() && f >= 0.0 => return FilterMode::Multiplicative(f),
                _ => {
                    warn!(value = raw, "Malformed multiplicative filter mode, treating as Default");
                    return FilterMode::Default;
                }
            }
        }

        match trimmed.parse::<f64>() {
            Ok(n) => FilterMode::from_number(n),
            Err(_) => {
                warn!(value = raw, "Unrecognized filter mode, treating as Default");
                FilterMode::Default
            }
        }
    }

    /// Parse an arbitrary JSON value from the request boundary.
    pub fn from_wire(value: &Value) -> Self {
        match value {
            Value::String(s) => FilterMode::parse(s),
            Value::Number(n) => match n.as_f64() {
                Some(n) => FilterMode::from_number(n),
                None => FilterMode::Default,
            },
            other => {
                warn!(value = %other, "Unrecognized filter mode, treating as Default");
                FilterMode::Default
            }
        }
    }

    /// Modes that compile to predicates rather than score effects.
    pub fn is_hard(&self) -> bool {
        matches!(self, FilterMode::Hidden | FilterMode::Required)
    }

    /// Modes with no effect on ranking at all.
    pub fn is_neutral(&self) -> bool {
        match self {
            FilterMode::Default => true,
            FilterMode::Additive(n) => *n == 0.0,
            _ => false,
        }
    }

    /// A mode that changes a post's score without excluding anything.
    pub fn is_soft(&self) -> bool {
        !self.is_hard() && !self.is_neutral()
    }
}

/// Additive score contribution of a mode.
///
/// Hard modes contribute nothing here, they are handled as predicates.
/// An unresolved `TagDefault` behaves like `Default`; callers resolve it
/// through [`TagDefaults`] first.
pub fn resolve_additive(mode: &FilterMode) -> f64 {
    match mode {
        FilterMode::Subscribed => SUBSCRIBED_BONUS,
        FilterMode::Additive(n) => *n,
        FilterMode::Default
        | FilterMode::Reduced
        | FilterMode::Multiplicative(_)
        | FilterMode::Hidden
        | FilterMode::Required
        | FilterMode::TagDefault => 0.0,
    }
}

/// Multiplicative score contribution of a mode.
pub fn resolve_multiplicative(mode: &FilterMode) -> f64 {
    match mode {
        FilterMode::Reduced => REDUCED_FACTOR,
        FilterMode::Multiplicative(f) => *f,
        FilterMode::Default
        | FilterMode::Subscribed
        | FilterMode::Additive(_)
        | FilterMode::Hidden
        | FilterMode::Required
        | FilterMode::TagDefault => 1.0,
    }
}

/// Site-configured default modes, keyed by tag id.
#[derive(Debug, Clone, Default)]
pub struct TagDefaults {
    modes: HashMap<String, FilterMode>,
}

impl TagDefaults {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, FilterMode)>,
    {
        Self {
            modes: entries.into_iter().collect(),
        }
    }

    /// Replace `TagDefault` with the site default for `tag_id`.
    ///
    /// Never returns `TagDefault`: a site default that is itself `TagDefault`,
    /// or a missing entry, resolves to `Default`.
    pub fn resolve(&self, tag_id: &str, mode: FilterMode) -> FilterMode {
        if mode != FilterMode::TagDefault {
            return mode;
        }
        match self.modes.get(tag_id) {
            Some(FilterMode::TagDefault) | None => FilterMode::Default,
            Some(site_mode) => *site_mode,
        }
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Hidden => write!(f, "Hidden"),
            FilterMode::Default => write!(f, "Default"),
            FilterMode::Required => write!(f, "Required"),
            FilterMode::Subscribed => write!(f, "Subscribed"),
            FilterMode::Reduced => write!(f, "Reduced"),
            FilterMode::TagDefault => write!(f, "TagDefault"),
            FilterMode::Additive(n) => write!(f, "{}", n),
            FilterMode::Multiplicative(factor) => write!(f, "x{}", factor),
        }
    }
}

impl Serialize for FilterMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FilterMode::Additive(n) => serializer.serialize_f64(*n),
            // Factors in (0, 1) round-trip as bare numbers; others need the prefix
            FilterMode::Multiplicative(f) if *f > 0.0 && *f < 1.0 => serializer.serialize_f64(*f),
            other => serializer.collect_str(other),
        }
    }
}

impl<'de> Deserialize<'de> for FilterMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(FilterMode::from_wire(&value))
    }
}
