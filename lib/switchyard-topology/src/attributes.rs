//! Tag sets and resource attribute sets.

use indexmap::IndexMap;
use rand::Rng;
use serde::Deserialize;

use crate::flags::{FlagGate, FlagRegistry};

/// A set of tags attached to generated telemetry.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct TagSet {
    /// Tags, by key.
    #[serde(default)]
    pub tags: IndexMap<String, String>,

    /// Relative weight of the tag set.
    ///
    /// Carried through from configuration, but not used when resolving tag sets.
    #[serde(default)]
    pub weight: Option<f64>,
}

impl TagSet {
    /// Creates a new `TagSet` from the given tags.
    pub fn from_tags<I, K, V>(tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            weight: None,
        }
    }
}

/// A set of resource attributes that is attached to generated telemetry some of the time.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ResourceAttributeSet {
    /// Attributes, by key.
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Probability, between 0 and 1, that the set is generated on any given draw.
    #[serde(default = "default_probability")]
    pub probability: f64,

    /// Feature flag gate for the set.
    #[serde(flatten)]
    pub flags: FlagGate,
}

const fn default_probability() -> f64 {
    1.0
}

impl ResourceAttributeSet {
    /// Creates a new `ResourceAttributeSet` from the given attributes, which is always generated.
    pub fn from_attributes<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            probability: default_probability(),
            flags: FlagGate::default(),
        }
    }

    /// Sets the probability that the set is generated.
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// Returns `true` if the configured probability is a number between 0 and 1, inclusive.
    pub fn has_valid_probability(&self) -> bool {
        (0.0..=1.0).contains(&self.probability)
    }

    /// Draws whether or not the set should be generated.
    ///
    /// Exactly one value is drawn from `rng`, regardless of the configured probability.
    pub fn should_generate<R>(&self, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        rng.random::<f64>() < self.probability
    }

    /// Draws whether or not the set should be generated, taking its flag gate into account.
    ///
    /// Nothing is drawn from `rng` when the flag gate is closed.
    pub fn should_generate_gated<R, F>(&self, rng: &mut R, flags: &F) -> bool
    where
        R: Rng + ?Sized,
        F: FlagRegistry + ?Sized,
    {
        self.flags.is_open(flags) && self.should_generate(rng)
    }
}
