//! Feature flags.

use indexmap::IndexMap;
use serde::Deserialize;
use snafu::Snafu;

/// A flag registry error.
#[derive(Debug, Snafu, Eq, PartialEq)]
#[snafu(context(suffix(false)))]
pub enum FlagError {
    /// The same flag name was declared more than once.
    #[snafu(display("duplicate flag '{}'", name))]
    DuplicateFlag {
        /// Name of the duplicated flag.
        name: String,
    },
}

/// A named feature flag.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Flag {
    name: String,

    #[serde(default)]
    enabled: bool,
}

impl Flag {
    /// Creates a new `Flag`.
    pub fn new<N>(name: N, enabled: bool) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            enabled,
        }
    }

    /// Returns the flag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the flag is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// A source of feature flags.
pub trait FlagRegistry {
    /// Gets the flag with the given name, if it exists.
    fn get_flag(&self, name: &str) -> Option<&Flag>;

    /// Returns `true` if the flag with the given name exists and is enabled.
    fn is_enabled(&self, name: &str) -> bool {
        self.get_flag(name).is_some_and(Flag::is_enabled)
    }
}

/// A fixed set of flags.
#[derive(Clone, Debug, Default)]
pub struct StaticFlagRegistry {
    flags: IndexMap<String, Flag>,
}

impl StaticFlagRegistry {
    /// Creates an empty `StaticFlagRegistry`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `StaticFlagRegistry` from the given flags.
    ///
    /// # Errors
    ///
    /// If two flags share a name, an error is returned.
    pub fn from_flags<I>(flags: I) -> Result<Self, FlagError>
    where
        I: IntoIterator<Item = Flag>,
    {
        let mut registry = Self::new();
        for flag in flags {
            if registry.flags.contains_key(&flag.name) {
                return Err(FlagError::DuplicateFlag { name: flag.name });
            }
            registry.flags.insert(flag.name.clone(), flag);
        }

        Ok(registry)
    }

    /// Returns the number of flags in the registry.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns `true` if the registry holds no flags.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl FlagRegistry for StaticFlagRegistry {
    fn get_flag(&self, name: &str) -> Option<&Flag> {
        self.flags.get(name)
    }
}

/// A pair of independent flag conditions.
///
/// The gate is open when the `flag_set` flag, if named, is enabled, and the `flag_unset` flag, if named, is not
/// enabled. An empty name is the same as no name.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct FlagGate {
    /// Flag that must be enabled for the gate to be open.
    #[serde(default)]
    pub flag_set: Option<String>,

    /// Flag that must not be enabled for the gate to be open.
    #[serde(default)]
    pub flag_unset: Option<String>,
}

impl FlagGate {
    /// Returns the name of the flag that must be enabled, if any.
    pub fn flag_set(&self) -> Option<&str> {
        self.flag_set.as_deref().filter(|name| !name.is_empty())
    }

    /// Returns the name of the flag that must not be enabled, if any.
    pub fn flag_unset(&self) -> Option<&str> {
        self.flag_unset.as_deref().filter(|name| !name.is_empty())
    }

    /// Returns the first named flag that does not exist in `flags`, if any.
    pub fn unknown_flag<'a, F>(&'a self, flags: &F) -> Option<&'a str>
    where
        F: FlagRegistry + ?Sized,
    {
        [self.flag_set(), self.flag_unset()]
            .into_iter()
            .flatten()
            .find(|name| flags.get_flag(name).is_none())
    }

    /// Returns `true` if the gate is open.
    ///
    /// A flag that does not exist counts as not enabled, so an unknown `flag_set` flag closes the gate.
    pub fn is_open<F>(&self, flags: &F) -> bool
    where
        F: FlagRegistry + ?Sized,
    {
        let set_ok = self.flag_set().is_none_or(|name| flags.is_enabled(name));
        let unset_ok = self.flag_unset().is_none_or(|name| !flags.is_enabled(name));
        set_ok && unset_ok
    }
}
