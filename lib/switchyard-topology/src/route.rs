//! Route descriptors.

use std::time::Duration;

use indexmap::IndexMap;
use rand::Rng;

use crate::{
    attributes::{ResourceAttributeSet, TagSet},
    config::RouteConfig,
    errors::{BuildError, ValidationError},
    flags::{FlagGate, FlagRegistry},
    latency::PercentileCurve,
    topology::Topology,
};

/// An outbound call path of a service.
///
/// Downstream calls are held by name, and only resolved against a [`Topology`] during validation.
#[derive(Clone, Debug)]
pub struct RouteDescriptor {
    service: String,
    name: String,
    downstream_calls: IndexMap<String, String>,
    max_latency_millis: i64,
    latency: Option<PercentileCurve>,
    tag_sets: Vec<TagSet>,
    resource_attribute_sets: Vec<ResourceAttributeSet>,
    flags: FlagGate,
}

impl RouteDescriptor {
    /// Creates a new `RouteDescriptor` with no downstream calls, latency budget, or metadata.
    ///
    /// The owning service is set when the route is added to a [`ServiceNode`][crate::ServiceNode].
    pub fn new<N>(name: N) -> Self
    where
        N: Into<String>,
    {
        Self {
            service: String::new(),
            name: name.into(),
            downstream_calls: IndexMap::new(),
            max_latency_millis: 0,
            latency: None,
            tag_sets: Vec::new(),
            resource_attribute_sets: Vec::new(),
            flags: FlagGate::default(),
        }
    }

    pub(crate) fn from_config(service: &str, config: RouteConfig) -> Result<Self, BuildError> {
        let latency = config
            .latency_percentiles
            .as_ref()
            .map(PercentileCurve::parse)
            .transpose()
            .map_err(|source| BuildError::InvalidLatencyPercentiles {
                service: service.to_string(),
                route: config.route.clone(),
                source,
            })?;

        let owner = format!("{}/{}", service, config.route);
        check_probabilities(&owner, &config.resource_attribute_sets)?;

        Ok(Self {
            service: service.to_string(),
            name: config.route,
            downstream_calls: config.downstream_calls,
            max_latency_millis: config.max_latency_millis,
            latency,
            tag_sets: config.tag_sets,
            resource_attribute_sets: config.resource_attribute_sets,
            flags: config.flags,
        })
    }

    /// Adds a call to `route` on `service`.
    ///
    /// A service can only be called once per route: calling it again replaces the previous route.
    pub fn with_downstream_call<S, R>(mut self, service: S, route: R) -> Self
    where
        S: Into<String>,
        R: Into<String>,
    {
        self.downstream_calls.insert(service.into(), route.into());
        self
    }

    /// Sets the latency budget, in milliseconds.
    pub fn with_max_latency_millis(mut self, max_latency_millis: i64) -> Self {
        self.max_latency_millis = max_latency_millis;
        self
    }

    /// Sets the latency distribution.
    pub fn with_latency_percentiles(mut self, curve: PercentileCurve) -> Self {
        self.latency = Some(curve);
        self
    }

    /// Adds a tag set.
    pub fn with_tag_set(mut self, tag_set: TagSet) -> Self {
        self.tag_sets.push(tag_set);
        self
    }

    /// Adds a resource attribute set.
    pub fn with_resource_attribute_set(mut self, set: ResourceAttributeSet) -> Self {
        self.resource_attribute_sets.push(set);
        self
    }

    /// Gates the route on the given flag being enabled.
    pub fn with_flag_set<N>(mut self, flag: N) -> Self
    where
        N: Into<String>,
    {
        self.flags.flag_set = Some(flag.into());
        self
    }

    /// Gates the route on the given flag not being enabled.
    pub fn with_flag_unset<N>(mut self, flag: N) -> Self
    where
        N: Into<String>,
    {
        self.flags.flag_unset = Some(flag.into());
        self
    }

    pub(crate) fn set_service(&mut self, service: &str) {
        self.service = service.to_string();
    }

    /// Returns the name of the owning service.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the downstream calls, as service name/route name pairs, in declaration order.
    pub fn downstream_calls(&self) -> impl Iterator<Item = (&str, &str)> {
        self.downstream_calls
            .iter()
            .map(|(service, route)| (service.as_str(), route.as_str()))
    }

    /// Returns `true` if the route makes any downstream calls.
    pub fn has_downstream_calls(&self) -> bool {
        !self.downstream_calls.is_empty()
    }

    /// Returns the latency budget, in milliseconds.
    pub fn max_latency_millis(&self) -> i64 {
        self.max_latency_millis
    }

    /// Returns the latency distribution, if one is configured.
    pub fn latency_percentiles(&self) -> Option<&PercentileCurve> {
        self.latency.as_ref()
    }

    /// Returns the route-level tag sets.
    pub fn tag_sets(&self) -> &[TagSet] {
        &self.tag_sets
    }

    /// Returns the route-level resource attribute sets.
    pub fn resource_attribute_sets(&self) -> &[ResourceAttributeSet] {
        &self.resource_attribute_sets
    }

    /// Returns the flag gate.
    pub fn flags(&self) -> &FlagGate {
        &self.flags
    }

    /// Returns `true` if the route is active given the current state of `flags`.
    pub fn is_active<F>(&self, flags: &F) -> bool
    where
        F: FlagRegistry + ?Sized,
    {
        self.flags.is_open(flags)
    }

    /// Samples a latency for a single invocation of the route.
    ///
    /// The latency distribution is used when configured. Otherwise, a value is drawn uniformly from zero up to the
    /// latency budget. When neither is configured, `None` is returned and nothing is drawn from `rng`.
    pub fn sample_latency<R>(&self, rng: &mut R) -> Option<Duration>
    where
        R: Rng + ?Sized,
    {
        match &self.latency {
            Some(curve) => Some(curve.sample(rng)),
            None if self.max_latency_millis > 0 => {
                let budget_ns = (self.max_latency_millis as u64).saturating_mul(1_000_000);
                Some(Duration::from_nanos(rng.random_range(0..=budget_ns)))
            }
            None => None,
        }
    }

    /// Validates the route against the rest of the topology.
    ///
    /// # Errors
    ///
    /// The first of the following problems found is returned:
    ///
    /// - a gating flag that does not exist in `flags`
    /// - a downstream service that does not exist in `topology`
    /// - a downstream route that its service does not define
    /// - downstream calls without a positive latency budget
    pub fn validate<F>(&self, topology: &Topology, flags: &F) -> Result<(), ValidationError>
    where
        F: FlagRegistry + ?Sized,
    {
        if let Some(flag) = self.flags.unknown_flag(flags) {
            return Err(ValidationError::UnknownFlag {
                service: self.service.clone(),
                route: self.name.clone(),
                flag: flag.to_string(),
            });
        }

        for (downstream_service, downstream_route) in &self.downstream_calls {
            let node = topology
                .service(downstream_service)
                .ok_or_else(|| ValidationError::UnknownService {
                    service: self.service.clone(),
                    route: self.name.clone(),
                    downstream_service: downstream_service.clone(),
                })?;

            if node.route(downstream_route).is_none() {
                return Err(ValidationError::UnknownRoute {
                    service: self.service.clone(),
                    route: self.name.clone(),
                    downstream_service: downstream_service.clone(),
                    downstream_route: downstream_route.clone(),
                });
            }

            if self.max_latency_millis <= 0 {
                return Err(ValidationError::MissingLatencyBudget {
                    service: self.service.clone(),
                    route: self.name.clone(),
                });
            }
        }

        Ok(())
    }
}

pub(crate) fn check_probabilities(owner: &str, sets: &[ResourceAttributeSet]) -> Result<(), BuildError> {
    match sets.iter().position(|set| !set.has_valid_probability()) {
        Some(index) => Err(BuildError::InvalidProbability {
            owner: owner.to_string(),
            index,
            probability: sets[index].probability.to_string(),
        }),
        None => Ok(()),
    }
}
