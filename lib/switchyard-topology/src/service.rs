//! Service nodes.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use rand::{Rng, RngCore};

use crate::{
    attributes::{ResourceAttributeSet, TagSet},
    config::ServiceConfig,
    errors::BuildError,
    flags::FlagRegistry,
    route::{check_probabilities, RouteDescriptor},
};

/// A service in the topology.
///
/// Each service owns its own random source, which is used to select resource attribute sets. The random source is
/// behind a lock, so selections from concurrent callers are serialized. Callers that want a thread-confined random
/// source instead can use [`resource_attribute_set_with`][Self::resource_attribute_set_with].
pub struct ServiceNode {
    name: String,
    routes: Vec<RouteDescriptor>,
    tag_sets: Vec<TagSet>,
    resource_attribute_sets: Vec<ResourceAttributeSet>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl ServiceNode {
    /// Creates a new `ServiceNode` with no routes or metadata, using `rng` as its random source.
    pub fn new<N, R>(name: N, rng: R) -> Self
    where
        N: Into<String>,
        R: RngCore + Send + 'static,
    {
        Self {
            name: name.into(),
            routes: Vec::new(),
            tag_sets: Vec::new(),
            resource_attribute_sets: Vec::new(),
            rng: Mutex::new(Box::new(rng)),
        }
    }

    pub(crate) fn from_config<R>(config: ServiceConfig, rng: R) -> Result<Self, BuildError>
    where
        R: RngCore + Send + 'static,
    {
        check_probabilities(&config.service_name, &config.resource_attribute_sets)?;

        let mut node = Self::new(config.service_name, rng);
        node.tag_sets = config.tag_sets;
        node.resource_attribute_sets = config.resource_attribute_sets;
        for route_config in config.routes {
            let route = RouteDescriptor::from_config(&node.name, route_config)?;
            node.routes.push(route);
        }

        Ok(node)
    }

    /// Adds a route.
    ///
    /// Routes are matched by name in the order they were added.
    pub fn with_route(mut self, mut route: RouteDescriptor) -> Self {
        route.set_service(&self.name);
        self.routes.push(route);
        self
    }

    /// Adds a service-level tag set.
    pub fn with_tag_set(mut self, tag_set: TagSet) -> Self {
        self.tag_sets.push(tag_set);
        self
    }

    /// Adds a service-level resource attribute set.
    pub fn with_resource_attribute_set(mut self, set: ResourceAttributeSet) -> Self {
        self.resource_attribute_sets.push(set);
        self
    }

    /// Returns the service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all routes, in declaration order.
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Gets the route with the given name.
    ///
    /// If more than one route has the given name, the first one declared is returned.
    pub fn route(&self, name: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|route| route.name() == name)
    }

    /// Returns the service-level resource attribute sets.
    pub fn resource_attribute_sets(&self) -> &[ResourceAttributeSet] {
        &self.resource_attribute_sets
    }

    /// Returns the tag sets that apply to the given route.
    ///
    /// Service-level tag sets come first, followed by the route's own tag sets. If the route does not exist, only the
    /// service-level tag sets are returned.
    pub fn tag_sets(&self, route_name: &str) -> Vec<&TagSet> {
        let route_tag_sets = self.route(route_name).map(RouteDescriptor::tag_sets).unwrap_or_default();
        self.tag_sets.iter().chain(route_tag_sets).collect()
    }

    /// Selects a resource attribute set for a single piece of telemetry.
    ///
    /// Every service-level set is drawn against its probability, and one of the sets that should be generated is then
    /// picked uniformly at random. Returns `None` if no set should be generated.
    pub fn resource_attribute_set(&self) -> Option<&ResourceAttributeSet> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        select_enabled(&self.resource_attribute_sets, &mut **rng, |set, rng| set.should_generate(rng))
    }

    /// Selects a resource attribute set for a single piece of telemetry, skipping sets whose flag gate is closed.
    pub fn resource_attribute_set_gated<F>(&self, flags: &F) -> Option<&ResourceAttributeSet>
    where
        F: FlagRegistry + ?Sized,
    {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        select_enabled(&self.resource_attribute_sets, &mut **rng, |set, rng| {
            set.should_generate_gated(rng, flags)
        })
    }

    /// Selects a resource attribute set using the given random source instead of the service's own.
    ///
    /// Sets whose flag gate is closed are skipped.
    pub fn resource_attribute_set_with<R, F>(&self, rng: &mut R, flags: &F) -> Option<&ResourceAttributeSet>
    where
        R: Rng + ?Sized,
        F: FlagRegistry + ?Sized,
    {
        select_enabled(&self.resource_attribute_sets, rng, |set, rng| {
            set.should_generate_gated(rng, flags)
        })
    }
}

impl fmt::Debug for ServiceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceNode")
            .field("name", &self.name)
            .field("routes", &self.routes)
            .field("tag_sets", &self.tag_sets)
            .field("resource_attribute_sets", &self.resource_attribute_sets)
            .finish_non_exhaustive()
    }
}

fn select_enabled<'a, R, P>(
    sets: &'a [ResourceAttributeSet], rng: &mut R, mut should_generate: P,
) -> Option<&'a ResourceAttributeSet>
where
    R: Rng + ?Sized,
    P: FnMut(&ResourceAttributeSet, &mut R) -> bool,
{
    if sets.is_empty() {
        return None;
    }

    let mut enabled = Vec::with_capacity(sets.len());
    for set in sets {
        if should_generate(set, rng) {
            enabled.push(set);
        }
    }

    if enabled.is_empty() {
        None
    } else {
        Some(enabled[rng.random_range(0..enabled.len())])
    }
}
