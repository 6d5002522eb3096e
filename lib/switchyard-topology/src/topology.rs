//! Service topology.

use std::collections::HashSet;

use indexmap::IndexMap;
use rand::{rngs::StdRng, RngCore, SeedableRng as _};
use tracing::{debug, warn};

use crate::{
    config::TopologyConfig,
    errors::{BuildError, ValidationError},
    flags::FlagRegistry,
    route::RouteDescriptor,
    service::ServiceNode,
};

/// A graph of services and the calls between their routes.
#[derive(Debug, Default)]
pub struct Topology {
    services: IndexMap<String, ServiceNode>,
}

impl Topology {
    /// Creates an empty `Topology`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a `Topology` from its configuration.
    ///
    /// Each service gets its own random source, seeded from `rng` in declaration order, so the same seed always yields
    /// the same per-service random sources. The topology is not validated.
    ///
    /// # Errors
    ///
    /// If a service name is declared more than once, any latency percentiles are invalid, or any resource attribute
    /// set has a probability outside of `[0, 1]`, an error is returned.
    pub fn from_config<R>(config: TopologyConfig, rng: &mut R) -> Result<Self, BuildError>
    where
        R: RngCore,
    {
        let mut topology = Self::new();
        for service_config in config.services {
            let node = ServiceNode::from_config(service_config, StdRng::from_rng(&mut *rng))?;
            for route in node.routes() {
                if let Some(curve) = route.latency_percentiles() {
                    if !curve.is_monotonic() {
                        warn!(
                            "Latency percentiles for route '{}/{}' are not in increasing order. Inverted ranges will always sample their lower bound.",
                            node.name(),
                            route.name()
                        );
                    }
                }
            }
            topology.add_service(node)?;
        }

        debug!("Built topology with {} services.", topology.len());
        Ok(topology)
    }

    /// Adds a service.
    ///
    /// # Errors
    ///
    /// If a service with the same name already exists, an error is returned.
    pub fn add_service(&mut self, node: ServiceNode) -> Result<&mut Self, BuildError> {
        if self.services.contains_key(node.name()) {
            return Err(BuildError::DuplicateService {
                service: node.name().to_string(),
            });
        }

        self.services.insert(node.name().to_string(), node);
        Ok(self)
    }

    /// Gets the service with the given name.
    pub fn service(&self, name: &str) -> Option<&ServiceNode> {
        self.services.get(name)
    }

    /// Gets the route with the given name on the given service.
    pub fn route(&self, service_name: &str, route_name: &str) -> Option<&RouteDescriptor> {
        self.service(service_name).and_then(|node| node.route(route_name))
    }

    /// Returns all services, in declaration order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceNode> {
        self.services.values()
    }

    /// Returns the number of services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if there are no services.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Validates every route of every service.
    ///
    /// Services and routes are visited in declaration order, and validation stops at the first problem found.
    ///
    /// # Errors
    ///
    /// If a service declares the same route name twice, or any route fails [`RouteDescriptor::validate`], an error is
    /// returned.
    pub fn validate_all<F>(&self, flags: &F) -> Result<(), ValidationError>
    where
        F: FlagRegistry + ?Sized,
    {
        for node in self.services.values() {
            let mut seen_routes = HashSet::new();
            for route in node.routes() {
                if !seen_routes.insert(route.name()) {
                    return Err(ValidationError::DuplicateRoute {
                        service: node.name().to_string(),
                        route: route.name().to_string(),
                    });
                }

                route.validate(self, flags)?;
            }
        }

        debug!("Validated topology with {} services.", self.len());
        Ok(())
    }
}
