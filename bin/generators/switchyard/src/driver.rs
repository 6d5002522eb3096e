//! Driver for previewing a topology.

use std::{num::NonZeroUsize, time::Duration};

use anyhow::{Context as _, Error as GenericError};
use rand::{rngs::StdRng, SeedableRng as _};
use switchyard_topology::{RouteDescriptor, ServiceNode, StaticFlagRegistry, Topology};
use tracing::{debug, info};

use crate::config::Config;

/// Drives a preview of the configured topology.
pub struct Driver {
    topology: Topology,
    flags: StaticFlagRegistry,
    rng: StdRng,
    iterations: NonZeroUsize,
}

impl Driver {
    /// Creates a new `Driver` from the given configuration.
    ///
    /// The topology is built and validated up front, so a `Driver` only exists for a topology that is safe to simulate.
    ///
    /// # Errors
    ///
    /// If the flags are invalid, or the topology cannot be built or fails validation, an error is returned.
    pub fn new(config: Config) -> Result<Self, GenericError> {
        let flags = StaticFlagRegistry::from_flags(config.flags).context("Invalid flag configuration.")?;

        // Per-service random sources are derived from this generator before it's used for anything else, so that they
        // only depend on the seed and the order services are declared in.
        let mut rng = StdRng::from_seed(config.seed.0);
        let topology = Topology::from_config(config.topology, &mut rng).context("Failed to build topology.")?;
        topology.validate_all(&flags).context("Topology failed validation.")?;

        info!(
            "Loaded topology with {} services and {} flags.",
            topology.len(),
            flags.len()
        );

        Ok(Self {
            topology,
            flags,
            rng,
            iterations: config.preview.iterations,
        })
    }

    /// Runs the preview, simulating calls to every active route and logging what would be generated.
    pub fn run(mut self) {
        info!(
            "Simulating {} calls to every active route.",
            self.iterations
        );

        let mut simulated_routes = 0;
        for node in self.topology.services() {
            for route in node.routes() {
                if !route.is_active(&self.flags) {
                    info!("Skipping route '{}/{}': disabled by feature flags.", node.name(), route.name());
                    continue;
                }

                for (downstream_service, downstream_route) in route.downstream_calls() {
                    debug!(
                        "Route '{}/{}' calls '{}/{}'.",
                        node.name(),
                        route.name(),
                        downstream_service,
                        downstream_route
                    );
                }

                let preview = preview_route(node, route, &self.flags, &mut self.rng, self.iterations);
                preview.report(node, route);
                simulated_routes += 1;
            }
        }

        info!("Preview complete. Simulated {} routes.", simulated_routes);
    }
}

struct RoutePreview {
    latency: Option<LatencySummary>,
    tags: usize,
    calls: usize,
    calls_with_resource_attributes: usize,
}

impl RoutePreview {
    fn report(&self, node: &ServiceNode, route: &RouteDescriptor) {
        let attached_pct = self.calls_with_resource_attributes as f64 * 100.0 / self.calls as f64;

        match &self.latency {
            Some(latency) => info!(
                "Route '{}/{}': min={:?} p50={:?} p95={:?} p99={:?} max={:?} tags={} resource_attributes={:.1}%",
                node.name(),
                route.name(),
                latency.min,
                latency.p50,
                latency.p95,
                latency.p99,
                latency.max,
                self.tags,
                attached_pct
            ),
            None => info!(
                "Route '{}/{}': no latency configured. tags={} resource_attributes={:.1}%",
                node.name(),
                route.name(),
                self.tags,
                attached_pct
            ),
        }
    }
}

fn preview_route(
    node: &ServiceNode, route: &RouteDescriptor, flags: &StaticFlagRegistry, rng: &mut StdRng, iterations: NonZeroUsize,
) -> RoutePreview {
    let mut samples = Vec::with_capacity(iterations.get());
    let mut calls_with_resource_attributes = 0;

    for _ in 0..iterations.get() {
        if let Some(latency) = route.sample_latency(rng) {
            samples.push(latency);
        }

        if node.resource_attribute_set_gated(flags).is_some() {
            calls_with_resource_attributes += 1;
        }
    }

    let tags = node
        .tag_sets(route.name())
        .iter()
        .map(|tag_set| tag_set.tags.len())
        .sum();

    RoutePreview {
        latency: LatencySummary::from_samples(samples),
        tags,
        calls: iterations.get(),
        calls_with_resource_attributes,
    }
}

/// Order statistics over a set of sampled latencies.
#[derive(Debug, Eq, PartialEq)]
struct LatencySummary {
    min: Duration,
    p50: Duration,
    p95: Duration,
    p99: Duration,
    max: Duration,
}

impl LatencySummary {
    fn from_samples(mut samples: Vec<Duration>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        samples.sort_unstable();
        let quantile = |q: f64| samples[((samples.len() - 1) as f64 * q).round() as usize];

        Some(Self {
            min: samples[0],
            p50: quantile(0.50),
            p95: quantile(0.95),
            p99: quantile(0.99),
            max: samples[samples.len() - 1],
        })
    }
}
