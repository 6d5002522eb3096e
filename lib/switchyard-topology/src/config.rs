//! Topology configuration.
//!
//! These types mirror the configuration document exactly, and carry no validation of their own. They are turned into a
//! [`Topology`][crate::Topology] with [`Topology::from_config`][crate::Topology::from_config].

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    attributes::{ResourceAttributeSet, TagSet},
    flags::FlagGate,
    latency::SamplingStrategy,
};

/// Configuration for a whole topology.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TopologyConfig {
    /// Services in the topology, in declaration order.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

/// Configuration for a single service.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// The service name.
    ///
    /// Must be unique within the topology.
    pub service_name: String,

    /// Routes exposed by the service.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Tag sets attached to every route of the service.
    #[serde(default)]
    pub tag_sets: Vec<TagSet>,

    /// Resource attribute sets to choose from when the service emits telemetry.
    #[serde(default, rename = "resourceAttrSets")]
    pub resource_attribute_sets: Vec<ResourceAttributeSet>,
}

/// Configuration for a single route.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    /// The route name.
    pub route: String,

    /// Calls made to other services when this route is invoked, keyed by service name, with the route to call as the
    /// value.
    #[serde(default)]
    pub downstream_calls: IndexMap<String, String>,

    /// Upper bound on the route latency, in milliseconds.
    ///
    /// Required to be positive when any downstream calls are declared.
    #[serde(default)]
    pub max_latency_millis: i64,

    /// Latency distribution of the route.
    ///
    /// When present, this takes precedence over `max_latency_millis` for sampling.
    #[serde(default)]
    pub latency_percentiles: Option<LatencyPercentilesConfig>,

    /// Tag sets specific to this route.
    #[serde(default)]
    pub tag_sets: Vec<TagSet>,

    /// Resource attribute sets specific to this route.
    #[serde(default, rename = "resourceAttrSets")]
    pub resource_attribute_sets: Vec<ResourceAttributeSet>,

    /// Feature flag gate for the route.
    #[serde(flatten)]
    pub flags: FlagGate,
}

/// Latency percentiles, as duration expressions such as `250ms` or `1.5s`.
#[derive(Clone, Debug, Deserialize)]
pub struct LatencyPercentilesConfig {
    /// Minimum latency.
    pub p0: String,

    /// Median latency.
    pub p50: String,

    /// 95th percentile latency.
    pub p95: String,

    /// 99th percentile latency.
    pub p99: String,

    /// 99.9th percentile latency.
    #[serde(rename = "p99.9")]
    pub p999: String,

    /// Maximum latency.
    pub p100: String,

    /// How draws are mapped onto percentile buckets.
    #[serde(default)]
    pub strategy: SamplingStrategy,
}
