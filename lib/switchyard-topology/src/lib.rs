//! Service topology model for synthetic telemetry generation.
//!
//! A [`Topology`] describes a fleet of services, the routes each of them exposes, and the downstream calls each route
//! makes. Routes carry a latency budget and, optionally, a [`PercentileCurve`] that latency values are sampled from,
//! as well as tag sets, resource attribute sets, and feature flag gates.
//!
//! Topologies are built once from configuration, validated once against a [`FlagRegistry`], and are read-only from
//! then on, apart from the random draws made while sampling.
#![deny(warnings)]
#![deny(missing_docs)]

mod attributes;
pub use self::attributes::{ResourceAttributeSet, TagSet};

pub mod config;

mod duration;
pub use self::duration::parse_duration;

mod errors;
pub use self::errors::{BuildError, ValidationError};

mod flags;
pub use self::flags::{Flag, FlagError, FlagGate, FlagRegistry, StaticFlagRegistry};

mod latency;
pub use self::latency::{CurveError, PercentileCurve, SamplingStrategy};

mod route;
pub use self::route::RouteDescriptor;

mod service;
pub use self::service::ServiceNode;

mod topology;
pub use self::topology::Topology;

#[cfg(test)]
mod test_util;
