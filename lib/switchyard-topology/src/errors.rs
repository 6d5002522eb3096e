use snafu::Snafu;

use crate::latency::CurveError;

/// A topology build error.
#[derive(Debug, Snafu, Eq, PartialEq)]
#[snafu(context(suffix(false)))]
pub enum BuildError {
    /// The same service name was declared more than once.
    #[snafu(display("duplicate service '{}'", service))]
    DuplicateService {
        /// Name of the duplicated service.
        service: String,
    },

    /// The latency percentiles of a route could not be parsed.
    #[snafu(display("invalid latency percentiles for route '{}/{}': {}", service, route, source))]
    InvalidLatencyPercentiles {
        /// Service owning the route.
        service: String,

        /// Route name.
        route: String,

        /// The underlying curve error.
        source: CurveError,
    },

    /// A resource attribute set has a probability outside of `[0, 1]`.
    #[snafu(display(
        "resource attribute set #{} of '{}' has probability {}, which is not between 0 and 1",
        index,
        owner,
        probability
    ))]
    InvalidProbability {
        /// Service, or `service/route`, owning the set.
        owner: String,

        /// Position of the set within its owner's list.
        index: usize,

        /// The configured probability, in its display form.
        probability: String,
    },
}

/// A topology validation error.
#[derive(Debug, Snafu, Eq, PartialEq)]
#[snafu(context(suffix(false)))]
pub enum ValidationError {
    /// A route is gated on a flag that does not exist.
    #[snafu(display("route '{}/{}' references flag '{}', which does not exist", service, route, flag))]
    UnknownFlag {
        /// Service owning the route.
        service: String,

        /// Route name.
        route: String,

        /// The missing flag.
        flag: String,
    },

    /// A route calls a service that does not exist.
    #[snafu(display(
        "route '{}/{}' calls downstream service '{}', which does not exist",
        service,
        route,
        downstream_service
    ))]
    UnknownService {
        /// Service owning the route.
        service: String,

        /// Route name.
        route: String,

        /// The missing downstream service.
        downstream_service: String,
    },

    /// A route calls a route that its service does not define.
    #[snafu(display(
        "route '{}/{}' calls downstream service '{}', which does not have route '{}' defined",
        service,
        route,
        downstream_service,
        downstream_route
    ))]
    UnknownRoute {
        /// Service owning the route.
        service: String,

        /// Route name.
        route: String,

        /// The downstream service.
        downstream_service: String,

        /// The missing downstream route.
        downstream_route: String,
    },

    /// A route has downstream calls but no positive latency budget.
    #[snafu(display(
        "route '{}/{}' has downstream calls and must have a positive, non-zero maxLatencyMillis defined",
        service,
        route
    ))]
    MissingLatencyBudget {
        /// Service owning the route.
        service: String,

        /// Route name.
        route: String,
    },

    /// A service declares the same route name more than once.
    #[snafu(display("service '{}' defines route '{}' more than once", service, route))]
    DuplicateRoute {
        /// Service owning the routes.
        service: String,

        /// The duplicated route name.
        route: String,
    },
}
