//! Percentile-based latency sampling.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use snafu::Snafu;

use crate::{config::LatencyPercentilesConfig, duration::parse_duration};

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// A latency curve error.
#[derive(Debug, Snafu, Eq, PartialEq)]
#[snafu(context(suffix(false)))]
pub enum CurveError {
    /// A percentile value could not be parsed as a duration.
    #[snafu(display("invalid duration '{}' for percentile '{}': {}", input, field, reason))]
    InvalidDurationFormat {
        /// Name of the percentile field, as written in configuration.
        field: &'static str,

        /// The raw value that failed to parse.
        input: String,

        /// Why parsing failed.
        reason: String,
    },
}

/// Strategy for mapping a uniform draw onto a percentile bucket.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// The long-standing bucket table.
    ///
    /// 0.1% of draws land in `[p99, p99.9]`, 0.9% in `[p95, p99]`, 4% in `[p50, p95]`, and the remaining 95% in
    /// `[p0, p50]`. Since the bulk of draws never reach above p50, the observed median sits below the configured p50.
    #[default]
    Legacy,

    /// Buckets ordered by percentile rank.
    ///
    /// 50% of draws land in `[p0, p50]`, 45% in `[p50, p95]`, 4% in `[p95, p99]`, and 1% in `[p99, p99.9]`.
    Ordered,
}

/// A six-point approximation of a latency distribution.
///
/// Values are expected to be non-decreasing from p0 to p100, but this is not enforced: a bucket whose upper bound is
/// below its lower bound always samples its lower bound.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PercentileCurve {
    p0: Duration,
    p50: Duration,
    p95: Duration,
    p99: Duration,
    p999: Duration,
    p100: Duration,
    strategy: SamplingStrategy,
}

impl PercentileCurve {
    /// Creates a new `PercentileCurve` from already-parsed durations, ordered from p0 to p100.
    pub fn from_durations(durations: [Duration; 6]) -> Self {
        let [p0, p50, p95, p99, p999, p100] = durations;
        Self {
            p0,
            p50,
            p95,
            p99,
            p999,
            p100,
            strategy: SamplingStrategy::default(),
        }
    }

    /// Parses a `PercentileCurve` from its configuration.
    ///
    /// # Errors
    ///
    /// If any of the six percentile values is not a valid duration expression, an error naming the first offending
    /// field is returned, and no curve is constructed.
    pub fn parse(config: &LatencyPercentilesConfig) -> Result<Self, CurveError> {
        let curve = Self::from_durations([
            parse_field("p0", &config.p0)?,
            parse_field("p50", &config.p50)?,
            parse_field("p95", &config.p95)?,
            parse_field("p99", &config.p99)?,
            parse_field("p99.9", &config.p999)?,
            parse_field("p100", &config.p100)?,
        ]);

        Ok(curve.with_strategy(config.strategy))
    }

    /// Sets the bucket selection strategy.
    pub fn with_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns the bucket selection strategy.
    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// Returns the p0 (minimum) latency.
    pub fn p0(&self) -> Duration {
        self.p0
    }

    /// Returns the p50 latency.
    pub fn p50(&self) -> Duration {
        self.p50
    }

    /// Returns the p95 latency.
    pub fn p95(&self) -> Duration {
        self.p95
    }

    /// Returns the p99 latency.
    pub fn p99(&self) -> Duration {
        self.p99
    }

    /// Returns the p99.9 latency.
    pub fn p999(&self) -> Duration {
        self.p999
    }

    /// Returns the p100 (maximum) latency.
    ///
    /// None of the sampling strategies draw above p99.9, so this value is informational.
    pub fn p100(&self) -> Duration {
        self.p100
    }

    /// Returns all six percentile values, ordered from p0 to p100.
    pub fn durations(&self) -> [Duration; 6] {
        [self.p0, self.p50, self.p95, self.p99, self.p999, self.p100]
    }

    /// Returns `true` if the percentile values are non-decreasing.
    pub fn is_monotonic(&self) -> bool {
        self.durations().windows(2).all(|pair| pair[0] <= pair[1])
    }

    /// Samples a latency value from the curve.
    ///
    /// Two uniform draws are taken from `rng`: the first selects a bucket, and the second linearly interpolates within
    /// it. The result keeps nanosecond resolution.
    pub fn sample<R>(&self, rng: &mut R) -> Duration
    where
        R: Rng + ?Sized,
    {
        let selector: f64 = rng.random();
        let (low, high) = self.bucket(selector);
        interpolate(low, high, rng.random())
    }

    fn bucket(&self, selector: f64) -> (Duration, Duration) {
        match self.strategy {
            SamplingStrategy::Legacy => {
                if selector <= 0.001 {
                    (self.p99, self.p999)
                } else if selector <= 0.01 {
                    (self.p95, self.p99)
                } else if selector <= 0.05 {
                    (self.p50, self.p95)
                } else {
                    (self.p0, self.p50)
                }
            }
            SamplingStrategy::Ordered => {
                if selector <= 0.5 {
                    (self.p0, self.p50)
                } else if selector <= 0.95 {
                    (self.p50, self.p95)
                } else if selector <= 0.99 {
                    (self.p95, self.p99)
                } else {
                    (self.p99, self.p999)
                }
            }
        }
    }
}

fn parse_field(field: &'static str, input: &str) -> Result<Duration, CurveError> {
    parse_duration(input).map_err(|reason| CurveError::InvalidDurationFormat {
        field,
        input: input.to_string(),
        reason,
    })
}

fn interpolate(low: Duration, high: Duration, position: f64) -> Duration {
    // Only the offset within the bucket goes through `f64`, so `low` itself is never rounded.
    let span_ns = high.saturating_sub(low).as_nanos();
    let offset_ns = ((span_ns as f64 * position) as u128).min(span_ns);
    let offset = Duration::new(
        (offset_ns / NANOS_PER_SECOND) as u64,
        (offset_ns % NANOS_PER_SECOND) as u32,
    );
    low + offset
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng as _};

    use super::*;
    use crate::test_util::FixedRng;

    fn config(values: [&str; 6]) -> LatencyPercentilesConfig {
        LatencyPercentilesConfig {
            p0: values[0].to_string(),
            p50: values[1].to_string(),
            p95: values[2].to_string(),
            p99: values[3].to_string(),
            p999: values[4].to_string(),
            p100: values[5].to_string(),
            strategy: SamplingStrategy::default(),
        }
    }

    fn checkout_curve() -> PercentileCurve {
        PercentileCurve::parse(&config(["10ms", "50ms", "200ms", "500ms", "2s", "5s"])).unwrap()
    }

    #[test]
    fn parse_valid() {
        let curve = checkout_curve();
        assert_eq!(
            curve.durations(),
            [
                Duration::from_millis(10),
                Duration::from_millis(50),
                Duration::from_millis(200),
                Duration::from_millis(500),
                Duration::from_secs(2),
                Duration::from_secs(5),
            ]
        );
        assert_eq!(curve.strategy(), SamplingStrategy::Legacy);
        assert!(curve.is_monotonic());
    }

    #[test]
    fn parse_names_offending_field() {
        let result = PercentileCurve::parse(&config(["10ms", "50ms", "200ms", "500ms", "2 seconds", "5s"]));
        assert!(matches!(
            result,
            Err(CurveError::InvalidDurationFormat { field: "p99.9", input, .. }) if input == "2 seconds"
        ));

        let result = PercentileCurve::parse(&config(["", "50ms", "200ms", "500ms", "2s", "5s"]));
        assert!(matches!(
            result,
            Err(CurveError::InvalidDurationFormat { field: "p0", .. })
        ));
    }

    #[test]
    fn parse_is_idempotent() {
        let first = checkout_curve();
        let rendered = first.durations().map(|d| format!("{}ns", d.as_nanos()));
        let second = PercentileCurve::parse(&config([
            rendered[0].as_str(),
            rendered[1].as_str(),
            rendered[2].as_str(),
            rendered[3].as_str(),
            rendered[4].as_str(),
            rendered[5].as_str(),
        ]))
        .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn midpoint_draw_samples_bulk_bucket() {
        let curve = checkout_curve();
        let mut rng = FixedRng::yielding(0.5);

        let sampled = curve.sample(&mut rng);
        assert!(sampled >= Duration::from_millis(10) && sampled <= Duration::from_millis(50));
        assert_eq!(sampled, Duration::from_millis(30));
    }

    #[test]
    fn low_draw_samples_slowest_bucket() {
        let curve = checkout_curve();
        let mut rng = FixedRng::yielding(0.0);

        assert_eq!(curve.sample(&mut rng), Duration::from_millis(500));
    }

    #[test]
    fn inverted_bucket_samples_lower_bound() {
        let curve = PercentileCurve::from_durations([
            Duration::from_millis(80),
            Duration::from_millis(20),
            Duration::from_millis(200),
            Duration::from_millis(500),
            Duration::from_secs(2),
            Duration::from_secs(5),
        ]);
        assert!(!curve.is_monotonic());

        let mut rng = FixedRng::yielding(0.5);
        assert_eq!(curve.sample(&mut rng), Duration::from_millis(80));
    }

    #[test]
    fn legacy_bucket_fractions() {
        const DRAWS: usize = 100_000;

        let curve = checkout_curve();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        let mut counts = [0usize; 4];
        for _ in 0..DRAWS {
            let sampled = curve.sample(&mut rng);
            let bucket = if sampled > curve.p99() {
                0
            } else if sampled > curve.p95() {
                1
            } else if sampled > curve.p50() {
                2
            } else {
                3
            };
            counts[bucket] += 1;
        }

        let fractions = counts.map(|count| count as f64 / DRAWS as f64);
        assert!((fractions[0] - 0.001).abs() < 0.0005, "p99-p99.9 fraction: {}", fractions[0]);
        assert!((fractions[1] - 0.009).abs() < 0.002, "p95-p99 fraction: {}", fractions[1]);
        assert!((fractions[2] - 0.04).abs() < 0.005, "p50-p95 fraction: {}", fractions[2]);
        assert!((fractions[3] - 0.95).abs() < 0.005, "p0-p50 fraction: {}", fractions[3]);
    }

    #[test]
    fn ordered_strategy_reaches_above_median() {
        let curve = checkout_curve().with_strategy(SamplingStrategy::Ordered);

        let mut rng = FixedRng::yielding(0.5);
        assert_eq!(curve.sample(&mut rng), Duration::from_millis(30));

        let mut rng = FixedRng::yielding(0.75);
        let sampled = curve.sample(&mut rng);
        assert!(sampled > curve.p50() && sampled <= curve.p95());

        let mut rng = FixedRng::yielding(0.995);
        let sampled = curve.sample(&mut rng);
        assert!(sampled >= curve.p99() && sampled <= curve.p999());
    }

    #[test]
    fn sample_keeps_full_precision_for_long_durations() {
        // 2^53 + 1 nanoseconds is not representable as an `f64`.
        let value = Duration::from_nanos((1 << 53) + 1);
        let curve = PercentileCurve::from_durations([value; 6]);

        for position in [0.0, 0.5, 0.999] {
            assert_eq!(curve.sample(&mut FixedRng::yielding(position)), value);
        }

        let config = config(["9007199254740993ns"; 6]);
        let parsed = PercentileCurve::parse(&config).unwrap();
        let sampled = parsed.sample(&mut FixedRng::yielding(0.5));
        assert!(sampled >= parsed.p0());
        assert!(sampled <= parsed.p999());
    }

    #[test]
    fn sample_near_duration_max() {
        let low = Duration::MAX - Duration::from_secs(10);
        let mut durations = [Duration::MAX; 6];
        durations[0] = low;
        let curve = PercentileCurve::from_durations(durations);

        let sampled = curve.sample(&mut FixedRng::yielding(0.5));
        assert!(sampled >= low);
        assert!(sampled <= Duration::MAX);

        let sampled = curve.sample(&mut FixedRng::yielding(0.0));
        assert_eq!(sampled, Duration::MAX);
    }

    proptest! {
        #[test]
        fn property_test_sample_bounds(
            mut nanos in proptest::collection::vec(0..=i64::MAX as u64, 6),
            seed in any::<u64>(),
            ordered in any::<bool>(),
        ) {
            nanos.sort_unstable();
            let durations: [Duration; 6] = std::array::from_fn(|i| Duration::from_nanos(nanos[i]));
            let strategy = if ordered { SamplingStrategy::Ordered } else { SamplingStrategy::Legacy };
            let curve = PercentileCurve::from_durations(durations).with_strategy(strategy);

            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..64 {
                let sampled = curve.sample(&mut rng);
                prop_assert!(sampled >= curve.p0());
                prop_assert!(sampled <= curve.p999());
            }
        }
    }
}
