use std::time::Duration;

use rand::{rngs::StdRng, SeedableRng as _};
use switchyard_topology::{
    config::TopologyConfig, BuildError, CurveError, Flag, StaticFlagRegistry, Topology, ValidationError,
};

const STOREFRONT: &str = r#"
services:
  - serviceName: frontend
    tagSets:
      - tags:
          team: web
    resourceAttrSets:
      - attributes:
          host.name: frontend-1
      - attributes:
          host.name: frontend-2
        probability: 0.5
    routes:
      - route: /checkout
        downstreamCalls:
          checkout: pay
        maxLatencyMillis: 1500
        tagSets:
          - tags:
              http.method: POST
  - serviceName: checkout
    routes:
      - route: pay
        downstreamCalls:
          ledger: commit
        maxLatencyMillis: 900
        latencyPercentiles:
          p0: 10ms
          p50: 50ms
          p95: 200ms
          p99: 500ms
          p99.9: 2s
          p100: 5s
      - route: pay-v2
        downstreamCalls:
          ledger: commit
        maxLatencyMillis: 900
        flag_set: new-payments
  - serviceName: ledger
    routes:
      - route: commit
        latencyPercentiles:
          p0: 500us
          p50: 2ms
          p95: 8ms
          p99: 20ms
          p99.9: 75ms
          p100: 150ms
"#;

fn build(yaml: &str) -> Result<Topology, BuildError> {
    let config: TopologyConfig = serde_yaml::from_str(yaml).expect("should not fail to parse topology");
    Topology::from_config(config, &mut StdRng::seed_from_u64(42))
}

fn flags(new_payments: bool) -> StaticFlagRegistry {
    StaticFlagRegistry::from_flags([Flag::new("new-payments", new_payments)]).expect("flags should be unique")
}

#[test]
fn storefront_builds_and_validates() {
    let topology = build(STOREFRONT).unwrap();
    assert_eq!(topology.len(), 3);
    assert_eq!(topology.validate_all(&flags(false)), Ok(()));

    let frontend = topology.service("frontend").unwrap();
    let tag_sets = frontend.tag_sets("/checkout");
    assert_eq!(tag_sets.len(), 2);
    assert_eq!(tag_sets[0].tags["team"], "web");
    assert_eq!(tag_sets[1].tags["http.method"], "POST");

    for _ in 0..100 {
        let selected = frontend.resource_attribute_set().expect("first set is always generated");
        assert!(selected.attributes["host.name"].starts_with("frontend-"));
    }
}

#[test]
fn storefront_flag_gates() {
    let topology = build(STOREFRONT).unwrap();

    let pay_v2 = topology.route("checkout", "pay-v2").unwrap();
    assert!(!pay_v2.is_active(&flags(false)));
    assert!(pay_v2.is_active(&flags(true)));

    let result = topology.validate_all(&StaticFlagRegistry::new());
    assert!(matches!(
        result,
        Err(ValidationError::UnknownFlag { ref flag, .. }) if flag == "new-payments"
    ));
}

#[test]
fn storefront_latency_samples() {
    let topology = build(STOREFRONT).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    let commit = topology.route("ledger", "commit").unwrap();
    for _ in 0..10_000 {
        let sampled = commit.sample_latency(&mut rng).unwrap();
        assert!(sampled >= Duration::from_micros(500));
        assert!(sampled <= Duration::from_millis(75));
    }

    let checkout = topology.route("frontend", "/checkout").unwrap();
    for _ in 0..10_000 {
        let sampled = checkout.sample_latency(&mut rng).unwrap();
        assert!(sampled <= Duration::from_millis(1500));
    }
}

#[test]
fn missing_downstream_route_is_named() {
    let yaml = r#"
services:
  - serviceName: checkout
    routes:
      - route: pay
        downstreamCalls:
          ledger: commit
        maxLatencyMillis: 300
  - serviceName: ledger
    routes:
      - route: rollback
"#;

    let topology = build(yaml).unwrap();
    let error = topology.validate_all(&StaticFlagRegistry::new()).unwrap_err();
    assert_eq!(
        error,
        ValidationError::UnknownRoute {
            service: "checkout".to_string(),
            route: "pay".to_string(),
            downstream_service: "ledger".to_string(),
            downstream_route: "commit".to_string(),
        }
    );
    assert_eq!(
        error.to_string(),
        "route 'checkout/pay' calls downstream service 'ledger', which does not have route 'commit' defined"
    );
}

#[test]
fn invalid_percentile_fails_build() {
    let yaml = r#"
services:
  - serviceName: ledger
    routes:
      - route: commit
        latencyPercentiles:
          p0: 1ms
          p50: 2ms
          p95: 3ms
          p99: 4ms
          p99.9: soon
          p100: 6ms
"#;

    let error = build(yaml).map(|_| ()).unwrap_err();
    match error {
        BuildError::InvalidLatencyPercentiles { service, route, source } => {
            assert_eq!(service, "ledger");
            assert_eq!(route, "commit");
            assert!(matches!(source, CurveError::InvalidDurationFormat { field: "p99.9", .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn json_documents_use_the_same_shape() {
    let json = r#"{
        "services": [
            {
                "serviceName": "checkout",
                "routes": [
                    { "route": "pay", "downstreamCalls": { "ledger": "commit" }, "maxLatencyMillis": 0 }
                ]
            },
            { "serviceName": "ledger", "routes": [{ "route": "commit" }] }
        ]
    }"#;

    let config: TopologyConfig = serde_json::from_str(json).unwrap();
    let topology = Topology::from_config(config, &mut StdRng::seed_from_u64(42)).unwrap();
    assert!(matches!(
        topology.validate_all(&StaticFlagRegistry::new()),
        Err(ValidationError::MissingLatencyBudget { .. })
    ));
}

#[test]
fn metrics_key_is_ignored() {
    let yaml = r#"
services:
  - serviceName: ledger
    metrics:
      - name: ledger.commits
        type: Sum
    routes:
      - route: commit
        maxLatencyMillis: 10
"#;

    let topology = build(yaml).unwrap();
    assert_eq!(topology.validate_all(&StaticFlagRegistry::new()), Ok(()));
    assert_eq!(topology.route("ledger", "commit").map(|route| route.max_latency_millis()), Some(10));
}
