//! Scenario tests wiring the gate, caches, and meter together the way a
//! request handler does.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::{Value, json};

use wayfarer::Result;
use wayfarer::cache::{CacheRegistry, RegistryConfig, cache_key};
use wayfarer::clock::ManualClock;
use wayfarer::limit::{FixedWindowLimiter, GatePolicy, RateLimitPolicy, RequestGate, RequestMeta};
use wayfarer::usage::{MemoryStore, UsageLimits, UsageMeter};

/// Stand-in for the AI upstream, counting how often it is actually called.
struct UpstreamSpy {
    calls: AtomicU32,
}

impl UpstreamSpy {
    fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    async fn generate_itinerary(&self, city: &str, days: u64) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(json!({ "city": city, "days": days, "stops": ["castle", "market"] }))
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[tokio::test]
async fn permuted_params_hit_the_cache_and_skip_the_upstream() {
    let clock = Arc::new(ManualClock::new());
    let caches = CacheRegistry::new(&RegistryConfig::default(), clock);
    let upstream = UpstreamSpy::new();

    // First request: miss, compute, store.
    let key = cache_key(
        "ai:itinerary",
        &[("city", json!("Lisbon")), ("days", json!(3))],
    );
    let first = caches
        .ai_responses
        .get_or_compute(&key, || upstream.generate_itinerary("Lisbon", 3))
        .await
        .unwrap();
    assert_eq!(first["stops"], json!(["castle", "market"]));
    assert_eq!(upstream.call_count(), 1);

    // Second request builds its params in the opposite order.
    let permuted = cache_key(
        "ai:itinerary",
        &[("days", json!(3)), ("city", json!("Lisbon"))],
    );
    let second = caches
        .ai_responses
        .get_or_compute(&permuted, || upstream.generate_itinerary("Lisbon", 3))
        .await
        .unwrap();

    assert_eq!(second, first);
    // The upstream was not called again.
    assert_eq!(upstream.call_count(), 1);
}

#[tokio::test]
async fn full_request_path_gate_then_cache_then_meter() {
    let clock = Arc::new(ManualClock::new());
    let caches = CacheRegistry::new(&RegistryConfig::default(), clock.clone());
    let gate = RequestGate::new(Arc::new(FixedWindowLimiter::new(clock.clone())));
    let meter = UsageMeter::new(
        UsageLimits::default().safety_margin(1.0),
        clock,
        Arc::new(MemoryStore::new()),
    );
    let upstream = UpstreamSpy::new();
    let policy = GatePolicy::new(64 * 1024, RateLimitPolicy::per_minute(10));

    let request = RequestMeta::new("POST", "/api/itineraries/generate").with_content_length(512);

    // Boundary first.
    let decision = gate.admit(&request, "itineraries:generate", Some("user-1"), &policy);
    assert!(decision.is_allowed());

    // Handler: cache, then budget, then the metered call.
    let key = cache_key("ai:itinerary", &[("city", json!("Porto")), ("days", json!(2))]);
    let response = match caches.ai_responses.get(&key) {
        Some(cached) => cached,
        None => {
            assert!(meter.check_budget().is_allowed());
            let generated = upstream.generate_itinerary("Porto", 2).await.unwrap();
            meter.record_usage(1_200);
            caches.ai_responses.set(&key, generated.clone());
            generated
        }
    };
    assert_eq!(response["city"], json!("Porto"));
    assert_eq!(meter.counters().tokens_today, 1_200);

    // An identical follow-up request touches neither upstream nor meter.
    let decision = gate.admit(&request, "itineraries:generate", Some("user-1"), &policy);
    assert!(decision.is_allowed());
    let cached = caches.ai_responses.get(&key).expect("cached response");
    assert_eq!(cached, response);
    assert_eq!(upstream.call_count(), 1);
    assert_eq!(meter.counters().requests_today, 1);
}

#[tokio::test]
async fn exhausted_budget_vetoes_before_the_upstream_is_touched() {
    let clock = Arc::new(ManualClock::new());
    let meter = UsageMeter::new(
        UsageLimits::default()
            .requests_per_day(1)
            .safety_margin(1.0),
        clock,
        Arc::new(MemoryStore::new()),
    );
    let upstream = UpstreamSpy::new();

    assert!(meter.check_budget().is_allowed());
    upstream.generate_itinerary("Faro", 1).await.unwrap();
    meter.record_usage(800);

    // Second call of the day: vetoed pre-emptively, upstream untouched.
    assert!(!meter.check_budget().is_allowed());
    assert_eq!(upstream.call_count(), 1);
}
