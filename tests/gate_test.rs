//! Tests for [`RequestGate`] — size-before-rate ordering and
//! self-describing headers.

use std::sync::Arc;
use std::time::Duration;

use wayfarer::clock::ManualClock;
use wayfarer::limit::{
    FixedWindowLimiter, GateDecision, GatePolicy, RateLimitPolicy, RequestGate, RequestMeta,
    STATUS_PAYLOAD_TOO_LARGE, STATUS_TOO_MANY_REQUESTS,
    gate::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET, RETRY_AFTER},
};

fn gate() -> (Arc<ManualClock>, RequestGate) {
    let clock = Arc::new(ManualClock::new());
    let gate = RequestGate::new(Arc::new(FixedWindowLimiter::new(clock.clone())));
    (clock, gate)
}

fn header<'a>(decision: &'a GateDecision, name: &str) -> Option<&'a str> {
    decision
        .headers()
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

#[test]
fn allowed_responses_are_self_describing() {
    let (_, gate) = gate();
    let policy = GatePolicy::new(1024, RateLimitPolicy::new(5, Duration::from_secs(60)));
    let req = RequestMeta::new("GET", "/api/groups");

    let decision = gate.admit(&req, "groups:list", Some("user-1"), &policy);
    assert!(decision.is_allowed());
    assert_eq!(header(&decision, RATE_LIMIT_LIMIT), Some("5"));
    assert_eq!(header(&decision, RATE_LIMIT_REMAINING), Some("4"));
    // Reset header parses as an ISO-8601 timestamp
    let reset = header(&decision, RATE_LIMIT_RESET).unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(reset).is_ok());
}

#[test]
fn oversized_body_is_rejected_before_rate_bookkeeping() {
    let (_, gate) = gate();
    let policy = GatePolicy::new(1024, RateLimitPolicy::new(1, Duration::from_secs(60)));
    let big = RequestMeta::new("POST", "/api/itineraries").with_content_length(10_000);

    match gate.admit(&big, "itineraries:create", Some("user-1"), &policy) {
        GateDecision::Denied { status, .. } => assert_eq!(status, STATUS_PAYLOAD_TOO_LARGE),
        other => panic!("expected denial, got {other:?}"),
    }

    // The rejected request consumed no allowance: with a cap of 1, a
    // well-sized request still gets through.
    let small = RequestMeta::new("POST", "/api/itineraries").with_content_length(100);
    assert!(
        gate.admit(&small, "itineraries:create", Some("user-1"), &policy)
            .is_allowed()
    );
}

#[test]
fn eleven_requests_against_ten_per_minute_yields_one_denial() {
    let (_, gate) = gate();
    let policy = GatePolicy::new(1024 * 1024, RateLimitPolicy::per_minute(10));
    let req = RequestMeta::new("POST", "/api/itineraries/generate");

    let decisions: Vec<GateDecision> = (0..11)
        .map(|_| gate.admit(&req, "itineraries:generate", Some("user-1"), &policy))
        .collect();

    let denials: Vec<&GateDecision> = decisions.iter().filter(|d| !d.is_allowed()).collect();
    assert_eq!(denials.len(), 1);
    // The denial is the 11th request
    assert!(decisions[..10].iter().all(|d| d.is_allowed()));

    match denials[0] {
        GateDecision::Denied {
            status,
            retry_after_secs,
            ..
        } => {
            assert_eq!(*status, STATUS_TOO_MANY_REQUESTS);
            assert!(retry_after_secs.is_some());
        }
        other => panic!("expected denial, got {other:?}"),
    }
    assert_eq!(header(denials[0], RATE_LIMIT_REMAINING), Some("0"));
    assert!(header(denials[0], RETRY_AFTER).is_some());
}

#[test]
fn identity_falls_back_to_forwarded_header() {
    let (_, gate) = gate();
    let policy = GatePolicy::new(1024, RateLimitPolicy::new(1, Duration::from_secs(60)));

    let from_a = RequestMeta::new("GET", "/api/groups").with_header("x-forwarded-for", "203.0.113.9");
    let from_b = RequestMeta::new("GET", "/api/groups").with_header("x-forwarded-for", "203.0.113.10");

    assert!(gate.admit(&from_a, "groups:list", None, &policy).is_allowed());
    // Same proxy chain, different client: separate bucket
    assert!(gate.admit(&from_b, "groups:list", None, &policy).is_allowed());
    // Same client again: exhausted
    assert!(!gate.admit(&from_a, "groups:list", None, &policy).is_allowed());
}

#[test]
fn denied_window_recovers_after_reset() {
    let (clock, gate) = gate();
    let policy = GatePolicy::new(1024, RateLimitPolicy::new(1, Duration::from_secs(30)));
    let req = RequestMeta::new("GET", "/api/groups");

    assert!(gate.admit(&req, "groups:list", Some("user-1"), &policy).is_allowed());
    assert!(!gate.admit(&req, "groups:list", Some("user-1"), &policy).is_allowed());

    clock.advance(Duration::from_secs(31));
    assert!(gate.admit(&req, "groups:list", Some("user-1"), &policy).is_allowed());
}
