//! Helpers for calling budgeted external resources.
//!
//! The cache and meter decide *whether* an upstream call happens; these
//! helpers shape *how* it happens when it does:
//!
//! - [`with_fallback`] — try alternative configurations (model variants,
//!   endpoints) in a fixed preference order, propagating an error only
//!   after every alternative is exhausted. A vendor 404 for one model
//!   variant should degrade to the next variant, not to the user.
//! - [`with_timeout`] — bound credential/config discovery calls so a
//!   hung collaborator reads as "not configured" instead of hanging the
//!   request.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::{Result, WayfarerError};

/// Execute `attempt` against each alternative in preference order.
///
/// Returns the first success. Failures short of the last are logged and
/// swallowed; the last failure is propagated. An empty alternatives list
/// is a configuration mistake and reported as
/// [`WayfarerError::NoAlternatives`].
pub async fn with_fallback<C, T, F, Fut>(alternatives: &[C], mut attempt: F) -> Result<T>
where
    F: FnMut(&C) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for alternative in alternatives {
        match attempt(alternative).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(error = %e, "upstream alternative failed, trying next");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(WayfarerError::NoAlternatives))
}

/// Bound an external discovery call to `limit`.
///
/// An overrun maps to [`WayfarerError::NotConfigured`] carrying `label`,
/// so callers can treat a silent collaborator as an absent integration
/// rather than an outage.
pub async fn with_timeout<T, Fut>(limit: Duration, label: &str, future: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(WayfarerError::NotConfigured(label.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn fallback_stops_at_first_success() {
        let calls = AtomicU32::new(0);
        let models = ["primary", "secondary", "tertiary"];

        let result = with_fallback(&models, |model| {
            calls.fetch_add(1, Ordering::Relaxed);
            let model = *model;
            async move {
                if model == "secondary" {
                    Ok(model)
                } else {
                    Err(WayfarerError::Upstream(format!("{model} unavailable")))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "secondary");
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn fallback_propagates_the_last_error() {
        let models = ["a", "b"];
        let result: Result<()> = with_fallback(&models, |model| {
            let model = *model;
            async move { Err(WayfarerError::Upstream(format!("{model} down"))) }
        })
        .await;

        match result {
            Err(WayfarerError::Upstream(msg)) => assert_eq!(msg, "b down"),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_alternatives_is_reported() {
        let models: [&str; 0] = [];
        let result: Result<()> = with_fallback(&models, |_| async { Ok(()) }).await;
        assert!(matches!(result, Err(WayfarerError::NoAlternatives)));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_maps_to_not_configured() {
        let result: Result<()> = with_timeout(Duration::from_millis(50), "admin-usage", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        match result {
            Err(WayfarerError::NotConfigured(label)) => assert_eq!(label, "admin-usage"),
            other => panic!("expected NotConfigured, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fast_call_passes_through_the_timeout() {
        let result = with_timeout(Duration::from_secs(5), "admin-usage", async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
