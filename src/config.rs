//! Configuration loading.
//!
//! All tunables live in one TOML file with the following resolution order:
//! 1. explicit path (e.g. from a `--config` flag in the embedding service)
//! 2. `~/.wayfarer/config.toml`
//! 3. built-in defaults
//!
//! Every field has a default, so a partial file only overrides what it
//! names. Sections map one-to-one onto the subsystem configs:
//! `[caches]` → [`RegistryConfig`], `[gate]` → [`GatePolicy`],
//! `[usage]` → [`UsageLimits`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::RegistryConfig;
use crate::limit::{GatePolicy, RateLimitPolicy};
use crate::usage::UsageLimits;
use crate::{Result, WayfarerError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub caches: CachesConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

/// `[caches]` — per-instance TTLs in seconds and the shared entry cap.
#[derive(Debug, Clone, Deserialize)]
pub struct CachesConfig {
    /// Maximum entries per cache instance (default: 10,000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// AI-response TTL in seconds (default: 1 hour).
    #[serde(default = "default_ai_responses_ttl")]
    pub ai_responses_ttl_secs: u64,
    /// Geocode TTL in seconds (default: 24 hours).
    #[serde(default = "default_geocoding_ttl")]
    pub geocoding_ttl_secs: u64,
    /// Place-details TTL in seconds (default: 30 days).
    #[serde(default = "default_place_details_ttl")]
    pub place_details_ttl_secs: u64,
    /// Destination-locations TTL in seconds (default: 7 days).
    #[serde(default = "default_destination_locations_ttl")]
    pub destination_locations_ttl_secs: u64,
    /// Groups-list TTL in seconds (default: 2 minutes).
    #[serde(default = "default_list_ttl")]
    pub group_lists_ttl_secs: u64,
    /// Shared-itineraries-list TTL in seconds (default: 2 minutes).
    #[serde(default = "default_list_ttl")]
    pub shared_itineraries_ttl_secs: u64,
    /// User-profile TTL in seconds (default: 5 minutes).
    #[serde(default = "default_user_profiles_ttl")]
    pub user_profiles_ttl_secs: u64,
    /// Saved-items TTL in seconds (default: 10 minutes).
    #[serde(default = "default_saved_items_ttl")]
    pub saved_items_ttl_secs: u64,
}

impl Default for CachesConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ai_responses_ttl_secs: default_ai_responses_ttl(),
            geocoding_ttl_secs: default_geocoding_ttl(),
            place_details_ttl_secs: default_place_details_ttl(),
            destination_locations_ttl_secs: default_destination_locations_ttl(),
            group_lists_ttl_secs: default_list_ttl(),
            shared_itineraries_ttl_secs: default_list_ttl(),
            user_profiles_ttl_secs: default_user_profiles_ttl(),
            saved_items_ttl_secs: default_saved_items_ttl(),
        }
    }
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_ai_responses_ttl() -> u64 {
    3600
}

fn default_geocoding_ttl() -> u64 {
    24 * 3600
}

fn default_place_details_ttl() -> u64 {
    30 * 24 * 3600
}

fn default_destination_locations_ttl() -> u64 {
    7 * 24 * 3600
}

fn default_list_ttl() -> u64 {
    120
}

fn default_user_profiles_ttl() -> u64 {
    300
}

fn default_saved_items_ttl() -> u64 {
    600
}

impl CachesConfig {
    /// Convert to the registry's config type.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::new()
            .max_entries(self.max_entries)
            .ai_responses_ttl(Duration::from_secs(self.ai_responses_ttl_secs))
            .geocoding_ttl(Duration::from_secs(self.geocoding_ttl_secs))
            .place_details_ttl(Duration::from_secs(self.place_details_ttl_secs))
            .destination_locations_ttl(Duration::from_secs(self.destination_locations_ttl_secs))
            .group_lists_ttl(Duration::from_secs(self.group_lists_ttl_secs))
            .shared_itineraries_ttl(Duration::from_secs(self.shared_itineraries_ttl_secs))
            .user_profiles_ttl(Duration::from_secs(self.user_profiles_ttl_secs))
            .saved_items_ttl(Duration::from_secs(self.saved_items_ttl_secs))
    }
}

/// `[gate]` — the boundary guard's default route policy.
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Maximum declared body size in bytes (default: 1 MiB).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
    /// Requests admitted per window (default: 60).
    #[serde(default = "default_rate_max_requests")]
    pub rate_max_requests: u32,
    /// Window length in seconds (default: 60).
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            rate_max_requests: default_rate_max_requests(),
            rate_window_secs: default_rate_window_secs(),
        }
    }
}

fn default_max_body_bytes() -> u64 {
    1024 * 1024
}

fn default_rate_max_requests() -> u32 {
    60
}

fn default_rate_window_secs() -> u64 {
    60
}

impl GateConfig {
    /// Convert to the gate's policy type.
    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy::new(
            self.max_body_bytes,
            RateLimitPolicy::new(
                self.rate_max_requests,
                Duration::from_secs(self.rate_window_secs),
            ),
        )
    }
}

/// `[usage]` — nominal vendor ceilings and the enforced margin.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageConfig {
    /// Nominal requests per day (default: 1,500).
    #[serde(default = "default_requests_per_day")]
    pub requests_per_day: u32,
    /// Nominal requests per minute (default: 15).
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Nominal tokens per day (default: 1,000,000).
    #[serde(default = "default_tokens_per_day")]
    pub tokens_per_day: u64,
    /// Enforced fraction of each nominal ceiling (default: 0.5).
    #[serde(default = "default_safety_margin")]
    pub safety_margin: f64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            requests_per_day: default_requests_per_day(),
            requests_per_minute: default_requests_per_minute(),
            tokens_per_day: default_tokens_per_day(),
            safety_margin: default_safety_margin(),
        }
    }
}

fn default_requests_per_day() -> u32 {
    1_500
}

fn default_requests_per_minute() -> u32 {
    15
}

fn default_tokens_per_day() -> u64 {
    1_000_000
}

fn default_safety_margin() -> f64 {
    0.5
}

impl UsageConfig {
    /// Convert to the meter's limits type.
    pub fn usage_limits(&self) -> UsageLimits {
        UsageLimits::new()
            .requests_per_day(self.requests_per_day)
            .requests_per_minute(self.requests_per_minute)
            .tokens_per_day(self.tokens_per_day)
            .safety_margin(self.safety_margin)
    }
}

/// `[maintenance]` — background sweep cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    /// Seconds between cache cleanup / window sweeps (default: 300).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    300
}

impl CoreConfig {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist; otherwise `~/.wayfarer/config.toml`
    /// is used if present, else the built-in defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match Self::resolve_config_path(explicit_path)? {
            Some(path) => path,
            None => return Ok(Self::default()),
        };
        let content = fs::read_to_string(&path).map_err(|e| {
            WayfarerError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            WayfarerError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(WayfarerError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".wayfarer").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        Ok(None)
    }

    /// Reject values the subsystems cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.usage.safety_margin > 0.0 && self.usage.safety_margin <= 1.0) {
            return Err(WayfarerError::Configuration(format!(
                "usage.safety_margin must be in (0, 1], got {}",
                self.usage.safety_margin
            )));
        }
        if self.gate.rate_window_secs == 0 {
            return Err(WayfarerError::Configuration(
                "gate.rate_window_secs must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}
