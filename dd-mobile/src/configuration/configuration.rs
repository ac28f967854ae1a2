// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashMap, str::FromStr};

use crate::attribute::AttributeValue;
use crate::dd_warn;
use crate::log::LevelFilter;

use super::sources::{CompositeConfigSourceResult, CompositeSource};

pub const SDK_VERSION: &str = "0.1.0";

/// Datadog intake site.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
#[allow(non_camel_case_types)]
pub enum Site {
    #[default]
    US1,
    US3,
    US5,
    EU1,
    US1_FED,
    AP1,
}

impl Site {
    /// Host suffix of the intake endpoint for this site.
    pub fn host(&self) -> &'static str {
        match self {
            Site::US1 => "datadoghq.com",
            Site::US3 => "us3.datadoghq.com",
            Site::US5 => "us5.datadoghq.com",
            Site::EU1 => "datadoghq.eu",
            Site::US1_FED => "ddog-gov.com",
            Site::AP1 => "ap1.datadoghq.com",
        }
    }
}

impl FromStr for Site {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("us1") {
            Ok(Site::US1)
        } else if s.eq_ignore_ascii_case("us3") {
            Ok(Site::US3)
        } else if s.eq_ignore_ascii_case("us5") {
            Ok(Site::US5)
        } else if s.eq_ignore_ascii_case("eu1") {
            Ok(Site::EU1)
        } else if s.eq_ignore_ascii_case("us1_fed") {
            Ok(Site::US1_FED)
        } else if s.eq_ignore_ascii_case("ap1") {
            Ok(Site::AP1)
        } else {
            Err("site should be one of US1, US3, US5, EU1, US1_FED, AP1")
        }
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let site = match self {
            Site::US1 => "US1",
            Site::US3 => "US3",
            Site::US5 => "US5",
            Site::EU1 => "EU1",
            Site::US1_FED => "US1_FED",
            Site::AP1 => "AP1",
        };
        write!(f, "{site}")
    }
}

/// Whether the end user consented to data collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackingConsent {
    Granted,
    NotGranted,
    #[default]
    Pending,
}

impl FromStr for TrackingConsent {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("granted") {
            Ok(TrackingConsent::Granted)
        } else if s.eq_ignore_ascii_case("not_granted") {
            Ok(TrackingConsent::NotGranted)
        } else if s.eq_ignore_ascii_case("pending") {
            Ok(TrackingConsent::Pending)
        } else {
            Err("tracking consent should be one of GRANTED, NOT_GRANTED, PENDING")
        }
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
/// Finalized configuration for the mobile telemetry facade.
///
/// Consumed once at `TelemetryFacade::initialize` and immutable
/// thereafter (tracking consent is the one runtime-updatable bit, and
/// it lives on the facade, not here).
///
/// # Usage
/// ```
/// use dd_mobile::Config;
///
/// // This pulls configuration from the environment and other sources
/// let mut builder = Config::builder();
///
/// // Manual overrides
/// builder
///     .set_client_token("pub0123456789".to_string())
///     .set_env("staging".to_string());
///
/// let config = builder.build();
/// ```
pub struct Config {
    // # Intake
    client_token: String,
    site: Site,

    // # Service tagging
    env: String,
    application_id: Option<String>,
    service: Option<String>,

    // # Sampling
    /// Percentage of sessions kept, 0-100
    session_sample_rate: f64,
    /// Percentage of traces kept, 0-100
    trace_sample_rate: f64,

    // # Feature switches
    tracking_consent: TrackingConsent,
    crash_reporting_enabled: bool,
    track_user_interactions: bool,
    track_network_requests: bool,
    track_view_lifecycle: bool,

    // # Tracing
    /// Hosts the app owns, eligible for trace-header injection
    first_party_hosts: Vec<String>,

    /// Attributes added to every RUM event
    additional_attributes: HashMap<String, AttributeValue>,

    /// Verbosity of the SDK's own diagnostics
    log_level: LevelFilter,
}

impl Config {
    fn from_sources(sources: &CompositeSource) -> Self {
        let default = Config::default();

        /// Drops parse errors collected along the way; the facade has
        /// no telemetry channel of its own to report them to.
        fn to_val<T>(res: CompositeConfigSourceResult<T>) -> Option<T> {
            res.value.map(|c| c.value)
        }

        /// Wrapper to parse a "," separated string into a vector
        struct DdList(Vec<String>);

        impl FromStr for DdList {
            type Err = &'static str;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(DdList(
                    s.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| s.to_string())
                        .collect(),
                ))
            }
        }

        Self {
            client_token: to_val(sources.get("DD_CLIENT_TOKEN")).unwrap_or(default.client_token),
            site: to_val(sources.get_parse("DD_SITE")).unwrap_or(default.site),
            env: to_val(sources.get("DD_ENV")).unwrap_or(default.env),
            application_id: to_val(sources.get("DD_APPLICATION_ID")).or(default.application_id),
            service: to_val(sources.get("DD_SERVICE")).or(default.service),
            session_sample_rate: to_val(sources.get_parse("DD_SESSION_SAMPLE_RATE"))
                .unwrap_or(default.session_sample_rate),
            trace_sample_rate: to_val(sources.get_parse("DD_TRACE_SAMPLE_RATE"))
                .unwrap_or(default.trace_sample_rate),
            tracking_consent: to_val(sources.get_parse("DD_TRACKING_CONSENT"))
                .unwrap_or(default.tracking_consent),
            crash_reporting_enabled: to_val(sources.get_parse("DD_CRASH_REPORTING_ENABLED"))
                .unwrap_or(default.crash_reporting_enabled),
            track_user_interactions: to_val(sources.get_parse("DD_TRACK_USER_INTERACTIONS"))
                .unwrap_or(default.track_user_interactions),
            track_network_requests: to_val(sources.get_parse("DD_TRACK_NETWORK_REQUESTS"))
                .unwrap_or(default.track_network_requests),
            track_view_lifecycle: to_val(sources.get_parse("DD_TRACK_VIEW_LIFECYCLE"))
                .unwrap_or(default.track_view_lifecycle),
            first_party_hosts: to_val(sources.get_parse::<DdList>("DD_FIRST_PARTY_HOSTS"))
                .map(|DdList(hosts)| hosts)
                .unwrap_or(default.first_party_hosts),
            additional_attributes: default.additional_attributes,
            log_level: to_val(sources.get_parse("DD_LOG_LEVEL")).unwrap_or(default.log_level),
        }
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn builder_with_sources(sources: &CompositeSource) -> ConfigBuilder {
        ConfigBuilder {
            config: Config::from_sources(sources),
        }
    }

    /// Creates a new builder to override detected configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Config::from_sources(&CompositeSource::default_sources()),
        }
    }

    pub fn client_token(&self) -> &str {
        &self.client_token
    }

    pub fn site(&self) -> Site {
        self.site
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn application_id(&self) -> Option<&str> {
        self.application_id.as_deref()
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn session_sample_rate(&self) -> f64 {
        self.session_sample_rate
    }

    pub fn trace_sample_rate(&self) -> f64 {
        self.trace_sample_rate
    }

    pub fn tracking_consent(&self) -> TrackingConsent {
        self.tracking_consent
    }

    pub fn crash_reporting_enabled(&self) -> bool {
        self.crash_reporting_enabled
    }

    pub fn track_user_interactions(&self) -> bool {
        self.track_user_interactions
    }

    pub fn track_network_requests(&self) -> bool {
        self.track_network_requests
    }

    pub fn track_view_lifecycle(&self) -> bool {
        self.track_view_lifecycle
    }

    pub fn first_party_hosts(&self) -> impl Iterator<Item = &str> {
        self.first_party_hosts.iter().map(String::as_str)
    }

    /// Whether `host` belongs to the application, making requests to it
    /// eligible for trace-header injection.
    pub fn is_first_party_host(&self, host: &str) -> bool {
        self.first_party_hosts.iter().any(|first_party| {
            host == first_party
                || (host.ends_with(first_party)
                    && host.as_bytes().get(host.len() - first_party.len() - 1) == Some(&b'.'))
        })
    }

    pub fn additional_attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.additional_attributes
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client_token: String::new(),
            site: Site::default(),
            env: "prod".to_string(),
            application_id: None,
            service: None,
            session_sample_rate: 100.0,
            trace_sample_rate: 100.0,
            tracking_consent: TrackingConsent::default(),
            crash_reporting_enabled: false,
            track_user_interactions: false,
            track_network_requests: false,
            track_view_lifecycle: false,
            first_party_hosts: Vec::new(),
            additional_attributes: HashMap::new(),
            log_level: LevelFilter::default(),
        }
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Finalizes the builder and returns the configuration
    pub fn build(mut self) -> Config {
        self.config.session_sample_rate =
            clamp_rate(self.config.session_sample_rate, "session_sample_rate");
        self.config.trace_sample_rate =
            clamp_rate(self.config.trace_sample_rate, "trace_sample_rate");
        self.config
    }

    pub fn set_client_token(&mut self, client_token: String) -> &mut Self {
        self.config.client_token = client_token;
        self
    }

    pub fn set_site(&mut self, site: Site) -> &mut Self {
        self.config.site = site;
        self
    }

    pub fn set_env(&mut self, env: String) -> &mut Self {
        self.config.env = env;
        self
    }

    pub fn set_application_id(&mut self, application_id: String) -> &mut Self {
        self.config.application_id = Some(application_id);
        self
    }

    pub fn set_service(&mut self, service: String) -> &mut Self {
        self.config.service = Some(service);
        self
    }

    pub fn set_session_sample_rate(&mut self, rate: f64) -> &mut Self {
        self.config.session_sample_rate = rate;
        self
    }

    pub fn set_trace_sample_rate(&mut self, rate: f64) -> &mut Self {
        self.config.trace_sample_rate = rate;
        self
    }

    pub fn set_tracking_consent(&mut self, consent: TrackingConsent) -> &mut Self {
        self.config.tracking_consent = consent;
        self
    }

    pub fn set_crash_reporting_enabled(&mut self, enabled: bool) -> &mut Self {
        self.config.crash_reporting_enabled = enabled;
        self
    }

    pub fn set_track_user_interactions(&mut self, enabled: bool) -> &mut Self {
        self.config.track_user_interactions = enabled;
        self
    }

    pub fn set_track_network_requests(&mut self, enabled: bool) -> &mut Self {
        self.config.track_network_requests = enabled;
        self
    }

    pub fn set_track_view_lifecycle(&mut self, enabled: bool) -> &mut Self {
        self.config.track_view_lifecycle = enabled;
        self
    }

    pub fn set_first_party_hosts(&mut self, hosts: Vec<String>) -> &mut Self {
        self.config.first_party_hosts = hosts;
        self
    }

    pub fn add_first_party_host(&mut self, host: String) -> &mut Self {
        self.config.first_party_hosts.push(host);
        self
    }

    pub fn set_additional_attributes(
        &mut self,
        attributes: HashMap<String, AttributeValue>,
    ) -> &mut Self {
        self.config.additional_attributes = attributes;
        self
    }

    pub fn add_additional_attribute(
        &mut self,
        key: String,
        value: impl Into<AttributeValue>,
    ) -> &mut Self {
        self.config
            .additional_attributes
            .insert(key, value.into());
        self
    }

    pub fn set_log_level(&mut self, log_level: LevelFilter) -> &mut Self {
        self.config.log_level = log_level;
        self
    }
}

fn clamp_rate(rate: f64, name: &str) -> f64 {
    if !(0.0..=100.0).contains(&rate) {
        dd_warn!("Configuration: {name} {rate} is outside 0-100, clamping");
        rate.clamp(0.0, 100.0)
    } else {
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Site, TrackingConsent};
    use crate::configuration::sources::{CompositeSource, ConfigSourceOrigin, HashMapSource};

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.site(), Site::US1);
        assert_eq!(config.session_sample_rate(), 100.0);
        assert_eq!(config.trace_sample_rate(), 100.0);
        assert_eq!(config.tracking_consent(), TrackingConsent::Pending);
        assert!(!config.crash_reporting_enabled());
        assert_eq!(config.first_party_hosts().count(), 0);
    }

    #[test]
    fn test_config_from_source() {
        let mut sources = CompositeSource::new();
        sources.add_source(HashMapSource::from_iter(
            [
                ("DD_CLIENT_TOKEN", "pubtoken"),
                ("DD_ENV", "staging"),
                ("DD_SITE", "eu1"),
                ("DD_APPLICATION_ID", "app-id"),
                ("DD_SERVICE", "shop-app"),
                ("DD_SESSION_SAMPLE_RATE", "20.5"),
                ("DD_TRACE_SAMPLE_RATE", "50"),
                ("DD_TRACKING_CONSENT", "granted"),
                ("DD_CRASH_REPORTING_ENABLED", "true"),
                ("DD_FIRST_PARTY_HOSTS", "api.shop.com, cdn.shop.com"),
                ("DD_LOG_LEVEL", "DEBUG"),
            ],
            ConfigSourceOrigin::EnvVar,
        ));
        let config = Config::builder_with_sources(&sources).build();

        assert_eq!(config.client_token(), "pubtoken");
        assert_eq!(config.env(), "staging");
        assert_eq!(config.site(), Site::EU1);
        assert_eq!(config.application_id(), Some("app-id"));
        assert_eq!(config.service(), Some("shop-app"));
        assert_eq!(config.session_sample_rate(), 20.5);
        assert_eq!(config.trace_sample_rate(), 50.0);
        assert_eq!(config.tracking_consent(), TrackingConsent::Granted);
        assert!(config.crash_reporting_enabled());
        assert_eq!(
            config.first_party_hosts().collect::<Vec<_>>(),
            vec!["api.shop.com", "cdn.shop.com"]
        );
        assert_eq!(config.log_level(), crate::log::LevelFilter::Debug);
    }

    #[test]
    fn test_builder_overrides_sources() {
        let mut sources = CompositeSource::new();
        sources.add_source(HashMapSource::from_iter(
            [("DD_ENV", "staging"), ("DD_SITE", "eu1")],
            ConfigSourceOrigin::EnvVar,
        ));
        let mut builder = Config::builder_with_sources(&sources);
        builder.set_env("prod".to_string());
        builder.set_site(Site::US3);
        builder.set_session_sample_rate(42.0);
        let config = builder.build();

        assert_eq!(config.env(), "prod");
        assert_eq!(config.site(), Site::US3);
        assert_eq!(config.session_sample_rate(), 42.0);
    }

    #[test]
    fn test_sample_rates_are_clamped() {
        let mut builder = Config::builder_with_sources(&CompositeSource::new());
        builder.set_session_sample_rate(150.0);
        builder.set_trace_sample_rate(-1.0);
        let config = builder.build();

        assert_eq!(config.session_sample_rate(), 100.0);
        assert_eq!(config.trace_sample_rate(), 0.0);
    }

    #[test]
    fn test_first_party_host_matching() {
        let mut builder = Config::builder_with_sources(&CompositeSource::new());
        builder.set_first_party_hosts(vec!["shop.com".to_string()]);
        let config = builder.build();

        assert!(config.is_first_party_host("shop.com"));
        assert!(config.is_first_party_host("api.shop.com"));
        assert!(!config.is_first_party_host("othershop.com"));
        assert!(!config.is_first_party_host("shop.com.evil.io"));
    }

    #[test]
    fn test_site_parsing() {
        use std::str::FromStr;

        assert_eq!(Site::from_str("us1_fed"), Ok(Site::US1_FED));
        assert_eq!(Site::from_str("AP1"), Ok(Site::AP1));
        assert!(Site::from_str("moon1").is_err());
        assert_eq!(Site::EU1.host(), "datadoghq.eu");
    }
}
