// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{borrow::Cow, fmt::Display, str::FromStr};

/// Source of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSourceOrigin {
    Default,
    EnvVar,
    Code,
}

#[derive(Debug, PartialEq)]
pub(crate) struct ConfigKey<T> {
    pub(crate) value: T,
    #[allow(unused)]
    pub(crate) origin: ConfigSourceOrigin,
}

/// Compose multiple sources of configuration together.
///
/// The higher precedence sources are the first ones in the list.
pub struct CompositeSource {
    sources: Vec<Box<dyn ConfigurationSource>>,
}

impl CompositeSource {
    pub fn add_source<C: ConfigurationSource + 'static>(&mut self, source: C) {
        self.sources.push(Box::new(source));
    }

    pub fn new() -> Self {
        CompositeSource {
            sources: Vec::new(),
        }
    }

    pub fn default_sources() -> Self {
        let mut sources = Self::new();
        sources.add_source(EnvSource);
        sources
    }
}

impl Default for CompositeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(unused)]
#[derive(Debug, PartialEq)]
pub(crate) struct CompositeParseError {
    desired_type: &'static str,
    error: Cow<'static, str>,
    value: String,
    origin: ConfigSourceOrigin,
}

#[derive(Debug, PartialEq)]
pub(crate) struct CompositeConfigSourceResult<T> {
    #[allow(unused)]
    pub name: &'static str,
    pub value: Option<ConfigKey<T>>,
    #[allow(unused)]
    pub errors: Vec<CompositeParseError>,
}

impl CompositeSource {
    pub(crate) fn get(&self, key: &'static str) -> CompositeConfigSourceResult<String> {
        self.get_parse(key)
    }

    /// Get a value from the configuration sources
    ///
    /// This method will iterate over sources in order of precedence
    /// and return the first valid value found. If no value is found, it
    /// will return None.
    pub(crate) fn get_parse<T: FromStr<Err = impl Display>>(
        &self,
        name: &'static str,
    ) -> CompositeConfigSourceResult<T> {
        let mut errors = Vec::new();
        for s in &self.sources {
            match s.get(name).and_then(|value| {
                value
                    .parse::<T>()
                    .map_err(|e| ConfigSourceError::FailedParsing {
                        desired_type: std::any::type_name::<T>(),
                        error: Cow::Owned(e.to_string()),
                        value,
                    })
            }) {
                Ok(v) => {
                    return CompositeConfigSourceResult {
                        name,
                        value: Some(ConfigKey {
                            value: v,
                            origin: s.origin(),
                        }),
                        errors,
                    };
                }
                Err(ConfigSourceError::Missing) => continue,
                Err(ConfigSourceError::FailedParsing {
                    error,
                    value,
                    desired_type,
                }) => {
                    errors.push(CompositeParseError {
                        desired_type,
                        error,
                        value,
                        origin: s.origin(),
                    });
                }
            }
        }
        CompositeConfigSourceResult {
            name,
            value: None,
            errors,
        }
    }
}

pub(crate) enum ConfigSourceError {
    Missing,
    FailedParsing {
        desired_type: &'static str,
        error: Cow<'static, str>,
        // String representation of the value we failed to parse
        value: String,
    },
}

type ConfigSourceResult<T> = Result<T, ConfigSourceError>;

/// Represent a source of configuration
pub trait ConfigurationSource {
    fn origin(&self) -> ConfigSourceOrigin;

    fn get(&self, key: &'static str) -> ConfigSourceResult<String>;
}

pub(crate) struct EnvSource;

impl ConfigurationSource for EnvSource {
    fn origin(&self) -> ConfigSourceOrigin {
        ConfigSourceOrigin::EnvVar
    }

    fn get(&self, key: &'static str) -> ConfigSourceResult<String> {
        std::env::var(key).map_err(|_| ConfigSourceError::Missing)
    }
}

/// A source of configuration that is backed by a HashMap.
/// This is used only for testing purposes.
pub struct HashMapSource {
    map: std::collections::HashMap<String, String>,
    origin: ConfigSourceOrigin,
}

impl HashMapSource {
    pub fn from_iter<U: ToString, V: ToString, T: IntoIterator<Item = (U, V)>>(
        map: T,
        origin: ConfigSourceOrigin,
    ) -> Self {
        HashMapSource {
            map: map
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            origin,
        }
    }
}

impl ConfigurationSource for HashMapSource {
    fn origin(&self) -> ConfigSourceOrigin {
        self.origin
    }

    fn get(&self, key: &'static str) -> ConfigSourceResult<String> {
        self.map.get(key).cloned().ok_or(ConfigSourceError::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CompositeConfigSourceResult, CompositeSource, ConfigKey, ConfigSourceOrigin, HashMapSource,
    };

    #[test]
    fn test_composite_source_single_origin() {
        let mut source = CompositeSource::new();
        source.add_source(HashMapSource::from_iter(
            [("DD_CLIENT_TOKEN", "abcdef"), ("DD_ENV", "staging")],
            ConfigSourceOrigin::EnvVar,
        ));

        let result = source.get("DD_CLIENT_TOKEN");
        assert_eq!(
            result,
            CompositeConfigSourceResult {
                name: "DD_CLIENT_TOKEN",
                value: Some(ConfigKey {
                    value: "abcdef".to_string(),
                    origin: ConfigSourceOrigin::EnvVar,
                }),
                errors: vec![],
            }
        );

        let missing = source.get("DD_APPLICATION_ID");
        assert!(missing.value.is_none());
        assert!(missing.errors.is_empty());
    }

    #[test]
    fn test_composite_priority_order() {
        let mut source = CompositeSource::new();
        source.add_source(HashMapSource::from_iter(
            [("DD_ENV", "from-code")],
            ConfigSourceOrigin::Code,
        ));
        source.add_source(HashMapSource::from_iter(
            [("DD_ENV", "from-env"), ("DD_SITE", "eu1")],
            ConfigSourceOrigin::EnvVar,
        ));

        let env = source.get("DD_ENV");
        assert_eq!(env.value.unwrap().value, "from-code");

        let site = source.get("DD_SITE");
        assert_eq!(site.value.unwrap().value, "eu1");
    }

    #[test]
    fn test_composite_parse_error_collection() {
        let mut source = CompositeSource::new();
        source.add_source(HashMapSource::from_iter(
            [("DD_SESSION_SAMPLE_RATE", "not-a-number")],
            ConfigSourceOrigin::Code,
        ));
        source.add_source(HashMapSource::from_iter(
            [("DD_SESSION_SAMPLE_RATE", "42.5")],
            ConfigSourceOrigin::EnvVar,
        ));

        let result: CompositeConfigSourceResult<f64> = source.get_parse("DD_SESSION_SAMPLE_RATE");
        let value = result.value.expect("should fall through to env var");
        assert_eq!(value.value, 42.5);
        assert_eq!(value.origin, ConfigSourceOrigin::EnvVar);
        assert_eq!(result.errors.len(), 1);
    }
}
