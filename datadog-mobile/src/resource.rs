// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::HashMap,
    sync::Mutex,
};

use dd_mobile::{
    event::{unix_nanos_now, ResourceOutcome, RumResourceEvent},
    AttributeValue, Error, Result,
};

/// Tracks in-flight network resources by caller-chosen key.
///
/// A key is live from `start` until the matching `stop`; reusing a
/// live key is `DuplicateKey`, stopping an unknown one is
/// `UnknownKey`. Keys are reusable once stopped.
#[derive(Default)]
pub(crate) struct ResourceRegistry {
    pending: Mutex<HashMap<String, PendingResource>>,
}

struct PendingResource {
    method: String,
    url: String,
    start_ns: u64,
    attributes: HashMap<String, AttributeValue>,
}

impl ResourceRegistry {
    pub(crate) fn start(
        &self,
        key: &str,
        method: impl Into<String>,
        url: impl Into<String>,
        attributes: HashMap<String, AttributeValue>,
    ) -> Result<()> {
        let mut pending = self.pending.lock().unwrap();
        if pending.contains_key(key) {
            return Err(Error::DuplicateKey(key.to_string()));
        }
        pending.insert(
            key.to_string(),
            PendingResource {
                method: method.into(),
                url: url.into(),
                start_ns: unix_nanos_now(),
                attributes,
            },
        );
        Ok(())
    }

    /// Closes the resource and returns its record, without session or
    /// global attributes; the facade stamps those before emitting.
    pub(crate) fn stop(&self, key: &str, outcome: ResourceOutcome) -> Result<RumResourceEvent> {
        let resource = self
            .pending
            .lock()
            .unwrap()
            .remove(key)
            .ok_or_else(|| Error::UnknownKey(key.to_string()))?;

        let end_ns = unix_nanos_now();
        Ok(RumResourceEvent {
            key: key.to_string(),
            method: resource.method,
            url: resource.url,
            outcome,
            start_ns: resource.start_ns,
            duration_ns: end_ns.saturating_sub(resource.start_ns),
            attributes: resource.attributes,
            session_id: None,
        })
    }

    pub(crate) fn clear(&self) {
        self.pending.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use dd_mobile::event::ErrorSource;

    use super::*;

    #[test]
    fn test_start_stop_round_trip() {
        let registry = ResourceRegistry::default();
        registry
            .start("req-1", "GET", "https://api.shop.com/cart", HashMap::new())
            .unwrap();

        let event = registry
            .stop(
                "req-1",
                ResourceOutcome::Success {
                    status_code: 200,
                    size_bytes: 1024,
                },
            )
            .unwrap();

        assert_eq!(event.key, "req-1");
        assert_eq!(event.method, "GET");
        assert_eq!(event.url, "https://api.shop.com/cart");
        assert!(matches!(
            event.outcome,
            ResourceOutcome::Success {
                status_code: 200,
                size_bytes: 1024
            }
        ));
    }

    #[test]
    fn test_duplicate_key_while_pending() {
        let registry = ResourceRegistry::default();
        registry
            .start("req-1", "GET", "https://api.shop.com/a", HashMap::new())
            .unwrap();

        let err = registry
            .start("req-1", "GET", "https://api.shop.com/b", HashMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(key) if key == "req-1"));
    }

    #[test]
    fn test_key_reusable_after_stop() {
        let registry = ResourceRegistry::default();
        registry
            .start("req-1", "GET", "https://api.shop.com/a", HashMap::new())
            .unwrap();
        registry
            .stop(
                "req-1",
                ResourceOutcome::Error {
                    message: "timeout".to_string(),
                    source: ErrorSource::Network,
                },
            )
            .unwrap();

        assert!(registry
            .start("req-1", "GET", "https://api.shop.com/a", HashMap::new())
            .is_ok());
    }

    #[test]
    fn test_unknown_key() {
        let registry = ResourceRegistry::default();
        let err = registry
            .stop(
                "missing",
                ResourceOutcome::Success {
                    status_code: 204,
                    size_bytes: 0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnknownKey(key) if key == "missing"));
    }
}
