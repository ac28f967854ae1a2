// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Trace header propagation for the mobile telemetry facade.
//!
//! Writes trace identifiers into string-keyed header maps and reads
//! them back to reconstruct a remote parent context, in the W3C
//! tracecontext and Datadog header styles.

pub mod carrier;
pub mod context;
mod datadog;
mod error;
mod trace_propagation_style;
mod tracecontext;

pub use carrier::{Extractor, Injector};
pub use context::{SamplingPriority, SpanContext};
pub use trace_propagation_style::TracePropagationStyle;

pub trait Propagator {
    fn extract(&self, carrier: &dyn carrier::Extractor) -> Option<SpanContext>;
    fn inject(&self, context: &SpanContext, carrier: &mut dyn carrier::Injector);
}

/// Composes the configured propagation styles.
///
/// On extract, the first style that yields a context wins; on inject,
/// every style writes its headers.
pub struct CompositePropagator {
    styles: Vec<TracePropagationStyle>,
}

impl CompositePropagator {
    #[must_use]
    pub fn new(styles: Vec<TracePropagationStyle>) -> Self {
        let styles = styles
            .into_iter()
            .filter(|style| *style != TracePropagationStyle::None)
            .collect();
        Self { styles }
    }

    pub fn styles(&self) -> &[TracePropagationStyle] {
        &self.styles
    }
}

impl Default for CompositePropagator {
    fn default() -> Self {
        Self::new(vec![
            TracePropagationStyle::Datadog,
            TracePropagationStyle::TraceContext,
        ])
    }
}

impl Propagator for CompositePropagator {
    fn extract(&self, carrier: &dyn carrier::Extractor) -> Option<SpanContext> {
        self.styles
            .iter()
            .find_map(|style| style.extract(carrier))
    }

    fn inject(&self, context: &SpanContext, carrier: &mut dyn carrier::Injector) {
        for style in &self.styles {
            style.inject(context, carrier);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::context::priority;

    use super::*;

    #[test]
    fn test_none_styles_are_filtered() {
        let propagator = CompositePropagator::new(vec![
            TracePropagationStyle::Datadog,
            TracePropagationStyle::None,
        ]);
        assert_eq!(propagator.styles(), &[TracePropagationStyle::Datadog]);
    }

    #[test]
    fn test_extract_first_style_wins() {
        let carrier = HashMap::from([
            ("x-datadog-trace-id".to_string(), "1234".to_string()),
            ("x-datadog-parent-id".to_string(), "5678".to_string()),
            ("x-datadog-sampling-priority".to_string(), "1".to_string()),
            (
                "traceparent".to_string(),
                "00-000000000000000000000000000000ff-00000000000000ff-01".to_string(),
            ),
        ]);

        let datadog_first = CompositePropagator::default();
        let context = datadog_first.extract(&carrier).unwrap();
        assert_eq!(context.trace_id, 1234);

        let tracecontext_first = CompositePropagator::new(vec![
            TracePropagationStyle::TraceContext,
            TracePropagationStyle::Datadog,
        ]);
        let context = tracecontext_first.extract(&carrier).unwrap();
        assert_eq!(context.trace_id, 0xff);
    }

    #[test]
    fn test_extract_falls_through_to_next_style() {
        let carrier = HashMap::from([(
            "traceparent".to_string(),
            "00-000000000000000000000000000000ff-00000000000000ff-01".to_string(),
        )]);

        let propagator = CompositePropagator::default();
        let context = propagator.extract(&carrier).unwrap();
        assert_eq!(context.trace_id, 0xff);
        assert_eq!(context.span_id, 0xff);
    }

    #[test]
    fn test_inject_writes_all_configured_styles() {
        let context = SpanContext {
            trace_id: 1234,
            span_id: 5678,
            sampling_priority: Some(priority::AUTO_KEEP),
            origin: None,
            tags: HashMap::new(),
            is_remote: false,
        };

        let mut carrier: HashMap<String, String> = HashMap::new();
        CompositePropagator::default().inject(&context, &mut carrier);

        assert!(carrier.contains_key("x-datadog-trace-id"));
        assert!(carrier.contains_key("traceparent"));

        let extracted = CompositePropagator::default().extract(&carrier).unwrap();
        assert_eq!(extracted.trace_id, context.trace_id);
    }

    #[test]
    fn test_extract_empty_carrier() {
        let carrier: HashMap<String, String> = HashMap::new();
        assert!(CompositePropagator::default().extract(&carrier).is_none());
    }
}
