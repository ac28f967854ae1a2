// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use dd_mobile::{dd_debug, dd_warn};

use crate::{
    carrier::{Extractor, Injector},
    context::{
        combine_trace_id, split_trace_id, SamplingPriority, SpanContext,
        DATADOG_PROPAGATION_TAG_PREFIX,
    },
    error::Error,
};

// Datadog Keys
const DATADOG_TRACE_ID_KEY: &str = "x-datadog-trace-id";
const DATADOG_PARENT_ID_KEY: &str = "x-datadog-parent-id";
const DATADOG_SAMPLING_PRIORITY_KEY: &str = "x-datadog-sampling-priority";
const DATADOG_ORIGIN_KEY: &str = "x-datadog-origin";
const DATADOG_TAGS_KEY: &str = "x-datadog-tags";
const DATADOG_HIGHER_ORDER_TRACE_ID_BITS_KEY: &str = "_dd.p.tid";
const DATADOG_PROPAGATION_ERROR_KEY: &str = "_dd.propagation_error";

lazy_static! {
    static ref INVALID_SEGMENT_REGEX: Regex = Regex::new(r"^0+$").expect("failed creating regex");
}

pub fn extract(carrier: &dyn Extractor) -> Option<SpanContext> {
    let lower_trace_id = match extract_trace_id(carrier) {
        Ok(trace_id) => trace_id,
        Err(e) => {
            dd_debug!("{e}");
            return None;
        }
    };

    let parent_id = extract_parent_id(carrier).unwrap_or(0);
    let sampling_priority = match extract_sampling_priority(carrier) {
        Ok(sampling_priority) => sampling_priority,
        Err(e) => {
            dd_debug!("{e}");
            return None;
        }
    };
    let origin = carrier.get(DATADOG_ORIGIN_KEY).map(str::to_string);
    let tags = extract_tags(carrier);

    let trace_id = combine_trace_id(
        lower_trace_id,
        tags.get(DATADOG_HIGHER_ORDER_TRACE_ID_BITS_KEY),
    );

    Some(SpanContext {
        trace_id,
        span_id: parent_id,
        sampling_priority: Some(sampling_priority),
        origin,
        tags,
        is_remote: true,
    })
}

pub fn inject(context: &SpanContext, carrier: &mut dyn Injector) {
    if !context.is_valid() {
        dd_debug!("Propagator (datadog): skipping inject of invalid context");
        return;
    }

    let (higher_bits, lower_bits) = split_trace_id(context.trace_id);

    carrier.set(DATADOG_TRACE_ID_KEY, lower_bits.to_string());
    carrier.set(DATADOG_PARENT_ID_KEY, context.span_id.to_string());

    if let Some(priority) = context.sampling_priority {
        carrier.set(DATADOG_SAMPLING_PRIORITY_KEY, priority.to_string());
    }

    if let Some(origin) = context.origin.as_deref() {
        carrier.set(DATADOG_ORIGIN_KEY, origin.to_string());
    }

    let mut tag_pairs: Vec<String> = context
        .tags
        .iter()
        .filter(|(key, _)| {
            key.starts_with(DATADOG_PROPAGATION_TAG_PREFIX)
                && key.as_str() != DATADOG_HIGHER_ORDER_TRACE_ID_BITS_KEY
        })
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    tag_pairs.sort();

    if let Some(higher) = higher_bits {
        tag_pairs.push(format!(
            "{DATADOG_HIGHER_ORDER_TRACE_ID_BITS_KEY}={higher:016x}"
        ));
    }

    if !tag_pairs.is_empty() {
        carrier.set(DATADOG_TAGS_KEY, tag_pairs.join(","));
    }
}

fn extract_trace_id(carrier: &dyn Extractor) -> Result<u64, Error> {
    let trace_id = carrier
        .get(DATADOG_TRACE_ID_KEY)
        .ok_or(Error::extract("`trace_id` not found", "datadog"))?;

    if INVALID_SEGMENT_REGEX.is_match(trace_id) {
        return Err(Error::extract("Invalid `trace_id` found", "datadog"));
    }

    trace_id
        .parse::<u64>()
        .map_err(|_| Error::extract("Failed to decode `trace_id`", "datadog"))
}

fn extract_parent_id(carrier: &dyn Extractor) -> Option<u64> {
    let parent_id = carrier.get(DATADOG_PARENT_ID_KEY)?;

    parent_id.parse::<u64>().ok()
}

fn extract_sampling_priority(carrier: &dyn Extractor) -> Result<SamplingPriority, Error> {
    // Absent priority means the remote side kept the trace
    let sampling_priority = carrier.get(DATADOG_SAMPLING_PRIORITY_KEY).unwrap_or("2");

    sampling_priority
        .parse::<i8>()
        .map(SamplingPriority::from_i8)
        .map_err(|_| Error::extract("Failed to decode `sampling_priority`", "datadog"))
}

fn extract_tags(carrier: &dyn Extractor) -> HashMap<String, String> {
    let mut tags: HashMap<String, String> = HashMap::new();

    let carrier_tags = carrier.get(DATADOG_TAGS_KEY).unwrap_or_default();
    for pair in carrier_tags.split(',') {
        if let Some((k, v)) = pair.split_once('=') {
            if k.starts_with(DATADOG_PROPAGATION_TAG_PREFIX) {
                tags.insert(k.to_string(), v.to_string());
            }
        }
    }

    // Handle 128bit trace ID
    if let Some(trace_id_higher_order_bits) = tags.get(DATADOG_HIGHER_ORDER_TRACE_ID_BITS_KEY) {
        if !higher_order_bits_valid(trace_id_higher_order_bits) {
            dd_warn!(
                "Malformed Trace ID: {trace_id_higher_order_bits} Failed to decode trace ID from carrier."
            );
            tags.insert(
                DATADOG_PROPAGATION_ERROR_KEY.to_string(),
                format!("malformed tid {trace_id_higher_order_bits}"),
            );
            tags.remove(DATADOG_HIGHER_ORDER_TRACE_ID_BITS_KEY);
        }
    }

    tags
}

fn higher_order_bits_valid(trace_id_higher_order_bits: &str) -> bool {
    trace_id_higher_order_bits.len() == 16
        && u64::from_str_radix(trace_id_higher_order_bits, 16).is_ok()
}
