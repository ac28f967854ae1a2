// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use lazy_static::lazy_static;
use regex::Regex;
use std::{collections::HashMap, str::FromStr};

use dd_mobile::{dd_debug, dd_error};

use crate::{
    carrier::{Extractor, Injector},
    context::{
        priority, SamplingPriority, SpanContext, DATADOG_PROPAGATION_TAG_PREFIX,
    },
    error::Error,
};

// Traceparent Keys
pub const TRACEPARENT_KEY: &str = "traceparent";
pub const TRACESTATE_KEY: &str = "tracestate";

pub(crate) const LAST_PARENT_ID_KEY: &str = "_dd.parent_id";

const TRACESTATE_DD_KEY_MAX_LENGTH: usize = 256;
const TRACESTATE_DD_PAIR_SEPARATOR: &str = ";";
const TRACESTATE_SAMPLING_PRIORITY_KEY: &str = "s";
const TRACESTATE_ORIGIN_KEY: &str = "o";
const TRACESTATE_LAST_PARENT_KEY: &str = "p";
const TRACESTATE_TAG_PREFIX: &str = "t.";
const INVALID_CHAR_REPLACEMENT: &str = "_";

lazy_static! {
    static ref TRACEPARENT_REGEX: Regex =
        Regex::new(r"^([a-f0-9]{2})-([a-f0-9]{32})-([a-f0-9]{16})-([a-f0-9]{2})(-.*)?$")
            .expect("failed creating regex");

    // Origin value in tracestate replaces '~', ',' and ';' with '_'
    static ref TRACESTATE_ORIGIN_FILTER_REGEX: Regex =
        Regex::new(r"[^\x20-\x2b\x2d-\x3a\x3c-\x7d]").expect("failed creating regex");

    static ref TRACESTATE_TAG_KEY_FILTER_REGEX: Regex =
        Regex::new(r"[^\x21-\x2b\x2d-\x3c\x3e-\x7e]").expect("failed creating regex");

    static ref TRACESTATE_TAG_VALUE_FILTER_REGEX: Regex =
        Regex::new(r"[^\x20-\x2b\x2d-\x3a\x3c-\x7d]").expect("failed creating regex");
}

fn decode_tag_value(value: &str) -> String {
    value.replace('~', "=")
}

fn encode_tag_value(value: &str) -> String {
    value.replace('=', "~")
}

pub fn inject(context: &SpanContext, carrier: &mut dyn Injector) {
    if !context.is_valid() {
        dd_debug!("Propagator (tracecontext): skipping inject of invalid context");
        return;
    }
    inject_traceparent(context, carrier);
    inject_tracestate(context, carrier);
}

fn inject_traceparent(context: &SpanContext, carrier: &mut dyn Injector) {
    let trace_id = format!("{:032x}", context.trace_id);
    let parent_id = format!("{:016x}", context.span_id);

    let flags = context
        .sampling_priority
        .map(|priority| if priority.is_keep() { "01" } else { "00" })
        .unwrap_or("00");

    let traceparent = format!("00-{trace_id}-{parent_id}-{flags}");

    dd_debug!("Propagator (tracecontext): injecting traceparent: {traceparent}");

    carrier.set(TRACEPARENT_KEY, traceparent);
}

fn inject_tracestate(context: &SpanContext, carrier: &mut dyn Injector) {
    let mut tracestate_parts = vec![];

    let priority = context.sampling_priority.unwrap_or(priority::AUTO_KEEP);
    tracestate_parts.push(format!("{TRACESTATE_SAMPLING_PRIORITY_KEY}:{priority}"));

    if let Some(origin) = context.origin.as_ref().map(|origin| {
        encode_tag_value(
            &TRACESTATE_ORIGIN_FILTER_REGEX.replace_all(origin.as_ref(), INVALID_CHAR_REPLACEMENT),
        )
    }) {
        tracestate_parts.push(format!("{TRACESTATE_ORIGIN_KEY}:{origin}"));
    };

    tracestate_parts.push(format!(
        "{TRACESTATE_LAST_PARENT_KEY}:{:016x}",
        context.span_id
    ));

    for (key, value) in context
        .tags
        .iter()
        .filter(|(key, _)| key.starts_with(DATADOG_PROPAGATION_TAG_PREFIX))
    {
        let t_key = format!(
            "{TRACESTATE_TAG_PREFIX}{}",
            TRACESTATE_TAG_KEY_FILTER_REGEX.replace_all(
                &key[DATADOG_PROPAGATION_TAG_PREFIX.len()..],
                INVALID_CHAR_REPLACEMENT
            )
        );
        let value = encode_tag_value(
            &TRACESTATE_TAG_VALUE_FILTER_REGEX.replace_all(value, INVALID_CHAR_REPLACEMENT),
        );
        tracestate_parts.push(format!("{t_key}:{value}"));
    }

    let dd = tracestate_parts
        .into_iter()
        .reduce(|dd, part| {
            if dd.len() + part.len() + 1 < TRACESTATE_DD_KEY_MAX_LENGTH {
                format!("{dd}{TRACESTATE_DD_PAIR_SEPARATOR}{part}")
            } else {
                dd
            }
        })
        .unwrap_or_default();

    let tracestate = format!("dd={dd}");

    dd_debug!("Propagator (tracecontext): injecting tracestate: {tracestate}");

    carrier.set(TRACESTATE_KEY, tracestate);
}

pub fn extract(carrier: &dyn Extractor) -> Option<SpanContext> {
    let tp = carrier.get(TRACEPARENT_KEY)?.trim();

    match extract_traceparent(tp) {
        Ok((trace_id, span_id, traceparent_priority)) => {
            let mut tags = HashMap::new();
            tags.insert(TRACEPARENT_KEY.to_string(), tp.to_string());

            let mut origin = None;
            let mut sampling_priority = traceparent_priority;

            if let Some(ts) = carrier.get(TRACESTATE_KEY) {
                tags.insert(TRACESTATE_KEY.to_string(), ts.to_string());

                if let Some(dd_member) = parse_dd_tracestate(ts) {
                    for (key, value) in dd_member {
                        match key.as_str() {
                            TRACESTATE_SAMPLING_PRIORITY_KEY => {
                                if let Ok(ts_priority) = SamplingPriority::from_str(&value) {
                                    sampling_priority = reconcile_sampling_priority(
                                        traceparent_priority,
                                        ts_priority,
                                    );
                                }
                            }
                            TRACESTATE_ORIGIN_KEY => origin = Some(decode_tag_value(&value)),
                            TRACESTATE_LAST_PARENT_KEY => {
                                tags.insert(LAST_PARENT_ID_KEY.to_string(), value);
                            }
                            _ => {
                                if let Some(stripped) = key.strip_prefix(TRACESTATE_TAG_PREFIX) {
                                    tags.insert(
                                        format!("{DATADOG_PROPAGATION_TAG_PREFIX}{stripped}"),
                                        decode_tag_value(&value),
                                    );
                                }
                            }
                        }
                    }
                } else {
                    dd_debug!("Propagator (tracecontext): no dd member in tracestate header");
                }
            }

            Some(SpanContext {
                trace_id,
                span_id,
                sampling_priority: Some(sampling_priority),
                origin,
                tags,
                is_remote: true,
            })
        }
        Err(e) => {
            dd_error!("Propagator (tracecontext): Failed to extract traceparent: {e}");
            None
        }
    }
}

fn extract_traceparent(tp: &str) -> Result<(u128, u64, SamplingPriority), Error> {
    let captures = TRACEPARENT_REGEX
        .captures(tp)
        .ok_or(Error::extract("Malformed `traceparent`", "tracecontext"))?;

    let version = &captures[1];
    if version == "ff" {
        return Err(Error::extract(
            "Unsupported `traceparent` version",
            "tracecontext",
        ));
    }

    let trace_id = u128::from_str_radix(&captures[2], 16)
        .map_err(|_| Error::extract("Failed to decode `trace_id`", "tracecontext"))?;
    let span_id = u64::from_str_radix(&captures[3], 16)
        .map_err(|_| Error::extract("Failed to decode `span_id`", "tracecontext"))?;

    if trace_id == 0 || span_id == 0 {
        return Err(Error::extract(
            "Zero `trace_id` or `span_id`",
            "tracecontext",
        ));
    }

    let flags = u8::from_str_radix(&captures[4], 16)
        .map_err(|_| Error::extract("Failed to decode `flags`", "tracecontext"))?;
    let priority = if flags & 1 == 1 {
        priority::AUTO_KEEP
    } else {
        priority::AUTO_REJECT
    };

    Ok((trace_id, span_id, priority))
}

/// Returns the `key:value` pairs of the `dd=` member of a tracestate
/// header, or None when there is no such member.
fn parse_dd_tracestate(tracestate: &str) -> Option<Vec<(String, String)>> {
    tracestate
        .split(',')
        .map(str::trim)
        .find_map(|member| member.strip_prefix("dd="))
        .map(|dd| {
            dd.split(TRACESTATE_DD_PAIR_SEPARATOR)
                .filter_map(|pair| {
                    let (key, value) = pair.split_once(':')?;
                    Some((key.to_string(), value.to_string()))
                })
                .collect()
        })
}

/// The tracestate priority wins only when it agrees with the
/// traceparent sampled flag; otherwise the flag is authoritative.
fn reconcile_sampling_priority(
    traceparent_priority: SamplingPriority,
    tracestate_priority: SamplingPriority,
) -> SamplingPriority {
    if traceparent_priority.is_keep() == tracestate_priority.is_keep() {
        tracestate_priority
    } else {
        traceparent_priority
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    const TRACE_ID_HEX: &str = "80f198ee56343ba864fe8b2a57d3eff7";

    #[test]
    fn test_extract_traceparent_and_tracestate() {
        let carrier = HashMap::from([
            (
                "traceparent".to_string(),
                format!("00-{TRACE_ID_HEX}-00f067aa0ba902b7-01"),
            ),
            (
                "tracestate".to_string(),
                "dd=s:2;o:rum;p:00f067aa0ba902b7;t.usr.id:baz64".to_string(),
            ),
        ]);

        let context = extract(&carrier).expect("context should extract");

        assert_eq!(
            context.trace_id,
            171_395_628_812_617_415_352_188_477_958_425_669_623
        );
        assert_eq!(context.span_id, 67_667_974_448_284_343);
        assert_eq!(context.sampling_priority, Some(priority::USER_KEEP));
        assert_eq!(context.origin, Some("rum".to_string()));
        assert!(context.is_remote);
        assert_eq!(
            context.tags.get(LAST_PARENT_ID_KEY).map(String::as_str),
            Some("00f067aa0ba902b7")
        );
        assert_eq!(
            context.tags.get("_dd.p.usr.id").map(String::as_str),
            Some("baz64")
        );
    }

    #[test]
    fn test_extract_unsampled_flag_wins_over_tracestate() {
        let carrier = HashMap::from([
            (
                "traceparent".to_string(),
                format!("00-{TRACE_ID_HEX}-00f067aa0ba902b7-00"),
            ),
            ("tracestate".to_string(), "dd=s:2;o:rum".to_string()),
        ]);

        let context = extract(&carrier).expect("context should extract");
        assert_eq!(context.sampling_priority, Some(priority::AUTO_REJECT));
    }

    #[test]
    fn test_extract_rejects_malformed_traceparent() {
        for bad in [
            "not-a-traceparent",
            "00-00000000000000000000000000000000-00f067aa0ba902b7-01",
            "00-80f198ee56343ba864fe8b2a57d3eff7-0000000000000000-01",
            "ff-80f198ee56343ba864fe8b2a57d3eff7-00f067aa0ba902b7-01",
        ] {
            let carrier = HashMap::from([("traceparent".to_string(), bad.to_string())]);
            assert!(extract(&carrier).is_none(), "should reject {bad}");
        }
    }

    #[test]
    fn test_inject_writes_both_headers() {
        let context = SpanContext {
            trace_id: 0x80f1_98ee_5634_3ba8_64fe_8b2a_57d3_eff7,
            span_id: 0x00f0_67aa_0ba9_02b7,
            sampling_priority: Some(priority::AUTO_KEEP),
            origin: Some("rum".to_string()),
            tags: HashMap::from([("_dd.p.usr.id".to_string(), "baz64".to_string())]),
            is_remote: false,
        };

        let mut carrier: HashMap<String, String> = HashMap::new();
        inject(&context, &mut carrier);

        assert_eq!(
            carrier.get("traceparent").map(String::as_str),
            Some("00-80f198ee56343ba864fe8b2a57d3eff7-00f067aa0ba902b7-01")
        );
        let tracestate = carrier.get("tracestate").expect("tracestate should be set");
        assert!(tracestate.starts_with("dd=s:1;o:rum;p:00f067aa0ba902b7"));
        assert!(tracestate.contains("t.usr.id:baz64"));
    }

    #[test]
    fn test_inject_skips_invalid_context() {
        let mut carrier: HashMap<String, String> = HashMap::new();
        inject(&SpanContext::default(), &mut carrier);
        assert!(carrier.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_identifiers() {
        let context = SpanContext {
            trace_id: 0x1234_5678_9abc_def0_0fed_cba9_8765_4321,
            span_id: 42,
            sampling_priority: Some(priority::AUTO_KEEP),
            origin: None,
            tags: HashMap::new(),
            is_remote: false,
        };

        let mut carrier: HashMap<String, String> = HashMap::new();
        inject(&context, &mut carrier);
        let extracted = extract(&carrier).expect("round trip should extract");

        assert_eq!(extracted.trace_id, context.trace_id);
        assert_eq!(extracted.span_id, context.span_id);
    }
}
