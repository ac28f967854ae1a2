// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashMap, fmt, str::FromStr};

pub const DATADOG_PROPAGATION_TAG_PREFIX: &str = "_dd.p.";

/// Sampling priority carried across process boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplingPriority {
    value: i8,
}

impl SamplingPriority {
    pub const fn from_i8(value: i8) -> Self {
        Self { value }
    }

    pub fn into_i8(self) -> i8 {
        self.value
    }

    pub fn is_keep(&self) -> bool {
        self.value > 0
    }
}

pub mod priority {
    use super::SamplingPriority;

    pub const USER_REJECT: SamplingPriority = SamplingPriority::from_i8(-1);
    pub const AUTO_REJECT: SamplingPriority = SamplingPriority::from_i8(0);
    pub const AUTO_KEEP: SamplingPriority = SamplingPriority::from_i8(1);
    pub const USER_KEEP: SamplingPriority = SamplingPriority::from_i8(2);
}

impl fmt::Display for SamplingPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl FromStr for SamplingPriority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<i8>() {
            Ok(value) => Ok(SamplingPriority::from_i8(value)),
            Err(_) => Err(()),
        }
    }
}

/// Identifiers and propagated state of one side of a distributed
/// trace. Local contexts are created when a span starts; remote ones
/// are reconstructed from carrier headers by `extract`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpanContext {
    pub trace_id: u128,
    pub span_id: u64,
    pub sampling_priority: Option<SamplingPriority>,
    pub origin: Option<String>,
    /// Propagated `_dd.p.*` tags plus the raw headers they came from
    pub tags: HashMap<String, String>,
    pub is_remote: bool,
}

impl SpanContext {
    pub fn is_valid(&self) -> bool {
        self.trace_id != 0 && self.span_id != 0
    }
}

pub fn split_trace_id(trace_id: u128) -> (Option<u64>, u64) {
    let lower = trace_id as u64;

    let higher = (trace_id >> 64) as u64;
    let higher = if higher > 0 { Some(higher) } else { None };

    (higher, lower)
}

pub fn combine_trace_id(trace_id: u64, higher_bits_hex: Option<&String>) -> u128 {
    higher_bits_hex
        .and_then(|higher| u64::from_str_radix(higher, 16).ok())
        .map(|higher| ((higher as u128) << 64) + (trace_id as u128))
        .unwrap_or(trace_id as u128)
}

#[cfg(test)]
mod test {
    use super::{combine_trace_id, priority, split_trace_id};

    #[test]
    fn test_split_and_combine() {
        let trace_id = u128::MAX;

        let (higher, lower) = split_trace_id(trace_id);

        let higher_hex = format!("{:016x}", higher.unwrap());

        let combined = combine_trace_id(lower, Some(&higher_hex));

        assert_eq!(trace_id, combined)
    }

    #[test]
    fn test_split_small_trace_id_has_no_high_bits() {
        let (higher, lower) = split_trace_id(1234);
        assert_eq!(higher, None);
        assert_eq!(lower, 1234);
    }

    #[test]
    fn test_priority_keep() {
        assert!(priority::AUTO_KEEP.is_keep());
        assert!(priority::USER_KEEP.is_keep());
        assert!(!priority::AUTO_REJECT.is_keep());
        assert!(!priority::USER_REJECT.is_keep());
    }
}
