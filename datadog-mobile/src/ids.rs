// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;

use rand::{Rng, SeedableRng};

thread_local! {
    static RNG: RefCell<rand::rngs::SmallRng> = RefCell::new(rand::rngs::SmallRng::from_entropy());
}

/// Generates a 128 bit trace id.
///
/// The trace id follows the following format:
/// 32 bits timestamp | 32 bits of zeroes | 64 bits of random
/// The timestamp is the number of seconds since the UNIX epoch
pub(crate) fn new_trace_id() -> u128 {
    let lower_half = RNG.with(|rng| rng.borrow_mut().gen::<u64>());
    let timestamp = std::time::UNIX_EPOCH
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(1 << 31);
    let upper_half = (timestamp << 32) as u128;

    (upper_half << 64) | lower_half as u128
}

/// Generates a non-zero 64 bit span id. Zero is reserved as the
/// "absent" value in both header styles.
pub(crate) fn new_span_id() -> u64 {
    loop {
        let span_id = RNG.with(|rng| rng.borrow_mut().gen::<u64>());
        if span_id != 0 {
            return span_id;
        }
    }
}

/// One sampling decision against a 0-100 rate.
pub(crate) fn sample(rate: f64) -> bool {
    if rate >= 100.0 {
        return true;
    }
    if rate <= 0.0 {
        return false;
    }
    RNG.with(|rng| rng.borrow_mut().gen::<f64>()) * 100.0 < rate
}

pub(crate) fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_layout() {
        let trace_id = new_trace_id();
        // 32 bits timestamp | 32 bits of zeroes | 64 bits of random
        assert!(trace_id & 0x0000_0000_FFFF_FFFF_0000_0000_0000_0000 == 0);
        let ts = (trace_id >> 96) as u64;
        let now = std::time::UNIX_EPOCH
            .elapsed()
            .expect("negative timestamp")
            .as_secs();
        // Check that the timestamp is within 2 minutes of the current time
        assert!(now - 120 < ts && ts < now + 120);
        assert!(trace_id & 0x0000_0000_0000_0000_FFFF_FFFF_FFFF_FFFF != 0);
    }

    #[test]
    fn test_span_id_is_non_zero() {
        for _ in 0..64 {
            assert_ne!(new_span_id(), 0);
        }
    }

    #[test]
    fn test_sample_boundary_rates() {
        assert!(sample(100.0));
        assert!(sample(150.0));
        assert!(!sample(0.0));
        assert!(!sample(-1.0));
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(new_session_id(), new_session_id());
    }
}
