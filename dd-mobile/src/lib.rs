// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod attribute;
pub mod configuration;
pub mod event;
pub mod log;
pub mod sink;

mod error;

pub use attribute::AttributeValue;
pub use configuration::{Config, ConfigBuilder, Site, TrackingConsent};
pub use error::{Error, Result};
pub use sink::Sink;
