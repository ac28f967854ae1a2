// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Unified mobile telemetry facade.
//!
//! One [`TelemetryFacade`] hands out loggers, tracks RUM views,
//! actions, errors and network resources, and starts distributed
//! traces whose context crosses process boundaries through W3C
//! tracecontext and Datadog headers. Completed records flow to a
//! host-provided [`Sink`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use datadog_mobile::{Config, MemorySink, TelemetryFacade};
//!
//! let sink = Arc::new(MemorySink::new());
//! let facade = TelemetryFacade::new(sink);
//!
//! let mut config = Config::builder();
//! config.set_client_token("pub0123456789".to_string());
//! facade.initialize(config.build()).unwrap();
//!
//! let logger = facade.logger("app").unwrap();
//! logger.info("application started");
//! ```

mod facade;
mod ids;
mod logger;
mod resource;
mod span;

pub use facade::{TelemetryFacade, UserInfo};
pub use logger::Logger;
pub use span::Span;

pub use dd_mobile::{
    event::{ActionType, ErrorInfo, ErrorSource, EventRecord, LogLevel, ResourceOutcome, ViewPhase},
    sink::MemorySink,
    AttributeValue, Config, ConfigBuilder, Error, Result, Sink, Site, TrackingConsent,
};
pub use dd_mobile_propagation::{Extractor, Injector, SamplingPriority, SpanContext};
