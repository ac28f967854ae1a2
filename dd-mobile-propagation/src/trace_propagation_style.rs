// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{fmt::Display, str::FromStr};

use crate::{
    carrier::{Extractor, Injector},
    context::SpanContext,
    datadog, tracecontext,
};

/// Header style used to carry trace context across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TracePropagationStyle {
    Datadog,
    TraceContext,
    None,
}

impl TracePropagationStyle {
    pub fn extract(&self, carrier: &dyn Extractor) -> Option<SpanContext> {
        match self {
            TracePropagationStyle::Datadog => datadog::extract(carrier),
            TracePropagationStyle::TraceContext => tracecontext::extract(carrier),
            TracePropagationStyle::None => None,
        }
    }

    pub fn inject(&self, context: &SpanContext, carrier: &mut dyn Injector) {
        match self {
            TracePropagationStyle::Datadog => datadog::inject(context, carrier),
            TracePropagationStyle::TraceContext => tracecontext::inject(context, carrier),
            TracePropagationStyle::None => {}
        }
    }
}

impl Display for TracePropagationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let style = match self {
            TracePropagationStyle::Datadog => "datadog",
            TracePropagationStyle::TraceContext => "tracecontext",
            TracePropagationStyle::None => "none",
        };
        write!(f, "{style}")
    }
}

impl FromStr for TracePropagationStyle {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("datadog") {
            Ok(TracePropagationStyle::Datadog)
        } else if s.eq_ignore_ascii_case("tracecontext") {
            Ok(TracePropagationStyle::TraceContext)
        } else if s.eq_ignore_ascii_case("none") {
            Ok(TracePropagationStyle::None)
        } else {
            Err("propagation style should be one of datadog, tracecontext, none")
        }
    }
}
