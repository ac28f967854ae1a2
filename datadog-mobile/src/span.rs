// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use dd_mobile::{
    dd_debug,
    event::{unix_nanos_now, ErrorInfo, EventRecord, SpanEvent},
    AttributeValue, Error, Result, Sink,
};
use dd_mobile_propagation::{context::priority, SamplingPriority, SpanContext};

use crate::ids;

/// State shared between the facade and every live span.
pub(crate) struct TracerShared {
    pub(crate) sink: Arc<dyn Sink>,
    /// Stack of open span contexts, most recent last.
    pub(crate) active: Mutex<Vec<SpanContext>>,
}

impl TracerShared {
    pub(crate) fn active_context(&self) -> Option<SpanContext> {
        self.active.lock().unwrap().last().cloned()
    }
}

/// A span measuring one operation.
///
/// Finishing is a one-shot transition: the second explicit `finish`
/// returns `InvalidState`, as does mutating a finished span. Dropping
/// an unfinished span finishes it silently so that early returns and
/// panics still produce a record.
pub struct Span {
    shared: Arc<TracerShared>,
    context: SpanContext,
    parent_id: u64,
    operation: String,
    start_ns: u64,
    tags: HashMap<String, AttributeValue>,
    error: Option<ErrorInfo>,
    finished: bool,
}

impl Span {
    pub(crate) fn start(
        shared: Arc<TracerShared>,
        operation: impl Into<String>,
        parent: Option<&SpanContext>,
        tags: HashMap<String, AttributeValue>,
        trace_sample_rate: f64,
    ) -> Self {
        let context = match parent.filter(|parent| parent.is_valid()) {
            Some(parent) => SpanContext {
                trace_id: parent.trace_id,
                span_id: ids::new_span_id(),
                sampling_priority: parent.sampling_priority,
                origin: parent.origin.clone(),
                tags: parent.tags.clone(),
                is_remote: false,
            },
            None => {
                let sampling_priority = if ids::sample(trace_sample_rate) {
                    priority::AUTO_KEEP
                } else {
                    priority::AUTO_REJECT
                };
                SpanContext {
                    trace_id: ids::new_trace_id(),
                    span_id: ids::new_span_id(),
                    sampling_priority: Some(sampling_priority),
                    origin: Some("rum".to_string()),
                    tags: HashMap::new(),
                    is_remote: false,
                }
            }
        };
        let parent_id = parent.map(|parent| parent.span_id).unwrap_or(0);

        shared.active.lock().unwrap().push(context.clone());

        Span {
            shared,
            context,
            parent_id,
            operation: operation.into(),
            start_ns: unix_nanos_now(),
            tags,
            error: None,
            finished: false,
        }
    }

    pub fn context(&self) -> &SpanContext {
        &self.context
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Result<()> {
        if self.finished {
            return Err(Error::InvalidState("cannot set tag on a finished span"));
        }
        self.tags.insert(key.into(), value.into());
        Ok(())
    }

    pub fn set_error(&mut self, error: ErrorInfo) -> Result<()> {
        if self.finished {
            return Err(Error::InvalidState("cannot set error on a finished span"));
        }
        self.error = Some(error);
        Ok(())
    }

    /// Closes the span and emits its record.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::InvalidState("span already finished"));
        }
        self.finish_internal();
        Ok(())
    }

    fn finish_internal(&mut self) {
        self.finished = true;
        let end_ns = unix_nanos_now();

        {
            let mut active = self.shared.active.lock().unwrap();
            if let Some(position) = active
                .iter()
                .rposition(|context| context.span_id == self.context.span_id)
            {
                active.remove(position);
            }
        }

        self.shared.sink.emit(EventRecord::Span(SpanEvent {
            trace_id: self.context.trace_id,
            span_id: self.context.span_id,
            parent_id: self.parent_id,
            operation: std::mem::take(&mut self.operation),
            start_ns: self.start_ns,
            duration_ns: end_ns.saturating_sub(self.start_ns),
            tags: std::mem::take(&mut self.tags),
            error: self.error.take(),
            sampling_priority: self.context.sampling_priority.map(SamplingPriority::into_i8),
        }));
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.finished {
            dd_debug!("Span dropped while open, finishing implicitly");
            self.finish_internal();
        }
    }
}
