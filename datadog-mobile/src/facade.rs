// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, RwLock},
};

use dd_mobile::{
    dd_debug, dd_info, dd_warn,
    event::{
        unix_nanos_now, ActionType, ErrorInfo, ErrorSource, EventRecord, ResourceOutcome,
        RumActionEvent, RumErrorEvent, RumViewEvent, ViewPhase,
    },
    log, AttributeValue, Config, Error, Result, Sink, TrackingConsent,
};
use dd_mobile_propagation::{
    carrier::{Extractor, Injector},
    CompositePropagator, Propagator, SpanContext,
};

use crate::{
    ids,
    logger::Logger,
    resource::ResourceRegistry,
    span::{Span, TracerShared},
};

/// Identity of the application's end user, attached to RUM events as
/// `usr.*` attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub extra_info: HashMap<String, AttributeValue>,
}

struct ViewRecord {
    name: String,
    start_ns: u64,
    timings: BTreeMap<String, u64>,
}

#[derive(Default)]
struct RumState {
    session_id: Option<String>,
    /// Decision made once per session against `session_sample_rate`.
    session_sampled: bool,
    views: HashMap<String, ViewRecord>,
    current_view: Option<String>,
    attributes: HashMap<String, AttributeValue>,
}

struct Initialized {
    config: Config,
    propagator: CompositePropagator,
}

struct Inner {
    sink: Arc<dyn Sink>,
    init: RwLock<Option<Initialized>>,
    consent: RwLock<TrackingConsent>,
    user: RwLock<Option<UserInfo>>,
    rum: Mutex<RumState>,
    resources: ResourceRegistry,
    tracer: Arc<TracerShared>,
}

/// Entry point of the SDK: one facade over logs, RUM and tracing.
///
/// Every operation besides `initialize` and consent/user bookkeeping
/// requires a prior successful `initialize`; calling earlier returns
/// `NotInitialized`, a second `initialize` returns `AlreadyInitialized`.
/// The facade is cheap to clone and all clones share state.
#[derive(Clone)]
pub struct TelemetryFacade {
    inner: Arc<Inner>,
}

impl TelemetryFacade {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        let tracer = Arc::new(TracerShared {
            sink: sink.clone(),
            active: Mutex::new(Vec::new()),
        });
        TelemetryFacade {
            inner: Arc::new(Inner {
                sink,
                init: RwLock::new(None),
                consent: RwLock::new(TrackingConsent::default()),
                user: RwLock::new(None),
                rum: Mutex::new(RumState::default()),
                resources: ResourceRegistry::default(),
                tracer,
            }),
        }
    }

    pub fn initialize(&self, config: Config) -> Result<()> {
        let mut init = self.inner.init.write().unwrap();
        if init.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        log::set_max_level(config.log_level());
        if config.client_token().is_empty() {
            dd_warn!("Initialization: client token is empty, intake will reject uploads");
        }

        *self.inner.consent.write().unwrap() = config.tracking_consent();

        {
            let mut rum = self.inner.rum.lock().unwrap();
            rum.session_id = Some(ids::new_session_id());
            rum.session_sampled = ids::sample(config.session_sample_rate());
            rum.attributes = config.additional_attributes().clone();
        }

        dd_info!(
            "Initialized for env {} on site {} ({})",
            config.env(),
            config.site(),
            config.site().host()
        );

        *init = Some(Initialized {
            propagator: CompositePropagator::default(),
            config,
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.init.read().unwrap().is_some()
    }

    fn with_init<R>(&self, f: impl FnOnce(&Initialized) -> R) -> Result<R> {
        let init = self.inner.init.read().unwrap();
        init.as_ref().map(f).ok_or(Error::NotInitialized)
    }

    // # Logs

    /// Creates a named logger bound to this facade's sink.
    pub fn logger(&self, name: impl Into<String>) -> Result<Logger> {
        self.with_init(|_| Logger::new(self.inner.sink.clone(), name))
    }

    // # Consent and user identity

    /// Updates the end user's tracking consent. The current value is
    /// surfaced through [`tracking_consent`](Self::tracking_consent)
    /// for the sink owner; this layer does not drop records itself.
    pub fn set_tracking_consent(&self, consent: TrackingConsent) {
        *self.inner.consent.write().unwrap() = consent;
    }

    pub fn tracking_consent(&self) -> TrackingConsent {
        *self.inner.consent.read().unwrap()
    }

    pub fn set_user(&self, user: UserInfo) {
        *self.inner.user.write().unwrap() = Some(user);
    }

    pub fn clear_user(&self) {
        *self.inner.user.write().unwrap() = None;
    }

    /// Adds one attribute to the current user, keeping the rest of the
    /// identity. A no-op warning if no user is set.
    pub fn add_user_extra_info(&self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let mut user = self.inner.user.write().unwrap();
        match user.as_mut() {
            Some(user) => {
                user.extra_info.insert(key.into(), value.into());
            }
            None => dd_warn!("add_user_extra_info called with no user set"),
        }
    }

    fn user_attributes(&self) -> HashMap<String, AttributeValue> {
        let mut attributes = HashMap::new();
        if let Some(user) = self.inner.user.read().unwrap().as_ref() {
            if let Some(id) = &user.id {
                attributes.insert("usr.id".to_string(), AttributeValue::from(id.as_str()));
            }
            if let Some(name) = &user.name {
                attributes.insert("usr.name".to_string(), AttributeValue::from(name.as_str()));
            }
            if let Some(email) = &user.email {
                attributes.insert("usr.email".to_string(), AttributeValue::from(email.as_str()));
            }
            for (key, value) in &user.extra_info {
                attributes.insert(format!("usr.{key}"), value.clone());
            }
        }
        attributes
    }

    // # RUM

    /// Global attributes, then user identity, then per-call attributes.
    fn merged_attributes(
        &self,
        rum: &RumState,
        call: HashMap<String, AttributeValue>,
    ) -> HashMap<String, AttributeValue> {
        let mut merged = rum.attributes.clone();
        merged.extend(self.user_attributes());
        merged.extend(call);
        merged
    }

    /// Must be called with the RUM lock released: the sink is external
    /// code and may call back into the facade from `emit`.
    fn emit_rum(&self, session_sampled: bool, record: EventRecord) {
        if !session_sampled {
            dd_debug!("RUM: session not sampled, dropping record");
            return;
        }
        self.inner.sink.emit(record);
    }

    pub fn start_view(
        &self,
        key: impl Into<String>,
        name: impl Into<String>,
        attributes: HashMap<String, AttributeValue>,
    ) -> Result<()> {
        self.with_init(|_| {
            let key = key.into();
            let name = name.into();
            let now = unix_nanos_now();

            let (sampled, record) = {
                let mut rum = self.inner.rum.lock().unwrap();
                if rum.views.contains_key(&key) {
                    dd_warn!("RUM: view {key} started twice, restarting it");
                }
                rum.views.insert(
                    key.clone(),
                    ViewRecord {
                        name: name.clone(),
                        start_ns: now,
                        timings: BTreeMap::new(),
                    },
                );
                rum.current_view = Some(key.clone());

                let attributes = self.merged_attributes(&rum, attributes);
                (
                    rum.session_sampled,
                    EventRecord::RumView(RumViewEvent {
                        key,
                        name,
                        phase: ViewPhase::Start,
                        duration_ns: None,
                        timings: BTreeMap::new(),
                        attributes,
                        session_id: rum.session_id.clone(),
                        timestamp_ns: now,
                    }),
                )
            };
            self.emit_rum(sampled, record);
        })
    }

    /// Stops a view started with [`start_view`](Self::start_view).
    /// Stopping a view that is not active logs a warning and does
    /// nothing, mirroring how mobile view lifecycles race teardown.
    pub fn stop_view(&self, key: &str, attributes: HashMap<String, AttributeValue>) -> Result<()> {
        self.with_init(|_| {
            let now = unix_nanos_now();

            let (sampled, record) = {
                let mut rum = self.inner.rum.lock().unwrap();
                let Some(view) = rum.views.remove(key) else {
                    dd_warn!("RUM: stop_view on unknown view {key}");
                    return;
                };
                if rum.current_view.as_deref() == Some(key) {
                    rum.current_view = None;
                }

                let attributes = self.merged_attributes(&rum, attributes);
                (
                    rum.session_sampled,
                    EventRecord::RumView(RumViewEvent {
                        key: key.to_string(),
                        name: view.name,
                        phase: ViewPhase::Stop,
                        duration_ns: Some(now.saturating_sub(view.start_ns)),
                        timings: view.timings,
                        attributes,
                        session_id: rum.session_id.clone(),
                        timestamp_ns: now,
                    }),
                )
            };
            self.emit_rum(sampled, record);
        })
    }

    /// Records a named timing on the current view, measured from the
    /// view's start. Reported with the view's `Stop` record.
    pub fn add_view_timing(&self, name: impl Into<String>) -> Result<()> {
        self.with_init(|_| {
            let now = unix_nanos_now();
            let mut rum = self.inner.rum.lock().unwrap();
            let Some(key) = rum.current_view.clone() else {
                dd_warn!("RUM: add_view_timing with no active view");
                return;
            };
            if let Some(view) = rum.views.get_mut(&key) {
                let elapsed = now.saturating_sub(view.start_ns);
                view.timings.insert(name.into(), elapsed);
            }
        })
    }

    pub fn add_action(
        &self,
        action_type: ActionType,
        name: impl Into<String>,
        attributes: HashMap<String, AttributeValue>,
    ) -> Result<()> {
        self.with_init(|_| {
            let (sampled, record) = {
                let rum = self.inner.rum.lock().unwrap();
                let attributes = self.merged_attributes(&rum, attributes);
                (
                    rum.session_sampled,
                    EventRecord::RumAction(RumActionEvent {
                        action_type,
                        name: name.into(),
                        attributes,
                        session_id: rum.session_id.clone(),
                        timestamp_ns: unix_nanos_now(),
                    }),
                )
            };
            self.emit_rum(sampled, record);
        })
    }

    pub fn add_error(
        &self,
        message: impl Into<String>,
        source: ErrorSource,
        error: Option<ErrorInfo>,
        attributes: HashMap<String, AttributeValue>,
    ) -> Result<()> {
        self.with_init(|_| {
            let (sampled, record) = {
                let rum = self.inner.rum.lock().unwrap();
                let attributes = self.merged_attributes(&rum, attributes);
                (
                    rum.session_sampled,
                    EventRecord::RumError(RumErrorEvent {
                        message: message.into(),
                        source,
                        error,
                        attributes,
                        session_id: rum.session_id.clone(),
                        timestamp_ns: unix_nanos_now(),
                    }),
                )
            };
            self.emit_rum(sampled, record);
        })
    }

    pub fn start_resource(
        &self,
        key: &str,
        method: impl Into<String>,
        url: impl Into<String>,
        attributes: HashMap<String, AttributeValue>,
    ) -> Result<()> {
        self.with_init(|_| self.inner.resources.start(key, method, url, attributes))?
    }

    pub fn stop_resource(&self, key: &str, status_code: u16, size_bytes: u64) -> Result<()> {
        self.finish_resource(
            key,
            ResourceOutcome::Success {
                status_code,
                size_bytes,
            },
        )
    }

    pub fn stop_resource_with_error(
        &self,
        key: &str,
        message: impl Into<String>,
        source: ErrorSource,
    ) -> Result<()> {
        self.finish_resource(
            key,
            ResourceOutcome::Error {
                message: message.into(),
                source,
            },
        )
    }

    fn finish_resource(&self, key: &str, outcome: ResourceOutcome) -> Result<()> {
        self.with_init(|_| {
            let mut event = self.inner.resources.stop(key, outcome)?;

            let sampled = {
                let rum = self.inner.rum.lock().unwrap();
                event.session_id = rum.session_id.clone();
                event.attributes =
                    self.merged_attributes(&rum, std::mem::take(&mut event.attributes));
                rum.session_sampled
            };
            self.emit_rum(sampled, EventRecord::RumResource(event));
            Ok(())
        })?
    }

    /// Adds an attribute to every RUM event emitted from now on.
    pub fn add_attribute(&self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Result<()> {
        self.with_init(|_| {
            self.inner
                .rum
                .lock()
                .unwrap()
                .attributes
                .insert(key.into(), value.into());
        })
    }

    pub fn remove_attribute(&self, key: &str) -> Result<()> {
        self.with_init(|_| {
            self.inner.rum.lock().unwrap().attributes.remove(key);
        })
    }

    /// Rotates the RUM session: new id, fresh sampling decision.
    pub fn start_session(&self) -> Result<()> {
        self.with_init(|init| {
            let mut rum = self.inner.rum.lock().unwrap();
            rum.session_id = Some(ids::new_session_id());
            rum.session_sampled = ids::sample(init.config.session_sample_rate());
            rum.views.clear();
            rum.current_view = None;
        })
    }

    /// Ends the RUM session; subsequent RUM events carry no session id
    /// and are dropped until [`start_session`](Self::start_session).
    pub fn stop_session(&self) -> Result<()> {
        self.with_init(|_| {
            let mut rum = self.inner.rum.lock().unwrap();
            rum.session_id = None;
            rum.session_sampled = false;
            rum.views.clear();
            rum.current_view = None;
            self.inner.resources.clear();
        })
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.rum.lock().unwrap().session_id.clone()
    }

    // # Tracing

    /// Starts a span, parented to the currently active span if any.
    pub fn start_span(&self, operation: impl Into<String>) -> Result<Span> {
        self.start_span_with_tags(operation, HashMap::new())
    }

    /// Starts a span with an initial tag set, parented to the
    /// currently active span if any.
    pub fn start_span_with_tags(
        &self,
        operation: impl Into<String>,
        tags: HashMap<String, AttributeValue>,
    ) -> Result<Span> {
        self.with_init(|init| {
            let parent = self.inner.tracer.active_context();
            Span::start(
                self.inner.tracer.clone(),
                operation,
                parent.as_ref(),
                tags,
                init.config.trace_sample_rate(),
            )
        })
    }

    /// Starts a span under an explicit parent, typically a context
    /// extracted from incoming request headers.
    pub fn start_span_with_parent(
        &self,
        operation: impl Into<String>,
        parent: &SpanContext,
    ) -> Result<Span> {
        self.with_init(|init| {
            Span::start(
                self.inner.tracer.clone(),
                operation,
                Some(parent),
                HashMap::new(),
                init.config.trace_sample_rate(),
            )
        })
    }

    pub fn active_span_context(&self) -> Option<SpanContext> {
        self.inner.tracer.active_context()
    }

    /// Writes `context` into an outgoing request's headers using the
    /// configured propagation styles.
    pub fn inject(&self, context: &SpanContext, carrier: &mut dyn Injector) -> Result<()> {
        self.with_init(|init| init.propagator.inject(context, carrier))
    }

    /// Reads a remote parent context out of incoming request headers.
    /// `Ok(None)` when the carrier holds no usable trace headers.
    pub fn extract(&self, carrier: &dyn Extractor) -> Result<Option<SpanContext>> {
        self.with_init(|init| init.propagator.extract(carrier))
    }

    /// Whether requests to `host` should carry trace headers.
    pub fn should_trace_host(&self, host: &str) -> bool {
        self.with_init(|init| init.config.is_first_party_host(host))
            .unwrap_or(false)
    }
}
