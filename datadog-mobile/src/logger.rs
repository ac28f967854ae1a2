// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex},
};

use dd_mobile::{
    event::{unix_nanos_now, ErrorInfo, EventRecord, LogEvent, LogLevel},
    AttributeValue, Sink,
};

/// A named logger emitting structured log records to the sink.
///
/// Loggers are cheap handles; an application typically creates one per
/// subsystem. Default attributes and tags set on the logger are merged
/// into every record it emits, with per-call attributes winning on key
/// collision.
pub struct Logger {
    sink: Arc<dyn Sink>,
    name: String,
    attributes: Mutex<HashMap<String, AttributeValue>>,
    tags: Mutex<BTreeSet<String>>,
}

impl Logger {
    pub(crate) fn new(sink: Arc<dyn Sink>, name: impl Into<String>) -> Self {
        Logger {
            sink,
            name: name.into(),
            attributes: Mutex::new(HashMap::new()),
            tags: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_attribute(&self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.lock().unwrap().insert(key.into(), value.into());
    }

    pub fn remove_attribute(&self, key: &str) {
        self.attributes.lock().unwrap().remove(key);
    }

    pub fn add_tag(&self, tag: impl Into<String>) {
        self.tags.lock().unwrap().insert(tag.into());
    }

    pub fn remove_tag(&self, tag: &str) {
        self.tags.lock().unwrap().remove(tag);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, None, HashMap::new());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None, HashMap::new());
    }

    pub fn notice(&self, message: impl Into<String>) {
        self.log(LogLevel::Notice, message, None, HashMap::new());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message, None, HashMap::new());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, None, HashMap::new());
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message, None, HashMap::new());
    }

    pub fn debug_with(
        &self,
        message: impl Into<String>,
        error: Option<ErrorInfo>,
        attributes: HashMap<String, AttributeValue>,
    ) {
        self.log(LogLevel::Debug, message, error, attributes);
    }

    pub fn info_with(
        &self,
        message: impl Into<String>,
        error: Option<ErrorInfo>,
        attributes: HashMap<String, AttributeValue>,
    ) {
        self.log(LogLevel::Info, message, error, attributes);
    }

    pub fn notice_with(
        &self,
        message: impl Into<String>,
        error: Option<ErrorInfo>,
        attributes: HashMap<String, AttributeValue>,
    ) {
        self.log(LogLevel::Notice, message, error, attributes);
    }

    pub fn warn_with(
        &self,
        message: impl Into<String>,
        error: Option<ErrorInfo>,
        attributes: HashMap<String, AttributeValue>,
    ) {
        self.log(LogLevel::Warn, message, error, attributes);
    }

    pub fn error_with(
        &self,
        message: impl Into<String>,
        error: Option<ErrorInfo>,
        attributes: HashMap<String, AttributeValue>,
    ) {
        self.log(LogLevel::Error, message, error, attributes);
    }

    pub fn critical_with(
        &self,
        message: impl Into<String>,
        error: Option<ErrorInfo>,
        attributes: HashMap<String, AttributeValue>,
    ) {
        self.log(LogLevel::Critical, message, error, attributes);
    }

    /// Emits one log record at `level`.
    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        error: Option<ErrorInfo>,
        attributes: HashMap<String, AttributeValue>,
    ) {
        let mut merged = self.attributes.lock().unwrap().clone();
        merged.extend(attributes);

        self.sink.emit(EventRecord::Log(LogEvent {
            logger_name: self.name.clone(),
            level,
            message: message.into(),
            error,
            attributes: merged,
            tags: self.tags.lock().unwrap().iter().cloned().collect(),
            timestamp_ns: unix_nanos_now(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use dd_mobile::sink::MemorySink;

    use super::*;

    fn logger_with_sink(name: &str) -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (Logger::new(sink.clone(), name), sink)
    }

    #[test]
    fn test_emits_one_record_per_call() {
        let (logger, sink) = logger_with_sink("network");

        logger.info("request sent");
        logger.critical("out of disk");

        let records = sink.take();
        assert_eq!(records.len(), 2);
        let EventRecord::Log(first) = &records[0] else {
            panic!("expected a log record");
        };
        assert_eq!(first.logger_name, "network");
        assert_eq!(first.level, LogLevel::Info);
        assert_eq!(first.message, "request sent");
        let EventRecord::Log(second) = &records[1] else {
            panic!("expected a log record");
        };
        assert_eq!(second.level, LogLevel::Critical);
    }

    #[test]
    fn test_default_attributes_merge_with_call_attributes() {
        let (logger, sink) = logger_with_sink("cart");
        logger.add_attribute("build", "1.2.3");
        logger.add_attribute("a", 0_i64);

        logger.log(
            LogLevel::Warn,
            "slow",
            None,
            HashMap::from([("a".to_string(), AttributeValue::Int(1))]),
        );

        let records = sink.take();
        let EventRecord::Log(event) = &records[0] else {
            panic!("expected a log record");
        };
        assert_eq!(event.attributes.get("build"), Some(&AttributeValue::Str("1.2.3".to_string())));
        // per-call value wins
        assert_eq!(event.attributes.get("a"), Some(&AttributeValue::Int(1)));
    }

    #[test]
    fn test_tags_and_removal() {
        let (logger, sink) = logger_with_sink("cart");
        logger.add_tag("team:mobile");
        logger.add_tag("env:staging");
        logger.remove_tag("env:staging");

        logger.error("boom");

        let records = sink.take();
        let EventRecord::Log(event) = &records[0] else {
            panic!("expected a log record");
        };
        assert_eq!(event.tags, vec!["team:mobile".to_string()]);
    }

    #[test]
    fn test_level_with_variants_carry_error_and_attributes() {
        let (logger, sink) = logger_with_sink("network");

        logger.info_with(
            "request finished",
            None,
            HashMap::from([("status".to_string(), AttributeValue::Int(200))]),
        );
        logger.error_with(
            "request failed",
            Some(ErrorInfo::new("connection reset")),
            HashMap::new(),
        );

        let records = sink.take();
        assert_eq!(records.len(), 2);
        let EventRecord::Log(first) = &records[0] else {
            panic!("expected a log record");
        };
        assert_eq!(first.level, LogLevel::Info);
        assert_eq!(first.attributes.get("status"), Some(&AttributeValue::Int(200)));
        let EventRecord::Log(second) = &records[1] else {
            panic!("expected a log record");
        };
        assert_eq!(second.level, LogLevel::Error);
        assert_eq!(
            second.error.as_ref().map(|e| e.message.as_str()),
            Some("connection reset")
        );
    }

    #[test]
    fn test_error_payload() {
        let (logger, sink) = logger_with_sink("cart");
        let mut error = ErrorInfo::new("connection reset");
        error.kind = Some("IOError".to_string());

        logger.log(LogLevel::Error, "request failed", Some(error), HashMap::new());

        let records = sink.take();
        let EventRecord::Log(event) = &records[0] else {
            panic!("expected a log record");
        };
        let error = event.error.as_ref().unwrap();
        assert_eq!(error.message, "connection reset");
        assert_eq!(error.kind.as_deref(), Some("IOError"));
    }
}
