//! Mock adapters for integration tests.
//!
//! [`MockBroker`] records every publish so tests can assert on topics and
//! JSON bodies; [`ScriptedSource`] replays a fixed list of acquisition
//! results without touching the simulated ADC.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use plantsense::activity::SensorSource;
use plantsense::app::ports::{MessageId, PublishPort, TimePort};
use plantsense::barrier::SensorCategory;
use plantsense::error::{CommsError, Error, SensorError};
use plantsense::sensors::{SensorReading, SoilReading};

// ── Publish record ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub body: serde_json::Value,
}

// ── MockBroker ────────────────────────────────────────────────

pub struct MockBroker {
    connected: AtomicBool,
    reject: AtomicBool,
    next_id: AtomicU32,
    pub log: Mutex<Vec<Published>>,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn connected() -> Self {
        Self {
            connected: AtomicBool::new(true),
            reject: AtomicBool::new(false),
            next_id: AtomicU32::new(1),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn disconnected() -> Self {
        let b = Self::connected();
        b.set_connected(false);
        b
    }

    pub fn set_connected(&self, on: bool) {
        self.connected.store(on, Ordering::SeqCst);
    }

    /// Stay connected but fail every publish.
    pub fn set_rejecting(&self, on: bool) {
        self.reject.store(on, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Published> {
        self.log.lock().unwrap().clone()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<serde_json::Value> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.body)
            .collect()
    }

    pub fn last(&self) -> Option<Published> {
        self.published().pop()
    }
}

impl PublishPort for MockBroker {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<MessageId, CommsError> {
        if !self.is_connected() {
            return Err(CommsError::TransportUnavailable);
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(CommsError::PublishFailed);
        }
        let body = serde_json::from_slice(payload).map_err(|_| CommsError::PayloadEncode)?;
        self.log.lock().unwrap().push(Published {
            topic: topic.to_owned(),
            body,
        });
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ── ScriptedSource ────────────────────────────────────────────

/// Soil-category source returning queued raw values; `None` is a failed read.
pub struct ScriptedSource {
    script: VecDeque<Option<u16>>,
    pub calls: u32,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Option<u16>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            calls: 0,
        }
    }
}

impl SensorSource for ScriptedSource {
    const CATEGORY: SensorCategory = SensorCategory::Soil;

    fn acquire(&mut self, time: &impl TimePort) -> Result<SensorReading, Error> {
        self.calls += 1;
        match self.script.pop_front().flatten() {
            Some(raw) => Ok(SensorReading::Soil(SoilReading::from_raw(raw, time.uptime_ms()))),
            None => Err(SensorError::AdcReadFailed.into()),
        }
    }
}
