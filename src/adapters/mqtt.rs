//! MQTT publisher adapter.
//!
//! Implements [`PublishPort`] for every acquisition activity and the
//! command service, and forwards frames received on subscribed topics into
//! the inbound channel.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` with an event callback.
//!   Publishes are enqueued (QoS 1) and never wait for the broker ack.
//! - **all other targets**: an in-memory outbox with a settable
//!   connection flag, for host-side tests.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::app::ports::{MessageId, PublishPort};
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
};
#[cfg(target_os = "espidf")]
use log::{info, warn};

#[cfg(target_os = "espidf")]
use crate::app::channels;
#[cfg(target_os = "espidf")]
use crate::config::{TOPIC_COMMANDS, TOPIC_PLANT_CONFIG, TOPIC_SOLENOID};

/// Topics the node listens on.
#[cfg(target_os = "espidf")]
const SUBSCRIPTIONS: [&str; 3] = [TOPIC_COMMANDS, TOPIC_SOLENOID, TOPIC_PLANT_CONFIG];

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct MqttPublisher {
    client: Mutex<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
}

#[cfg(target_os = "espidf")]
impl MqttPublisher {
    /// Connect to `url` and subscribe on every (re)connect.
    ///
    /// Subscriptions are issued from the main thread via
    /// [`subscribe_all`](Self::subscribe_all) once the session is up.
    pub fn connect(url: &str, client_id: &str) -> anyhow::Result<Self> {
        let connected = Arc::new(AtomicBool::new(false));
        let flag = connected.clone();

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };

        let client = EspMqttClient::new_cb(url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => {
                info!("MQTT: connected");
                flag.store(true, Ordering::Release);
            }
            EventPayload::Disconnected => {
                warn!("MQTT: disconnected");
                flag.store(false, Ordering::Release);
            }
            EventPayload::Received {
                topic: Some(topic),
                data,
                ..
            } => channels::push_inbound(topic, data),
            EventPayload::Error(e) => warn!("MQTT: client error: {:?}", e),
            _ => {}
        })?;

        info!("MQTT: client started for {}", url);
        Ok(Self {
            client: Mutex::new(client),
            connected,
        })
    }

    pub fn subscribe_all(&self) -> Result<(), CommsError> {
        let mut client = self.client.lock().map_err(|_| CommsError::PublishFailed)?;
        for topic in SUBSCRIPTIONS {
            client
                .subscribe(topic, QoS::AtLeastOnce)
                .map_err(|_| CommsError::PublishFailed)?;
            info!("MQTT: subscribed to {}", topic);
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl PublishPort for MqttPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<MessageId, CommsError> {
        if !self.is_connected() {
            return Err(CommsError::TransportUnavailable);
        }
        let mut client = self.client.lock().map_err(|_| CommsError::PublishFailed)?;
        client
            .enqueue(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|_| CommsError::PublishFailed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct MqttPublisher {
    connected: AtomicBool,
    outbox: std::sync::Mutex<Vec<(String, Vec<u8>)>>,
    next_id: core::sync::atomic::AtomicU32,
}

#[cfg(not(target_os = "espidf"))]
impl Default for MqttPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl MqttPublisher {
    /// Starts disconnected.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            outbox: std::sync::Mutex::new(Vec::new()),
            next_id: core::sync::atomic::AtomicU32::new(1),
        }
    }

    pub fn sim_set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Every accepted publish so far, oldest first.
    pub fn sim_outbox(&self) -> Vec<(String, Vec<u8>)> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[cfg(not(target_os = "espidf"))]
impl PublishPort for MqttPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<MessageId, CommsError> {
        if !self.is_connected() {
            return Err(CommsError::TransportUnavailable);
        }
        let mut outbox = self.outbox.lock().map_err(|_| CommsError::PublishFailed)?;
        outbox.push((topic.to_owned(), payload.to_vec()));
        log::debug!("MQTT(sim): {} <- {} B", topic, payload.len());
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}
