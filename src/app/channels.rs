//! Inbound MQTT frame channel.
//!
//! The MQTT client's event callback runs on the ESP-IDF MQTT task; commands
//! are handled on the main thread. A bounded `embassy-sync` channel bridges
//! the two without allocation.
//!
//! ```text
//! ┌───────────────┐  InboundFrame  ┌──────────────┐
//! │ MQTT callback │───────────────▶│  main loop   │
//! └───────────────┘                └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::{String, Vec};
use log::warn;

pub const MAX_TOPIC_LEN: usize = 32;
pub const MAX_PAYLOAD_LEN: usize = 512;

const INBOUND_DEPTH: usize = 4;

/// One message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl InboundFrame {
    /// `None` if either part exceeds its fixed capacity.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        Some(Self {
            topic: String::try_from(topic).ok()?,
            payload: Vec::from_slice(payload).ok()?,
        })
    }
}

pub static INBOUND: Channel<CriticalSectionRawMutex, InboundFrame, INBOUND_DEPTH> = Channel::new();

/// Queue a received frame. Oversized or overflowing frames are dropped.
pub fn push_inbound(topic: &str, payload: &[u8]) {
    let Some(frame) = InboundFrame::new(topic, payload) else {
        warn!("MQTT: dropping oversized frame on '{}' ({} B)", topic, payload.len());
        return;
    };
    if INBOUND.try_send(frame).is_err() {
        warn!("MQTT: inbound channel full, dropping frame on '{}'", topic);
    }
}

pub fn try_recv_inbound() -> Option<InboundFrame> {
    INBOUND.try_receive().ok()
}
