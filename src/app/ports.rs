//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Decoder / Activities / PowerManager (domain)
//! ```
//!
//! Driven adapters (pin, MQTT client, clock) implement these traits. The
//! domain consumes them via generics, so the decoder and the duty-cycle
//! logic run unchanged against the simulated line and manual clock on the
//! host.

use embassy_time::Duration;

use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// Signal sampler (driven adapter: single-wire data pin)
// ───────────────────────────────────────────────────────────────

/// One bidirectional digital pin plus a microsecond busy-wait.
///
/// No logic lives behind this trait. Implementations must not yield the
/// CPU in `delay_us`; the decoder measures pulse widths by counting polls.
pub trait SignalPin {
    type Error: core::fmt::Debug;

    /// Take the line (host drives it).
    fn set_output(&mut self) -> Result<(), Self::Error>;

    /// Release the line to the pull-up and listen.
    fn set_input(&mut self) -> Result<(), Self::Error>;

    /// Drive the line level. Only meaningful while in output mode.
    fn set_level(&mut self, high: bool) -> Result<(), Self::Error>;

    /// Sample the current line level.
    fn is_high(&mut self) -> Result<bool, Self::Error>;

    /// Busy-wait for `us` microseconds.
    fn delay_us(&mut self, us: u32);
}

// ───────────────────────────────────────────────────────────────
// Publish port (driven adapter: domain → message broker)
// ───────────────────────────────────────────────────────────────

/// Broker-assigned identifier of an accepted publish.
pub type MessageId = u32;

/// Fire-and-forget publisher shared by every acquisition activity.
///
/// Takes `&self`: adapters serialise access internally.
pub trait PublishPort {
    /// Queue `payload` on `topic`. Never waits for delivery.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<MessageId, CommsError>;

    fn is_connected(&self) -> bool;
}

impl<P: PublishPort + ?Sized> PublishPort for &P {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<MessageId, CommsError> {
        (**self).publish(topic, payload)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

// ───────────────────────────────────────────────────────────────
// Time port (driven adapter: monotonic clock + task suspension)
// ───────────────────────────────────────────────────────────────

/// Monotonic clock and the only true suspension point of an activity.
pub trait TimePort {
    /// Microseconds since boot.
    fn uptime_us(&self) -> u64;

    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }

    /// Suspend the calling task. Other tasks keep running.
    fn sleep(&self, duration: Duration);

    /// Wall-clock hour (0–23), `None` until the clock is synced.
    fn current_hour(&self) -> Option<u8> {
        None
    }
}
