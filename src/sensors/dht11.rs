//! DHT11 humidity/temperature sensor: single-wire protocol decoder.
//!
//! The host pulls the line low for 18 ms, releases it, and the sensor
//! answers with an 80 µs low / 80 µs high preamble followed by 40 data
//! bits. Every bit starts with a ~50 µs low; the width of the following
//! high pulse carries the value (~26 µs → `0`, ~70 µs → `1`).
//!
//! ```text
//!  host  ──┐ 18 ms ┌30µs┐
//!          └───────┘    │ sensor ┌─80─┐    ┌bit┐    ┌bit┐
//!                       └──80────┘    └─50─┘   └─50─┘   └ …
//! ```
//!
//! There is no timer capture: each wait loop samples the pin, busy-waits
//! one poll interval and counts. A loop that counts past its bound is a
//! timeout, and a high pulse that counts past [`DecoderTiming::one_threshold`]
//! is a `1`. The decode never yields; run it from a task pinned away
//! from the Wi-Fi core.
//!
//! Bytes on the wire: `[hum_int, hum_frac, temp_int, temp_frac, checksum]`.
//! The DHT11 always sends zero fractions.

use core::fmt;

use embassy_time::Duration;
use log::{debug, warn};

use crate::activity::SensorSource;
use crate::app::ports::{SignalPin, TimePort};
use crate::barrier::SensorCategory;
use crate::error::{DecodeError, DecodePhase, Error, FailureKind};
use crate::sensors::SensorReading;

/// Bits in one transmission.
pub const FRAME_BITS: usize = 40;
/// The sensor needs this long between start signals.
pub const MIN_SAMPLING_INTERVAL: Duration = Duration::from_secs(1);

// ── Timing ────────────────────────────────────────────────────

/// Every timing constant the decoder uses.
///
/// Poll bounds are counts of [`poll_interval_us`](Self::poll_interval_us)
/// steps, not microseconds; on hardware each step also pays for the GPIO
/// read, so counts run slightly below the real pulse width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderTiming {
    /// Host start-signal low time.
    pub start_low_us: u32,
    /// Host releases the line high for this long before listening.
    pub release_us: u32,
    pub poll_interval_us: u32,
    /// Bound for each of the three handshake phases.
    pub response_bound: u32,
    /// Bound for the low gap before each bit.
    pub bit_low_bound: u32,
    /// Bound for the high pulse of each bit.
    pub bit_high_bound: u32,
    /// A high pulse counting strictly more than this is a `1`.
    pub one_threshold: u32,
}

impl DecoderTiming {
    pub const DHT11: Self = Self {
        start_low_us: 18_000,
        release_us: 30,
        poll_interval_us: 1,
        response_bound: 100,
        bit_low_bound: 70,
        bit_high_bound: 100,
        one_threshold: 40,
    };
}

impl Default for DecoderTiming {
    fn default() -> Self {
        Self::DHT11
    }
}

// ── Frame ─────────────────────────────────────────────────────

/// The 5 raw bytes of one transmission, filled MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolFrame([u8; 5]);

impl ProtocolFrame {
    pub const fn from_bytes(bytes: [u8; 5]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 5] {
        self.0
    }

    /// Set bit `index` (0 = MSB of byte 0) to `one`.
    pub fn set_bit(&mut self, index: usize, one: bool) {
        let mask = 0x80 >> (index % 8);
        if let Some(byte) = self.0.get_mut(index / 8) {
            if one {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        }
    }

    /// Sum of the four data bytes modulo 256.
    pub fn computed_checksum(&self) -> u8 {
        self.0[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
    }

    pub const fn checksum(&self) -> u8 {
        self.0[4]
    }

    pub fn validate(&self) -> Result<(), FailureKind> {
        let expected = self.computed_checksum();
        let actual = self.checksum();
        if expected == actual {
            Ok(())
        } else {
            Err(FailureKind::ChecksumMismatch { expected, actual })
        }
    }
}

// ── Reading ───────────────────────────────────────────────────

/// A validated measurement. Whole units: %RH and °C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub humidity: u8,
    pub temperature: u8,
    /// Monotonic uptime when the frame validated.
    pub captured_at_ms: u64,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T={}°C H={}%", self.temperature, self.humidity)
    }
}

pub type DecodeOutcome = Result<Reading, DecodeError>;

// ── Decoder ───────────────────────────────────────────────────

enum PollError {
    Timeout,
    Pin,
}

/// Owns the data pin for its whole lifetime; one decode at a time by
/// construction (`&mut self`).
pub struct Dht11<P> {
    pin: P,
    timing: DecoderTiming,
}

impl<P: SignalPin> Dht11<P> {
    pub fn new(pin: P) -> Self {
        Self::with_timing(pin, DecoderTiming::DHT11)
    }

    pub fn with_timing(pin: P, timing: DecoderTiming) -> Self {
        Self { pin, timing }
    }

    pub fn timing(&self) -> &DecoderTiming {
        &self.timing
    }

    /// Give the pin back, e.g. to inspect a simulated line.
    pub fn release(self) -> P {
        self.pin
    }

    /// Run one full handshake + 40-bit decode + checksum check.
    ///
    /// Runs to completion or first timeout. Partial frames are dropped;
    /// retrying is up to the caller, no sooner than [`MIN_SAMPLING_INTERVAL`].
    pub fn read(&mut self, clock: &impl TimePort) -> DecodeOutcome {
        let frame = self.read_frame()?;
        frame
            .validate()
            .map_err(|kind| DecodeError::new(kind, DecodePhase::Validate))?;

        let [humidity, _, temperature, _, _] = frame.bytes();
        Ok(Reading {
            humidity,
            temperature,
            captured_at_ms: clock.uptime_ms(),
        })
    }

    /// Handshake and bit decode only, no checksum check. The line is
    /// released afterwards whatever the outcome.
    pub fn read_frame(&mut self) -> Result<ProtocolFrame, DecodeError> {
        let result = self.decode_frame();
        if self.pin.set_input().is_err() {
            warn!("DHT11: failed to release data line");
        }
        result
    }

    fn decode_frame(&mut self) -> Result<ProtocolFrame, DecodeError> {
        let t = self.timing;

        self.start_signal()
            .map_err(|_| DecodeError::new(FailureKind::PinFault, DecodePhase::StartSignal))?;

        self.expect_level(
            true,
            t.response_bound,
            DecodePhase::AwaitResponseLow,
            FailureKind::InitialResponseTimeout,
        )?;
        self.expect_level(
            false,
            t.response_bound,
            DecodePhase::AwaitResponseHigh,
            FailureKind::InitialResponseTimeout,
        )?;
        self.expect_level(
            true,
            t.response_bound,
            DecodePhase::AwaitDataStart,
            FailureKind::DataStartTimeout,
        )?;

        let mut frame = ProtocolFrame::default();
        for index in 0..FRAME_BITS {
            let bit = index as u8;
            let phase = DecodePhase::ReadBit(bit);
            self.expect_level(false, t.bit_low_bound, phase, FailureKind::BitTimeout(bit))?;
            let high = self.expect_level(true, t.bit_high_bound, phase, FailureKind::BitTimeout(bit))?;
            frame.set_bit(index, high > t.one_threshold);
        }

        debug!("DHT11: raw frame {:02x?}", frame.bytes());
        Ok(frame)
    }

    fn start_signal(&mut self) -> Result<(), P::Error> {
        self.pin.set_output()?;
        self.pin.set_level(false)?;
        self.pin.delay_us(self.timing.start_low_us);
        self.pin.set_level(true)?;
        self.pin.delay_us(self.timing.release_us);
        self.pin.set_input()
    }

    /// Count polls while the line holds `level`; fail on poll `bound + 1`.
    fn poll_while(&mut self, level: bool, bound: u32) -> Result<u32, PollError> {
        let mut polls = 0;
        while self.pin.is_high().map_err(|_| PollError::Pin)? == level {
            polls += 1;
            if polls > bound {
                return Err(PollError::Timeout);
            }
            self.pin.delay_us(self.timing.poll_interval_us);
        }
        Ok(polls)
    }

    /// [`poll_while`](Self::poll_while) with the failure mapped for `phase`.
    fn expect_level(
        &mut self,
        level: bool,
        bound: u32,
        phase: DecodePhase,
        on_timeout: FailureKind,
    ) -> Result<u32, DecodeError> {
        self.poll_while(level, bound).map_err(|e| match e {
            PollError::Timeout => DecodeError::new(on_timeout, phase),
            PollError::Pin => DecodeError::new(FailureKind::PinFault, phase),
        })
    }
}

impl<P: SignalPin> SensorSource for Dht11<P> {
    const CATEGORY: SensorCategory = SensorCategory::Dht;

    fn acquire(&mut self, time: &impl TimePort) -> Result<SensorReading, Error> {
        Ok(SensorReading::Climate(self.read(time)?))
    }
}
