//! Unified error types for the PlantSense firmware.
//!
//! A single `Error` enum that every subsystem converts into, so each
//! acquisition activity can log a failure and move on to its next cycle
//! with one code path. All variants are `Copy`.

use core::fmt;

use crate::barrier::PublishFlags;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The single-wire decoder did not produce a valid frame.
    Decode(DecodeError),
    /// An analog sensor could not be read.
    Sensor(SensorError),
    /// The publish collaborator refused or could not take a message.
    Comms(CommsError),
    /// Cross-activity coordination did not complete as expected.
    Coordination(CoordinationError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Coordination(e) => write!(f, "coordination: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder errors
// ---------------------------------------------------------------------------

/// Where in the handshake / bit stream the decoder gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePhase {
    StartSignal,
    AwaitResponseLow,
    AwaitResponseHigh,
    AwaitDataStart,
    ReadBit(u8),
    Validate,
}

impl fmt::Display for DecodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartSignal => write!(f, "start signal"),
            Self::AwaitResponseLow => write!(f, "await response low"),
            Self::AwaitResponseHigh => write!(f, "await response high"),
            Self::AwaitDataStart => write!(f, "await data start"),
            Self::ReadBit(i) => write!(f, "bit {i}"),
            Self::Validate => write!(f, "validate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Sensor never answered the start signal.
    InitialResponseTimeout,
    /// Sensor answered but never started the first data bit.
    DataStartTimeout,
    /// Bit `n` (0..40) overran its low or high bound.
    BitTimeout(u8),
    /// Computed checksum vs. the checksum byte on the wire.
    ChecksumMismatch { expected: u8, actual: u8 },
    /// The pin HAL reported an error while driving or sampling the line.
    PinFault,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitialResponseTimeout => write!(f, "no response to start signal"),
            Self::DataStartTimeout => write!(f, "data start timeout"),
            Self::BitTimeout(i) => write!(f, "timeout on bit {i}"),
            Self::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch (expected {expected}, got {actual})")
            }
            Self::PinFault => write!(f, "pin fault"),
        }
    }
}

/// A failed decode: the failure kind plus the phase it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    pub kind: FailureKind,
    pub phase: DecodePhase,
}

impl DecodeError {
    pub const fn new(kind: FailureKind, phase: DecodePhase) -> Self {
        Self { kind, phase }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} during {}", self.kind, self.phase)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error.
    AdcReadFailed,
    /// Raw value is outside the 12-bit ADC range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Broker connection is down; nothing was sent.
    TransportUnavailable,
    /// The client rejected the publish.
    PublishFailed,
    /// Payload could not be serialised.
    PayloadEncode,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportUnavailable => write!(f, "transport unavailable"),
            Self::PublishFailed => write!(f, "MQTT publish failed"),
            Self::PayloadEncode => write!(f, "payload encoding failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Coordination errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinationError {
    /// Not every required activity reported before the low-power wait.
    /// Non-fatal: the wait proceeds anyway.
    BarrierTimeout { missing: PublishFlags },
}

impl fmt::Display for CoordinationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BarrierTimeout { missing } => {
                write!(f, "barrier timeout, missing [{missing}]")
            }
        }
    }
}

impl From<CoordinationError> for Error {
    fn from(e: CoordinationError) -> Self {
        Self::Coordination(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
