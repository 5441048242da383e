//! Sensor drivers.
//!
//! - [`dht11`]: timing-protocol humidity/temperature sensor (the decoder)
//! - [`uv`]: analog UV intensity
//! - [`soil`]: analog capacitive soil moisture
//!
//! Each driver implements [`SensorSource`](crate::activity::SensorSource)
//! and is owned by exactly one acquisition activity.

pub mod dht11;
pub mod soil;
pub mod uv;
#[cfg(not(target_os = "espidf"))]
pub mod waveform;

use core::fmt;

use crate::barrier::SensorCategory;
use crate::config;

pub use dht11::Reading;
pub use soil::SoilReading;
pub use uv::UvReading;

/// 12-bit ADC full scale.
pub const ADC_MAX: u16 = 4095;

/// A reading from any of the three sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    Climate(Reading),
    Uv(UvReading),
    Soil(SoilReading),
}

impl SensorReading {
    pub const fn category(&self) -> SensorCategory {
        match self {
            Self::Climate(_) => SensorCategory::Dht,
            Self::Uv(_) => SensorCategory::Uv,
            Self::Soil(_) => SensorCategory::Soil,
        }
    }

    pub const fn topic(&self) -> &'static str {
        match self {
            Self::Climate(_) => config::TOPIC_DHT11,
            Self::Uv(_) => config::TOPIC_UV,
            Self::Soil(_) => config::TOPIC_SOIL,
        }
    }

    pub const fn captured_at_ms(&self) -> u64 {
        match self {
            Self::Climate(r) => r.captured_at_ms,
            Self::Uv(r) => r.captured_at_ms,
            Self::Soil(r) => r.captured_at_ms,
        }
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Climate(r) => write!(f, "{r}"),
            Self::Uv(r) => write!(f, "UV raw={} ({:.2} V)", r.raw, r.voltage),
            Self::Soil(r) => write!(f, "soil raw={} ({}%)", r.raw, r.percent),
        }
    }
}
