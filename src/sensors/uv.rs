//! GUVA-S12SD UV sensor.
//!
//! Analog output proportional to UV-A/B irradiance, read through the shared
//! ADC1 oneshot unit (channel 4, GPIO32). Only the raw count and the pin
//! voltage are reported; index conversion happens server-side.

use crate::activity::SensorSource;
use crate::app::ports::TimePort;
use crate::barrier::SensorCategory;
use crate::drivers::hw_init;
use crate::error::Error;
use crate::sensors::{ADC_MAX, SensorReading};

const V_REF: f32 = 3.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvReading {
    pub raw: u16,
    pub voltage: f32,
    /// Local hour at capture, if SNTP has synced.
    pub hour: Option<u8>,
    pub captured_at_ms: u64,
}

impl UvReading {
    pub fn from_raw(raw: u16, hour: Option<u8>, captured_at_ms: u64) -> Self {
        Self {
            raw,
            voltage: f32::from(raw) / f32::from(ADC_MAX) * V_REF,
            hour,
            captured_at_ms,
        }
    }

    /// Raw count as 0-100 of full scale, the unit plant profiles use.
    pub fn exposure_percent(&self) -> u8 {
        (u32::from(self.raw.min(ADC_MAX)) * 100 / u32::from(ADC_MAX)) as u8
    }
}

pub struct UvSensor {
    channel: u32,
}

impl UvSensor {
    pub fn new(channel: u32) -> Self {
        Self { channel }
    }
}

impl SensorSource for UvSensor {
    const CATEGORY: SensorCategory = SensorCategory::Uv;

    fn acquire(&mut self, time: &impl TimePort) -> Result<SensorReading, Error> {
        let raw = hw_init::adc1_read(self.channel)?;
        Ok(SensorReading::Uv(UvReading::from_raw(
            raw,
            time.current_hour(),
            time.uptime_ms(),
        )))
    }
}
