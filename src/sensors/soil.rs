//! Capacitive soil-moisture sensor.
//!
//! Read through the shared ADC1 oneshot unit (channel 5, GPIO33). The sensor
//! reads high when dry, so the percentage is inverted:
//! 4095 (air) → 0 %, 0 (water) → 100 %.
//!
//! After a successful publish the sensor's activity also runs automatic
//! irrigation: when moisture drops below the plant profile's trigger it
//! raises an alert and pulses the solenoid valve.

use log::{info, warn};

use crate::activity::{CycleContext, SensorSource};
use crate::app::ports::{PublishPort, TimePort};
use crate::barrier::SensorCategory;
use crate::config::TOPIC_ALERTS;
use crate::drivers::hw_init;
use crate::error::Error;
use crate::payload;
use crate::sensors::{ADC_MAX, SensorReading};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoilReading {
    pub raw: u16,
    /// 0 = bone dry, 100 = saturated.
    pub percent: u8,
    pub captured_at_ms: u64,
}

impl SoilReading {
    pub fn from_raw(raw: u16, captured_at_ms: u64) -> Self {
        let raw = raw.min(ADC_MAX);
        let dryness = u32::from(raw) * 100 / u32::from(ADC_MAX);
        Self {
            raw,
            percent: (100 - dryness) as u8,
            captured_at_ms,
        }
    }
}

pub struct SoilSensor {
    channel: u32,
}

impl SoilSensor {
    pub fn new(channel: u32) -> Self {
        Self { channel }
    }

    fn irrigate<P: PublishPort, T: TimePort>(&self, soil: &SoilReading, cx: &CycleContext<'_, P, T>) {
        let profile = cx.coordinator.plant_profile();
        if !profile.should_irrigate(soil.percent) {
            return;
        }
        if !cx.coordinator.solenoid_enabled() {
            info!("Soil: irrigation needed ({}%) but solenoid is disabled", soil.percent);
            return;
        }

        let trigger = profile.irrigation_trigger_percent();
        warn!("Soil: moisture {}% below {}%, starting auto irrigation", soil.percent, trigger);

        let alert = payload::irrigation_alert(
            cx.coordinator.device_id(),
            soil.percent,
            trigger,
            cx.time.uptime_ms(),
        );
        match alert.and_then(|a| cx.publisher.publish(TOPIC_ALERTS, &a)) {
            Ok(id) => info!("Soil: irrigation alert sent [msg_id={}]", id),
            Err(e) => warn!("Soil: irrigation alert not sent: {}", e),
        }

        cx.coordinator.solenoid.pulse(profile.irrigation_pulse(), cx.time);
        info!("Soil: auto irrigation finished");
    }
}

impl SensorSource for SoilSensor {
    const CATEGORY: SensorCategory = SensorCategory::Soil;

    fn acquire(&mut self, time: &impl TimePort) -> Result<SensorReading, Error> {
        let raw = hw_init::adc1_read(self.channel)?;
        Ok(SensorReading::Soil(SoilReading::from_raw(raw, time.uptime_ms())))
    }

    fn after_publish<P: PublishPort, T: TimePort>(
        &mut self,
        reading: &SensorReading,
        cx: &CycleContext<'_, P, T>,
    ) {
        if let SensorReading::Soil(soil) = reading {
            self.irrigate(soil, cx);
        }
    }
}
