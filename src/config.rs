//! System configuration parameters
//!
//! All tunable parameters for the PlantSense node. Values are compiled-in
//! defaults; the read period, power policy, solenoid enable and plant
//! profile can be changed at runtime over MQTT (not persisted).

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::barrier::{PublishFlags, SensorCategory};
use crate::error::{Error, Result};
use crate::power::{PowerMode, PowerPolicy};
use crate::sensors::SensorReading;

// ── MQTT topics ───────────────────────────────────────────────

pub const TOPIC_DHT11: &str = "esp32/dht11";
pub const TOPIC_UV: &str = "esp32/uv";
pub const TOPIC_SOIL: &str = "esp32/soil_moisture";
pub const TOPIC_STATUS: &str = "esp32/status";
pub const TOPIC_COMMANDS: &str = "esp32/commands";
pub const TOPIC_ALERTS: &str = "esp32/alerts";
pub const TOPIC_PLANT_CONFIG: &str = "esp32/config";
/// The active plant profile, published on `publish_all`.
pub const TOPIC_PLANT_CONFIG_CURRENT: &str = "esp32/config/current";
pub const TOPIC_SOLENOID: &str = "esp32/solenoid";

pub const DEFAULT_DEVICE_ID: &str = "ESP32_Client";

pub const MIN_READ_PERIOD_MINUTES: u16 = 1;
/// One day.
pub const MAX_READ_PERIOD_MINUTES: u16 = 1_440;

/// Clamp a requested read period into the supported range.
pub fn clamp_read_period(minutes: i64) -> u16 {
    minutes.clamp(
        i64::from(MIN_READ_PERIOD_MINUTES),
        i64::from(MAX_READ_PERIOD_MINUTES),
    ) as u16
}

pub fn minutes(m: u16) -> Duration {
    Duration::from_secs(u64::from(m) * 60)
}

// ── Plant profile ─────────────────────────────────────────────

/// Ideal growing ranges for the monitored plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantProfile {
    /// Air temperature band (°C).
    pub temperature_min: i8,
    pub temperature_max: i8,
    /// Relative air humidity band (%).
    pub humidity_min: u8,
    pub humidity_max: u8,
    /// Lower edge of the ideal soil moisture band (%).
    pub soil_moisture_min: u8,
    /// Upper edge of the ideal soil moisture band (%).
    pub soil_moisture_max: u8,
    /// UV exposure band, 0-100 of full scale.
    pub uv_min: u8,
    pub uv_max: u8,
    /// How far below `soil_moisture_min` before watering (%).
    pub irrigation_threshold: u8,
    pub auto_irrigation: bool,
    pub irrigation_pulse_secs: u16,
}

impl Default for PlantProfile {
    fn default() -> Self {
        Self {
            temperature_min: 15,
            temperature_max: 30,
            humidity_min: 40,
            humidity_max: 80,
            soil_moisture_min: 60,
            soil_moisture_max: 80,
            uv_min: 0,
            uv_max: 100,
            irrigation_threshold: 20,
            auto_irrigation: true,
            irrigation_pulse_secs: 10,
        }
    }
}

/// Profile range a reading is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Temperature,
    Humidity,
    Uv,
}

impl Parameter {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Uv => "uv",
        }
    }
}

/// A reading outside its profile band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeViolation {
    pub parameter: Parameter,
    pub value: i16,
    pub min: i16,
    pub max: i16,
}

impl RangeViolation {
    fn check(parameter: Parameter, value: i16, min: i16, max: i16) -> Option<Self> {
        (!(min..=max).contains(&value)).then_some(Self {
            parameter,
            value,
            min,
            max,
        })
    }

    pub fn is_low(&self) -> bool {
        self.value < self.min
    }
}

impl PlantProfile {
    /// Moisture (%) below which auto-irrigation kicks in.
    pub fn irrigation_trigger_percent(&self) -> u8 {
        self.soil_moisture_min.saturating_sub(self.irrigation_threshold)
    }

    pub fn should_irrigate(&self, moisture_percent: u8) -> bool {
        self.auto_irrigation && moisture_percent < self.irrigation_trigger_percent()
    }

    pub fn irrigation_pulse(&self) -> Duration {
        Duration::from_secs(u64::from(self.irrigation_pulse_secs))
    }

    /// Ranges `reading` falls outside of. Soil moisture is left to the
    /// irrigation trigger.
    pub fn violations(&self, reading: &SensorReading) -> heapless::Vec<RangeViolation, 2> {
        let checks = match reading {
            SensorReading::Climate(r) => [
                RangeViolation::check(
                    Parameter::Temperature,
                    i16::from(r.temperature),
                    i16::from(self.temperature_min),
                    i16::from(self.temperature_max),
                ),
                RangeViolation::check(
                    Parameter::Humidity,
                    i16::from(r.humidity),
                    i16::from(self.humidity_min),
                    i16::from(self.humidity_max),
                ),
            ],
            SensorReading::Uv(r) => [
                RangeViolation::check(
                    Parameter::Uv,
                    i16::from(r.exposure_percent()),
                    i16::from(self.uv_min),
                    i16::from(self.uv_max),
                ),
                None,
            ],
            SensorReading::Soil(_) => [None, None],
        };
        checks.into_iter().flatten().collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.temperature_min > self.temperature_max {
            return Err(Error::Config("temperature_min must be <= temperature_max"));
        }
        if self.humidity_min > self.humidity_max {
            return Err(Error::Config("humidity_min must be <= humidity_max"));
        }
        if self.humidity_max > 100 {
            return Err(Error::Config("humidity_max must be <= 100"));
        }
        if self.soil_moisture_min > self.soil_moisture_max {
            return Err(Error::Config("soil_moisture_min must be <= soil_moisture_max"));
        }
        if self.soil_moisture_max > 100 {
            return Err(Error::Config("soil_moisture_max must be <= 100"));
        }
        if self.uv_min > self.uv_max {
            return Err(Error::Config("uv_min must be <= uv_max"));
        }
        if self.uv_max > 100 {
            return Err(Error::Config("uv_max must be <= 100"));
        }
        if self.irrigation_pulse_secs == 0 || self.irrigation_pulse_secs > 300 {
            return Err(Error::Config("irrigation_pulse_secs must be 1..=300"));
        }
        Ok(())
    }
}

// ── System config ─────────────────────────────────────────────

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Identifier embedded in every payload
    pub device_id: heapless::String<32>,

    // --- Acquisition ---
    /// Period between acquisition cycles (minutes)
    pub read_period_minutes: u16,
    /// Delay before the first cycle, lets Wi-Fi/MQTT come up (ms)
    pub startup_delay_ms: u32,
    pub dht_enabled: bool,
    pub uv_enabled: bool,
    pub soil_enabled: bool,

    // --- Power ---
    pub power_save_enabled: bool,
    pub power_mode: PowerMode,
    /// Adaptive mode sleeps only for waits at least this long (ms)
    pub sleep_threshold_ms: u32,

    // --- Irrigation ---
    pub solenoid_enabled: bool,
    pub plant: PlantProfile,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            device_id: heapless::String::try_from(DEFAULT_DEVICE_ID).unwrap_or_default(),

            read_period_minutes: 1,
            startup_delay_ms: 5_000,
            dht_enabled: true,
            uv_enabled: true,
            soil_enabled: true,

            power_save_enabled: false,
            power_mode: PowerMode::Adaptive,
            sleep_threshold_ms: 600_000, // 10 min

            solenoid_enabled: true,
            plant: PlantProfile::default(),
        }
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<()> {
        if self.device_id.is_empty() {
            return Err(Error::Config("device_id must not be empty"));
        }
        if !(MIN_READ_PERIOD_MINUTES..=MAX_READ_PERIOD_MINUTES).contains(&self.read_period_minutes) {
            return Err(Error::Config("read_period_minutes must be 1..=1440"));
        }
        if self.required_categories().is_empty() {
            return Err(Error::Config("at least one sensor must be enabled"));
        }
        self.plant.validate()
    }

    pub fn read_period(&self) -> Duration {
        minutes(self.read_period_minutes)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.startup_delay_ms))
    }

    pub fn power_policy(&self) -> PowerPolicy {
        PowerPolicy {
            mode: self.power_mode,
            enabled: self.power_save_enabled,
            sleep_threshold: Duration::from_millis(u64::from(self.sleep_threshold_ms)),
        }
    }

    /// Categories the barrier waits for: one per enabled activity.
    pub fn required_categories(&self) -> PublishFlags {
        [
            (SensorCategory::Dht, self.dht_enabled),
            (SensorCategory::Uv, self.uv_enabled),
            (SensorCategory::Soil, self.soil_enabled),
        ]
        .into_iter()
        .filter_map(|(c, on)| on.then_some(c))
        .collect()
    }
}
