//! MQTT JSON payloads.
//!
//! Flat key/value records, one struct per message shape, serialised with
//! `serde_json`. Field names are what the dashboard backend consumes.

use serde::Serialize;

use crate::config::{PlantProfile, RangeViolation};
use crate::error::CommsError;
use crate::power::PowerStats;
use crate::sensors::SensorReading;

/// Whether a reading goes out on the regular cycle or on `publish_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Periodic { counter: u32 },
    Forced,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Serialize)]
struct ClimatePayload<'a> {
    device_id: &'a str,
    temperature: u8,
    humidity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    counter: Option<u32>,
    #[serde(skip_serializing_if = "is_false")]
    forced: bool,
    timestamp: u64,
}

#[derive(Serialize)]
struct UvPayload<'a> {
    device_id: &'a str,
    uv_raw: u16,
    uv_voltage: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    hour: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    counter: Option<u32>,
    #[serde(skip_serializing_if = "is_false")]
    forced: bool,
    timestamp: u64,
}

#[derive(Serialize)]
struct SoilPayload<'a> {
    device_id: &'a str,
    moisture_raw: u16,
    moisture_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    counter: Option<u32>,
    #[serde(skip_serializing_if = "is_false")]
    forced: bool,
    timestamp: u64,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CommsError> {
    serde_json::to_vec(value).map_err(|_| CommsError::PayloadEncode)
}

/// Two decimals is all the 12-bit ADC resolves.
fn round_centi(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

/// Payload for `reading` on its own topic.
pub fn reading(device_id: &str, reading: &SensorReading, kind: PayloadKind) -> Result<Vec<u8>, CommsError> {
    let (counter, forced) = match kind {
        PayloadKind::Periodic { counter } => (Some(counter), false),
        PayloadKind::Forced => (None, true),
    };
    let timestamp = reading.captured_at_ms();

    match reading {
        SensorReading::Climate(r) => encode(&ClimatePayload {
            device_id,
            temperature: r.temperature,
            humidity: r.humidity,
            counter,
            forced,
            timestamp,
        }),
        SensorReading::Uv(r) => encode(&UvPayload {
            device_id,
            uv_raw: r.raw,
            uv_voltage: round_centi(r.voltage),
            hour: r.hour,
            counter,
            forced,
            timestamp,
        }),
        SensorReading::Soil(r) => encode(&SoilPayload {
            device_id,
            moisture_raw: r.raw,
            moisture_percent: r.percent,
            counter,
            forced,
            timestamp,
        }),
    }
}

// ── Status / alerts ───────────────────────────────────────────

/// Published on `esp32/status` after every state-changing command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload<'a> {
    pub device_id: &'a str,
    pub status: &'static str,
    pub read_period_minutes: u16,
    pub solenoid_state: bool,
    pub solenoid_enabled: bool,
    pub power_save_enabled: bool,
    pub power_save_mode: &'static str,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

pub fn status(s: &StatusPayload<'_>) -> Result<Vec<u8>, CommsError> {
    encode(s)
}

#[derive(Serialize)]
struct AlertPayload<'a> {
    device_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    moisture: u8,
    threshold: u8,
    timestamp: u64,
}

pub fn irrigation_alert(
    device_id: &str,
    moisture: u8,
    threshold: u8,
    timestamp: u64,
) -> Result<Vec<u8>, CommsError> {
    encode(&AlertPayload {
        device_id,
        kind: "auto_irrigation",
        moisture,
        threshold,
        timestamp,
    })
}

#[derive(Serialize)]
struct RangeAlertPayload<'a> {
    device_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    parameter: &'static str,
    direction: &'static str,
    value: i16,
    min: i16,
    max: i16,
    timestamp: u64,
}

/// A reading fell outside the plant profile's band for `parameter`.
pub fn range_alert(
    device_id: &str,
    v: &RangeViolation,
    timestamp: u64,
) -> Result<Vec<u8>, CommsError> {
    encode(&RangeAlertPayload {
        device_id,
        kind: "out_of_range",
        parameter: v.parameter.as_str(),
        direction: if v.is_low() { "low" } else { "high" },
        value: v.value,
        min: v.min,
        max: v.max,
        timestamp,
    })
}

#[derive(Serialize)]
struct ProfilePayload<'a> {
    device_id: &'a str,
    temperature_min: i8,
    temperature_max: i8,
    humidity_min: u8,
    humidity_max: u8,
    soil_moisture_min: u8,
    soil_moisture_max: u8,
    uv_min: u8,
    uv_max: u8,
    irrigation_threshold: u8,
    auto_irrigation: bool,
    irrigation_pulse_secs: u16,
}

/// The active profile, in the same keys `esp32/config` accepts.
pub fn plant_profile(device_id: &str, p: &PlantProfile) -> Result<Vec<u8>, CommsError> {
    encode(&ProfilePayload {
        device_id,
        temperature_min: p.temperature_min,
        temperature_max: p.temperature_max,
        humidity_min: p.humidity_min,
        humidity_max: p.humidity_max,
        soil_moisture_min: p.soil_moisture_min,
        soil_moisture_max: p.soil_moisture_max,
        uv_min: p.uv_min,
        uv_max: p.uv_max,
        irrigation_threshold: p.irrigation_threshold,
        auto_irrigation: p.auto_irrigation,
        irrigation_pulse_secs: p.irrigation_pulse_secs,
    })
}

#[derive(Serialize)]
struct StatsPayload<'a> {
    device_id: &'a str,
    sleep_count: u32,
    total_sleep_ms: u64,
    timer_wakes: u32,
    event_wakes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    average_sleep_ms: Option<u64>,
}

pub fn power_stats(device_id: &str, stats: &PowerStats) -> Result<Vec<u8>, CommsError> {
    encode(&StatsPayload {
        device_id,
        sleep_count: stats.sleep_count,
        total_sleep_ms: stats.total_sleep_ms,
        timer_wakes: stats.timer_wake_count,
        event_wakes: stats.event_wake_count(),
        average_sleep_ms: stats.average_sleep_ms(),
    })
}

#[derive(Serialize)]
struct AckPayload<'a> {
    message: &'a str,
}

pub fn ack(message: &str) -> Result<Vec<u8>, CommsError> {
    encode(&AckPayload { message })
}
