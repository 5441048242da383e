//! Inbound commands.
//!
//! Three subscribed topics, three message shapes:
//!
//! | Topic            | Shape                                        |
//! |------------------|----------------------------------------------|
//! | `esp32/commands` | `{"command": "...", "minutes"?: n, "mode"?: s}` |
//! | `esp32/solenoid` | `{"state": true \| false \| "on" \| "off" \| 1 \| 0}` |
//! | `esp32/config`   | partial [`PlantProfile`]                      |
//!
//! Parsing is strict on the command name and lenient on everything else:
//! unknown keys are ignored.

use core::fmt;

use serde::Deserialize;

use crate::config::{PlantProfile, TOPIC_COMMANDS, TOPIC_PLANT_CONFIG, TOPIC_SOLENOID};
use crate::error::Error;
use crate::power::PowerMode;

/// Commands accepted on `esp32/commands`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open the valve and enable auto-irrigation.
    SolenoidOn,
    /// Close the valve and disable auto-irrigation.
    SolenoidOff,
    /// Republish the latest reading of every sensor, the plant profile,
    /// then status.
    PublishAll,
    /// Raw requested minutes; clamped when applied. Fractional values
    /// are truncated toward zero.
    SetReadPeriod { minutes: i64 },
    GetStatus,
    Restart,
    PowerSaveOn,
    PowerSaveOff,
    /// `None` when `mode` is missing or not recognised; the policy is left
    /// alone but status is still reported.
    SetPowerMode(Option<PowerMode>),
    PowerStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Not JSON, or the wrong JSON shape.
    Malformed,
    Unknown(heapless::String<24>),
    MissingField(&'static str),
    InvalidMode,
    UnknownTopic,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed payload"),
            Self::Unknown(name) => write!(f, "unknown command '{}'", name),
            Self::MissingField(field) => write!(f, "missing field '{}'", field),
            Self::InvalidMode => write!(f, "invalid mode, use auto, light_sleep or normal"),
            Self::UnknownTopic => write!(f, "not a subscribed topic"),
        }
    }
}

#[derive(Deserialize)]
struct RawCommand<'a> {
    command: &'a str,
    #[serde(default)]
    minutes: Option<f64>,
    #[serde(default, borrow)]
    mode: Option<&'a str>,
}

impl Command {
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        let raw: RawCommand<'_> =
            serde_json::from_slice(payload).map_err(|_| CommandError::Malformed)?;

        let cmd = match raw.command {
            "solenoid_on" => Self::SolenoidOn,
            "solenoid_off" => Self::SolenoidOff,
            "publish_all" => Self::PublishAll,
            "set_read_period" => Self::SetReadPeriod {
                minutes: raw.minutes.ok_or(CommandError::MissingField("minutes"))? as i64,
            },
            "get_status" => Self::GetStatus,
            "restart" => Self::Restart,
            "power_save_on" => Self::PowerSaveOn,
            "power_save_off" => Self::PowerSaveOff,
            "set_power_mode" => Self::SetPowerMode(raw.mode.and_then(PowerMode::from_wire)),
            "power_stats" => Self::PowerStats,
            other => {
                let mut name = heapless::String::new();
                for ch in other.chars() {
                    if name.push(ch).is_err() {
                        break;
                    }
                }
                return Err(CommandError::Unknown(name));
            }
        };
        Ok(cmd)
    }
}

// ── Solenoid topic ────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum StateField<'a> {
    Flag(bool),
    Number(i64),
    Word(&'a str),
}

#[derive(Deserialize)]
struct RawSolenoid<'a> {
    #[serde(borrow)]
    state: StateField<'a>,
}

/// Direct valve control from `esp32/solenoid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolenoidCommand {
    pub open: bool,
}

impl SolenoidCommand {
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        let raw: RawSolenoid<'_> =
            serde_json::from_slice(payload).map_err(|_| CommandError::Malformed)?;
        let open = match raw.state {
            StateField::Flag(b) => b,
            StateField::Number(1) | StateField::Word("on") => true,
            StateField::Number(0) | StateField::Word("off") => false,
            _ => return Err(CommandError::Malformed),
        };
        Ok(Self { open })
    }
}

// ── Plant profile topic ───────────────────────────────────────

/// Partial plant profile; absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlantProfileUpdate {
    pub temperature_min: Option<i8>,
    pub temperature_max: Option<i8>,
    pub humidity_min: Option<u8>,
    pub humidity_max: Option<u8>,
    pub soil_moisture_min: Option<u8>,
    pub soil_moisture_max: Option<u8>,
    pub uv_min: Option<u8>,
    pub uv_max: Option<u8>,
    pub irrigation_threshold: Option<u8>,
    pub auto_irrigation: Option<bool>,
    pub irrigation_pulse_secs: Option<u16>,
}

impl PlantProfileUpdate {
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        serde_json::from_slice(payload).map_err(|_| CommandError::Malformed)
    }

    /// Merge into `current`. The merged profile must still validate.
    pub fn apply(&self, current: PlantProfile) -> Result<PlantProfile, Error> {
        let merged = PlantProfile {
            temperature_min: self.temperature_min.unwrap_or(current.temperature_min),
            temperature_max: self.temperature_max.unwrap_or(current.temperature_max),
            humidity_min: self.humidity_min.unwrap_or(current.humidity_min),
            humidity_max: self.humidity_max.unwrap_or(current.humidity_max),
            soil_moisture_min: self.soil_moisture_min.unwrap_or(current.soil_moisture_min),
            soil_moisture_max: self.soil_moisture_max.unwrap_or(current.soil_moisture_max),
            uv_min: self.uv_min.unwrap_or(current.uv_min),
            uv_max: self.uv_max.unwrap_or(current.uv_max),
            irrigation_threshold: self
                .irrigation_threshold
                .unwrap_or(current.irrigation_threshold),
            auto_irrigation: self.auto_irrigation.unwrap_or(current.auto_irrigation),
            irrigation_pulse_secs: self
                .irrigation_pulse_secs
                .unwrap_or(current.irrigation_pulse_secs),
        };
        merged.validate()?;
        Ok(merged)
    }
}

// ── Routing ───────────────────────────────────────────────────

/// A parsed inbound message, by topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    Solenoid(SolenoidCommand),
    PlantProfile(PlantProfileUpdate),
}

pub fn route(topic: &str, payload: &[u8]) -> Result<Inbound, CommandError> {
    match topic {
        TOPIC_COMMANDS => Command::parse(payload).map(Inbound::Command),
        TOPIC_SOLENOID => SolenoidCommand::parse(payload).map(Inbound::Solenoid),
        TOPIC_PLANT_CONFIG => PlantProfileUpdate::parse(payload).map(Inbound::PlantProfile),
        _ => Err(CommandError::UnknownTopic),
    }
}
