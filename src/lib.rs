//! PlantSense node firmware library.
//!
//! Sensor acquisition and duty-cycle coordination for an ESP32 plant
//! monitor: a DHT11 decoder, analog UV and soil sensors, a publish barrier
//! shared by the acquisition activities, and the power manager that
//! decides how each activity waits between cycles. All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod activity;
pub mod adapters;
pub mod app;
pub mod barrier;
pub mod config;
pub mod drivers;
pub mod error;
pub mod payload;
pub mod pins;
pub mod power;
pub mod sensors;

mod esp_link_shims;

// Host critical-section implementation for unit tests.
#[cfg(all(test, not(target_os = "espidf")))]
use critical_section as _;
