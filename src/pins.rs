//! GPIO / peripheral pin assignments for the PlantSense node (ESP32 DevKit).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Sensors: single-wire
// ---------------------------------------------------------------------------

/// DHT11 data line. Open-drain, external 10 kΩ pull-up.
pub const DHT11_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Sensors: Analog (ADC1, 12 dB attenuation, 12-bit)
// ---------------------------------------------------------------------------

/// GUVA-S12SD UV sensor output.
pub const UV_ADC_GPIO: i32 = 32;
/// ADC1 channel wired to [`UV_ADC_GPIO`].
pub const UV_ADC_CHANNEL: u32 = 4;

/// Capacitive soil-moisture sensor output.
pub const SOIL_ADC_GPIO: i32 = 33;
/// ADC1 channel wired to [`SOIL_ADC_GPIO`].
pub const SOIL_ADC_CHANNEL: u32 = 5;

// ---------------------------------------------------------------------------
// Actuators
// ---------------------------------------------------------------------------

/// Irrigation solenoid valve driver (MOSFET gate). HIGH = open.
pub const SOLENOID_GPIO: i32 = 26;
