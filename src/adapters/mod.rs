//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                      |
//! |------------|--------------|----------------------------------|
//! | `hal_pin`  | SignalPin    | embedded-hal open-drain GPIO     |
//! | `mqtt`     | PublishPort  | ESP-IDF MQTT client / sim outbox |
//! | `time`     | TimePort     | ESP32 system timer               |
//! | `wifi`     |              | ESP-IDF Wi-Fi STA                |

pub mod hal_pin;
pub mod mqtt;
pub mod time;
pub mod wifi;
