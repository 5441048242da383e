//! Command service: applies inbound commands to the coordination state.
//!
//! Runs on the main thread, fed from the inbound channel. Every command
//! goes through the single `match` in [`CommandService::handle`]; the only
//! effect that escapes back to the caller is a restart request, which the
//! binary carries out after the acknowledgement has had time to leave.

use log::{info, warn};

use super::commands::{self, Command, CommandError, Inbound};
use super::coordinator::Coordinator;
use super::ports::{PublishPort, TimePort};
use crate::config::{TOPIC_PLANT_CONFIG_CURRENT, TOPIC_STATUS};
use crate::error::CommsError;
use crate::payload::{self, PayloadKind, StatusPayload};

/// What the caller must do after a command was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    None,
    /// Restart the chip once the acknowledgement is out.
    Restart,
}

pub struct CommandService<'a, P, T> {
    coordinator: &'a Coordinator,
    publisher: &'a P,
    time: &'a T,
}

impl<'a, P: PublishPort, T: TimePort> CommandService<'a, P, T> {
    pub fn new(coordinator: &'a Coordinator, publisher: &'a P, time: &'a T) -> Self {
        Self {
            coordinator,
            publisher,
            time,
        }
    }

    /// Parse and handle one frame from a subscribed topic.
    pub fn handle_inbound(&self, topic: &str, payload: &[u8]) -> CommandEffect {
        let inbound = match commands::route(topic, payload) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!("Commands: ignoring message on '{}': {}", topic, e);
                return CommandEffect::None;
            }
        };

        match inbound {
            Inbound::Command(cmd) => self.handle(cmd),
            Inbound::Solenoid(s) => {
                info!("Commands: solenoid -> {}", if s.open { "on" } else { "off" });
                self.coordinator.solenoid.set(s.open);
                CommandEffect::None
            }
            Inbound::PlantProfile(update) => {
                match update.apply(self.coordinator.plant_profile()) {
                    Ok(profile) => {
                        self.coordinator.set_plant_profile(profile);
                        info!(
                            "Commands: plant profile updated, irrigate below {}%",
                            profile.irrigation_trigger_percent()
                        );
                    }
                    Err(e) => warn!("Commands: plant profile rejected: {}", e),
                }
                CommandEffect::None
            }
        }
    }

    pub fn handle(&self, cmd: Command) -> CommandEffect {
        info!("Commands: {:?}", cmd);
        let c = self.coordinator;

        match cmd {
            Command::SolenoidOn => {
                c.set_solenoid_enabled(true);
                c.solenoid.set(true);
                self.publish_status();
            }
            Command::SolenoidOff => {
                c.set_solenoid_enabled(false);
                self.publish_status();
            }
            Command::PublishAll => self.publish_all(),
            Command::SetReadPeriod { minutes } => {
                c.set_read_period_minutes(minutes);
                self.publish_status();
            }
            Command::GetStatus => self.publish_status(),
            Command::Restart => {
                warn!("Commands: restarting in 3 seconds");
                self.send(TOPIC_STATUS, payload::ack("Restarting ESP32 in 3 seconds..."));
                return CommandEffect::Restart;
            }
            Command::PowerSaveOn => {
                c.power.set_enabled(true);
                self.publish_status();
            }
            Command::PowerSaveOff => {
                c.power.set_enabled(false);
                self.publish_status();
            }
            Command::SetPowerMode(Some(mode)) => {
                c.power.set_mode(mode);
                self.publish_status();
            }
            Command::SetPowerMode(None) => {
                warn!("Commands: {}", CommandError::InvalidMode);
                self.publish_status();
            }
            Command::PowerStats => {
                c.power.log_report();
                let stats = c.power.report_stats();
                self.send(TOPIC_STATUS, payload::power_stats(c.device_id(), &stats));
            }
        }
        CommandEffect::None
    }

    pub fn publish_status(&self) {
        let c = self.coordinator;
        let policy = c.power.get_policy();
        let now_ms = self.time.uptime_ms();
        let status = StatusPayload {
            device_id: c.device_id(),
            status: "online",
            read_period_minutes: c.read_period_minutes(),
            solenoid_state: c.solenoid.is_open(),
            solenoid_enabled: c.solenoid_enabled(),
            power_save_enabled: policy.enabled,
            power_save_mode: policy.mode.as_str(),
            uptime_seconds: now_ms / 1_000,
            timestamp: now_ms,
        };
        self.send(TOPIC_STATUS, payload::status(&status));
    }

    /// Republish the cached latest readings, marked forced, then the plant
    /// profile and status.
    ///
    /// The sensors themselves stay with their activities; a category that
    /// has not produced a reading since boot is skipped.
    pub fn publish_all(&self) {
        let latest = self.coordinator.latest_readings();
        let mut sent = 0;
        for reading in latest.iter() {
            let body = payload::reading(self.coordinator.device_id(), &reading, PayloadKind::Forced);
            if self.send(reading.topic(), body) {
                sent += 1;
            }
        }
        if sent == 0 {
            info!("Commands: no readings cached yet");
        }
        let profile = self.coordinator.plant_profile();
        self.send(
            TOPIC_PLANT_CONFIG_CURRENT,
            payload::plant_profile(self.coordinator.device_id(), &profile),
        );
        self.publish_status();
    }

    fn send(&self, topic: &str, body: Result<Vec<u8>, CommsError>) -> bool {
        match body.and_then(|b| self.publisher.publish(topic, &b)) {
            Ok(id) => {
                info!("Commands: published to {} [msg_id={}]", topic, id);
                true
            }
            Err(e) => {
                warn!("Commands: publish to {} failed: {}", topic, e);
                false
            }
        }
    }
}
