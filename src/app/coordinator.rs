//! Coordination state shared by every acquisition activity and the
//! command service.
//!
//! One instance lives for the whole program (an `Arc` in `main`, a stack
//! value in tests) and is handed to everyone by shared reference.
//!
//! Writers per field:
//! - `barrier`: activities set, the power manager closes the cycle
//! - `power` policy, read period, solenoid enable, plant profile: command service
//! - `latest`: each activity for its own category
//! - `solenoid`: command service (manual) and the soil activity (auto pulse)

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use log::info;

use crate::barrier::PublishBarrier;
use crate::config::{self, PlantProfile, SystemConfig};
use crate::drivers::solenoid::SolenoidDriver;
use crate::pins;
use crate::power::PowerManager;
use crate::sensors::{Reading, SensorReading, SoilReading, UvReading};

/// Most recent successful reading per category.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatestReadings {
    pub climate: Option<Reading>,
    pub uv: Option<UvReading>,
    pub soil: Option<SoilReading>,
}

impl LatestReadings {
    pub fn iter(&self) -> impl Iterator<Item = SensorReading> + '_ {
        [
            self.climate.map(SensorReading::Climate),
            self.uv.map(SensorReading::Uv),
            self.soil.map(SensorReading::Soil),
        ]
        .into_iter()
        .flatten()
    }
}

pub struct Coordinator {
    pub barrier: PublishBarrier,
    pub power: PowerManager,
    pub solenoid: SolenoidDriver,
    device_id: heapless::String<32>,
    read_period_minutes: AtomicU16,
    solenoid_enabled: AtomicBool,
    plant: Mutex<CriticalSectionRawMutex, Cell<PlantProfile>>,
    latest: Mutex<CriticalSectionRawMutex, Cell<LatestReadings>>,
}

impl Coordinator {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            barrier: PublishBarrier::new(cfg.required_categories()),
            power: PowerManager::new(cfg.power_policy()),
            solenoid: SolenoidDriver::new(pins::SOLENOID_GPIO),
            device_id: cfg.device_id.clone(),
            read_period_minutes: AtomicU16::new(cfg.read_period_minutes),
            solenoid_enabled: AtomicBool::new(cfg.solenoid_enabled),
            plant: Mutex::new(Cell::new(cfg.plant)),
            latest: Mutex::new(Cell::new(LatestReadings::default())),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn read_period_minutes(&self) -> u16 {
        self.read_period_minutes.load(Ordering::Relaxed)
    }

    /// Takes effect at the next cycle boundary of each activity.
    pub fn set_read_period_minutes(&self, requested: i64) -> u16 {
        let minutes = config::clamp_read_period(requested);
        self.read_period_minutes.store(minutes, Ordering::Relaxed);
        info!("Read period set to {} min", minutes);
        minutes
    }

    pub fn read_period(&self) -> Duration {
        config::minutes(self.read_period_minutes())
    }

    pub fn solenoid_enabled(&self) -> bool {
        self.solenoid_enabled.load(Ordering::Relaxed)
    }

    pub fn set_solenoid_enabled(&self, enabled: bool) {
        self.solenoid_enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.solenoid.set(false);
        }
    }

    pub fn plant_profile(&self) -> PlantProfile {
        self.plant.lock(Cell::get)
    }

    pub fn set_plant_profile(&self, profile: PlantProfile) {
        self.plant.lock(|p| p.set(profile));
    }

    pub fn record_reading(&self, reading: &SensorReading) {
        self.latest.lock(|cell| {
            let mut latest = cell.get();
            match *reading {
                SensorReading::Climate(r) => latest.climate = Some(r),
                SensorReading::Uv(r) => latest.uv = Some(r),
                SensorReading::Soil(r) => latest.soil = Some(r),
            }
            cell.set(latest);
        });
    }

    pub fn latest_readings(&self) -> LatestReadings {
        self.latest.lock(Cell::get)
    }
}
