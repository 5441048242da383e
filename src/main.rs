//! PlantSense Firmware: Main Entry Point
//!
//! One thread per sensor, one coordination object shared by all of them.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  APP core (pri 10)         PRO core (pri 5)                  │
//! │  ┌──────────────┐   ┌────────────┐  ┌──────────────┐         │
//! │  │ DHT11 decode │   │ UV sample  │  │ soil sample  │         │
//! │  └──────┬───────┘   └─────┬──────┘  └──────┬───────┘         │
//! │         │ publish + report│                │                 │
//! │         ▼                 ▼                ▼                 │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Coordinator: PublishBarrier · PowerManager · solenoid  │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │         ▲                                                    │
//! │         │ CommandService (main thread, inbound channel)      │
//! │  MQTT callback ──▶ INBOUND ──▶ main loop                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use log::{error, info, warn};

use plantsense::activity::{AcquisitionActivity, CycleContext};
use plantsense::adapters::hal_pin::OpenDrainPin;
use plantsense::adapters::mqtt::MqttPublisher;
use plantsense::adapters::time::Esp32TimeAdapter;
use plantsense::adapters::wifi::{self, WifiCredentials};
use plantsense::app::channels;
use plantsense::app::coordinator::Coordinator;
use plantsense::app::ports::PublishPort;
use plantsense::app::service::{CommandEffect, CommandService};
use plantsense::config::SystemConfig;
use plantsense::drivers::hw_init;
use plantsense::drivers::task_pin::{Core, TaskSpec, spawn_on_core};
use plantsense::pins;
use plantsense::sensors::dht11::Dht11;
use plantsense::sensors::soil::SoilSensor;
use plantsense::sensors::uv::UvSensor;

const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
    Some(s) => s,
    None => "",
};
const WIFI_PASS: &str = match option_env!("WIFI_PASS") {
    Some(s) => s,
    None => "",
};
const MQTT_URL: &str = match option_env!("MQTT_URL") {
    Some(s) => s,
    None => "mqtt://broker.local:1883",
};

const DHT_TASK: TaskSpec = TaskSpec {
    core: Core::App,
    priority: 10,
    stack_kb: 8,
    name: "dht11\0",
};
const UV_TASK: TaskSpec = TaskSpec {
    core: Core::Pro,
    priority: 5,
    stack_kb: 6,
    name: "uv\0",
};
const SOIL_TASK: TaskSpec = TaskSpec {
    core: Core::Pro,
    priority: 5,
    stack_kb: 6,
    name: "soil\0",
};

const MAIN_LOOP_TICK: StdDuration = StdDuration::from_millis(100);
const RESTART_DELAY: StdDuration = StdDuration::from_secs(3);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PlantSense v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config ─────────────────────────────────────────────
    let mut config = SystemConfig::default();
    if let Some(id) = option_env!("DEVICE_ID") {
        config.device_id = id
            .try_into()
            .map_err(|_| anyhow::anyhow!("DEVICE_ID longer than 32 bytes"))?;
    }
    config.validate().map_err(|e| anyhow::anyhow!("{e}"))?;

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().map_err(|e| anyhow::anyhow!("{e}"))?;
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 4. Network ────────────────────────────────────────────
    let creds = WifiCredentials::new(WIFI_SSID, WIFI_PASS).context("WIFI_SSID / WIFI_PASS")?;
    let _wifi = wifi::connect_station(peripherals.modem, sysloop, nvs, &creds)?;
    let _sntp = EspSntp::new_default()?;

    let mqtt = Arc::new(MqttPublisher::connect(MQTT_URL, config.device_id.as_str())?);
    let time = Arc::new(Esp32TimeAdapter::new());

    // ── 5. Coordination state ─────────────────────────────────
    let coordinator = Arc::new(Coordinator::new(&config));
    coordinator.power.init_platform();
    info!(
        "Read period {} min, sensors [{}]",
        config.read_period_minutes,
        config.required_categories()
    );

    // ── 6. Activities ─────────────────────────────────────────
    let startup_delay = config.startup_delay();

    if config.dht_enabled {
        let pin = PinDriver::input_output_od(peripherals.pins.gpio4)?;
        let line = OpenDrainPin::new(pin, Ets).map_err(|e| anyhow::anyhow!("DHT11 pin: {e:?}"))?;
        let activity = AcquisitionActivity::new(Dht11::new(line));
        let (coord, mqtt, time) = (coordinator.clone(), mqtt.clone(), time.clone());
        spawn_on_core(DHT_TASK, move || {
            let cx = CycleContext {
                coordinator: &*coord,
                publisher: &*mqtt,
                time: &*time,
            };
            activity.run(cx, startup_delay)
        })?;
        info!("DHT11 on GPIO{}", pins::DHT11_GPIO);
    }

    if config.uv_enabled {
        let activity = AcquisitionActivity::new(UvSensor::new(pins::UV_ADC_CHANNEL));
        let (coord, mqtt, time) = (coordinator.clone(), mqtt.clone(), time.clone());
        spawn_on_core(UV_TASK, move || {
            let cx = CycleContext {
                coordinator: &*coord,
                publisher: &*mqtt,
                time: &*time,
            };
            activity.run(cx, startup_delay)
        })?;
    }

    if config.soil_enabled {
        let activity = AcquisitionActivity::new(SoilSensor::new(pins::SOIL_ADC_CHANNEL));
        let (coord, mqtt, time) = (coordinator.clone(), mqtt.clone(), time.clone());
        spawn_on_core(SOIL_TASK, move || {
            let cx = CycleContext {
                coordinator: &*coord,
                publisher: &*mqtt,
                time: &*time,
            };
            activity.run(cx, startup_delay)
        })?;
    }

    // ── 7. Command loop ───────────────────────────────────────
    let service = CommandService::new(&coordinator, &*mqtt, &*time);
    let mut was_connected = false;

    info!("PlantSense running");
    loop {
        let connected = mqtt.is_connected();
        if connected && !was_connected {
            if let Err(e) = mqtt.subscribe_all() {
                warn!("MQTT: subscribe failed: {}", e);
            }
        }
        was_connected = connected;

        while let Some(frame) = channels::try_recv_inbound() {
            if service.handle_inbound(&frame.topic, &frame.payload) == CommandEffect::Restart {
                std::thread::sleep(RESTART_DELAY);
                error!("Restarting");
                esp_idf_svc::hal::reset::restart();
            }
        }

        std::thread::sleep(MAIN_LOOP_TICK);
    }
}
