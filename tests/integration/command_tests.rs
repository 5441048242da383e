//! Inbound MQTT frames through routing and the command service.

use embassy_time::Duration;
use plantsense::activity::{AcquisitionActivity, CycleContext};
use plantsense::adapters::time::ManualClock;
use plantsense::app::channels;
use plantsense::app::coordinator::Coordinator;
use plantsense::app::service::{CommandEffect, CommandService};
use plantsense::config::SystemConfig;
use plantsense::drivers::hw_init;
use plantsense::power::{PowerMode, WaitStrategy};
use plantsense::sensors::soil::SoilSensor;
use plantsense::sensors::uv::UvSensor;

use crate::mock_hw::MockBroker;

const COMMANDS: &str = "esp32/commands";

fn setup() -> (Coordinator, MockBroker, ManualClock) {
    (
        Coordinator::new(&SystemConfig::default()),
        MockBroker::connected(),
        ManualClock::new(),
    )
}

#[test]
fn get_status_reports_current_state() {
    let (coord, broker, clock) = setup();
    clock.advance(Duration::from_secs(90));
    let svc = CommandService::new(&coord, &broker, &clock);

    svc.handle_inbound(COMMANDS, br#"{"command":"get_status"}"#);

    let status = broker.on_topic("esp32/status");
    assert_eq!(status.len(), 1);
    let s = &status[0];
    assert_eq!(s["device_id"], "ESP32_Client");
    assert_eq!(s["status"], "online");
    assert_eq!(s["read_period_minutes"], 1);
    assert_eq!(s["solenoid_state"], false);
    assert_eq!(s["solenoid_enabled"], true);
    assert_eq!(s["power_save_enabled"], false);
    assert_eq!(s["power_save_mode"], "auto");
    assert_eq!(s["uptime_seconds"], 90);
}

#[test]
fn read_period_is_clamped_both_ways() {
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);

    svc.handle_inbound(COMMANDS, br#"{"command":"set_read_period","minutes":0}"#);
    assert_eq!(coord.read_period_minutes(), 1);
    svc.handle_inbound(COMMANDS, br#"{"command":"set_read_period","minutes":-30}"#);
    assert_eq!(coord.read_period_minutes(), 1);
    svc.handle_inbound(COMMANDS, br#"{"command":"set_read_period","minutes":99999}"#);
    assert_eq!(coord.read_period_minutes(), 1_440);
    svc.handle_inbound(COMMANDS, br#"{"command":"set_read_period","minutes":30}"#);
    assert_eq!(coord.read_period(), Duration::from_secs(1_800));
    svc.handle_inbound(COMMANDS, br#"{"command":"set_read_period","minutes":10.5}"#);
    assert_eq!(coord.read_period_minutes(), 10);

    let periods: Vec<_> = broker
        .on_topic("esp32/status")
        .iter()
        .map(|s| s["read_period_minutes"].as_u64().unwrap())
        .collect();
    assert_eq!(periods, vec![1, 1, 1_440, 30, 10]);
}

#[test]
fn set_read_period_without_minutes_changes_nothing() {
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);

    svc.handle_inbound(COMMANDS, br#"{"command":"set_read_period"}"#);

    assert_eq!(coord.read_period_minutes(), 1);
    assert!(broker.published().is_empty());
}

#[test]
fn unknown_command_and_topic_are_ignored() {
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);

    assert_eq!(
        svc.handle_inbound(COMMANDS, br#"{"command":"self_destruct"}"#),
        CommandEffect::None
    );
    svc.handle_inbound(COMMANDS, b"not json");
    svc.handle_inbound("esp32/unknown", br#"{"command":"get_status"}"#);

    assert!(broker.published().is_empty());
}

#[test]
fn power_mode_commands_steer_the_next_wait() {
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);
    let d = Duration::from_secs(60);
    assert_eq!(coord.power.decide(d), WaitStrategy::Timed);

    svc.handle_inbound(COMMANDS, br#"{"command":"power_save_on"}"#);
    svc.handle_inbound(COMMANDS, br#"{"command":"set_power_mode","mode":"light_sleep"}"#);
    assert_eq!(coord.power.get_policy().mode, PowerMode::ForcedLowPower);
    assert_eq!(coord.power.decide(d), WaitStrategy::LowPower);

    // Invalid or missing mode: policy untouched, status still reported.
    let before = broker.on_topic("esp32/status").len();
    svc.handle_inbound(COMMANDS, br#"{"command":"set_power_mode","mode":"turbo"}"#);
    svc.handle_inbound(COMMANDS, br#"{"command":"set_power_mode"}"#);
    assert_eq!(coord.power.get_policy().mode, PowerMode::ForcedLowPower);
    let status = broker.on_topic("esp32/status");
    assert_eq!(status.len(), before + 2);
    assert_eq!(status[before + 1]["power_save_mode"], "light_sleep");

    svc.handle_inbound(COMMANDS, br#"{"command":"power_save_off"}"#);
    assert_eq!(coord.power.decide(d), WaitStrategy::Timed);
    assert_eq!(broker.last().unwrap().body["power_save_enabled"], false);
}

#[test]
fn power_stats_reflect_completed_sleeps() {
    let (coord, broker, clock) = setup();
    coord.power.set_enabled(true);
    coord.power.set_mode(PowerMode::ForcedLowPower);
    for c in plantsense::barrier::SensorCategory::ALL {
        coord.barrier.report_published(c);
    }
    coord
        .power
        .wait(Duration::from_secs(60), Some(0), &coord.barrier, &clock);
    let svc = CommandService::new(&coord, &broker, &clock);

    svc.handle_inbound(COMMANDS, br#"{"command":"power_stats"}"#);

    let stats = broker.last().unwrap();
    assert_eq!(stats.topic, "esp32/status");
    assert_eq!(stats.body["sleep_count"], 1);
    assert_eq!(stats.body["total_sleep_ms"], 59_000);
    assert_eq!(stats.body["average_sleep_ms"], 59_000);
}

#[test]
fn restart_is_acknowledged_before_effect() {
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);

    let effect = svc.handle_inbound(COMMANDS, br#"{"command":"restart"}"#);

    assert_eq!(effect, CommandEffect::Restart);
    assert_eq!(broker.on_topic("esp32/status").len(), 1);
}

#[test]
fn publish_all_resends_cached_readings_as_forced() {
    hw_init::sim_set_adc(4, 1_000);
    let (coord, broker, clock) = setup();
    let cx = CycleContext {
        coordinator: &coord,
        publisher: &broker,
        time: &clock,
    };
    let mut uv = AcquisitionActivity::new(UvSensor::new(4));
    uv.run_once(&cx).unwrap();
    let svc = CommandService::new(&coord, &broker, &clock);

    svc.handle_inbound(COMMANDS, br#"{"command":"publish_all"}"#);

    let uv_msgs = broker.on_topic("esp32/uv");
    assert_eq!(uv_msgs.len(), 2);
    let forced = &uv_msgs[1];
    assert_eq!(forced["forced"], true);
    assert_eq!(forced["uv_raw"], 1_000);
    assert!(forced.get("counter").is_none());
    // Nothing cached for the other categories.
    assert!(broker.on_topic("esp32/dht11").is_empty());
    assert_eq!(broker.on_topic("esp32/config/current").len(), 1);
    assert_eq!(broker.last().unwrap().topic, "esp32/status");
}

#[test]
fn solenoid_topic_drives_valve_without_touching_enable() {
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);

    svc.handle_inbound("esp32/solenoid", br#"{"state":"on"}"#);
    assert!(coord.solenoid.is_open());
    svc.handle_inbound("esp32/solenoid", br#"{"state":0}"#);
    assert!(!coord.solenoid.is_open());
    svc.handle_inbound("esp32/solenoid", br#"{"state":"maybe"}"#);
    assert!(!coord.solenoid.is_open());

    assert!(coord.solenoid_enabled());
    assert!(broker.published().is_empty());
}

#[test]
fn solenoid_off_command_stops_auto_irrigation() {
    hw_init::sim_set_adc(5, 4_000);
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);
    svc.handle_inbound(COMMANDS, br#"{"command":"solenoid_off"}"#);
    assert_eq!(broker.last().unwrap().body["solenoid_enabled"], false);

    let cx = CycleContext {
        coordinator: &coord,
        publisher: &broker,
        time: &clock,
    };
    AcquisitionActivity::new(SoilSensor::new(5))
        .run_once(&cx)
        .unwrap();

    assert!(broker.on_topic("esp32/alerts").is_empty());
}

#[test]
fn plant_profile_update_moves_irrigation_trigger() {
    // 3072 * 100 / 4095 = 75 → 25 % moisture.
    hw_init::sim_set_adc(6, 3_072);
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);
    let cx = CycleContext {
        coordinator: &coord,
        publisher: &broker,
        time: &clock,
    };
    let mut soil = AcquisitionActivity::new(SoilSensor::new(6));

    soil.run_once(&cx).unwrap();
    assert_eq!(broker.on_topic("esp32/alerts").len(), 1);

    svc.handle_inbound(
        "esp32/config",
        br#"{"soil_moisture_min":30,"irrigation_threshold":10}"#,
    );
    assert_eq!(coord.plant_profile().irrigation_trigger_percent(), 20);
    soil.run_once(&cx).unwrap();
    assert_eq!(broker.on_topic("esp32/alerts").len(), 1);

    // min > max is rejected as a whole.
    svc.handle_inbound("esp32/config", br#"{"soil_moisture_min":90}"#);
    assert_eq!(coord.plant_profile().soil_moisture_min, 30);
}

#[test]
fn full_profile_round_trips_through_publish_all() {
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);

    svc.handle_inbound(
        "esp32/config",
        br#"{"temperature_min":18,"temperature_max":28,"humidity_min":60,"humidity_max":80,"soil_moisture_min":60,"soil_moisture_max":80,"uv_min":30,"uv_max":70,"irrigation_threshold":25,"auto_irrigation":true}"#,
    );
    svc.handle_inbound(COMMANDS, br#"{"command":"publish_all"}"#);

    let current = broker.on_topic("esp32/config/current");
    assert_eq!(current.len(), 1);
    let p = &current[0];
    assert_eq!(p["device_id"], "ESP32_Client");
    assert_eq!((p["temperature_min"].as_i64(), p["temperature_max"].as_i64()), (Some(18), Some(28)));
    assert_eq!((p["humidity_min"].as_u64(), p["humidity_max"].as_u64()), (Some(60), Some(80)));
    assert_eq!((p["uv_min"].as_u64(), p["uv_max"].as_u64()), (Some(30), Some(70)));
    assert_eq!(p["irrigation_threshold"], 25);
    assert_eq!(p["auto_irrigation"], true);
    assert_eq!(coord.plant_profile().irrigation_trigger_percent(), 35);
}

#[test]
fn inverted_climate_band_is_rejected() {
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);

    svc.handle_inbound("esp32/config", br#"{"temperature_min":31}"#);
    svc.handle_inbound("esp32/config", br#"{"humidity_min":70,"humidity_max":50}"#);

    let p = coord.plant_profile();
    assert_eq!((p.temperature_min, p.temperature_max), (15, 30));
    assert_eq!((p.humidity_min, p.humidity_max), (40, 80));
}

#[test]
fn uv_outside_updated_profile_raises_alert() {
    // 1000 * 100 / 4095 = 24 % exposure.
    hw_init::sim_set_adc(7, 1_000);
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);
    let cx = CycleContext {
        coordinator: &coord,
        publisher: &broker,
        time: &clock,
    };
    let mut uv = AcquisitionActivity::new(UvSensor::new(7));

    uv.run_once(&cx).unwrap();
    assert!(broker.on_topic("esp32/alerts").is_empty());

    svc.handle_inbound("esp32/config", br#"{"uv_min":30,"uv_max":70}"#);
    uv.run_once(&cx).unwrap();

    let alerts = broker.on_topic("esp32/alerts");
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["parameter"], "uv");
    assert_eq!(alerts[0]["direction"], "low");
    assert_eq!(alerts[0]["value"], 24);
    assert_eq!(alerts[0]["min"], 30);
}

#[test]
fn queued_frames_drain_in_order() {
    let (coord, broker, clock) = setup();
    let svc = CommandService::new(&coord, &broker, &clock);

    channels::push_inbound(COMMANDS, br#"{"command":"set_read_period","minutes":5}"#);
    channels::push_inbound(COMMANDS, br#"{"command":"get_status"}"#);

    let mut handled = 0;
    while let Some(frame) = channels::try_recv_inbound() {
        svc.handle_inbound(frame.topic.as_str(), &frame.payload);
        handled += 1;
    }

    assert_eq!(handled, 2);
    let status = broker.on_topic("esp32/status");
    assert_eq!(status.len(), 2);
    assert_eq!(status[1]["read_period_minutes"], 5);
}
