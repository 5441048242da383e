//! Acquisition activities against the recording broker.
//!
//! Analog tests inject through the simulated ADC; each test owns a channel.

use embassy_time::Duration;
use plantsense::activity::{AcquisitionActivity, CycleContext};
use plantsense::adapters::time::ManualClock;
use plantsense::app::coordinator::Coordinator;
use plantsense::barrier::SensorCategory;
use plantsense::config::SystemConfig;
use plantsense::drivers::hw_init;
use plantsense::error::{CommsError, Error};
use plantsense::power::WaitStrategy;
use plantsense::sensors::dht11::Dht11;
use plantsense::sensors::soil::SoilSensor;
use plantsense::sensors::uv::UvSensor;
use plantsense::sensors::waveform::{SimLine, Waveform};

use crate::mock_hw::{MockBroker, ScriptedSource};

fn cx<'a>(
    coordinator: &'a Coordinator,
    broker: &'a MockBroker,
    clock: &'a ManualClock,
) -> CycleContext<'a, MockBroker, ManualClock> {
    CycleContext {
        coordinator,
        publisher: broker,
        time: clock,
    }
}

#[test]
fn dht_cycle_publishes_reading_with_counter() {
    let coord = Coordinator::new(&SystemConfig::default());
    let broker = MockBroker::connected();
    let clock = ManualClock::new();
    let cx = cx(&coord, &broker, &clock);
    let mut act = AcquisitionActivity::new(Dht11::new(SimLine::new(Waveform::dht11([45, 0, 25, 0, 70]))));

    act.run_cycle(&cx);
    act.run_cycle(&cx);

    let msgs = broker.on_topic("esp32/dht11");
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0]["humidity"], 45);
    assert_eq!(msgs[0]["temperature"], 25);
    assert_eq!(msgs[0]["device_id"], "ESP32_Client");
    assert_eq!(msgs[0]["counter"], 0);
    assert_eq!(msgs[1]["counter"], 1);
    // Second reading stamped after the first cycle's wait.
    assert_eq!(msgs[1]["timestamp"], 60_000);
    assert!(coord.barrier.flags().contains(SensorCategory::Dht));
    assert!(broker.on_topic("esp32/alerts").is_empty());
}

#[test]
fn climate_outside_profile_raises_one_alert_per_band() {
    let coord = Coordinator::new(&SystemConfig::default());
    let broker = MockBroker::connected();
    let clock = ManualClock::new();
    let cx = cx(&coord, &broker, &clock);
    // 30 % humidity, 35 °C: below 40..=80 and above 15..=30.
    let mut act = AcquisitionActivity::new(Dht11::new(SimLine::new(Waveform::dht11([30, 0, 35, 0, 65]))));

    act.run_once(&cx).unwrap();

    assert_eq!(broker.on_topic("esp32/dht11").len(), 1);
    let alerts = broker.on_topic("esp32/alerts");
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["type"], "out_of_range");
    assert_eq!(alerts[0]["parameter"], "temperature");
    assert_eq!(alerts[0]["direction"], "high");
    assert_eq!(alerts[0]["value"], 35);
    assert_eq!(alerts[0]["max"], 30);
    assert_eq!(alerts[1]["parameter"], "humidity");
    assert_eq!(alerts[1]["direction"], "low");
    assert_eq!(alerts[1]["min"], 40);
    assert!(coord.barrier.flags().contains(SensorCategory::Dht));
}

#[test]
fn failed_decode_is_not_reported() {
    let coord = Coordinator::new(&SystemConfig::default());
    let broker = MockBroker::connected();
    let clock = ManualClock::new();
    let cx = cx(&coord, &broker, &clock);
    let mut act = AcquisitionActivity::new(Dht11::new(SimLine::new(Waveform::dht11([45, 0, 25, 0, 71]))));

    let err = act.run_once(&cx).unwrap_err();

    assert!(matches!(err, Error::Decode(_)));
    assert_eq!(act.counter(), 1);
    assert!(broker.published().is_empty());
    assert!(coord.barrier.flags().is_empty());
    assert!(coord.latest_readings().climate.is_none());
}

#[test]
fn disconnected_broker_skips_acquisition() {
    let coord = Coordinator::new(&SystemConfig::default());
    let broker = MockBroker::disconnected();
    let clock = ManualClock::new();
    let cx = cx(&coord, &broker, &clock);
    let mut act = AcquisitionActivity::new(ScriptedSource::new([Some(100)]));

    let err = act.run_once(&cx).unwrap_err();

    assert_eq!(err, Error::Comms(CommsError::TransportUnavailable));
    assert_eq!(act.source().calls, 0);
    assert_eq!(act.counter(), 0);
}

#[test]
fn rejected_publish_leaves_barrier_untouched() {
    let coord = Coordinator::new(&SystemConfig::default());
    let broker = MockBroker::connected();
    broker.set_rejecting(true);
    let clock = ManualClock::new();
    let cx = cx(&coord, &broker, &clock);
    let mut act = AcquisitionActivity::new(ScriptedSource::new([Some(2_000)]));

    let err = act.run_once(&cx).unwrap_err();

    assert_eq!(err, Error::Comms(CommsError::PublishFailed));
    assert!(coord.barrier.flags().is_empty());
}

#[test]
fn failed_read_then_recovery_next_cycle() {
    let coord = Coordinator::new(&SystemConfig::default());
    let broker = MockBroker::connected();
    let clock = ManualClock::new();
    let cx = cx(&coord, &broker, &clock);
    let mut act = AcquisitionActivity::new(ScriptedSource::new([None, Some(4_095)]));

    act.run_cycle(&cx);
    assert!(broker.published().is_empty());
    act.run_cycle(&cx);

    let soil = broker.on_topic("esp32/soil_moisture");
    assert_eq!(soil.len(), 1);
    // The failed attempt still consumed sequence number 0.
    assert_eq!(soil[0]["counter"], 1);
    assert_eq!(soil[0]["moisture_percent"], 0);
}

#[test]
fn dry_soil_triggers_alert_and_valve_pulse() {
    hw_init::sim_set_adc(2, 4_000);
    let coord = Coordinator::new(&SystemConfig::default());
    let broker = MockBroker::connected();
    let clock = ManualClock::new();
    let cx = cx(&coord, &broker, &clock);
    let mut act = AcquisitionActivity::new(SoilSensor::new(2));

    let report = act.run_cycle(&cx);

    let alerts = broker.on_topic("esp32/alerts");
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["type"], "auto_irrigation");
    assert_eq!(alerts[0]["moisture"], 3);
    assert_eq!(alerts[0]["threshold"], 40);
    assert!(!coord.solenoid.is_open());
    assert_eq!(report.strategy, WaitStrategy::Timed);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(10), Duration::from_secs(60)]
    );
}

#[test]
fn dry_soil_with_solenoid_disabled_only_publishes() {
    hw_init::sim_set_adc(1, 4_000);
    let cfg = SystemConfig {
        solenoid_enabled: false,
        ..SystemConfig::default()
    };
    let coord = Coordinator::new(&cfg);
    let broker = MockBroker::connected();
    let clock = ManualClock::new();
    let cx = cx(&coord, &broker, &clock);
    let mut act = AcquisitionActivity::new(SoilSensor::new(1));

    act.run_once(&cx).unwrap();

    assert!(broker.on_topic("esp32/alerts").is_empty());
    assert_eq!(broker.on_topic("esp32/soil_moisture").len(), 1);
    assert!(clock.sleeps().is_empty());
}

#[test]
fn uv_payload_carries_hour_when_clock_synced() {
    hw_init::sim_set_adc(0, 2_048);
    let coord = Coordinator::new(&SystemConfig::default());
    let broker = MockBroker::connected();
    let clock = ManualClock::with_hour(14);
    let cx = cx(&coord, &broker, &clock);
    let mut act = AcquisitionActivity::new(UvSensor::new(0));

    act.run_once(&cx).unwrap();

    let uv = broker.on_topic("esp32/uv");
    assert_eq!(uv[0]["uv_raw"], 2_048);
    assert_eq!(uv[0]["hour"], 14);
    assert!((uv[0]["uv_voltage"].as_f64().unwrap() - 1.65).abs() < 0.006);
}

#[test]
fn read_period_change_applies_at_next_wait() {
    let coord = Coordinator::new(&SystemConfig::default());
    let broker = MockBroker::connected();
    let clock = ManualClock::new();
    let cx = cx(&coord, &broker, &clock);
    let mut act = AcquisitionActivity::new(ScriptedSource::new([Some(1), Some(1)]));

    act.run_cycle(&cx);
    coord.set_read_period_minutes(15);
    act.run_cycle(&cx);

    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(60), Duration::from_secs(900)]
    );
}
