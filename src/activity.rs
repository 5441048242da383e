//! Acquisition activities.
//!
//! One activity per sensor, each on its own thread:
//!
//! ```text
//!  connected? ─▶ acquire ─▶ publish ─▶ report to barrier ─▶ hook ─▶ wait
//! ```
//!
//! A failed acquire or publish is logged and the cycle ends without
//! touching the barrier. Nothing here retries inside a cycle; the next
//! cycle simply tries again.

use embassy_time::Duration;
use log::{debug, info, warn};

use crate::app::coordinator::Coordinator;
use crate::app::ports::{PublishPort, TimePort};
use crate::barrier::SensorCategory;
use crate::config::TOPIC_ALERTS;
use crate::error::{CommsError, Error};
use crate::payload::{self, PayloadKind};
use crate::power::WaitReport;
use crate::sensors::SensorReading;

/// A sensor an activity can sample.
pub trait SensorSource {
    const CATEGORY: SensorCategory;

    /// Take one reading. May busy-wait; must not suspend.
    fn acquire(&mut self, time: &impl TimePort) -> Result<SensorReading, Error>;

    /// Runs after the reading has been published and reported.
    fn after_publish<P: PublishPort, T: TimePort>(
        &mut self,
        _reading: &SensorReading,
        _cx: &CycleContext<'_, P, T>,
    ) {
    }
}

/// Everything an activity borrows for one cycle.
pub struct CycleContext<'a, P, T> {
    pub coordinator: &'a Coordinator,
    pub publisher: &'a P,
    pub time: &'a T,
}

impl<P, T> Clone for CycleContext<'_, P, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, T> Copy for CycleContext<'_, P, T> {}

pub struct AcquisitionActivity<S> {
    source: S,
    counter: u32,
    joined_epoch: Option<u32>,
}

impl<S: SensorSource> AcquisitionActivity<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            counter: 0,
            joined_epoch: None,
        }
    }

    pub fn category(&self) -> SensorCategory {
        S::CATEGORY
    }

    /// Acquisition attempts so far, successful or not.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// One acquire/publish pass. Returns the reading on a completed publish.
    pub fn run_once<P: PublishPort, T: TimePort>(
        &mut self,
        cx: &CycleContext<'_, P, T>,
    ) -> Result<SensorReading, Error> {
        let name = S::CATEGORY.name();
        self.joined_epoch = None;

        if !cx.publisher.is_connected() {
            warn!("{}: broker not connected, skipping cycle", name);
            return Err(CommsError::TransportUnavailable.into());
        }

        let result = self.source.acquire(cx.time);
        let seq = self.counter;
        self.counter = self.counter.wrapping_add(1);
        let reading = result.inspect_err(|e| warn!("{}: read failed: {}", name, e))?;

        let body = payload::reading(
            cx.coordinator.device_id(),
            &reading,
            PayloadKind::Periodic { counter: seq },
        )?;
        let msg_id = cx
            .publisher
            .publish(reading.topic(), &body)
            .inspect_err(|e| warn!("{}: publish failed: {}", name, e))?;
        info!("{}: {} [#{} msg_id={}]", name, reading, seq, msg_id);

        let epoch = cx.coordinator.barrier.report_published(S::CATEGORY);
        self.joined_epoch = Some(epoch);
        cx.coordinator.record_reading(&reading);
        alert_out_of_range(&reading, cx);

        self.source.after_publish(&reading, cx);
        Ok(reading)
    }

    /// `run_once` followed by the inter-cycle wait.
    pub fn run_cycle<P: PublishPort, T: TimePort>(
        &mut self,
        cx: &CycleContext<'_, P, T>,
    ) -> WaitReport {
        // Errors are already logged; the barrier simply lacks this category.
        let _ = self.run_once(cx);

        let period = cx.coordinator.read_period();
        let report = cx
            .coordinator
            .power
            .wait(period, self.joined_epoch, &cx.coordinator.barrier, cx.time);
        debug!(
            "{}: waited {:?}, slept {} ms",
            S::CATEGORY.name(),
            report.strategy,
            report.slept.as_millis()
        );
        report
    }

    pub fn run<P: PublishPort, T: TimePort>(
        mut self,
        cx: CycleContext<'_, P, T>,
        startup_delay: Duration,
    ) -> ! {
        info!(
            "{}: activity started, first read in {} ms",
            S::CATEGORY.name(),
            startup_delay.as_millis()
        );
        cx.time.sleep(startup_delay);
        loop {
            self.run_cycle(&cx);
        }
    }
}

/// Publishes one alert per profile band the reading falls outside.
fn alert_out_of_range<P: PublishPort, T: TimePort>(
    reading: &SensorReading,
    cx: &CycleContext<'_, P, T>,
) {
    let profile = cx.coordinator.plant_profile();
    for v in profile.violations(reading) {
        let parameter = v.parameter.as_str();
        warn!("Profile: {} {} outside {}..={}", parameter, v.value, v.min, v.max);
        let alert = payload::range_alert(cx.coordinator.device_id(), &v, cx.time.uptime_ms());
        match alert.and_then(|a| cx.publisher.publish(TOPIC_ALERTS, &a)) {
            Ok(id) => info!("Profile: {} alert sent [msg_id={}]", parameter, id),
            Err(e) => warn!("Profile: {} alert not sent: {}", parameter, e),
        }
    }
}
