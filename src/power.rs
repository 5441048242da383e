//! Duty-cycle power manager.
//!
//! Decides, at every cycle boundary of every acquisition activity, whether
//! the next wait is a plain task delay or a cooperative low-power wait, and
//! executes it.
//!
//! ## Low-power wait
//!
//! ```text
//!  poll barrier (≤30 × 500 ms) ─▶ settle 1 s ─▶ close cycle ─▶ sleep d − 1 s
//! ```
//!
//! The chip only reaches light sleep when every task is blocked, so the
//! "sleep" itself is an ordinary task delay with automatic light sleep
//! enabled in the ESP-IDF power-management layer (see [`platform`]).
//! The barrier poll keeps the radio up until every activity has handed its
//! reading to the MQTT client.
//!
//! ## Shared state
//!
//! `PowerPolicy` is written only by the command handler; `PowerStats` only
//! by the low-power path. Both sit behind `embassy-sync` blocking mutexes
//! and are copied out under the lock, never borrowed across a wait.

use core::cell::Cell;
use core::fmt;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::TimePort;
use crate::barrier::{PublishBarrier, PublishFlags};
use crate::error::{CoordinationError, Error};

/// Barrier polls before giving up and sleeping anyway.
pub const BARRIER_POLL_ATTEMPTS: u32 = 30;
pub const BARRIER_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Lets queued MQTT writes reach the socket before the radio idles.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1_000);
/// Below this a low-power decision degrades to a plain wait.
pub const MIN_LOW_POWER_WAIT: Duration = Duration::from_millis(1_000);
pub const DEFAULT_SLEEP_THRESHOLD: Duration = Duration::from_millis(600_000);

// ── Policy ────────────────────────────────────────────────────

/// Wire names match the `set_power_mode` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerMode {
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "light_sleep")]
    ForcedLowPower,
    #[serde(rename = "auto")]
    Adaptive,
}

impl PowerMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::ForcedLowPower => "light_sleep",
            Self::Adaptive => "auto",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(Self::Normal),
            "light_sleep" => Some(Self::ForcedLowPower),
            "auto" => Some(Self::Adaptive),
            _ => None,
        }
    }
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    Timed,
    LowPower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerPolicy {
    pub mode: PowerMode,
    pub enabled: bool,
    pub sleep_threshold: Duration,
}

impl Default for PowerPolicy {
    fn default() -> Self {
        Self {
            mode: PowerMode::Adaptive,
            enabled: false,
            sleep_threshold: DEFAULT_SLEEP_THRESHOLD,
        }
    }
}

impl PowerPolicy {
    /// Wait strategy for an upcoming wait of length `d`.
    pub fn strategy_for(&self, d: Duration) -> WaitStrategy {
        if !self.enabled {
            return WaitStrategy::Timed;
        }
        match self.mode {
            PowerMode::Normal => WaitStrategy::Timed,
            PowerMode::ForcedLowPower => WaitStrategy::LowPower,
            PowerMode::Adaptive if d >= self.sleep_threshold => WaitStrategy::LowPower,
            PowerMode::Adaptive => WaitStrategy::Timed,
        }
    }

    /// Whether the platform should have automatic light sleep armed.
    pub fn light_sleep_armed(&self) -> bool {
        self.enabled && self.mode != PowerMode::Normal
    }
}

// ── Statistics ────────────────────────────────────────────────

/// Append-only since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PowerStats {
    pub sleep_count: u32,
    pub total_sleep_ms: u64,
    pub timer_wake_count: u32,
}

impl PowerStats {
    /// Wakes not caused by the timer. Always zero today: no external
    /// wake source is armed.
    pub fn event_wake_count(&self) -> u32 {
        self.sleep_count.saturating_sub(self.timer_wake_count)
    }

    pub fn average_sleep_ms(&self) -> Option<u64> {
        (self.sleep_count > 0).then(|| self.total_sleep_ms / u64::from(self.sleep_count))
    }
}

// ── Wait outcome ──────────────────────────────────────────────

/// How the barrier poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierStatus {
    /// Every required category reported.
    Complete,
    /// Another activity already closed this cycle.
    ClosedByPeer,
    /// Attempts exhausted; these categories were still missing.
    TimedOut(PublishFlags),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitReport {
    pub strategy: WaitStrategy,
    /// `None` on the timed path, which never looks at the barrier.
    pub barrier: Option<BarrierStatus>,
    /// Time spent in the final suspension (excludes poll and settle).
    pub slept: Duration,
}

// ── Power manager ─────────────────────────────────────────────

pub struct PowerManager {
    policy: Mutex<CriticalSectionRawMutex, Cell<PowerPolicy>>,
    stats: Mutex<CriticalSectionRawMutex, Cell<PowerStats>>,
}

impl Default for PowerManager {
    fn default() -> Self {
        Self::new(PowerPolicy::default())
    }
}

impl PowerManager {
    pub fn new(policy: PowerPolicy) -> Self {
        Self {
            policy: Mutex::new(Cell::new(policy)),
            stats: Mutex::new(Cell::new(PowerStats::default())),
        }
    }

    pub fn get_policy(&self) -> PowerPolicy {
        self.policy.lock(Cell::get)
    }

    pub fn set_policy(&self, policy: PowerPolicy) {
        let prev = self.policy.lock(|p| p.replace(policy));
        info!(
            "Power: policy mode={} enabled={} threshold={} s",
            policy.mode,
            policy.enabled,
            policy.sleep_threshold.as_secs()
        );
        if prev.light_sleep_armed() != policy.light_sleep_armed() {
            platform::configure_light_sleep(&policy);
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.set_policy(PowerPolicy {
            enabled,
            ..self.get_policy()
        });
    }

    pub fn set_mode(&self, mode: PowerMode) {
        self.set_policy(PowerPolicy {
            mode,
            ..self.get_policy()
        });
    }

    /// Arm the platform for the current policy. Called once at boot.
    pub fn init_platform(&self) {
        platform::configure_light_sleep(&self.get_policy());
    }

    pub fn decide(&self, d: Duration) -> WaitStrategy {
        self.get_policy().strategy_for(d)
    }

    pub fn report_stats(&self) -> PowerStats {
        self.stats.lock(Cell::get)
    }

    /// Dump policy and statistics to the log.
    pub fn log_report(&self) {
        let policy = self.get_policy();
        let stats = self.report_stats();
        info!("Power: ═══════════ statistics ═══════════");
        info!(
            "Power:   mode {} ({})",
            policy.mode,
            if policy.enabled { "enabled" } else { "disabled" }
        );
        info!(
            "Power:   sleeps {}  total {} s",
            stats.sleep_count,
            stats.total_sleep_ms / 1_000
        );
        info!(
            "Power:   wakes timer={} event={}",
            stats.timer_wake_count,
            stats.event_wake_count()
        );
        if let Some(avg) = stats.average_sleep_ms() {
            info!("Power:   average sleep {} s", avg / 1_000);
        }
        info!("Power: ════════════════════════════════════");
    }

    /// Wait out the gap until the next cycle.
    ///
    /// `joined_epoch` is the barrier cycle the caller's own report landed
    /// in, if it published this cycle.
    pub fn wait(
        &self,
        d: Duration,
        joined_epoch: Option<u32>,
        barrier: &PublishBarrier,
        time: &impl TimePort,
    ) -> WaitReport {
        match self.decide(d) {
            WaitStrategy::LowPower if d >= MIN_LOW_POWER_WAIT => {
                self.low_power_wait(d, joined_epoch, barrier, time)
            }
            WaitStrategy::LowPower => {
                debug!("Power: {} ms is too short for light sleep", d.as_millis());
                Self::timed_wait(d, time)
            }
            WaitStrategy::Timed => Self::timed_wait(d, time),
        }
    }

    fn timed_wait(d: Duration, time: &impl TimePort) -> WaitReport {
        time.sleep(d);
        WaitReport {
            strategy: WaitStrategy::Timed,
            barrier: None,
            slept: d,
        }
    }

    fn low_power_wait(
        &self,
        d: Duration,
        joined_epoch: Option<u32>,
        barrier: &PublishBarrier,
        time: &impl TimePort,
    ) -> WaitReport {
        let epoch = joined_epoch.unwrap_or_else(|| barrier.epoch());
        let status = Self::await_barrier(epoch, barrier, time);
        if let BarrierStatus::TimedOut(missing) = status {
            let err = Error::from(CoordinationError::BarrierTimeout { missing });
            warn!("Power: {}, sleeping anyway", err);
        }

        time.sleep(SETTLE_DELAY);
        barrier.reset_cycle(epoch);

        let adjusted = if d > SETTLE_DELAY { d - SETTLE_DELAY } else { d };
        info!("Power: light sleep for {} s", adjusted.as_secs());
        platform::arm_timer_wakeup(adjusted);

        let start = time.uptime_us();
        time.sleep(adjusted);
        let slept = Duration::from_micros(time.uptime_us().saturating_sub(start));

        self.record_sleep(slept);
        info!("Power: woke after {} ms (timer)", slept.as_millis());

        WaitReport {
            strategy: WaitStrategy::LowPower,
            barrier: Some(status),
            slept,
        }
    }

    fn await_barrier(epoch: u32, barrier: &PublishBarrier, time: &impl TimePort) -> BarrierStatus {
        for attempt in 0..=BARRIER_POLL_ATTEMPTS {
            if barrier.epoch() != epoch {
                return BarrierStatus::ClosedByPeer;
            }
            if barrier.all_required_published() {
                return BarrierStatus::Complete;
            }
            if attempt == BARRIER_POLL_ATTEMPTS {
                break;
            }
            debug!(
                "Power: waiting for publishers ({}/{}), have [{}]",
                attempt + 1,
                BARRIER_POLL_ATTEMPTS,
                barrier.flags()
            );
            time.sleep(BARRIER_POLL_INTERVAL);
        }
        BarrierStatus::TimedOut(barrier.missing())
    }

    fn record_sleep(&self, slept: Duration) {
        self.stats.lock(|s| {
            let mut stats = s.get();
            stats.sleep_count = stats.sleep_count.saturating_add(1);
            stats.total_sleep_ms = stats.total_sleep_ms.saturating_add(slept.as_millis());
            stats.timer_wake_count = stats.timer_wake_count.saturating_add(1);
            s.set(stats);
        });
    }
}

// ── Platform hooks ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use embassy_time::Duration;
    use esp_idf_svc::sys::*;
    use log::{info, warn};

    use super::PowerPolicy;

    const MAX_CPU_FREQ_MHZ: i32 = 240;
    const MIN_CPU_FREQ_MHZ: i32 = 80;

    /// Configure DFS + automatic light sleep and Wi-Fi modem power save.
    pub fn configure_light_sleep(policy: &PowerPolicy) {
        let armed = policy.light_sleep_armed();
        let cfg = esp_pm_config_t {
            max_freq_mhz: MAX_CPU_FREQ_MHZ,
            min_freq_mhz: if armed { MIN_CPU_FREQ_MHZ } else { MAX_CPU_FREQ_MHZ },
            light_sleep_enable: armed,
        };
        // SAFETY: cfg outlives the call; esp_pm_configure copies it.
        let ret = unsafe { esp_pm_configure((&raw const cfg).cast()) };
        if ret != ESP_OK as i32 {
            warn!("Power: esp_pm_configure failed (rc={}), is CONFIG_PM_ENABLE set?", ret);
        }

        let ps = if armed {
            wifi_ps_type_t_WIFI_PS_MIN_MODEM
        } else {
            wifi_ps_type_t_WIFI_PS_NONE
        };
        // SAFETY: plain setter; returns an error code if Wi-Fi is not started.
        let ret = unsafe { esp_wifi_set_ps(ps) };
        if ret != ESP_OK as i32 {
            warn!("Power: esp_wifi_set_ps failed (rc={})", ret);
        }
        info!(
            "Power: automatic light sleep {}",
            if armed { "armed" } else { "disarmed" }
        );
    }

    pub fn arm_timer_wakeup(after: Duration) {
        // SAFETY: configures the RTC timer wake source only.
        let ret = unsafe { esp_sleep_enable_timer_wakeup(after.as_micros()) };
        if ret != ESP_OK as i32 {
            warn!("Power: timer wakeup config failed (rc={})", ret);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod platform {
    use embassy_time::Duration;

    use super::PowerPolicy;

    pub fn configure_light_sleep(policy: &PowerPolicy) {
        log::debug!(
            "Power(sim): light sleep {}",
            if policy.light_sleep_armed() { "armed" } else { "disarmed" }
        );
    }

    pub fn arm_timer_wakeup(_after: Duration) {}
}
