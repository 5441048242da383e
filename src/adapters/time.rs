//! ESP32 time adapter.
//!
//! Provides monotonic time and task suspension for the PlantSense system.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//!   `std::thread::sleep` maps onto `vTaskDelay`, which is what lets the
//!   power-management lock drop and the chip enter automatic light sleep.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side simulation, plus [`ManualClock`] for deterministic tests.

use embassy_time::Duration;

use crate::app::ports::TimePort;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since boot (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.uptime_us() / 1_000_000
    }
}

impl TimePort for Esp32TimeAdapter {
    #[cfg(target_os = "espidf")]
    fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(core::time::Duration::from_micros(duration.as_micros()));
    }

    /// Hour-of-day from the system clock. `None` if not synced (pre-SNTP).
    #[cfg(target_os = "espidf")]
    fn current_hour(&self) -> Option<u8> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        // Anything before 2020-01-01 means SNTP has not run yet
        const EPOCH_2020: i64 = 1_577_836_800;
        if i64::from(tv.tv_sec) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        u8::try_from(tm.tm_hour).ok().filter(|h| *h < 24)
    }
}

// ── Manual clock (host tests) ─────────────────────────────────

/// Deterministic clock: time only moves when someone sleeps or calls
/// [`advance`](Self::advance). Every sleep is recorded.
#[cfg(not(target_os = "espidf"))]
pub struct ManualClock {
    now_us: core::sync::atomic::AtomicU64,
    hour: Option<u8>,
    sleeps: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now_us: core::sync::atomic::AtomicU64::new(0),
            hour: None,
            sleeps: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Clock that reports a synced wall-clock hour.
    pub fn with_hour(hour: u8) -> Self {
        Self {
            hour: Some(hour),
            ..Self::new()
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_us
            .fetch_add(by.as_micros(), core::sync::atomic::Ordering::SeqCst);
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps()
            .into_iter()
            .fold(Duration::from_ticks(0), |acc, d| acc + d)
    }
}

#[cfg(not(target_os = "espidf"))]
impl TimePort for ManualClock {
    fn uptime_us(&self) -> u64 {
        self.now_us.load(core::sync::atomic::Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
    }

    fn current_hour(&self) -> Option<u8> {
        self.hour
    }
}
