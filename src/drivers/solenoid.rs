//! Irrigation solenoid valve driver (12 V valve behind a logic-level MOSFET).
//!
//! Shared by the command handler (manual on/off) and the soil activity
//! (timed auto-irrigation pulse), so state is an atomic and every method
//! takes `&self`.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the GPIO via hw_init helpers.
//! On host/test: tracks state in-memory only.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::Duration;
use log::info;

use crate::app::ports::TimePort;
use crate::drivers::hw_init;

pub struct SolenoidDriver {
    gpio: i32,
    open: AtomicBool,
}

impl SolenoidDriver {
    pub const fn new(gpio: i32) -> Self {
        Self {
            gpio,
            open: AtomicBool::new(false),
        }
    }

    pub fn set(&self, open: bool) {
        hw_init::gpio_write(self.gpio, open);
        let was = self.open.swap(open, Ordering::AcqRel);
        if was != open {
            info!("Solenoid: {}", if open { "OPEN" } else { "CLOSED" });
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Open for `duration`, then close. Blocks the calling task.
    pub fn pulse(&self, duration: Duration, time: &impl TimePort) {
        self.set(true);
        time.sleep(duration);
        self.set(false);
    }
}
