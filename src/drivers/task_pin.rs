//! Core-pinned activity threads.
//!
//! ESP-IDF implements `std::thread` on pthreads over FreeRTOS tasks.
//! `esp_pthread_set_cfg()` sets thread-local configuration that applies to
//! the *next* `pthread_create()` from the calling thread, so the
//! config→spawn pair must not interleave with other spawns on that thread.
//!
//! The DHT11 activity goes on the App core at a higher priority than
//! anything else there; its decode counts microsecond polls and must not be
//! preempted by Wi-Fi/lwIP, which ESP-IDF keeps on the Pro core.

use std::io;
use std::thread::JoinHandle;

/// ESP32 Xtensa LX6 cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): Wi-Fi, lwIP, MQTT.
    Pro = 0,
    /// Core 1 (APP_CPU): timing-sensitive acquisition.
    App = 1,
}

/// Thread parameters for one activity.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
    /// NUL-terminated, e.g. `"dht11\0"`.
    pub name: &'static str,
}

impl TaskSpec {
    fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    spec: TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    if !spec.name.ends_with('\0') {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "task name must be NUL-terminated"));
    }

    // SAFETY: cfg lives on the stack for the call; thread_name points at a
    // 'static NUL-terminated string.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = i32::from(spec.priority);
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        cfg.thread_name = spec.name.as_ptr().cast();
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
}

/// Host fallback: no pinning, no priorities.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    spec: TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}
