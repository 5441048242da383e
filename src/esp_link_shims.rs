//! Runtime symbols that `critical-section` and `embassy-time` expect the
//! binary to provide on ESP-IDF.
//!
//! The coordination state (power policy, statistics, plant profile, latest
//! readings) sits behind `embassy-sync` blocking mutexes, which lock through
//! `critical-section`. Here that maps onto one process-wide std mutex,
//! re-entrant per thread. Activities only hold it for a `Cell` copy, so it
//! never spans a DHT11 decode.

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(target_os = "espidf")]
static SHARED_STATE_LOCK: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static NESTING: Cell<u8> = const { Cell::new(0) };
    static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    let depth = NESTING.get();
    if depth == 0 {
        // Closures under the lock only copy `Cell`s; a poisoned guard
        // still protects consistent data.
        let guard = SHARED_STATE_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        HELD.with(|h| *h.borrow_mut() = Some(guard));
    }
    NESTING.set(depth.saturating_add(1));
    depth
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(outer_depth: u8) {
    NESTING.set(outer_depth);
    if outer_depth == 0 {
        HELD.with(|h| *h.borrow_mut() = None);
    }
}

/// Monotonic microseconds, the tick base `embassy-time` is built with.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_now() -> u64 {
    // SAFETY: reads the high-resolution timer, callable from any task.
    unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
}

/// Nothing awaits an embassy timer in this firmware; activities suspend
/// with `std::thread::sleep`. Wake immediately so a stray future polls again.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _embassy_time_schedule_wake(_at: u64, waker: *mut core::ffi::c_void) {
    if waker.is_null() {
        return;
    }
    // SAFETY: embassy-time passes a pointer to a live `Waker` for the call.
    let waker = unsafe { &*(waker as *const core::task::Waker) };
    waker.wake_by_ref();
}
