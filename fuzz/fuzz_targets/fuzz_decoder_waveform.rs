//! Fuzz target: `Dht11::read`
//!
//! Builds a line script from pairs of bytes (level bit + pulse width) and
//! runs the full handshake and bit decode against it. The decoder must
//! terminate, never panic, and always leave the line released.
//!
//! cargo fuzz run fuzz_decoder_waveform

#![no_main]

use critical_section as _;
use libfuzzer_sys::fuzz_target;
use plantsense::adapters::time::ManualClock;
use plantsense::sensors::dht11::Dht11;
use plantsense::sensors::waveform::{SimLine, Waveform};

fuzz_target!(|data: &[u8]| {
    let waveform = data.chunks_exact(2).fold(Waveform::new(), |w, pair| {
        w.level(pair[0] & 1 == 1, u32::from(pair[1]))
    });

    let mut dht = Dht11::new(SimLine::new(waveform));
    if let Ok(r) = dht.read(&ManualClock::new()) {
        assert!(r.captured_at_ms == 0);
    }

    let line = dht.release();
    assert!(!line.is_output());
    // Start signal, response, 40 bits: every phase is bounded.
    assert!(line.elapsed_us() < 18_000 + 30 + 3 * 101 + 40 * 202);
});
