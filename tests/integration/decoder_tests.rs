//! DHT11 decoder end to end against the scripted line.

use plantsense::adapters::time::ManualClock;
use plantsense::error::{DecodeError, DecodePhase, FailureKind};
use plantsense::sensors::dht11::{DecoderTiming, Dht11};
use plantsense::sensors::waveform::{
    BIT_LOW_US, RESPONSE_DELAY_US, RESPONSE_HIGH_US, RESPONSE_LOW_US, SimLine, Waveform,
};

fn read(w: Waveform) -> Result<(u8, u8), DecodeError> {
    let mut dht = Dht11::new(SimLine::new(w));
    dht.read(&ManualClock::new()).map(|r| (r.humidity, r.temperature))
}

#[test]
fn reference_frame_decodes() {
    assert_eq!(read(Waveform::dht11([45, 0, 25, 0, 70])), Ok((45, 25)));
}

#[test]
fn reference_frame_with_bad_checksum_fails() {
    let e = read(Waveform::dht11([45, 0, 25, 0, 71])).unwrap_err();
    assert_eq!(e.kind, FailureKind::ChecksumMismatch { expected: 70, actual: 71 });
}

#[test]
fn fractional_bytes_count_toward_checksum_but_not_reading() {
    assert_eq!(read(Waveform::dht11([45, 3, 25, 1, 74])), Ok((45, 25)));
}

#[test]
fn sensor_that_never_releases_response_low() {
    let w = Waveform::new().high(RESPONSE_DELAY_US).low(1_000);
    let e = read(w).unwrap_err();
    assert_eq!(e.kind, FailureKind::InitialResponseTimeout);
    assert_eq!(e.phase, DecodePhase::AwaitResponseHigh);
}

#[test]
fn sensor_that_never_starts_data() {
    // Response completes, then the line floats high forever.
    let w = Waveform::new()
        .high(RESPONSE_DELAY_US)
        .low(RESPONSE_LOW_US)
        .high(RESPONSE_HIGH_US + 500);
    let e = read(w).unwrap_err();
    assert_eq!(e.kind, FailureKind::DataStartTimeout);
    assert_eq!(e.phase, DecodePhase::AwaitDataStart);
}

#[test]
fn transmission_cut_mid_frame_reports_bit_index() {
    // 3 preamble segments + 10 bits × (low, high). After the cut the line
    // floats high, so bit 9's high pulse never ends.
    let w = Waveform::dht11([0, 0, 0, 0, 0]).cut_after(3 + 20);
    let e = read(w).unwrap_err();
    assert_eq!(e.kind, FailureKind::BitTimeout(9));
    assert_eq!(e.phase, DecodePhase::ReadBit(9));
}

#[test]
fn stuck_low_bit_start_times_out() {
    let w = Waveform::new()
        .high(RESPONSE_DELAY_US)
        .low(RESPONSE_LOW_US)
        .high(RESPONSE_HIGH_US)
        .low(BIT_LOW_US * 10);
    let e = read(w).unwrap_err();
    assert_eq!(e.kind, FailureKind::BitTimeout(0));
}

#[test]
fn tuned_threshold_shifts_bit_decision() {
    // Every high pulse is 50 µs: a 1 at the default threshold, a 0 at 60.
    let w = Waveform::dht11_with([0; 5], |_, _| 50);
    let strict = DecoderTiming {
        one_threshold: 60,
        ..DecoderTiming::DHT11
    };
    let mut dht = Dht11::with_timing(SimLine::new(w.clone()), strict);
    assert_eq!(dht.read_frame().unwrap().bytes(), [0; 5]);

    let mut dht = Dht11::new(SimLine::new(w));
    assert_eq!(dht.read_frame().unwrap().bytes(), [0xff; 5]);
}

#[test]
fn line_is_released_after_failure() {
    let mut dht = Dht11::new(SimLine::new(Waveform::new()));
    assert!(dht.read(&ManualClock::new()).is_err());
    let line = dht.release();
    assert!(!line.is_output());
    assert_eq!(line.driven_low_us(), 18_000);
}
