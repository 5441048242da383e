//! Scripted single-wire line for host-side decoding.
//!
//! [`Waveform`] describes what the sensor does to the line after the host
//! releases it, as a list of `(level, microseconds)` segments. [`SimLine`]
//! replays it against a virtual clock that only advances in `delay_us`,
//! so a poll loop sees exactly one sample per poll interval.
//!
//! Host-only; the ESP-IDF build never compiles this module.

use core::convert::Infallible;

use crate::app::ports::SignalPin;

/// Sensor pause between host release and the response low.
pub const RESPONSE_DELAY_US: u32 = 20;
pub const RESPONSE_LOW_US: u32 = 80;
pub const RESPONSE_HIGH_US: u32 = 80;
pub const BIT_LOW_US: u32 = 50;
pub const ZERO_HIGH_US: u32 = 26;
pub const ONE_HIGH_US: u32 = 70;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Waveform {
    segments: Vec<(bool, u32)>,
}

impl Waveform {
    /// Empty script: the line just sits at the pull-up level.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn level(mut self, high: bool, us: u32) -> Self {
        self.segments.push((high, us));
        self
    }

    #[must_use]
    pub fn high(self, us: u32) -> Self {
        self.level(true, us)
    }

    #[must_use]
    pub fn low(self, us: u32) -> Self {
        self.level(false, us)
    }

    /// A well-formed DHT11 transmission of `bytes`.
    pub fn dht11(bytes: [u8; 5]) -> Self {
        Self::dht11_with(bytes, |_, one| if one { ONE_HIGH_US } else { ZERO_HIGH_US })
    }

    /// DHT11 transmission whose bit high pulses come from `high_us(index, bit)`.
    pub fn dht11_with(bytes: [u8; 5], high_us: impl Fn(usize, bool) -> u32) -> Self {
        let mut w = Self::new()
            .high(RESPONSE_DELAY_US)
            .low(RESPONSE_LOW_US)
            .high(RESPONSE_HIGH_US);
        for (index, byte) in bytes.iter().flat_map(|b| [*b; 8]).enumerate() {
            let one = byte & (0x80 >> (index % 8)) != 0;
            w = w.low(BIT_LOW_US).high(high_us(index, one));
        }
        w.low(BIT_LOW_US)
    }

    /// Truncate after `segments` entries; the line then floats high.
    #[must_use]
    pub fn cut_after(mut self, segments: usize) -> Self {
        self.segments.truncate(segments);
        self
    }

    pub fn segments(&self) -> &[(bool, u32)] {
        &self.segments
    }

    /// Line level `t` µs after release. Past the end the pull-up wins.
    pub fn level_at(&self, t: u64) -> bool {
        let mut end = 0u64;
        for &(high, us) in &self.segments {
            end += u64::from(us);
            if t < end {
                return high;
            }
        }
        true
    }
}

/// Virtual open-drain line replaying a [`Waveform`].
#[derive(Debug, Clone)]
pub struct SimLine {
    waveform: Waveform,
    now_us: u64,
    released_at: Option<u64>,
    output: bool,
    driven_high: bool,
    driven_low_us: u64,
    samples: u64,
}

impl SimLine {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            now_us: 0,
            released_at: None,
            output: false,
            driven_high: true,
            driven_low_us: 0,
            samples: 0,
        }
    }

    /// Virtual time since construction.
    pub fn elapsed_us(&self) -> u64 {
        self.now_us
    }

    /// Virtual time since the host last released the line.
    pub fn listened_us(&self) -> Option<u64> {
        self.released_at.map(|r| self.now_us - r)
    }

    /// Total time the host held the line low.
    pub fn driven_low_us(&self) -> u64 {
        self.driven_low_us
    }

    pub fn is_output(&self) -> bool {
        self.output
    }

    /// Number of `is_high` calls.
    pub fn samples(&self) -> u64 {
        self.samples
    }
}

impl SignalPin for SimLine {
    type Error = Infallible;

    fn set_output(&mut self) -> Result<(), Infallible> {
        self.output = true;
        self.released_at = None;
        Ok(())
    }

    fn set_input(&mut self) -> Result<(), Infallible> {
        if self.output {
            self.output = false;
            self.released_at = Some(self.now_us);
        }
        Ok(())
    }

    fn set_level(&mut self, high: bool) -> Result<(), Infallible> {
        self.driven_high = high;
        Ok(())
    }

    fn is_high(&mut self) -> Result<bool, Infallible> {
        self.samples += 1;
        if self.output {
            return Ok(self.driven_high);
        }
        Ok(match self.released_at {
            Some(at) => self.waveform.level_at(self.now_us - at),
            None => true,
        })
    }

    fn delay_us(&mut self, us: u32) {
        if self.output && !self.driven_high {
            self.driven_low_us += u64::from(us);
        }
        self.now_us += u64::from(us);
    }
}
