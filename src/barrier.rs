//! Publish-completion barrier.
//!
//! Tracks which sensor categories have published a reading in the current
//! duty cycle. The power manager polls it before entering a low-power wait
//! so that no activity is still mid-publish when the radio goes quiet.
//!
//! ## Layout
//!
//! A single `AtomicU32` holds everything:
//!
//! ```text
//!  31                              8 7       3 2 1 0
//! ┌─────────────────────────────────┬─────────┬─┬─┬─┐
//! │           cycle epoch           │ unused  │S│U│D│
//! └─────────────────────────────────┴─────────┴─┴─┴─┘
//! ```
//!
//! Reporting is one `fetch_or`; closing a cycle clears the flags and bumps
//! the epoch in one compare-exchange, so a report can never be split across
//! two cycles.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use log::{debug, info};

const FLAG_BITS: u32 = 8;
const FLAG_MASK: u32 = (1 << FLAG_BITS) - 1;

// ── Categories ────────────────────────────────────────────────

/// One bit per acquisition activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorCategory {
    Dht,
    Uv,
    Soil,
}

impl SensorCategory {
    pub const ALL: [Self; 3] = [Self::Dht, Self::Uv, Self::Soil];

    pub const fn mask(self) -> u8 {
        match self {
            Self::Dht => 0b001,
            Self::Uv => 0b010,
            Self::Soil => 0b100,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Dht => "dht",
            Self::Uv => "uv",
            Self::Soil => "soil",
        }
    }
}

// ── Flag set ──────────────────────────────────────────────────

/// Snapshot of the per-category markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishFlags(u8);

impl PublishFlags {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self(0b111);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, category: SensorCategory) -> bool {
        self.0 & category.mask() != 0
    }

    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, category: SensorCategory) -> Self {
        Self(self.0 | category.mask())
    }

    /// Categories in `self` that are not in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = SensorCategory> {
        SensorCategory::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<SensorCategory> for PublishFlags {
    fn from_iter<I: IntoIterator<Item = SensorCategory>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl fmt::Display for PublishFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        for (i, c) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", c.name())?;
        }
        Ok(())
    }
}

// ── Barrier ───────────────────────────────────────────────────

/// Shared by every acquisition activity and the power manager.
///
/// Writers: each activity sets only its own bit. The cycle is closed
/// (flags cleared, epoch advanced) by the power manager.
pub struct PublishBarrier {
    state: AtomicU32,
    required: PublishFlags,
}

impl Default for PublishBarrier {
    fn default() -> Self {
        Self::new(PublishFlags::ALL)
    }
}

impl PublishBarrier {
    pub const fn new(required: PublishFlags) -> Self {
        Self {
            state: AtomicU32::new(0),
            required,
        }
    }

    pub fn required(&self) -> PublishFlags {
        self.required
    }

    /// Mark `category` as published. Idempotent within a cycle.
    ///
    /// Returns the epoch of the cycle the report landed in.
    pub fn report_published(&self, category: SensorCategory) -> u32 {
        let mask = u32::from(category.mask());
        let prev = self.state.fetch_or(mask, Ordering::AcqRel);
        let epoch = prev >> FLAG_BITS;

        if prev & mask == 0 {
            debug!("Barrier: {} published (cycle {})", category.name(), epoch);
            let now = PublishFlags::from_bits(((prev | mask) & FLAG_MASK) as u8);
            if now.contains_all(self.required) {
                info!("Barrier: all required sensors published (cycle {})", epoch);
            }
        }
        epoch
    }

    pub fn flags(&self) -> PublishFlags {
        PublishFlags::from_bits((self.state.load(Ordering::Acquire) & FLAG_MASK) as u8)
    }

    pub fn epoch(&self) -> u32 {
        self.state.load(Ordering::Acquire) >> FLAG_BITS
    }

    pub fn all_required_published(&self) -> bool {
        self.flags().contains_all(self.required)
    }

    /// Required categories that have not reported this cycle.
    pub fn missing(&self) -> PublishFlags {
        self.required.difference(self.flags())
    }

    /// Clear every flag and start a new cycle, whatever the current one is.
    pub fn reset(&self) {
        let prev = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| Some(next_cycle(s)))
            .unwrap_or_else(|s| s);
        debug!("Barrier: reset (cycle {})", (prev >> FLAG_BITS).wrapping_add(1));
    }

    /// Close cycle `epoch` if it is still the current one.
    ///
    /// Returns `true` for exactly one caller per cycle.
    pub fn reset_cycle(&self, epoch: u32) -> bool {
        let closed = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s >> FLAG_BITS == epoch).then(|| next_cycle(s))
            })
            .is_ok();
        if closed {
            debug!("Barrier: cycle {} closed", epoch);
        }
        closed
    }
}

/// State word for the cycle after `state`, with all flags cleared.
const fn next_cycle(state: u32) -> u32 {
    ((state >> FLAG_BITS).wrapping_add(1) << FLAG_BITS) & !FLAG_MASK
}
