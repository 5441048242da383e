//! [`SignalPin`] over `embedded-hal` 1.0 traits.
//!
//! The DHT11 data line is wired open-drain with an external pull-up, so
//! "input" and "drive high" are the same thing electrically: both let go
//! of the line. Any HAL pin that is both `InputPin` and `OutputPin` works;
//! on the ESP32 that is `PinDriver::input_output_od` paired with the
//! ROM `Ets` busy-wait delay.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::app::ports::SignalPin;

pub struct OpenDrainPin<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> OpenDrainPin<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// Starts released (line pulled high).
    pub fn new(mut pin: P, delay: D) -> Result<Self, <P as ErrorType>::Error> {
        pin.set_high()?;
        Ok(Self { pin, delay })
    }

    pub fn into_inner(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

impl<P, D> SignalPin for OpenDrainPin<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    type Error = <P as ErrorType>::Error;

    fn set_output(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_input(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high()
    }

    fn set_level(&mut self, high: bool) -> Result<(), Self::Error> {
        if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.pin.is_high()
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}
