//! Actuator drivers, hardware initialisation, and thread placement.

pub mod hw_init;
pub mod solenoid;
pub mod task_pin;
